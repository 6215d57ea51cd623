//! The head-turn challenge: one detection result in, updated flags and the
//! resulting phase out. No I/O, no timing; the pipeline owns those.

use crate::detection::domain::face_mesh::FaceMesh;
use crate::detection::domain::head_pose::PoseSignal;
use crate::shared::constants::DEFAULT_TURN_THRESHOLD;

use super::challenge_state::ChallengeState;
use super::session_phase::SessionPhase;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChallengeConfig {
    /// Offset magnitude beyond which a frame counts as a turn.
    pub turn_threshold: f64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            turn_threshold: DEFAULT_TURN_THRESHOLD,
        }
    }
}

impl ChallengeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.turn_threshold > 0.0 && self.turn_threshold < 1.0) {
            return Err(format!(
                "Turn threshold must be between 0.0 and 1.0 (exclusive), got {}",
                self.turn_threshold
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameEvaluation {
    pub phase: SessionPhase,
    /// `None` when no face was found or its geometry was degenerate.
    pub pose: Option<PoseSignal>,
}

/// Applies one frame's detection result to `state`.
///
/// Only the first face is used. A degenerate face still counts as present
/// but leaves the turn flags untouched. Phase precedence: left turn, then
/// right turn, then passed; a captured session stays captured.
pub fn evaluate_faces(
    state: &mut ChallengeState,
    faces: &[FaceMesh],
    config: &ChallengeConfig,
) -> FrameEvaluation {
    let Some(face) = faces.first() else {
        state.set_face_present(false);
        return FrameEvaluation {
            phase: settled_phase(state, SessionPhase::NoFace),
            pose: None,
        };
    };
    state.set_face_present(true);

    let pose = PoseSignal::from_mesh(face);
    match pose {
        Some(signal) if signal.nose_offset < -config.turn_threshold => {
            if state.mark_turned_left() {
                log::info!("Left turn detected (offset {:.3})", signal.nose_offset);
            }
        }
        Some(signal) if signal.nose_offset > config.turn_threshold => {
            if state.mark_turned_right() {
                log::info!("Right turn detected (offset {:.3})", signal.nose_offset);
            }
        }
        Some(_) => {}
        None => log::debug!("Degenerate face geometry, turn update skipped"),
    }

    FrameEvaluation {
        phase: settled_phase(state, challenge_phase(state)),
        pose,
    }
}

/// First unmet requirement wins.
pub fn challenge_phase(state: &ChallengeState) -> SessionPhase {
    if !state.turned_left() {
        SessionPhase::ChallengeLeft
    } else if !state.turned_right() {
        SessionPhase::ChallengeRight
    } else {
        SessionPhase::Passed
    }
}

fn settled_phase(state: &ChallengeState, phase: SessionPhase) -> SessionPhase {
    if state.captured() {
        SessionPhase::Captured
    } else {
        phase
    }
}

use std::fmt;

use super::challenge_state::ChallengeState;

/// Where a liveness session stands. Each phase carries the status line
/// shown to the person in front of the camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Initializing,
    WaitingForSource,
    NoFace,
    ChallengeLeft,
    ChallengeRight,
    Passed,
    Captured,
}

impl SessionPhase {
    pub fn status_text(&self) -> &'static str {
        match self {
            SessionPhase::Initializing => "Initializing camera...",
            SessionPhase::WaitingForSource => "Waiting for video source...",
            SessionPhase::NoFace => "No face detected",
            SessionPhase::ChallengeLeft => "Turn your head LEFT",
            SessionPhase::ChallengeRight => "Turn your head RIGHT",
            SessionPhase::Passed => "Liveness passed — capturing",
            SessionPhase::Captured => "Selfie captured",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Captured)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_text())
    }
}

/// Phase and flags at one instant, handed to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub state: ChallengeState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SessionPhase::NoFace, "No face detected")]
    #[case(SessionPhase::ChallengeLeft, "Turn your head LEFT")]
    #[case(SessionPhase::ChallengeRight, "Turn your head RIGHT")]
    #[case(SessionPhase::Passed, "Liveness passed — capturing")]
    fn test_status_text(#[case] phase: SessionPhase, #[case] text: &str) {
        assert_eq!(phase.status_text(), text);
        assert_eq!(phase.to_string(), text);
    }

    #[test]
    fn test_only_captured_is_terminal() {
        assert!(SessionPhase::Captured.is_terminal());
        assert!(!SessionPhase::Passed.is_terminal());
        assert!(!SessionPhase::WaitingForSource.is_terminal());
    }
}

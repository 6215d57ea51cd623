/// Per-session challenge flags.
///
/// `turned_left`, `turned_right` and `captured` only ever go from false to
/// true; there is no way to clear them short of starting a new session.
/// `face_present` follows the most recent detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChallengeState {
    face_present: bool,
    turned_left: bool,
    turned_right: bool,
    captured: bool,
}

impl ChallengeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn face_present(&self) -> bool {
        self.face_present
    }

    pub fn turned_left(&self) -> bool {
        self.turned_left
    }

    pub fn turned_right(&self) -> bool {
        self.turned_right
    }

    /// Both turns completed.
    pub fn passed(&self) -> bool {
        self.turned_left && self.turned_right
    }

    pub fn captured(&self) -> bool {
        self.captured
    }

    pub fn set_face_present(&mut self, present: bool) {
        self.face_present = present;
    }

    /// Returns `true` if this call set the flag.
    pub fn mark_turned_left(&mut self) -> bool {
        !std::mem::replace(&mut self.turned_left, true)
    }

    /// Returns `true` if this call set the flag.
    pub fn mark_turned_right(&mut self) -> bool {
        !std::mem::replace(&mut self.turned_right, true)
    }

    /// Returns `true` if this call set the flag, i.e. the caller owns the
    /// one and only capture of the session.
    pub fn mark_captured(&mut self) -> bool {
        !std::mem::replace(&mut self.captured, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_all_flags_false() {
        let state = ChallengeState::new();
        assert!(!state.face_present());
        assert!(!state.turned_left());
        assert!(!state.turned_right());
        assert!(!state.passed());
        assert!(!state.captured());
    }

    #[test]
    fn test_marks_report_first_transition_only() {
        let mut state = ChallengeState::new();
        assert!(state.mark_turned_left());
        assert!(!state.mark_turned_left());
        assert!(state.turned_left());

        assert!(state.mark_captured());
        assert!(!state.mark_captured());
        assert!(state.captured());
    }

    #[test]
    fn test_passed_requires_both_turns() {
        let mut state = ChallengeState::new();
        state.mark_turned_right();
        assert!(!state.passed());
        state.mark_turned_left();
        assert!(state.passed());
    }

    #[test]
    fn test_face_presence_does_not_touch_turns() {
        let mut state = ChallengeState::new();
        state.mark_turned_left();
        state.set_face_present(true);
        state.set_face_present(false);
        assert!(state.turned_left());
        assert!(!state.face_present());
    }
}

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a trace session. Cycles `NotRunning → Running → Ending →
/// NotRunning`; a tracer may go around the cycle any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    NotRunning = 0,
    Running = 1,
    /// Shutdown requested; the writer is doing its final drain.
    Ending = 2,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SessionState::Running,
            2 => SessionState::Ending,
            _ => SessionState::NotRunning,
        }
    }
}

pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SessionState::NotRunning as u8))
    }

    pub(crate) fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move from `from` to `to`. On failure returns the state actually found.
    pub(crate) fn transition(
        &self,
        from: SessionState,
        to: SessionState,
    ) -> Result<(), SessionState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(SessionState::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let state = StateCell::new();
        assert_eq!(state.load(), SessionState::NotRunning);
        state.store(SessionState::Running);
        assert!(state.transition(SessionState::Running, SessionState::Ending).is_ok());
        assert_eq!(state.load(), SessionState::Ending);
        assert!(state.transition(SessionState::Ending, SessionState::NotRunning).is_ok());
        assert_eq!(state.load(), SessionState::NotRunning);
    }

    #[test]
    fn test_invalid_transition_reports_actual() {
        let state = StateCell::new();
        assert_eq!(
            state.transition(SessionState::Running, SessionState::Ending),
            Err(SessionState::NotRunning)
        );
    }
}

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;

use crate::error::{AdmissionRejected, LoopError};

/// Lifecycle state of an event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
    /// Terminal.
    Stopped,
}

/// Shared control block: the loop state, the catch-up flag and the admission
/// gate built on them.
///
/// State changes are compare-and-set updates on a watch cell, so producers
/// read a consistent snapshot and the coordinator is woken on every change.
/// Pausing does not touch the catch-up flag; the two are independent.
#[derive(Debug)]
pub(crate) struct LoopControl {
    state: watch::Sender<LoopState>,
    catching_up: AtomicBool,
    catch_up_cycles: AtomicU64,
}

impl LoopControl {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(LoopState::Running);
        Self {
            state,
            catching_up: AtomicBool::new(false),
            catch_up_cycles: AtomicU64::new(0),
        }
    }

    pub(crate) fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    fn transition(&self, from: LoopState, to: LoopState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Running → Paused. Returns false if the loop was not running.
    pub(crate) fn pause(&self) -> bool {
        self.transition(LoopState::Running, LoopState::Paused)
    }

    /// Paused → Running. Returns false if the loop was not paused.
    pub(crate) fn unpause(&self) -> bool {
        self.transition(LoopState::Paused, LoopState::Running)
    }

    /// Any → Stopped. Returns false if already stopped.
    pub(crate) fn stop(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == LoopState::Stopped {
                false
            } else {
                *state = LoopState::Stopped;
                true
            }
        })
    }

    pub(crate) fn is_catching_up(&self) -> bool {
        self.catching_up.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_catch_up(&self) {
        self.catching_up.store(true, Ordering::SeqCst);
    }

    pub(crate) fn end_catch_up(&self) {
        self.catching_up.store(false, Ordering::SeqCst);
        self.catch_up_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn catch_up_cycles(&self) -> u64 {
        self.catch_up_cycles.load(Ordering::Relaxed)
    }

    /// Gate applied before handler resolution. Paused is checked first.
    pub(crate) fn admit(&self) -> Result<(), LoopError> {
        match self.state() {
            LoopState::Paused => Err(AdmissionRejected::Paused.into()),
            LoopState::Stopped => Err(LoopError::Stopped),
            LoopState::Running if self.is_catching_up() => {
                Err(AdmissionRejected::CatchingUp.into())
            }
            LoopState::Running => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_and_unpause_are_idempotent() {
        let control = LoopControl::new();
        assert!(control.pause());
        assert!(!control.pause());
        assert_eq!(control.state(), LoopState::Paused);

        assert!(control.unpause());
        assert!(!control.unpause());
        assert_eq!(control.state(), LoopState::Running);
    }

    #[test]
    fn stop_is_terminal() {
        let control = LoopControl::new();
        assert!(control.pause());
        assert!(control.stop());
        assert!(!control.stop());
        assert!(!control.unpause());
        assert!(!control.pause());
        assert_eq!(control.state(), LoopState::Stopped);
    }

    #[test]
    fn pause_does_not_mark_catch_up() {
        let control = LoopControl::new();
        control.pause();
        assert!(!control.is_catching_up());
    }

    #[test]
    fn admission_follows_state() {
        let control = LoopControl::new();
        assert!(control.admit().is_ok());

        control.begin_catch_up();
        assert!(matches!(
            control.admit(),
            Err(LoopError::Rejected(AdmissionRejected::CatchingUp))
        ));

        control.pause();
        assert!(matches!(
            control.admit(),
            Err(LoopError::Rejected(AdmissionRejected::Paused))
        ));

        control.unpause();
        control.end_catch_up();
        assert!(control.admit().is_ok());
        assert_eq!(control.catch_up_cycles(), 1);

        control.stop();
        assert!(matches!(control.admit(), Err(LoopError::Stopped)));
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let control = LoopControl::new();
        let mut rx = control.subscribe();

        control.pause();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), LoopState::Paused);

        control.stop();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), LoopState::Stopped);
    }
}

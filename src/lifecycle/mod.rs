//! Component lifecycle state machine.

use crate::error::{LifecycleError, S3Error};
use parking_lot::RwLock;
use std::fmt;

/// Lifecycle state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Constructed, never started.
    Initialized,
    /// Running.
    Started,
    /// Stopped; may be started again.
    Stopped,
    /// Closed; terminal.
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Initialized => "INITIALIZED",
            LifecycleState::Started => "STARTED",
            LifecycleState::Stopped => "STOPPED",
            LifecycleState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Thread-safe lifecycle tracker.
///
/// Each `move_to_*` method returns `Ok(true)` when the transition happened,
/// `Ok(false)` when the component was already in the target state and
/// `Err` when the transition is not allowed.
#[derive(Debug)]
pub struct Lifecycle {
    state: RwLock<LifecycleState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Create a tracker in the `Initialized` state.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LifecycleState::Initialized),
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Whether the component is closed.
    pub fn is_closed(&self) -> bool {
        self.state() == LifecycleState::Closed
    }

    /// Move to `Started`; allowed from `Initialized` and `Stopped`.
    pub fn move_to_started(&self) -> Result<bool, S3Error> {
        let mut state = self.state.write();
        match *state {
            LifecycleState::Started => Ok(false),
            LifecycleState::Initialized | LifecycleState::Stopped => {
                *state = LifecycleState::Started;
                Ok(true)
            }
            LifecycleState::Closed => Err(illegal("start", *state)),
        }
    }

    /// Move to `Stopped`; a no-op unless `Started`, refused once `Closed`.
    pub fn move_to_stopped(&self) -> Result<bool, S3Error> {
        let mut state = self.state.write();
        match *state {
            LifecycleState::Initialized | LifecycleState::Stopped => Ok(false),
            LifecycleState::Started => {
                *state = LifecycleState::Stopped;
                Ok(true)
            }
            LifecycleState::Closed => Err(illegal("stop", *state)),
        }
    }

    /// Move to `Closed` from any state.
    ///
    /// Returns the state the component was in, or `None` if it was already
    /// closed.
    pub fn move_to_closed(&self) -> Option<LifecycleState> {
        let mut state = self.state.write();
        if *state == LifecycleState::Closed {
            return None;
        }
        let previous = *state;
        *state = LifecycleState::Closed;
        Some(previous)
    }
}

fn illegal(action: &'static str, state: LifecycleState) -> S3Error {
    S3Error::Lifecycle(LifecycleError::IllegalTransition {
        action,
        state: state.to_string(),
    })
}

//! Process-wide backend connectivity status.
//!
//! One [`ConnectivityStore`] exists per application. It is written by the
//! wake coordinator and by the API client's terminal failure path, and read
//! by any number of UI observers (a global "waking up the server" overlay,
//! for instance).

use std::cell::RefCell;
use std::rc::Rc;

use super::listeners::{Listeners, Subscription};

pub const WAKING_MESSAGE: &str =
    "Server is waking up (free tier). First load may take ~10-30 seconds...";
pub const STILL_WAKING_MESSAGE: &str = "Still waking up...";
pub const UNAVAILABLE_MESSAGE: &str = "Backend is currently unavailable. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiStatus {
    #[default]
    Ok,
    Waking,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectivityState {
    pub status: ApiStatus,
    pub message: String,
}

impl ConnectivityState {
    pub fn is_ok(&self) -> bool {
        self.status == ApiStatus::Ok
    }

    pub fn is_waking(&self) -> bool {
        self.status == ApiStatus::Waking
    }

    pub fn is_down(&self) -> bool {
        self.status == ApiStatus::Down
    }
}

/// Partial update for [`ConnectivityStore::set`]; `None` fields keep their
/// current value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectivityPatch {
    pub status: Option<ApiStatus>,
    pub message: Option<String>,
}

impl ConnectivityPatch {
    pub fn ok() -> Self {
        Self {
            status: Some(ApiStatus::Ok),
            message: Some(String::new()),
        }
    }

    pub fn waking(message: impl Into<String>) -> Self {
        Self {
            status: Some(ApiStatus::Waking),
            message: Some(message.into()),
        }
    }

    pub fn down(message: impl Into<String>) -> Self {
        Self {
            status: Some(ApiStatus::Down),
            message: Some(message.into()),
        }
    }

    pub fn with_status(mut self, status: ApiStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Observable `{status, message}` cell. Cloning yields another handle to the
/// same state.
#[derive(Clone, Default)]
pub struct ConnectivityStore {
    state: Rc<RefCell<ConnectivityState>>,
    listeners: Listeners<ConnectivityState>,
}

impl ConnectivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ConnectivityState {
        self.state.borrow().clone()
    }

    /// Shallow-merge `patch` into the current state, then notify every
    /// subscriber synchronously with the merged value.
    pub fn set(&self, patch: ConnectivityPatch) {
        let next = {
            let mut state = self.state.borrow_mut();
            if let Some(status) = patch.status {
                state.status = status;
            }
            if let Some(message) = patch.message {
                state.message = message;
            }
            state.clone()
        };
        self.listeners.notify(&next);
    }

    /// Observe future changes. The callback is not invoked with the current
    /// value; read [`get`](Self::get) for that.
    pub fn subscribe(&self, callback: impl Fn(&ConnectivityState) + 'static) -> Subscription {
        self.listeners.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for ConnectivityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityStore")
            .field("state", &*self.state.borrow())
            .field("subscribers", &self.listeners.len())
            .finish()
    }
}

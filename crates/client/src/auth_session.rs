//! Server-verified authentication session.
//!
//! The session itself is an httpOnly cookie the client cannot read, so the
//! only way to know who is signed in is to ask `GET /api/me`. The
//! [`SessionController`] keeps the answer, re-asks after every
//! auth-affecting operation, and makes sure a slow or superseded answer
//! never overwrites a newer one or lands after teardown.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use city_insight_shared::{ApiError, LoginRequest, MeResponse, SessionUser};

use crate::api_client::ApiClient;
use crate::stores::{Listeners, Subscription};

pub const ME_PATH: &str = "/api/me";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";

/// What consumers see: `{user, loading}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<SessionUser>,
    /// True until the first identity check has resolved.
    pub loading: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Bootstrapping,
    SignedOut,
    SignedIn,
}

impl SessionSnapshot {
    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Bootstrapping
        } else if self.user.is_some() {
            SessionPhase::SignedIn
        } else {
            SessionPhase::SignedOut
        }
    }
}

struct SessionState {
    snapshot: RefCell<SessionSnapshot>,
    listeners: Listeners<SessionSnapshot>,
    /// Bumped by every operation that will write the user.
    generation: Cell<u64>,
    torn_down: Cell<bool>,
    bootstrap_started: Cell<bool>,
}

/// Permission for one operation to write the user. It lapses when a newer
/// operation is issued or the controller is torn down.
struct Ticket {
    generation: u64,
    state: Rc<SessionState>,
}

impl Ticket {
    fn is_current(&self) -> bool {
        !self.state.torn_down.get() && self.state.generation.get() == self.generation
    }
}

/// Single source of truth for "who is logged in". Cloning yields another
/// handle to the same session.
#[derive(Clone)]
pub struct SessionController {
    api: ApiClient,
    state: Rc<SessionState>,
}

impl SessionController {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Rc::new(SessionState {
                snapshot: RefCell::new(SessionSnapshot::default()),
                listeners: Listeners::new(),
                generation: Cell::new(0),
                torn_down: Cell::new(false),
                bootstrap_started: Cell::new(false),
            }),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot.borrow().clone()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.state.snapshot.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.snapshot.borrow().loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.snapshot.borrow().user.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.snapshot.borrow().phase()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.torn_down.get()
    }

    /// Observe snapshot changes. Not invoked with the current value.
    pub fn subscribe(&self, callback: impl Fn(&SessionSnapshot) + 'static) -> Subscription {
        self.state.listeners.subscribe(callback)
    }

    /// Run the initial identity check once, then clear `loading`.
    ///
    /// Never fails: an unverifiable session has already been treated as
    /// signed out by the check itself. Later calls return immediately.
    pub async fn bootstrap(&self) {
        if self.state.bootstrap_started.replace(true) {
            return;
        }

        if let Err(err) = self.refresh().await {
            crate::log_warn!("session bootstrap could not verify identity, signed out: {}", err);
        }

        if !self.state.torn_down.get() {
            self.update(|snapshot| snapshot.loading = false);
        }
    }

    /// Ask the server who is signed in.
    ///
    /// `200` sets the returned user (possibly none) and `401` means signed
    /// out. Any other failure also signs out, then returns the error so a
    /// caller can surface it.
    pub async fn refresh(&self) -> Result<Option<SessionUser>, ApiError> {
        let ticket = self.issue_ticket();

        match self.api.get_json::<MeResponse>(ME_PATH).await {
            Ok(me) => {
                self.commit_user(&ticket, me.user.clone());
                Ok(me.user)
            }
            Err(err) if err.is_unauthorized() => {
                self.commit_user(&ticket, None);
                Ok(None)
            }
            Err(err) => {
                self.commit_user(&ticket, None);
                Err(err)
            }
        }
    }

    /// Exchange an external ID token for a server session, then reload the
    /// user from `/api/me`. Returns the exchange response untouched; any user
    /// data in it is ignored.
    pub async fn login(&self, id_token: &str) -> Result<serde_json::Value, ApiError> {
        let request = LoginRequest {
            id_token: id_token.to_string(),
        };
        let response: serde_json::Value = self.api.post_json(LOGIN_PATH, &request).await?;

        self.refresh().await?;

        Ok(response)
    }

    /// Invalidate the server session and sign out locally, even if the
    /// server call fails.
    ///
    /// Checks issued before the logout are discarded. The local sign-out is
    /// applied unless the controller was torn down, even if a newer check
    /// has already resolved.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.issue_ticket();
        let result = self.api.post(LOGOUT_PATH).await.map(|_| ());
        if !self.state.torn_down.get() {
            self.update(|snapshot| snapshot.user = None);
        }
        result
    }

    /// Stop all further writes. In-flight operations still complete, but
    /// their results are dropped.
    pub fn teardown(&self) {
        self.state.torn_down.set(true);
    }

    fn issue_ticket(&self) -> Ticket {
        let generation = self.state.generation.get() + 1;
        self.state.generation.set(generation);
        Ticket {
            generation,
            state: Rc::clone(&self.state),
        }
    }

    fn commit_user(&self, ticket: &Ticket, user: Option<SessionUser>) {
        if !ticket.is_current() {
            crate::log_debug!("discarding superseded identity result");
            return;
        }
        self.update(|snapshot| snapshot.user = user);
    }

    fn update(&self, apply: impl FnOnce(&mut SessionSnapshot)) {
        let next = {
            let mut snapshot = self.state.snapshot.borrow_mut();
            apply(&mut snapshot);
            snapshot.clone()
        };
        self.state.listeners.notify(&next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_snapshot() {
        let mut snapshot = SessionSnapshot::default();
        assert_eq!(snapshot.phase(), SessionPhase::Bootstrapping);

        snapshot.loading = false;
        assert_eq!(snapshot.phase(), SessionPhase::SignedOut);

        snapshot.user = Some(serde_json::from_str(r#"{"id":"u1"}"#).unwrap());
        assert_eq!(snapshot.phase(), SessionPhase::SignedIn);
    }
}

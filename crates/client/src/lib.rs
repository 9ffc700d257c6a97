//! City Insight Client - connectivity and session layer
//!
//! This crate is what the City Insight pages talk to the backend through:
//! an API client that wakes a sleeping (free-tier) backend and replays the
//! failed request once, a global connectivity status the UI can observe,
//! and a server-verified login session.
//!
//! The core is framework-free and single-threaded (`Rc`, `!Send` futures),
//! matching the browser event loop. Dioxus bindings live behind the `ui`
//! feature (enabled by `web` and `desktop`).

pub mod logging;

pub mod api_client;
pub mod auth_session;
pub mod config;
pub mod health;
pub mod platform;
pub mod stores;
pub mod wake;

#[cfg(feature = "ui")]
pub mod provider;

pub use api_client::{looks_like_cold_start, ApiClient, ApiRequest, ApiResponse};
pub use auth_session::{SessionController, SessionPhase, SessionSnapshot};
pub use config::ClientConfig;
pub use health::{HealthProbe, HttpHealthProbe};
pub use platform::Spawner;
pub use stores::{ApiStatus, ConnectivityPatch, ConnectivityState, ConnectivityStore, Subscription};
pub use wake::{WakeCoordinator, WakePolicy};

pub use city_insight_shared::{ApiError, SessionUser};

#[cfg(feature = "ui")]
pub use provider::{use_auth, use_connectivity, ApiProvider, AuthContext, AuthProvider};

//! Dioxus bindings for the API client and session.
//!
//! ```rust,ignore
//! rsx! {
//!     ApiProvider {
//!         AuthProvider {
//!             Router::<Route> {}
//!         }
//!     }
//! }
//! ```

use std::rc::Rc;

use dioxus::prelude::*;
use city_insight_shared::{ApiError, SessionUser};
use futures_util::future::LocalBoxFuture;

use crate::api_client::ApiClient;
use crate::auth_session::{SessionController, SessionSnapshot};
use crate::config::ClientConfig;
use crate::platform::Spawner;
use crate::stores::{ConnectivityState, ConnectivityStore};

/// Session context provided by [`AuthProvider`].
#[derive(Clone)]
pub struct AuthContext {
    controller: SessionController,
    snapshot: Signal<SessionSnapshot>,
}

impl AuthContext {
    /// The signed-in user; reading subscribes the component.
    pub fn user(&self) -> Option<SessionUser> {
        self.snapshot.read().user.clone()
    }

    pub fn loading(&self) -> bool {
        self.snapshot.read().loading
    }

    pub fn snapshot(&self) -> Signal<SessionSnapshot> {
        self.snapshot
    }

    pub async fn login(&self, id_token: &str) -> Result<serde_json::Value, ApiError> {
        self.controller.login(id_token).await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.controller.logout().await
    }

    pub async fn refresh(&self) -> Result<Option<SessionUser>, ApiError> {
        self.controller.refresh().await
    }
}

/// Owns the application's single [`ApiClient`] and [`ConnectivityStore`].
///
/// Wake attempts run on the Dioxus task queue with [`spawn_forever`], so
/// they outlive the component whose request started them. If the HTTP
/// client cannot be built, the error is shown instead of the children.
#[component]
pub fn ApiProvider(children: Element) -> Element {
    let failure = use_hook(|| {
        let config = ClientConfig::from_env().unwrap_or_else(|e| {
            crate::log_error!("invalid client configuration, using defaults: {:#}", e);
            ClientConfig::default()
        });
        let spawner: Spawner = Rc::new(|task: LocalBoxFuture<'static, ()>| {
            let _ = spawn_forever(task);
        });

        match ApiClient::new(&config, ConnectivityStore::new()) {
            Ok(api) => {
                provide_context(api.with_spawner(spawner));
                None
            }
            Err(e) => {
                crate::log_error!("API client unavailable: {:#}", e);
                Some(format!("{e:#}"))
            }
        }
    });

    if let Some(message) = failure {
        return rsx! {
            div { class: "api-client-error", "Unable to start the API client: {message}" }
        };
    }

    children
}

/// Mounts a [`SessionController`], bootstraps it, and tears it down on
/// unmount. Must be inside an [`ApiProvider`].
#[component]
pub fn AuthProvider(children: Element) -> Element {
    let api = use_context::<ApiClient>();
    let controller = use_hook(|| SessionController::new(api));
    let snapshot = use_signal(|| controller.snapshot());

    use_hook(|| {
        let subscription = controller.subscribe(move |next| {
            let mut snapshot = snapshot;
            snapshot.set(next.clone());
        });
        Rc::new(subscription)
    });

    use_hook(|| {
        let controller = controller.clone();
        spawn(async move { controller.bootstrap().await });
    });

    {
        let controller = controller.clone();
        use_drop(move || controller.teardown());
    }

    use_context_provider(|| AuthContext {
        controller,
        snapshot,
    });

    children
}

/// Session context. Panics outside an [`AuthProvider`], like any missing
/// context.
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>()
}

/// Current connectivity status, kept in sync with the store.
pub fn use_connectivity() -> Signal<ConnectivityState> {
    let api = use_context::<ApiClient>();
    let state = use_signal(|| api.status().get());

    use_hook(|| {
        let subscription = api.status().subscribe(move |next| {
            let mut state = state;
            state.set(next.clone());
        });
        Rc::new(subscription)
    });

    state
}

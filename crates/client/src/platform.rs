//! Clock, timer and task primitives for the wake loop.
//!
//! - Web: `gloo-timers` for sleeping, `chrono` for wall-clock time
//!   (`std::time::Instant` is unavailable on `wasm32-unknown-unknown`),
//!   `wasm-bindgen-futures` for detached tasks
//! - Desktop: `tokio::time`, which tests can pause and advance, and
//!   `tokio::task::spawn_local` (callers must be inside a `LocalSet`)

use std::rc::Rc;
use std::time::Duration;

use futures_util::future::LocalBoxFuture;

/// Runs a `!Send` future to completion on the current thread, detached from
/// whoever started it.
pub type Spawner = Rc<dyn Fn(LocalBoxFuture<'static, ()>)>;

/// Spawner for the current platform's local executor.
pub fn default_spawner() -> Spawner {
    Rc::new(spawn_detached)
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_detached(task: LocalBoxFuture<'static, ()>) {
    drop(tokio::task::spawn_local(task));
}

#[cfg(target_arch = "wasm32")]
fn spawn_detached(task: LocalBoxFuture<'static, ()>) {
    wasm_bindgen_futures::spawn_local(task);
}

#[cfg(not(target_arch = "wasm32"))]
pub use tokio::time::Instant;

#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(target_arch = "wasm32")]
pub async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await;
}

/// Wall-clock instant for the browser.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(chrono::DateTime<chrono::Utc>);

#[cfg(target_arch = "wasm32")]
impl Instant {
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    pub fn elapsed(&self) -> Duration {
        (chrono::Utc::now() - self.0).to_std().unwrap_or_default()
    }
}

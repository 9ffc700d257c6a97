//! Wake-up coordination for a backend that sleeps when idle.
//!
//! When requests start failing in a way that looks like a cold start, the
//! API client asks the [`WakeCoordinator`] to poll the liveness endpoint with
//! exponential backoff until it answers or the time budget runs out. Only one
//! polling loop runs at a time: callers that arrive while an attempt is in
//! flight await that same attempt and receive the same outcome.
//!
//! The loop runs as a detached task. A caller that stops waiting (its view
//! unmounted, its own timeout fired) does not cancel it, so the connectivity
//! status still reaches `ok` or `down`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures_util::future::{FutureExt, LocalBoxFuture, Shared};

use crate::health::HealthProbe;
use crate::platform::{self, Instant, Spawner};
use crate::stores::{ConnectivityPatch, ConnectivityStore};
use crate::stores::{STILL_WAKING_MESSAGE, UNAVAILABLE_MESSAGE, WAKING_MESSAGE};

type WakeLoop = LocalBoxFuture<'static, bool>;

/// Backoff schedule between failed liveness checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakePolicy {
    /// Delay after the first failed check, in milliseconds
    pub initial_delay_ms: u64,
    /// Factor applied to the delay after every failed check
    pub backoff_multiplier: f64,
    /// Ceiling for the delay, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for WakePolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            backoff_multiplier: 1.7,
            max_delay_ms: 8000,
        }
    }
}

impl WakePolicy {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms.min(self.max_delay_ms))
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay to use after `current`, rounded to whole milliseconds and capped.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next = (current.as_millis() as f64 * self.backoff_multiplier).round() as u64;
        Duration::from_millis(next.min(self.max_delay_ms))
    }

    /// Delay after the `attempt`-th failed check (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        (0..attempt).fold(self.initial_delay(), |delay, _| self.next_delay(delay))
    }
}

struct ActiveAttempt {
    id: u64,
    future: Shared<WakeLoop>,
}

#[derive(Default)]
struct AttemptSlot {
    next_id: Cell<u64>,
    active: RefCell<Option<ActiveAttempt>>,
}

/// Deduplicating driver for the wake loop. Cloning yields another handle to
/// the same coordinator.
#[derive(Clone)]
pub struct WakeCoordinator {
    health: Rc<dyn HealthProbe>,
    store: ConnectivityStore,
    policy: WakePolicy,
    spawner: Spawner,
    slot: Rc<AttemptSlot>,
}

impl WakeCoordinator {
    pub fn new(health: Rc<dyn HealthProbe>, store: ConnectivityStore, policy: WakePolicy) -> Self {
        Self {
            health,
            store,
            policy,
            spawner: platform::default_spawner(),
            slot: Rc::new(AttemptSlot::default()),
        }
    }

    /// Run wake loops on a different local executor (a UI framework's task
    /// queue, for instance).
    pub fn with_spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn policy(&self) -> WakePolicy {
        self.policy
    }

    /// Whether a wake attempt is currently in flight.
    pub fn is_waking(&self) -> bool {
        self.slot.active.borrow().is_some()
    }

    /// Poll the backend until it is healthy (`true`) or `max_wait` has
    /// elapsed (`false`). Joins the in-flight attempt if there is one, in
    /// which case that attempt's budget applies.
    ///
    /// Dropping the returned future only stops this caller from waiting.
    pub async fn wake(&self, max_wait: Duration) -> bool {
        self.join_or_start(max_wait).await
    }

    // Check-and-set on the slot happens without yielding, so two callers can
    // never both observe "no attempt" and start separate loops.
    fn join_or_start(&self, max_wait: Duration) -> Shared<WakeLoop> {
        let future = {
            let mut active = self.slot.active.borrow_mut();

            if let Some(attempt) = active.as_ref() {
                crate::log_debug!("joining in-flight wake attempt");
                return attempt.future.clone();
            }

            let id = self.slot.next_id.get();
            self.slot.next_id.set(id + 1);

            let release = Release {
                id,
                slot: Rc::downgrade(&self.slot),
                store: self.store.clone(),
                finished: false,
            };
            let future = run_wake_loop(
                Rc::clone(&self.health),
                self.store.clone(),
                self.policy,
                max_wait,
                release,
            )
            .boxed_local()
            .shared();

            *active = Some(ActiveAttempt {
                id,
                future: future.clone(),
            });
            future
        };

        let driver = future.clone();
        (self.spawner)(
            async move {
                driver.await;
            }
            .boxed_local(),
        );
        future
    }
}

/// Clears the attempt slot when the loop ends, however it ends.
///
/// The loop only stops early if its task is dropped by the executor (or
/// panics); the status is then moved off `Waking` so the store never claims
/// a wake-up that nobody is running.
struct Release {
    id: u64,
    slot: Weak<AttemptSlot>,
    store: ConnectivityStore,
    finished: bool,
}

impl Release {
    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.upgrade() {
            // Taken out before dropping so the slot is not borrowed while the
            // handle goes away.
            let cleared = match slot.active.try_borrow_mut() {
                Ok(mut active) if active.as_ref().is_some_and(|a| a.id == self.id) => {
                    active.take()
                }
                _ => None,
            };
            drop(cleared);
        }

        if !self.finished {
            crate::log_warn!("wake attempt stopped before completion");
            if self.store.get().is_waking() {
                self.store.set(ConnectivityPatch::down(UNAVAILABLE_MESSAGE));
            }
        }
    }
}

async fn run_wake_loop(
    health: Rc<dyn HealthProbe>,
    store: ConnectivityStore,
    policy: WakePolicy,
    max_wait: Duration,
    mut release: Release,
) -> bool {
    let started = Instant::now();
    crate::log_info!("backend looks asleep, waking it (budget {:?})", max_wait);
    store.set(ConnectivityPatch::waking(WAKING_MESSAGE));

    let mut delay = policy.initial_delay();
    let mut checks = 0u32;

    while started.elapsed() < max_wait {
        checks += 1;
        if health.check().await {
            crate::log_info!(
                "backend awake after {} check(s) in {:?}",
                checks,
                started.elapsed()
            );
            store.set(ConnectivityPatch::ok());
            release.finish();
            return true;
        }

        platform::sleep(delay).await;
        delay = policy.next_delay(delay);
        store.set(ConnectivityPatch::waking(STILL_WAKING_MESSAGE));
    }

    crate::log_warn!(
        "backend still unavailable after {} check(s) in {:?}",
        checks,
        started.elapsed()
    );
    store.set(ConnectivityPatch::down(UNAVAILABLE_MESSAGE));
    release.finish();
    false
}

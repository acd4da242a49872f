//! Inactivity session monitor.
//!
//! Tracks a last-activity mark against a configured timeout, clears the
//! session records from the store on expiry, and broadcasts a logout
//! signal exactly once per expiry. There is no automatic way back to
//! `Active` from `Expired`; only an explicit `init()` rearms the session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::keys;
use crate::medium::KeyValueMedium;
use crate::store::SecureStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Expired,
}

struct MonitorState {
    phase: SessionPhase,
    last_activity: Instant,
    expiries_signaled: u64,
}

/// Watches inactivity and forces a logout signal when the timeout elapses
/// without an `update_activity` call. Shares the store with the rest of
/// the application behind a mutex; its own persistence is limited to two
/// timestamp records and is best-effort.
pub struct SessionMonitor<M: KeyValueMedium> {
    store: Arc<Mutex<SecureStore<M>>>,
    timeout: Duration,
    state: Mutex<MonitorState>,
    expiry_tx: watch::Sender<u64>,
}

impl<M: KeyValueMedium> SessionMonitor<M> {
    pub fn new(store: Arc<Mutex<SecureStore<M>>>, timeout: Duration) -> Self {
        let (expiry_tx, _) = watch::channel(0);
        Self {
            store,
            timeout,
            state: Mutex::new(MonitorState {
                phase: SessionPhase::Expired,
                last_activity: Instant::now(),
                expiries_signaled: 0,
            }),
            expiry_tx,
        }
    }

    /// Arms (or rearms, after a logout flow) the session: stamps activity,
    /// persists the start and last-activity marks, and enters `Active`.
    pub fn init(&self) {
        {
            let mut state = self.state.lock();
            state.phase = SessionPhase::Active;
            state.last_activity = Instant::now();
        }
        self.persist_mark(keys::SESSION_STARTED_AT);
        self.persist_mark(keys::SESSION_LAST_ACTIVITY);
        info!(timeout_secs = self.timeout.as_secs(), "session armed");
    }

    /// Called on every observed user interaction. Restamps the activity
    /// mark while `Active`; ignored once `Expired` (only `init` rearms).
    pub fn update_activity(&self) {
        {
            let mut state = self.state.lock();
            if state.phase == SessionPhase::Expired {
                debug!("activity after expiry ignored");
                return;
            }
            state.last_activity = Instant::now();
        }
        self.persist_mark(keys::SESSION_LAST_ACTIVITY);
    }

    pub fn is_session_valid(&self) -> bool {
        let state = self.state.lock();
        state.phase == SessionPhase::Active && state.last_activity.elapsed() < self.timeout
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.lock().phase
    }

    /// Number of expiry signals broadcast so far.
    pub fn expiries_signaled(&self) -> u64 {
        self.state.lock().expiries_signaled
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll body; `check_at` exists so tests can drive simulated time.
    pub fn check_now(&self) -> SessionPhase {
        self.check_at(Instant::now())
    }

    /// Runs the expiry transition at most once per armed session: clears
    /// the session records (best-effort, the in-memory state transitions
    /// regardless) and broadcasts the logout signal.
    pub fn check_at(&self, now: Instant) -> SessionPhase {
        let generation = {
            let mut state = self.state.lock();
            if state.phase == SessionPhase::Expired {
                return SessionPhase::Expired;
            }
            let idle = now.saturating_duration_since(state.last_activity);
            if idle < self.timeout {
                return SessionPhase::Active;
            }
            state.phase = SessionPhase::Expired;
            state.expiries_signaled += 1;
            state.expiries_signaled
        };

        info!("session expired; clearing session records");
        {
            let mut store = self.store.lock();
            for key in keys::SESSION_KEYS {
                if let Err(err) = store.remove_item(key) {
                    warn!(key, error = %err, "failed to clear session record");
                }
            }
        }
        let _ = self.expiry_tx.send(generation);
        SessionPhase::Expired
    }

    /// Subscription handle for the logout broadcast; the observed value is
    /// the number of expiries so far. Hosts wire this up at startup.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.expiry_tx.subscribe()
    }

    fn persist_mark(&self, key: &str) {
        let mut store = self.store.lock();
        if let Err(err) = store.set_item(key, &Utc::now()) {
            warn!(key, error = %err, "failed to persist session timestamp");
        }
    }
}

/// Control handle for the polling loop.
pub struct SessionLoopHandle {
    /// Notify to run a check immediately instead of waiting out the interval.
    pub wake: Arc<Notify>,
    /// Send `true` to shut down.
    pub shutdown_tx: watch::Sender<bool>,
}

/// Spawns the periodic expiry check as a tokio task. `on_expiry` runs
/// after each expiry transition the loop observes.
pub fn spawn_session_loop<M, F>(
    monitor: Arc<SessionMonitor<M>>,
    interval: Duration,
    on_expiry: F,
) -> (JoinHandle<()>, SessionLoopHandle)
where
    M: KeyValueMedium + Send + 'static,
    F: Fn() + Send + Sync + 'static,
{
    let wake = Arc::new(Notify::new());
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let wake_clone = wake.clone();

    let handle = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "session loop started");
        let mut last_seen = monitor.expiries_signaled();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = wake_clone.notified() => {
                    debug!("session loop woken early");
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("session loop shutting down");
                        return;
                    }
                }
            }

            // Check shutdown again after wakeup.
            if *shutdown_rx.borrow() {
                return;
            }

            monitor.check_now();
            let seen = monitor.expiries_signaled();
            if seen > last_seen {
                last_seen = seen;
                on_expiry();
            }
        }
    });

    (handle, SessionLoopHandle { wake, shutdown_tx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use crate::medium::MemoryMedium;
    use serde_json::json;

    fn monitor_with_timeout(timeout: Duration) -> Arc<SessionMonitor<MemoryMedium>> {
        let config = VaultConfig::with_passphrase("session-test-passphrase");
        let store = SecureStore::open(MemoryMedium::new(), &config).unwrap();
        Arc::new(SessionMonitor::new(Arc::new(Mutex::new(store)), timeout))
    }

    #[test]
    fn init_makes_the_session_valid() {
        let monitor = monitor_with_timeout(Duration::from_secs(60));
        assert!(!monitor.is_session_valid());
        monitor.init();
        assert!(monitor.is_session_valid());
        assert_eq!(monitor.phase(), SessionPhase::Active);
    }

    #[test]
    fn expiry_fires_exactly_once_and_clears_session_records() {
        let timeout = Duration::from_millis(1000);
        let monitor = monitor_with_timeout(timeout);
        monitor.init();
        {
            let mut store = monitor.store.lock();
            store.set_item(keys::USER_PROFILE, &json!({"id": "u1"})).unwrap();
            store.set_item(keys::THEME, &json!("dark")).unwrap();
        }

        let later = Instant::now() + timeout + Duration::from_millis(10);
        assert_eq!(monitor.check_at(later), SessionPhase::Expired);
        assert_eq!(monitor.check_at(later), SessionPhase::Expired);
        assert_eq!(monitor.expiries_signaled(), 1);
        assert!(!monitor.is_session_valid());

        let store = monitor.store.lock();
        assert!(!store.has_item(keys::USER_PROFILE));
        // Non-session records survive a logout.
        assert!(store.has_item(keys::THEME));
    }

    #[test]
    fn activity_defers_expiry() {
        let timeout = Duration::from_millis(1000);
        let monitor = monitor_with_timeout(timeout);
        monitor.init();

        std::thread::sleep(Duration::from_millis(50));
        monitor.update_activity();
        let almost = Instant::now() + timeout - Duration::from_millis(10);
        assert_eq!(monitor.check_at(almost), SessionPhase::Active);
        assert_eq!(monitor.expiries_signaled(), 0);
    }

    #[test]
    fn update_activity_does_not_resurrect_an_expired_session() {
        let timeout = Duration::from_millis(100);
        let monitor = monitor_with_timeout(timeout);
        monitor.init();

        let later = Instant::now() + timeout + Duration::from_millis(10);
        monitor.check_at(later);
        monitor.update_activity();
        assert!(!monitor.is_session_valid());

        monitor.init();
        assert!(monitor.is_session_valid());

        let again = Instant::now() + timeout + Duration::from_millis(10);
        monitor.check_at(again);
        assert_eq!(monitor.expiries_signaled(), 2);
    }

    #[test]
    fn init_persists_the_session_marks() {
        let monitor = monitor_with_timeout(Duration::from_secs(60));
        monitor.init();
        let store = monitor.store.lock();
        assert!(store.has_item(keys::SESSION_STARTED_AT));
        assert!(store.has_item(keys::SESSION_LAST_ACTIVITY));
    }

    #[tokio::test]
    async fn subscriber_observes_the_expiry_broadcast() {
        let timeout = Duration::from_millis(50);
        let monitor = monitor_with_timeout(timeout);
        monitor.init();
        let mut rx = monitor.subscribe();
        assert_eq!(*rx.borrow(), 0);

        let later = Instant::now() + timeout + Duration::from_millis(10);
        monitor.check_at(later);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }

    #[tokio::test]
    async fn session_loop_invokes_the_expiry_callback() {
        let timeout = Duration::from_millis(50);
        let monitor = monitor_with_timeout(timeout);
        monitor.init();

        let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let (task, handle) = spawn_session_loop(monitor.clone(), Duration::from_millis(20), move || {
            fired_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(monitor.phase(), SessionPhase::Expired);

        handle.shutdown_tx.send(true).unwrap();
        let _ = task.await;
    }
}

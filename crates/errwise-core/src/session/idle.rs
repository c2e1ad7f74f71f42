//! Idle-session timeout monitor.
//!
//! Watches a last-activity clock on a fixed interval and walks an
//! unattended session through Active → Warned → Expired, independent of
//! token lifetime. Activity is injected through [`IdleMonitor::record_activity`];
//! production binds it to user input events, tests call it directly.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Idle policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct IdleConfig {
    /// Idle time after which the session is forcibly ended.
    pub timeout: Duration,
    /// Window before expiry during which the warning fires.
    pub warning_window: Duration,
    /// Cadence of the periodic idle check. Elapsed time is evaluated here,
    /// not per activity event, to bound overhead.
    pub check_interval: Duration,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30 * 60),
            warning_window: Duration::from_secs(5 * 60),
            check_interval: Duration::from_secs(60),
        }
    }
}

impl IdleConfig {
    /// Rejects windows that cannot fit.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.warning_window < self.timeout,
            "idle warning window ({:?}) must be shorter than the idle timeout ({:?})",
            self.warning_window,
            self.timeout
        );
        anyhow::ensure!(
            !self.check_interval.is_zero(),
            "idle check interval must be non-zero"
        );
        Ok(())
    }
}

/// Where the session stands in the idle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Active,
    Warned,
    Expired,
}

/// Escalations emitted by the monitor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    /// Idle time crossed `timeout - warning_window`. Fired once per quiet
    /// period; activity re-arms it.
    Warned { seconds_remaining: u64 },
    /// Idle time reached `timeout`. The session must end.
    Expired,
}

/// The activity clock: last tracked activity plus the warning flag, folded
/// into the state machine position.
struct Clock {
    last_activity: Instant,
    state: IdleState,
}

/// Periodic idle checker for one session.
///
/// `start` arms it, `stop` (or dropping the receiver) tears it down; it
/// holds no reference to the rest of the session machinery and reports
/// purely through the event channel.
pub struct IdleMonitor {
    config: IdleConfig,
    clock: Arc<Mutex<Clock>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl IdleMonitor {
    pub fn new(config: IdleConfig) -> Self {
        Self {
            config,
            clock: Arc::new(Mutex::new(Clock {
                last_activity: Instant::now(),
                state: IdleState::Active,
            })),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> IdleConfig {
        self.config
    }

    /// Arms the monitor and returns the escalation channel.
    ///
    /// Any previous check loop is torn down first, so a login/logout cycle
    /// never leaks a stale timer.
    pub fn start(&self) -> mpsc::UnboundedReceiver<IdleEvent> {
        self.stop();

        {
            let mut clock = lock(&self.clock);
            clock.last_activity = Instant::now();
            clock.state = IdleState::Active;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let clock = Arc::clone(&self.clock);
        let config = self.config;

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(config.check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let event = {
                    let mut clock = lock(&clock);
                    let idle = clock.last_activity.elapsed();
                    if idle >= config.timeout {
                        clock.state = IdleState::Expired;
                        Some(IdleEvent::Expired)
                    } else if clock.state == IdleState::Active
                        && idle >= config.timeout - config.warning_window
                    {
                        clock.state = IdleState::Warned;
                        let remaining = config.timeout.saturating_sub(idle);
                        Some(IdleEvent::Warned {
                            seconds_remaining: remaining.as_secs(),
                        })
                    } else {
                        None
                    }
                };

                match event {
                    Some(IdleEvent::Expired) => {
                        tracing::info!("idle timeout reached");
                        let _ = tx.send(IdleEvent::Expired);
                        break;
                    }
                    Some(warned) => {
                        tracing::debug!("idle warning window entered");
                        if tx.send(warned).is_err() {
                            break;
                        }
                    }
                    None => {
                        if tx.is_closed() {
                            break;
                        }
                    }
                }
            }
        });

        *lock(&self.task) = Some(handle);
        rx
    }

    /// Tears the monitor down; the check loop dies with it.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
    }

    /// Records a tracked activity event: refreshes the clock and returns a
    /// warned session to Active, restarting the full window.
    ///
    /// Cheap enough to call unconditionally on every event. Expiry is
    /// final until the next `start`.
    pub fn record_activity(&self) {
        let mut clock = lock(&self.clock);
        if clock.state == IdleState::Expired {
            return;
        }
        clock.last_activity = Instant::now();
        clock.state = IdleState::Active;
    }

    pub fn state(&self) -> IdleState {
        lock(&self.clock).state
    }
}

impl Drop for IdleMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

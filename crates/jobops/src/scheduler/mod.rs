//! Daily task scheduler.
//!
//! Runs an async task once per day at a fixed UTC hour on a background
//! thread, with instant cancellation and a manual trigger via broadcast
//! channel. Task failures are logged and never stop the schedule.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors from scheduler configuration.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid hour {0}, expected 0-23")]
    InvalidHour(u32),
}

/// A unit of work the scheduler fires once per day.
#[async_trait]
pub trait ScheduledTask: Send + Sync + 'static {
    /// Name used in log lines.
    fn name(&self) -> &str;

    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

struct RunningScheduler {
    shutdown: Arc<AtomicBool>,
    trigger_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Fires a [`ScheduledTask`] daily at a configured UTC hour.
///
/// `start` has restart semantics: calling it while armed cancels the
/// existing timer first, so a scheduler instance never holds two
/// concurrent timers.
pub struct DailyScheduler {
    task: Arc<dyn ScheduledTask>,
    inner: Mutex<Option<RunningScheduler>>,
    next_run: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl DailyScheduler {
    pub fn new(task: Arc<dyn ScheduledTask>) -> Self {
        Self {
            task,
            inner: Mutex::new(None),
            next_run: Arc::new(Mutex::new(None)),
        }
    }

    /// Arms the scheduler to fire daily at the given UTC hour.
    pub fn start(&self, hour: u32) -> Result<(), SchedulerError> {
        if hour > 23 {
            return Err(SchedulerError::InvalidHour(hour));
        }

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = inner.take() {
            stop_running(running);
        }

        let task = Arc::clone(&self.task);
        let shutdown = Arc::new(AtomicBool::new(false));
        let next_run = Arc::clone(&self.next_run);
        let (trigger_tx, mut trigger_rx) = broadcast::channel(16);

        let thread_shutdown = Arc::clone(&shutdown);
        let handle = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                loop {
                    if thread_shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    let next = next_occurrence(Utc::now(), hour);
                    *next_run.lock().unwrap_or_else(PoisonError::into_inner) = Some(next);
                    let delay = (next - Utc::now())
                        .to_std()
                        .unwrap_or(Duration::from_secs(0));

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {},
                        Ok(()) = trigger_rx.recv() => {
                            if !thread_shutdown.load(Ordering::Acquire) {
                                log::info!("Manual trigger for task '{}'", task.name());
                            }
                        },
                    }

                    if thread_shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    // A failed run must not prevent the next attempt.
                    if let Err(e) = task.run().await {
                        log::error!("Scheduled task '{}' failed: {}", task.name(), e);
                    }
                }

                *next_run.lock().unwrap_or_else(PoisonError::into_inner) = None;
            });
        });

        log::info!(
            "Scheduled daily task '{}' at {:02}:00 UTC",
            self.task.name(),
            hour
        );

        *inner = Some(RunningScheduler {
            shutdown,
            trigger_tx,
            handle,
        });
        Ok(())
    }

    /// Cancels any pending timer. A no-op when not running.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = inner.take() {
            stop_running(running);
            log::info!("Stopped daily task '{}'", self.task.name());
        }
        *self.next_run.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Fires the task immediately without waiting for the timer.
    /// Returns false when the scheduler is not running.
    pub fn trigger_now(&self) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match inner.as_ref() {
            Some(running) => running.trigger_tx.send(()).is_ok(),
            None => false,
        }
    }

    /// True iff a timer is currently armed, independent of whether the
    /// task is mid-execution.
    pub fn is_running(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|r| !r.shutdown.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// RFC 3339 timestamp of the next scheduled fire, or None when
    /// stopped.
    pub fn next_run(&self) -> Option<String> {
        self.next_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|dt| dt.to_rfc3339())
    }
}

impl Drop for DailyScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stop_running(running: RunningScheduler) {
    running.shutdown.store(true, Ordering::Release);
    // Wake the select loop so it observes the shutdown flag.
    let _ = running.trigger_tx.send(());
    let _ = running.handle.join();
}

/// Computes the next occurrence of the given UTC hour strictly after
/// `now`. Exactly on the boundary rolls to the next calendar day, so a
/// freshly armed timer never fires immediately.
pub fn next_occurrence(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let candidate = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|| now + ChronoDuration::hours(24));
    if candidate > now {
        candidate
    } else {
        candidate + ChronoDuration::days(1)
    }
}

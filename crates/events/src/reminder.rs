//! Dosage reminder scheduler.
//!
//! [`ReminderScheduler`] runs as a background task. Each cycle it streams the
//! upcoming reminder snapshot from storage, ingests it, notifies every due
//! user one at a time and records each attempt whether or not the
//! notification went out. It then sleeps until the wake-up time ingestion
//! chose, or until cancelled.
//!
//! Cancellation is observed at the top of the loop and between dispatches.
//! A cycle that has already chosen its due reminders always finishes
//! dispatching and recording them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use doseminder_core::ingest::ingest_reminder_stream;
use doseminder_core::notification::{NotificationKind, Notifier};
use doseminder_core::reminder::{ReminderSettings, ReminderStorage};
use doseminder_core::types::Timestamp;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// CycleReport
// ---------------------------------------------------------------------------

/// Outcome of a single scheduler cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Reminders that were due this cycle.
    pub due: usize,
    /// Due reminders whose notification succeeded.
    pub notified: usize,
    /// Due reminders whose notification failed.
    pub notify_failures: usize,
    /// Attempts that could not be recorded.
    pub record_failures: usize,
    /// When the next cycle should run.
    pub next_run: Timestamp,
    /// Whether the candidate snapshot could not be read.
    pub ingest_failed: bool,
}

impl CycleReport {
    fn empty(next_run: Timestamp) -> Self {
        Self {
            due: 0,
            notified: 0,
            notify_failures: 0,
            record_failures: 0,
            next_run,
            ingest_failed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ReminderScheduler
// ---------------------------------------------------------------------------

/// Background service that sends dosage reminders.
pub struct ReminderScheduler {
    storage: Arc<dyn ReminderStorage>,
    notifier: Arc<dyn Notifier>,
    settings: ReminderSettings,
}

impl ReminderScheduler {
    pub fn new(
        storage: Arc<dyn ReminderStorage>,
        notifier: Arc<dyn Notifier>,
        settings: ReminderSettings,
    ) -> Self {
        Self {
            storage,
            notifier,
            settings,
        }
    }

    /// Run the scheduler loop until `cancel` fires.
    ///
    /// The first cycle runs immediately. Later cycles run at the
    /// `next_run` chosen by the previous one.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            shortest_next_secs = self.settings.shortest_next_notification.as_secs(),
            update_interval_secs = self.settings.next_update_interval.as_secs(),
            "Reminder scheduler started"
        );

        let mut wake_at = Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Reminder scheduler cancelled");
                    break;
                }
                _ = tokio::time::sleep_until(wake_at) => {
                    let woke = Instant::now();
                    let now = Utc::now();
                    let report = self.cycle(now, &cancel).await;

                    let delay = (report.next_run - now).to_std().unwrap_or(Duration::ZERO);
                    wake_at = woke + delay;
                    tracing::debug!(
                        next_run = %report.next_run,
                        delay_secs = delay.as_secs(),
                        "Reminder scheduler sleeping"
                    );
                }
            }
        }
    }

    /// Run one ingest-and-dispatch cycle as of `now`.
    pub async fn run_cycle(&self, now: Timestamp) -> CycleReport {
        self.cycle(now, &CancellationToken::new()).await
    }

    /// Spawn the loop onto the runtime and return a handle to stop it.
    pub fn spawn(self) -> ReminderSchedulerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token).await });
        ReminderSchedulerHandle { cancel, task }
    }

    async fn cycle(&self, now: Timestamp, cancel: &CancellationToken) -> CycleReport {
        let ingested = match ingest_reminder_stream(
            now,
            &self.settings,
            self.storage.upcoming_dosage_reminders(),
        )
        .await
        {
            Ok(ingested) => ingested,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read upcoming dosage reminders");
                let retry = chrono::Duration::from_std(self.settings.next_update_interval_on_error)
                    .unwrap_or_else(|_| chrono::Duration::minutes(2));
                let mut report = CycleReport::empty(now + retry);
                report.ingest_failed = true;
                return report;
            }
        };

        let mut report = CycleReport::empty(ingested.next_run);
        report.due = ingested.due.len();

        let mut draining = false;
        for (index, due) in ingested.due.iter().enumerate() {
            if !draining && cancel.is_cancelled() {
                draining = true;
                tracing::debug!(
                    remaining = report.due - index,
                    "Shutdown pending, finishing dispatch of chosen reminders"
                );
            }

            let username = &due.reminder.username;
            let started = Instant::now();
            let error_reason = match self
                .notifier
                .notify_user(&due.reminder.user_secret, NotificationKind::Reminder)
                .await
            {
                Ok(()) => {
                    report.notified += 1;
                    tracing::info!(
                        %username,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Dosage reminder sent"
                    );
                    None
                }
                Err(e) => {
                    report.notify_failures += 1;
                    tracing::error!(
                        %username,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %e,
                        "Failed to send dosage reminder"
                    );
                    Some(e.to_string())
                }
            };

            let attempt = due.to_reminded_dose(Utc::now(), error_reason);
            if let Err(e) = self
                .storage
                .record_reminded_doses(std::slice::from_ref(&attempt))
                .await
            {
                report.record_failures += 1;
                tracing::error!(%username, error = %e, "Failed to record reminded dose");
            }
        }

        if report.due > 0 {
            tracing::info!(
                due = report.due,
                notified = report.notified,
                notify_failures = report.notify_failures,
                record_failures = report.record_failures,
                "Processed dosage reminders"
            );
        }

        report
    }
}

// ---------------------------------------------------------------------------
// ReminderSchedulerHandle
// ---------------------------------------------------------------------------

/// Error returned when the scheduler task does not stop cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("Reminder scheduler did not stop within {0:?}")]
    TimedOut(Duration),

    #[error("Reminder scheduler task failed: {0}")]
    Join(#[from] JoinError),
}

/// Owner-side handle of a spawned [`ReminderScheduler`].
pub struct ReminderSchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ReminderSchedulerHandle {
    /// Token that stops the loop when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to exit.
    ///
    /// An in-flight cycle finishes its dispatches first. If that takes
    /// longer than `timeout` the task is aborted.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<(), ShutdownError> {
        self.cancel.cancel();
        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(joined) => Ok(joined?),
            Err(_) => {
                tracing::warn!(?timeout, "Reminder scheduler shutdown timed out, aborting");
                self.task.abort();
                Err(ShutdownError::TimedOut(timeout))
            }
        }
    }
}

//! Reminder ingestion: classify a candidate snapshot into "notify now" and
//! "not yet", and work out when the scheduler must wake up next.
//!
//! Ingestion is pure. Given the same `now`, settings and candidates it always
//! produces the same [`IngestedReminders`], and it touches neither storage
//! nor the notifier. The scheduler loop in `doseminder-events` drives it once
//! per cycle.
//!
//! The wake-up time is clamped to `[now + shortest_next_notification,
//! now + next_update_interval]` so a cluster of near-future doses cannot make
//! the loop spin.

use std::time::Duration;

use futures::{pin_mut, Stream, TryStreamExt};

use crate::reminder::{DosageReminder, RemindedDose, ReminderSettings};
use crate::types::Timestamp;

/// A reminder that is due and should be dispatched this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DueReminder {
    pub reminder: DosageReminder,
    /// Whether recording this reminder should clear the user's snooze.
    ///
    /// Always `false` for now; snooze clearing is modelled but not decided
    /// by ingestion yet.
    pub clear_snooze: bool,
}

impl DueReminder {
    /// Build the attempt record for this reminder.
    pub fn to_reminded_dose(
        &self,
        reminded_at: Timestamp,
        error_reason: Option<String>,
    ) -> RemindedDose {
        RemindedDose {
            user_secret: self.reminder.user_secret.clone(),
            reminded_dose: self.reminder.last_dose.taken_at,
            clear_snooze: self.clear_snooze,
            reminded_at,
            error_reason,
        }
    }
}

/// Result of one ingestion pass.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedReminders {
    /// Due reminders in the order the snapshot produced them.
    pub due: Vec<DueReminder>,
    /// When the scheduler should run its next cycle.
    pub next_run: Timestamp,
}

// ---------------------------------------------------------------------------
// ReminderIngest
// ---------------------------------------------------------------------------

/// Incremental ingestion state for a single cycle.
///
/// Feed candidates with [`push`](Self::push) and call
/// [`finish`](Self::finish) once the snapshot is exhausted. The free
/// functions [`ingest_reminders`] and [`ingest_reminder_stream`] wrap this
/// for iterators and streams.
#[derive(Debug)]
pub struct ReminderIngest {
    now: Timestamp,
    cutoff: Timestamp,
    shortest_next: chrono::Duration,
    earliest_next: Timestamp,
    due: Vec<DueReminder>,
}

impl ReminderIngest {
    pub fn new(now: Timestamp, settings: &ReminderSettings) -> Self {
        let cutoff = now + signed(settings.next_update_interval);
        Self {
            now,
            cutoff,
            shortest_next: signed(settings.shortest_next_notification),
            earliest_next: cutoff,
            due: Vec::with_capacity(12),
        }
    }

    /// Classify one candidate.
    pub fn push(&mut self, reminder: DosageReminder) {
        let next_notification = reminder.next_notification();

        if next_notification > self.cutoff {
            tracing::debug!(
                username = %reminder.username,
                %next_notification,
                cutoff = %self.cutoff,
                "Reminder beyond lookahead window, skipping"
            );
            return;
        }

        if reminder.is_already_reminded() {
            tracing::debug!(
                username = %reminder.username,
                last_dose = %reminder.last_dose.taken_at,
                "Reminder already recorded for last dose and not snoozed, skipping"
            );
            return;
        }

        if next_notification <= self.now {
            tracing::debug!(
                username = %reminder.username,
                %next_notification,
                "Reminder due, queued for notification"
            );
            self.due.push(DueReminder {
                reminder,
                clear_snooze: false,
            });
            return;
        }

        if next_notification < self.earliest_next {
            tracing::debug!(
                username = %reminder.username,
                %next_notification,
                "New earliest upcoming reminder"
            );
            self.earliest_next = next_notification;
        }
    }

    /// Clamp the wake-up time and hand back the classification.
    pub fn finish(self) -> IngestedReminders {
        let mut next_run = self.earliest_next;

        if next_run < self.now {
            next_run = self.now;
        }

        let floor = self.now + self.shortest_next;
        if next_run < floor {
            next_run = floor;
        }

        tracing::debug!(
            ingested_at = %self.now,
            due = self.due.len(),
            %next_run,
            "Reminder ingestion complete"
        );

        IngestedReminders {
            due: self.due,
            next_run,
        }
    }
}

/// Settings intervals are bounded by [`ReminderSettings::validate`]; the
/// fallback only guards unvalidated input.
fn signed(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(1))
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Ingest a candidate snapshot with the default [`ReminderSettings`].
///
/// Stops at the first `Err` and returns it; partial results are discarded.
pub fn ingest_reminders<I, E>(now: Timestamp, reminders: I) -> Result<IngestedReminders, E>
where
    I: IntoIterator<Item = Result<DosageReminder, E>>,
{
    ingest_reminders_with(now, &ReminderSettings::default(), reminders)
}

/// Ingest a candidate snapshot with explicit settings.
pub fn ingest_reminders_with<I, E>(
    now: Timestamp,
    settings: &ReminderSettings,
    reminders: I,
) -> Result<IngestedReminders, E>
where
    I: IntoIterator<Item = Result<DosageReminder, E>>,
{
    let mut ingest = ReminderIngest::new(now, settings);
    for reminder in reminders {
        ingest.push(reminder?);
    }
    Ok(ingest.finish())
}

/// Ingest a lazily produced candidate stream.
///
/// The stream is not polled past the first `Err`.
pub async fn ingest_reminder_stream<S, E>(
    now: Timestamp,
    settings: &ReminderSettings,
    reminders: S,
) -> Result<IngestedReminders, E>
where
    S: Stream<Item = Result<DosageReminder, E>>,
{
    pin_mut!(reminders);

    let mut ingest = ReminderIngest::new(now, settings);
    while let Some(reminder) = reminders.try_next().await? {
        ingest.push(reminder);
    }
    Ok(ingest.finish())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

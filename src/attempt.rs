//! One task attempt: a builder bound to a grader, submitted at most once.
//!
//! ARCHITECTURE
//! ============
//! The builder sits behind a `std::sync::Mutex` that is never held across an
//! await. Submitting flips the builder to `Submitting` under the lock, awaits
//! exactly one grader call with the lock released, then marks it `Attempted`.
//! Edits that arrive while the call is pending are rejected, not queued.
//!
//! The countdown is a spawned task that submits through the same transition,
//! so a user submit and an expiring deadline race on the lock: whichever gets
//! there first owns the attempt and the other sees `AttemptExhausted`. A
//! countdown can be stopped only while it sleeps; a deadline submission in
//! flight is always awaited, never cancelled.
//!
//! TRADE-OFFS
//! ==========
//! A grader failure still consumes the attempt. The one-attempt policy is
//! enforced on the student's side of the wire, and the call may have reached
//! the grader before failing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::grading::{Grader, GradingResponse};
use crate::score::score;
use crate::sequence::{Phase, StepSequenceBuilder, Trigger, ValidationError};
use crate::session::Session;

/// Grader verdict plus the score derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingOutcome {
    pub response: GradingResponse,
    /// Gradeable steps at the time of submission.
    pub total_steps: usize,
    pub score: u8,
}

impl GradingOutcome {
    #[must_use]
    pub fn new(response: GradingResponse, total_steps: usize) -> Self {
        let score = score(total_steps, response.errors.len(), response.success);
        Self { response, total_steps, score }
    }
}

/// Handle to a running countdown.
///
/// Stopping takes effect only while the timer sleeps. Once the deadline fires,
/// its grader call runs to completion and the attempt settles in `Attempted`.
pub struct Countdown {
    stop: Arc<Notify>,
    handle: JoinHandle<Result<GradingOutcome, ValidationError>>,
}

impl Countdown {
    /// Wait for the deadline and whatever it submitted.
    ///
    /// # Errors
    ///
    /// Returns a `JoinError` if the countdown task panicked.
    pub async fn expired(&mut self) -> Result<Result<GradingOutcome, ValidationError>, JoinError> {
        (&mut self.handle).await
    }

    /// Stop the timer if it is still sleeping, then wait for any deadline
    /// submission already under way.
    ///
    /// # Errors
    ///
    /// Returns a `JoinError` if the countdown task panicked.
    pub async fn stop(self) -> Result<Result<GradingOutcome, ValidationError>, JoinError> {
        self.stop.notify_one();
        self.handle.await
    }
}

pub struct TaskAttempt {
    builder: Mutex<StepSequenceBuilder>,
    grader: Arc<dyn Grader>,
    session: Session,
}

impl TaskAttempt {
    #[must_use]
    pub fn new(builder: StepSequenceBuilder, grader: Arc<dyn Grader>, session: Session) -> Self {
        Self { builder: Mutex::new(builder), grader, session }
    }

    /// Apply one edit operation. The builder rejects it unless still editing.
    pub fn edit<T>(
        &self,
        op: impl FnOnce(&mut StepSequenceBuilder) -> Result<T, ValidationError>,
    ) -> Result<T, ValidationError> {
        op(&mut *self.lock())
    }

    /// Copy of the builder for rendering.
    #[must_use]
    pub fn snapshot(&self) -> StepSequenceBuilder {
        self.lock().clone()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Student-initiated submission.
    pub async fn submit(&self) -> Result<GradingOutcome, ValidationError> {
        self.submit_with(Trigger::User).await
    }

    /// Consume the attempt without grading. `solution_id` is the grader's
    /// record from `start_solution`, closed when present.
    pub async fn finish_early(&self, solution_id: Option<i64>) -> Result<(), ValidationError> {
        {
            let mut builder = self.lock();
            if builder.phase() != Phase::Editing {
                return Err(ValidationError::AttemptExhausted);
            }
            builder.freeze();
        }
        info!(task_id = %self.task_id(), "attempt finished early");
        if let Some(id) = solution_id {
            self.grader.finish(id).await.map_err(|e| {
                warn!(solution_id = id, error = %e, "finish call failed");
                ValidationError::SubmissionFailed(e.to_string())
            })?;
        }
        Ok(())
    }

    /// Auto-submit once `budget` elapses. Resolves to `AttemptExhausted` if the
    /// student got there first or the countdown was stopped while sleeping.
    pub fn start_countdown(self: &Arc<Self>, budget: Duration) -> Countdown {
        let attempt = Arc::clone(self);
        let stop = Arc::new(Notify::new());
        let stopped = Arc::clone(&stop);
        info!(task_id = %attempt.task_id(), budget_secs = budget.as_secs(), "countdown started");
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(budget) => attempt.submit_with(Trigger::Deadline).await,
                () = stopped.notified() => {
                    debug!("countdown stopped before the deadline");
                    Err(ValidationError::AttemptExhausted)
                }
            }
        });
        Countdown { stop, handle }
    }

    async fn submit_with(&self, trigger: Trigger) -> Result<GradingOutcome, ValidationError> {
        let (payload, total_steps) = {
            let mut builder = self.lock();
            let payload = builder.begin_submission(trigger).inspect_err(|e| {
                if trigger == Trigger::Deadline {
                    warn!(error = %e, "deadline reached with an unsubmittable solution");
                }
            })?;
            (payload.with_user(self.session.username()), builder.step_count())
        };

        let task_id = payload.task_id().to_owned();
        info!(%task_id, ?trigger, total_steps, "submitting solution");
        let result = self.grader.check(&payload).await;
        self.lock().finish_submission();

        match result {
            Ok(response) => {
                info!(%task_id, success = response.success, errors = response.errors.len(), "solution graded");
                Ok(GradingOutcome::new(response, total_steps))
            }
            Err(e) => {
                warn!(%task_id, error = %e, "submission failed; attempt consumed");
                Err(ValidationError::SubmissionFailed(e.to_string()))
            }
        }
    }

    fn task_id(&self) -> String {
        self.lock().task_id().to_owned()
    }

    fn lock(&self) -> MutexGuard<'_, StepSequenceBuilder> {
        self.builder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "attempt_test.rs"]
mod tests;

//! stepcheck: step-by-step solution submission for a calculus tutor.
//!
//! Students build a solution one step at a time (algebraic rewrites, the
//! point where a limit is taken, successive-approximation iterates for
//! integral equations). The crate keeps that sequence well-formed, enforces
//! the one-attempt-per-task rule, and ships the result to an external
//! grading service over HTTP.
//!
//! - [`sequence`]: the synchronous `StepSequenceBuilder` and its wire payloads.
//! - [`attempt`]: async task attempt with the countdown auto-submit.
//! - [`grading`]: grader trait, HTTP client, and config.

pub mod attempt;
pub mod grading;
pub mod keyboard;
pub mod score;
pub mod sequence;
pub mod session;

pub use attempt::{Countdown, GradingOutcome, TaskAttempt};
pub use grading::{Grader, GradingConfig, HttpGradingClient};
pub use sequence::{Mode, Phase, StepSequenceBuilder, SubmissionPayload, ValidationError};
pub use session::Session;

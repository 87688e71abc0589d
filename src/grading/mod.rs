//! Grading: the HTTP collaborator that checks submitted solutions.
//!
//! DESIGN
//! ======
//! `Grader` is the seam between a task attempt and the outside world. The
//! attempt layer only needs `check` (and `finish` for early completion), so
//! tests substitute in-memory graders. `HttpGradingClient` is the production
//! implementation and also carries the ancillary task endpoints the CLI uses.

pub mod config;
pub mod http;
pub mod types;

pub use config::GradingConfig;
pub use http::HttpGradingClient;
pub use types::{GradingError, GradingIssue, GradingResponse, LastIntegralSolution, StartedSolution, TaskInfo};

use crate::sequence::SubmissionPayload;

/// Anything that can grade a submission.
#[async_trait::async_trait]
pub trait Grader: Send + Sync {
    /// Send one payload for grading.
    async fn check(&self, payload: &SubmissionPayload) -> Result<GradingResponse, GradingError>;

    /// Mark a started solution as finished without grading it.
    async fn finish(&self, solution_id: i64) -> Result<(), GradingError>;
}

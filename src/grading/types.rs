//! Grader wire types: responses, task metadata, and errors.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::sequence::{StepSequenceBuilder, WireBranch};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by grader client operations.
#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (connect error, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The grader answered with a non-success HTTP status.
    #[error("grader responded with status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Parse(String),
}

// =============================================================================
// CHECK RESPONSE
// =============================================================================

/// One finding reported by the grader against a submitted step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingIssue {
    #[serde(default, alias = "step")]
    pub step_index: i64,
    #[serde(default)]
    pub branch_label: Option<String>,
    /// Branch index as reported by the integral endpoint; `-1` marks the final answer.
    #[serde(default)]
    pub phi_index: Option<i64>,
    pub error: String,
    #[serde(default)]
    pub hint: Option<String>,
}

impl GradingIssue {
    #[must_use]
    pub fn targets_final_step(&self) -> bool {
        self.phi_index == Some(-1)
    }
}

/// Body returned by both check endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<GradingIssue>,
    #[serde(default, alias = "solution_id")]
    pub solution_id: Option<i64>,
}

// =============================================================================
// TASKS
// =============================================================================

/// Task metadata from `GET /tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub equation: Option<String>,
    /// Free term of an integral equation; seeds the zeroth iterate.
    #[serde(default)]
    pub limit_var: Option<String>,
}

/// Body of `POST /tasks/{id}/start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedSolution {
    pub solution_id: i64,
}

/// Body of `GET /solutions/last-integral/{taskId}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LastIntegralSolution {
    #[serde(rename = "phiSteps", default)]
    pub phi_steps: Vec<WireBranch>,
    #[serde(rename = "final", default)]
    pub final_answer: String,
}

impl LastIntegralSolution {
    /// Rebuild the stored attempt, or `None` when nothing was submitted yet.
    /// Branches are taken in the order the grader returns them.
    #[must_use]
    pub fn into_builder(self, task_id: &str) -> Option<StepSequenceBuilder> {
        if self.phi_steps.is_empty() {
            return None;
        }
        let branches = self.phi_steps.into_iter().map(|b| b.steps).collect();
        Some(StepSequenceBuilder::restore_integral(task_id, branches, self.final_answer))
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid task id: {other}"))),
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

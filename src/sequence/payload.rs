//! Wire format of a submission sent to the grading collaborator.

use serde::{Deserialize, Serialize};

use super::{PhiBranch, Step, StepKind};

/// A step as sent in a plain-mode submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireStep {
    pub content: String,
    pub kind: StepKind,
}

impl From<&Step> for WireStep {
    fn from(step: &Step) -> Self {
        Self { content: step.content.clone(), kind: step.kind }
    }
}

/// A branch as sent in an integral-mode submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBranch {
    pub label: String,
    pub steps: Vec<String>,
}

impl From<&PhiBranch> for WireBranch {
    fn from(branch: &PhiBranch) -> Self {
        Self { label: branch.label(), steps: branch.steps.iter().map(|s| s.content.clone()).collect() }
    }
}

/// Body of `POST /solutions/check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlainSubmission {
    pub task_id: String,
    pub steps: Vec<WireStep>,
}

/// Body of `POST /solutions/check-integral`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegralSubmission {
    pub task_id: String,
    pub phi_branches: Vec<WireBranch>,
    pub final_step: String,
    /// Submitting user, taken from the session rather than ambient storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// The serialized unit sent to the grader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmissionPayload {
    Plain(PlainSubmission),
    Integral(IntegralSubmission),
}

impl SubmissionPayload {
    #[must_use]
    pub fn task_id(&self) -> &str {
        match self {
            Self::Plain(p) => &p.task_id,
            Self::Integral(p) => &p.task_id,
        }
    }

    /// Attach the submitting user. Only the integral endpoint accepts one.
    #[must_use]
    pub fn with_user(mut self, user: Option<&str>) -> Self {
        if let Self::Integral(p) = &mut self {
            p.user = user.map(str::to_owned);
        }
        self
    }
}

#[cfg(test)]
#[path = "payload_test.rs"]
mod tests;

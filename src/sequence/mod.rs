//! Step sequences: typed solution steps and the builder that assembles them.
//!
//! DESIGN
//! ======
//! A student's solution is an ordered list of steps. Plain and limit tasks use
//! a single sequence that may end in a limit marker; integral-equation tasks
//! use one branch per successive-approximation iterate (`\varphi_0(x)`,
//! `\varphi_1(x)`, ...) followed by a final answer.
//!
//! The builder is plain synchronous data: no IO, no logging, no globals. The
//! async attempt layer and the HTTP grader live in sibling modules.

pub mod builder;
pub mod payload;
pub mod problem;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use builder::{Phase, StepSequenceBuilder, Trigger};
pub use payload::{IntegralSubmission, PlainSubmission, SubmissionPayload, WireBranch, WireStep};
pub use problem::{Location, Problem, ProblemKind, ValidationError};

// =============================================================================
// STEP
// =============================================================================

/// What a step represents on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// An algebraic expression (LaTeX or plain notation).
    #[serde(rename = "expression")]
    Expression,
    /// The point at which the limit is taken. Carries no content.
    #[serde(rename = "limit")]
    LimitMarker,
}

/// One discrete unit of a submitted solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub content: String,
    /// Zero-based index; the order of algebraic manipulation.
    pub position: usize,
}

impl Step {
    #[must_use]
    pub fn expression(position: usize, content: impl Into<String>) -> Self {
        Self { kind: StepKind::Expression, content: content.into(), position }
    }

    #[must_use]
    pub fn limit_marker(position: usize) -> Self {
        Self { kind: StepKind::LimitMarker, content: String::new(), position }
    }

    #[must_use]
    pub fn is_marker(&self) -> bool {
        self.kind == StepKind::LimitMarker
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Rewrite `position` so it matches each step's index after an insert or removal.
pub(crate) fn renumber(steps: &mut [Step]) {
    for (i, step) in steps.iter_mut().enumerate() {
        step.position = i;
    }
}

// =============================================================================
// PHI BRANCH
// =============================================================================

/// One iterate of a successive-approximation solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhiBranch {
    /// Creation-order index; the label is derived from it.
    pub ordinal: usize,
    pub steps: Vec<Step>,
}

impl PhiBranch {
    /// A fresh branch holding a single empty expression for the student to fill.
    #[must_use]
    pub fn new(ordinal: usize) -> Self {
        Self { ordinal, steps: vec![Step::expression(0, String::new())] }
    }

    #[must_use]
    pub fn label(&self) -> String {
        branch_label(self.ordinal)
    }
}

/// Display label for the branch at `ordinal`, e.g. `\varphi_2(x)`.
#[must_use]
pub fn branch_label(ordinal: usize) -> String {
    format!("\\varphi_{ordinal}(x)")
}

// =============================================================================
// MODE
// =============================================================================

/// Task variant a builder was created for. Fixed for the builder's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Algebraic simplification; a limit marker is allowed but not required.
    Plain,
    /// "Evaluate the limit" tasks; the sequence must contain the marker.
    Limit,
    /// Integral equations solved by successive approximation.
    Integral,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::Limit => "limit",
            Self::Integral => "integral",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

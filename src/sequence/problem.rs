//! Validation errors and structural problems.

use std::fmt;

use super::{Mode, branch_label};

// =============================================================================
// PROBLEM
// =============================================================================

/// Where in a solution a structural problem sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The sequence as a whole.
    Sequence,
    /// A step of the plain sequence.
    Step(usize),
    /// A branch as a whole.
    Branch(usize),
    /// A step inside a branch.
    BranchStep { branch: usize, step: usize },
    /// The final answer of an integral-equation solution.
    FinalStep,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence => f.write_str("sequence"),
            Self::Step(i) => write!(f, "step {i}"),
            Self::Branch(b) => f.write_str(&branch_label(*b)),
            Self::BranchStep { branch, step } => write!(f, "{} step {step}", branch_label(*branch)),
            Self::FinalStep => f.write_str("final step"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    EmptyContent,
    SequenceEmpty,
    DuplicateMarker,
    MissingMarker,
    EmptyBranch,
    MissingFinalStep,
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::EmptyContent => "content is empty",
            Self::SequenceEmpty => "no expression step before this point",
            Self::DuplicateMarker => "more than one limit marker",
            Self::MissingMarker => "limit marker is missing",
            Self::EmptyBranch => "branch has no steps",
            Self::MissingFinalStep => "final step is missing",
        };
        f.write_str(text)
    }
}

/// One violated structural invariant, as reported by `validate()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Problem {
    pub kind: ProblemKind,
    pub location: Location,
}

impl Problem {
    #[must_use]
    pub fn new(kind: ProblemKind, location: Location) -> Self {
        Self { kind, location }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.kind)
    }
}

fn join_problems(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// ERROR
// =============================================================================

/// Every failure a builder or task attempt reports to its caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("step content is empty")]
    EmptyContent,

    #[error("index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Removing the step would leave the active branch empty.
    #[error("a branch must keep at least one step")]
    LastStepProtected,

    #[error("add an expression step before the limit marker")]
    SequenceEmpty,

    #[error("the limit marker is already present")]
    DuplicateMarker,

    /// The single attempt for this task has been (or is being) used.
    #[error("only one attempt is allowed and it has been used")]
    AttemptExhausted,

    /// The grading collaborator could not be reached or answered badly.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    #[error("operation not available in {0} mode")]
    ModeMismatch(Mode),

    /// Later branches are derived from this one.
    #[error("branch {index} cannot be removed while later branches exist")]
    BranchInUse { index: usize },

    #[error("the only branch cannot be removed")]
    LastBranchProtected,

    /// Aggregate of every structural problem found at submit time.
    #[error("solution is not well-formed: {}", join_problems(.0))]
    Invalid(Vec<Problem>),
}

impl ValidationError {
    /// Stable machine-readable code for display layers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyContent => "E_EMPTY_CONTENT",
            Self::IndexOutOfRange { .. } => "E_INDEX_OUT_OF_RANGE",
            Self::LastStepProtected => "E_LAST_STEP_PROTECTED",
            Self::SequenceEmpty => "E_SEQUENCE_EMPTY",
            Self::DuplicateMarker => "E_DUPLICATE_MARKER",
            Self::AttemptExhausted => "E_ATTEMPT_EXHAUSTED",
            Self::SubmissionFailed(_) => "E_SUBMISSION_FAILED",
            Self::ModeMismatch(_) => "E_MODE_MISMATCH",
            Self::BranchInUse { .. } => "E_BRANCH_IN_USE",
            Self::LastBranchProtected => "E_LAST_BRANCH_PROTECTED",
            Self::Invalid(_) => "E_INVALID",
        }
    }

    /// Structural problems carried by [`ValidationError::Invalid`]; empty otherwise.
    #[must_use]
    pub fn problems(&self) -> &[Problem] {
        match self {
            Self::Invalid(problems) => problems,
            _ => &[],
        }
    }
}

#[cfg(test)]
#[path = "problem_test.rs"]
mod tests;

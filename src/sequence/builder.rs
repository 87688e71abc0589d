//! `StepSequenceBuilder`: edit operations, validation, and the one-attempt lifecycle.
//!
//! DESIGN
//! ======
//! Each edit is checked at the point of mutation so the caller can show
//! step-local feedback immediately. Cross-step invariants (marker placement,
//! non-empty branches, the final answer) are certified by `validate()`, which
//! `serialize()` and `begin_submission()` run before producing a payload.
//!
//! LIFECYCLE
//! =========
//! `Editing → Submitting → Attempted`. Leaving `Editing` is one-way: every
//! later edit fails with `AttemptExhausted` and leaves the builder untouched.

use super::payload::{IntegralSubmission, PlainSubmission, SubmissionPayload, WireBranch, WireStep};
use super::problem::{Location, Problem, ProblemKind, ValidationError};
use super::{Mode, PhiBranch, Step, StepKind, renumber};

/// Where a builder is in its single-attempt lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Editing,
    Submitting,
    Attempted,
}

/// What initiated a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The student pressed submit.
    User,
    /// The time budget ran out.
    Deadline,
}

#[derive(Debug, Clone)]
enum Body {
    Sequence(Vec<Step>),
    Branches { branches: Vec<PhiBranch>, active: usize, final_step: Option<String> },
}

/// In-progress solution for one task attempt.
#[derive(Debug, Clone)]
pub struct StepSequenceBuilder {
    task_id: String,
    mode: Mode,
    phase: Phase,
    body: Body,
}

impl StepSequenceBuilder {
    /// Builder for algebra tasks; the limit marker is optional.
    #[must_use]
    pub fn plain(task_id: impl Into<String>) -> Self {
        Self::sequence(task_id.into(), Mode::Plain)
    }

    /// Builder for "evaluate the limit" tasks; the marker is required at submit time.
    #[must_use]
    pub fn limit(task_id: impl Into<String>) -> Self {
        Self::sequence(task_id.into(), Mode::Limit)
    }

    /// Builder for integral equations, starting with `\varphi_0(x)` holding one empty step.
    #[must_use]
    pub fn integral(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            mode: Mode::Integral,
            phase: Phase::Editing,
            body: Body::Branches { branches: vec![PhiBranch::new(0)], active: 0, final_step: None },
        }
    }

    /// Integral builder whose zeroth iterate starts from `seed` (the task's free term).
    #[must_use]
    pub fn integral_seeded(task_id: impl Into<String>, seed: &str) -> Self {
        let mut builder = Self::integral(task_id);
        if !seed.trim().is_empty() {
            if let Body::Branches { branches, .. } = &mut builder.body {
                branches[0].steps[0].content = seed.to_owned();
            }
        }
        builder
    }

    /// Rebuild a previously submitted integral solution. The result is already
    /// `Attempted`: a stored solution means the attempt was used.
    #[must_use]
    pub fn restore_integral(task_id: impl Into<String>, branches: Vec<Vec<String>>, final_step: String) -> Self {
        let mut restored: Vec<PhiBranch> = branches
            .into_iter()
            .enumerate()
            .map(|(ordinal, steps)| PhiBranch {
                ordinal,
                steps: steps
                    .into_iter()
                    .enumerate()
                    .map(|(i, content)| Step::expression(i, content))
                    .collect(),
            })
            .collect();
        if restored.is_empty() {
            restored.push(PhiBranch::new(0));
        }
        let final_step = if final_step.trim().is_empty() { None } else { Some(final_step) };
        Self {
            task_id: task_id.into(),
            mode: Mode::Integral,
            phase: Phase::Attempted,
            body: Body::Branches { branches: restored, active: 0, final_step },
        }
    }

    fn sequence(task_id: String, mode: Mode) -> Self {
        Self { task_id, mode, phase: Phase::Editing, body: Body::Sequence(Vec::new()) }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Steps of the plain sequence, or of the active branch in integral mode.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        match &self.body {
            Body::Sequence(steps) => steps,
            Body::Branches { branches, active, .. } => branches.get(*active).map_or(&[][..], |b| b.steps.as_slice()),
        }
    }

    /// All branches; empty outside integral mode.
    #[must_use]
    pub fn branches(&self) -> &[PhiBranch] {
        match &self.body {
            Body::Sequence(_) => &[],
            Body::Branches { branches, .. } => branches,
        }
    }

    #[must_use]
    pub fn active_branch(&self) -> Option<usize> {
        match &self.body {
            Body::Sequence(_) => None,
            Body::Branches { active, .. } => Some(*active),
        }
    }

    #[must_use]
    pub fn final_step(&self) -> Option<&str> {
        match &self.body {
            Body::Sequence(_) => None,
            Body::Branches { final_step, .. } => final_step.as_deref(),
        }
    }

    /// Number of gradeable steps: every branch step plus the final answer in
    /// integral mode, every step otherwise.
    #[must_use]
    pub fn step_count(&self) -> usize {
        match &self.body {
            Body::Sequence(steps) => steps.len(),
            Body::Branches { branches, .. } => branches.iter().map(|b| b.steps.len()).sum::<usize>() + 1,
        }
    }

    // =========================================================================
    // STEP EDITS
    // =========================================================================

    /// Append an expression to the active sequence or branch. Returns its position.
    pub fn add_step(&mut self, content: impl Into<String>) -> Result<usize, ValidationError> {
        self.ensure_editing()?;
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        let steps = self.active_steps_mut();
        let position = steps.len();
        steps.push(Step::expression(position, content));
        Ok(position)
    }

    /// Replace the content at `index`. Editing the limit marker turns it into an expression.
    pub fn edit_step(&mut self, index: usize, content: impl Into<String>) -> Result<(), ValidationError> {
        self.ensure_editing()?;
        let content = content.into();
        let steps = self.active_steps_mut();
        let len = steps.len();
        let step = steps
            .get_mut(index)
            .ok_or(ValidationError::IndexOutOfRange { index, len })?;
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        step.kind = StepKind::Expression;
        step.content = content;
        Ok(())
    }

    /// Remove the step at `index`, shifting later steps down by one.
    pub fn delete_step(&mut self, index: usize) -> Result<(), ValidationError> {
        self.ensure_editing()?;
        let in_branch = matches!(self.body, Body::Branches { .. });
        let steps = self.active_steps_mut();
        let len = steps.len();
        if index >= len {
            return Err(ValidationError::IndexOutOfRange { index, len });
        }
        if in_branch && len == 1 {
            return Err(ValidationError::LastStepProtected);
        }
        steps.remove(index);
        renumber(steps);
        Ok(())
    }

    /// Append the limit marker to the plain sequence.
    pub fn add_limit_marker(&mut self) -> Result<usize, ValidationError> {
        self.ensure_editing()?;
        let mode = self.mode;
        let Body::Sequence(steps) = &mut self.body else {
            return Err(ValidationError::ModeMismatch(mode));
        };
        if steps.iter().any(Step::is_marker) {
            return Err(ValidationError::DuplicateMarker);
        }
        if !steps.iter().any(|s| s.kind == StepKind::Expression) {
            return Err(ValidationError::SequenceEmpty);
        }
        let position = steps.len();
        steps.push(Step::limit_marker(position));
        Ok(position)
    }

    // =========================================================================
    // BRANCH EDITS
    // =========================================================================

    /// Open the next iterate with one empty step and make it active. Returns its ordinal.
    pub fn add_branch(&mut self) -> Result<usize, ValidationError> {
        self.ensure_editing()?;
        let mode = self.mode;
        let Body::Branches { branches, active, .. } = &mut self.body else {
            return Err(ValidationError::ModeMismatch(mode));
        };
        let ordinal = branches.len();
        branches.push(PhiBranch::new(ordinal));
        *active = ordinal;
        Ok(ordinal)
    }

    /// Select the branch later step edits target. Allowed in every phase: it is
    /// navigation, not a mutation, and never changes the submitted payload.
    pub fn set_active_branch(&mut self, index: usize) -> Result<(), ValidationError> {
        let mode = self.mode;
        let Body::Branches { branches, active, .. } = &mut self.body else {
            return Err(ValidationError::ModeMismatch(mode));
        };
        if index >= branches.len() {
            return Err(ValidationError::IndexOutOfRange { index, len: branches.len() });
        }
        *active = index;
        Ok(())
    }

    /// Remove a branch. Each iterate is derived from the previous one, so only
    /// the last branch can go, and never the sole branch.
    pub fn delete_branch(&mut self, index: usize) -> Result<(), ValidationError> {
        self.ensure_editing()?;
        let mode = self.mode;
        let Body::Branches { branches, active, .. } = &mut self.body else {
            return Err(ValidationError::ModeMismatch(mode));
        };
        let len = branches.len();
        if index >= len {
            return Err(ValidationError::IndexOutOfRange { index, len });
        }
        if len == 1 {
            return Err(ValidationError::LastBranchProtected);
        }
        if index + 1 < len {
            return Err(ValidationError::BranchInUse { index });
        }
        branches.remove(index);
        for (ordinal, branch) in branches.iter_mut().enumerate() {
            branch.ordinal = ordinal;
        }
        *active = (*active).min(branches.len() - 1);
        Ok(())
    }

    /// Set the final answer of an integral-equation solution.
    pub fn set_final_step(&mut self, content: impl Into<String>) -> Result<(), ValidationError> {
        self.ensure_editing()?;
        let mode = self.mode;
        let Body::Branches { final_step, .. } = &mut self.body else {
            return Err(ValidationError::ModeMismatch(mode));
        };
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        *final_step = Some(content);
        Ok(())
    }

    // =========================================================================
    // VALIDATION & SERIALIZATION
    // =========================================================================

    /// Every structural problem, in document order. Never mutates.
    #[must_use]
    pub fn validate(&self) -> Vec<Problem> {
        match &self.body {
            Body::Sequence(steps) => validate_sequence(steps, self.mode == Mode::Limit),
            Body::Branches { branches, final_step, .. } => validate_branches(branches, final_step.as_deref()),
        }
    }

    /// The submission payload, or every problem at once.
    pub fn serialize(&self) -> Result<SubmissionPayload, ValidationError> {
        let problems = self.validate();
        if !problems.is_empty() {
            return Err(ValidationError::Invalid(problems));
        }
        let task_id = self.task_id.clone();
        let payload = match &self.body {
            Body::Sequence(steps) => {
                SubmissionPayload::Plain(PlainSubmission { task_id, steps: steps.iter().map(WireStep::from).collect() })
            }
            Body::Branches { branches, final_step, .. } => SubmissionPayload::Integral(IntegralSubmission {
                task_id,
                phi_branches: branches.iter().map(WireBranch::from).collect(),
                final_step: final_step.clone().unwrap_or_default(),
                user: None,
            }),
        };
        Ok(payload)
    }

    /// Enter `Submitting` and hand back the payload to send.
    ///
    /// A malformed solution keeps a user-triggered attempt in `Editing` so the
    /// student can fix it. When the deadline fires there is nothing left to fix:
    /// the attempt is consumed and the problems are returned.
    pub fn begin_submission(&mut self, trigger: Trigger) -> Result<SubmissionPayload, ValidationError> {
        self.ensure_editing()?;
        match self.serialize() {
            Ok(payload) => {
                self.phase = Phase::Submitting;
                Ok(payload)
            }
            Err(err) => {
                if trigger == Trigger::Deadline {
                    self.phase = Phase::Attempted;
                }
                Err(err)
            }
        }
    }

    /// The grader answered (or failed); the attempt is spent either way.
    pub fn finish_submission(&mut self) {
        if self.phase == Phase::Submitting {
            self.phase = Phase::Attempted;
        }
    }

    /// Consume the attempt without grading (finish early).
    pub fn freeze(&mut self) {
        self.phase = Phase::Attempted;
    }

    fn ensure_editing(&self) -> Result<(), ValidationError> {
        if self.phase == Phase::Editing {
            Ok(())
        } else {
            Err(ValidationError::AttemptExhausted)
        }
    }

    fn active_steps_mut(&mut self) -> &mut Vec<Step> {
        match &mut self.body {
            Body::Sequence(steps) => steps,
            Body::Branches { branches, active, .. } => {
                let last = branches.len().saturating_sub(1);
                *active = (*active).min(last);
                if branches.is_empty() {
                    branches.push(PhiBranch::new(0));
                }
                &mut branches[*active].steps
            }
        }
    }
}

fn validate_sequence(steps: &[Step], require_marker: bool) -> Vec<Problem> {
    let mut problems = Vec::new();
    if steps.is_empty() {
        problems.push(Problem::new(ProblemKind::SequenceEmpty, Location::Sequence));
        if require_marker {
            problems.push(Problem::new(ProblemKind::MissingMarker, Location::Sequence));
        }
        return problems;
    }

    let mut seen_expression = false;
    let mut seen_marker = false;
    for (i, step) in steps.iter().enumerate() {
        match step.kind {
            StepKind::Expression => {
                if step.is_blank() {
                    problems.push(Problem::new(ProblemKind::EmptyContent, Location::Step(i)));
                }
                seen_expression = true;
            }
            StepKind::LimitMarker => {
                if seen_marker {
                    problems.push(Problem::new(ProblemKind::DuplicateMarker, Location::Step(i)));
                } else if !seen_expression {
                    problems.push(Problem::new(ProblemKind::SequenceEmpty, Location::Step(i)));
                }
                seen_marker = true;
            }
        }
    }
    if require_marker && !seen_marker {
        problems.push(Problem::new(ProblemKind::MissingMarker, Location::Sequence));
    }
    problems
}

fn validate_branches(branches: &[PhiBranch], final_step: Option<&str>) -> Vec<Problem> {
    let mut problems = Vec::new();
    for (b, branch) in branches.iter().enumerate() {
        if branch.steps.is_empty() {
            problems.push(Problem::new(ProblemKind::EmptyBranch, Location::Branch(b)));
        }
        for (s, step) in branch.steps.iter().enumerate() {
            if step.is_blank() {
                problems.push(Problem::new(ProblemKind::EmptyContent, Location::BranchStep { branch: b, step: s }));
            }
        }
    }
    if final_step.is_none_or(|f| f.trim().is_empty()) {
        problems.push(Problem::new(ProblemKind::MissingFinalStep, Location::FinalStep));
    }
    problems
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;

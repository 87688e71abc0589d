use super::*;

#[test]
fn location_display() {
    assert_eq!(Location::Sequence.to_string(), "sequence");
    assert_eq!(Location::Step(2).to_string(), "step 2");
    assert_eq!(Location::Branch(1).to_string(), "\\varphi_1(x)");
    assert_eq!(Location::BranchStep { branch: 0, step: 3 }.to_string(), "\\varphi_0(x) step 3");
    assert_eq!(Location::FinalStep.to_string(), "final step");
}

#[test]
fn invalid_lists_every_problem() {
    let err = ValidationError::Invalid(vec![
        Problem::new(ProblemKind::EmptyContent, Location::BranchStep { branch: 1, step: 0 }),
        Problem::new(ProblemKind::MissingFinalStep, Location::FinalStep),
    ]);
    let text = err.to_string();
    assert!(text.contains("\\varphi_1(x) step 0: content is empty"));
    assert!(text.contains("final step: final step is missing"));
    assert_eq!(err.problems().len(), 2);
}

#[test]
fn problems_empty_for_local_errors() {
    assert!(ValidationError::DuplicateMarker.problems().is_empty());
}

#[test]
fn error_codes_are_distinct() {
    let errors = [
        ValidationError::EmptyContent,
        ValidationError::IndexOutOfRange { index: 1, len: 0 },
        ValidationError::LastStepProtected,
        ValidationError::SequenceEmpty,
        ValidationError::DuplicateMarker,
        ValidationError::AttemptExhausted,
        ValidationError::SubmissionFailed("timeout".into()),
        ValidationError::ModeMismatch(Mode::Plain),
        ValidationError::BranchInUse { index: 0 },
        ValidationError::LastBranchProtected,
        ValidationError::Invalid(Vec::new()),
    ];
    let mut codes: Vec<&str> = errors.iter().map(ValidationError::error_code).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), errors.len());
}

#[test]
fn mode_mismatch_names_mode() {
    let err = ValidationError::ModeMismatch(Mode::Integral);
    assert_eq!(err.to_string(), "operation not available in integral mode");
}

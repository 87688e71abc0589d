//! Percentage score shown after grading.

/// 100 for a correct solution; otherwise the share of steps the grader did
/// not flag, rounded half up. Never negative, `0` when nothing was gradeable.
#[must_use]
pub fn score(total_steps: usize, error_count: usize, success: bool) -> u8 {
    if success {
        return 100;
    }
    if total_steps == 0 {
        return 0;
    }
    let correct = total_steps.saturating_sub(error_count);
    let percent = (correct * 200 + total_steps) / (2 * total_steps);
    u8::try_from(percent).unwrap_or(100)
}

#[cfg(test)]
#[path = "score_test.rs"]
mod tests;

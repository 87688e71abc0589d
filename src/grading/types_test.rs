use super::*;
use crate::sequence::Phase;
use serde_json::json;

#[test]
fn parse_success_response() {
    let resp: GradingResponse = serde_json::from_value(json!({
        "success": true,
        "message": "Решение верное. Предел = 1",
        "solution_id": 17
    }))
    .unwrap();
    assert!(resp.success);
    assert_eq!(resp.message.as_deref(), Some("Решение верное. Предел = 1"));
    assert!(resp.errors.is_empty());
    assert_eq!(resp.solution_id, Some(17));
}

#[test]
fn parse_contract_error_list() {
    let resp: GradingResponse = serde_json::from_value(json!({
        "success": false,
        "errors": [
            { "stepIndex": 2, "branchLabel": "\\varphi_1(x)", "error": "bad step", "hint": "check the sign" },
            { "stepIndex": 0, "error": "no hint" }
        ]
    }))
    .unwrap();
    assert!(!resp.success);
    assert_eq!(resp.errors.len(), 2);
    assert_eq!(resp.errors[0].branch_label.as_deref(), Some("\\varphi_1(x)"));
    assert_eq!(resp.errors[0].hint.as_deref(), Some("check the sign"));
    assert_eq!(resp.errors[1].hint, None);
}

#[test]
fn parse_legacy_step_and_phi_index_fields() {
    let resp: GradingResponse = serde_json::from_value(json!({
        "success": false,
        "errors": [
            { "step": 3, "error": "Некорректное преобразование", "hint": "" },
            { "phiIndex": -1, "error": "Неверный окончательный ответ" }
        ]
    }))
    .unwrap();
    assert_eq!(resp.errors[0].step_index, 3);
    assert!(!resp.errors[0].targets_final_step());
    assert_eq!(resp.errors[1].step_index, 0);
    assert!(resp.errors[1].targets_final_step());
}

#[test]
fn task_id_accepts_number_or_string() {
    let numeric: TaskInfo = serde_json::from_value(json!({ "id": 5, "title": "t" })).unwrap();
    assert_eq!(numeric.id, "5");
    let text: TaskInfo = serde_json::from_value(json!({ "id": "abc", "title": "t", "limitVar": "x" })).unwrap();
    assert_eq!(text.id, "abc");
    assert_eq!(text.limit_var.as_deref(), Some("x"));
}

#[test]
fn task_id_rejects_other_shapes() {
    let err = serde_json::from_value::<TaskInfo>(json!({ "id": [1], "title": "t" })).unwrap_err();
    assert!(err.to_string().contains("invalid task id"));
}

#[test]
fn last_integral_restores_attempted_builder() {
    let last: LastIntegralSolution = serde_json::from_value(json!({
        "phiSteps": [
            { "label": "\\varphi_0(x)", "steps": ["x"] },
            { "label": "\\varphi_1(x)", "steps": ["x - \\frac{x^3}{6}"] }
        ],
        "final": "\\sin x"
    }))
    .unwrap();
    let builder = last.into_builder("4").unwrap();
    assert_eq!(builder.phase(), Phase::Attempted);
    assert_eq!(builder.task_id(), "4");
    assert_eq!(builder.branches().len(), 2);
    assert_eq!(builder.final_step(), Some("\\sin x"));
}

#[test]
fn last_integral_empty_means_no_previous_attempt() {
    let last: LastIntegralSolution = serde_json::from_value(json!({ "phiSteps": [], "final": "" })).unwrap();
    assert!(last.into_builder("4").is_none());
}

use super::*;
use crate::sequence::{StepKind, StepSequenceBuilder};
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

/// Serve `router` on an ephemeral port and return the API base URL.
async fn spawn_grader(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn client(base_url: &str) -> HttpGradingClient {
    let mut config = GradingConfig::new(base_url);
    config.timeouts.request_secs = 1;
    config.timeouts.connect_secs = 1;
    HttpGradingClient::new(&config).unwrap()
}

async fn check_plain(Json(payload): Json<SubmissionPayload>) -> Json<Value> {
    let SubmissionPayload::Plain(plain) = payload else {
        return Json(json!({ "success": false, "message": "wrong endpoint" }));
    };
    let has_marker = plain.steps.iter().any(|s| s.kind == StepKind::LimitMarker);
    if has_marker {
        Json(json!({ "success": true, "message": "Решение верное. Предел = 1", "solution_id": 3 }))
    } else {
        Json(json!({
            "success": false,
            "errors": [{ "step": 1, "error": "Некорректное преобразование", "hint": "Проверьте запись выражения" }]
        }))
    }
}

async fn check_integral(Json(payload): Json<SubmissionPayload>) -> Json<Value> {
    let SubmissionPayload::Integral(integral) = payload else {
        return Json(json!({ "success": false, "message": "wrong endpoint" }));
    };
    Json(json!({
        "success": integral.user.is_some(),
        "message": format!("{} branches", integral.phi_branches.len())
    }))
}

fn grader_router() -> Router {
    Router::new()
        .route("/api/solutions/check", post(check_plain))
        .route("/api/solutions/check-integral", post(check_integral))
        .route(
            "/api/tasks/{id}",
            get(|Path(id): Path<i64>| async move {
                Json(json!({ "id": id, "title": "Volterra", "description": "", "limitVar": "x" }))
            }),
        )
        .route("/api/tasks/{id}/start", post(|| async { Json(json!({ "solution_id": 11 })) }))
        .route(
            "/api/solutions/{id}/finish",
            post(|| async { Json(json!({ "success": true, "message": "Solution marked as completed" })) }),
        )
        .route(
            "/api/solutions/last-integral/{id}",
            get(|| async {
                Json(json!({ "phiSteps": [{ "label": "\\varphi_0(x)", "steps": ["x"] }], "final": "\\sin x" }))
            }),
        )
}

#[test]
fn check_path_follows_payload_shape() {
    let mut plain = StepSequenceBuilder::plain("1");
    plain.add_step("x").unwrap();
    assert_eq!(check_path(&plain.serialize().unwrap()), "/solutions/check");

    let mut integral = StepSequenceBuilder::integral_seeded("1", "x");
    integral.set_final_step("x").unwrap();
    assert_eq!(check_path(&integral.serialize().unwrap()), "/solutions/check-integral");
}

#[test]
fn new_rejects_bad_base_url() {
    let config = GradingConfig::new("localhost:5000");
    assert!(matches!(HttpGradingClient::new(&config), Err(GradingError::ConfigParse(_))));
}

#[tokio::test]
async fn check_posts_plain_payload() {
    let base = spawn_grader(grader_router()).await;
    let grader = client(&base);

    let mut builder = StepSequenceBuilder::limit("1");
    builder.add_step("\\frac{x+1}{x}").unwrap();
    builder.add_limit_marker().unwrap();
    let resp = grader.check(&builder.serialize().unwrap()).await.unwrap();
    assert!(resp.success);
    assert_eq!(resp.solution_id, Some(3));
}

#[tokio::test]
async fn check_surfaces_step_errors() {
    let base = spawn_grader(grader_router()).await;
    let grader = client(&base);

    let mut builder = StepSequenceBuilder::plain("1");
    builder.add_step("x^2").unwrap();
    let resp = grader.check(&builder.serialize().unwrap()).await.unwrap();
    assert!(!resp.success);
    assert_eq!(resp.errors.len(), 1);
    assert_eq!(resp.errors[0].step_index, 1);
}

#[tokio::test]
async fn check_posts_integral_payload_to_integral_endpoint() {
    let base = spawn_grader(grader_router()).await;
    let grader = client(&base);

    let mut builder = StepSequenceBuilder::integral_seeded("2", "x");
    builder.set_final_step("\\sin x").unwrap();
    let payload = builder.serialize().unwrap().with_user(Some("student"));
    let resp = grader.check(&payload).await.unwrap();
    assert!(resp.success);
    assert_eq!(resp.message.as_deref(), Some("1 branches"));
}

#[tokio::test]
async fn task_endpoints_round_trip() {
    let base = spawn_grader(grader_router()).await;
    let grader = client(&base);

    let task = grader.fetch_task("8").await.unwrap();
    assert_eq!(task.id, "8");
    assert_eq!(task.limit_var.as_deref(), Some("x"));

    let started = grader.start_solution("8").await.unwrap();
    assert_eq!(started.solution_id, 11);

    grader.finish(started.solution_id).await.unwrap();

    let last = grader.last_integral("8").await.unwrap();
    assert_eq!(last.final_answer, "\\sin x");
    assert_eq!(last.phi_steps.len(), 1);
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let router = Router::new().route(
        "/api/solutions/check",
        post(|| async { (StatusCode::NOT_FOUND, Json(json!({ "error": "Задача не найдена" }))) }),
    );
    let base = spawn_grader(router).await;
    let grader = client(&base);

    let mut builder = StepSequenceBuilder::plain("404");
    builder.add_step("x").unwrap();
    let err = grader.check(&builder.serialize().unwrap()).await.unwrap_err();
    assert!(matches!(err, GradingError::Status { status: 404, ref body } if body.contains("error")));
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let router = Router::new().route("/api/solutions/check", post(|| async { "not json" }));
    let base = spawn_grader(router).await;
    let grader = client(&base);

    let mut builder = StepSequenceBuilder::plain("1");
    builder.add_step("x").unwrap();
    let err = grader.check(&builder.serialize().unwrap()).await.unwrap_err();
    assert!(matches!(err, GradingError::Parse(_)));
}

#[tokio::test]
async fn slow_grader_times_out() {
    let router = Router::new().route(
        "/api/solutions/check",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({ "success": true }))
        }),
    );
    let base = spawn_grader(router).await;
    let grader = client(&base);

    let mut builder = StepSequenceBuilder::plain("1");
    builder.add_step("x").unwrap();
    let err = grader.check(&builder.serialize().unwrap()).await.unwrap_err();
    assert!(matches!(err, GradingError::Request(_)));
}

#[tokio::test]
async fn unreachable_grader_is_a_request_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let grader = client(&format!("http://{addr}/api"));
    let err = grader.fetch_task("1").await.unwrap_err();
    assert!(matches!(err, GradingError::Request(_)));
}

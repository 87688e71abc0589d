//! `reqwest` client for the grading service.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::Grader;
use super::config::GradingConfig;
use super::types::{GradingError, GradingResponse, LastIntegralSolution, StartedSolution, TaskInfo};
use crate::sequence::SubmissionPayload;

const CHECK_PATH: &str = "/solutions/check";
const CHECK_INTEGRAL_PATH: &str = "/solutions/check-integral";

/// Endpoint a payload is posted to.
#[must_use]
pub fn check_path(payload: &SubmissionPayload) -> &'static str {
    match payload {
        SubmissionPayload::Plain(_) => CHECK_PATH,
        SubmissionPayload::Integral(_) => CHECK_INTEGRAL_PATH,
    }
}

pub struct HttpGradingClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGradingClient {
    /// # Errors
    ///
    /// Returns an error if the base URL is malformed or the HTTP client fails to build.
    pub fn new(config: &GradingConfig) -> Result<Self, GradingError> {
        super::config::validate_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| GradingError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_task(&self, task_id: &str) -> Result<TaskInfo, GradingError> {
        self.get_json(&format!("/tasks/{task_id}")).await
    }

    /// Open a solution record on the grader; its id is needed to finish early.
    pub async fn start_solution(&self, task_id: &str) -> Result<StartedSolution, GradingError> {
        self.send_json(reqwest::Method::POST, &format!("/tasks/{task_id}/start"), None::<&()>)
            .await
    }

    pub async fn last_integral(&self, task_id: &str) -> Result<LastIntegralSolution, GradingError> {
        self.get_json(&format!("/solutions/last-integral/{task_id}"))
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GradingError> {
        self.send_json(reqwest::Method::GET, path, None::<&()>)
            .await
    }

    async fn send_json<B, T>(&self, method: reqwest::Method, path: &str, body: Option<&B>) -> Result<T, GradingError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "grader request");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| GradingError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GradingError::Request(e.to_string()))?;
        if !status.is_success() {
            warn!(status = status.as_u16(), path, "grader returned error status");
            return Err(GradingError::Status { status: status.as_u16(), body: text });
        }
        serde_json::from_str(&text).map_err(|e| GradingError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Grader for HttpGradingClient {
    async fn check(&self, payload: &SubmissionPayload) -> Result<GradingResponse, GradingError> {
        self.send_json(reqwest::Method::POST, check_path(payload), Some(payload))
            .await
    }

    async fn finish(&self, solution_id: i64) -> Result<(), GradingError> {
        let path = format!("/solutions/{solution_id}/finish");
        self.send_json::<(), serde_json::Value>(reqwest::Method::POST, &path, None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

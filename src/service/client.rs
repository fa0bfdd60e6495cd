//! HTTP client for the document QA service.
//!
//! Implements [`TestSetProvider`] and [`GradingClient`] over the service's
//! JSON endpoints.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::wire::{
    DocumentsResponse, ErrorDetail, GenerateResponse, RunSingleRequest, RunSingleResponse,
};
use crate::config::ServiceConfig;
use crate::error::{CollaboratorError, EvalError, Result};
use crate::eval::collaborator::{GradingClient, TestItem, TestSetProvider};
use crate::eval::selection::DocumentSelection;
use crate::eval::task::GradeResult;

/// Longest slice of an error body echoed into a failure reason.
const MAX_ERROR_BODY: usize = 300;

/// Client for the QA service's document and evaluation endpoints.
#[derive(Clone)]
pub struct QaServiceClient {
    client: Client,
    config: ServiceConfig,
}

impl QaServiceClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Build an endpoint URL under the configured base.
    fn endpoint(&self, path: &str) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Send a request and decode a JSON body, classifying failures.
    async fn send_json<R: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<R, CollaboratorError> {
        let response = self.authorized(request).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// List the documents the service has indexed.
    pub async fn list_documents(&self) -> Result<Vec<String>> {
        let request = self.client.get(self.endpoint("documents"));
        let response: DocumentsResponse = self
            .send_json(request)
            .await
            .map_err(|e| EvalError::Http(e.to_string()))?;
        Ok(response.documents)
    }

    /// Test connectivity to the service; returns the number of indexed documents.
    pub async fn test_connection(&self) -> Result<usize> {
        Ok(self.list_documents().await?.len())
    }
}

#[async_trait]
impl TestSetProvider for QaServiceClient {
    async fn generate(
        &self,
        selection: &DocumentSelection,
        sample_count: usize,
    ) -> std::result::Result<Vec<TestItem>, CollaboratorError> {
        debug!(documents = %selection, sample_count, "POST evaluate/generate");

        let request = self
            .client
            .post(self.endpoint("evaluate/generate"))
            .query(&[("num_samples", sample_count)])
            .json(&selection.to_vec());

        let response: GenerateResponse = self.send_json(request).await?;

        match (response.test_set, response.error) {
            (Some(items), _) => Ok(items),
            (None, Some(error)) => {
                warn!(error = %error, "Service reported no test data");
                Ok(Vec::new())
            }
            (None, None) => Err(CollaboratorError::Fatal(
                "response has neither test_set nor error".to_string(),
            )),
        }
    }
}

#[async_trait]
impl GradingClient for QaServiceClient {
    async fn grade(
        &self,
        question: &str,
        reference_answer: &str,
        selection: &DocumentSelection,
    ) -> std::result::Result<GradeResult, CollaboratorError> {
        let body = RunSingleRequest {
            question,
            true_answer: reference_answer,
            files: selection.to_vec(),
        };

        let request = self
            .client
            .post(self.endpoint("evaluate/run_single"))
            .json(&body);

        let response: RunSingleResponse = self.send_json(request).await?;
        response.into_grade_result()
    }
}

/// Map a non-success status and its body to a collaborator error.
fn classify_status(status: StatusCode, body: &str) -> CollaboratorError {
    let detail = serde_json::from_str::<ErrorDetail>(body)
        .map(|e| match e.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|_| body.chars().take(MAX_ERROR_BODY).collect());

    let message = format!("request failed ({}): {}", status, detail);

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        CollaboratorError::Transient(message)
    } else {
        CollaboratorError::Fatal(message)
    }
}

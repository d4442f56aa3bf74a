use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use meritpath_citation::{CiterData, CiterDetail, JobRequest, JobSubmission, UserProfile};
use meritpath_core::{DomainError, UserId};

use super::{AccessTokenSource, CitationApi, FetchError};

/// [`CitationApi`] over HTTP with bearer authentication.
#[derive(Clone)]
pub struct HttpCitationApi {
    client: reqwest::Client,
    base_url: String,
    token: Arc<dyn AccessTokenSource>,
}

impl core::fmt::Debug for HttpCitationApi {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpCitationApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpCitationApi {
    pub fn new(
        base_url: impl Into<String>,
        token: Arc<dyn AccessTokenSource>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, FetchError> {
        let token = self.token.access_token().ok_or(FetchError::NoSession)?;

        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Api(status.as_u16(), body));
        }

        resp.json().await.map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// Truthiness of a JSON value as the web client evaluates it.
fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// The citers route answers either a bare list or `{ "citers": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CitersResponse {
    List(Vec<CiterData>),
    Wrapped { citers: Vec<CiterData> },
}

#[async_trait]
impl CitationApi for HttpCitationApi {
    async fn job_done(&self, user_id: UserId) -> Result<bool, FetchError> {
        let url = self.url(&format!("/api/users/{user_id}/job_done"));
        let body: JsonValue = self.send(self.client.get(url)).await?;
        let done = body.get("job_done").is_some_and(is_truthy);
        debug!(%user_id, job_done = done, "fetched remote job status");
        Ok(done)
    }

    async fn submit_job(&self, request: &JobRequest) -> Result<JobSubmission, FetchError> {
        let url = self.url("/api/sqs/jobs");
        let submission: JobSubmission = self.send(self.client.post(url).json(request)).await?;
        if submission.is_rejected() {
            return Err(FetchError::Rejected(
                submission
                    .message
                    .unwrap_or_else(|| "job could not be queued".to_string()),
            ));
        }
        Ok(submission)
    }

    async fn profile(&self, user_id: UserId) -> Result<UserProfile, FetchError> {
        let url = self.url(&format!("/api/users/{user_id}"));
        self.send(self.client.get(url)).await
    }

    async fn update_semantic_scholar_id(
        &self,
        user_id: UserId,
        semantic_scholar_id: &str,
    ) -> Result<UserProfile, FetchError> {
        let id = semantic_scholar_id.trim();
        if id.is_empty() {
            return Err(DomainError::validation("Semantic Scholar ID cannot be empty").into());
        }

        let url = self.url(&format!("/api/users/{user_id}/semantic-scholar-id"));
        let body = json!({ "semantic_scholar_id": id });
        self.send(self.client.put(url).json(&body)).await
    }

    async fn citers(&self, user_id: UserId) -> Result<Vec<CiterData>, FetchError> {
        let url = self.url(&format!("/api/users/{user_id}/citers"));
        let resp: CitersResponse = self.send(self.client.get(url)).await?;
        Ok(match resp {
            CitersResponse::List(citers) | CitersResponse::Wrapped { citers } => citers,
        })
    }

    async fn citer_detail(&self, citer_id: &str) -> Result<CiterDetail, FetchError> {
        let id = citer_id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(DomainError::invalid_id(format!("citer id {citer_id:?}")).into());
        }

        let url = self.url(&format!("/api/users/{id}/individual_citer"));
        self.send(self.client.get(url)).await
    }
}

//! Backend HTTP API used by the citation session.

use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use meritpath_citation::{CiterData, CiterDetail, JobRequest, JobSubmission, UserProfile};
use meritpath_core::{DomainError, UserId};

mod http;

pub use http::HttpCitationApi;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no authenticated session")]
    NoSession,
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// The backend answered but refused the request (e.g. enqueue failed).
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Where the bearer token for API calls comes from.
///
/// `None` means there is no session; callers fail with
/// [`FetchError::NoSession`] without touching the network.
pub trait AccessTokenSource: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// Token held in memory for the lifetime of a login session.
#[derive(Debug, Default)]
pub struct SessionToken {
    token: RwLock<Option<String>>,
}

impl SessionToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token.into());
    }

    pub fn clear(&self) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

impl AccessTokenSource for SessionToken {
    fn access_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|t| !t.is_empty())
    }
}

impl<T: AccessTokenSource + ?Sized> AccessTokenSource for std::sync::Arc<T> {
    fn access_token(&self) -> Option<String> {
        (**self).access_token()
    }
}

/// Authenticated calls the citation flow makes against the backend.
#[async_trait]
pub trait CitationApi: Send + Sync {
    /// `GET /api/users/{id}/job_done`: whether the user's citer job has finished.
    async fn job_done(&self, user_id: UserId) -> Result<bool, FetchError>;

    /// `POST /api/sqs/jobs`.
    async fn submit_job(&self, request: &JobRequest) -> Result<JobSubmission, FetchError>;

    /// `GET /api/users/{id}`.
    async fn profile(&self, user_id: UserId) -> Result<UserProfile, FetchError>;

    /// `PUT /api/users/{id}/semantic-scholar-id`, returning the updated profile.
    async fn update_semantic_scholar_id(
        &self,
        user_id: UserId,
        semantic_scholar_id: &str,
    ) -> Result<UserProfile, FetchError>;

    /// `GET /api/users/{id}/citers`.
    async fn citers(&self, user_id: UserId) -> Result<Vec<CiterData>, FetchError>;

    /// `GET /api/users/{citer_id}/individual_citer`: one citer and the papers
    /// through which they cited the user.
    async fn citer_detail(&self, citer_id: &str) -> Result<CiterDetail, FetchError>;
}

#[async_trait]
impl<A: CitationApi + ?Sized> CitationApi for std::sync::Arc<A> {
    async fn job_done(&self, user_id: UserId) -> Result<bool, FetchError> {
        (**self).job_done(user_id).await
    }

    async fn submit_job(&self, request: &JobRequest) -> Result<JobSubmission, FetchError> {
        (**self).submit_job(request).await
    }

    async fn profile(&self, user_id: UserId) -> Result<UserProfile, FetchError> {
        (**self).profile(user_id).await
    }

    async fn update_semantic_scholar_id(
        &self,
        user_id: UserId,
        semantic_scholar_id: &str,
    ) -> Result<UserProfile, FetchError> {
        (**self)
            .update_semantic_scholar_id(user_id, semantic_scholar_id)
            .await
    }

    async fn citers(&self, user_id: UserId) -> Result<Vec<CiterData>, FetchError> {
        (**self).citers(user_id).await
    }

    async fn citer_detail(&self, citer_id: &str) -> Result<CiterDetail, FetchError> {
        (**self).citer_detail(citer_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_counts_as_no_session() {
        let token = SessionToken::new(Some(String::new()));
        assert_eq!(token.access_token(), None);

        token.set("abc");
        assert_eq!(token.access_token().as_deref(), Some("abc"));

        token.clear();
        assert_eq!(token.access_token(), None);
    }
}

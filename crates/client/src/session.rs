//! View-facing citation session.
//!
//! A [`CitationSession`] bundles what the dashboard views of one signed-in
//! user share: the job-status store, the backend API, the realtime listener
//! and the alert channel. It is constructed explicitly and passed around; no
//! global state.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{info, warn};

use meritpath_citation::{
    CiterDetail, CitersPage, CitersQuery, EligibilityRule, JobRequest, JobStatus, JobSubmission, UserProfile,
};
use meritpath_core::UserId;
use meritpath_events::ChangeFeed;
use meritpath_infra::{
    CitationApi, CitationStore, FetchError, FileStateStorage, HttpCitationApi, ListenerError,
    ListenerHandle, RealtimeListener, SessionToken,
};

use crate::config::ClientConfig;
use crate::notifier::{ANALYSIS_FAILED, ANALYSIS_STARTED, Notifier, TracingNotifier};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("profile is not eligible for citation analysis")]
    NotEligible,
    #[error("citation analysis is already running")]
    AlreadyProcessing,
    #[error("citation analysis has already completed")]
    AlreadyDone,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Outcome of evaluating a freshly loaded profile.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProfileCheck {
    pub eligible: bool,
    /// The user should be prompted to link a Semantic Scholar author id.
    pub needs_semantic_scholar_id: bool,
}

/// What the citers view shows for the current job status.
///
/// The list is only fetched once the job is done; before that the view shows
/// a status message instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitersView {
    NotStarted,
    Processing,
    Ready(CitersPage),
}

impl CitersView {
    /// Text shown in place of the table, if any.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            CitersView::NotStarted => Some("Citation analysis has not started yet."),
            CitersView::Processing => Some(
                "We're currently analyzing your citation network. This may take a few minutes.",
            ),
            CitersView::Ready(_) => None,
        }
    }

    pub fn page(&self) -> Option<&CitersPage> {
        match self {
            CitersView::Ready(page) => Some(page),
            _ => None,
        }
    }
}

pub struct CitationSession<A> {
    user_id: UserId,
    store: Arc<CitationStore>,
    api: A,
    token: Arc<SessionToken>,
    notifier: Arc<dyn Notifier>,
    eligibility: EligibilityRule,
    listener: Mutex<Option<ListenerHandle>>,
}

impl<A> core::fmt::Debug for CitationSession<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CitationSession")
            .field("user_id", &self.user_id)
            .field("state", &self.store.snapshot())
            .field("eligibility", &self.eligibility)
            .finish_non_exhaustive()
    }
}

impl CitationSession<HttpCitationApi> {
    /// Session against the configured backend, with state persisted under
    /// `config.state_dir`.
    pub fn from_config(config: &ClientConfig, user_id: UserId) -> Result<Self, FetchError> {
        let token = Arc::new(SessionToken::new(config.access_token.clone()));
        let api = HttpCitationApi::new(&config.api_url, token.clone(), config.http_timeout)?;
        let store = Arc::new(CitationStore::open(Arc::new(FileStateStorage::in_dir(
            &config.state_dir,
        ))));

        Ok(Self::new(user_id, store, api)
            .with_token(token)
            .with_eligibility_rule(config.eligibility_rule))
    }
}

impl<A: CitationApi> CitationSession<A> {
    pub fn new(user_id: UserId, store: Arc<CitationStore>, api: A) -> Self {
        Self {
            user_id,
            store,
            api,
            token: Arc::new(SessionToken::default()),
            notifier: Arc::new(TracingNotifier),
            eligibility: EligibilityRule::default(),
            listener: Mutex::new(None),
        }
    }

    /// Token cleared on [`logout`](Self::logout). Should be the one `api` reads.
    pub fn with_token(mut self, token: Arc<SessionToken>) -> Self {
        self.token = token;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_eligibility_rule(mut self, rule: EligibilityRule) -> Self {
        self.eligibility = rule;
        self
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn store(&self) -> &Arc<CitationStore> {
        &self.store
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Recompute eligibility for a freshly loaded profile.
    pub fn on_profile_loaded(&self, profile: &UserProfile) -> ProfileCheck {
        let eligible = self.eligibility.is_eligible(profile);
        self.store.set_eligible(eligible);

        ProfileCheck {
            eligible,
            needs_semantic_scholar_id: profile.needs_semantic_scholar_id(),
        }
    }

    /// Fetch the user's profile and evaluate it.
    pub async fn load_profile(&self) -> Result<(UserProfile, ProfileCheck), FetchError> {
        let profile = self.api.profile(self.user_id).await?;
        let check = self.on_profile_loaded(&profile);
        Ok((profile, check))
    }

    /// Link a Semantic Scholar author id, then reload the profile so counts
    /// and eligibility reflect the new author.
    pub async fn link_semantic_scholar_id(
        &self,
        semantic_scholar_id: &str,
    ) -> Result<(UserProfile, ProfileCheck), FetchError> {
        self.api
            .update_semantic_scholar_id(self.user_id, semantic_scholar_id)
            .await?;
        info!(user_id = %self.user_id, "semantic scholar id linked");
        self.load_profile().await
    }

    /// One-shot poll of the backend job status.
    pub async fn check_remote_status(&self) -> Result<bool, FetchError> {
        self.store.check_remote_status(&self.api, self.user_id).await
    }

    /// Queue the citer-discovery job.
    ///
    /// Only allowed from `NotStarted` with an eligible profile. The store
    /// moves to `Processing` before the request; if the request fails it is
    /// put back to `NotStarted`. Either way the user is alerted.
    pub async fn start_analysis(&self) -> Result<JobSubmission, SubmitError> {
        let state = self.store.snapshot();
        if !state.is_eligible {
            return Err(SubmitError::NotEligible);
        }
        match state.status {
            JobStatus::NotStarted => {}
            JobStatus::Processing => return Err(SubmitError::AlreadyProcessing),
            JobStatus::Done => return Err(SubmitError::AlreadyDone),
        }

        self.store.set_status(JobStatus::Processing);

        match self.api.submit_job(&JobRequest::find_citers(self.user_id)).await {
            Ok(submission) => {
                info!(
                    user_id = %self.user_id,
                    job_id = submission.job_id.as_deref().unwrap_or("-"),
                    "citation analysis queued"
                );
                self.notifier.alert(ANALYSIS_STARTED);
                Ok(submission)
            }
            Err(err) => {
                warn!(user_id = %self.user_id, error = %err, "error starting citation analysis");
                self.store.set_status(JobStatus::NotStarted);
                self.notifier.alert(ANALYSIS_FAILED);
                Err(err.into())
            }
        }
    }

    /// Render the citers view for the current job status. The list is
    /// fetched only when the job is done.
    pub async fn citers(&self, query: &CitersQuery) -> Result<CitersView, FetchError> {
        match self.store.status() {
            JobStatus::NotStarted => Ok(CitersView::NotStarted),
            JobStatus::Processing => Ok(CitersView::Processing),
            JobStatus::Done => {
                let citers = self.api.citers(self.user_id).await?;
                Ok(CitersView::Ready(query.apply(&citers)))
            }
        }
    }

    /// One citer and the user's papers they cited.
    pub async fn citer_detail(&self, citer_id: &str) -> Result<CiterDetail, FetchError> {
        self.api.citer_detail(citer_id).await
    }

    /// Start following job updates for this user on `feed`.
    ///
    /// A listener that is already attached is stopped first.
    pub fn attach_realtime<F>(&self, feed: &F) -> Result<(), ListenerError>
    where
        F: ChangeFeed + ?Sized,
    {
        let handle = RealtimeListener::spawn(feed, self.user_id, self.store.clone())?;
        let previous = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.stop();
        }
        Ok(())
    }

    /// Stop the realtime listener, if any.
    pub fn detach_realtime(&self) {
        let handle = self.listener.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.stop();
        }
    }

    pub fn is_realtime_attached(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(ListenerHandle::is_running)
    }

    /// Tear the session down: stop listening, forget the state and the token.
    pub fn logout(&self) {
        self.detach_realtime();
        self.store.reset();
        self.token.clear();
        info!(user_id = %self.user_id, "logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::collections::BTreeMap;

    use meritpath_citation::{CiterData, SortKey};
    use meritpath_events::{InMemoryChangeFeed, RowChange};
    use meritpath_infra::AccessTokenSource;
    use serde_json::json;
    use std::time::Duration;

    use crate::notifier::RecordingNotifier;

    /// Scripted backend.
    #[derive(Default)]
    struct FakeApi {
        job_done: bool,
        fail_submit: bool,
        profile: Option<UserProfile>,
        citers: Vec<CiterData>,
        citer_fetches: Mutex<usize>,
        submitted: Mutex<Vec<JobRequest>>,
        linked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CitationApi for FakeApi {
        async fn job_done(&self, _user_id: UserId) -> Result<bool, FetchError> {
            Ok(self.job_done)
        }

        async fn submit_job(&self, request: &JobRequest) -> Result<JobSubmission, FetchError> {
            self.submitted.lock().unwrap().push(request.clone());
            if self.fail_submit {
                return Err(FetchError::Network("connection reset".into()));
            }
            Ok(JobSubmission {
                status: Some("success".into()),
                job_id: Some("j-1".into()),
                ..JobSubmission::default()
            })
        }

        async fn profile(&self, user_id: UserId) -> Result<UserProfile, FetchError> {
            let mut profile = self.profile.clone().ok_or(FetchError::Api(404, String::new()))?;
            profile.id = user_id;
            if let Some(id) = self.linked.lock().unwrap().last() {
                profile.semantic_scholar_id = Some(id.clone());
            }
            Ok(profile)
        }

        async fn update_semantic_scholar_id(
            &self,
            user_id: UserId,
            semantic_scholar_id: &str,
        ) -> Result<UserProfile, FetchError> {
            self.linked.lock().unwrap().push(semantic_scholar_id.to_string());
            Ok(UserProfile::new(user_id))
        }

        async fn citers(&self, _user_id: UserId) -> Result<Vec<CiterData>, FetchError> {
            *self.citer_fetches.lock().unwrap() += 1;
            Ok(self.citers.clone())
        }

        async fn citer_detail(&self, citer_id: &str) -> Result<CiterDetail, FetchError> {
            let citer = self
                .citers
                .iter()
                .find(|c| c.citer_id == citer_id)
                .cloned()
                .ok_or(FetchError::Api(404, String::new()))?;
            let papers = BTreeMap::from([(
                "Notes".to_string(),
                vec![format!("{} on Notes", citer.citer_name)],
            )]);
            Ok(CiterDetail { citer, papers })
        }
    }

    fn sample_citers(n: u64) -> Vec<CiterData> {
        (0..n)
            .map(|i| CiterData {
                citer_id: format!("c{i}"),
                semantic_scholar_id: format!("s{i}"),
                citer_name: format!("Citer {i}"),
                paper_count: i,
                total_citations: 10 * i,
            })
            .collect()
    }

    fn profile_with(papers: u32) -> UserProfile {
        let mut p = UserProfile::new(UserId::new());
        p.author_paper_count = Some(papers);
        p.influential_citation_count = Some(1);
        p
    }

    fn session(api: FakeApi) -> (CitationSession<FakeApi>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let session = CitationSession::new(UserId::new(), Arc::new(CitationStore::in_memory()), api)
            .with_notifier(notifier.clone());
        (session, notifier)
    }

    #[test]
    fn profile_load_sets_eligibility_at_the_boundary() {
        let (session, _) = session(FakeApi::default());

        let check = session.on_profile_loaded(&profile_with(9));
        assert!(check.eligible);
        assert!(session.store().is_eligible());

        let check = session.on_profile_loaded(&profile_with(10));
        assert!(!check.eligible);
        assert!(!session.store().is_eligible());
        assert!(check.needs_semantic_scholar_id);
    }

    #[test]
    fn stricter_rule_also_checks_influential_citations() {
        let (session, _) = session(FakeApi::default());
        let session = session.with_eligibility_rule(EligibilityRule::PaperCountAndInfluentialCitations);

        let mut p = profile_with(3);
        p.influential_citation_count = Some(5);
        assert!(!session.on_profile_loaded(&p).eligible);
    }

    #[tokio::test]
    async fn failed_submission_rolls_back_and_alerts() {
        let (session, notifier) = session(FakeApi {
            fail_submit: true,
            ..FakeApi::default()
        });
        session.store().set_eligible(true);
        let watch = session.store().watch();

        let err = session.start_analysis().await.unwrap_err();

        assert!(matches!(err, SubmitError::Fetch(FetchError::Network(_))));
        let statuses: Vec<_> = watch.drain().into_iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec![JobStatus::Processing, JobStatus::NotStarted]);
        assert_eq!(notifier.messages(), vec![ANALYSIS_FAILED.to_string()]);
    }

    #[tokio::test]
    async fn successful_submission_stays_processing() {
        let (session, notifier) = session(FakeApi::default());
        session.store().set_eligible(true);

        let submission = session.start_analysis().await.unwrap();

        assert_eq!(submission.job_id.as_deref(), Some("j-1"));
        assert_eq!(session.store().status(), JobStatus::Processing);
        assert_eq!(notifier.messages(), vec![ANALYSIS_STARTED.to_string()]);
        assert_eq!(
            session.api().submitted.lock().unwrap().clone(),
            vec![JobRequest::find_citers(session.user_id())]
        );
    }

    #[tokio::test]
    async fn submission_is_gated_on_eligibility_and_running_job() {
        let (session, notifier) = session(FakeApi::default());

        assert!(matches!(session.start_analysis().await, Err(SubmitError::NotEligible)));

        session.store().set_eligible(true);
        session.store().set_status(JobStatus::Processing);
        assert!(matches!(
            session.start_analysis().await,
            Err(SubmitError::AlreadyProcessing)
        ));

        assert!(session.api().submitted.lock().unwrap().is_empty());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn finished_analysis_cannot_be_restarted() {
        let (session, notifier) = session(FakeApi::default());
        session.store().set_eligible(true);
        session.store().set_status(JobStatus::Done);
        let watch = session.store().watch();

        assert!(matches!(session.start_analysis().await, Err(SubmitError::AlreadyDone)));

        assert_eq!(session.store().status(), JobStatus::Done);
        assert!(watch.drain().is_empty());
        assert!(session.api().submitted.lock().unwrap().is_empty());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn remote_poll_goes_through_the_store() {
        let (session, _) = session(FakeApi {
            job_done: true,
            ..FakeApi::default()
        });
        assert!(session.check_remote_status().await.unwrap());
        assert_eq!(session.store().status(), JobStatus::Done);
    }

    #[tokio::test]
    async fn linking_reloads_profile() {
        let (session, _) = session(FakeApi {
            profile: Some(profile_with(4)),
            ..FakeApi::default()
        });

        let (profile, check) = session.link_semantic_scholar_id("1741101").await.unwrap();

        assert_eq!(profile.semantic_scholar_id.as_deref(), Some("1741101"));
        assert!(!check.needs_semantic_scholar_id);
        assert!(check.eligible);
        assert!(session.store().is_eligible());
    }

    #[tokio::test]
    async fn citers_are_paged_client_side_once_done() {
        let (session, _) = session(FakeApi {
            citers: sample_citers(7),
            ..FakeApi::default()
        });
        session.store().set_status(JobStatus::Done);

        let mut query = CitersQuery::new();
        query.set_page_size(5).unwrap();
        query.request_sort(SortKey::PaperCount);
        let view = session.citers(&query).await.unwrap();

        assert_eq!(view.message(), None);
        let page = view.page().unwrap();
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.rows.len(), 5);
        assert_eq!(page.rows[0].citer_name, "Citer 0");
        assert_eq!(page.total_citations, 210);
        assert_eq!(*session.api().citer_fetches.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn citers_show_a_message_until_the_job_is_done() {
        let (session, _) = session(FakeApi {
            citers: sample_citers(3),
            ..FakeApi::default()
        });
        let query = CitersQuery::new();

        let view = session.citers(&query).await.unwrap();
        assert_eq!(view, CitersView::NotStarted);
        assert_eq!(view.message(), Some("Citation analysis has not started yet."));

        session.store().set_status(JobStatus::Processing);
        let view = session.citers(&query).await.unwrap();
        assert_eq!(view, CitersView::Processing);
        assert!(view.message().unwrap().starts_with("We're currently analyzing"));
        assert!(view.page().is_none());

        assert_eq!(*session.api().citer_fetches.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn citer_detail_comes_from_the_backend() {
        let (session, _) = session(FakeApi {
            citers: sample_citers(3),
            ..FakeApi::default()
        });

        let detail = session.citer_detail("c2").await.unwrap();
        assert_eq!(detail.citer.citer_name, "Citer 2");
        assert_eq!(detail.papers["Notes"], vec!["Citer 2 on Notes"]);

        let err = session.citer_detail("c9").await.unwrap_err();
        assert!(matches!(err, FetchError::Api(404, _)));
    }

    #[test]
    fn realtime_completion_then_logout() {
        let token = Arc::new(SessionToken::new(Some("tok".into())));
        let (session, _) = session(FakeApi::default());
        let session = session.with_token(token.clone());
        let feed = InMemoryChangeFeed::new();

        session.store().set_eligible(true);
        session.store().set_status(JobStatus::Processing);
        let watch = session.store().watch();
        session.attach_realtime(&feed).unwrap();
        assert!(session.is_realtime_attached());

        feed.publish(RowChange::update(
            "jobs",
            json!({}),
            json!({
                "user_id": session.user_id().to_string(),
                "job_type": "find_citers",
                "status": "failed"
            }),
        ))
        .unwrap();
        assert_eq!(
            watch.recv_timeout(Duration::from_secs(5)).unwrap().status,
            JobStatus::Done
        );

        session.logout();

        assert!(!session.is_realtime_attached());
        assert_eq!(session.store().status(), JobStatus::NotStarted);
        assert!(!session.store().is_eligible());
        assert_eq!(token.access_token(), None);
    }

    #[test]
    fn configured_session_persists_under_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            state_dir: dir.path().to_path_buf(),
            access_token: Some("tok".into()),
            eligibility_rule: EligibilityRule::PaperCountAndInfluentialCitations,
            ..ClientConfig::from_lookup(|_| None)
        };

        let session = CitationSession::from_config(&config, UserId::new()).unwrap();
        let mut p = profile_with(2);
        p.influential_citation_count = Some(9);
        assert!(!session.on_profile_loaded(&p).eligible);

        session.store().set_eligible(true);
        assert!(dir.path().join("citation-storage.json").exists());
        assert_eq!(session.api().base_url(), config.api_url);
    }

    #[test]
    fn reattaching_replaces_the_listener() {
        let (session, _) = session(FakeApi::default());
        let feed = InMemoryChangeFeed::new();

        session.attach_realtime(&feed).unwrap();
        session.attach_realtime(&feed).unwrap();

        let delivered = feed
            .publish(RowChange::update(
                "jobs",
                json!({}),
                json!({ "user_id": session.user_id().to_string(), "job_type": "x", "status": "pending" }),
            ))
            .unwrap();
        assert_eq!(delivered, 1);
        session.detach_realtime();
    }
}

//! Citation-analysis job status: state, events and the reducer.
//!
//! The state is tiny (`status` + `isEligible`) but it is written from several
//! places: explicit user actions, a one-shot server check on page load, and
//! asynchronous realtime notifications. Every write goes through
//! [`CitationAnalysisState::apply`] so the transitions stay in one place.

use serde::{Deserialize, Deserializer, Serialize};

use meritpath_core::{JobId, Reducer};
use meritpath_events::Event;

use crate::job::{JobType, RecordStatus};

/// Local view of the user's citation-discovery job.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    NotStarted,
    Processing,
    Done,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotStarted => "not_started",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted citation-analysis state, one per store.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationAnalysisState {
    pub status: JobStatus,
    pub is_eligible: bool,
}

/// A job-record update relevant to citation status, decoded from the `new`
/// image of a realtime row change.
///
/// Fields other than these are ignored; rows whose `job_type` or `status` are
/// missing or unknown fail to decode and never reach the reducer. An `id` that
/// is not a job uuid is dropped rather than failing the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusChanged {
    #[serde(
        default,
        rename = "id",
        deserialize_with = "lenient_job_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub job_id: Option<JobId>,
    pub job_type: JobType,
    pub status: RecordStatus,
}

fn lenient_job_id<'de, D>(deserializer: D) -> Result<Option<JobId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(|raw| raw.parse().ok()))
}

impl JobStatusChanged {
    /// Whether this update completes the user's citation job.
    ///
    /// `success` and `failed` are treated alike.
    pub fn completes_citation_job(&self) -> bool {
        self.job_type == JobType::FindCiters && self.status.is_terminal()
    }
}

/// Everything that can change [`CitationAnalysisState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CitationEvent {
    /// Unconditional overwrite of the status (no transition validation).
    StatusSet { status: JobStatus },
    /// Unconditional overwrite of the eligibility flag.
    EligibilitySet { eligible: bool },
    /// Back to defaults (logout / session teardown).
    Reset,
    /// Outcome of `GET /api/users/{id}/job_done`.
    RemoteStatusChecked { job_done: bool },
    /// Realtime notification for one of the user's job records.
    JobStatusChanged(JobStatusChanged),
}

impl Event for CitationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CitationEvent::StatusSet { .. } => "citation.status.set",
            CitationEvent::EligibilitySet { .. } => "citation.eligibility.set",
            CitationEvent::Reset => "citation.reset",
            CitationEvent::RemoteStatusChecked { .. } => "citation.remote_status.checked",
            CitationEvent::JobStatusChanged(_) => "citation.job.status_changed",
        }
    }
}

impl Reducer for CitationAnalysisState {
    type Event = CitationEvent;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CitationEvent::StatusSet { status } => self.status = *status,
            CitationEvent::EligibilitySet { eligible } => self.is_eligible = *eligible,
            CitationEvent::Reset => *self = Self::default(),
            CitationEvent::RemoteStatusChecked { job_done } => {
                if *job_done {
                    self.status = JobStatus::Done;
                }
            }
            CitationEvent::JobStatusChanged(change) => {
                if change.completes_citation_job() {
                    self.status = JobStatus::Done;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meritpath_core::replay;
    use serde_json::json;

    fn state(status: JobStatus, is_eligible: bool) -> CitationAnalysisState {
        CitationAnalysisState { status, is_eligible }
    }

    fn job_update(job_type: JobType, status: RecordStatus) -> CitationEvent {
        CitationEvent::JobStatusChanged(JobStatusChanged {
            job_id: None,
            job_type,
            status,
        })
    }

    #[test]
    fn default_state_is_not_started_and_ineligible() {
        assert_eq!(
            CitationAnalysisState::default(),
            state(JobStatus::NotStarted, false)
        );
    }

    #[test]
    fn state_serializes_with_persisted_field_names() {
        let json = serde_json::to_value(state(JobStatus::Processing, true)).unwrap();
        assert_eq!(json, json!({ "status": "processing", "isEligible": true }));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut s = state(JobStatus::Done, true);
        s.apply(&CitationEvent::Reset);
        assert_eq!(s, CitationAnalysisState::default());
    }

    #[test]
    fn remote_check_only_moves_to_done_when_job_done() {
        let mut s = state(JobStatus::Processing, true);
        s.apply(&CitationEvent::RemoteStatusChecked { job_done: false });
        assert_eq!(s.status, JobStatus::Processing);

        s.apply(&CitationEvent::RemoteStatusChecked { job_done: true });
        assert_eq!(s.status, JobStatus::Done);
    }

    #[test]
    fn failed_job_also_maps_to_done() {
        let mut s = state(JobStatus::Processing, true);
        s.apply(&job_update(JobType::FindCiters, RecordStatus::Failed));
        assert_eq!(s.status, JobStatus::Done);
    }

    #[test]
    fn done_survives_later_unrelated_events() {
        let mut s = state(JobStatus::Processing, true);
        replay(
            &mut s,
            &[
                job_update(JobType::FindCiters, RecordStatus::Success),
                job_update(JobType::Other("print_numbers".into()), RecordStatus::Pending),
                job_update(JobType::FindCiters, RecordStatus::Processing),
            ],
        );
        assert_eq!(s.status, JobStatus::Done);
    }

    #[test]
    fn submission_rollback_is_a_plain_overwrite() {
        let mut s = CitationAnalysisState::default();
        s.apply(&CitationEvent::StatusSet { status: JobStatus::Processing });
        s.apply(&CitationEvent::StatusSet { status: JobStatus::NotStarted });
        assert_eq!(s.status, JobStatus::NotStarted);
    }

    #[test]
    fn job_status_changed_decodes_from_row_image() {
        let row = json!({
            "id": JobId::new().to_string(),
            "user_id": "ignored",
            "job_type": "find_citers",
            "status": "success",
            "result": { "citers": 12 }
        });
        let change: JobStatusChanged = serde_json::from_value(row).unwrap();
        assert!(change.completes_citation_job());
    }

    #[test]
    fn row_image_with_non_uuid_id_still_completes_the_job() {
        for id in [json!(42), json!("job-42"), json!(null)] {
            let row = json!({ "id": id, "job_type": "find_citers", "status": "success" });
            let change: JobStatusChanged = serde_json::from_value(row).unwrap();
            assert_eq!(change.job_id, None);

            let mut s = state(JobStatus::Processing, true);
            s.apply(&CitationEvent::JobStatusChanged(change));
            assert_eq!(s.status, JobStatus::Done);
        }
    }

    #[test]
    fn row_image_keeps_a_uuid_id() {
        let id = JobId::new();
        let row = json!({ "id": id.to_string(), "job_type": "find_citers", "status": "pending" });
        let change: JobStatusChanged = serde_json::from_value(row).unwrap();
        assert_eq!(change.job_id, Some(id));
    }

    #[test]
    fn row_image_with_unknown_status_does_not_decode() {
        let row = json!({ "job_type": "find_citers", "status": "exploded" });
        assert!(serde_json::from_value::<JobStatusChanged>(row).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn any_status() -> impl Strategy<Value = JobStatus> {
            prop_oneof![
                Just(JobStatus::NotStarted),
                Just(JobStatus::Processing),
                Just(JobStatus::Done),
            ]
        }

        fn any_state() -> impl Strategy<Value = CitationAnalysisState> {
            (any_status(), any::<bool>()).prop_map(|(status, is_eligible)| CitationAnalysisState {
                status,
                is_eligible,
            })
        }

        fn any_record_status() -> impl Strategy<Value = RecordStatus> {
            prop_oneof![
                Just(RecordStatus::Pending),
                Just(RecordStatus::Processing),
                Just(RecordStatus::Success),
                Just(RecordStatus::Failed),
            ]
        }

        fn other_job_type() -> impl Strategy<Value = JobType> {
            "[a-z_]{1,20}"
                .prop_filter("not find_citers", |s| s != "find_citers")
                .prop_map(JobType::Other)
        }

        proptest! {
            #[test]
            fn last_status_write_wins(start in any_state(), writes in prop::collection::vec(any_status(), 1..20)) {
                let mut s = start;
                for w in &writes {
                    s.apply(&CitationEvent::StatusSet { status: *w });
                    prop_assert_eq!(s.status, *w);
                }
                prop_assert_eq!(s.status, *writes.last().unwrap());
                prop_assert_eq!(s.is_eligible, start.is_eligible);
            }

            #[test]
            fn reset_always_yields_defaults(start in any_state()) {
                let mut s = start;
                s.apply(&CitationEvent::Reset);
                prop_assert_eq!(s, CitationAnalysisState::default());
            }

            #[test]
            fn other_job_types_never_change_status(start in any_state(), job_type in other_job_type(), status in any_record_status()) {
                let mut s = start;
                s.apply(&job_update(job_type, status));
                prop_assert_eq!(s, start);
            }

            #[test]
            fn non_terminal_updates_never_change_status(start in any_state(), pending in any::<bool>()) {
                let status = if pending { RecordStatus::Pending } else { RecordStatus::Processing };
                let mut s = start;
                s.apply(&job_update(JobType::FindCiters, status));
                prop_assert_eq!(s, start);
            }

            #[test]
            fn terminal_citer_updates_are_idempotent(start in any_state(), failed in any::<bool>()) {
                let status = if failed { RecordStatus::Failed } else { RecordStatus::Success };
                let event = job_update(JobType::FindCiters, status);

                let mut once = start;
                once.apply(&event);
                let mut twice = start;
                twice.apply(&event);
                twice.apply(&event);

                prop_assert_eq!(once.status, JobStatus::Done);
                prop_assert_eq!(once, twice);
            }
        }
    }
}

//! Citation-analysis domain.
//!
//! Pure client-side logic around the "find citers" background job: the job
//! status state machine, backend job records, eligibility rules and the
//! citers table. No IO, no HTTP, no storage.

pub mod citers;
mod de;
pub mod eligibility;
pub mod job;
pub mod profile;
pub mod status;

pub use citers::{
    CiterData, CiterDetail, CitersPage, CitersQuery, PAGE_SIZES, SortConfig, SortDirection, SortKey,
};
pub use eligibility::{EligibilityRule, MAX_INFLUENTIAL_CITATIONS, MAX_PAPER_COUNT};
pub use job::{JobParams, JobRecord, JobRequest, JobSubmission, JobType, RecordStatus};
pub use profile::{Paper, UserProfile};
pub use status::{CitationAnalysisState, CitationEvent, JobStatus, JobStatusChanged};

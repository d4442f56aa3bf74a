//! Who may run a citation analysis.
//!
//! Two rules exist in the product and it is not settled which one is
//! authoritative, so both are kept and the active one is configuration.

use core::str::FromStr;

use meritpath_core::DomainError;

use crate::profile::UserProfile;

/// Authors with this many papers or more are not offered the analysis.
pub const MAX_PAPER_COUNT: u32 = 10;

/// Upper bound (exclusive) on influential citations for the stricter rule.
pub const MAX_INFLUENTIAL_CITATIONS: u32 = 5;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum EligibilityRule {
    /// `author_paper_count < 10`.
    #[default]
    PaperCount,
    /// `author_paper_count < 10 && influential_citation_count < 5`.
    PaperCountAndInfluentialCitations,
}

impl EligibilityRule {
    /// Evaluate the rule against a freshly loaded profile.
    ///
    /// A profile without the counts the rule needs is not eligible.
    pub fn is_eligible(&self, profile: &UserProfile) -> bool {
        let papers_ok = profile
            .author_paper_count
            .is_some_and(|n| n < MAX_PAPER_COUNT);

        match self {
            EligibilityRule::PaperCount => papers_ok,
            EligibilityRule::PaperCountAndInfluentialCitations => {
                papers_ok
                    && profile
                        .influential_citation_count
                        .is_some_and(|n| n < MAX_INFLUENTIAL_CITATIONS)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EligibilityRule::PaperCount => "paper_count",
            EligibilityRule::PaperCountAndInfluentialCitations => "paper_count_and_influential",
        }
    }
}

impl FromStr for EligibilityRule {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paper_count" => Ok(EligibilityRule::PaperCount),
            "paper_count_and_influential" => Ok(EligibilityRule::PaperCountAndInfluentialCitations),
            other => Err(DomainError::validation(format!(
                "unknown eligibility rule `{other}` (expected paper_count or paper_count_and_influential)"
            ))),
        }
    }
}

//! User profile as returned by `GET /api/users/{id}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meritpath_core::UserId;

use crate::de::null_as_default;

/// A paper listed on the user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    #[serde(rename = "paperId")]
    pub paper_id: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Academic profile of a MeritPath user.
///
/// Everything but the id is optional: a freshly signed-up user has no
/// Semantic Scholar link and therefore no counts or papers yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub semantic_scholar_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub influential_citation_count: Option<u32>,
    #[serde(default)]
    pub author_paper_count: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub papers: Vec<Paper>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// A bare profile with only the id set.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            semantic_scholar_id: None,
            name: None,
            email: None,
            influential_citation_count: None,
            author_paper_count: None,
            papers: Vec::new(),
            created_at: None,
        }
    }

    /// The user still has to link a Semantic Scholar author id.
    pub fn needs_semantic_scholar_id(&self) -> bool {
        self.semantic_scholar_id
            .as_deref()
            .is_none_or(|id| id.trim().is_empty())
    }
}

//! Citers table: researchers who cited the user's work.
//!
//! The list comes back from `GET /api/users/{id}/citers` in one piece; search,
//! sorting and pagination all happen client-side.

use core::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use meritpath_core::{DomainError, DomainResult};

use crate::de::null_as_default;

/// Page sizes offered by the table.
pub const PAGE_SIZES: [usize; 4] = [5, 10, 15, 20];

const DEFAULT_PAGE_SIZE: usize = 10;

/// One researcher who cited the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiterData {
    pub citer_id: String,
    pub semantic_scholar_id: String,
    pub citer_name: String,
    pub paper_count: u64,
    pub total_citations: u64,
}

/// One citer with the papers through which they cited the user, from
/// `GET /api/users/{citer_id}/individual_citer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiterDetail {
    #[serde(flatten)]
    pub citer: CiterData,
    /// The user's paper title -> titles of the citer's papers citing it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub papers: BTreeMap<String, Vec<String>>,
}

impl CiterDetail {
    /// Semantic Scholar author page of the citer.
    pub fn profile_url(&self) -> String {
        format!(
            "https://www.semanticscholar.org/author/{}",
            self.citer.semantic_scholar_id
        )
    }
}

/// Sortable columns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CiterName,
    PaperCount,
    TotalCitations,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    fn compare(&self, a: &CiterData, b: &CiterData) -> Ordering {
        let ord = match self.key {
            SortKey::CiterName => compare_names(&a.citer_name, &b.citer_name),
            SortKey::PaperCount => a.paper_count.cmp(&b.paper_count),
            SortKey::TotalCitations => a.total_citations.cmp(&b.total_citations),
        };
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

/// Case-insensitive first, then byte order so that ties are deterministic.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// View state of the citers table.
///
/// Deserializing validates like the setters do: the page size must be one of
/// [`PAGE_SIZES`] and page 0 reads as page 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CitersQueryParts")]
pub struct CitersQuery {
    search: String,
    sort: Option<SortConfig>,
    page: usize,
    page_size: usize,
}

impl Default for CitersQuery {
    /// Most-citing researchers first, ten per page.
    fn default() -> Self {
        Self {
            search: String::new(),
            sort: Some(SortConfig {
                key: SortKey::TotalCitations,
                direction: SortDirection::Descending,
            }),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Deserialize)]
struct CitersQueryParts {
    #[serde(default)]
    search: String,
    #[serde(default)]
    sort: Option<SortConfig>,
    page: usize,
    page_size: usize,
}

impl TryFrom<CitersQueryParts> for CitersQuery {
    type Error = DomainError;

    fn try_from(parts: CitersQueryParts) -> Result<Self, Self::Error> {
        let mut query = Self {
            search: parts.search,
            sort: parts.sort,
            ..Self::default()
        };
        query.set_page_size(parts.page_size)?;
        query.set_page(parts.page);
        Ok(query)
    }
}

impl CitersQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> Option<SortConfig> {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Case-insensitive substring filter on the citer name.
    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    /// Click on a column header: ascending first, a second click on an
    /// ascending column flips it to descending.
    pub fn request_sort(&mut self, key: SortKey) {
        let direction = match self.sort {
            Some(SortConfig {
                key: current,
                direction: SortDirection::Ascending,
            }) if current == key => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        self.sort = Some(SortConfig { key, direction });
    }

    /// Change the page size; goes back to the first page.
    pub fn set_page_size(&mut self, size: usize) -> DomainResult<()> {
        if !PAGE_SIZES.contains(&size) {
            return Err(DomainError::validation(format!(
                "page size must be one of {PAGE_SIZES:?}, got {size}"
            )));
        }
        self.page_size = size;
        self.page = 1;
        Ok(())
    }

    /// Jump to `page` (1-based; 0 means the first page). Pages past the end
    /// are clamped when the query is applied.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Advance one page; no-op on the last page.
    pub fn next_page(&mut self, total_pages: usize) {
        if self.page < total_pages {
            self.page += 1;
        }
    }

    /// Go back one page; no-op on the first page.
    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
        }
    }

    /// Filter, sort and slice `citers` into the current page.
    ///
    /// A page number past the end is clamped to the last page.
    pub fn apply(&self, citers: &[CiterData]) -> CitersPage {
        let needle = self.search.to_lowercase();
        let mut rows: Vec<&CiterData> = citers
            .iter()
            .filter(|c| c.citer_name.to_lowercase().contains(&needle))
            .collect();

        if let Some(sort) = self.sort {
            rows.sort_by(|a, b| sort.compare(a, b));
        }

        let total_entries = rows.len();
        let total_citations = rows.iter().map(|c| c.total_citations).sum();
        let size = self.page_size.max(1);
        let total_pages = total_entries.div_ceil(size);
        let page = self.page.clamp(1, total_pages.max(1));
        let start = (page - 1) * size;

        let rows = rows
            .into_iter()
            .skip(start)
            .take(size)
            .cloned()
            .collect();

        CitersPage {
            rows,
            page,
            total_pages,
            total_entries,
            total_citations,
        }
    }
}

/// One rendered page of the citers table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitersPage {
    pub rows: Vec<CiterData>,
    pub page: usize,
    pub total_pages: usize,
    /// Rows matching the search, across all pages.
    pub total_entries: usize,
    /// Sum of `total_citations` over the matching rows.
    pub total_citations: u64,
}

impl CitersPage {
    pub fn is_first(&self) -> bool {
        self.page <= 1
    }

    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages
    }
}

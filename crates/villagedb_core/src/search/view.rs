//! Derived village view: filter, sort and paginate.
//!
//! # Responsibility
//! - Project the full set into the page currently presented to callers.
//! - Own page arithmetic and page navigation rules.
//!
//! # Invariants
//! - Derivation never mutates the full set.
//! - `total_pages >= 1`, even for an empty result.
//! - The returned page is always inside `1..=total_pages`.

use crate::model::village::Village;
use std::cmp::Ordering;

/// Default number of villages per page.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Insertion order of the full set.
    #[default]
    Default,
    /// Ascending by name, case-folded.
    Alphabetical,
}

impl SortKey {
    /// Parses a sort option; unrecognized values fall back to `Default`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "alphabetical" => Self::Alphabetical,
            _ => Self::Default,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Alphabetical => "alphabetical",
        }
    }
}

/// Page navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Prev,
    Next,
}

/// Inputs for one view derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    /// Case-insensitive substring matched against `name`. Empty matches all.
    pub search_term: String,
    pub sort_key: SortKey,
    /// 1-based page index. Out-of-range values are clamped.
    pub page: usize,
    /// Villages per page. `0` falls back to [`DEFAULT_PAGE_SIZE`].
    pub page_size: usize,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            sort_key: SortKey::Default,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One derived page plus paging metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewResult {
    pub items: Vec<Village>,
    /// Effective 1-based page after clamping.
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    /// Number of villages matching the filter across all pages.
    pub matched: usize,
}

impl ViewResult {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Derives one page of the view from the full set.
pub fn derive_view(full_set: &[Village], query: &ViewQuery) -> ViewResult {
    let page_size = normalize_page_size(query.page_size);
    let mut matched = filter_by_name(full_set, &query.search_term);
    if query.sort_key == SortKey::Alphabetical {
        matched.sort_by(|a, b| compare_names(&a.name, &b.name));
    }

    let total_pages = total_pages(matched.len(), page_size);
    let page = query.page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let items = matched
        .iter()
        .skip(start)
        .take(page_size)
        .map(|village| (*village).clone())
        .collect();

    ViewResult {
        items,
        page,
        page_size,
        total_pages,
        matched: matched.len(),
    }
}

/// Returns villages whose name contains `term`, ignoring case, in set order.
pub fn filter_by_name<'a>(full_set: &'a [Village], term: &str) -> Vec<&'a Village> {
    if term.is_empty() {
        return full_set.iter().collect();
    }
    let needle = term.to_lowercase();
    full_set
        .iter()
        .filter(|village| village.name.to_lowercase().contains(&needle))
        .collect()
}

/// Number of pages for `count` items; never less than one.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(normalize_page_size(page_size)).max(1)
}

/// Moves one page in `direction`; stays put at either boundary.
pub fn step_page(page: usize, total_pages: usize, direction: PageDirection) -> usize {
    let total_pages = total_pages.max(1);
    let page = page.clamp(1, total_pages);
    match direction {
        PageDirection::Prev if page > 1 => page - 1,
        PageDirection::Next if page < total_pages => page + 1,
        _ => page,
    }
}

/// Name ordering used by alphabetical sort.
///
/// Compares case-folded text first so `alpha` and `Alpha` sit together,
/// then the raw text to keep the order total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn normalize_page_size(page_size: usize) -> usize {
    if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    }
}

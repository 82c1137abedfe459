use serde::{Deserialize, Serialize};

use crate::query::sort::SortField;
use crate::repository::errors::{RepositoryError, RepositoryResult};

fn get_pages(
    total_pages: usize,
    current_page: usize,
    left_edge: usize,
    left_current: usize,
    right_current: usize,
    right_edge: usize,
) -> Vec<Option<usize>> {
    let last_page = total_pages;

    if last_page == 0 {
        return vec![];
    }

    let mut pages = Vec::new();

    let left_end = (1 + left_edge).min(last_page + 1);
    pages.extend((1..left_end).map(Some));

    let mid_start = left_end.max(current_page.saturating_sub(left_current));
    let mid_end = (current_page + right_current + 1).min(last_page + 1);

    if mid_start > left_end {
        pages.push(None);
    }
    pages.extend((mid_start..mid_end).map(Some));

    let right_start = mid_end.max(last_page.saturating_sub(right_edge) + 1);

    if right_start > mid_end {
        pages.push(None);
    }
    pages.extend((right_start..=last_page).map(Some));

    pages
}

/// A page request: row offset, page size and optional sort fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    pub offset: i64,
    pub size: i64,
    #[serde(default)]
    pub sort: Vec<SortField>,
}

/// `OFFSET`/`LIMIT` pair handed to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slice {
    pub offset: i64,
    pub limit: i64,
}

impl Pageable {
    pub fn new(offset: i64, size: i64) -> Self {
        Self {
            offset,
            size,
            sort: Vec::new(),
        }
    }

    /// Zero-based page number.
    pub fn of_page(page: i64, size: i64) -> Self {
        Self::new(page.saturating_mul(size), size)
    }

    pub fn sorted_by(mut self, field: SortField) -> Self {
        self.sort.push(field);
        self
    }

    pub fn validate(&self) -> RepositoryResult<()> {
        if self.offset < 0 {
            return Err(RepositoryError::InvalidPagination(format!(
                "offset must not be negative, got {}",
                self.offset
            )));
        }
        if self.size <= 0 {
            return Err(RepositoryError::InvalidPagination(format!(
                "page size must be positive, got {}",
                self.size
            )));
        }
        Ok(())
    }

    pub fn page_number(&self) -> i64 {
        if self.size > 0 {
            self.offset / self.size
        } else {
            0
        }
    }

    pub fn slice(&self) -> Slice {
        Slice {
            offset: self.offset,
            limit: self.size,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_number: i64,
    pub page_size: i64,
    pub total: i64,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &Pageable, total: i64) -> Self {
        let fetched = content.len() as i64;
        Self {
            content,
            page_number: request.page_number(),
            page_size: request.size,
            total,
            has_next: request.offset.saturating_add(fetched) < total,
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.page_size <= 0 || self.total <= 0 {
            return 0;
        }
        self.total / self.page_size + i64::from(self.total % self.page_size != 0)
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total: self.total,
            has_next: self.has_next,
        }
    }

    /// One-based page numbers for a navigation bar; `None` marks a gap.
    pub fn page_links(&self) -> Vec<Option<usize>> {
        let total_pages = usize::try_from(self.total_pages()).unwrap_or(0);
        let current_page = usize::try_from(self.page_number).unwrap_or(0) + 1;
        get_pages(total_pages, current_page, 2, 2, 4, 2)
    }
}

/// Packages a fetched slice into a page, calling `count` only when the
/// slice alone cannot determine the total:
///
/// 1. first page shorter than the page size: the total is the slice length;
/// 2. any other non-empty page shorter than the page size: it is the last
///    page, so the total is `offset + len`;
/// 3. otherwise the total comes from `count`.
///
/// With `elide` off, `count` is always called.
pub fn assemble_page<T, F>(
    content: Vec<T>,
    request: &Pageable,
    elide: bool,
    count: F,
) -> RepositoryResult<Page<T>>
where
    F: FnOnce() -> RepositoryResult<i64>,
{
    let fetched = content.len() as i64;
    let total = if elide && request.offset == 0 && fetched < request.size {
        log::debug!("count elided: first page holds all {fetched} rows");
        fetched
    } else if elide && fetched > 0 && fetched < request.size {
        log::debug!("count elided: last page at offset {}", request.offset);
        request.offset.saturating_add(fetched)
    } else {
        count()?
    };
    Ok(Page::new(content, request, total))
}

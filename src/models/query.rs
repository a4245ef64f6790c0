//! List-query building blocks: pagination and allow-listed sorting.
//!
//! Sort columns always come from a fixed per-entity allow-list so request
//! input never reaches SQL as a column expression.

use serde::Serialize;

use crate::errors::AppError;

/// Default page size when the request omits `per_page`.
pub const DEFAULT_PER_PAGE: u32 = 25;
/// Upper bound for `per_page`.
pub const MAX_PER_PAGE: u32 = 100;

/// A validated ORDER BY target.
#[derive(Debug, Clone, Copy)]
pub struct SortSpec {
    pub column: &'static str,
    pub descending: bool,
}

impl SortSpec {
    /// Resolve request input against an allow-list, falling back to
    /// `default` when no sort was requested. Unknown columns and
    /// directions are a validation error, not an SQL error.
    pub fn resolve(
        sort: Option<&str>,
        direction: Option<&str>,
        allowed: &[&'static str],
        default: &'static str,
    ) -> Result<Self, AppError> {
        let column = match sort {
            None => default,
            Some(requested) => allowed
                .iter()
                .copied()
                .find(|col| *col == requested)
                .ok_or_else(|| {
                    AppError::validation(format!("cannot sort by '{}'", requested))
                })?,
        };

        let descending = match direction {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(other) => {
                return Err(AppError::validation(format!(
                    "sort direction must be 'asc' or 'desc', got '{}'",
                    other
                )))
            }
        };

        Ok(SortSpec { column, descending })
    }

    /// Render as an ORDER BY fragment. Safe by construction: the column
    /// is a static string from the allow-list.
    pub fn to_sql(&self) -> String {
        format!(
            "{} {}",
            self.column,
            if self.descending { "DESC" } else { "ASC" }
        )
    }
}

/// A validated LIMIT/OFFSET window.
#[derive(Debug, Clone, Copy)]
pub struct PageSpec {
    pub page: u32,
    pub per_page: u32,
}

impl PageSpec {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        Self { page, per_page }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

/// One page of results plus paging metadata.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: &PageSpec) -> Self {
        Self {
            data,
            total,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

//! Response envelopes: pagination and counts.

use serde::Serialize;
use utoipa::ToSchema;

/// One page of items plus the totals needed to walk the rest.
#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: i64,
    pub page: i64,
    pub size: i64,
    pub total_row: i64,
}

impl<T> Page<T> {
    /// Convert every item, keeping the totals.
    pub fn try_map<U, E, F>(self, f: F) -> Result<Page<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            total_pages: self.total_pages,
            page: self.page,
            size: self.size,
            total_row: self.total_row,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Count {
    pub count: i64,
}

/// `ceil(total_row / size)`; zero rows give zero pages.
pub fn total_pages(total_row: i64, size: i64) -> i64 {
    if size <= 0 || total_row <= 0 {
        return 0;
    }
    let full = total_row / size;
    if total_row % size == 0 {
        full
    } else {
        full + 1
    }
}

/// Page selection for list queries. `page` is 1-based; a `page_size` of
/// `None` disables paging and yields everything as a single page.
#[derive(Debug, Clone, Copy)]
pub struct Paging {
    pub page: u32,
    pub page_size: Option<u32>,
}

impl Paging {
    pub fn new(page: u32, page_size: Option<u32>) -> Self {
        Self { page: page.max(1), page_size }
    }

    pub fn all() -> Self {
        Self { page: 1, page_size: None }
    }

    pub(crate) fn limit_offset(&self) -> Option<(i64, i64)> {
        self.page_size
            .map(|size| (i64::from(size), i64::from(self.page.saturating_sub(1)) * i64::from(size)))
    }

    pub(crate) fn total_pages(&self, total_rows: i64) -> i64 {
        match self.page_size {
            None => 1,
            Some(size) => (total_rows + i64::from(size) - 1) / i64::from(size),
        }
    }
}

/// One page of results plus how many pages the full result set spans.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: i64,
}

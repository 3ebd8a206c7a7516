use serde::{Deserialize, Serialize};

/// Parameters handed to a page fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest<P> {
    pub page: u32,
    pub page_size: u32,
    pub extra: Option<P>,
}

/// One page returned by a page fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub has_more: bool,
}

/// Accumulated pagination bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationState<T> {
    pub page: u32,
    pub page_size: u32,
    pub items: Vec<T>,
    pub total: u64,
    pub has_more: bool,
}

impl<T> PaginationState<T> {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            items: Vec::new(),
            total: 0,
            has_more: false,
        }
    }

    pub fn clear(&mut self) {
        self.page = 1;
        self.items.clear();
        self.total = 0;
        self.has_more = false;
    }

    /// Fold a fetched page in: page 1 replaces, later pages append.
    pub fn apply(&mut self, page_number: u32, page: Page<T>) {
        if page_number <= 1 {
            self.items = page.items;
        } else {
            self.items.extend(page.items);
        }
        self.page = page_number.max(1);
        self.total = page.total;
        self.has_more = page.has_more;
    }
}

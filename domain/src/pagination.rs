//! Page position over a filtered collection.
//!
//! Pagination state belongs to the view; the reconciler never touches it.
//! After an authoritative refetch shrinks the collection, the view calls
//! [`PageView::clamp_page`] so it does not sit on a page that no longer exists.

use crate::collection::{DomainCollection, Identified, Searchable};

/// Rows per page in every dashboard table.
pub const ITEMS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    current_page: usize,
    items_per_page: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(ITEMS_PER_PAGE)
    }
}

impl PaginationState {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            current_page: 1,
            items_per_page: items_per_page.max(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    /// Moves to `page`, never below 1.
    pub fn go_to(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    pub fn total_pages(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.items_per_page)
    }

    /// Rows skipped before the current page, saturating for absurd page numbers.
    fn offset(&self) -> usize {
        (self.current_page - 1).saturating_mul(self.items_per_page)
    }

    /// Index range of the current page within `item_count` items.
    pub fn range(&self, item_count: usize) -> std::ops::Range<usize> {
        let start = self.offset().min(item_count);
        let end = start.saturating_add(self.items_per_page).min(item_count);
        start..end
    }

    /// 1-based row number of the `index`-th row on the current page.
    pub fn row_number(&self, index: usize) -> usize {
        self.offset().saturating_add(index).saturating_add(1)
    }

    /// Pulls the current page back to the last valid one (page 1 when empty).
    /// Returns whether the page moved.
    pub fn clamp(&mut self, item_count: usize) -> bool {
        let last = self.total_pages(item_count).max(1);
        if self.current_page > last {
            self.current_page = last;
            true
        } else {
            false
        }
    }
}

/// One rendered page.
#[derive(Debug, PartialEq)]
pub struct Page<'a, T> {
    /// `(row number, entity)` pairs.
    pub rows: Vec<(usize, &'a T)>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
}

/// Search term plus page position for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageView {
    search_term: String,
    pagination: PaginationState,
}

impl PageView {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            search_term: String::new(),
            pagination: PaginationState::new(items_per_page),
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    /// A new search starts from the first page.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.pagination.go_to(1);
    }

    pub fn go_to(&mut self, page: usize) {
        self.pagination.go_to(page);
    }

    pub fn next_page<T: Identified + Searchable>(&mut self, collection: &DomainCollection<T>) {
        let total = self.total_pages(collection);
        if self.pagination.current_page() < total {
            self.pagination.go_to(self.pagination.current_page() + 1);
        }
    }

    pub fn previous_page(&mut self) {
        let current = self.pagination.current_page();
        self.pagination.go_to(current.saturating_sub(1));
    }

    pub fn total_pages<T: Identified + Searchable>(&self, collection: &DomainCollection<T>) -> usize {
        self.pagination
            .total_pages(collection.filtered(&self.search_term).len())
    }

    /// Post-condition after a refetch: keep the page inside the filtered result.
    pub fn clamp_page<T: Identified + Searchable>(&mut self, collection: &DomainCollection<T>) -> bool {
        let matches = collection.filtered(&self.search_term).len();
        self.pagination.clamp(matches)
    }

    pub fn render<'a, T: Identified + Searchable>(
        &self,
        collection: &'a DomainCollection<T>,
    ) -> Page<'a, T> {
        let filtered = collection.filtered(&self.search_term);
        let range = self.pagination.range(filtered.len());
        let rows = filtered[range]
            .iter()
            .enumerate()
            .map(|(index, item)| (self.pagination.row_number(index), *item))
            .collect();
        Page {
            rows,
            current_page: self.pagination.current_page(),
            total_pages: self.pagination.total_pages(filtered.len()),
            total_matches: filtered.len(),
        }
    }
}

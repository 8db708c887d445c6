//! Page state for one remote collection.
//!
//! Every fetch is tagged with a [`FetchTicket`]. Only the most recently issued
//! ticket may write results back, so a slow response for an older request can
//! never overwrite a newer page.

use crate::{error::PageError, normalize::NormalizedResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePhase {
    Idle,
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    page: u32,
}

impl FetchTicket {
    pub fn page(&self) -> u32 {
        self.page
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A newer request was issued after this one; the result was dropped.
    Stale,
    /// The collection shrank below the requested page. The state now points at
    /// `last_page`, which still needs to be fetched.
    Overshot { last_page: u32 },
}

pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let pages = total_count.div_ceil(page_size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone)]
pub struct CollectionPage<T> {
    items: Vec<T>,
    current_page: u32,
    page_size: u32,
    total_count: u64,
    phase: PagePhase,
    latest_seq: u64,
}

impl<T> CollectionPage<T> {
    pub fn new(page_size: u32) -> Result<Self, PageError> {
        if page_size == 0 {
            return Err(PageError::InvalidPageSize);
        }
        Ok(Self {
            items: Vec::new(),
            current_page: 1,
            page_size,
            total_count: 0,
            phase: PagePhase::Idle,
            latest_seq: 0,
        })
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_count, self.page_size)
    }

    pub fn phase(&self) -> PagePhase {
        self.phase
    }

    pub fn loading(&self) -> bool {
        self.phase == PagePhase::Loading
    }

    /// Issues a ticket for `page`. Out-of-range pages leave the state untouched.
    pub fn begin_fetch(&mut self, page: u32) -> Result<FetchTicket, PageError> {
        let total_pages = self.total_pages();
        if page < 1 || page > total_pages {
            return Err(PageError::OutOfRange {
                requested: page,
                total_pages,
            });
        }
        Ok(self.issue(page))
    }

    fn issue(&mut self, page: u32) -> FetchTicket {
        self.latest_seq += 1;
        self.current_page = page;
        self.phase = PagePhase::Loading;
        FetchTicket {
            seq: self.latest_seq,
            page,
        }
    }

    pub fn is_latest(&self, ticket: FetchTicket) -> bool {
        ticket.seq == self.latest_seq
    }

    pub fn apply_success(
        &mut self,
        ticket: FetchTicket,
        response: NormalizedResponse<T>,
    ) -> ApplyOutcome {
        if !self.is_latest(ticket) {
            return ApplyOutcome::Stale;
        }

        self.items = response.items;
        self.total_count = response.total_count;

        let last_page = self.total_pages();
        if self.current_page > last_page {
            self.items.clear();
            self.current_page = last_page;
            return ApplyOutcome::Overshot { last_page };
        }

        self.phase = PagePhase::Loaded;
        ApplyOutcome::Applied
    }

    /// Returns false when the failure belongs to a superseded request.
    pub fn apply_failure(&mut self, ticket: FetchTicket) -> bool {
        if !self.is_latest(ticket) {
            return false;
        }
        self.items.clear();
        self.total_count = 0;
        self.current_page = self.current_page.min(self.total_pages());
        self.phase = PagePhase::Error;
        true
    }

    /// Page to reload after deleting one record from the current page.
    pub fn page_after_delete(&self) -> u32 {
        if self.items.len() == 1 && self.current_page > 1 {
            self.current_page - 1
        } else {
            self.current_page
        }
    }
}

impl<T: Clone> CollectionPage<T> {
    pub fn snapshot(&self) -> PageSnapshot<T> {
        PageSnapshot {
            items: self.items.clone(),
            current_page: self.current_page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages(),
            phase: self.phase,
        }
    }
}

/// Owned copy of the page state for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
    pub phase: PagePhase,
}

impl<T> PageSnapshot<T> {
    pub fn loading(&self) -> bool {
        self.phase == PagePhase::Loading
    }
}

#[cfg(test)]
#[path = "tests/paging_tests.rs"]
mod tests;

//! Pagination request and result types.

use serde::{Deserialize, Serialize};

/// Hard ceiling on page size regardless of configuration.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A resolved page request: `page >= 1` and `1 <= page_size <= MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Resolve raw caller input against a resource default.
    ///
    /// A missing or zero page becomes 1. A missing page size, or one outside
    /// `1..=max_size`, becomes `default_size`.
    pub fn resolve(
        page: Option<u32>,
        page_size: Option<u32>,
        default_size: u32,
        max_size: u32,
    ) -> Self {
        let max_size = max_size.clamp(1, MAX_PAGE_SIZE);
        let default_size = default_size.clamp(1, max_size);
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = page_size
            .filter(|s| (1..=max_size).contains(s))
            .unwrap_or(default_size);
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size.max(1)))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let req = PageRequest::resolve(None, None, 20, 100);
        assert_eq!(req, PageRequest { page: 1, page_size: 20 });
        assert_eq!(req.offset(), 0);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn test_resolve_out_of_range_size_falls_back_to_default() {
        assert_eq!(PageRequest::resolve(Some(2), Some(0), 10, 100).page_size, 10);
        assert_eq!(PageRequest::resolve(Some(2), Some(101), 10, 100).page_size, 10);
        assert_eq!(PageRequest::resolve(Some(2), Some(100), 10, 100).page_size, 100);
    }

    #[test]
    fn test_resolve_zero_page_becomes_first() {
        let req = PageRequest::resolve(Some(0), Some(5), 10, 100);
        assert_eq!(req.page, 1);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_resolve_caps_configured_max() {
        let req = PageRequest::resolve(None, Some(150), 500, 1000);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_offset_for_later_pages() {
        let req = PageRequest::resolve(Some(3), Some(10), 10, 100);
        assert_eq!(req.offset(), 20);
    }

    #[test]
    fn test_total_pages() {
        let req = PageRequest::resolve(Some(1), Some(10), 10, 100);
        assert_eq!(Page::<u8>::new(vec![], 0, req).total_pages(), 0);
        assert_eq!(Page::<u8>::new(vec![], 10, req).total_pages(), 1);
        assert_eq!(Page::<u8>::new(vec![], 11, req).total_pages(), 2);
    }
}

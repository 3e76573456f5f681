use serde::Serialize;

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

/// A clamped page request: `page >= 1`, `1 <= per_page <= MAX_PER_PAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(req: PageRequest, total: u64) -> Self {
        let per_page = u64::from(req.per_page);
        let pages = total.div_ceil(per_page);
        Self {
            page: req.page,
            per_page: req.per_page,
            total,
            pages,
            has_next: u64::from(req.page) < pages,
            has_prev: req.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_requests() {
        let req = PageRequest::new(Some(0), Some(10_000));
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, MAX_PER_PAGE);

        let req = PageRequest::new(None, Some(0));
        assert_eq!(req.per_page, 1);
    }

    #[test]
    fn computes_page_window() {
        let p = Pagination::new(PageRequest::new(Some(2), Some(10)), 25);
        assert_eq!(p.pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);
        assert_eq!(PageRequest::new(Some(2), Some(10)).offset(), 10);

        let last = Pagination::new(PageRequest::new(Some(3), Some(10)), 25);
        assert!(!last.has_next);

        let empty = Pagination::new(PageRequest::default(), 0);
        assert_eq!(empty.pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }
}

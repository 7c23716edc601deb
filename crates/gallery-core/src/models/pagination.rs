use serde::Serialize;

pub const MAX_PER_PAGE: u32 = 100;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Clamp caller-supplied values: page starts at 1, page size is between 1 and
    /// [`MAX_PER_PAGE`].
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(default_per_page)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.per_page as usize
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub pages: u32,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: usize, request: PageRequest) -> Self {
        let pages = total.div_ceil(request.per_page as usize) as u32;
        Self {
            total,
            page: request.page,
            per_page: request.per_page,
            pages,
            items,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            pages: self.pages,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

//! Page cursor for the paginated list views.
//!
//! Pages are 1-based, matching the backend's `page` query parameter.

/// Page sizes offered by the product list.
pub const PRODUCT_PAGE_SIZES: [u32; 5] = [5, 12, 24, 35, 48];

/// Default page size of the product list.
pub const DEFAULT_PRODUCT_PAGE_SIZE: u32 = 12;

/// Page size of the category list.
pub const CATEGORY_PAGE_SIZE: u32 = 3;

/// Current position in a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: u32,
    size: u32,
    total_pages: u32,
}

impl Pager {
    /// Start at page 1 with the given page size. A size of zero becomes one.
    #[must_use]
    pub fn new(size: u32) -> Self {
        Self {
            page: 1,
            size: size.max(1),
            total_pages: 1,
        }
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub const fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Record the total reported by the latest page. Clamps the current page
    /// if the listing shrank.
    pub fn set_total_pages(&mut self, total_pages: u32) {
        self.total_pages = total_pages.max(1);
        self.page = self.page.min(self.total_pages);
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Move back one page. Returns `false` on the first page.
    pub const fn previous(&mut self) -> bool {
        if self.has_previous() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Move forward one page. Returns `false` on the last page.
    pub const fn next(&mut self) -> bool {
        if self.has_next() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Jump to `page`, clamped to `1..=total_pages`.
    pub fn go_to(&mut self, page: u32) {
        self.page = page.clamp(1, self.total_pages);
    }

    /// Change the page size and return to the first page.
    pub fn set_size(&mut self, size: u32) {
        self.size = size.max(1);
        self.page = 1;
    }

    /// `"current / total"` as shown under the list.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} / {}", self.page, self.total_pages)
    }
}

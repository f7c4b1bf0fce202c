//! Page links for paginated listings.

/// One entry in a pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page { number: u32, current: bool },
    Gap,
}

/// A pagination bar: the current page, its neighbours within `radius`, the
/// first and last pages, and gaps between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub current: u32,
    pub total_pages: u32,
    pub links: Vec<PageLink>,
}

impl Pagination {
    /// Build the bar. `current` is clamped into `1..=total_pages`; a total of
    /// zero is treated as one page.
    #[must_use]
    pub fn new(current: u32, total_pages: u32, radius: u32) -> Self {
        let total_pages = total_pages.max(1);
        let current = current.clamp(1, total_pages);

        let start = current.saturating_sub(radius).max(1);
        let end = current.saturating_add(radius).min(total_pages);

        let mut links = Vec::new();
        let page = |number| PageLink::Page {
            number,
            current: number == current,
        };

        if start > 1 {
            links.push(page(1));
            if start > 2 {
                links.push(PageLink::Gap);
            }
        }
        links.extend((start..=end).map(page));
        if end < total_pages {
            if end + 1 < total_pages {
                links.push(PageLink::Gap);
            }
            links.push(page(total_pages));
        }

        Self {
            current,
            total_pages,
            links,
        }
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.current > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current < self.total_pages
    }

    #[must_use]
    pub const fn prev(&self) -> u32 {
        if self.has_prev() { self.current - 1 } else { 1 }
    }

    #[must_use]
    pub const fn next(&self) -> u32 {
        if self.has_next() {
            self.current + 1
        } else {
            self.total_pages
        }
    }

    /// Whether the bar is worth rendering.
    #[must_use]
    pub const fn is_multi_page(&self) -> bool {
        self.total_pages > 1
    }
}

//! Pagination bar shared by every admin list.

use bazaar_core::pagination::{PageLink, Pagination};

/// Page links either side of the current page.
const RADIUS: u32 = 2;

/// A numbered link, or a gap when `number` is `None`.
#[derive(Debug, Clone)]
pub struct PageLinkView {
    pub number: Option<u32>,
    pub current: bool,
    pub url: String,
}

/// Everything `partials/pagination.html` renders.
#[derive(Debug, Clone, Default)]
pub struct Pager {
    pub pages: Vec<PageLinkView>,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl Pager {
    /// Build the bar; `url_for` turns a page number into a link that keeps
    /// the active filters.
    pub fn new(current: u32, total_pages: u32, url_for: impl Fn(u32) -> String) -> Self {
        let pagination = Pagination::new(current, total_pages, RADIUS);
        if !pagination.is_multi_page() {
            return Self::default();
        }
        let pages = pagination
            .links
            .iter()
            .map(|link| match *link {
                PageLink::Page { number, current } => PageLinkView {
                    number: Some(number),
                    current,
                    url: url_for(number),
                },
                PageLink::Gap => PageLinkView {
                    number: None,
                    current: false,
                    url: String::new(),
                },
            })
            .collect();
        Self {
            pages,
            prev_url: pagination.has_prev().then(|| url_for(pagination.prev())),
            next_url: pagination.has_next().then(|| url_for(pagination.next())),
        }
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        !self.pages.is_empty()
    }
}

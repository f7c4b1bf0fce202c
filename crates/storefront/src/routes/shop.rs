//! Shop listing with facets, price range and sort.
//!
//! The backend pages, sorts and applies category and search. When color,
//! size, price or stock filters are set, the whole matching listing is
//! fetched, filtered here and paged after filtering, so the count and the
//! page links describe the filtered set.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use bazaar_core::catalog::{
    Category, Color, Paginated, Product, ProductFilter, ProductSort, Size,
};
use bazaar_core::pagination::{PageLink, Pagination};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use url::form_urlencoded;

use super::{or_empty, saved_lists};
use crate::backend::ProductQuery;
use crate::filters;
use crate::state::AppState;
use crate::views::{Layout, ProductCard, cards};

const PAGE_SIZE: u32 = 24;
const PAGINATION_RADIUS: u32 = 2;

/// Shop query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopQuery {
    pub page: Option<u32>,
    pub q: Option<String>,
    pub category: Option<String>,
    /// Comma-separated color names.
    pub colors: Option<String>,
    /// Comma-separated size names.
    pub sizes: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<String>,
    pub sort: Option<String>,
}

impl ShopQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter::from_query(
            self.q.as_deref(),
            self.category.as_deref(),
            self.colors.as_deref(),
            self.sizes.as_deref(),
            self.min_price.as_deref(),
            self.max_price.as_deref(),
            self.in_stock.as_deref(),
            self.sort.as_deref(),
        )
    }
}

/// One selectable facet value with the URL that toggles it.
#[derive(Debug, Clone)]
pub struct FacetOption {
    pub name: String,
    pub hex: Option<String>,
    pub selected: bool,
    pub toggle_url: String,
}

/// A sort option.
#[derive(Debug, Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// A pagination entry; `number` is `None` for a gap.
#[derive(Debug, Clone)]
pub struct PageLinkView {
    pub number: Option<u32>,
    pub current: bool,
    pub url: String,
}

/// The active filter, rendered back into the form and links.
#[derive(Debug, Clone)]
pub struct Selection {
    pub search: String,
    pub category: String,
    pub min_price: String,
    pub max_price: String,
    pub in_stock: bool,
    pub sort: &'static str,
    pub is_filtered: bool,
}

/// Build a shop URL for a filter and page. Defaults are left out.
fn shop_url(filter: &ProductFilter, page: u32) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(search) = &filter.search {
        query.append_pair("q", search);
    }
    if let Some(category) = &filter.category {
        query.append_pair("category", category);
    }
    if !filter.colors.is_empty() {
        query.append_pair("colors", &filter.colors.join(","));
    }
    if !filter.sizes.is_empty() {
        query.append_pair("sizes", &filter.sizes.join(","));
    }
    if let Some(min) = filter.min_price {
        query.append_pair("min_price", &min.to_string());
    }
    if let Some(max) = filter.max_price {
        query.append_pair("max_price", &max.to_string());
    }
    if filter.in_stock_only {
        query.append_pair("in_stock", "1");
    }
    if filter.sort != ProductSort::default() {
        query.append_pair("sort", filter.sort.as_str());
    }
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }
    let query = query.finish();
    if query.is_empty() {
        "/shop".to_string()
    } else {
        format!("/shop?{query}")
    }
}

/// Filter with `value` added to or removed from a facet list.
fn toggled(list: &[String], value: &str) -> Vec<String> {
    if list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        list.iter()
            .filter(|v| !v.eq_ignore_ascii_case(value))
            .cloned()
            .collect()
    } else {
        let mut list = list.to_vec();
        list.push(value.to_string());
        list
    }
}

fn color_options(colors: &[Color], filter: &ProductFilter) -> Vec<FacetOption> {
    colors
        .iter()
        .map(|color| {
            let next = ProductFilter {
                colors: toggled(&filter.colors, &color.name),
                ..filter.clone()
            };
            FacetOption {
                name: color.name.clone(),
                hex: color.hex.clone(),
                selected: filter
                    .colors
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(&color.name)),
                toggle_url: shop_url(&next, 1),
            }
        })
        .collect()
}

fn size_options(sizes: &[Size], filter: &ProductFilter) -> Vec<FacetOption> {
    sizes
        .iter()
        .map(|size| {
            let next = ProductFilter {
                sizes: toggled(&filter.sizes, &size.name),
                ..filter.clone()
            };
            FacetOption {
                name: size.name.clone(),
                hex: None,
                selected: filter
                    .sizes
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(&size.name)),
                toggle_url: shop_url(&next, 1),
            }
        })
        .collect()
}

fn page_links(pagination: &Pagination, filter: &ProductFilter) -> Vec<PageLinkView> {
    pagination
        .links
        .iter()
        .map(|link| match *link {
            PageLink::Page { number, current } => PageLinkView {
                number: Some(number),
                current,
                url: shop_url(filter, number),
            },
            PageLink::Gap => PageLinkView {
                number: None,
                current: false,
                url: String::new(),
            },
        })
        .collect()
}

/// Shop page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop.html")]
pub struct ShopTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCard>,
    pub total: u64,
    pub categories: Vec<Category>,
    pub colors: Vec<FacetOption>,
    pub sizes: Vec<FacetOption>,
    pub sort_options: Vec<SortOption>,
    pub selection: Selection,
    pub pages: Vec<PageLinkView>,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

/// Display the shop listing.
#[instrument(skip(state, session, layout))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    Query(query): Query<ShopQuery>,
) -> impl IntoResponse {
    let filter = query.filter();
    let page = query.page.unwrap_or(1).max(1);
    let backend = state.backend();

    let listing = ProductQuery {
        page,
        limit: PAGE_SIZE,
        category: filter.category.clone(),
        search: filter.search.clone(),
        sort: filter.sort,
        ids: Vec::new(),
    };

    let products = async {
        if !filter.needs_full_listing() {
            return backend.products(&listing).await;
        }
        // Backend already applied search and category
        let local = ProductFilter {
            search: None,
            category: None,
            ..filter.clone()
        };
        let all = backend.all_products(&listing).await?;
        let matched: Vec<Product> = local.apply(&all).into_iter().cloned().collect();
        Ok(Paginated::from_all(matched, page, PAGE_SIZE))
    };

    let (products, categories, colors, sizes) = tokio::join!(
        products,
        backend.categories(),
        backend.colors(),
        backend.sizes(),
    );

    let products = products.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load products");
        layout
            .toasts
            .push(bazaar_core::cart::Toast::error(e.user_message()));
        Paginated::empty()
    });

    let (wishlist, compare) = saved_lists(&session).await;
    let currency = state.config().currency;

    let pagination = Pagination::new(products.page, products.total_pages, PAGINATION_RADIUS);

    ShopTemplate {
        layout,
        products: cards(&products.items, currency, &wishlist, &compare),
        total: products.total,
        categories: or_empty(categories, "categories"),
        colors: color_options(&or_empty(colors, "colors"), &filter),
        sizes: size_options(&or_empty(sizes, "sizes"), &filter),
        sort_options: ProductSort::ALL
            .iter()
            .map(|sort| SortOption {
                value: sort.as_str(),
                label: sort.label(),
                selected: *sort == filter.sort,
            })
            .collect(),
        selection: Selection {
            search: filter.search.clone().unwrap_or_default(),
            category: filter.category.clone().unwrap_or_default(),
            min_price: filter.min_price.map(|p| p.to_string()).unwrap_or_default(),
            max_price: filter.max_price.map(|p| p.to_string()).unwrap_or_default(),
            in_stock: filter.in_stock_only,
            sort: filter.sort.as_str(),
            is_filtered: filter.is_active(),
        },
        pages: page_links(&pagination, &filter),
        prev_url: pagination
            .has_prev()
            .then(|| shop_url(&filter, pagination.prev())),
        next_url: pagination
            .has_next()
            .then(|| shop_url(&filter, pagination.next())),
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_shop_url_omits_defaults() {
        assert_eq!(shop_url(&ProductFilter::default(), 1), "/shop");

        let filter = ProductFilter {
            search: Some("áo".to_string()),
            colors: vec!["Black".to_string(), "White".to_string()],
            in_stock_only: true,
            sort: ProductSort::PriceAsc,
            ..ProductFilter::default()
        };
        assert_eq!(
            shop_url(&filter, 3),
            "/shop?q=%C3%A1o&colors=Black%2CWhite&in_stock=1&sort=price_asc&page=3"
        );
    }

    #[test]
    fn test_toggled() {
        let list = vec!["Black".to_string()];
        assert_eq!(toggled(&list, "black"), Vec::<String>::new());
        assert_eq!(toggled(&list, "Red"), vec!["Black", "Red"]);
    }

    #[test]
    fn test_color_options_mark_selection() {
        let filter = ProductFilter {
            colors: vec!["black".to_string()],
            ..ProductFilter::default()
        };
        let colors = vec![
            Color {
                name: "Black".to_string(),
                hex: Some("#000".to_string()),
            },
            Color {
                name: "Red".to_string(),
                hex: None,
            },
        ];
        let options = color_options(&colors, &filter);
        assert!(options[0].selected);
        assert_eq!(options[0].toggle_url, "/shop");
        assert!(!options[1].selected);
        assert_eq!(options[1].toggle_url, "/shop?colors=black%2CRed");
    }
}

//! Product list.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use bazaar_core::CurrencyCode;
use bazaar_core::catalog::{Paginated, Product};
use tower_sessions::Session;
use tracing::instrument;

use super::{list_pager, page_data};
use crate::backend::ListQuery;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;
use crate::views::{Layout, Pager};

const PRODUCTS_PATH: &str = "/products";

/// One product in the table.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub name: String,
    pub slug: String,
    pub category: String,
    pub price: String,
    /// Regular price, shown struck through while on sale.
    pub compare_at: Option<String>,
    pub variants: usize,
    pub stock: u32,
    pub sold: u32,
    pub out_of_stock: bool,
}

impl ProductRow {
    fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            name: product.name.clone(),
            slug: product.slug.clone(),
            category: product
                .category
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            price: currency.format(product.effective_price()),
            compare_at: product.compare_at_price().map(|p| currency.format(p)),
            variants: product.variants.len(),
            stock: product.total_stock(),
            sold: product.sold_count,
            out_of_stock: !product.in_stock(),
        }
    }
}

/// Product list template.
#[derive(Template, WebTemplate)]
#[template(path = "products.html")]
pub struct ProductsTemplate {
    pub layout: Layout,
    pub products: Vec<ProductRow>,
    pub total: u64,
    pub search: String,
    pub pager: Pager,
}

/// Display the product list.
#[instrument(skip(state, session, layout, admin))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> Response {
    let result = state.backend().admin_products(&admin.token, &query).await;
    let page = match page_data(result, Paginated::empty(), &session, &mut layout).await {
        Ok(page) => page,
        Err(response) => return response,
    };

    let currency = state.config().currency;
    ProductsTemplate {
        layout,
        products: page
            .items
            .iter()
            .map(|product| ProductRow::new(product, currency))
            .collect(),
        total: page.total,
        search: query.search().unwrap_or_default().to_string(),
        pager: list_pager(PRODUCTS_PATH, &query, page.page, page.total_pages),
    }
    .into_response()
}

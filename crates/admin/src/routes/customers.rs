//! Customer list.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use bazaar_core::catalog::Paginated;
use bazaar_core::customer::Customer;
use tower_sessions::Session;
use tracing::instrument;

use super::{list_pager, page_data};
use crate::backend::ListQuery;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;
use crate::views::{Layout, Pager, datetime};

const CUSTOMERS_PATH: &str = "/customers";

/// One customer in the table.
#[derive(Debug, Clone)]
pub struct CustomerRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub joined: String,
}

impl From<&Customer> for CustomerRow {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.to_string(),
            name: customer.full_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone().unwrap_or_default(),
            address: customer.address.clone().unwrap_or_default(),
            joined: customer.created_at.map(datetime).unwrap_or_default(),
        }
    }
}

/// Customer list template.
#[derive(Template, WebTemplate)]
#[template(path = "customers.html")]
pub struct CustomersTemplate {
    pub layout: Layout,
    pub customers: Vec<CustomerRow>,
    pub total: u64,
    pub search: String,
    pub pager: Pager,
}

/// Display the customer list.
#[instrument(skip(state, session, layout, admin))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> Response {
    let result = state.backend().admin_customers(&admin.token, &query).await;
    let page = match page_data(result, Paginated::empty(), &session, &mut layout).await {
        Ok(page) => page,
        Err(response) => return response,
    };

    CustomersTemplate {
        layout,
        customers: page.items.iter().map(CustomerRow::from).collect(),
        total: page.total,
        search: query.search().unwrap_or_default().to_string(),
        pager: list_pager(CUSTOMERS_PATH, &query, page.page, page.total_pages),
    }
    .into_response()
}

//! Order list and status changes.
//!
//! The status picker on each row posts through HTMX and gets the updated
//! row back. Without JavaScript the same form redirects to the list with a
//! toast.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::cart::Toast;
use bazaar_core::catalog::Paginated;
use bazaar_core::{OrderId, OrderStatus};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{inline_error, is_htmx, list_pager, page_data, session_expired, write_failed};
use crate::backend::{ApiError, ListQuery};
use crate::filters;
use crate::middleware::{RequireAdminAuth, RequireWriter};
use crate::models::session::push_toast;
use crate::state::AppState;
use crate::views::{Layout, OrderRow, Pager, StatusOption, status_options};

const ORDERS_PATH: &str = "/orders";

/// Order list template.
#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderRow>,
    pub total: u64,
    pub search: String,
    pub status_filter: Vec<StatusOption>,
    pub pager: Pager,
    pub can_write: bool,
}

/// One order row, swapped in after a status change.
#[derive(Template, WebTemplate)]
#[template(path = "partials/order_row.html")]
pub struct OrderRowTemplate {
    pub order: OrderRow,
    pub can_write: bool,
}

/// Status picker submission.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Display the order list.
#[instrument(skip(state, session, layout, admin))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> Response {
    let result = state.backend().admin_orders(&admin.token, &query).await;
    let page = match page_data(result, Paginated::empty(), &session, &mut layout).await {
        Ok(page) => page,
        Err(response) => return response,
    };

    let currency = state.config().currency;
    OrdersTemplate {
        layout,
        orders: page
            .items
            .iter()
            .map(|order| OrderRow::new(order, currency))
            .collect(),
        total: page.total,
        search: query.search().unwrap_or_default().to_string(),
        status_filter: status_options(query.status()),
        pager: list_pager(ORDERS_PATH, &query, page.page, page.total_pages),
        can_write: admin.can_write(),
    }
    .into_response()
}

/// Change an order's status.
#[instrument(skip(state, session, headers, admin, form))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> Response {
    let htmx = is_htmx(&headers);

    let Ok(status) = form.status.parse::<OrderStatus>() else {
        let message = "Choose a valid status.";
        if htmx {
            return inline_error(StatusCode::UNPROCESSABLE_ENTITY, message);
        }
        push_toast(&session, Toast::error(message)).await;
        return Redirect::to(ORDERS_PATH).into_response();
    };

    let order_id = OrderId::new(id);
    match state
        .backend()
        .update_order_status(&admin.token, order_id, status)
        .await
    {
        Ok(order) => {
            tracing::info!(
                order_id = id,
                status = %status,
                admin_id = admin.id,
                "Order status changed"
            );
            let row = OrderRow::new(&order, state.config().currency);
            if htmx {
                OrderRowTemplate {
                    order: row,
                    can_write: true,
                }
                .into_response()
            } else {
                push_toast(
                    &session,
                    Toast::success(format!("Order {} is now {}.", row.number, row.status)),
                )
                .await;
                Redirect::to(ORDERS_PATH).into_response()
            }
        }
        Err(ApiError::Unauthorized) => session_expired(&session, ORDERS_PATH, htmx).await,
        Err(e) if htmx => {
            tracing::warn!(error = %e, order_id = id, "Order status change rejected");
            let status = match &e {
                ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                ApiError::Forbidden => StatusCode::FORBIDDEN,
                ApiError::Api { status, .. } if *status < 500 => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::BAD_GATEWAY,
            };
            inline_error(status, e.user_message())
        }
        Err(e) => write_failed(&session, &e, ORDERS_PATH).await,
    }
}

//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (backend reachable)
//!
//! # Auth
//! GET  /login                          - Login page
//! POST /login                          - Login action
//! POST /logout                         - Logout
//!
//! # Dashboard
//! GET  /                               - Store totals and latest orders
//!
//! # Store (read for everyone, writes need the admin role)
//! GET  /orders                         - Order list with status filter
//! POST /orders/{id}/status             - Change status (row fragment for HTMX)
//! GET  /products                       - Product list
//! GET  /customers                      - Customer list
//! GET  /coupons                        - Coupons and the new-coupon form
//! POST /coupons                        - Create coupon
//! POST /coupons/{id}/delete            - Delete coupon
//!
//! # Activity logs
//! GET  /activity-logs                  - Filtered list
//! GET  /activity-logs/{id}             - Field diff (?all=1 for unchanged)
//!
//! # Promotions (writes need super admin)
//! GET  /lucky-spin                     - Wheel editor with preview
//! POST /lucky-spin                     - Save wheel
//! GET  /night-market                   - Event settings and offers
//! POST /night-market                   - Save event settings
//! POST /night-market/offers            - Add offer
//! POST /night-market/offers/{id}/delete - Remove offer
//! ```

pub mod activity_logs;
pub mod auth;
pub mod coupons;
pub mod customers;
pub mod dashboard;
pub mod health;
pub mod lucky_spin;
pub mod night_market;
pub mod orders;
pub mod products;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use bazaar_core::cart::Toast;
use tower_sessions::Session;
use url::form_urlencoded;

use crate::backend::{ApiError, ListQuery};
use crate::filters;
use crate::middleware::{auth::login_url, clear_current_admin};
use crate::models::session::push_toast;
use crate::state::AppState;
use crate::views::{Layout, Pager};

/// 404 page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub layout: Layout,
}

/// Inline error text swapped into an HTMX target.
#[derive(Template, WebTemplate)]
#[template(path = "partials/inline_error.html")]
pub struct InlineErrorTemplate {
    pub message: String,
}

/// Whether the request was issued by HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("HX-Request")
}

/// Render the 404 page.
#[must_use]
pub fn not_found_page(layout: Layout) -> Response {
    (StatusCode::NOT_FOUND, NotFoundTemplate { layout }).into_response()
}

/// Inline error fragment with a status code.
///
/// `admin.js` lets HTMX swap error responses that carry `.inline-error`.
#[must_use]
pub fn inline_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        InlineErrorTemplate {
            message: message.into(),
        },
    )
        .into_response()
}

/// The backend rejected the admin's token: forget them and send them to
/// log in again, returning to `next`.
pub async fn session_expired(session: &Session, next: &str, htmx: bool) -> Response {
    if let Err(e) = clear_current_admin(session).await {
        tracing::warn!(error = %e, "Failed to clear expired admin");
    }
    crate::error::clear_sentry_user();
    push_toast(session, Toast::info("Your session has expired. Please log in again.")).await;

    let login = login_url(next);
    if htmx {
        let mut response = StatusCode::UNAUTHORIZED.into_response();
        if let Ok(value) = HeaderValue::from_str(&login) {
            response.headers_mut().insert("HX-Redirect", value);
        }
        response
    } else {
        Redirect::to(&login).into_response()
    }
}

/// Unwrap a backend read for a page.
///
/// A rejected token ends the session. Any other failure renders the section
/// with `empty` and an error toast.
pub async fn page_data<T>(
    result: Result<T, ApiError>,
    empty: T,
    session: &Session,
    layout: &mut Layout,
) -> Result<T, Response> {
    match result {
        Ok(value) => Ok(value),
        Err(ApiError::Unauthorized) => Err(session_expired(session, &layout.path, false).await),
        Err(e) => {
            tracing::warn!(error = %e, path = %layout.path, "Backend call failed; rendering empty");
            layout.toasts.push(Toast::error(e.user_message()));
            Ok(empty)
        }
    }
}

/// A backend write failed: end the session on a rejected token, otherwise
/// report the error and go back to `back`.
pub async fn write_failed(session: &Session, error: &ApiError, back: &str) -> Response {
    if matches!(error, ApiError::Unauthorized) {
        return session_expired(session, back, false).await;
    }
    tracing::warn!(error = %error, "Backend rejected admin change");
    let message = match error {
        ApiError::Forbidden => "Your role does not allow this action.".to_string(),
        other => other.user_message(),
    };
    push_toast(session, Toast::error(message)).await;
    Redirect::to(back).into_response()
}

/// A lower-case validation message as a sentence for a toast or banner.
#[must_use]
pub fn sentence(message: impl std::fmt::Display) -> String {
    let message = message.to_string();
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        format!("{}{}.", first.to_uppercase(), chars.as_str())
    })
}

/// List URL for `path` that keeps the search and status filters.
#[must_use]
pub fn list_url(path: &str, query: &ListQuery, page: u32) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    if let Some(search) = query.search() {
        params.append_pair("search", search);
    }
    if let Some(status) = query.status() {
        params.append_pair("status", status.as_str());
    }
    if page > 1 {
        params.append_pair("page", &page.to_string());
    }
    let params = params.finish();
    if params.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{params}")
    }
}

/// Pagination bar for a list screen.
#[must_use]
pub fn list_pager(path: &str, query: &ListQuery, page: u32, total_pages: u32) -> Pager {
    Pager::new(page, total_pages, |n| list_url(path, query, n))
}

/// Fallback for unknown paths.
pub async fn fallback(layout: Layout) -> Response {
    not_found_page(layout)
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::index))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/products", get(products::index))
        .route("/customers", get(customers::index))
        .route("/coupons", get(coupons::index).post(coupons::create))
        .route("/coupons/{id}/delete", post(coupons::delete))
}

/// Create the promotion routes router.
pub fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route("/lucky-spin", get(lucky_spin::show).post(lucky_spin::save))
        .route(
            "/night-market",
            get(night_market::show).post(night_market::save_settings),
        )
        .route("/night-market/offers", post(night_market::create_offer))
        .route(
            "/night-market/offers/{id}/delete",
            post(night_market::delete_offer),
        )
}

/// Create all routes for the admin panel.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/activity-logs", get(activity_logs::index))
        .route("/activity-logs/{id}", get(activity_logs::show))
        .merge(store_routes())
        .merge(promotion_routes())
        .fallback(fallback)
}

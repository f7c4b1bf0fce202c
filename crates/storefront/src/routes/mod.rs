//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (backend reachable)
//!
//! # Catalog
//! GET  /shop                      - Listing with facets, sort, pagination
//! GET  /products/{slug}           - Product detail
//! POST /products/{slug}/reviews   - Submit review (auth)
//! GET  /recommendations/{id}      - Related products fragment (HTMX)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart (triggers cart-updated)
//! POST /cart/update               - Update quantity (cart_items fragment)
//! POST /cart/remove               - Remove line (cart_items fragment)
//! POST /cart/coupon               - Apply or remove coupon
//! GET  /cart/count                - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout                  - Checkout form
//! POST /checkout                  - Place order
//! GET  /orders/{id}/confirmation  - Order confirmation
//!
//! # Saved lists
//! GET  /wishlist                  - Wishlist page
//! POST /wishlist/toggle           - Toggle product (button fragment)
//! POST /wishlist/share            - Create share link
//! POST /wishlist/clear            - Empty the wishlist
//! GET  /wishlist/shared/{token}   - Someone else's shared wishlist
//! GET  /compare                   - Compare table
//! POST /compare/add               - Add product
//! POST /compare/remove            - Remove product
//! POST /compare/clear             - Empty the comparison
//!
//! # Promotions
//! GET  /flash-sales               - Active flash sales
//! GET  /lucky-spin                - Wheel page
//! POST /lucky-spin/spin           - Spin (auth, spin_result fragment)
//! GET  /night-market              - Night market cards
//! POST /night-market/reveal       - Reveal a card (auth, card fragment)
//!
//! # Auth
//! GET  /auth/login                - Login page
//! POST /auth/login                - Login action
//! GET  /auth/register             - Register page
//! POST /auth/register             - Register action
//! POST /auth/logout               - Logout action
//!
//! # Account (requires auth)
//! GET  /account                   - Profile and recommendations
//! POST /account                   - Update profile
//! GET  /account/orders            - Order history
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod compare;
pub mod flash_sales;
pub mod health;
pub mod home;
pub mod lucky_spin;
pub mod night_market;
pub mod products;
pub mod recommendations;
pub mod shop;
pub mod wishlist;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use bazaar_core::cart::{CompareList, Toast, Wishlist};
use tower_sessions::Session;

use crate::backend::ApiError;
use crate::filters;
use crate::middleware::{
    api_rate_limiter, auth::login_url, auth_rate_limiter, clear_current_customer,
    promo_rate_limiter,
};
use crate::models::session::{self, keys, push_toast};
use crate::state::AppState;
use crate::views::Layout;

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
/// HTMX does not swap 4xx/5xx responses by default; `bazaar.js` opts in for
/// `.inline-error` fragments.
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

/// The backend rejected the stored token: forget the customer and send them
/// to log in again, returning to `next`.
pub async fn session_expired(session: &Session, next: &str, htmx: bool) -> Response {
    if let Err(e) = clear_current_customer(session).await {
        tracing::warn!(error = %e, "Failed to clear expired customer");
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

/// Wishlist and compare list, empty when the session cannot be read.
pub async fn saved_lists(session: &Session) -> (Wishlist, CompareList) {
    let wishlist = session::load(session, keys::WISHLIST).await;
    let compare = session::load(session, keys::COMPARE).await;
    (
        wishlist.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read wishlist");
            Wishlist::default()
        }),
        compare.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read compare list");
            CompareList::default()
        }),
    )
}

/// Unwrap a backend result for a page section, logging and rendering the
/// section empty on failure.
pub fn or_empty<T: Default>(result: Result<T, ApiError>, what: &'static str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, section = what, "Backend call failed; rendering empty");
        T::default()
    })
}

/// Fallback for unknown paths.
pub async fn fallback(layout: Layout) -> Response {
    not_found_page(layout)
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route_layer(auth_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/coupon", post(cart::coupon))
        .route_layer(api_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .merge(mutations)
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/toggle", post(wishlist::toggle))
        .route("/share", post(wishlist::share))
        .route("/clear", post(wishlist::clear))
        .route_layer(api_rate_limiter());

    Router::new()
        .route("/", get(wishlist::show))
        .route("/shared/{token}", get(wishlist::shared))
        .merge(mutations)
}

/// Create the compare routes router.
pub fn compare_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(compare::show))
        .route("/add", post(compare::add))
        .route("/remove", post(compare::remove))
        .route("/clear", post(compare::clear))
}

/// Create the promotion routes router.
pub fn promotion_routes() -> Router<AppState> {
    let plays = Router::new()
        .route("/lucky-spin/spin", post(lucky_spin::spin))
        .route("/night-market/reveal", post(night_market::reveal))
        .route_layer(promo_rate_limiter());

    Router::new()
        .route("/flash-sales", get(flash_sales::index))
        .route("/lucky-spin", get(lucky_spin::show))
        .route("/night-market", get(night_market::show))
        .merge(plays)
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index).post(account::update_profile))
        .route("/orders", get(account::orders))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Catalog
        .route("/shop", get(shop::index))
        .route("/products/{slug}", get(products::show))
        .route("/products/{slug}/reviews", post(products::submit_review))
        .route("/recommendations/{product_id}", get(recommendations::related))
        // Cart and checkout
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place_order))
        .route("/orders/{id}/confirmation", get(checkout::confirmation))
        // Saved lists
        .nest("/wishlist", wishlist_routes())
        .nest("/compare", compare_routes())
        // Promotions
        .merge(promotion_routes())
        // Customers
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
        .fallback(fallback)
}

//! Page chrome: header counters, signed-in customer, toasts, CSP nonce.

use axum::{extract::FromRequestParts, http::request::Parts};
use bazaar_core::cart::{Cart, CompareList, Toast, Wishlist};
use tower_sessions::Session;

use crate::middleware::CspNonce;
use crate::models::session::{self, keys};
use crate::models::CurrentCustomer;
use crate::state::AppState;

/// Everything `base.html` needs.
///
/// Extracting a `Layout` consumes the pending toasts, so only full-page
/// handlers should take one; HTMX fragment handlers must not.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub nonce: String,
    pub customer: Option<CurrentCustomer>,
    pub cart_count: u32,
    pub wishlist_count: usize,
    pub compare_count: usize,
    pub toasts: Vec<Toast>,
    /// Request path, for highlighting the current nav entry.
    pub path: String,
}

impl Layout {
    /// Whether `prefix` is the current section.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            self.path == "/"
        } else {
            self.path.starts_with(prefix)
        }
    }

    /// Greeting name for the header.
    #[must_use]
    pub fn customer_name(&self) -> &str {
        self.customer
            .as_ref()
            .map_or("", CurrentCustomer::first_name)
    }
}

impl FromRequestParts<AppState> for Layout {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CspNonce(nonce) = match CspNonce::from_request_parts(parts, state).await {
            Ok(nonce) => nonce,
            Err(never) => match never {},
        };
        let path = parts.uri.path().to_string();

        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(Self {
                nonce,
                path,
                ..Self::default()
            });
        };

        let customer = session
            .get::<CurrentCustomer>(keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten();
        let cart: Cart = session::load(&session, keys::CART).await.unwrap_or_default();
        let wishlist: Wishlist = session::load(&session, keys::WISHLIST)
            .await
            .unwrap_or_default();
        let compare: CompareList = session::load(&session, keys::COMPARE)
            .await
            .unwrap_or_default();
        let toasts = session::take_toasts(&session).await;

        Ok(Self {
            nonce,
            customer,
            cart_count: cart.item_count(),
            wishlist_count: wishlist.len(),
            compare_count: compare.len(),
            toasts,
            path,
        })
    }
}

//! Session-related types.
//!
//! The visitor's cart, wishlist, compare list and pending toasts live in the
//! server-side session, next to the signed-in customer and their bearer
//! token. Nothing here is authoritative; the backend re-checks everything.

use std::fmt;

use bazaar_core::CustomerId;
use bazaar_core::cart::Toast;
use bazaar_core::customer::AuthResponse;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session-stored customer identity and backend token.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    pub id: CustomerId,
    pub full_name: String,
    pub email: String,
    /// Bearer token for customer-scoped backend calls.
    pub token: String,
}

impl fmt::Debug for CurrentCustomer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentCustomer")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl CurrentCustomer {
    /// First word of the name, for the header greeting.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.full_name)
    }
}

impl From<AuthResponse> for CurrentCustomer {
    fn from(auth: AuthResponse) -> Self {
        Self {
            id: auth.customer.id,
            full_name: auth.customer.full_name,
            email: auth.customer.email,
            token: auth.token,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Signed-in customer and token.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Cart lines and applied coupon.
    pub const CART: &str = "cart";

    /// Wishlist product ids.
    pub const WISHLIST: &str = "wishlist";

    /// Compare list product ids.
    pub const COMPARE: &str = "compare";

    /// Toasts waiting for the next page render.
    pub const TOASTS: &str = "toasts";

    /// Order just placed, shown on the confirmation page.
    pub const LAST_ORDER: &str = "last_order";

    /// Wheel rotation in degrees after the last spin.
    pub const WHEEL_ROTATION: &str = "wheel_rotation";
}

/// Read a value from the session, or its default when absent.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load<T>(session: &Session, key: &str) -> Result<T, tower_sessions::session::Error>
where
    T: DeserializeOwned + Default,
{
    Ok(session.get::<T>(key).await?.unwrap_or_default())
}

/// Write a value to the session.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized or the store fails.
pub async fn save<T>(
    session: &Session,
    key: &str,
    value: &T,
) -> Result<(), tower_sessions::session::Error>
where
    T: Serialize + Send + Sync,
{
    session.insert(key, value).await
}

/// Queue a toast for the next rendered page.
///
/// Store failures are logged; losing a toast is not worth failing a request.
pub async fn push_toast(session: &Session, toast: Toast) {
    let mut toasts: Vec<Toast> = match load(session, keys::TOASTS).await {
        Ok(toasts) => toasts,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read toasts");
            Vec::new()
        }
    };
    toasts.push(toast);
    if let Err(e) = save(session, keys::TOASTS, &toasts).await {
        tracing::warn!(error = %e, "Failed to queue toast");
    }
}

/// Take every queued toast, leaving none behind.
pub async fn take_toasts(session: &Session) -> Vec<Toast> {
    match session.remove::<Vec<Toast>>(keys::TOASTS).await {
        Ok(toasts) => toasts.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to take toasts");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bazaar_core::cart::{Cart, ToastLevel};
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[test]
    fn test_debug_redacts_token() {
        let customer = CurrentCustomer {
            id: CustomerId::new(5),
            full_name: "Nguyen Van A".to_string(),
            email: "a@example.vn".to_string(),
            token: "secret-token".to_string(),
        };
        let debug = format!("{customer:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(customer.first_name(), "Nguyen");
    }

    #[tokio::test]
    async fn test_load_defaults_when_absent() {
        let session = session();
        let cart: Cart = load(&session, keys::CART).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_toasts_are_taken_once() {
        let session = session();
        push_toast(&session, Toast::success("Added to cart")).await;
        push_toast(&session, Toast::error("Out of stock")).await;

        let toasts = take_toasts(&session).await;
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts.first().map(|t| t.level), Some(ToastLevel::Success));
        assert!(take_toasts(&session).await.is_empty());
    }
}

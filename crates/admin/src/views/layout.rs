//! Page chrome: signed-in admin, navigation, toasts and the CSP nonce.

use axum::{extract::FromRequestParts, http::request::Parts};
use bazaar_core::cart::Toast;
use tower_sessions::Session;

use crate::middleware::CspNonce;
use crate::models::{CurrentAdmin, session, session_keys};

/// Everything `base.html` needs. Extracting it consumes pending toasts.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub nonce: String,
    pub admin: Option<CurrentAdmin>,
    pub toasts: Vec<Toast>,
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

    #[must_use]
    pub fn can_write(&self) -> bool {
        self.admin.as_ref().is_some_and(CurrentAdmin::can_write)
    }

    #[must_use]
    pub fn can_configure_promotions(&self) -> bool {
        self.admin
            .as_ref()
            .is_some_and(CurrentAdmin::can_configure_promotions)
    }
}

impl<S> FromRequestParts<S> for Layout
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CspNonce(nonce) = match CspNonce::from_request_parts(parts, state).await {
            Ok(nonce) => nonce,
            Err(never) => match never {},
        };
        let path = parts.uri.path().to_string();

        let Some(store) = parts.extensions.get::<Session>().cloned() else {
            return Ok(Self {
                nonce,
                path,
                ..Self::default()
            });
        };

        let admin = store
            .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten();
        let toasts = session::take_toasts(&store).await;

        Ok(Self {
            nonce,
            admin,
            toasts,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use bazaar_core::AdminRole;

    use super::*;

    #[test]
    fn test_permissions_without_admin() {
        let layout = Layout {
            path: "/coupons".to_string(),
            ..Layout::default()
        };
        assert!(layout.is_active("/coupons"));
        assert!(!layout.is_active("/"));
        assert!(!layout.can_write());
    }

    #[test]
    fn test_permissions_with_admin() {
        let layout = Layout {
            admin: Some(CurrentAdmin {
                id: 2,
                email: "a@bazaar.vn".to_string(),
                name: "A".to_string(),
                role: AdminRole::Admin,
                token: String::new(),
            }),
            ..Layout::default()
        };
        assert!(layout.can_write());
        assert!(!layout.can_configure_promotions());
    }
}

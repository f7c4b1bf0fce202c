//! Session-related types for admin authentication.

use std::fmt;

use bazaar_core::AdminRole;
use bazaar_core::cart::Toast;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::backend::AdminAuthResponse;

/// Session-stored admin identity and backend token.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's backend ID.
    pub id: i64,
    pub email: String,
    /// Admin's display name.
    pub name: String,
    /// Admin's role/permission level.
    pub role: AdminRole,
    /// Bearer token for admin backend calls.
    pub token: String,
}

impl fmt::Debug for CurrentAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentAdmin")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl CurrentAdmin {
    #[must_use]
    pub const fn can_write(&self) -> bool {
        self.role.can_write()
    }

    #[must_use]
    pub const fn can_configure_promotions(&self) -> bool {
        self.role.can_configure_promotions()
    }

    /// Role as shown in the header.
    #[must_use]
    pub const fn role_label(&self) -> &'static str {
        match self.role {
            AdminRole::SuperAdmin => "Super admin",
            AdminRole::Admin => "Admin",
            AdminRole::Viewer => "Viewer",
        }
    }
}

impl From<AdminAuthResponse> for CurrentAdmin {
    fn from(auth: AdminAuthResponse) -> Self {
        Self {
            id: auth.admin.id,
            email: auth.admin.email,
            name: auth.admin.name,
            role: auth.admin.role,
            token: auth.token,
        }
    }
}

/// Session keys for admin data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Toasts waiting for the next page render.
    pub const TOASTS: &str = "toasts";
}

/// Queue a toast for the next rendered page. Store failures are logged.
pub async fn push_toast(session: &Session, toast: Toast) {
    let mut toasts: Vec<Toast> = match session.get(keys::TOASTS).await {
        Ok(toasts) => toasts.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read toasts");
            Vec::new()
        }
    };
    toasts.push(toast);
    if let Err(e) = session.insert(keys::TOASTS, &toasts).await {
        tracing::warn!(error = %e, "Failed to queue toast");
    }
}

/// Take every queued toast.
pub async fn take_toasts(session: &Session) -> Vec<Toast> {
    session
        .remove::<Vec<Toast>>(keys::TOASTS)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to take toasts");
            None
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn admin(role: AdminRole) -> CurrentAdmin {
        CurrentAdmin {
            id: 1,
            email: "ops@bazaar.vn".to_string(),
            name: "Ops".to_string(),
            role,
            token: "admin-token".to_string(),
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", admin(AdminRole::Admin));
        assert!(!debug.contains("admin-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_permissions_follow_role() {
        assert!(admin(AdminRole::SuperAdmin).can_configure_promotions());
        assert!(admin(AdminRole::Admin).can_write());
        assert!(!admin(AdminRole::Admin).can_configure_promotions());
        assert!(!admin(AdminRole::Viewer).can_write());
        assert_eq!(admin(AdminRole::Viewer).role_label(), "Viewer");
    }

    #[tokio::test]
    async fn test_toasts_round_trip_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        push_toast(&session, Toast::success("Saved")).await;
        assert_eq!(take_toasts(&session).await.len(), 1);
        assert!(take_toasts(&session).await.is_empty());
    }
}

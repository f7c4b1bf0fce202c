//! Error reporting context for admin.
//!
//! Admin handlers never surface an error page for backend failures: reads
//! render an empty section with a toast and writes redirect back with one
//! (see [`crate::routes::page_data`] and [`crate::routes::write_failed`]).
//! What remains here ties Sentry events to the admin who caused them.

/// Associate Sentry events with the signed-in admin.
pub fn set_sentry_admin(id: i64, email: &str, role: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(id.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
        scope.set_tag("admin_role", role);
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
        scope.remove_tag("admin_role");
    });
}

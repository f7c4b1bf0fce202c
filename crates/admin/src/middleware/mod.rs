//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CSP nonce
//! 5. Security headers (stricter CSP for admin)
//! 6. Session layer (tower-sessions, in-memory, SameSite=Strict)
//!
//! Authentication and role checks are extractors, see [`auth`].

pub mod auth;
pub mod csp;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAdminAuth, RequireAdminAuth, RequireSuperAdmin, RequireWriter, clear_current_admin,
    set_current_admin,
};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;

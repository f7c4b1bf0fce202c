//! Authentication extractors.
//!
//! The signed-in customer and their backend bearer token are stored in the
//! session at login. These extractors read them back.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentCustomer, session_keys};

/// Extractor that requires a signed-in customer.
///
/// Page requests are redirected to the login page with a `next` parameter;
/// HTMX requests get an `HX-Redirect` header instead, so the whole page
/// navigates rather than swapping the login form into a fragment.
///
/// # Example
///
/// ```rust,ignore
/// async fn account(RequireAuth(customer): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", customer.first_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Rejection when a customer must be signed in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, returning to `next` afterwards.
    RedirectToLogin { next: String },
    /// HTMX request: ask the client to navigate to the login page.
    HtmxRedirect { next: String },
    /// No session layer in front of the handler.
    Unauthorized,
}

/// Login URL that returns to `next` after signing in.
#[must_use]
pub fn login_url(next: &str) -> String {
    if next.is_empty() || next == "/" {
        "/auth/login".to_string()
    } else {
        format!("/auth/login?next={}", urlencoding::encode(next))
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::HtmxRedirect { next } => {
                let mut response = StatusCode::UNAUTHORIZED.into_response();
                if let Ok(value) = HeaderValue::from_str(&login_url(&next)) {
                    response.headers_mut().insert("HX-Redirect", value);
                }
                response
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

async fn current_customer(parts: &Parts) -> Option<CurrentCustomer> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await
        .ok()
        .flatten()
}

/// Where to come back to after login: the page itself for normal requests,
/// the page that issued an HTMX request otherwise.
fn return_path(parts: &Parts) -> String {
    let htmx_origin = parts
        .headers
        .get("HX-Current-URL")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| url::Url::parse(s).ok())
        .map(|u| u.path().to_string());
    htmx_origin.unwrap_or_else(|| {
        parts
            .uri
            .path_and_query()
            .map_or_else(|| "/".to_string(), ToString::to_string)
    })
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if parts.extensions.get::<Session>().is_none() {
            return Err(AuthRejection::Unauthorized);
        }

        match current_customer(parts).await {
            Some(customer) => Ok(Self(customer)),
            None => {
                let next = return_path(parts);
                if parts.headers.contains_key("HX-Request") {
                    Err(AuthRejection::HtmxRedirect { next })
                } else {
                    Err(AuthRejection::RedirectToLogin { next })
                }
            }
        }
    }
}

/// Extractor that optionally gets the signed-in customer.
pub struct OptionalAuth(pub Option<CurrentCustomer>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_customer(parts).await))
    }
}

/// Store the signed-in customer in the session.
///
/// The session id is cycled first so a pre-login session id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Remove the signed-in customer from the session (logout, or a token the
/// backend no longer accepts). Cart and wishlist stay.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await?;
    Ok(())
}

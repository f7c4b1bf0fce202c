//! Authentication route handlers.
//!
//! Login and registration go through the backend, which answers with a
//! bearer token. The token and a copy of the customer's name and email are
//! kept in the session until logout or until the backend stops accepting it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::ValidationErrors;
use bazaar_core::cart::Toast;
use bazaar_core::customer::{LoginForm, RegisterForm};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::ApiError;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_customer, set_current_customer};
use crate::models::CurrentCustomer;
use crate::models::session::push_toast;
use crate::state::AppState;
use crate::views::Layout;

const AFTER_LOGIN: &str = "/account";

// =============================================================================
// Query Types
// =============================================================================

/// Where to return after signing in.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Only same-site paths are accepted as a return target.
fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.starts_with("/auth/") =>
        {
            path.to_string()
        }
        _ => AFTER_LOGIN.to_string(),
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Values and errors for the login form.
#[derive(Debug, Clone, Default)]
pub struct LoginFormView {
    pub email: String,
    pub next: String,
    pub email_error: Option<String>,
    pub password_error: Option<String>,
    pub form_error: Option<String>,
}

/// Values and errors for the registration form.
#[derive(Debug, Clone, Default)]
pub struct RegisterFormView {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub full_name_error: Option<String>,
    pub email_error: Option<String>,
    pub phone_error: Option<String>,
    pub password_error: Option<String>,
    pub password_confirm_error: Option<String>,
    pub form_error: Option<String>,
}

impl RegisterFormView {
    fn new(form: &RegisterForm, errors: &ValidationErrors) -> Self {
        let error = |field: &str| errors.get(field).map(String::from);
        Self {
            full_name: form.full_name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            full_name_error: error("full_name"),
            email_error: error("email"),
            phone_error: error("phone"),
            password_error: error("password"),
            password_confirm_error: error("password_confirm"),
            form_error: None,
        }
    }
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub form: LoginFormView,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub form: RegisterFormView,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(layout, customer))]
pub async fn login_page(
    layout: Layout,
    OptionalAuth(customer): OptionalAuth,
    Query(query): Query<NextQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref());
    if customer.is_some() {
        return Redirect::to(&next).into_response();
    }
    LoginTemplate {
        layout,
        form: LoginFormView {
            next,
            ..LoginFormView::default()
        },
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, layout, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());
    let render =
        |layout: Layout, view: LoginFormView| LoginTemplate { layout, form: view }.into_response();

    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            return render(
                layout,
                LoginFormView {
                    email: form.email.clone(),
                    next,
                    email_error: errors.get("email").map(String::from),
                    password_error: errors.get("password").map(String::from),
                    form_error: None,
                },
            );
        }
    };

    let auth = match state.backend().login(&credentials).await {
        Ok(auth) => auth,
        Err(e) => {
            let message = match &e {
                ApiError::Unauthorized | ApiError::NotFound(_) => {
                    "Incorrect email or password.".to_string()
                }
                ApiError::Api { status, .. } if *status == 400 || *status == 401 => {
                    "Incorrect email or password.".to_string()
                }
                _ => {
                    tracing::warn!(error = %e, "Login failed");
                    e.user_message()
                }
            };
            return render(
                layout,
                LoginFormView {
                    email: form.email.clone(),
                    next,
                    form_error: Some(message),
                    ..LoginFormView::default()
                },
            );
        }
    };

    sign_in(&session, CurrentCustomer::from(auth), &next).await
}

async fn sign_in(session: &Session, customer: CurrentCustomer, next: &str) -> Response {
    if let Err(e) = set_current_customer(session, &customer).await {
        tracing::error!(error = %e, "Failed to store customer in session");
        push_toast(session, Toast::error("We could not sign you in. Please try again.")).await;
        return Redirect::to("/auth/login").into_response();
    }
    set_sentry_user(&customer.id, Some(&customer.email));
    tracing::info!(customer_id = %customer.id, "Customer signed in");

    push_toast(
        session,
        Toast::success(format!("Welcome, {}!", customer.first_name())),
    )
    .await;
    Redirect::to(next).into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(layout, customer))]
pub async fn register_page(layout: Layout, OptionalAuth(customer): OptionalAuth) -> Response {
    if customer.is_some() {
        return Redirect::to(AFTER_LOGIN).into_response();
    }
    RegisterTemplate {
        layout,
        form: RegisterFormView::default(),
    }
    .into_response()
}

/// Handle registration form submission. A new account is signed in
/// straight away.
#[instrument(skip(state, session, layout, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Form(form): Form<RegisterForm>,
) -> Response {
    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => {
            return RegisterTemplate {
                layout,
                form: RegisterFormView::new(&form, &errors),
            }
            .into_response();
        }
    };

    match state.backend().register(&registration).await {
        Ok(auth) => sign_in(&session, CurrentCustomer::from(auth), AFTER_LOGIN).await,
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            let mut view = RegisterFormView::new(&form, &ValidationErrors::new());
            view.form_error = Some(e.user_message());
            RegisterTemplate { layout, form: view }.into_response()
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// Forgets the customer and token; cart and wishlist stay with the visitor.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_customer(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    if let Err(e) = session.cycle_id().await {
        tracing::warn!(error = %e, "Failed to cycle session id");
    }
    clear_sentry_user();

    push_toast(&session, Toast::info("You have been logged out.")).await;
    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/account/orders")), "/account/orders");
        assert_eq!(safe_next(Some("/shop?page=2")), "/shop?page=2");
        assert_eq!(safe_next(Some("//evil.example")), AFTER_LOGIN);
        assert_eq!(safe_next(Some("https://evil.example")), AFTER_LOGIN);
        assert_eq!(safe_next(Some("/\\evil.example")), AFTER_LOGIN);
        assert_eq!(safe_next(Some("/auth/logout")), AFTER_LOGIN);
        assert_eq!(safe_next(None), AFTER_LOGIN);
    }

    #[test]
    fn test_register_view_keeps_input() {
        let form = RegisterForm {
            full_name: "Mai".into(),
            email: "not-an-email".into(),
            ..RegisterForm::default()
        };
        let errors = form.validate().err().unwrap_or_default();
        let view = RegisterFormView::new(&form, &errors);
        assert_eq!(view.full_name, "Mai");
        assert!(view.email_error.is_some());
        assert!(view.password_error.is_some());
    }
}

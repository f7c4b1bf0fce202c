//! Authentication route handlers for admin.
//!
//! Admins sign in with email and password against the backend. The bearer
//! token it returns stays in the server-side session; the browser only ever
//! sees the session cookie.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::cart::Toast;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::ApiError;
use crate::error::{clear_sentry_user, set_sentry_admin};
use crate::filters;
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::models::session::push_toast;
use crate::state::AppState;
use crate::views::Layout;

const AFTER_LOGIN: &str = "/";

/// Where to return after signing in.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Login form as posted.
#[derive(Debug, Default, Deserialize)]
pub struct AdminLoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Only same-site paths are accepted as a return target.
fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.starts_with("/login")
                && !path.starts_with("/logout") =>
        {
            path.to_string()
        }
        _ => AFTER_LOGIN.to_string(),
    }
}

/// Values and errors for the login form.
#[derive(Debug, Clone, Default)]
pub struct LoginFormView {
    pub email: String,
    pub next: String,
    pub email_error: Option<String>,
    pub password_error: Option<String>,
    pub form_error: Option<String>,
}

impl LoginFormView {
    /// Field errors for blank input, or `None` when both fields are filled.
    fn check(form: &AdminLoginForm, next: &str) -> Option<Self> {
        let email_error = form
            .email
            .trim()
            .is_empty()
            .then(|| "Email is required".to_string());
        let password_error = form
            .password
            .is_empty()
            .then(|| "Password is required".to_string());
        (email_error.is_some() || password_error.is_some()).then(|| Self {
            email: form.email.trim().to_string(),
            next: next.to_string(),
            email_error,
            password_error,
            form_error: None,
        })
    }
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub form: LoginFormView,
}

/// Display the login page.
#[instrument(skip(layout, admin))]
pub async fn login_page(
    layout: Layout,
    OptionalAdminAuth(admin): OptionalAdminAuth,
    Query(query): Query<NextQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref());
    if admin.is_some() {
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
    Form(form): Form<AdminLoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());
    let render =
        |layout: Layout, view: LoginFormView| LoginTemplate { layout, form: view }.into_response();

    if let Some(view) = LoginFormView::check(&form, &next) {
        return render(layout, view);
    }

    let email = form.email.trim();
    let auth = match state.backend().admin_login(email, &form.password).await {
        Ok(auth) => auth,
        Err(e) => {
            let message = match &e {
                ApiError::Unauthorized | ApiError::Forbidden | ApiError::NotFound(_) => {
                    "Incorrect email or password.".to_string()
                }
                ApiError::Api { status, .. } if *status == 400 || *status == 422 => {
                    "Incorrect email or password.".to_string()
                }
                _ => {
                    tracing::warn!(error = %e, "Admin login failed");
                    e.user_message()
                }
            };
            return render(
                layout,
                LoginFormView {
                    email: email.to_string(),
                    next,
                    form_error: Some(message),
                    ..LoginFormView::default()
                },
            );
        }
    };

    let admin = CurrentAdmin::from(auth);
    if let Err(e) = set_current_admin(&session, &admin).await {
        tracing::error!(error = %e, "Failed to store admin in session");
        push_toast(&session, Toast::error("We could not sign you in. Please try again.")).await;
        return Redirect::to("/login").into_response();
    }
    set_sentry_admin(admin.id, &admin.email, admin.role.to_string().as_str());
    tracing::info!(admin_id = admin.id, role = %admin.role, "Admin signed in");

    push_toast(&session, Toast::success(format!("Welcome back, {}.", admin.name))).await;
    Redirect::to(&next).into_response()
}

/// Logout and clear session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    if let Err(e) = session.cycle_id().await {
        tracing::warn!(error = %e, "Failed to cycle session id");
    }
    clear_sentry_user();

    push_toast(&session, Toast::info("You have been logged out.")).await;
    Redirect::to("/login").into_response()
}

//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::ValidationErrors;
use bazaar_core::cart::Toast;
use bazaar_core::customer::{Customer, ProfileForm};
use tower_sessions::Session;
use tracing::instrument;

use super::{saved_lists, session_expired};
use crate::backend::ApiError;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuth, set_current_customer};
use crate::models::session::push_toast;
use crate::state::AppState;
use crate::views::{Layout, OrderView, ProductCard, cards};

const RECOMMENDATION_COUNT: usize = 4;

/// Profile form values and errors.
#[derive(Debug, Clone, Default)]
pub struct ProfileView {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub member_since: Option<String>,
    pub full_name_error: Option<String>,
    pub phone_error: Option<String>,
}

impl ProfileView {
    fn from_customer(customer: &Customer) -> Self {
        Self {
            full_name: customer.full_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone().unwrap_or_default(),
            address: customer.address.clone().unwrap_or_default(),
            member_since: customer.created_at.map(|d| d.format("%m/%Y").to_string()),
            ..Self::default()
        }
    }

    fn with_errors(email: &str, form: &ProfileForm, errors: &ValidationErrors) -> Self {
        Self {
            full_name: form.full_name.clone(),
            email: email.to_string(),
            phone: form.phone.clone(),
            address: form.address.clone(),
            member_since: None,
            full_name_error: errors.get("full_name").map(String::from),
            phone_error: errors.get("phone").map(String::from),
        }
    }
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub layout: Layout,
    pub profile: ProfileView,
    pub recommendations: Vec<ProductCard>,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct AccountOrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
}

/// Display account overview page.
#[instrument(skip(state, session, layout, current))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    RequireAuth(current): RequireAuth,
) -> Result<Response, AppError> {
    let backend = state.backend();
    let (customer, recommended) = tokio::join!(
        backend.me(&current.token),
        backend.recommended_for_me(&current.token),
    );

    let customer = match customer {
        Ok(customer) => customer,
        Err(ApiError::Unauthorized) => {
            return Ok(session_expired(&session, "/account", false).await);
        }
        Err(e) => return Err(e.into()),
    };

    let recommended = recommended.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load recommendations");
        Vec::new()
    });
    let (wishlist, compare) = saved_lists(&session).await;
    if layout.toasts.is_empty() && customer.phone.is_none() {
        layout
            .toasts
            .push(Toast::info("Add a phone number to speed up checkout."));
    }

    Ok(AccountIndexTemplate {
        layout,
        profile: ProfileView::from_customer(&customer),
        recommendations: cards(
            recommended.iter().take(RECOMMENDATION_COUNT),
            state.config().currency,
            &wishlist,
            &compare,
        ),
    }
    .into_response())
}

/// Update the profile.
#[instrument(skip(state, session, layout, current, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireAuth(mut current): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let render = |layout: Layout, profile: ProfileView| AccountIndexTemplate {
        layout,
        profile,
        recommendations: Vec::new(),
    };

    let update = match form.validate() {
        Ok(update) => update,
        Err(errors) => {
            let profile = ProfileView::with_errors(&current.email, &form, &errors);
            return Ok(render(layout, profile).into_response());
        }
    };

    let customer = match state.backend().update_me(&current.token, &update).await {
        Ok(customer) => customer,
        Err(ApiError::Unauthorized) => {
            return Ok(session_expired(&session, "/account", false).await);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Profile update rejected");
            let mut layout = layout;
            layout.toasts.push(Toast::error(e.user_message()));
            let profile = ProfileView::with_errors(&current.email, &form, &ValidationErrors::new());
            return Ok(render(layout, profile).into_response());
        }
    };

    current.full_name.clone_from(&customer.full_name);
    set_current_customer(&session, &current).await?;

    push_toast(&session, Toast::success("Profile saved.")).await;
    Ok(Redirect::to("/account").into_response())
}

/// Display order history.
#[instrument(skip(state, session, layout, current))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireAuth(current): RequireAuth,
) -> Result<Response, AppError> {
    let orders = match state.backend().my_orders(&current.token).await {
        Ok(orders) => orders,
        Err(ApiError::Unauthorized) => {
            return Ok(session_expired(&session, "/account/orders", false).await);
        }
        Err(e) => return Err(e.into()),
    };

    let currency = state.config().currency;
    Ok(AccountOrdersTemplate {
        layout,
        orders: orders.iter().map(|o| OrderView::new(o, currency)).collect(),
    }
    .into_response())
}

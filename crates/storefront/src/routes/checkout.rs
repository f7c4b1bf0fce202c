//! Checkout and order confirmation.
//!
//! The order is built from the session cart and placed with the backend,
//! which re-checks stock, prices and the coupon. Guests may check out; a
//! signed-in customer's token is forwarded so the order lands in their
//! history.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::cart::{Cart, Toast};
use bazaar_core::checkout::{CheckoutForm, Order, OrderRequest};
use bazaar_core::{PaymentMethod, ValidationErrors};
use tower_sessions::Session;
use tracing::instrument;

use super::{not_found_page, session_expired};
use crate::backend::ApiError;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentCustomer;
use crate::models::session::{self, keys, push_toast};
use crate::state::AppState;
use crate::views::{CartView, Layout, OrderView};

/// A payment method radio button.
#[derive(Debug, Clone)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
    pub checked: bool,
}

/// Checkout form values and per-field errors.
#[derive(Debug, Clone, Default)]
pub struct CheckoutFormView {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub note: String,
    pub full_name_error: Option<String>,
    pub phone_error: Option<String>,
    pub email_error: Option<String>,
    pub address_error: Option<String>,
    pub note_error: Option<String>,
    pub payment_error: Option<String>,
    pub form_error: Option<String>,
}

impl CheckoutFormView {
    fn prefilled(customer: Option<&CurrentCustomer>) -> Self {
        customer.map_or_else(Self::default, |c| Self {
            full_name: c.full_name.clone(),
            email: c.email.clone(),
            ..Self::default()
        })
    }

    fn with_errors(form: &CheckoutForm, errors: &ValidationErrors) -> Self {
        let error = |field: &str| errors.get(field).map(String::from);
        Self {
            full_name: form.full_name.clone(),
            phone: form.phone.clone(),
            email: form.email.clone(),
            address: form.address.clone(),
            note: form.note.clone(),
            full_name_error: error("full_name"),
            phone_error: error("phone"),
            email_error: error("email"),
            address_error: error("address"),
            note_error: error("note"),
            payment_error: error("payment_method"),
            form_error: None,
        }
    }
}

fn payment_options(selected: &str) -> Vec<PaymentOption> {
    let selected = if selected.is_empty() {
        PaymentMethod::default().as_str()
    } else {
        selected
    };
    [PaymentMethod::Cod, PaymentMethod::BankTransfer]
        .into_iter()
        .map(|method| PaymentOption {
            value: method.as_str(),
            label: method.label(),
            checked: method.as_str() == selected,
        })
        .collect()
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub form: CheckoutFormView,
    pub payment_options: Vec<PaymentOption>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/confirmation.html")]
pub struct ConfirmationTemplate {
    pub layout: Layout,
    pub order: OrderView,
    pub bank_transfer: bool,
}

fn cart_view(state: &AppState, cart: &Cart) -> CartView {
    let config = state.config();
    CartView::new(
        cart,
        &cart.totals(&config.shipping),
        config.shipping.free_threshold,
        config.currency,
    )
}

/// Display the checkout form.
#[instrument(skip(state, session, layout, customer))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalAuth(customer): OptionalAuth,
) -> Result<Response, AppError> {
    let cart: Cart = session::load(&session, keys::CART).await?;
    if cart.is_empty() {
        push_toast(&session, Toast::info("Your cart is empty.")).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    Ok(CheckoutTemplate {
        layout,
        cart: cart_view(&state, &cart),
        form: CheckoutFormView::prefilled(customer.as_ref()),
        payment_options: payment_options(""),
    }
    .into_response())
}

/// Validate the form and place the order.
#[instrument(skip(state, session, layout, customer, form))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalAuth(customer): OptionalAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let mut cart: Cart = session::load(&session, keys::CART).await?;

    let render = |layout: Layout, cart: &Cart, form_view: CheckoutFormView| CheckoutTemplate {
        layout,
        cart: cart_view(&state, cart),
        form: form_view,
        payment_options: payment_options(&form.payment_method),
    };

    let details = match form.validate() {
        Ok(details) => details,
        Err(errors) => {
            let view = CheckoutFormView::with_errors(&form, &errors);
            return Ok(render(layout, &cart, view).into_response());
        }
    };

    let Some(request) = OrderRequest::from_cart(&cart, details) else {
        push_toast(&session, Toast::info("Your cart is empty.")).await;
        return Ok(Redirect::to("/cart").into_response());
    };

    let token = customer.as_ref().map(|c| c.token.as_str());
    let order = match state.backend().place_order(token, &request).await {
        Ok(order) => order,
        Err(ApiError::Unauthorized) if customer.is_some() => {
            return Ok(session_expired(&session, "/checkout", false).await);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Order rejected");
            let mut view = CheckoutFormView::with_errors(&form, &ValidationErrors::new());
            view.form_error = Some(e.user_message());
            return Ok(render(layout, &cart, view).into_response());
        }
    };

    let order_id = order.id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
    tracing::info!(order_id = %order.id, "Order placed");

    cart.clear();
    session::save(&session, keys::CART, &cart).await?;
    session::save(&session, keys::LAST_ORDER, &order).await?;

    Ok(Redirect::to(&format!("/orders/{}/confirmation", order.id)).into_response())
}

/// Show the order just placed.
///
/// Guests can only see the order stored in their session at checkout;
/// signed-in customers can also open any order from their history.
#[instrument(skip(state, session, layout, customer))]
pub async fn confirmation(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalAuth(customer): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let last: Option<Order> = session.get(keys::LAST_ORDER).await?;
    let order = match last.filter(|o| o.id.as_i64() == id) {
        Some(order) => Some(order),
        None => match &customer {
            Some(customer) => match state.backend().my_orders(&customer.token).await {
                Ok(orders) => orders.into_iter().find(|o| o.id.as_i64() == id),
                Err(ApiError::Unauthorized) => {
                    let next = format!("/orders/{id}/confirmation");
                    return Ok(session_expired(&session, &next, false).await);
                }
                Err(e) => return Err(e.into()),
            },
            None => None,
        },
    };

    let Some(order) = order else {
        return Ok(not_found_page(layout));
    };

    Ok(ConfirmationTemplate {
        layout,
        bank_transfer: order.payment_method == Some(PaymentMethod::BankTransfer),
        order: OrderView::new(&order, state.config().currency),
    }
    .into_response())
}

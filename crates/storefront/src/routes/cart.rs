//! Cart route handlers.
//!
//! The cart lives in the session. Mutations answer HTMX requests with
//! fragments and fire `cart-updated` so the header badge refreshes; plain
//! form posts are redirected back to the cart page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use bazaar_core::VariantId;
use bazaar_core::cart::{AppliedCoupon, Cart, CartError, CartLine, Toast};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{inline_error, is_htmx};
use crate::backend::ApiError;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::models::session::{self, keys, push_toast};
use crate::state::AppState;
use crate::views::{CartView, Layout};

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub slug: String,
    pub variant_id: VariantId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub variant_id: VariantId,
}

/// Coupon form data. `action=remove` drops the applied coupon.
#[derive(Debug, Deserialize)]
pub struct CouponForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub action: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub notice: Option<Toast>,
}

/// Cart items and totals fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub notice: Option<Toast>,
}

/// Cart count badge fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Add-to-cart confirmation fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_added.html")]
pub struct CartAddedTemplate {
    pub message: String,
}

async fn load_cart(session: &Session) -> Result<Cart, AppError> {
    Ok(session::load(session, keys::CART).await?)
}

async fn save_cart(session: &Session, cart: &Cart) -> Result<(), AppError> {
    Ok(session::save(session, keys::CART, cart).await?)
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

/// Answer a cart mutation: the items fragment for HTMX, otherwise a
/// redirect to the cart page with the notice as a toast.
async fn respond(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    cart: &Cart,
    notice: Option<Toast>,
) -> Response {
    if is_htmx(headers) {
        (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartItemsTemplate {
                cart: cart_view(state, cart),
                notice,
            },
        )
            .into_response()
    } else {
        if let Some(notice) = notice {
            push_toast(session, notice).await;
        }
        Redirect::to("/cart").into_response()
    }
}

/// Display the cart page.
#[instrument(skip(state, session, layout))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
) -> Result<impl IntoResponse, AppError> {
    let cart = load_cart(&session).await?;
    Ok(CartShowTemplate {
        layout,
        cart: cart_view(&state, &cart),
        notice: None,
    })
}

/// Add a variant to the cart.
///
/// The product is re-read (from cache) so the line carries a current price
/// and stock.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let htmx = is_htmx(&headers);
    let product = match state.backend().product_by_slug(&form.slug).await {
        Ok(product) => product,
        Err(e) => {
            tracing::warn!(error = %e, slug = %form.slug, "Failed to load product for cart");
            return Ok(if htmx {
                inline_error(StatusCode::BAD_GATEWAY, e.user_message())
            } else {
                push_toast(&session, Toast::error(e.user_message())).await;
                Redirect::to("/cart").into_response()
            });
        }
    };

    let Some(variant) = product.variant(form.variant_id) else {
        return Ok(inline_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Please choose an option.",
        ));
    };

    let line = CartLine {
        variant_id: variant.id,
        product_id: product.id,
        slug: product.slug.clone(),
        name: product.name.clone(),
        variant_label: variant.label(),
        image: product.primary_image().map(String::from),
        unit_price: product.variant_price(variant),
        quantity: form.quantity.unwrap_or(1),
        max_stock: Some(variant.stock),
    };

    let mut cart = load_cart(&session).await?;
    let outcome = match cart.add(line) {
        Ok(outcome) => outcome,
        Err(CartError::OutOfStock) => {
            return Ok(if htmx {
                inline_error(StatusCode::CONFLICT, "Sorry, this option is out of stock.")
            } else {
                push_toast(&session, Toast::error("Sorry, this option is out of stock.")).await;
                Redirect::to(&format!("/products/{}", urlencoding::encode(&product.slug)))
                    .into_response()
            });
        }
        Err(e) => return Err(AppError::BadRequest(e.to_string())),
    };
    save_cart(&session, &cart).await?;

    let variant_id = form.variant_id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("variant_id", variant_id.as_str())]));

    let message = if outcome.clamped {
        format!("Only {} in stock; your cart has the maximum.", outcome.quantity)
    } else {
        format!("Added {} to your cart.", product.name)
    };

    if htmx {
        Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartAddedTemplate { message },
        )
            .into_response())
    } else {
        push_toast(&session, Toast::success(message)).await;
        Ok(Redirect::to("/cart").into_response())
    }
}

/// Change a line's quantity; zero removes it.
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await?;
    let had_coupon = cart.coupon().is_some();

    let notice = match cart.set_quantity(form.variant_id, form.quantity) {
        Ok(stored) if form.quantity > 0 && stored < form.quantity => {
            Some(Toast::info(format!("Only {stored} in stock.")))
        }
        Ok(_) => None,
        Err(CartError::LineNotFound) => Some(Toast::error("That item is no longer in your cart.")),
        Err(e) => Some(Toast::error(e.to_string())),
    };
    save_cart(&session, &cart).await?;

    let notice = notice.or_else(|| coupon_dropped(had_coupon, &cart));
    Ok(respond(&state, &session, &headers, &cart, notice).await)
}

/// Remove a line.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await?;
    let had_coupon = cart.coupon().is_some();

    // Removing a line that is already gone is not worth an error
    let _ = cart.remove(form.variant_id);
    save_cart(&session, &cart).await?;

    let notice = coupon_dropped(had_coupon, &cart);
    Ok(respond(&state, &session, &headers, &cart, notice).await)
}

fn coupon_dropped(had_coupon: bool, cart: &Cart) -> Option<Toast> {
    (had_coupon && cart.coupon().is_none() && !cart.is_empty())
        .then(|| Toast::info("Your cart changed, so the coupon was removed. Apply it again."))
}

/// Apply or remove a coupon.
///
/// The backend decides whether the code is valid and how much it takes off
/// the current subtotal.
#[instrument(skip(state, session, headers))]
pub async fn coupon(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<CouponForm>,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await?;

    if form.action.as_deref() == Some("remove") {
        cart.remove_coupon();
        save_cart(&session, &cart).await?;
        let notice = Some(Toast::info("Coupon removed."));
        return Ok(respond(&state, &session, &headers, &cart, notice).await);
    }

    let code = form.code.trim().to_uppercase();
    if code.is_empty() {
        let notice = Some(Toast::error("Enter a coupon code."));
        return Ok(respond(&state, &session, &headers, &cart, notice).await);
    }
    if cart.is_empty() {
        let notice = Some(Toast::error("Add something to your cart first."));
        return Ok(respond(&state, &session, &headers, &cart, notice).await);
    }

    let notice = match state.backend().validate_coupon(&code, cart.subtotal()).await {
        Ok(check) if check.valid => {
            cart.apply_coupon(AppliedCoupon {
                code: code.clone(),
                discount: check.discount,
            });
            save_cart(&session, &cart).await?;
            Toast::success(format!("Coupon {code} applied."))
        }
        Ok(check) => Toast::error(
            check
                .message
                .unwrap_or_else(|| "This coupon cannot be used.".to_string()),
        ),
        Err(e @ (ApiError::RateLimited(_) | ApiError::Unauthorized)) => {
            Toast::error(e.user_message())
        }
        Err(e) => {
            tracing::error!(error = %e, "Coupon check failed");
            Toast::error(e.user_message())
        }
    };

    Ok(respond(&state, &session, &headers, &cart, Some(notice)).await)
}

/// Cart count badge.
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    let count = session::load::<Cart>(&session, keys::CART)
        .await
        .map(|cart| cart.item_count())
        .unwrap_or(0);
    CartCountTemplate { count }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_dropped_notice() {
        let cart = Cart::default();
        assert!(coupon_dropped(true, &cart).is_none());
        assert!(coupon_dropped(false, &cart).is_none());
    }
}

//! Wishlist pages and the heart-button toggle.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use bazaar_core::cart::{Toast, Wishlist};
use bazaar_core::{ProductId, ShareToken};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{inline_error, is_htmx, not_found_page, saved_lists};
use crate::backend::ApiError;
use crate::error::AppError;
use crate::filters;
use crate::models::session::{self, keys, push_toast};
use crate::state::AppState;
use crate::views::{Layout, ProductCard, cards};

/// Toggle form data.
#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub product_id: ProductId,
}

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist.html")]
pub struct WishlistTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCard>,
    /// Saved ids the backend no longer knows about.
    pub missing: usize,
}

/// Someone else's shared wishlist.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist_shared.html")]
pub struct SharedWishlistTemplate {
    pub layout: Layout,
    pub owner_name: Option<String>,
    pub products: Vec<ProductCard>,
}

/// Heart button fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/wishlist_button.html")]
pub struct WishlistButtonTemplate {
    pub product_id: ProductId,
    pub in_wishlist: bool,
}

/// Share link fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/share_link.html")]
pub struct ShareLinkTemplate {
    pub url: String,
}

/// Display the wishlist.
#[instrument(skip(state, session, layout))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
) -> impl IntoResponse {
    let (wishlist, compare) = saved_lists(&session).await;

    let products = if wishlist.is_empty() {
        Vec::new()
    } else {
        match state.backend().products_by_ids(wishlist.ids()).await {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load wishlist products");
                layout.toasts.push(Toast::error(e.user_message()));
                Vec::new()
            }
        }
    };

    WishlistTemplate {
        missing: wishlist.len().saturating_sub(products.len()),
        products: cards(&products, state.config().currency, &wishlist, &compare),
        layout,
    }
}

/// Add or remove a product.
#[instrument(skip(session, headers))]
pub async fn toggle(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ToggleForm>,
) -> Result<Response, AppError> {
    let mut wishlist: Wishlist = session::load(&session, keys::WISHLIST).await?;
    let in_wishlist = wishlist.toggle(form.product_id);
    session::save(&session, keys::WISHLIST, &wishlist).await?;

    if is_htmx(&headers) {
        Ok((
            AppendHeaders([("HX-Trigger", "wishlist-updated")]),
            WishlistButtonTemplate {
                product_id: form.product_id,
                in_wishlist,
            },
        )
            .into_response())
    } else {
        let message = if in_wishlist {
            "Saved to your wishlist."
        } else {
            "Removed from your wishlist."
        };
        push_toast(&session, Toast::success(message)).await;
        Ok(Redirect::to("/wishlist").into_response())
    }
}

/// Empty the wishlist.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Response, AppError> {
    let mut wishlist: Wishlist = session::load(&session, keys::WISHLIST).await?;
    wishlist.clear();
    session::save(&session, keys::WISHLIST, &wishlist).await?;
    push_toast(&session, Toast::info("Your wishlist is empty now.")).await;
    Ok(Redirect::to("/wishlist").into_response())
}

/// Create a share link for the current wishlist.
#[instrument(skip(state, session, headers))]
pub async fn share(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let htmx = is_htmx(&headers);
    let wishlist: Wishlist = session::load(&session, keys::WISHLIST).await?;
    if wishlist.is_empty() {
        let message = "Save something first, then share your wishlist.";
        return Ok(if htmx {
            inline_error(StatusCode::UNPROCESSABLE_ENTITY, message)
        } else {
            push_toast(&session, Toast::info(message)).await;
            Redirect::to("/wishlist").into_response()
        });
    }

    let share = match state.backend().share_wishlist(wishlist.ids()).await {
        Ok(share) => share,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to share wishlist");
            return Ok(if htmx {
                inline_error(StatusCode::BAD_GATEWAY, e.user_message())
            } else {
                push_toast(&session, Toast::error(e.user_message())).await;
                Redirect::to("/wishlist").into_response()
            });
        }
    };

    let Some(token) = ShareToken::parse(&share.token) else {
        tracing::error!("Backend returned an unusable share token");
        return Err(AppError::Internal("invalid share token".to_string()));
    };
    let url = share_url(&state.config().base_url, &token);

    if htmx {
        Ok(ShareLinkTemplate { url }.into_response())
    } else {
        push_toast(&session, Toast::success(format!("Share this link: {url}"))).await;
        Ok(Redirect::to("/wishlist").into_response())
    }
}

fn share_url(base_url: &str, token: &ShareToken) -> String {
    format!("{}/wishlist/shared/{token}", base_url.trim_end_matches('/'))
}

/// Display a shared wishlist.
#[instrument(skip(state, session, layout))]
pub async fn shared(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    Path(token): Path<String>,
) -> Response {
    let Some(token) = ShareToken::parse(&token) else {
        return not_found_page(layout);
    };

    let shared = match state.backend().shared_wishlist(&token).await {
        Ok(shared) => shared,
        Err(ApiError::NotFound(_)) => return not_found_page(layout),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load shared wishlist");
            layout.toasts.push(Toast::error(e.user_message()));
            return not_found_page(layout);
        }
    };

    let (wishlist, compare) = saved_lists(&session).await;
    SharedWishlistTemplate {
        layout,
        owner_name: shared.owner_name,
        products: cards(&shared.products, state.config().currency, &wishlist, &compare),
    }
    .into_response()
}

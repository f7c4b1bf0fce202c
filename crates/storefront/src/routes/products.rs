//! Product detail and review handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::catalog::{Color, Product};
use bazaar_core::cart::Toast;
use bazaar_core::review::{RatingSummary, Review, ReviewForm};
use bazaar_core::{CurrencyCode, ProductId, ValidationErrors};
use tower_sessions::Session;
use tracing::instrument;

use super::{is_htmx, not_found_page, saved_lists, session_expired};
use crate::backend::ApiError;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::session::push_toast;
use crate::state::AppState;
use crate::views::Layout;

/// A variant in the option picker.
#[derive(Debug, Clone)]
pub struct VariantOption {
    pub id: i64,
    pub label: String,
    pub price: String,
    pub stock: u32,
    pub available: bool,
    /// Preselected in the picker: the first variant in stock.
    pub selected: bool,
}

/// Product detail data for templates.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub images: Vec<String>,
    pub price: String,
    pub compare_at: Option<String>,
    pub discount_percent: Option<u8>,
    pub in_stock: bool,
    pub total_stock: u32,
    pub colors: Vec<Color>,
    pub sizes: Vec<String>,
    pub variants: Vec<VariantOption>,
}

impl ProductDetail {
    fn new(product: &Product, currency: CurrencyCode) -> Self {
        let mut variants: Vec<VariantOption> = product
            .variants
            .iter()
            .map(|v| VariantOption {
                id: v.id.as_i64(),
                label: v.label(),
                price: currency.format(product.variant_price(v)),
                stock: v.stock,
                available: v.is_available(),
                selected: false,
            })
            .collect();
        if let Some(first) = variants.iter_mut().find(|v| v.available) {
            first.selected = true;
        }
        Self {
            id: product.id,
            slug: product.slug.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.as_ref().map(|c| c.name.clone()),
            images: product.images.clone(),
            price: currency.format(product.effective_price()),
            compare_at: product.compare_at_price().map(|p| currency.format(p)),
            discount_percent: product.discount_percent(),
            in_stock: product.in_stock(),
            total_stock: product.total_stock(),
            colors: product.unique_colors(),
            sizes: product.unique_sizes(),
            variants,
        }
    }
}

/// A review with display strings.
#[derive(Debug, Clone)]
pub struct ReviewView {
    pub rating: u8,
    pub title: Option<String>,
    pub comment: String,
    pub author: String,
    pub date: Option<String>,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            rating: review.rating,
            title: review.title.clone(),
            comment: review.comment.clone(),
            author: review
                .customer_name
                .clone()
                .unwrap_or_else(|| "Verified buyer".to_string()),
            date: review.created_at.map(|d| d.format("%d/%m/%Y").to_string()),
        }
    }
}

/// One bar of the rating histogram.
#[derive(Debug, Clone)]
pub struct RatingBar {
    pub stars: u8,
    pub count: u32,
    pub percent: u32,
}

/// Rating summary for templates.
#[derive(Debug, Clone)]
pub struct RatingView {
    pub count: u32,
    pub average: Option<String>,
    pub average_value: f32,
    /// Five stars first.
    pub bars: Vec<RatingBar>,
}

impl From<&RatingSummary> for RatingView {
    fn from(summary: &RatingSummary) -> Self {
        Self {
            count: summary.count,
            average: summary.average.map(|a| format!("{a:.1}")),
            average_value: summary.average.unwrap_or(0.0),
            bars: (1..=5_u8)
                .rev()
                .map(|stars| RatingBar {
                    stars,
                    count: summary
                        .histogram
                        .get(usize::from(stars - 1))
                        .copied()
                        .unwrap_or(0),
                    percent: summary.percent(stars),
                })
                .collect(),
        }
    }
}

/// Review form state, re-rendered with errors after a failed submit.
#[derive(Debug, Clone, Default)]
pub struct ReviewFormView {
    pub rating: String,
    pub title: String,
    pub comment: String,
    pub rating_error: Option<String>,
    pub title_error: Option<String>,
    pub comment_error: Option<String>,
    pub form_error: Option<String>,
    pub submitted: bool,
}

impl ReviewFormView {
    fn with_errors(form: &ReviewForm, errors: &ValidationErrors) -> Self {
        Self {
            rating: form.rating.clone(),
            title: form.title.clone(),
            comment: form.comment.clone(),
            rating_error: errors.get("rating").map(String::from),
            title_error: errors.get("title").map(String::from),
            comment_error: errors.get("comment").map(String::from),
            ..Self::default()
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductDetail,
    pub reviews: Vec<ReviewView>,
    pub rating: RatingView,
    pub review_form: ReviewFormView,
    pub can_review: bool,
    pub in_wishlist: bool,
    pub in_compare: bool,
}

/// Review form fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/review_form.html")]
pub struct ReviewFormTemplate {
    pub slug: String,
    pub review_form: ReviewFormView,
    pub can_review: bool,
}

/// Display a product.
#[instrument(skip(state, session, layout, customer), fields(slug = %slug))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    OptionalAuth(customer): OptionalAuth,
    Path(slug): Path<String>,
) -> Response {
    let product = match state.backend().product_by_slug(&slug).await {
        Ok(product) => product,
        Err(ApiError::NotFound(_)) => return not_found_page(layout).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load product");
            layout.toasts.push(Toast::error(e.user_message()));
            return not_found_page(layout).into_response();
        }
    };

    let reviews = state.backend().reviews(product.id).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load reviews");
        Vec::new()
    });
    let (wishlist, compare) = saved_lists(&session).await;
    let summary = RatingSummary::from_reviews(&reviews);

    ProductShowTemplate {
        layout,
        product: ProductDetail::new(&product, state.config().currency),
        reviews: reviews.iter().map(ReviewView::from).collect(),
        rating: RatingView::from(&summary),
        review_form: ReviewFormView::default(),
        can_review: customer.is_some(),
        in_wishlist: wishlist.contains(product.id),
        in_compare: compare.contains(product.id),
    }
    .into_response()
}

/// Submit a review.
///
/// HTMX requests get the review form fragment back (with errors, or a thank
/// you); plain form posts are redirected to the product with a toast.
#[instrument(skip(state, session, customer, headers, form), fields(slug = %slug))]
pub async fn submit_review(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Response {
    let htmx = is_htmx(&headers);
    let product_url = format!("/products/{}", urlencoding::encode(&slug));

    let review = match form.validate() {
        Ok(review) => review,
        Err(errors) => {
            return if htmx {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ReviewFormTemplate {
                        slug,
                        review_form: ReviewFormView::with_errors(&form, &errors),
                        can_review: true,
                    },
                )
                    .into_response()
            } else {
                push_toast(&session, Toast::error(errors.to_string())).await;
                Redirect::to(&product_url).into_response()
            };
        }
    };

    let result = match state.backend().product_by_slug(&slug).await {
        Ok(product) => {
            state
                .backend()
                .submit_review(&customer.token, product.id, &review)
                .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => {
            crate::error::add_breadcrumb(
                "review",
                "Submitted review",
                Some(&[("slug", slug.as_str())]),
            );
            if htmx {
                ReviewFormTemplate {
                    slug,
                    review_form: ReviewFormView {
                        submitted: true,
                        ..ReviewFormView::default()
                    },
                    can_review: true,
                }
                .into_response()
            } else {
                push_toast(&session, Toast::success("Thanks for your review!")).await;
                Redirect::to(&product_url).into_response()
            }
        }
        Err(ApiError::Unauthorized) => session_expired(&session, &product_url, htmx).await,
        Err(e) => {
            tracing::warn!(error = %e, "Review rejected");
            if htmx {
                ReviewFormTemplate {
                    slug,
                    review_form: ReviewFormView {
                        rating: form.rating,
                        title: form.title,
                        comment: form.comment,
                        form_error: Some(e.user_message()),
                        ..ReviewFormView::default()
                    },
                    can_review: true,
                }
                .into_response()
            } else {
                push_toast(&session, Toast::error(e.user_message())).await;
                Redirect::to(&product_url).into_response()
            }
        }
    }
}

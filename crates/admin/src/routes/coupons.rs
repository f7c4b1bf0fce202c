//! Coupon management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::cart::Toast;
use bazaar_core::coupon::{Coupon, CouponForm};
use bazaar_core::{CouponId, CurrencyCode, ValidationErrors};
use chrono::{DateTime, Utc};
use tower_sessions::Session;
use tracing::instrument;

use super::{page_data, session_expired, write_failed};
use crate::backend::ApiError;
use crate::filters;
use crate::middleware::{RequireAdminAuth, RequireWriter};
use crate::models::CurrentAdmin;
use crate::models::session::push_toast;
use crate::state::AppState;
use crate::views::{Layout, datetime};

const COUPONS_PATH: &str = "/coupons";

/// One coupon in the table.
#[derive(Debug, Clone)]
pub struct CouponRow {
    pub id: i64,
    pub code: String,
    pub value: String,
    pub min_order: String,
    pub uses: String,
    pub expires: String,
    pub state: &'static str,
    pub usable: bool,
}

impl CouponRow {
    fn new(coupon: &Coupon, currency: CurrencyCode, now: DateTime<Utc>) -> Self {
        let usable = coupon.is_usable(now);
        let state = if usable {
            "Active"
        } else if !coupon.active {
            "Disabled"
        } else if coupon.expires_at.is_some_and(|at| now >= at) {
            "Expired"
        } else {
            "Used up"
        };
        Self {
            id: coupon.id.as_i64(),
            code: coupon.code.clone(),
            value: coupon.value_label(|amount| currency.format(amount)),
            min_order: coupon
                .min_order
                .map(|min| currency.format(min))
                .unwrap_or_default(),
            uses: match coupon.max_uses {
                Some(max) => format!("{} / {max}", coupon.used_count),
                None => coupon.used_count.to_string(),
            },
            expires: coupon.expires_at.map(datetime).unwrap_or_default(),
            state,
            usable,
        }
    }
}

/// New-coupon form values and errors.
#[derive(Debug, Clone, Default)]
pub struct CouponFormView {
    pub code: String,
    pub discount_type: String,
    pub value: String,
    pub min_order: String,
    pub max_uses: String,
    pub expires_on: String,
    pub code_error: Option<String>,
    pub discount_type_error: Option<String>,
    pub value_error: Option<String>,
    pub min_order_error: Option<String>,
    pub max_uses_error: Option<String>,
    pub expires_on_error: Option<String>,
    pub form_error: Option<String>,
}

impl CouponFormView {
    fn new(form: &CouponForm, errors: &ValidationErrors) -> Self {
        let error = |field: &str| errors.get(field).map(String::from);
        Self {
            code: form.code.clone(),
            discount_type: form.discount_type.clone(),
            value: form.value.clone(),
            min_order: form.min_order.clone(),
            max_uses: form.max_uses.clone(),
            expires_on: form.expires_on.clone(),
            code_error: error("code"),
            discount_type_error: error("discount_type"),
            value_error: error("value"),
            min_order_error: error("min_order"),
            max_uses_error: error("max_uses"),
            expires_on_error: error("expires_on"),
            form_error: None,
        }
    }

    /// Whether the fixed-amount option should be preselected.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.discount_type == "fixed"
    }
}

/// Coupons page template.
#[derive(Template, WebTemplate)]
#[template(path = "coupons.html")]
pub struct CouponsTemplate {
    pub layout: Layout,
    pub coupons: Vec<CouponRow>,
    pub form: CouponFormView,
    pub can_write: bool,
}

/// Load the coupon table. `Err` carries the response for an expired session.
async fn coupon_rows(
    state: &AppState,
    session: &Session,
    layout: &mut Layout,
    admin: &CurrentAdmin,
) -> Result<Vec<CouponRow>, Response> {
    let result = state.backend().coupons(&admin.token).await;
    let coupons = page_data(result, Vec::new(), session, layout).await?;
    let currency = state.config().currency;
    let now = Utc::now();
    Ok(coupons
        .iter()
        .map(|coupon| CouponRow::new(coupon, currency, now))
        .collect())
}

/// Display coupons.
#[instrument(skip(state, session, layout, admin))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Response {
    let coupons = match coupon_rows(&state, &session, &mut layout, &admin).await {
        Ok(coupons) => coupons,
        Err(response) => return response,
    };
    CouponsTemplate {
        layout,
        coupons,
        form: CouponFormView::default(),
        can_write: admin.can_write(),
    }
    .into_response()
}

/// Create a coupon.
#[instrument(skip(state, session, layout, admin, form))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    RequireWriter(admin): RequireWriter,
    Form(form): Form<CouponForm>,
) -> Response {
    let view = match form.validate() {
        Ok(coupon) => match state.backend().create_coupon(&admin.token, &coupon).await {
            Ok(created) => {
                tracing::info!(coupon = %created.code, admin_id = admin.id, "Coupon created");
                push_toast(&session, Toast::success(format!("Coupon {} created.", created.code)))
                    .await;
                return Redirect::to(COUPONS_PATH).into_response();
            }
            Err(ApiError::Unauthorized) => {
                return session_expired(&session, COUPONS_PATH, false).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Coupon rejected");
                CouponFormView {
                    form_error: Some(e.user_message()),
                    ..CouponFormView::new(&form, &ValidationErrors::new())
                }
            }
        },
        Err(errors) => CouponFormView::new(&form, &errors),
    };

    let coupons = match coupon_rows(&state, &session, &mut layout, &admin).await {
        Ok(coupons) => coupons,
        Err(response) => return response,
    };
    CouponsTemplate {
        layout,
        coupons,
        form: view,
        can_write: true,
    }
    .into_response()
}

/// Delete a coupon.
#[instrument(skip(state, session, admin))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i64>,
) -> Response {
    match state
        .backend()
        .delete_coupon(&admin.token, CouponId::new(id))
        .await
    {
        Ok(()) => {
            tracing::info!(coupon_id = id, admin_id = admin.id, "Coupon deleted");
            push_toast(&session, Toast::success("Coupon deleted.")).await;
            Redirect::to(COUPONS_PATH).into_response()
        }
        Err(e) => write_failed(&session, &e, COUPONS_PATH).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn coupon(extra: serde_json::Value) -> Coupon {
        let mut base = json!({
            "id": 4,
            "code": "TET25",
            "discountType": "percent",
            "value": "25",
            "usedCount": 3,
            "maxUses": 10
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 20, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_active_coupon_row() {
        let row = CouponRow::new(&coupon(json!({})), CurrencyCode::VND, now());
        assert_eq!(row.value, "25%");
        assert_eq!(row.uses, "3 / 10");
        assert_eq!(row.state, "Active");
        assert!(row.usable);
    }

    #[test]
    fn test_coupon_row_states() {
        let expired = coupon(json!({"expiresAt": "2025-01-01T00:00:00Z"}));
        assert_eq!(
            CouponRow::new(&expired, CurrencyCode::VND, now()).state,
            "Expired"
        );
        let used_up = coupon(json!({"usedCount": 10}));
        assert_eq!(
            CouponRow::new(&used_up, CurrencyCode::VND, now()).state,
            "Used up"
        );
        let disabled = coupon(json!({"active": false}));
        assert_eq!(
            CouponRow::new(&disabled, CurrencyCode::VND, now()).state,
            "Disabled"
        );
    }

    #[test]
    fn test_fixed_coupon_value_uses_currency() {
        let fixed = coupon(json!({
            "discountType": "fixed",
            "value": "50000",
            "minOrder": "300000"
        }));
        let row = CouponRow::new(&fixed, CurrencyCode::VND, now());
        assert_eq!(row.value, "50.000₫");
        assert_eq!(row.min_order, "300.000₫");
    }

    #[test]
    fn test_form_view_keeps_input_and_errors() {
        let form = CouponForm {
            code: "bad code!".to_string(),
            discount_type: "fixed".to_string(),
            value: "abc".to_string(),
            ..CouponForm::default()
        };
        let errors = form.validate().unwrap_err();
        let view = CouponFormView::new(&form, &errors);
        assert_eq!(view.code, "bad code!");
        assert!(view.is_fixed());
        assert!(view.code_error.is_some());
        assert!(view.value_error.is_some());
        assert!(view.max_uses_error.is_none());
    }
}

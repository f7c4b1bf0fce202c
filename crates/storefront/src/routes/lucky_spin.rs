//! Lucky spin wheel.
//!
//! The backend picks the prize; the storefront only works out how far the
//! wheel has to turn so the winning segment stops under the pointer. The
//! wheel's absolute rotation is kept in the session so every spin keeps
//! turning forward from where the last one stopped.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bazaar_core::cart::Toast;
use bazaar_core::lucky_spin::{
    PrizeType, SpinSegment, WheelState, conic_gradient_stops, label_angle, target_rotation,
};
use tower_sessions::Session;
use tracing::instrument;

use super::{inline_error, session_expired};
use crate::backend::ApiError;
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::session::keys;
use crate::state::AppState;
use crate::views::Layout;

/// Complete turns before the wheel settles.
const FULL_TURNS: u32 = 5;

/// A segment label positioned on the wheel.
#[derive(Debug, Clone)]
pub struct WheelLabel {
    pub text: String,
    /// Degrees clockwise from the pointer to the segment centre.
    pub angle: String,
}

/// Wheel data for templates. Geometry travels in data attributes and is
/// applied by `bazaar.js`.
#[derive(Debug, Clone)]
pub struct WheelView {
    pub enabled: bool,
    pub gradient: String,
    pub labels: Vec<WheelLabel>,
    pub rotation: String,
    pub spins_remaining: Option<u32>,
}

impl WheelView {
    fn new(state: &WheelState, rotation: f64) -> Self {
        let n = state.segments.len();
        Self {
            enabled: state.enabled && n >= 2,
            gradient: conic_gradient_stops(&state.segments),
            labels: state
                .segments
                .iter()
                .enumerate()
                .map(|(i, s)| WheelLabel {
                    text: s.label.clone(),
                    angle: format!("{:.2}", label_angle(i, n)),
                })
                .collect(),
            rotation: format!("{rotation:.2}"),
            spins_remaining: state.spins_remaining,
        }
    }

    /// Whether the spin button should be enabled for a signed-in customer.
    #[must_use]
    pub fn can_spin(&self) -> bool {
        self.enabled && self.spins_remaining.is_none_or(|left| left > 0)
    }
}

/// Wheel page template.
#[derive(Template, WebTemplate)]
#[template(path = "lucky_spin.html")]
pub struct LuckySpinTemplate {
    pub layout: Layout,
    pub wheel: WheelView,
    pub signed_in: bool,
}

/// Spin result fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/spin_result.html")]
pub struct SpinResultTemplate {
    /// Absolute rotation the wheel animates to.
    pub rotation: String,
    pub prize: String,
    pub won: bool,
    pub coupon_code: Option<String>,
    pub message: Option<String>,
    pub spins_remaining: u32,
}

async fn current_rotation(session: &Session) -> f64 {
    session
        .get::<f64>(keys::WHEEL_ROTATION)
        .await
        .ok()
        .flatten()
        .filter(|r| r.is_finite())
        .unwrap_or(0.0)
}

/// Display the wheel.
#[instrument(skip(state, session, layout, customer))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    OptionalAuth(customer): OptionalAuth,
) -> impl IntoResponse {
    let token = customer.as_ref().map(|c| c.token.as_str());
    let wheel = match state.backend().lucky_spin(token).await {
        Ok(wheel) => wheel,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load wheel");
            layout.toasts.push(Toast::error(e.user_message()));
            WheelState {
                enabled: false,
                segments: Vec::new(),
                spins_remaining: None,
            }
        }
    };

    LuckySpinTemplate {
        layout,
        wheel: WheelView::new(&wheel, current_rotation(&session).await),
        signed_in: customer.is_some(),
    }
}

/// Spin the wheel.
#[instrument(skip(state, session, customer, headers))]
pub async fn spin(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    headers: HeaderMap,
) -> Response {
    let htmx = super::is_htmx(&headers);
    let backend = state.backend();

    let wheel = match backend.lucky_spin(Some(&customer.token)).await {
        Ok(wheel) => wheel,
        Err(ApiError::Unauthorized) => return session_expired(&session, "/lucky-spin", htmx).await,
        Err(e) => return inline_error(StatusCode::BAD_GATEWAY, e.user_message()),
    };
    if !WheelView::new(&wheel, 0.0).can_spin() {
        return inline_error(
            StatusCode::CONFLICT,
            "No spins left. Come back tomorrow for another try.",
        );
    }

    let result = match backend.spin(&customer.token).await {
        Ok(result) => result,
        Err(ApiError::Unauthorized) => return session_expired(&session, "/lucky-spin", htmx).await,
        Err(e) => {
            tracing::warn!(error = %e, "Spin rejected");
            return inline_error(StatusCode::CONFLICT, e.user_message());
        }
    };

    let Some(segment) = wheel.segments.get(result.segment_index) else {
        tracing::error!(index = result.segment_index, "Spin landed outside the wheel");
        return inline_error(StatusCode::BAD_GATEWAY, "Something went wrong. Please try again.");
    };

    let rotation = target_rotation(
        result.segment_index,
        wheel.segments.len(),
        current_rotation(&session).await,
        FULL_TURNS,
    );
    if let Err(e) = session.insert(keys::WHEEL_ROTATION, rotation).await {
        tracing::warn!(error = %e, "Failed to store wheel rotation");
    }

    let index = result.segment_index.to_string();
    add_breadcrumb("lucky_spin", "Wheel spun", Some(&[("segment", index.as_str())]));

    SpinResultTemplate {
        rotation: format!("{rotation:.2}"),
        prize: segment.label.clone(),
        won: is_prize(segment),
        coupon_code: result.coupon_code,
        message: result.message,
        spins_remaining: result.spins_remaining,
    }
    .into_response()
}

fn is_prize(segment: &SpinSegment) -> bool {
    segment.prize_type != PrizeType::None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn wheel(spins_remaining: Option<u32>) -> WheelState {
        serde_json::from_value(serde_json::json!({
            "enabled": true,
            "spins_remaining": spins_remaining,
            "segments": [
                {"label": "10% off", "prize_type": "percent", "probability": 25.0},
                {"label": "Try again", "prize_type": "none", "probability": 75.0},
                {"label": "Free ship", "prize_type": "free_shipping", "probability": 0.0},
                {"label": "50k off", "prize_type": "fixed", "probability": 0.0}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_labels_sit_at_segment_centres() {
        let view = WheelView::new(&wheel(Some(1)), 720.0);
        assert_eq!(view.labels[0].angle, "45.00");
        assert_eq!(view.labels[3].angle, "315.00");
        assert_eq!(view.rotation, "720.00");
        assert!(view.can_spin());
    }

    #[test]
    fn test_cannot_spin_without_spins() {
        assert!(!WheelView::new(&wheel(Some(0)), 0.0).can_spin());
        assert!(WheelView::new(&wheel(None), 0.0).can_spin());

        let mut disabled = wheel(Some(3));
        disabled.enabled = false;
        assert!(!WheelView::new(&disabled, 0.0).can_spin());
    }

    #[test]
    fn test_no_prize_segment() {
        let w = wheel(None);
        assert!(is_prize(&w.segments[0]));
        assert!(!is_prize(&w.segments[1]));
    }
}

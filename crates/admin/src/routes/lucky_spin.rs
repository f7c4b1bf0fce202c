//! Lucky spin wheel editor.
//!
//! The editor posts one set of fields per segment row. Rows are rebuilt by
//! the order their fields arrive in; a row with neither label nor
//! probability is ignored, so the spare blank row can stay empty.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::SpinSegmentId;
use bazaar_core::cart::Toast;
use bazaar_core::lucky_spin::{
    LuckySpinConfig, MAX_SEGMENTS, PrizeType, SpinSegment, conic_gradient_stops, label_angle,
    validate_segments,
};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;

use super::{page_data, sentence, session_expired};
use crate::backend::ApiError;
use crate::filters;
use crate::middleware::{RequireAdminAuth, RequireSuperAdmin};
use crate::models::session::push_toast;
use crate::state::AppState;
use crate::views::Layout;

const LUCKY_SPIN_PATH: &str = "/lucky-spin";

/// One segment row as typed into the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentInput {
    pub id: String,
    pub label: String,
    pub prize_type: String,
    pub prize_value: String,
    pub probability: String,
    pub color: String,
}

impl SegmentInput {
    fn is_blank(&self) -> bool {
        self.label.trim().is_empty() && self.probability.trim().is_empty()
    }

    fn from_segment(segment: &SpinSegment) -> Self {
        Self {
            id: segment.id.map(|id| id.to_string()).unwrap_or_default(),
            label: segment.label.clone(),
            prize_type: segment.prize_type.as_str().to_string(),
            prize_value: segment
                .prize_value
                .map(|v| v.normalize().to_string())
                .unwrap_or_default(),
            probability: segment.probability.to_string(),
            color: segment.color.clone().unwrap_or_default(),
        }
    }

    /// Parse the row. `row` is 1-based for messages.
    fn to_segment(&self, row: usize) -> Result<SpinSegment, String> {
        let probability = self
            .probability
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Row {row}: probability must be a number."))?;
        let prize_type = PrizeType::parse_lenient(self.prize_type.trim());
        let prize_value = match (prize_type, self.prize_value.trim()) {
            (PrizeType::FreeShipping | PrizeType::None, _) | (_, "") => None,
            (_, raw) => Some(
                Decimal::from_str(raw)
                    .ok()
                    .filter(|v| *v > Decimal::ZERO)
                    .ok_or_else(|| format!("Row {row}: prize value must be a positive number."))?,
            ),
        };
        let color = self.color.trim();
        Ok(SpinSegment {
            id: self.id.trim().parse::<i64>().ok().map(SpinSegmentId::new),
            label: self.label.trim().to_string(),
            prize_type,
            prize_value,
            probability,
            color: (!color.is_empty()).then(|| color.to_string()),
        })
    }
}

/// The whole editor submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WheelForm {
    pub enabled: bool,
    pub spins_per_day: String,
    pub rows: Vec<SegmentInput>,
}

impl WheelForm {
    /// Rebuild rows from repeated form keys: the n-th `label` belongs to the
    /// n-th row, and so on for every row field.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::default();
        let mut seen = [0usize; 6];
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "enabled" => {
                    form.enabled = true;
                    continue;
                }
                "spins_per_day" => {
                    form.spins_per_day = value;
                    continue;
                }
                "segment_id" => 0,
                "label" => 1,
                "prize_type" => 2,
                "prize_value" => 3,
                "probability" => 4,
                "color" => 5,
                _ => continue,
            };
            let Some(count) = seen.get_mut(slot) else {
                continue;
            };
            let index = *count;
            *count += 1;
            if form.rows.len() <= index {
                form.rows.resize_with(index + 1, SegmentInput::default);
            }
            let Some(row) = form.rows.get_mut(index) else {
                continue;
            };
            match slot {
                0 => row.id = value,
                1 => row.label = value,
                2 => row.prize_type = value,
                3 => row.prize_value = value,
                4 => row.probability = value,
                _ => row.color = value,
            }
        }
        form.rows.retain(|row| !row.is_blank());
        form
    }

    fn from_config(config: &LuckySpinConfig) -> Self {
        Self {
            enabled: config.enabled,
            spins_per_day: config.spins_per_day.to_string(),
            rows: config.segments.iter().map(SegmentInput::from_segment).collect(),
        }
    }

    /// Parse and validate into a configuration for the backend.
    ///
    /// # Errors
    ///
    /// Returns a message for the first problem found.
    pub fn to_config(&self) -> Result<LuckySpinConfig, String> {
        let spins_per_day = self
            .spins_per_day
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| "Spins per day must be a whole number above zero.".to_string())?;
        let segments = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| row.to_segment(i + 1))
            .collect::<Result<Vec<_>, _>>()?;
        validate_segments(&segments).map_err(sentence)?;
        Ok(LuckySpinConfig {
            enabled: self.enabled,
            spins_per_day,
            segments,
        })
    }
}

/// A prize type option for one row.
#[derive(Debug, Clone)]
pub struct PrizeOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// One editable row.
#[derive(Debug, Clone)]
pub struct SegmentRowView {
    pub number: usize,
    pub input: SegmentInput,
    pub prizes: Vec<PrizeOption>,
}

impl SegmentRowView {
    fn new(number: usize, input: SegmentInput) -> Self {
        let current = PrizeType::parse_lenient(&input.prize_type);
        Self {
            number,
            prizes: PrizeType::ALL
                .into_iter()
                .map(|p| PrizeOption {
                    value: p.as_str(),
                    label: p.label(),
                    selected: p == current,
                })
                .collect(),
            input,
        }
    }
}

/// A label on the preview wheel.
#[derive(Debug, Clone)]
pub struct WheelLabel {
    pub text: String,
    pub angle: String,
}

/// Preview of a wheel, painted by `admin.js` from data attributes.
#[derive(Debug, Clone, Default)]
pub struct WheelPreview {
    pub gradient: String,
    pub labels: Vec<WheelLabel>,
    pub probability_total: String,
}

impl WheelPreview {
    fn new(segments: &[SpinSegment]) -> Self {
        let n = segments.len();
        Self {
            gradient: conic_gradient_stops(segments),
            labels: segments
                .iter()
                .enumerate()
                .map(|(i, s)| WheelLabel {
                    text: s.label.clone(),
                    angle: format!("{:.2}", label_angle(i, n)),
                })
                .collect(),
            probability_total: format!(
                "{:.2}",
                segments.iter().map(|s| s.probability).sum::<f64>()
            ),
        }
    }

    /// Preview of whatever rows parse; rows with errors are left out.
    fn from_form(form: &WheelForm) -> Self {
        let segments: Vec<SpinSegment> = form
            .rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.to_segment(i + 1).ok())
            .collect();
        Self::new(&segments)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Wheel editor template.
#[derive(Template, WebTemplate)]
#[template(path = "lucky_spin.html")]
pub struct LuckySpinTemplate {
    pub layout: Layout,
    pub enabled: bool,
    pub spins_per_day: String,
    pub rows: Vec<SegmentRowView>,
    pub preview: WheelPreview,
    pub error: Option<String>,
    pub can_edit: bool,
    pub max_segments: usize,
}

impl LuckySpinTemplate {
    fn new(layout: Layout, form: WheelForm, error: Option<String>, can_edit: bool) -> Self {
        let preview = WheelPreview::from_form(&form);
        let mut rows: Vec<SegmentRowView> = form
            .rows
            .into_iter()
            .enumerate()
            .map(|(i, input)| SegmentRowView::new(i + 1, input))
            .collect();
        if can_edit && rows.len() < MAX_SEGMENTS {
            rows.push(SegmentRowView::new(rows.len() + 1, SegmentInput::default()));
        }
        Self {
            layout,
            enabled: form.enabled,
            spins_per_day: form.spins_per_day,
            rows,
            preview,
            error,
            can_edit,
            max_segments: MAX_SEGMENTS,
        }
    }
}

/// Display the wheel editor.
#[instrument(skip(state, session, layout, admin))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Response {
    let empty = LuckySpinConfig {
        enabled: false,
        spins_per_day: 1,
        segments: Vec::new(),
    };
    let result = state.backend().lucky_spin_config(&admin.token).await;
    let config = match page_data(result, empty, &session, &mut layout).await {
        Ok(config) => config,
        Err(response) => return response,
    };

    LuckySpinTemplate::new(
        layout,
        WheelForm::from_config(&config),
        None,
        admin.can_configure_promotions(),
    )
    .into_response()
}

/// Save the wheel.
#[instrument(skip(state, session, layout, admin, pairs))]
pub async fn save(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let form = WheelForm::from_pairs(pairs);
    let config = match form.to_config() {
        Ok(config) => config,
        Err(message) => {
            return LuckySpinTemplate::new(layout, form, Some(message), true).into_response();
        }
    };

    match state
        .backend()
        .save_lucky_spin_config(&admin.token, &config)
        .await
    {
        Ok(saved) => {
            tracing::info!(
                segments = saved.segments.len(),
                enabled = saved.enabled,
                admin_id = admin.id,
                "Lucky spin configuration saved"
            );
            push_toast(&session, Toast::success("Lucky spin wheel saved.")).await;
            Redirect::to(LUCKY_SPIN_PATH).into_response()
        }
        Err(ApiError::Unauthorized) => session_expired(&session, LUCKY_SPIN_PATH, false).await,
        Err(e) => {
            tracing::warn!(error = %e, "Lucky spin configuration rejected");
            LuckySpinTemplate::new(layout, form, Some(e.user_message()), true).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    fn row(label: &str, prize: &str, value: &str, probability: &str) -> Vec<(String, String)> {
        vec![
            pair("segment_id", ""),
            pair("label", label),
            pair("prize_type", prize),
            pair("prize_value", value),
            pair("probability", probability),
            pair("color", ""),
        ]
    }

    fn submission(rows: &[Vec<(String, String)>]) -> Vec<(String, String)> {
        let mut pairs = vec![pair("enabled", "on"), pair("spins_per_day", "2")];
        for r in rows {
            pairs.extend(r.iter().cloned());
        }
        pairs
    }

    #[test]
    fn test_rows_rebuilt_in_order_and_blank_row_dropped() {
        let form = WheelForm::from_pairs(submission(&[
            row("10% off", "percent", "10", "30"),
            row("Try again", "none", "", "70"),
            row("", "none", "", ""),
        ]));
        assert!(form.enabled);
        assert_eq!(form.spins_per_day, "2");
        assert_eq!(form.rows.len(), 2);
        assert_eq!(form.rows[0].label, "10% off");
        assert_eq!(form.rows[1].probability, "70");
    }

    #[test]
    fn test_missing_checkbox_means_disabled() {
        let form = WheelForm::from_pairs(vec![pair("spins_per_day", "1")]);
        assert!(!form.enabled);
        assert!(form.rows.is_empty());
    }

    #[test]
    fn test_valid_form_becomes_config() {
        let form = WheelForm::from_pairs(submission(&[
            row("10% off", "percent", "10", "30"),
            row("Free ship", "free_shipping", "99", "20"),
            row("Try again", "none", "", "50"),
        ]));
        let config = form.to_config().unwrap();
        assert_eq!(config.spins_per_day, 2);
        assert_eq!(config.segments.len(), 3);
        assert_eq!(config.segments[0].prize_value, Some(Decimal::new(10, 0)));
        // Free shipping carries no value even if one was typed
        assert_eq!(config.segments[1].prize_value, None);
        assert_eq!(config.segments[1].prize_type, PrizeType::FreeShipping);
    }

    #[test]
    fn test_probability_sum_is_checked() {
        let form = WheelForm::from_pairs(submission(&[
            row("A", "percent", "5", "30"),
            row("B", "none", "", "30"),
        ]));
        let error = form.to_config().unwrap_err();
        assert!(error.starts_with("Probabilities must add up to 100"), "{error}");
    }

    #[test]
    fn test_bad_numbers_name_the_row() {
        let form = WheelForm::from_pairs(submission(&[
            row("A", "percent", "5", "50"),
            row("B", "fixed", "-3", "50"),
        ]));
        assert_eq!(
            form.to_config().unwrap_err(),
            "Row 2: prize value must be a positive number."
        );

        let form = WheelForm::from_pairs(submission(&[row("A", "percent", "5", "lots")]));
        assert_eq!(
            form.to_config().unwrap_err(),
            "Row 1: probability must be a number."
        );
    }

    #[test]
    fn test_too_few_segments() {
        let form = WheelForm::from_pairs(submission(&[row("Only", "none", "", "100")]));
        assert!(form.to_config().unwrap_err().contains("at least 2"));
    }

    #[test]
    fn test_editor_adds_spare_row_for_editors_only() {
        let form = WheelForm::from_pairs(submission(&[
            row("A", "percent", "5", "50"),
            row("B", "none", "", "50"),
        ]));
        let editable = LuckySpinTemplate::new(Layout::default(), form.clone(), None, true);
        assert_eq!(editable.rows.len(), 3);
        assert_eq!(editable.preview.labels.len(), 2);
        assert_eq!(editable.preview.probability_total, "100.00");

        let read_only = LuckySpinTemplate::new(Layout::default(), form, None, false);
        assert_eq!(read_only.rows.len(), 2);
    }
}

//! Lucky-spin wheel: configuration payloads and wheel geometry.
//!
//! Geometry conventions: angles are degrees, the pointer sits at the top, the
//! wheel rotates clockwise, and segment 0 starts at the pointer and extends
//! clockwise at rotation 0.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SpinSegmentId;

/// Fewest segments a wheel may have.
pub const MIN_SEGMENTS: usize = 2;
/// Most segments a wheel may have.
pub const MAX_SEGMENTS: usize = 12;
/// Allowed distance of the probability sum from 100.
pub const PROBABILITY_TOLERANCE: f64 = 0.01;

/// Palette used when a segment has no color of its own.
const DEFAULT_COLORS: [&str; 6] = [
    "#f97316", "#facc15", "#22c55e", "#06b6d4", "#6366f1", "#ec4899",
];

/// What a segment awards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeType {
    /// Percentage off the next order.
    Percent,
    /// Fixed amount off the next order.
    Fixed,
    FreeShipping,
    /// No prize.
    #[default]
    None,
}

impl PrizeType {
    pub const ALL: [Self; 4] = [Self::Percent, Self::Fixed, Self::FreeShipping, Self::None];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Fixed => "fixed",
            Self::FreeShipping => "free_shipping",
            Self::None => "none",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Percent => "Percent off",
            Self::Fixed => "Amount off",
            Self::FreeShipping => "Free shipping",
            Self::None => "No prize",
        }
    }

    /// Parse a form value; unknown values mean no prize.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .unwrap_or_default()
    }
}

/// One slice of the wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinSegment {
    #[serde(default)]
    pub id: Option<SpinSegmentId>,
    pub label: String,
    #[serde(default)]
    pub prize_type: PrizeType,
    #[serde(default)]
    pub prize_value: Option<Decimal>,
    /// Percentage weight. Weights across the wheel sum to 100.
    pub probability: f64,
    #[serde(default)]
    pub color: Option<String>,
}

/// Wheel configuration as edited in the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuckySpinConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_spins_per_day")]
    pub spins_per_day: u32,
    #[serde(default)]
    pub segments: Vec<SpinSegment>,
}

const fn default_spins_per_day() -> u32 {
    1
}

/// Wheel as shown to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelState {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub segments: Vec<SpinSegment>,
    /// Spins the customer has left today; `None` for guests.
    #[serde(default)]
    pub spins_remaining: Option<u32>,
}

/// Outcome of a spin, decided by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinResult {
    pub segment_index: usize,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub spins_remaining: u32,
}

/// Reasons a wheel configuration is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpinConfigError {
    #[error("a wheel needs at least {min} segments")]
    TooFewSegments { min: usize },
    #[error("a wheel can have at most {max} segments")]
    TooManySegments { max: usize },
    #[error("segment {index} has an invalid probability")]
    InvalidProbability { index: usize },
    #[error("segment {index} needs a label")]
    MissingLabel { index: usize },
    #[error("probabilities must add up to 100 (currently {sum:.2})")]
    ProbabilitySum { sum: f64 },
}

/// Check a wheel configuration before sending it to the backend.
///
/// # Errors
///
/// Returns the first problem found: segment count outside
/// [`MIN_SEGMENTS`]..=[`MAX_SEGMENTS`], a blank label, a negative or
/// non-finite probability, or a probability sum further than
/// [`PROBABILITY_TOLERANCE`] from 100.
pub fn validate_segments(segments: &[SpinSegment]) -> Result<(), SpinConfigError> {
    if segments.len() < MIN_SEGMENTS {
        return Err(SpinConfigError::TooFewSegments { min: MIN_SEGMENTS });
    }
    if segments.len() > MAX_SEGMENTS {
        return Err(SpinConfigError::TooManySegments { max: MAX_SEGMENTS });
    }
    for (index, segment) in segments.iter().enumerate() {
        if segment.label.trim().is_empty() {
            return Err(SpinConfigError::MissingLabel { index });
        }
        if !segment.probability.is_finite() || segment.probability < 0.0 {
            return Err(SpinConfigError::InvalidProbability { index });
        }
    }
    let sum: f64 = segments.iter().map(|s| s.probability).sum();
    if (sum - 100.0).abs() > PROBABILITY_TOLERANCE {
        return Err(SpinConfigError::ProbabilitySum { sum });
    }
    Ok(())
}

/// Map a uniform roll in `[0, 1)` to a segment index through the cumulative
/// probability distribution.
///
/// Zero-weight segments are never picked. Rolls outside the range are
/// clamped. Returns `None` when no segment has positive weight.
#[must_use]
pub fn pick_index(segments: &[SpinSegment], roll: f64) -> Option<usize> {
    let weight = |s: &SpinSegment| {
        if s.probability.is_finite() && s.probability > 0.0 {
            s.probability
        } else {
            0.0
        }
    };
    let total: f64 = segments.iter().map(weight).sum();
    if total <= 0.0 {
        return None;
    }

    let roll = if roll.is_finite() { roll.clamp(0.0, 1.0) } else { 0.0 };
    let target = roll * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (index, segment) in segments.iter().enumerate() {
        let w = weight(segment);
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(index);
        if target < cumulative {
            return Some(index);
        }
    }
    // roll == 1.0 or rounding at the top end
    last_positive
}

/// Degrees covered by each of `n` segments.
#[must_use]
pub fn segment_angle(n: usize) -> f64 {
    if n == 0 { 360.0 } else { 360.0 / n as f64 }
}

/// Wheel angle of the centre of segment `index`.
#[must_use]
pub fn label_angle(index: usize, n: usize) -> f64 {
    let angle = segment_angle(n);
    (index as f64).mul_add(angle, angle / 2.0)
}

/// Absolute rotation that parks segment `index` under the pointer.
///
/// The result is at least `full_turns` complete turns past
/// `current_rotation` and always strictly greater than it, so the wheel
/// keeps spinning forward from wherever the previous spin left it.
#[must_use]
pub fn target_rotation(index: usize, n: usize, current_rotation: f64, full_turns: u32) -> f64 {
    let centre = label_angle(index, n);
    let landing = (360.0 - centre).rem_euclid(360.0);
    let base = f64::from(full_turns).mul_add(360.0, current_rotation);
    let mut rotation = base - base.rem_euclid(360.0) + landing;
    if rotation <= base {
        rotation += 360.0;
    }
    rotation
}

/// Which segment sits under the pointer at an absolute rotation.
#[must_use]
pub fn segment_at_rotation(rotation: f64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let under_pointer = (-rotation).rem_euclid(360.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = (under_pointer / segment_angle(n)).floor() as usize;
    index.min(n - 1)
}

/// CSS `conic-gradient` stops that paint the wheel, one colour per segment.
#[must_use]
pub fn conic_gradient_stops(segments: &[SpinSegment]) -> String {
    let angle = segment_angle(segments.len());
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let color = segment
                .color
                .as_deref()
                .filter(|c| is_css_color(c))
                .unwrap_or(DEFAULT_COLORS[i % DEFAULT_COLORS.len()]);
            let start = i as f64 * angle;
            format!("{color} {start:.2}deg {:.2}deg", start + angle)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Accept only `#rgb`/`#rrggbb` so admin input cannot break out of a style
/// attribute.
fn is_css_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn segment(label: &str, probability: f64) -> SpinSegment {
        SpinSegment {
            id: None,
            label: label.to_string(),
            prize_type: PrizeType::Percent,
            prize_value: None,
            probability,
            color: None,
        }
    }

    fn wheel(weights: &[f64]) -> Vec<SpinSegment> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| segment(&format!("S{i}"), *w))
            .collect()
    }

    #[test]
    fn test_validate_accepts_sum_of_100() {
        assert!(validate_segments(&wheel(&[50.0, 30.0, 20.0])).is_ok());
        assert!(validate_segments(&wheel(&[33.33, 33.33, 33.34])).is_ok());
    }

    #[test]
    fn test_validate_rejections() {
        assert_eq!(
            validate_segments(&wheel(&[100.0])),
            Err(SpinConfigError::TooFewSegments { min: 2 })
        );
        assert_eq!(
            validate_segments(&wheel(&[100.0 / 13.0; 13])),
            Err(SpinConfigError::TooManySegments { max: 12 })
        );
        assert_eq!(
            validate_segments(&wheel(&[110.0, -10.0])),
            Err(SpinConfigError::InvalidProbability { index: 1 })
        );
        assert!(matches!(
            validate_segments(&wheel(&[50.0, 40.0])),
            Err(SpinConfigError::ProbabilitySum { .. })
        ));
        let mut blank = wheel(&[50.0, 50.0]);
        blank[0].label = "  ".into();
        assert_eq!(
            validate_segments(&blank),
            Err(SpinConfigError::MissingLabel { index: 0 })
        );
    }

    #[test]
    fn test_pick_index_follows_cumulative_weights() {
        let segments = wheel(&[10.0, 0.0, 60.0, 30.0]);
        assert_eq!(pick_index(&segments, 0.0), Some(0));
        assert_eq!(pick_index(&segments, 0.099), Some(0));
        assert_eq!(pick_index(&segments, 0.105), Some(2));
        assert_eq!(pick_index(&segments, 0.695), Some(2));
        assert_eq!(pick_index(&segments, 0.705), Some(3));
        assert_eq!(pick_index(&segments, 1.0), Some(3));
        assert_eq!(pick_index(&segments, 7.5), Some(3));
        assert_eq!(pick_index(&segments, -1.0), Some(0));
    }

    #[test]
    fn test_pick_index_never_picks_zero_weight() {
        let segments = wheel(&[0.0, 100.0, 0.0]);
        for step in 0..100 {
            assert_eq!(pick_index(&segments, f64::from(step) / 100.0), Some(1));
        }
        assert_eq!(pick_index(&wheel(&[0.0, 0.0]), 0.5), None);
    }

    #[test]
    fn test_target_rotation_lands_on_requested_segment() {
        for n in MIN_SEGMENTS..=MAX_SEGMENTS {
            for index in 0..n {
                for current in [0.0, 17.5, 359.9, 1440.0, 2165.25] {
                    let rotation = target_rotation(index, n, current, 5);
                    assert_eq!(
                        segment_at_rotation(rotation, n),
                        index,
                        "n={n} index={index} current={current}"
                    );
                    assert!(rotation >= current + 5.0 * 360.0);
                    assert!(rotation < current + 7.0 * 360.0);
                }
            }
        }
    }

    #[test]
    fn test_target_rotation_is_strictly_forward_without_turns() {
        let rotation = target_rotation(0, 4, 315.0, 0);
        // Segment 0 centre (45deg) lands at rotation 315 mod 360, so it must go a full turn
        assert!((rotation - 675.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_at_rotation_basics() {
        assert_eq!(segment_at_rotation(0.0, 4), 0);
        // Rotating clockwise by 10deg brings the last segment under the pointer
        assert_eq!(segment_at_rotation(10.0, 4), 3);
        assert_eq!(segment_at_rotation(-100.0, 4), 1);
    }

    #[test]
    fn test_conic_gradient_stops() {
        let mut segments = wheel(&[50.0, 50.0]);
        segments[0].color = Some("#fff".into());
        segments[1].color = Some("red;background:url(x)".into());
        assert_eq!(
            conic_gradient_stops(&segments),
            "#fff 0.00deg 180.00deg, #facc15 180.00deg 360.00deg"
        );
    }

    #[test]
    fn test_spin_result_deserialize() {
        let result: SpinResult = serde_json::from_value(serde_json::json!({
            "segment_index": 2,
            "coupon_code": "SPIN-AB12",
            "spins_remaining": 0
        }))
        .unwrap();
        assert_eq!(result.segment_index, 2);
        assert_eq!(result.coupon_code.as_deref(), Some("SPIN-AB12"));
    }
}

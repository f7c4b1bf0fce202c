//! Discount coupons.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::CouponId;
use crate::validation::ValidationErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[default]
    Percent,
    Fixed,
}

impl DiscountType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Fixed => "fixed",
        }
    }
}

/// A coupon as listed in the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    #[serde(alias = "discountType")]
    pub discount_type: DiscountType,
    pub value: Decimal,
    #[serde(default, alias = "minOrder")]
    pub min_order: Option<Decimal>,
    #[serde(default, alias = "maxUses")]
    pub max_uses: Option<u32>,
    #[serde(default, alias = "usedCount")]
    pub used_count: u32,
    #[serde(default, alias = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub active: bool,
}

const fn default_true() -> bool {
    true
}

impl Coupon {
    /// Discount this coupon gives on `subtotal`, never more than the
    /// subtotal. Zero below the minimum order.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        if self.min_order.is_some_and(|min| subtotal < min) {
            return Decimal::ZERO;
        }
        let discount = match self.discount_type {
            DiscountType::Percent => subtotal * self.value / Decimal::ONE_HUNDRED,
            DiscountType::Fixed => self.value,
        };
        discount.max(Decimal::ZERO).min(subtotal).round_dp(0)
    }

    /// Whether the coupon can still be redeemed at `now`.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.expires_at.is_none_or(|at| now < at)
            && self.max_uses.is_none_or(|max| self.used_count < max)
    }

    /// Short description such as `10%` or a formatted amount.
    #[must_use]
    pub fn value_label(&self, format_amount: impl Fn(Decimal) -> String) -> String {
        match self.discount_type {
            DiscountType::Percent => format!("{}%", self.value.normalize()),
            DiscountType::Fixed => format_amount(self.value),
        }
    }
}

/// Response of `POST /api/coupons/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CouponCheck {
    pub valid: bool,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub message: Option<String>,
}

/// Admin form for a new coupon.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub discount_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub min_order: String,
    #[serde(default)]
    pub max_uses: String,
    /// `YYYY-MM-DD`; the coupon expires at the end of that day (UTC).
    #[serde(default)]
    pub expires_on: String,
}

/// Body of `POST /api/admin/coupons`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_uses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CouponForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<NewCoupon, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let code = self.code.trim().to_ascii_uppercase();
        let code_ok = !code.is_empty()
            && code.len() <= 32
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !code_ok {
            errors.add("code", "Use 1 to 32 letters, digits, dashes or underscores.");
        }

        let discount_type = match self.discount_type.as_str() {
            "fixed" => DiscountType::Fixed,
            "percent" | "" => DiscountType::Percent,
            _ => {
                errors.add("discount_type", "Unknown discount type.");
                DiscountType::Percent
            }
        };

        let value = match self.value.trim().parse::<Decimal>() {
            Ok(v) if v <= Decimal::ZERO => {
                errors.add("value", "Value must be positive.");
                v
            }
            Ok(v) if discount_type == DiscountType::Percent && v > Decimal::ONE_HUNDRED => {
                errors.add("value", "A percentage cannot exceed 100.");
                v
            }
            Ok(v) => v,
            Err(_) => {
                errors.add("value", "Enter a number.");
                Decimal::ZERO
            }
        };

        let min_order = optional(&self.min_order, |s| {
            s.parse::<Decimal>().ok().filter(|d| *d >= Decimal::ZERO)
        })
        .unwrap_or_else(|()| {
            errors.add("min_order", "Enter a non-negative amount.");
            None
        });

        let max_uses = optional(&self.max_uses, |s| s.parse::<u32>().ok().filter(|n| *n > 0))
            .unwrap_or_else(|()| {
                errors.add("max_uses", "Enter a whole number above zero.");
                None
            });

        let expires_at = optional(&self.expires_on, |s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(23, 59, 59))
                .map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|()| {
            errors.add("expires_on", "Use the format YYYY-MM-DD.");
            None
        });

        errors.into_result(NewCoupon {
            code,
            discount_type,
            value,
            min_order,
            max_uses,
            expires_at,
        })
    }
}

/// Parse an optional field: blank is `Ok(None)`, unparseable is `Err`.
fn optional<T>(raw: &str, parse: impl FnOnce(&str) -> Option<T>) -> Result<Option<T>, ()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse(raw).map(Some).ok_or(())
}

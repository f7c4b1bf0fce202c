//! Money amounts and their storefront display.
//!
//! Amounts arrive from the backend as decimal strings and are kept as
//! [`Decimal`] so cart subtotals never pick up float drift.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes the store can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    VND,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Number of decimal places shown for this currency.
    #[must_use]
    pub const fn decimal_places(self) -> u32 {
        match self {
            Self::VND => 0,
            Self::USD | Self::EUR => 2,
        }
    }

    /// Format an amount in this currency.
    #[must_use]
    pub fn format(self, amount: Decimal) -> String {
        let rounded = amount.round_dp_with_strategy(
            self.decimal_places(),
            RoundingStrategy::MidpointAwayFromZero,
        );
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let text = format!("{:.*}", self.decimal_places() as usize, rounded.abs());
        let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));

        match self {
            Self::VND => format!("{sign}{}₫", group_thousands(int_part, '.')),
            Self::USD => format!("{sign}${}.{frac_part}", group_thousands(int_part, ',')),
            Self::EUR => format!("{sign}€{}.{frac_part}", group_thousands(int_part, ',')),
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VND" => Ok(Self::VND),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// Percentage saved when a product sells below its compare-at price.
///
/// Returns `None` when there is no compare-at price, it is zero, or it is
/// not above the selling price. Rounds half away from zero.
#[must_use]
pub fn discount_percent(price: Decimal, compare_at: Option<Decimal>) -> Option<u8> {
    let compare_at = compare_at?;
    if compare_at <= Decimal::ZERO || compare_at <= price {
        return None;
    }
    let percent = ((compare_at - price) / compare_at * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    percent.to_u8().filter(|p| *p > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_vnd_format_groups_with_dots() {
        assert_eq!(CurrencyCode::VND.format(dec("150000")), "150.000₫");
        assert_eq!(CurrencyCode::VND.format(dec("1234567.6")), "1.234.568₫");
        assert_eq!(CurrencyCode::VND.format(dec("999")), "999₫");
        assert_eq!(CurrencyCode::VND.format(Decimal::ZERO), "0₫");
    }

    #[test]
    fn test_usd_format_two_places() {
        assert_eq!(CurrencyCode::USD.format(dec("19.9")), "$19.90");
        assert_eq!(CurrencyCode::USD.format(dec("1234.005")), "$1,234.01");
        assert_eq!(CurrencyCode::EUR.format(dec("-5")), "-€5.00");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("vnd".parse::<CurrencyCode>(), Ok(CurrencyCode::VND));
        assert!("JPY".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_discount_percent() {
        assert_eq!(discount_percent(dec("75"), Some(dec("100"))), Some(25));
        assert_eq!(discount_percent(dec("199000"), Some(dec("299000"))), Some(33));
        // 12.5% rounds half away from zero
        assert_eq!(discount_percent(dec("87.5"), Some(dec("100"))), Some(13));
    }

    #[test]
    fn test_discount_percent_none_cases() {
        assert_eq!(discount_percent(dec("100"), None), None);
        assert_eq!(discount_percent(dec("100"), Some(Decimal::ZERO)), None);
        assert_eq!(discount_percent(dec("100"), Some(dec("100"))), None);
        assert_eq!(discount_percent(dec("120"), Some(dec("100"))), None);
    }
}

//! Rounding helpers shared by the calculators, exporters and the CLI.
//!
//! Calculations themselves never round; these are applied when a value is
//! about to be shown or written out.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places used for effective rates (`0.1234` == 12.34%).
pub const RATE_DECIMAL_PLACES: u32 = 4;

/// Rounds a currency amount to two decimal places using half-up rounding.
///
/// Values at exactly 0.005 round away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use compliance_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a rate to [`RATE_DECIMAL_PLACES`] using half-up rounding.
///
/// ```
/// use rust_decimal_macros::dec;
/// use compliance_core::calculations::common::round_rate;
///
/// assert_eq!(round_rate(dec!(0.333333)), dec!(0.3333));
/// assert_eq!(round_rate(dec!(0.12345)), dec!(0.1235));
/// ```
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats a fractional rate as a percentage string, e.g. `0.3` → `"30.00%"`.
pub fn format_percent(rate: Decimal) -> String {
    format!("{}%", round_half_up(rate * Decimal::ONE_HUNDRED))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // round_half_up tests
    // =========================================================================

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        let result = round_half_up(dec!(123.454));

        assert_eq!(result, dec!(123.45));
    }

    #[test]
    fn round_half_up_rounds_up_at_midpoint() {
        let result = round_half_up(dec!(123.455));

        assert_eq!(result, dec!(123.46));
    }

    #[test]
    fn round_half_up_handles_negative_values() {
        let result = round_half_up(dec!(-123.455));

        assert_eq!(result, dec!(-123.46));
    }

    #[test]
    fn round_half_up_handles_large_values() {
        let result = round_half_up(dec!(999999.999));

        assert_eq!(result, dec!(1000000.00));
    }

    // =========================================================================
    // round_rate tests
    // =========================================================================

    #[test]
    fn round_rate_keeps_four_places() {
        assert_eq!(round_rate(dec!(0.30)), dec!(0.30));
        assert_eq!(round_rate(dec!(0.123449)), dec!(0.1234));
    }

    #[test]
    fn round_rate_rounds_up_at_midpoint() {
        assert_eq!(round_rate(dec!(0.00005)), dec!(0.0001));
    }

    // =========================================================================
    // format_percent tests
    // =========================================================================

    #[test]
    fn format_percent_scales_fraction() {
        assert_eq!(format_percent(dec!(0.30)), "30.00%");
        assert_eq!(format_percent(dec!(0.125)), "12.50%");
    }

    #[test]
    fn format_percent_rounds_long_fractions() {
        assert_eq!(format_percent(dec!(0.333333)), "33.33%");
    }
}

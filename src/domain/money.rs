use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Ledger amounts keep the precision they were written with. Rounding to
/// cents happens only when a value is rendered.
pub type Amount = Decimal;

/// Most fractional digits a `Decimal` can carry.
const MAX_SCALE: usize = 28;

/// A total left the representable range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("amount out of range while totalling {0}")]
pub struct AmountOverflow(pub String);

/// `a + b`, or an overflow error naming what was being totalled.
pub fn checked_total(a: Amount, b: Amount, what: &str) -> Result<Amount, AmountOverflow> {
    a.checked_add(b)
        .ok_or_else(|| AmountOverflow(what.to_string()))
}

/// Format an amount with exactly two decimals, rounding half away from zero.
/// Example: 50 -> "50.00", -12.345 -> "-12.35", 0.004 -> "0.00"
pub fn format_amount(amount: Amount) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        return "0.00".to_string();
    }
    format!("{:.2}", rounded)
}

/// Parse a ledger amount column.
///
/// Ledger files are hand-maintained, so this never fails: a blank field
/// is zero, and so is anything that is not a plain decimal number or does
/// not fit in a `Decimal`. Digits past the 28th decimal are dropped.
///
/// Example: "50" -> 50, "12.5" -> 12.5, "-0.005" -> -0.005, "n/a" -> 0
pub fn parse_amount(input: &str) -> Amount {
    parse_decimal(input.trim()).unwrap_or(Decimal::ZERO)
}

fn parse_decimal(input: &str) -> Option<Amount> {
    let (negative, digits) = match input.as_bytes().first()? {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    let (units_str, fraction_str) = match digits.split_once('.') {
        Some((units, fraction)) => (units, fraction),
        None => (digits, ""),
    };
    if units_str.is_empty() && fraction_str.is_empty() {
        return None;
    }
    if !units_str.bytes().chain(fraction_str.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let fraction_str = &fraction_str[..fraction_str.len().min(MAX_SCALE)];
    let mut mantissa: i128 = 0;
    for b in units_str.bytes().chain(fraction_str.bytes()) {
        mantissa = mantissa.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
    }
    if negative {
        mantissa = -mantissa;
    }

    Decimal::try_from_i128_with_scale(mantissa, fraction_str.len() as u32).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::new(5000, 2)), "50.00");
        assert_eq!(format_amount(Decimal::new(1234, 2)), "12.34");
        assert_eq!(format_amount(Decimal::new(1, 2)), "0.01");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
        assert_eq!(format_amount(Decimal::new(-30, 0)), "-30.00");
        assert_eq!(format_amount(Decimal::new(-1, 2)), "-0.01");
    }

    #[test]
    fn test_format_rounds_half_away_from_zero() {
        assert_eq!(format_amount(Decimal::new(5, 3)), "0.01");
        assert_eq!(format_amount(Decimal::new(-5, 3)), "-0.01");
        assert_eq!(format_amount(Decimal::new(100999, 3)), "101.00");
        assert_eq!(format_amount(Decimal::new(12344, 3)), "12.34");
        assert_eq!(format_amount(Decimal::new(-4, 3)), "0.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100"), Decimal::new(100, 0));
        assert_eq!(parse_amount(" 40.5 "), Decimal::new(405, 1));
        assert_eq!(parse_amount(".75"), Decimal::new(75, 2));
        assert_eq!(parse_amount("+3"), Decimal::new(3, 0));
        assert_eq!(parse_amount("-12.34"), Decimal::new(-1234, 2));
        assert_eq!(parse_amount("100.999"), Decimal::new(100999, 3));
    }

    #[test]
    fn test_sub_cent_amounts_add_up_before_rounding() {
        let half_cent = parse_amount("0.005");
        let total = checked_total(half_cent, half_cent, "A").unwrap();
        assert_eq!(format_amount(total), "0.01");
    }

    #[test]
    fn test_parse_amount_is_forgiving() {
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("abc"), Decimal::ZERO);
        assert_eq!(parse_amount("12.34.56"), Decimal::ZERO);
        assert_eq!(parse_amount("-"), Decimal::ZERO);
        assert_eq!(parse_amount("."), Decimal::ZERO);
        assert_eq!(parse_amount("1e5"), Decimal::ZERO);
        // Wider than 96 bits
        assert_eq!(parse_amount("900000000000000000000000000000"), Decimal::ZERO);
    }

    #[test]
    fn test_checked_total_overflow() {
        let err = checked_total(Decimal::MAX, Decimal::ONE, "account A").unwrap_err();
        assert_eq!(
            err.to_string(),
            "amount out of range while totalling account A"
        );
    }
}

//! Fixed-point arithmetic helpers
//!
//! All monetary math runs on 256-bit unsigned integers: USD values carry 8
//! decimals, token amounts carry their asset's own decimals, rates are basis
//! points. Floating point exists only in the display helpers at the end of
//! this module.

use alloy_primitives::U256;

use crate::errors::MarketError;

/// 10^exp as a 256-bit word
pub fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// `a * b / denom`, rounding down. `None` on zero denominator or overflow.
pub fn mul_div(a: U256, b: U256, denom: U256) -> Option<U256> {
    if denom.is_zero() {
        return None;
    }
    a.checked_mul(b)?.checked_div(denom)
}

/// `a * b / denom`, rounding up. `None` on zero denominator or overflow.
pub fn mul_div_ceil(a: U256, b: U256, denom: U256) -> Option<U256> {
    if denom.is_zero() {
        return None;
    }
    let product = a.checked_mul(b)?;
    let adjusted = product.checked_add(denom.checked_sub(U256::from(1u64))?)?;
    adjusted.checked_div(denom)
}

/// Rescale a fixed-point value between decimal conventions, rounding down
/// when narrowing.
pub fn scale_decimals(value: U256, from: u8, to: u8) -> Option<U256> {
    if from == to {
        return Some(value);
    }
    if to > from {
        value.checked_mul(pow10(to - from))
    } else {
        value.checked_div(pow10(from - to))
    }
}

/// Parse a decimal string (e.g. `"146.666667"`) into raw units.
///
/// Rejects empty input, malformed digits, and more fractional places than
/// the asset carries.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, MarketError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MarketError::InvalidAmount {
            message: "empty amount".into(),
        });
    }

    let (whole, frac) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };

    if frac.len() > decimals as usize {
        return Err(MarketError::InvalidAmount {
            message: format!(
                "{} has more than {} decimal places",
                input, decimals
            ),
        });
    }

    let joined = format!("{}{}{}", whole, frac, "0".repeat(decimals as usize - frac.len()));
    if joined.is_empty() || !joined.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MarketError::InvalidAmount {
            message: format!("malformed amount: {}", input),
        });
    }

    U256::from_str_radix(&joined, 10).map_err(|_| MarketError::InvalidAmount {
        message: format!("amount out of range: {}", input),
    })
}

/// Format raw units as a decimal string, trimming trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let scale = pow10(decimals);
    let whole = value / scale;
    let frac = value % scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}

/// Lossy conversion for display widgets. Never feed the result back into
/// monetary math.
pub fn to_f64_lossy(value: U256, decimals: u8) -> f64 {
    let scale = pow10(decimals);
    let whole = value / scale;
    let frac = value % scale;
    let whole = u128::try_from(whole).map(|w| w as f64).unwrap_or(f64::MAX);
    let frac = u128::try_from(frac).map(|f| f as f64).unwrap_or(0.0);
    whole + frac / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_rounds_down() {
        // 10 * 10 / 3 = 33.33 -> 33
        let result = mul_div(U256::from(10u64), U256::from(10u64), U256::from(3u64));
        assert_eq!(result, Some(U256::from(33u64)));
    }

    #[test]
    fn test_mul_div_ceil_rounds_up() {
        let result = mul_div_ceil(U256::from(10u64), U256::from(10u64), U256::from(3u64));
        assert_eq!(result, Some(U256::from(34u64)));

        // Exact division does not overshoot
        let exact = mul_div_ceil(U256::from(10u64), U256::from(9u64), U256::from(3u64));
        assert_eq!(exact, Some(U256::from(30u64)));
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert_eq!(mul_div(U256::from(1u64), U256::from(1u64), U256::ZERO), None);
        assert_eq!(
            mul_div_ceil(U256::from(1u64), U256::from(1u64), U256::ZERO),
            None
        );
    }

    #[test]
    fn test_mul_div_overflow() {
        assert_eq!(mul_div(U256::MAX, U256::from(2u64), U256::from(1u64)), None);
    }

    #[test]
    fn test_scale_decimals_widens_and_narrows() {
        // 1.5 at 8 decimals -> 18 decimals and back
        let e8 = U256::from(150_000_000u64);
        let e18 = scale_decimals(e8, 8, 18).unwrap();
        assert_eq!(e18, U256::from(1_500_000_000_000_000_000u64));
        assert_eq!(scale_decimals(e18, 18, 8), Some(e8));
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(
            parse_units("146.666667", 6).unwrap(),
            U256::from(146_666_667u64)
        );
        assert_eq!(parse_units("150", 6).unwrap(), U256::from(150_000_000u64));
        assert_eq!(parse_units("0.5", 8).unwrap(), U256::from(50_000_000u64));

        assert!(parse_units("", 6).is_err());
        assert!(parse_units("1.2345678", 6).is_err());
        assert!(parse_units("12a", 6).is_err());
        assert!(parse_units("-5", 6).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(146_666_667u64), 6), "146.666667");
        assert_eq!(format_units(U256::from(150_000_000u64), 6), "150");
        assert_eq!(format_units(U256::from(1u64), 8), "0.00000001");
        assert_eq!(format_units(U256::ZERO, 6), "0");
    }

    #[test]
    fn test_to_f64_lossy() {
        let value = U256::from(146_666_667u64);
        let display = to_f64_lossy(value, 6);
        assert!((display - 146.666667).abs() < 1e-9);
    }
}

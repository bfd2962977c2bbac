/// Format `value` with exactly `places` digits after the decimal point.
///
/// Excess digits are truncated toward zero unless `round` is set.
///
/// # Examples
///
/// ```
/// use mixtree_util::to_decimal_places;
///
/// assert_eq!(to_decimal_places(1.239, 2, false), "1.23");
/// assert_eq!(to_decimal_places(1.239, 2, true), "1.24");
/// ```
pub fn to_decimal_places(value: f64, places: usize, round: bool) -> String {
    let scale = 10f64.powi(places as i32);
    let scaled = value * scale;
    let cut = if round { scaled.round() } else { scaled.trunc() };
    format!("{:.*}", places, positive_zero(cut / scale))
}

/// Format `value` keeping `digits` significant digits.
///
/// Values in `(-10, 10)` keep `digits - 1` decimals; larger magnitudes drop
/// decimals first and then zero out the trailing integer digits.
///
/// # Examples
///
/// ```
/// use mixtree_util::to_significant_digits;
///
/// assert_eq!(to_significant_digits(5.4321, 3, false), "5.43");
/// assert_eq!(to_significant_digits(123.456, 4, false), "123.4");
/// assert_eq!(to_significant_digits(-12345.0, 3, false), "-12300");
/// ```
pub fn to_significant_digits(value: f64, digits: usize, round: bool) -> String {
    if value > -10.0 && value < 10.0 {
        return to_decimal_places(value, digits.saturating_sub(1), round);
    }

    let exponent = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(exponent - digits as i32 + 1);
    let scaled = value / scale;
    let cut = if round { scaled.round() } else { scaled.trunc() };
    let places = (digits as i32 - exponent - 1).max(0) as usize;
    format!("{:.*}", places, positive_zero(cut * scale))
}

// -0.0 would otherwise render with a sign.
fn positive_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

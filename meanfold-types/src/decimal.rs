//! Exact decimal values and the arithmetic the average aggregator needs.
//!
//! A [`DecimalValue`] is a scaled integer: the number `value * 10^-scale`. The
//! backing integer is an Arrow `i256`, so every value fits a `Decimal256` column
//! without conversion. Operations never silently lose digits: anything that would
//! overflow the 76-digit range or drop a non-zero digit returns a [`DecimalError`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use arrow::datatypes::DECIMAL256_MAX_PRECISION;
use arrow_buffer::i256;

/// Maximum number of digits a `DecimalValue` can hold (aligns with Arrow's Decimal256).
pub const MAX_DECIMAL_PRECISION: u8 = DECIMAL256_MAX_PRECISION;
const POW10_BASE: i256 = i256::from_i128(10);
const TWO: i256 = i256::from_i128(2);

/// Errors that can occur while manipulating decimal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    /// Requested scale falls outside the supported range.
    ScaleOutOfRange { scale: i32 },
    /// Result exceeded the maximum representable precision.
    PrecisionOverflow { scale: i8 },
    /// Arithmetic operation overflowed the 256-bit range.
    Overflow,
    /// Attempted to divide by zero.
    DivisionByZero,
    /// Rescale operation attempted to lower scale without exact divisibility.
    InexactRescale { from: i8, to: i8 },
    /// NaN and infinities have no decimal representation.
    NotFinite,
    /// Text was not a plain decimal literal.
    InvalidLiteral(String),
}

impl fmt::Display for DecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalError::ScaleOutOfRange { scale } => {
                write!(f, "decimal scale {scale} outside supported range")
            }
            DecimalError::PrecisionOverflow { scale } => {
                write!(
                    f,
                    "decimal value with scale {scale} exceeds {MAX_DECIMAL_PRECISION} digits"
                )
            }
            DecimalError::Overflow => write!(f, "decimal arithmetic overflow"),
            DecimalError::DivisionByZero => write!(f, "decimal division by zero"),
            DecimalError::InexactRescale { from, to } => {
                write!(
                    f,
                    "cannot rescale decimal from scale {from} to {to} without losing precision"
                )
            }
            DecimalError::NotFinite => write!(f, "non-finite float cannot become a decimal"),
            DecimalError::InvalidLiteral(text) => write!(f, "invalid decimal literal '{text}'"),
        }
    }
}

impl std::error::Error for DecimalError {}

impl From<DecimalError> for meanfold_result::Error {
    fn from(err: DecimalError) -> Self {
        meanfold_result::Error::arithmetic(err)
    }
}

/// Runtime representation of an exact decimal.
///
/// Equality and ordering are numeric, so `1.5` and `1.50` compare equal even though
/// their scales differ.
#[derive(Clone, Copy, Debug)]
pub struct DecimalValue {
    value: i256,
    scale: i8,
}

impl DecimalValue {
    /// Create a decimal from its raw parts, validating precision bounds.
    pub fn new(value: i256, scale: i8) -> Result<Self, DecimalError> {
        if !scale_within_bounds(scale as i32) {
            return Err(DecimalError::ScaleOutOfRange {
                scale: scale as i32,
            });
        }
        if digit_count_i256(value) > MAX_DECIMAL_PRECISION {
            return Err(DecimalError::PrecisionOverflow { scale });
        }
        Ok(Self { value, scale })
    }

    /// Create a decimal from a `Decimal128` raw value.
    pub fn from_i128(value: i128, scale: i8) -> Result<Self, DecimalError> {
        Self::new(i256::from_i128(value), scale)
    }

    /// Construct a decimal from an integer value with zero scale.
    pub fn from_i64(value: i64) -> Self {
        // 19 digits always fit.
        Self {
            value: i256::from_i128(value as i128),
            scale: 0,
        }
    }

    /// Convert a float into the shortest decimal that round-trips back to it.
    ///
    /// `0.1_f64` becomes exactly `0.1` (scale 1), not the 55-digit binary expansion.
    pub fn from_f64(value: f64) -> Result<Self, DecimalError> {
        if !value.is_finite() {
            return Err(DecimalError::NotFinite);
        }
        // `Display` for f64 prints the shortest round-trip digits without an exponent.
        value.to_string().parse()
    }

    /// Return the scaled integer backing this decimal.
    #[inline]
    pub fn raw_value(self) -> i256 {
        self.value
    }

    /// Return the scale (number of fractional digits).
    #[inline]
    pub fn scale(self) -> i8 {
        self.scale
    }

    /// Return the decimal precision (total digit count).
    #[inline]
    pub fn precision(self) -> u8 {
        digit_count_i256(self.value)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.value == i256::ZERO
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.value < i256::ZERO
    }

    /// Convert to the nearest `f64`.
    pub fn to_f64(self) -> f64 {
        if self.value == i256::ZERO {
            return 0.0;
        }
        // Parsing the decimal text rounds correctly; plain division would not.
        match self.to_string().parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                let denominator = 10_f64.powi(self.scale as i32);
                self.value.as_i128() as f64 / denominator
            }
        }
    }

    /// Rescale to a different exponent, preserving the numeric value exactly.
    pub fn rescale(self, target_scale: i8) -> Result<Self, DecimalError> {
        if !scale_within_bounds(target_scale as i32) {
            return Err(DecimalError::ScaleOutOfRange {
                scale: target_scale as i32,
            });
        }
        if target_scale == self.scale {
            return Ok(self);
        }

        if target_scale > self.scale {
            let factor = pow10((target_scale as i32 - self.scale as i32) as u32)?;
            let scaled = self
                .value
                .checked_mul(factor)
                .ok_or(DecimalError::Overflow)?;
            return Self::new(scaled, target_scale);
        }

        let factor = pow10((self.scale as i32 - target_scale as i32) as u32)?;
        let quotient = self
            .value
            .checked_div(factor)
            .ok_or(DecimalError::Overflow)?;
        let remainder = self
            .value
            .checked_rem(factor)
            .ok_or(DecimalError::Overflow)?;
        if remainder != i256::ZERO {
            return Err(DecimalError::InexactRescale {
                from: self.scale,
                to: target_scale,
            });
        }
        Self::new(quotient, target_scale)
    }

    /// Round to `target_scale` digits, sending exact midpoints to the even neighbour.
    ///
    /// Raising the scale is exact and never rounds.
    pub fn round_half_even(self, target_scale: i8) -> Result<Self, DecimalError> {
        if target_scale >= self.scale {
            return self.rescale(target_scale);
        }
        if !scale_within_bounds(target_scale as i32) {
            return Err(DecimalError::ScaleOutOfRange {
                scale: target_scale as i32,
            });
        }

        let diff = (self.scale as i32 - target_scale as i32) as u32;
        if diff > MAX_DECIMAL_PRECISION as u32 {
            // |value| < 10^76, so it is below half a unit at the target scale.
            return Self::new(i256::ZERO, target_scale);
        }
        let factor = pow10(diff)?;
        let quotient = self
            .value
            .checked_div(factor)
            .ok_or(DecimalError::Overflow)?;
        let remainder = self
            .value
            .checked_rem(factor)
            .ok_or(DecimalError::Overflow)?;
        if remainder == i256::ZERO {
            return Self::new(quotient, target_scale);
        }

        let twice = remainder
            .wrapping_abs()
            .checked_mul(TWO)
            .ok_or(DecimalError::Overflow)?;
        let away_from_zero = match twice.cmp(&factor) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => quotient.wrapping_rem(TWO) != i256::ZERO,
        };
        let rounded = if !away_from_zero {
            quotient
        } else if self.value < i256::ZERO {
            quotient
                .checked_sub(i256::ONE)
                .ok_or(DecimalError::Overflow)?
        } else {
            quotient
                .checked_add(i256::ONE)
                .ok_or(DecimalError::Overflow)?
        };
        Self::new(rounded, target_scale)
    }

    /// Add two decimals, aligning scales as needed.
    pub fn checked_add(self, rhs: Self) -> Result<Self, DecimalError> {
        let target_scale = self.scale.max(rhs.scale);
        let l = self.rescale(target_scale)?;
        let r = rhs.rescale(target_scale)?;
        let sum = l
            .value
            .checked_add(r.value)
            .ok_or(DecimalError::Overflow)?;
        Self::new(sum, target_scale)
    }

    /// Subtract two decimals, aligning scales as needed.
    pub fn checked_sub(self, rhs: Self) -> Result<Self, DecimalError> {
        let target_scale = self.scale.max(rhs.scale);
        let l = self.rescale(target_scale)?;
        let r = rhs.rescale(target_scale)?;
        let diff = l
            .value
            .checked_sub(r.value)
            .ok_or(DecimalError::Overflow)?;
        Self::new(diff, target_scale)
    }

    /// Multiply two decimals. The resulting scale is the sum of operand scales.
    pub fn checked_mul(self, rhs: Self) -> Result<Self, DecimalError> {
        let scale = self.scale as i32 + rhs.scale as i32;
        if !scale_within_bounds(scale) {
            return Err(DecimalError::ScaleOutOfRange { scale });
        }
        let product = self
            .value
            .checked_mul(rhs.value)
            .ok_or(DecimalError::Overflow)?;
        Self::new(product, scale as i8)
    }

    /// Divide by `rhs`, keeping `target_scale` fractional digits and truncating
    /// the rest toward zero.
    pub fn checked_div_trunc(self, rhs: Self, target_scale: i8) -> Result<Self, DecimalError> {
        if rhs.value == i256::ZERO {
            return Err(DecimalError::DivisionByZero);
        }
        if !scale_within_bounds(target_scale as i32) {
            return Err(DecimalError::ScaleOutOfRange {
                scale: target_scale as i32,
            });
        }

        // quotient * 10^-target = (lhs * 10^-ls) / (rhs * 10^-rs)
        let scale_adjust = target_scale as i32 + rhs.scale as i32 - self.scale as i32;
        let numerator = if scale_adjust >= 0 {
            self.value
                .checked_mul(pow10(scale_adjust as u32)?)
                .ok_or(DecimalError::Overflow)?
        } else if (-scale_adjust) as u32 > MAX_DECIMAL_PRECISION as u32 {
            i256::ZERO
        } else {
            self.value
                .checked_div(pow10((-scale_adjust) as u32)?)
                .ok_or(DecimalError::Overflow)?
        };

        let quotient = numerator
            .checked_div(rhs.value)
            .ok_or(DecimalError::Overflow)?;
        Self::new(quotient, target_scale)
    }

    /// Strip trailing fractional zeros so numerically equal values share one form.
    pub fn normalized(self) -> Self {
        let mut value = self.value;
        let mut scale = self.scale;
        while scale > 0 && value != i256::ZERO && value.wrapping_rem(POW10_BASE) == i256::ZERO {
            value = value.wrapping_div(POW10_BASE);
            scale -= 1;
        }
        if value == i256::ZERO {
            scale = scale.min(0);
        }
        Self { value, scale }
    }
}

impl From<i64> for DecimalValue {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.value < i256::ZERO;
        let digits = digit_buffer(self.value);
        if negative {
            f.write_str("-")?;
        }
        if self.scale <= 0 {
            f.write_str(&digits)?;
            if self.value != i256::ZERO {
                for _ in 0..(-(self.scale as i32)) {
                    f.write_str("0")?;
                }
            }
            return Ok(());
        }
        let scale = self.scale as usize;
        if digits.len() <= scale {
            f.write_str("0.")?;
            for _ in digits.len()..scale {
                f.write_str("0")?;
            }
            return f.write_str(&digits);
        }
        let split = digits.len() - scale;
        f.write_str(&digits[..split])?;
        f.write_str(".")?;
        f.write_str(&digits[split..])
    }
}

impl FromStr for DecimalValue {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(DecimalError::InvalidLiteral(s.to_string()));
        }

        let scale = frac_part.len();
        if scale > MAX_DECIMAL_PRECISION as usize {
            return Err(DecimalError::ScaleOutOfRange {
                scale: scale as i32,
            });
        }

        let mut value = i256::ZERO;
        for digit in int_part.bytes().chain(frac_part.bytes()) {
            value = value
                .checked_mul(POW10_BASE)
                .and_then(|v| v.checked_add(i256::from_i128((digit - b'0') as i128)))
                .ok_or(DecimalError::Overflow)?;
        }
        if negative {
            value = value.wrapping_neg();
        }

        Self::new(value, scale as i8)
    }
}

impl PartialEq for DecimalValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DecimalValue {}

impl PartialOrd for DecimalValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DecimalValue {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.scale == other.scale {
            return self.value.cmp(&other.value);
        }

        // Raise the smaller scale. A product that overflows is larger in magnitude
        // than any representable value, so its sign alone decides.
        let (low, high, flipped) = if self.scale < other.scale {
            (self, other, false)
        } else {
            (other, self, true)
        };
        let diff = (high.scale as i32 - low.scale as i32) as u32;
        let scaled = pow10(diff)
            .ok()
            .and_then(|factor| low.value.checked_mul(factor));
        let ordering = match scaled {
            Some(scaled) => scaled.cmp(&high.value),
            None if low.value < i256::ZERO => Ordering::Less,
            None => Ordering::Greater,
        };
        if flipped { ordering.reverse() } else { ordering }
    }
}

fn pow10(exp: u32) -> Result<i256, DecimalError> {
    if exp > MAX_DECIMAL_PRECISION as u32 {
        return Err(DecimalError::Overflow);
    }
    Ok(POW10_BASE.wrapping_pow(exp))
}

fn digit_count_i256(mut value: i256) -> u8 {
    if value == i256::ZERO {
        return 1;
    }
    if value < i256::ZERO {
        value = value.wrapping_neg();
    }
    let mut count: u8 = 0;
    while value != i256::ZERO {
        value = value.wrapping_div(POW10_BASE);
        count += 1;
    }
    count
}

fn digit_buffer(mut value: i256) -> String {
    if value == i256::ZERO {
        return "0".to_owned();
    }
    if value < i256::ZERO {
        value = value.wrapping_neg();
    }
    let mut buf = Vec::new();
    while value != i256::ZERO {
        let digit = value.wrapping_rem(POW10_BASE).as_i128() as u8;
        buf.push((b'0' + digit) as char);
        value = value.wrapping_div(POW10_BASE);
    }
    buf.iter().rev().collect()
}

fn scale_within_bounds(scale: i32) -> bool {
    let max = MAX_DECIMAL_PRECISION as i32;
    (-max..=max).contains(&scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(text: &str) -> DecimalValue {
        text.parse().unwrap()
    }

    #[test]
    fn parse_and_display_round_trip() {
        for text in ["0", "7", "-7", "2.3333", "-0.0005", "0.125", "123456789.000"] {
            assert_eq!(dec(text).to_string(), text);
        }
        assert_eq!(dec("+1.50").scale(), 2);
        assert!(matches!(
            "1.2.3".parse::<DecimalValue>(),
            Err(DecimalError::InvalidLiteral(_))
        ));
        assert!(matches!(
            "1e5".parse::<DecimalValue>(),
            Err(DecimalError::InvalidLiteral(_))
        ));
    }

    #[test]
    fn numeric_equality_ignores_scale() {
        assert_eq!(dec("1.5"), dec("1.500"));
        assert!(dec("-2.01") < dec("-2.001"));
        assert!(dec("10") > dec("9.9999"));
    }

    #[test]
    fn round_half_even_breaks_ties_to_even() {
        assert_eq!(dec("0.125").round_half_even(2).unwrap().to_string(), "0.12");
        assert_eq!(dec("0.135").round_half_even(2).unwrap().to_string(), "0.14");
        assert_eq!(dec("-0.125").round_half_even(2).unwrap().to_string(), "-0.12");
        assert_eq!(dec("2.5").round_half_even(0).unwrap().to_string(), "2");
        assert_eq!(dec("3.5").round_half_even(0).unwrap().to_string(), "4");
        assert_eq!(dec("0.1251").round_half_even(2).unwrap().to_string(), "0.13");
        assert_eq!(dec("0.1249").round_half_even(2).unwrap().to_string(), "0.12");
    }

    #[test]
    fn round_half_even_to_larger_scale_pads() {
        assert_eq!(dec("1.5").round_half_even(3).unwrap().to_string(), "1.500");
    }

    #[test]
    fn division_truncates_to_target_scale() {
        let q = dec("7").checked_div_trunc(DecimalValue::from_i64(3), 8).unwrap();
        assert_eq!(q.to_string(), "2.33333333");
        let q = dec("-7").checked_div_trunc(DecimalValue::from_i64(3), 2).unwrap();
        assert_eq!(q.to_string(), "-2.33");
        let q = dec("1.00000").checked_div_trunc(DecimalValue::from_i64(8), 2).unwrap();
        assert_eq!(q.to_string(), "0.12");
        assert_eq!(
            dec("1").checked_div_trunc(DecimalValue::from_i64(0), 2),
            Err(DecimalError::DivisionByZero)
        );
    }

    #[test]
    fn from_f64_uses_shortest_representation() {
        assert_eq!(DecimalValue::from_f64(0.1).unwrap().to_string(), "0.1");
        assert_eq!(DecimalValue::from_f64(1e-7).unwrap().to_string(), "0.0000001");
        assert_eq!(DecimalValue::from_f64(-2.5).unwrap().to_string(), "-2.5");
        assert_eq!(DecimalValue::from_f64(f64::NAN), Err(DecimalError::NotFinite));
        assert_eq!(DecimalValue::from_f64(f64::INFINITY), Err(DecimalError::NotFinite));
        assert!(DecimalValue::from_f64(1e300).is_err());
    }

    #[test]
    fn to_f64_round_trips_shortest_form() {
        for v in [0.1, 2.3333, -17.25, 1e-7, 123456.789] {
            assert_eq!(DecimalValue::from_f64(v).unwrap().to_f64(), v);
        }
    }

    #[test]
    fn rescale_rejects_lossy_reduction() {
        assert_eq!(
            dec("1.25").rescale(1),
            Err(DecimalError::InexactRescale { from: 2, to: 1 })
        );
        assert_eq!(dec("1.20").rescale(1).unwrap().to_string(), "1.2");
    }

    #[test]
    fn addition_overflow_is_reported() {
        let nines = "9".repeat(MAX_DECIMAL_PRECISION as usize);
        let big = dec(&nines);
        assert_eq!(
            big.checked_add(DecimalValue::from_i64(1)),
            Err(DecimalError::PrecisionOverflow { scale: 0 })
        );
    }

    #[test]
    fn normalized_strips_trailing_zeros() {
        let n = dec("3.1400").normalized();
        assert_eq!(n.scale(), 2);
        assert_eq!(n.to_string(), "3.14");
        assert_eq!(dec("0.000").normalized().scale(), 0);
    }
}

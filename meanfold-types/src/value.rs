use std::cmp::Ordering;
use std::fmt;

use meanfold_result::{Error, Result};

use crate::decimal::{DecimalError, DecimalValue};

/// Describes whether a value is null or represented as an integer, float, or decimal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Integer,
    Decimal,
    Float,
}

/// A typed, nullable scalar produced by evaluating an input expression.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Int64(i64),
    Decimal(DecimalValue),
    Float64(f64),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Int64(_) => ValueKind::Integer,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Float64(_) => ValueKind::Float,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<DecimalValue> {
        match self {
            Value::Decimal(v) => Some(*v),
            Value::Int64(v) => Some(DecimalValue::from_i64(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Int64(v) => Some(*v as f64),
            Value::Decimal(v) => Some(v.to_f64()),
            Value::Float64(v) => Some(*v),
        }
    }

    /// Compare two values numerically. Returns `None` when either side is null
    /// or a float comparison involves NaN.
    pub fn numeric_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Float64(_), _) | (_, Value::Float64(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (a, b) => Some(a.as_decimal()?.cmp(&b.as_decimal()?)),
        }
    }

    pub fn checked_add(&self, other: &Value) -> Result<Value> {
        self.binary(other, "add", i64::checked_add, DecimalValue::checked_add, |a, b| a + b)
    }

    pub fn checked_sub(&self, other: &Value) -> Result<Value> {
        self.binary(other, "subtract", i64::checked_sub, DecimalValue::checked_sub, |a, b| {
            a - b
        })
    }

    pub fn checked_mul(&self, other: &Value) -> Result<Value> {
        self.binary(other, "multiply", i64::checked_mul, DecimalValue::checked_mul, |a, b| {
            a * b
        })
    }

    // Null propagates, integers stay integers, decimals absorb integers, floats absorb everything.
    fn binary(
        &self,
        other: &Value,
        op: &str,
        int_op: fn(i64, i64) -> Option<i64>,
        dec_op: fn(DecimalValue, DecimalValue) -> std::result::Result<DecimalValue, DecimalError>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Int64(a), Value::Int64(b)) => int_op(*a, *b)
                .map(Value::Int64)
                .ok_or_else(|| Error::Arithmetic(format!("BIGINT overflow in {op}"))),
            (Value::Float64(_), _) | (_, Value::Float64(_)) => {
                let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) else {
                    return Ok(Value::Null);
                };
                Ok(Value::Float64(float_op(a, b)))
            }
            (a, b) => {
                let (Some(a), Some(b)) = (a.as_decimal(), b.as_decimal()) else {
                    return Ok(Value::Null);
                };
                Ok(Value::Decimal(dec_op(a, b)?))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<DecimalValue> for Value {
    fn from(v: DecimalValue) -> Self {
        Value::Decimal(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(text: &str) -> Value {
        Value::Decimal(text.parse().unwrap())
    }

    #[test]
    fn arithmetic_promotes_by_domain() {
        assert_eq!(
            Value::Int64(2).checked_add(&Value::Int64(3)).unwrap(),
            Value::Int64(5)
        );
        assert_eq!(Value::Int64(2).checked_add(&dec("0.5")).unwrap(), dec("2.5"));
        assert_eq!(
            dec("1.5").checked_mul(&Value::Float64(2.0)).unwrap(),
            Value::Float64(3.0)
        );
        assert!(Value::Null.checked_sub(&Value::Int64(1)).unwrap().is_null());
    }

    #[test]
    fn integer_overflow_is_an_arithmetic_error() {
        let err = Value::Int64(i64::MAX)
            .checked_add(&Value::Int64(1))
            .unwrap_err();
        assert!(matches!(err, Error::Arithmetic(_)));
    }

    #[test]
    fn numeric_comparison_crosses_domains() {
        assert_eq!(Value::Int64(3).numeric_cmp(&dec("2.99")), Some(Ordering::Greater));
        assert_eq!(dec("1.0").numeric_cmp(&Value::Int64(1)), Some(Ordering::Equal));
        assert_eq!(Value::Float64(0.5).numeric_cmp(&dec("0.25")), Some(Ordering::Greater));
        assert_eq!(Value::Null.numeric_cmp(&Value::Int64(1)), None);
    }
}

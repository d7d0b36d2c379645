//! Per-group accumulator state.

use std::fmt;

use meanfold_result::{Error, Result};
use meanfold_types::{DecimalValue, Value};

use crate::distinct::DistinctChecker;

/// Running sum of one group, tagged with its numeric domain.
///
/// The tag is fixed by the first non-null value and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SumState {
    #[default]
    Unset,
    Decimal(DecimalValue),
    Float(f64),
}

impl SumState {
    #[inline]
    pub fn is_unset(&self) -> bool {
        matches!(self, SumState::Unset)
    }

    /// The sum as a value; `Null` while unset.
    pub fn to_value(&self) -> Value {
        match self {
            SumState::Unset => Value::Null,
            SumState::Decimal(d) => Value::Decimal(*d),
            SumState::Float(f) => Value::Float64(*f),
        }
    }

    /// Compute the sum after adding `value` without modifying `self`.
    ///
    /// Integers accumulate as decimals. `Null` leaves the sum unchanged.
    pub fn plus(&self, value: &Value) -> Result<SumState> {
        let next = match (self, value) {
            (_, Value::Null) => *self,
            (SumState::Unset, Value::Int64(v)) => SumState::Decimal(DecimalValue::from_i64(*v)),
            (SumState::Unset, Value::Decimal(d)) => SumState::Decimal(*d),
            (SumState::Unset, Value::Float64(f)) => SumState::Float(*f),
            (SumState::Decimal(acc), Value::Int64(v)) => {
                SumState::Decimal(acc.checked_add(DecimalValue::from_i64(*v))?)
            }
            (SumState::Decimal(acc), Value::Decimal(d)) => SumState::Decimal(acc.checked_add(*d)?),
            (SumState::Float(acc), Value::Float64(f)) => SumState::Float(acc + f),
            (SumState::Decimal(_), Value::Float64(_))
            | (SumState::Float(_), Value::Int64(_) | Value::Decimal(_)) => {
                return Err(Error::Internal(format!(
                    "cannot add {:?} value into a {} sum",
                    value.kind(),
                    self.domain()
                )));
            }
        };
        Ok(next)
    }

    /// Combine two sums under the same tag rules as [`SumState::plus`].
    pub fn combine(&self, other: &SumState) -> Result<SumState> {
        self.plus(&other.to_value())
    }

    fn domain(&self) -> &'static str {
        match self {
            SumState::Unset => "unset",
            SumState::Decimal(_) => "decimal",
            SumState::Float(_) => "double",
        }
    }
}

/// Mutable state for one grouping key.
///
/// Created empty by [`crate::AvgAggregate::create_context`], mutated by `update`,
/// and only read by `result` and `export_partial`.
#[derive(Default)]
pub struct AggregateContext {
    pub(crate) count: i64,
    pub(crate) sum: SumState,
    pub(crate) distinct: Option<Box<dyn DistinctChecker>>,
}

impl AggregateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that suppresses duplicates through `checker`.
    pub fn with_distinct(checker: Box<dyn DistinctChecker>) -> Self {
        Self {
            distinct: Some(checker),
            ..Self::default()
        }
    }

    #[inline]
    pub fn count(&self) -> i64 {
        self.count
    }

    #[inline]
    pub fn sum(&self) -> &SumState {
        &self.sum
    }

    #[inline]
    pub fn has_distinct(&self) -> bool {
        self.distinct.is_some()
    }

    /// True until a non-null value has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.sum.is_unset()
    }

    /// Fold another group's state into this one.
    ///
    /// Both contexts must have been fed by the same aggregate. The distinct set of
    /// `other` is not carried over.
    pub fn merge(&mut self, other: &AggregateContext) -> Result<()> {
        let next_sum = self.sum.combine(&other.sum)?;
        let next_count = self.add_count(other.count)?;
        self.sum = next_sum;
        self.count = next_count;
        Ok(())
    }

    /// Fold a pre-aggregated `(count, sum)` pair into this context.
    ///
    /// A null sum contributes nothing. Nothing is modified unless both the sum and
    /// the count can be added.
    pub fn merge_partial(&mut self, count: i64, sum: &Value) -> Result<()> {
        if sum.is_null() {
            return Ok(());
        }
        if count < 0 {
            return Err(Error::InvalidArgumentError(format!(
                "partial count must not be negative, got {count}"
            )));
        }
        let next_sum = self.sum.plus(sum)?;
        let next_count = self.add_count(count)?;
        self.sum = next_sum;
        self.count = next_count;
        Ok(())
    }

    fn add_count(&self, count: i64) -> Result<i64> {
        self.count
            .checked_add(count)
            .ok_or_else(|| Error::Arithmetic("AVG row count overflow".into()))
    }

    /// Add one raw value, counting it as a single row.
    pub(crate) fn accumulate(&mut self, value: &Value) -> Result<()> {
        self.merge_partial(1, value)
    }

    /// Return to the freshly created state, keeping the distinct checker but
    /// clearing what it has seen.
    pub fn reset(&mut self) {
        self.count = 0;
        self.sum = SumState::Unset;
        if let Some(checker) = self.distinct.as_mut() {
            checker.reset();
        }
    }
}

impl fmt::Debug for AggregateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateContext")
            .field("count", &self.count)
            .field("sum", &self.sum)
            .field("distinct", &self.distinct.as_ref().map(|d| d.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(text: &str) -> Value {
        Value::Decimal(text.parse().unwrap())
    }

    #[test]
    fn first_value_fixes_the_tag() {
        let mut ctx = AggregateContext::new();
        assert!(ctx.is_empty());
        ctx.accumulate(&Value::Int64(3)).unwrap();
        ctx.accumulate(&dec("1.25")).unwrap();
        assert_eq!(ctx.count(), 2);
        assert_eq!(ctx.sum(), &SumState::Decimal("4.25".parse().unwrap()));

        let err = ctx.accumulate(&Value::Float64(1.0)).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert_eq!(ctx.count(), 2);
    }

    #[test]
    fn nulls_do_not_count() {
        let mut ctx = AggregateContext::new();
        ctx.accumulate(&Value::Null).unwrap();
        ctx.merge_partial(5, &Value::Null).unwrap();
        assert_eq!(ctx.count(), 0);
        assert!(ctx.sum().is_unset());
    }

    #[test]
    fn merge_adds_counts_and_sums() {
        let mut left = AggregateContext::new();
        left.accumulate(&Value::Float64(1.5)).unwrap();
        let mut right = AggregateContext::new();
        right.accumulate(&Value::Float64(2.5)).unwrap();
        right.accumulate(&Value::Float64(4.0)).unwrap();

        left.merge(&right).unwrap();
        assert_eq!(left.count(), 3);
        assert_eq!(left.sum(), &SumState::Float(8.0));

        // Merging an empty context is a no-op.
        left.merge(&AggregateContext::new()).unwrap();
        assert_eq!(left.count(), 3);
    }

    #[test]
    fn combine_keeps_the_tag_rules() {
        let decimal = SumState::Decimal("2.5".parse().unwrap());
        assert_eq!(SumState::Unset.combine(&decimal).unwrap(), decimal);
        assert_eq!(decimal.combine(&SumState::Unset).unwrap(), decimal);
        assert_eq!(
            decimal.combine(&decimal).unwrap(),
            SumState::Decimal("5".parse().unwrap())
        );
        assert!(matches!(
            decimal.combine(&SumState::Float(1.0)),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn mismatched_merge_leaves_state_untouched() {
        let mut left = AggregateContext::new();
        left.accumulate(&Value::Int64(4)).unwrap();
        let mut right = AggregateContext::new();
        right.accumulate(&Value::Float64(1.0)).unwrap();

        assert!(left.merge(&right).is_err());
        assert_eq!(left.count(), 1);
        assert_eq!(left.sum(), &SumState::Decimal(DecimalValue::from_i64(4)));
    }

    #[test]
    fn count_overflow_leaves_state_untouched() {
        let mut ctx = AggregateContext::new();
        ctx.merge_partial(i64::MAX, &Value::Int64(1)).unwrap();
        let err = ctx.merge_partial(1, &Value::Int64(1)).unwrap_err();
        assert!(matches!(err, Error::Arithmetic(_)));
        assert_eq!(ctx.count(), i64::MAX);
        assert_eq!(ctx.sum(), &SumState::Decimal(DecimalValue::from_i64(1)));
    }

    #[test]
    fn negative_partial_counts_are_rejected() {
        let mut ctx = AggregateContext::new();
        assert!(matches!(
            ctx.merge_partial(-1, &Value::Int64(1)),
            Err(Error::InvalidArgumentError(_))
        ));
    }
}

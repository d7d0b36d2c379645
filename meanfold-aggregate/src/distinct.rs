//! Duplicate suppression for `AVG(DISTINCT ...)`.

use std::fmt;

use arrow_buffer::i256;
use meanfold_result::{Error, Result};
use meanfold_types::{DecimalValue, Value};
use rustc_hash::FxHashSet;

/// Reports whether a value tuple is seen for the first time within one aggregate context.
///
/// Implementations are stateful and scoped to a single context; they are created
/// with the context and dropped with it.
pub trait DistinctChecker: Send + fmt::Debug {
    /// Record `values` and return `true` if they had not been seen before.
    fn check(&mut self, values: &[Value]) -> Result<bool>;

    /// Forget every value seen so far.
    fn reset(&mut self);

    /// Number of distinct tuples recorded.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hashable identity of a value. Numerically equal exact values share one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum DistinctKey {
    Null,
    Exact { value: i256, scale: i8 },
    Float(u64),
}

impl DistinctKey {
    fn exact(value: DecimalValue) -> Self {
        let normalized = value.normalized();
        DistinctKey::Exact {
            value: normalized.raw_value(),
            scale: normalized.scale(),
        }
    }

    fn of(value: &Value) -> Self {
        match value {
            Value::Null => DistinctKey::Null,
            Value::Int64(v) => Self::exact(DecimalValue::from_i64(*v)),
            Value::Decimal(d) => Self::exact(*d),
            Value::Float64(v) => {
                let canonical = if *v == 0.0 {
                    0.0_f64
                } else if v.is_nan() {
                    f64::NAN
                } else {
                    *v
                };
                DistinctKey::Float(canonical.to_bits())
            }
        }
    }
}

/// In-memory distinct set backed by an `FxHashSet`.
#[derive(Debug, Default)]
pub struct HashDistinctChecker {
    seen: FxHashSet<Box<[DistinctKey]>>,
    max_entries: Option<usize>,
}

impl HashDistinctChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `ResourceExhausted` instead of growing past `max_entries` tuples.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            seen: FxHashSet::default(),
            max_entries: Some(max_entries),
        }
    }
}

impl DistinctChecker for HashDistinctChecker {
    fn check(&mut self, values: &[Value]) -> Result<bool> {
        let key: Box<[DistinctKey]> = values.iter().map(DistinctKey::of).collect();
        if self.seen.contains(&key) {
            return Ok(false);
        }
        if let Some(limit) = self.max_entries
            && self.seen.len() >= limit
        {
            return Err(Error::ResourceExhausted(format!(
                "distinct set reached its limit of {limit} entries"
            )));
        }
        self.seen.insert(key);
        Ok(true)
    }

    fn reset(&mut self) {
        self.seen.clear();
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}

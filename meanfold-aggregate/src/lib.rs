//! Streaming, mergeable `AVG` aggregation.
//!
//! An [`AvgAggregate`] holds the static configuration of one `AVG(expr)`: its
//! evaluation mode, input expressions, `DISTINCT` flag and resolved output type.
//! All per-group state lives in caller-owned [`AggregateContext`]s, so one
//! aggregate can drive any number of groups, on any number of threads.
//!
//! Two-phase evaluation splits the work: a [`AggMode::Partial`] aggregate scans raw
//! rows and exports `(count, sum)` pairs, and an [`AggMode::Final`] aggregate
//! folds those pairs and divides. [`AggMode::Complete`] does both in one pass.

use std::sync::Arc;

use arrow::array::{ArrayRef, Decimal256Builder, Float64Builder, Int64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use meanfold_expr::{BatchRow, InputExpr};
use meanfold_result::{Error, Result};
use meanfold_types::{FieldType, MAX_DECIMAL_PRECISION, NumericLimits, TypeKind, Value};

pub mod context;
pub mod distinct;
mod finalize;
pub mod output_type;
pub mod stream;

pub use context::{AggregateContext, SumState};
pub use distinct::{DistinctChecker, HashDistinctChecker};
pub use output_type::resolve_output_type;
pub use meanfold_result::DIAGNOSTICS_TARGET;
pub use stream::AvgStream;

/// Evaluation phase of an aggregate. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggMode {
    /// Raw rows in, final average out.
    Complete,
    /// Raw rows in, `(count, sum)` pairs out.
    Partial,
    /// `(count, sum)` pairs in, final average out.
    Final,
}

/// `AVG(expr)` with its resolved output type.
///
/// Arguments are `[value]` in complete and partial mode and `[count, sum]` in
/// final mode. Cloning copies the configuration only; contexts are never shared.
#[derive(Debug, Clone)]
pub struct AvgAggregate {
    alias: String,
    mode: AggMode,
    args: Vec<InputExpr>,
    distinct: bool,
    limits: NumericLimits,
    output_type: FieldType,
}

impl AvgAggregate {
    /// Build an aggregate using the default numeric limits.
    pub fn try_new(mode: AggMode, args: Vec<InputExpr>, distinct: bool) -> Result<Self> {
        Self::try_with_limits(mode, args, distinct, NumericLimits::default())
    }

    pub fn try_with_limits(
        mode: AggMode,
        args: Vec<InputExpr>,
        distinct: bool,
        limits: NumericLimits,
    ) -> Result<Self> {
        let expected = match mode {
            AggMode::Complete | AggMode::Partial => 1,
            AggMode::Final => 2,
        };
        if args.len() != expected {
            return Err(Error::InvalidArgumentError(format!(
                "AVG in {mode:?} mode takes {expected} argument(s), got {}",
                args.len()
            )));
        }
        if mode == AggMode::Final && !args[0].field_type().kind.is_signed_integer() {
            return Err(Error::InvalidArgumentError(format!(
                "AVG partial count must be an integer, got {}",
                args[0].describe()
            )));
        }
        if distinct && mode == AggMode::Final {
            tracing::debug!("DISTINCT has no effect on a final-mode AVG");
        }

        let value_arg = match mode {
            AggMode::Final => &args[1],
            AggMode::Complete | AggMode::Partial => &args[0],
        };
        let output_type = resolve_output_type(mode, value_arg.field_type(), &limits);

        Ok(Self {
            alias: "avg".to_string(),
            mode,
            args,
            distinct,
            limits,
            output_type,
        })
    }

    /// Name used for the columns of produced batches.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// The final-mode aggregate that consumes this aggregate's partial batches.
    pub fn final_stage(&self) -> Result<AvgAggregate> {
        if self.mode == AggMode::Final {
            return Err(Error::InvalidArgumentError(
                "a final-mode AVG has no further stage".into(),
            ));
        }
        let [count_type, sum_type] = self.partial_types();
        let args = vec![
            InputExpr::PartialCount(meanfold_expr::ColumnRef::new(0, count_type)),
            InputExpr::partial_sum(1, sum_type),
        ];
        let mut stage = Self::try_with_limits(AggMode::Final, args, false, self.limits)?
            .with_alias(&self.alias);
        // The partial sum may be wider than the result; round to this stage's scale.
        stage.output_type = self.output_type;
        Ok(stage)
    }

    #[inline]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    #[inline]
    pub fn mode(&self) -> AggMode {
        self.mode
    }

    #[inline]
    pub fn args(&self) -> &[InputExpr] {
        &self.args
    }

    /// Whether duplicates are suppressed. Always `false` in effect for final mode.
    #[inline]
    pub fn is_distinct(&self) -> bool {
        self.distinct && self.mode != AggMode::Final
    }

    #[inline]
    pub fn limits(&self) -> &NumericLimits {
        &self.limits
    }

    /// The resolved result type, cached at construction.
    #[inline]
    pub fn output_type(&self) -> FieldType {
        self.output_type
    }

    /// Declared types of the exported `(count, sum)` pair.
    ///
    /// A decimal sum keeps the wider of the input and output scales, so the
    /// exported sum is exact even when the output scale is capped.
    pub fn partial_types(&self) -> [FieldType; 2] {
        let output = self.output_type;
        if output.kind != TypeKind::Decimal {
            return [FieldType::bigint(), output];
        }
        let input = self.args[self.value_index()].field_type();
        let max_digits = MAX_DECIMAL_PRECISION;
        let scale = output.scale.max(input.scale).map(|scale| scale.min(max_digits));
        let width = output.width.max(input.width).min(u32::from(max_digits));
        let sum = FieldType::decimal(width, scale).with_binary_collation();
        [FieldType::bigint(), sum]
    }

    /// Schema of batches produced by [`AvgAggregate::partial_batch`].
    pub fn partial_schema(&self) -> SchemaRef {
        let [_, sum_type] = self.partial_types();
        Arc::new(Schema::new(vec![
            Field::new(format!("{}_count", self.alias), DataType::Int64, false),
            Field::new(format!("{}_sum", self.alias), sum_type.to_arrow(), true),
        ]))
    }

    /// A fresh context for a newly seen group.
    pub fn create_context(&self) -> AggregateContext {
        if self.is_distinct() {
            AggregateContext::with_distinct(Box::new(HashDistinctChecker::new()))
        } else {
            AggregateContext::new()
        }
    }

    /// A fresh context that suppresses duplicates through `checker`.
    ///
    /// The checker is dropped when the aggregate is not distinct.
    pub fn create_context_with(&self, checker: Box<dyn DistinctChecker>) -> AggregateContext {
        if self.is_distinct() {
            AggregateContext::with_distinct(checker)
        } else {
            tracing::debug!(mode = ?self.mode, "ignoring distinct checker for non-distinct AVG");
            AggregateContext::new()
        }
    }

    /// Clear `ctx` so it can serve a new group.
    pub fn reset_context(&self, ctx: &mut AggregateContext) {
        ctx.reset();
    }

    /// Consume one row.
    ///
    /// A failed update leaves `ctx` as it was, except that a value may already be
    /// recorded by the distinct checker when the addition itself overflows.
    pub fn update(&self, ctx: &mut AggregateContext, row: &BatchRow<'_>) -> Result<()> {
        match self.mode {
            AggMode::Complete | AggMode::Partial => self.update_value(ctx, row),
            AggMode::Final => self.update_partial(ctx, row),
        }
    }

    /// Consume every row of `batch` in order, stopping at the first failure.
    pub fn update_batch(&self, ctx: &mut AggregateContext, batch: &RecordBatch) -> Result<()> {
        for row in 0..batch.num_rows() {
            self.update(ctx, &BatchRow::new(batch, row))?;
        }
        Ok(())
    }

    fn update_value(&self, ctx: &mut AggregateContext, row: &BatchRow<'_>) -> Result<()> {
        let value = self.args[0]
            .eval(row)
            .map_err(|err| Error::evaluation("AVG value", err))?;
        if value.is_null() {
            return Ok(());
        }
        let value = self.coerce(value)?;

        if self.distinct {
            let checker = ctx.distinct.as_mut().ok_or_else(|| {
                Error::InvalidArgumentError(
                    "DISTINCT AVG needs a context created by the aggregate".into(),
                )
            })?;
            let first_seen = checker
                .check(std::slice::from_ref(&value))
                .map_err(Error::distinct_check)?;
            if !first_seen {
                return Ok(());
            }
        }

        ctx.accumulate(&value)
    }

    fn update_partial(&self, ctx: &mut AggregateContext, row: &BatchRow<'_>) -> Result<()> {
        let sum = self.args[1]
            .eval(row)
            .map_err(|err| Error::evaluation("AVG partial sum", err))?;
        if sum.is_null() {
            return Ok(());
        }
        let sum = self.coerce(sum)?;

        let count = match self.args[0].eval(row) {
            Ok(Value::Null) => 0,
            Ok(Value::Int64(count)) => count,
            Ok(other) => {
                return Err(Error::evaluation(
                    "AVG partial count",
                    Error::ExprCast(format!("expected an integer count, got {other}")),
                ));
            }
            Err(err) => return Err(Error::evaluation("AVG partial count", err)),
        };

        ctx.merge_partial(count, &sum)
    }

    /// Bring a non-null value into the output domain.
    fn coerce(&self, value: Value) -> Result<Value> {
        match (self.output_type.kind, value) {
            (TypeKind::Decimal, Value::Float64(_)) => Err(Error::Internal(format!(
                "{} produced a double for a decimal AVG",
                self.args[self.value_index()].describe()
            ))),
            (TypeKind::Decimal, value) => Ok(value),
            (_, Value::Float64(_)) => Ok(value),
            (_, value) => value.as_f64().map(Value::Float64).ok_or_else(|| {
                Error::Internal(format!("cannot read {value} as a double"))
            }),
        }
    }

    fn value_index(&self) -> usize {
        match self.mode {
            AggMode::Final => 1,
            AggMode::Complete | AggMode::Partial => 0,
        }
    }

    /// The `(count, sum)` pair of `ctx`; the sum is `Null` for an empty group.
    pub fn export_partial(&self, ctx: &AggregateContext) -> (Value, Value) {
        (Value::Int64(ctx.count()), ctx.sum().to_value())
    }

    /// Render the partial results of `contexts` as one row per context.
    pub fn partial_batch<'a, C>(&self, contexts: C) -> Result<RecordBatch>
    where
        C: IntoIterator<Item = &'a AggregateContext>,
    {
        let schema = self.partial_schema();
        let sum_type = schema.field(1).data_type().clone();

        let mut counts = Vec::new();
        let mut sums = Vec::new();
        for ctx in contexts {
            let (count, sum) = self.export_partial(ctx);
            counts.push(count.as_i64().unwrap_or(0));
            sums.push(sum);
        }

        let sum_array = build_array(&sum_type, &sums, false)?;
        let count_array: ArrayRef = Arc::new(Int64Array::from(counts));
        Ok(RecordBatch::try_new(schema, vec![count_array, sum_array])?)
    }
}

/// Materialize `values` as an Arrow array of `data_type`.
///
/// Decimals are rounded half-even to the column scale when `round` is set and must
/// rescale exactly otherwise.
pub(crate) fn build_array(data_type: &DataType, values: &[Value], round: bool) -> Result<ArrayRef> {
    match data_type {
        DataType::Decimal256(precision, scale) => {
            let mut builder = Decimal256Builder::with_capacity(values.len())
                .with_precision_and_scale(*precision, *scale)?;
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    other => {
                        let decimal = other.as_decimal().ok_or_else(|| {
                            Error::Internal(format!("cannot store {other} in a {data_type} column"))
                        })?;
                        let fitted = if round {
                            decimal.round_half_even(*scale)?
                        } else {
                            decimal.rescale(*scale)?
                        };
                        builder.append_value(fitted.raw_value());
                    }
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in values {
                builder.append_option(value.as_f64());
            }
            Ok(Arc::new(builder.finish()))
        }
        other => Err(Error::Internal(format!(
            "AVG results cannot be stored as {other}"
        ))),
    }
}

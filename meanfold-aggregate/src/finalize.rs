//! Result production: divide, round, and convert back to the sum's domain.

use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use meanfold_result::{Error, Result};
use meanfold_types::{
    DecimalError, DecimalValue, MAX_DECIMAL_PRECISION, StatementContext, TypeKind, Value,
};

use crate::context::{AggregateContext, SumState};
use crate::output_type::target_scale;
use crate::{AvgAggregate, DIAGNOSTICS_TARGET, build_array};

impl AvgAggregate {
    /// Produce the average of `ctx`.
    ///
    /// Empty groups yield `Null`. The sum is divided keeping `div_frac_incr`
    /// digits beyond the output scale, then rounded half-even to the output scale.
    /// Fewer extra digits are kept when the sum is too wide for all of them; if
    /// not even the output scale fits, the truncated quotient is returned as is
    /// (with a diagnostic for decimal sums).
    /// A floating sum is divided in decimal and converted back to a double.
    ///
    /// Arithmetic failures along the way are reported as warnings on
    /// [`DIAGNOSTICS_TARGET`] and the best value computed so far is returned, unless
    /// `sc` asks for strict arithmetic, in which case they fail the call.
    pub fn result(&self, sc: &StatementContext, ctx: &AggregateContext) -> Result<Value> {
        let count = ctx.count();
        let (dividend, from_float) = match *ctx.sum() {
            SumState::Unset => return Ok(Value::Null),
            _ if count == 0 => return Ok(Value::Null),
            SumState::Decimal(sum) => (sum, false),
            SumState::Float(sum) => match DecimalValue::from_f64(sum) {
                Ok(exact) => (exact, true),
                Err(err) => {
                    report(sc, "convert double sum", &err)?;
                    return Ok(Value::Float64(sum / count as f64));
                }
            },
        };

        let divisor = DecimalValue::from_i64(count);
        let target_digits = u16::from(target_scale(&self.output_type, &self.limits));
        let target = clamp_scale(target_digits);
        let wanted = clamp_scale(target_digits + u16::from(self.limits.div_frac_incr));
        // The quotient never has more integer digits than the dividend.
        let div_scale = wanted.min(fraction_room(dividend));

        let quotient = match dividend.checked_div_trunc(divisor, div_scale) {
            Ok(quotient) => quotient,
            Err(err) => {
                report(sc, "divide", &err)?;
                // Dividing at the dividend's own scale never grows the value.
                dividend
                    .checked_div_trunc(divisor, dividend.scale())
                    .unwrap_or(dividend)
            }
        };
        if div_scale < target {
            // A double keeps fewer significant digits than the quotient already has.
            if !from_float {
                report(sc, "divide", &DecimalError::PrecisionOverflow { scale: target })?;
            }
            return Ok(finish(quotient, from_float));
        }

        let rounded = match quotient.round_half_even(target) {
            Ok(rounded) => rounded,
            Err(err) => {
                report(sc, "round", &err)?;
                quotient
            }
        };

        Ok(finish(rounded, from_float))
    }

    /// Arrow type of produced results: `Decimal256` at the rounding scale, or `Float64`.
    pub fn result_data_type(&self) -> DataType {
        match self.output_type.kind {
            TypeKind::Decimal => {
                let scale = target_scale(&self.output_type, &self.limits);
                self.output_type.with_scale(Some(scale)).to_arrow()
            }
            _ => DataType::Float64,
        }
    }

    pub fn result_schema(&self) -> SchemaRef {
        Arc::new(Schema::new(vec![Field::new(
            self.alias(),
            self.result_data_type(),
            true,
        )]))
    }

    /// Finalize each context into one element of the returned array.
    pub fn result_array<'a, C>(&self, sc: &StatementContext, contexts: C) -> Result<ArrayRef>
    where
        C: IntoIterator<Item = &'a AggregateContext>,
    {
        let values = contexts
            .into_iter()
            .map(|ctx| self.result(sc, ctx))
            .collect::<Result<Vec<_>>>()?;
        build_array(&self.result_data_type(), &values, true)
    }

    /// Finalize each context into one row of a single-column batch.
    pub fn result_batch<'a, C>(&self, sc: &StatementContext, contexts: C) -> Result<RecordBatch>
    where
        C: IntoIterator<Item = &'a AggregateContext>,
    {
        let array = self.result_array(sc, contexts)?;
        Ok(RecordBatch::try_new(self.result_schema(), vec![array])?)
    }
}

fn report(sc: &StatementContext, step: &'static str, err: &DecimalError) -> Result<()> {
    if sc.strict_arithmetic() {
        return Err(Error::Arithmetic(format!("AVG failed to {step}: {err}")));
    }
    tracing::warn!(
        target: DIAGNOSTICS_TARGET,
        step,
        error = %err,
        "AVG result degraded by an arithmetic error"
    );
    Ok(())
}

fn finish(average: DecimalValue, from_float: bool) -> Value {
    if from_float {
        Value::Float64(average.to_f64())
    } else {
        Value::Decimal(average)
    }
}

/// Largest scale at which `value` still fits in `MAX_DECIMAL_PRECISION` digits.
fn fraction_room(value: DecimalValue) -> i8 {
    let integer_digits = i16::from(value.precision()) - i16::from(value.scale());
    let room = i16::from(MAX_DECIMAL_PRECISION) - integer_digits.max(0);
    i8::try_from(room).unwrap_or(i8::MAX)
}

fn clamp_scale(scale: u16) -> i8 {
    i8::try_from(scale).unwrap_or(i8::MAX)
}

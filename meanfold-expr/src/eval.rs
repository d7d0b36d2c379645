//! Row-at-a-time evaluation of [`InputExpr`] over Arrow record batches.

use arrow::array::{
    Array, ArrayRef, Decimal128Array, Decimal256Array, Float32Array, Float64Array, Int8Array,
    Int16Array, Int32Array, Int64Array, LargeStringArray, RecordBatch, StringArray, UInt8Array,
    UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;
use arrow_buffer::i256;
use meanfold_result::{Error, Result};
use meanfold_types::{DecimalValue, Value};

use crate::expr::{BinaryOp, InputExpr, NestedExpr};

/// One row of a record batch, the unit aggregates consume.
#[derive(Clone, Copy, Debug)]
pub struct BatchRow<'a> {
    batch: &'a RecordBatch,
    row: usize,
}

impl<'a> BatchRow<'a> {
    pub fn new(batch: &'a RecordBatch, row: usize) -> Self {
        Self { batch, row }
    }

    /// Read the value of column `index` at this row.
    pub fn value(&self, index: usize) -> Result<Value> {
        let array = self.batch.columns().get(index).ok_or_else(|| {
            Error::InvalidArgumentError(format!(
                "column index {index} out of bounds for batch with {} columns",
                self.batch.num_columns()
            ))
        })?;
        if self.row >= array.len() {
            return Err(Error::InvalidArgumentError(format!(
                "row {} out of bounds for batch with {} rows",
                self.row,
                array.len()
            )));
        }
        read_value(array, self.row)
    }
}

macro_rules! downcast_value {
    ($array:expr, $ty:ty, $row:expr) => {
        $array
            .as_any()
            .downcast_ref::<$ty>()
            .ok_or_else(|| {
                Error::Internal(format!(
                    "array reported {:?} but is not a {}",
                    $array.data_type(),
                    stringify!($ty)
                ))
            })?
            .value($row)
    };
}

fn read_value(array: &ArrayRef, row: usize) -> Result<Value> {
    if matches!(array.data_type(), DataType::Null) || array.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match array.data_type() {
        DataType::Int8 => Value::Int64(downcast_value!(array, Int8Array, row) as i64),
        DataType::Int16 => Value::Int64(downcast_value!(array, Int16Array, row) as i64),
        DataType::Int32 => Value::Int64(downcast_value!(array, Int32Array, row) as i64),
        DataType::Int64 => Value::Int64(downcast_value!(array, Int64Array, row)),
        DataType::UInt8 => Value::Int64(downcast_value!(array, UInt8Array, row) as i64),
        DataType::UInt16 => Value::Int64(downcast_value!(array, UInt16Array, row) as i64),
        DataType::UInt32 => Value::Int64(downcast_value!(array, UInt32Array, row) as i64),
        DataType::UInt64 => {
            let raw = downcast_value!(array, UInt64Array, row);
            Value::Decimal(DecimalValue::new(i256::from_i128(raw as i128), 0)?)
        }
        DataType::Float32 => Value::Float64(downcast_value!(array, Float32Array, row) as f64),
        DataType::Float64 => Value::Float64(downcast_value!(array, Float64Array, row)),
        DataType::Decimal128(_, scale) => {
            let raw = downcast_value!(array, Decimal128Array, row);
            Value::Decimal(DecimalValue::from_i128(raw, *scale)?)
        }
        DataType::Decimal256(_, scale) => {
            let raw = downcast_value!(array, Decimal256Array, row);
            Value::Decimal(DecimalValue::new(raw, *scale)?)
        }
        DataType::Utf8 => parse_double(downcast_value!(array, StringArray, row))?,
        DataType::LargeUtf8 => parse_double(downcast_value!(array, LargeStringArray, row))?,
        other => {
            return Err(Error::ExprCast(format!(
                "cannot read {other:?} as a numeric value"
            )));
        }
    };
    Ok(value)
}

/// Text inputs are averaged as doubles.
fn parse_double(text: &str) -> Result<Value> {
    text.trim()
        .parse::<f64>()
        .map(Value::Float64)
        .map_err(|_| Error::ExprCast(format!("cannot convert '{text}' to DOUBLE")))
}

impl InputExpr {
    /// Evaluate the expression against one row.
    pub fn eval(&self, row: &BatchRow<'_>) -> Result<Value> {
        match self {
            InputExpr::Column(column) | InputExpr::PartialSum(column) => row.value(column.index),
            InputExpr::PartialCount(column) => match row.value(column.index)? {
                value @ (Value::Null | Value::Int64(_)) => Ok(value),
                other => Err(Error::ExprCast(format!(
                    "partial count must be an integer, got {other}"
                ))),
            },
            InputExpr::Literal(literal) => Ok(literal.value()),
            InputExpr::Nested(nested) => nested.eval(row),
        }
    }
}

impl NestedExpr {
    fn eval(&self, row: &BatchRow<'_>) -> Result<Value> {
        let left = self.left.eval(row)?;
        let right = self.right.eval(row)?;
        match self.op {
            BinaryOp::Add => left.checked_add(&right),
            BinaryOp::Subtract => left.checked_sub(&right),
            BinaryOp::Multiply => left.checked_mul(&right),
        }
    }
}

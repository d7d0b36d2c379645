use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Decimal128Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use meanfold_expr::{BatchRow, BinaryOp, ColumnRef, InputExpr, Literal};
use meanfold_result::Error;
use meanfold_types::{FieldType, TypeKind, Value};

fn sample_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("qty", DataType::Int32, true),
        Field::new("price", DataType::Decimal128(10, 2), true),
        Field::new("ratio", DataType::Float64, true),
        Field::new("label", DataType::Utf8, true),
        Field::new("flag", DataType::Boolean, true),
        Field::new("cnt", DataType::Int64, true),
    ]));
    let price = Decimal128Array::from(vec![Some(1050), None, Some(-25)])
        .with_precision_and_scale(10, 2)
        .unwrap();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int32Array::from(vec![Some(3), Some(7), None])),
        Arc::new(price),
        Arc::new(Float64Array::from(vec![Some(0.5), Some(1.25), None])),
        Arc::new(StringArray::from(vec![Some("2.5"), Some("abc"), None])),
        Arc::new(BooleanArray::from(vec![Some(true), None, Some(false)])),
        Arc::new(Int64Array::from(vec![Some(4), None, Some(0)])),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

#[test]
fn columns_read_with_their_numeric_domain() {
    let batch = sample_batch();
    let row = BatchRow::new(&batch, 0);
    assert_eq!(row.value(0).unwrap(), Value::Int64(3));
    assert_eq!(
        row.value(1).unwrap(),
        Value::Decimal("10.50".parse().unwrap())
    );
    assert_eq!(row.value(2).unwrap(), Value::Float64(0.5));
    assert_eq!(row.value(3).unwrap(), Value::Float64(2.5));
}

#[test]
fn nulls_evaluate_to_null() {
    let batch = sample_batch();
    let row = BatchRow::new(&batch, 2);
    for idx in [0, 2, 3] {
        assert!(row.value(idx).unwrap().is_null(), "column {idx}");
    }
    assert!(BatchRow::new(&batch, 1).value(1).unwrap().is_null());
}

#[test]
fn unparsable_text_is_a_cast_error() {
    let batch = sample_batch();
    let err = BatchRow::new(&batch, 1).value(3).unwrap_err();
    assert!(matches!(err, Error::ExprCast(msg) if msg.contains("abc")));
}

#[test]
fn unsupported_columns_fail_to_evaluate() {
    let batch = sample_batch();
    let expr = InputExpr::Column(ColumnRef::from_schema(batch.schema_ref(), "flag").unwrap());
    assert_eq!(expr.field_type().kind, TypeKind::Other);
    assert!(matches!(
        expr.eval(&BatchRow::new(&batch, 0)),
        Err(Error::ExprCast(_))
    ));
}

#[test]
fn out_of_range_references_are_rejected() {
    let batch = sample_batch();
    assert!(matches!(
        BatchRow::new(&batch, 0).value(42),
        Err(Error::InvalidArgumentError(_))
    ));
    assert!(matches!(
        BatchRow::new(&batch, 9).value(0),
        Err(Error::InvalidArgumentError(_))
    ));
}

#[test]
fn nested_arithmetic_evaluates_per_row() {
    let batch = sample_batch();
    let schema = batch.schema();
    let qty = InputExpr::Column(ColumnRef::from_schema(&schema, "qty").unwrap());
    let price = InputExpr::Column(ColumnRef::from_schema(&schema, "price").unwrap());
    let total = InputExpr::binary(BinaryOp::Multiply, qty.clone(), price);
    assert_eq!(total.field_type().kind, TypeKind::Decimal);

    let row0 = BatchRow::new(&batch, 0);
    assert_eq!(total.eval(&row0).unwrap(), Value::Decimal("31.50".parse().unwrap()));
    assert!(total.eval(&BatchRow::new(&batch, 1)).unwrap().is_null());

    let shifted = InputExpr::binary(BinaryOp::Subtract, qty, Literal::int(1).into());
    assert_eq!(shifted.eval(&row0).unwrap(), Value::Int64(2));
}

#[test]
fn partial_count_requires_integers() {
    let batch = sample_batch();
    let row = BatchRow::new(&batch, 0);
    assert_eq!(InputExpr::partial_count(5).eval(&row).unwrap(), Value::Int64(4));
    assert!(InputExpr::partial_count(5)
        .eval(&BatchRow::new(&batch, 1))
        .unwrap()
        .is_null());
    let not_an_int = InputExpr::PartialCount(ColumnRef::new(2, FieldType::bigint()));
    assert!(matches!(not_an_int.eval(&row), Err(Error::ExprCast(_))));
}

//! Input expressions fed to aggregates.
//!
//! The set of expression shapes is closed: raw column references, the two columns
//! of a partial aggregate result, typed literals, and binary arithmetic over other
//! input expressions. Every expression knows its declared [`FieldType`] without
//! looking at data, which is what output type resolution keys off.

use arrow::datatypes::Schema;
use meanfold_result::{Error, Result};
use meanfold_types::{DecimalValue, FieldType, Value};

/// Reference to a column of the batch being evaluated, with its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub index: usize,
    pub field_type: FieldType,
}

impl ColumnRef {
    pub fn new(index: usize, field_type: FieldType) -> Self {
        Self { index, field_type }
    }

    /// Resolve `name` against `schema`, deriving the declared type from the Arrow field.
    pub fn from_schema(schema: &Schema, name: &str) -> Result<Self> {
        let index = schema.index_of(name).map_err(|_| {
            Error::InvalidArgumentError(format!("unknown column '{name}' in aggregate input"))
        })?;
        let field_type = FieldType::from_arrow(schema.field(index).data_type());
        Ok(Self { index, field_type })
    }
}

/// A constant with an explicit declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    value: Value,
    field_type: FieldType,
}

impl Literal {
    pub fn int(value: i64) -> Self {
        Self {
            value: Value::Int64(value),
            field_type: FieldType::bigint(),
        }
    }

    pub fn float(value: f64) -> Self {
        Self {
            value: Value::Float64(value),
            field_type: FieldType::double(),
        }
    }

    pub fn decimal(value: DecimalValue) -> Self {
        let scale = u8::try_from(value.scale()).ok();
        Self {
            value: Value::Decimal(value),
            field_type: FieldType::decimal(u32::from(value.precision()), scale),
        }
    }

    /// A typed null.
    pub fn null(field_type: FieldType) -> Self {
        Self {
            value: Value::Null,
            field_type,
        }
    }

    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    #[inline]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
}

/// Binary arithmetic over two input expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedExpr {
    pub op: BinaryOp,
    pub left: InputExpr,
    pub right: InputExpr,
}

impl NestedExpr {
    /// Declared result type, following the usual SQL numeric promotion rules.
    pub fn field_type(&self) -> FieldType {
        let left = self.left.field_type();
        let right = self.right.field_type();
        if !left.kind.is_exact_numeric() || !right.kind.is_exact_numeric() {
            return FieldType::double();
        }
        if left.kind.is_signed_integer() && right.kind.is_signed_integer() {
            return FieldType::bigint();
        }
        let (Some(ls), Some(rs)) = (left.scale, right.scale) else {
            return FieldType::decimal(left.width.max(right.width), None);
        };
        match self.op {
            BinaryOp::Add | BinaryOp::Subtract => {
                let scale = ls.max(rs);
                let int_digits = (left.width.saturating_sub(u32::from(ls)))
                    .max(right.width.saturating_sub(u32::from(rs)));
                FieldType::decimal(int_digits + u32::from(scale) + 1, Some(scale))
            }
            BinaryOp::Multiply => {
                FieldType::decimal(left.width + right.width, Some(ls.saturating_add(rs)))
            }
        }
    }
}

/// An expression an aggregate evaluates once per input row.
#[derive(Debug, Clone, PartialEq)]
pub enum InputExpr {
    /// A raw input column.
    Column(ColumnRef),
    /// The sum column of a partial aggregate result.
    PartialSum(ColumnRef),
    /// The count column of a partial aggregate result.
    PartialCount(ColumnRef),
    Literal(Literal),
    Nested(Box<NestedExpr>),
}

impl InputExpr {
    pub fn column(index: usize, field_type: FieldType) -> Self {
        InputExpr::Column(ColumnRef::new(index, field_type))
    }

    pub fn partial_sum(index: usize, field_type: FieldType) -> Self {
        InputExpr::PartialSum(ColumnRef::new(index, field_type))
    }

    pub fn partial_count(index: usize) -> Self {
        InputExpr::PartialCount(ColumnRef::new(index, FieldType::bigint()))
    }

    pub fn literal(literal: Literal) -> Self {
        InputExpr::Literal(literal)
    }

    pub fn binary(op: BinaryOp, left: InputExpr, right: InputExpr) -> Self {
        InputExpr::Nested(Box::new(NestedExpr { op, left, right }))
    }

    /// The statically declared type of the expression.
    pub fn field_type(&self) -> FieldType {
        match self {
            InputExpr::Column(column)
            | InputExpr::PartialSum(column)
            | InputExpr::PartialCount(column) => column.field_type,
            InputExpr::Literal(literal) => literal.field_type(),
            InputExpr::Nested(nested) => nested.field_type(),
        }
    }

    /// True when the declared type is an integer or decimal family.
    pub fn is_exact_numeric(&self) -> bool {
        self.field_type().kind.is_exact_numeric()
    }

    /// Short label for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            InputExpr::Column(c) => format!("column #{}", c.index),
            InputExpr::PartialSum(c) => format!("partial sum #{}", c.index),
            InputExpr::PartialCount(c) => format!("partial count #{}", c.index),
            InputExpr::Literal(l) => format!("literal {}", l.value()),
            InputExpr::Nested(n) => {
                let op = match n.op {
                    BinaryOp::Add => "+",
                    BinaryOp::Subtract => "-",
                    BinaryOp::Multiply => "*",
                };
                format!("({} {op} {})", n.left.describe(), n.right.describe())
            }
        }
    }
}

impl From<Literal> for InputExpr {
    fn from(literal: Literal) -> Self {
        InputExpr::Literal(literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meanfold_types::TypeKind;

    #[test]
    fn nested_types_follow_numeric_promotion() {
        let int_col = InputExpr::column(0, FieldType::new(TypeKind::Int));
        let dec_col = InputExpr::column(1, FieldType::decimal(10, Some(2)));
        let dbl_col = InputExpr::column(2, FieldType::double());

        let ints = InputExpr::binary(BinaryOp::Add, int_col.clone(), int_col.clone());
        assert_eq!(ints.field_type().kind, TypeKind::BigInt);

        let mixed = InputExpr::binary(BinaryOp::Add, int_col.clone(), dec_col.clone());
        assert_eq!(mixed.field_type(), FieldType::decimal(14, Some(2)));

        let product = InputExpr::binary(BinaryOp::Multiply, dec_col.clone(), dec_col);
        assert_eq!(product.field_type().scale, Some(4));

        let approx = InputExpr::binary(BinaryOp::Subtract, int_col, dbl_col);
        assert_eq!(approx.field_type().kind, TypeKind::Double);
    }

    #[test]
    fn decimal_literals_carry_their_scale() {
        let lit = Literal::decimal("12.50".parse().unwrap());
        assert_eq!(lit.field_type(), FieldType::decimal(4, Some(2)));
    }

    #[test]
    fn describe_renders_nested_shape() {
        let expr = InputExpr::binary(
            BinaryOp::Multiply,
            InputExpr::column(3, FieldType::bigint()),
            Literal::int(2).into(),
        );
        assert_eq!(expr.describe(), "(column #3 * literal 2)");
    }
}

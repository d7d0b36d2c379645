//! Static type descriptors for input expressions and aggregate outputs.

use arrow::datatypes::{DECIMAL256_MAX_PRECISION, DataType};

/// The declared numeric family of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Decimal,
    Float,
    Double,
    /// Anything non-numeric (text, null literals, ...).
    Other,
}

impl TypeKind {
    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            TypeKind::TinyInt
                | TypeKind::SmallInt
                | TypeKind::MediumInt
                | TypeKind::Int
                | TypeKind::BigInt
        )
    }

    /// Integers and decimals: values that add without rounding.
    pub fn is_exact_numeric(self) -> bool {
        self.is_signed_integer() || self == TypeKind::Decimal
    }

    pub fn is_floating(self) -> bool {
        matches!(self, TypeKind::Float | TypeKind::Double)
    }

    /// Display width used when a type is declared without one.
    fn default_width(self) -> u32 {
        match self {
            TypeKind::TinyInt => 4,
            TypeKind::SmallInt => 6,
            TypeKind::MediumInt => 9,
            TypeKind::Int => 11,
            TypeKind::BigInt => 20,
            TypeKind::Decimal => 11,
            TypeKind::Float => 12,
            TypeKind::Double => 22,
            TypeKind::Other => 0,
        }
    }
}

/// Type descriptor consumed by the surrounding type system.
///
/// `scale` is `None` when the number of fractional digits is unspecified; consumers
/// that need a concrete scale substitute the maximum decimal scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub kind: TypeKind,
    pub width: u32,
    pub scale: Option<u8>,
    /// Binary charset and collation. Numeric results always carry it.
    pub binary: bool,
}

impl FieldType {
    /// A type of `kind` with its default width and scale.
    pub fn new(kind: TypeKind) -> Self {
        let scale = if kind.is_exact_numeric() { Some(0) } else { None };
        Self {
            kind,
            width: kind.default_width(),
            scale,
            binary: false,
        }
    }

    pub fn decimal(width: u32, scale: Option<u8>) -> Self {
        Self {
            kind: TypeKind::Decimal,
            width,
            scale,
            binary: false,
        }
    }

    pub fn double() -> Self {
        Self::new(TypeKind::Double)
    }

    pub fn bigint() -> Self {
        Self::new(TypeKind::BigInt)
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_scale(mut self, scale: Option<u8>) -> Self {
        self.scale = scale;
        self
    }

    /// Mark the type with the binary charset/collation flag.
    pub fn with_binary_collation(mut self) -> Self {
        self.binary = true;
        self
    }

    /// Derive the declared type of an Arrow column.
    pub fn from_arrow(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8 => Self::new(TypeKind::TinyInt),
            DataType::Int16 | DataType::UInt8 => Self::new(TypeKind::SmallInt),
            DataType::Int32 | DataType::UInt16 => Self::new(TypeKind::Int),
            DataType::Int64 | DataType::UInt32 => Self::new(TypeKind::BigInt),
            DataType::UInt64 => Self::decimal(20, Some(0)),
            DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
                Self::decimal(u32::from(*precision), u8::try_from(*scale).ok())
            }
            DataType::Float32 => Self::new(TypeKind::Float),
            DataType::Float64 => Self::double(),
            _ => Self::new(TypeKind::Other),
        }
    }

    /// The Arrow type used to materialize values of this type.
    pub fn to_arrow(&self) -> DataType {
        match self.kind {
            TypeKind::TinyInt => DataType::Int8,
            TypeKind::SmallInt => DataType::Int16,
            TypeKind::MediumInt | TypeKind::Int => DataType::Int32,
            TypeKind::BigInt => DataType::Int64,
            TypeKind::Decimal => {
                let scale = self.scale.unwrap_or(0).min(DECIMAL256_MAX_PRECISION);
                let precision = (self.width.min(u32::from(DECIMAL256_MAX_PRECISION)) as u8)
                    .max(scale)
                    .max(1);
                DataType::Decimal256(precision, scale as i8)
            }
            TypeKind::Float => DataType::Float32,
            TypeKind::Double => DataType::Float64,
            TypeKind::Other => DataType::Utf8,
        }
    }
}

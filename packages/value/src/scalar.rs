//! Fixed-width numeric scalars and element kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A complex number stored as separate real and imaginary parts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

/// Single-precision complex (two `f32` parts).
pub type Complex32 = Complex<f32>;

/// Double-precision complex (two `f64` parts).
pub type Complex64 = Complex<f64>;

/// The element kind of a scalar or an array.
///
/// The first thirteen kinds have an engine equivalent. The extended kinds
/// (`LongDouble`, `LongComplex`, `Object`, `RawBuffer`) can be held on the
/// host side but are rejected when marshalled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Complex64,
    Complex128,
    /// Fixed-width text elements.
    Text,
    /// Extended-precision float (80/128-bit).
    LongDouble,
    /// Extended-precision complex.
    LongComplex,
    /// Opaque host objects.
    Object,
    /// Untyped raw buffers.
    RawBuffer,
}

impl ElementKind {
    /// Whether values of this kind can cross into the engine.
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            ElementKind::LongDouble
                | ElementKind::LongComplex
                | ElementKind::Object
                | ElementKind::RawBuffer
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ElementKind::Int8
                | ElementKind::Int16
                | ElementKind::Int32
                | ElementKind::Int64
                | ElementKind::UInt8
                | ElementKind::UInt16
                | ElementKind::UInt32
                | ElementKind::UInt64
        )
    }

    pub fn is_complex(self) -> bool {
        matches!(
            self,
            ElementKind::Complex64 | ElementKind::Complex128 | ElementKind::LongComplex
        )
    }

    /// Short lowercase name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Int8 => "int8",
            ElementKind::Int16 => "int16",
            ElementKind::Int32 => "int32",
            ElementKind::Int64 => "int64",
            ElementKind::UInt8 => "uint8",
            ElementKind::UInt16 => "uint16",
            ElementKind::UInt32 => "uint32",
            ElementKind::UInt64 => "uint64",
            ElementKind::Float32 => "float32",
            ElementKind::Float64 => "float64",
            ElementKind::Complex64 => "complex64",
            ElementKind::Complex128 => "complex128",
            ElementKind::Text => "text",
            ElementKind::LongDouble => "float128",
            ElementKind::LongComplex => "complex256",
            ElementKind::Object => "object",
            ElementKind::RawBuffer => "void",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A numeric scalar with an explicit element width.
///
/// Untyped host numbers use [`Value::Int`](crate::Value::Int) and
/// [`Value::Float`](crate::Value::Float) instead.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    C64(Complex32),
    C128(Complex64),
}

impl Scalar {
    pub fn kind(&self) -> ElementKind {
        match self {
            Scalar::I8(_) => ElementKind::Int8,
            Scalar::I16(_) => ElementKind::Int16,
            Scalar::I32(_) => ElementKind::Int32,
            Scalar::I64(_) => ElementKind::Int64,
            Scalar::U8(_) => ElementKind::UInt8,
            Scalar::U16(_) => ElementKind::UInt16,
            Scalar::U32(_) => ElementKind::UInt32,
            Scalar::U64(_) => ElementKind::UInt64,
            Scalar::F32(_) => ElementKind::Float32,
            Scalar::F64(_) => ElementKind::Float64,
            Scalar::C64(_) => ElementKind::Complex64,
            Scalar::C128(_) => ElementKind::Complex128,
        }
    }

    /// The real value as `f64`, or `None` for complex scalars.
    pub fn as_f64(&self) -> Option<f64> {
        Some(match *self {
            Scalar::I8(v) => v as f64,
            Scalar::I16(v) => v as f64,
            Scalar::I32(v) => v as f64,
            Scalar::I64(v) => v as f64,
            Scalar::U8(v) => v as f64,
            Scalar::U16(v) => v as f64,
            Scalar::U32(v) => v as f64,
            Scalar::U64(v) => v as f64,
            Scalar::F32(v) => v as f64,
            Scalar::F64(v) => v,
            Scalar::C64(_) | Scalar::C128(_) => return None,
        })
    }

    /// Widen to a double-precision complex.
    pub fn to_complex(&self) -> Complex64 {
        match *self {
            Scalar::C64(c) => Complex64::new(c.re as f64, c.im as f64),
            Scalar::C128(c) => c,
            other => Complex64::new(other.as_f64().unwrap_or_default(), 0.0),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(v: $ty) -> Self {
                    Scalar::$variant(v)
                }
            }
        )*
    };
}

scalar_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Complex32 => C64,
    Complex64 => C128,
}

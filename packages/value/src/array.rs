//! Dense n-dimensional arrays.

use serde::{Deserialize, Serialize};

use crate::{Complex32, Complex64, ElementKind, MarshalError};

/// Typed, contiguous element storage for an [`NdArray`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Complex64(Vec<Complex32>),
    Complex128(Vec<Complex64>),
    Text(Vec<String>),
    /// Elements of a kind with no engine equivalent, kept as raw bytes.
    Opaque {
        kind: ElementKind,
        width: usize,
        bytes: Vec<u8>,
    },
}

impl ArrayData {
    pub fn kind(&self) -> ElementKind {
        match self {
            ArrayData::Int8(_) => ElementKind::Int8,
            ArrayData::Int16(_) => ElementKind::Int16,
            ArrayData::Int32(_) => ElementKind::Int32,
            ArrayData::Int64(_) => ElementKind::Int64,
            ArrayData::UInt8(_) => ElementKind::UInt8,
            ArrayData::UInt16(_) => ElementKind::UInt16,
            ArrayData::UInt32(_) => ElementKind::UInt32,
            ArrayData::UInt64(_) => ElementKind::UInt64,
            ArrayData::Float32(_) => ElementKind::Float32,
            ArrayData::Float64(_) => ElementKind::Float64,
            ArrayData::Complex64(_) => ElementKind::Complex64,
            ArrayData::Complex128(_) => ElementKind::Complex128,
            ArrayData::Text(_) => ElementKind::Text,
            ArrayData::Opaque { kind, .. } => *kind,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int8(v) => v.len(),
            ArrayData::Int16(v) => v.len(),
            ArrayData::Int32(v) => v.len(),
            ArrayData::Int64(v) => v.len(),
            ArrayData::UInt8(v) => v.len(),
            ArrayData::UInt16(v) => v.len(),
            ArrayData::UInt32(v) => v.len(),
            ArrayData::UInt64(v) => v.len(),
            ArrayData::Float32(v) => v.len(),
            ArrayData::Float64(v) => v.len(),
            ArrayData::Complex64(v) => v.len(),
            ArrayData::Complex128(v) => v.len(),
            ArrayData::Text(v) => v.len(),
            ArrayData::Opaque { width, bytes, .. } => bytes.len().checked_div(*width).unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element types that can back an [`NdArray`].
pub trait Element: Sized + Clone {
    fn wrap(data: Vec<Self>) -> ArrayData;
    fn slice(data: &ArrayData) -> Option<&[Self]>;
}

macro_rules! element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                fn wrap(data: Vec<Self>) -> ArrayData {
                    ArrayData::$variant(data)
                }

                fn slice(data: &ArrayData) -> Option<&[Self]> {
                    match data {
                        ArrayData::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

element! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    Complex32 => Complex64,
    Complex64 => Complex128,
    String => Text,
}

/// A dense n-dimensional array in row-major (C) order.
///
/// The shape always matches the number of stored elements; every
/// constructor checks it.
///
/// `logical` marks int8 arrays holding engine booleans, so that they go back
/// to the engine as logical arrays rather than plain integers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNdArray")]
pub struct NdArray {
    shape: Vec<usize>,
    data: ArrayData,
    logical: bool,
}

/// Deserialized fields, checked by [`NdArray::new`] before use.
#[derive(Deserialize)]
struct RawNdArray {
    shape: Vec<usize>,
    data: ArrayData,
    #[serde(default)]
    logical: bool,
}

impl TryFrom<RawNdArray> for NdArray {
    type Error = MarshalError;

    fn try_from(raw: RawNdArray) -> Result<Self, MarshalError> {
        Ok(NdArray::new(raw.shape, raw.data)?.with_logical(raw.logical))
    }
}

impl NdArray {
    /// Create an array, checking that `shape` matches the element count.
    ///
    /// Opaque data must also hold a whole number of `width`-byte elements.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, MarshalError> {
        let expected = shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d));
        let whole = match &data {
            ArrayData::Opaque { width, bytes, .. } => {
                expected.and_then(|n| n.checked_mul(*width)) == Some(bytes.len())
            }
            _ => true,
        };
        if expected != Some(data.len()) || !whole {
            return Err(MarshalError::ShapeMismatch {
                shape,
                len: data.len(),
            });
        }
        Ok(Self {
            shape,
            data,
            logical: false,
        })
    }

    /// A one-dimensional array.
    pub fn from_vec<T: Element>(data: Vec<T>) -> Self {
        Self {
            shape: vec![data.len()],
            data: T::wrap(data),
            logical: false,
        }
    }

    /// An array with an explicit shape.
    pub fn from_shape_vec<T: Element>(shape: Vec<usize>, data: Vec<T>) -> Result<Self, MarshalError> {
        Self::new(shape, T::wrap(data))
    }

    /// A logical (boolean) array, stored as int8.
    pub fn logical(shape: Vec<usize>, data: Vec<bool>) -> Result<Self, MarshalError> {
        let data = data.into_iter().map(i8::from).collect();
        let mut array = Self::new(shape, ArrayData::Int8(data))?;
        array.logical = true;
        Ok(array)
    }

    /// An array of an extended kind, held as `width` bytes per element.
    pub fn opaque(
        kind: ElementKind,
        shape: Vec<usize>,
        width: usize,
        bytes: Vec<u8>,
    ) -> Result<Self, MarshalError> {
        Self::new(shape, ArrayData::Opaque { kind, width, bytes })
    }

    /// Set the logical tag. Only int8 arrays can carry it.
    #[must_use]
    pub fn with_logical(mut self, logical: bool) -> Self {
        self.logical = logical && matches!(self.data, ArrayData::Int8(_));
        self
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn kind(&self) -> ElementKind {
        self.data.kind()
    }

    pub fn is_logical(&self) -> bool {
        self.logical
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// Borrow the elements if the array holds `T`.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    /// Reinterpret with a new shape of the same element count.
    pub fn reshape(self, shape: Vec<usize>) -> Result<Self, MarshalError> {
        let logical = self.logical;
        Ok(Self::new(shape, self.data)?.with_logical(logical))
    }

    /// Real elements widened to `f64`. `None` for complex, text or opaque data.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        fn widen<T: Copy + Into<f64>>(v: &[T]) -> Vec<f64> {
            v.iter().map(|&x| x.into()).collect()
        }
        Some(match &self.data {
            ArrayData::Int8(v) => widen(v),
            ArrayData::Int16(v) => widen(v),
            ArrayData::Int32(v) => widen(v),
            ArrayData::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayData::UInt8(v) => widen(v),
            ArrayData::UInt16(v) => widen(v),
            ArrayData::UInt32(v) => widen(v),
            ArrayData::UInt64(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayData::Float32(v) => widen(v),
            ArrayData::Float64(v) => v.clone(),
            _ => return None,
        })
    }
}

//! The engine's value model, as stored in a container.
//!
//! All multi-element data is column-major, the engine's native order.

use std::fmt;

/// Numeric class of an engine matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericClass {
    Double,
    Single,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl NumericClass {
    /// The engine's name for the class.
    pub fn name(self) -> &'static str {
        match self {
            NumericClass::Double => "double",
            NumericClass::Single => "single",
            NumericClass::Int8 => "int8",
            NumericClass::Int16 => "int16",
            NumericClass::Int32 => "int32",
            NumericClass::Int64 => "int64",
            NumericClass::UInt8 => "uint8",
            NumericClass::UInt16 => "uint16",
            NumericClass::UInt32 => "uint32",
            NumericClass::UInt64 => "uint64",
        }
    }
}

impl fmt::Display for NumericClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column-major numeric storage, one variant per class.
#[derive(Clone, Debug, PartialEq)]
pub enum NumericData {
    Double(Vec<f64>),
    Single(Vec<f32>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
}

impl NumericData {
    pub fn class(&self) -> NumericClass {
        match self {
            NumericData::Double(_) => NumericClass::Double,
            NumericData::Single(_) => NumericClass::Single,
            NumericData::Int8(_) => NumericClass::Int8,
            NumericData::Int16(_) => NumericClass::Int16,
            NumericData::Int32(_) => NumericClass::Int32,
            NumericData::Int64(_) => NumericClass::Int64,
            NumericData::UInt8(_) => NumericClass::UInt8,
            NumericData::UInt16(_) => NumericClass::UInt16,
            NumericData::UInt32(_) => NumericClass::UInt32,
            NumericData::UInt64(_) => NumericClass::UInt64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NumericData::Double(v) => v.len(),
            NumericData::Single(v) => v.len(),
            NumericData::Int8(v) => v.len(),
            NumericData::Int16(v) => v.len(),
            NumericData::Int32(v) => v.len(),
            NumericData::Int64(v) => v.len(),
            NumericData::UInt8(v) => v.len(),
            NumericData::UInt16(v) => v.len(),
            NumericData::UInt32(v) => v.len(),
            NumericData::UInt64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A numeric (or logical) matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericArray {
    pub dims: Vec<usize>,
    pub real: NumericData,
    /// Imaginary parts; same class and length as `real`.
    pub imag: Option<NumericData>,
    /// Engine logical flag.
    pub logical: bool,
}

impl NumericArray {
    pub fn real(dims: Vec<usize>, real: NumericData) -> Self {
        Self {
            dims,
            real,
            imag: None,
            logical: false,
        }
    }

    pub fn class(&self) -> NumericClass {
        self.real.class()
    }

    pub fn is_complex(&self) -> bool {
        self.imag.is_some()
    }
}

/// Character data as stored in the container.
#[derive(Clone, Debug, PartialEq)]
pub enum CharData {
    /// One byte per element; UTF-8 when decoded row by row.
    Utf8(Vec<u8>),
    /// One UTF-16 code unit per element.
    Utf16(Vec<u16>),
}

impl CharData {
    pub fn len(&self) -> usize {
        match self {
            CharData::Utf8(v) => v.len(),
            CharData::Utf16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A char matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct CharArray {
    pub dims: Vec<usize>,
    pub data: CharData,
}

/// A cell array.
#[derive(Clone, Debug, PartialEq)]
pub struct CellArray {
    pub dims: Vec<usize>,
    pub cells: Vec<ContainerRecord>,
}

/// A struct array. `elements[i][f]` is field `fields[f]` of element `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct StructArray {
    pub dims: Vec<usize>,
    pub fields: Vec<String>,
    pub elements: Vec<Vec<ContainerRecord>>,
}

/// One engine value.
#[derive(Clone, Debug, PartialEq)]
pub enum ContainerRecord {
    Numeric(NumericArray),
    Char(CharArray),
    Cell(CellArray),
    Struct(StructArray),
    /// A sparse matrix. Recognised so it can be rejected with a clear error.
    Sparse { dims: Vec<usize> },
    /// A class object. Recognised so it can be rejected with a clear error.
    Object { class_name: String },
}

impl ContainerRecord {
    /// A 1x1 double.
    pub fn scalar(v: f64) -> Self {
        ContainerRecord::Numeric(NumericArray::real(vec![1, 1], NumericData::Double(vec![v])))
    }

    pub fn dims(&self) -> &[usize] {
        match self {
            ContainerRecord::Numeric(a) => &a.dims,
            ContainerRecord::Char(a) => &a.dims,
            ContainerRecord::Cell(a) => &a.dims,
            ContainerRecord::Struct(a) => &a.dims,
            ContainerRecord::Sparse { dims } => dims,
            ContainerRecord::Object { .. } => &[],
        }
    }

    /// Engine class name of the record.
    pub fn class_name(&self) -> &str {
        match self {
            ContainerRecord::Numeric(a) if a.logical => "logical",
            ContainerRecord::Numeric(a) => a.class().name(),
            ContainerRecord::Char(_) => "char",
            ContainerRecord::Cell(_) => "cell",
            ContainerRecord::Struct(_) => "struct",
            ContainerRecord::Sparse { .. } => "sparse",
            ContainerRecord::Object { class_name } => class_name,
        }
    }
}

/// Number of elements described by `dims`, or `None` if it overflows.
pub fn numel(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Named records, in order. This is the content of one container file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, ContainerRecord)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing an earlier binding of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, record: ContainerRecord) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = record,
            None => self.entries.push((name, record)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ContainerRecord> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, record)| record)
    }

    pub fn remove(&mut self, name: &str) -> Option<ContainerRecord> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContainerRecord)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, ContainerRecord)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (N, ContainerRecord)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (name, record) in iter {
            bindings.insert(name, record);
        }
        bindings
    }
}

impl IntoIterator for Bindings {
    type Item = (String, ContainerRecord);
    type IntoIter = std::vec::IntoIter<(String, ContainerRecord)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

//! MAT-file level 5 codec.
//!
//! Writes uncompressed little-endian files that the engine loads with a plain
//! `load`, and reads files the engine writes with `save -v6` in either byte
//! order. Compressed (`-v7`) variables and HDF5-based (`-v7.3`) files are
//! rejected with [`ContainerError::Unsupported`].
//!
//! The array-flags word carries a native logical bit, so boolean values
//! survive a round trip through the engine.

mod reader;
mod writer;

use std::fs;
use std::path::Path;

use bytes::Bytes;

use crate::{Bindings, ContainerCodec, ContainerError, NumericClass};

pub(crate) const HEADER_LEN: usize = 128;
pub(crate) const HEADER_TEXT: &str = "MATLAB 5.0 MAT-file, written by octbridge";
pub(crate) const VERSION: u16 = 0x0100;

// Data element types
pub(crate) const MI_INT8: u32 = 1;
pub(crate) const MI_UINT8: u32 = 2;
pub(crate) const MI_INT16: u32 = 3;
pub(crate) const MI_UINT16: u32 = 4;
pub(crate) const MI_INT32: u32 = 5;
pub(crate) const MI_UINT32: u32 = 6;
pub(crate) const MI_SINGLE: u32 = 7;
pub(crate) const MI_DOUBLE: u32 = 9;
pub(crate) const MI_INT64: u32 = 12;
pub(crate) const MI_UINT64: u32 = 13;
pub(crate) const MI_MATRIX: u32 = 14;
pub(crate) const MI_COMPRESSED: u32 = 15;
pub(crate) const MI_UTF8: u32 = 16;
pub(crate) const MI_UTF16: u32 = 17;

// Array classes
pub(crate) const MX_CELL: u8 = 1;
pub(crate) const MX_STRUCT: u8 = 2;
pub(crate) const MX_OBJECT: u8 = 3;
pub(crate) const MX_CHAR: u8 = 4;
pub(crate) const MX_SPARSE: u8 = 5;

// Array flag bits
pub(crate) const FLAG_COMPLEX: u32 = 0x0800;
pub(crate) const FLAG_LOGICAL: u32 = 0x0200;

pub(crate) fn class_code(class: NumericClass) -> u8 {
    match class {
        NumericClass::Double => 6,
        NumericClass::Single => 7,
        NumericClass::Int8 => 8,
        NumericClass::UInt8 => 9,
        NumericClass::Int16 => 10,
        NumericClass::UInt16 => 11,
        NumericClass::Int32 => 12,
        NumericClass::UInt32 => 13,
        NumericClass::Int64 => 14,
        NumericClass::UInt64 => 15,
    }
}

pub(crate) fn class_from_code(code: u8) -> Option<NumericClass> {
    Some(match code {
        6 => NumericClass::Double,
        7 => NumericClass::Single,
        8 => NumericClass::Int8,
        9 => NumericClass::UInt8,
        10 => NumericClass::Int16,
        11 => NumericClass::UInt16,
        12 => NumericClass::Int32,
        13 => NumericClass::UInt32,
        14 => NumericClass::Int64,
        15 => NumericClass::UInt64,
        _ => return None,
    })
}

/// Bytes needed to pad `len` to the next 8-byte boundary.
pub(crate) fn padding(len: usize) -> usize {
    (8 - len % 8) % 8
}

/// MAT-file level 5 implementation of [`ContainerCodec`].
///
/// # Example
///
/// ```rust
/// use octbridge_container::{Bindings, ContainerRecord, Mat5Codec};
///
/// let codec = Mat5Codec;
/// let mut bindings = Bindings::new();
/// bindings.insert("x", ContainerRecord::scalar(4.0));
///
/// let bytes = codec.encode(&bindings).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), bindings);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Mat5Codec;

impl Mat5Codec {
    /// Serialize bindings to MAT bytes. Deterministic for equal input.
    pub fn encode(&self, bindings: &Bindings) -> Result<Bytes, ContainerError> {
        writer::encode(bindings)
    }

    /// Parse MAT bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<Bindings, ContainerError> {
        reader::decode(bytes)
    }
}

impl ContainerCodec for Mat5Codec {
    fn read(&self, path: &Path) -> Result<Bindings, ContainerError> {
        let bytes = fs::read(path).map_err(|e| ContainerError::io(path, e))?;
        tracing::trace!(path = %path.display(), len = bytes.len(), "reading container");
        self.decode(&bytes)
    }

    fn write(&self, path: &Path, bindings: &Bindings) -> Result<(), ContainerError> {
        let bytes = self.encode(bindings)?;
        tracing::trace!(path = %path.display(), len = bytes.len(), "writing container");
        fs::write(path, &bytes).map_err(|e| ContainerError::io(path, e))
    }

    fn extension(&self) -> &'static str {
        "mat"
    }
}

//! Little-endian MAT v5 writer.

use bytes::{BufMut, Bytes, BytesMut};

use super::*;
use crate::{numel, CharData, ContainerRecord, NumericData};

pub(super) fn encode(bindings: &Bindings) -> Result<Bytes, ContainerError> {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + 64 * bindings.len());
    write_header(&mut buf);
    for (name, record) in bindings.iter() {
        write_matrix(&mut buf, name, record)?;
    }
    Ok(buf.freeze())
}

fn write_header(buf: &mut BytesMut) {
    // No timestamp, so equal bindings give equal bytes.
    let mut text = [b' '; 116];
    text[..HEADER_TEXT.len()].copy_from_slice(HEADER_TEXT.as_bytes());
    buf.put_slice(&text);
    buf.put_bytes(0, 8);
    buf.put_u16_le(VERSION);
    buf.put_slice(b"IM");
}

/// Write one data element, using the packed small format for 1..=4 bytes.
fn write_element(buf: &mut BytesMut, mi_type: u32, payload: &[u8]) {
    if (1..=4).contains(&payload.len()) {
        buf.put_u32_le(((payload.len() as u32) << 16) | mi_type);
        buf.put_slice(payload);
        buf.put_bytes(0, 4 - payload.len());
    } else {
        buf.put_u32_le(mi_type);
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(payload);
        buf.put_bytes(0, padding(payload.len()));
    }
}

macro_rules! le_bytes {
    ($values:expr) => {
        $values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>()
    };
}

fn write_numeric(buf: &mut BytesMut, data: &NumericData) {
    let (mi_type, payload) = match data {
        NumericData::Double(v) => (MI_DOUBLE, le_bytes!(v)),
        NumericData::Single(v) => (MI_SINGLE, le_bytes!(v)),
        NumericData::Int8(v) => (MI_INT8, le_bytes!(v)),
        NumericData::Int16(v) => (MI_INT16, le_bytes!(v)),
        NumericData::Int32(v) => (MI_INT32, le_bytes!(v)),
        NumericData::Int64(v) => (MI_INT64, le_bytes!(v)),
        NumericData::UInt8(v) => (MI_UINT8, v.clone()),
        NumericData::UInt16(v) => (MI_UINT16, le_bytes!(v)),
        NumericData::UInt32(v) => (MI_UINT32, le_bytes!(v)),
        NumericData::UInt64(v) => (MI_UINT64, le_bytes!(v)),
    };
    write_element(buf, mi_type, &payload);
}

/// Array flags, dimensions and name: the head of every matrix element.
fn write_prelude(
    buf: &mut BytesMut,
    flags: u32,
    dims: &[usize],
    name: &str,
) -> Result<(), ContainerError> {
    let mut flag_bytes = Vec::with_capacity(8);
    flag_bytes.extend(flags.to_le_bytes());
    flag_bytes.extend(0u32.to_le_bytes());
    write_element(buf, MI_UINT32, &flag_bytes);

    // At least two dimensions.
    let rank = dims.len().max(2);
    let mut dim_bytes = Vec::with_capacity(4 * rank);
    for d in dims.iter().copied().chain(std::iter::repeat(1)).take(rank) {
        let d = i32::try_from(d)
            .map_err(|_| ContainerError::Unsupported(format!("dimension {d} is too large")))?;
        dim_bytes.extend(d.to_le_bytes());
    }
    write_element(buf, MI_INT32, &dim_bytes);

    write_element(buf, MI_INT8, name.as_bytes());
    Ok(())
}

fn check_len(what: &str, dims: &[usize], len: usize) -> Result<(), ContainerError> {
    if numel(dims) == Some(len) {
        Ok(())
    } else {
        Err(ContainerError::malformed(
            0,
            format!("{what} with dims {dims:?} holds {len} elements"),
        ))
    }
}

fn write_matrix(
    buf: &mut BytesMut,
    name: &str,
    record: &ContainerRecord,
) -> Result<(), ContainerError> {
    let mut body = BytesMut::new();

    match record {
        ContainerRecord::Numeric(array) => {
            check_len("numeric array", &array.dims, array.real.len())?;
            let mut flags = class_code(array.class()) as u32;
            if let Some(imag) = &array.imag {
                if imag.class() != array.class() || imag.len() != array.real.len() {
                    return Err(ContainerError::malformed(
                        0,
                        "imaginary part does not match real part",
                    ));
                }
                flags |= FLAG_COMPLEX;
            }
            if array.logical {
                flags |= FLAG_LOGICAL;
            }
            write_prelude(&mut body, flags, &array.dims, name)?;
            write_numeric(&mut body, &array.real);
            if let Some(imag) = &array.imag {
                write_numeric(&mut body, imag);
            }
        }
        ContainerRecord::Char(array) => {
            check_len("char array", &array.dims, array.data.len())?;
            write_prelude(&mut body, MX_CHAR as u32, &array.dims, name)?;
            match &array.data {
                CharData::Utf8(bytes) => write_element(&mut body, MI_UINT8, bytes),
                CharData::Utf16(units) => write_element(&mut body, MI_UINT16, &le_bytes!(units)),
            }
        }
        ContainerRecord::Cell(array) => {
            check_len("cell array", &array.dims, array.cells.len())?;
            write_prelude(&mut body, MX_CELL as u32, &array.dims, name)?;
            for cell in &array.cells {
                write_matrix(&mut body, "", cell)?;
            }
        }
        ContainerRecord::Struct(array) => {
            check_len("struct array", &array.dims, array.elements.len())?;
            if array.elements.iter().any(|e| e.len() != array.fields.len()) {
                return Err(ContainerError::malformed(
                    0,
                    "struct element does not match field list",
                ));
            }
            write_prelude(&mut body, MX_STRUCT as u32, &array.dims, name)?;

            let name_len = array.fields.iter().map(String::len).max().unwrap_or(0) + 1;
            let name_len_i32 = i32::try_from(name_len)
                .map_err(|_| ContainerError::Unsupported("field name is too long".to_string()))?;
            write_element(&mut body, MI_INT32, &name_len_i32.to_le_bytes());

            let mut names = vec![0u8; name_len * array.fields.len()];
            for (slot, field) in names.chunks_mut(name_len).zip(&array.fields) {
                slot[..field.len()].copy_from_slice(field.as_bytes());
            }
            write_element(&mut body, MI_INT8, &names);

            for element in &array.elements {
                for value in element {
                    write_matrix(&mut body, "", value)?;
                }
            }
        }
        ContainerRecord::Sparse { .. } | ContainerRecord::Object { .. } => {
            return Err(ContainerError::Unsupported(format!(
                "cannot write {} values",
                record.class_name()
            )));
        }
    }

    write_element(buf, MI_MATRIX, &body);
    Ok(())
}

//! Engine records to host values.

use octbridge_container::{
    numel, Bindings, CellArray, CharArray, CharData, ContainerRecord, NumericArray, NumericClass,
    NumericData, StructArray,
};
use octbridge_value::{
    ArrayData, Complex32, Complex64, MarshalError, NdArray, Scalar, StructValue, Value,
};

use crate::layout::to_row_major;

/// Convert the record bound to `name` back into a host value.
pub fn decode(record: &ContainerRecord, name: &str) -> Result<Value, MarshalError> {
    match record {
        ContainerRecord::Numeric(array) => decode_numeric(array, name),
        ContainerRecord::Char(array) => decode_char(array, name),
        ContainerRecord::Cell(array) => decode_cell(array, name),
        ContainerRecord::Struct(array) => decode_struct(array, name),
        ContainerRecord::Sparse { .. } => Err(unsupported(name, "sparse")),
        ContainerRecord::Object { class_name } => {
            Err(unsupported(name, format!("`{class_name}` object")))
        }
    }
}

/// Decode every binding, keeping file order.
pub fn decode_bindings(bindings: &Bindings) -> Result<Vec<(String, Value)>, MarshalError> {
    bindings
        .iter()
        .map(|(name, record)| Ok((name.to_string(), decode(record, name)?)))
        .collect()
}

fn unsupported(name: &str, what: impl Into<String>) -> MarshalError {
    MarshalError::UnsupportedRecord {
        name: name.to_string(),
        what: what.into(),
    }
}

/// Engine dims to host shape: row and column vectors become one-dimensional.
fn host_shape(dims: &[usize]) -> Vec<usize> {
    match dims {
        [1, n] | [n, 1] => vec![*n],
        _ => dims.to_vec(),
    }
}

fn widen(data: &NumericData) -> Vec<f64> {
    macro_rules! as_f64 {
        ($v:expr) => {
            $v.iter().map(|&x| x as f64).collect()
        };
    }
    match data {
        NumericData::Double(v) => v.clone(),
        NumericData::Single(v) => as_f64!(v),
        NumericData::Int8(v) => as_f64!(v),
        NumericData::Int16(v) => as_f64!(v),
        NumericData::Int32(v) => as_f64!(v),
        NumericData::Int64(v) => as_f64!(v),
        NumericData::UInt8(v) => as_f64!(v),
        NumericData::UInt16(v) => as_f64!(v),
        NumericData::UInt32(v) => as_f64!(v),
        NumericData::UInt64(v) => as_f64!(v),
    }
}

fn decode_numeric(array: &NumericArray, name: &str) -> Result<Value, MarshalError> {
    if array.real.is_empty() {
        return Err(MarshalError::EmptyArray {
            name: name.to_string(),
        });
    }
    let dims = &array.dims;

    if array.logical {
        let bits: Vec<bool> = widen(&array.real).into_iter().map(|x| x != 0.0).collect();
        if let [bit] = bits[..] {
            return Ok(Value::Bool(bit));
        }
        return Ok(Value::Array(NdArray::logical(
            host_shape(dims),
            to_row_major(&bits, dims),
        )?));
    }

    if let Some(imag) = &array.imag {
        let re = widen(&array.real);
        let im = widen(imag);
        if array.class() == NumericClass::Single {
            let values: Vec<Complex32> = re
                .iter()
                .zip(&im)
                .map(|(&re, &im)| Complex32::new(re as f32, im as f32))
                .collect();
            if let [c] = values[..] {
                return Ok(Value::Scalar(Scalar::C64(c)));
            }
            let data = ArrayData::Complex64(to_row_major(&values, dims));
            return Ok(Value::Array(NdArray::new(host_shape(dims), data)?));
        }

        let values: Vec<Complex64> = re
            .iter()
            .zip(&im)
            .map(|(&re, &im)| Complex64::new(re, im))
            .collect();
        if let [c] = values[..] {
            return Ok(Value::Scalar(Scalar::C128(c)));
        }
        let data = ArrayData::Complex128(to_row_major(&values, dims));
        return Ok(Value::Array(NdArray::new(host_shape(dims), data)?));
    }

    if array.real.len() == 1 {
        return Ok(match &array.real {
            NumericData::Double(v) => Value::Float(v[0]),
            NumericData::Int64(v) => Value::Int(v[0]),
            NumericData::Single(v) => Value::typed(v[0]),
            NumericData::Int8(v) => Value::typed(v[0]),
            NumericData::Int16(v) => Value::typed(v[0]),
            NumericData::Int32(v) => Value::typed(v[0]),
            NumericData::UInt8(v) => Value::typed(v[0]),
            NumericData::UInt16(v) => Value::typed(v[0]),
            NumericData::UInt32(v) => Value::typed(v[0]),
            NumericData::UInt64(v) => Value::typed(v[0]),
        });
    }

    macro_rules! rows {
        ($variant:ident, $v:expr) => {
            ArrayData::$variant(to_row_major($v, dims))
        };
    }
    let data = match &array.real {
        NumericData::Double(v) => rows!(Float64, v),
        NumericData::Single(v) => rows!(Float32, v),
        NumericData::Int8(v) => rows!(Int8, v),
        NumericData::Int16(v) => rows!(Int16, v),
        NumericData::Int32(v) => rows!(Int32, v),
        NumericData::Int64(v) => rows!(Int64, v),
        NumericData::UInt8(v) => rows!(UInt8, v),
        NumericData::UInt16(v) => rows!(UInt16, v),
        NumericData::UInt32(v) => rows!(UInt32, v),
        NumericData::UInt64(v) => rows!(UInt64, v),
    };
    Ok(Value::Array(NdArray::new(host_shape(dims), data)?))
}

/// Engine chars are bytes; UTF-8 when valid, Latin-1 otherwise.
fn text_from_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

fn text_from_units(units: Vec<u16>, name: &str) -> Result<String, MarshalError> {
    if units.iter().all(|&u| u <= 0xff) {
        return Ok(text_from_bytes(units.into_iter().map(|u| u as u8).collect()));
    }
    String::from_utf16(&units).map_err(|_| MarshalError::InvalidText {
        name: name.to_string(),
    })
}

fn decode_char(array: &CharArray, name: &str) -> Result<Value, MarshalError> {
    if array.data.is_empty() {
        return Ok(Value::Text(String::new()));
    }
    let (rows, cols) = match array.dims[..] {
        [rows, cols, ref rest @ ..] if numel(rest) == Some(1) => (rows, cols),
        _ => return Err(unsupported(name, "multi-dimensional char")),
    };

    let row = |r: usize| -> Result<String, MarshalError> {
        match &array.data {
            CharData::Utf8(bytes) => Ok(text_from_bytes(
                (0..cols).map(|c| bytes[r + rows * c]).collect(),
            )),
            CharData::Utf16(units) => {
                text_from_units((0..cols).map(|c| units[r + rows * c]).collect(), name)
            }
        }
    };

    if rows == 1 {
        return row(0).map(Value::Text);
    }
    (0..rows)
        .map(|r| row(r).map(Value::Text))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Sequence)
}

fn decode_cell(array: &CellArray, name: &str) -> Result<Value, MarshalError> {
    let cell = |i: usize| decode(&array.cells[i], &format!("{name}{{{}}}", i + 1));

    if array.cells.is_empty() {
        return Ok(Value::Sequence(Vec::new()));
    }
    match host_shape(&array.dims)[..] {
        [n] => (0..n)
            .map(cell)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        [rows, cols] => (0..rows)
            .map(|r| {
                (0..cols)
                    .map(|c| cell(r + rows * c))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Sequence)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        _ => Err(unsupported(name, "multi-dimensional cell")),
    }
}

fn decode_struct(array: &StructArray, name: &str) -> Result<Value, MarshalError> {
    let mut out = StructValue::with_capacity(array.fields.len());

    if let [element] = &array.elements[..] {
        for (field, record) in array.fields.iter().zip(element) {
            out.insert(field.as_str(), decode(record, &format!("{name}.{field}"))?);
        }
        return Ok(Value::Struct(out));
    }

    // A struct array becomes one struct whose fields hold per-element values.
    for (f, field) in array.fields.iter().enumerate() {
        let values = array
            .elements
            .iter()
            .enumerate()
            .map(|(i, element)| {
                let label = format!("{name}({}).{field}", i + 1);
                match element.get(f) {
                    Some(record) => decode(record, &label),
                    None => Err(unsupported(&label, "ragged struct")),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        out.insert(field.as_str(), Value::Sequence(values));
    }
    Ok(Value::Struct(out))
}

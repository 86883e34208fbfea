//! MAT v5 reader for either byte order.

use bytes::Buf;

use super::*;
use crate::{
    numel, CellArray, CharArray, CharData, ContainerRecord, NumericArray, NumericData,
    StructArray,
};

pub(super) fn decode(bytes: &[u8]) -> Result<Bindings, ContainerError> {
    if bytes.len() < HEADER_LEN {
        return Err(ContainerError::malformed(0, "shorter than the file header"));
    }

    let big_endian = match &bytes[126..128] {
        b"IM" => false,
        b"MI" => true,
        _ => return Err(ContainerError::malformed(126, "bad endian indicator")),
    };
    let mut version = &bytes[124..126];
    let version = if big_endian {
        version.get_u16()
    } else {
        version.get_u16_le()
    };
    if version != VERSION {
        return Err(ContainerError::Unsupported(format!(
            "file version 0x{version:04x}; save with -v6"
        )));
    }

    let mut cursor = Cursor::new(&bytes[HEADER_LEN..], HEADER_LEN, big_endian);
    let mut bindings = Bindings::new();
    // Some writers leave a few trailing bytes after the last element.
    while cursor.remaining() >= 8 {
        let element = cursor.element()?;
        match element.mi_type {
            MI_MATRIX => {
                let (name, record) = parse_matrix(&element, big_endian)?;
                bindings.insert(name, record);
            }
            MI_COMPRESSED => {
                return Err(ContainerError::Unsupported(
                    "compressed variables; save with -v6".to_string(),
                ))
            }
            other => {
                return Err(ContainerError::malformed(
                    element.offset,
                    format!("expected a matrix element, found type {other}"),
                ))
            }
        }
    }
    Ok(bindings)
}

struct Element<'a> {
    mi_type: u32,
    data: &'a [u8],
    /// Absolute offset of `data` in the file.
    offset: usize,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
    big_endian: bool,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], base: usize, big_endian: bool) -> Self {
        Self {
            data,
            pos: 0,
            base,
            big_endian,
        }
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ContainerError> {
        if n > self.remaining() {
            return Err(ContainerError::malformed(
                self.offset(),
                format!("need {n} bytes, {} left", self.remaining()),
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, ContainerError> {
        let mut word = self.take(4)?;
        Ok(if self.big_endian {
            word.get_u32()
        } else {
            word.get_u32_le()
        })
    }

    fn element(&mut self) -> Result<Element<'a>, ContainerError> {
        let tag_offset = self.offset();
        let first = self.u32()?;

        if first >> 16 != 0 {
            let len = (first >> 16) as usize;
            if len > 4 {
                return Err(ContainerError::malformed(
                    tag_offset,
                    format!("small element claims {len} bytes"),
                ));
            }
            let offset = self.offset();
            let data = self.take(4)?;
            return Ok(Element {
                mi_type: first & 0xffff,
                data: &data[..len],
                offset,
            });
        }

        let len = self.u32()? as usize;
        let offset = self.offset();
        let data = self.take(len)?;
        // Compressed elements are not padded, and the last element may not be.
        let pad = padding(len).min(self.remaining());
        if first != MI_COMPRESSED {
            self.pos += pad;
        }
        Ok(Element {
            mi_type: first,
            data,
            offset,
        })
    }

    fn expect(&mut self, what: &str) -> Result<Element<'a>, ContainerError> {
        if self.remaining() == 0 {
            return Err(ContainerError::malformed(
                self.offset(),
                format!("missing {what}"),
            ));
        }
        self.element()
    }
}

macro_rules! read_vec {
    ($data:expr, $big:expr, $size:expr, $be:ident, $le:ident) => {{
        let mut src: &[u8] = $data;
        let mut out = Vec::with_capacity(src.len() / $size);
        while src.remaining() >= $size {
            out.push(if $big { src.$be() } else { src.$le() });
        }
        out
    }};
}

/// Numbers as stored, before conversion to the declared class.
enum Stored {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

fn element_size(mi_type: u32) -> Option<usize> {
    Some(match mi_type {
        MI_INT8 | MI_UINT8 | MI_UTF8 => 1,
        MI_INT16 | MI_UINT16 | MI_UTF16 => 2,
        MI_INT32 | MI_UINT32 | MI_SINGLE => 4,
        MI_INT64 | MI_UINT64 | MI_DOUBLE => 8,
        _ => return None,
    })
}

fn stored_numbers(element: &Element<'_>, big: bool) -> Result<Stored, ContainerError> {
    let size = element_size(element.mi_type).ok_or_else(|| {
        ContainerError::malformed(
            element.offset,
            format!("element type {} is not numeric", element.mi_type),
        )
    })?;
    if element.data.len() % size != 0 {
        return Err(ContainerError::malformed(
            element.offset,
            format!("{} bytes is not a multiple of {size}", element.data.len()),
        ));
    }

    let data = element.data;
    Ok(match element.mi_type {
        MI_INT8 => Stored::I8(read_vec!(data, big, 1, get_i8, get_i8)),
        MI_UINT8 | MI_UTF8 => Stored::U8(data.to_vec()),
        MI_INT16 => Stored::I16(read_vec!(data, big, 2, get_i16, get_i16_le)),
        MI_UINT16 | MI_UTF16 => Stored::U16(read_vec!(data, big, 2, get_u16, get_u16_le)),
        MI_INT32 => Stored::I32(read_vec!(data, big, 4, get_i32, get_i32_le)),
        MI_UINT32 => Stored::U32(read_vec!(data, big, 4, get_u32, get_u32_le)),
        MI_INT64 => Stored::I64(read_vec!(data, big, 8, get_i64, get_i64_le)),
        MI_UINT64 => Stored::U64(read_vec!(data, big, 8, get_u64, get_u64_le)),
        MI_SINGLE => Stored::F32(read_vec!(data, big, 4, get_f32, get_f32_le)),
        _ => Stored::F64(read_vec!(data, big, 8, get_f64, get_f64_le)),
    })
}

macro_rules! cast_stored {
    ($stored:expr, $t:ty) => {
        match $stored {
            Stored::I8(v) => v.into_iter().map(|x| x as $t).collect(),
            Stored::U8(v) => v.into_iter().map(|x| x as $t).collect(),
            Stored::I16(v) => v.into_iter().map(|x| x as $t).collect(),
            Stored::U16(v) => v.into_iter().map(|x| x as $t).collect(),
            Stored::I32(v) => v.into_iter().map(|x| x as $t).collect(),
            Stored::U32(v) => v.into_iter().map(|x| x as $t).collect(),
            Stored::I64(v) => v.into_iter().map(|x| x as $t).collect(),
            Stored::U64(v) => v.into_iter().map(|x| x as $t).collect(),
            Stored::F32(v) => v.into_iter().map(|x| x as $t).collect(),
            Stored::F64(v) => v.into_iter().map(|x| x as $t).collect(),
        }
    };
}

/// Writers may store data in the narrowest type that holds it.
fn to_class(stored: Stored, class: NumericClass) -> NumericData {
    match class {
        NumericClass::Double => NumericData::Double(cast_stored!(stored, f64)),
        NumericClass::Single => NumericData::Single(cast_stored!(stored, f32)),
        NumericClass::Int8 => NumericData::Int8(cast_stored!(stored, i8)),
        NumericClass::Int16 => NumericData::Int16(cast_stored!(stored, i16)),
        NumericClass::Int32 => NumericData::Int32(cast_stored!(stored, i32)),
        NumericClass::Int64 => NumericData::Int64(cast_stored!(stored, i64)),
        NumericClass::UInt8 => NumericData::UInt8(cast_stored!(stored, u8)),
        NumericClass::UInt16 => NumericData::UInt16(cast_stored!(stored, u16)),
        NumericClass::UInt32 => NumericData::UInt32(cast_stored!(stored, u32)),
        NumericClass::UInt64 => NumericData::UInt64(cast_stored!(stored, u64)),
    }
}

fn char_data(element: &Element<'_>, big: bool) -> Result<CharData, ContainerError> {
    Ok(match stored_numbers(element, big)? {
        Stored::U8(bytes) => CharData::Utf8(bytes),
        Stored::I8(bytes) => CharData::Utf8(bytes.into_iter().map(|b| b as u8).collect()),
        Stored::U16(units) => CharData::Utf16(units),
        other => CharData::Utf16(cast_stored!(other, u16)),
    })
}

fn check_len(offset: usize, dims: &[usize], len: usize) -> Result<(), ContainerError> {
    if numel(dims) == Some(len) {
        Ok(())
    } else {
        Err(ContainerError::malformed(
            offset,
            format!("dims {dims:?} but {len} elements"),
        ))
    }
}

/// Field-less struct arrays carry no bytes per element, so their size is
/// capped separately.
const FIELDLESS_LIMIT: usize = 1 << 16;

/// Element count of a cell or struct array whose elements follow in `cur`.
/// Each nested element takes at least one 8-byte tag.
fn nested_count(
    offset: usize,
    dims: &[usize],
    per_element: usize,
    cur: &Cursor<'_>,
) -> Result<usize, ContainerError> {
    let count = numel(dims)
        .ok_or_else(|| ContainerError::malformed(offset, format!("dims {dims:?} overflow")))?;
    let fits = match count.checked_mul(per_element) {
        Some(0) => count <= FIELDLESS_LIMIT,
        Some(n) => n <= cur.remaining() / 8,
        None => false,
    };
    if fits {
        Ok(count)
    } else {
        Err(ContainerError::malformed(
            offset,
            format!("dims {dims:?} need more elements than the data holds"),
        ))
    }
}

fn parse_matrix(
    element: &Element<'_>,
    big: bool,
) -> Result<(String, ContainerRecord), ContainerError> {
    let mut cur = Cursor::new(element.data, element.offset, big);

    // An empty matrix element stands for an empty double.
    if cur.remaining() == 0 {
        return Ok((
            String::new(),
            ContainerRecord::Numeric(NumericArray::real(vec![0, 0], NumericData::Double(vec![]))),
        ));
    }

    let flags_el = cur.expect("array flags")?;
    let flags = match stored_numbers(&flags_el, big)? {
        Stored::U32(words) if !words.is_empty() => words[0],
        _ => return Err(ContainerError::malformed(flags_el.offset, "bad array flags")),
    };
    let class = (flags & 0xff) as u8;

    let dims_el = cur.expect("dimensions")?;
    let dims = match stored_numbers(&dims_el, big)? {
        Stored::I32(dims) => dims
            .into_iter()
            .map(usize::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ContainerError::malformed(dims_el.offset, "negative dimension"))?,
        _ => return Err(ContainerError::malformed(dims_el.offset, "bad dimensions")),
    };

    let name_el = cur.expect("array name")?;
    let name = String::from_utf8_lossy(name_el.data)
        .trim_end_matches('\0')
        .to_string();

    let record = match class {
        MX_CELL => {
            let count = nested_count(dims_el.offset, &dims, 1, &cur)?;
            let cells = (0..count)
                .map(|_| nested_matrix(&mut cur, big))
                .collect::<Result<Vec<_>, _>>()?;
            ContainerRecord::Cell(CellArray { dims, cells })
        }
        MX_STRUCT => {
            let len_el = cur.expect("field name length")?;
            let name_len = match stored_numbers(&len_el, big)? {
                Stored::I32(v) if v.first().is_some_and(|&n| n > 0) => v[0] as usize,
                _ => return Err(ContainerError::malformed(len_el.offset, "bad field name length")),
            };
            let names_el = cur.expect("field names")?;
            let fields: Vec<String> = names_el
                .data
                .chunks(name_len)
                .map(|chunk| {
                    let end = chunk.iter().position(|&b| b == 0).unwrap_or(chunk.len());
                    String::from_utf8_lossy(&chunk[..end]).into_owned()
                })
                .collect();

            let count = nested_count(dims_el.offset, &dims, fields.len(), &cur)?;
            let mut elements = Vec::with_capacity(count);
            for _ in 0..count {
                let element = fields
                    .iter()
                    .map(|_| nested_matrix(&mut cur, big))
                    .collect::<Result<Vec<_>, _>>()?;
                elements.push(element);
            }
            ContainerRecord::Struct(StructArray {
                dims,
                fields,
                elements,
            })
        }
        MX_OBJECT => {
            let class_el = cur.expect("class name")?;
            ContainerRecord::Object {
                class_name: String::from_utf8_lossy(class_el.data).into_owned(),
            }
        }
        MX_CHAR => {
            let data = if cur.remaining() == 0 {
                CharData::Utf8(Vec::new())
            } else {
                char_data(&cur.element()?, big)?
            };
            check_len(element.offset, &dims, data.len())?;
            ContainerRecord::Char(CharArray { dims, data })
        }
        MX_SPARSE => ContainerRecord::Sparse { dims },
        code => {
            let class = class_from_code(code).ok_or_else(|| {
                ContainerError::Unsupported(format!("array class {code} in {name:?}"))
            })?;
            let real_el = cur.expect("real part")?;
            let real = to_class(stored_numbers(&real_el, big)?, class);
            check_len(real_el.offset, &dims, real.len())?;

            let imag = if flags & FLAG_COMPLEX != 0 {
                let imag_el = cur.expect("imaginary part")?;
                let imag = to_class(stored_numbers(&imag_el, big)?, class);
                check_len(imag_el.offset, &dims, imag.len())?;
                Some(imag)
            } else {
                None
            };

            ContainerRecord::Numeric(NumericArray {
                dims,
                real,
                imag,
                logical: flags & FLAG_LOGICAL != 0,
            })
        }
    };

    Ok((name, record))
}

fn nested_matrix(cur: &mut Cursor<'_>, big: bool) -> Result<ContainerRecord, ContainerError> {
    let element = cur.expect("nested matrix")?;
    if element.mi_type != MI_MATRIX {
        return Err(ContainerError::malformed(
            element.offset,
            format!("expected a matrix element, found type {}", element.mi_type),
        ));
    }
    Ok(parse_matrix(&element, big)?.1)
}

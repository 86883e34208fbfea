//! Host values to engine records.

use std::fmt;

use octbridge_container::{
    Bindings, CellArray, CharArray, CharData, ContainerRecord, NumericArray, NumericClass,
    NumericData, StructArray,
};
use octbridge_value::{
    is_identifier, ArrayData, Complex64, MarshalError, NdArray, Scalar, StructValue, Value,
};

use crate::layout::to_column_major;

/// Convert `value` into the record bound to `name` in the engine.
///
/// `name` only labels errors; it is not validated here.
pub fn encode(value: &Value, name: &str) -> Result<ContainerRecord, MarshalError> {
    match value {
        // The engine has no null.
        Value::Null => Ok(ContainerRecord::scalar(f64::NAN)),
        Value::Bool(b) => Ok(logical(vec![1, 1], vec![i8::from(*b)])),
        Value::Int(i) => Ok(numeric(vec![1, 1], NumericData::Int64(vec![*i]))),
        Value::Float(f) => Ok(ContainerRecord::scalar(*f)),
        Value::Scalar(s) => Ok(encode_scalar(s)),
        Value::Text(text) => Ok(char_row(text)),
        Value::Sequence(items) => encode_sequence(items, name),
        Value::Struct(fields) => encode_struct(fields, name),
        Value::Array(array) => encode_array(array, name),
    }
}

/// Encode named values into one set of bindings.
pub fn encode_bindings<'a, I>(entries: I) -> Result<Bindings, MarshalError>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    entries
        .into_iter()
        .map(|(name, value)| Ok((name, encode(value, name)?)))
        .collect()
}

fn numeric(dims: Vec<usize>, real: NumericData) -> ContainerRecord {
    ContainerRecord::Numeric(NumericArray::real(dims, real))
}

fn complex(dims: Vec<usize>, values: &[Complex64]) -> ContainerRecord {
    ContainerRecord::Numeric(NumericArray {
        dims,
        real: NumericData::Double(values.iter().map(|c| c.re).collect()),
        imag: Some(NumericData::Double(values.iter().map(|c| c.im).collect())),
        logical: false,
    })
}

fn logical(dims: Vec<usize>, values: Vec<i8>) -> ContainerRecord {
    ContainerRecord::Numeric(NumericArray {
        dims,
        real: NumericData::Int8(values),
        imag: None,
        logical: true,
    })
}

fn char_row(text: &str) -> ContainerRecord {
    let bytes = text.as_bytes().to_vec();
    ContainerRecord::Char(CharArray {
        dims: vec![1, bytes.len()],
        data: CharData::Utf8(bytes),
    })
}

fn text_cell<'a>(texts: impl ExactSizeIterator<Item = &'a str>) -> ContainerRecord {
    ContainerRecord::Cell(CellArray {
        dims: vec![1, texts.len()],
        cells: texts.map(char_row).collect(),
    })
}

fn encode_scalar(scalar: &Scalar) -> ContainerRecord {
    let one = vec![1, 1];
    match *scalar {
        Scalar::I8(v) => numeric(one, NumericData::Int8(vec![v])),
        Scalar::I16(v) => numeric(one, NumericData::Int16(vec![v])),
        Scalar::I32(v) => numeric(one, NumericData::Int32(vec![v])),
        Scalar::I64(v) => numeric(one, NumericData::Int64(vec![v])),
        Scalar::U8(v) => numeric(one, NumericData::UInt8(vec![v])),
        Scalar::U16(v) => numeric(one, NumericData::UInt16(vec![v])),
        Scalar::U32(v) => numeric(one, NumericData::UInt32(vec![v])),
        Scalar::U64(v) => numeric(one, NumericData::UInt64(vec![v])),
        Scalar::F32(v) => ContainerRecord::scalar(f64::from(v)),
        Scalar::F64(v) => ContainerRecord::scalar(v),
        Scalar::C64(_) | Scalar::C128(_) => complex(one, &[scalar.to_complex()]),
    }
}

fn encode_struct(fields: &StructValue, name: &str) -> Result<ContainerRecord, MarshalError> {
    let mut names = Vec::with_capacity(fields.len());
    let mut element = Vec::with_capacity(fields.len());
    for (key, value) in fields.iter() {
        if !is_identifier(key) {
            return Err(MarshalError::InvalidFieldName {
                name: name.to_string(),
                field: key.to_string(),
            });
        }
        names.push(key.to_string());
        element.push(encode(value, &format!("{name}.{key}"))?);
    }

    Ok(ContainerRecord::Struct(StructArray {
        dims: vec![1, 1],
        fields: names,
        elements: vec![element],
    }))
}

/// Host shape to engine dims: the engine needs at least two.
fn engine_dims(shape: &[usize]) -> Vec<usize> {
    match shape {
        [] => vec![1, 1],
        [n] => vec![1, *n],
        _ => shape.to_vec(),
    }
}

fn encode_array(array: &NdArray, name: &str) -> Result<ContainerRecord, MarshalError> {
    let kind = array.kind();
    if !kind.is_supported() {
        return Err(MarshalError::UnsupportedKind {
            name: name.to_string(),
            kind,
        });
    }
    if array.is_empty() {
        return Err(MarshalError::EmptyArray {
            name: name.to_string(),
        });
    }

    let shape = array.shape();
    let dims = engine_dims(shape);

    macro_rules! real {
        ($variant:ident, $v:expr) => {
            NumericData::$variant(to_column_major($v, shape))
        };
    }

    let real = match array.data() {
        ArrayData::Int8(v) if array.is_logical() => {
            return Ok(logical(dims, to_column_major(v, shape)))
        }
        ArrayData::Int8(v) => real!(Int8, v),
        ArrayData::Int16(v) => real!(Int16, v),
        ArrayData::Int32(v) => real!(Int32, v),
        ArrayData::Int64(v) => real!(Int64, v),
        ArrayData::UInt8(v) => real!(UInt8, v),
        ArrayData::UInt16(v) => real!(UInt16, v),
        ArrayData::UInt32(v) => real!(UInt32, v),
        ArrayData::UInt64(v) => real!(UInt64, v),
        ArrayData::Float32(v) => {
            NumericData::Double(to_column_major(v, shape).into_iter().map(f64::from).collect())
        }
        ArrayData::Float64(v) => real!(Double, v),
        ArrayData::Complex64(v) => {
            let widened: Vec<Complex64> = v
                .iter()
                .map(|c| Complex64::new(f64::from(c.re), f64::from(c.im)))
                .collect();
            return Ok(complex(dims, &to_column_major(&widened, shape)));
        }
        ArrayData::Complex128(v) => return Ok(complex(dims, &to_column_major(v, shape))),
        ArrayData::Text(texts) => {
            if shape.len() > 1 {
                return Err(MarshalError::NestedText {
                    name: name.to_string(),
                });
            }
            return Ok(text_cell(texts.iter().map(String::as_str)));
        }
        ArrayData::Opaque { kind, .. } => {
            return Err(MarshalError::UnsupportedKind {
                name: name.to_string(),
                kind: *kind,
            })
        }
    };

    Ok(numeric(dims, real))
}

/// Common class of a run of numeric scalars.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Promoted {
    Logical,
    Real(NumericClass),
    Complex,
}

fn scalar_class(value: &Value) -> Option<Promoted> {
    Some(match value {
        Value::Bool(_) => Promoted::Logical,
        Value::Null | Value::Float(_) => Promoted::Real(NumericClass::Double),
        Value::Int(_) => Promoted::Real(NumericClass::Int64),
        Value::Scalar(s) => match s {
            Scalar::I8(_) => Promoted::Real(NumericClass::Int8),
            Scalar::I16(_) => Promoted::Real(NumericClass::Int16),
            Scalar::I32(_) => Promoted::Real(NumericClass::Int32),
            Scalar::I64(_) => Promoted::Real(NumericClass::Int64),
            Scalar::U8(_) => Promoted::Real(NumericClass::UInt8),
            Scalar::U16(_) => Promoted::Real(NumericClass::UInt16),
            Scalar::U32(_) => Promoted::Real(NumericClass::UInt32),
            Scalar::U64(_) => Promoted::Real(NumericClass::UInt64),
            Scalar::F32(_) | Scalar::F64(_) => Promoted::Real(NumericClass::Double),
            Scalar::C64(_) | Scalar::C128(_) => Promoted::Complex,
        },
        _ => return None,
    })
}

/// All the same class keeps it; any complex wins, then any double; other
/// mixes of integers and booleans become int64.
fn promote(items: &[Value]) -> Option<Promoted> {
    let mut classes = items.iter().map(scalar_class);
    let first = classes.next()??;
    classes.try_fold(first, |acc, class| {
        let class = class?;
        Some(match (acc, class) {
            _ if acc == class => acc,
            (Promoted::Complex, _) | (_, Promoted::Complex) => Promoted::Complex,
            (Promoted::Real(NumericClass::Double), _) | (_, Promoted::Real(NumericClass::Double)) => {
                Promoted::Real(NumericClass::Double)
            }
            _ => Promoted::Real(NumericClass::Int64),
        })
    })
}

/// A numeric scalar in the widest form that keeps its value.
#[derive(Clone, Copy)]
enum Number {
    Signed(i64),
    Unsigned(u64),
    Real(f64),
    Complex(Complex64),
}

fn number(value: &Value) -> Number {
    match value {
        Value::Bool(b) => Number::Signed(i64::from(*b)),
        Value::Int(i) => Number::Signed(*i),
        Value::Float(f) => Number::Real(*f),
        Value::Scalar(s) => match *s {
            Scalar::I8(v) => Number::Signed(v.into()),
            Scalar::I16(v) => Number::Signed(v.into()),
            Scalar::I32(v) => Number::Signed(v.into()),
            Scalar::I64(v) => Number::Signed(v),
            Scalar::U8(v) => Number::Unsigned(v.into()),
            Scalar::U16(v) => Number::Unsigned(v.into()),
            Scalar::U32(v) => Number::Unsigned(v.into()),
            Scalar::U64(v) => Number::Unsigned(v),
            Scalar::F32(v) => Number::Real(v.into()),
            Scalar::F64(v) => Number::Real(v),
            Scalar::C64(_) | Scalar::C128(_) => Number::Complex(s.to_complex()),
        },
        _ => Number::Real(f64::NAN),
    }
}

impl Number {
    /// The exact double for this number, if there is one.
    fn to_f64(self) -> Option<f64> {
        match self {
            Number::Signed(v) => {
                let f = v as f64;
                (f as i128 == i128::from(v)).then_some(f)
            }
            Number::Unsigned(v) => {
                let f = v as f64;
                (f as u128 == u128::from(v)).then_some(f)
            }
            Number::Real(v) => Some(v),
            Number::Complex(c) => (c.im == 0.0).then_some(c.re),
        }
    }

    fn to_complex(self) -> Option<Complex64> {
        match self {
            Number::Complex(c) => Some(c),
            other => other.to_f64().map(|re| Complex64::new(re, 0.0)),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Signed(v) => write!(f, "{v}"),
            Number::Unsigned(v) => write!(f, "{v}"),
            Number::Real(v) => write!(f, "{v}"),
            Number::Complex(c) => write!(f, "{}{:+}i", c.re, c.im),
        }
    }
}

fn out_of_range(name: &str, number: Number, class: &str) -> MarshalError {
    MarshalError::OutOfRange {
        name: name.to_string(),
        value: number.to_string(),
        class: class.to_string(),
    }
}

macro_rules! checked_integers {
    ($numbers:expr, $t:ty, $class:expr, $name:expr) => {
        $numbers
            .iter()
            .map(|&n| {
                let v = match n {
                    Number::Signed(v) => <$t>::try_from(v).ok(),
                    Number::Unsigned(v) => <$t>::try_from(v).ok(),
                    Number::Real(_) | Number::Complex(_) => None,
                };
                v.ok_or_else(|| out_of_range($name, n, $class.name()))
            })
            .collect::<Result<Vec<$t>, MarshalError>>()?
    };
}

/// A row of numbers in the promoted class. Items that class cannot hold
/// exactly are rejected.
fn numeric_row(
    items: &[Value],
    promoted: Promoted,
    name: &str,
) -> Result<ContainerRecord, MarshalError> {
    let numbers: Vec<Number> = items.iter().map(number).collect();
    let dims = vec![1, numbers.len()];

    let class = match promoted {
        Promoted::Logical => {
            let values = numbers
                .iter()
                .map(|n| i8::from(matches!(n, Number::Signed(v) if *v != 0)))
                .collect();
            return Ok(logical(dims, values));
        }
        Promoted::Complex => {
            let values = numbers
                .iter()
                .map(|&n| n.to_complex().ok_or_else(|| out_of_range(name, n, "complex double")))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(complex(dims, &values));
        }
        Promoted::Real(class) => class,
    };

    let real = match class {
        NumericClass::Double | NumericClass::Single => {
            let values = numbers
                .iter()
                .map(|&n| n.to_f64().ok_or_else(|| out_of_range(name, n, "double")))
                .collect::<Result<Vec<_>, _>>()?;
            NumericData::Double(values)
        }
        NumericClass::Int8 => NumericData::Int8(checked_integers!(numbers, i8, class, name)),
        NumericClass::Int16 => NumericData::Int16(checked_integers!(numbers, i16, class, name)),
        NumericClass::Int32 => NumericData::Int32(checked_integers!(numbers, i32, class, name)),
        NumericClass::Int64 => NumericData::Int64(checked_integers!(numbers, i64, class, name)),
        NumericClass::UInt8 => NumericData::UInt8(checked_integers!(numbers, u8, class, name)),
        NumericClass::UInt16 => NumericData::UInt16(checked_integers!(numbers, u16, class, name)),
        NumericClass::UInt32 => NumericData::UInt32(checked_integers!(numbers, u32, class, name)),
        NumericClass::UInt64 => NumericData::UInt64(checked_integers!(numbers, u64, class, name)),
    };
    Ok(numeric(dims, real))
}

/// Whether text appears anywhere below `value`.
fn contains_text(value: &Value) -> bool {
    match value {
        Value::Text(_) => true,
        Value::Sequence(items) => items.iter().any(contains_text),
        Value::Array(array) => matches!(array.data(), ArrayData::Text(_)),
        _ => false,
    }
}

fn encode_sequence(items: &[Value], name: &str) -> Result<ContainerRecord, MarshalError> {
    if items.is_empty() {
        return Err(MarshalError::EmptyArray {
            name: name.to_string(),
        });
    }

    let has_text = items.iter().any(|v| matches!(v, Value::Text(_)));
    let has_nested = items.iter().any(|v| matches!(v, Value::Sequence(_)));
    if has_text && has_nested {
        return Err(MarshalError::MixedText {
            name: name.to_string(),
        });
    }
    if items
        .iter()
        .any(|v| matches!(v, Value::Sequence(_)) && contains_text(v))
    {
        return Err(MarshalError::NestedText {
            name: name.to_string(),
        });
    }

    let texts: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
    if let Some(texts) = texts {
        return Ok(text_cell(texts.into_iter()));
    }

    if let Some(promoted) = promote(items) {
        return numeric_row(items, promoted, name);
    }

    let cells = items
        .iter()
        .enumerate()
        .map(|(i, item)| encode(item, &format!("{name}{{{}}}", i + 1)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ContainerRecord::Cell(CellArray {
        dims: vec![1, cells.len()],
        cells,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use octbridge_value::{Complex32, ElementKind};

    fn dims(record: &ContainerRecord) -> Vec<usize> {
        record.dims().to_vec()
    }

    fn numeric_data(record: &ContainerRecord) -> &NumericArray {
        match record {
            ContainerRecord::Numeric(array) => array,
            other => panic!("expected numeric, got {other:?}"),
        }
    }

    #[test]
    fn null_is_nan() {
        let record = encode(&Value::Null, "x").unwrap();
        match &numeric_data(&record).real {
            NumericData::Double(v) => assert!(v[0].is_nan()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bool_is_logical_int8() {
        let record = encode(&Value::Bool(true), "x").unwrap();
        let array = numeric_data(&record);
        assert!(array.logical);
        assert_eq!(array.real, NumericData::Int8(vec![1]));
    }

    #[test]
    fn scalars_keep_their_class() {
        let record = encode(&Value::Int(7), "x").unwrap();
        assert_eq!(numeric_data(&record).real, NumericData::Int64(vec![7]));

        let record = encode(&Value::typed(7u16), "x").unwrap();
        assert_eq!(numeric_data(&record).real, NumericData::UInt16(vec![7]));

        let record = encode(&Value::typed(1.5f32), "x").unwrap();
        assert_eq!(numeric_data(&record).real, NumericData::Double(vec![1.5]));

        let record = encode(&Value::from(Complex32::new(1.0, 2.0)), "x").unwrap();
        let array = numeric_data(&record);
        assert_eq!(array.real, NumericData::Double(vec![1.0]));
        assert_eq!(array.imag, Some(NumericData::Double(vec![2.0])));
    }

    #[test]
    fn text_is_char_row() {
        let record = encode(&Value::from("spam"), "x").unwrap();
        assert_eq!(
            record,
            ContainerRecord::Char(CharArray {
                dims: vec![1, 4],
                data: CharData::Utf8(b"spam".to_vec()),
            })
        );
    }

    #[test]
    fn text_sequence_is_cell() {
        let record = encode(&Value::from(vec!["a", "bcd"]), "x").unwrap();
        match record {
            ContainerRecord::Cell(cell) => {
                assert_eq!(cell.dims, [1, 2]);
                assert_eq!(cell.cells[1], char_row("bcd"));
            }
            other => panic!("expected cell, got {other:?}"),
        }
    }

    #[test]
    fn nested_and_mixed_text_are_rejected() {
        let nested = Value::from(vec![vec!["spam", "eggs"], vec!["foo", "bar"]]);
        assert_eq!(
            encode(&nested, "x"),
            Err(MarshalError::NestedText {
                name: "x".to_string()
            })
        );

        let mixed = Value::Sequence(vec![Value::from("a"), Value::from(vec![1, 2])]);
        assert_eq!(
            encode(&mixed, "x"),
            Err(MarshalError::MixedText {
                name: "x".to_string()
            })
        );

        let text_matrix = NdArray::from_shape_vec(
            vec![2, 1],
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();
        assert!(matches!(
            encode(&Value::from(text_matrix), "x"),
            Err(MarshalError::NestedText { .. })
        ));
    }

    #[test]
    fn numeric_sequences_promote() {
        let cases: Vec<(Value, NumericData)> = vec![
            (Value::from(vec![1, 2, 3]), NumericData::Int64(vec![1, 2, 3])),
            (
                Value::Sequence(vec![Value::Int(1), Value::Float(2.5)]),
                NumericData::Double(vec![1.0, 2.5]),
            ),
            (
                Value::Sequence(vec![Value::typed(1u8), Value::typed(2u8)]),
                NumericData::UInt8(vec![1, 2]),
            ),
            (
                Value::Sequence(vec![Value::typed(1u8), Value::typed(-2i16)]),
                NumericData::Int64(vec![1, -2]),
            ),
            (
                Value::Sequence(vec![Value::Bool(true), Value::Int(5)]),
                NumericData::Int64(vec![1, 5]),
            ),
        ];
        for (value, expected) in cases {
            let record = encode(&value, "x").unwrap();
            assert_eq!(dims(&record), [1, expected.len()]);
            assert_eq!(numeric_data(&record).real, expected, "{value:?}");
        }
    }

    #[test]
    fn mixed_sequences_reject_values_outside_the_class() {
        let wide = Value::Sequence(vec![Value::typed(u64::MAX), Value::typed(-1i8)]);
        assert_eq!(
            encode(&wide, "v"),
            Err(MarshalError::OutOfRange {
                name: "v".to_string(),
                value: u64::MAX.to_string(),
                class: "int64".to_string(),
            })
        );

        let inexact = Value::Sequence(vec![Value::Int(i64::MAX), Value::Float(0.5)]);
        assert!(matches!(
            encode(&inexact, "v"),
            Err(MarshalError::OutOfRange { ref class, .. }) if class == "double"
        ));

        let big = Value::Sequence(vec![
            Value::typed(u64::MAX),
            Value::from(Complex64::new(0.0, 1.0)),
        ]);
        assert!(matches!(
            encode(&big, "v"),
            Err(MarshalError::OutOfRange { .. })
        ));
    }

    #[test]
    fn mixed_sequences_keep_values_that_fit() {
        let small = Value::Sequence(vec![Value::typed(5u64), Value::typed(-1i8)]);
        let record = encode(&small, "v").unwrap();
        assert_eq!(numeric_data(&record).real, NumericData::Int64(vec![5, -1]));

        let exact = Value::Sequence(vec![Value::Int(1 << 53), Value::Float(1.0)]);
        let record = encode(&exact, "v").unwrap();
        assert_eq!(
            numeric_data(&record).real,
            NumericData::Double(vec![9007199254740992.0, 1.0])
        );

        // Same-class sequences never narrow.
        let same = Value::Sequence(vec![Value::typed(u64::MAX), Value::typed(0u64)]);
        let record = encode(&same, "v").unwrap();
        assert_eq!(numeric_data(&record).real, NumericData::UInt64(vec![u64::MAX, 0]));
    }

    #[test]
    fn null_in_sequence_is_nan() {
        let value = Value::Sequence(vec![Value::Int(1), Value::Null]);
        let record = encode(&value, "x").unwrap();
        match &numeric_data(&record).real {
            NumericData::Double(v) => {
                assert_eq!(v[0], 1.0);
                assert!(v[1].is_nan());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bool_and_complex_sequences() {
        let record = encode(&Value::from(vec![true, false]), "x").unwrap();
        let array = numeric_data(&record);
        assert!(array.logical);
        assert_eq!(array.real, NumericData::Int8(vec![1, 0]));

        let value = Value::Sequence(vec![Value::Int(1), Value::from(Complex64::new(0.0, 1.0))]);
        let record = encode(&value, "x").unwrap();
        let array = numeric_data(&record);
        assert_eq!(array.real, NumericData::Double(vec![1.0, 0.0]));
        assert_eq!(array.imag, Some(NumericData::Double(vec![0.0, 1.0])));
    }

    #[test]
    fn heterogeneous_sequence_is_cell() {
        let value = Value::Sequence(vec![Value::from("a"), Value::Int(1)]);
        let record = encode(&value, "x").unwrap();
        assert!(matches!(record, ContainerRecord::Cell(ref c) if c.cells.len() == 2));

        let ragged = Value::from(vec![vec![1, 2], vec![3, 4, 5]]);
        match encode(&ragged, "x").unwrap() {
            ContainerRecord::Cell(cell) => assert_eq!(dims(&cell.cells[1]), [1, 3]),
            other => panic!("expected cell, got {other:?}"),
        }
    }

    #[test]
    fn struct_keeps_field_order() {
        let mut s = StructValue::new();
        s.insert("zeta", 1);
        s.insert("alpha", "a");
        let record = encode(&Value::from(s), "s").unwrap();
        match record {
            ContainerRecord::Struct(array) => {
                assert_eq!(array.fields, ["zeta", "alpha"]);
                assert_eq!(array.dims, [1, 1]);
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn bad_field_names_are_rejected() {
        let mut s = StructValue::new();
        s.insert("inner", StructValue::new());
        s.path_mut(&["inner"]).unwrap().insert("not valid", 1);
        assert_eq!(
            encode(&Value::from(s), "s"),
            Err(MarshalError::InvalidFieldName {
                name: "s.inner".to_string(),
                field: "not valid".to_string(),
            })
        );
    }

    #[test]
    fn arrays_become_column_major() {
        let array = NdArray::from_shape_vec(vec![2, 3], vec![1i32, 2, 3, 4, 5, 6]).unwrap();
        let record = encode(&Value::from(array), "m").unwrap();
        assert_eq!(dims(&record), [2, 3]);
        assert_eq!(
            numeric_data(&record).real,
            NumericData::Int32(vec![1, 4, 2, 5, 3, 6])
        );
    }

    #[test]
    fn one_dimensional_array_is_row() {
        let record = encode(&Value::from(NdArray::from_vec(vec![1.0f32, 2.0])), "v").unwrap();
        assert_eq!(dims(&record), [1, 2]);
        assert_eq!(numeric_data(&record).real, NumericData::Double(vec![1.0, 2.0]));
    }

    #[test]
    fn rejected_kinds() {
        for kind in [
            ElementKind::LongDouble,
            ElementKind::LongComplex,
            ElementKind::Object,
            ElementKind::RawBuffer,
        ] {
            let array = NdArray::opaque(kind, vec![2], 16, vec![0; 32]).unwrap();
            assert_eq!(
                encode(&Value::from(array), "bad"),
                Err(MarshalError::UnsupportedKind {
                    name: "bad".to_string(),
                    kind
                })
            );
        }
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(matches!(
            encode(&Value::Sequence(vec![]), "e"),
            Err(MarshalError::EmptyArray { .. })
        ));
        let empty = NdArray::from_shape_vec(vec![0, 3], Vec::<f64>::new()).unwrap();
        assert!(matches!(
            encode(&Value::from(empty), "e"),
            Err(MarshalError::EmptyArray { .. })
        ));
    }

    #[test]
    fn nested_errors_name_the_cell() {
        let bad = NdArray::opaque(ElementKind::Object, vec![1], 8, vec![0; 8]).unwrap();
        let value = Value::Sequence(vec![Value::Int(1), Value::from(bad)]);
        assert!(matches!(
            encode(&value, "args"),
            Err(MarshalError::UnsupportedKind { ref name, .. }) if name == "args{2}"
        ));
    }

    #[test]
    fn bindings_keep_order() {
        let x = Value::Int(1);
        let y = Value::from("y");
        let bindings = encode_bindings([("x", &x), ("y", &y)]).unwrap();
        assert_eq!(bindings.names().collect::<Vec<_>>(), ["x", "y"]);
    }
}

//! Values through the bridge and the MAT codec and back.

use octbridge_bridge::{decode, decode_bindings, encode, encode_bindings};
use octbridge_container::{Bindings, Mat5Codec};
use octbridge_value::{
    Complex32, Complex64, ElementKind, MarshalError, NdArray, Scalar, StructValue, Value,
};
use proptest::prelude::*;

/// Encode, write MAT bytes, parse them, decode.
fn through_container(value: &Value) -> Value {
    let record = encode(value, "v").unwrap();
    let mut bindings = Bindings::new();
    bindings.insert("v", record);

    let bytes = Mat5Codec.encode(&bindings).unwrap();
    let parsed = Mat5Codec.decode(&bytes).unwrap();
    decode(parsed.get("v").unwrap(), "v").unwrap()
}

#[test]
fn scalars_roundtrip() {
    let cases = [
        Value::Bool(true),
        Value::Bool(false),
        Value::Int(-42),
        Value::Float(2.5),
        Value::typed(-3i8),
        Value::typed(300i16),
        Value::typed(70_000i32),
        Value::typed(200u8),
        Value::typed(60_000u16),
        Value::typed(u32::MAX),
        Value::typed(u64::MAX),
        Value::from(Complex64::new(1.0, 2.0)),
        Value::from("spam"),
        Value::from(""),
    ];
    for value in cases {
        assert_eq!(through_container(&value), value, "{value:?}");
    }
}

#[test]
fn sanctioned_narrowings() {
    assert!(matches!(through_container(&Value::Null), Value::Float(f) if f.is_nan()));
    assert_eq!(through_container(&Value::typed(1.5f32)), Value::Float(1.5));
    assert_eq!(through_container(&Value::typed(i64::MIN)), Value::Int(i64::MIN));
    assert_eq!(
        through_container(&Value::from(Complex32::new(1.0, -1.0))),
        Value::Scalar(Scalar::C128(Complex64::new(1.0, -1.0)))
    );

    let squeezed = through_container(&Value::from(
        NdArray::from_shape_vec(vec![3, 1], vec![1u16, 2, 3]).unwrap(),
    ));
    assert_eq!(squeezed, Value::from(NdArray::from_vec(vec![1u16, 2, 3])));

    // One-element sequences and arrays come back as scalars.
    assert_eq!(through_container(&Value::from(vec![5])), Value::Int(5));
    assert_eq!(through_container(&Value::from(vec![2.5])), Value::Float(2.5));
    assert_eq!(
        through_container(&Value::from(NdArray::from_vec(vec![7u8]))),
        Value::typed(7u8)
    );
    assert_eq!(
        through_container(&Value::from(NdArray::logical(vec![1, 1], vec![true]).unwrap())),
        Value::Bool(true)
    );
}

#[test]
fn out_of_range_sequences_are_rejected() {
    let value = Value::Sequence(vec![Value::typed(u64::MAX), Value::typed(-1i8)]);
    assert!(matches!(
        encode(&value, "v"),
        Err(MarshalError::OutOfRange { ref name, .. }) if name == "v"
    ));
}

#[test]
fn numeric_sequence_comes_back_as_array() {
    let back = through_container(&Value::from(vec![1, 2, 3]));
    assert_eq!(back, Value::from(NdArray::from_vec(vec![1i64, 2, 3])));

    let tuple = through_container(&Value::from((1.5, 2, 3)));
    assert_eq!(tuple, Value::from(NdArray::from_vec(vec![1.5f64, 2.0, 3.0])));
}

#[test]
fn arrays_roundtrip() {
    let cases = [
        Value::from(NdArray::from_shape_vec(vec![2, 3], vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap()),
        Value::from(NdArray::from_shape_vec(vec![2, 2, 2], (0i8..8).collect()).unwrap()),
        Value::from(NdArray::from_shape_vec(vec![2, 2], vec![1u64, u64::MAX, 0, 7]).unwrap()),
        Value::from(NdArray::logical(vec![2, 2], vec![true, false, false, true]).unwrap()),
        Value::from(NdArray::from_vec(vec![
            Complex64::new(0.0, 1.0),
            Complex64::new(2.0, -3.0),
        ])),
        Value::from(NdArray::from_vec(vec!["spam".to_string(), "eggs!".to_string()]))
    ];
    for value in &cases[..5] {
        assert_eq!(&through_container(value), value, "{value:?}");
    }

    // Text arrays travel as cells and come back as sequences.
    assert_eq!(
        through_container(&cases[5]),
        Value::from(vec!["spam", "eggs!"])
    );
}

#[test]
fn cells_and_structs_roundtrip() {
    let mut inner = StructValue::new();
    inner.insert("y", 1e3);
    inner.insert("label", "inner");

    let mut s = StructValue::new();
    s.insert("x", inner);
    s.insert("names", vec!["a", "bb"]);
    s.insert("mixed", Value::Sequence(vec![Value::from("a"), Value::Float(1.0)]));
    s.insert("flag", true);

    let value = Value::from(s);
    assert_eq!(through_container(&value), value);
}

#[test]
fn ragged_lists_become_sequences_of_arrays() {
    let back = through_container(&Value::from(vec![vec![1, 2], vec![3, 4, 5]]));
    assert_eq!(
        back,
        Value::Sequence(vec![
            Value::from(NdArray::from_vec(vec![1i64, 2])),
            Value::from(NdArray::from_vec(vec![3i64, 4, 5])),
        ])
    );
}

#[test]
fn encoding_is_idempotent() {
    let mut s = StructValue::new();
    s.insert("name", "a");
    s.insert("age", 3);
    let value = Value::from(s);

    let first = encode_bindings([("s", &value)]).unwrap();
    let second = encode_bindings([("s", &value)]).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        Mat5Codec.encode(&first).unwrap(),
        Mat5Codec.encode(&second).unwrap()
    );
}

#[test]
fn rejected_kinds_produce_no_output() {
    let long = NdArray::opaque(ElementKind::LongDouble, vec![1], 16, vec![0; 16]).unwrap();
    let nested = Value::from(vec![vec!["spam", "eggs"], vec!["foo ", "bar "]]);
    let x = Value::Int(1);
    let bad = Value::from(long);

    for value in [&bad, &nested] {
        assert!(encode_bindings([("x", &x), ("bad", value)]).is_err());
    }
    assert_eq!(
        encode(&bad, "bad"),
        Err(MarshalError::UnsupportedKind {
            name: "bad".to_string(),
            kind: ElementKind::LongDouble,
        })
    );
}

#[test]
fn bindings_decode_in_order() {
    let a = Value::Int(1);
    let b = Value::from("two");
    let bindings = encode_bindings([("a", &a), ("b", &b)]).unwrap();
    let decoded = decode_bindings(&bindings).unwrap();
    assert_eq!(
        decoded,
        vec![("a".to_string(), a), ("b".to_string(), b)]
    );
}

fn shaped_i32() -> impl Strategy<Value = (Vec<usize>, Vec<i32>)> {
    prop::collection::vec(2usize..4, 2..4).prop_flat_map(|shape| {
        let n: usize = shape.iter().product();
        (Just(shape), prop::collection::vec(any::<i32>(), n))
    })
}

proptest! {
    /// Multi-dimensional arrays keep shape and element order.
    #[test]
    fn prop_matrix_roundtrip((shape, data) in shaped_i32()) {
        let value = Value::from(NdArray::from_shape_vec(shape, data).unwrap());
        prop_assert_eq!(through_container(&value), value);
    }

    /// Text survives the container byte for byte.
    #[test]
    fn prop_text_roundtrip(text in "[ -~\u{e9}\u{3b1}]{1,32}") {
        let value = Value::from(text);
        prop_assert_eq!(through_container(&value), value);
    }
}

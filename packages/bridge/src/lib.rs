//! Conversion between host [`Value`](octbridge_value::Value)s and engine
//! [`ContainerRecord`](octbridge_container::ContainerRecord)s.
//!
//! Both directions are pure functions. [`encode`] is total over the supported
//! value kinds and fails with a [`MarshalError`](octbridge_value::MarshalError)
//! naming the variable for everything else; [`decode`] likewise rejects engine
//! values the host model cannot hold (sparse matrices, class objects, empty
//! numeric matrices).
//!
//! The conversions that lose information on a round trip are:
//!
//! - booleans travel as logical int8 and come back as [`Value::Bool`](octbridge_value::Value::Bool)
//!   or a logical int8 array
//! - float32 and complex64 widen to double precision
//! - row and column vectors come back one-dimensional
//! - sequences of numbers come back as arrays
//!
//! ```rust
//! use octbridge_bridge::{decode, encode};
//! use octbridge_value::Value;
//!
//! let record = encode(&Value::from(vec![1, 2, 3]), "x").unwrap();
//! assert_eq!(record.dims(), [1, 3]);
//!
//! let back = decode(&record, "x").unwrap();
//! assert_eq!(back.as_array().unwrap().as_slice::<i64>(), Some(&[1, 2, 3][..]));
//! ```

mod decode;
mod encode;
mod layout;

pub use decode::{decode, decode_bindings};
pub use encode::{encode, encode_bindings};

//! octbridge value model
//!
//! The host side of the bridge:
//! - `Value`: tagged union of everything that can cross to the engine
//! - `Scalar` / `Complex`: numbers with an explicit element width
//! - `NdArray`: dense row-major arrays with a checked shape
//! - `StructValue`: ordered struct with key-style and path-style access
//! - `MarshalError` / `AttributeError`: what can go wrong
//!
//! # Example
//!
//! ```rust
//! use octbridge_value::{NdArray, StructValue, Value};
//!
//! let mut params = StructValue::new();
//! params.insert("name", "a");
//! params.insert("weights", NdArray::from_vec(vec![0.5f64, 0.25]));
//! params.set_path(&["solver", "tol"], 1e-6).unwrap();
//!
//! let value = Value::from(params);
//! assert_eq!(value["solver"]["tol"], Value::Float(1e-6));
//! ```

mod array;
mod error;
mod ident;
mod scalar;
mod structure;
mod value;

pub use array::{ArrayData, Element, NdArray};
pub use error::{AttributeError, MarshalError};
pub use ident::{is_identifier, MAX_IDENTIFIER_LEN};
pub use scalar::{Complex, Complex32, Complex64, ElementKind, Scalar};
pub use structure::{StructValue, RESERVED_PREFIX};
pub use value::Value;

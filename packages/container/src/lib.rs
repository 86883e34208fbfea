//! Engine-side value records and the container file they travel in.
//!
//! Values cross the process boundary as named [`ContainerRecord`]s inside a
//! container file. The session writes a file, tells the engine to `load` it,
//! and reads back whatever the engine `save`s. Everything in this crate speaks
//! the engine's own model: column-major matrices with a class, cell arrays,
//! struct arrays and char matrices.
//!
//! The only codec is [`Mat5Codec`], the MAT-file level 5 format, which the
//! engine reads and writes natively.
//!
//! ```rust
//! use octbridge_container::{Bindings, ContainerCodec, ContainerRecord, Mat5Codec};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("x.mat");
//!
//! let mut bindings = Bindings::new();
//! bindings.insert("x", ContainerRecord::scalar(1.5));
//! Mat5Codec.write(&path, &bindings).unwrap();
//!
//! assert_eq!(Mat5Codec.read(&path).unwrap(), bindings);
//! ```

mod codec;
mod error;
mod mat5;
mod record;

pub use codec::ContainerCodec;
pub use error::ContainerError;
pub use mat5::Mat5Codec;
pub use record::{
    numel, Bindings, CellArray, CharArray, CharData, ContainerRecord, NumericArray,
    NumericClass, NumericData, StructArray,
};

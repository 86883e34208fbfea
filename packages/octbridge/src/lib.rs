//! octbridge: move values between Rust and a running GNU Octave.
//!
//! Values travel through MAT files. A session writes the file, has the
//! engine `load` it, runs a command, and reads back what the engine `save`d:
//!
//! ```rust,no_run
//! use octbridge::{StructValue, Value};
//!
//! let mut octave = octbridge::open()?;
//!
//! octave.put(&["x"], &[Value::from(vec![1, 2, 3])])?;
//! let peak = octave.call("max", &[Value::from(vec![3, 1, 4, 1, 5])], 1)?;
//! assert_eq!(peak, Value::Int(5));
//!
//! let mut s = StructValue::new();
//! s.set_path(&["a", "b"], 5)?;
//! octave.put(&["s"], &[Value::from(s)])?;
//! println!("{}", octave.eval("disp(s.a.b)", false)?);
//!
//! octave.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The layers are usable on their own: [`value`] is the host model,
//! [`container`] the engine model and MAT codec, [`bridge`] the conversion
//! between the two, and [`session`] the engine process.

use std::path::Path;

pub use octbridge_bridge as bridge;
pub use octbridge_container as container;
pub use octbridge_session as session;
pub use octbridge_value as value;

pub use octbridge_session::{
    EngineFunction, EngineSession, Error, Result, SessionConfig,
};
pub use octbridge_value::{
    AttributeError, Complex, Complex32, Complex64, ElementKind, MarshalError, NdArray, Scalar,
    StructValue, Value,
};

/// Open a session configured from the environment.
///
/// See [`SessionConfig::from_env`].
pub fn open() -> Result<EngineSession> {
    EngineSession::open(SessionConfig::from_env())
}

pub fn open_with(config: SessionConfig) -> Result<EngineSession> {
    EngineSession::open(config)
}

/// Delete exchange files that crashed processes left in `dir`.
///
/// Call it at startup or shutdown; it never touches files of a live
/// exchange.
pub fn cleanup_orphans(dir: impl AsRef<Path>) -> Result<usize> {
    Ok(octbridge_session::cleanup_orphans(dir.as_ref())?)
}

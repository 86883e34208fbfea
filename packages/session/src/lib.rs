//! Sessions with a running numerical engine.
//!
//! An [`EngineSession`] owns one engine process. Values go in with
//! [`put`](EngineSession::put) and [`call`](EngineSession::call) and come
//! back with [`get`](EngineSession::get): each exchange writes a container
//! file, sends a short generated script on the engine's stdin, and waits for
//! a sentinel line on both stdout and stderr. Anything else the engine
//! writes to stderr is reported as [`Error::Engine`].
//!
//! The process itself sits behind [`EngineProcess`] and [`EngineLauncher`],
//! so the protocol can be driven without a real engine.
//!
//! Exchange files live in [`SessionConfig::temp_dir`] and are deleted after
//! every exchange. [`cleanup_orphans`] removes files left behind by
//! processes that died mid-exchange.

mod channel;
mod config;
mod error;
mod process;
mod script;
mod session;

pub use channel::{cleanup_orphans, ExchangeChannel, ORPHAN_MIN_AGE};
pub use config::{SessionConfig, DEFAULT_ARGS};
pub use error::{Error, Result};
pub use process::{EngineLauncher, EngineProcess, OctaveLauncher, OctaveProcess, Recv, Stream};
pub use session::{EngineFunction, EngineSession};

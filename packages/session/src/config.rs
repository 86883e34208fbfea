//! Session configuration.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Flags that keep the engine quiet and non-interactive on piped stdio.
pub const DEFAULT_ARGS: &[&str] = &[
    "--no-gui",
    "--quiet",
    "--no-window-system",
    "--norc",
    "--no-history",
    "--no-line-editing",
];

/// Configuration for an [`EngineSession`](crate::EngineSession).
///
/// Every field has a default, so a partial config deserializes:
///
/// ```rust
/// use std::time::Duration;
/// use octbridge_session::SessionConfig;
///
/// let config: SessionConfig = serde_json::from_str(r#"{"executable": "octave-cli"}"#).unwrap();
/// assert_eq!(config.executable.to_str(), Some("octave-cli"));
/// assert_eq!(config.shutdown_grace, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Engine executable, looked up on `PATH` when not absolute.
    pub executable: PathBuf,

    /// Command line flags passed to the engine.
    pub args: Vec<String>,

    /// Directory holding the exchange files.
    pub temp_dir: PathBuf,

    /// Longest wait for one exchange. `None` waits forever.
    pub timeout: Option<Duration>,

    /// How long `close` waits for the engine to exit before killing it.
    pub shutdown_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("octave"),
            args: DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
            temp_dir: env::temp_dir(),
            timeout: None,
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by the environment.
    ///
    /// - `OCTBRIDGE_EXECUTABLE`, falling back to `OCTAVE_EXECUTABLE`
    /// - `OCTBRIDGE_TIMEOUT_SECS` (fractional seconds)
    /// - `OCTBRIDGE_TEMP_DIR`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var_os(key))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let mut config = Self::default();

        if let Some(executable) =
            lookup("OCTBRIDGE_EXECUTABLE").or_else(|| lookup("OCTAVE_EXECUTABLE"))
        {
            config.executable = executable.into();
        }

        if let Some(raw) = lookup("OCTBRIDGE_TIMEOUT_SECS") {
            let parsed = raw
                .to_str()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
            match parsed {
                Some(timeout) => config.timeout = Some(timeout),
                None => tracing::warn!(value = ?raw, "ignoring invalid OCTBRIDGE_TIMEOUT_SECS"),
            }
        }

        if let Some(dir) = lookup("OCTBRIDGE_TEMP_DIR") {
            config.temp_dir = dir.into();
        }

        config
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

//! The engine session state machine.
//!
//! A session is `Open` while it owns an engine process and `Closed`
//! otherwise. It closes on [`EngineSession::close`], when the engine exits
//! on its own, and after a timeout kill. Operations on a closed session fail
//! with [`Error::SessionClosed`]; only [`EngineSession::reopen`] starts a new
//! engine.

use std::fmt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use octbridge_bridge::{decode, encode, encode_bindings};
use octbridge_container::{Bindings, ContainerCodec, Mat5Codec};
use octbridge_value::{is_identifier, Value};

use crate::channel::ExchangeChannel;
use crate::process::{EngineLauncher, EngineProcess, OctaveLauncher, Recv, Stream};
use crate::script::{self, CallTarget};
use crate::{Error, Result, SessionConfig};

const EXIT_POLL: Duration = Duration::from_millis(10);

/// A live connection to one engine process.
///
/// ```rust,no_run
/// use octbridge_session::{EngineSession, SessionConfig};
/// use octbridge_value::Value;
///
/// let mut octave = EngineSession::open(SessionConfig::from_env())?;
/// octave.put(&["x"], &[Value::from(vec![1, 2, 3])])?;
/// let peak = octave.call("max", &[Value::from(vec![3, 1, 4, 1, 5])], 1)?;
/// assert_eq!(peak, Value::Int(5));
/// octave.close();
/// # Ok::<(), octbridge_session::Error>(())
/// ```
pub struct EngineSession {
    config: SessionConfig,
    launcher: Box<dyn EngineLauncher>,
    codec: Box<dyn ContainerCodec>,
    process: Option<Box<dyn EngineProcess>>,
    counter: u64,
}

impl fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("config", &self.config)
            .field("open", &self.is_open())
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

/// Output of one submission, split by stream.
struct Exchange {
    stdout: Vec<String>,
    stderr: Vec<String>,
}

impl EngineSession {
    /// Start an Octave process.
    pub fn open(config: SessionConfig) -> Result<Self> {
        Self::open_with(config, OctaveLauncher)
    }

    /// Start an engine through `launcher`.
    pub fn open_with(config: SessionConfig, launcher: impl EngineLauncher + 'static) -> Result<Self> {
        let mut session = Self {
            config,
            launcher: Box::new(launcher),
            codec: Box::new(Mat5Codec),
            process: None,
            counter: 0,
        };
        session.start()?;
        Ok(session)
    }

    /// Use a different container codec for the exchange files.
    pub fn with_codec(mut self, codec: impl ContainerCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.process.is_some()
    }

    /// Start a fresh engine, closing the current one first.
    pub fn reopen(&mut self) -> Result<()> {
        self.close();
        self.start()
    }

    fn start(&mut self) -> Result<()> {
        let process = self.launcher.launch(&self.config)?;
        self.process = Some(process);
        tracing::debug!(executable = %self.config.executable.display(), "engine session opened");
        self.submit("more off;", false)?;
        Ok(())
    }

    /// Ask the engine to exit, killing it after the shutdown grace period.
    ///
    /// Closing a closed session does nothing.
    pub fn close(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };

        if let Err(e) = process.send("exit") {
            tracing::debug!(error = %e, "engine stdin already closed");
        }

        let deadline = Instant::now() + self.config.shutdown_grace;
        loop {
            match process.try_exit_code() {
                Ok(Some(code)) => {
                    tracing::debug!(code, "engine exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "could not poll engine exit status");
                    break;
                }
            }
        }

        tracing::warn!(grace = ?self.config.shutdown_grace, "engine did not exit, killing it");
        if let Err(e) = process.kill() {
            tracing::debug!(error = %e, "failed to kill engine");
        }
    }

    /// Bind `values` to `names` in the engine workspace.
    ///
    /// Names and values are checked and encoded before anything is written,
    /// so a rejected value leaves the workspace untouched.
    pub fn put<N: AsRef<str>>(&mut self, names: &[N], values: &[Value]) -> Result<()> {
        self.ensure_open()?;
        if names.len() != values.len() {
            return Err(Error::engine(format!(
                "{} names given for {} values",
                names.len(),
                values.len()
            )));
        }
        for name in names {
            check_variable(name.as_ref())?;
        }
        let bindings = encode_bindings(names.iter().map(AsRef::as_ref).zip(values))?;

        let channel = ExchangeChannel::allocate(&self.config.temp_dir, self.codec.extension())?;
        self.codec.write(channel.request(), &bindings)?;
        self.submit(&script::load(channel.request()), false)?;
        release(channel);
        Ok(())
    }

    pub fn put_one(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.put(&[name], &[value.into()])
    }

    /// Read variables from the engine workspace, in the order of `names`.
    pub fn get<N: AsRef<str>>(&mut self, names: &[N]) -> Result<Vec<Value>> {
        self.ensure_open()?;
        for name in names {
            check_variable(name.as_ref())?;
        }
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let channel = ExchangeChannel::allocate(&self.config.temp_dir, self.codec.extension())?;
        let body = script::save(channel.response(), names.iter().map(AsRef::as_ref));
        self.submit(&body, false)?;

        let bindings = self.codec.read(channel.response())?;
        release(channel);
        names
            .iter()
            .map(|name| take(&bindings, name.as_ref(), name.as_ref()))
            .collect()
    }

    pub fn get_one(&mut self, name: &str) -> Result<Value> {
        let mut values = self.get(&[name])?;
        values
            .pop()
            .ok_or_else(|| Error::engine(format!("`{name}` missing from engine response")))
    }

    /// Call `func` with `args` and collect `nout` results.
    ///
    /// `func` is a function name, a script file name (`name.m`), or a path
    /// to a script file whose directory is added to the engine path.
    pub fn call_many(&mut self, func: &str, args: &[Value], nout: usize) -> Result<Vec<Value>> {
        self.ensure_open()?;
        let target = CallTarget::parse(func)?;

        let mut request = Bindings::new();
        for (i, (name, arg)) in script::arg_names(args.len()).into_iter().zip(args).enumerate() {
            let label = format!("{func} argument {}", i + 1);
            request.insert(name, encode(arg, &label)?);
        }

        let channel = ExchangeChannel::allocate(&self.config.temp_dir, self.codec.extension())?;
        if !request.is_empty() {
            self.codec.write(channel.request(), &request)?;
        }
        let body = script::call(
            &target,
            Some(channel.request()),
            args.len(),
            channel.response(),
            nout,
        );
        self.submit(&body, false)?;
        if nout == 0 {
            release(channel);
            return Ok(Vec::new());
        }

        let response = self.codec.read(channel.response())?;
        release(channel);
        script::out_names(nout)
            .iter()
            .enumerate()
            .map(|(i, name)| take(&response, name, &format!("{func} output {}", i + 1)))
            .collect()
    }

    /// Like [`call_many`](Self::call_many), but a single result comes back
    /// as itself and any other count as a [`Value::Sequence`].
    pub fn call(&mut self, func: &str, args: &[Value], nout: usize) -> Result<Value> {
        let mut values = self.call_many(func, args, nout)?;
        if nout == 1 {
            if let Some(value) = values.pop() {
                return Ok(value);
            }
        }
        Ok(Value::Sequence(values))
    }

    /// Evaluate raw engine code and return its console output.
    ///
    /// With `verbose`, each output line is also printed as it arrives.
    pub fn eval(&mut self, code: &str, verbose: bool) -> Result<String> {
        self.ensure_open()?;
        let stdout = self.submit(&script::eval(code), verbose)?;
        Ok(stdout.join("\n"))
    }

    /// [`eval`](Self::eval) for one or more complete statements.
    pub fn run(&mut self, statements: &str, verbose: bool) -> Result<String> {
        self.ensure_open()?;
        let statements = statements.trim_end();
        if statements.trim_start().is_empty() {
            return Err(Error::engine("nothing to run"));
        }
        self.eval(statements, verbose)
    }

    /// Add `dir` to the engine's function search path.
    pub fn addpath(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        self.ensure_open()?;
        self.submit(&script::addpath(dir.as_ref()), false)?;
        Ok(())
    }

    /// The engine's help text for `name`.
    pub fn help(&mut self, name: &str) -> Result<String> {
        self.ensure_open()?;
        if !is_identifier(name) {
            return Err(Error::engine(format!("`{name}` is not an engine identifier")));
        }
        let stdout = self.submit(&script::help(name), false)?;
        Ok(stdout.join("\n"))
    }

    /// Look up an engine function by name.
    ///
    /// Fails for names with a leading underscore, names that are not engine
    /// identifiers, and names the engine does not know.
    pub fn resolve(&mut self, name: &str) -> Result<EngineFunction<'_>> {
        self.ensure_open()?;
        if name.starts_with('_') {
            return Err(Error::engine(format!("`{name}` is private")));
        }
        if !is_identifier(name) {
            return Err(Error::engine(format!("`{name}` is not an engine identifier")));
        }

        let stdout = self.submit(&script::exists(name), false)?;
        let kind = stdout
            .iter()
            .rev()
            .find_map(|line| line.trim().parse::<i32>().ok())
            .unwrap_or(0);
        if kind == 0 {
            return Err(Error::engine(format!("`{name}` is undefined")));
        }

        Ok(EngineFunction {
            session: self,
            name: name.to_string(),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::SessionClosed)
        }
    }

    /// Run one script and return its stdout lines.
    ///
    /// The process is taken out of the session for the duration and only
    /// put back when the engine answered. Any stderr output fails the
    /// submission but keeps the session open.
    fn submit(&mut self, body: &str, echo: bool) -> Result<Vec<String>> {
        let mut process = self.process.take().ok_or(Error::SessionClosed)?;
        self.counter += 1;
        let sentinel = script::sentinel(self.counter);
        let script = script::wrap(body, &sentinel);
        tracing::trace!(counter = self.counter, %script, "submitting");

        let mut exchange = Exchange {
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        if let Err(e) = process.send(&script) {
            return Err(exited(process, &exchange.stderr, &format!("could not write to engine: {e}")));
        }

        match self.collect(process.as_mut(), &sentinel, echo, &mut exchange) {
            Ok(()) => {}
            Err(Recv::TimedOut) => {
                let after = self.config.timeout.unwrap_or_default();
                tracing::warn!(?after, "engine timed out, killing it");
                if let Err(e) = process.kill() {
                    tracing::debug!(error = %e, "failed to kill engine");
                }
                return Err(Error::Timeout { after });
            }
            Err(_) => return Err(exited(process, &exchange.stderr, "engine exited")),
        }
        self.process = Some(process);

        if exchange.stderr.is_empty() {
            Ok(exchange.stdout)
        } else {
            let message = exchange.stderr.join("\n");
            tracing::debug!(%message, "engine reported an error");
            Err(Error::Engine { message })
        }
    }

    /// Read lines until the sentinel has come through both streams.
    fn collect(
        &self,
        process: &mut dyn EngineProcess,
        sentinel: &str,
        echo: bool,
        exchange: &mut Exchange,
    ) -> std::result::Result<(), Recv> {
        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let (mut stdout_done, mut stderr_done) = (false, false);

        while !(stdout_done && stderr_done) {
            let wait = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            match process.recv(wait) {
                Recv::Line(stream, line) => {
                    tracing::trace!(%stream, %line, "engine output");
                    match stream {
                        Stream::Stdout if line == sentinel => stdout_done = true,
                        Stream::Stderr if line == sentinel => stderr_done = true,
                        Stream::Stdout => {
                            if echo {
                                println!("{line}");
                                tracing::info!("{line}");
                            }
                            exchange.stdout.push(line);
                        }
                        Stream::Stderr => exchange.stderr.push(line),
                    }
                }
                other => return Err(other),
            }
        }
        Ok(())
    }
}

fn check_variable(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::engine(format!("`{name}` is not a valid engine variable name")))
    }
}

/// Decode `name` from a response, failing if the engine did not write it.
fn take(bindings: &Bindings, name: &str, label: &str) -> Result<Value> {
    let record = bindings
        .get(name)
        .ok_or_else(|| Error::engine(format!("`{label}` missing from engine response")))?;
    Ok(decode(record, label)?)
}

fn release(channel: ExchangeChannel) {
    if let Err(e) = channel.release() {
        tracing::warn!(error = %e, "failed to delete exchange files");
    }
}

/// Reap a process that went away mid-exchange.
///
/// Whatever the engine wrote to stderr before going away ends up in the
/// error message.
fn exited(mut process: Box<dyn EngineProcess>, stderr: &[String], reason: &str) -> Error {
    let code = process.try_exit_code().ok().flatten();
    if let Err(e) = process.kill() {
        tracing::debug!(error = %e, "failed to reap engine");
    }
    tracing::debug!(?code, reason, "engine session closed");

    let mut message = match code {
        Some(code) => format!("{reason} (exit code {code})"),
        None => reason.to_string(),
    };
    for line in stderr {
        message.push('\n');
        message.push_str(line);
    }
    Error::engine(message)
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// An engine function that [`EngineSession::resolve`] found.
pub struct EngineFunction<'a> {
    session: &'a mut EngineSession,
    name: String,
}

impl EngineFunction<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&mut self, args: &[Value], nout: usize) -> Result<Value> {
        self.session.call(&self.name, args, nout)
    }

    pub fn call_many(&mut self, args: &[Value], nout: usize) -> Result<Vec<Value>> {
        self.session.call_many(&self.name, args, nout)
    }

    pub fn help(&mut self) -> Result<String> {
        self.session.help(&self.name)
    }
}

impl fmt::Debug for EngineFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

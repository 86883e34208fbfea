//! The engine process seam.
//!
//! [`EngineSession`](crate::EngineSession) drives the engine through
//! [`EngineProcess`]: write a script to stdin, read tagged output lines back
//! with a timeout. [`OctaveProcess`] is the real implementation; tests plug
//! in their own.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::SessionConfig;

/// Which output stream a line came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Outcome of waiting for engine output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recv {
    /// One line, without its terminator.
    Line(Stream, String),
    /// Both streams are closed: the process is gone.
    Eof,
    /// Nothing arrived within the timeout.
    TimedOut,
}

/// A running engine.
pub trait EngineProcess: Send {
    /// Write `script` to the engine's stdin.
    fn send(&mut self, script: &str) -> io::Result<()>;

    /// Wait for the next output line. `None` waits forever.
    fn recv(&mut self, timeout: Option<Duration>) -> Recv;

    /// `Some(code)` once the process has exited. A process ended by a
    /// signal reports `-1`.
    fn try_exit_code(&mut self) -> io::Result<Option<i32>>;

    /// Terminate the process. Killing a process that already exited is not
    /// an error.
    fn kill(&mut self) -> io::Result<()>;
}

/// Starts engine processes, so that a session can reopen.
pub trait EngineLauncher: Send {
    fn launch(&self, config: &SessionConfig) -> io::Result<Box<dyn EngineProcess>>;
}

/// Launches [`OctaveProcess`]es.
#[derive(Clone, Copy, Debug, Default)]
pub struct OctaveLauncher;

impl EngineLauncher for OctaveLauncher {
    fn launch(&self, config: &SessionConfig) -> io::Result<Box<dyn EngineProcess>> {
        Ok(Box::new(OctaveProcess::spawn(config)?))
    }
}

/// An engine child process with piped stdio.
///
/// One reader thread per output stream forwards lines over a channel, so
/// `recv` can wait with a timeout.
pub struct OctaveProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<(Stream, String)>,
}

impl OctaveProcess {
    pub fn spawn(config: &SessionConfig) -> io::Result<Self> {
        let mut child = Command::new(&config.executable)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        tracing::debug!(
            executable = %config.executable.display(),
            pid = child.id(),
            "spawned engine"
        );

        let stdin = child.stdin.take();
        let (tx, lines) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            forward(stdout, Stream::Stdout, tx.clone())?;
        }
        if let Some(stderr) = child.stderr.take() {
            forward(stderr, Stream::Stderr, tx)?;
        }

        Ok(Self { child, stdin, lines })
    }
}

fn forward<R>(reader: R, stream: Stream, tx: Sender<(Stream, String)>) -> io::Result<()>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("octbridge-{stream}"))
        .spawn(move || {
            let mut reader = BufReader::new(reader);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\n', '\r']).to_string();
                        if tx.send((stream, line)).is_err() {
                            break;
                        }
                    }
                }
            }
        })?;
    Ok(())
}

impl EngineProcess for OctaveProcess {
    fn send(&mut self, script: &str) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "engine stdin is closed"))?;
        stdin.write_all(script.as_bytes())?;
        if !script.ends_with('\n') {
            stdin.write_all(b"\n")?;
        }
        stdin.flush()
    }

    fn recv(&mut self, timeout: Option<Duration>) -> Recv {
        let received = match timeout {
            Some(timeout) => match self.lines.recv_timeout(timeout) {
                Ok(line) => Some(line),
                Err(RecvTimeoutError::Timeout) => return Recv::TimedOut,
                Err(RecvTimeoutError::Disconnected) => None,
            },
            None => self.lines.recv().ok(),
        };
        match received {
            Some((stream, line)) => Recv::Line(stream, line),
            None => Recv::Eof,
        }
    }

    fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        Ok(self
            .child
            .try_wait()?
            .map(|status| status.code().unwrap_or(-1)))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.stdin = None;
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        self.child.kill()?;
        self.child.wait()?;
        Ok(())
    }
}

impl Drop for OctaveProcess {
    fn drop(&mut self) {
        if let Err(e) = self.kill() {
            tracing::debug!(error = %e, "failed to reap engine process");
        }
    }
}

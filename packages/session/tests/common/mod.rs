//! An in-process stand-in for the engine.
//!
//! [`FakeEngine`] understands exactly the scripts the session generates:
//! it unwraps the `try` block, runs each statement against a workspace of
//! container records, and answers with the sentinel on both streams. Files
//! are real MAT files read and written through `Mat5Codec`.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use octbridge_container::{
    Bindings, ContainerCodec, ContainerRecord, Mat5Codec, NumericArray, NumericData,
};
use octbridge_session::{EngineLauncher, EngineProcess, EngineSession, Recv, SessionConfig, Stream};

const BUILTINS: &[&str] = &["max", "roundtrip", "tic", "disp", "exist"];

/// What the tests observe across every engine a launcher started.
#[derive(Debug, Default)]
pub struct Shared {
    pub launches: usize,
    pub kills: usize,
    pub scripts: Vec<String>,
    pub paths: Vec<String>,
    /// Engines ignore `exit` and must be killed.
    pub ignore_exit: bool,
}

#[derive(Clone, Default)]
pub struct FakeLauncher {
    shared: Arc<Mutex<Shared>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap()
    }
}

impl EngineLauncher for FakeLauncher {
    fn launch(&self, _config: &SessionConfig) -> io::Result<Box<dyn EngineProcess>> {
        self.shared.lock().unwrap().launches += 1;
        Ok(Box::new(FakeEngine {
            shared: Arc::clone(&self.shared),
            workspace: HashMap::new(),
            output: VecDeque::new(),
            state: State::Running,
        }))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Running,
    Hanging,
    Crashed,
    Exited,
    Killed,
}

pub struct FakeEngine {
    shared: Arc<Mutex<Shared>>,
    workspace: HashMap<String, ContainerRecord>,
    output: VecDeque<(Stream, String)>,
    state: State,
}

/// A statement failed; the text goes to stderr.
struct Failure(String);

/// A statement that ends the script early.
enum Halt {
    Fail(Failure),
    Crash,
    Hang,
}

impl From<Failure> for Halt {
    fn from(f: Failure) -> Self {
        Halt::Fail(f)
    }
}

fn fail<T>(message: impl Into<String>) -> Result<T, Failure> {
    Err(Failure(message.into()))
}

impl EngineProcess for FakeEngine {
    fn send(&mut self, script: &str) -> io::Result<()> {
        if self.state != State::Running {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "engine is gone"));
        }
        let mut shared = self.shared.lock().unwrap();
        shared.scripts.push(script.to_string());
        if script.trim() == "exit" {
            if !shared.ignore_exit {
                self.state = State::Exited;
            }
            return Ok(());
        }
        drop(shared);

        let (body, sentinel) = unwrap_script(script);
        for statement in body {
            match self.execute(&statement) {
                Ok(()) => {}
                Err(Halt::Fail(Failure(message))) => {
                    for line in message.lines() {
                        self.output.push_back((Stream::Stderr, line.to_string()));
                    }
                    break;
                }
                Err(Halt::Crash) => {
                    self.state = State::Crashed;
                    return Ok(());
                }
                Err(Halt::Hang) => {
                    self.state = State::Hanging;
                    return Ok(());
                }
            }
        }
        self.output.push_back((Stream::Stderr, sentinel.clone()));
        self.output.push_back((Stream::Stdout, sentinel));
        Ok(())
    }

    fn recv(&mut self, _timeout: Option<Duration>) -> Recv {
        if let Some((stream, line)) = self.output.pop_front() {
            return Recv::Line(stream, line);
        }
        match self.state {
            State::Hanging => Recv::TimedOut,
            _ => Recv::Eof,
        }
    }

    fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        Ok(match self.state {
            State::Running | State::Hanging => None,
            State::Exited => Some(0),
            State::Crashed => Some(1),
            State::Killed => Some(-1),
        })
    }

    fn kill(&mut self) -> io::Result<()> {
        if matches!(self.state, State::Running | State::Hanging) {
            self.state = State::Killed;
            self.shared.lock().unwrap().kills += 1;
        }
        Ok(())
    }
}

/// Split a generated script into its statements and its sentinel.
fn unwrap_script(script: &str) -> (Vec<String>, String) {
    let mut lines = script.lines();
    assert_eq!(lines.next(), Some("try"), "script must open a try block");

    let mut body = Vec::new();
    for line in lines.by_ref() {
        if line == "catch octbridge_err" {
            break;
        }
        body.push(line.trim().to_string());
    }

    let sentinel = lines
        .find_map(|line| line.strip_prefix("disp('")?.strip_suffix("');"))
        .expect("script must print a sentinel")
        .to_string();
    (body, sentinel)
}

impl FakeEngine {
    fn execute(&mut self, statement: &str) -> Result<(), Halt> {
        let statement = statement.trim_end_matches(';');
        if statement == "more off" {
            return Ok(());
        }

        if let Some(args) = call_args(statement, "load") {
            let [path] = quoted::<1>(&args)?;
            let bindings = Mat5Codec
                .read(Path::new(&path))
                .map_err(|e| Failure(format!("load: {e}")))?;
            for (name, record) in bindings {
                self.workspace.insert(name, record);
            }
            return Ok(());
        }

        if let Some(args) = call_args(statement, "save") {
            let args = split_quoted(&args)?;
            let [flag, path, names @ ..] = args.as_slice() else {
                return Err(Failure("save: missing arguments".to_string()).into());
            };
            assert_eq!(flag, "-v6");
            let mut bindings = Bindings::new();
            for name in names {
                let record = self
                    .workspace
                    .get(name)
                    .ok_or_else(|| Failure(format!("save: no such variable '{name}'")))?;
                bindings.insert(name.clone(), record.clone());
            }
            Mat5Codec
                .write(Path::new(path), &bindings)
                .map_err(|e| Failure(format!("save: {e}")))?;
            return Ok(());
        }

        if let Some(args) = call_args(statement, "clear") {
            for name in split_quoted(&args)? {
                self.workspace.remove(&name);
            }
            return Ok(());
        }

        if let Some(args) = call_args(statement, "addpath") {
            let [dir] = quoted::<1>(&args)?;
            self.shared.lock().unwrap().paths.push(dir);
            return Ok(());
        }

        if let Some(args) = call_args(statement, "disp(exist") {
            let [name] = quoted::<1>(args.trim_end_matches(')'))?;
            let kind = if self.workspace.contains_key(&name) {
                1
            } else if BUILTINS.contains(&name.as_str()) {
                5
            } else {
                0
            };
            self.print(kind.to_string());
            return Ok(());
        }

        if let Some(args) = call_args(statement, "help") {
            let [name] = quoted::<1>(&args)?;
            if !BUILTINS.contains(&name.as_str()) {
                return Err(Failure(format!("help: '{name}' not found")).into());
            }
            self.print(format!("'{name}' is a built-in function"));
            self.print(format!(" -- {name} (X)"));
            return Ok(());
        }

        if let Some(args) = call_args(statement, "eval") {
            let code = unescape_double(&args);
            return self.eval(&code);
        }

        self.invoke(statement).map_err(Halt::from)
    }

    fn print(&mut self, line: String) {
        self.output.push_back((Stream::Stdout, line));
    }

    /// The tiny language `eval` understands: `name = a + b`, `name = a`,
    /// plus `crash` and `hang`.
    fn eval(&mut self, code: &str) -> Result<(), Halt> {
        match code.trim() {
            "crash" => return Err(Halt::Crash),
            "hang" => return Err(Halt::Hang),
            _ => {}
        }
        if code.matches('\'').count() % 2 == 1 {
            return Err(Failure("parse error:\n\n  syntax error\n\n>>> ".to_string() + code).into());
        }

        for statement in code.split(['\n', ';']).map(str::trim).filter(|s| !s.is_empty()) {
            let Some((name, expr)) = statement.split_once('=') else {
                return Err(Failure(format!("'{statement}' undefined")).into());
            };
            let name = name.trim();
            let mut sum = 0.0;
            for term in expr.split('+') {
                sum += term
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| Failure(format!("'{}' undefined", term.trim())))?;
            }
            self.workspace
                .insert(name.to_string(), ContainerRecord::scalar(sum));
            self.print(format!("{name} = {sum}"));
        }
        Ok(())
    }

    /// `[out, ...] = f(arg, ...)` or `f(arg, ...)` or `f`.
    fn invoke(&mut self, statement: &str) -> Result<(), Failure> {
        let (outs, call) = match statement.split_once(" = ") {
            Some((outs, call)) => {
                let outs = outs.trim_start_matches('[').trim_end_matches(']');
                (outs.split(", ").map(str::to_string).collect(), call)
            }
            None => (Vec::new(), statement),
        };
        let (name, args) = match call.split_once('(') {
            Some((name, rest)) => (
                name,
                rest.trim_end_matches(')')
                    .split(", ")
                    .map(str::to_string)
                    .collect::<Vec<_>>(),
            ),
            None => (call, Vec::new()),
        };

        let mut inputs = Vec::new();
        for arg in &args {
            match self.workspace.get(arg) {
                Some(record) => inputs.push(record.clone()),
                None => return fail(format!("'{arg}' undefined")),
            }
        }

        let results = match name {
            "max" => max(&inputs, outs.len())?,
            "roundtrip" => inputs,
            "tic" => Vec::new(),
            other => return fail(format!("'{other}' undefined")),
        };
        if results.len() < outs.len() {
            return fail(format!("{name}: function called with too many outputs"));
        }
        for (out, record) in outs.into_iter().zip(results) {
            self.workspace.insert(out, record);
        }
        Ok(())
    }
}

fn max(inputs: &[ContainerRecord], nout: usize) -> Result<Vec<ContainerRecord>, Failure> {
    let [ContainerRecord::Numeric(array)] = inputs else {
        return fail("Invalid call to max");
    };
    let (value, index) = match &array.real {
        NumericData::Int64(v) => {
            let (i, m) = v
                .iter()
                .enumerate()
                .max_by_key(|(_, m)| **m)
                .ok_or_else(|| Failure("max: empty".to_string()))?;
            (NumericData::Int64(vec![*m]), i)
        }
        NumericData::Double(v) => {
            let (i, m) = v
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .ok_or_else(|| Failure("max: empty".to_string()))?;
            (NumericData::Double(vec![*m]), i)
        }
        _ => return fail("max: wrong type argument"),
    };

    let mut results = vec![ContainerRecord::Numeric(NumericArray::real(vec![1, 1], value))];
    if nout > 1 {
        results.push(ContainerRecord::scalar((index + 1) as f64));
    }
    Ok(results)
}

/// The argument text of `name(...)`.
fn call_args(statement: &str, name: &str) -> Option<String> {
    let rest = statement.strip_prefix(name)?.strip_prefix('(')?;
    Some(rest.strip_suffix(')')?.to_string())
}

/// Parse `'a', 'b''s'` into its strings.
fn split_quoted(args: &str) -> Result<Vec<String>, Failure> {
    let mut out = Vec::new();
    let mut chars = args.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| *c == ' ' || *c == ',') {
            chars.next();
        }
        match chars.next() {
            None => return Ok(out),
            Some('\'') => {}
            Some(c) => return fail(format!("parse error near '{c}'")),
        }
        let mut s = String::new();
        loop {
            match chars.next() {
                Some('\'') if chars.peek() == Some(&'\'') => {
                    chars.next();
                    s.push('\'');
                }
                Some('\'') => break,
                Some(c) => s.push(c),
                None => return fail("unterminated string"),
            }
        }
        out.push(s);
    }
}

fn quoted<const N: usize>(args: &str) -> Result<[String; N], Failure> {
    split_quoted(args)?
        .try_into()
        .map_err(|_| Failure(format!("expected {N} arguments")))
}

fn unescape_double(args: &str) -> String {
    let inner = args
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(args);
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(c) => out.push(c),
            None => out.push('\\'),
        }
    }
    out
}

/// A session on a fresh fake engine, exchanging files in `dir`.
pub fn session(dir: &Path) -> (EngineSession, FakeLauncher) {
    let launcher = FakeLauncher::new();
    let config = SessionConfig::default()
        .with_temp_dir(dir)
        .with_timeout(Duration::from_secs(5))
        .with_shutdown_grace(Duration::from_millis(50));
    let session = EngineSession::open_with(config, launcher.clone()).unwrap();
    (session, launcher)
}

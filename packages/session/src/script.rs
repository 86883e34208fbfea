//! Generated engine command scripts.
//!
//! Every submission is one script: the body runs inside `try`, a caught
//! error goes to stderr, and a sentinel line is written to both output
//! streams so the reader knows the engine is done with it.

use std::path::{Path, PathBuf};

use octbridge_value::is_identifier;

use crate::{Error, Result};

/// Prefix of the temporary variables a `call` creates in the workspace.
pub(crate) const ARG_PREFIX: &str = "octbridge_arg_";
pub(crate) const OUT_PREFIX: &str = "octbridge_out_";

/// A sentinel that no engine output will reproduce by accident.
pub(crate) fn sentinel(counter: u64) -> String {
    format!("__octbridge_done_{counter}_{}__", uuid::Uuid::new_v4().simple())
}

pub(crate) fn wrap(body: &str, sentinel: &str) -> String {
    let mut script = String::from("try\n");
    for line in body.lines() {
        script.push_str("  ");
        script.push_str(line);
        script.push('\n');
    }
    script.push_str("catch octbridge_err\n");
    script.push_str("  fputs(stderr, [octbridge_err.message \"\\n\"]);\n");
    script.push_str("end\n");
    script.push_str("fflush(stdout);\n");
    script.push_str(&format!("fputs(stderr, \"{sentinel}\\n\");\n"));
    script.push_str("fflush(stderr);\n");
    script.push_str(&format!("disp('{sentinel}');\n"));
    script.push_str("fflush(stdout);\n");
    script
}

/// Single-quoted engine string literal.
pub(crate) fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Body of a double-quoted engine string literal.
pub(crate) fn escape_double(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn load(path: &Path) -> String {
    format!("load({});", quote_path(path))
}

pub(crate) fn save<'a>(path: &Path, names: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = format!("save('-v6', {}", quote_path(path));
    for name in names {
        line.push_str(", ");
        line.push_str(&quote(name));
    }
    line.push_str(");");
    line
}

pub(crate) fn clear<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = names.into_iter().map(quote).collect();
    format!("clear({});", quoted.join(", "))
}

pub(crate) fn eval(text: &str) -> String {
    format!("eval(\"{}\");", escape_double(text))
}

pub(crate) fn addpath(dir: &Path) -> String {
    format!("addpath({});", quote_path(dir))
}

pub(crate) fn exists(name: &str) -> String {
    format!("disp(exist({}));", quote(name))
}

pub(crate) fn help(name: &str) -> String {
    format!("help({});", quote(name))
}

/// Names of the temporary argument variables for `n` arguments.
pub(crate) fn arg_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{ARG_PREFIX}{i}")).collect()
}

/// Names of the temporary output variables for `n` outputs.
pub(crate) fn out_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{OUT_PREFIX}{i}")).collect()
}

/// What `call` invokes: a function name, or a script file whose directory
/// must be on the engine path first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CallTarget {
    pub name: String,
    pub dir: Option<PathBuf>,
}

impl CallTarget {
    pub fn parse(func: &str) -> Result<Self> {
        if is_identifier(func) {
            return Ok(Self {
                name: func.to_string(),
                dir: None,
            });
        }

        let path = Path::new(func);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|stem| is_identifier(stem))
            .filter(|_| path.extension().map_or(true, |ext| ext == "m"))
            .ok_or_else(|| Error::engine(format!("`{func}` is not a function name or script path")))?;
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);

        Ok(Self {
            name: stem.to_string(),
            dir,
        })
    }
}

/// Body of a function call exchange.
///
/// Arguments are loaded from `request` as `octbridge_arg_<i>`, outputs are
/// saved to `response` as `octbridge_out_<i>`, and both are cleared again.
pub(crate) fn call(
    target: &CallTarget,
    request: Option<&Path>,
    nargs: usize,
    response: &Path,
    nout: usize,
) -> String {
    let args = arg_names(nargs);
    let outs = out_names(nout);
    let mut lines = Vec::new();

    if let Some(dir) = &target.dir {
        lines.push(addpath(dir));
    }
    if let Some(request) = request.filter(|_| nargs > 0) {
        lines.push(load(request));
    }

    let mut invocation = String::new();
    if !outs.is_empty() {
        invocation.push_str(&format!("[{}] = ", outs.join(", ")));
    }
    invocation.push_str(&target.name);
    if !args.is_empty() {
        invocation.push_str(&format!("({})", args.join(", ")));
    }
    invocation.push(';');
    lines.push(invocation);

    if !outs.is_empty() {
        lines.push(save(response, outs.iter().map(String::as_str)));
    }
    let temporaries: Vec<&str> = args.iter().chain(&outs).map(String::as_str).collect();
    if !temporaries.is_empty() {
        lines.push(clear(temporaries));
    }

    lines.join("\n")
}

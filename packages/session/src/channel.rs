//! Exchange files between the host and the engine.
//!
//! Each exchange gets a fresh request/response pair named
//! `octbridge-<pid>-<random>.<ext>`, where the extension comes from the
//! container codec in use. The files are created eagerly and recorded
//! in a process-wide registry until released, so [`cleanup_orphans`] never
//! deletes a file that an exchange still owns.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;

/// Files owned by another process are left alone until they are this old.
pub const ORPHAN_MIN_AGE: Duration = Duration::from_secs(10 * 60);

const PREFIX: &str = "octbridge";

lazy_static! {
    static ref LIVE: Mutex<HashSet<OsString>> = Mutex::new(HashSet::new());
    static ref EXCHANGE_FILE: Regex =
        Regex::new(r"^octbridge-(\d+)-[A-Za-z0-9]+\.[A-Za-z0-9]+$").unwrap();
}

fn live() -> MutexGuard<'static, HashSet<OsString>> {
    LIVE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A request/response file pair for one exchange.
#[derive(Debug)]
pub struct ExchangeChannel {
    request: PathBuf,
    response: PathBuf,
    released: bool,
}

impl ExchangeChannel {
    /// Create both files in `dir`, named with `extension` (without the dot).
    pub fn allocate(dir: &Path, extension: &str) -> io::Result<Self> {
        let suffix = format!(".{extension}");
        let mut live = live();
        let request = create(dir, &suffix, &mut live)?;
        let response = match create(dir, &suffix, &mut live) {
            Ok(path) => path,
            Err(e) => {
                if let Some(name) = request.file_name() {
                    live.remove(name);
                }
                drop(live);
                remove(&request);
                return Err(e);
            }
        };
        tracing::debug!(request = %request.display(), response = %response.display(), "allocated exchange files");

        Ok(Self {
            request,
            response,
            released: false,
        })
    }

    pub fn request(&self) -> &Path {
        &self.request
    }

    pub fn response(&self) -> &Path {
        &self.response
    }

    /// Delete both files. A file that is already gone is not an error.
    pub fn release(mut self) -> io::Result<()> {
        self.release_files()
    }

    fn release_files(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let mut result = Ok(());
        for path in [&self.request, &self.response] {
            if let Err(e) = delete(path) {
                result = result.and(Err(e));
            }
            if let Some(name) = path.file_name() {
                live().remove(name);
            }
        }
        result
    }
}

impl Drop for ExchangeChannel {
    fn drop(&mut self) {
        if let Err(e) = self.release_files() {
            tracing::debug!(error = %e, "failed to delete exchange files");
        }
    }
}

fn create(dir: &Path, suffix: &str, live: &mut HashSet<OsString>) -> io::Result<PathBuf> {
    let prefix = format!("{PREFIX}-{}-", process::id());
    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(suffix)
        .rand_bytes(10)
        .tempfile_in(dir)?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    if let Some(name) = path.file_name() {
        live.insert(name.to_os_string());
    }
    Ok(path)
}

/// Remove a file, treating "not found" as success.
fn delete(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "exchange file already gone");
            Ok(())
        }
        other => other,
    }
}

fn remove(path: &Path) {
    if let Err(e) = delete(path) {
        tracing::debug!(path = %path.display(), error = %e, "failed to delete exchange file");
    }
}

/// Delete exchange files in `dir` that no live exchange owns.
///
/// Files of this process are removed as soon as they are released. Files of
/// other processes are only removed once older than [`ORPHAN_MIN_AGE`], so a
/// session running in another process is not disturbed. Returns the number
/// of files deleted.
pub fn cleanup_orphans(dir: &Path) -> io::Result<usize> {
    // Held for the whole sweep so that no exchange is allocated mid-scan.
    let live = live();
    let me = process::id();
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(captures) = EXCHANGE_FILE.captures(name) else {
            continue;
        };
        if live.contains(&file_name) {
            continue;
        }

        let owner = captures[1].parse::<u32>().ok();
        if owner != Some(me) {
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.elapsed().ok());
            if !age.is_some_and(|age| age >= ORPHAN_MIN_AGE) {
                continue;
            }
        }

        let path = entry.path();
        match delete(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed orphaned exchange file");
                removed += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove orphaned exchange file")
            }
        }
    }

    Ok(removed)
}

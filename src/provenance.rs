//! Provenance collection (best-effort)
//!
//! Records git commit, dirty state and a dependency listing by invoking
//! external commands. Any failure (missing tool, non-zero exit, non-UTF-8
//! output) degrades to [`Provenance::Unavailable`]; nothing here returns an
//! [`crate::Error`].

use std::path::Path;
use std::process::Command;

use crate::config::sha256_hex;

/// Outcome of a best-effort provenance lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance<T> {
    /// The fact was collected.
    Available(T),
    /// The fact could not be collected; the reason is for logging only.
    Unavailable(String),
}

impl<T> Provenance<T> {
    /// Convert into an `Option`, discarding the reason.
    #[must_use]
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Available(v) => Some(v),
            Self::Unavailable(_) => None,
        }
    }

    /// True if the fact was collected.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Map the collected value.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Provenance<U> {
        match self {
            Self::Available(v) => Provenance::Available(f(v)),
            Self::Unavailable(reason) => Provenance::Unavailable(reason),
        }
    }
}

/// Run `program args...`, returning trimmed stdout on success.
fn run_command(program: &str, args: &[&str], cwd: Option<&Path>) -> Provenance<String> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = match cmd.output() {
        Ok(output) => output,
        Err(e) => return Provenance::Unavailable(format!("{program}: {e}")),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Provenance::Unavailable(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        ));
    }

    match String::from_utf8(output.stdout) {
        Ok(stdout) => Provenance::Available(stdout.trim().to_string()),
        Err(_) => Provenance::Unavailable(format!("{program}: output is not UTF-8")),
    }
}

/// Current `HEAD` commit of the repository containing `cwd`.
#[must_use]
pub fn git_commit(cwd: &Path) -> Provenance<String> {
    match run_command("git", &["rev-parse", "HEAD"], Some(cwd)) {
        Provenance::Available(sha) if sha.is_empty() => {
            Provenance::Unavailable("git rev-parse printed nothing".to_string())
        }
        other => other,
    }
}

/// Whether the working tree at `cwd` has uncommitted changes.
#[must_use]
pub fn git_dirty(cwd: &Path) -> Provenance<bool> {
    run_command("git", &["status", "--porcelain"], Some(cwd)).map(|out| !out.is_empty())
}

/// Kernel release of the host (`uname -r`).
#[must_use]
pub fn os_release() -> Provenance<String> {
    match run_command("uname", &["-r"], None) {
        Provenance::Available(release) if release.is_empty() => {
            Provenance::Unavailable("uname printed nothing".to_string())
        }
        other => other,
    }
}

/// Dependency listing produced by `command` (e.g. `["pip", "freeze"]`).
///
/// The listing is newline-terminated.
#[must_use]
pub fn dependency_snapshot(command: &[String]) -> Provenance<String> {
    let Some((program, args)) = command.split_first() else {
        return Provenance::Unavailable("no dependency command configured".to_string());
    };
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run_command(program, &args, None).map(|listing| listing + "\n")
}

/// Hex SHA-256 digest of `text`.
#[must_use]
pub fn digest(text: &str) -> String {
    sha256_hex(text.as_bytes())
}

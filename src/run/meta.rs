//! Run metadata record (`meta.json`)

use std::ffi::OsStr;
use std::path::Path;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::provenance::os_release;

/// Immutable record describing one run.
///
/// Built once by [`RunMetaBuilder`] and written as the run's final artifact.
/// Absent optional facts serialize as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunMeta {
    run_id: String,
    created_at: String,
    command: String,
    cwd: String,
    #[serde(rename = "python_version")]
    runtime_version: String,
    platform: String,
    config_path: Option<String>,
    config_hash: String,
    seed: Option<i64>,
    overrides: Vec<String>,
    git_commit: Option<String>,
    git_dirty: Option<bool>,
    deps_hash: Option<String>,
    duration_sec: f64,
}

impl RunMeta {
    /// Start collecting metadata for a run beginning now.
    #[must_use]
    pub fn builder(
        run_id: impl Into<String>,
        cwd: &Path,
        command: impl Into<String>,
    ) -> RunMetaBuilder {
        RunMetaBuilder::new(run_id, cwd, command)
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Creation time, ISO-8601 UTC with second precision.
    #[must_use]
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Reconstructed invoking command line.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Working directory of the invocation.
    #[must_use]
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Tool/runtime identification (serialized as `python_version`).
    #[must_use]
    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    /// OS and architecture description.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Config file path, if one was given.
    #[must_use]
    pub fn config_path(&self) -> Option<&str> {
        self.config_path.as_deref()
    }

    /// Hash of the final config.
    #[must_use]
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// Seed passed on the command line.
    #[must_use]
    pub const fn seed(&self) -> Option<i64> {
        self.seed
    }

    /// Raw override strings, in application order.
    #[must_use]
    pub fn overrides(&self) -> &[String] {
        &self.overrides
    }

    /// Git commit, if collected.
    #[must_use]
    pub fn git_commit(&self) -> Option<&str> {
        self.git_commit.as_deref()
    }

    /// Git dirty flag, if collected.
    #[must_use]
    pub const fn git_dirty(&self) -> Option<bool> {
        self.git_dirty
    }

    /// Hash of the dependency listing, if collected.
    #[must_use]
    pub fn deps_hash(&self) -> Option<&str> {
        self.deps_hash.as_deref()
    }

    /// Wall-clock duration of the run in seconds.
    #[must_use]
    pub const fn duration_sec(&self) -> f64 {
        self.duration_sec
    }
}

/// Builder for `RunMeta`.
///
/// Static facts (creation time, command, cwd, runtime, platform) and the
/// start instant are captured when the builder is created.
#[derive(Debug)]
pub struct RunMetaBuilder {
    run_id: String,
    created_at: String,
    command: String,
    cwd: String,
    runtime_version: String,
    platform: String,
    config_path: Option<String>,
    config_hash: String,
    seed: Option<i64>,
    overrides: Vec<String>,
    git_commit: Option<String>,
    git_dirty: Option<bool>,
    deps_hash: Option<String>,
    started: Instant,
}

impl RunMetaBuilder {
    /// Create a builder with required fields.
    #[must_use]
    pub fn new(run_id: impl Into<String>, cwd: &Path, command: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            created_at: utc_now_iso(),
            command: command.into(),
            cwd: cwd.display().to_string(),
            runtime_version: runtime_version(),
            platform: platform_description(),
            config_path: None,
            config_hash: String::new(),
            seed: None,
            overrides: Vec::new(),
            git_commit: None,
            git_dirty: None,
            deps_hash: None,
            started: Instant::now(),
        }
    }

    /// Set the run ID (generated after config loading).
    #[must_use]
    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Set the config path.
    #[must_use]
    pub fn config_path(mut self, path: Option<String>) -> Self {
        self.config_path = path;
        self
    }

    /// Set the final config hash.
    #[must_use]
    pub fn config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Set the seed.
    #[must_use]
    pub const fn seed(mut self, seed: Option<i64>) -> Self {
        self.seed = seed;
        self
    }

    /// Set the override strings.
    #[must_use]
    pub fn overrides(mut self, overrides: Vec<String>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Set git provenance.
    #[must_use]
    pub fn git(mut self, commit: Option<String>, dirty: Option<bool>) -> Self {
        self.git_commit = commit;
        self.git_dirty = dirty;
        self
    }

    /// Set the dependency listing hash.
    #[must_use]
    pub fn deps_hash(mut self, hash: Option<String>) -> Self {
        self.deps_hash = hash;
        self
    }

    /// Seconds elapsed since the builder was created.
    #[must_use]
    pub fn elapsed_sec(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Build the `RunMeta`, measuring duration up to now.
    #[must_use]
    pub fn finish(self) -> RunMeta {
        let duration = self.elapsed_sec();
        self.build_with_duration(duration)
    }

    /// Build the `RunMeta` with an explicit duration.
    #[must_use]
    pub fn build_with_duration(self, duration_sec: f64) -> RunMeta {
        RunMeta {
            run_id: self.run_id,
            created_at: self.created_at,
            command: self.command,
            cwd: self.cwd,
            runtime_version: self.runtime_version,
            platform: self.platform,
            config_path: self.config_path,
            config_hash: self.config_hash,
            seed: self.seed,
            overrides: self.overrides,
            git_commit: self.git_commit,
            git_dirty: self.git_dirty,
            deps_hash: self.deps_hash,
            duration_sec,
        }
    }
}

/// Current UTC time as ISO-8601 with second precision (`+00:00` offset).
#[must_use]
pub fn utc_now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Rebuild the invoking command line: program basename plus arguments.
///
/// Arguments that are not valid UTF-8 are rendered lossily.
#[must_use]
pub fn invocation_command<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut args = args.into_iter();
    let Some(program) = args.next() else {
        return String::new();
    };
    let program = Path::new(program.as_ref());
    let name = program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .into_owned();

    std::iter::once(name)
        .chain(args.map(|a| a.as_ref().to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn runtime_version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn platform_description() -> String {
    describe_platform(std::env::consts::OS, os_release().ok().as_deref(), std::env::consts::ARCH)
}

/// `"{system} {release} ({arch})"`, e.g. `"Linux 6.8.0 (x86_64)"`.
fn describe_platform(os: &str, release: Option<&str>, arch: &str) -> String {
    let system = match os {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    };
    match release {
        Some(release) => format!("{system} {release} ({arch})"),
        None => format!("{system} ({arch})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_command() {
        assert_eq!(
            invocation_command(["/usr/local/bin/exptrack", "run", "--seed", "7"]),
            "exptrack run --seed 7"
        );
        assert_eq!(invocation_command(Vec::<String>::new()), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_invocation_command_non_utf8_argument() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let args = vec![
            OsString::from("exptrack"),
            OsString::from("run"),
            OsString::from("--runs-dir"),
            OsString::from_vec(b"runs_\xff".to_vec()),
        ];
        assert_eq!(invocation_command(args), "exptrack run --runs-dir runs_\u{fffd}");
    }

    #[test]
    fn test_describe_platform() {
        assert_eq!(
            describe_platform("linux", Some("6.8.0-45-generic"), "x86_64"),
            "Linux 6.8.0-45-generic (x86_64)"
        );
        assert_eq!(describe_platform("macos", Some("23.4.0"), "aarch64"), "Darwin 23.4.0 (aarch64)");
        assert_eq!(describe_platform("windows", None, "x86_64"), "Windows (x86_64)");
    }

    #[test]
    fn test_platform_description_shape() {
        let platform = platform_description();
        assert!(platform.ends_with(&format!("({})", std::env::consts::ARCH)));
        assert!(!platform.contains(std::env::consts::FAMILY));
        if cfg!(target_os = "linux") {
            assert!(platform.starts_with("Linux "));
        }
    }

    #[test]
    fn test_created_at_format() {
        let ts = utc_now_iso();
        assert!(ts.ends_with("+00:00"));
        // 2024-03-09T07:05:03+00:00
        assert_eq!(ts.len(), 25);
    }

    #[test]
    fn test_serialized_field_names() {
        let meta = RunMeta::builder("r1", Path::new("/tmp"), "exptrack run")
            .config_hash("ab")
            .seed(Some(7))
            .build_with_duration(1.5);
        let v = serde_json::to_value(&meta).unwrap();

        assert_eq!(v["python_version"], serde_json::json!(meta.runtime_version()));
        assert_eq!(v["seed"], serde_json::json!(7));
        assert!(v["git_commit"].is_null());
        assert!(v["deps_hash"].is_null());
        assert_eq!(v["overrides"], serde_json::json!([]));
        assert_eq!(v.as_object().unwrap().len(), 14);
    }
}

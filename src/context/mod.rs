//! Run context for Sandock
//!
//! The run context carries everything an invocation reads from the process
//! environment: the debug switch, the current and home directories, the
//! invoking user's ids and the timestamp used for ephemeral container names.
//! It is built once in `main` and threaded through explicitly so tests can
//! pin every value.

use std::path::{Path, PathBuf};

/// Environment variable pointing at the main configuration file
pub const CONFIG_PATH_ENV: &str = "SNDK_CFG";

/// Environment variable enabling debug reporting
pub const DEBUG_ENV: &str = "SNDK_DEBUG";

/// Per-invocation execution environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Verbose failure reporting and debug logging
    pub debug: bool,
    /// Directory the command was invoked from
    pub current_dir: PathBuf,
    /// Home directory of the invoking user
    pub home_dir: PathBuf,
    pub uid: u32,
    pub gid: u32,
    /// High resolution timestamp, e.g. `1718000000.123456`
    pub timestamp: String,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::from_env(false)
    }
}

impl RunContext {
    /// Capture the context of the running process
    pub fn from_env(debug: bool) -> Self {
        let now = chrono::Utc::now();
        // SAFETY: getuid/getgid never fail and touch no memory
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };

        Self {
            debug: debug || debug_from_env(),
            current_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
            home_dir: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            uid,
            gid,
            timestamp: format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros()),
        }
    }

    /// Builder used by tests and embedding callers
    pub fn with_dirs(mut self, current_dir: impl Into<PathBuf>, home_dir: impl Into<PathBuf>) -> Self {
        self.current_dir = current_dir.into();
        self.home_dir = home_dir.into();
        self
    }

    pub fn with_ids(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Whether the invocation happens right at the home directory
    pub fn in_home_dir(&self) -> bool {
        self.current_dir == self.home_dir
    }

    /// Filesystem-safe slug of the current directory, `/path/to/repo` -> `path_to_repo`
    pub fn current_dir_slug(&self) -> String {
        dir_slug(&self.current_dir)
    }

    /// Expand the home directory aliases `~`, `$HOME` and `${HOME}`
    pub fn expand_home(&self, value: &str) -> String {
        expand_home_with(value, &self.home_dir)
    }
}

fn debug_from_env() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(false)
}

pub(crate) fn dir_slug(path: &Path) -> String {
    path.to_string_lossy()
        .trim_start_matches(['/', '\\'])
        .replace(['/', '\\'], "_")
}

pub(crate) fn expand_home_with(value: &str, home: &Path) -> String {
    let home = home.to_string_lossy();
    let expanded = replace_home_var(&value.replace("${HOME}", &home), &home);

    if expanded == "~" {
        return home.to_string();
    }
    match expanded.strip_prefix("~/") {
        Some(rest) => format!("{}/{}", home.trim_end_matches('/'), rest),
        None => expanded,
    }
}

/// Substitute `$HOME` but leave longer names such as `$HOMEBREW_PREFIX` alone
fn replace_home_var(value: &str, home: &str) -> String {
    const VAR: &str = "$HOME";
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(pos) = rest.find(VAR) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + VAR.len()..];
        if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
            out.push_str(VAR);
        } else {
            out.push_str(home);
        }
    }
    out.push_str(rest);
    out
}

mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_env() {
        let ctx = RunContext::from_env(true);
        assert!(ctx.debug);
        assert!(ctx.timestamp.contains('.'));
    }

    #[test]
    fn test_current_dir_slug() {
        let ctx = RunContext::default().with_dirs("/path/to/repo", "/home/dir");
        assert_eq!(ctx.current_dir_slug(), "path_to_repo");
    }

    #[test]
    fn test_in_home_dir() {
        assert!(RunContext::default().with_dirs("/home/dir", "/home/dir").in_home_dir());
        assert!(!RunContext::default().with_dirs("/home/dir/x", "/home/dir").in_home_dir());
    }

    #[test]
    fn test_expand_home() {
        let ctx = RunContext::default().with_dirs("/tmp", "/home/user1");
        assert_eq!(ctx.expand_home("~/path/to"), "/home/user1/path/to");
        assert_eq!(ctx.expand_home("${HOME}/Dockerfile"), "/home/user1/Dockerfile");
        assert_eq!(ctx.expand_home("$HOME/x"), "/home/user1/x");
        assert_eq!(ctx.expand_home("~"), "/home/user1");
        assert_eq!(ctx.expand_home("/abs/~/x"), "/abs/~/x");
        assert_eq!(ctx.expand_home("$HOMEBREW_PREFIX/x"), "$HOMEBREW_PREFIX/x");
        assert_eq!(ctx.expand_home("$HOME_DIR:$HOME"), "$HOME_DIR:/home/user1");
    }
}

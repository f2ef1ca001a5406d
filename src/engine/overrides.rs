//! Per-invocation program overrides
//!
//! `sandock run pydev --sandbox-arg-hostname=dev --version` replaces the
//! hostname for this run only and forwards `--version` to the program.

use tracing::debug;

use crate::config::{Pairs, Program};
use crate::error::{Result, SandockError};

/// Program fields an override token may replace
pub const OVERRIDE_KEYS: &[&str] = &[
    "image",
    "exec",
    "name",
    "hostname",
    "network",
    "workdir",
    "platform",
    "interactive",
    "allow_home_dir",
    "env",
];

/// Overrides collected from forwarded arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyOverrides {
    pub image: Option<String>,
    pub exec: Option<String>,
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub network: Option<String>,
    pub workdir: Option<String>,
    pub platform: Option<String>,
    pub interactive: Option<bool>,
    /// Always present, false unless the caller opts in
    pub allow_home_dir: bool,
    pub env: Pairs,
}

impl PropertyOverrides {
    /// Effective program with the overridden fields replaced
    pub fn apply(&self, program: &Program) -> Result<Program> {
        if self.name.is_some() && program.persist.enable {
            return Err(SandockError::execution(
                "name of persist program cannot be overridden",
            ));
        }

        let mut effective = program.clone();
        let replace = |target: &mut String, value: &Option<String>| {
            if let Some(value) = value {
                *target = value.clone();
            }
        };
        replace(&mut effective.image, &self.image);
        replace(&mut effective.exec, &self.exec);

        for (target, value) in [
            (&mut effective.name, &self.name),
            (&mut effective.hostname, &self.hostname),
            (&mut effective.network, &self.network),
            (&mut effective.workdir, &self.workdir),
            (&mut effective.platform, &self.platform),
        ] {
            if value.is_some() {
                *target = value.clone();
            }
        }

        if let Some(interactive) = self.interactive {
            effective.interactive = interactive;
        }
        effective.allow_home_dir = program.allow_home_dir || self.allow_home_dir;

        for (key, value) in &self.env {
            match effective.env.iter_mut().find(|(existing, _)| existing == key) {
                Some(entry) => entry.1 = value.clone(),
                None => effective.env.push((key.clone(), value.clone())),
            }
        }

        effective.validate()?;
        Ok(effective)
    }
}

/// Split forwarded arguments into override tokens and program arguments
///
/// Override tokens are returned without their `--<prefix>` marker.
pub fn split_override_args(args: &[String], prefix: &str) -> (Vec<String>, Vec<String>) {
    let marker = format!("--{}", prefix);
    let mut tokens = Vec::new();
    let mut forwarded = Vec::new();

    for arg in args {
        match arg.strip_prefix(&marker) {
            Some(token) => tokens.push(token.to_string()),
            None => forwarded.push(arg.clone()),
        }
    }
    (tokens, forwarded)
}

/// Usage text shown for `--<prefix>help` and malformed tokens
pub fn override_usage(prefix: &str) -> String {
    let mut usage = format!(
        "usage: sandock run <program> [--{p}KEY=VALUE ...] [ARGS ...]\n\n\
         override program properties for a single run:\n",
        p = prefix
    );
    for key in OVERRIDE_KEYS {
        let line = match *key {
            "env" => format!("  --{}env=KEY=VALUE    set an environment variable, repeatable\n", prefix),
            "interactive" | "allow_home_dir" => format!("  --{}{}=true|false\n", prefix, key),
            other => format!("  --{}{}=VALUE\n", prefix, other),
        };
        usage.push_str(&line);
    }
    usage.push_str(&format!("  --{}help    show this help\n", prefix));
    usage
}

/// Parse override tokens (prefix already stripped)
pub fn override_properties(tokens: &[String], prefix: &str) -> Result<PropertyOverrides> {
    let mut overrides = PropertyOverrides::default();

    for token in tokens {
        if token == "help" {
            return Err(SandockError::HelpRequested(override_usage(prefix)));
        }

        let Some((key, value)) = token.split_once('=') else {
            return Err(usage_error(prefix, &format!("`{}` is not in KEY=VALUE form", token)));
        };

        match key {
            "env" => {
                let Some((env_key, env_value)) = value.split_once('=') else {
                    return Err(usage_error(prefix, &format!("`{}` must be env=KEY=VALUE", token)));
                };
                match overrides.env.iter_mut().find(|(k, _)| k == env_key) {
                    Some(entry) => entry.1 = env_value.to_string(),
                    None => overrides.env.push((env_key.to_string(), env_value.to_string())),
                }
            }
            "image" => overrides.image = Some(value.to_string()),
            "exec" => overrides.exec = Some(value.to_string()),
            "name" => overrides.name = Some(value.to_string()),
            "hostname" => overrides.hostname = Some(value.to_string()),
            "network" => overrides.network = Some(value.to_string()),
            "workdir" => overrides.workdir = Some(value.to_string()),
            "platform" => overrides.platform = Some(value.to_string()),
            "interactive" => overrides.interactive = Some(parse_bool(prefix, key, value)?),
            "allow_home_dir" => overrides.allow_home_dir = parse_bool(prefix, key, value)?,
            unknown => debug!(key = unknown, "ignoring unknown override"),
        }
    }

    Ok(overrides)
}

fn parse_bool(prefix: &str, key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(usage_error(
            prefix,
            &format!("`{}` expects a boolean, got `{}`", key, value),
        )),
    }
}

fn usage_error(prefix: &str, reason: &str) -> SandockError {
    SandockError::Usage(format!("{}\n\n{}", reason, override_usage(prefix)))
}

//! Configuration model and resolution
//!
//! A configuration is resolved in two steps: the main source is discovered
//! and decoded into a plain map, then every extra source (explicit includes,
//! then the current directory dot-file) is merged on top of it. The merged
//! map is finally turned into the validated value objects below.

pub mod backup;
pub mod fields;
pub mod image;
pub mod loader;
pub mod program;
pub mod resources;

use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::context::{RunContext, CONFIG_PATH_ENV};
use crate::error::{Result, SandockError};

pub use backup::{Backup, BackupPath, Restic};
pub use fields::{Fields, Named, Pairs};
pub use image::{ImageBuild, ImageDump};
pub use loader::{
    dot_config_finder, json_decoder, load_config_file, main_config_finder, merge_configs,
    yaml_decoder, DOT_CONFIG_NAMES,
};
pub use program::{ContainerUser, Executor, PersistContainer, Program, SandboxMount};
pub use resources::{Network, Volume};

/// Engine invocation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub docker_bin: String,
    pub container_name_prefix: String,
    pub property_override_prefix_arg: String,
    pub alias_program_prefix: String,
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            container_name_prefix: "sandock-".to_string(),
            property_override_prefix_arg: "sandbox-arg-".to_string(),
            alias_program_prefix: String::new(),
        }
    }
}

impl Execution {
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let defaults = Self::default();
        let mut f = Fields::new(path, value)?;
        let execution = Self {
            docker_bin: f.string_or("docker_bin", &defaults.docker_bin)?,
            container_name_prefix: f.string_or("container_name_prefix", &defaults.container_name_prefix)?,
            property_override_prefix_arg: f
                .string_or("property_override_prefix_arg", &defaults.property_override_prefix_arg)?,
            alias_program_prefix: f.string_or("alias_program_prefix", "")?,
        };
        f.finish()?;
        Ok(execution)
    }
}

/// Discovery and merge behaviour
#[derive(Debug, Clone)]
pub struct Configuration {
    pub current_dir_conf: bool,
    pub current_dir_conf_excludes: Vec<Regex>,
    pub includes: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            current_dir_conf: true,
            current_dir_conf_excludes: Vec::new(),
            includes: Vec::new(),
        }
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.current_dir_conf == other.current_dir_conf
            && self.includes == other.includes
            && self
                .current_dir_conf_excludes
                .iter()
                .map(Regex::as_str)
                .eq(other.current_dir_conf_excludes.iter().map(Regex::as_str))
    }
}

impl Configuration {
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let mut f = Fields::new(path, value)?;
        let current_dir_conf = f.bool_or("current_dir_conf", true)?;
        let excludes = f.string_list("current_dir_conf_excludes")?;
        let includes = f.string_list("includes")?;
        f.finish()?;

        let current_dir_conf_excludes = excludes
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    SandockError::config(format!(
                        "`{}.current_dir_conf_excludes` has invalid pattern `{}`: {}",
                        path, pattern, e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            current_dir_conf,
            current_dir_conf_excludes,
            includes,
        })
    }

    /// Dot-file of `current_dir` when directory configs are enabled
    pub fn dir_conf(&self, current_dir: &Path) -> Option<PathBuf> {
        if !self.current_dir_conf {
            return None;
        }
        dot_config_finder(current_dir)
    }

    /// `None` when the directory matches one of the exclude patterns
    pub fn filter_current_dir_conf<'a>(&self, directory: &'a str) -> Option<&'a str> {
        if self.current_dir_conf_excludes.iter().any(|re| re.is_match(directory)) {
            return None;
        }
        Some(directory)
    }

    /// Merge includes and the current directory config on top of `base`
    ///
    /// `main_path` is the file `base` came from; it is not merged twice when
    /// it also is the current directory dot-file.
    pub fn expand_configs(&self, base: &Value, main_path: Option<&Path>, ctx: &RunContext) -> Result<Value> {
        let mut merged = base.clone();

        for include in &self.includes {
            let path = PathBuf::from(ctx.expand_home(include));
            debug!(path = %path.display(), "merging included config");
            merge_configs(&mut merged, &load_config_file(&path)?);
        }

        let current_dir = ctx.current_dir.to_string_lossy();
        if self.filter_current_dir_conf(&current_dir).is_none() {
            info!(dir = %current_dir, "current directory config excluded");
            return Ok(merged);
        }

        if let Some(dir_conf) = self.dir_conf(&ctx.current_dir) {
            if main_path.is_some_and(|main| same_file(main, &dir_conf)) {
                return Ok(merged);
            }
            debug!(path = %dir_conf.display(), "merging current directory config");
            merge_configs(&mut merged, &load_config_file(&dir_conf)?);
        }

        Ok(merged)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Root of the effective configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MainConfig {
    pub execution: Execution,
    pub config: Configuration,
    pub programs: Named<Program>,
    pub volumes: Named<Volume>,
    pub images: Named<ImageBuild>,
    pub networks: Named<Network>,
    pub backup: Backup,
}

impl MainConfig {
    /// Config holding the given programs and defaults everywhere else
    pub fn with_programs(programs: impl IntoIterator<Item = (String, Program)>) -> Result<Self> {
        let programs: Named<Program> = programs.into_iter().collect();
        if programs.is_empty() {
            return Err(SandockError::config("no program configured"));
        }

        Ok(Self {
            execution: Execution::default(),
            config: Configuration::default(),
            programs,
            volumes: Named::new(),
            images: Named::new(),
            networks: Named::new(),
            backup: Backup::default(),
        })
    }

    /// Build from an already merged map
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut f = Fields::new("", value)?;

        let cfg = Self {
            execution: f.object("execution", Execution::from_value)?,
            config: f.object("config", Configuration::from_value)?,
            programs: f.named("programs", Program::from_value)?,
            volumes: f.named("volumes", Volume::from_value)?,
            images: f.named("images", ImageBuild::from_value)?,
            networks: f.named("networks", Network::from_value)?,
            backup: f.object("backup", Backup::from_value)?,
        };
        f.finish()?;

        if cfg.programs.is_empty() {
            return Err(SandockError::config("no program configured"));
        }
        cfg.validate_image_references()?;

        Ok(cfg)
    }

    fn validate_image_references(&self) -> Result<()> {
        let images = self.images.iter().map(|(name, build)| (format!("images.{}", name), build));
        let programs = self
            .programs
            .iter()
            .filter_map(|(name, p)| p.build.as_ref().map(|b| (format!("programs.{}.build", name), b)));

        // program recipes are registered under the program's image name
        let is_recipe = |name: &str| {
            self.images.contains_key(name)
                || self
                    .programs
                    .iter()
                    .any(|(_, p)| p.build.is_some() && p.image == name)
        };

        for (path, build) in images.chain(programs) {
            if let Some(parent) = &build.depends_on {
                if !is_recipe(parent) {
                    return Err(SandockError::config(format!(
                        "`{}.depends_on` refers to undefined image `{}`",
                        path, parent
                    )));
                }
            }
        }
        Ok(())
    }

    /// Discover, load and expand the main configuration
    pub fn load(explicit: Option<&Path>, ctx: &RunContext) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let path = main_config_finder(explicit, env_path.as_deref(), &ctx.home_dir, &ctx.current_dir)
            .ok_or_else(|| SandockError::config("no main configuration can be read"))?;

        Self::load_from(&path, ctx)
    }

    /// Load and expand a known main configuration file
    pub fn load_from(path: &Path, ctx: &RunContext) -> Result<Self> {
        if !path.exists() {
            return Err(SandockError::config(format!(
                "main configuration is not found (`{}`)",
                path.display()
            )));
        }
        info!(path = %path.display(), "using main configuration");

        let base = load_config_file(path)?;
        let config = Configuration::from_value("config", base.get("config").unwrap_or(&Value::Null))?;
        let merged = config.expand_configs(&base, Some(path), ctx)?;

        Self::from_value(&merged)
    }
}

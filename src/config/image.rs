//! Custom image build recipes

use serde_json::Value;

use super::fields::{Fields, Pairs};
use crate::error::{Result, SandockError};

/// Build cache settings of a custom image
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageDump {
    pub enable: bool,
    /// Explicit tarball path, replaces the generated cache path
    pub store: Option<String>,
}

impl ImageDump {
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let mut f = Fields::new(path, value)?;
        let dump = Self {
            enable: f.bool_or("enable", false)?,
            store: f.opt_string("store")?,
        };
        f.finish()?;
        Ok(dump)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageBuild {
    pub context: Option<String>,
    pub dockerfile_inline: Option<String>,
    pub docker_file: Option<String>,
    /// Parent image in the same registry, built first
    pub depends_on: Option<String>,
    pub args: Pairs,
    pub extra_build_args: Vec<String>,
    pub platform: Option<String>,
    pub dump: ImageDump,
}

impl ImageBuild {
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let mut f = Fields::new(path, value)?;
        let build = Self {
            context: f.opt_string("context")?,
            dockerfile_inline: f.opt_string("dockerfile_inline")?,
            docker_file: f.opt_string("dockerFile")?,
            depends_on: f.opt_string("depends_on")?,
            args: f.pairs("args")?,
            extra_build_args: f.string_list("extra_build_args")?,
            platform: f.opt_string("platform")?,
            dump: f.object("dump", ImageDump::from_value)?,
        };
        f.finish()?;

        build.validate().map_err(|e| match e {
            SandockError::Config(msg) => SandockError::Config(format!("`{}`: {}", path, msg)),
            other => other,
        })?;
        Ok(build)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dockerfile_inline.is_some() && self.docker_file.is_some() {
            return Err(SandockError::config(
                "cannot set `dockerfile_inline` and `dockerFile` together",
            ));
        }
        Ok(())
    }
}

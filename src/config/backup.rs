//! Volume backup settings
//!
//! Only the settings live here; the backup tool integration itself is a
//! separate subsystem.

use serde_json::Value;

use super::fields::{Fields, Pairs};
use crate::error::{Result, SandockError};

const COMPRESSIONS: [&str; 3] = ["auto", "off", "max"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restic {
    pub image: String,
    pub compression: String,
    pub no_snapshot_unless_changed: bool,
    pub extra_args: Vec<String>,
}

impl Default for Restic {
    fn default() -> Self {
        Self {
            image: "restic/restic:0.18.0".to_string(),
            compression: "auto".to_string(),
            no_snapshot_unless_changed: true,
            extra_args: Vec::new(),
        }
    }
}

impl Restic {
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let defaults = Self::default();
        let mut f = Fields::new(path, value)?;
        let restic = Self {
            image: f.string_or("image", &defaults.image)?,
            compression: f.string_or("compression", &defaults.compression)?,
            no_snapshot_unless_changed: f.bool_or("no_snapshot_unless_changed", true)?,
            extra_args: f.string_list("extra_args")?,
        };
        f.finish()?;

        if !COMPRESSIONS.contains(&restic.compression.as_str()) {
            return Err(SandockError::config(format!(
                "unknown compression `{}` the valid option are {}",
                restic.compression,
                COMPRESSIONS.join(", ")
            )));
        }
        Ok(restic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPath {
    pub default: String,
}

impl Default for BackupPath {
    fn default() -> Self {
        Self {
            default: "${HOME}/.sandock_vol_backup".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Backup {
    pub restic: Restic,
    pub path: BackupPath,
    pub no_password: bool,
    pub volume_labels: Pairs,
    pub volume_excludes: Vec<String>,
}

impl Backup {
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let mut f = Fields::new(path, value)?;
        let backup = Self {
            restic: f.object("restic", Restic::from_value)?,
            path: f.object("path", |p, v| {
                let mut pf = Fields::new(p, v)?;
                let default = pf.string_or("default", &BackupPath::default().default)?;
                pf.finish()?;
                Ok(BackupPath { default })
            })?,
            no_password: f.bool_or("no_password", false)?,
            volume_labels: f.pairs("volume_labels")?,
            volume_excludes: f.string_list("volume_excludes")?,
        };
        f.finish()?;
        Ok(backup)
    }
}

//! Volume queries against the engine
//!
//! The listing half of the volume collaborator: which volumes exist, which
//! ones sandock created, and whether a file is present inside one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::engine::sandbox::CREATED_BY_LABEL;
use crate::engine::shell::{join_cmd, Shell};
use crate::error::Result;

/// Throwaway image used to look inside a volume
pub const CHECK_IMAGE: &str = "docker.io/library/ubuntu:22.04";

/// Mount point of the inspected volume inside the check container
const CHECK_MOUNT: &str = "/check_vol";

/// One entry of `volume ls --format=json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Driver", default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(rename = "Labels", default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Value>,
    #[serde(rename = "Mountpoint", default, skip_serializing_if = "Option::is_none")]
    pub mountpoint: Option<String>,
}

pub struct VolumeMgr<'a> {
    bin: &'a str,
    shell: &'a dyn Shell,
}

impl<'a> VolumeMgr<'a> {
    pub fn new(bin: &'a str, shell: &'a dyn Shell) -> Self {
        Self { bin, shell }
    }

    /// Volumes carrying every given label
    pub fn volume_list(&self, label_filters: &[(&str, &str)]) -> Result<Vec<VolumeInfo>> {
        let mut args = vec![
            self.bin.to_string(),
            "volume".to_string(),
            "ls".to_string(),
            "--format=json".to_string(),
        ];
        args.extend(
            label_filters
                .iter()
                .map(|(k, v)| format!("--filter=label={}='{}'", k, v)),
        );

        let output = self.shell.run_checked(&join_cmd(&args))?;
        let mut volumes = Vec::new();
        for line in output.stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            volumes.push(serde_json::from_str(line)?);
        }
        debug!(count = volumes.len(), "listed volumes");
        Ok(volumes)
    }

    /// Volumes created by sandock itself
    pub fn created_by_sandock(&self) -> Result<Vec<VolumeInfo>> {
        self.volume_list(&[CREATED_BY_LABEL])
    }

    pub fn vol_exists(&self, name: &str) -> Result<bool> {
        let cmd = format!("{} volume inspect {}", self.bin, name);
        Ok(self.shell.run(&cmd, true)?.success())
    }

    /// Whether `path` (relative to the volume root) is a regular file
    pub fn file_exists_in_vol(&self, name: &str, path: &str) -> Result<bool> {
        let mount = format!("{}:{}", name, CHECK_MOUNT);
        let target = format!("{}/{}", CHECK_MOUNT, path.trim_start_matches('/'));
        let args = [
            self.bin,
            "run",
            "-it",
            "--rm",
            "--entrypoint=test",
            "-v",
            mount.as_str(),
            CHECK_IMAGE,
            "-f",
            target.as_str(),
        ]
        .map(String::from);

        Ok(self.shell.run(&join_cmd(&args), true)?.success())
    }
}

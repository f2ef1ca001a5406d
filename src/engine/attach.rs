//! Attach or run fresh

use tracing::{debug, info};

use super::adapter::{ContainerProbe, EngineAdapter};
use super::shell::Shell;
use crate::config::Program;
use crate::error::{Result, SandockError};

/// Statuses of a container that exists but is not running and can be started
const STOPPED_STATUSES: [&str; 3] = ["exited", "stopped", "created"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachDecision {
    /// Exec into the existing persistent container
    Attach,
    /// Run a new container
    NoAttach,
}

impl AttachDecision {
    pub fn is_attach(self) -> bool {
        self == AttachDecision::Attach
    }
}

/// Decide whether the program's persistent container can be reused
///
/// Non persistent programs never probe the engine. A stopped container is
/// started first when `persist.auto_start` is set.
pub fn decide_attach(
    program: &Program,
    container_name: &str,
    adapter: &dyn EngineAdapter,
    shell: &dyn Shell,
) -> Result<AttachDecision> {
    if !program.persist.enable {
        return Ok(AttachDecision::NoAttach);
    }

    let status = match adapter.probe(shell, container_name)? {
        ContainerProbe::NotFound => {
            debug!(container = container_name, "persistent container not found");
            return Ok(AttachDecision::NoAttach);
        }
        ContainerProbe::Failed(stderr) => {
            return Err(SandockError::execution(format!(
                "error during check container status: {}",
                stderr
            )));
        }
        ContainerProbe::Found(status) => status,
    };

    if status == "running" {
        return Ok(AttachDecision::Attach);
    }

    if !STOPPED_STATUSES.contains(&status.as_str()) {
        return Err(SandockError::execution(format!(
            "persistent container `{}` is in `{}` state",
            container_name, status
        )));
    }

    if !program.persist.auto_start {
        info!(container = container_name, status = %status, "persistent container is not running, auto start disabled");
        return Ok(AttachDecision::NoAttach);
    }

    info!(container = container_name, status = %status, "starting persistent container");
    adapter.start(shell, container_name)?;
    Ok(AttachDecision::Attach)
}

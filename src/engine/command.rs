//! Container command line synthesis
//!
//! The argument order here is part of the contract: callers and tests compare
//! the produced vectors literally.

use super::adapter::EngineAdapter;
use crate::config::{Execution, Program};
use crate::context::RunContext;

/// Marker in volume specs replaced by the current directory slug
pub const VOL_DIR_MARKER: &str = "${VOL_DIR}";

/// Container name: the configured one, else `<prefix><program>-<timestamp>`
pub fn container_name(program_key: &str, program: &Program, execution: &Execution, ctx: &RunContext) -> String {
    match &program.name {
        Some(name) => name.clone(),
        None => format!(
            "{}{}-{}",
            execution.container_name_prefix, program_key, ctx.timestamp
        ),
    }
}

/// Namespace a volume spec per checkout
///
/// Only `${VOL_DIR}` is substituted; home aliases and environment variables
/// are left for the shell that executes the final command line.
pub fn expand_volume_spec(spec: &str, ctx: &RunContext) -> String {
    spec.replace(VOL_DIR_MARKER, &ctx.current_dir_slug())
}

/// Arguments for `run`
pub fn run_container_cmd(
    program_key: &str,
    program: &Program,
    execution: &Execution,
    adapter: &dyn EngineAdapter,
    ctx: &RunContext,
) -> Vec<String> {
    let mut args = vec![
        adapter.bin().to_string(),
        "run".to_string(),
        "--entrypoint".to_string(),
        program.exec_path().to_string(),
        "--name".to_string(),
        container_name(program_key, program, execution, ctx),
    ];

    if !program.persist.enable {
        args.push("--rm".to_string());
    }

    if program.interactive {
        args.push("-it".to_string());
    }

    if let Some(platform) = &program.platform {
        args.push("--platform".to_string());
        args.push(platform.clone());
    }

    if let Some(hostname) = program.hostname.as_ref().filter(|_| adapter.supports_hostname()) {
        args.push("--hostname".to_string());
        args.push(hostname.clone());
    }

    if let Some(network) = &program.network {
        args.push("--network".to_string());
        args.push(network.clone());
    }

    if let Some(user) = &program.user {
        let (uid, gid) = if user.keep_id {
            (ctx.uid, ctx.gid)
        } else {
            (user.uid, user.gid)
        };
        args.push("-u".to_string());
        args.push(format!("{}:{}", uid, gid));
    }

    for volume in &program.volumes {
        args.push("-v".to_string());
        args.push(expand_volume_spec(volume, ctx));
    }

    let mount = &program.sandbox_mount;
    if mount.enable {
        let mut spec = format!("{}:{}", ctx.current_dir.display(), mount.current_dir_mount);
        if mount.read_only {
            spec.push_str(":ro");
        }
        args.push("-v".to_string());
        args.push(spec);
    }

    let workdir = if mount.enable {
        Some(&mount.current_dir_mount)
    } else {
        program.workdir.as_ref()
    };
    if let Some(workdir) = workdir {
        args.push("--workdir".to_string());
        args.push(workdir.clone());
    }

    for (key, value) in &program.env {
        args.push(format!("-e {}='{}'", key, value));
    }

    for port in &program.ports {
        args.push("-p".to_string());
        args.push(port.clone());
    }
    args.extend(program.cap_add.iter().map(|cap| format!("--cap-add={}", cap)));
    args.extend(program.cap_drop.iter().map(|cap| format!("--cap-drop={}", cap)));

    args.extend(program.extra_run_args.iter().cloned());
    args.push(program.image.clone());
    args
}

/// Arguments for `exec` into an attached container
pub fn exec_container_cmd(
    program_key: &str,
    program: &Program,
    execution: &Execution,
    adapter: &dyn EngineAdapter,
    ctx: &RunContext,
) -> Vec<String> {
    let mut args = vec![adapter.bin().to_string(), "exec".to_string()];
    if program.interactive {
        args.push("-it".to_string());
    }
    args.push(container_name(program_key, program, execution, ctx));
    args.push(program.exec_path().to_string());
    args
}

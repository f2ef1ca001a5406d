//! Sandboxed program execution

use std::cell::OnceCell;

use tracing::{debug, info};

use super::adapter::{adapter_for, EngineAdapter};
use super::attach::{decide_attach, AttachDecision};
use super::command;
use super::image::ImageResolver;
use super::overrides::PropertyOverrides;
use super::shell::{join_cmd, Shell};
use crate::config::{MainConfig, Network, Program, Volume};
use crate::context::RunContext;
use crate::error::{Result, SandockError};

/// Label stamped on every volume sandock creates
pub const CREATED_BY_LABEL: (&str, &str) = ("created_by.sandock", "true");

/// One program, resolved and overridden, ready to run
pub struct SandboxExec<'a> {
    key: String,
    program: Program,
    cfg: &'a MainConfig,
    ctx: &'a RunContext,
    shell: &'a dyn Shell,
    adapter: Box<dyn EngineAdapter>,
    attach: OnceCell<AttachDecision>,
}

impl<'a> SandboxExec<'a> {
    pub fn new(
        name: &str,
        cfg: &'a MainConfig,
        overrides: &PropertyOverrides,
        ctx: &'a RunContext,
        shell: &'a dyn Shell,
    ) -> Result<Self> {
        let configured = cfg
            .programs
            .get(name)
            .ok_or_else(|| SandockError::execution(format!("`{}` is not defined", name)))?;
        let program = overrides.apply(configured)?;

        if ctx.in_home_dir() && program.sandbox_mount.enable && !program.allow_home_dir {
            return Err(SandockError::execution(
                "cannot be ran on top of home directory when the program's sandbox mount is enabled",
            ));
        }

        let adapter = adapter_for(program.executor, &cfg.execution);
        Ok(Self {
            key: name.to_string(),
            program,
            cfg,
            ctx,
            shell,
            adapter,
            attach: OnceCell::new(),
        })
    }

    /// Effective program after overrides
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn container_name(&self) -> String {
        command::container_name(&self.key, &self.program, &self.cfg.execution, self.ctx)
    }

    pub fn run_container_cmd(&self) -> Vec<String> {
        command::run_container_cmd(&self.key, &self.program, &self.cfg.execution, self.adapter.as_ref(), self.ctx)
    }

    pub fn exec_container_cmd(&self) -> Vec<String> {
        command::exec_container_cmd(&self.key, &self.program, &self.cfg.execution, self.adapter.as_ref(), self.ctx)
    }

    /// Whether to exec into the persistent container, probed once
    pub fn attach_container(&self) -> Result<bool> {
        if let Some(decision) = self.attach.get() {
            return Ok(decision.is_attach());
        }

        let decision = decide_attach(&self.program, &self.container_name(), self.adapter.as_ref(), self.shell)?;
        let _ = self.attach.set(decision);
        Ok(decision.is_attach())
    }

    /// Create a configured volume if it does not exist yet
    ///
    /// `name` is the source part of a volume spec as written in the program;
    /// volumes not declared under `volumes` are left to the engine.
    pub fn ensure_volume(&self, name: &str) -> Result<()> {
        let Some(volume) = self.cfg.volumes.get(name) else {
            debug!(volume = name, "volume is not managed");
            return Ok(());
        };

        let name = command::expand_volume_spec(name, self.ctx);
        let inspect = join_cmd(&[
            self.adapter.bin().to_string(),
            "volume".to_string(),
            "inspect".to_string(),
            name.clone(),
        ]);
        if self.shell.run(&inspect, true)?.success() {
            return Ok(());
        }

        info!(volume = %name, "creating volume");
        self.shell
            .run_checked(&join_cmd(&volume_create_args(self.adapter.bin(), &name, volume)))?;
        Ok(())
    }

    /// Create the program's network if it is declared and missing
    pub fn ensure_network(&self) -> Result<()> {
        let Some(name) = &self.program.network else {
            return Ok(());
        };
        let Some(network) = self.cfg.networks.get(name) else {
            debug!(network = %name, "network is not managed");
            return Ok(());
        };

        let inspect = join_cmd(&[
            self.adapter.bin().to_string(),
            "network".to_string(),
            "inspect".to_string(),
            name.clone(),
        ]);
        if self.shell.run(&inspect, true)?.success() {
            return Ok(());
        }

        info!(network = %name, "creating network");
        self.shell
            .run_checked(&join_cmd(&network_create_args(self.adapter.bin(), name, network)))?;
        Ok(())
    }

    pub fn ensure_custom_image(&self) -> Result<()> {
        ImageResolver::for_program(&self.program, &self.cfg.images, self.adapter.as_ref(), self.shell, self.ctx)
            .with_program_recipes(&self.cfg.programs)
            .ensure(&self.program.image)
    }

    /// Run the program, forwarding `args` to it
    pub fn do_run(&self, args: &[String]) -> Result<()> {
        self.ensure_custom_image()?;
        self.ensure_network()?;
        for source in self.program.volumes.iter().filter_map(|spec| named_volume(spec)) {
            self.ensure_volume(source)?;
        }

        for cmd in &self.program.pre_exec_cmds {
            debug!(command = %cmd, "pre exec command");
            self.run_attached(cmd)?;
        }

        let mut argv = if self.attach_container()? {
            self.exec_container_cmd()
        } else {
            self.run_container_cmd()
        };
        argv.extend(args.iter().cloned());

        self.run_attached(&join_cmd(&argv))
    }

    fn run_attached(&self, cmd: &str) -> Result<()> {
        let output = self.shell.run(cmd, false)?;
        if !output.success() {
            return Err(SandockError::Shell {
                command: cmd.to_string(),
                code: output.code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

/// Source of a volume spec when it names a volume rather than a host path
fn named_volume(spec: &str) -> Option<&str> {
    let source = spec.split(':').next().unwrap_or(spec);
    if source.is_empty() || source.starts_with(['/', '.', '~', '$']) {
        return None;
    }
    Some(source)
}

fn volume_create_args(bin: &str, name: &str, volume: &Volume) -> Vec<String> {
    let mut args = vec![
        bin.to_string(),
        "volume".to_string(),
        "create".to_string(),
        format!("--driver={}", volume.driver),
        driver_opts(&volume.driver_opts),
    ];

    let (created_key, created_value) = CREATED_BY_LABEL;
    let labels = volume
        .labels
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .chain(std::iter::once((created_key, created_value)));
    for (key, value) in labels {
        args.push("--label".to_string());
        args.push(format!("{}='{}'", key, value));
    }

    args.push(name.to_string());
    args
}

fn network_create_args(bin: &str, name: &str, network: &Network) -> Vec<String> {
    let mut args = vec![
        bin.to_string(),
        "network".to_string(),
        "create".to_string(),
        format!("--driver={}", network.driver),
        driver_opts(&network.driver_opts),
    ];
    args.extend(network.params.iter().map(|(k, v)| format!("--{}={}", k, v)));
    args.push(name.to_string());
    args
}

fn driver_opts(opts: &[(String, String)]) -> String {
    opts.iter()
        .map(|(k, v)| format!("--opt {}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

//! Command line entry points

pub mod args;

pub use args::{Args, SubCommand, VolumeAction};

use tracing::debug;

use crate::config::MainConfig;
use crate::context::RunContext;
use crate::engine::overrides::{override_properties, split_override_args};
use crate::engine::sandbox::SandboxExec;
use crate::engine::shell::Shell;
use crate::error::Result;
use crate::output::{format_output, Listing, OutputFormat};
use crate::volume::VolumeMgr;

/// Name the generated aliases invoke
pub const EXECUTABLE: &str = "sandock";

/// Dispatch a parsed command line
///
/// Listing commands return their rendered output, `run` hands the terminal
/// to the program and returns nothing.
pub fn execute(args: &Args, ctx: &RunContext, shell: &dyn Shell) -> Result<Option<String>> {
    let cfg = MainConfig::load(args.config.as_deref(), ctx)?;
    let format = OutputFormat::from_json_flag(args.json);

    match &args.command {
        SubCommand::List => Ok(Some(format_output(&Listing::Programs(program_names(&cfg)), &format))),
        SubCommand::Alias { expand } => Ok(Some(format_output(
            &Listing::Aliases(alias_lines(&cfg, EXECUTABLE, *expand)),
            &format,
        ))),
        SubCommand::Run { program, args } => {
            cmd_run(&cfg, program, args, ctx, shell)?;
            Ok(None)
        }
        SubCommand::Volume {
            action: VolumeAction::List,
        } => {
            let volumes = VolumeMgr::new(&cfg.execution.docker_bin, shell).created_by_sandock()?;
            Ok(Some(format_output(&Listing::Volumes(volumes), &format)))
        }
    }
}

pub fn program_names(cfg: &MainConfig) -> Vec<String> {
    cfg.programs.keys().cloned().collect()
}

/// `alias` lines for every program, optionally one per executable alias
pub fn alias_lines(cfg: &MainConfig, executable: &str, expand: bool) -> Vec<String> {
    let prefix = &cfg.execution.alias_program_prefix;
    let override_prefix = &cfg.execution.property_override_prefix_arg;
    let mut lines = Vec::new();

    for (name, program) in &cfg.programs {
        lines.push(format!("alias {}{}=\"{} run {}\"", prefix, name, executable, name));
        if !expand {
            continue;
        }
        for (alias, _) in &program.aliases {
            lines.push(format!(
                "alias {}{}-{}=\"{} run {} --{}exec={}\"",
                prefix, name, alias, executable, name, override_prefix, alias
            ));
        }
    }
    lines
}

fn cmd_run(cfg: &MainConfig, program: &str, args: &[String], ctx: &RunContext, shell: &dyn Shell) -> Result<()> {
    let prefix = &cfg.execution.property_override_prefix_arg;
    let (tokens, forwarded) = split_override_args(args, prefix);
    let overrides = override_properties(&tokens, prefix)?;
    debug!(program, ?overrides, "running program");

    SandboxExec::new(program, cfg, &overrides, ctx, shell)?.do_run(&forwarded)
}

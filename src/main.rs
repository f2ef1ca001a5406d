//! sandock CLI - run programs inside containers

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sandock::cli::{self, Args};
use sandock::context::RunContext;
use sandock::engine::SystemShell;
use sandock::SandockError;

fn main() {
    let args = Args::parse();
    let ctx = RunContext::from_env(args.debug);
    init_logging(ctx.debug);

    match run(&args, &ctx) {
        Ok(Some(output)) if !output.is_empty() => println!("{}", output),
        Ok(_) => {}
        Err(e) => std::process::exit(report(&e, ctx.debug)),
    }
}

fn run(args: &Args, ctx: &RunContext) -> anyhow::Result<Option<String>> {
    Ok(cli::execute(args, ctx, &SystemShell)?)
}

fn init_logging(debug: bool) {
    let fallback = if debug { "sandock=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Print the failure and return the exit code for it
fn report(err: &anyhow::Error, debug: bool) -> i32 {
    let Some(known) = err.downcast_ref::<SandockError>() else {
        eprintln!("Error: {:?}", err);
        return 1;
    };

    match known {
        SandockError::HelpRequested(usage) => println!("{}", usage),
        SandockError::Usage(usage) => eprintln!("{}", usage),
        _ if debug => eprintln!("Error: {:?}", err),
        // the program already wrote to the terminal, its exit code says the rest
        SandockError::Shell { stderr, .. } if stderr.is_empty() => {}
        _ => eprintln!("Error: {}", known),
    }
    known.exit_code()
}

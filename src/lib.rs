//! Sandock - run programs inside disposable or persistent containers
//!
//! Programs are declared in a YAML or JSON configuration. Sandock resolves
//! the configuration, applies per-run overrides, makes sure custom images,
//! networks and volumes exist and then runs or attaches to the container.
//!
//! # Example
//!
//! ```no_run
//! use sandock::{MainConfig, PropertyOverrides, RunContext, SandboxExec, SystemShell};
//!
//! let ctx = RunContext::from_env(false);
//! let cfg = MainConfig::load(None, &ctx).unwrap();
//! let sandbox = SandboxExec::new("pydev", &cfg, &PropertyOverrides::default(), &ctx, &SystemShell).unwrap();
//! println!("{}", sandbox.run_container_cmd().join(" "));
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod output;
pub mod volume;

pub use config::MainConfig;
pub use context::RunContext;
pub use engine::{PropertyOverrides, SandboxExec, SystemShell};
pub use error::{Result, SandockError};
pub use output::{format_output, OutputFormat};

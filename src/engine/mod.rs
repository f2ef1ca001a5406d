//! Execution engine for sandboxed programs

pub mod adapter;
pub mod attach;
pub mod command;
pub mod image;
pub mod overrides;
pub mod sandbox;
pub mod shell;

pub use adapter::{adapter_for, AppleContainerAdapter, ContainerProbe, DockerAdapter, EngineAdapter};
pub use attach::{decide_attach, AttachDecision};
pub use command::{container_name, exec_container_cmd, run_container_cmd};
pub use image::ImageResolver;
pub use overrides::{override_properties, split_override_args, PropertyOverrides};
pub use sandbox::SandboxExec;
pub use shell::{Shell, ShellOutput, SystemShell};

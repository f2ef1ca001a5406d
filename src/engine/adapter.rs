//! Container engine capabilities
//!
//! Engines differ in their binary, their container subcommands and the JSON
//! shape `inspect` returns. [`EngineAdapter`] hides those differences from
//! the attach decider and the command synthesizer.

use serde_json::Value;

use super::shell::{join_cmd, Shell, ShellOutput};
use crate::config::{Execution, Executor};
use crate::error::Result;

/// Typed outcome of an "inspect container by name" probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerProbe {
    /// Container exists, carrying its normalized status (e.g. `running`)
    Found(String),
    NotFound,
    /// Probe failed for another reason, carrying the engine's stderr
    Failed(String),
}

pub trait EngineAdapter {
    /// Engine binary
    fn bin(&self) -> &str;

    fn inspect_container_args(&self, name: &str) -> Vec<String>;

    fn start_container_args(&self, name: &str) -> Vec<String>;

    /// Status field of the first inspect entry, engines nest it differently
    fn status_of(&self, entry: &Value) -> Option<String>;

    /// Whether a failed inspect means the container does not exist
    fn is_not_found(&self, output: &ShellOutput) -> bool;

    /// Whether `run` accepts `--hostname`
    fn supports_hostname(&self) -> bool {
        true
    }

    fn inspect_image_args(&self, name: &str) -> Vec<String> {
        to_args([self.bin(), "image", "inspect", name])
    }

    fn load_image_args(&self, path: &str) -> Vec<String> {
        to_args([self.bin(), "image", "load", "-i", path])
    }

    fn save_image_args(&self, name: &str, path: &str) -> Vec<String> {
        to_args([self.bin(), "image", "save", name, "--output", path])
    }

    /// `build -t <name> -f <dockerfile> [--build-arg K="V"]... [extra]... [--platform=P] <context>`
    fn build_args(
        &self,
        name: &str,
        dockerfile: &str,
        build_args: &[(String, String)],
        extra: &[String],
        platform: Option<&str>,
        context: &str,
    ) -> Vec<String> {
        let mut args = to_args([self.bin(), "build", "-t", name, "-f", dockerfile]);
        for (key, value) in build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{}=\"{}\"", key, value));
        }
        args.extend(extra.iter().cloned());
        if let Some(platform) = platform {
            args.push(format!("--platform={}", platform));
        }
        args.push(context.to_string());
        args
    }

    /// Inspect a container and classify the outcome
    fn probe(&self, shell: &dyn Shell, name: &str) -> Result<ContainerProbe> {
        let output = shell.run(&join_cmd(&self.inspect_container_args(name)), true)?;

        if !output.success() {
            if self.is_not_found(&output) {
                return Ok(ContainerProbe::NotFound);
            }
            return Ok(ContainerProbe::Failed(output.stderr.trim().to_string()));
        }

        let entries: Value = match serde_json::from_str(output.stdout.trim()) {
            Ok(v) => v,
            Err(e) => return Ok(ContainerProbe::Failed(format!("unreadable inspect output: {}", e))),
        };

        let Some(entry) = entries.as_array().and_then(|list| list.first()) else {
            return Ok(ContainerProbe::NotFound);
        };
        match self.status_of(entry) {
            Some(status) => Ok(ContainerProbe::Found(status.to_lowercase())),
            None => Ok(ContainerProbe::Failed("unreadable container status".to_string())),
        }
    }

    /// Start a stopped container, failing on a non-zero exit
    fn start(&self, shell: &dyn Shell, name: &str) -> Result<()> {
        shell.run_checked(&join_cmd(&self.start_container_args(name)))?;
        Ok(())
    }
}

/// docker-compatible CLIs (docker, podman)
#[derive(Debug, Clone)]
pub struct DockerAdapter {
    bin: String,
}

impl DockerAdapter {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl EngineAdapter for DockerAdapter {
    fn bin(&self) -> &str {
        &self.bin
    }

    fn inspect_container_args(&self, name: &str) -> Vec<String> {
        to_args([self.bin(), "container", "inspect", name])
    }

    fn start_container_args(&self, name: &str) -> Vec<String> {
        to_args([self.bin(), "container", "start", name])
    }

    fn status_of(&self, entry: &Value) -> Option<String> {
        entry
            .get("State")
            .and_then(|state| state.get("Status"))
            .and_then(Value::as_str)
            .map(String::from)
    }

    fn is_not_found(&self, output: &ShellOutput) -> bool {
        output.stderr.to_lowercase().contains("no such container")
    }
}

/// Apple's native `container` CLI
#[derive(Debug, Clone, Default)]
pub struct AppleContainerAdapter;

impl AppleContainerAdapter {
    pub const BIN: &'static str = "container";
}

impl EngineAdapter for AppleContainerAdapter {
    fn bin(&self) -> &str {
        Self::BIN
    }

    fn inspect_container_args(&self, name: &str) -> Vec<String> {
        to_args([Self::BIN, "inspect", name])
    }

    fn start_container_args(&self, name: &str) -> Vec<String> {
        to_args([Self::BIN, "start", name])
    }

    fn status_of(&self, entry: &Value) -> Option<String> {
        entry.get("status").and_then(Value::as_str).map(String::from)
    }

    // a missing container is reported as an empty list, not as an error
    fn is_not_found(&self, _output: &ShellOutput) -> bool {
        false
    }

    fn supports_hostname(&self) -> bool {
        false
    }
}

/// Adapter for a program's executor
pub fn adapter_for(executor: Executor, execution: &Execution) -> Box<dyn EngineAdapter> {
    match executor {
        Executor::Docker => Box::new(DockerAdapter::new(&execution.docker_bin)),
        Executor::AppleContainer => Box::new(AppleContainerAdapter),
    }
}

fn to_args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::shell::testing::FakeShell;

    #[test]
    fn test_docker_probe_running() {
        let shell = FakeShell::new().respond(0, r#"[{"State": {"Status": "running"}}]"#, "");
        let adapter = DockerAdapter::new("docker");

        assert_eq!(
            adapter.probe(&shell, "pydev").unwrap(),
            ContainerProbe::Found("running".to_string())
        );
        assert_eq!(shell.calls(), vec!["docker container inspect pydev"]);
    }

    #[test]
    fn test_docker_probe_not_found_and_failure() {
        let shell = FakeShell::new()
            .respond(1, "", "Error: No such container: pydev")
            .respond(1, "[]", "Error: no such container pydev")
            .respond(1, "", "unexpected error")
            .respond(0, "[]", "");
        let adapter = DockerAdapter::new("podman");

        assert_eq!(adapter.probe(&shell, "pydev").unwrap(), ContainerProbe::NotFound);
        assert_eq!(adapter.probe(&shell, "pydev").unwrap(), ContainerProbe::NotFound);
        assert_eq!(
            adapter.probe(&shell, "pydev").unwrap(),
            ContainerProbe::Failed("unexpected error".to_string())
        );
        assert_eq!(adapter.probe(&shell, "pydev").unwrap(), ContainerProbe::NotFound);
        assert_eq!(shell.calls()[0], "podman container inspect pydev");
    }

    #[test]
    fn test_apple_probe_flat_status() {
        let shell = FakeShell::new()
            .respond(0, r#"[{"status": "stopped"}]"#, "")
            .respond(1, "", "No such container");
        let adapter = AppleContainerAdapter;

        assert_eq!(
            adapter.probe(&shell, "pydev").unwrap(),
            ContainerProbe::Found("stopped".to_string())
        );
        assert!(matches!(
            adapter.probe(&shell, "pydev").unwrap(),
            ContainerProbe::Failed(_)
        ));
        assert_eq!(shell.calls()[0], "container inspect pydev");
    }

    #[test]
    fn test_probe_without_status_fails() {
        let shell = FakeShell::new()
            .respond(0, r#"[{"Id": "abc"}]"#, "")
            .respond(0, r#"[{"status": "running"}]"#, "");
        let adapter = DockerAdapter::new("docker");

        assert_eq!(
            adapter.probe(&shell, "pydev").unwrap(),
            ContainerProbe::Failed("unreadable container status".to_string())
        );
        assert_eq!(
            adapter.probe(&shell, "pydev").unwrap(),
            ContainerProbe::Failed("unreadable container status".to_string())
        );
    }

    #[test]
    fn test_build_args() {
        let adapter = DockerAdapter::new("docker");
        let args = adapter.build_args(
            "custom",
            "/tmp/Dockerfile",
            &[("USER".to_string(), "another".to_string())],
            &["--progress=quiet".to_string()],
            Some("linux/amd64"),
            "/ctx",
        );

        assert_eq!(
            join_cmd(&args),
            "docker build -t custom -f /tmp/Dockerfile --build-arg USER=\"another\" --progress=quiet --platform=linux/amd64 /ctx"
        );
    }

    #[test]
    fn test_start_failure_propagates() {
        let shell = FakeShell::new().respond(125, "", "cannot start");
        let err = DockerAdapter::new("docker").start(&shell, "pydev").unwrap_err();
        assert_eq!(err.exit_code(), 125);
    }
}

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
execution:
  docker_bin: echo
programs:
  pydev:
    image: python:3.11
    exec: python3
    aliases:
      sh: /bin/bash
  failing:
    image: alpine:3
    exec: sh
    pre_exec_cmds:
      - exit 3
"#;

struct Sandbox {
    home: TempDir,
    work: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            home: TempDir::new().unwrap(),
            work: TempDir::new().unwrap(),
        };
        fs::write(sandbox.home.path().join(".sandock.yml"), CONFIG).unwrap();
        sandbox
    }

    fn cmd(&self) -> Command {
        self.cmd_in(self.work.path())
    }

    fn cmd_in(&self, dir: &Path) -> Command {
        let mut cmd = Command::cargo_bin("sandock").unwrap();
        cmd.current_dir(dir)
            .env("HOME", self.home.path())
            .env_remove("SNDK_CFG")
            .env_remove("SNDK_DEBUG")
            .env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_list_programs() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout("pydev\nfailing\n");
}

#[test]
fn test_list_programs_json() {
    let sandbox = Sandbox::new();
    let output = sandbox.cmd().args(["--json", "list"]).output().unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed, serde_json::json!(["pydev", "failing"]));
}

#[test]
fn test_alias_expand() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["alias", "--expand"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"alias pydev="sandock run pydev""#))
        .stdout(predicate::str::contains(
            r#"alias pydev-sh="sandock run pydev --sandbox-arg-exec=sh""#,
        ));
}

#[test]
fn test_run_builds_command_line() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["run", "pydev", "--sandbox-arg-hostname=devbox", "--version"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("run --entrypoint python3 --name sandock-pydev-"))
        .stdout(predicate::str::contains("--rm -it --hostname devbox"))
        .stdout(predicate::str::contains(":/sandbox --workdir /sandbox python:3.11 --version"));
}

#[test]
fn test_run_exec_alias_override() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["run", "pydev", "--sandbox-arg-exec=sh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--entrypoint /bin/bash"));
}

#[test]
fn test_override_help() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["run", "pydev", "--sandbox-arg-help"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("--sandbox-arg-env=KEY=VALUE"));
}

#[test]
fn test_malformed_override_exits_2() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["run", "pydev", "--sandbox-arg-env=NOVALUE"])
        .assert()
        .code(2);
}

#[test]
fn test_pre_exec_failure_exit_code() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["run", "failing"]).assert().code(3);
}

#[test]
fn test_unknown_program() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["run", "ruby33"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("`ruby33` is not defined"));
}

#[test]
fn test_refuses_home_dir() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd_in(sandbox.home.path())
        .args(["run", "pydev"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot be ran on top of home directory"));
}

#[test]
fn test_no_configuration() {
    let sandbox = Sandbox::new();
    fs::remove_file(sandbox.home.path().join(".sandock.yml")).unwrap();

    sandbox
        .cmd()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no main configuration can be read"));
}

#[test]
fn test_explicit_config_missing() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--config", "/nonexistent/sandock.yml", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("main configuration is not found"));
}

#[test]
fn test_env_config_path_and_dir_conf() {
    let sandbox = Sandbox::new();
    let alt = sandbox.home.path().join("alt.json");
    fs::write(
        &alt,
        r#"{"execution": {"docker_bin": "echo"}, "programs": {"rb": {"image": "ruby:3.3", "exec": "ruby"}}}"#,
    )
    .unwrap();
    fs::write(
        sandbox.work.path().join(".sandock.json"),
        r#"{"programs": {"node": {"image": "node:22", "exec": "node"}}}"#,
    )
    .unwrap();

    sandbox
        .cmd()
        .env("SNDK_CFG", &alt)
        .arg("list")
        .assert()
        .success()
        .stdout("rb\nnode\n");
}

#[test]
fn test_empty_dir_conf_section_keeps_programs() {
    let sandbox = Sandbox::new();
    fs::write(
        sandbox.work.path().join(".sandock.json"),
        r#"{"programs": null, "volumes": {}}"#,
    )
    .unwrap();

    sandbox
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout("pydev\nfailing\n");
}

#[test]
fn test_volume_list() {
    let sandbox = Sandbox::new();
    // `echo` prints the arguments instead of JSON lines, which must fail to decode
    sandbox.cmd().args(["volume", "list"]).assert().code(1);
}

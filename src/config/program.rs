//! Program value objects

use serde_json::Value;

use super::fields::{Fields, Pairs};
use super::image::ImageBuild;
use crate::error::{Result, SandockError};

/// Which engine adapter runs a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Executor {
    /// docker-compatible CLI named by `execution.docker_bin` (docker, podman)
    #[default]
    Docker,
    /// Apple's native `container` CLI
    AppleContainer,
}

impl Executor {
    fn parse(path: &str, value: Option<String>) -> Result<Self> {
        match value.as_deref() {
            None | Some("docker") => Ok(Executor::Docker),
            Some("apple_container") => Ok(Executor::AppleContainer),
            Some(other) => Err(SandockError::config(format!(
                "`{}` has unknown executor `{}`, valid options are docker, apple_container",
                path, other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerUser {
    pub uid: u32,
    pub gid: u32,
    /// Run as the invoking user's uid/gid
    pub keep_id: bool,
}

impl ContainerUser {
    pub fn new(uid: u32, gid: u32, keep_id: bool) -> Result<Self> {
        if keep_id && uid != 0 {
            return Err(SandockError::config(
                "cannot enabled on `keep_id` and set custom on `uid` in same time",
            ));
        }
        if keep_id && gid != 0 {
            return Err(SandockError::config(
                "cannot enabled on `keep_id` and set custom on `gid` in same time",
            ));
        }

        Ok(Self { uid, gid, keep_id })
    }

    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let mut f = Fields::new(path, value)?;
        let uid = f.u32_or("uid", 0)?;
        let gid = f.u32_or("gid", 0)?;
        let keep_id = f.bool_or("keep_id", false)?;
        f.finish()?;

        Self::new(uid, gid, keep_id).map_err(|e| prefixed(path, e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistContainer {
    pub enable: bool,
    /// Start a stopped persistent container instead of running a new one
    pub auto_start: bool,
}

impl Default for PersistContainer {
    fn default() -> Self {
        Self {
            enable: false,
            auto_start: true,
        }
    }
}

impl PersistContainer {
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let mut f = Fields::new(path, value)?;
        let persist = Self {
            enable: f.bool_or("enable", false)?,
            auto_start: f.bool_or("auto_start", true)?,
        };
        f.finish()?;
        Ok(persist)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxMount {
    pub enable: bool,
    pub read_only: bool,
    /// Mount target of the current directory, also the container workdir
    pub current_dir_mount: String,
}

impl Default for SandboxMount {
    fn default() -> Self {
        Self {
            enable: true,
            read_only: false,
            current_dir_mount: "/sandbox".to_string(),
        }
    }
}

impl SandboxMount {
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let mut f = Fields::new(path, value)?;
        let mount = Self {
            enable: f.bool_or("enable", true)?,
            read_only: f.bool_or("read_only", false)?,
            current_dir_mount: f.string_or("current_dir_mount", "/sandbox")?,
        };
        f.finish()?;
        Ok(mount)
    }
}

/// One sandboxed workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub image: String,
    /// Executable path or a key of `aliases`
    pub exec: String,
    pub interactive: bool,
    pub allow_home_dir: bool,
    /// Stable container name, required for persistent programs to be reused
    pub name: Option<String>,
    pub network: Option<String>,
    pub hostname: Option<String>,
    pub user: Option<ContainerUser>,
    pub persist: PersistContainer,
    pub build: Option<ImageBuild>,
    pub workdir: Option<String>,
    pub platform: Option<String>,
    pub executor: Executor,
    pub env: Pairs,
    pub aliases: Pairs,
    pub volumes: Vec<String>,
    pub ports: Vec<String>,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub extra_run_args: Vec<String>,
    pub pre_exec_cmds: Vec<String>,
    pub sandbox_mount: SandboxMount,
}

impl Program {
    /// Minimal program with every optional setting at its default
    pub fn new(image: impl Into<String>, exec: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            exec: exec.into(),
            interactive: true,
            allow_home_dir: false,
            name: None,
            network: None,
            hostname: None,
            user: None,
            persist: PersistContainer::default(),
            build: None,
            workdir: None,
            platform: None,
            executor: Executor::Docker,
            env: Vec::new(),
            aliases: Vec::new(),
            volumes: Vec::new(),
            ports: Vec::new(),
            cap_add: Vec::new(),
            cap_drop: Vec::new(),
            extra_run_args: Vec::new(),
            pre_exec_cmds: Vec::new(),
            sandbox_mount: SandboxMount::default(),
        }
    }

    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let mut f = Fields::new(path, value)?;

        let program = Self {
            image: f.string("image")?,
            exec: f.string("exec")?,
            interactive: f.bool_or("interactive", true)?,
            allow_home_dir: f.bool_or("allow_home_dir", false)?,
            name: f.opt_string("name")?,
            network: f.opt_string("network")?,
            hostname: f.opt_string("hostname")?,
            user: f.opt_object("user", ContainerUser::from_value)?,
            persist: f.object("persist", PersistContainer::from_value)?,
            build: f.opt_object("build", ImageBuild::from_value)?,
            workdir: f.opt_string("workdir")?,
            platform: f.opt_string("platform")?,
            executor: {
                let executor = f.opt_string("executor")?;
                Executor::parse(&f.child("executor"), executor)?
            },
            env: f.pairs("env")?,
            aliases: f.pairs("aliases")?,
            volumes: f.string_list("volumes")?,
            ports: f.string_list("ports")?,
            cap_add: f.string_list("cap_add")?,
            cap_drop: f.string_list("cap_drop")?,
            extra_run_args: f.string_list("extra_run_args")?,
            pre_exec_cmds: f.string_list("pre_exec_cmds")?,
            sandbox_mount: f.object("sandbox_mount", SandboxMount::from_value)?,
        };
        f.finish()?;

        program.validate().map_err(|e| prefixed(path, e))?;
        Ok(program)
    }

    /// Cross-field invariants, rerun after overrides replace fields
    pub fn validate(&self) -> Result<()> {
        if self.workdir.is_some() && self.sandbox_mount.enable {
            return Err(SandockError::config(
                "cannot use workdir with enabled sandbox mount in the same time",
            ));
        }
        Ok(())
    }

    /// Executable path with alias lookup applied
    pub fn exec_path(&self) -> &str {
        self.aliases
            .iter()
            .find(|(alias, _)| alias == &self.exec)
            .map(|(_, target)| target.as_str())
            .unwrap_or(&self.exec)
    }
}

/// Attach the object path to a constructor-level invariant failure
fn prefixed(path: &str, err: SandockError) -> SandockError {
    match err {
        SandockError::Config(msg) => SandockError::Config(format!("`{}`: {}", path, msg)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(extra: Value) -> Result<Program> {
        let mut value = json!({"image": "custom_img", "exec": "/bin/bash"});
        if let (Value::Object(base), Value::Object(extra)) = (&mut value, extra) {
            base.extend(extra);
        }
        Program::from_value("programs.test", &value)
    }

    #[test]
    fn test_defaults() {
        let o = obj(json!({})).unwrap();

        assert!(o.interactive);
        assert!(!o.allow_home_dir);
        assert!(o.name.is_none());
        assert!(o.network.is_none());
        assert!(o.hostname.is_none());
        assert!(o.user.is_none());
        assert_eq!(o.persist, PersistContainer::default());
        assert!(o.build.is_none());
        assert!(o.workdir.is_none());
        assert!(o.platform.is_none());
        assert_eq!(o.executor, Executor::Docker);
        assert!(o.env.is_empty());
        assert!(o.aliases.is_empty());
        assert!(o.volumes.is_empty());
        assert!(o.ports.is_empty());
        assert!(o.cap_add.is_empty());
        assert!(o.cap_drop.is_empty());
        assert!(o.extra_run_args.is_empty());
        assert!(o.pre_exec_cmds.is_empty());
        assert_eq!(o.sandbox_mount, SandboxMount::default());
        assert_eq!(o, Program::new("custom_img", "/bin/bash"));
    }

    #[test]
    fn test_nested_objects() {
        let o = obj(json!({
            "build": {"dockerfile_inline": "FROM ubuntu:22.04"},
            "user": {"keep_id": true},
            "persist": {"enable": true, "auto_start": false},
            "sandbox_mount": {"enable": false, "current_dir_mount": "/abc"}
        }))
        .unwrap();

        assert_eq!(
            o.build.unwrap().dockerfile_inline.as_deref(),
            Some("FROM ubuntu:22.04")
        );
        assert_eq!(o.user, Some(ContainerUser { uid: 0, gid: 0, keep_id: true }));
        assert_eq!(o.persist, PersistContainer { enable: true, auto_start: false });
        assert_eq!(
            o.sandbox_mount,
            SandboxMount {
                enable: false,
                read_only: false,
                current_dir_mount: "/abc".to_string()
            }
        );
    }

    #[test]
    fn test_container_user_validations() {
        let err = ContainerUser::new(1000, 0, true).unwrap_err().to_string();
        assert!(err.contains("cannot enabled on `keep_id` and set custom on `uid` in same time"));

        let err = ContainerUser::new(0, 1000, true).unwrap_err().to_string();
        assert!(err.contains("cannot enabled on `keep_id` and set custom on `gid` in same time"));

        assert!(ContainerUser::new(1000, 1000, false).is_ok());
    }

    #[test]
    fn test_workdir_with_sandbox_mount() {
        let err = obj(json!({"sandbox_mount": {"enable": true}, "workdir": "/some/path"}))
            .unwrap_err()
            .to_string();
        assert!(err.contains("cannot use workdir with enabled sandbox mount in the same time"));

        let o = obj(json!({"sandbox_mount": {"enable": false}, "workdir": "/some/path"})).unwrap();
        assert_eq!(o.workdir.as_deref(), Some("/some/path"));
    }

    #[test]
    fn test_executor() {
        let o = obj(json!({"executor": "apple_container"})).unwrap();
        assert_eq!(o.executor, Executor::AppleContainer);
        assert!(obj(json!({"executor": "lxc"})).is_err());
    }

    #[test]
    fn test_exec_path() {
        let mut o = Program::new("img", "sh");
        o.aliases = vec![("sh".to_string(), "/bin/bash".to_string())];
        assert_eq!(o.exec_path(), "/bin/bash");

        o.exec = "irb".to_string();
        assert_eq!(o.exec_path(), "irb");
    }

    #[test]
    fn test_missing_required() {
        let err = Program::from_value("programs.x", &json!({"exec": "sh"}))
            .unwrap_err()
            .to_string();
        assert!(err.contains("`programs.x.image` is required"));
    }
}

//! Custom image materialization
//!
//! A program image that names an entry of the image registry is built on
//! demand, parents first, optionally going through a tarball cache so a fresh
//! machine can `image load` instead of rebuilding.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info, warn};

use super::adapter::EngineAdapter;
use super::shell::{join_cmd, Shell};
use crate::config::{ImageBuild, Named, Program};
use crate::context::RunContext;
use crate::error::{Result, SandockError};

/// Directory under the home directory holding cached image tarballs
pub const DUMP_DIR: &str = ".sandock_dump_images";

/// Hex characters of the recipe digest kept in cache file names
const HASH_SUFFIX_LEN: usize = 20;

/// Dockerfile on disk for the duration of one build
enum Dockerfile {
    Inline(NamedTempFile),
    File(PathBuf),
}

impl Dockerfile {
    fn path(&self) -> &Path {
        match self {
            Dockerfile::Inline(file) => file.path(),
            Dockerfile::File(path) => path,
        }
    }
}

/// Build context directory, ephemeral unless configured
enum BuildContext {
    Temp(TempDir),
    Dir(PathBuf),
}

impl BuildContext {
    fn path(&self) -> &Path {
        match self {
            BuildContext::Temp(dir) => dir.path(),
            BuildContext::Dir(path) => path,
        }
    }
}

pub struct ImageResolver<'a> {
    registry: BTreeMap<&'a str, &'a ImageBuild>,
    /// Platform used when a recipe does not set its own
    platform: Option<&'a str>,
    adapter: &'a dyn EngineAdapter,
    shell: &'a dyn Shell,
    ctx: &'a RunContext,
}

impl<'a> ImageResolver<'a> {
    /// Resolver over the configured images plus the program's own recipe
    pub fn for_program(
        program: &'a Program,
        images: &'a Named<ImageBuild>,
        adapter: &'a dyn EngineAdapter,
        shell: &'a dyn Shell,
        ctx: &'a RunContext,
    ) -> Self {
        let mut registry: BTreeMap<&str, &ImageBuild> =
            images.iter().map(|(name, build)| (name.as_str(), build)).collect();
        if let Some(build) = &program.build {
            registry.insert(program.image.as_str(), build);
        }

        Self {
            registry,
            platform: program.platform.as_deref(),
            adapter,
            shell,
            ctx,
        }
    }

    /// Also resolve parents declared as other programs' `build` recipes
    pub fn with_program_recipes(mut self, programs: &'a Named<Program>) -> Self {
        for (_, program) in programs {
            if let Some(build) = &program.build {
                self.registry.entry(program.image.as_str()).or_insert(build);
            }
        }
        self
    }

    /// Make sure `image` exists locally, a no-op for pullable references
    pub fn ensure(&self, image: &str) -> Result<()> {
        if !self.registry.contains_key(image) {
            debug!(image, "not a custom image");
            return Ok(());
        }
        self.ensure_chain(image, &mut Vec::new())
    }

    fn ensure_chain(&self, name: &str, chain: &mut Vec<String>) -> Result<()> {
        let build = self
            .registry
            .get(name)
            .copied()
            .ok_or_else(|| SandockError::config(format!("image `{}` is not defined", name)))?;

        if chain.iter().any(|seen| seen == name) {
            chain.push(name.to_string());
            return Err(SandockError::config(format!(
                "circular `depends_on` chain: {}",
                chain.join(" -> ")
            )));
        }
        chain.push(name.to_string());

        if let Some(parent) = &build.depends_on {
            self.ensure_chain(parent, chain)?;
        }

        self.materialize(name, build)
    }

    fn materialize(&self, name: &str, build: &ImageBuild) -> Result<()> {
        let inspect = join_cmd(&self.adapter.inspect_image_args(name));
        if self.shell.run(&inspect, true)?.success() {
            debug!(image = name, "image already exists");
            return Ok(());
        }

        let dockerfile = self.dockerfile(build)?;
        let context = self.context(build)?;

        let store = if build.dump.enable {
            let store = self.store_path(dockerfile.path(), name, build)?;
            if store.exists() {
                info!(image = name, store = %store.display(), "loading cached image");
                let load = self.adapter.load_image_args(&store.to_string_lossy());
                self.shell.run_checked(&join_cmd(&load))?;
                return Ok(());
            }
            Some(store)
        } else {
            None
        };

        info!(image = name, "building custom image");
        let args = self.adapter.build_args(
            name,
            &dockerfile.path().to_string_lossy(),
            &build.args,
            &build.extra_build_args,
            self.platform_of(build),
            &context.path().to_string_lossy(),
        );
        self.shell.run_checked(&join_cmd(&args))?;

        if let Some(store) = store {
            self.dump(name, build, &store)?;
        }
        Ok(())
    }

    fn dump(&self, name: &str, build: &ImageBuild, store: &Path) -> Result<()> {
        if let Some(dir) = store.parent() {
            if build.dump.store.is_none() {
                // `org/img` lands in an `org` subdirectory as `img:...tar`
                evict_stale(dir, name.rsplit('/').next().unwrap_or(name))?;
            }
            fs::create_dir_all(dir)?;
        }

        info!(image = name, store = %store.display(), "saving image to cache");
        let save = self.adapter.save_image_args(name, &store.to_string_lossy());
        self.shell.run_checked(&join_cmd(&save))?;
        Ok(())
    }

    fn dockerfile(&self, build: &ImageBuild) -> Result<Dockerfile> {
        if let Some(inline) = &build.dockerfile_inline {
            let mut file = tempfile::Builder::new()
                .prefix("sandock-")
                .suffix(".Dockerfile")
                .tempfile()?;
            file.write_all(inline.as_bytes())?;
            file.flush()?;
            return Ok(Dockerfile::Inline(file));
        }

        let path = match &build.docker_file {
            Some(path) => PathBuf::from(self.ctx.expand_home(path)),
            None => match &build.context {
                Some(context) => Path::new(&self.ctx.expand_home(context)).join("Dockerfile"),
                None => {
                    return Err(SandockError::config(
                        "image build needs `dockerfile_inline`, `dockerFile` or a `context` holding a Dockerfile",
                    ))
                }
            },
        };
        Ok(Dockerfile::File(path))
    }

    fn context(&self, build: &ImageBuild) -> Result<BuildContext> {
        match &build.context {
            Some(context) => Ok(BuildContext::Dir(PathBuf::from(self.ctx.expand_home(context)))),
            None => Ok(BuildContext::Temp(tempfile::Builder::new().prefix("sandock-ctx-").tempdir()?)),
        }
    }

    fn platform_of<'b>(&'b self, build: &'b ImageBuild) -> Option<&'b str> {
        build.platform.as_deref().or(self.platform)
    }

    /// Cache tarball of an image recipe
    ///
    /// `<home>/.sandock_dump_images/<image>:<platform slug><digest>.tar` unless
    /// `dump.store` names an explicit path.
    pub fn store_path(&self, dockerfile: &Path, name: &str, build: &ImageBuild) -> Result<PathBuf> {
        if let Some(store) = &build.dump.store {
            return Ok(PathBuf::from(self.ctx.expand_home(store)));
        }

        let content = fs::read(dockerfile)?;
        let platform = self
            .platform_of(build)
            .map(|p| p.replace('/', "_"))
            .unwrap_or_default();

        Ok(self.ctx.home_dir.join(DUMP_DIR).join(format!(
            "{}:{}{}.tar",
            name,
            platform,
            recipe_digest(&content, &build.args)
        )))
    }
}

/// Digest prefix over the dockerfile bytes and the build arguments
pub fn recipe_digest(dockerfile: &[u8], args: &[(String, String)]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(dockerfile);
    for (key, value) in args {
        hasher.update(format!("{}={}\n", key, value).as_bytes());
    }

    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..HASH_SUFFIX_LEN].to_string()
}

/// Remove earlier tarballs of the same image, `<image>*.tar`
fn evict_stale(dir: &Path, image: &str) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name.starts_with(image) && file_name.ends_with(".tar") {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "evicted stale image cache"),
                Err(e) => warn!(path = %path.display(), error = %e, "cannot evict stale image cache"),
            }
        }
    }
    Ok(())
}

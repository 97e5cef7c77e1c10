//! Optional defaults for the verifier, read from TOML.
//!
//! Lookup order (first file that sets a value wins):
//!   1. `{project_root}/.render-verify/config.toml`
//!   2. `{user_dir}/config.toml`
//!
//! The project root is the nearest ancestor of the working directory that
//! contains `.git` or `.render-verify/`. The user dir is `RENDER_VERIFY_HOME`
//! when set and non-empty, otherwise `{config_dir}/render-verify`.
//!
//! Command-line flags and `RENDER_VERIFY_EXE` take precedence over both
//! files; that layering happens in `main`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const PROJECT_DIR: &str = ".render-verify";
pub const CONFIG_FILE: &str = "config.toml";
pub const HOME_ENV: &str = "RENDER_VERIFY_HOME";

/// Parsed contents of one config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Render executable used when none is given on the command line.
    pub render_exe: Option<PathBuf>,
}

impl VerifierConfig {
    /// Load using auto-detected paths: project config under the project root
    /// for `cwd`, then the user config.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let root = project_root_for(cwd);
        let global = user_dir().map(|d| d.join(CONFIG_FILE));
        Self::load_from(Some(&root), global.as_deref())
    }

    /// Load from explicit locations. Missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load_from(
        project_root: Option<&Path>,
        global_config: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let from_project = match project_root {
            Some(root) => try_load(&root.join(PROJECT_DIR).join(CONFIG_FILE), root)?,
            None => None,
        };
        let from_global = match global_config {
            Some(path) => try_load(path, path.parent().unwrap_or_else(|| Path::new(".")))?,
            None => None,
        };

        let render_exe = from_project
            .and_then(|c| c.render_exe)
            .or_else(|| from_global.and_then(|c| c.render_exe));
        Ok(Self { render_exe })
    }
}

/// Try to load a config from `path`, resolving relative paths inside it
/// against `base_dir`. Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or contains invalid TOML.
pub fn try_load(path: &Path, base_dir: &Path) -> anyhow::Result<Option<VerifierConfig>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read config file: {}", path.display())));
        }
    };
    let mut cfg: VerifierConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    cfg.render_exe = cfg.render_exe.map(|exe| resolve_exe(&exe, base_dir));
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(Some(cfg))
}

/// Bare program names are left alone for `PATH` lookup; anything with a
/// directory component is anchored at `base_dir` unless already absolute.
fn resolve_exe(exe: &Path, base_dir: &Path) -> PathBuf {
    if exe.is_absolute() || exe.components().count() <= 1 {
        exe.to_path_buf()
    } else {
        base_dir.join(exe)
    }
}

/// Walk up from `dir` to find the nearest ancestor containing `.git` or
/// `.render-verify/`. Falls back to `dir` itself if neither is found.
pub fn project_root_for(dir: &Path) -> PathBuf {
    let mut current = dir.to_path_buf();
    loop {
        if current.join(".git").exists() || current.join(PROJECT_DIR).is_dir() {
            return current;
        }
        if !current.pop() {
            break;
        }
    }
    dir.to_path_buf()
}

/// User-level config directory.
pub fn user_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV)
        && !home.is_empty()
    {
        return Some(PathBuf::from(home));
    }
    dirs::config_dir().map(|d| d.join("render-verify"))
}

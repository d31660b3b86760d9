//! Backend configuration
//!
//! Configuration is environment-first: `XDG_RUNTIME_DIR` locates the
//! backing-file directory (mandatory), `WAYBRIDGE_NO_DECORATIONS`
//! disables client-side decorations. An optional TOML file can
//! pre-seed the same values; environment variables win over the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BackendError;
use crate::pixel::ColorDepth;

/// Environment variable that disables client-side decorations when set
/// to anything other than `0`.
pub const ENV_NO_DECORATIONS: &str = "WAYBRIDGE_NO_DECORATIONS";

/// Environment variable overriding the default window title.
pub const ENV_TITLE: &str = "WAYBRIDGE_TITLE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Directory for shared-memory backing files. Defaults to
    /// `$XDG_RUNTIME_DIR`; construction fails if neither is available.
    #[serde(default)]
    pub runtime_dir: Option<PathBuf>,

    /// Skip titlebar/button subsurfaces entirely.
    #[serde(default)]
    pub disable_decorations: bool,

    /// Title and app id for lazily created windows.
    #[serde(default = "BackendConfig::default_title")]
    pub title: String,

    /// Color depth of the rendering library's pixel pipeline; drives
    /// wl_shm format negotiation.
    #[serde(default)]
    pub color_depth: ColorDepth,

    /// Cursor theme size in pixels.
    #[serde(default = "BackendConfig::default_cursor_size")]
    pub cursor_size: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            runtime_dir: None,
            disable_decorations: false,
            title: Self::default_title(),
            color_depth: ColorDepth::default(),
            cursor_size: Self::default_cursor_size(),
        }
    }
}

impl BackendConfig {
    fn default_title() -> String {
        "waybridge".to_string()
    }

    fn default_cursor_size() -> u32 {
        32
    }

    /// Load configuration from a TOML file, then apply environment
    /// overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config: BackendConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply recognized environment variables on top of the current
    /// values.
    pub fn apply_env(&mut self) {
        if let Ok(v) = env::var(ENV_NO_DECORATIONS) {
            self.disable_decorations = !v.is_empty() && v != "0";
        }
        if let Ok(title) = env::var(ENV_TITLE) {
            if !title.is_empty() {
                self.title = title;
            }
        }
    }

    /// Resolve the backing-file directory. The configured path wins;
    /// otherwise `$XDG_RUNTIME_DIR` is consulted. Absence is fatal to
    /// backend construction.
    pub fn resolve_runtime_dir(&self) -> Result<PathBuf, BackendError> {
        if let Some(dir) = &self.runtime_dir {
            return Ok(dir.clone());
        }
        env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(BackendError::NoRuntimeDir)
    }
}

#[cfg(test)]
mod tests;

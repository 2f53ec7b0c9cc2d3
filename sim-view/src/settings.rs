//! Start-up settings of the viewer, read from an optional TOML file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use circles_core::config::Snapshot;
use serde::Deserialize;
use tracing::info;

pub const DEFAULT_SETTINGS_FILE: &str = "circles.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    /// Directory exported CSV files are written to.
    pub export_dir: PathBuf,
    /// Initial values of the form controls.
    pub form: Snapshot,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("."),
            form: Snapshot::default(),
        }
    }
}

impl PanelSettings {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse settings TOML")
    }
}

/// Loads the settings.
///
/// An explicit `path` must exist. Without one, `circles.toml` in the working
/// directory is used when present, defaults otherwise. `CIRCLES_EXPORT_DIR`
/// overrides the export directory either way.
pub fn load(path: Option<&Path>) -> Result<PanelSettings> {
    let mut settings = match path {
        Some(path) => read_file(path)?,
        None => {
            let fallback = Path::new(DEFAULT_SETTINGS_FILE);
            if fallback.is_file() {
                read_file(fallback)?
            } else {
                PanelSettings::default()
            }
        }
    };

    if let Ok(dir) = std::env::var("CIRCLES_EXPORT_DIR") {
        settings.export_dir = PathBuf::from(dir);
    }
    Ok(settings)
}

fn read_file(path: &Path) -> Result<PanelSettings> {
    let txt = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let settings = PanelSettings::from_toml(&txt)?;
    info!("settings loaded from {}", path.display());
    Ok(settings)
}

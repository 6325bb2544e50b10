//! Runtime configuration, layered from an optional TOML file and
//! `WATERTEMP_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use serde::Deserialize;
use watertemp_sync::ChartStyle;

/// Deserialised from `watertemp.toml`; every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// SQLite file holding the measurements. A leading `~/` is expanded.
  pub store_path: PathBuf,
  pub chart:      ChartStyle,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("watertemperature.db3"),
      chart:      ChartStyle::default(),
    }
  }
}

impl AppConfig {
  /// Read `path` if it exists, then apply environment overrides
  /// (`WATERTEMP_STORE_PATH`, `WATERTEMP_CHART__COLOR_HINT`, ...).
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("WATERTEMP")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut cfg: AppConfig = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;
    if !cfg.chart.has_valid_label_format() {
      bail!("invalid chart.label_format {:?}", cfg.chart.label_format);
    }
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

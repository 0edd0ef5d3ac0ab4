use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub(crate) const CONFIG_FILE: &str = "expense-tracker.toml";
const ENV_PREFIX: &str = "EXPENSE_TRACKER";
const DEFAULT_LOG_FILTER: &str = "expense_tracker=warn";

/// Settings resolved from defaults, an optional `expense-tracker.toml` in the
/// data directory, then `EXPENSE_TRACKER_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AppConfig {
    pub(crate) database_path: PathBuf,
    pub(crate) chart_dir: PathBuf,
    /// Used when `--user` is not given.
    #[serde(default)]
    pub(crate) default_user: Option<String>,
    pub(crate) log_filter: String,
}

impl AppConfig {
    pub(crate) fn load() -> Result<Self> {
        let data_dir = data_dir()?;
        Self::layered(&data_dir, Some(env_source())).context("Failed to load configuration")
    }

    fn layered(data_dir: &Path, env: Option<Environment>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default(
                "database_path",
                data_dir.join("expenses.db").to_string_lossy().into_owned(),
            )?
            .set_default(
                "chart_dir",
                data_dir.join("charts").to_string_lossy().into_owned(),
            )?
            .set_default("log_filter", DEFAULT_LOG_FILTER)?
            .add_source(File::from(data_dir.join(CONFIG_FILE)).required(false));
        if let Some(env) = env {
            builder = builder.add_source(env);
        }
        builder.build()?.try_deserialize()
    }

    #[cfg(test)]
    fn from_dir(data_dir: &Path) -> Result<Self, ConfigError> {
        Self::layered(data_dir, None)
    }

    /// Create the directory holding the database file.
    pub(crate) fn ensure_data_dir(&self) -> Result<()> {
        if let Some(parent) = self.database_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        Ok(())
    }
}

/// `EXPENSE_TRACKER_DEFAULT_USER=alice` sets `default_user`.
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn data_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "expense-tracker", "ExpenseTracker")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

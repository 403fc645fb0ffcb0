use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::store::query::DEFAULT_MIME_TYPE;
use crate::store::DEFAULT_PAGE_SIZE;

pub const APP_DIR: &str = "photo-dedup";
pub const ENV_PREFIX: &str = "PHOTO_DEDUP";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Exported listing to read when `--listing` is not given.
    pub listing: Option<PathBuf>,
    /// Where the trash ledger and history live.
    pub state_dir: PathBuf,
    pub mime_type: String,
    pub page_size: usize,
    /// Run the renamed-file pass without `--fuzzy`.
    pub fuzzy: bool,
    pub log_level: String,
}

impl Settings {
    /// Defaults, then the config file, then `PHOTO_DEDUP_*` variables.
    pub fn load(config_file: Option<&Path>) -> Result<Settings, ConfigError> {
        let default_file = app_dir().join("config.toml");
        let file = config_file.unwrap_or(&default_file);

        Config::builder()
            .set_default("state_dir", app_dir().to_string_lossy().into_owned())?
            .set_default("mime_type", DEFAULT_MIME_TYPE)?
            .set_default("page_size", DEFAULT_PAGE_SIZE as i64)?
            .set_default("fuzzy", false)?
            .set_default("log_level", "info")?
            .add_source(ConfigFile::from(file).required(config_file.is_some()))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize::<Settings>()
    }
}

/// `~/.config/photo-dedup` or the platform equivalent.
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

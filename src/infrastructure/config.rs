// Application configuration - file settings layered with environment overrides
use serde::Deserialize;
use std::path::PathBuf;

/// `storage.dir` value that keeps everything in memory.
pub const IN_MEMORY_STORAGE: &str = ":memory:";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub reference: ReferenceSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub dir: String,
}

impl StorageSettings {
    pub fn is_in_memory(&self) -> bool {
        self.dir == IN_MEMORY_STORAGE
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReferenceSettings {
    pub path: String,
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from("config/station-reports")
}

/// Load `<name>.toml` (optional) overlaid with `STATION_REPORTS__*` variables.
pub fn load_app_config_from(name: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .set_default("server.addr", "0.0.0.0:8080")?
        .set_default("storage.dir", "data")?
        .set_default("reference.path", "config/reference.toml")?
        .add_source(config::File::with_name(name).required(false))
        .add_source(config::Environment::with_prefix("STATION_REPORTS").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

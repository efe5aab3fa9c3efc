use crate::db::schema::DATABASE_NAME;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `LOGIN_STORE_DATABASE__DATA_DIR`.
pub const ENV_PREFIX: &str = "LOGIN_STORE_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub loglevel: String,
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `LOGIN_STORE_*` environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

/// Where the credential database lives and how it is opened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Application-private directory holding the database file.
    pub data_dir: PathBuf,
    pub file_name: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            file_name: DATABASE_NAME.to_string(),
            max_connections: 4,
        }
    }
}

impl DatabaseConfig {
    /// Default layout rooted at `dir`.
    pub fn at(dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_uses_fixed_file_name() {
        let cfg = DatabaseConfig::at("/tmp/app-private");
        assert_eq!(cfg.path(), PathBuf::from("/tmp/app-private/LOGIN_DATABASE"));
    }

    #[test]
    fn defaults_extract_without_environment() {
        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .extract()
            .expect("defaults must extract");
        assert_eq!(cfg.loglevel, "info");
        assert_eq!(cfg.database, DatabaseConfig::default());
    }
}

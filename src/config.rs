use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::storage::StoreOptions;

/// Contents of `sqltriple.toml`. Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub database: Option<String>,
    pub cache_threshold: Option<usize>,
    pub update_index_stats: Option<bool>,
    pub statement_cache_capacity: Option<usize>,
}

impl StoreConfig {
    /// Options to open a store with, defaults filled in
    pub fn store_options(&self) -> anyhow::Result<StoreOptions> {
        let defaults = StoreOptions::default();
        let options = StoreOptions {
            new: false,
            update_index_stats: self.update_index_stats.unwrap_or(defaults.update_index_stats),
            cache_threshold: self.cache_threshold.unwrap_or(defaults.cache_threshold),
            statement_cache_capacity: self
                .statement_cache_capacity
                .unwrap_or(defaults.statement_cache_capacity),
        };
        options.validate()?;
        Ok(options)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("sqltriple.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("sqltriple.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<StoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: StoreConfig = toml::from_str(&contents)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &StoreConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(Some(dir.path().join("absent.toml").as_path())).unwrap(), None);
    }

    #[test]
    fn test_round_trip_and_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqltriple.toml");
        let config = StoreConfig {
            database: Some("graph.db".to_string()),
            cache_threshold: Some(64),
            update_index_stats: Some(true),
            statement_cache_capacity: None,
        };
        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());

        let loaded = load_config(Some(path.as_path())).unwrap().unwrap();
        assert_eq!(loaded, config);

        let options = loaded.store_options().unwrap();
        assert_eq!(options.cache_threshold, 64);
        assert!(options.update_index_stats);
        assert_eq!(options.statement_cache_capacity, StoreOptions::default().statement_cache_capacity);
    }

    #[test]
    fn test_partial_config_parses() {
        let config: StoreConfig = toml::from_str("cache_threshold = 8\n").unwrap();
        assert_eq!(config.cache_threshold, Some(8));
        assert_eq!(config.database, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = StoreConfig {
            cache_threshold: Some(0),
            ..StoreConfig::default()
        };
        assert!(config.store_options().is_err());

        let config = StoreConfig {
            statement_cache_capacity: Some(16),
            ..StoreConfig::default()
        };
        let err = config.store_options().unwrap_err();
        assert!(err.to_string().contains("statement_cache_capacity"), "{}", err);
    }

    #[test]
    fn test_ensure_db_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("store.db");
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}

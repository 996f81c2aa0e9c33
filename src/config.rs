//! `trenddb.toml` handling and database path resolution

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the database file
pub const DATABASE_ENV: &str = "TRENDDB_DATABASE";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TrenddbConfig {
    /// Database file, relative to the working directory
    pub database: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("trenddb.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".trenddb").join("trends.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<TrenddbConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: TrenddbConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &TrenddbConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Pick the database file: explicit argument, then the environment, then
/// the config file, then `.trenddb/trends.db` under `base`.
pub fn resolve_database_path(
    cli: Option<&Path>,
    env: Option<String>,
    config: Option<&TrenddbConfig>,
    base: &Path,
) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Some(path) = env.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    config
        .and_then(|c| c.database.as_deref())
        .map(PathBuf::from)
        .unwrap_or_else(|| default_database_path_in(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(dir.path().join("trenddb.toml").as_path())).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trenddb.toml");
        let config = TrenddbConfig {
            database: Some("corpus/trends.db".into()),
        };

        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(Some(path.as_path())).unwrap(), Some(config.clone()));

        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &TrenddbConfig::default(), true).unwrap();
        assert_eq!(load_config(Some(path.as_path())).unwrap(), Some(TrenddbConfig::default()));
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trenddb.toml");
        std::fs::write(&path, "database = [").unwrap();
        assert!(load_config(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_resolution_order() {
        let base = Path::new("/work");
        let config = TrenddbConfig {
            database: Some("from-config.db".into()),
        };

        let cli = resolve_database_path(
            Some(Path::new("cli.db")),
            Some("env.db".into()),
            Some(&config),
            base,
        );
        assert_eq!(cli, PathBuf::from("cli.db"));

        let env = resolve_database_path(None, Some("env.db".into()), Some(&config), base);
        assert_eq!(env, PathBuf::from("env.db"));

        let from_config = resolve_database_path(None, Some(String::new()), Some(&config), base);
        assert_eq!(from_config, PathBuf::from("from-config.db"));

        let fallback = resolve_database_path(None, None, None, base);
        assert_eq!(fallback, PathBuf::from("/work/.trenddb/trends.db"));
    }
}

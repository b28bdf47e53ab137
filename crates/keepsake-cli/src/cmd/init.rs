//! `keepsake init` — create the data directory and a default config.

use anyhow::Context;
use keepsake_store::SqliteRecordStore;
use keepsake_types::config::{default_config_path, load_config, KeepsakeConfig};
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let config = if path.exists() {
        println!("Config already exists at {}", path.display());
        load_config(Some(&path))
    } else {
        // data lives next to the config file
        let mut config = KeepsakeConfig::default();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            config.data_dir = parent.to_path_buf();
        }
        let rendered = toml::to_string_pretty(&config).context("rendering default config")?;
        std::fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote default config to {}", path.display());
        config
    };

    // opening the store applies migrations, so a fresh install is usable
    // immediately
    SqliteRecordStore::open(&config.db_path())?;
    println!("Database ready at {}", config.db_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_config_and_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        run(Some(&path)).unwrap();
        assert!(path.exists());
        assert!(dir.path().join("keepsake.db").exists());
    }

    #[test]
    fn test_init_leaves_existing_config_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let custom = format!("data_dir = \"{}\"\n", dir.path().display());
        std::fs::write(&path, &custom).unwrap();

        run(Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), custom);
        assert!(dir.path().join("keepsake.db").exists());
    }
}

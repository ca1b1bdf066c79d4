use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use fieldservice::config::{CONFIG_FILE, DEFAULT_CONFIG_JSON};
use fieldservice::db::Database;

pub const WORKSPACE_DIR: &str = ".fieldservice";
pub const DB_FILE: &str = "portal.db";

pub fn run(path: &Path, force: bool) -> Result<()> {
    let workspace_dir = path.join(WORKSPACE_DIR);
    let exists = workspace_dir.exists();

    if exists && !force {
        println!("Already initialized at {}", path.display());
        println!("Use --force to restore the default configuration.");
        return Ok(());
    }

    if !exists {
        fs::create_dir_all(&workspace_dir)
            .context("Failed to create .fieldservice directory")?;
        Database::open(&workspace_dir.join(DB_FILE))?;
        println!("Created {}", workspace_dir.display());
    }

    fs::write(workspace_dir.join(CONFIG_FILE), DEFAULT_CONFIG_JSON)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;
    if exists {
        println!("Restored default {}", CONFIG_FILE);
    } else {
        println!("Wrote default {}", CONFIG_FILE);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldservice::config::Config;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_workspace() {
        let dir = tempdir().unwrap();
        run(dir.path(), false).unwrap();

        let workspace = dir.path().join(WORKSPACE_DIR);
        assert!(workspace.join(DB_FILE).exists());
        assert!(workspace.join(CONFIG_FILE).exists());
        assert_eq!(Config::load(&workspace).unwrap(), Config::default());
    }

    #[test]
    fn test_init_twice_keeps_config() {
        let dir = tempdir().unwrap();
        run(dir.path(), false).unwrap();
        let config_path = dir.path().join(WORKSPACE_DIR).join(CONFIG_FILE);
        fs::write(&config_path, r#"{"poll_interval_ms": 100}"#).unwrap();

        run(dir.path(), false).unwrap();
        assert!(fs::read_to_string(&config_path).unwrap().contains("100"));
    }

    #[test]
    fn test_force_restores_config() {
        let dir = tempdir().unwrap();
        run(dir.path(), false).unwrap();
        let config_path = dir.path().join(WORKSPACE_DIR).join(CONFIG_FILE);
        fs::write(&config_path, r#"{"poll_interval_ms": 100}"#).unwrap();

        run(dir.path(), true).unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), DEFAULT_CONFIG_JSON);
    }

    #[test]
    fn test_force_replaces_malformed_config() {
        let dir = tempdir().unwrap();
        run(dir.path(), false).unwrap();
        let workspace = dir.path().join(WORKSPACE_DIR);
        fs::write(workspace.join(CONFIG_FILE), "{ not json").unwrap();
        assert!(Config::load(&workspace).is_err());

        run(dir.path(), true).unwrap();
        assert_eq!(Config::load(&workspace).unwrap(), Config::default());
    }
}

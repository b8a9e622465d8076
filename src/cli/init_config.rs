use replica_ledger::config::{default_config_path, LedgerConfig};
use std::path::PathBuf;

/// Write a commented default configuration file
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn execute(config_path: Option<String>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    LedgerConfig::create_default(&config_path)?;
    println!("📝 Created: {}", config_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path_string(dir: &TempDir) -> String {
        dir.path().join("config.toml").to_string_lossy().to_string()
    }

    #[test]
    fn test_creates_loadable_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = path_string(&temp_dir);

        execute(Some(path.clone()), false).unwrap();

        let config = LedgerConfig::load(&PathBuf::from(path)).unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn test_refuses_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = path_string(&temp_dir);
        std::fs::write(&path, "[ledger]\nreplication_factor = 7\n").unwrap();

        assert!(execute(Some(path.clone()), false).is_err());
        let config = LedgerConfig::load(&PathBuf::from(&path)).unwrap();
        assert_eq!(config.ledger.replication_factor, 7);

        execute(Some(path.clone()), true).unwrap();
        let config = LedgerConfig::load(&PathBuf::from(&path)).unwrap();
        assert_eq!(config.ledger.replication_factor, 3);
    }
}

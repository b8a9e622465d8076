use replica_ledger::config::{default_config_path, DEFAULT_REPLICATION_FACTOR};

/// Version line plus the build's defaults
pub fn version_info() -> String {
    format!(
        "replica-ledger {}\nDefault replication factor: {}\nDefault config: {}",
        env!("CARGO_PKG_VERSION"),
        DEFAULT_REPLICATION_FACTOR,
        default_config_path().display()
    )
}

pub fn execute() {
    println!("{}", version_info());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info_lists_defaults() {
        let info = version_info();

        assert!(info.starts_with(&format!("replica-ledger {}", env!("CARGO_PKG_VERSION"))));
        assert!(info.contains("replication factor: 3"));
        assert!(info.contains("config.toml"));
    }
}

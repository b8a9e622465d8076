use replica_ledger::config::{default_config_path, LedgerConfig, LoggingConfig};
use replica_ledger::LedgerNode;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run the ledger service
///
/// Loads the configuration, initialises logging, builds the node's single
/// group ledger and keeps it alive until Ctrl-C.
///
/// ## Configuration Loading
///
/// 1. `--config` flag if provided
/// 2. Default config at `~/.local/share/replica-ledger/config.toml`
///
/// If the config file doesn't exist, a default one is generated.
pub async fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let config = if config_path.exists() {
        LedgerConfig::load(&config_path)?
    } else {
        println!("📝 No config file found. Creating default configuration...");
        LedgerConfig::create_default(&config_path)?;
        println!("   Created: {}", config_path.display());
        LedgerConfig::load(&config_path)?
    };

    init_logging(&config.logging)?;
    info!(
        config = %config_path.display(),
        rf = config.ledger.replication_factor,
        sweeper = config.sweeper.enabled,
        "starting replica ledger"
    );

    let mut node = LedgerNode::new(config);
    if node.start_sweeper()? {
        info!(interval = ?node.config().sweeper.interval, "background sweeping enabled");
    }

    // Network handlers are wired to `node.handle()` by the embedding service
    tokio::signal::ctrl_c().await?;

    info!(stats = ?node.handle().stats(), "shutting down");
    node.shutdown().await;

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level when set. Fails if a global
/// subscriber is already installed.
fn init_logging(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| format!("Failed to initialise logging: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_logging_to_file_installs_once() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("ledger.log");
        let logging = LoggingConfig {
            level: "debug".to_string(),
            file: Some(log_path.clone()),
        };

        init_logging(&logging).unwrap();
        assert!(log_path.exists());

        // A second global subscriber is refused with an error, not a panic
        let err = init_logging(&logging).unwrap_err();
        assert!(err.to_string().contains("Failed to initialise logging"));
    }
}

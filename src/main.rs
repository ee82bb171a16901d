use std::sync::Arc;

use tracing::{error, info};

use drivegate::web::WebServer;
use drivegate::{Config, DriveClient, Registry};

/// Display name of the folder seeded from `drive.bootstrap_folder_id`.
const BOOTSTRAP_FOLDER_NAME: &str = "Bootstrap folder";

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = drivegate::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        drivegate::logging::init_console_only(&config.logging.level);
    }

    info!("drivegate - Google Drive gallery");

    if let Err(e) = run(config).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> drivegate::Result<()> {
    config.validate()?;

    let registry = Arc::new(Registry::open(&config.registry).await?);
    if let Some(folder_id) = config.drive.bootstrap_folder_id.as_deref() {
        registry
            .seed(&config.drive.bootstrap_token, folder_id, BOOTSTRAP_FOLDER_NAME)
            .await?;
    }
    info!(folders = registry.len().await?, "Registry ready");

    let drive = Arc::new(DriveClient::from_config(&config.drive)?);

    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );
    WebServer::from_config(&config, registry, drive)?.run().await
}

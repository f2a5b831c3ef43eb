use chirp_server::config::{ConfigError, ServerConfig};
use chirp_server::server::ChirpServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = match ServerConfig::from_args(&args) {
        Ok(config) => config,
        Err(ConfigError::HelpRequested) => {
            println!("{}", chirp_server::config::USAGE);
            return Ok(());
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", chirp_server::config::USAGE);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting chirp server on {}:{}", config.bind_address, config.port);
    if config.peers.is_empty() {
        tracing::info!("No federation peers configured");
    }

    let server = ChirpServer::bind(config).await?;
    tracing::info!("Press Ctrl+C to shutdown");

    server.run().await
}

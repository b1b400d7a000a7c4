//! OFS Client
//!
//! Interactive shell for an OFS storage server.

use std::path::PathBuf;

use clap::Parser;
use ofs_client::{ClientConfig, OfsClient, Shell};
use tokio::io::BufReader;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

/// OFS client - browse and manage files on an OFS server.
#[derive(Parser, Debug)]
#[command(name = "ofs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server host (overrides config and OFS_SERVER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Server port (overrides config and OFS_SERVER_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the effective configuration: file, then environment, then flags.
    fn load_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = if let Some(config_path) = &self.config {
            ClientConfig::load(config_path)?
        } else {
            ClientConfig::load_default()?
        };

        config.apply_env_overrides();

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.verbose {
            config.logging.log_level = "debug".to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Level used until the configured one is known.
    fn bootstrap_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Load the configuration with a scoped subscriber so messages emitted
    /// while loading are not lost.
    fn load_config_logged<W>(&self, writer: W) -> anyhow::Result<ClientConfig>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let bootstrap = log_subscriber(self.bootstrap_level(), writer);
        tracing::subscriber::with_default(bootstrap, || self.load_config())
    }
}

/// Log subscriber filtered at `level`.
fn log_subscriber<W>(level: &str, writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(writer)
        .finish()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Logs go to stderr so they never interleave with shell output
    let config = cli.load_config_logged(std::io::stderr)?;
    log_subscriber(&config.logging.log_level, std::io::stderr).init();

    if let Some(config_path) = &cli.config {
        tracing::debug!("Using config file: {:?}", config_path);
    }
    tracing::info!("OFS server: {}", config.server.address());

    let mut shell = Shell::new(OfsClient::from_config(&config));
    shell
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    tracing::debug!("Shell closed");
    Ok(())
}

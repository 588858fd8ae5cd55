//! Listings server.
//!
//! Serves the listings and reviews API, geocoding listing locations
//! through a Nominatim-compatible service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wanderlust::api::{router, AppState};
use wanderlust::config::Config;
use wanderlust::{ListingStore, NominatimClient};

#[derive(Parser, Debug)]
#[command(name = "wanderlust")]
#[command(about = "Listings and reviews server")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(short, long)]
    listen: Option<String>,

    /// Port to listen on all interfaces, used when no listen address is given
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Store directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Geocoder base URL
    #[arg(long)]
    geocoder_url: Option<String>,

    /// Geocoder request timeout in seconds
    #[arg(long)]
    geocoder_timeout_secs: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        } else if let Some(port) = self.port {
            config.server.listen = format!("0.0.0.0:{}", port);
        }
        if let Some(dir) = &self.data_dir {
            config.store.data_dir = dir.clone();
        }
        if let Some(url) = &self.geocoder_url {
            config.geocoder.url = url.clone();
        }
        if let Some(secs) = self.geocoder_timeout_secs {
            config.geocoder.timeout_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    info!("Wanderlust server");

    let store = ListingStore::open(&config.store.data_dir).context("Failed to open store")?;

    info!(
        "Geocoding through {} (timeout {:?})",
        config.geocoder.url,
        config.geocoder.timeout()
    );
    let geocoder = NominatimClient::new(
        &config.geocoder.url,
        &config.geocoder.user_agent,
        config.geocoder.timeout(),
    )
    .context("Failed to build geocoder client")?;

    let state = Arc::new(AppState::new(store, Arc::new(geocoder)));
    let app = router(state);

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

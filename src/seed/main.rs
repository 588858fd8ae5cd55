//! Replace the store contents with listings from a JSON seed file.
//!
//! Seeded listings get the default geometry; real coordinates are filled in
//! the first time each listing is viewed.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use wanderlust::models::{Listing, ListingInput};
use wanderlust::ListingStore;

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Seed the listing store from a JSON file")]
struct Args {
    /// JSON array of listings
    #[arg(short, long)]
    file: PathBuf,

    /// Store directory
    #[arg(long, default_value = "wanderlust-data")]
    data_dir: PathBuf,

    /// Owner assigned to every seeded listing
    #[arg(long, default_value = "mirza")]
    owner: String,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Seeding from {}", args.file.display());

    let content = fs::read_to_string(&args.file).context("Failed to read seed file")?;
    let inputs: Vec<ListingInput> =
        serde_json::from_str(&content).context("Failed to parse seed file")?;

    let mut listings = Vec::with_capacity(inputs.len());
    for input in inputs {
        if let Err(e) = input.validate() {
            warn!("Skipping seed listing {:?}: {}", input.title, e);
            continue;
        }
        listings.push(Listing::new(input, &args.owner).with_default_geometry());
    }

    let store = ListingStore::open(&args.data_dir).context("Failed to open store")?;
    let count = store.replace_listings(&listings)?;

    info!("Data was initialized with {} listings owned by {}", count, args.owner);
    Ok(())
}

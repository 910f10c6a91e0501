use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;

use shopbot_store::config;
use shopbot_store::db::Database;
use shopbot_store::seed;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Replace the shop data with randomized sample users, orders and products"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override `seed.rng_seed` from the config
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Add to the existing rows instead of clearing them first
    #[arg(long)]
    keep_existing: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = config::load(Some(&args.config))?;
    if let Some(rng_seed) = args.rng_seed {
        cfg.seed.rng_seed = rng_seed;
    }
    cfg.seed.keep_existing |= args.keep_existing;

    let db = Database::connect(&cfg.database).await?;
    db.run_migrations().await?;
    let mut session = db.session().await?;

    let mut rng = StdRng::seed_from_u64(cfg.seed.rng_seed);
    let report = seed::seed_fake_data(&mut session, &mut rng, &cfg.seed).await?;
    info!(
        users = report.users,
        orders = report.orders,
        products = report.products,
        links = report.links,
        "seeded"
    );
    println!(
        "seeded {} users, {} orders, {} products, {} order links",
        report.users, report.orders, report.products, report.links
    );

    drop(session);
    db.close().await;
    Ok(())
}

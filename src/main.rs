mod analytics;
mod charts;
mod config;
mod db;
mod import;
mod models;
mod run;
mod session;
mod util;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    if let Err(err) = try_main() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::AppConfig::load()?;
    init_tracing(&config.log_filter);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = run::Invocation::parse(&args)?;

    config.ensure_data_dir()?;
    let mut db = db::Database::open(&config.database_path)?;
    info!(chart_dir = %config.chart_dir.display(), "ready");

    run::as_cli(&invocation, &mut db, &config)
}

/// Logs go to stderr so tables on stdout stay clean. `RUST_LOG` wins over
/// the configured filter.
fn init_tracing(fallback: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

use anyhow::Result;
use dictionary_core::{overall_report, Config, Database};
use tracing::info;

fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dictionary_core=info".parse()?),
        )
        .init();

    info!("Starting coverage report");

    // Load configuration from environment
    let config = Config::from_env()?;

    let db = Database::new(&config.database_path)?;

    let report = overall_report(&db)?;
    info!("Computed coverage for {} languages", report.len());

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

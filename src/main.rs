use std::path::PathBuf;

use tokio::io::BufReader;
use tracing::info;

use resguard::engine::Engine;
use resguard::session;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries responses; logs go to stderr.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let metrics_port: Option<u16> = std::env::var("RESGUARD_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    resguard::observability::init(metrics_port)?;

    let seed: Option<PathBuf> = std::env::var("RESGUARD_SEED").ok().map(PathBuf::from);

    let engine = Engine::new();

    if let Some(path) = &seed {
        let file = tokio::fs::File::open(path).await?;
        let stats =
            session::process_stream(&engine, BufReader::new(file), tokio::io::sink()).await?;
        info!(
            "seeded from {}: {} commands, {} failed",
            path.display(),
            stats.commands,
            stats.failed
        );
    }

    info!("resguard ready");
    info!("  seed: {}", seed.as_ref().map_or("none".to_string(), |p| p.display().to_string()));
    info!("  metrics: {}", metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let serve = session::process_stream(
        &engine,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );

    tokio::select! {
        result = serve => {
            let stats = result?;
            info!("input closed after {} commands ({} failed)", stats.commands, stats.failed);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    info!("resguard stopped");
    Ok(())
}

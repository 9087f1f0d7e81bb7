use std::net::SocketAddr;

use crate::command::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: commands executed. Labels: op, status.
pub const COMMANDS_TOTAL: &str = "resguard_commands_total";

/// Histogram: command latency in seconds. Labels: op.
pub const COMMAND_DURATION_SECONDS: &str = "resguard_command_duration_seconds";

/// Counter: overlap checks run. Labels: outcome (`clear` | `overlap`).
pub const OVERLAP_CHECKS_TOTAL: &str = "resguard_overlap_checks_total";

/// Histogram: time spent in a single overlap check, in seconds.
pub const CHECK_DURATION_SECONDS: &str = "resguard_check_duration_seconds";

/// Counter: submissions rejected by validation. Labels: field.
pub const VALIDATION_FAILURES_TOTAL: &str = "resguard_validation_failures_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Counter: reservations committed (create or edit).
pub const RESERVATIONS_SAVED_TOTAL: &str = "resguard_reservations_saved_total";

/// Counter: saves refused because the overlap check failed under the write lock.
pub const SAVE_CONFLICTS_TOTAL: &str = "resguard_save_conflicts_total";

/// Gauge: number of assets in the index.
pub const ASSETS_ACTIVE: &str = "resguard_assets_active";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::CreateAsset { .. } => "create_asset",
        Command::DeleteAsset { .. } => "delete_asset",
        Command::Validate(_) => "validate",
        Command::Submit(_) => "submit",
        Command::Check { .. } => "check",
        Command::Publish { .. } => "publish",
        Command::Unpublish { .. } => "unpublish",
        Command::Delete { .. } => "delete",
        Command::List { .. } => "list",
        Command::ListAssets => "list_assets",
    }
}

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Held for the process lifetime; dropping it is a no-op today, but keeping
/// the guard type (rather than calling `init` for its side effect alone)
/// leaves room for a future exporter to hook a `Drop` impl the way the
/// reference daemon's `TelemetryGuard` shuts its tracer down on exit.
pub struct TelemetryGuard;

/// Initializes `tracing` with an `EnvFilter` read from `RUST_LOG` (default
/// `info`) and a console `fmt` layer, following the same bootstrap sequence
/// as the reference daemon's `telemetry::init` — minus its OpenTelemetry
/// exporter, which this single-process service has no use for (there is no
/// downstream span context to propagate).
pub fn init(service_name: &str) -> Result<TelemetryGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    tracing::info!(service = service_name, "telemetry initialized");
    Ok(TelemetryGuard)
}

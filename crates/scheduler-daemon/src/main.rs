mod error;
mod models;
mod server;
mod telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _telemetry = telemetry::init("scheduler-daemon")?;
    server::run().await
}

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use netxtrace::settings::Settings;
use netxtrace::{NetxEngine, telemetry};
use tokio::signal;

#[derive(Debug, Parser)]
#[clap(about = "Measure one http:// URL and print the archival measurement")]
struct Opt {
    /// URL to fetch
    url: String,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,

    /// Pretty-print the measurement JSON
    #[clap(short, long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if opt.verbose { "info" } else { "warn" }),
    )
    .init();

    let settings = Settings::new().context("Failed to load settings")?;
    let endpoint = settings.otel_exporter_otlp_endpoint.as_deref();
    if let Err(e) = telemetry::init_metrics(endpoint) {
        warn!("Failed to initialize metrics export: {:#}", e);
    }

    let engine = NetxEngine::new(settings.to_netx_config());
    let measurement = tokio::select! {
        result = engine.measure_url(&opt.url) => result?,
        _ = signal::ctrl_c() => {
            info!("Interrupted. Exiting...");
            telemetry::shutdown_metrics();
            return Ok(());
        }
    };

    let json = if opt.pretty {
        serde_json::to_string_pretty(&measurement)?
    } else {
        serde_json::to_string(&measurement)?
    };
    println!("{}", json);

    telemetry::shutdown_metrics();
    Ok(())
}

//! # Printer-Link CLI
//!
//! ```text
//! printer-link --broker 192.168.1.20 --method printer.info
//! printer-link --broker 192.168.1.20:1883 --sn SN123 --method printer.objects.query \
//!     --params '{"objects": {"print_stats": null}}' --watch-status
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use link_runtime::{ConnectionManager, LinkConfig};
use link_telemetry::{init_logging, TelemetryConfig};
use pl_01_transport::{BrokerAddress, BrokerConfig};
use pl_02_rpc::{CallResponse, StatusEvent};
use serde_json::Value;
use tracing::{info, warn};

const DEVICE_KEY: &str = "cli";

#[derive(Debug, Parser)]
#[command(name = "printer-link", version, about = "Call a networked printer over MQTT")]
struct Cli {
    /// Broker address: host, host:port or mqtt://host:port
    #[arg(long)]
    broker: Option<BrokerAddress>,

    /// Device serial number; discovered from notifications when omitted
    #[arg(long)]
    sn: Option<String>,

    /// JSON-RPC method to call
    #[arg(long, default_value = "printer.info")]
    method: String,

    /// Call parameters as JSON
    #[arg(long, default_value = "{}")]
    params: String,

    /// Per-call timeout, e.g. `30s`; the configured default when omitted
    #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Keep running and print status updates until Ctrl+C
    #[arg(long)]
    watch_status: bool,

    /// Log level filter, overrides PL_LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if let Some(level) = &cli.log_level {
        telemetry = telemetry.with_level(level.clone());
    }
    let _logging = init_logging(&telemetry).context("failed to initialize logging")?;

    let mut config = LinkConfig::from_env().context("invalid environment configuration")?;
    if let Some(address) = &cli.broker {
        config.broker = BrokerConfig {
            host: address.host.clone(),
            port: address.port,
            ..config.broker
        };
    }
    if let Some(sn) = &cli.sn {
        config.device_sn = Some(sn.clone());
    }
    config.validate().context("invalid configuration")?;

    let params: Value = serde_json::from_str(&cli.params).context("--params is not valid JSON")?;

    let manager = ConnectionManager::new(config);
    let correlator = manager
        .connect(
            DEVICE_KEY,
            cli.sn.as_deref(),
            Some(Arc::new(|| warn!("Connection lost and not restored"))),
        )
        .await
        .context("failed to connect")?;

    let response = correlator
        .request(&cli.method, params, cli.timeout.unwrap_or(Duration::ZERO))
        .await;
    println!("{}", serde_json::to_string_pretty(&response.to_json())?);

    let succeeded = matches!(response, CallResponse::Data { .. } | CallResponse::Raw(_));

    if cli.watch_status {
        correlator
            .subscribe_status(Arc::new(|event: StatusEvent| {
                if !matches!(event, StatusEvent::Ack) {
                    println!("{}", event.to_json());
                }
            }))
            .await
            .context("status subscription failed")?;
        info!("Watching status. Press Ctrl+C to stop.");
        tokio::signal::ctrl_c().await?;
    }

    manager.shutdown().await;

    if !succeeded {
        bail!("{} did not return data", cli.method);
    }
    Ok(())
}

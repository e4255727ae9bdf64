//! Connect to an INDI server and log what happens to its devices.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use skybridge_indi::protocol::{BlobElement, BlobEnable, EnableBlob};
use skybridge_indi::{
    Camera, ClientConfig, DeviceHandler, DeviceHub, IndiClient, IndiDevice, IndiSender, PropertyState,
    INDI_DEFAULT_PORT,
};

#[derive(Parser, Debug)]
#[command(name = "indi-monitor", version, about = "Watch the devices of an INDI server")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, env = "INDI_HOST", default_value = "localhost")]
    host: String,
    #[arg(long, env = "INDI_PORT", default_value_t = INDI_DEFAULT_PORT)]
    port: u16,
    /// Connection timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
    /// Stop after this many seconds instead of waiting for the server to close
    #[arg(long)]
    duration: Option<u64>,
    /// Ask cameras to send their images
    #[arg(long)]
    blobs: bool,
}

struct LogEvents;

impl<D: IndiDevice> DeviceHandler<D> for LogEvents {
    fn added(&mut self, _: &IndiSender, device: &D) {
        tracing::info!(device = device.name(), interface = ?device.header().driver.interface, "added");
    }

    fn updated(&mut self, _: &IndiSender, device: &D, field: &'static str, state: Option<PropertyState>) {
        tracing::debug!(device = device.name(), field, ?state, "updated");
    }

    fn removed(&mut self, _: &IndiSender, device: &D) {
        tracing::info!(device = device.name(), "removed");
    }

    fn blob_received(&mut self, _: &IndiSender, device: &D, blob: &BlobElement) {
        tracing::info!(device = device.name(), size = ?blob.size, format = ?blob.format, "image received");
    }
}

/// Turns on BLOB delivery for every camera as it is admitted
struct EnableBlobs;

impl DeviceHandler<Camera> for EnableBlobs {
    fn added(&mut self, client: &IndiSender, device: &Camera) {
        client.enable_blob(&EnableBlob {
            device: device.name().to_string(),
            name: None,
            value: BlobEnable::Also,
        });
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut hub = DeviceHub::new();
    hub.cameras.add_handler(LogEvents);
    hub.mounts.add_handler(LogEvents);
    hub.wheels.add_handler(LogEvents);
    hub.focusers.add_handler(LogEvents);
    hub.covers.add_handler(LogEvents);
    hub.flat_panels.add_handler(LogEvents);
    hub.guide_outputs.add_handler(LogEvents);
    hub.thermometers.add_handler(LogEvents);
    if cli.blobs {
        hub.cameras.add_handler(EnableBlobs);
    }

    let config = ClientConfig {
        connection_timeout_secs: cli.timeout,
        ..ClientConfig::new(cli.host, Some(cli.port))
    };
    let mut client = IndiClient::with_config(config, hub);

    if !client.connect_configured().await? {
        bail!("already connected");
    }

    let Some(seconds) = cli.duration else {
        client.run().await;
        return Ok(());
    };

    if tokio::time::timeout(Duration::from_secs(seconds), client.run()).await.is_err() {
        for device in client.handler().devices() {
            tracing::info!("{} ({:?})", device.name(), device.capabilities());
        }
        client.close();
    }

    Ok(())
}

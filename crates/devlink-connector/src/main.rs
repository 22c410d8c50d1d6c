//! devlink simulator entry point.
//!
//! Runs a connector for a simulated device against the in-memory transport:
//! it publishes a temperature reading every publish period, periodically
//! drops the link to exercise store-and-forward, and plays a few platform
//! commands back into the inbound path.
//!
//! ```text
//! main()
//!  └─ load config (path from argv[1], demo config if absent)
//!  └─ build Connector
//!       ├─ InMemoryTransport
//!       ├─ SimulatedActuators / SimulatedConfiguration
//!       ├─ InMemoryFirmware       (if firmware_enabled)
//!       └─ KeepAliveService       (if keep_alive_enabled)
//!  └─ tick loop until Ctrl-C
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use devlink_connector::application::ports::Transport;
use devlink_connector::infrastructure::keep_alive::KeepAliveService;
use devlink_connector::infrastructure::simulated::{
    InMemoryFirmware, SimulatedActuators, SimulatedConfiguration,
};
use devlink_connector::infrastructure::storage::config::{self, ConnectorConfig};
use devlink_connector::infrastructure::transport::InMemoryTransport;
use devlink_connector::{Connector, ConnectorError};
use devlink_core::protocol::topics;
use devlink_core::{Alarm, Codec, SensorReading, Value, WireMessage};

const DEFAULT_CONFIG_PATH: &str = "devlink.toml";
const SIMULATED_FIRMWARE_VERSION: &str = "1.0.0";

/// Every this many ticks the link goes down for one tick.
const OUTAGE_EVERY: u64 = 6;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let cfg = config::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // Structured logging.  `RUST_LOG` overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level)),
        )
        .init();

    info!(device = %cfg.device.key, config = %config_path.display(), "devlink simulator starting");

    let transport = Arc::new(InMemoryTransport::new());
    let actuators = Arc::new(SimulatedActuators::new());
    let connector = Arc::new(Mutex::new(build_connector(&cfg, &transport, &actuators)?));
    let codec = Codec::new(cfg.device.key.as_str());

    connector
        .lock()
        .await
        .connect()
        .context("connecting in-memory transport")?;
    for topic in connector.lock().await.inbound_topics() {
        info!(%topic, "subscribed");
    }

    let mut ticker = tokio::time::interval(cfg.publish_period());
    let mut tick: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
        tick += 1;

        // Link flaps: offline for one tick, then back.
        let offline = tick % OUTAGE_EVERY == 0;
        transport.set_offline(offline);
        if offline {
            warn!(tick, "simulated link outage");
        }

        let mut connector = connector.lock().await;
        let reading = SensorReading::new("T", simulated_temperature(tick)).with_timestamp(now_millis());
        connector.add_sensor_reading(&reading)?;
        if tick % 10 == 0 {
            connector.add_alarm(&Alarm::new("HH", tick % 20 == 0))?;
        }

        for message in scripted_platform_messages(&codec, tick) {
            match connector.handle_inbound_message(&message) {
                // Already logged by the connector.
                Ok(()) | Err(ConnectorError::Decode(_)) => {}
                Err(e) => warn!(topic = message.topic(), "inbound message rejected: {e}"),
            }
        }

        let delivered = connector.publish();
        info!(
            tick,
            delivered,
            queued = connector.queued_messages(),
            published_total = transport.published().len(),
            "tick"
        );
    }

    connector.lock().await.disconnect();
    info!(actuations = actuators.actuations().len(), "devlink simulator stopped");
    Ok(())
}

fn build_connector(
    cfg: &ConnectorConfig,
    transport: &Arc<InMemoryTransport>,
    actuators: &Arc<SimulatedActuators>,
) -> anyhow::Result<Connector> {
    let transport: Arc<dyn Transport> = Arc::clone(transport) as Arc<dyn Transport>;
    let device = cfg.to_device();
    let codec = Codec::for_device(&device);

    let mut initial_configuration = BTreeMap::new();
    initial_configuration.insert("HB".to_string(), Value::Int(cfg.connector.keep_alive_interval_secs as i64));
    initial_configuration.insert("LL".to_string(), Value::from(cfg.logging.level.as_str()));
    let configuration = Arc::new(SimulatedConfiguration::new(initial_configuration));

    let mut builder = Connector::builder(device, Arc::clone(&transport))
        .queue_capacity(cfg.connector.queue_capacity)
        .actuation_handler(actuators.clone())
        .actuator_status_provider(actuators.clone())
        .configuration_handler(configuration.clone())
        .configuration_provider(configuration);

    if cfg.connector.firmware_enabled {
        builder = builder.firmware_handler(Box::new(InMemoryFirmware::new(
            SIMULATED_FIRMWARE_VERSION,
            cfg.connector.chunk_size,
            cfg.connector.max_file_size,
        )));
    }
    if cfg.connector.keep_alive_enabled {
        builder = builder.keep_alive(Arc::new(KeepAliveService::new(
            transport,
            codec.encode_keep_alive(),
            cfg.keep_alive_interval(),
        )));
    }

    Ok(builder.build()?)
}

/// A slow sine around 21 °C.
fn simulated_temperature(tick: u64) -> f64 {
    let phase = (tick % 60) as f64 / 60.0 * std::f64::consts::TAU;
    ((21.0 + 3.0 * phase.sin()) * 10.0).round() / 10.0
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Commands the platform would send, replayed on fixed ticks.
fn scripted_platform_messages(codec: &Codec, tick: u64) -> Vec<WireMessage> {
    let key = codec.device_key();
    match tick % 15 {
        3 => vec![WireMessage::text(
            topics::reference_topic(topics::ACTUATOR_SET, key, "SW"),
            format!(r#"{{"command":"SET","value":"{}"}}"#, tick % 2 == 1),
        )],
        7 => vec![WireMessage::text(
            topics::reference_topic(topics::ACTUATOR_SET, key, "SL"),
            format!(r#"{{"command":"SET","value":"{}"}}"#, tick % 100),
        )],
        11 => vec![WireMessage::text(
            topics::device_topic(topics::CONFIGURATION_SET, key),
            r#"{"command":"CURRENT"}"#,
        )],
        14 => vec![WireMessage::text(
            topics::service_topic(topics::KEEP_ALIVE_RESPONSE, key),
            format!(r#"{{"value":{}}}"#, now_millis()),
        )],
        _ => Vec::new(),
    }
}

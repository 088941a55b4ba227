//! OBD-II Monitor - Main Entry Point
//!
//! Usage: `obd-monitor [config-file]`

use obd_service::{init_logging, ObdService, ServiceConfig};
use std::path::PathBuf;
use tokio_stream::StreamExt;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = ServiceConfig::load(path.as_deref())?;
    init_logging(&config.logging)?;

    info!("=== OBD Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let service = ObdService::new(config)?;
    let vehicle = service.start_connection(None).await?;
    info!(
        "Vehicle on {} with ECUs {:?}",
        vehicle.protocol.name(),
        vehicle.ecus
    );
    for pid in &vehicle.supported_pids {
        info!("Supported: {} {}", pid.text, pid.description);
    }

    let mut updates = service.start_continuous_updates();
    loop {
        tokio::select! {
            round = updates.next() => match round {
                Some(values) => {
                    let mut values: Vec<_> = values.into_iter().collect();
                    values.sort_by(|a, b| a.0.text.cmp(&b.0.text));
                    for (command, value) in values {
                        info!("{}: {}", command.description, value);
                    }
                }
                None => {
                    error!("Continuous updates ended");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    updates.stop().await;
    service.stop_connection().await;
    Ok(())
}

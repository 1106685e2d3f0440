//! Service runtime
//!
//! One supervisor task per configured device. The supervisor initializes
//! its device, reacts to lifecycle events and stops it on shutdown.

use std::future::Future;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AirfiConfig;
use crate::device::AirfiDevice;
use crate::engine::DeviceEvent;
use crate::error::Result;
use crate::negotiator::Negotiator;

/// Wait for Ctrl+C, or SIGTERM on Unix
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let term_signal = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!(
                    "Failed to install SIGTERM handler: {}. Service will only respond to Ctrl+C",
                    e
                );
                None
            },
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(mut sig) = term_signal {
                    sig.recv().await;
                } else {
                    std::future::pending::<()>().await
                }
            } => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Devices built from configuration, not started yet
pub fn build_devices(
    config: &AirfiConfig,
) -> Result<Vec<(AirfiDevice, UnboundedReceiver<DeviceEvent>)>> {
    let settings = config.sync.settings(&config.debug);
    let table = config.capability_table();

    config
        .devices
        .iter()
        .map(|device_config| {
            let (tx, rx) = mpsc::unbounded_channel();
            let device = AirfiDevice::new(
                device_config.clone(),
                &config.sync,
                settings.clone(),
                Negotiator::new(table.clone()),
                tx,
            )?;
            Ok((device, rx))
        })
        .collect()
}

/// Start a supervisor for `device`
pub fn spawn_device(
    device: AirfiDevice,
    events: UnboundedReceiver<DeviceEvent>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(supervise(device, events, token))
}

async fn supervise(
    device: AirfiDevice,
    mut events: UnboundedReceiver<DeviceEvent>,
    token: CancellationToken,
) {
    tokio::select! {
        result = device.initialize() => {
            if result.is_err() {
                warn!("{} stays stopped until the service is restarted", device.name());
            }
        }
        () = token.cancelled() => {
            device.shutdown();
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(DeviceEvent::Initialized) => {
                    info!("{} initialized", device.name());
                    log_readings(&device);
                },
                Some(DeviceEvent::RestartRequired { delay }) => {
                    // Collapses into any restart already pending
                    let target = device.clone();
                    tokio::spawn(async move {
                        target.restart_sync(delay).await;
                    });
                },
                Some(DeviceEvent::Error { message }) => {
                    debug!("{} reported: {}", device.name(), message);
                },
                None => break,
            },
            () = token.cancelled() => break,
        }
    }

    // Also abandons a restart waiting out its cooldown
    device.shutdown();
    debug!("Supervisor of {} stopped", device.name());
}

fn log_readings(device: &AirfiDevice) {
    match serde_json::to_string(&device.readings()) {
        Ok(json) => debug!("{} values: {}", device.name(), json),
        Err(e) => debug!("Failed to format values of {}: {}", device.name(), e),
    }
}

/// Run every configured device until `shutdown` resolves
pub async fn run<F>(config: AirfiConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let devices = build_devices(&config)?;
    let token = CancellationToken::new();

    info!("{}: starting {} device(s)", config.name, devices.len());
    let handles: Vec<JoinHandle<()>> = devices
        .into_iter()
        .map(|(device, events)| spawn_device(device, events, token.child_token()))
        .collect();

    shutdown.await;
    info!("Shutdown signal received, stopping devices");
    token.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Device supervisor ended abnormally: {}", e);
        }
    }
    info!("airfisrv stopped");
    Ok(())
}

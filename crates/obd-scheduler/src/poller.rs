//! Continuous PID polling
//!
//! A background task repeatedly snapshots the [`PidList`], requests those
//! PIDs through the shared client and pushes each result map into a bounded
//! channel. The consumer side is a [`PollStream`]; dropping it (or calling
//! [`PollStream::cancel`]) stops the task at its next wait. A request that
//! is already on the wire is allowed to finish, but nothing new is sent.

use crate::pid_list::PidList;
use obd_protocol::{Command, MeasurementResult, ObdClient, UnitSystem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One polling round: PID descriptor to decoded value
pub type PidValues = HashMap<Command, MeasurementResult>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Pause between the end of one round and the start of the next
    pub interval_ms: u64,
    /// Rounds buffered for a slow consumer before the poller waits
    pub channel_capacity: usize,
    /// Pause after a failed round
    pub error_backoff_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 300,
            channel_capacity: 16,
            error_backoff_ms: 1000,
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// Consumer end of a running poller
pub struct PollStream {
    inner: ReceiverStream<PidValues>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    system: UnitSystem,
}

impl PollStream {
    /// Present every yielded value in `system`
    pub fn in_system(mut self, system: UnitSystem) -> Self {
        self.system = system;
        self
    }

    /// Ask the poller to stop; the stream ends once buffered rounds are read
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the background task to finish
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Poller task ended abnormally: {}", e);
            }
        }
    }
}

impl Stream for PollStream {
    type Item = PidValues;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let system = self.system;
        Pin::new(&mut self.inner).poll_next(cx).map(|round| {
            round.map(|values| {
                values
                    .into_iter()
                    .map(|(command, value)| (command, value.in_system(system)))
                    .collect()
            })
        })
    }
}

impl Drop for PollStream {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Start polling `list` through `client`
pub fn spawn_poller(
    client: Arc<Mutex<ObdClient>>,
    list: PidList,
    config: PollerConfig,
) -> PollStream {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let token = CancellationToken::new();
    let handle = tokio::spawn(poll_loop(client, list, config, tx, token.clone()));

    PollStream {
        inner: ReceiverStream::new(rx),
        token,
        handle: Some(handle),
        system: UnitSystem::Metric,
    }
}

async fn poll_loop(
    client: Arc<Mutex<ObdClient>>,
    list: PidList,
    config: PollerConfig,
    tx: mpsc::Sender<PidValues>,
    token: CancellationToken,
) {
    info!("Starting continuous updates every {}ms", config.interval_ms);

    loop {
        let commands = tokio::select! {
            biased;
            () = token.cancelled() => break,
            snapshot = list.snapshot() => match snapshot {
                Ok(commands) => commands,
                Err(e) => {
                    warn!("Stopping continuous updates: {}", e);
                    break;
                }
            },
        };

        let pause = if commands.is_empty() {
            config.interval()
        } else {
            let mut guard = tokio::select! {
                biased;
                () = token.cancelled() => break,
                guard = client.lock() => guard,
            };
            // Not raced against the token: an in-flight request always completes.
            let result = guard.request_pids(&commands).await;
            drop(guard);

            match result {
                Ok(values) => {
                    debug!("Polled {} of {} PIDs", values.len(), commands.len());
                    tokio::select! {
                        biased;
                        () = token.cancelled() => break,
                        sent = tx.send(values) => {
                            if sent.is_err() {
                                debug!("Poll consumer dropped");
                                break;
                            }
                        }
                    }
                    config.interval()
                }
                Err(e) => {
                    warn!("Continuous update failed: {}", e);
                    config.error_backoff()
                }
            }
        };

        tokio::select! {
            biased;
            () = token.cancelled() => break,
            () = tokio::time::sleep(pause) => {}
        }
    }

    info!("Continuous updates stopped");
}

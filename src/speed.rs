// Throughput monitor for the shared adapter

use crate::models::{ByteCounters, ConnectionState};
use crate::netinfo_repo::InterfaceSource;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};
use tracing::warn;

/// Peripheral-perspective throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedSample {
    pub upload_bytes_per_sec: f64,
    pub download_bytes_per_sec: f64,
}

/// Rates from two cumulative counter readings, reported from the RM-01's
/// point of view: bytes the host received came *from* the peripheral (its
/// upload), bytes the host transmitted went *to* it (its download). A
/// counter that shrank (reset or wrap) contributes 0, never a negative rate.
pub fn peripheral_rates(
    previous: ByteCounters,
    current: ByteCounters,
    elapsed_secs: f64,
) -> SpeedSample {
    if elapsed_secs <= 0.0 {
        return SpeedSample::default();
    }
    let rx_delta = current.received.saturating_sub(previous.received);
    let tx_delta = current.transmitted.saturating_sub(previous.transmitted);
    SpeedSample {
        upload_bytes_per_sec: rx_delta as f64 / elapsed_secs,
        download_bytes_per_sec: tx_delta as f64 / elapsed_secs,
    }
}

/// Spawns the sampling task. It writes the two rate fields of the shared
/// state and publishes a snapshot after every sample; the orchestrator
/// aborts it (and zeroes the rates) when the connection goes away.
pub fn spawn<S>(
    source: Arc<S>,
    stats_name: String,
    sample_interval_ms: u64,
    state: Arc<Mutex<ConnectionState>>,
    tx: broadcast::Sender<ConnectionState>,
) -> tokio::task::JoinHandle<()>
where
    S: InterfaceSource + 'static,
{
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(sample_interval_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately and establishes the baseline.
        tick.tick().await;

        let mut previous = match sample(&source, &stats_name).await {
            Ok(counters) => counters,
            Err(e) => {
                warn!(error = %e, interface = %stats_name, operation = "byte_counters", "initial sample failed");
                ByteCounters::default()
            }
        };
        let mut previous_at = Instant::now();

        loop {
            tick.tick().await;
            let current = match sample(&source, &stats_name).await {
                Ok(counters) => counters,
                Err(e) => {
                    warn!(error = %e, interface = %stats_name, operation = "byte_counters", "sample failed");
                    continue;
                }
            };
            let now = Instant::now();
            let rates = peripheral_rates(previous, current, (now - previous_at).as_secs_f64());
            previous = current;
            previous_at = now;

            let snapshot = {
                let mut s = state.lock().unwrap_or_else(PoisonError::into_inner);
                if !s.is_connected() {
                    continue;
                }
                s.upload_bytes_per_sec = rates.upload_bytes_per_sec;
                s.download_bytes_per_sec = rates.download_bytes_per_sec;
                s.clone()
            };
            let _ = tx.send(snapshot);
        }
    })
}

async fn sample<S: InterfaceSource + 'static>(
    source: &Arc<S>,
    stats_name: &str,
) -> anyhow::Result<ByteCounters> {
    let source = source.clone();
    let name = stats_name.to_string();
    tokio::task::spawn_blocking(move || source.byte_counters(&name))
        .await
        .map_err(|e| anyhow::anyhow!("counter task join: {}", e))?
}

// Connect/disconnect workflow state machine
//
// Single writer of ConnectionState; observers get cloned snapshots over a
// broadcast channel after every mutation, so each phase of a workflow is
// individually visible. The busy flag admits at most one workflow at a time;
// calls arriving while busy are silent no-ops, never queued.

use crate::config::SharingConfig;
use crate::detector;
use crate::error::ShareError;
use crate::models::{ConnectionState, ConnectionStatus, NetworkInterfaceInfo};
use crate::netinfo_repo::InterfaceSource;
use crate::platform::{NetworkConfigurator, SharingController};
use crate::speed;
use crate::upstream;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Collaborators and the observer channel for the orchestrator.
pub struct OrchestratorDeps<S, C, N> {
    pub source: Arc<S>,
    pub configurator: Arc<C>,
    pub sharing: Arc<N>,
    pub tx: broadcast::Sender<ConnectionState>,
}

pub struct Orchestrator<S, C, N> {
    source: Arc<S>,
    configurator: Arc<C>,
    sharing: Arc<N>,
    sharing_config: SharingConfig,
    sample_interval_ms: u64,
    state: Arc<Mutex<ConnectionState>>,
    tx: broadcast::Sender<ConnectionState>,
    monitor: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<S, C, N> Orchestrator<S, C, N>
where
    S: InterfaceSource + 'static,
    C: NetworkConfigurator + 'static,
    N: SharingController + 'static,
{
    pub fn new(
        deps: OrchestratorDeps<S, C, N>,
        sharing_config: SharingConfig,
        sample_interval_ms: u64,
    ) -> Self {
        Self {
            source: deps.source,
            configurator: deps.configurator,
            sharing: deps.sharing,
            sharing_config,
            sample_interval_ms,
            state: Arc::new(Mutex::new(ConnectionState::default())),
            tx: deps.tx,
            monitor: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ConnectionState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs the connect workflow: detect adapter, pick upstream, apply the
    /// static configuration, enable sharing. Aborts on the first failure
    /// without rolling back completed steps; a cancellation resolves back to
    /// Idle instead of Failed. No-op while another workflow is in flight.
    pub async fn connect(&self) {
        if !self.begin(ConnectionStatus::Connecting) {
            return;
        }

        let interfaces = self.enumerate().await;
        let Some(adapter) = detector::find_first(&interfaces) else {
            self.finish_failed(ShareError::NoAdapterFound);
            return;
        };
        self.mutate(|s| {
            s.current_interface = Some(adapter.clone());
            s.upstream_interface = None;
        });

        let Some(upstream) = upstream::find_best_upstream(&interfaces, &adapter.name) else {
            self.finish_failed(ShareError::NoUpstreamFound);
            return;
        };
        self.mutate(|s| s.upstream_interface = Some(upstream.clone()));
        info!(adapter = %adapter.name, upstream = %upstream.name, "configuring sharing");

        let configurator = self.configurator.clone();
        let config = self.sharing_config.clone();
        let target = adapter.clone();
        let applied =
            run_blocking(move || configurator.apply_static(&target, &config), "apply_static").await;
        if let Err(e) = applied {
            self.resolve_connect_error(e);
            return;
        }

        let sharing = self.sharing.clone();
        let config = self.sharing_config.clone();
        let up = upstream.clone();
        let target = adapter.clone();
        let enabled =
            run_blocking(move || sharing.enable(&up, &target, &config), "enable_sharing").await;
        if let Err(e) = enabled {
            // The adapter keeps its static address here; reverting completed
            // steps on a failed connect is deliberately not attempted.
            self.resolve_connect_error(e);
            return;
        }

        info!(adapter = %adapter.name, upstream = %upstream.name, "sharing enabled");
        self.mutate(|s| {
            s.status = ConnectionStatus::Connected;
            s.last_error = None;
            s.busy = false;
        });
        self.start_monitor(&adapter);
    }

    /// Runs the disconnect workflow in reverse order: stop the monitor,
    /// disable sharing, restore DHCP. Teardown is best-effort; every step is
    /// attempted even when an earlier one fails, to avoid leaving the host
    /// half-shared. On failure the interface reference is preserved so the
    /// result is distinguishable from a fresh Idle.
    pub async fn disconnect(&self) {
        if !self.begin(ConnectionStatus::Disconnecting) {
            return;
        }
        self.stop_monitor();

        let Some(target) = self.snapshot().current_interface else {
            self.mutate(|s| {
                s.status = ConnectionStatus::Idle;
                s.upstream_interface = None;
                s.last_error = None;
                s.busy = false;
            });
            return;
        };

        let mut last_error: Option<ShareError> = None;

        let sharing = self.sharing.clone();
        let config = self.sharing_config.clone();
        let t = target.clone();
        match run_blocking(move || sharing.disable(&t, &config), "disable_sharing").await {
            // Nothing has been torn down yet, so a declined elevation can
            // still resolve to the pre-operation state.
            Err(ShareError::Cancelled) => {
                self.mutate(|s| {
                    s.status = ConnectionStatus::Connected;
                    s.busy = false;
                });
                self.start_monitor(&target);
                return;
            }
            Err(e) => {
                warn!(error = %e, operation = "disable_sharing", "teardown step failed");
                last_error = Some(e);
            }
            Ok(()) => {}
        }

        let configurator = self.configurator.clone();
        let config = self.sharing_config.clone();
        let t = target.clone();
        match run_blocking(move || configurator.restore_dynamic(&t, &config), "restore_dynamic")
            .await
        {
            Err(e) => {
                warn!(error = %e, operation = "restore_dynamic", "teardown step failed");
                last_error = Some(e);
            }
            Ok(()) => {}
        }

        match last_error {
            Some(e) => self.mutate(|s| {
                s.status = ConnectionStatus::Failed;
                s.last_error = Some(e);
                s.busy = false;
            }),
            None => {
                info!(adapter = %target.name, "sharing disabled");
                self.mutate(|s| {
                    s.status = ConnectionStatus::Idle;
                    s.current_interface = None;
                    s.upstream_interface = None;
                    s.last_error = None;
                    s.busy = false;
                });
            }
        };
    }

    /// Re-queries the OS without changing anything: updates the detected
    /// adapter and, when sharing from a previous session is still in effect,
    /// moves straight to Connected and starts the monitor.
    pub async fn refresh(&self) {
        if self.snapshot().busy {
            return;
        }

        let interfaces = self.enumerate().await;
        let adapter = detector::find_first(&interfaces);
        self.mutate(|s| s.current_interface = adapter.clone());
        let Some(adapter) = adapter else {
            return;
        };

        let sharing = self.sharing.clone();
        let config = self.sharing_config.clone();
        let active = run_blocking(move || sharing.is_active(&config), "probe_sharing")
            .await
            .unwrap_or(false);
        if active {
            let upstream = upstream::find_best_upstream(&interfaces, &adapter.name);
            self.mutate(|s| {
                s.status = ConnectionStatus::Connected;
                s.upstream_interface = upstream;
                s.last_error = None;
            });
            self.start_monitor(&adapter);
        }
    }

    /// Enumeration failures degrade to an empty list; detection is never
    /// fatal, just "not found".
    async fn enumerate(&self) -> Vec<NetworkInterfaceInfo> {
        let source = self.source.clone();
        match tokio::task::spawn_blocking(move || source.interfaces()).await {
            Ok(Ok(list)) => list,
            Ok(Err(e)) => {
                warn!(error = %e, operation = "enumerate_interfaces", "interface enumeration failed");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, operation = "enumerate_interfaces", "enumeration task join failed");
                Vec::new()
            }
        }
    }

    /// Claims the busy flag and enters `status`; false means another
    /// workflow holds it and the call must be ignored. A fresh workflow
    /// starts with a clean error so observers never see the previous
    /// attempt's failure mid-run.
    fn begin(&self, status: ConnectionStatus) -> bool {
        let snapshot = {
            let mut s = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if s.busy {
                return false;
            }
            s.busy = true;
            s.status = status;
            s.last_error = None;
            s.clone()
        };
        let _ = self.tx.send(snapshot);
        true
    }

    fn mutate(&self, f: impl FnOnce(&mut ConnectionState)) {
        let snapshot = {
            let mut s = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut s);
            s.clone()
        };
        let _ = self.tx.send(snapshot);
    }

    fn finish_failed(&self, error: ShareError) {
        warn!(error = %error, "connect failed");
        self.mutate(|s| {
            s.status = ConnectionStatus::Failed;
            s.last_error = Some(error);
            s.busy = false;
        });
    }

    /// User-cancelled is not an error: the state returns to its
    /// pre-operation value (Idle for a connect attempt).
    fn resolve_connect_error(&self, error: ShareError) {
        if error.is_cancelled() {
            info!("connect cancelled");
            self.mutate(|s| {
                s.status = ConnectionStatus::Idle;
                s.current_interface = None;
                s.upstream_interface = None;
                s.busy = false;
            });
        } else {
            self.finish_failed(error);
        }
    }

    fn start_monitor(&self, adapter: &NetworkInterfaceInfo) {
        let handle = speed::spawn(
            self.source.clone(),
            adapter.stats_name().to_string(),
            self.sample_interval_ms,
            self.state.clone(),
            self.tx.clone(),
        );
        let mut guard = self.monitor.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = guard.replace(handle) {
            old.abort();
        }
    }

    fn stop_monitor(&self) {
        let handle = self
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        self.mutate(|s| {
            s.upload_bytes_per_sec = 0.0;
            s.download_bytes_per_sec = 0.0;
        });
    }
}

async fn run_blocking<T, F>(f: F, operation: &'static str) -> Result<T, ShareError>
where
    F: FnOnce() -> Result<T, ShareError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(ShareError::failed(operation, e.to_string())),
    }
}

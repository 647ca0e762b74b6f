use anyhow::Result;
use clap::{Parser, Subcommand};
use rm01_share::netinfo_repo::InterfaceSource;
use rm01_share::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[derive(Parser)]
#[command(
    name = "rm01-share",
    about = "Share the host's internet connection with an RM-01 over its USB Ethernet adapter",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show adapter, upstream, and sharing status
    Status {
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },
    /// List detected RM-01 adapters
    Detect {
        #[arg(long)]
        json: bool,
    },
    /// Enable internet sharing to the RM-01
    Connect,
    /// Disable sharing and restore DHCP on the adapter
    Disconnect,
    /// Print adapter throughput once per sample interval until interrupted
    Monitor,
}

type Stack = orchestrator::Orchestrator<
    netinfo_repo::NetinfoRepo<privilege::SystemRunner>,
    platform::PlatformNetwork<privilege::SystemRunner>,
    platform::PlatformNetwork<privilege::SystemRunner>,
>;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app_config = config::AppConfig::load()?;

    let runner = Arc::new(privilege::SystemRunner::new(Duration::from_secs(
        app_config.commands.timeout_secs,
    )));
    let network = Arc::new(platform::PlatformNetwork::new(runner.clone()));
    let source = Arc::new(netinfo_repo::NetinfoRepo::new(runner));
    let (tx, _) =
        broadcast::channel::<models::ConnectionState>(app_config.publishing.broadcast_capacity);

    let orchestrator: Stack = orchestrator::Orchestrator::new(
        orchestrator::OrchestratorDeps {
            source: source.clone(),
            configurator: network.clone(),
            sharing: network,
            tx,
        },
        config::SharingConfig::default(),
        app_config.monitoring.sample_interval_ms,
    );

    match cli.command {
        Command::Status { json } => {
            orchestrator.refresh().await;
            let state = orchestrator.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_status(&state);
            }
        }
        Command::Detect { json } => {
            let adapters = {
                let source = source.clone();
                tokio::task::spawn_blocking(move || source.interfaces()).await??
            };
            let adapters = detector::detect(&adapters);
            if json {
                println!("{}", serde_json::to_string_pretty(&adapters)?);
            } else if adapters.is_empty() {
                println!("No RM-01 adapter found");
            } else {
                for a in &adapters {
                    println!("{}  {}  {}", a.name, a.hardware_address, a.descriptor);
                }
            }
        }
        Command::Connect => {
            orchestrator.connect().await;
            let state = orchestrator.snapshot();
            report_outcome(
                &state,
                models::ConnectionStatus::Connected,
                "Internet sharing enabled",
            )?;
        }
        Command::Disconnect => {
            orchestrator.refresh().await;
            orchestrator.disconnect().await;
            let state = orchestrator.snapshot();
            report_outcome(
                &state,
                models::ConnectionStatus::Idle,
                "Internet sharing disabled",
            )?;
        }
        Command::Monitor => {
            monitor(&source, app_config.monitoring.sample_interval_ms).await?;
        }
    }
    Ok(())
}

fn print_status(state: &models::ConnectionState) {
    match &state.current_interface {
        Some(i) => println!("Adapter:  {} ({})", i.name, i.hardware_address),
        None => println!("Adapter:  not detected"),
    }
    if let Some(u) = &state.upstream_interface {
        println!("Upstream: {}", u.name);
    }
    println!("Status:   {:?}", state.status);
    if let Some(e) = &state.last_error {
        println!("Error:    {}", e);
    }
}

fn report_outcome(
    state: &models::ConnectionState,
    expected: models::ConnectionStatus,
    success_message: &str,
) -> Result<()> {
    match state.outcome(expected) {
        models::WorkflowOutcome::Completed => {
            println!("{}", success_message);
            Ok(())
        }
        models::WorkflowOutcome::Cancelled => {
            println!("Cancelled; no changes were made");
            Ok(())
        }
        models::WorkflowOutcome::Failed(error) => {
            let detail = error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".into());
            anyhow::bail!("{}", detail);
        }
    }
}

/// Direct sampling loop for the `monitor` command; rates are shown from the
/// RM-01's perspective, same as the orchestrator's speed monitor.
async fn monitor(
    source: &Arc<netinfo_repo::NetinfoRepo<privilege::SystemRunner>>,
    sample_interval_ms: u64,
) -> Result<()> {
    let interfaces = {
        let source = source.clone();
        tokio::task::spawn_blocking(move || source.interfaces()).await??
    };
    let Some(adapter) = detector::find_first(&interfaces) else {
        anyhow::bail!("{}", error::ShareError::NoAdapterFound);
    };
    println!("Monitoring {} (Ctrl-C to stop)", adapter.name);

    let stats_name = adapter.stats_name().to_string();
    let counters = |name: String| {
        let source = source.clone();
        async move { tokio::task::spawn_blocking(move || source.byte_counters(&name)).await? }
    };

    let mut previous = counters(stats_name.clone()).await?;
    let mut previous_at = tokio::time::Instant::now();
    let mut tick = tokio::time::interval(Duration::from_millis(sample_interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tick.tick().await;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let current = counters(stats_name.clone()).await?;
                let now = tokio::time::Instant::now();
                let rates = speed::peripheral_rates(previous, current, (now - previous_at).as_secs_f64());
                previous = current;
                previous_at = now;
                println!(
                    "up {:>12}   down {:>12}",
                    format_rate(rates.upload_bytes_per_sec),
                    format_rate(rates.download_bytes_per_sec)
                );
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(());
            }
        }
    }
}

fn format_rate(bytes_per_sec: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    if bytes_per_sec >= MB {
        format!("{:.2} MB/s", bytes_per_sec / MB)
    } else if bytes_per_sec >= KB {
        format!("{:.1} KB/s", bytes_per_sec / KB)
    } else {
        format!("{:.0} B/s", bytes_per_sec)
    }
}

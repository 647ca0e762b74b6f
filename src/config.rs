use serde::Deserialize;
use std::net::Ipv4Addr;

/// Fixed addressing the RM-01 expects from the host.
///
/// The RM-01's switch chip hands the host 10.10.99.100 via DHCP and routes
/// through that same address as its gateway, so none of this is
/// user-configurable. Passed explicitly wherever needed rather than living in
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharingConfig {
    pub static_address: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub prefix_len: u8,
    pub gateway: Ipv4Addr,
    pub dns_server: Ipv4Addr,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            static_address: Ipv4Addr::new(10, 10, 99, 100),
            subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
            prefix_len: 24,
            gateway: Ipv4Addr::new(10, 10, 99, 100),
            dns_server: Ipv4Addr::new(8, 8, 8, 8),
        }
    }
}

impl SharingConfig {
    /// The shared subnet in CIDR form, e.g. "10.10.99.0/24".
    pub fn network_cidr(&self) -> String {
        let octets = self.static_address.octets();
        let mask = self.subnet_mask.octets();
        let net = Ipv4Addr::new(
            octets[0] & mask[0],
            octets[1] & mask[1],
            octets[2] & mask[2],
            octets[3] & mask[3],
        );
        format!("{}/{}", net, self.prefix_len)
    }

    /// Static address in CIDR form, e.g. "10.10.99.100/24".
    pub fn address_cidr(&self) -> String {
        format!("{}/{}", self.static_address, self.prefix_len)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub commands: CommandConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Throughput sample interval for the speed monitor.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

fn default_sample_interval_ms() -> u64 {
    1000
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Upper bound on every external command invocation; a hung OS command
    /// must not hang the workflow.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of state snapshots kept in the broadcast channel for
    /// observers (slow observers may lag).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_broadcast_capacity() -> usize {
    16
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl AppConfig {
    /// Loads from `CONFIG_FILE` (default `config.toml`); a missing file means
    /// defaults, since the tool is expected to run without any setup.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        match std::fs::read_to_string(&path) {
            Ok(s) => Self::load_from_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.commands.timeout_secs > 0,
            "commands.timeout_secs must be > 0, got {}",
            self.commands.timeout_secs
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        Ok(())
    }
}

// macOS backend: networksetup for configuration, sysctl + pfctl for NAT
//
// Interfaces are addressed by hardware-port name for networksetup and by the
// BSD device (en5, ...) for pfctl/ifconfig, which is why
// NetworkInterfaceInfo carries both.

use crate::config::SharingConfig;
use crate::error::ShareError;
use crate::models::NetworkInterfaceInfo;
use crate::platform::{NetworkConfigurator, SharingController};
use crate::privilege::{CommandOutput, CommandRunner, render_command};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const NETWORKSETUP: &str = "/usr/sbin/networksetup";
const SYSCTL: &str = "/usr/sbin/sysctl";
const PFCTL: &str = "/sbin/pfctl";
const IFCONFIG: &str = "/sbin/ifconfig";

pub struct MacosNetwork<R: CommandRunner> {
    runner: Arc<R>,
}

impl<R: CommandRunner> MacosNetwork<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    fn checked(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ShareError> {
        let out = self.runner.run_elevated(program, args)?;
        if !out.success() {
            return Err(ShareError::failed(
                render_command(program, args),
                out.diagnostic(),
            ));
        }
        Ok(out)
    }

    fn best_effort(&self, program: &str, args: &[&str]) -> Result<(), ShareError> {
        match self.runner.run_elevated(program, args) {
            Ok(out) => {
                if !out.success() {
                    debug!(
                        command = render_command(program, args),
                        output = out.diagnostic(),
                        "best-effort command failed"
                    );
                }
                Ok(())
            }
            Err(ShareError::Cancelled) => Err(ShareError::Cancelled),
            Err(e) => {
                warn!(error = %e, command = render_command(program, args), "best-effort command error");
                Ok(())
            }
        }
    }

    /// A freshly attached adapter may have no network service yet, in which
    /// case networksetup refuses `-setmanual`. Create one against the BSD
    /// device, named after the hardware port. Listing is unprivileged.
    fn ensure_service(&self, target: &NetworkInterfaceInfo) -> Result<(), ShareError> {
        match self.runner.run(NETWORKSETUP, &["-listallnetworkservices"]) {
            Ok(out) if out.success() && service_listed(&out.stdout, &target.name) => Ok(()),
            Err(ShareError::Cancelled) => Err(ShareError::Cancelled),
            _ => self.best_effort(
                NETWORKSETUP,
                &["-createnetworkservice", &target.name, device_of(target)],
            ),
        }
    }
}

/// True when `networksetup -listallnetworkservices` output names the
/// service; disabled services are listed with a leading asterisk.
pub fn service_listed(listing: &str, service: &str) -> bool {
    listing
        .lines()
        .map(|l| l.trim().trim_start_matches('*').trim())
        .any(|l| l == service)
}

/// One entry of `networksetup -listallhardwareports`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwarePort {
    pub port: String,
    pub device: String,
    pub mac: String,
}

/// Parses `networksetup -listallhardwareports` output into port entries.
pub fn parse_hardware_ports(output: &str) -> Vec<HardwarePort> {
    let mut ports = Vec::new();
    let mut port: Option<String> = None;
    let mut device: Option<String> = None;
    let mut mac: Option<String> = None;

    let mut flush = |port: &mut Option<String>, device: &mut Option<String>, mac: &mut Option<String>| {
        if let (Some(p), Some(d)) = (port.take(), device.take()) {
            ports.push(HardwarePort {
                port: p,
                device: d,
                mac: mac.take().unwrap_or_default(),
            });
        }
        *device = None;
        *mac = None;
    };

    for line in output.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Hardware Port:") {
            flush(&mut port, &mut device, &mut mac);
            port = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Device:") {
            device = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Ethernet Address:") {
            mac = Some(rest.trim().to_string());
        }
    }
    flush(&mut port, &mut device, &mut mac);
    ports
}

/// pf NAT rule masquerading the target device's subnet out the upstream
/// device, as a one-line anchor file.
pub fn nat_rule(upstream_device: &str, target_device: &str) -> String {
    format!("nat on {upstream_device} from {target_device}:network to any -> ({upstream_device})\n")
}

fn device_of(info: &NetworkInterfaceInfo) -> &str {
    info.stats_name()
}

impl<R: CommandRunner> NetworkConfigurator for MacosNetwork<R> {
    fn apply_static(
        &self,
        target: &NetworkInterfaceInfo,
        config: &SharingConfig,
    ) -> Result<(), ShareError> {
        let ip = config.static_address.to_string();
        let mask = config.subnet_mask.to_string();
        let gw = config.gateway.to_string();
        let dns = config.dns_server.to_string();

        self.ensure_service(target)?;
        self.checked(
            NETWORKSETUP,
            &["-setmanual", &target.name, &ip, &mask, &gw],
        )?;
        self.best_effort(NETWORKSETUP, &["-setdnsservers", &target.name, &dns])?;
        Ok(())
    }

    fn restore_dynamic(
        &self,
        target: &NetworkInterfaceInfo,
        _config: &SharingConfig,
    ) -> Result<(), ShareError> {
        let device = device_of(target);

        self.checked(NETWORKSETUP, &["-setdhcp", &target.name])?;
        // "empty" means: go back to DHCP-provided DNS.
        self.best_effort(NETWORKSETUP, &["-setdnsservers", &target.name, "empty"])?;
        self.best_effort("/usr/bin/dscacheutil", &["-flushcache"])?;

        // Cycle the device so the peripheral's DHCP server re-offers a lease.
        self.best_effort(IFCONFIG, &[device, "down"])?;
        std::thread::sleep(Duration::from_millis(500));
        self.best_effort(IFCONFIG, &[device, "up"])?;
        Ok(())
    }
}

impl<R: CommandRunner> SharingController for MacosNetwork<R> {
    fn enable(
        &self,
        upstream: &NetworkInterfaceInfo,
        target: &NetworkInterfaceInfo,
        config: &SharingConfig,
    ) -> Result<(), ShareError> {
        let _ = config;
        self.checked(SYSCTL, &["-w", "net.inet.ip.forwarding=1"])?;

        let rule = nat_rule(device_of(upstream), device_of(target));
        let conf_path = std::env::temp_dir().join("rm01_nat.conf");
        std::fs::write(&conf_path, rule)
            .map_err(|e| ShareError::failed("write nat.conf", e.to_string()))?;
        let conf = conf_path.to_string_lossy().into_owned();

        // Flushing everything first guarantees at most one sharing
        // relationship, whatever pair installed the previous one.
        self.best_effort(PFCTL, &["-d"])?;
        self.best_effort(PFCTL, &["-F", "all"])?;
        let result = match self.runner.run_elevated(PFCTL, &["-f", &conf, "-e"]) {
            Err(ShareError::CommandNotFound(_)) => Err(ShareError::SharingUnavailable(
                "pf packet filter is not available".into(),
            )),
            Err(e) => Err(e),
            Ok(out) => {
                // pfctl -e exits non-zero when pf is already enabled.
                if out.success() || out.stderr.contains("already enabled") {
                    Ok(())
                } else {
                    Err(ShareError::failed(
                        render_command(PFCTL, &["-f", &conf, "-e"]),
                        out.diagnostic(),
                    ))
                }
            }
        };
        let _ = std::fs::remove_file(&conf_path);
        result
    }

    fn disable(
        &self,
        _target: &NetworkInterfaceInfo,
        _config: &SharingConfig,
    ) -> Result<(), ShareError> {
        self.best_effort(SYSCTL, &["-w", "net.inet.ip.forwarding=0"])?;
        self.best_effort(PFCTL, &["-d"])?;
        self.best_effort(PFCTL, &["-F", "all"])?;
        Ok(())
    }

    fn is_active(&self, _config: &SharingConfig) -> Result<bool, ShareError> {
        match self.runner.run(SYSCTL, &["-n", "net.inet.ip.forwarding"]) {
            Ok(out) if out.success() => Ok(out.stdout.trim() == "1"),
            _ => Ok(false),
        }
    }
}

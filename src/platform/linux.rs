// Linux backend: ip/sysctl for configuration, iptables MASQUERADE for NAT

use crate::config::SharingConfig;
use crate::error::ShareError;
use crate::models::NetworkInterfaceInfo;
use crate::platform::{NetworkConfigurator, SharingController};
use crate::privilege::{CommandOutput, CommandRunner, render_command};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const IP_FORWARD_PROC: &str = "/proc/sys/net/ipv4/ip_forward";

pub struct LinuxNetwork<R: CommandRunner> {
    runner: Arc<R>,
}

impl<R: CommandRunner> LinuxNetwork<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    /// Elevated command where a non-zero exit aborts the operation.
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

    /// Elevated command where failure is logged and ignored. Cancellation
    /// still propagates: a declined elevation cancels the whole operation.
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

    /// iptables with "binary missing" mapped to the distinct
    /// subsystem-unavailable error, so the caller can tell "NAT tooling not
    /// installed" apart from "rule application failed".
    fn iptables(&self, args: &[&str]) -> Result<CommandOutput, ShareError> {
        match self.runner.run_elevated("iptables", args) {
            Err(ShareError::CommandNotFound(_)) => Err(ShareError::SharingUnavailable(
                "iptables is not installed".into(),
            )),
            other => other,
        }
    }

    fn iptables_checked(&self, args: &[&str]) -> Result<(), ShareError> {
        let out = self.iptables(args)?;
        if !out.success() {
            return Err(ShareError::failed(
                render_command("iptables", args),
                out.diagnostic(),
            ));
        }
        Ok(())
    }

    /// Deletes every rule in `chain` whose `-S` listing line contains all of
    /// `needles`. Used both to clear stale sharing relationships before
    /// enabling and to tear our own rules down on disable.
    fn delete_matching_rules(
        &self,
        table: Option<&str>,
        chain: &str,
        needles: &[&str],
    ) -> Result<(), ShareError> {
        let mut list_args: Vec<&str> = Vec::new();
        if let Some(t) = table {
            list_args.extend_from_slice(&["-t", t]);
        }
        list_args.extend_from_slice(&["-S", chain]);
        let listing = match self.iptables(&list_args) {
            Ok(out) if out.success() => out.stdout,
            Ok(out) => {
                debug!(chain, output = out.diagnostic(), "iptables listing failed");
                return Ok(());
            }
            Err(ShareError::Cancelled) => return Err(ShareError::Cancelled),
            Err(e) => {
                debug!(chain, error = %e, "iptables listing unavailable");
                return Ok(());
            }
        };

        for deletion in rule_deletions(&listing, needles) {
            let mut args: Vec<&str> = Vec::new();
            if let Some(t) = table {
                args.extend_from_slice(&["-t", t]);
            }
            args.extend(deletion.iter().map(String::as_str));
            self.best_effort("iptables", &args)?;
        }
        Ok(())
    }
}

/// Converts `iptables -S` append lines matching all needles into `-D`
/// deletion argv fragments. Pure; parsing is the part worth testing.
pub fn rule_deletions(listing: &str, needles: &[&str]) -> Vec<Vec<String>> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("-A ") && needles.iter().all(|n| line.contains(n)))
        .map(|line| {
            let mut args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            args[0] = "-D".into();
            args
        })
        .collect()
}

impl<R: CommandRunner> NetworkConfigurator for LinuxNetwork<R> {
    fn apply_static(
        &self,
        target: &NetworkInterfaceInfo,
        config: &SharingConfig,
    ) -> Result<(), ShareError> {
        let name = target.name.as_str();
        let cidr = config.address_cidr();

        // Flush-then-add keeps re-application a no-op in effect.
        self.best_effort("ip", &["addr", "flush", "dev", name])?;
        let add_args = ["addr", "add", cidr.as_str(), "dev", name];
        let out = self.runner.run_elevated("ip", &add_args)?;
        if !out.success() && !out.stderr.contains("File exists") {
            return Err(ShareError::failed(
                render_command("ip", &add_args),
                out.diagnostic(),
            ));
        }
        self.checked("ip", &["link", "set", name, "up"])?;

        // systemd-resolved may be absent; the peripheral mostly talks to its
        // hardwired DNS anyway.
        let dns = config.dns_server.to_string();
        self.best_effort("resolvectl", &["dns", name, dns.as_str()])?;
        Ok(())
    }

    fn restore_dynamic(
        &self,
        target: &NetworkInterfaceInfo,
        _config: &SharingConfig,
    ) -> Result<(), ShareError> {
        let name = target.name.as_str();

        self.best_effort("ip", &["addr", "flush", "dev", name])?;
        self.best_effort("resolvectl", &["revert", name])?;
        self.best_effort("resolvectl", &["flush-caches"])?;

        // Cycle the link so the peripheral's DHCP server re-offers a lease.
        self.best_effort("ip", &["link", "set", name, "down"])?;
        std::thread::sleep(Duration::from_millis(500));
        self.best_effort("ip", &["link", "set", name, "up"])?;

        // Lease renew is best-effort; not every setup ships a standalone
        // DHCP client and NetworkManager handles it on its own.
        match self.runner.run_elevated("dhclient", &[name]) {
            Err(ShareError::Cancelled) => return Err(ShareError::Cancelled),
            Err(ShareError::CommandNotFound(_)) => {
                self.best_effort("dhcpcd", &[name])?;
            }
            Err(e) => warn!(error = %e, "dhclient failed"),
            Ok(_) => {}
        }
        Ok(())
    }
}

impl<R: CommandRunner> SharingController for LinuxNetwork<R> {
    fn enable(
        &self,
        upstream: &NetworkInterfaceInfo,
        target: &NetworkInterfaceInfo,
        config: &SharingConfig,
    ) -> Result<(), ShareError> {
        let net = config.network_cidr();
        let up = upstream.name.as_str();
        let tgt = target.name.as_str();

        self.checked("sysctl", &["-w", "net.ipv4.ip_forward=1"])?;

        // At most one active sharing relationship: clear any masquerade for
        // the subnet regardless of which upstream it was installed against,
        // plus any forward rules touching the target.
        let in_rule = format!("-i {tgt}");
        let out_rule = format!("-o {tgt}");
        self.delete_matching_rules(Some("nat"), "POSTROUTING", &[net.as_str(), "MASQUERADE"])?;
        self.delete_matching_rules(None, "FORWARD", &[in_rule.as_str()])?;
        self.delete_matching_rules(None, "FORWARD", &[out_rule.as_str()])?;

        self.iptables_checked(&[
            "-t",
            "nat",
            "-A",
            "POSTROUTING",
            "-s",
            net.as_str(),
            "-o",
            up,
            "-j",
            "MASQUERADE",
        ])?;
        self.iptables_checked(&["-A", "FORWARD", "-i", tgt, "-o", up, "-j", "ACCEPT"])?;
        self.iptables_checked(&[
            "-A",
            "FORWARD",
            "-i",
            up,
            "-o",
            tgt,
            "-m",
            "state",
            "--state",
            "RELATED,ESTABLISHED",
            "-j",
            "ACCEPT",
        ])?;
        Ok(())
    }

    fn disable(
        &self,
        target: &NetworkInterfaceInfo,
        config: &SharingConfig,
    ) -> Result<(), ShareError> {
        let net = config.network_cidr();
        let tgt = target.name.as_str();

        let in_rule = format!("-i {tgt}");
        let out_rule = format!("-o {tgt}");
        self.delete_matching_rules(Some("nat"), "POSTROUTING", &[net.as_str(), "MASQUERADE"])?;
        self.delete_matching_rules(None, "FORWARD", &[in_rule.as_str()])?;
        self.delete_matching_rules(None, "FORWARD", &[out_rule.as_str()])?;

        // Leave forwarding to other services only if someone else needs it;
        // matching the original behavior we turn it off best-effort.
        self.best_effort("sysctl", &["-w", "net.ipv4.ip_forward=0"])?;
        Ok(())
    }

    fn is_active(&self, config: &SharingConfig) -> Result<bool, ShareError> {
        let forwarding = std::fs::read_to_string(IP_FORWARD_PROC)
            .map(|s| s.trim() == "1")
            .unwrap_or(false);
        if !forwarding {
            return Ok(false);
        }

        // Plain invocation first; root is not required to read the ruleset on
        // every distro, and the probe must stay prompt-free.
        let net = config.network_cidr();
        let args = ["-t", "nat", "-S", "POSTROUTING"];
        let listing = match self.runner.run("iptables", &args) {
            Ok(out) if out.success() => out.stdout,
            _ => match self.runner.run_elevated("iptables", &args) {
                Ok(out) if out.success() => out.stdout,
                _ => return Ok(false),
            },
        };
        Ok(listing
            .lines()
            .any(|l| l.contains("MASQUERADE") && l.contains(net.as_str())))
    }
}

// Windows backend: netsh for configuration, ICS (HNetCfg.HNetShare) for
// sharing, driven through PowerShell. Elevation comes from running the
// process as Administrator (UAC); commands are invoked directly.

use crate::config::SharingConfig;
use crate::error::ShareError;
use crate::models::NetworkInterfaceInfo;
use crate::platform::{NetworkConfigurator, SharingController};
use crate::privilege::{CommandOutput, CommandRunner, render_command};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct WindowsNetwork<R: CommandRunner> {
    runner: Arc<R>,
}

impl<R: CommandRunner> WindowsNetwork<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    fn checked(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ShareError> {
        let out = self.runner.run_elevated(program, args)?;
        if !out.success() {
            let diagnostic = out.diagnostic();
            let lowered = diagnostic.to_lowercase();
            if lowered.contains("access is denied") || lowered.contains("administrator") {
                return Err(ShareError::failed(
                    render_command(program, args),
                    "access denied; run as Administrator",
                ));
            }
            return Err(ShareError::failed(
                render_command(program, args),
                diagnostic,
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

    fn powershell(&self, script: &str) -> Result<CommandOutput, ShareError> {
        match self.runner.run_elevated(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", script],
        ) {
            Err(ShareError::CommandNotFound(_)) => Err(ShareError::SharingUnavailable(
                "PowerShell is not available".into(),
            )),
            Ok(out) => {
                let combined = format!("{}\n{}", out.stdout, out.stderr);
                // REGDB_E_CLASSNOTREG: the ICS COM class is not registered.
                if combined.contains("80040154") || combined.contains("not registered") {
                    return Err(ShareError::SharingUnavailable(
                        "Internet Connection Sharing is not available on this system".into(),
                    ));
                }
                Ok(out)
            }
            other => other,
        }
    }
}

/// One row of `netsh interface show interface`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetshInterface {
    pub admin_enabled: bool,
    pub connected: bool,
    pub interface_type: String,
    pub name: String,
}

/// Parses the fixed four-column `netsh interface show interface` table; the
/// interface name is everything after the third column and may contain
/// spaces.
pub fn parse_interface_table(output: &str) -> Vec<NetshInterface> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("Admin") && !l.starts_with('-'))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            Some(NetshInterface {
                admin_enabled: parts[0].eq_ignore_ascii_case("enabled"),
                connected: parts[1].eq_ignore_ascii_case("connected"),
                interface_type: parts[2].to_string(),
                name: parts[3..].join(" "),
            })
        })
        .collect()
}

/// One row of `getmac /v /fo csv`: connection name, adapter description,
/// physical address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetmacAdapter {
    pub connection_name: String,
    pub adapter_description: String,
    pub mac: String,
}

/// Parses `getmac /v /fo csv`. The quoted CSV has no embedded quotes, so
/// splitting on `","` is sufficient; the header row is skipped by requiring
/// a MAC-shaped third column.
pub fn parse_getmac_csv(output: &str) -> Vec<GetmacAdapter> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim().trim_start_matches('"').trim_end_matches('"');
            let cols: Vec<&str> = line.split("\",\"").collect();
            if cols.len() < 3 {
                return None;
            }
            let mac = cols[2].replace('-', ":").to_uppercase();
            if mac.len() != 17 || !mac.bytes().all(|b| b.is_ascii_hexdigit() || b == b':') {
                return None;
            }
            Some(GetmacAdapter {
                connection_name: cols[0].to_string(),
                adapter_description: cols[1].to_string(),
                mac,
            })
        })
        .collect()
}

/// PowerShell fragment enabling ICS: public side on the upstream connection,
/// private side on the target. All other shared connections are cleared
/// first so at most one relationship exists.
pub fn ics_enable_script(upstream_name: &str, target_name: &str) -> String {
    format!(
        r#"$share = New-Object -ComObject HNetCfg.HNetShare
foreach ($c in $share.EnumEveryConnection) {{
  $cfg = $share.INetSharingConfigurationForINetConnection.Invoke($c)
  if ($cfg.SharingEnabled) {{ $cfg.DisableSharing() }}
}}
foreach ($c in $share.EnumEveryConnection) {{
  $props = $share.NetConnectionProps.Invoke($c)
  $cfg = $share.INetSharingConfigurationForINetConnection.Invoke($c)
  if ($props.Name -eq '{upstream_name}') {{ $cfg.EnableSharing(0) }}
  if ($props.Name -eq '{target_name}') {{ $cfg.EnableSharing(1) }}
}}"#
    )
}

/// PowerShell fragment turning sharing off everywhere.
pub fn ics_disable_script() -> String {
    r#"$share = New-Object -ComObject HNetCfg.HNetShare
foreach ($c in $share.EnumEveryConnection) {
  $cfg = $share.INetSharingConfigurationForINetConnection.Invoke($c)
  if ($cfg.SharingEnabled) { $cfg.DisableSharing() }
}"#
    .to_string()
}

impl<R: CommandRunner> NetworkConfigurator for WindowsNetwork<R> {
    fn apply_static(
        &self,
        target: &NetworkInterfaceInfo,
        config: &SharingConfig,
    ) -> Result<(), ShareError> {
        let name_arg = format!("name={}", target.name);
        let addr_arg = format!("addr={}", config.static_address);
        let mask_arg = format!("mask={}", config.subnet_mask);
        let gw_arg = format!("gateway={}", config.gateway);
        let dns_arg = format!("addr={}", config.dns_server);

        self.checked(
            "netsh",
            &[
                "interface",
                "ip",
                "set",
                "address",
                &name_arg,
                "source=static",
                &addr_arg,
                &mask_arg,
                &gw_arg,
            ],
        )?;
        // DNS failure is not critical.
        self.best_effort(
            "netsh",
            &[
                "interface",
                "ip",
                "set",
                "dns",
                &name_arg,
                "source=static",
                &dns_arg,
            ],
        )?;
        Ok(())
    }

    fn restore_dynamic(
        &self,
        target: &NetworkInterfaceInfo,
        _config: &SharingConfig,
    ) -> Result<(), ShareError> {
        let name_arg = format!("name={}", target.name);

        self.checked(
            "netsh",
            &[
                "interface",
                "ip",
                "set",
                "address",
                &name_arg,
                "source=dhcp",
            ],
        )?;
        self.best_effort(
            "netsh",
            &["interface", "ip", "set", "dns", &name_arg, "source=dhcp"],
        )?;
        self.best_effort("ipconfig", &["/flushdns"])?;
        self.best_effort("ipconfig", &["/renew", &target.name])?;
        Ok(())
    }
}

impl<R: CommandRunner> SharingController for WindowsNetwork<R> {
    fn enable(
        &self,
        upstream: &NetworkInterfaceInfo,
        target: &NetworkInterfaceInfo,
        _config: &SharingConfig,
    ) -> Result<(), ShareError> {
        let script = ics_enable_script(&upstream.name, &target.name);
        let out = self.powershell(&script)?;
        if !out.success() {
            return Err(ShareError::failed("ICS EnableSharing", out.diagnostic()));
        }
        Ok(())
    }

    fn disable(
        &self,
        _target: &NetworkInterfaceInfo,
        _config: &SharingConfig,
    ) -> Result<(), ShareError> {
        match self.powershell(&ics_disable_script()) {
            Ok(out) => {
                if !out.success() {
                    debug!(output = out.diagnostic(), "ICS disable reported failure");
                }
                Ok(())
            }
            Err(ShareError::Cancelled) => Err(ShareError::Cancelled),
            Err(e) => {
                warn!(error = %e, "ICS disable unavailable");
                Ok(())
            }
        }
    }

    fn is_active(&self, _config: &SharingConfig) -> Result<bool, ShareError> {
        let probe = r#"$share = New-Object -ComObject HNetCfg.HNetShare
$any = $false
foreach ($c in $share.EnumEveryConnection) {
  $cfg = $share.INetSharingConfigurationForINetConnection.Invoke($c)
  if ($cfg.SharingEnabled) { $any = $true }
}
$any"#;
        match self.powershell(probe) {
            Ok(out) if out.success() => Ok(out.stdout.to_lowercase().contains("true")),
            _ => Ok(false),
        }
    }
}

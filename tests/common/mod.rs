// Shared test helpers: interface builders and scripted fakes

#![allow(dead_code)]

use rm01_share::config::SharingConfig;
use rm01_share::error::ShareError;
use rm01_share::models::{ByteCounters, InterfaceKind, NetworkInterfaceInfo};
use rm01_share::netinfo_repo::InterfaceSource;
use rm01_share::platform::{NetworkConfigurator, SharingController};
use rm01_share::privilege::{CommandOutput, CommandRunner, render_command};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::Mutex;

pub fn iface(
    name: &str,
    descriptor: &str,
    kind: InterfaceKind,
    is_up: bool,
    ipv4: &[&str],
    link_speed_mbps: u64,
) -> NetworkInterfaceInfo {
    NetworkInterfaceInfo {
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        hardware_address: "AA:BB:CC:DD:EE:FF".to_string(),
        persistent_id: None,
        kind,
        is_up,
        ipv4_unicast: ipv4.iter().map(|a| a.parse::<Ipv4Addr>().unwrap()).collect(),
        link_speed_mbps,
    }
}

/// An RM-01 adapter as Linux would enumerate it.
pub fn rm01_adapter(name: &str) -> NetworkInterfaceInfo {
    iface(
        name,
        "AX88179 Gigabit Ethernet",
        InterfaceKind::Wired,
        true,
        &["10.10.99.100"],
        1000,
    )
}

pub fn wifi_upstream(name: &str) -> NetworkInterfaceInfo {
    iface(
        name,
        "Intel Wireless 8265",
        InterfaceKind::Wireless,
        true,
        &["192.168.1.10"],
        300,
    )
}

#[derive(Default)]
pub struct FakeSource {
    pub interfaces: Mutex<Vec<NetworkInterfaceInfo>>,
    pub counters: Mutex<VecDeque<ByteCounters>>,
    pub fail_enumeration: bool,
}

impl FakeSource {
    pub fn with_interfaces(interfaces: Vec<NetworkInterfaceInfo>) -> Self {
        Self {
            interfaces: Mutex::new(interfaces),
            ..Default::default()
        }
    }
}

impl InterfaceSource for FakeSource {
    fn interfaces(&self) -> anyhow::Result<Vec<NetworkInterfaceInfo>> {
        if self.fail_enumeration {
            anyhow::bail!("enumeration unavailable");
        }
        Ok(self.interfaces.lock().unwrap().clone())
    }

    fn byte_counters(&self, _stats_name: &str) -> anyhow::Result<ByteCounters> {
        self.counters
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted counters left"))
    }
}

#[derive(Default)]
pub struct FakeConfigurator {
    pub apply_error: Mutex<Option<ShareError>>,
    pub restore_error: Mutex<Option<ShareError>>,
    pub applied: Mutex<Vec<String>>,
    pub restored: Mutex<Vec<String>>,
    /// Blocks apply_static to hold the busy flag for re-entrancy tests.
    pub apply_delay_ms: u64,
}

impl NetworkConfigurator for FakeConfigurator {
    fn apply_static(
        &self,
        target: &NetworkInterfaceInfo,
        _config: &SharingConfig,
    ) -> Result<(), ShareError> {
        if self.apply_delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(self.apply_delay_ms));
        }
        self.applied.lock().unwrap().push(target.name.clone());
        match self.apply_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn restore_dynamic(
        &self,
        target: &NetworkInterfaceInfo,
        _config: &SharingConfig,
    ) -> Result<(), ShareError> {
        self.restored.lock().unwrap().push(target.name.clone());
        match self.restore_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct FakeSharing {
    pub enable_error: Mutex<Option<ShareError>>,
    pub disable_error: Mutex<Option<ShareError>>,
    pub enabled: Mutex<Vec<(String, String)>>,
    pub disabled: Mutex<Vec<String>>,
    pub active: bool,
}

impl SharingController for FakeSharing {
    fn enable(
        &self,
        upstream: &NetworkInterfaceInfo,
        target: &NetworkInterfaceInfo,
        _config: &SharingConfig,
    ) -> Result<(), ShareError> {
        self.enabled
            .lock()
            .unwrap()
            .push((upstream.name.clone(), target.name.clone()));
        match self.enable_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn disable(
        &self,
        target: &NetworkInterfaceInfo,
        _config: &SharingConfig,
    ) -> Result<(), ShareError> {
        self.disabled.lock().unwrap().push(target.name.clone());
        match self.disable_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn is_active(&self, _config: &SharingConfig) -> Result<bool, ShareError> {
        Ok(self.active)
    }
}

/// Scripted command runner: the first entry whose needle appears in the
/// rendered command decides the result; everything else succeeds silently.
#[derive(Default)]
pub struct FakeRunner {
    pub calls: Mutex<Vec<String>>,
    pub script: Vec<(String, Result<CommandOutput, ShareError>)>,
}

impl FakeRunner {
    pub fn respond(mut self, needle: &str, result: Result<CommandOutput, ShareError>) -> Self {
        self.script.push((needle.to_string(), result));
        self
    }

    pub fn output(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn respond_to(&self, rendered: &str) -> Result<CommandOutput, ShareError> {
        self.calls.lock().unwrap().push(rendered.to_string());
        for (needle, result) in &self.script {
            if rendered.contains(needle.as_str()) {
                return result.clone();
            }
        }
        Ok(CommandOutput::default())
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ShareError> {
        self.respond_to(&render_command(program, args))
    }

    fn run_elevated(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ShareError> {
        self.respond_to(&render_command(program, args))
    }
}

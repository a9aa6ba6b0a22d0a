//! Enforcement port backed by the host OS.
//!
//! Process control goes through `sysinfo`. Input blocking, audio muting and
//! the overlay need platform hooks this binary does not ship, so they are
//! reported as missing and the session runs in degraded mode.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use focusguard_core::{Capabilities, Capability, EnforcementError, EnforcementPort, ProcessInfo};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

pub struct HostPort {
    system: Mutex<System>,
}

impl Default for HostPort {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPort {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// Refreshed process table.
    fn refreshed(&self) -> MutexGuard<'_, System> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        // everything() so names and exe paths are populated
        system.refresh_processes_specifics(ProcessesToUpdate::All, ProcessRefreshKind::everything());
        system
    }

    fn kill_where(
        &self,
        target: &str,
        matches: impl Fn(&sysinfo::Process) -> bool,
    ) -> Result<usize, EnforcementError> {
        let system = self.refreshed();
        let own_pid = std::process::id();
        let mut found = 0;
        let mut killed = 0;
        for (pid, process) in system.processes() {
            if pid.as_u32() == own_pid || !matches(process) {
                continue;
            }
            found += 1;
            if process.kill() {
                killed += 1;
            } else {
                tracing::debug!(pid = pid.as_u32(), tool = target, "kill refused");
            }
        }
        match (found, killed) {
            (0, _) => Err(EnforcementError::ProcessNotFound(target.to_string())),
            (_, 0) => Err(EnforcementError::PermissionDenied(target.to_string())),
            (_, n) => Ok(n),
        }
    }

    fn unsupported(capability: Capability) -> EnforcementError {
        EnforcementError::Unavailable {
            capability,
            reason: "no host integration on this build".into(),
        }
    }
}

impl EnforcementPort for HostPort {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            processes: true,
            ..Capabilities::none()
        }
    }

    fn block_input(&self) -> Result<(), EnforcementError> {
        Err(Self::unsupported(Capability::Input))
    }

    fn unblock_input(&self) -> Result<(), EnforcementError> {
        Err(Self::unsupported(Capability::Input))
    }

    fn mute_audio(&self) -> Result<(), EnforcementError> {
        Err(Self::unsupported(Capability::Audio))
    }

    fn unmute_audio(&self) -> Result<(), EnforcementError> {
        Err(Self::unsupported(Capability::Audio))
    }

    fn show_overlay(&self, _message: &str) -> Result<(), EnforcementError> {
        Err(Self::unsupported(Capability::Overlay))
    }

    fn hide_overlay(&self) -> Result<(), EnforcementError> {
        Err(Self::unsupported(Capability::Overlay))
    }

    fn list_processes(&self) -> Vec<ProcessInfo> {
        let system = self.refreshed();
        system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                executable_path: process.exe().map(Path::to_path_buf),
            })
            .collect()
    }

    fn kill_process_by_name(&self, name: &str) -> Result<usize, EnforcementError> {
        self.kill_where(name, |p| {
            p.name().to_string_lossy().eq_ignore_ascii_case(name)
        })
    }

    fn terminate_by_path(&self, path: &Path) -> Result<usize, EnforcementError> {
        self.kill_where(&path.display().to_string(), |p| p.exe() == Some(path))
    }
}

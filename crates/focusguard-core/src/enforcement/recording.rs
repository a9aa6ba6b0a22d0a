//! In-memory port used by tests, simulations and dry runs.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{Capabilities, Capability, EnforcementPort, ProcessInfo};
use crate::error::EnforcementError;

/// Observable enforcement state of a [`RecordingPort`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortState {
    pub input_blocked: bool,
    pub muted: bool,
    pub overlay: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    state: PortState,
    calls: Vec<String>,
    processes: Vec<ProcessInfo>,
    failing: HashSet<Capability>,
    protected: HashSet<String>,
}

/// Port that records every call and simulates a process table.
///
/// Calls against a capability marked failing with [`fail`](Self::fail)
/// return [`EnforcementError::Unavailable`] and leave the state untouched.
#[derive(Debug)]
pub struct RecordingPort {
    capabilities: Capabilities,
    inner: Mutex<Inner>,
}

impl RecordingPort {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::all())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the recorded calls.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> PortState {
        self.lock().state.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn fail(&self, capability: Capability) {
        self.lock().failing.insert(capability);
    }

    pub fn recover(&self, capability: Capability) {
        self.lock().failing.remove(&capability);
    }

    pub fn spawn_process(&self, pid: u32, name: &str, executable_path: Option<&str>) {
        self.lock().processes.push(ProcessInfo {
            pid,
            name: name.to_string(),
            executable_path: executable_path.map(Into::into),
        });
    }

    /// Processes with this name survive termination attempts.
    pub fn protect(&self, name: &str) {
        self.lock().protected.insert(name.to_string());
    }

    fn record(
        &self,
        capability: Capability,
        call: String,
        apply: impl FnOnce(&mut PortState),
    ) -> Result<(), EnforcementError> {
        let mut inner = self.lock();
        inner.calls.push(call);
        if inner.failing.contains(&capability) {
            return Err(EnforcementError::Unavailable {
                capability,
                reason: "simulated failure".into(),
            });
        }
        apply(&mut inner.state);
        Ok(())
    }

    fn terminate_where(
        &self,
        call: String,
        target: &str,
        matches: impl Fn(&ProcessInfo) -> bool,
    ) -> Result<usize, EnforcementError> {
        let mut inner = self.lock();
        inner.calls.push(call);
        if inner.failing.contains(&Capability::Processes) {
            return Err(EnforcementError::Unavailable {
                capability: Capability::Processes,
                reason: "simulated failure".into(),
            });
        }
        let hits: Vec<ProcessInfo> = inner.processes.iter().filter(|p| matches(p)).cloned().collect();
        if hits.is_empty() {
            return Err(EnforcementError::ProcessNotFound(target.to_string()));
        }
        if hits.iter().any(|p| inner.protected.contains(&p.name)) {
            return Err(EnforcementError::PermissionDenied(target.to_string()));
        }
        inner.processes.retain(|p| !matches(p));
        Ok(hits.len())
    }
}

impl Default for RecordingPort {
    fn default() -> Self {
        Self::new()
    }
}

impl EnforcementPort for RecordingPort {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn block_input(&self) -> Result<(), EnforcementError> {
        self.record(Capability::Input, "block_input".into(), |s| s.input_blocked = true)
    }

    fn unblock_input(&self) -> Result<(), EnforcementError> {
        self.record(Capability::Input, "unblock_input".into(), |s| s.input_blocked = false)
    }

    fn mute_audio(&self) -> Result<(), EnforcementError> {
        self.record(Capability::Audio, "mute_audio".into(), |s| s.muted = true)
    }

    fn unmute_audio(&self) -> Result<(), EnforcementError> {
        self.record(Capability::Audio, "unmute_audio".into(), |s| s.muted = false)
    }

    fn show_overlay(&self, message: &str) -> Result<(), EnforcementError> {
        let owned = message.to_string();
        self.record(Capability::Overlay, format!("show_overlay({message})"), move |s| {
            s.overlay = Some(owned)
        })
    }

    fn hide_overlay(&self) -> Result<(), EnforcementError> {
        self.record(Capability::Overlay, "hide_overlay".into(), |s| s.overlay = None)
    }

    fn list_processes(&self) -> Vec<ProcessInfo> {
        let mut inner = self.lock();
        inner.calls.push("list_processes".into());
        inner.processes.clone()
    }

    fn kill_process_by_name(&self, name: &str) -> Result<usize, EnforcementError> {
        self.terminate_where(format!("kill_process_by_name({name})"), name, |p| {
            p.name.eq_ignore_ascii_case(name)
        })
    }

    fn terminate_by_path(&self, path: &Path) -> Result<usize, EnforcementError> {
        let target = path.display().to_string();
        self.terminate_where(format!("terminate_by_path({target})"), &target, |p| {
            p.executable_path.as_deref() == Some(path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_capability_leaves_state_untouched() {
        let port = RecordingPort::new();
        port.fail(Capability::Audio);
        assert!(port.mute_audio().is_err());
        assert!(!port.state().muted);
        port.recover(Capability::Audio);
        port.mute_audio().unwrap();
        assert!(port.state().muted);
    }

    #[test]
    fn kill_by_name_removes_matching_processes() {
        let port = RecordingPort::new();
        port.spawn_process(10, "Taskmgr.exe", None);
        port.spawn_process(11, "notepad.exe", None);
        assert_eq!(port.kill_process_by_name("taskmgr.exe"), Ok(1));
        assert_eq!(port.list_processes().len(), 1);
        assert_eq!(
            port.kill_process_by_name("taskmgr.exe"),
            Err(EnforcementError::ProcessNotFound("taskmgr.exe".into()))
        );
    }

    #[test]
    fn protected_process_reports_permission_denied() {
        let port = RecordingPort::new();
        port.spawn_process(42, "procexp64.exe", Some("C:/tools/procexp64.exe"));
        port.protect("procexp64.exe");
        assert!(matches!(
            port.terminate_by_path(Path::new("C:/tools/procexp64.exe")),
            Err(EnforcementError::PermissionDenied(_))
        ));
        assert_eq!(port.list_processes().len(), 1);
    }
}

//! Tamper watchdog.
//!
//! Looks for bypass tools (task managers, process explorers) while an
//! enforcing phase is active. Matches are by exact process name and by
//! executable path, so a renamed copy still living in the tool's install
//! directory is caught. Termination failures are logged and skipped; a
//! detection is always reported to the controller, once per scan.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::enforcement::{Capability, ProcessInfo};
use crate::events::Event;
use crate::session::SessionController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Name,
    Path,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMatch {
    pub pid: u32,
    /// Configured tool that matched.
    pub tool: String,
    pub process_name: String,
    pub executable_path: Option<PathBuf>,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// False when the current phase does not enforce.
    pub active: bool,
    pub matches: Vec<ToolMatch>,
    pub terminated: usize,
    pub failures: Vec<String>,
    /// Events produced by the tamper report, if one was made.
    pub events: Vec<Event>,
}

impl ScanReport {
    pub fn tampered(&self) -> bool {
        !self.matches.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockedTool {
    /// Lowercased, as configured.
    name: String,
    /// Lowercased name without extension, used for path matching. `None`
    /// for extension-only names, which would match every executable.
    stem: Option<String>,
}

impl BlockedTool {
    fn new(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        let stem = tool_stem(&name).map(str::to_string);
        Self { name, stem }
    }
}

/// Tool name without its extension. `None` when nothing is left.
pub(crate) fn tool_stem(name: &str) -> Option<&str> {
    let name = name.trim();
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => name,
    };
    (!stem.is_empty()).then_some(stem)
}

pub struct TamperWatchdog {
    controller: Arc<SessionController>,
    blocked: Vec<BlockedTool>,
    own_pid: u32,
}

impl TamperWatchdog {
    pub fn new(controller: Arc<SessionController>, blocked_tools: &[String]) -> Self {
        let blocked = blocked_tools
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| BlockedTool::new(t))
            .collect();
        Self {
            controller,
            blocked,
            own_pid: std::process::id(),
        }
    }

    /// Blocked tools present in `processes`. One entry per process.
    pub fn find_matches(&self, processes: &[ProcessInfo]) -> Vec<ToolMatch> {
        processes
            .iter()
            .filter(|p| p.pid != self.own_pid)
            .filter_map(|p| self.match_process(p))
            .collect()
    }

    fn match_process(&self, process: &ProcessInfo) -> Option<ToolMatch> {
        let name = process.name.to_lowercase();
        let path = process
            .executable_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_lowercase());

        self.blocked.iter().find_map(|tool| {
            let kind = if name == tool.name {
                MatchKind::Name
            } else if path
                .as_deref()
                .zip(tool.stem.as_deref())
                .is_some_and(|(path, stem)| path.contains(stem))
            {
                MatchKind::Path
            } else {
                return None;
            };
            Some(ToolMatch {
                pid: process.pid,
                tool: tool.name.clone(),
                process_name: process.name.clone(),
                executable_path: process.executable_path.clone(),
                kind,
            })
        })
    }

    /// One watchdog pass. Blocking: enumerates and terminates processes.
    pub fn scan(&self) -> ScanReport {
        let profile = self.controller.enforcement();
        if !profile.watchdog_active || !self.controller.capabilities().has(Capability::Processes) {
            return ScanReport::default();
        }

        let port = self.controller.port().clone();
        let processes = port.list_processes();
        let matches = self.find_matches(&processes);
        let mut report = ScanReport {
            active: true,
            matches,
            ..ScanReport::default()
        };
        if report.matches.is_empty() {
            return report;
        }

        if profile.terminate_tools {
            self.terminate(&mut report);
        }

        let tools: BTreeSet<String> = report.matches.iter().map(|m| m.tool.clone()).collect();
        report.events = self.controller.report_tamper(tools.into_iter().collect());
        report
    }

    fn terminate(&self, report: &mut ScanReport) {
        let port = self.controller.port().clone();
        let mut names_done = BTreeSet::new();
        let mut paths_done = BTreeSet::new();

        for m in &report.matches {
            let outcome = match m.kind {
                MatchKind::Name => {
                    if !names_done.insert(m.process_name.clone()) {
                        continue;
                    }
                    port.kill_process_by_name(&m.process_name)
                }
                MatchKind::Path => {
                    let Some(path) = m.executable_path.as_ref() else {
                        continue;
                    };
                    if !paths_done.insert(path.clone()) {
                        continue;
                    }
                    port.terminate_by_path(path)
                }
            };
            match outcome {
                Ok(count) => {
                    tracing::info!(tool = %m.tool, pid = m.pid, count, "terminated blocked tool");
                    report.terminated += count;
                }
                Err(err) => {
                    tracing::warn!(tool = %m.tool, pid = m.pid, error = %err, "could not terminate blocked tool");
                    report.failures.push(err.to_string());
                }
            }
        }
    }
}

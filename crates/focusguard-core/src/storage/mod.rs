mod config;

pub use config::{Config, MessagesConfig, NightConfig, SessionConfig, WatchdogConfig};

use std::path::PathBuf;

/// Returns the FocusGuard data directory, creating it if needed.
///
/// `FOCUSGUARD_HOME` wins when set. Otherwise `~/.config/focusguard/`, or
/// `~/.config/focusguard-dev/` when `FOCUSGUARD_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("FOCUSGUARD_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSGUARD_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusguard-dev")
            } else {
                base_dir.join("focusguard")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

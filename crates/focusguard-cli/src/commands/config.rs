use anyhow::{bail, Context};
use clap::Subcommand;
use focusguard_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "session.hard_mode", "night.start_hour")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value; lists take JSON or comma-separated items
        value: String,
    },
    /// Print the whole config as JSON
    Show,
    /// Print the config file location
    Path,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load().context("loading config")?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => bail!("unknown key: {key}"),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().context("loading config")?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::Show => {
            let config = Config::load().context("loading config")?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

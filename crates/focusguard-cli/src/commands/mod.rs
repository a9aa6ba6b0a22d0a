pub mod config;
pub mod run;
pub mod scan;
pub mod status;

use serde::Serialize;

/// One JSON document per line on stdout.
pub(crate) fn print_json_line<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

pub mod pair;
pub mod path;
pub mod pool;
pub mod rpc;
pub use super::types;
pub use anyhow::Result;

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::Path;

fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path.as_ref(), json)
        .with_context(|| format!("Error writing {}", path.as_ref().display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let json = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Error reading {}", path.as_ref().display()))?;
    let value = serde_json::from_str(&json)
        .with_context(|| format!("Malformed snapshot {}", path.as_ref().display()))?;
    Ok(value)
}

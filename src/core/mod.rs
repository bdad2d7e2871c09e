pub mod constants;
pub mod encoding;
pub mod errors;
pub mod indexer;
pub mod optimization;
pub mod pair;
pub mod paths;
pub mod pool;
pub mod reserves;
pub mod source;
pub mod types;
pub use anyhow::{Context, Result};

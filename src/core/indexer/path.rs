use super::types::{biguint_string, RoutesData};
use super::{read_json, write_json, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A computed allocation, kept so a later run can reuse it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutesSnapshot {
    pub block_number: u64,
    pub token_in: String,
    pub token_out: String,
    #[serde(with = "biguint_string")]
    pub amount_in: BigUint,
    pub routes_data: RoutesData,
}

pub fn write_routes_snapshot<P: AsRef<Path>>(path: P, snapshot: &RoutesSnapshot) -> Result<()> {
    write_json(path, snapshot)
}

pub fn read_routes_snapshot<P: AsRef<Path>>(path: P) -> Result<RoutesSnapshot> {
    read_json(path)
}

/// File name for a routes snapshot, keyed by query and block.
pub fn routes_snapshot_name(token_in: &str, token_out: &str, block_number: u64) -> String {
    format!("routes_{token_in}_{token_out}_{block_number}.json")
}

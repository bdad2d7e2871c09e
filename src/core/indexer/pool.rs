use crate::core::source::ReserveSource;
use super::types::biguint_string;
use super::{read_json, write_json, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveEntry {
    pub pool_id: String,
    #[serde(with = "biguint_string")]
    pub reserve0: BigUint,
    #[serde(with = "biguint_string")]
    pub reserve1: BigUint,
}

/// Reserves of every indexed pool at `block_number`.
///
/// Serving quotes from a snapshot is much faster than hitting the node, at the
/// cost of staleness.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveSnapshot {
    pub block_number: u64,
    pub reserves: Vec<ReserveEntry>,
}

impl ReserveSnapshot {
    pub fn lookup(&self) -> HashMap<&str, (&BigUint, &BigUint)> {
        self.reserves
            .iter()
            .map(|entry| (entry.pool_id.as_str(), (&entry.reserve0, &entry.reserve1)))
            .collect()
    }
}

impl ReserveSource for ReserveSnapshot {
    fn get_reserves(
        &self,
        pool_ids: &[String],
    ) -> impl Future<Output = Result<Vec<Option<(BigUint, BigUint)>>>> + Send {
        let lookup = self.lookup();
        let answer: Vec<Option<(BigUint, BigUint)>> = pool_ids
            .iter()
            .map(|id| {
                lookup
                    .get(id.as_str())
                    .map(|(reserve0, reserve1)| ((*reserve0).clone(), (*reserve1).clone()))
            })
            .collect();
        async move { Ok(answer) }
    }
}

pub fn write_reserve_snapshot<P: AsRef<Path>>(path: P, snapshot: &ReserveSnapshot) -> Result<()> {
    write_json(path, snapshot)
}

pub fn read_reserve_snapshot<P: AsRef<Path>>(path: P) -> Result<ReserveSnapshot> {
    read_json(path)
}

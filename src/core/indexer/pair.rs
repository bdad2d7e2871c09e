use super::types::RawPool;
use super::{read_json, write_json, Result};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every pool known at `block_number`, across all venues.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairSnapshot {
    pub block_number: u64,
    pub pools: Vec<RawPool>,
}

pub fn write_pair_snapshot<P: AsRef<Path>>(path: P, snapshot: &PairSnapshot) -> Result<()> {
    write_json(path, snapshot)
}

pub fn read_pair_snapshot<P: AsRef<Path>>(path: P) -> Result<PairSnapshot> {
    read_json(path)
}

// Plain pool,token0,token1 rows, readable by PairIndex::from_csv
pub fn write_pair_csv<P: AsRef<Path>>(path: P, pools: &[RawPool]) -> Result<()> {
    let mut wrt = Writer::from_path(path)?;
    for pool in pools {
        wrt.write_record([&pool.pool_id, &pool.token0, &pool.token1])?;
    }
    wrt.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pair::PairIndex;
    use crate::core::types::Fee;

    #[test]
    fn snapshot_and_csv_round_trip() {
        let dir = std::env::temp_dir().join(format!("dex-router-pair-snapshot-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut pool = RawPool::new("0x1", "0xa", "0xb");
        pool.venue = "jediswap".to_string();
        pool.fee = Fee::new(998, 1000).unwrap();
        let snapshot = PairSnapshot {
            block_number: 42,
            pools: vec![pool.clone(), RawPool::new("0x2", "0xb", "0xc")],
        };

        write_pair_snapshot(dir.join("pairs.json"), &snapshot).unwrap();
        assert_eq!(read_pair_snapshot(dir.join("pairs.json")).unwrap(), snapshot);

        write_pair_csv(dir.join("pairs.csv"), &snapshot.pools).unwrap();
        let index = PairIndex::from_csv(dir.join("pairs.csv")).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.find("0x2", true).unwrap().token_in, "0xc");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

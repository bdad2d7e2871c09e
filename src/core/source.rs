use super::types::RawPool;
use super::Result;
use num_bigint::BigUint;
use std::future::Future;

/// A trading venue: one factory contract and the fee its pools charge.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Venue {
    pub name: String,
    pub factory_address: String,
    pub fee_numerator: u32,
    pub fee_denominator: u32,
}

/// Enumerates the pools of a venue page by page.
///
/// A page shorter than `batch_size` signals the end of the listing.
pub trait PairSource {
    fn list_pairs(
        &self,
        venue: &Venue,
        skip: usize,
        batch_size: usize,
    ) -> impl Future<Output = Result<Vec<RawPool>>> + Send;
}

/// Reads current reserves for a set of pools.
///
/// The answer is parallel to `pool_ids` and holds reserves in the pool's
/// canonical (token0, token1) order, or `None` for a pool the chain does not
/// know (removed or invalid address).
pub trait ReserveSource {
    fn get_reserves(
        &self,
        pool_ids: &[String],
    ) -> impl Future<Output = Result<Vec<Option<(BigUint, BigUint)>>>> + Send;
}

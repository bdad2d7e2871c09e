use super::super::constants::{
    GET_ALL_PAIRS_ENTRY_POINT, GET_RESERVES_ENTRY_POINT, TOKEN0_ENTRY_POINT, TOKEN1_ENTRY_POINT,
};
use super::super::source::{PairSource, ReserveSource, Venue};
use super::types::RawPool;
use super::Result;
use anyhow::{anyhow, Context};
use futures::future::try_join_all;
use num_bigint::BigUint;
use starknet::{
    core::{
        types::{BlockId, BlockTag, Felt, FunctionCall, StarknetError},
        utils::get_selector_from_name,
    },
    providers::{
        jsonrpc::{HttpTransport, JsonRpcClient},
        Provider, ProviderError, Url,
    },
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// JSON-RPC reader for Starknet constant-product venues.
///
/// All reads go to the same block so one indexing job sees a consistent state.
pub struct StarknetClient {
    provider: JsonRpcClient<HttpTransport>,
    block_id: BlockId,
    listings: ListingCache,
}

/// Factory pair listings read at the pinned block, keyed by factory address.
#[derive(Debug, Default)]
struct ListingCache {
    entries: Mutex<HashMap<Felt, Arc<Vec<Felt>>>>,
}

impl ListingCache {
    fn get(&self, factory: &Felt) -> Option<Arc<Vec<Felt>>> {
        self.entries.lock().ok()?.get(factory).cloned()
    }

    fn insert(&self, factory: Felt, listing: Vec<Felt>) -> Arc<Vec<Felt>> {
        let listing = Arc::new(listing);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(factory, listing.clone());
        }
        listing
    }

    fn clear(&mut self) {
        if let Ok(entries) = self.entries.get_mut() {
            entries.clear();
        }
    }
}

// The first felt of a `get_all_pairs` answer is the array length
fn listing_page(listing: &[Felt], skip: usize, batch_size: usize) -> Vec<Felt> {
    listing.iter().skip(1 + skip).take(batch_size).copied().collect()
}

impl StarknetClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = Url::parse(rpc_url).with_context(|| format!("Invalid rpc url {rpc_url}"))?;
        Ok(Self {
            provider: JsonRpcClient::new(HttpTransport::new(url)),
            block_id: BlockId::Tag(BlockTag::Latest),
            listings: ListingCache::default(),
        })
    }

    /// Pin every later read to the current head and return its number.
    pub async fn pin_latest_block(&mut self) -> Result<u64> {
        let block_number = self
            .provider
            .block_number()
            .await
            .context("Error getting latest block number")?;
        self.block_id = BlockId::Number(block_number);
        self.listings.clear();
        Ok(block_number)
    }

    async fn call(
        &self,
        contract_address: Felt,
        entry_point_selector: Felt,
    ) -> std::result::Result<Vec<Felt>, ProviderError> {
        self.provider
            .call(
                FunctionCall {
                    contract_address,
                    entry_point_selector,
                    calldata: vec![],
                },
                &self.block_id,
            )
            .await
    }

    async fn pair_tokens(&self, pair: Felt) -> Result<(String, String)> {
        let token0_selector = get_selector_from_name(TOKEN0_ENTRY_POINT)?;
        let token1_selector = get_selector_from_name(TOKEN1_ENTRY_POINT)?;
        let (token0, token1) = futures::try_join!(
            self.call(pair, token0_selector),
            self.call(pair, token1_selector)
        )
        .with_context(|| format!("Error reading tokens of pair {}", pair.to_hex_string()))?;

        match (token0.first(), token1.first()) {
            (Some(token0), Some(token1)) => Ok((token0.to_hex_string(), token1.to_hex_string())),
            _ => Err(anyhow!("Empty token answer for pair {}", pair.to_hex_string())),
        }
    }

    async fn pair_reserves(&self, pool_id: &str) -> Result<Option<(BigUint, BigUint)>> {
        let Ok(address) = Felt::from_hex(pool_id) else {
            tracing::warn!("Skipping malformed pool address {}", pool_id);
            return Ok(None);
        };

        let selector = get_selector_from_name(GET_RESERVES_ENTRY_POINT)?;
        let answer = match self.call(address, selector).await {
            Ok(answer) => answer,
            Err(ProviderError::StarknetError(StarknetError::ContractNotFound)) => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Error reading reserves of {pool_id}")),
        };

        // reserve0 and reserve1 come back as u256 (low, high) felt pairs
        if answer.len() < 4 {
            return Ok(None);
        }
        Ok(Some((u256(&answer[0], &answer[1]), u256(&answer[2], &answer[3]))))
    }
}

fn u256(low: &Felt, high: &Felt) -> BigUint {
    (BigUint::from_bytes_be(&high.to_bytes_be()) << 128u32) | BigUint::from_bytes_be(&low.to_bytes_be())
}

impl PairSource for StarknetClient {
    fn list_pairs(
        &self,
        venue: &Venue,
        skip: usize,
        batch_size: usize,
    ) -> impl Future<Output = Result<Vec<RawPool>>> + Send {
        async move {
            let factory = Felt::from_hex(&venue.factory_address)
                .with_context(|| format!("Invalid factory address for {}", venue.name))?;
            let listing = match self.listings.get(&factory) {
                Some(listing) => listing,
                None => {
                    let selector = get_selector_from_name(GET_ALL_PAIRS_ENTRY_POINT)?;
                    let listing = self
                        .call(factory, selector)
                        .await
                        .with_context(|| format!("Error listing pairs of {}", venue.name))?;
                    self.listings.insert(factory, listing)
                }
            };

            let pairs = listing_page(&listing, skip, batch_size);
            let tokens = try_join_all(pairs.iter().map(|pair| self.pair_tokens(*pair))).await?;

            Ok(pairs
                .iter()
                .zip(tokens)
                .map(|(pair, (token0, token1))| RawPool {
                    pool_id: pair.to_hex_string(),
                    token0,
                    token1,
                    venue: venue.name.clone(),
                    fee: Default::default(),
                })
                .collect())
        }
    }
}

impl ReserveSource for StarknetClient {
    fn get_reserves(
        &self,
        pool_ids: &[String],
    ) -> impl Future<Output = Result<Vec<Option<(BigUint, BigUint)>>>> + Send {
        async move { try_join_all(pool_ids.iter().map(|id| self.pair_reserves(id))).await }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_u256_halves() {
        let low = Felt::from_hex("0x5").unwrap();
        let high = Felt::from_hex("0x1").unwrap();
        let expected = (BigUint::from(1u32) << 128u32) + BigUint::from(5u32);
        assert_eq!(u256(&low, &high), expected);
    }

    #[test]
    fn pages_skip_the_length_prefix() {
        let listing: Vec<Felt> = [3u64, 10, 11, 12].iter().map(|x| Felt::from(*x)).collect();
        assert_eq!(listing_page(&listing, 0, 2), vec![Felt::from(10u64), Felt::from(11u64)]);
        assert_eq!(listing_page(&listing, 2, 2), vec![Felt::from(12u64)]);
        assert!(listing_page(&listing, 3, 2).is_empty());
    }

    #[test]
    fn listing_is_cached_until_cleared() {
        let mut cache = ListingCache::default();
        let factory = Felt::from(7u64);
        assert!(cache.get(&factory).is_none());

        cache.insert(factory, vec![Felt::from(1u64), Felt::from(5u64)]);
        assert_eq!(cache.get(&factory).unwrap().len(), 2);
        assert!(cache.get(&Felt::from(8u64)).is_none());

        cache.clear();
        assert!(cache.get(&factory).is_none());
    }

    #[test]
    fn rejects_bad_rpc_url() {
        assert!(StarknetClient::new("not a url").is_err());
    }
}

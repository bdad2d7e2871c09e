use super::constants::{
    DEFAULT_MAX_CONCURRENT_BATCHES, DEFAULT_RESERVE_BATCH_SIZE, DEFAULT_RESERVE_RETRIES,
    DEFAULT_RETRY_BACKOFF_MS,
};
use super::source::ReserveSource;
use super::types::Route;
use futures::stream::{self, StreamExt};
use num_bigint::BigUint;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveLoaderSettings {
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    pub retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ReserveLoaderSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_RESERVE_BATCH_SIZE,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
            retries: DEFAULT_RESERVE_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

/// Outcome of one reserve load.
///
/// `failed_pools` lost their batch after every retry; `missing_pools` were
/// answered but unknown to the chain. Both end up without reserves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveReport {
    pub requested: usize,
    pub loaded: usize,
    pub failed_pools: Vec<String>,
    pub missing_pools: Vec<String>,
}

impl ReserveReport {
    pub fn is_degraded(&self) -> bool {
        !self.failed_pools.is_empty()
    }
}

pub struct ReserveLoader<'a, S> {
    source: &'a S,
    settings: ReserveLoaderSettings,
}

impl<'a, S: ReserveSource + Sync> ReserveLoader<'a, S> {
    pub fn new(source: &'a S, settings: ReserveLoaderSettings) -> Self {
        Self { source, settings }
    }

    /// Fetch reserves for every pool used by `routes` and attach them to each step.
    ///
    /// Returns only once every batch has either answered or run out of retries.
    /// Steps whose pool could not be resolved are left without reserves.
    pub async fn load_reserves(&self, routes: &mut [Route]) -> ReserveReport {
        let pool_ids = unique_pool_ids(routes);
        let (reserves, report) = self.fetch(&pool_ids).await;

        for route in routes.iter_mut() {
            for pair in route.steps.iter_mut() {
                match reserves.get(&pair.pool_id) {
                    Some((reserve0, reserve1)) => pair.set_reserves(reserve0, reserve1),
                    None => {
                        pair.reserve_in = None;
                        pair.reserve_out = None;
                    }
                }
            }
        }
        report
    }

    /// Canonical reserves for `pool_ids`, queried in bounded concurrent batches.
    pub async fn fetch(
        &self,
        pool_ids: &[String],
    ) -> (HashMap<String, (BigUint, BigUint)>, ReserveReport) {
        let batch_size = self.settings.batch_size.max(1);
        let batches: Vec<Vec<String>> = pool_ids.chunks(batch_size).map(<[String]>::to_vec).collect();

        let answers: Vec<(Vec<String>, Option<Vec<Option<(BigUint, BigUint)>>>)> =
            stream::iter(batches.into_iter().enumerate())
                .map(|(index, batch)| self.fetch_batch(index, batch))
                .buffer_unordered(self.settings.max_concurrent_batches.max(1))
                .collect()
                .await;

        let mut report = ReserveReport {
            requested: pool_ids.len(),
            ..Default::default()
        };
        let mut reserves: HashMap<String, (BigUint, BigUint)> = HashMap::new();
        for (batch, answer) in answers {
            let Some(answer) = answer else {
                report.failed_pools.extend(batch);
                continue;
            };
            for (i, pool_id) in batch.into_iter().enumerate() {
                match answer.get(i).cloned().flatten() {
                    Some(pair_reserves) => {
                        reserves.insert(pool_id, pair_reserves);
                    }
                    None => report.missing_pools.push(pool_id),
                }
            }
        }
        report.loaded = reserves.len();
        // keep report order stable regardless of batch completion order
        report.failed_pools.sort();
        report.missing_pools.sort();

        if report.is_degraded() {
            tracing::warn!(
                "Reserves unavailable for {} of {} pools after retries",
                report.failed_pools.len(),
                report.requested
            );
        } else {
            tracing::debug!("Loaded reserves for {} of {} pools", report.loaded, report.requested);
        }
        (reserves, report)
    }

    async fn fetch_batch(
        &self,
        index: usize,
        batch: Vec<String>,
    ) -> (Vec<String>, Option<Vec<Option<(BigUint, BigUint)>>>) {
        let mut attempt = 0;
        loop {
            match self.source.get_reserves(&batch).await {
                Ok(answer) => return (batch, Some(answer)),
                Err(e) if attempt < self.settings.retries => {
                    attempt += 1;
                    let delay = self.retry_delay(attempt);
                    tracing::warn!(
                        "Reserve batch {} failed (attempt {}): {:#}, retrying in {:?}",
                        index,
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::warn!("Reserve batch {} failed, giving up: {:#}", index, e);
                    return (batch, None);
                }
            }
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.settings.retry_backoff_ms * u64::from(attempt);
        let jitter = rand::thread_rng().gen_range(0..=self.settings.retry_backoff_ms);
        Duration::from_millis(base + jitter)
    }
}

/// Pool ids referenced by `routes`, in first-seen order.
pub fn unique_pool_ids(routes: &[Route]) -> Vec<String> {
    let mut seen = HashSet::new();
    routes
        .iter()
        .flat_map(|route| route.steps.iter())
        .filter(|pair| seen.insert(pair.pool_id.clone()))
        .map(|pair| pair.pool_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pair::PairIndex;
    use crate::core::paths::RouteFinder;
    use crate::core::types::RawPool;
    use crate::core::Result;
    use anyhow::anyhow;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct MockReserves {
        reserves: HashMap<String, (u64, u64)>,
        failing_calls: AtomicUsize,
        always_fail: bool,
        batch_sizes: Mutex<Vec<usize>>,
    }

    impl MockReserves {
        fn new(reserves: &[(&str, u64, u64)]) -> Self {
            Self {
                reserves: reserves
                    .iter()
                    .map(|(id, r0, r1)| (id.to_string(), (*r0, *r1)))
                    .collect(),
                failing_calls: AtomicUsize::new(0),
                always_fail: false,
                batch_sizes: Mutex::new(vec![]),
            }
        }
    }

    impl ReserveSource for MockReserves {
        fn get_reserves(
            &self,
            pool_ids: &[String],
        ) -> impl Future<Output = Result<Vec<Option<(BigUint, BigUint)>>>> + Send {
            self.batch_sizes.lock().unwrap().push(pool_ids.len());
            let fail = self.always_fail
                || self
                    .failing_calls
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
            let answer: Vec<Option<(BigUint, BigUint)>> = pool_ids
                .iter()
                .map(|id| {
                    self.reserves
                        .get(id)
                        .map(|(r0, r1)| (BigUint::from(*r0), BigUint::from(*r1)))
                })
                .collect();
            async move {
                if fail {
                    Err(anyhow!("rpc timeout"))
                } else {
                    Ok(answer)
                }
            }
        }
    }

    // Tracks how many batches are being answered at once
    #[derive(Default)]
    struct SlowReserves {
        in_flight: Arc<AtomicUsize>,
        high_water: Arc<AtomicUsize>,
    }

    impl ReserveSource for SlowReserves {
        fn get_reserves(
            &self,
            pool_ids: &[String],
        ) -> impl Future<Output = Result<Vec<Option<(BigUint, BigUint)>>>> + Send {
            let in_flight = self.in_flight.clone();
            let high_water = self.high_water.clone();
            let answer: Vec<Option<(BigUint, BigUint)>> = pool_ids
                .iter()
                .map(|_| Some((BigUint::from(1u32), BigUint::from(1u32))))
                .collect();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                high_water.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(answer)
            }
        }
    }

    fn settings(batch_size: usize) -> ReserveLoaderSettings {
        ReserveLoaderSettings {
            batch_size,
            max_concurrent_batches: 2,
            retries: 2,
            retry_backoff_ms: 1,
        }
    }

    fn routes(pools: &[RawPool], from: &str, to: &str) -> Vec<Route> {
        let index = PairIndex::new(pools);
        RouteFinder::new(&index, 3).find_routes(from, to)
    }

    #[tokio::test]
    async fn attaches_reserves_in_travel_direction() {
        let mut routes = routes(
            &[RawPool::new("LP1", "A", "B"), RawPool::new("LP2", "C", "B")],
            "A",
            "C",
        );
        let source = MockReserves::new(&[("LP1", 1000, 2000), ("LP2", 3000, 4000)]);
        let report = ReserveLoader::new(&source, settings(10)).load_reserves(&mut routes).await;

        assert_eq!(report.loaded, 2);
        assert!(!report.is_degraded());
        let steps = &routes[0].steps;
        assert_eq!(steps[0].reserve_in, Some(BigUint::from(1000u32)));
        assert_eq!(steps[0].reserve_out, Some(BigUint::from(2000u32)));
        // LP2 is (C, B) so B -> C walks it reversed
        assert!(steps[1].reversed);
        assert_eq!(steps[1].reserve_in, Some(BigUint::from(4000u32)));
        assert_eq!(steps[1].reserve_out, Some(BigUint::from(3000u32)));
    }

    #[tokio::test]
    async fn splits_requests_into_batches() {
        let pools: Vec<RawPool> = (0..5)
            .map(|i| RawPool::new(&format!("LP{i}"), "A", "C"))
            .collect();
        let mut routes = routes(&pools, "A", "C");
        let source = MockReserves::new(
            &[("LP0", 1, 1), ("LP1", 1, 1), ("LP2", 1, 1), ("LP3", 1, 1), ("LP4", 1, 1)],
        );
        let report = ReserveLoader::new(&source, settings(2)).load_reserves(&mut routes).await;

        assert_eq!(report.requested, 5);
        assert_eq!(report.loaded, 5);
        let mut sizes = source.batch_sizes.lock().unwrap().clone();
        sizes.sort();
        assert_eq!(sizes, vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn retries_a_failed_batch() {
        let mut routes = routes(&[RawPool::new("LP1", "A", "B")], "A", "B");
        let source = MockReserves::new(&[("LP1", 1000, 1000)]);
        source.failing_calls.store(2, Ordering::SeqCst);
        let report = ReserveLoader::new(&source, settings(10)).load_reserves(&mut routes).await;

        assert!(!report.is_degraded());
        assert_eq!(source.batch_sizes.lock().unwrap().len(), 3);
        assert!(routes[0].steps[0].reserve_in.is_some());
    }

    #[tokio::test]
    async fn exhausted_retries_leave_reserves_absent() {
        let mut routes = routes(&[RawPool::new("LP1", "A", "B")], "A", "B");
        let mut source = MockReserves::new(&[("LP1", 1000, 1000)]);
        source.always_fail = true;
        let report = ReserveLoader::new(&source, settings(10)).load_reserves(&mut routes).await;

        assert!(report.is_degraded());
        assert_eq!(report.failed_pools, vec!["LP1".to_string()]);
        assert_eq!(routes[0].steps[0].reserve_in, None);
        assert_eq!(routes[0].get_amount_out(&BigUint::from(100u32)), BigUint::from(0u32));
    }

    #[tokio::test]
    async fn unknown_pools_are_skipped() {
        let mut routes = routes(
            &[RawPool::new("LP1", "A", "B"), RawPool::new("GONE", "A", "B")],
            "A",
            "B",
        );
        let source = MockReserves::new(&[("LP1", 1000, 1000)]);
        let report = ReserveLoader::new(&source, settings(10)).load_reserves(&mut routes).await;

        assert!(!report.is_degraded());
        assert_eq!(report.loaded, 1);
        assert_eq!(report.missing_pools, vec!["GONE".to_string()]);
        assert!(routes[0].steps[0].reserve_in.is_some());
        assert!(routes[1].steps[0].reserve_in.is_none());
    }

    #[tokio::test]
    async fn concurrent_batches_stay_within_limit() {
        let pool_ids: Vec<String> = (0..10).map(|i| format!("LP{i}")).collect();
        let source = SlowReserves::default();
        let settings = ReserveLoaderSettings {
            batch_size: 1,
            max_concurrent_batches: 3,
            retries: 0,
            retry_backoff_ms: 1,
        };
        let (reserves, report) = ReserveLoader::new(&source, settings).fetch(&pool_ids).await;

        assert_eq!(reserves.len(), 10);
        assert_eq!(report.loaded, 10);
        assert_eq!(source.high_water.load(Ordering::SeqCst), 3);
        assert_eq!(source.in_flight.load(Ordering::SeqCst), 0);
    }
}

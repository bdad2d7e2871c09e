use super::core::constants::BASIS_POINTS;
use super::core::encoding::{EncodedRoutes, ExecutionRequest};
use super::core::errors::RouterError;
use super::core::indexer::pair::{read_pair_snapshot, write_pair_csv, write_pair_snapshot, PairSnapshot};
use super::core::indexer::path::{routes_snapshot_name, write_routes_snapshot, RoutesSnapshot};
use super::core::indexer::pool::{
    read_reserve_snapshot, write_reserve_snapshot, ReserveEntry, ReserveSnapshot,
};
use super::core::indexer::rpc::StarknetClient;
use super::core::optimization::{optimize_amount_out, OptimizerSettings};
use super::core::pair::{fetch_all_pairs, PairIndex};
use super::core::paths::RouteFinder;
use super::core::reserves::{ReserveLoader, ReserveLoaderSettings, ReserveReport};
use super::core::source::ReserveSource;
use super::core::types::{Route, RoutesData};
use super::types::{DexConfig, QuoteRequest, QuoteResponse, QuoteStatus, ResponsePool, ResponseRoute};
use anyhow::{Context, Result};
use num_bigint::BigUint;
use num_traits::Zero;
use std::fs;
use std::str::FromStr;

/// Winning allocation for one query.
#[derive(Clone, Debug)]
pub struct Quoted {
    pub routes_data: RoutesData,
    pub best_route: Route,
    pub encoded: EncodedRoutes,
    pub reserve_report: ReserveReport,
    pub iterations: u64,
    pub search_exhausted: bool,
}

#[derive(Clone, Debug)]
pub enum QuoteOutcome {
    /// No route within the hop bound
    NoRoute,
    /// Routes exist but none of them yields any output
    NoLiquidity {
        routes_found: usize,
        reserve_report: ReserveReport,
    },
    Quoted(Box<Quoted>),
}

/// Knobs for one quote: hop bound, allocation search and reserve loading.
#[derive(Clone, Debug, Default)]
pub struct QuoteSettings {
    pub max_hops: usize,
    pub optimizer: OptimizerSettings,
    pub reserve_loader: ReserveLoaderSettings,
}

impl QuoteSettings {
    pub fn from_config(config: &DexConfig, max_hops: Option<usize>) -> Self {
        Self {
            max_hops: max_hops.unwrap_or(config.max_hops),
            optimizer: config.optimizer.clone(),
            reserve_loader: config.reserve_loader.clone(),
        }
    }
}

/// Route search, reserve load and allocation search for a single query.
pub async fn compute_quote<R: ReserveSource + Sync>(
    index: &PairIndex,
    reserves: &R,
    token_in: &str,
    token_out: &str,
    amount_in: &BigUint,
    settings: &QuoteSettings,
) -> Result<QuoteOutcome> {
    let max_hops = settings.max_hops;
    let mut routes = RouteFinder::new(index, max_hops).find_routes(token_in, token_out);
    if routes.is_empty() {
        tracing::info!("No route from {} to {} within {} hops", token_in, token_out, max_hops);
        return Ok(QuoteOutcome::NoRoute);
    }
    let routes_found = routes.len();

    let reserve_report = ReserveLoader::new(reserves, settings.reserve_loader.clone())
        .load_reserves(&mut routes)
        .await;

    let amount = amount_in.clone();
    let optimizer = settings.optimizer.clone();
    let optimized = tokio::task::spawn_blocking(move || optimize_amount_out(routes, &amount, &optimizer))
        .await
        .context("Allocation search did not complete")?;

    let Some(result) = optimized.filter(|r| !r.routes_data.total_amount_out.is_zero()) else {
        tracing::info!("{} routes from {} to {} but no liquidity", routes_found, token_in, token_out);
        return Ok(QuoteOutcome::NoLiquidity {
            routes_found,
            reserve_report,
        });
    };

    let encoded = EncodedRoutes::encode(&result.routes_data)?;
    tracing::info!(
        "Quoted {} {} -> {}: {} out over {} routes ({} candidates searched)",
        amount_in,
        token_in,
        token_out,
        result.routes_data.total_amount_out,
        encoded.weights.len(),
        routes_found
    );

    Ok(QuoteOutcome::Quoted(Box::new(Quoted {
        routes_data: result.routes_data,
        best_route: result.best_route,
        encoded,
        reserve_report,
        iterations: result.iterations,
        search_exhausted: result.exhausted,
    })))
}

pub fn validate_request(config: &DexConfig, request: &QuoteRequest) -> Result<BigUint, RouterError> {
    let sell = request.sellTokenAddress.trim();
    let buy = request.buyTokenAddress.trim();
    if sell.is_empty() || buy.is_empty() {
        return Err(RouterError::InvalidRequest(
            "Buy and Sell Token addresses cannot be empty".to_string(),
        ));
    }
    if sell == buy {
        return Err(RouterError::InvalidRequest(
            "Buy and Sell Token addresses must differ".to_string(),
        ));
    }

    if !config.supported_tokens.is_empty() {
        for token in [sell, buy] {
            if !config.supported_tokens.iter().any(|t| t == token) {
                return Err(RouterError::UnsupportedToken(token.to_string()));
            }
        }
    }

    if request.maxHops == Some(0) {
        return Err(RouterError::InvalidRequest("maxHops must be at least 1".to_string()));
    }
    if let Some(bps) = request.slippageBps.filter(|bps| *bps > BASIS_POINTS) {
        return Err(RouterError::InvalidRequest(format!(
            "slippageBps of {bps} exceeds {BASIS_POINTS}"
        )));
    }

    let amount = BigUint::from_str(request.sellAmount.trim())
        .map_err(|_| RouterError::InvalidAmount(request.sellAmount.clone()))?;
    if amount.is_zero() {
        return Err(RouterError::InvalidAmount("sell amount must be positive".to_string()));
    }
    Ok(amount)
}

/// Enumerate every configured venue and store the pair snapshot plus a CSV copy.
pub async fn index_and_save_pair_data(config: &DexConfig) -> Result<PairSnapshot> {
    fs::create_dir_all(&config.working_dir)
        .with_context(|| format!("Couldn't create working dir {}", config.working_dir))?;

    let mut client = StarknetClient::new(&config.rpc_url)?;
    let block_number = client.pin_latest_block().await?;

    let mut pools = vec![];
    for venue in &config.venues {
        pools.extend(fetch_all_pairs(&client, venue, config.pair_page_size).await?);
    }

    let snapshot = PairSnapshot {
        block_number,
        pools,
    };
    write_pair_snapshot(config.working_file(&config.pair_snapshot_file), &snapshot)?;
    write_pair_csv(config.working_file(&config.token_pair_file), &snapshot.pools)?;
    tracing::info!(
        "Indexed {} pairs across {} venues at block {}",
        snapshot.pools.len(),
        config.venues.len(),
        block_number
    );
    Ok(snapshot)
}

/// Read reserves of every indexed pool from the node and store them.
pub async fn index_and_save_reserve_data(config: &DexConfig) -> Result<ReserveReport> {
    let pairs = read_pair_snapshot(config.working_file(&config.pair_snapshot_file))
        .context("Pair data not indexed yet")?;

    let mut client = StarknetClient::new(&config.rpc_url)?;
    let block_number = client.pin_latest_block().await?;
    let pool_ids: Vec<String> = pairs.pools.iter().map(|p| p.pool_id.clone()).collect();

    let (reserves, report) = ReserveLoader::new(&client, config.reserve_loader.clone())
        .fetch(&pool_ids)
        .await;

    let mut entries: Vec<ReserveEntry> = reserves
        .into_iter()
        .map(|(pool_id, (reserve0, reserve1))| ReserveEntry {
            pool_id,
            reserve0,
            reserve1,
        })
        .collect();
    entries.sort_by(|a, b| a.pool_id.cmp(&b.pool_id));

    write_reserve_snapshot(
        config.working_file(&config.reserve_snapshot_file),
        &ReserveSnapshot {
            block_number,
            reserves: entries,
        },
    )?;
    tracing::info!(
        "Indexed reserves of {} of {} pools at block {}",
        report.loaded,
        report.requested,
        block_number
    );
    Ok(report)
}

pub async fn get_aggregator_quote(config: &DexConfig, request: QuoteRequest) -> Result<QuoteResponse> {
    let amount_in = validate_request(config, &request)?;
    let token_in = request.sellTokenAddress.trim().to_string();
    let token_out = request.buyTokenAddress.trim().to_string();
    let settings = QuoteSettings::from_config(config, request.maxHops);

    let pairs = read_pair_snapshot(config.working_file(&config.pair_snapshot_file))
        .context("Pair data not indexed yet")?;
    let index = PairIndex::new(&pairs.pools);

    let (outcome, block_number) = if request.getLatest.is_some_and(|x| x) {
        let mut client = StarknetClient::new(&config.rpc_url)?;
        let block_number = client.pin_latest_block().await?;
        let outcome = compute_quote(
            &index,
            &client,
            &token_in,
            &token_out,
            &amount_in,
            &settings,
        )
        .await?;
        (outcome, block_number)
    } else {
        let snapshot = read_reserve_snapshot(config.working_file(&config.reserve_snapshot_file))
            .context("Reserve data not indexed yet")?;
        let outcome = compute_quote(
            &index,
            &snapshot,
            &token_in,
            &token_out,
            &amount_in,
            &settings,
        )
        .await?;
        (outcome, snapshot.block_number)
    };

    let mut response = QuoteResponse {
        status: QuoteStatus::NoRoute,
        sellTokenAddress: token_in.clone(),
        buyTokenAddress: token_out.clone(),
        sellAmount: amount_in.to_string(),
        buyAmount: "0".to_string(),
        bestSingleRouteAmount: "0".to_string(),
        blockNumber: block_number,
        chainId: config.chain_id.clone(),
        routes: vec![],
        execution: None,
        degraded: false,
        failedPools: vec![],
        searchExhausted: false,
    };

    match outcome {
        QuoteOutcome::NoRoute => {}
        QuoteOutcome::NoLiquidity { reserve_report, .. } => {
            response.status = QuoteStatus::NoLiquidity;
            response.degraded = reserve_report.is_degraded();
            response.failedPools = reserve_report.failed_pools;
        }
        QuoteOutcome::Quoted(quoted) => {
            let slippage_bps = request.slippageBps.unwrap_or(config.default_slippage_bps);
            response.status = QuoteStatus::Quoted;
            response.buyAmount = quoted.routes_data.total_amount_out.to_string();
            response.bestSingleRouteAmount = quoted
                .best_route
                .amount_out
                .clone()
                .unwrap_or_default()
                .to_string();
            response.routes = build_response_routes(&quoted.routes_data);
            response.execution = Some(ExecutionRequest::new(
                &token_in,
                &token_out,
                &amount_in,
                slippage_bps,
                &quoted.routes_data,
            )?);
            response.degraded = quoted.reserve_report.is_degraded();
            response.failedPools = quoted.reserve_report.failed_pools.clone();
            response.searchExhausted = quoted.search_exhausted;

            if config.save_routes {
                save_routes(config, block_number, &token_in, &token_out, &amount_in, &quoted.routes_data);
            }
        }
    }

    Ok(response)
}

fn save_routes(
    config: &DexConfig,
    block_number: u64,
    token_in: &str,
    token_out: &str,
    amount_in: &BigUint,
    routes_data: &RoutesData,
) {
    let path = config.working_file(&routes_snapshot_name(token_in, token_out, block_number));
    let snapshot = RoutesSnapshot {
        block_number,
        token_in: token_in.to_string(),
        token_out: token_out.to_string(),
        amount_in: amount_in.clone(),
        routes_data: routes_data.clone(),
    };
    if let Err(e) = write_routes_snapshot(&path, &snapshot) {
        tracing::warn!("Couldn't store routes snapshot {}: {:#}", path.display(), e);
    }
}

fn build_response_routes(routes_data: &RoutesData) -> Vec<ResponseRoute> {
    let routes_data = routes_data.without_zero_weights();
    routes_data
        .weights
        .iter()
        .zip(routes_data.routes.iter())
        .map(|(weight, route)| ResponseRoute {
            percent: *weight,
            amountOut: route.amount_out.clone().unwrap_or_default().to_string(),
            path: route
                .steps
                .iter()
                .map(|pair| ResponsePool {
                    pairAddress: pair.pool_id.clone(),
                    tokenIn: pair.token_in.clone(),
                    tokenOut: pair.token_out.clone(),
                    reversed: pair.reversed,
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sell: &str, buy: &str, amount: &str) -> QuoteRequest {
        QuoteRequest {
            sellTokenAddress: sell.to_string(),
            buyTokenAddress: buy.to_string(),
            sellAmount: amount.to_string(),
            getLatest: None,
            slippageBps: None,
            maxHops: None,
        }
    }

    #[test]
    fn validates_requests() {
        let mut config = DexConfig::default();
        config.supported_tokens = vec!["0xa".to_string(), "0xb".to_string()];

        assert_eq!(validate_request(&config, &request("0xa", "0xb", "1000")), Ok(BigUint::from(1000u32)));
        assert!(matches!(
            validate_request(&config, &request("", "0xb", "1")),
            Err(RouterError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_request(&config, &request("0xa", "0xa", "1")),
            Err(RouterError::InvalidRequest(_))
        ));
        assert_eq!(
            validate_request(&config, &request("0xa", "0xc", "1")),
            Err(RouterError::UnsupportedToken("0xc".to_string()))
        );
        assert!(matches!(
            validate_request(&config, &request("0xa", "0xb", "-5")),
            Err(RouterError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_request(&config, &request("0xa", "0xb", "0")),
            Err(RouterError::InvalidAmount(_))
        ));

        config.supported_tokens.clear();
        assert!(validate_request(&config, &request("0xa", "0xc", "1")).is_ok());

        let mut steep = request("0xa", "0xb", "1");
        steep.slippageBps = Some(10_001);
        assert!(matches!(
            validate_request(&config, &steep),
            Err(RouterError::InvalidRequest(_))
        ));
        steep.slippageBps = Some(10_000);
        assert!(validate_request(&config, &steep).is_ok());
    }
}

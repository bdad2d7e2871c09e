use crate::core::encoding::ExecutionRequest;
use crate::core::optimization::OptimizerSettings;
use crate::core::reserves::ReserveLoaderSettings;
use crate::core::source::Venue;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// Plain values first: the TOML writer needs them ahead of the tables below.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DexConfig {
    pub rpc_url: String,
    pub chain_id: String,
    pub bind_address: String,
    pub working_dir: String,
    pub pair_snapshot_file: String,
    pub token_pair_file: String,
    pub reserve_snapshot_file: String,
    pub supported_tokens: Vec<String>,
    pub max_hops: usize,
    pub pair_page_size: usize,
    pub default_slippage_bps: u32,
    pub save_routes: bool,
    pub venues: Vec<Venue>,
    pub optimizer: OptimizerSettings,
    pub reserve_loader: ReserveLoaderSettings,
}

#[allow(non_snake_case)]
#[derive(Serialize, Deserialize, ToSchema, IntoParams, Clone, Debug)]
#[into_params(parameter_in = Query)]
pub struct QuoteRequest {
    #[schema(example = "0x53c91253bc9682c04929ca02ed00b3e423f6710d2ee7e0d5ebb06f3ecf368a8")]
    pub sellTokenAddress: String,

    #[schema(example = "0x4718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d")]
    pub buyTokenAddress: String,

    #[schema(example = "1000000")]
    pub sellAmount: String,

    /// Read reserves from the node instead of the last indexed snapshot
    #[schema(nullable = true)]
    pub getLatest: Option<bool>,

    #[schema(example = 50, nullable = true)]
    pub slippageBps: Option<u32>,

    #[schema(example = 3, nullable = true)]
    pub maxHops: Option<usize>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum QuoteStatus {
    Quoted,
    NoRoute,
    NoLiquidity,
}

#[allow(non_snake_case)]
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct ResponsePool {
    pub pairAddress: String,
    pub tokenIn: String,
    pub tokenOut: String,
    pub reversed: bool,
}

#[allow(non_snake_case)]
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct ResponseRoute {
    pub percent: u32,
    pub amountOut: String,
    pub path: Vec<ResponsePool>,
}

#[allow(non_snake_case)]
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct QuoteResponse {
    pub status: QuoteStatus,
    pub sellTokenAddress: String,
    pub buyTokenAddress: String,
    pub sellAmount: String,
    pub buyAmount: String,
    pub bestSingleRouteAmount: String,
    pub blockNumber: u64,
    pub chainId: String,
    pub routes: Vec<ResponseRoute>,
    #[schema(value_type = Object, nullable = true)]
    pub execution: Option<ExecutionRequest>,
    /// Some reserve batches failed after retries; the quote ignores those pools
    pub degraded: bool,
    pub failedPools: Vec<String>,
    /// The allocation search hit its budget and returned its best so far
    pub searchExhausted: bool,
}

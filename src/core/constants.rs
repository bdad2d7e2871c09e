// Starknet entry points used by the chain client
pub const GET_ALL_PAIRS_ENTRY_POINT: &str = "get_all_pairs";
pub const TOKEN0_ENTRY_POINT: &str = "token0";
pub const TOKEN1_ENTRY_POINT: &str = "token1";
pub const GET_RESERVES_ENTRY_POINT: &str = "get_reserves";

// 0.3% venue fee, expressed as the share of the input that reaches the pool
pub const DEFAULT_FEE_NUMERATOR: u32 = 997;
pub const DEFAULT_FEE_DENOMINATOR: u32 = 1000;

// Allocation weights are integer units summing to this value
pub const TOTAL_WEIGHT: u32 = 100;

pub const DEFAULT_MAX_HOPS: usize = 3;
pub const DEFAULT_MAX_CANDIDATES: usize = 5;
pub const DEFAULT_WEIGHT_STEP: u32 = 5;
pub const DEFAULT_MAX_ITERATIONS: u64 = 5_000_000;
pub const DEFAULT_TIME_LIMIT_MS: u64 = 2_000;

pub const DEFAULT_PAIR_PAGE_SIZE: usize = 50;
pub const DEFAULT_RESERVE_BATCH_SIZE: usize = 50;
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 4;
pub const DEFAULT_RESERVE_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;

pub const BASIS_POINTS: u32 = 10_000;

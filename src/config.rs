use super::core::constants::{
    DEFAULT_FEE_DENOMINATOR, DEFAULT_FEE_NUMERATOR, DEFAULT_MAX_HOPS, DEFAULT_PAIR_PAGE_SIZE,
};
use super::core::optimization::OptimizerSettings;
use super::core::reserves::ReserveLoaderSettings;
use super::core::source::Venue;
use super::types::DexConfig;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://starknet-mainnet.public.blastapi.io/rpc/v0_7".to_string(),
            chain_id: "SN_MAIN".to_string(),
            bind_address: "127.0.0.1:3000".to_string(),
            working_dir: "working_dir".to_string(),
            pair_snapshot_file: "pairs.json".to_string(),
            token_pair_file: "all_token_pairs.csv".to_string(),
            reserve_snapshot_file: "reserves.json".to_string(),
            supported_tokens: [
        "0x49d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7",
        "0x68f5c6a61780768455de69077e07e89787839bf8166decfbf92b645209c0fb8",
        "0x53c91253bc9682c04929ca02ed00b3e423f6710d2ee7e0d5ebb06f3ecf368a8",
        "0x42b8f0484674ca266ac5d08e4ac6a3fe65bd3129795def2dca5c34ecc5f96d2",
        "0x5574eb6b8789a91466f902c380d978e472db68170ff82a5b650b95a58ddf4ad",
        "0x4718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d",
    ].iter().map(|x| x.to_string()).collect(),
            max_hops: DEFAULT_MAX_HOPS,
            pair_page_size: DEFAULT_PAIR_PAGE_SIZE,
            default_slippage_bps: 50,
            save_routes: false,
            venues: vec![Venue {
                name: "jediswap".to_string(),
                factory_address:
                    "0x00dad44c139a476c7a17fc8141e6db680e9abc9f56fe249a105094c44382c2fd"
                        .to_string(),
                fee_numerator: DEFAULT_FEE_NUMERATOR,
                fee_denominator: DEFAULT_FEE_DENOMINATOR,
            }],
            optimizer: OptimizerSettings::default(),
            reserve_loader: ReserveLoaderSettings::default(),
        }
    }
}

impl DexConfig {

    // Helper method to load from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        let config: Self = confy::load_path(&path)
            .with_context(|| format!("Couldn't load config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_hops == 0 {
            return Err(anyhow!("max_hops must be at least 1"));
        }
        if self.optimizer.max_candidates == 0 || self.optimizer.weight_step == 0 {
            return Err(anyhow!("optimizer needs at least one candidate and a positive weight step"));
        }
        if self.reserve_loader.batch_size == 0 || self.pair_page_size == 0 {
            return Err(anyhow!("batch and page sizes must be positive"));
        }
        if self.default_slippage_bps > 10_000 {
            return Err(anyhow!("default_slippage_bps cannot exceed 10000"));
        }
        Ok(())
    }

    pub fn working_file(&self, name: &str) -> PathBuf {
        PathBuf::from(&self.working_dir).join(name)
    }
}

use super::source::{PairSource, Venue};
use super::types::{Fee, Pair, RawPool};
use super::{Context, Result};
use anyhow::anyhow;
use std::collections::HashMap;
use std::path::Path;

/// Adjacency index over logical pairs.
///
/// Pairs live in an arena; their position is the stable identity the route
/// search uses to claim edges.
#[derive(Clone, Debug, Default)]
pub struct PairIndex {
    pairs: Vec<Pair>,
    adjacency: HashMap<String, Vec<usize>>,
    by_pool: HashMap<(String, bool), usize>,
}

impl PairIndex {
    pub fn new(pools: &[RawPool]) -> Self {
        let mut index = Self::default();
        for pool in pools {
            index.insert(pool);
        }
        index
    }

    // Duplicate pools are not filtered, they just add parallel edges
    pub fn insert(&mut self, pool: &RawPool) {
        self.push(Pair::forward(pool));
        self.push(Pair::reverse(pool));
    }

    fn push(&mut self, pair: Pair) {
        let id = self.pairs.len();
        self.adjacency
            .entry(pair.token_in.clone())
            .or_default()
            .push(id);
        self.by_pool
            .entry((pair.pool_id.clone(), pair.reversed))
            .or_insert(id);
        self.pairs.push(pair);
    }

    /// Build the index from a headerless `pool,token0,token1` CSV file.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .context("Couldn't open pair file while building pair index")?;

        let mut index = Self::default();
        for record in reader.records() {
            let record = record?;
            if record.len() < 3 {
                continue;
            }
            index.insert(&RawPool::new(&record[0], &record[1], &record[2]));
        }
        Ok(index)
    }

    pub fn pair(&self, id: usize) -> &Pair {
        &self.pairs[id]
    }

    /// Ids of the pairs whose `token_in` is `token`.
    pub fn outgoing(&self, token: &str) -> &[usize] {
        self.adjacency.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, pool_id: &str, reversed: bool) -> Option<&Pair> {
        self.by_pool
            .get(&(pool_id.to_string(), reversed))
            .map(|id| &self.pairs[*id])
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.adjacency.len()
    }
}

/// Page through a venue's pools until a short page comes back.
pub async fn fetch_all_pairs<S: PairSource>(
    source: &S,
    venue: &Venue,
    page_size: usize,
) -> Result<Vec<RawPool>> {
    if page_size == 0 {
        return Err(anyhow!("Pair page size must be positive"));
    }
    let fee = Fee::new(venue.fee_numerator, venue.fee_denominator)
        .with_context(|| format!("Bad fee configured for {}", venue.name))?;

    let mut pools = vec![];
    let mut skip = 0;
    loop {
        let page = source
            .list_pairs(venue, skip, page_size)
            .await
            .with_context(|| format!("Error listing pairs of {} at offset {}", venue.name, skip))?;
        let fetched = page.len();
        pools.extend(page.into_iter().map(|mut pool| {
            pool.venue = venue.name.clone();
            pool.fee = fee;
            pool
        }));
        if fetched < page_size {
            break;
        }
        skip += fetched;
    }

    tracing::info!("Fetched {} pairs from {}", pools.len(), venue.name);
    Ok(pools)
}

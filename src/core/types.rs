use super::constants::{DEFAULT_FEE_DENOMINATOR, DEFAULT_FEE_NUMERATOR};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Fee charged by a pool, as the fraction of the input that is actually swapped.
///
/// The default 997/1000 is the 0.3% tier shared by every constant-product
/// venue we route through today.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fee {
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for Fee {
    fn default() -> Self {
        Self {
            numerator: DEFAULT_FEE_NUMERATOR,
            denominator: DEFAULT_FEE_DENOMINATOR,
        }
    }
}

/// Raw pool descriptor as produced by pair enumeration.
/// token0/token1 are in the pool's canonical order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPool {
    pub pool_id: String,
    pub token0: String,
    pub token1: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub fee: Fee,
}

impl RawPool {
    pub fn new(pool_id: &str, token0: &str, token1: &str) -> Self {
        Self {
            pool_id: pool_id.to_string(),
            token0: token0.to_string(),
            token1: token1.to_string(),
            venue: String::new(),
            fee: Fee::default(),
        }
    }
}

/// One traversal direction of a pool.
///
/// Every pool yields two pairs sharing `pool_id`: the forward one in canonical
/// token order and the reversed one with tokens (and, once loaded, reserves)
/// swapped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    pub pool_id: String,
    pub token_in: String,
    pub token_out: String,
    pub reversed: bool,
    #[serde(default)]
    pub fee: Fee,
    #[serde(default, with = "option_biguint_string")]
    pub reserve_in: Option<BigUint>,
    #[serde(default, with = "option_biguint_string")]
    pub reserve_out: Option<BigUint>,
}

impl Pair {
    pub fn forward(pool: &RawPool) -> Self {
        Self {
            pool_id: pool.pool_id.clone(),
            token_in: pool.token0.clone(),
            token_out: pool.token1.clone(),
            reversed: false,
            fee: pool.fee,
            reserve_in: None,
            reserve_out: None,
        }
    }

    pub fn reverse(pool: &RawPool) -> Self {
        Self {
            pool_id: pool.pool_id.clone(),
            token_in: pool.token1.clone(),
            token_out: pool.token0.clone(),
            reversed: true,
            fee: pool.fee,
            reserve_in: None,
            reserve_out: None,
        }
    }

    /// Attach canonical (token0, token1) reserves, swapping them for reversed pairs.
    pub fn set_reserves(&mut self, reserve0: &BigUint, reserve1: &BigUint) {
        if self.reversed {
            self.reserve_in = Some(reserve1.clone());
            self.reserve_out = Some(reserve0.clone());
        } else {
            self.reserve_in = Some(reserve0.clone());
            self.reserve_out = Some(reserve1.clone());
        }
    }
}

/// An ordered chain of pairs from an input token towards a target token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub steps: Vec<Pair>,
    pub finished: bool,
    #[serde(default, with = "option_biguint_string")]
    pub amount_out: Option<BigUint>,
}

impl Route {
    pub fn new(first: Pair, target: &str) -> Self {
        let finished = first.token_out == target;
        Self {
            steps: vec![first],
            finished,
            amount_out: None,
        }
    }

    pub fn token_in(&self) -> Option<&str> {
        self.steps.first().map(|p| p.token_in.as_str())
    }

    pub fn token_out(&self) -> Option<&str> {
        self.steps.last().map(|p| p.token_out.as_str())
    }

    pub fn hops(&self) -> usize {
        self.steps.len()
    }

    pub fn contains_pool(&self, pool_id: &str) -> bool {
        self.steps.iter().any(|p| p.pool_id == pool_id)
    }

    pub fn visits_token(&self, token: &str) -> bool {
        self.steps
            .iter()
            .any(|p| p.token_in == token || p.token_out == token)
    }
}

/// Split of one trade across several routes.
/// `weights[i]` is the share of the input sent through `routes[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutesData {
    pub weights: Vec<u32>,
    pub routes: Vec<Route>,
    #[serde(with = "biguint_string")]
    pub total_amount_out: BigUint,
}

impl RoutesData {
    pub fn without_zero_weights(&self) -> Self {
        let (weights, routes) = self
            .weights
            .iter()
            .zip(self.routes.iter())
            .filter(|(weight, _)| **weight > 0)
            .map(|(weight, route)| (*weight, route.clone()))
            .unzip();
        Self {
            weights,
            routes,
            total_amount_out: self.total_amount_out.clone(),
        }
    }
}

// Big integers are stored as decimal strings so snapshots survive JSON
// readers that coerce numbers to doubles.
pub mod biguint_string {
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BigUint::from_str(&raw).map_err(D::Error::custom)
    }
}

pub mod option_biguint_string {
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(
        value: &Option<BigUint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BigUint>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| BigUint::from_str(&s).map_err(D::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_pair_swaps_reserves() {
        let pool = RawPool::new("0xlp", "A", "B");
        let mut forward = Pair::forward(&pool);
        let mut reverse = Pair::reverse(&pool);
        forward.set_reserves(&BigUint::from(10u32), &BigUint::from(20u32));
        reverse.set_reserves(&BigUint::from(10u32), &BigUint::from(20u32));

        assert_eq!(forward.reserve_in, Some(BigUint::from(10u32)));
        assert_eq!(forward.reserve_out, Some(BigUint::from(20u32)));
        assert_eq!(reverse.token_in, "B");
        assert_eq!(reverse.reserve_in, Some(BigUint::from(20u32)));
        assert_eq!(reverse.reserve_out, Some(BigUint::from(10u32)));
    }

    #[test]
    fn routes_data_keeps_big_numbers_as_strings() {
        let pool = RawPool::new("0xlp", "A", "B");
        let mut pair = Pair::forward(&pool);
        pair.set_reserves(
            &BigUint::parse_bytes(b"123456789012345678901234567890", 10).unwrap(),
            &BigUint::from(7u32),
        );
        let data = RoutesData {
            weights: vec![100],
            routes: vec![Route::new(pair, "B")],
            total_amount_out: BigUint::parse_bytes(b"98765432109876543210", 10).unwrap(),
        };

        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"totalAmountOut\":\"98765432109876543210\""));
        assert!(json.contains("\"reserveIn\":\"123456789012345678901234567890\""));

        let restored: RoutesData = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn zero_weights_are_dropped_in_order() {
        let pool = RawPool::new("0xlp", "A", "B");
        let route = Route::new(Pair::forward(&pool), "B");
        let data = RoutesData {
            weights: vec![0, 60, 0, 40],
            routes: vec![route.clone(), route.clone(), route.clone(), route],
            total_amount_out: BigUint::from(5u32),
        };
        let trimmed = data.without_zero_weights();
        assert_eq!(trimmed.weights, vec![60, 40]);
        assert_eq!(trimmed.routes.len(), 2);
    }
}

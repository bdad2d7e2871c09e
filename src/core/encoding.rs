use super::constants::BASIS_POINTS;
use super::errors::RouterError;
use super::pair::PairIndex;
use super::types::{biguint_string, Route, RoutesData};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// One hop as the execution contract sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedStep {
    pub pool_id: String,
    pub reversed: bool,
}

/// `weights[i]` routes its share through the hops in `steps[i]`, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedRoutes {
    pub weights: Vec<u32>,
    pub steps: Vec<Vec<EncodedStep>>,
}

impl EncodedRoutes {
    /// Pack non-zero weighted routes, preserving route and step order.
    pub fn encode(data: &RoutesData) -> Result<Self, RouterError> {
        if data.weights.len() != data.routes.len() {
            return Err(RouterError::WeightRouteMismatch {
                weights: data.weights.len(),
                routes: data.routes.len(),
            });
        }

        let mut encoded = Self::default();
        for (index, (weight, route)) in data.weights.iter().zip(data.routes.iter()).enumerate() {
            if *weight == 0 {
                continue;
            }
            encoded.weights.push(*weight);
            encoded.steps.push(encode_route(index, route)?);
        }
        Ok(encoded)
    }

    /// Rebuild weights and routes by resolving every step against `index`.
    /// The rebuilt routes carry no reserves.
    pub fn decode(&self, index: &PairIndex) -> Result<(Vec<u32>, Vec<Route>), RouterError> {
        if self.weights.len() != self.steps.len() {
            return Err(RouterError::WeightRouteMismatch {
                weights: self.weights.len(),
                routes: self.steps.len(),
            });
        }

        let routes = self
            .steps
            .iter()
            .enumerate()
            .map(|(route_index, steps)| {
                let pairs = steps
                    .iter()
                    .map(|step| {
                        index
                            .find(&step.pool_id, step.reversed)
                            .cloned()
                            .ok_or_else(|| RouterError::UnknownPair {
                                pool_id: step.pool_id.clone(),
                                reversed: step.reversed,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if pairs.is_empty() {
                    return Err(RouterError::EmptyRoute { index: route_index });
                }
                Ok(Route {
                    steps: pairs,
                    finished: true,
                    amount_out: None,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((self.weights.clone(), routes))
    }
}

fn encode_route(index: usize, route: &Route) -> Result<Vec<EncodedStep>, RouterError> {
    if route.steps.is_empty() {
        return Err(RouterError::EmptyRoute { index });
    }

    route
        .steps
        .iter()
        .enumerate()
        .map(|(step, pair)| {
            if pair.pool_id.trim().is_empty() {
                return Err(RouterError::MalformedStep {
                    route: index,
                    step,
                    reason: "empty pool id".to_string(),
                });
            }
            if step > 0 && route.steps[step - 1].token_out != pair.token_in {
                return Err(RouterError::MalformedStep {
                    route: index,
                    step,
                    reason: format!(
                        "expected input {}, found {}",
                        route.steps[step - 1].token_out,
                        pair.token_in
                    ),
                });
            }
            Ok(EncodedStep {
                pool_id: pair.pool_id.clone(),
                reversed: pair.reversed,
            })
        })
        .collect()
}

/// Arguments for the external swap entry point. Nothing here is executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub token_in: String,
    pub token_out: String,
    #[serde(with = "biguint_string")]
    pub amount_in: BigUint,
    pub slippage_bps: u32,
    #[serde(with = "biguint_string")]
    pub min_amount_out: BigUint,
    pub routes: EncodedRoutes,
}

impl ExecutionRequest {
    pub fn new(
        token_in: &str,
        token_out: &str,
        amount_in: &BigUint,
        slippage_bps: u32,
        data: &RoutesData,
    ) -> Result<Self, RouterError> {
        if slippage_bps > BASIS_POINTS {
            return Err(RouterError::InvalidAmount(format!(
                "slippage of {slippage_bps} bps exceeds 100%"
            )));
        }
        let min_amount_out =
            &data.total_amount_out * (BASIS_POINTS - slippage_bps) / BASIS_POINTS;

        Ok(Self {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in: amount_in.clone(),
            slippage_bps,
            min_amount_out,
            routes: EncodedRoutes::encode(data)?,
        })
    }
}

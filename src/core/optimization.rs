use super::constants::{
    DEFAULT_MAX_CANDIDATES, DEFAULT_MAX_ITERATIONS, DEFAULT_TIME_LIMIT_MS, DEFAULT_WEIGHT_STEP,
    TOTAL_WEIGHT,
};
use super::types::{Route, RoutesData};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

// How often the wall clock is consulted during the allocation search
const DEADLINE_CHECK_INTERVAL: u64 = 256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub max_candidates: usize,
    pub weight_step: u32,
    pub max_iterations: u64,
    pub time_limit_ms: u64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            weight_step: DEFAULT_WEIGHT_STEP,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OptimizationResult {
    /// Best route taking the whole amount, priced standalone
    pub best_route: Route,
    pub routes_data: RoutesData,
    pub iterations: u64,
    /// The search stopped on its iteration or time budget before covering
    /// every allocation
    pub exhausted: bool,
}

/// Price every route with the full input, rank them and search the best split
/// over the top candidates. Returns `None` when there is nothing to optimize.
pub fn optimize_amount_out(
    routes: Vec<Route>,
    amount_in: &BigUint,
    settings: &OptimizerSettings,
) -> Option<OptimizationResult> {
    let mut routes = routes;
    price_routes(&mut routes, amount_in);
    let mut ranked = rank_routes(routes);
    ranked.truncate(settings.max_candidates.max(1));

    Optimizer::new(ranked, amount_in.clone(), settings.weight_step)
        .optimize(&SearchBudget::from_settings(settings))
}

/// Set every route's standalone output for `amount_in`.
pub fn price_routes(routes: &mut [Route], amount_in: &BigUint) {
    for route in routes.iter_mut() {
        route.amount_out = Some(route.get_amount_out(amount_in));
    }
}

/// Sort by standalone output, best first. Equal outputs keep discovery order.
pub fn rank_routes(mut routes: Vec<Route>) -> Vec<Route> {
    routes.sort_by(|a, b| b.amount_out.cmp(&a.amount_out));
    routes
}

#[derive(Clone, Copy, Debug)]
pub struct SearchBudget {
    pub max_iterations: Option<u64>,
    pub deadline: Option<Instant>,
}

impl SearchBudget {
    pub fn unlimited() -> Self {
        Self {
            max_iterations: None,
            deadline: None,
        }
    }

    pub fn from_settings(settings: &OptimizerSettings) -> Self {
        Self {
            max_iterations: (settings.max_iterations > 0).then_some(settings.max_iterations),
            deadline: (settings.time_limit_ms > 0)
                .then(|| Instant::now() + Duration::from_millis(settings.time_limit_ms)),
        }
    }

    fn is_spent(&self, iterations: u64) -> bool {
        if self.max_iterations.is_some_and(|max| iterations >= max) {
            return true;
        }
        iterations % DEADLINE_CHECK_INTERVAL == 0
            && self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Every way to write `total` as `parts` non-negative weights where all but
/// the first weight are multiples of `step`; the first takes the leftover.
///
/// The last weight varies slowest, so the first composition puts everything
/// on the first part.
#[derive(Clone, Debug)]
pub struct Compositions {
    weights: Vec<u32>,
    total: u32,
    step: u32,
    done: bool,
}

impl Compositions {
    pub fn new(parts: usize, total: u32, step: u32) -> Self {
        let mut weights = vec![0; parts];
        if let Some(first) = weights.first_mut() {
            *first = total;
        }
        Self {
            weights,
            total,
            step: step.max(1),
            done: parts == 0,
        }
    }

    fn advance(&mut self) {
        let mut digit = 1;
        loop {
            if digit >= self.weights.len() {
                self.done = true;
                return;
            }
            let used: u32 = self.weights[1..].iter().sum();
            if used + self.step <= self.total {
                self.weights[digit] += self.step;
                self.weights[0] = self.total - used - self.step;
                return;
            }
            self.weights[digit] = 0;
            digit += 1;
        }
    }
}

impl Iterator for Compositions {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let current = self.weights.clone();
        self.advance();
        Some(current)
    }
}

pub struct Optimizer {
    candidates: Vec<Route>,
    total_amount: BigUint,
    step: u32,
}

impl Optimizer {
    pub fn new(candidates: Vec<Route>, total_amount: BigUint, step: u32) -> Self {
        Self {
            candidates,
            total_amount,
            step,
        }
    }

    // outputs[i][w]: output of candidate i when it receives weight w
    fn output_table(&self) -> Vec<Vec<BigUint>> {
        self.candidates
            .iter()
            .map(|route| {
                (0..=TOTAL_WEIGHT)
                    .map(|weight| {
                        let amount_in = &self.total_amount * weight / TOTAL_WEIGHT;
                        route.get_amount_out(&amount_in)
                    })
                    .collect()
            })
            .collect()
    }

    /// Exhaustive search over weight compositions, keeping the first best.
    /// Returns `None` without candidates.
    pub fn optimize(&self, budget: &SearchBudget) -> Option<OptimizationResult> {
        let best_route = self.candidates.first()?.clone();
        let outputs = self.output_table();
        let mut best_weights = vec![0; self.candidates.len()];
        let mut best_output = BigUint::zero();
        let mut iterations = 0;
        let mut exhausted = false;

        for weights in Compositions::new(self.candidates.len(), TOTAL_WEIGHT, self.step) {
            if iterations > 0 && budget.is_spent(iterations) {
                exhausted = true;
                break;
            }
            iterations += 1;

            let total: BigUint = weights
                .iter()
                .enumerate()
                .map(|(i, weight)| &outputs[i][*weight as usize])
                .sum();
            if iterations == 1 || total > best_output {
                best_output = total;
                best_weights = weights;
            }
        }

        let routes = self
            .candidates
            .iter()
            .zip(best_weights.iter())
            .enumerate()
            .map(|(i, (route, weight))| Route {
                amount_out: Some(outputs[i][*weight as usize].clone()),
                ..route.clone()
            })
            .collect();

        tracing::debug!(
            "Allocation search over {} routes: {} iterations, best {:?} -> {}",
            self.candidates.len(),
            iterations,
            best_weights,
            best_output
        );

        Some(OptimizationResult {
            best_route,
            routes_data: RoutesData {
                weights: best_weights,
                routes,
                total_amount_out: best_output,
            },
            iterations,
            exhausted,
        })
    }
}

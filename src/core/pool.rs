use super::errors::RouterError;
use super::types::{Fee, Route};
use num_bigint::BigUint;
use num_traits::Zero;

impl Fee {
    pub fn new(numerator: u32, denominator: u32) -> Result<Self, RouterError> {
        if denominator == 0 || numerator == 0 || numerator > denominator {
            return Err(RouterError::InvalidFee {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Constant-product output for one hop, truncating like the pool contract does.
    pub fn get_amount_out(
        &self,
        amount_in: &BigUint,
        reserve_in: &BigUint,
        reserve_out: &BigUint,
    ) -> BigUint {
        if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
            return BigUint::zero();
        }

        let amount_in_with_fee = amount_in * self.numerator;
        let numerator = &amount_in_with_fee * reserve_out;
        let denominator = reserve_in * self.denominator + &amount_in_with_fee;

        if denominator.is_zero() {
            return BigUint::zero();
        }
        numerator / denominator
    }
}

/// Single hop at the default 0.3% fee.
pub fn simulate_hop(amount_in: &BigUint, reserve_in: &BigUint, reserve_out: &BigUint) -> BigUint {
    Fee::default().get_amount_out(amount_in, reserve_in, reserve_out)
}

impl Route {
    /// Chain the hop formula along the route. Any hop without reserves makes
    /// the whole route worth zero.
    pub fn get_amount_out(&self, amount_in: &BigUint) -> BigUint {
        let mut current_amount = amount_in.clone();

        for pair in &self.steps {
            let (Some(reserve_in), Some(reserve_out)) = (&pair.reserve_in, &pair.reserve_out)
            else {
                return BigUint::zero();
            };
            current_amount = pair
                .fee
                .get_amount_out(&current_amount, reserve_in, reserve_out);
            if current_amount.is_zero() {
                return BigUint::zero();
            }
        }

        current_amount
    }
}

use super::pair::PairIndex;
use super::types::Route;
use std::collections::HashMap;

/// Layered route search over a [`PairIndex`].
///
/// Every pair consumed by a route during a search is claimed at the hop it was
/// taken and cannot be taken again by any other route in the same search, even
/// on a different branch. This keeps the route count tractable on dense graphs
/// at the price of skipping some alternate paths that would reuse an edge. The
/// claim set lives only for one `find_routes` call, so independent searches on
/// the same index never see each other's claims.
///
/// Besides never repeating a pool, a route never returns to a token it already
/// visited (the start token included). Extensions rejected for that reason are
/// not claimed, so a closing pair stays available to other branches.
pub struct RouteFinder<'a> {
    index: &'a PairIndex,
    max_hops: usize,
}

impl<'a> RouteFinder<'a> {
    pub fn new(index: &'a PairIndex, max_hops: usize) -> Self {
        Self { index, max_hops }
    }

    /// All finished routes from `token_in` to `token_out` of at most `max_hops` steps.
    ///
    /// An empty result means no route exists within the hop bound.
    pub fn find_routes(&self, token_in: &str, token_out: &str) -> Vec<Route> {
        if token_in == token_out || self.max_hops == 0 {
            return vec![];
        }

        // pair id -> hop at which it was claimed
        let mut claimed: HashMap<usize, usize> = HashMap::new();
        let mut finished = vec![];
        let mut partial = vec![];

        for &id in self.index.outgoing(token_in) {
            let pair = self.index.pair(id);
            if pair.token_out == token_in {
                continue;
            }
            claimed.insert(id, 1);
            let route = Route::new(pair.clone(), token_out);
            if route.finished {
                finished.push(route);
            } else {
                partial.push(route);
            }
        }

        for hop in 2..=self.max_hops {
            if partial.is_empty() {
                break;
            }
            let mut next = vec![];

            for mut route in partial {
                let Some(frontier) = route.token_out().map(str::to_string) else {
                    continue;
                };
                let extensions: Vec<usize> = self
                    .index
                    .outgoing(&frontier)
                    .iter()
                    .copied()
                    .filter(|id| {
                        let pair = self.index.pair(*id);
                        !claimed.contains_key(id)
                            && !route.contains_pool(&pair.pool_id)
                            && !route.visits_token(&pair.token_out)
                    })
                    .collect();
                for id in &extensions {
                    claimed.insert(*id, hop);
                }

                let Some((&first, rest)) = extensions.split_first() else {
                    continue;
                };
                // forks copy the prefix before the original is extended in place
                let forks: Vec<Route> = rest
                    .iter()
                    .map(|id| {
                        let mut fork = route.clone();
                        self.extend(&mut fork, *id, token_out);
                        fork
                    })
                    .collect();
                self.extend(&mut route, first, token_out);

                for candidate in std::iter::once(route).chain(forks) {
                    if candidate.finished {
                        finished.push(candidate);
                    } else {
                        next.push(candidate);
                    }
                }
            }

            partial = next;
        }

        tracing::debug!(
            "Route search {} -> {}: {} finished routes, {} pairs claimed",
            token_in,
            token_out,
            finished.len(),
            claimed.len()
        );
        finished
    }

    fn extend(&self, route: &mut Route, id: usize, target: &str) {
        let pair = self.index.pair(id).clone();
        route.finished = pair.token_out == target;
        route.steps.push(pair);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RawPool;

    fn tokens(route: &Route) -> Vec<&str> {
        let mut path = vec![route.steps[0].token_in.as_str()];
        path.extend(route.steps.iter().map(|p| p.token_out.as_str()));
        path
    }

    #[test]
    fn finds_single_two_hop_route() {
        let index = PairIndex::new(&[
            RawPool::new("LP1", "A", "B"),
            RawPool::new("LP2", "B", "C"),
        ]);
        let routes = RouteFinder::new(&index, 3).find_routes("A", "C");

        assert_eq!(routes.len(), 1);
        assert!(routes[0].finished);
        assert_eq!(tokens(&routes[0]), vec!["A", "B", "C"]);
        assert!(!routes[0].steps[0].reversed);
    }

    #[test]
    fn walks_pools_in_reverse_direction() {
        let index = PairIndex::new(&[
            RawPool::new("LP1", "A", "B"),
            RawPool::new("LP2", "B", "C"),
        ]);
        let routes = RouteFinder::new(&index, 3).find_routes("C", "A");

        assert_eq!(routes.len(), 1);
        assert_eq!(tokens(&routes[0]), vec!["C", "B", "A"]);
        assert!(routes[0].steps.iter().all(|p| p.reversed));
    }

    #[test]
    fn no_route_is_an_empty_result() {
        let index = PairIndex::new(&[
            RawPool::new("LP1", "A", "B"),
            RawPool::new("LP2", "C", "D"),
        ]);
        assert!(RouteFinder::new(&index, 4).find_routes("A", "D").is_empty());
        assert!(RouteFinder::new(&index, 4).find_routes("A", "A").is_empty());
        assert!(RouteFinder::new(&index, 4).find_routes("Z", "A").is_empty());
    }

    #[test]
    fn respects_hop_bound() {
        let index = PairIndex::new(&[
            RawPool::new("LP1", "A", "B"),
            RawPool::new("LP2", "B", "C"),
            RawPool::new("LP3", "C", "D"),
        ]);
        assert!(RouteFinder::new(&index, 2).find_routes("A", "D").is_empty());
        assert_eq!(RouteFinder::new(&index, 3).find_routes("A", "D").len(), 1);
    }

    #[test]
    fn parallel_pools_give_parallel_routes() {
        let index = PairIndex::new(&[
            RawPool::new("LP1", "A", "C"),
            RawPool::new("LP2", "A", "C"),
        ]);
        let routes = RouteFinder::new(&index, 3).find_routes("A", "C");
        let pools: Vec<&str> = routes.iter().map(|r| r.steps[0].pool_id.as_str()).collect();
        assert_eq!(pools, vec!["LP1", "LP2"]);
    }

    #[test]
    fn claimed_edge_is_not_reused_by_another_branch() {
        // A->B->X->C and A->D->X->C both need X->C on LP5; the first branch
        // claims it so the second never finishes.
        let index = PairIndex::new(&[
            RawPool::new("LP1", "A", "B"),
            RawPool::new("LP2", "A", "D"),
            RawPool::new("LP3", "B", "X"),
            RawPool::new("LP4", "D", "X"),
            RawPool::new("LP5", "X", "C"),
        ]);
        let routes = RouteFinder::new(&index, 3).find_routes("A", "C");

        assert_eq!(routes.len(), 1);
        assert_eq!(tokens(&routes[0]), vec!["A", "B", "X", "C"]);
    }

    #[test]
    fn routes_are_simple_chains_within_bound() {
        let names = ["A", "B", "C", "D", "E"];
        let mut pools = vec![];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                pools.push(RawPool::new(&format!("{a}{b}"), a, b));
            }
        }
        let index = PairIndex::new(&pools);
        let routes = RouteFinder::new(&index, 3).find_routes("A", "E");

        assert!(!routes.is_empty());
        for route in &routes {
            assert!(route.finished);
            assert!(route.hops() <= 3);
            assert_eq!(route.token_in(), Some("A"));
            assert_eq!(route.token_out(), Some("E"));
            for window in route.steps.windows(2) {
                assert_eq!(window[0].token_out, window[1].token_in);
            }
            let mut pool_ids: Vec<&str> = route.steps.iter().map(|p| p.pool_id.as_str()).collect();
            pool_ids.sort();
            pool_ids.dedup();
            assert_eq!(pool_ids.len(), route.hops());
        }
    }

    #[test]
    fn parallel_pools_never_lead_back_to_a_visited_token() {
        // two pools per token pair, so a pool-distinct walk could bounce A->B->A
        let names = ["A", "B", "C", "D"];
        let mut pools = vec![];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                pools.push(RawPool::new(&format!("{a}{b}-1"), a, b));
                pools.push(RawPool::new(&format!("{a}{b}-2"), b, a));
            }
        }
        let index = PairIndex::new(&pools);
        let routes = RouteFinder::new(&index, 4).find_routes("A", "D");

        assert!(!routes.is_empty());
        for route in &routes {
            let mut visited = tokens(route);
            let hops = route.hops();
            visited.sort();
            visited.dedup();
            assert_eq!(visited.len(), hops + 1);
        }
    }

    #[test]
    fn repeated_searches_are_independent() {
        let index = PairIndex::new(&[
            RawPool::new("LP1", "A", "B"),
            RawPool::new("LP2", "B", "C"),
            RawPool::new("LP3", "A", "C"),
        ]);
        let finder = RouteFinder::new(&index, 3);
        let first = finder.find_routes("A", "C");
        let second = finder.find_routes("A", "C");
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}

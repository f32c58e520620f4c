//! Fitness-proportionate selection without replacement.
//!
//! Each draw picks a member with probability proportional to its fitness
//! among the members not yet drawn, then removes it. Negative fitness counts
//! as zero. When no member qualifies (all remaining fitness is zero), the
//! draw falls back to a uniform choice, so drawing `k` of `k` members always
//! returns each member exactly once.
//!
//! # Complexity
//! O(n) per draw.

use crate::error::PoolExhausted;
use crate::float::BigFloat;
use crate::pool::{Pool, Pooled};
use crate::types::Individual;
use rand::Rng;

/// Roulette-wheel selector over a fixed set of candidates.
///
/// The accumulators are checked out of a float pool for the selector's
/// lifetime and updated in place on every draw.
pub struct Selector<'p, I> {
    remaining: Vec<I>,
    total: Pooled<'p, BigFloat>,
    pick: Pooled<'p, BigFloat>,
    running: Pooled<'p, BigFloat>,
}

impl<'p, I: Individual> Selector<'p, I> {
    /// # Errors
    /// Returns [`PoolExhausted`] if the accumulators cannot be checked out.
    pub fn new(candidates: Vec<I>, floats: &'p Pool<BigFloat>) -> Result<Self, PoolExhausted> {
        let mut total = floats.try_checkout()?;
        let pick = floats.try_checkout()?;
        let running = floats.try_checkout()?;

        for candidate in &candidates {
            if candidate.fitness().is_positive() {
                *total += candidate.fitness();
            }
        }

        Ok(Self {
            remaining: candidates,
            total,
            pick,
            running,
        })
    }

    /// Number of candidates not yet drawn.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Draws and removes one candidate, or `None` once all are drawn.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<I> {
        if self.remaining.is_empty() {
            return None;
        }

        let u = BigFloat::from_f64(rng.random::<f64>(), self.total.precision());
        self.pick.clone_from(&*self.total);
        *self.pick *= &u;
        self.running.set_zero();

        let mut chosen = None;
        for (k, candidate) in self.remaining.iter().enumerate() {
            if candidate.fitness().is_positive() {
                *self.running += candidate.fitness();
            }
            if *self.running > *self.pick {
                chosen = Some(k);
                break;
            }
        }
        let index = chosen.unwrap_or_else(|| rng.random_range(0..self.remaining.len()));

        let drawn = self.remaining.swap_remove(index);
        if drawn.fitness().is_positive() {
            *self.total -= drawn.fitness();
            if self.total.is_negative() {
                self.total.set_zero();
            }
        }
        Some(drawn)
    }

    /// Draws up to `k` candidates; fewer if fewer remain.
    pub fn draw_many<R: Rng + ?Sized>(&mut self, k: usize, rng: &mut R) -> Vec<I> {
        let mut drawn = Vec::with_capacity(k.min(self.remaining.len()));
        while drawn.len() < k {
            match self.draw(rng) {
                Some(candidate) => drawn.push(candidate),
                None => break,
            }
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Debug, Clone)]
    struct Scored {
        id: usize,
        fitness: BigFloat,
    }

    impl Individual for Scored {
        fn fitness(&self) -> &BigFloat {
            &self.fitness
        }
    }

    fn scored(fitness: &[f64]) -> Vec<Scored> {
        fitness
            .iter()
            .enumerate()
            .map(|(id, &f)| Scored {
                id,
                fitness: BigFloat::from_f64(f, 64),
            })
            .collect()
    }

    fn floats() -> Pool<BigFloat> {
        Pool::new("float", Some(16), || BigFloat::zero(64))
    }

    fn ids(drawn: &[Scored]) -> Vec<usize> {
        let mut ids: Vec<usize> = drawn.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_draw_all_returns_each_once() {
        let pool = floats();
        let mut rng = StdRng::seed_from_u64(42);
        let mut selector = Selector::new(scored(&[0.1, 0.5, 0.96, 0.02, 1.0]), &pool).unwrap();
        let drawn = selector.draw_many(5, &mut rng);
        assert_eq!(ids(&drawn), vec![0, 1, 2, 3, 4]);
        assert_eq!(selector.remaining(), 0);
    }

    #[test]
    fn test_draw_all_zero_fitness() {
        let pool = floats();
        let mut rng = StdRng::seed_from_u64(7);
        let mut selector = Selector::new(scored(&[0.0; 6]), &pool).unwrap();
        let drawn = selector.draw_many(6, &mut rng);
        assert_eq!(ids(&drawn), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_draw_more_than_remaining() {
        let pool = floats();
        let mut rng = StdRng::seed_from_u64(7);
        let mut selector = Selector::new(scored(&[0.3, 0.4]), &pool).unwrap();
        assert_eq!(selector.draw_many(5, &mut rng).len(), 2);
        assert!(selector.draw(&mut rng).is_none());
    }

    #[test]
    fn test_only_positive_candidate_drawn_first() {
        let pool = floats();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let mut selector = Selector::new(scored(&[0.0, 0.0, 0.7, 0.0]), &pool).unwrap();
            assert_eq!(selector.draw(&mut rng).unwrap().id, 2);
        }
    }

    #[test]
    fn test_negative_fitness_counts_as_zero() {
        let pool = floats();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let mut selector = Selector::new(scored(&[-5.0, 0.25]), &pool).unwrap();
            assert_eq!(selector.draw(&mut rng).unwrap().id, 1);
        }
    }

    #[test]
    fn test_proportional() {
        let pool = floats();
        let mut rng = StdRng::seed_from_u64(11);
        let mut hits = [0usize; 2];
        for _ in 0..2000 {
            let mut selector = Selector::new(scored(&[0.1, 0.9]), &pool).unwrap();
            hits[selector.draw(&mut rng).unwrap().id] += 1;
        }
        // Expect roughly 200 / 1800.
        assert!((120..300).contains(&hits[0]), "hits = {hits:?}");
    }

    #[test]
    fn test_accumulators_returned_to_pool() {
        let pool = floats();
        {
            let _selector = Selector::new(scored(&[0.5]), &pool).unwrap();
            assert_eq!(pool.outstanding(), 3);
        }
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_total_tracks_remaining_fitness() {
        let pool = floats();
        let mut rng = StdRng::seed_from_u64(21);
        let mut selector = Selector::new(scored(&[0.5, -1.0, 0.25, 0.125]), &pool).unwrap();

        for _ in 0..4 {
            let mut expected = BigFloat::zero(64);
            for candidate in &selector.remaining {
                if candidate.fitness.is_positive() {
                    expected += &candidate.fitness;
                }
            }
            assert_eq!(*selector.total, expected);

            selector.draw(&mut rng).unwrap();
            assert_eq!(pool.outstanding(), 3, "draws reuse the checked-out accumulators");
        }
        assert!(selector.total.is_zero());
    }

    #[test]
    fn test_pool_exhausted() {
        let pool = Pool::new("float", Some(2), || BigFloat::zero(64));
        let err = Selector::new(scored(&[0.5]), &pool).err().unwrap();
        assert_eq!(err.limit, 2);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_works_on_references() {
        let pool = floats();
        let mut rng = StdRng::seed_from_u64(1);
        let members = scored(&[0.2, 0.3, 0.5]);
        let mut selector = Selector::new(members.iter().collect::<Vec<&Scored>>(), &pool).unwrap();
        let drawn: Vec<usize> = selector.draw_many(3, &mut rng).iter().map(|s| s.id).collect();
        assert_eq!(drawn.len(), 3);
    }
}

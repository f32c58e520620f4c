//! Scratch-object pools.
//!
//! Every [`Simulation`](crate::Simulation) owns its own pools (random number
//! generators, float accumulators, decode buffers), so independent
//! simulations never share mutable state.
//!
//! A checked-out object is wrapped in a [`Pooled`] guard. Dropping the guard
//! resets the object to its zero state and returns it to the idle list; the
//! object cannot outlive the guard.

use crate::error::PoolExhausted;
use crate::float::BigFloat;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Objects that can be returned to a defined zero state.
pub trait Reset {
    fn reset(&mut self);
}

impl Reset for BigFloat {
    fn reset(&mut self) {
        self.set_zero();
    }
}

// Generators keep their stream position across checkouts.
impl Reset for StdRng {
    fn reset(&mut self) {}
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A pool of reusable objects with an optional outstanding-object limit.
pub struct Pool<T> {
    name: &'static str,
    idle: Mutex<Vec<T>>,
    outstanding: AtomicUsize,
    limit: Option<usize>,
    factory: Factory<T>,
}

impl<T: Reset> Pool<T> {
    /// Creates an empty pool. Objects are built on demand by `factory`.
    ///
    /// With `limit = Some(n)`, at most `n` objects may be checked out at
    /// once.
    pub fn new<F>(name: &'static str, limit: Option<usize>, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            name,
            idle: Mutex::new(Vec::new()),
            outstanding: AtomicUsize::new(0),
            limit,
            factory: Box::new(factory),
        }
    }

    /// Checks out an object, reusing an idle one when available.
    pub fn try_checkout(&self) -> Result<Pooled<'_, T>, PoolExhausted> {
        let previous = self.outstanding.fetch_add(1, Ordering::AcqRel);
        if let Some(limit) = self.limit {
            if previous >= limit {
                self.outstanding.fetch_sub(1, Ordering::AcqRel);
                return Err(PoolExhausted {
                    pool: self.name,
                    limit,
                });
            }
        }

        let value = self.idle.lock().pop().unwrap_or_else(|| (self.factory)());
        Ok(Pooled {
            pool: self,
            value: Some(value),
        })
    }

    /// Checks out an object.
    ///
    /// # Panics
    /// Panics if the pool's limit is reached, which only happens when guards
    /// are leaked.
    pub fn checkout(&self) -> Pooled<'_, T> {
        match self.try_checkout() {
            Ok(pooled) => pooled,
            Err(err) => panic!("{err}"),
        }
    }

    fn checkin(&self, mut value: T) {
        value.reset();
        self.idle.lock().push(value);
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }

    /// Number of objects currently checked out.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Number of objects waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("outstanding", &self.outstanding.load(Ordering::Relaxed))
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

/// Guard around a checked-out object; returns it to the pool on drop.
pub struct Pooled<'a, T: Reset> {
    pool: &'a Pool<T>,
    value: Option<T>,
}

impl<T: Reset + fmt::Debug> fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("pool", &self.pool.name)
            .field("value", &self.value)
            .finish()
    }
}

impl<T: Reset> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value.as_ref().expect("pooled value is present until drop")
    }
}

impl<T: Reset> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("pooled value is present until drop")
    }
}

impl<T: Reset> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.checkin(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Counter(u32);

    impl Reset for Counter {
        fn reset(&mut self) {
            self.0 = 0;
        }
    }

    #[test]
    fn test_checkin_resets_value() {
        let pool = Pool::new("counter", None, Counter::default);
        {
            let mut c = pool.checkout();
            c.0 = 7;
            assert_eq!(pool.outstanding(), 1);
        }
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.idle(), 1);

        let c = pool.checkout();
        assert_eq!(c.0, 0, "returned value must be reset");
        assert_eq!(pool.idle(), 0, "idle value should be reused");
    }

    #[test]
    fn test_limit() {
        let pool = Pool::new("counter", Some(2), Counter::default);
        let a = pool.try_checkout().unwrap();
        let _b = pool.try_checkout().unwrap();

        let err = pool.try_checkout().unwrap_err();
        assert_eq!(err.limit, 2);
        assert_eq!(err.pool, "counter");

        drop(a);
        assert!(pool.try_checkout().is_ok());
    }

    #[test]
    fn test_pooled_debug() {
        let pool = Pool::new("counter", None, Counter::default);
        let mut c = pool.checkout();
        c.0 = 3;
        assert_eq!(
            format!("{c:?}"),
            "Pooled { pool: \"counter\", value: Some(Counter(3)) }"
        );
    }

    #[test]
    #[should_panic(expected = "counter pool exhausted")]
    fn test_checkout_panics_when_exhausted() {
        let pool = Pool::new("counter", Some(1), Counter::default);
        let _a = pool.checkout();
        let _b = pool.checkout();
    }

    #[test]
    fn test_float_reset() {
        let pool = Pool::new("float", None, || BigFloat::zero(64));
        {
            let mut f = pool.checkout();
            *f += &BigFloat::from_i64(5, 64);
            assert!(!f.is_zero());
        }
        assert!(pool.checkout().is_zero());
    }

    #[test]
    fn test_concurrent_checkouts() {
        let pool = Arc::new(Pool::new("counter", Some(64), Counter::default));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let mut c = pool.checkout();
                        c.0 += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(pool.outstanding(), 0);
        assert!(pool.idle() <= 8);
    }
}

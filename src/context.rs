//! State shared by a simulation and every chromosome it creates.

use crate::config::SimulationParams;
use crate::decode::{DecodeResult, DecodeState};
use crate::float::BigFloat;
use crate::genes::Gene;
use crate::pool::Pool;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Outstanding-object limit for the RNG and float pools.
pub(crate) const POOL_LIMIT: usize = 1024;

pub(crate) struct Context {
    pub(crate) params: SimulationParams,
    pub(crate) decode_states: Pool<DecodeState>,
    pub(crate) floats: Pool<BigFloat>,
    pub(crate) rngs: Pool<StdRng>,
}

impl Context {
    pub(crate) fn new(params: SimulationParams) -> Self {
        let genes = params.chromosome_size;
        let precision = params.float_precision;

        // Each new generator is seeded from the master, so a fixed seed
        // fixes every stream handed out in checkout order.
        let master = Mutex::new(match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        });

        Self {
            decode_states: Pool::new("decode state", None, move || DecodeState::with_capacity(genes)),
            floats: Pool::new("float", Some(POOL_LIMIT), move || BigFloat::zero(precision)),
            rngs: Pool::new("rng", Some(POOL_LIMIT), move || {
                StdRng::seed_from_u64(master.lock().random())
            }),
            params,
        }
    }

    pub(crate) fn decode(&self, genes: &[Gene]) -> DecodeResult {
        let mut state = self.decode_states.checkout();
        state.decode(genes, self.params.term_max_digits, self.params.float_precision)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("params", &self.params)
            .field("rngs", &self.rngs)
            .field("floats", &self.floats)
            .finish_non_exhaustive()
    }
}

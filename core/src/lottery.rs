//! Lottery engine: uniform selection of winners from a waiting list.
//!
//! The engine is pure. It takes a snapshot of the candidate pool and an
//! injected [`RandomSource`], and returns the winners together with the pool
//! that is left. Persisting the result is the caller's job.
//!
//! # Algorithm
//!
//! A partial Fisher–Yates shuffle over the candidate pool: for each of the
//! first `k` positions, swap in an element drawn uniformly from the positions
//! not yet fixed. After `k` steps the prefix is a uniform sample without
//! replacement, in random order, and the work done is `O(n)` to copy the pool
//! plus `O(k)` draws.

use crate::event::EntrantSet;
use crate::types::{Capacity, EntrantId};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Mutex;

/// Source of uniform random indices.
///
/// Injected into the engine so tests can use seeded or scripted sequences.
/// Takes `&self` so one source can be shared by concurrent store operations.
pub trait RandomSource: Send + Sync {
    /// Return an index drawn uniformly from `0..upper`.
    ///
    /// Callers never pass `upper == 0`.
    fn index_below(&self, upper: usize) -> usize;
}

/// Thread-local OS-seeded randomness for production draws.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index_below(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Reproducible randomness from a fixed seed.
///
/// Useful for replaying a draw (configured via `LOTTERY_RNG_SEED`) and for
/// statistical tests.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create a source seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index_below(&self, upper: usize) -> usize {
        // A poisoned lock only means another draw panicked mid-way; the RNG
        // state itself is still valid.
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        rng.gen_range(0..upper)
    }
}

/// Result of one draw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LotteryDraw {
    /// Winners in the order they were drawn.
    pub winners: Vec<EntrantId>,
    /// Waiting list with the winners removed.
    pub remaining: EntrantSet,
}

impl LotteryDraw {
    /// Whether the draw picked nobody.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }
}

/// Number of winners a draw over `pool_size` candidates picks for `capacity`
/// open seats.
#[must_use]
pub fn number_to_select(pool_size: usize, capacity: usize) -> usize {
    pool_size.min(capacity)
}

/// Select up to `capacity` winners uniformly at random from `waiting_list`.
///
/// `capacity` is the number of seats this draw may fill. Entrants in
/// `already_selected` are removed from the pool before drawing, so cumulative
/// draws never pick the same entrant twice.
///
/// Unlimited events have no lottery; callers must not invoke the engine
/// without a capacity.
///
/// # Examples
///
/// ```
/// use event_lottery_core::event::EntrantSet;
/// use event_lottery_core::lottery::{select_winners, SeededRandom};
/// use event_lottery_core::types::{Capacity, EntrantId};
///
/// let pool: EntrantSet = ["a", "b", "c", "d"].into_iter().map(EntrantId::new).collect();
/// let draw = select_winners(&pool, Capacity::new(2), &EntrantSet::new(), &SeededRandom::new(7));
///
/// assert_eq!(draw.winners.len(), 2);
/// assert_eq!(draw.remaining.len(), 2);
/// assert!(draw.winners.iter().all(|w| pool.contains(w) && !draw.remaining.contains(w)));
/// ```
#[must_use]
pub fn select_winners(
    waiting_list: &EntrantSet,
    capacity: Capacity,
    already_selected: &EntrantSet,
    rng: &dyn RandomSource,
) -> LotteryDraw {
    let mut pool: Vec<EntrantId> = waiting_list
        .difference(already_selected)
        .cloned()
        .collect();
    let k = number_to_select(pool.len(), capacity.value() as usize);

    if k == 0 {
        return LotteryDraw {
            winners: Vec::new(),
            remaining: waiting_list.clone(),
        };
    }

    let n = pool.len();
    for i in 0..k {
        let j = i + rng.index_below(n - i);
        pool.swap(i, j);
    }
    pool.truncate(k);

    let drawn: EntrantSet = pool.iter().cloned().collect();
    let remaining = waiting_list.difference(&drawn).cloned().collect();

    LotteryDraw {
        winners: pool,
        remaining,
    }
}

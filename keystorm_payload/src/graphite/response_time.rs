//! Response-time sampling.
//!
//! Every key carries an average, minimum and maximum response time. The
//! triple is sampled so that `min <= avg <= max` holds by construction: the
//! minimum is drawn below the average and the maximum above it.

use rand::Rng;

/// Base latency for the first API of every application.
pub const FIRST_API_BASE: u32 = 50;
/// Base latency for every other API.
pub const DEFAULT_BASE: u32 = 1;

const AVG_SPREAD: u32 = 100;
const MIN_CEILING: u32 = 50;
const MAX_SPREAD: u32 = 200;

/// Base latency for the 0-based `api` index.
#[must_use]
pub fn base(api: u32) -> u32 {
    if api == 0 {
        FIRST_API_BASE
    } else {
        DEFAULT_BASE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A sampled response-time triple.
pub struct ResponseTime {
    /// Average response time, `base + [0, 100]`
    pub avg: u32,
    /// Minimum response time, `[0, min(avg, 50)]`
    pub min: u32,
    /// Maximum response time, `[avg, base + 200]`
    pub max: u32,
}

impl ResponseTime {
    /// Sample a triple for the 0-based `api` index.
    pub fn sample<R>(api: u32, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let base = base(api);
        let avg = base + rng.random_range(0..=AVG_SPREAD);
        let min = rng.random_range(0..=avg.min(MIN_CEILING));
        // avg never exceeds base + AVG_SPREAD so this range is never empty
        let max = rng.random_range(avg..=base + MAX_SPREAD);
        Self { avg, min, max }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{DEFAULT_BASE, FIRST_API_BASE, ResponseTime, base};

    proptest! {
        #[test]
        fn min_avg_max_ordered(seed: u64, api in 0..16u32) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let rt = ResponseTime::sample(api, &mut rng);
            prop_assert!(rt.min <= rt.avg);
            prop_assert!(rt.avg <= rt.max);
            prop_assert!(rt.min <= 50);
            prop_assert!(rt.max <= base(api) + 200);
        }
    }

    proptest! {
        #[test]
        fn first_api_runs_slower(seed: u64) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let first = ResponseTime::sample(0, &mut rng);
            prop_assert!((50..=150).contains(&first.avg));

            let other = ResponseTime::sample(1, &mut rng);
            prop_assert!((1..=101).contains(&other.avg));
        }
    }

    #[test]
    fn base_by_api() {
        assert_eq!(base(0), FIRST_API_BASE);
        for api in 1..10 {
            assert_eq!(base(api), DEFAULT_BASE);
        }
    }
}

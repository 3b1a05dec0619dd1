//! Deterministic generation of the benchmarked lists.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const LCG_SEED: u32 = 961_799_479;
const LCG_MULTIPLIER: u32 = 101_513;
const LCG_INCREMENT: u32 = 198_491_317;

/// Generates `count` values with a linear congruential recurrence, sorts them
/// and right shifts them by `shift` bits.
///
/// The same `count` and `shift` always produce the same list.
/// Without shift the values are distinct, as the recurrence has a full period.
/// Shifting preserves the order but may introduce duplicates, which are kept.
pub fn generate_sorted(count: usize, shift: u32) -> Vec<u32> {
    let mut state = LCG_SEED;
    let mut vals: Vec<u32> = (0..count)
        .map(|_| {
            state = state
                .wrapping_mul(LCG_MULTIPLIER)
                .wrapping_add(LCG_INCREMENT);
            state
        })
        .collect();
    vals.sort_unstable();
    shift_right(&mut vals, shift);
    vals
}

/// Right shifts every value by `shift` bits. Shifts of 32 bits or more zero the values.
pub fn shift_right(vals: &mut [u32], shift: u32) {
    if shift == 0 {
        return;
    }
    for val in vals.iter_mut() {
        *val = val.checked_shr(shift).unwrap_or(0u32);
    }
}

/// Returns the lookup targets for `vals`: the same values, shuffled.
///
/// Every target is therefore present in `vals`.
pub fn generate_targets(vals: &[u32], seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut targets = vals.to_vec();
    targets.shuffle(&mut rng);
    targets
}

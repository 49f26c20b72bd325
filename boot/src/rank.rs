//! rank.rs — order candidates oldest → newest by `boot-requested-at`
//!
//! Exchange sort over adjacent pairs, repeated until a pass swaps nothing.
//! Only a strictly greater key moves a candidate, so candidates with equal
//! keys keep their discovery (firmware volume) order. Quadratic, but the
//! list never exceeds `MAX_CANDIDATES`.

use crate::candidate::BootCandidate;
use crate::firmware::Firmware;

/// Sort `items` ascending by `key`; returns the number of swaps made.
pub fn exchange_sort_by_key<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) -> usize {
    let mut swaps = 0;
    loop {
        let mut swapped = false;
        for i in 1..items.len() {
            if key(&items[i - 1]) > key(&items[i]) {
                items.swap(i - 1, i);
                swapped = true;
                swaps += 1;
            }
        }
        if !swapped {
            return swaps;
        }
    }
}

pub fn rank_candidates<F: Firmware>(candidates: &mut [BootCandidate<F>]) -> usize {
    exchange_sort_by_key(candidates, |c| c.requested_at)
}

use rand::Rng;
use rand::seq::SliceRandom;

use super::dataset::{InvestorRecord, fallback_investors};

pub const DEFAULT_RECOMMENDATION_COUNT: usize = 6;

/// Picks `count` investors to recommend from `pool`.
pub fn select(pool: &[InvestorRecord], count: usize) -> Vec<InvestorRecord> {
    select_with_rng(pool, count, &mut rand::thread_rng())
}

/// Same as [`select`] with a caller supplied random number generator.
///
/// Always returns exactly `count` records. An empty pool is replaced
/// by the built-in investors. A pool that is not larger than `count`
/// is returned in order and padded by repeating it from the start,
/// otherwise `count` records are sampled uniformly. Duplicates in the
/// output are expected when padding.
pub fn select_with_rng<R: Rng + ?Sized>(
    pool: &[InvestorRecord],
    count: usize,
    rng: &mut R,
) -> Vec<InvestorRecord> {
    if pool.is_empty() {
        let fallback = fallback_investors();
        return pad(&fallback, count);
    }

    if pool.len() <= count {
        return pad(pool, count);
    }

    let mut shuffled = pool.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(count);
    shuffled
}

fn pad(pool: &[InvestorRecord], count: usize) -> Vec<InvestorRecord> {
    pool.iter().cycle().take(count).cloned().collect()
}

use rand::Rng;
use std::collections::HashSet;

/// Picks `count` unique random words from `pool`, skipping `excluded` ones.
///
/// When `count` covers the whole pool, the pool is returned unchanged
/// (duplicates and excluded words included). Otherwise words are drawn
/// uniformly at random and kept in acceptance order. If fewer than `count`
/// distinct eligible words exist, every eligible word is returned in pool
/// order rather than sampling forever.
pub fn select_words<R>(
    pool: &[String],
    count: usize,
    excluded: &HashSet<String>,
    rng: &mut R,
) -> Vec<String>
where
    R: Rng + ?Sized,
{
    if count >= pool.len() {
        return pool.to_vec();
    }

    let mut eligible: Vec<&String> = Vec::new();
    let mut seen = HashSet::new();
    for word in pool {
        if !excluded.contains(word) && seen.insert(word.as_str()) {
            eligible.push(word);
        }
    }
    if eligible.len() <= count {
        return eligible.into_iter().cloned().collect();
    }

    let mut picked = Vec::with_capacity(count);
    let mut accepted = HashSet::with_capacity(count);
    while picked.len() < count {
        let word = &pool[rng.gen_range(0..pool.len())];
        if excluded.contains(word) || !accepted.insert(word.as_str()) {
            continue;
        }
        picked.push(word.clone());
    }
    picked
}

/// [`select_words`] driven by the thread-local RNG.
pub fn select_words_random(
    pool: &[String],
    count: usize,
    excluded: &HashSet<String>,
) -> Vec<String> {
    select_words(pool, count, excluded, &mut rand::thread_rng())
}

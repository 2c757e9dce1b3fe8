//! Lexicographic enumeration of index subsets by size.

/// Yields every subset of `0..n` with size in `min_size..=max_size`.
///
/// Sizes are produced in ascending order; within a size, subsets come out in
/// lexicographic order of their sorted indices. The enumeration order is
/// deterministic, which is what makes ranking ties reproducible.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    max_size: usize,
    current: Option<Vec<usize>>,
}

impl Combinations {
    pub fn new(n: usize, min_size: usize, max_size: usize) -> Self {
        let current = if min_size == 0 || min_size > max_size || max_size > n {
            None
        } else {
            Some((0..min_size).collect())
        };
        Self {
            n,
            max_size,
            current,
        }
    }

    fn advance(&mut self) {
        let Some(c) = self.current.as_mut() else {
            return;
        };
        let k = c.len();
        // Rightmost index that can still move up.
        if let Some(i) = (0..k).rev().find(|&i| c[i] < self.n - k + i) {
            c[i] += 1;
            for j in i + 1..k {
                c[j] = c[j - 1] + 1;
            }
        } else if k < self.max_size {
            *c = (0..k + 1).collect();
        } else {
            self.current = None;
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let out = self.current.clone()?;
        self.advance();
        Some(out)
    }
}

/// `n choose k`, or `None` on overflow.
pub fn binomial(n: usize, k: usize) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // Exact at every step: acc * (n - i) is divisible by (i + 1).
        acc = acc.checked_mul((n - i) as u128)? / (i as u128 + 1);
    }
    u64::try_from(acc).ok()
}

/// Number of subsets with size in `min_size..=max_size`, saturating at `u64::MAX`.
pub fn combination_count(n: usize, min_size: usize, max_size: usize) -> u64 {
    if min_size > max_size {
        return 0;
    }
    (min_size..=max_size.min(n))
        .map(|k| binomial(n, k).unwrap_or(u64::MAX))
        .fold(0u64, |acc, c| acc.saturating_add(c))
}

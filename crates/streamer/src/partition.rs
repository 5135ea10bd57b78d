//! Splitting the active population into shards.

/// Split `items` into at most `shards` contiguous, non-empty groups whose
/// sizes differ by at most one.
///
/// With `n` items, `min(shards, n)` groups are produced; the first `n % k`
/// groups hold one extra item. Order is preserved.
pub fn partition<T>(items: Vec<T>, shards: usize) -> Vec<Vec<T>> {
    let n = items.len();
    let k = shards.min(n);
    if k == 0 {
        return Vec::new();
    }

    let base = n / k;
    let extra = n % k;
    let mut groups = Vec::with_capacity(k);
    let mut iter = items.into_iter();
    for i in 0..k {
        let size = base + usize::from(i < extra);
        groups.push(iter.by_ref().take(size).collect());
    }
    groups
}

//! Bounded top-k selection with a deterministic tie-break.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A scored corpus position. Greater means better: higher score first, then
/// lower position.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    position: usize,
    score: f64,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.position.cmp(&self.position))
    }
}

/// Select the `k` best `(position, score)` pairs.
///
/// Keeps a min-heap of at most `k` entries, so memory is `O(k)` and time is
/// `O(n log k)`. The result is ordered by descending score; equal scores keep
/// ascending position order.
pub fn select_top_k<I>(scored: I, k: usize) -> Vec<(usize, f64)>
where
    I: IntoIterator<Item = (usize, f64)>,
{
    if k == 0 {
        return Vec::new();
    }

    // `k` may be far larger than the input; size the heap from what is known.
    let scored = scored.into_iter();
    let mut heap: BinaryHeap<Reverse<Ranked>> =
        BinaryHeap::with_capacity(k.min(scored.size_hint().0));
    for (position, score) in scored {
        let entry = Ranked { position, score };
        if heap.len() < k {
            heap.push(Reverse(entry));
        } else if let Some(Reverse(worst)) = heap.peek() {
            if entry > *worst {
                heap.pop();
                heap.push(Reverse(entry));
            }
        }
    }

    // Ascending order of Reverse<Ranked> is descending order of Ranked.
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(r)| (r.position, r.score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_highest_scores_in_order() {
        let scores = vec![(0, 1.0), (1, 5.0), (2, 3.0), (3, 4.0)];
        assert_eq!(select_top_k(scores, 2), vec![(1, 5.0), (3, 4.0)]);
    }

    #[test]
    fn test_ties_prefer_earlier_positions() {
        let scores = vec![(0, 2.0), (1, 2.0), (2, 2.0), (3, 2.0)];
        assert_eq!(select_top_k(scores, 3), vec![(0, 2.0), (1, 2.0), (2, 2.0)]);
    }

    #[test]
    fn test_ties_resolved_when_better_arrives_late() {
        let scores = vec![(0, 1.0), (1, 1.0), (2, 9.0)];
        assert_eq!(select_top_k(scores, 2), vec![(2, 9.0), (0, 1.0)]);
    }

    #[test]
    fn test_k_larger_than_input() {
        let scores = vec![(0, -1.0), (1, 0.0)];
        assert_eq!(select_top_k(scores, 10), vec![(1, 0.0), (0, -1.0)]);
    }

    #[test]
    fn test_unbounded_k_does_not_preallocate() {
        let scores = vec![(0, 1.0), (1, 2.0)];
        assert_eq!(select_top_k(scores.clone(), usize::MAX), vec![(1, 2.0), (0, 1.0)]);
        assert_eq!(select_top_k(scores, 1 << 40), vec![(1, 2.0), (0, 1.0)]);
    }

    #[test]
    fn test_k_zero_and_empty_input() {
        assert!(select_top_k(vec![(0, 1.0)], 0).is_empty());
        assert!(select_top_k(Vec::<(usize, f64)>::new(), 5).is_empty());
    }
}

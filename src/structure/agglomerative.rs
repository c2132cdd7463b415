//! Temporally constrained agglomerative segmentation
//!
//! Bottom-up Ward clustering where only time-adjacent segments may merge.
//! Starting from one segment per frame, the adjacent pair with the smallest
//! Ward cost `(n_a * n_b / (n_a + n_b)) * |mean_a - mean_b|²` is merged until
//! `k` segments remain.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone)]
struct Segment {
    start: usize,
    count: usize,
    sum: Vec<f64>,
    prev: Option<usize>,
    next: Option<usize>,
    version: u32,
    alive: bool,
}

impl Segment {
    fn mean(&self) -> impl Iterator<Item = f64> + '_ {
        let n = self.count as f64;
        self.sum.iter().map(move |s| s / n)
    }
}

fn ward_cost(a: &Segment, b: &Segment) -> f64 {
    let (na, nb) = (a.count as f64, b.count as f64);
    let dist2: f64 = a.mean().zip(b.mean()).map(|(x, y)| (x - y).powi(2)).sum();
    na * nb / (na + nb) * dist2
}

/// Candidate merge of segment `left` with its successor
#[derive(Debug, Clone, Copy, PartialEq)]
struct Merge {
    cost: f64,
    left: usize,
    right: usize,
    left_version: u32,
    right_version: u32,
}

impl Eq for Merge {}

impl Ord for Merge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then(self.left.cmp(&other.left))
    }
}

impl PartialOrd for Merge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn candidate(segments: &[Segment], left: usize, right: usize) -> Merge {
    Merge {
        cost: ward_cost(&segments[left], &segments[right]),
        left,
        right,
        left_version: segments[left].version,
        right_version: segments[right].version,
    }
}

/// Segment `frames` into at most `k` contiguous segments
///
/// # Returns
///
/// Segment start frames in increasing order, always starting with 0 (empty
/// when there are no frames)
pub fn agglomerative_boundaries(frames: &[Vec<f32>], k: usize) -> Vec<usize> {
    let n = frames.len();
    if n == 0 {
        return Vec::new();
    }
    let k = k.max(1);
    if n <= k {
        return (0..n).collect();
    }

    let mut segments: Vec<Segment> = frames
        .iter()
        .enumerate()
        .map(|(i, f)| Segment {
            start: i,
            count: 1,
            sum: f.iter().map(|&x| x as f64).collect(),
            prev: i.checked_sub(1),
            next: (i + 1 < n).then_some(i + 1),
            version: 0,
            alive: true,
        })
        .collect();

    let mut heap: BinaryHeap<Reverse<Merge>> = (0..n - 1)
        .map(|i| Reverse(candidate(&segments, i, i + 1)))
        .collect();

    let mut remaining = n;
    while remaining > k {
        let Some(Reverse(merge)) = heap.pop() else {
            break;
        };
        let (l, r) = (merge.left, merge.right);
        let stale = !segments[l].alive
            || !segments[r].alive
            || segments[l].version != merge.left_version
            || segments[r].version != merge.right_version;
        if stale {
            continue;
        }

        // absorb r into l
        let right = std::mem::replace(&mut segments[r].sum, Vec::new());
        for (s, x) in segments[l].sum.iter_mut().zip(&right) {
            *s += x;
        }
        segments[l].count += segments[r].count;
        segments[l].version += 1;
        segments[l].next = segments[r].next;
        segments[r].alive = false;
        if let Some(next) = segments[l].next {
            segments[next].prev = Some(l);
            heap.push(Reverse(candidate(&segments, l, next)));
        }
        if let Some(prev) = segments[l].prev {
            heap.push(Reverse(candidate(&segments, prev, l)));
        }
        remaining -= 1;
    }

    let mut starts: Vec<usize> = segments
        .iter()
        .filter(|s| s.alive)
        .map(|s| s.start)
        .collect();
    starts.sort_unstable();
    log::debug!(
        "Agglomerative segmentation: {} frames -> {} segments",
        n,
        starts.len()
    );
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_blocks() {
        let mut frames = vec![vec![0.0f32, 0.0]; 30];
        frames.extend(vec![vec![5.0f32, 5.0]; 20]);
        frames.extend(vec![vec![-5.0f32, 2.0]; 25]);
        assert_eq!(agglomerative_boundaries(&frames, 3), vec![0, 30, 50]);
    }

    #[test]
    fn test_segment_count() {
        let frames: Vec<Vec<f32>> = (0..100).map(|i| vec![(i as f32 * 0.37).sin()]).collect();
        let bounds = agglomerative_boundaries(&frames, 8);
        assert_eq!(bounds.len(), 8);
        assert_eq!(bounds[0], 0);
        assert!(bounds.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_fewer_frames_than_segments() {
        let frames = vec![vec![1.0f32]; 3];
        assert_eq!(agglomerative_boundaries(&frames, 8), vec![0, 1, 2]);
        assert!(agglomerative_boundaries(&[], 8).is_empty());
    }
}

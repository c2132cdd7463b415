//! k-nearest-neighbour recurrence (self-similarity) matrix
//!
//! `rec[i][j]` is non-zero when frame `i` is one of the `k` nearest
//! neighbours of frame `j` (euclidean distance over the stacked features),
//! excluding frames closer than `width` on the time axis. Non-zero entries
//! hold the affinity `exp(-distance / bandwidth)`, where the bandwidth is the
//! median distance to the k-th neighbour.
//!
//! Only the k neighbours of each column are stored, so memory grows with
//! `n_frames * k` instead of `n_frames²`.

use crate::error::AnalysisError;
use rayon::prelude::*;

/// Concatenate chroma and MFCC vectors frame by frame
///
/// Frame counts may differ by rounding in other pipelines; the shorter length
/// wins.
pub fn stack_features(chroma: &[Vec<f32>], mfcc: &[Vec<f32>]) -> Vec<Vec<f32>> {
    chroma
        .iter()
        .zip(mfcc)
        .map(|(c, m)| c.iter().chain(m).copied().collect())
        .collect()
}

/// Number of neighbours per column: `2 * ceil(sqrt(n - 2 * width + 1))`
pub fn neighbour_count(n_frames: usize, width: usize) -> usize {
    let span = (n_frames + 1).saturating_sub(2 * width).max(1);
    2 * (span as f64).sqrt().ceil() as usize
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Sparse affinity recurrence matrix stored by column
#[derive(Debug, Clone)]
pub struct RecurrenceMatrix {
    n_frames: usize,
    k: usize,
    /// Per column `j`: `(i, affinity)` for each neighbour `i`, nearest first
    columns: Vec<Vec<(usize, f32)>>,
    bandwidth: f32,
}

impl RecurrenceMatrix {
    /// Build the affinity recurrence matrix
    ///
    /// # Arguments
    ///
    /// * `features` - Stacked feature vectors, one per frame
    /// * `width` - Frames with `|i - j| < width` are never neighbours (>= 1)
    /// * `min_bandwidth` - Lower bound for the affinity bandwidth
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if frames differ in dimension
    pub fn affinity(
        features: &[Vec<f32>],
        width: usize,
        min_bandwidth: f32,
    ) -> Result<Self, AnalysisError> {
        let n_frames = features.len();
        let width = width.max(1);
        if let Some(first) = features.first() {
            if features.iter().any(|f| f.len() != first.len()) {
                return Err(AnalysisError::InvalidInput(
                    "Feature frames have inconsistent dimensions".to_string(),
                ));
            }
        }

        let k = neighbour_count(n_frames, width);
        log::debug!(
            "Recurrence matrix: {} frames, k={}, width={}",
            n_frames,
            k,
            width
        );

        // nearest neighbours by distance, per column
        let neighbours: Vec<Vec<(usize, f32)>> = (0..n_frames)
            .into_par_iter()
            .map(|j| {
                let mut candidates: Vec<(usize, f32)> = (0..n_frames)
                    .filter(|&i| i.abs_diff(j) >= width)
                    .map(|i| (i, euclidean(&features[i], &features[j])))
                    .collect();
                let cmp = |a: &(usize, f32), b: &(usize, f32)| {
                    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
                };
                if candidates.len() > k {
                    candidates.select_nth_unstable_by(k - 1, cmp);
                    candidates.truncate(k);
                }
                candidates.sort_by(cmp);
                candidates
            })
            .collect();

        let mut kth: Vec<f32> = neighbours
            .iter()
            .filter_map(|col| col.last().map(|&(_, d)| d))
            .collect();
        let bandwidth = median(&mut kth).max(min_bandwidth).max(f32::EPSILON);

        let columns = neighbours
            .into_iter()
            .map(|col| {
                col.into_iter()
                    .map(|(i, d)| (i, (-d / bandwidth).exp()))
                    .collect()
            })
            .collect();

        Ok(Self {
            n_frames,
            k,
            columns,
            bandwidth,
        })
    }

    /// Number of frames (the matrix is `n_frames × n_frames`)
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// Neighbours kept per column
    pub fn neighbours_per_column(&self) -> usize {
        self.k
    }

    /// Affinity bandwidth used
    pub fn bandwidth(&self) -> f32 {
        self.bandwidth
    }

    /// Entry `rec[i][j]`
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.columns
            .get(j)
            .and_then(|col| col.iter().find(|&&(row, _)| row == i))
            .map_or(0.0, |&(_, a)| a)
    }

    /// Sum of each column
    pub fn column_sums(&self) -> Vec<f32> {
        self.columns
            .iter()
            .map(|col| col.iter().map(|&(_, a)| a).sum())
            .collect()
    }
}

fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbour_count() {
        assert_eq!(neighbour_count(100, 1), 20);
        assert_eq!(neighbour_count(10, 1), 6);
        assert_eq!(neighbour_count(0, 1), 2);
    }

    #[test]
    fn test_stack_features() {
        let stacked = stack_features(&[vec![1.0, 2.0]], &[vec![3.0]]);
        assert_eq!(stacked, vec![vec![1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_two_state_recurrence() {
        // frames alternate between two well separated points in blocks
        let mut features = vec![vec![0.0f32, 0.0]; 20];
        features.extend(vec![vec![10.0f32, 10.0]; 20]);
        let rec = RecurrenceMatrix::affinity(&features, 1, 1.0).unwrap();
        assert_eq!(rec.n_frames(), 40);

        // neighbours of a frame in the first block come from the first block
        assert!(rec.get(3, 0) > 0.9);
        assert_eq!(rec.get(30, 0), 0.0);
        // diagonal excluded
        assert_eq!(rec.get(5, 5), 0.0);

        let sums = rec.column_sums();
        let k = neighbour_count(40, 1) as f32;
        assert!(sums.iter().all(|&s| (s - k).abs() < 1e-3));
    }

    #[test]
    fn test_bandwidth_floor() {
        let features = vec![vec![0.0f32; 3]; 10];
        let rec = RecurrenceMatrix::affinity(&features, 1, 1.0).unwrap();
        assert_eq!(rec.bandwidth(), 1.0);
        assert!((rec.get(1, 0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_inconsistent_dimensions() {
        let features = vec![vec![0.0f32; 3], vec![0.0f32; 2]];
        assert!(RecurrenceMatrix::affinity(&features, 1, 1.0).is_err());
    }
}

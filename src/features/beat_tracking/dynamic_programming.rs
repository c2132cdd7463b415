//! Dynamic-programming beat tracker
//!
//! Ellis (2007): each frame's cumulative score is its local onset score plus
//! the best predecessor score penalized by how far the inter-beat interval
//! strays from the tempo period.
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

const EPSILON: f32 = 1e-10;

/// Onset envelope scaled by its standard deviation and smoothed with a
/// Gaussian whose width follows the beat period
fn local_score(envelope: &[f32], period: f32) -> Vec<f32> {
    let n = envelope.len() as f32;
    let mean = envelope.iter().sum::<f32>() / n;
    let std = (envelope.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n).sqrt();
    let scale = if std > EPSILON { 1.0 / std } else { 1.0 };

    let half = period.round().max(1.0) as i64;
    let kernel: Vec<f32> = (-half..=half)
        .map(|t| (-0.5 * (t as f32 * 32.0 / period).powi(2)).exp())
        .collect();

    (0..envelope.len() as i64)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, w)| {
                    let j = i + k as i64 - half;
                    (j >= 0 && (j as usize) < envelope.len())
                        .then(|| w * envelope[j as usize] * scale)
                })
                .sum()
        })
        .collect()
}

/// Index of the last beat: the latest local maximum of the cumulative score
/// exceeding half the median local-maximum score
fn last_beat(cumscore: &[f32]) -> Option<usize> {
    let n = cumscore.len();
    let is_max = |i: usize| {
        let left = i == 0 || cumscore[i] > cumscore[i - 1];
        let right = i + 1 == n || cumscore[i] >= cumscore[i + 1];
        left && right
    };
    let mut maxima: Vec<f32> = (0..n).filter(|&i| is_max(i)).map(|i| cumscore[i]).collect();
    if maxima.is_empty() {
        return None;
    }
    maxima.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = maxima[maxima.len() / 2];
    (0..n).rev().find(|&i| is_max(i) && cumscore[i] * 2.0 > median)
}

/// Track beats through an onset strength envelope
///
/// # Arguments
///
/// * `envelope` - Onset strength envelope
/// * `tempo` - Global tempo in BPM
/// * `frame_rate` - Envelope frames per second
/// * `tightness` - Penalty weight for tempo deviation (default: 100)
///
/// # Returns
///
/// Beat frame indices in increasing order (empty for tempo 0 or a silent envelope)
pub fn track_beats(envelope: &[f32], tempo: f32, frame_rate: f32, tightness: f32) -> Vec<usize> {
    if envelope.is_empty() || tempo <= 0.0 {
        return Vec::new();
    }
    if envelope.iter().all(|&x| x.abs() <= EPSILON) {
        return Vec::new();
    }

    let period = 60.0 * frame_rate / tempo;
    let score = local_score(envelope, period);
    let n = score.len();

    let lag_near = (period / 2.0).round().max(1.0) as usize;
    let lag_far = (2.0 * period).round().max(lag_near as f32) as usize;

    let mut cumscore = vec![0.0f32; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];
    let onset_floor = 0.01 * score.iter().copied().fold(0.0f32, f32::max);
    let mut first_beat = true;

    for i in 0..n {
        let mut best: Option<(usize, f32)> = None;
        for lag in lag_near..=lag_far {
            if lag > i {
                break;
            }
            let j = i - lag;
            let penalty = tightness * ((lag as f32) / period).ln().powi(2);
            let candidate = cumscore[j] - penalty;
            if best.map_or(true, |(_, s)| candidate > s) {
                best = Some((j, candidate));
            }
        }

        cumscore[i] = score[i] + best.map_or(0.0, |(_, s)| s.max(0.0));
        // no backlink until the first meaningful onset, so the path cannot
        // reach back into leading silence
        if first_beat && score[i] < onset_floor {
            backlink[i] = None;
        } else {
            backlink[i] = best.map(|(j, _)| j);
            first_beat = false;
        }
    }

    let mut beats = Vec::new();
    let mut cursor = last_beat(&cumscore);
    while let Some(i) = cursor {
        beats.push(i);
        cursor = backlink[i];
    }
    beats.reverse();

    trim_weak_ends(&mut beats, &score);
    beats
}

/// Drop leading and trailing beats whose local score is below half the RMS
/// of the beat scores
fn trim_weak_ends(beats: &mut Vec<usize>, score: &[f32]) {
    if beats.is_empty() {
        return;
    }
    let rms = (beats.iter().map(|&b| score[b].powi(2)).sum::<f32>() / beats.len() as f32).sqrt();
    let threshold = 0.5 * rms;

    let start = beats.iter().position(|&b| score[b] > threshold).unwrap_or(beats.len());
    let end = beats
        .iter()
        .rposition(|&b| score[b] > threshold)
        .map_or(start, |p| p + 1);
    *beats = beats[start..end.max(start)].to_vec();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_envelope(period: usize, offset: usize, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| if i >= offset && (i - offset) % period == 0 { 10.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_beats_follow_clicks() {
        let frame_rate = 44100.0 / 512.0;
        let envelope = click_envelope(43, 21, 860);
        let beats = track_beats(&envelope, 120.0, frame_rate, 100.0);
        assert!(beats.len() >= 15, "only {} beats", beats.len());
        for pair in beats.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((40..=46).contains(&gap), "gap {}", gap);
        }
        assert!(beats.iter().all(|&b| (b + 43 - 21) % 43 <= 1 || (b + 43 - 21) % 43 >= 42));
    }

    #[test]
    fn test_no_tempo_no_beats() {
        let envelope = click_envelope(43, 0, 400);
        assert!(track_beats(&envelope, 0.0, 86.13, 100.0).is_empty());
        assert!(track_beats(&vec![0.0; 400], 120.0, 86.13, 100.0).is_empty());
        assert!(track_beats(&[], 120.0, 86.13, 100.0).is_empty());
    }

    #[test]
    fn test_last_beat_picks_latest_strong_max() {
        let cumscore = vec![0.0, 1.0, 0.5, 2.0, 1.0, 3.0, 0.2];
        assert_eq!(last_beat(&cumscore), Some(5));
    }
}

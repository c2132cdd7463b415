//! Windowed peak picking
//!
//! A sample `x[n]` is a peak when all three hold:
//!
//! 1. `x[n] == max(x[n - pre_max .. n + post_max])`
//! 2. `x[n] >= mean(x[n - pre_avg .. n + post_avg]) + delta`
//! 3. `n > last_peak + wait`
//!
//! Windows are clipped at the signal edges and always contain `n`. Used for
//! both onset picking and structure boundary detection.

/// Peak picking windows (in samples of the picked signal) and thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPickParams {
    /// Samples before `n` in the local-max window
    pub pre_max: usize,
    /// Samples after `n` in the local-max window (exclusive end)
    pub post_max: usize,
    /// Samples before `n` in the local-mean window
    pub pre_avg: usize,
    /// Samples after `n` in the local-mean window (exclusive end)
    pub post_avg: usize,
    /// Minimum height above the local mean
    pub delta: f32,
    /// Minimum distance between accepted peaks
    pub wait: usize,
}

impl PeakPickParams {
    /// Structure boundary windows from the structure config
    pub fn from_structure(config: &crate::config::StructureConfig) -> Self {
        Self {
            pre_max: config.pre_max,
            post_max: config.post_max,
            pre_avg: config.pre_avg,
            post_avg: config.post_avg,
            delta: config.delta,
            wait: config.wait,
        }
    }

    /// Onset windows converted from seconds to frames
    ///
    /// Lookbehinds round down; lookaheads round down plus one frame so the
    /// window end stays exclusive of `n + 1`.
    pub fn from_onset(config: &crate::config::OnsetConfig, sample_rate: u32, hop_size: usize) -> Self {
        let fps = sample_rate as f32 / hop_size as f32;
        let frames = |seconds: f32| (seconds * fps).floor().max(0.0) as usize;
        Self {
            pre_max: frames(config.pre_max),
            post_max: frames(config.post_max) + 1,
            pre_avg: frames(config.pre_avg),
            post_avg: frames(config.post_avg) + 1,
            delta: config.delta,
            wait: frames(config.wait),
        }
    }
}

fn window(n: usize, pre: usize, post: usize, len: usize) -> std::ops::Range<usize> {
    let start = n.saturating_sub(pre);
    let end = (n + post.max(1)).min(len);
    start..end
}

/// Find peaks in `signal`
///
/// # Returns
///
/// Peak indices in increasing order
pub fn peak_pick(signal: &[f32], params: &PeakPickParams) -> Vec<usize> {
    let len = signal.len();
    let mut peaks = Vec::new();
    let mut last: Option<usize> = None;

    for (n, &value) in signal.iter().enumerate() {
        let max_range = window(n, params.pre_max, params.post_max, len);
        let local_max = signal[max_range].iter().copied().fold(f32::MIN, f32::max);
        if value < local_max {
            continue;
        }

        let avg_range = window(n, params.pre_avg, params.post_avg, len);
        let count = avg_range.len() as f32;
        let local_mean = signal[avg_range].iter().sum::<f32>() / count;
        if value < local_mean + params.delta {
            continue;
        }

        if let Some(prev) = last {
            if n <= prev + params.wait {
                continue;
            }
        }

        peaks.push(n);
        last = Some(n);
    }

    log::debug!(
        "Peak picking: {} peaks in {} samples (delta={:.3}, wait={})",
        peaks.len(),
        len,
        params.delta,
        params.wait
    );
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(delta: f32, wait: usize) -> PeakPickParams {
        PeakPickParams {
            pre_max: 2,
            post_max: 3,
            pre_avg: 2,
            post_avg: 3,
            delta,
            wait,
        }
    }

    #[test]
    fn test_isolated_spikes() {
        let mut signal = vec![0.0f32; 40];
        signal[5] = 1.0;
        signal[20] = 0.8;
        signal[30] = 0.9;
        assert_eq!(peak_pick(&signal, &params(0.1, 0)), vec![5, 20, 30]);
    }

    #[test]
    fn test_flat_signal_has_no_peaks() {
        let signal = vec![0.3f32; 50];
        assert!(peak_pick(&signal, &params(0.1, 0)).is_empty());
    }

    #[test]
    fn test_wait_suppresses_close_peaks() {
        let mut signal = vec![0.0f32; 30];
        signal[5] = 1.0;
        signal[11] = 1.0;
        signal[20] = 1.0;
        assert_eq!(peak_pick(&signal, &params(0.1, 0)), vec![5, 11, 20]);
        assert_eq!(peak_pick(&signal, &params(0.1, 8)), vec![5, 20]);
    }

    #[test]
    fn test_delta_threshold() {
        let mut signal = vec![0.0f32; 20];
        signal[10] = 0.05;
        assert!(peak_pick(&signal, &params(0.1, 0)).is_empty());
        assert_eq!(peak_pick(&signal, &params(0.01, 0)), vec![10]);
    }

    #[test]
    fn test_onset_windows_from_seconds() {
        let config = crate::config::OnsetConfig::default();
        let p = PeakPickParams::from_onset(&config, 44100, 512);
        assert_eq!(p.pre_max, 2);
        assert_eq!(p.post_max, 1);
        assert_eq!(p.pre_avg, 8);
        assert_eq!(p.post_avg, 9);
        assert_eq!(p.wait, 2);
    }

    #[test]
    fn test_empty_signal() {
        assert!(peak_pick(&[], &params(0.1, 0)).is_empty());
    }
}

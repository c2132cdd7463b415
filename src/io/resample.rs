//! Sample rate conversion with rubato

use super::signal::AudioSignal;
use crate::error::{AnalysisError, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Input frames per resampler call
const CHUNK_FRAMES: usize = 1024;

fn processing_error(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::ProcessingError(format!("Resampling failed: {}", e))
}

/// Resample planar channels from `from_rate` to `to_rate`
///
/// The input is fed in fixed chunks, the tail is flushed through the filter,
/// and the resampler's output delay is trimmed so the result is aligned with
/// the input and holds `round(frames * to_rate / from_rate)` frames.
fn resample_planar(channels: &[Vec<f32>], from_rate: u32, to_rate: u32) -> Result<Vec<Vec<f32>>> {
    let frames = channels.first().map(Vec::len).unwrap_or(0);
    if from_rate == to_rate || frames == 0 {
        return Ok(channels.to_vec());
    }

    log::debug!(
        "Resampling {} frames x {} channels from {} Hz to {} Hz",
        frames,
        channels.len(),
        from_rate,
        to_rate
    );

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0,
        PolynomialDegree::Septic,
        CHUNK_FRAMES,
        channels.len(),
    )
    .map_err(|e| AnalysisError::ProcessingError(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let expected = (frames as f64 * ratio).round() as usize;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels.len()];
    let append = |output: &mut Vec<Vec<f32>>, block: Vec<Vec<f32>>| {
        for (out, chunk) in output.iter_mut().zip(block) {
            out.extend_from_slice(&chunk);
        }
    };

    let mut pos = 0;
    while pos + resampler.input_frames_next() <= frames {
        let next = resampler.input_frames_next();
        let block: Vec<&[f32]> = channels.iter().map(|c| &c[pos..pos + next]).collect();
        let resampled = resampler.process(&block, None).map_err(processing_error)?;
        append(&mut output, resampled);
        pos += next;
    }
    if pos < frames {
        let block: Vec<&[f32]> = channels.iter().map(|c| &c[pos..]).collect();
        let resampled = resampler
            .process_partial(Some(block.as_slice()), None)
            .map_err(processing_error)?;
        append(&mut output, resampled);
    }

    // flush the filter until the delayed tail is out
    while output[0].len() < expected + delay {
        let resampled = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(processing_error)?;
        if resampled.first().map_or(true, Vec::is_empty) {
            break;
        }
        append(&mut output, resampled);
    }

    for channel in output.iter_mut() {
        channel.drain(..delay.min(channel.len()));
        channel.truncate(expected);
    }
    Ok(output)
}

/// Resample a signal to `target_rate`
///
/// Empty signals and signals already at the target rate are returned as-is.
pub fn resample_signal(signal: &AudioSignal, target_rate: u32) -> Result<AudioSignal> {
    if target_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid target sample rate".to_string()));
    }
    let channels = resample_planar(signal.channels(), signal.sample_rate(), target_rate)?;
    AudioSignal::new(channels, target_rate)
}

/// Resample mono samples, as needed by models with a fixed input rate
pub fn resample_mono(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
    }
    let mut out = resample_planar(&[samples.to_vec()], from_rate, to_rate)?;
    Ok(out.pop().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_identity() {
        let signal = AudioSignal::from_mono(vec![0.1, 0.2, 0.3], 44100).unwrap();
        let out = resample_signal(&signal, 44100).unwrap();
        assert_eq!(out.channels()[0], vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_empty_signal_passes_through() {
        let signal = AudioSignal::from_mono(Vec::new(), 48000).unwrap();
        let out = resample_signal(&signal, 44100).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.sample_rate(), 44100);
    }

    #[test]
    fn test_downsample_length() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 220.0 / 44100.0).sin())
            .collect();
        let out = resample_mono(&samples, 44100, 16000).unwrap();
        assert_eq!(out.len(), 16000);
    }

    #[test]
    fn test_output_is_aligned_with_input() {
        // silence, then a full-scale tone from 0.5 s to the end
        let samples: Vec<f32> = (0..44100)
            .map(|i| {
                if i < 22050 {
                    0.0
                } else {
                    (i as f32 * 2.0 * std::f32::consts::PI * 440.0 / 44100.0).sin()
                }
            })
            .collect();
        let out = resample_mono(&samples, 44100, 22050).unwrap();
        assert_eq!(out.len(), 22050);

        let first_loud = out.iter().position(|x| x.abs() > 0.5).unwrap();
        assert!(first_loud.abs_diff(11025) < 20, "tone starts at {}", first_loud);
        // the tail survives the flush
        assert!(out[22000..].iter().any(|x| x.abs() > 0.5));
    }
}

//! WAV output for separated stems

use super::signal::AudioSignal;
use crate::error::{AnalysisError, Result};
use std::path::Path;

/// Write a signal as 32-bit float WAV
pub fn write_wav<P: AsRef<Path>>(signal: &AudioSignal, path: P) -> Result<()> {
    let path = path.as_ref();
    let channels = u16::try_from(signal.channel_count()).map_err(|_| {
        AnalysisError::InvalidInput(format!("Too many channels: {}", signal.channel_count()))
    })?;
    let spec = hound::WavSpec {
        channels,
        sample_rate: signal.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let to_io = |e: hound::Error| AnalysisError::ProcessingError(format!("WAV write failed: {}", e));

    let mut writer = hound::WavWriter::create(path, spec).map_err(to_io)?;
    for sample in signal.interleaved() {
        writer.write_sample(sample).map_err(to_io)?;
    }
    writer.finalize().map_err(to_io)?;

    log::debug!(
        "Wrote {:.2}s ({} ch) to {}",
        signal.duration_seconds(),
        channels,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drums.wav");
        let signal = AudioSignal::new(vec![vec![0.25; 100], vec![-0.5; 100]], 44100).unwrap();
        write_wav(&signal, &path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 200);
        assert_eq!(samples[0], 0.25);
        assert_eq!(samples[1], -0.5);
    }
}

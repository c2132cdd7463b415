//! Audio decoding using Symphonia

use super::resample::resample_signal;
use super::signal::AudioSignal;
use crate::error::{AnalysisError, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode an audio file to planar PCM at its native sample rate
///
/// # Errors
///
/// * `AnalysisError::FileNotFound` if the path does not exist
/// * `AnalysisError::DecodingError` if the file cannot be opened, probed or
///   decoded, or yields no samples
pub fn decode_audio<P: AsRef<Path>>(path: P) -> Result<AudioSignal> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AnalysisError::FileNotFound(path.display().to_string()));
    }

    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path).map_err(|e| {
        AnalysisError::DecodingError(format!("cannot open {}: {}", path.display(), e))
    })?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AnalysisError::DecodingError(format!("unsupported format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::DecodingError("No supported audio tracks found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AnalysisError::DecodingError("Track has no sample rate".to_string()))?;
    let mut channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::DecodingError(format!("unsupported codec: {}", e)))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AnalysisError::DecodingError(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channel_count = spec.channels.count();
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                // Corrupted packets are skipped, not fatal
                skipped_packets += 1;
                log::debug!("Skipping undecodable packet: {}", msg);
            }
            Err(e) => return Err(AnalysisError::DecodingError(e.to_string())),
        }
    }

    if skipped_packets > 0 {
        log::warn!(
            "{}: skipped {} undecodable packets",
            path.display(),
            skipped_packets
        );
    }

    if channel_count == 0 || interleaved.is_empty() {
        return Err(AnalysisError::DecodingError(format!(
            "{} contains no decodable audio",
            path.display()
        )));
    }

    let signal = AudioSignal::from_interleaved(&interleaved, channel_count, sample_rate)?;
    log::debug!(
        "Decoded {} samples x {} channels at {} Hz ({:.2}s)",
        signal.len(),
        signal.channel_count(),
        sample_rate,
        signal.duration_seconds()
    );
    Ok(signal)
}

/// Decode an audio file and resample it to `target_rate`
///
/// Features are only comparable across files when every file is analysed at
/// the same rate, so this is the entry point the pipelines use.
pub fn load_audio<P: AsRef<Path>>(path: P, target_rate: u32) -> Result<AudioSignal> {
    let signal = decode_audio(path)?;
    if signal.sample_rate() == target_rate {
        return Ok(signal);
    }
    resample_signal(&signal, target_rate)
        .map_err(|e| AnalysisError::DecodingError(format!("resampling failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let v = ((i as f32 * 440.0 * 2.0 * std::f32::consts::PI / sample_rate as f32).sin()
                * 16000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_missing_file() {
        let result = decode_audio("/nonexistent/audio.wav");
        assert!(matches!(result, Err(AnalysisError::FileNotFound(_))));
    }

    #[test]
    fn test_garbage_file_is_decoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();
        let result = decode_audio(&path);
        assert!(matches!(result, Err(AnalysisError::DecodingError(_))));
    }

    #[test]
    fn test_decode_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_test_wav(&path, 44100, 2, 44100);

        let signal = decode_audio(&path).unwrap();
        assert_eq!(signal.channel_count(), 2);
        assert_eq!(signal.sample_rate(), 44100);
        assert_eq!(signal.len(), 44100);
        assert!((signal.duration_seconds() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_load_resamples_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone_22k.wav");
        write_test_wav(&path, 22050, 1, 22050);

        let signal = load_audio(&path, 44100).unwrap();
        assert_eq!(signal.sample_rate(), 44100);
        assert!((signal.duration_seconds() - 1.0).abs() < 0.05);
    }
}

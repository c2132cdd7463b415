//! Artifact paths and JSON report output

use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default report location: `<input stem>.analysis.json` beside the input
pub fn default_report_path(input: &Path) -> PathBuf {
    input.with_extension("analysis.json")
}

/// Directory receiving separated stems: `<parent>/<input stem>_stems`
pub fn stems_dir(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(format!("{}_stems", stem))
}

/// Transcription MIDI location: `<input stem>.transcribed.mid` beside the input
pub fn midi_path(input: &Path) -> PathBuf {
    input.with_extension("transcribed.mid")
}

/// Serialize `value` as pretty-printed JSON at `path`
pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)?;
    log::info!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths() {
        let input = Path::new("/music/album/song.flac");
        assert_eq!(
            default_report_path(input),
            PathBuf::from("/music/album/song.analysis.json")
        );
        assert_eq!(stems_dir(input), PathBuf::from("/music/album/song_stems"));
        assert_eq!(
            midi_path(input),
            PathBuf::from("/music/album/song.transcribed.mid")
        );
    }

    #[test]
    fn test_relative_input_paths() {
        assert_eq!(stems_dir(Path::new("song.wav")), PathBuf::from("song_stems"));
        assert_eq!(
            default_report_path(Path::new("song.wav")),
            PathBuf::from("song.analysis.json")
        );
    }

    #[test]
    fn test_write_json_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        write_json(&serde_json::json!({ "tempo": 120.0 }), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["tempo"], 120.0);
    }
}

//! Human-readable run summary

use super::report::AnalysisReport;
use crate::config::ReportConfig;
use std::fmt::Write;

/// Render the summary printed after a full analysis
pub fn render_summary(report: &AnalysisReport, config: &ReportConfig) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = write_summary(&mut out, report, config);
    out
}

fn write_summary(out: &mut String, report: &AnalysisReport, config: &ReportConfig) -> std::fmt::Result {
    writeln!(out, "Analysis Summary")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out, "Duration: {:.1}s", report.file_info.duration)?;

    if let Some(stems) = report.stems.as_ref().and_then(|s| s.data()) {
        writeln!(out, "\nSource Separation:")?;
        for (name, stem) in stems {
            let tempo = stem
                .features
                .tempo
                .map_or_else(|| "N/A".to_string(), |t| format!("{:.1}", t));
            writeln!(
                out,
                "  {}: tempo={}, energy={:.3}",
                name, tempo, stem.features.rms_mean
            )?;
        }
    }

    if let Some(trans) = report.transcription.as_ref().and_then(|t| t.data()) {
        writeln!(out, "\nTranscription:")?;
        writeln!(out, "  Notes: {}", trans.note_count)?;
        writeln!(
            out,
            "  Range: {}-{}",
            trans.pitch_range.min, trans.pitch_range.max
        )?;
    }

    if let Some(features) = report.features.data() {
        writeln!(out, "\nMusical Features:")?;
        writeln!(out, "  Tempo: {:.1} BPM", features.tempo)?;
        writeln!(out, "  Key: {}", features.estimated_key.unwrap_or("unknown"))?;
        writeln!(
            out,
            "  Dynamic Range: {:.1} dB",
            features.dynamics.dynamic_range_db
        )?;
    }

    if let Some(structure) = report.structure.data() {
        writeln!(out, "\nStructure:")?;
        if structure.boundaries.is_empty() {
            writeln!(out, "  Sections: {} (structure unknown)", structure.sections.len())?;
        } else {
            writeln!(out, "  Sections: {}", structure.sections.len())?;
        }
        for section in structure.sections.iter().take(config.summary_sections) {
            writeln!(
                out,
                "    {}: {:.1}s - {:.1}s",
                section.name, section.start, section.end
            )?;
        }
    }

    writeln!(out, "\nStages:")?;
    for stage in report.stages() {
        match &stage.error {
            None => writeln!(out, "  {}: ok", stage.name)?,
            Some(e) => writeln!(out, "  {}: failed ({})", stage.name, e)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::report::{FileInfo, StageReport};
    use crate::backends::CapabilityMap;
    use crate::patterns::PatternSummary;
    use crate::structure::segmenter::build_sections;
    use crate::structure::StructureReport;
    use crate::config::LabelOverflow;

    fn report() -> AnalysisReport {
        let boundaries = vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
        AnalysisReport {
            file_info: FileInfo {
                path: "song.wav".to_string(),
                duration: 70.0,
                sample_rate: 44100,
                channels: 2,
            },
            capabilities: CapabilityMap::default(),
            stems: None,
            transcription: None,
            features: StageReport::failed("Processing error: broken"),
            structure: StageReport::ok(StructureReport {
                sections: build_sections(&boundaries, 70.0, LabelOverflow::Numbered),
                novelty_peaks: boundaries.len(),
                boundaries,
            }),
            embeddings: None,
            patterns: StageReport::ok(PatternSummary::default()),
        }
    }

    #[test]
    fn test_summary_contents() {
        let text = render_summary(&report(), &ReportConfig::default());
        assert!(text.contains("Duration: 70.0s"));
        assert!(text.contains("Sections: 7"));
        assert!(text.contains("intro: 0.0s - 10.0s"));
        // only the first five sections are listed
        assert!(!text.contains("chorus3"));
        assert!(text.contains("features: failed (Processing error: broken)"));
        assert!(text.contains("structure: ok"));
        assert!(!text.contains("Source Separation"));
        assert!(!text.contains("Musical Features"));
    }
}

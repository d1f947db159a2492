//! Plain-text rendering and persistence of a [`BenchmarkReport`].
use crate::error::{BenchError, Result};
use crate::types::{BenchmarkReport, HeaderStyle, TrialEntry, TrialOutcome, TrialParameters};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const PREAMBLE: &str = "Comparison Results:";

/// Width approach names are padded to before the ` : ` separator.
pub const NAME_WIDTH: usize = 10;

/// Rendered for a result that carries neither a row count nor an error.
pub const NO_ROW_COUNT: &str = "no row count reported";

/// Renders trials in the order they were run.
///
/// Formatting is lossless: nothing is reordered, filtered or aggregated,
/// and the same report always renders to the same bytes.
#[derive(Debug, Clone, Copy)]
pub struct ReportFormatter {
    name_width: usize,
}

impl ReportFormatter {
    pub fn new() -> Self {
        Self {
            name_width: NAME_WIDTH,
        }
    }

    pub fn with_name_width(mut self, width: usize) -> Self {
        self.name_width = width;
        self
    }

    pub fn format(&self, report: &BenchmarkReport) -> String {
        let mut out = String::new();
        out.push_str(PREAMBLE);
        out.push_str("\n\n");
        for trial in &report.trials {
            self.write_trial(&mut out, report.header_style, trial);
        }
        out
    }

    fn write_trial(&self, out: &mut String, style: HeaderStyle, trial: &TrialEntry) {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}", header(style, &trial.params));

        match &trial.outcome {
            TrialOutcome::Completed(results) => {
                for result in results.iter() {
                    let name = result.approach.name();
                    let width = self.name_width;
                    let ms = result.time_taken_ms;
                    let _ = match (result.records_found, &result.error) {
                        (_, Some(error)) => {
                            writeln!(out, "{name:<width$} : {ms}ms, error: {error}")
                        }
                        (Some(found), None) => {
                            writeln!(out, "{name:<width$} : {ms}ms, {found} records found")
                        }
                        (None, None) => writeln!(
                            out,
                            "{name:<width$} : {ms}ms, error: {NO_ROW_COUNT}"
                        ),
                    };
                }
            }
            TrialOutcome::FixtureFailed(message) => {
                let _ = writeln!(
                    out,
                    "Error preparing dataset for volume {}: {message}",
                    trial.params.volume
                );
            }
        }

        out.push('\n');
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(style: HeaderStyle, params: &TrialParameters) -> String {
    match style {
        HeaderStyle::Full => format!(
            "Point Size: {}, Volume: {} records, Radius: {} meters",
            params.point_set_size, params.volume, params.radius
        ),
        HeaderStyle::VolumeOnly => format!("Volume: {} records", params.volume),
    }
}

/// Replace the file at `path` with `contents`.
///
/// The text is written to a sibling temporary file, synced, then renamed
/// over the target, so a failed write leaves any previous report intact.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    let write_err = |source| BenchError::ReportWrite {
        path: path.to_path_buf(),
        source,
    };

    let tmp_path = temp_path(path);
    let result = (|| {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        std::fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }

    log::info!("Report written to {}", path.display());
    Ok(())
}

/// Where the JSON rendering goes for a text report at `text_path`: the
/// same name with a `.json` extension. A text report already named
/// `*.json` is rejected rather than overwritten.
pub fn json_report_path(text_path: &Path) -> Result<PathBuf> {
    let json_path = text_path.with_extension("json");
    if json_path == text_path {
        return Err(BenchError::config(format!(
            "JSON report would overwrite the text report at {}; choose a non-.json output",
            text_path.display()
        )));
    }
    Ok(json_path)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

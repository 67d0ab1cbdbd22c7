//! Filtered lines -> records, end to end.

use serde::Serialize;

use crate::config::{CompiledConfig, OutputConfig};
use crate::error::{SplitError, SplitWarning};
use crate::line::Line;
use crate::noise::{filter_noise, FilterReport};
use crate::record::{build_record, MessageRecord};
use crate::render::{render_records, OutputFile};
use crate::segment::segment;

/// Result of splitting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitOutcome {
    pub records: Vec<MessageRecord>,
    pub warnings: Vec<SplitWarning>,
    pub report: FilterReport,
    /// Lines before the first message header.
    pub preamble: Vec<Line>,
}

impl SplitOutcome {
    pub fn files(&self, output: &OutputConfig) -> Vec<OutputFile> {
        render_records(&self.records, output)
    }
}

/// Reject inputs over the configured size before any parsing happens.
pub fn check_input_size(size: u64, config: &CompiledConfig) -> Result<(), SplitError> {
    if size > config.max_input_bytes {
        return Err(SplitError::InputTooLarge {
            size,
            limit: config.max_input_bytes,
        });
    }
    Ok(())
}

/// Run noise filtering, segmentation and record building over extracted lines.
pub fn split_lines(lines: Vec<Line>, config: &CompiledConfig) -> Result<SplitOutcome, SplitError> {
    let filtered = filter_noise(lines, &config.noise, &config.header);
    let segmentation = segment(filtered.lines, &config.header, &config.segment);

    let records = segmentation
        .blocks
        .iter()
        .enumerate()
        .map(|(i, block)| build_record(block, i, &config.header, &config.attachment))
        .collect::<Result<Vec<_>, _>>()?;

    let mut warnings = segmentation.warnings;
    warnings.extend(counter_warnings(&filtered.report, records.len()));

    for warning in &warnings {
        log::warn!("{warning}");
    }
    log::debug!("built {} record(s)", records.len());

    Ok(SplitOutcome {
        records,
        warnings,
        report: filtered.report,
        preamble: segmentation.preamble,
    })
}

/// Compare the export's own message counter with what was found. The latest
/// reported total wins when it changes mid-document.
fn counter_warnings(report: &FilterReport, found: usize) -> Vec<SplitWarning> {
    let totals = report.reported_totals();
    let mut warnings = Vec::new();

    if totals.len() > 1 {
        warnings.push(SplitWarning::InconsistentReportedTotal {
            totals: totals.clone(),
        });
    }

    if let Some(reported) = report.counters.last().map(|c| c.total) {
        if reported != found {
            warnings.push(SplitWarning::ReportedCountMismatch { reported, found });
        }
    }

    warnings
}

//! Fatal errors and non-fatal warnings of a split run.

use std::fmt;

use serde::Serialize;

/// A failure that stops processing of one document.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("unreadable PDF: {0}")]
    UnreadablePdf(String),

    /// A headed block whose first line is not a header. Points at a bug in
    /// segmentation, not at bad input.
    #[error("malformed header in block {block} (page {page}): {line:?}")]
    MalformedHeader {
        block: usize,
        page: usize,
        line: String,
    },

    #[error("failed to write {target}: {reason}")]
    WriteFailure { target: String, reason: String },

    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("input is {size} bytes, the limit is {limit} bytes")]
    InputTooLarge { size: u64, limit: u64 },
}

impl SplitError {
    pub fn invalid_config(field: impl Into<String>, reason: impl fmt::Display) -> Self {
        SplitError::InvalidConfig {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write_failure(target: impl Into<String>, reason: impl fmt::Display) -> Self {
        SplitError::WriteFailure {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

/// Something the caller should know about, while the records are still usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SplitWarning {
    /// Zero or one header was found, so the split cannot be corroborated.
    LowConfidenceSegmentation { headers: usize },
    /// Non-blank lines before the first header belong to no record.
    UnattributedPreamble { lines: usize },
    /// The export's own "Message N of M" counter disagrees with what was found.
    ReportedCountMismatch { reported: usize, found: usize },
    /// The counter's total changes from one message to the next.
    InconsistentReportedTotal { totals: Vec<usize> },
}

impl fmt::Display for SplitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitWarning::LowConfidenceSegmentation { headers: 0 } => write!(
                f,
                "no message headers found; the whole document was kept as one record"
            ),
            SplitWarning::LowConfidenceSegmentation { headers } => write!(
                f,
                "only {headers} message header found; the split may be incomplete"
            ),
            SplitWarning::UnattributedPreamble { lines } => write!(
                f,
                "{lines} line(s) before the first message header were not assigned to any record"
            ),
            SplitWarning::ReportedCountMismatch { reported, found } => write!(
                f,
                "export reports {reported} message(s) but {found} were found"
            ),
            SplitWarning::InconsistentReportedTotal { totals } => {
                let totals: Vec<String> = totals.iter().map(|t| t.to_string()).collect();
                write!(
                    f,
                    "message counter total changed mid-document ({})",
                    totals.join(", ")
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let json = serde_json::to_value(SplitWarning::ReportedCountMismatch {
            reported: 3,
            found: 2,
        })
        .unwrap();
        assert_eq!(json["kind"], "reported_count_mismatch");
        assert_eq!(json["reported"], 3);
    }

    #[test]
    fn test_low_confidence_message_mentions_count() {
        let msg = SplitWarning::LowConfidenceSegmentation { headers: 1 }.to_string();
        assert!(msg.contains("only 1"));
        let msg = SplitWarning::LowConfidenceSegmentation { headers: 0 }.to_string();
        assert!(msg.contains("no message headers"));
    }

    #[test]
    fn test_error_display() {
        let err = SplitError::InputTooLarge { size: 10, limit: 5 };
        assert_eq!(err.to_string(), "input is 10 bytes, the limit is 5 bytes");
        let err = SplitError::invalid_config("header.pattern", "missing group `sender`");
        assert_eq!(
            err.to_string(),
            "invalid config `header.pattern`: missing group `sender`"
        );
    }
}

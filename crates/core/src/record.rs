//! Block -> [`MessageRecord`].

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::SplitError;
use crate::header::HeaderMatcher;
use crate::line::Line;
use crate::segment::{BlockKind, MessageBlock};

/// An attachment name or label as written in the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentReference(String);

impl AttachmentReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for AttachmentReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// One message, ready to be written.
///
/// `timestamp` and `sender` are `None` only for the record built from an
/// unsegmented document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub sender: Option<String>,
    pub body: String,
    pub attachments: Vec<AttachmentReference>,
    /// Page the message starts on.
    pub page: usize,
}

/// Build a record from one block. `position` is the block's 0-based index,
/// used only for error reporting.
///
/// Attachment marker lines stay in the body verbatim.
pub fn build_record(
    block: &MessageBlock,
    position: usize,
    header: &HeaderMatcher,
    attachment: &Regex,
) -> Result<MessageRecord, SplitError> {
    let page = block.page().unwrap_or(1);

    let (timestamp, sender, body_lines) = match block.kind {
        BlockKind::Unsegmented => (None, None, block.lines.as_slice()),
        BlockKind::Headed => {
            let Some((first, rest)) = block.lines.split_first() else {
                return Err(SplitError::MalformedHeader {
                    block: position,
                    page,
                    line: String::new(),
                });
            };
            let parsed = header
                .parse(&first.text)
                .ok_or_else(|| SplitError::MalformedHeader {
                    block: position,
                    page: first.page,
                    line: first.text.clone(),
                })?;
            (Some(parsed.timestamp), Some(parsed.sender), rest)
        }
    };

    Ok(MessageRecord {
        timestamp,
        sender,
        body: body_text(body_lines),
        attachments: find_attachments(body_lines, attachment),
        page,
    })
}

/// Join lines with `\n` after dropping leading and trailing blank lines.
pub fn body_text(lines: &[Line]) -> String {
    let start = lines.iter().position(|l| !l.is_blank());
    let end = lines.iter().rposition(|l| !l.is_blank());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end]
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// One reference per matching line, in order.
pub fn find_attachments(lines: &[Line], pattern: &Regex) -> Vec<AttachmentReference> {
    lines
        .iter()
        .filter_map(|l| pattern.captures(&l.text))
        .filter_map(|caps| caps.name("name").map(|m| m.as_str().trim().to_string()))
        .filter(|name| !name.is_empty())
        .map(AttachmentReference::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompiledConfig, SplitConfig};
    use chrono::NaiveDate;

    fn config() -> CompiledConfig {
        SplitConfig::default().compile().unwrap()
    }

    fn block(kind: BlockKind, texts: &[&str]) -> MessageBlock {
        MessageBlock {
            kind,
            lines: texts
                .iter()
                .enumerate()
                .map(|(i, t)| Line::new(2, i, *t))
                .collect(),
        }
    }

    fn build(block: &MessageBlock) -> Result<MessageRecord, SplitError> {
        let config = config();
        build_record(block, 0, &config.header, &config.attachment)
    }

    #[test]
    fn test_headed_block() {
        let record = build(&block(
            BlockKind::Headed,
            &["03/14/2023 10:15 AM \u{2014} Alice", "", "Line one", "", "Line two", ""],
        ))
        .unwrap();
        assert_eq!(
            record.timestamp,
            NaiveDate::from_ymd_opt(2023, 3, 14)
                .unwrap()
                .and_hms_opt(10, 15, 0)
        );
        assert_eq!(record.sender.as_deref(), Some("Alice"));
        assert_eq!(record.body, "Line one\n\nLine two");
        assert_eq!(record.page, 2);
    }

    #[test]
    fn test_attachment_detected_and_kept_in_body() {
        let record = build(&block(
            BlockKind::Headed,
            &["03/14/2023 10:15 AM - Alice", "Here it is", "Attachment: photo.jpg"],
        ))
        .unwrap();
        assert_eq!(record.attachments, vec![AttachmentReference::new("photo.jpg")]);
        assert!(record.body.contains("Attachment: photo.jpg"));
    }

    #[test]
    fn test_multiple_attachments_in_order() {
        let record = build(&block(
            BlockKind::Headed,
            &[
                "03/14/2023 10:15 AM - Alice",
                "Attachments: receipt.pdf",
                "text",
                "attached: schedule.xlsx",
            ],
        ))
        .unwrap();
        let names: Vec<&str> = record.attachments.iter().map(|a| a.as_str()).collect();
        assert_eq!(names, vec!["receipt.pdf", "schedule.xlsx"]);
    }

    #[test]
    fn test_attachment_word_mid_sentence_is_not_a_reference() {
        let record = build(&block(
            BlockKind::Headed,
            &["03/14/2023 10:15 AM - Alice", "See the attachment: it is late"],
        ))
        .unwrap();
        assert!(record.attachments.is_empty());
    }

    #[test]
    fn test_malformed_header() {
        let err = build(&block(BlockKind::Headed, &["not a header", "body"])).unwrap_err();
        assert!(matches!(
            err,
            SplitError::MalformedHeader { page: 2, ref line, .. } if line == "not a header"
        ));
    }

    #[test]
    fn test_empty_headed_block_is_malformed() {
        assert!(matches!(
            build(&block(BlockKind::Headed, &[])),
            Err(SplitError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_unsegmented_block_keeps_everything() {
        let record = build(&block(BlockKind::Unsegmented, &["", "just text", "more"])).unwrap();
        assert_eq!(record.timestamp, None);
        assert_eq!(record.sender, None);
        assert_eq!(record.body, "just text\nmore");
    }

    #[test]
    fn test_header_only_block_has_empty_body() {
        let record = build(&block(BlockKind::Headed, &["03/14/2023 10:15 AM - Alice"])).unwrap();
        assert_eq!(record.body, "");
    }

    #[test]
    fn test_attachment_serializes_as_string() {
        let json = serde_json::to_string(&AttachmentReference::new("a.png")).unwrap();
        assert_eq!(json, "\"a.png\"");
    }
}

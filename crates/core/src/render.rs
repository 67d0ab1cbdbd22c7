//! Record serialization and output naming.
//!
//! ```text
//! Timestamp: 2023-03-14 10:15:00
//! Sender: Alice
//! Attachments: photo.jpg, receipt.pdf
//!
//! <body>
//! ```
//!
//! A record without a timestamp or sender leaves that value empty.

use chrono::NaiveDateTime;

use crate::config::OutputConfig;
use crate::record::MessageRecord;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp format used inside file names (no `:` or spaces).
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// One named output unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// Header block read back from a rendered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub timestamp: Option<NaiveDateTime>,
    pub sender: Option<String>,
    pub attachments: Vec<String>,
}

pub fn render_record(record: &MessageRecord) -> String {
    let mut out = String::new();
    let timestamp = record
        .timestamp
        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string());
    push_field(&mut out, "Timestamp", timestamp.as_deref());
    push_field(&mut out, "Sender", record.sender.as_deref());
    if !record.attachments.is_empty() {
        let names: Vec<&str> = record.attachments.iter().map(|a| a.as_str()).collect();
        out.push_str(&format!("Attachments: {}\n", names.join(", ")));
    }
    out.push('\n');
    if !record.body.is_empty() {
        out.push_str(&record.body);
        out.push('\n');
    }
    out
}

fn push_field(out: &mut String, key: &str, value: Option<&str>) {
    match value {
        Some(value) => out.push_str(&format!("{key}: {value}\n")),
        None => out.push_str(&format!("{key}:\n")),
    }
}

/// Parse the header block of a rendered record. `None` when the block lacks
/// a `Timestamp` or `Sender` line, or the timestamp is not in
/// [`TIMESTAMP_FORMAT`].
pub fn parse_record_header(text: &str) -> Option<RecordHeader> {
    let mut timestamp = None;
    let mut sender = None;
    let mut attachments = Vec::new();

    for line in text.lines().take_while(|l| !l.is_empty()) {
        let (key, value) = line.split_once(':')?;
        let value = value.strip_prefix(' ').unwrap_or(value);
        match key {
            "Timestamp" if value.is_empty() => timestamp = Some(None),
            "Timestamp" => {
                let ts = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()?;
                timestamp = Some(Some(ts));
            }
            "Sender" if value.is_empty() => sender = Some(None),
            "Sender" => sender = Some(Some(value.to_string())),
            "Attachments" => attachments = value.split(", ").map(String::from).collect(),
            _ => return None,
        }
    }

    Some(RecordHeader {
        timestamp: timestamp?,
        sender: sender?,
        attachments,
    })
}

/// `NNN_<timestamp>.<ext>`, or `NNN_undated.<ext>` without a timestamp.
/// `position` is 1-based.
pub fn record_file_name(position: usize, record: &MessageRecord, output: &OutputConfig) -> String {
    let stem = record
        .timestamp
        .map(|ts| ts.format(FILE_TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "undated".to_string());
    format!(
        "{:0width$}_{}.{}",
        position,
        sanitize_component(&stem, "undated"),
        output.extension,
        width = output.index_width
    )
}

pub fn render_records(records: &[MessageRecord], output: &OutputConfig) -> Vec<OutputFile> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| OutputFile {
            name: record_file_name(i + 1, record, output),
            contents: render_record(record).into_bytes(),
        })
        .collect()
}

/// Turn arbitrary text into a safe single path component.
///
/// Transliterates to ASCII, keeps `[A-Za-z0-9._-]`, collapses runs of `_`
/// and `.`, and falls back to `fallback` when nothing usable is left.
/// Reserved Windows device names get a trailing `_`.
pub fn sanitize_component(value: &str, fallback: &str) -> String {
    let ascii = deunicode::deunicode(value);
    let mut out = String::with_capacity(ascii.len());

    for ch in ascii.chars() {
        let mapped = if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            ch
        } else {
            '_'
        };
        if matches!(mapped, '_' | '.') && out.ends_with(mapped) {
            continue;
        }
        out.push(mapped);
    }

    while let Some(pos) = out.find("_.") {
        out.remove(pos);
    }
    let out = out.trim_matches(|c| c == '_' || c == '.');

    if out.is_empty() {
        return fallback.to_string();
    }

    let base = out.split('.').next().unwrap_or(out).to_ascii_uppercase();
    let reserved = matches!(base.as_str(), "CON" | "PRN" | "AUX" | "NUL")
        || (base.len() == 4
            && (base.starts_with("COM") || base.starts_with("LPT"))
            && base.as_bytes()[3].is_ascii_digit());
    if reserved {
        return format!("{out}_");
    }

    out.to_string()
}

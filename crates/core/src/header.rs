//! Message header recognition: `"<date> <time> — <sender>"` lines.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;

/// Timestamp and sender parsed from a boundary line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageHeader {
    pub timestamp: NaiveDateTime,
    pub sender: String,
}

/// Compiled header pattern plus the timestamp formats tried against it.
///
/// A line is a header only when the pattern matches *and* one of the formats
/// parses `"<date> <time>"`. Shape alone is never enough.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    pattern: Regex,
    formats: Vec<String>,
}

impl HeaderMatcher {
    pub fn new(pattern: Regex, formats: Vec<String>) -> Self {
        Self { pattern, formats }
    }

    /// True when the line has a header's shape, whether or not its timestamp parses.
    pub fn looks_like_header(&self, text: &str) -> bool {
        self.pattern.is_match(text.trim())
    }

    pub fn parse(&self, text: &str) -> Option<MessageHeader> {
        let caps = self.pattern.captures(text.trim())?;
        let date = caps.name("date")?.as_str();
        let time = caps.name("time")?.as_str();
        let sender = caps.name("sender")?.as_str().trim();
        if sender.is_empty() {
            return None;
        }

        let Some(timestamp) = parse_timestamp(date, time, &self.formats) else {
            log::debug!("header-shaped line with unparseable timestamp: {text:?}");
            return None;
        };

        Some(MessageHeader {
            timestamp,
            sender: sender.to_string(),
        })
    }

    pub fn is_header(&self, text: &str) -> bool {
        self.parse(text).is_some()
    }
}

/// Try each format in order against `"<date> <time>"`.
///
/// The time is normalized first: whitespace collapsed, meridiem upper-cased
/// and separated by one space (`10:15am` -> `10:15 AM`).
pub fn parse_timestamp(date: &str, time: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let combined = format!("{} {}", date.trim(), normalize_time(time));
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
}

fn normalize_time(time: &str) -> String {
    let compact: String = time
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_ascii_uppercase();

    match compact.strip_suffix("AM").or_else(|| compact.strip_suffix("PM")) {
        Some(clock) => format!("{} {}", clock, &compact[clock.len()..]),
        None => compact,
    }
}

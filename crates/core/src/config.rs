//! Split configuration.
//!
//! Every pattern the pipeline uses lives here and is passed explicitly.
//! [`SplitConfig`] is the serde-friendly form (TOML on disk, defaults for
//! every field); [`CompiledConfig`] holds the validated regexes.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SplitError;
use crate::header::HeaderMatcher;
use crate::noise::NoiseRules;

pub const DEFAULT_HEADER_PATTERN: &str = r"^(?P<date>\d{1,2}/\d{1,2}/\d{4}),?\s+(?P<time>\d{1,2}:\d{2}(?::\d{2})?\s*(?:[AaPp]\.?[Mm]\.?)?)\s*[\x{2014}\x{2013}-]\s*(?P<sender>\S.*)$";

pub const DEFAULT_COUNTER_PATTERN: &str =
    r"^(?i)message\s+(?P<number>\d+)\s+of\s+(?P<total>\d+)$";

pub const DEFAULT_ATTACHMENT_PATTERN: &str =
    r"^\s*(?i:attachments?|attached(?:\s+files?)?)\s*:\s*(?P<name>\S.*?)\s*$";

/// 50 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Inputs larger than this are rejected before extraction.
    pub max_input_bytes: u64,
    pub header: HeaderConfig,
    pub noise: NoiseConfig,
    pub segment: SegmentConfig,
    pub attachments: AttachmentConfig,
    pub output: OutputConfig,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            header: HeaderConfig::default(),
            noise: NoiseConfig::default(),
            segment: SegmentConfig::default(),
            attachments: AttachmentConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Must define the named groups `date`, `time` and `sender`.
    pub pattern: String,
    /// chrono formats tried in order against `"<date> <time>"`.
    pub timestamp_formats: Vec<String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_HEADER_PATTERN.to_string(),
            timestamp_formats: [
                "%m/%d/%Y %I:%M %p",
                "%m/%d/%Y %I:%M:%S %p",
                "%m/%d/%Y %H:%M",
                "%m/%d/%Y %H:%M:%S",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Non-blank lines at the top and at the bottom of each page that are
    /// eligible for boilerplate removal.
    pub edge_lines: usize,
    pub min_repeat_pages: usize,
    /// Fraction of pages a line must repeat on to count as boilerplate.
    /// The threshold is at least `min_repeat_pages` and, on documents of three
    /// or more pages, at least three. On a two-page export any line repeated
    /// at the same edge offset on both pages is removed.
    pub repeat_ratio: f64,
    /// Fixed structural markers (pagination, rules).
    pub markers: Vec<String>,
    /// "Message N of M" counter. Groups `number` and `total`.
    pub counter_pattern: String,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            edge_lines: 2,
            min_repeat_pages: 2,
            repeat_ratio: 0.5,
            markers: [
                r"^(?i)page\s+\d+\s*(?:of|/)\s*\d+$",
                r"^(?i)page\s+\d+$",
                r"^\d{1,4}$",
                r"^[-_=.\x{2014}\x{2013}\x{2500}\x{2501}\x{00B7}*~ ]{3,}$",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            counter_pattern: DEFAULT_COUNTER_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Only accept a header as a boundary when it is anchored (blank line,
    /// page break or removed marker right before it). Turning this off makes
    /// every parseable header a boundary, quoted ones included.
    pub require_anchor: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            require_anchor: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Must define the named group `name`.
    pub pattern: String,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_ATTACHMENT_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub extension: String,
    /// Minimum number of digits in the record index prefix.
    pub index_width: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: "txt".to_string(),
            index_width: 3,
        }
    }
}

/// Validated configuration with every regex compiled once.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub header: HeaderMatcher,
    pub noise: NoiseRules,
    pub segment: SegmentConfig,
    pub attachment: Regex,
    pub output: OutputConfig,
    pub max_input_bytes: u64,
}

impl SplitConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, SplitError> {
        toml::from_str(s).map_err(|e| SplitError::invalid_config("toml", e.message()))
    }

    pub fn to_toml_string(&self) -> Result<String, SplitError> {
        toml::to_string_pretty(self).map_err(|e| SplitError::invalid_config("toml", e))
    }

    /// Validate every field and compile the patterns.
    pub fn compile(&self) -> Result<CompiledConfig, SplitError> {
        let header_re = compile_pattern("header.pattern", &self.header.pattern)?;
        require_groups("header.pattern", &header_re, &["date", "time", "sender"])?;
        if self.header.timestamp_formats.is_empty() {
            return Err(SplitError::invalid_config(
                "header.timestamp_formats",
                "at least one format is required",
            ));
        }

        if !(self.noise.repeat_ratio > 0.0 && self.noise.repeat_ratio <= 1.0) {
            return Err(SplitError::invalid_config(
                "noise.repeat_ratio",
                format!("{} is not in (0, 1]", self.noise.repeat_ratio),
            ));
        }
        let markers = self
            .noise
            .markers
            .iter()
            .enumerate()
            .map(|(i, p)| compile_pattern(&format!("noise.markers[{i}]"), p))
            .collect::<Result<Vec<_>, _>>()?;
        let counter = compile_pattern("noise.counter_pattern", &self.noise.counter_pattern)?;
        require_groups("noise.counter_pattern", &counter, &["total"])?;

        let attachment = compile_pattern("attachments.pattern", &self.attachments.pattern)?;
        require_groups("attachments.pattern", &attachment, &["name"])?;

        let ext = &self.output.extension;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SplitError::invalid_config(
                "output.extension",
                format!("{ext:?} must be non-empty and alphanumeric"),
            ));
        }
        if self.output.index_width == 0 || self.output.index_width > 9 {
            return Err(SplitError::invalid_config(
                "output.index_width",
                format!("{} is not in 1..=9", self.output.index_width),
            ));
        }

        Ok(CompiledConfig {
            header: HeaderMatcher::new(header_re, self.header.timestamp_formats.clone()),
            noise: NoiseRules {
                edge_lines: self.noise.edge_lines,
                min_repeat_pages: self.noise.min_repeat_pages.max(2),
                repeat_ratio: self.noise.repeat_ratio,
                markers,
                counter,
            },
            segment: self.segment.clone(),
            attachment,
            output: self.output.clone(),
            max_input_bytes: self.max_input_bytes,
        })
    }
}

fn compile_pattern(field: &str, pattern: &str) -> Result<Regex, SplitError> {
    Regex::new(pattern).map_err(|e| SplitError::invalid_config(field, e))
}

fn require_groups(field: &str, re: &Regex, groups: &[&str]) -> Result<(), SplitError> {
    for group in groups {
        if !re.capture_names().flatten().any(|name| name == *group) {
            return Err(SplitError::invalid_config(
                field,
                format!("missing named group `{group}`"),
            ));
        }
    }
    Ok(())
}

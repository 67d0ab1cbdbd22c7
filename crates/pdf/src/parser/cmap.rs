//! Minimal `/ToUnicode` CMap support.
//!
//! Only the parts needed for text extraction are understood:
//! `begincodespacerange` (to learn the code width), `beginbfchar` and
//! `beginbfrange` (both the sequential and the array form).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Character-code to Unicode mapping parsed from a ToUnicode stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicode {
    map: HashMap<u32, String>,
    /// Number of bytes per character code (1 or 2 in practice).
    code_width: usize,
}

impl ToUnicode {
    /// Parse a decompressed ToUnicode stream. Malformed entries are skipped.
    pub fn parse(data: &[u8]) -> Self {
        let content = String::from_utf8_lossy(data);
        let mut map = HashMap::new();
        let mut code_width = 0usize;

        for section in sections(&content, "begincodespacerange", "endcodespacerange") {
            if let Some(first) = hex_tokens(section).next() {
                code_width = first.len().div_ceil(2);
            }
        }

        for section in sections(&content, "beginbfchar", "endbfchar") {
            let tokens: Vec<&str> = hex_tokens(section).collect();
            for pair in tokens.chunks_exact(2) {
                if code_width == 0 {
                    code_width = pair[0].len().div_ceil(2);
                }
                if let (Ok(src), Some(dst)) = (u32::from_str_radix(pair[0], 16), utf16_hex(pair[1])) {
                    map.insert(src, dst);
                }
            }
        }

        for section in sections(&content, "beginbfrange", "endbfrange") {
            for line in section.lines() {
                parse_bfrange_line(line, &mut map, &mut code_width);
            }
        }

        Self {
            map,
            code_width: code_width.clamp(1, 4),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Decode shown-string bytes. Unmapped single-byte codes fall back to
    /// Latin-1; unmapped multi-byte codes are dropped.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut out = String::new();
        for chunk in bytes.chunks(self.code_width) {
            let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
            match self.map.get(&code) {
                Some(s) => out.push_str(s),
                None if self.code_width == 1 => out.push(chunk[0] as char),
                None => {}
            }
        }
        out
    }
}

/// Slices between every `begin` ... `end` pair.
fn sections<'a>(content: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find(begin) {
        let after = &rest[start + begin.len()..];
        let Some(stop) = after.find(end) else { break };
        found.push(&after[..stop]);
        rest = &after[stop + end.len()..];
    }
    found
}

fn hex_tokens(section: &str) -> impl Iterator<Item = &str> {
    static RE_HEX: OnceLock<Regex> = OnceLock::new();
    let re = RE_HEX.get_or_init(|| Regex::new(r"<([0-9A-Fa-f]+)>").unwrap());
    re.captures_iter(section)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
}

/// Destination strings are UTF-16BE code units written as hex.
fn utf16_hex(hex: &str) -> Option<String> {
    if hex.len() % 4 != 0 {
        // Some producers write 1-byte destinations; treat them as code points.
        let cp = u32::from_str_radix(hex, 16).ok()?;
        return char::from_u32(cp).map(String::from);
    }
    let units = (0..hex.len())
        .step_by(4)
        .map(|i| u16::from_str_radix(&hex[i..i + 4], 16))
        .collect::<Result<Vec<u16>, _>>()
        .ok()?;
    Some(String::from_utf16_lossy(&units))
}

/// `<lo> <hi> <dst>` or `<lo> <hi> [<d0> <d1> ...]`.
fn parse_bfrange_line(line: &str, map: &mut HashMap<u32, String>, code_width: &mut usize) {
    let tokens: Vec<&str> = hex_tokens(line).collect();
    if tokens.len() < 3 {
        return;
    }
    let (Ok(lo), Ok(hi)) = (
        u32::from_str_radix(tokens[0], 16),
        u32::from_str_radix(tokens[1], 16),
    ) else {
        return;
    };
    if hi < lo || hi - lo > 0xFFFF {
        return;
    }
    if *code_width == 0 {
        *code_width = tokens[0].len().div_ceil(2);
    }

    if line.contains('[') {
        for (offset, dst) in tokens[2..].iter().enumerate() {
            let code = lo + offset as u32;
            if code > hi {
                break;
            }
            if let Some(s) = utf16_hex(dst) {
                map.insert(code, s);
            }
        }
        return;
    }

    // Sequential form: the last UTF-16 unit of dst is incremented per code.
    let Some(base) = utf16_hex(tokens[2]) else {
        return;
    };
    let mut units: Vec<u16> = base.encode_utf16().collect();
    for code in lo..=hi {
        map.insert(code, String::from_utf16_lossy(&units));
        if let Some(last) = units.last_mut() {
            *last = last.wrapping_add(1);
        }
    }
}

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Normalize one extracted line of text.
///
/// Applies NFC normalization, ligature expansion, removal of replacement and
/// zero-width characters, bullet standardization, and whitespace collapsing.
/// The result never contains a newline and carries no trailing whitespace.
pub fn clean_line(text: &str) -> String {
    let mut result: String = text.nfc().collect();

    let ligatures = [
        ("\u{FB00}", "ff"),
        ("\u{FB01}", "fi"),
        ("\u{FB02}", "fl"),
        ("\u{FB03}", "ffi"),
        ("\u{FB04}", "ffl"),
    ];
    for (lig, replacement) in &ligatures {
        result = result.replace(lig, replacement);
    }

    result.retain(|c| !matches!(c, '\u{FFFD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' | '\0'));

    for bullet in ['\u{25CF}', '\u{25CB}', '\u{25A0}'] {
        result = result.replace(bullet, "\u{2022}");
    }

    // NBSP, tabs and stray line breaks all collapse into a single space.
    static RE_SPACES: OnceLock<Regex> = OnceLock::new();
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"[\s\u{00A0}\u{2007}\u{202F}]+").unwrap());
    result = re_spaces.replace_all(&result, " ").to_string();

    result.trim().to_string()
}

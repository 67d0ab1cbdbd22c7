use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use super::cmap::ToUnicode;
use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Font information needed to turn shown strings back into Unicode.
#[derive(Debug, Clone, Default)]
pub struct FontInfo {
    /// The font resource key as it appears in the page resources (e.g. `b"F1"`).
    pub name: Vec<u8>,
    /// Encoding entry from the font dictionary, when it is a name.
    pub encoding: Option<String>,
    /// Parsed `/ToUnicode` CMap, when the font carries one.
    pub to_unicode: Option<ToUnicode>,
}

/// A simplified, lopdf-independent representation of a PDF value.
///
/// The content-stream interpreter only ever sees this type, so it can be fed
/// hand-built operations in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Convert a `lopdf::Object` into a [`PdfValue`].
///
/// Stream dictionaries are converted but the raw stream bytes are dropped.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(
            dict.iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Stream(stream) => PdfValue::Dict(
            stream
                .dict
                .iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

/// Best-effort decoding of raw PDF string bytes into a Rust `String`.
///
/// 1. UTF-16BE with BOM (`\xFE\xFF` prefix).
/// 2. Valid UTF-8.
/// 3. Latin-1, each byte mapped to its Unicode code point.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16be(payload);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Decode big-endian UTF-16 code units, ignoring a trailing odd byte.
fn decode_utf16be(bytes: &[u8]) -> String {
    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&code_units)
}

/// Decode the bytes of a text-showing operand using whatever the font tells us.
///
/// A `/ToUnicode` CMap wins. Identity-encoded fonts without one are read as
/// UTF-16BE. Everything else falls back to [`decode_text_simple`].
pub fn decode_with_font(font: Option<&FontInfo>, bytes: &[u8]) -> String {
    let Some(font) = font else {
        return decode_text_simple(bytes);
    };

    if let Some(cmap) = font.to_unicode.as_ref().filter(|c| !c.is_empty()) {
        return cmap.decode(bytes);
    }

    let identity = font
        .encoding
        .as_deref()
        .is_some_and(|enc| enc.contains("Identity"));
    if identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
        let decoded = decode_utf16be(bytes);
        if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
            return decoded;
        }
    }

    decode_text_simple(bytes)
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over the PDF parsing backend (currently backed by `lopdf`).
///
/// The extractor only talks to this trait so it can be tested against a mock
/// that hands back pre-decoded operations.
pub trait PdfBackend {
    /// Mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Font information for every font referenced by the given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<FontInfo>, PdfError>;

    /// The raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Decode raw content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] implementation backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    /// Total number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Follow a single level of indirection.
    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Object> {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    /// Load and parse the `/ToUnicode` stream of a font dictionary.
    fn load_to_unicode(&self, font: &lopdf::Dictionary) -> Option<ToUnicode> {
        let obj = self.resolve(font.get(b"ToUnicode").ok()?)?;
        let stream = obj.as_stream().ok()?;
        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        Some(ToUnicode::parse(&data))
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontInfo>, PdfError> {
        let fonts_map = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        let mut result = Vec::with_capacity(fonts_map.len());
        for (name, dict) in &fonts_map {
            let encoding = dict
                .get(b"Encoding")
                .ok()
                .and_then(|o| self.resolve(o))
                .and_then(|o| match o {
                    lopdf::Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
                    _ => None,
                });

            result.push(FontInfo {
                name: name.clone(),
                encoding,
                to_unicode: self.load_to_unicode(dict),
            });
        }

        Ok(result)
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- decode_text_simple -------------------------------------------------

    #[test]
    fn decode_text_simple_utf8() {
        assert_eq!(decode_text_simple("03/14/2023".as_bytes()), "03/14/2023");
    }

    #[test]
    fn decode_text_simple_utf8_em_dash() {
        let input = "10:15 AM \u{2014} Alice";
        assert_eq!(decode_text_simple(input.as_bytes()), input);
    }

    #[test]
    fn decode_text_simple_latin1() {
        // 0xE9 is U+00E9 in Latin-1 but not valid standalone UTF-8.
        let input: &[u8] = &[0x52, 0x65, 0x6E, 0xE9, 0x65];
        assert_eq!(decode_text_simple(input), "Ren\u{00E9}e");
    }

    #[test]
    fn decode_text_simple_utf16be() {
        let input: &[u8] = &[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42];
        assert_eq!(decode_text_simple(input), "AB");
    }

    #[test]
    fn decode_text_simple_utf16be_odd_trailing_byte() {
        let input: &[u8] = &[0xFE, 0xFF, 0x00, 0x41, 0x00];
        assert_eq!(decode_text_simple(input), "A");
    }

    #[test]
    fn decode_text_simple_empty() {
        assert_eq!(decode_text_simple(&[]), "");
    }

    // -- decode_with_font ---------------------------------------------------

    #[test]
    fn decode_without_font_uses_simple_decoding() {
        assert_eq!(decode_with_font(None, b"Hello"), "Hello");
    }

    #[test]
    fn decode_identity_font_reads_utf16() {
        let font = FontInfo {
            name: b"F1".to_vec(),
            encoding: Some("Identity-H".to_string()),
            to_unicode: None,
        };
        assert_eq!(decode_with_font(Some(&font), &[0x00, 0x48, 0x00, 0x69]), "Hi");
    }

    #[test]
    fn decode_prefers_to_unicode_map() {
        let cmap = ToUnicode::parse(b"1 begincodespacerange <00> <FF> endcodespacerange\nbeginbfchar\n<01> <0041>\nendbfchar");
        let font = FontInfo {
            name: b"F1".to_vec(),
            encoding: Some("Identity-H".to_string()),
            to_unicode: Some(cmap),
        };
        assert_eq!(decode_with_font(Some(&font), &[0x01, 0x01]), "AA");
    }

    #[test]
    fn decode_winansi_font_falls_back() {
        let font = FontInfo {
            name: b"F1".to_vec(),
            encoding: Some("WinAnsiEncoding".to_string()),
            to_unicode: None,
        };
        assert_eq!(decode_with_font(Some(&font), b"Page 1 of 3"), "Page 1 of 3");
    }

    // -- get_number_from_value ----------------------------------------------

    #[test]
    fn get_number_integer_and_real() {
        assert_eq!(get_number_from_value(&PdfValue::Integer(42)), Some(42.0));
        assert_eq!(get_number_from_value(&PdfValue::Real(2.5)), Some(2.5));
    }

    #[test]
    fn get_number_from_non_numeric() {
        assert_eq!(get_number_from_value(&PdfValue::Null), None);
        assert_eq!(get_number_from_value(&PdfValue::Str(b"12".to_vec())), None);
        assert_eq!(get_number_from_value(&PdfValue::Reference((1, 0))), None);
    }

    // -- convert_object -----------------------------------------------------

    #[test]
    fn convert_scalars() {
        assert_eq!(convert_object(&lopdf::Object::Null), PdfValue::Null);
        assert_eq!(
            convert_object(&lopdf::Object::Integer(99)),
            PdfValue::Integer(99)
        );
        assert_eq!(
            convert_object(&lopdf::Object::Name(b"F1".to_vec())),
            PdfValue::Name(b"F1".to_vec())
        );
    }

    #[test]
    fn convert_string_keeps_raw_bytes() {
        assert_eq!(
            convert_object(&lopdf::Object::String(
                b"hello".to_vec(),
                lopdf::StringFormat::Literal,
            )),
            PdfValue::Str(b"hello".to_vec()),
        );
    }

    #[test]
    fn convert_tj_style_array() {
        let arr = lopdf::Object::Array(vec![
            lopdf::Object::String(b"Hel".to_vec(), lopdf::StringFormat::Literal),
            lopdf::Object::Integer(-250),
            lopdf::Object::String(b"lo".to_vec(), lopdf::StringFormat::Literal),
        ]);
        assert_eq!(
            convert_object(&arr),
            PdfValue::Array(vec![
                PdfValue::Str(b"Hel".to_vec()),
                PdfValue::Integer(-250),
                PdfValue::Str(b"lo".to_vec()),
            ]),
        );
    }

    #[test]
    fn convert_stream_uses_dict() {
        let mut dict = lopdf::Dictionary::new();
        dict.set("Length", lopdf::Object::Integer(0));
        let obj = lopdf::Object::Stream(lopdf::Stream::new(dict, vec![]));

        match convert_object(&obj) {
            PdfValue::Dict(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0, b"Length");
            }
            other => panic!("expected Dict for stream, got {:?}", other),
        }
    }

    #[test]
    fn load_bytes_rejects_garbage() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }
}

//! Content-stream interpretation: page operators -> positioned text runs.
//!
//! Implements the subset of the PDF text-rendering model that matters for
//! reading order: text and line matrices, the current transformation matrix
//! (`q`/`Q`/`cm`), spacing operators, and the four text-showing operators.
//! Glyph widths are not available here, so advances are approximated from the
//! font size.

use super::backend::{decode_with_font, get_number_from_value, FontInfo, PageId, PdfBackend, PdfValue};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A run of text shown at one position, in device space (y grows upwards).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Approximate glyph advance as a fraction of the font size.
pub(crate) const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// A `TJ` adjustment wider than this fraction of a glyph reads as a word gap.
const TJ_SPACE_RATIO: f32 = 0.3;

/// Affine matrix `[a, b, c, d, e, f]`.
type Matrix = [f32; 6];

const IDENTITY_MATRIX: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `lhs` applied first, then `rhs`.
fn concat(lhs: &Matrix, rhs: &Matrix) -> Matrix {
    [
        lhs[0] * rhs[0] + lhs[1] * rhs[2],
        lhs[0] * rhs[1] + lhs[1] * rhs[3],
        lhs[2] * rhs[0] + lhs[3] * rhs[2],
        lhs[2] * rhs[1] + lhs[3] * rhs[3],
        lhs[4] * rhs[0] + lhs[5] * rhs[2] + rhs[4],
        lhs[4] * rhs[1] + lhs[5] * rhs[3] + rhs[5],
    ]
}

fn matrix_from(operands: &[PdfValue]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    (vals.len() == 6).then(|| [vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]])
}

// ---------------------------------------------------------------------------
// Internal: text state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
    /// Tz / 100.
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Translate the line matrix (Td / TD / T*) and reset the text matrix to it.
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = &self.line_matrix;
        let e = m[0] * tx + m[2] * ty + m[4];
        let f = m[1] * tx + m[3] * ty + m[5];
        self.line_matrix[4] = e;
        self.line_matrix[5] = f;
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    /// Move the text matrix along the baseline by `dx` text-space units.
    fn advance(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn glyph_advance(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    /// Text-space displacement after showing `text`.
    fn displacement(&self, text: &str) -> f32 {
        text.chars()
            .map(|ch| {
                let spacing = if ch == ' ' { self.word_spacing } else { 0.0 };
                (self.font_size * APPROX_CHAR_WIDTH_RATIO + self.char_spacing + spacing)
                    * self.horiz_scale
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

struct Interpreter<'a> {
    fonts: &'a [FontInfo],
    text: TextState,
    ctm: Matrix,
    saved: Vec<Matrix>,
    runs: Vec<TextRun>,
}

impl<'a> Interpreter<'a> {
    fn new(fonts: &'a [FontInfo]) -> Self {
        Self {
            fonts,
            text: TextState::default(),
            ctm: IDENTITY_MATRIX,
            saved: Vec::new(),
            runs: Vec::new(),
        }
    }

    fn current_font(&self) -> Option<&'a FontInfo> {
        self.fonts.iter().find(|f| f.name == self.text.font_key)
    }

    fn decode(&self, value: &PdfValue) -> String {
        match value {
            PdfValue::Str(bytes) => decode_with_font(self.current_font(), bytes),
            _ => String::new(),
        }
    }

    /// Text rendering matrix without the rise: text matrix then CTM.
    fn rendering_matrix(&self) -> Matrix {
        concat(&self.text.text_matrix, &self.ctm)
    }

    fn push_run(&mut self, text: String, origin: Matrix) {
        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            return;
        }
        let rise = self.text.text_rise;
        let x = origin[4] + origin[2] * rise;
        let y = origin[5] + origin[3] * rise;
        let vertical = (origin[2].powi(2) + origin[3].powi(2)).sqrt();
        let horizontal = (origin[0].powi(2) + origin[1].powi(2)).sqrt();
        let font_size = (self.text.font_size * vertical).abs();
        let width = trimmed.chars().count() as f32 * self.text.glyph_advance().abs() * horizontal;
        self.runs.push(TextRun {
            text: trimmed.to_string(),
            x,
            y,
            width,
            font_size,
        });
    }

    fn show(&mut self, operand: &PdfValue) {
        let text = self.decode(operand);
        if text.is_empty() {
            return;
        }
        let origin = self.rendering_matrix();
        let dx = self.text.displacement(&text);
        self.push_run(text, origin);
        self.text.advance(dx);
    }

    /// `TJ`: strings interleaved with kerning in thousandths of text space.
    fn show_array(&mut self, elements: &[PdfValue]) {
        let mut buf = String::new();
        let mut origin = self.rendering_matrix();

        for elem in elements {
            if let PdfValue::Str(_) = elem {
                let fragment = self.decode(elem);
                if buf.is_empty() {
                    origin = self.rendering_matrix();
                }
                let dx = self.text.displacement(&fragment);
                buf.push_str(&fragment);
                self.text.advance(dx);
            } else if let Some(adj) = get_number_from_value(elem) {
                let dx = -adj / 1000.0 * self.text.font_size * self.text.horiz_scale;
                if dx > self.text.glyph_advance() * TJ_SPACE_RATIO
                    && !buf.is_empty()
                    && !buf.ends_with(' ')
                {
                    buf.push(' ');
                }
                self.text.advance(dx);
            }
        }

        self.push_run(buf, origin);
    }

    fn number(operands: &[PdfValue], idx: usize) -> Option<f32> {
        operands.get(idx).and_then(get_number_from_value)
    }

    fn apply(&mut self, operator: &str, operands: &[PdfValue]) {
        match operator {
            // -- Graphics state -----------------------------------------
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(m) = self.saved.pop() {
                    self.ctm = m;
                }
            }
            "cm" => {
                if let Some(m) = matrix_from(operands) {
                    self.ctm = concat(&m, &self.ctm);
                }
            }

            // -- Text objects -------------------------------------------
            "BT" => {
                self.text.text_matrix = IDENTITY_MATRIX;
                self.text.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {}
            "Tf" => {
                if let (Some(PdfValue::Name(key)), Some(size)) =
                    (operands.first(), Self::number(operands, 1))
                {
                    self.text.font_key = key.clone();
                    self.text.font_size = size;
                }
            }
            "Tm" => {
                if let Some(m) = matrix_from(operands) {
                    self.text.text_matrix = m;
                    self.text.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (Self::number(operands, 0), Self::number(operands, 1)) {
                    self.text.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (Self::number(operands, 0), Self::number(operands, 1)) {
                    self.text.leading = -ty;
                    self.text.translate_line(tx, ty);
                }
            }
            "T*" => self.text.next_line(),
            "TL" => {
                if let Some(v) = Self::number(operands, 0) {
                    self.text.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = Self::number(operands, 0) {
                    self.text.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = Self::number(operands, 0) {
                    self.text.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = Self::number(operands, 0) {
                    self.text.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = Self::number(operands, 0) {
                    self.text.text_rise = v;
                }
            }

            // -- Showing text -------------------------------------------
            "Tj" => {
                if let Some(first) = operands.first() {
                    self.show(first);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = operands.first() {
                    self.show_array(arr);
                }
            }
            "'" => {
                self.text.next_line();
                if let Some(first) = operands.first() {
                    self.show(first);
                }
            }
            "\"" => {
                if operands.len() >= 3 {
                    if let Some(aw) = Self::number(operands, 0) {
                        self.text.word_spacing = aw;
                    }
                    if let Some(ac) = Self::number(operands, 1) {
                        self.text.char_spacing = ac;
                    }
                    self.text.next_line();
                    self.show(&operands[2]);
                }
            }

            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk one page's content stream and collect its text runs.
pub fn extract_page_runs(backend: &dyn PdfBackend, page: PageId) -> Result<Vec<TextRun>, PdfError> {
    let raw = backend.page_content(page)?;
    let ops = backend.decode_content(&raw)?;
    let fonts = backend.page_fonts(page).unwrap_or_default();

    let mut interpreter = Interpreter::new(&fonts);
    for op in &ops {
        interpreter.apply(&op.operator, &op.operands);
    }

    Ok(interpreter.runs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use super::super::backend::ContentOp;
    use super::*;

    /// Mock backend serving the same pre-decoded operations for every page.
    pub(crate) struct MockBackend {
        pub page_ids: BTreeMap<u32, PageId>,
        pub fonts: Vec<FontInfo>,
        pub ops: Vec<ContentOp>,
    }

    impl PdfBackend for MockBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            self.page_ids.clone()
        }

        fn page_fonts(&self, _page: PageId) -> Result<Vec<FontInfo>, PdfError> {
            Ok(self.fonts.clone())
        }

        fn page_content(&self, _page: PageId) -> Result<Vec<u8>, PdfError> {
            Ok(vec![])
        }

        fn decode_content(&self, _data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
            Ok(self.ops.clone())
        }
    }

    pub(crate) fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp {
            operator: operator.to_string(),
            operands,
        }
    }

    pub(crate) fn helvetica() -> Vec<FontInfo> {
        vec![FontInfo {
            name: b"F1".to_vec(),
            encoding: Some("WinAnsiEncoding".to_string()),
            to_unicode: None,
        }]
    }

    pub(crate) fn page_ids(n: u32) -> BTreeMap<u32, PageId> {
        (1..=n).map(|i| (i, (i + 10, 0))).collect()
    }

    pub(crate) fn tf(size: f32) -> ContentOp {
        op("Tf", vec![PdfValue::Name(b"F1".to_vec()), PdfValue::Real(size)])
    }

    pub(crate) fn tm(x: f32, y: f32) -> ContentOp {
        op(
            "Tm",
            [1.0, 0.0, 0.0, 1.0, x, y]
                .into_iter()
                .map(PdfValue::Real)
                .collect(),
        )
    }

    pub(crate) fn tj(text: &str) -> ContentOp {
        op("Tj", vec![PdfValue::Str(text.as_bytes().to_vec())])
    }

    fn td(tx: f32, ty: f32) -> ContentOp {
        op("Td", vec![PdfValue::Real(tx), PdfValue::Real(ty)])
    }

    fn run_ops(ops: Vec<ContentOp>) -> Vec<TextRun> {
        let backend = MockBackend {
            page_ids: page_ids(1),
            fonts: helvetica(),
            ops,
        };
        extract_page_runs(&backend, (11, 0)).unwrap()
    }

    #[test]
    fn test_simple_tj_position() {
        let runs = run_ops(vec![
            op("BT", vec![]),
            tf(12.0),
            tm(72.0, 700.0),
            tj("03/14/2023 10:15 AM - Alice"),
            op("ET", vec![]),
        ]);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "03/14/2023 10:15 AM - Alice");
        assert!((runs[0].x - 72.0).abs() < 0.01);
        assert!((runs[0].y - 700.0).abs() < 0.01);
        assert!((runs[0].font_size - 12.0).abs() < 0.01);
    }

    #[test]
    fn test_td_moves_down_a_line() {
        let runs = run_ops(vec![
            op("BT", vec![]),
            tf(12.0),
            td(72.0, 700.0),
            tj("first"),
            td(0.0, -14.0),
            tj("second"),
            op("ET", vec![]),
        ]);
        assert_eq!(runs.len(), 2);
        assert!((runs[1].y - 686.0).abs() < 0.01);
        assert!((runs[1].x - 72.0).abs() < 0.01);
    }

    #[test]
    fn test_tl_and_t_star() {
        let runs = run_ops(vec![
            op("BT", vec![]),
            tf(10.0),
            op("TL", vec![PdfValue::Real(12.0)]),
            tm(50.0, 500.0),
            tj("one"),
            op("T*", vec![]),
            tj("two"),
            op("ET", vec![]),
        ]);
        assert!((runs[1].y - 488.0).abs() < 0.01);
    }

    #[test]
    fn test_single_quote_operator_moves_then_shows() {
        let runs = run_ops(vec![
            op("BT", vec![]),
            tf(10.0),
            op("TL", vec![PdfValue::Real(15.0)]),
            tm(50.0, 500.0),
            op("'", vec![PdfValue::Str(b"next".to_vec())]),
            op("ET", vec![]),
        ]);
        assert_eq!(runs[0].text, "next");
        assert!((runs[0].y - 485.0).abs() < 0.01);
    }

    #[test]
    fn test_tj_array_large_kerning_inserts_space() {
        let runs = run_ops(vec![
            op("BT", vec![]),
            tf(12.0),
            tm(72.0, 700.0),
            op(
                "TJ",
                vec![PdfValue::Array(vec![
                    PdfValue::Str(b"Page".to_vec()),
                    PdfValue::Integer(-300),
                    PdfValue::Str(b"1".to_vec()),
                    PdfValue::Integer(-20),
                    PdfValue::Str(b"0".to_vec()),
                ])],
            ),
            op("ET", vec![]),
        ]);
        assert_eq!(runs[0].text, "Page 10");
    }

    #[test]
    fn test_cm_flip_is_applied() {
        // A top-down coordinate system: y' = 792 - y.
        let runs = run_ops(vec![
            op("q", vec![]),
            op(
                "cm",
                [1.0, 0.0, 0.0, -1.0, 0.0, 792.0]
                    .into_iter()
                    .map(PdfValue::Real)
                    .collect(),
            ),
            op("BT", vec![]),
            tf(12.0),
            op(
                "Tm",
                [1.0, 0.0, 0.0, -1.0, 72.0, 100.0]
                    .into_iter()
                    .map(PdfValue::Real)
                    .collect(),
            ),
            tj("top line"),
            op("ET", vec![]),
            op("Q", vec![]),
        ]);
        assert!((runs[0].y - 692.0).abs() < 0.01);
        assert!((runs[0].font_size - 12.0).abs() < 0.01);
    }

    #[test]
    fn test_q_restores_ctm() {
        let runs = run_ops(vec![
            op("q", vec![]),
            op(
                "cm",
                [1.0, 0.0, 0.0, 1.0, 0.0, 100.0]
                    .into_iter()
                    .map(PdfValue::Real)
                    .collect(),
            ),
            op("Q", vec![]),
            op("BT", vec![]),
            tf(12.0),
            tm(10.0, 10.0),
            tj("x"),
            op("ET", vec![]),
        ]);
        assert!((runs[0].y - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_blank_strings_are_ignored() {
        let runs = run_ops(vec![op("BT", vec![]), tf(12.0), tj("   "), op("ET", vec![])]);
        assert!(runs.is_empty());
    }

    #[test]
    fn test_concat_identity() {
        let m = [2.0, 0.0, 0.0, 3.0, 5.0, 7.0];
        assert_eq!(concat(&m, &IDENTITY_MATRIX), m);
        assert_eq!(concat(&IDENTITY_MATRIX, &m), m);
    }
}

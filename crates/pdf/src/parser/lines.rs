//! Text runs -> reading-order rows -> page lines.
//!
//! ```text
//! TextRun[]  ->  Row[]            ->  String[] (with "" paragraph breaks)
//!                group_runs_into_rows  layout_page_lines
//! ```
//!
//! Blank lines are synthesized where the vertical gap between two rows is
//! clearly wider than the document's usual line spacing. Downstream
//! segmentation relies on those blanks, so the threshold is derived from
//! document-wide statistics rather than a fixed constant.

use std::collections::HashMap;

use super::spans::TextRun;
use crate::cleanup::clean_line;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One visual row of text on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
}

/// Line-spacing statistics gathered across every page of a document.
#[derive(Debug, Clone, Default)]
pub struct LeadingStatistics {
    /// Most common baseline-to-baseline distance, if any page has two rows.
    pub typical_gap: Option<f32>,
}

impl LeadingStatistics {
    /// Gap above which two rows are separated by a blank line.
    pub fn paragraph_threshold(&self, font_size: f32) -> f32 {
        let fs = if font_size > 0.0 { font_size } else { DEFAULT_FONT_SIZE };
        match self.typical_gap {
            Some(gap) => (gap * PARAGRAPH_GAP_RATIO).clamp(fs * 1.2, fs * 2.0),
            None => fs * FALLBACK_GAP_FACTOR,
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Runs whose baselines differ by less than this share a row.
const Y_TOLERANCE: f32 = 2.0;

/// Minimum horizontal gap (points) between runs before a space is inserted.
const MIN_WORD_GAP: f32 = 1.5;

/// A gap this many times the typical line spacing is a paragraph break.
const PARAGRAPH_GAP_RATIO: f32 = 1.5;

/// Used when the document has no repeated line spacing to learn from.
const FALLBACK_GAP_FACTOR: f32 = 1.4;

const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Histogram bucket width for gap statistics (points).
const GAP_BUCKET: f32 = 0.5;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Group runs into rows, top of page first, each row read left to right.
pub fn group_runs_into_rows(mut runs: Vec<TextRun>) -> Vec<Row> {
    if runs.is_empty() {
        return Vec::new();
    }

    runs.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut rows = Vec::new();
    let mut current: Vec<TextRun> = Vec::new();
    let mut current_y = runs[0].y;

    for run in runs {
        if (run.y - current_y).abs() > Y_TOLERANCE && !current.is_empty() {
            rows.extend(assemble_row(std::mem::take(&mut current)));
            current_y = run.y;
        }
        current.push(run);
    }
    rows.extend(assemble_row(current));

    rows
}

/// Join runs sharing a baseline. Returns `None` when nothing visible is left.
fn assemble_row(mut runs: Vec<TextRun>) -> Option<Row> {
    runs.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let first = runs.first()?;
    let (x, y) = (first.x, first.y);
    let mut text = String::new();
    let mut prev_end: Option<f32> = None;
    let mut sizes: HashMap<i32, usize> = HashMap::new();

    for run in &runs {
        if let Some(end) = prev_end {
            let gap = run.x - end;
            let joined = text.ends_with(' ') || run.text.starts_with(' ');
            if gap >= MIN_WORD_GAP && !joined {
                text.push(' ');
            }
        }
        text.push_str(&run.text);
        prev_end = Some(run.x + run.width);
        *sizes.entry((run.font_size * 100.0).round() as i32).or_insert(0) +=
            run.text.chars().count();
    }

    let text = clean_line(&text);
    if text.is_empty() {
        return None;
    }

    let font_size = sizes
        .into_iter()
        .max_by_key(|(size, count)| (*count, *size))
        .map(|(size, _)| size as f32 / 100.0)
        .unwrap_or(DEFAULT_FONT_SIZE);

    Some(Row {
        text,
        x,
        y,
        font_size,
    })
}

/// Most common row-to-row distance across all pages; ties favour the smaller gap.
pub fn leading_statistics(pages: &[Vec<Row>]) -> LeadingStatistics {
    let mut histogram: HashMap<i32, usize> = HashMap::new();

    for rows in pages {
        for pair in rows.windows(2) {
            let gap = pair[0].y - pair[1].y;
            if gap <= 0.0 || gap > pair[0].font_size.max(DEFAULT_FONT_SIZE) * 4.0 {
                continue;
            }
            let key = (gap / GAP_BUCKET).round() as i32;
            *histogram.entry(key).or_insert(0) += 1;
        }
    }

    let typical_gap = histogram
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(key, _)| key as f32 * GAP_BUCKET);

    LeadingStatistics { typical_gap }
}

/// Page rows -> line strings, with `""` marking paragraph breaks.
pub fn layout_page_lines(rows: &[Row], stats: &LeadingStatistics) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            let prev = &rows[i - 1];
            if prev.y - row.y > stats.paragraph_threshold(prev.font_size) {
                lines.push(String::new());
            }
        }
        lines.push(row.text.clone());
    }
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, x: f32, y: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            x,
            y,
            width: text.chars().count() as f32 * 6.0,
            font_size: 12.0,
        }
    }

    fn row(text: &str, y: f32) -> Row {
        Row {
            text: text.to_string(),
            x: 72.0,
            y,
            font_size: 12.0,
        }
    }

    #[test]
    fn test_runs_on_same_baseline_join_with_space() {
        let rows = group_runs_into_rows(vec![run("World", 110.0, 700.0), run("Hello", 72.0, 700.0)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, "Hello World");
    }

    #[test]
    fn test_adjacent_runs_join_without_space() {
        // "Hel" ends at 72 + 18 = 90.
        let rows = group_runs_into_rows(vec![run("Hel", 72.0, 700.0), run("lo", 90.0, 700.0)]);
        assert_eq!(rows[0].text, "Hello");
    }

    #[test]
    fn test_rows_ordered_top_to_bottom() {
        let rows = group_runs_into_rows(vec![
            run("bottom", 72.0, 600.0),
            run("top", 72.0, 700.0),
            run("middle", 72.0, 650.0),
        ]);
        let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["top", "middle", "bottom"]);
    }

    #[test]
    fn test_baseline_tolerance() {
        let rows = group_runs_into_rows(vec![run("a", 72.0, 700.0), run("b", 200.0, 698.5)]);
        assert_eq!(rows.len(), 1);
        let rows = group_runs_into_rows(vec![run("a", 72.0, 700.0), run("b", 200.0, 695.0)]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_empty_runs() {
        assert!(group_runs_into_rows(vec![]).is_empty());
    }

    #[test]
    fn test_leading_statistics_prefers_common_gap() {
        let page = vec![
            row("a", 700.0),
            row("b", 686.0),
            row("c", 672.0),
            row("d", 644.0),
            row("e", 630.0),
        ];
        let stats = leading_statistics(&[page]);
        assert_eq!(stats.typical_gap, Some(14.0));
    }

    #[test]
    fn test_leading_statistics_tie_picks_smaller_gap() {
        let page = vec![row("a", 700.0), row("b", 686.0), row("c", 658.0)];
        assert_eq!(leading_statistics(&[page]).typical_gap, Some(14.0));
    }

    #[test]
    fn test_leading_statistics_empty() {
        assert_eq!(leading_statistics(&[]).typical_gap, None);
    }

    #[test]
    fn test_layout_inserts_blank_for_paragraph_gap() {
        let rows = vec![
            row("03/14/2023 10:15 AM - Alice", 700.0),
            row("See you at pickup.", 686.0),
            row("03/14/2023 10:20 AM - Bob", 658.0),
            row("Sounds good.", 644.0),
        ];
        let stats = leading_statistics(&[rows.clone()]);
        let lines = layout_page_lines(&rows, &stats);
        assert_eq!(
            lines,
            vec![
                "03/14/2023 10:15 AM - Alice",
                "See you at pickup.",
                "",
                "03/14/2023 10:20 AM - Bob",
                "Sounds good.",
            ]
        );
    }

    #[test]
    fn test_threshold_without_statistics() {
        let stats = LeadingStatistics::default();
        assert!((stats.paragraph_threshold(10.0) - 14.0).abs() < 0.01);
    }

    #[test]
    fn test_threshold_is_clamped_to_font_size() {
        let stats = LeadingStatistics {
            typical_gap: Some(4.0),
        };
        assert!((stats.paragraph_threshold(12.0) - 14.4).abs() < 0.01);
    }
}

use serde::Serialize;

/// One line of extracted text.
///
/// `index` is the line's position on its page *as extracted*, before any
/// filtering. Gaps in `index` between two surviving lines therefore mean
/// something was removed between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    /// 1-based page number.
    pub page: usize,
    /// 0-based position within the page.
    pub index: usize,
    pub text: String,
}

impl Line {
    pub fn new(page: usize, index: usize, text: impl Into<String>) -> Self {
        Self {
            page,
            index,
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// True when `next` directly follows `self` in the extracted text.
    pub fn is_source_predecessor_of(&self, next: &Line) -> bool {
        self.page == next.page && self.index + 1 == next.index
    }

    /// Flatten `(page number, page lines)` pairs into one line sequence.
    pub fn collect<P, L, S>(pages: P) -> Vec<Line>
    where
        P: IntoIterator<Item = (usize, L)>,
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        pages
            .into_iter()
            .flat_map(|(page, lines)| {
                lines
                    .into_iter()
                    .enumerate()
                    .map(move |(index, text)| Line::new(page, index, text))
            })
            .collect()
    }
}

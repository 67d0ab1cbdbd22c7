//! Message segmentation.
//!
//! The export has no unambiguous message delimiter. A line opens a new
//! message when it parses as a header *and* it is anchored: see
//! [`is_boundary_anchor`]. Quoted or forwarded headers inside a body sit
//! directly under other body text and are therefore read as body.

use serde::Serialize;

use crate::config::SegmentConfig;
use crate::error::SplitWarning;
use crate::header::HeaderMatcher;
use crate::line::Line;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Starts with a header line.
    Headed,
    /// The whole document, because no header was found.
    Unsegmented,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageBlock {
    pub kind: BlockKind,
    pub lines: Vec<Line>,
}

impl MessageBlock {
    /// Page of the block's first line.
    pub fn page(&self) -> Option<usize> {
        self.lines.first().map(|l| l.page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Segmentation {
    /// Lines before the first accepted header. Empty when unsegmented.
    pub preamble: Vec<Line>,
    pub blocks: Vec<MessageBlock>,
    pub warnings: Vec<SplitWarning>,
    /// Header-shaped lines rejected because they were not anchored.
    pub unanchored_headers: usize,
}

impl Segmentation {
    pub fn header_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Headed)
            .count()
    }

    /// Preamble followed by every block, in document order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.preamble
            .iter()
            .chain(self.blocks.iter().flat_map(|b| b.lines.iter()))
    }
}

/// Whether `candidate`, already known to parse as a header, starts a message.
///
/// True when any of these holds:
/// - there is no previous line (start of document)
/// - the previous line is blank
/// - the previous line is on another page
/// - the previous line is not the candidate's source predecessor, meaning
///   the noise filter removed a structural marker between them
pub fn is_boundary_anchor(prev: Option<&Line>, candidate: &Line) -> bool {
    match prev {
        None => true,
        Some(prev) => prev.is_blank() || !prev.is_source_predecessor_of(candidate),
    }
}

/// Partition filtered lines into preamble and message blocks.
pub fn segment(lines: Vec<Line>, header: &HeaderMatcher, config: &SegmentConfig) -> Segmentation {
    let mut seg = Segmentation::default();
    let mut open: Option<MessageBlock> = None;
    let mut prev: Option<Line> = None;

    for line in lines {
        let parses = !line.is_blank() && header.is_header(&line.text);
        let is_boundary =
            parses && (!config.require_anchor || is_boundary_anchor(prev.as_ref(), &line));

        if parses && !is_boundary {
            log::debug!(
                "page {} line {}: unanchored header read as body: {:?}",
                line.page,
                line.index,
                line.text
            );
            seg.unanchored_headers += 1;
        } else if !parses && !line.is_blank() && header.looks_like_header(&line.text) {
            log::warn!(
                "page {} line {}: header-shaped line with invalid timestamp kept as body: {:?}",
                line.page,
                line.index,
                line.text
            );
        }

        prev = Some(line.clone());

        if is_boundary {
            if let Some(block) = open.take() {
                seg.blocks.push(block);
            }
            open = Some(MessageBlock {
                kind: BlockKind::Headed,
                lines: vec![line],
            });
        } else if let Some(block) = open.as_mut() {
            block.lines.push(line);
        } else {
            seg.preamble.push(line);
        }
    }

    if let Some(block) = open.take() {
        seg.blocks.push(block);
    }

    let headers = seg.header_count();
    if headers == 0 && !seg.preamble.is_empty() {
        seg.blocks.push(MessageBlock {
            kind: BlockKind::Unsegmented,
            lines: std::mem::take(&mut seg.preamble),
        });
    }

    if headers <= 1 {
        seg.warnings
            .push(SplitWarning::LowConfidenceSegmentation { headers });
    }

    let unattributed = seg.preamble.iter().filter(|l| !l.is_blank()).count();
    if unattributed > 0 {
        seg.warnings
            .push(SplitWarning::UnattributedPreamble { lines: unattributed });
    }

    log::debug!(
        "segmented into {} block(s), {} preamble line(s), {} unanchored header(s)",
        seg.blocks.len(),
        seg.preamble.len(),
        seg.unanchored_headers
    );

    seg
}

//! Boilerplate removal.
//!
//! Two passes over the whole document:
//!
//! 1. Count, for every `(page edge, offset from edge, normalized text)` key,
//!    how many pages show that text at that position.
//! 2. Drop edge lines whose key repeats on enough pages, edge lines matching
//!    a fixed structural marker, anchored markers and message counters sitting
//!    right before a header, and blank lines left at the top or bottom of a
//!    page.
//!
//! Only the first/last `edge_lines` non-blank lines of a page are eligible for
//! boilerplate removal. Lines that parse as message headers are always kept.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Range;

use regex::Regex;
use serde::Serialize;

use crate::header::HeaderMatcher;
use crate::line::Line;
use crate::segment::is_boundary_anchor;

/// Compiled noise settings. Built by [`crate::config::SplitConfig::compile`].
#[derive(Debug, Clone)]
pub struct NoiseRules {
    pub edge_lines: usize,
    pub min_repeat_pages: usize,
    pub repeat_ratio: f64,
    pub markers: Vec<Regex>,
    pub counter: Regex,
}

impl NoiseRules {
    /// Pages a key must appear on before it counts as boilerplate.
    ///
    /// Never below three pages when the document has that many. A two-page
    /// export still needs only two, so an identical line at the same edge
    /// offset on both pages is dropped.
    pub fn repeat_threshold(&self, pages: usize) -> usize {
        let by_ratio = (pages as f64 * self.repeat_ratio).ceil() as usize;
        self.min_repeat_pages.max(by_ratio).max(pages.min(3))
    }

    fn is_marker(&self, text: &str) -> bool {
        let text = text.trim();
        self.markers.iter().any(|re| re.is_match(text))
    }

    fn counter(&self, line: &Line) -> Option<MessageCounter> {
        let caps = self.counter.captures(line.text.trim())?;
        let total = caps.name("total")?.as_str().parse().ok()?;
        let number = caps.name("number").and_then(|m| m.as_str().parse().ok());
        Some(MessageCounter {
            number,
            total,
            page: line.page,
        })
    }
}

/// A "Message N of M" line taken out of the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageCounter {
    pub number: Option<usize>,
    pub total: usize,
    pub page: usize,
}

/// What the filter removed, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub pages: usize,
    pub repeated: usize,
    pub markers: usize,
    pub blank_edges: usize,
    pub counters: Vec<MessageCounter>,
}

impl FilterReport {
    pub fn removed(&self) -> usize {
        self.repeated + self.markers + self.blank_edges + self.counters.len()
    }

    /// Distinct reported totals, in order of first appearance.
    pub fn reported_totals(&self) -> Vec<usize> {
        let mut totals = Vec::new();
        for counter in &self.counters {
            if !totals.contains(&counter.total) {
                totals.push(counter.total);
            }
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredLines {
    pub lines: Vec<Line>,
    pub report: FilterReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Edge {
    Top,
    Bottom,
}

type EdgeKey = (Edge, usize, String);

pub fn filter_noise(lines: Vec<Line>, rules: &NoiseRules, header: &HeaderMatcher) -> FilteredLines {
    let pages = page_ranges(&lines);
    let edges = edge_positions(&lines, &pages, rules.edge_lines);
    let is_header: Vec<bool> = lines
        .iter()
        .map(|l| !l.is_blank() && header.is_header(&l.text))
        .collect();

    let repeated = repeated_keys(&lines, &edges, &is_header, rules.repeat_threshold(pages.len()), pages.len());

    let mut report = FilterReport {
        pages: pages.len(),
        ..FilterReport::default()
    };
    let mut keep = vec![true; lines.len()];

    for (i, line) in lines.iter().enumerate() {
        if line.is_blank() || is_header[i] {
            continue;
        }

        // Mid-page markers and counters go only when they are anchored themselves.
        let prev_kept = (0..i).rev().find(|&j| keep[j]).map(|j| &lines[j]);
        let before_header = lines[i + 1..]
            .iter()
            .position(|l| !l.is_blank())
            .is_some_and(|offset| is_header[i + 1 + offset])
            && is_boundary_anchor(prev_kept, line);

        if before_header {
            if let Some(counter) = rules.counter(line) {
                keep[i] = false;
                report.counters.push(counter);
                continue;
            }
        }

        let in_edge = !edges[i].is_empty();
        if (in_edge || before_header) && rules.is_marker(&line.text) {
            keep[i] = false;
            report.markers += 1;
            continue;
        }

        if in_edge {
            let normalized = normalize(&line.text);
            let hit = edges[i]
                .iter()
                .any(|&(edge, offset)| repeated.contains(&(edge, offset, normalized.clone())));
            if hit {
                keep[i] = false;
                report.repeated += 1;
            }
        }
    }

    for range in &pages {
        let kept: Vec<usize> = range.clone().filter(|&i| keep[i]).collect();
        for &i in kept.iter().take_while(|&&i| lines[i].is_blank()) {
            keep[i] = false;
            report.blank_edges += 1;
        }
        if kept.iter().all(|&i| lines[i].is_blank()) {
            continue;
        }
        for &i in kept.iter().rev().take_while(|&&i| lines[i].is_blank()) {
            keep[i] = false;
            report.blank_edges += 1;
        }
    }

    log::debug!(
        "noise filter: {} page(s), removed {} repeated, {} marker(s), {} counter(s), {} edge blank(s)",
        report.pages,
        report.repeated,
        report.markers,
        report.counters.len(),
        report.blank_edges
    );

    let lines = lines
        .into_iter()
        .zip(keep)
        .filter_map(|(line, keep)| keep.then_some(line))
        .collect();

    FilteredLines { lines, report }
}

/// Contiguous index ranges of lines sharing a page.
fn page_ranges(lines: &[Line]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for i in 1..=lines.len() {
        if i == lines.len() || lines[i].page != lines[start].page {
            if start < i {
                ranges.push(start..i);
            }
            start = i;
        }
    }
    ranges
}

/// For each line, the edge windows it falls into. A line on a short page can
/// sit in both the top and the bottom window.
fn edge_positions(lines: &[Line], pages: &[Range<usize>], edge_lines: usize) -> Vec<Vec<(Edge, usize)>> {
    let mut edges = vec![Vec::new(); lines.len()];
    for range in pages {
        let non_blank: Vec<usize> = range.clone().filter(|&i| !lines[i].is_blank()).collect();
        for (offset, &i) in non_blank.iter().take(edge_lines).enumerate() {
            edges[i].push((Edge::Top, offset));
        }
        for (offset, &i) in non_blank.iter().rev().take(edge_lines).enumerate() {
            edges[i].push((Edge::Bottom, offset));
        }
    }
    edges
}

fn repeated_keys(
    lines: &[Line],
    edges: &[Vec<(Edge, usize)>],
    is_header: &[bool],
    threshold: usize,
    page_count: usize,
) -> HashSet<EdgeKey> {
    if page_count < 2 {
        return HashSet::new();
    }

    let mut seen: HashMap<EdgeKey, BTreeSet<usize>> = HashMap::new();
    for (i, line) in lines.iter().enumerate() {
        if is_header[i] || line.is_blank() {
            continue;
        }
        let normalized = normalize(&line.text);
        for &(edge, offset) in &edges[i] {
            seen.entry((edge, offset, normalized.clone()))
                .or_default()
                .insert(line.page);
        }
    }

    seen.into_iter()
        .filter(|(_, pages)| pages.len() >= threshold)
        .map(|(key, _)| key)
        .collect()
}

/// Lowercase, collapse whitespace, and fold digits so that "Page 1" and
/// "Page 2" share a key.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_digit() { '#' } else { c })
        .collect()
}

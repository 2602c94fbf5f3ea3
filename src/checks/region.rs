//! Region extraction.
//!
//! Pure, line-based carving of a sub-span out of artifact text. The same
//! selector over the same text always yields the same region.

use serde::Deserialize;

use crate::checks::pattern::Pattern;

fn default_inclusive() -> bool {
    true
}

/// Rule for carving a bounded sub-span out of artifact text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionSelector {
    /// The entire artifact.
    #[default]
    WholeFile,
    /// From the first line matching `start` to the first later line matching
    /// `end`; runs to end-of-file when `end` never occurs.
    AnchoredBlock {
        start: String,
        end: String,
        #[serde(default = "default_inclusive")]
        inclusive: bool,
        #[serde(default)]
        ignore_case: bool,
        /// Cut the block after this many lines, counted from the start line.
        #[serde(default)]
        max_lines: Option<usize>,
    },
    /// `window_lines` lines starting at the first line matching `signature`.
    FunctionScope {
        signature: String,
        window_lines: usize,
        #[serde(default)]
        ignore_case: bool,
    },
}

impl RegionSelector {
    pub fn anchored(start: &str, end: &str, inclusive: bool) -> Self {
        RegionSelector::AnchoredBlock {
            start: start.to_string(),
            end: end.to_string(),
            inclusive,
            ignore_case: false,
            max_lines: None,
        }
    }

    pub fn function_scope(signature: &str, window_lines: usize) -> Self {
        RegionSelector::FunctionScope {
            signature: signature.to_string(),
            window_lines,
            ignore_case: false,
        }
    }

    /// Make anchor matching case-insensitive.
    pub fn ignore_case(mut self) -> Self {
        match &mut self {
            RegionSelector::WholeFile => {}
            RegionSelector::AnchoredBlock { ignore_case, .. }
            | RegionSelector::FunctionScope { ignore_case, .. } => *ignore_case = true,
        }
        self
    }

    /// Cap an anchored block at `lines` lines. No effect on other selectors.
    pub fn max_lines(mut self, lines: usize) -> Self {
        if let RegionSelector::AnchoredBlock { max_lines, .. } = &mut self {
            *max_lines = Some(lines);
        }
        self
    }

    /// Short human-readable form for `--list` and verbose output.
    pub fn describe(&self) -> String {
        match self {
            RegionSelector::WholeFile => "whole file".to_string(),
            RegionSelector::AnchoredBlock {
                start,
                end,
                inclusive,
                max_lines,
                ..
            } => {
                let bounds = if *inclusive { "inclusive" } else { "exclusive" };
                match max_lines {
                    Some(n) => format!("block '{}'..'{}' ({}, max {} lines)", start, end, bounds, n),
                    None => format!("block '{}'..'{}' ({})", start, end, bounds),
                }
            }
            RegionSelector::FunctionScope {
                signature,
                window_lines,
                ..
            } => format!("{} lines from '{}'", window_lines, signature),
        }
    }
}

/// An extracted span of artifact text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    text: String,
    start_line: Option<usize>,
    anchor: Option<String>,
    found: bool,
}

impl Region {
    fn whole(text: &str) -> Self {
        Region {
            text: text.to_string(),
            start_line: Some(1),
            anchor: None,
            found: true,
        }
    }

    fn lines(lines: &[&str], first_index: usize, anchor: &str) -> Self {
        Region {
            text: lines.join("\n"),
            start_line: Some(first_index + 1),
            anchor: Some(anchor.to_string()),
            found: true,
        }
    }

    fn missing(anchor: &str) -> Self {
        Region {
            text: String::new(),
            start_line: None,
            anchor: Some(anchor.to_string()),
            found: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// One-based line number of the first line of the region in the artifact.
    pub fn start_line(&self) -> Option<usize> {
        self.start_line
    }

    /// False when the selector's anchor never occurred; the region is empty.
    pub fn is_found(&self) -> bool {
        self.found
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

fn compile(marker: &str, ignore_case: bool) -> Pattern {
    if ignore_case {
        Pattern::new_ignore_case(marker)
    } else {
        Pattern::new(marker)
    }
}

/// Carve the region `selector` describes out of `text`.
///
/// Never fails: an absent anchor yields an empty, not-found region and the
/// predicate decides what that means.
pub fn extract(selector: &RegionSelector, text: &str) -> Region {
    match selector {
        RegionSelector::WholeFile => Region::whole(text),
        RegionSelector::AnchoredBlock {
            start,
            end,
            inclusive,
            ignore_case,
            max_lines,
        } => {
            let lines: Vec<&str> = text.lines().collect();
            let start_pattern = compile(start, *ignore_case);
            let end_pattern = compile(end, *ignore_case);

            let Some(first) = lines.iter().position(|l| start_pattern.matches_line(l)) else {
                return Region::missing(start);
            };

            let limit = match max_lines {
                Some(n) => first.saturating_add(*n).min(lines.len()),
                None => lines.len(),
            };

            let last = lines[first..limit]
                .iter()
                .skip(1)
                .position(|l| end_pattern.matches_line(l))
                .map(|offset| first + 1 + offset);

            let (from, to) = match (last, *inclusive) {
                (Some(last), true) => (first, last + 1),
                (Some(last), false) => (first + 1, last),
                (None, true) => (first, limit),
                (None, false) => ((first + 1).min(limit), limit),
            };

            Region::lines(&lines[from..to], from, start)
        }
        RegionSelector::FunctionScope {
            signature,
            window_lines,
            ignore_case,
        } => {
            let lines: Vec<&str> = text.lines().collect();
            let pattern = compile(signature, *ignore_case);

            match lines.iter().position(|l| pattern.matches_line(l)) {
                Some(first) => {
                    let to = first.saturating_add(*window_lines).min(lines.len());
                    Region::lines(&lines[first..to], first, signature)
                }
                None => Region::missing(signature),
            }
        }
    }
}

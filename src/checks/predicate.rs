//! Predicate evaluation.
//!
//! The matcher turns a region (and, for endpoints, a status code) into either
//! a pass message or a [`CheckError`] that names what was missing or
//! forbidden.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::checks::pattern::Pattern;
use crate::checks::region::Region;
use crate::CheckError;

/// What a predicate is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    pub region: &'a Region,
    /// Captured HTTP status for endpoint targets, `None` for files.
    pub status: Option<u16>,
}

type EvaluatorFn = dyn Fn(&Evidence<'_>) -> Result<String, String> + Send + Sync;

/// A named, code-defined predicate.
#[derive(Clone)]
pub struct CustomEvaluator {
    name: String,
    eval: Arc<EvaluatorFn>,
}

impl CustomEvaluator {
    pub fn new<F>(name: &str, eval: F) -> Self
    where
        F: Fn(&Evidence<'_>) -> Result<String, String> + Send + Sync + 'static,
    {
        CustomEvaluator {
            name: name.to_string(),
            eval: Arc::new(eval),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEvaluator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Condition a check asserts over its region or response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Contains {
        pattern: String,
    },
    NotContains {
        pattern: String,
    },
    ContainsAllOf {
        patterns: Vec<String>,
    },
    ContainsNoneOf {
        patterns: Vec<String>,
    },
    JsonFieldPresent {
        path: String,
    },
    HttpStatusIn {
        codes: Vec<u16>,
    },
    /// Code-only; suite files cannot express it.
    #[serde(skip)]
    Custom {
        evaluator: CustomEvaluator,
    },
}

impl Predicate {
    pub fn contains(pattern: &str) -> Self {
        Predicate::Contains {
            pattern: pattern.to_string(),
        }
    }

    pub fn not_contains(pattern: &str) -> Self {
        Predicate::NotContains {
            pattern: pattern.to_string(),
        }
    }

    pub fn contains_all_of(patterns: &[&str]) -> Self {
        Predicate::ContainsAllOf {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn contains_none_of(patterns: &[&str]) -> Self {
        Predicate::ContainsNoneOf {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn json_field_present(path: &str) -> Self {
        Predicate::JsonFieldPresent {
            path: path.to_string(),
        }
    }

    pub fn http_status_in(codes: &[u16]) -> Self {
        Predicate::HttpStatusIn {
            codes: codes.to_vec(),
        }
    }

    pub fn custom<F>(name: &str, eval: F) -> Self
    where
        F: Fn(&Evidence<'_>) -> Result<String, String> + Send + Sync + 'static,
    {
        Predicate::Custom {
            evaluator: CustomEvaluator::new(name, eval),
        }
    }

    /// True for predicates that only look at the status code.
    pub fn is_status_only(&self) -> bool {
        matches!(self, Predicate::HttpStatusIn { .. })
    }

    /// True for predicates that read the response body or file text.
    pub fn reads_body(&self) -> bool {
        !matches!(
            self,
            Predicate::HttpStatusIn { .. } | Predicate::Custom { .. }
        )
    }

    /// Reject predicates that can never be evaluated meaningfully.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Predicate::Contains { pattern } | Predicate::NotContains { pattern } => {
                if pattern.is_empty() {
                    return Err("pattern must not be empty".to_string());
                }
            }
            Predicate::ContainsAllOf { patterns } | Predicate::ContainsNoneOf { patterns } => {
                if patterns.is_empty() {
                    return Err("pattern set must not be empty".to_string());
                }
                if patterns.iter().any(|p| p.is_empty()) {
                    return Err("pattern set contains an empty pattern".to_string());
                }
            }
            Predicate::JsonFieldPresent { path } => {
                parse_json_path(path)?;
            }
            Predicate::HttpStatusIn { codes } => {
                if codes.is_empty() {
                    return Err("status set must not be empty".to_string());
                }
                if let Some(code) = codes.iter().find(|c| !(100..=599).contains(*c)) {
                    return Err(format!("{} is not an HTTP status code", code));
                }
            }
            Predicate::Custom { .. } => {}
        }
        Ok(())
    }

    /// Short human-readable form for `--list` output.
    pub fn describe(&self) -> String {
        match self {
            Predicate::Contains { pattern } => format!("contains '{}'", pattern),
            Predicate::NotContains { pattern } => format!("does not contain '{}'", pattern),
            Predicate::ContainsAllOf { patterns } => {
                format!("contains all of [{}]", quote_list(patterns))
            }
            Predicate::ContainsNoneOf { patterns } => {
                format!("contains none of [{}]", quote_list(patterns))
            }
            Predicate::JsonFieldPresent { path } => format!("JSON field '{}' present", path),
            Predicate::HttpStatusIn { codes } => format!("status in {}", format_codes(codes)),
            Predicate::Custom { evaluator } => format!("custom '{}'", evaluator.name()),
        }
    }

    /// Evaluate against `evidence`. `Ok` carries the pass message.
    pub fn evaluate(&self, evidence: &Evidence<'_>) -> Result<String, CheckError> {
        let region = evidence.region;

        if self.reads_body() && !region.is_found() {
            return Err(CheckError::mismatch(format!(
                "region not found: anchor '{}' absent",
                region.anchor().unwrap_or_default()
            )));
        }

        match self {
            Predicate::Contains { pattern } => {
                let pattern = Pattern::new(pattern);
                match pattern.find_line(region.text()) {
                    Some(line) => Ok(format!(
                        "found '{}'{}",
                        pattern,
                        at_line(region, line)
                    )),
                    None => Err(CheckError::mismatch(format!("missing '{}'", pattern))),
                }
            }
            Predicate::NotContains { pattern } => {
                let pattern = Pattern::new(pattern);
                match pattern.find_line(region.text()) {
                    Some(line) => Err(CheckError::mismatch(format!(
                        "forbidden '{}' present{}",
                        pattern,
                        at_line(region, line)
                    ))),
                    None => Ok(format!("'{}' absent", pattern)),
                }
            }
            Predicate::ContainsAllOf { patterns } => {
                let missing: Vec<&String> = patterns
                    .iter()
                    .filter(|p| !Pattern::new(p).is_match(region.text()))
                    .collect();
                match missing.first() {
                    None => Ok(format!("all {} patterns present", patterns.len())),
                    Some(first) if missing.len() == 1 => {
                        Err(CheckError::mismatch(format!("missing '{}'", first)))
                    }
                    Some(first) => Err(CheckError::mismatch(format!(
                        "missing '{}' ({} of {} absent)",
                        first,
                        missing.len(),
                        patterns.len()
                    ))),
                }
            }
            Predicate::ContainsNoneOf { patterns } => {
                for raw in patterns {
                    let pattern = Pattern::new(raw);
                    if let Some(line) = pattern.find_line(region.text()) {
                        return Err(CheckError::mismatch(format!(
                            "forbidden '{}' present{}",
                            pattern,
                            at_line(region, line)
                        )));
                    }
                }
                Ok(format!("none of {} forbidden patterns present", patterns.len()))
            }
            Predicate::JsonFieldPresent { path } => {
                let segments = parse_json_path(path)
                    .map_err(|reason| CheckError::MalformedPayload { reason })?;
                let document: Value = serde_json::from_str(region.text()).map_err(|e| {
                    CheckError::MalformedPayload {
                        reason: format!("not valid JSON: {}", e),
                    }
                })?;
                match lookup(&document, &segments) {
                    Some(value) if !value.is_null() => Ok(format!("field '{}' present", path)),
                    Some(_) => Err(CheckError::mismatch(format!("field '{}' is null", path))),
                    None => Err(CheckError::mismatch(format!("missing field '{}'", path))),
                }
            }
            Predicate::HttpStatusIn { codes } => match evidence.status {
                Some(status) if codes.contains(&status) => Ok(format!("status {}", status)),
                Some(status) => Err(CheckError::mismatch(format!(
                    "status {} not in {}",
                    status,
                    format_codes(codes)
                ))),
                None => Err(CheckError::mismatch("no HTTP status captured")),
            },
            Predicate::Custom { evaluator } => {
                (evaluator.eval)(evidence).map_err(CheckError::mismatch)
            }
        }
    }
}

fn at_line(region: &Region, offset: usize) -> String {
    match region.start_line() {
        Some(start) => format!(" (line {})", start + offset),
        None => String::new(),
    }
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("'{}'", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_codes(codes: &[u16]) -> String {
    let list = codes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", list)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Parse `data.laps[0].time` into keys and indices.
fn parse_json_path(path: &str) -> Result<Vec<Segment>, String> {
    if path.is_empty() {
        return Err("JSON path must not be empty".to_string());
    }

    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return Err(format!("empty segment in JSON path '{}'", path));
        }
        let (key, mut rest) = match part.find('[') {
            Some(idx) => (&part[..idx], &part[idx..]),
            None => (part, ""),
        };
        if !key.is_empty() {
            segments.push(Segment::Key(key.to_string()));
        }
        while !rest.is_empty() {
            let close = rest
                .find(']')
                .ok_or_else(|| format!("unclosed '[' in JSON path '{}'", path))?;
            let index = rest[1..close]
                .parse::<usize>()
                .map_err(|_| format!("invalid index '{}' in JSON path '{}'", &rest[1..close], path))?;
            segments.push(Segment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(format!("unexpected '{}' in JSON path '{}'", rest, path));
            }
        }
    }
    Ok(segments)
}

fn lookup<'v>(value: &'v Value, segments: &[Segment]) -> Option<&'v Value> {
    segments.iter().try_fold(value, |current, segment| match segment {
        Segment::Key(key) => current.get(key.as_str()),
        Segment::Index(index) => current.get(*index),
    })
}

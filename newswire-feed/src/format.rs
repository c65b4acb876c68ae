//! Payload parsing policies
//!
//! A format strategy turns raw message bodies into storable records. Two
//! policies ship: [`Passthrough`] keeps bodies as-is and batches each day
//! into one digest record, [`WireReport`] recovers structured reports from
//! the ad hoc delimited wire format.

use std::collections::BTreeMap;

use newswire_core::{Entry, Record, Report, Section};
use regex::Regex;
use tracing::debug;

/// Boundary between the metadata and data sections of a wire report.
const SECTION_DELIMITER: &str = "-----";
/// Prefix opening an analyst comment line.
const COMMENT_MARKER: &str = "AC:";
/// Subsection whose comments additionally get the rollup list.
const ANALYST_SECTION: &str = "analyst comments";

/// Policy turning raw bodies into records.
pub trait FormatStrategy: Send + Sync {
    /// Parse one body. `None` drops the body; malformed input is a
    /// recoverable per-item skip, never an error.
    fn format(&self, body: &str) -> Option<Record>;

    /// Fold one day's records into the units that get stored.
    fn finalize_day(&self, records: Vec<Record>) -> Vec<Record> {
        records
    }
}

/// Keep raw bodies untouched, batching each day into a single digest record.
#[derive(Debug, Default)]
pub struct Passthrough;

impl FormatStrategy for Passthrough {
    fn format(&self, body: &str) -> Option<Record> {
        if body.trim().is_empty() {
            return None;
        }
        Some(Record::text(body))
    }

    fn finalize_day(&self, records: Vec<Record>) -> Vec<Record> {
        let texts: Vec<String> = records
            .into_iter()
            .filter_map(|record| match record {
                Record::Text { text } => Some(text),
                _ => None,
            })
            .collect();
        if texts.is_empty() {
            Vec::new()
        } else {
            vec![Record::digest(texts)]
        }
    }
}

/// Structured parser for the delimited wire-report format.
///
/// A well-formed body looks like:
///
/// ```text
/// //The Wire//
/// DTG: 121900ZDEC23
/// Precedence: ROUTINE
/// -----
/// -International Events-
/// Ceasefire talks resume in the region.
/// -Analyst Comments-
/// AC: The timing suggests coordination
///     with the earlier announcement.
/// ```
///
/// A body missing the delimiter or containing no named subsections yields no
/// record.
#[derive(Debug, Default)]
pub struct WireReport;

impl FormatStrategy for WireReport {
    fn format(&self, body: &str) -> Option<Record> {
        let Some((meta_part, data_part)) = body.split_once(SECTION_DELIMITER) else {
            debug!("body missing section delimiter, skipping");
            return None;
        };
        let metadata = parse_metadata(meta_part);
        let sections = parse_sections(data_part)?;
        Some(Record::Report(Report { metadata, sections }))
    }
}

/// Collect `key: value` lines into a mapping. Lines without a colon are
/// skipped.
fn parse_metadata(text: &str) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                metadata.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => debug!(line, "metadata line without key, skipping"),
        }
    }
    metadata
}

/// Split the data section on named subsection markers (`-One Word-` pairs,
/// e.g. `-International Events-`). No markers means the body cannot be
/// parsed and is skipped.
fn parse_sections(text: &str) -> Option<BTreeMap<String, Section>> {
    let marker = Regex::new(r"-(\w+ \w+)-").ok()?;
    let found: Vec<(usize, usize, String)> = marker
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps.get(1)?.as_str().to_string()))
        })
        .collect();
    if found.is_empty() {
        debug!("no named subsections in data section, skipping body");
        return None;
    }

    let mut sections = BTreeMap::new();
    for (i, (_, end, name)) in found.iter().enumerate() {
        let until = found
            .get(i + 1)
            .map(|(start, _, _)| *start)
            .unwrap_or(text.len());
        sections.insert(name.clone(), parse_section(name, &text[*end..until]));
    }
    Some(sections)
}

/// Classify the lines of one subsection.
///
/// An `AC:` line opens an analyst comment; following non-blank lines merge
/// into it; a blank line or another `AC:` closes it. Every other non-blank
/// line is a content entry. Dash-only lines are delimiter noise.
fn parse_section(name: &str, text: &str) -> Section {
    let mut entries = Vec::new();
    let mut open_comment: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            flush_comment(&mut open_comment, &mut entries);
            continue;
        }
        if line.chars().all(|c| c == '-') {
            continue;
        }
        if let Some(rest) = line.strip_prefix(COMMENT_MARKER) {
            flush_comment(&mut open_comment, &mut entries);
            open_comment = Some(rest.trim().to_string());
            continue;
        }
        match open_comment.as_mut() {
            Some(comment) => {
                if !comment.is_empty() {
                    comment.push(' ');
                }
                comment.push_str(line);
            }
            None => entries.push(Entry::Content(line.to_string())),
        }
    }
    flush_comment(&mut open_comment, &mut entries);

    let analyst_comments = if name.eq_ignore_ascii_case(ANALYST_SECTION) {
        entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::AnalystComment(text) => Some(text.clone()),
                Entry::Content(_) => None,
            })
            .collect()
    } else {
        Vec::new()
    };

    Section {
        entries,
        analyst_comments,
    }
}

fn flush_comment(open: &mut Option<String>, entries: &mut Vec<Entry>) {
    if let Some(comment) = open.take() {
        if !comment.is_empty() {
            entries.push(Entry::AnalystComment(comment));
        }
    }
}

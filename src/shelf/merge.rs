use crate::shelf::record::{OfferRecord, stored_slug};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub content: Vec<u8>,
    pub accepted: usize,
    pub duplicates: usize,
    /// Stored lines that did not parse as JSON; kept verbatim.
    pub malformed_lines: usize,
    pub duplicate_slugs: Vec<String>,
}

impl MergeOutcome {
    pub fn needs_write(&self) -> bool {
        self.accepted > 0
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Existing content with its trailing newlines collapsed to exactly one.
fn normalized_existing(existing: &[u8]) -> Vec<u8> {
    let end = existing
        .iter()
        .rposition(|b| *b != b'\n')
        .map_or(0, |idx| idx + 1);
    let mut out = existing[..end].to_vec();
    if !out.is_empty() {
        out.push(b'\n');
    }
    out
}

/// Append the offers whose slug is not yet present in `existing` (or earlier
/// in `incoming`) as one JSON line each. Existing bytes are never rewritten.
pub fn merge(existing: Option<&[u8]>, incoming: &[OfferRecord]) -> serde_json::Result<MergeOutcome> {
    let existing = existing.unwrap_or_default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut malformed_lines = 0usize;

    for line in existing.split(|b| *b == b'\n') {
        if is_blank(line) {
            continue;
        }
        match serde_json::from_slice::<Value>(line) {
            Ok(value) => {
                if let Some(slug) = stored_slug(&value) {
                    seen.insert(slug.to_string());
                }
            }
            Err(_) => malformed_lines += 1,
        }
    }

    let mut content = normalized_existing(existing);
    let mut accepted = 0usize;
    let mut duplicate_slugs = Vec::new();

    for record in incoming {
        if !seen.insert(record.slug().to_string()) {
            duplicate_slugs.push(record.slug().to_string());
            continue;
        }
        content.extend_from_slice(&record.to_json_line()?);
        content.push(b'\n');
        accepted += 1;
    }

    Ok(MergeOutcome {
        content,
        accepted,
        duplicates: duplicate_slugs.len(),
        malformed_lines,
        duplicate_slugs,
    })
}

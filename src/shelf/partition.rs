use crate::error::RecordError;
use crate::shelf::record::OfferRecord;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;

pub const JOBS_ROOT: &str = "jobs";

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Calendar day an offer was published on; one stored object per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl PartitionKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// `jobs/year=YYYY/month=MM/day=DD/`
    pub fn prefix(&self) -> String {
        format!(
            "{JOBS_ROOT}/year={:04}/month={:02}/day={:02}/",
            self.year, self.month, self.day
        )
    }

    /// `jobs/year=YYYY/month=MM/day=DD/<source>_YYYY-MM-DD.jsonl`
    pub fn storage_key(&self, source_tag: &str) -> String {
        format!("{}{source_tag}_{self}.jsonl", self.prefix())
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl Serialize for PartitionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `HH`, `HH:MM`, `HHMM`, `HH:MM:SS[.f]` or `HHMMSS[.f]` as `HH:MM[:SS[.f]]`.
fn expand_clock(time: &str) -> Option<String> {
    let (whole, frac) = match time.find(['.', ',']) {
        Some(idx) => (&time[..idx], &time[idx + 1..]),
        None => (time, ""),
    };
    let parts: Vec<&str> = if whole.contains(':') {
        whole.split(':').collect()
    } else {
        if !whole.is_ascii() {
            return None;
        }
        (0..whole.len()).step_by(2).map(|at| &whole[at..(at + 2).min(whole.len())]).collect()
    };
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.len() != 2 || !all_digits(p)) {
        return None;
    }
    let mut out = parts.join(":");
    if parts.len() == 1 {
        out.push_str(":00");
    }
    if !frac.is_empty() {
        if parts.len() != 3 || !all_digits(frac) {
            return None;
        }
        out.push('.');
        out.push_str(frac);
    }
    Some(out)
}

/// `±HH`, `±HHMM` or `±HH:MM` as `±HH:MM`.
fn expand_offset(offset: &str) -> Option<String> {
    let Some(sign) = offset.chars().next() else {
        return Some(String::new());
    };
    let digits: String = offset[1..].chars().filter(|c| *c != ':').collect();
    if !all_digits(&digits) {
        return None;
    }
    match digits.len() {
        2 => Some(format!("{sign}{digits}:00")),
        4 => Some(format!("{sign}{}:{}", &digits[..2], &digits[2..])),
        _ => None,
    }
}

/// Rewrites the reduced ISO-8601 forms (basic `YYYYMMDDTHHMMSS`, hour-only
/// times, `±HH` offsets, `Z`, `t` or space separators) into the extended
/// `YYYY-MM-DDTHH:MM[:SS[.f]][±HH:MM]` layout.
fn normalize_iso(raw: &str) -> Option<String> {
    let raw = match raw.strip_suffix(['Z', 'z']) {
        Some(head) => format!("{head}+00:00"),
        None => raw.to_string(),
    };
    let (date, rest) = match (raw.get(..10), raw.get(..8)) {
        (Some(head), _) if head.as_bytes()[4] == b'-' => (head.to_string(), &raw[10..]),
        (_, Some(head)) if all_digits(head) => (
            format!("{}-{}-{}", &head[..4], &head[4..6], &head[6..]),
            &raw[8..],
        ),
        _ => return None,
    };
    let Some(sep) = rest.chars().next() else {
        return Some(date);
    };
    if !matches!(sep, 'T' | 't' | ' ') {
        return None;
    }
    let rest = &rest[1..];
    let (time, offset) = match rest.find(['+', '-']) {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    Some(format!("{date}T{}{}", expand_clock(time)?, expand_offset(offset)?))
}

/// Date component of an ISO-8601 timestamp, taken in the timestamp's own
/// offset. A trailing `Z` is read as `+00:00`.
pub fn parse_published_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    let normalized = normalize_iso(trimmed)?;
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt.date_naive());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").ok()
}

pub fn derive(record: &OfferRecord) -> Result<PartitionKey, RecordError> {
    let raw = record
        .published_at()
        .ok_or(RecordError::MissingField("publishedAt"))?;
    let Some(text) = raw.as_str() else {
        return Err(RecordError::MalformedTimestamp(raw.to_string()));
    };
    parse_published_date(text)
        .map(PartitionKey::from_date)
        .ok_or_else(|| RecordError::MalformedTimestamp(text.to_string()))
}

use crate::error::{BrowseError, StoreError};
use crate::shelf::partition::{JOBS_ROOT, PartitionKey};
use crate::store::{GetOutcome, ObjectStore};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BrowseScope {
    Year,
    Month,
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseListing {
    pub prefix: String,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum RenderedObject {
    Json(Value),
    JsonLines(Vec<Value>),
    Text(String),
}

pub fn scope_prefix(date: NaiveDate, scope: BrowseScope) -> String {
    match scope {
        BrowseScope::Year => format!("{JOBS_ROOT}/year={:04}/", date.year()),
        BrowseScope::Month => format!(
            "{JOBS_ROOT}/year={:04}/month={:02}/",
            date.year(),
            date.month()
        ),
        BrowseScope::Day => PartitionKey::from_date(date).prefix(),
    }
}

fn is_browsable(key: &str) -> bool {
    key.ends_with(".json") || key.ends_with(".jsonl") || key.ends_with(".log")
}

pub fn list_browsable(
    store: &dyn ObjectStore,
    date: NaiveDate,
    scope: BrowseScope,
) -> Result<BrowseListing, StoreError> {
    let prefix = scope_prefix(date, scope);
    let keys = store
        .list(&prefix)?
        .into_iter()
        .filter(|key| is_browsable(key))
        .collect();
    Ok(BrowseListing { prefix, keys })
}

/// `.json` → one value, `.jsonl` → one value per line (unparsable or blank
/// lines become `{"raw": line}`), `.log` → text.
pub fn render_object(key: &str, bytes: &[u8]) -> Result<RenderedObject, BrowseError> {
    let text = String::from_utf8_lossy(bytes);
    if key.ends_with(".jsonl") {
        let rows = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap_or_else(|_| json!({ "raw": line })))
            .collect();
        return Ok(RenderedObject::JsonLines(rows));
    }
    if key.ends_with(".json") {
        let value = serde_json::from_str(&text).map_err(|source| BrowseError::InvalidJson {
            key: key.to_string(),
            source,
        })?;
        return Ok(RenderedObject::Json(value));
    }
    if key.ends_with(".log") {
        return Ok(RenderedObject::Text(text.into_owned()));
    }
    Err(BrowseError::Unsupported(key.to_string()))
}

pub fn show_object(store: &dyn ObjectStore, key: &str) -> Result<RenderedObject, BrowseError> {
    if !is_browsable(key) {
        return Err(BrowseError::Unsupported(key.to_string()));
    }
    match store.get(key)? {
        GetOutcome::Found(bytes) => render_object(key, &bytes),
        GetOutcome::NotFound => Err(BrowseError::NotFound(key.to_string())),
    }
}

use crate::error::RecordError;
use serde_json::{Map, Value};

pub const SLUG_FIELD: &str = "slug";
pub const PUBLISHED_AT_FIELD: &str = "publishedAt";

/// One job offer. Only `slug` and `publishedAt` are interpreted; every other
/// field is carried through untouched, in its original key order.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferRecord {
    slug: String,
    fields: Map<String, Value>,
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// A value that failed validation, handed back so callers can still log it.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOffer {
    pub error: RecordError,
    pub value: Value,
}

fn check_fields(fields: &Map<String, Value>) -> Result<String, RecordError> {
    let slug = match fields.get(SLUG_FIELD) {
        None | Some(Value::Null) => return Err(RecordError::MissingField(SLUG_FIELD)),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(_) => return Err(RecordError::InvalidSlug),
    };
    if fields.get(PUBLISHED_AT_FIELD).is_none_or(is_blank) {
        return Err(RecordError::MissingField(PUBLISHED_AT_FIELD));
    }
    Ok(slug)
}

impl OfferRecord {
    pub fn from_value(value: Value) -> Result<Self, RejectedOffer> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(RejectedOffer {
                    error: RecordError::NotAnObject,
                    value: other,
                });
            }
        };
        match check_fields(&fields) {
            Ok(slug) => Ok(Self { slug, fields }),
            Err(error) => Err(RejectedOffer {
                error,
                value: Value::Object(fields),
            }),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn published_at(&self) -> Option<&Value> {
        self.fields.get(PUBLISHED_AT_FIELD)
    }

    /// Compact single-line JSON; non-ASCII text stays unescaped.
    pub fn to_json_line(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.fields)
    }
}

/// Slug of an already-stored line, if it parsed to an object carrying one.
pub fn stored_slug(value: &Value) -> Option<&str> {
    value
        .get(SLUG_FIELD)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::OfferRecord;
    use crate::error::RecordError;
    use serde_json::json;

    fn rejection(value: serde_json::Value) -> RecordError {
        OfferRecord::from_value(value).unwrap_err().error
    }

    #[test]
    fn requires_slug_and_published_at() {
        assert_eq!(
            rejection(json!({"slug": "x"})),
            RecordError::MissingField("publishedAt")
        );
        assert_eq!(
            rejection(json!({"slug": "x", "publishedAt": ""})),
            RecordError::MissingField("publishedAt")
        );
        assert_eq!(
            rejection(json!({"publishedAt": "2025-01-01T00:00:00Z"})),
            RecordError::MissingField("slug")
        );
        assert_eq!(
            rejection(json!({"slug": "", "publishedAt": "2025-01-01"})),
            RecordError::InvalidSlug
        );
        assert_eq!(
            rejection(json!({"slug": 42, "publishedAt": "2025-01-01"})),
            RecordError::InvalidSlug
        );
        assert_eq!(rejection(json!(["not", "an", "offer"])), RecordError::NotAnObject);
    }

    #[test]
    fn rejected_value_is_handed_back() {
        let value = json!({"slug": "x", "extra": [1, 2]});
        let rejected = OfferRecord::from_value(value.clone()).unwrap_err();
        assert_eq!(rejected.value, value);
    }

    #[test]
    fn json_line_keeps_key_order_and_unicode() {
        let raw = r#"{"title":"Programista Rust – Kraków","slug":"rust-krakow","publishedAt":"2025-03-05T10:00:00Z","salary":{"from":12000.50,"to":null},"remote":true,"tags":["rust","aws"]}"#;
        let value: serde_json::Value = serde_json::from_str(raw).expect("parse");
        let record = OfferRecord::from_value(value).expect("valid record");
        let line = String::from_utf8(record.to_json_line().expect("serialize")).expect("utf8");
        assert_eq!(line, raw);
    }
}

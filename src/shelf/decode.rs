use crate::error::DecodeError;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Json,
    JsonLines,
}

impl UploadFormat {
    pub fn from_path(path: &Path) -> Result<Self, DecodeError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => Ok(Self::Json),
            "jsonl" => Ok(Self::JsonLines),
            _ => Err(DecodeError::UnsupportedExtension(ext)),
        }
    }
}

pub fn is_upload_candidate(path: &Path) -> bool {
    UploadFormat::from_path(path).is_ok()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedUpload {
    pub records: Vec<Value>,
    /// 1-based numbers of `.jsonl` lines that were not valid JSON.
    pub skipped_lines: Vec<usize>,
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `.json`: one object or an array of values. `.jsonl`: one value per line;
/// bad lines are skipped and reported, blank lines ignored.
pub fn decode_upload(format: UploadFormat, bytes: &[u8]) -> Result<DecodedUpload, DecodeError> {
    match format {
        UploadFormat::Json => {
            let records = match serde_json::from_slice::<Value>(bytes)? {
                Value::Array(items) => items,
                object @ Value::Object(_) => vec![object],
                other => return Err(DecodeError::UnexpectedShape(shape_name(&other))),
            };
            Ok(DecodedUpload {
                records,
                skipped_lines: Vec::new(),
            })
        }
        UploadFormat::JsonLines => {
            let mut out = DecodedUpload::default();
            for (idx, line) in bytes.split(|b| *b == b'\n').enumerate() {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match serde_json::from_slice::<Value>(line) {
                    Ok(value) => out.records.push(value),
                    Err(_) => out.skipped_lines.push(idx + 1),
                }
            }
            Ok(out)
        }
    }
}

pub fn decode_file(path: &Path, bytes: &[u8]) -> Result<DecodedUpload, DecodeError> {
    decode_upload(UploadFormat::from_path(path)?, bytes)
}

#[cfg(test)]
mod tests {
    use super::{UploadFormat, decode_file, decode_upload};
    use crate::error::DecodeError;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn json_object_becomes_single_record() {
        let out = decode_upload(UploadFormat::Json, br#"{"slug":"a"}"#).expect("decode");
        assert_eq!(out.records, vec![json!({"slug": "a"})]);
    }

    #[test]
    fn json_array_keeps_every_element() {
        let out =
            decode_upload(UploadFormat::Json, br#"[{"slug":"a"},{"slug":"b"},3]"#).expect("decode");
        assert_eq!(out.records.len(), 3);
    }

    #[test]
    fn json_scalar_and_garbage_are_errors() {
        assert!(matches!(
            decode_upload(UploadFormat::Json, b"42"),
            Err(DecodeError::UnexpectedShape("a number"))
        ));
        assert!(matches!(
            decode_upload(UploadFormat::Json, b"{broken"),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn jsonl_skips_bad_and_blank_lines() {
        let raw = b"{\"slug\":\"a\"}\n\n{oops\r\n{\"slug\":\"b\"}\r\n   \n";
        let out = decode_upload(UploadFormat::JsonLines, raw).expect("decode");
        assert_eq!(out.records, vec![json!({"slug": "a"}), json!({"slug": "b"})]);
        assert_eq!(out.skipped_lines, vec![3]);
    }

    #[test]
    fn extension_picks_the_format() {
        assert!(decode_file(Path::new("offers.JSONL"), b"{}\n").is_ok());
        assert!(matches!(
            decode_file(Path::new("offers.csv"), b"a,b"),
            Err(DecodeError::UnsupportedExtension(ext)) if ext == "csv"
        ));
    }
}

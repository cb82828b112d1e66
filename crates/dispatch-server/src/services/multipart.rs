//! Shared multipart-decoding helpers for both the client's "Submit job"
//! and the worker's "Submit result" endpoints (spec §6).
//!
//! Spec §9 "Dynamic field names on upload": output files arrive as form
//! fields prefixed `output_`, scanned rather than declared by a fixed
//! schema; the filename after the prefix is attacker-controlled and must
//! be rejected if it contains a path separator or `..`.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;

/// Drains every field of a multipart body into memory, keyed by field
/// name. Last-write-wins if a name repeats, matching how a map-backed
/// upload parser in the teacher's stack would behave.
pub async fn drain(mut multipart: Multipart) -> Result<HashMap<String, Vec<u8>>, AppError> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let bytes = field.bytes().await?.to_vec();
        fields.insert(name, bytes);
    }
    Ok(fields)
}

pub const OUTPUT_FIELD_PREFIX: &str = "output_";

/// Splits a decoded field map into the well-known fields plus a sanitized
/// `output_<filename>` map, rejecting any filename that contains a path
/// separator or a `..` component.
pub fn split_output_fields(
    fields: &mut HashMap<String, Vec<u8>>,
) -> Result<HashMap<String, Vec<u8>>, AppError> {
    let output_keys: Vec<String> = fields
        .keys()
        .filter(|k| k.starts_with(OUTPUT_FIELD_PREFIX))
        .cloned()
        .collect();

    let mut outputs = HashMap::new();
    for key in output_keys {
        let filename = &key[OUTPUT_FIELD_PREFIX.len()..];
        validate_filename(filename)?;
        let bytes = fields.remove(&key).expect("key came from fields");
        outputs.insert(filename.to_string(), bytes);
    }
    Ok(outputs)
}

fn validate_filename(name: &str) -> Result<(), AppError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.split('/').any(|part| part == "..")
        || name == ".."
    {
        return Err(AppError::InvalidFilename(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_traversal() {
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("a/b.txt").is_err());
        assert!(validate_filename("..").is_err());
    }

    #[test]
    fn accepts_plain_filename() {
        assert!(validate_filename("report.csv").is_ok());
    }

    #[test]
    fn split_extracts_prefixed_fields_only() {
        let mut fields = HashMap::new();
        fields.insert("result".to_string(), b"r".to_vec());
        fields.insert("output_a.txt".to_string(), b"a".to_vec());
        fields.insert("output_b.log".to_string(), b"b".to_vec());

        let outputs = split_output_fields(&mut fields).unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(outputs.contains_key("a.txt"));
        assert!(outputs.contains_key("b.log"));
        assert!(fields.contains_key("result"));
        assert!(!fields.contains_key("output_a.txt"));
    }

    #[test]
    fn split_rejects_traversal_in_output_name() {
        let mut fields = HashMap::new();
        fields.insert("output_../evil".to_string(), b"x".to_vec());
        assert!(split_output_fields(&mut fields).is_err());
    }
}

//! Placement validation
//!
//! Every entry point that accepts a placement id calls
//! [`validate_placement_id`] before touching native code.

use serde_json::Value;

use crate::error::{Error, Result};

const INVALID_PLACEMENT_MESSAGE: &str = "Placement ID must be a non-empty string";

/// Reject empty or whitespace-only placement ids
pub fn validate_placement_id(placement_id: &str) -> Result<()> {
    if placement_id.trim().is_empty() {
        return Err(Error::invalid_placement(INVALID_PLACEMENT_MESSAGE));
    }
    Ok(())
}

/// Validate a placement id that arrived as untyped JSON
///
/// Anything other than a non-blank JSON string is rejected.
pub fn validate_placement_value(value: &Value) -> Result<&str> {
    match value {
        Value::String(placement_id) => {
            validate_placement_id(placement_id)?;
            Ok(placement_id)
        }
        _ => Err(Error::invalid_placement(INVALID_PLACEMENT_MESSAGE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_accepts_valid_ids() {
        for id in ["valid-id", "123456789_987654321", " padded ", "x"] {
            assert!(validate_placement_id(id).is_ok(), "{id:?} should be accepted");
        }
    }

    #[test]
    fn test_rejects_empty_and_blank() {
        for id in ["", "   ", "\t\n"] {
            let err = validate_placement_id(id).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidPlacementId);
        }
    }

    #[test]
    fn test_rejects_non_string_values() {
        for value in [json!(null), json!(42), json!(true), json!(["id"]), json!({"id": "x"})] {
            let err = validate_placement_value(&value).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidPlacementId);
        }

        assert_eq!(validate_placement_value(&json!("abc")).unwrap(), "abc");
        assert!(validate_placement_value(&json!(" ")).is_err());
    }
}

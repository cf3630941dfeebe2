use serde_json::Value;
use std::fmt;

use crate::error::{PipelineError, Result};

/// A trimmed, non-empty piece of feedback text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem(String);

impl TextItem {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Accepts a string that trims to something non-empty. Returns `None`
    /// for everything else, without logging.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(Self::from_str_trimmed)
    }

    pub fn from_str_trimmed(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }
}

impl fmt::Display for TextItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates a raw request value. Length and encoding are not checked.
///
/// Rejections are logged and returned as [`PipelineError::Validation`].
pub fn normalize(raw: Option<&Value>) -> Result<TextItem> {
    let reason = match raw {
        None | Some(Value::Null) => "Input text is missing",
        Some(Value::String(s)) => match TextItem::from_str_trimmed(s) {
            Some(item) => return Ok(item),
            None => "Input text cannot be empty",
        },
        Some(_) => "Input text must be a string",
    };

    tracing::warn!(reason, "Rejected invalid input");
    Err(PipelineError::Validation(reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trims_valid_text() {
        let item = normalize(Some(&json!("  the parcel arrived late \n"))).unwrap();
        assert_eq!(item.as_str(), "the parcel arrived late");
    }

    #[test]
    fn rejects_missing_blank_and_non_string() {
        for raw in [
            None,
            Some(json!(null)),
            Some(json!("")),
            Some(json!("   \t")),
            Some(json!(42)),
            Some(json!(["text"])),
            Some(json!({"text": "hi"})),
        ] {
            let err = normalize(raw.as_ref()).unwrap_err();
            assert!(matches!(err, PipelineError::Validation(_)), "{raw:?}");
        }
    }

    #[test]
    fn no_length_limit() {
        let long = "a".repeat(100_000);
        assert_eq!(normalize(Some(&json!(long))).unwrap().as_str().len(), 100_000);
    }
}

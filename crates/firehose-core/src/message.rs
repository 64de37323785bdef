//! Stream message decoding and the delivery filter.
//!
//! Only two fields of a message matter here: the reply-reference field,
//! whose *presence* (any value, `null` included) makes a message
//! deliverable, and the text field, which is what gets delivered. Other
//! payloads on the same stream (deletes, limit notices, ...) lack the
//! reply-reference field and are filtered out.

use serde_json::Value;

use crate::error::DecodeError;

/// Field whose presence marks a message as deliverable.
pub const REPLY_REFERENCE_FIELD: &str = "in_reply_to_status_id";

/// Field carrying the delivered text.
pub const TEXT_FIELD: &str = "text";

/// Outcome of running the delivery filter over one raw message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filtered {
    /// The message passed the filter; carries its text, unmodified.
    Deliver(String),
    /// The message decoded but is not deliverable.
    Skip,
}

/// Decode one raw message and apply the delivery filter.
pub fn filter_message(raw: &str) -> Result<Filtered, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    let Some(object) = value.as_object() else {
        return Err(DecodeError::NotAnObject);
    };

    if !object.contains_key(REPLY_REFERENCE_FIELD) {
        return Ok(Filtered::Skip);
    }

    match object.get(TEXT_FIELD).and_then(Value::as_str) {
        Some(text) => Ok(Filtered::Deliver(text.to_string())),
        None => Err(DecodeError::MissingText { field: TEXT_FIELD }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_reference_present_delivers_text() {
        let raw = r#"{"id":1,"text":"hello  world é","in_reply_to_status_id":null}"#;
        assert_eq!(
            filter_message(raw).unwrap(),
            Filtered::Deliver("hello  world é".into())
        );
    }

    #[test]
    fn reply_reference_with_value_delivers() {
        let raw = r#"{"text":"re: hi","in_reply_to_status_id":12345}"#;
        assert_eq!(filter_message(raw).unwrap(), Filtered::Deliver("re: hi".into()));
    }

    #[test]
    fn missing_reply_reference_is_skipped() {
        let raw = r#"{"delete":{"status":{"id":1}}}"#;
        assert_eq!(filter_message(raw).unwrap(), Filtered::Skip);
        let raw = r#"{"text":"no marker"}"#;
        assert_eq!(filter_message(raw).unwrap(), Filtered::Skip);
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(matches!(filter_message("{not json"), Err(DecodeError::Json(_))));
        assert!(matches!(filter_message("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(
            filter_message(r#"{"in_reply_to_status_id":null}"#),
            Err(DecodeError::MissingText { .. })
        ));
    }
}

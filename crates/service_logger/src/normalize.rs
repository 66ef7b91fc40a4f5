//! Normalization of exceptions attached to a record.

use serde::Serialize;

use super::{
    fields::{ExceptionLike, FieldValue, Fields},
    keys,
};

/// The fixed shape an exception takes in serialized output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    /// The name of the concrete type of the exception.
    #[serde(rename = "type")]
    pub type_name: String,

    /// The textual description of the exception.
    pub message: String,

    /// The formatted trace from the point of capture.
    pub stack: String,
}

impl ErrorDescriptor {
    /// Builds a descriptor from an exception-like value.
    ///
    /// Returns `None` if the value does not provide a stack trace, in which case it is not
    /// considered exception-like.
    pub fn from_exception(exception: &dyn ExceptionLike) -> Option<Self> {
        let stack = exception
            .stack_trace()
            .filter(|stack| !stack.trim().is_empty())?;

        Some(Self {
            type_name: exception.type_name().to_owned(),
            message: exception.message(),
            stack,
        })
    }
}

/// Replaces an exception-like value under the `error` key with an [`ErrorDescriptor`].
///
/// Any other value under `error`, including an exception without a stack trace, is passed
/// through unchanged.
pub fn normalize_error(mut fields: Fields) -> Fields {
    let descriptor = match fields.get(keys::ERROR) {
        Some(FieldValue::Exception(exception)) => {
            ErrorDescriptor::from_exception(exception.as_ref())
        }
        _ => None,
    };

    if let Some(descriptor) = descriptor {
        fields.insert(keys::ERROR, FieldValue::Error(descriptor));
    }

    fields
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::CapturedError;

    #[derive(Debug)]
    struct Untraced;

    impl ExceptionLike for Untraced {
        fn type_name(&self) -> &str {
            "Untraced"
        }

        fn message(&self) -> String {
            "no trace available".to_owned()
        }

        fn stack_trace(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn replaces_exception_with_descriptor() {
        let error = "12a".parse::<u8>().unwrap_err();
        let fields = normalize_error(Fields::new().with_error(&error).with("operation", "parse"));

        match fields.get("error") {
            Some(FieldValue::Error(descriptor)) => {
                assert_eq!(descriptor.type_name, "ParseIntError");
                assert_eq!(descriptor.message, "invalid digit found in string");
                assert!(!descriptor.stack.is_empty());
            }
            other => panic!("error was not normalized: {other:?}"),
        }
        assert_eq!(fields.get("operation").unwrap().to_text(), "parse");
    }

    #[test]
    fn passes_opaque_error_value_through() {
        let fields = normalize_error(Fields::new().with("error", json!({ "code": 42 })));

        match fields.get("error") {
            Some(FieldValue::Value(value)) => assert_eq!(value, &json!({ "code": 42 })),
            other => panic!("opaque value was modified: {other:?}"),
        }
    }

    #[test]
    fn passes_untraced_exception_through() {
        let fields = normalize_error(Fields::new().with_exception("error", Arc::new(Untraced)));

        assert!(matches!(fields.get("error"), Some(FieldValue::Exception(_))));
    }

    #[test]
    fn only_normalizes_error_key() {
        let captured = Arc::new(CapturedError::new(&std::fmt::Error));
        let fields = normalize_error(Fields::new().with_exception("cause", captured));

        assert!(matches!(fields.get("cause"), Some(FieldValue::Exception(_))));
    }

    #[test]
    fn serializes_in_fixed_key_order() {
        let descriptor = ErrorDescriptor {
            type_name: "ValueError".to_owned(),
            message: "Invalid input".to_owned(),
            stack: "ValueError: Invalid input\n".to_owned(),
        };

        assert_eq!(
            serde_json::to_string(&descriptor).unwrap(),
            r#"{"type":"ValueError","message":"Invalid input","stack":"ValueError: Invalid input\n"}"#
        );
    }
}

//! Log call arguments
//!
//! A log call takes a variadic argument list: an optional leading object, an
//! optional message, then format arguments. The list is inspected once, at
//! the boundary of the call, and turned into a [`NormalizedCall`]; nothing
//! further down the pipeline looks at argument shapes.

use super::value::{FieldValue, Fields};

/// Raw arguments of a log call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogArgs(Vec<FieldValue>);

impl LogArgs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<FieldValue>) -> Self {
        self.0.push(value.into());
        self
    }

    pub fn push(&mut self, value: impl Into<FieldValue>) {
        self.0.push(value.into());
    }

    pub fn as_slice(&self) -> &[FieldValue] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<FieldValue> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<FieldValue>> for LogArgs {
    fn from(values: Vec<FieldValue>) -> Self {
        Self(values)
    }
}

impl From<&str> for LogArgs {
    fn from(message: &str) -> Self {
        Self(vec![FieldValue::from(message)])
    }
}

impl From<String> for LogArgs {
    fn from(message: String) -> Self {
        Self(vec![FieldValue::String(message)])
    }
}

impl From<Fields> for LogArgs {
    fn from(object: Fields) -> Self {
        Self(vec![FieldValue::Object(object)])
    }
}

impl From<FieldValue> for LogArgs {
    fn from(value: FieldValue) -> Self {
        Self(vec![value])
    }
}

impl<M: Into<String>> From<(Fields, M)> for LogArgs {
    fn from((object, message): (Fields, M)) -> Self {
        Self(vec![
            FieldValue::Object(object),
            FieldValue::String(message.into()),
        ])
    }
}

/// The argument list reduced to object, message and format arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedCall {
    pub object: Option<Fields>,
    pub message: Option<String>,
    pub format_args: Vec<FieldValue>,
}

impl NormalizedCall {
    /// Classify the first argument and split the list accordingly
    ///
    /// - object first: it becomes the merge object; a following string is the
    ///   message and the rest are format arguments
    /// - string first: it is the message, the rest are format arguments
    /// - anything else first: its text is the message
    pub fn parse(args: LogArgs) -> Self {
        let mut iter = args.into_inner().into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };

        let (object, message_arg) = match Self::as_object(first) {
            Ok(object) => (Some(object), iter.next()),
            Err(first) => (None, Some(first)),
        };

        let message = message_arg.map(|m| match m {
            FieldValue::String(s) => s,
            other => other.to_string(),
        });

        Self {
            object,
            message,
            format_args: iter.collect(),
        }
    }

    fn as_object(value: FieldValue) -> std::result::Result<Fields, FieldValue> {
        match value {
            FieldValue::Object(fields) => Ok(fields),
            FieldValue::Shared(node) => {
                let inner = node.get();
                match inner {
                    FieldValue::Object(fields) => Ok(fields),
                    _ => Err(FieldValue::Shared(node)),
                }
            }
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SharedValue;

    #[test]
    fn test_message_only() {
        let call = NormalizedCall::parse(LogArgs::from("hello"));
        assert_eq!(call.object, None);
        assert_eq!(call.message.as_deref(), Some("hello"));
        assert!(call.format_args.is_empty());
    }

    #[test]
    fn test_object_message_and_format_args() {
        let args = LogArgs::new()
            .arg(Fields::new().with_field("user", "a"))
            .arg("login %s")
            .arg("ok");
        let call = NormalizedCall::parse(args);

        assert_eq!(call.object.unwrap().get("user"), Some(&FieldValue::from("a")));
        assert_eq!(call.message.as_deref(), Some("login %s"));
        assert_eq!(call.format_args, vec![FieldValue::from("ok")]);
    }

    #[test]
    fn test_object_only() {
        let call = NormalizedCall::parse(LogArgs::from(Fields::new().with_field("a", 1)));
        assert!(call.object.is_some());
        assert_eq!(call.message, None);
    }

    #[test]
    fn test_non_string_first_argument() {
        let call = NormalizedCall::parse(LogArgs::new().arg(42).arg(1));
        assert_eq!(call.object, None);
        assert_eq!(call.message.as_deref(), Some("42"));
        assert_eq!(call.format_args, vec![FieldValue::Int(1)]);
    }

    #[test]
    fn test_shared_object_first() {
        let node = SharedValue::new(Fields::new().with_field("k", "v"));
        let call = NormalizedCall::parse(LogArgs::new().arg(node).arg("m"));
        assert_eq!(call.object.unwrap().get("k"), Some(&FieldValue::from("v")));
        assert_eq!(call.message.as_deref(), Some("m"));
    }

    #[test]
    fn test_empty() {
        assert_eq!(NormalizedCall::parse(LogArgs::new()), NormalizedCall::default());
    }
}

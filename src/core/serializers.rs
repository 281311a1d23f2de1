//! Per-key serializers applied before encoding
//!
//! A serializer turns the value logged under one top-level key into a
//! JSON-safe value. Serializers are expected not to fail; when one does (by
//! returning an error or panicking) the value is replaced with a
//! `{"serializationError": "<message>"}` descriptor, the line is still
//! written and the fault goes to the logger's error callback.

use super::error::{BoxError, LoggerError};
use super::value::{FieldValue, Fields};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Key of the descriptor written in place of a failed serializer's output
pub const SERIALIZATION_ERROR_KEY: &str = "serializationError";

pub type SerializerFn =
    Arc<dyn Fn(&FieldValue) -> std::result::Result<FieldValue, BoxError> + Send + Sync>;

/// Set of serializers keyed by field name
#[derive(Clone, Default)]
pub struct Serializers {
    map: HashMap<String, SerializerFn>,
}

impl Serializers {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Serializers for `err`, `req` and `res`
    pub fn standard() -> Self {
        Self::new()
            .with("err", std_serializers::err)
            .with("req", std_serializers::req)
            .with("res", std_serializers::res)
    }

    #[must_use]
    pub fn with<K, F>(mut self, key: K, f: F) -> Self
    where
        K: Into<String>,
        F: Fn(&FieldValue) -> std::result::Result<FieldValue, BoxError> + Send + Sync + 'static,
    {
        self.insert(key, f);
        self
    }

    pub fn insert<K, F>(&mut self, key: K, f: F)
    where
        K: Into<String>,
        F: Fn(&FieldValue) -> std::result::Result<FieldValue, BoxError> + Send + Sync + 'static,
    {
        self.map.insert(key.into(), Arc::new(f));
    }

    pub fn get(&self, key: &str) -> Option<&SerializerFn> {
        self.map.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<SerializerFn> {
        self.map.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Parent set with `overrides` replacing individual keys
    pub fn merged_with(&self, overrides: &Serializers) -> Serializers {
        let mut merged = self.clone();
        for (key, f) in &overrides.map {
            merged.map.insert(key.clone(), Arc::clone(f));
        }
        merged
    }

    /// Serialize every top-level field that has a serializer
    ///
    /// Returns one [`LoggerError::Serialization`] per field whose serializer
    /// failed; the field itself holds the fault descriptor.
    pub fn apply(&self, fields: &mut Fields) -> Vec<LoggerError> {
        let mut faults = Vec::new();
        if self.map.is_empty() {
            return faults;
        }
        for (key, value) in fields.iter_mut() {
            if let Some(f) = self.map.get(key.as_str()) {
                let (serialized, fault) = Self::run(f, value);
                *value = serialized;
                if let Some(message) = fault {
                    faults.push(LoggerError::serialization(key.as_str(), message));
                }
            }
        }
        faults
    }

    /// Serialize a single value with the serializer registered for `key`
    pub fn apply_one(&self, key: &str, value: &FieldValue) -> FieldValue {
        match self.map.get(key) {
            Some(f) => Self::run(f, value).0,
            None => value.clone(),
        }
    }

    fn run(f: &SerializerFn, value: &FieldValue) -> (FieldValue, Option<String>) {
        let message = match catch_unwind(AssertUnwindSafe(|| f(value))) {
            Ok(Ok(serialized)) => return (serialized, None),
            Ok(Err(e)) => e.to_string(),
            Err(panic_info) => {
                if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                }
            }
        };
        (Self::fault_descriptor(&message), Some(message))
    }

    fn fault_descriptor(message: &str) -> FieldValue {
        FieldValue::Object(Fields::new().with_field(SERIALIZATION_ERROR_KEY, message))
    }
}

impl fmt::Debug for Serializers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.map.keys().collect();
        keys.sort();
        f.debug_struct("Serializers").field("keys", &keys).finish()
    }
}

/// Standard serializers for errors and HTTP request/response objects
pub mod std_serializers {
    use super::*;

    fn object_of(value: &FieldValue, what: &str) -> std::result::Result<Fields, BoxError> {
        match value.resolved() {
            FieldValue::Object(fields) => Ok(fields),
            other => Err(format!("expected {} object, got {}", what, other.kind()).into()),
        }
    }

    fn pick(source: &Fields, keys: &[&str]) -> Fields {
        let mut out = Fields::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = source.get(key) {
                out.insert(*key, value.clone());
            }
        }
        out
    }

    /// Serialize an error object
    ///
    /// Input must be an object with a string `message`. Output keeps `type`
    /// (default `"Error"`), `message`, `stack` and every other property.
    pub fn err(value: &FieldValue) -> std::result::Result<FieldValue, BoxError> {
        let fields = object_of(value, "error")?;
        let message = fields
            .get("message")
            .and_then(FieldValue::as_str)
            .ok_or("error object has no string 'message'")?
            .to_string();

        let mut out = Fields::new();
        out.insert(
            "type",
            fields.get("type").cloned().unwrap_or_else(|| "Error".into()),
        );
        out.insert("message", message);
        if let Some(stack) = fields.get("stack") {
            out.insert("stack", stack.clone());
        }
        for (key, v) in fields.iter() {
            if !out.contains_key(key) {
                out.insert(key.clone(), v.clone());
            }
        }
        Ok(FieldValue::Object(out))
    }

    /// Serialize an HTTP request object
    pub fn req(value: &FieldValue) -> std::result::Result<FieldValue, BoxError> {
        let fields = object_of(value, "request")?;
        Ok(FieldValue::Object(pick(
            &fields,
            &[
                "id",
                "method",
                "url",
                "query",
                "params",
                "headers",
                "remoteAddress",
                "remotePort",
            ],
        )))
    }

    /// Serialize an HTTP response object
    pub fn res(value: &FieldValue) -> std::result::Result<FieldValue, BoxError> {
        let fields = object_of(value, "response")?;
        Ok(FieldValue::Object(pick(&fields, &["statusCode", "headers"])))
    }

    /// `{ "req": <serialized request> }`
    pub fn map_http_request(value: &FieldValue) -> std::result::Result<Fields, BoxError> {
        Ok(Fields::new().with_field("req", req(value)?))
    }

    /// `{ "res": <serialized response> }`
    pub fn map_http_response(value: &FieldValue) -> std::result::Result<Fields, BoxError> {
        Ok(Fields::new().with_field("res", res(value)?))
    }

    fn wrap<B, F>(base: B, custom: F) -> impl Fn(&FieldValue) -> std::result::Result<FieldValue, BoxError>
    where
        B: Fn(&FieldValue) -> std::result::Result<FieldValue, BoxError>,
        F: Fn(FieldValue) -> FieldValue,
    {
        move |value: &FieldValue| base(value).map(&custom)
    }

    /// Run `custom` on the output of the standard error serializer
    pub fn wrap_error_serializer<F>(
        custom: F,
    ) -> impl Fn(&FieldValue) -> std::result::Result<FieldValue, BoxError> + Send + Sync
    where
        F: Fn(FieldValue) -> FieldValue + Send + Sync,
    {
        wrap(err, custom)
    }

    /// Run `custom` on the output of the standard request serializer
    pub fn wrap_request_serializer<F>(
        custom: F,
    ) -> impl Fn(&FieldValue) -> std::result::Result<FieldValue, BoxError> + Send + Sync
    where
        F: Fn(FieldValue) -> FieldValue + Send + Sync,
    {
        wrap(req, custom)
    }

    /// Run `custom` on the output of the standard response serializer
    pub fn wrap_response_serializer<F>(
        custom: F,
    ) -> impl Fn(&FieldValue) -> std::result::Result<FieldValue, BoxError> + Send + Sync
    where
        F: Fn(FieldValue) -> FieldValue + Send + Sync,
    {
        wrap(res, custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_object() -> FieldValue {
        Fields::new()
            .with_field("type", "IoError")
            .with_field("message", "disk full")
            .with_field("code", "ENOSPC")
            .into()
    }

    #[test]
    fn test_apply_replaces_matching_keys() {
        let serializers = Serializers::new().with("user", |v| {
            Ok(FieldValue::from(format!("user:{}", v)))
        });
        let mut fields = Fields::new().with_field("user", "alice").with_field("other", 1);

        let faults = serializers.apply(&mut fields);

        assert!(faults.is_empty());
        assert_eq!(fields.get("user"), Some(&FieldValue::from("user:alice")));
        assert_eq!(fields.get("other"), Some(&FieldValue::Int(1)));
    }

    #[test]
    fn test_error_result_becomes_descriptor() {
        let serializers =
            Serializers::new().with("bad", |_| Err("cannot serialize".into()));
        let mut fields = Fields::new().with_field("bad", 1);

        let faults = serializers.apply(&mut fields);
        assert_eq!(faults.len(), 1);
        assert!(matches!(
            &faults[0],
            LoggerError::Serialization { key, message }
                if key == "bad" && message == "cannot serialize"
        ));
        let descriptor = fields.get("bad").and_then(FieldValue::as_object).unwrap();
        assert_eq!(
            descriptor.get(SERIALIZATION_ERROR_KEY),
            Some(&FieldValue::from("cannot serialize"))
        );
    }

    #[test]
    fn test_panicking_serializer_is_contained() {
        let serializers = Serializers::new().with("boom", |_| panic!("serializer exploded"));
        let mut fields = Fields::new().with_field("boom", 1);

        assert_eq!(serializers.apply(&mut fields).len(), 1);
        let descriptor = fields.get("boom").and_then(FieldValue::as_object).unwrap();
        assert_eq!(
            descriptor.get(SERIALIZATION_ERROR_KEY),
            Some(&FieldValue::from("serializer exploded"))
        );
    }

    #[test]
    fn test_merged_with_overrides_by_key() {
        let parent = Serializers::new()
            .with("a", |_| Ok("parent-a".into()))
            .with("b", |_| Ok("parent-b".into()));
        let child = parent.merged_with(&Serializers::new().with("a", |_| Ok("child-a".into())));

        assert_eq!(child.len(), 2);
        assert_eq!(child.apply_one("a", &FieldValue::Null), FieldValue::from("child-a"));
        assert_eq!(child.apply_one("b", &FieldValue::Null), FieldValue::from("parent-b"));
        assert_eq!(parent.apply_one("a", &FieldValue::Null), FieldValue::from("parent-a"));
    }

    #[test]
    fn test_std_err_serializer() {
        let out = std_serializers::err(&error_object()).unwrap();
        let fields = out.as_object().unwrap();

        let keys: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(keys, vec!["type", "message", "code"]);
        assert_eq!(fields.get("message"), Some(&FieldValue::from("disk full")));
    }

    #[test]
    fn test_std_err_serializer_rejects_malformed() {
        assert!(std_serializers::err(&FieldValue::from("not an error")).is_err());
        let no_message: FieldValue = Fields::new().with_field("code", 1).into();
        assert!(std_serializers::err(&no_message).is_err());
    }

    #[test]
    fn test_std_req_res_serializers() {
        let request: FieldValue = Fields::new()
            .with_field("method", "GET")
            .with_field("url", "/login")
            .with_field("body", "secret payload")
            .into();
        let out = std_serializers::req(&request).unwrap();
        let fields = out.as_object().unwrap();
        assert_eq!(fields.get("method"), Some(&FieldValue::from("GET")));
        assert!(!fields.contains_key("body"));

        let response: FieldValue = Fields::new()
            .with_field("statusCode", 200)
            .with_field("internal", true)
            .into();
        let mapped = std_serializers::map_http_response(&response).unwrap();
        let res = mapped.get("res").and_then(FieldValue::as_object).unwrap();
        assert_eq!(res.get("statusCode"), Some(&FieldValue::Int(200)));
        assert!(!res.contains_key("internal"));
    }

    #[test]
    fn test_wrap_error_serializer() {
        let wrapped = std_serializers::wrap_error_serializer(|mut v| {
            if let Some(fields) = v.as_object_mut() {
                fields.remove("code");
            }
            v
        });
        let out = wrapped(&error_object()).unwrap();
        assert!(!out.as_object().unwrap().contains_key("code"));
    }
}

//! Line encoder
//!
//! Turns a [`LogEvent`] into a single newline-terminated JSON object:
//!
//! ```text
//! {"level":30,"time":1736332245123,"pid":42,"hostname":"box","msg":"hello","v":1}
//! ```
//!
//! Field order is level, time, bindings (root to leaf), the call's object,
//! message, then `v`. Keys written by the encoder itself cannot be overridden
//! by bindings or the object.

use super::error::{LoggerError, Result};
use super::event::LogEvent;
use super::format::format_message;
use super::value::{FieldValue, Fields};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;

/// Value written under `v` on every line
pub const LOG_VERSION: i64 = 1;

/// Substitute for a reference back into an object that is being encoded
pub const CIRCULAR: &str = "[Circular]";

pub const DEFAULT_MESSAGE_KEY: &str = "msg";
pub const DEFAULT_LEVEL_KEY: &str = "level";
pub const TIME_KEY: &str = "time";
pub const VERSION_KEY: &str = "v";

pub type LevelFormatterFn = Arc<dyn Fn(&str, u32) -> Fields + Send + Sync>;
pub type BindingsFormatterFn = Arc<dyn Fn(Fields) -> Fields + Send + Sync>;
pub type LogFormatterFn = Arc<dyn Fn(Fields) -> Fields + Send + Sync>;

/// Output-shaping hooks
///
/// - `level`: replaces the level field with the returned fields
/// - `bindings`: reshapes bindings when a logger or child is created
/// - `log`: reshapes the call's object before redaction
#[derive(Clone, Default)]
pub struct Formatters {
    pub level: Option<LevelFormatterFn>,
    pub bindings: Option<BindingsFormatterFn>,
    pub log: Option<LogFormatterFn>,
}

impl Formatters {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn level<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u32) -> Fields + Send + Sync + 'static,
    {
        self.level = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn bindings<F>(mut self, f: F) -> Self
    where
        F: Fn(Fields) -> Fields + Send + Sync + 'static,
    {
        self.bindings = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn log<F>(mut self, f: F) -> Self
    where
        F: Fn(Fields) -> Fields + Send + Sync + 'static,
    {
        self.log = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Formatters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatters")
            .field("level", &self.level.is_some())
            .field("bindings", &self.bindings.is_some())
            .field("log", &self.log.is_some())
            .finish()
    }
}

/// Encoder settings, fixed when the root logger is built
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub message_key: String,
    pub level_key: String,
    pub nested_key: Option<String>,
    /// Write the level label instead of its number
    pub level_labels: bool,
    /// Replace circular references instead of failing the call
    pub safe: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            message_key: DEFAULT_MESSAGE_KEY.to_string(),
            level_key: DEFAULT_LEVEL_KEY.to_string(),
            nested_key: None,
            level_labels: false,
            safe: true,
        }
    }
}

#[derive(Clone, Default)]
pub struct Encoder {
    config: EncoderConfig,
    level_formatter: Option<LevelFormatterFn>,
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("config", &self.config)
            .field("level_formatter", &self.level_formatter.is_some())
            .finish()
    }
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            level_formatter: None,
        }
    }

    #[must_use]
    pub fn with_level_formatter(mut self, formatter: Option<LevelFormatterFn>) -> Self {
        self.level_formatter = formatter;
        self
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode one event as a newline-terminated JSON line
    pub fn encode(&self, event: &LogEvent) -> Result<String> {
        let safe = self.config.safe;
        let mut line = Map::new();

        match &self.level_formatter {
            Some(formatter) => {
                for (key, value) in formatter(&event.level.label, event.level.value).iter() {
                    line.insert(key.clone(), to_json(value, safe)?);
                }
            }
            None if self.config.level_labels => {
                line.insert(
                    self.config.level_key.clone(),
                    Value::String(event.level.label.clone()),
                );
            }
            None => {
                line.insert(
                    self.config.level_key.clone(),
                    Value::Number(Number::from(event.level.value)),
                );
            }
        }

        if let Some(time) = &event.time {
            line.insert(TIME_KEY.to_string(), to_json(time, safe)?);
        }

        for (key, value) in event.bindings.iter() {
            if !self.is_reserved(key) {
                line.insert(key.clone(), to_json(value, safe)?);
            }
        }

        let mut object_message = None;
        match &self.config.nested_key {
            Some(nested) => {
                if !event.object.is_empty() {
                    line.insert(
                        nested.clone(),
                        to_json(&FieldValue::Object(event.object.clone()), safe)?,
                    );
                }
            }
            None => {
                for (key, value) in event.object.iter() {
                    if *key == self.config.message_key {
                        object_message = Some(value);
                    } else if !self.is_reserved(key) {
                        line.insert(key.clone(), to_json(value, safe)?);
                    }
                }
            }
        }

        match &event.message {
            Some(message) => {
                let text = if event.format_args.is_empty() {
                    message.clone()
                } else {
                    format_message(message, &event.format_args)
                };
                line.insert(self.config.message_key.clone(), Value::String(text));
            }
            None => {
                if let Some(value) = object_message {
                    line.insert(self.config.message_key.clone(), to_json(value, safe)?);
                }
            }
        }

        line.insert(VERSION_KEY.to_string(), Value::Number(Number::from(LOG_VERSION)));

        let mut text = serde_json::to_string(&Value::Object(line))?;
        text.push('\n');
        Ok(text)
    }

    fn is_reserved(&self, key: &str) -> bool {
        key == self.config.level_key
            || key == TIME_KEY
            || key == self.config.message_key
            || key == VERSION_KEY
    }
}

/// Convert a value tree to JSON
///
/// A shared node that is reached again while it is still being encoded is a
/// circular reference. With `safe` it is written as `"[Circular]"`, otherwise
/// the conversion fails. Aliased nodes that are not cycles are written in
/// full each time. Non-finite floats become `null`.
pub fn to_json(value: &FieldValue, safe: bool) -> Result<Value> {
    let mut ancestors = Vec::new();
    convert(value, safe, &mut ancestors)
}

fn convert(value: &FieldValue, safe: bool, ancestors: &mut Vec<usize>) -> Result<Value> {
    Ok(match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Int(i) => Value::Number(Number::from(*i)),
        FieldValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| convert(item, safe, ancestors))
                .collect::<Result<Vec<_>>>()?,
        ),
        FieldValue::Object(fields) => {
            let mut map = Map::new();
            for (key, item) in fields.iter() {
                map.insert(key.clone(), convert(item, safe, ancestors)?);
            }
            Value::Object(map)
        }
        FieldValue::Shared(node) => {
            let addr = node.addr();
            if ancestors.contains(&addr) {
                if safe {
                    return Ok(Value::String(CIRCULAR.to_string()));
                }
                return Err(LoggerError::encoding(
                    "circular reference in log object (enable `safe` to substitute it)",
                ));
            }
            ancestors.push(addr);
            let result = {
                let inner = node.read();
                convert(&inner, safe, ancestors)
            };
            ancestors.pop();
            result?
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::LevelInfo;
    use crate::core::value::SharedValue;

    fn info() -> LevelInfo {
        LevelInfo {
            label: "info".to_string(),
            value: 30,
        }
    }

    fn parse(line: &str) -> Value {
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        serde_json::from_str(line.trim_end()).expect("valid json")
    }

    #[test]
    fn test_field_order() {
        let event = LogEvent::new(info())
            .with_time(Some(FieldValue::Int(1)))
            .with_bindings(Arc::new(Fields::new().with_field("pid", 7)))
            .with_object(Fields::new().with_field("user", "a"))
            .with_message("hello");

        let line = Encoder::default().encode(&event).unwrap();
        assert_eq!(
            line,
            "{\"level\":30,\"time\":1,\"pid\":7,\"user\":\"a\",\"msg\":\"hello\",\"v\":1}\n"
        );
    }

    #[test]
    fn test_object_shadows_bindings() {
        let event = LogEvent::new(info())
            .with_bindings(Arc::new(Fields::new().with_field("a", 1)))
            .with_object(Fields::new().with_field("a", 2));

        let value = parse(&Encoder::default().encode(&event).unwrap());
        assert_eq!(value["a"], 2);
    }

    #[test]
    fn test_reserved_keys_not_overridden() {
        let event = LogEvent::new(info())
            .with_time(Some(FieldValue::Int(5)))
            .with_bindings(Arc::new(Fields::new().with_field("level", "bogus")))
            .with_object(
                Fields::new()
                    .with_field("time", 0)
                    .with_field("v", 99)
                    .with_field("msg", "from object"),
            )
            .with_message("real");

        let value = parse(&Encoder::default().encode(&event).unwrap());
        assert_eq!(value["level"], 30);
        assert_eq!(value["time"], 5);
        assert_eq!(value["v"], 1);
        assert_eq!(value["msg"], "real");
    }

    #[test]
    fn test_message_from_object_when_absent() {
        let event = LogEvent::new(info()).with_object(Fields::new().with_field("msg", "inner"));
        let value = parse(&Encoder::default().encode(&event).unwrap());
        assert_eq!(value["msg"], "inner");
    }

    #[test]
    fn test_message_omitted_and_no_time() {
        let line = Encoder::default().encode(&LogEvent::new(info())).unwrap();
        assert_eq!(line, "{\"level\":30,\"v\":1}\n");
    }

    #[test]
    fn test_printf_interpolation() {
        let event = LogEvent::new(info())
            .with_message("%s took %dms")
            .with_format_args(vec![FieldValue::from("query"), FieldValue::from(12)]);
        let value = parse(&Encoder::default().encode(&event).unwrap());
        assert_eq!(value["msg"], "query took 12ms");

        let literal = LogEvent::new(info()).with_message("100%% %s");
        let value = parse(&Encoder::default().encode(&literal).unwrap());
        assert_eq!(value["msg"], "100%% %s");
    }

    #[test]
    fn test_level_labels_and_custom_keys() {
        let encoder = Encoder::new(EncoderConfig {
            message_key: "message".to_string(),
            level_key: "severity".to_string(),
            level_labels: true,
            ..EncoderConfig::default()
        });
        let value = parse(&encoder.encode(&LogEvent::new(info()).with_message("x")).unwrap());
        assert_eq!(value["severity"], "info");
        assert_eq!(value["message"], "x");
    }

    #[test]
    fn test_level_formatter() {
        let encoder = Encoder::default().with_level_formatter(Some(Arc::new(|label, _| {
            Fields::new().with_field("lvl", label.to_uppercase())
        })));
        let value = parse(&encoder.encode(&LogEvent::new(info())).unwrap());
        assert_eq!(value["lvl"], "INFO");
        assert!(value.get("level").is_none());
    }

    #[test]
    fn test_nested_key() {
        let encoder = Encoder::new(EncoderConfig {
            nested_key: Some("payload".to_string()),
            ..EncoderConfig::default()
        });
        let event = LogEvent::new(info())
            .with_object(Fields::new().with_field("level", "inner").with_field("a", 1));
        let value = parse(&encoder.encode(&event).unwrap());
        assert_eq!(value["level"], 30);
        assert_eq!(value["payload"]["level"], "inner");
        assert_eq!(value["payload"]["a"], 1);
    }

    #[test]
    fn test_circular_safe() {
        let node = SharedValue::new(Fields::new().with_field("name", "root"));
        node.write()
            .as_object_mut()
            .expect("object")
            .insert("self", node.clone());

        let event = LogEvent::new(info()).with_object(Fields::new().with_field("node", node.clone()));
        let value = parse(&Encoder::default().encode(&event).unwrap());
        assert_eq!(value["node"]["name"], "root");
        assert_eq!(value["node"]["self"], CIRCULAR);

        node.set(FieldValue::Null);
    }

    #[test]
    fn test_circular_unsafe_fails() {
        let node = SharedValue::new(Fields::new());
        node.write()
            .as_object_mut()
            .expect("object")
            .insert("self", node.clone());

        let encoder = Encoder::new(EncoderConfig {
            safe: false,
            ..EncoderConfig::default()
        });
        let event = LogEvent::new(info()).with_object(Fields::new().with_field("node", node.clone()));
        let err = encoder.encode(&event).unwrap_err();
        assert!(matches!(err, LoggerError::Encoding { .. }));

        node.set(FieldValue::Null);
    }

    #[test]
    fn test_aliased_node_is_not_circular() {
        let shared = SharedValue::new("same");
        let object = Fields::new()
            .with_field("a", shared.clone())
            .with_field("b", shared);
        let value = to_json(&FieldValue::Object(object), false).unwrap();
        assert_eq!(value["a"], "same");
        assert_eq!(value["b"], "same");
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert_eq!(to_json(&FieldValue::Float(f64::NAN), true).unwrap(), Value::Null);
        assert_eq!(
            to_json(&FieldValue::Float(f64::INFINITY), true).unwrap(),
            Value::Null
        );
    }
}

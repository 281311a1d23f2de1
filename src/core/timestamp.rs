//! Time functions
//!
//! A time function produces the value written under the `time` key of each
//! line. It runs synchronously on the logging thread and may produce nothing,
//! in which case the key is omitted.

use super::error::{LoggerError, Result};
use super::value::FieldValue;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// Caller-supplied time function
pub type TimeFn = Arc<dyn Fn() -> Option<FieldValue> + Send + Sync>;

/// Configurable timestamp formats
///
/// This is the serializable subset of [`TimeFunction`], used by
/// configuration files.
///
/// # Examples
///
/// ```
/// use rust_structured_logger::core::TimestampFormat;
///
/// let format: TimestampFormat = serde_json::from_str("\"Iso8601\"").unwrap();
/// assert_eq!(format, TimestampFormat::Iso8601);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// Milliseconds since the Unix epoch: `1736332245123`
    #[default]
    EpochMillis,

    /// Whole seconds since the Unix epoch: `1736332245`
    UnixSeconds,

    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    Iso8601,

    /// Custom strftime format, written as a string
    ///
    /// ```
    /// use rust_structured_logger::core::TimestampFormat;
    ///
    /// // Apache log format
    /// let format = TimestampFormat::Custom("%d/%b/%Y:%H:%M:%S %z".to_string());
    /// ```
    Custom(String),

    /// No `time` key
    None,
}

impl TimestampFormat {
    /// Render `datetime` in this format; `None` for [`TimestampFormat::None`]
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> Option<FieldValue> {
        match self {
            TimestampFormat::EpochMillis => Some(FieldValue::Int(datetime.timestamp_millis())),
            TimestampFormat::UnixSeconds => Some(FieldValue::Int(datetime.timestamp())),
            TimestampFormat::Iso8601 => Some(FieldValue::String(
                datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            )),
            TimestampFormat::Custom(pattern) => {
                let mut rendered = String::new();
                // An unchecked pattern renders as no time rather than a panic.
                write!(rendered, "{}", datetime.format(pattern)).ok()?;
                Some(FieldValue::String(rendered))
            }
            TimestampFormat::None => None,
        }
    }

    /// Reject custom patterns containing an unknown strftime specifier
    pub fn validate(&self) -> Result<()> {
        if let TimestampFormat::Custom(pattern) = self {
            if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                return Err(LoggerError::config(
                    "TimestampFormat",
                    format!("invalid strftime pattern '{}'", pattern),
                ));
            }
        }
        Ok(())
    }

    /// Check if this format writes a number
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TimestampFormat::EpochMillis | TimestampFormat::UnixSeconds
        )
    }
}

/// Produces the `time` value of a line
#[derive(Clone, Default)]
pub enum TimeFunction {
    /// One of the built-in formats applied to the current UTC time
    Format(TimestampFormat),
    /// Epoch milliseconds
    #[default]
    EpochMillis,
    /// Caller-supplied closure
    Custom(TimeFn),
}

impl TimeFunction {
    pub fn unix_seconds() -> Self {
        TimeFunction::Format(TimestampFormat::UnixSeconds)
    }

    pub fn iso8601() -> Self {
        TimeFunction::Format(TimestampFormat::Iso8601)
    }

    /// Time function that omits the `time` key
    pub fn null() -> Self {
        TimeFunction::Format(TimestampFormat::None)
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn() -> Option<FieldValue> + Send + Sync + 'static,
    {
        TimeFunction::Custom(Arc::new(f))
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            TimeFunction::Format(format) => format.validate(),
            TimeFunction::EpochMillis | TimeFunction::Custom(_) => Ok(()),
        }
    }

    /// Value for a line written now
    pub fn now(&self) -> Option<FieldValue> {
        match self {
            TimeFunction::EpochMillis => Some(FieldValue::Int(Utc::now().timestamp_millis())),
            TimeFunction::Format(format) => format.format(&Utc::now()),
            TimeFunction::Custom(f) => f(),
        }
    }
}

impl From<TimestampFormat> for TimeFunction {
    fn from(format: TimestampFormat) -> Self {
        match format {
            TimestampFormat::EpochMillis => TimeFunction::EpochMillis,
            other => TimeFunction::Format(other),
        }
    }
}

impl fmt::Debug for TimeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeFunction::EpochMillis => write!(f, "TimeFunction::EpochMillis"),
            TimeFunction::Format(format) => write!(f, "TimeFunction::Format({:?})", format),
            TimeFunction::Custom(_) => write!(f, "TimeFunction::Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_datetime() -> DateTime<Utc> {
        // 2025-01-08 10:30:45.123456 UTC
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            + chrono::Duration::microseconds(123456)
    }

    #[test]
    fn test_epoch_millis_format() {
        let value = TimestampFormat::EpochMillis.format(&fixed_datetime());
        assert_eq!(value, Some(FieldValue::Int(1736332245123)));
    }

    #[test]
    fn test_unix_seconds_format() {
        let value = TimestampFormat::UnixSeconds.format(&fixed_datetime());
        assert_eq!(value, Some(FieldValue::Int(1736332245)));
    }

    #[test]
    fn test_iso8601_format() {
        let value = TimestampFormat::Iso8601.format(&fixed_datetime());
        assert_eq!(value, Some(FieldValue::from("2025-01-08T10:30:45.123Z")));
    }

    #[test]
    fn test_custom_apache_format() {
        let format = TimestampFormat::Custom("%d/%b/%Y:%H:%M:%S +0000".to_string());
        assert_eq!(
            format.format(&fixed_datetime()),
            Some(FieldValue::from("08/Jan/2025:10:30:45 +0000"))
        );
    }

    #[test]
    fn test_invalid_custom_pattern() {
        let format = TimestampFormat::Custom("%Y %Q".to_string());
        assert!(matches!(
            format.validate(),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
        assert!(TimeFunction::from(format.clone()).validate().is_err());
        assert_eq!(format.format(&fixed_datetime()), None);

        assert!(TimestampFormat::Custom("%d/%b/%Y".to_string()).validate().is_ok());
        assert!(TimestampFormat::Iso8601.validate().is_ok());
    }

    #[test]
    fn test_none_omits_time() {
        assert_eq!(TimestampFormat::None.format(&fixed_datetime()), None);
        assert_eq!(TimeFunction::null().now(), None);
    }

    #[test]
    fn test_is_numeric() {
        assert!(TimestampFormat::EpochMillis.is_numeric());
        assert!(TimestampFormat::UnixSeconds.is_numeric());
        assert!(!TimestampFormat::Iso8601.is_numeric());
        assert!(!TimestampFormat::Custom("%Y".to_string()).is_numeric());
    }

    #[test]
    fn test_default_time_function_is_epoch_millis() {
        let before = Utc::now().timestamp_millis();
        let value = TimeFunction::default().now().and_then(|v| v.as_i64());
        let after = Utc::now().timestamp_millis();

        let millis = value.expect("numeric time");
        assert!(millis >= before && millis <= after);
    }

    #[test]
    fn test_custom_time_function() {
        let time = TimeFunction::custom(|| Some(FieldValue::from("fixed")));
        assert_eq!(time.now(), Some(FieldValue::from("fixed")));
    }

    #[test]
    fn test_deserialization() {
        let format: TimestampFormat =
            serde_json::from_str("\"UnixSeconds\"").expect("deserialize UnixSeconds");
        assert_eq!(format, TimestampFormat::UnixSeconds);

        let format: TimestampFormat =
            serde_json::from_str(r#"{"Custom":"%Y-%m-%d"}"#).expect("deserialize Custom");
        assert_eq!(format, TimestampFormat::Custom("%Y-%m-%d".to_string()));
    }
}

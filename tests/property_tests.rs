//! Property-based tests for rust_structured_logger using proptest

use proptest::prelude::*;
use rust_structured_logger::core::{format_message, LevelMap};
use rust_structured_logger::destinations::MemoryHandle;
use rust_structured_logger::prelude::*;

fn memory_logger(builder: LoggerBuilder) -> (Logger, MemoryHandle) {
    let memory = MemoryDestination::new();
    let handle = memory.handle();
    let logger = builder
        .destination(memory)
        .base(None)
        .build()
        .expect("Failed to build logger");
    (logger, handle)
}

fn standard_level() -> impl Strategy<Value = Level> {
    prop_oneof![
        Just(Level::Trace),
        Just(Level::Debug),
        Just(Level::Info),
        Just(Level::Warn),
        Just(Level::Error),
        Just(Level::Fatal),
    ]
}

// ============================================================================
// Level Tests
// ============================================================================

proptest! {
    /// Level names parse back to the same level
    #[test]
    fn test_level_str_roundtrip(level in standard_level()) {
        let parsed: Level = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// A call is written iff its level is at or above the logger's level
    #[test]
    fn test_level_enabledness(configured in standard_level(), candidate in standard_level()) {
        let (logger, output) = memory_logger(Logger::builder().level(configured.to_str()));

        logger.log(candidate, "probe");

        let expected = candidate.value() >= configured.value();
        prop_assert_eq!(logger.is_level_enabled(candidate), expected);
        prop_assert_eq!(output.lines().len(), usize::from(expected));
    }

    /// Registered custom levels resolve by name and by value
    #[test]
    fn test_custom_level_resolution(name in "[a-z]{3,12}", value in 61u32..10_000) {
        prop_assume!(name.parse::<Level>().is_err() && name != "silent");

        let map = LevelMap::with_custom([(name.clone(), value)], false).unwrap();
        prop_assert_eq!(map.resolve(name.as_str()).unwrap(), value);
        prop_assert_eq!(map.resolve(value).unwrap(), value);
        prop_assert_eq!(map.label(value), Some(name.as_str()));
    }
}

// ============================================================================
// Encoding Tests
// ============================================================================

proptest! {
    /// Any message survives encoding as exactly one JSON line
    #[test]
    fn test_message_is_one_valid_line(message in any::<String>()) {
        prop_assume!(!message.contains('%'));
        let (logger, output) = memory_logger(Logger::builder());

        logger.info(message.as_str());

        let contents = output.contents();
        prop_assert_eq!(contents.matches('\n').count(), 1);
        prop_assert!(contents.ends_with('\n'));
        let line: serde_json::Value = serde_json::from_str(contents.trim_end_matches('\n')).unwrap();
        prop_assert_eq!(line["msg"].as_str().unwrap(), message.as_str());
        prop_assert_eq!(&line["v"], &serde_json::json!(1));
    }

    /// Templates without placeholders are returned unchanged
    #[test]
    fn test_format_without_placeholders(template in "[^%]*", n in any::<i64>()) {
        prop_assert_eq!(format_message(&template, &[FieldValue::from(n)]), template);
    }

    /// `%d` renders integers exactly
    #[test]
    fn test_format_integer(n in any::<i32>()) {
        prop_assert_eq!(format_message("n=%d", &[FieldValue::from(n)]), format!("n={}", n));
    }
}

// ============================================================================
// Redaction and Bindings Tests
// ============================================================================

proptest! {
    /// A redacted value never appears in the output
    #[test]
    fn test_redaction_never_leaks(secret in "[A-Za-z0-9]{12,32}", remove in any::<bool>()) {
        let (logger, output) = memory_logger(
            Logger::builder().redact(RedactOptions::new(["auth.secret", "list[*]"]).remove(remove)),
        );

        let object = fields! {
            "auth" => fields! { "secret" => secret.clone(), "user" => "u" },
            "list" => vec![secret.clone(), secret.clone()],
        };
        logger.info(log_args!(object, "redacted"));

        let contents = output.contents();
        prop_assert!(!contents.contains(&secret));
        let line: serde_json::Value = serde_json::from_str(contents.trim_end()).unwrap();
        if remove {
            prop_assert!(line["auth"].get("secret").is_none());
            prop_assert_eq!(line["list"].as_array().unwrap().len(), 0);
        } else {
            prop_assert_eq!(line["auth"]["secret"].as_str(), Some("[Redacted]"));
        }
        prop_assert_eq!(line["auth"]["user"].as_str(), Some("u"));
    }

    /// The deepest binding of a key wins and appears once
    #[test]
    fn test_bindings_shadowing(values in prop::collection::vec(any::<i64>(), 1..8)) {
        let (logger, output) = memory_logger(Logger::builder());

        let mut current = logger;
        for value in &values {
            current = current.child(fields! { "k" => *value }).unwrap();
        }
        current.info("deep");

        let contents = output.contents();
        prop_assert_eq!(contents.matches("\"k\"").count(), 1);
        let line: serde_json::Value = serde_json::from_str(contents.trim_end()).unwrap();
        prop_assert_eq!(line["k"].as_i64(), values.last().copied());
    }

    /// Flushing any number of times never duplicates lines
    #[test]
    fn test_flush_idempotent(lines in 0usize..20, flushes in 1usize..5) {
        let (logger, output) = memory_logger(
            Logger::builder().buffer_mode(SinkMode::Buffered { min_length: 1 << 16 }),
        );

        for i in 0..lines {
            logger.info(log_args!("line %d", i));
        }
        for _ in 0..flushes {
            prop_assert!(logger.flush().is_ok());
        }

        prop_assert_eq!(output.lines().len(), lines);
    }
}

//! Log level definitions and the level registry

use super::error::{LoggerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Label of the reserved level that disables all output
pub const SILENT: &str = "silent";

/// Severity of `silent`, above every real level
pub const SILENT_VALUE: u32 = u32::MAX;

/// Standard levels and their numeric severities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Level {
    Trace = 10,
    Debug = 20,
    #[default]
    Info = 30,
    Warn = 40,
    Error = 50,
    Fatal = 60,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    #[inline]
    pub fn value(&self) -> u32 {
        *self as u32
    }

    fn index(&self) -> usize {
        match self {
            Level::Trace => 0,
            Level::Debug => 1,
            Level::Info => 2,
            Level::Warn => 3,
            Level::Error => 4,
            Level::Fatal => 5,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            _ => Err(LoggerError::unknown_level(s)),
        }
    }
}

/// A level given either by name or by numeric severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSpec<'a> {
    Name(&'a str),
    Value(u32),
}

impl<'a> From<&'a str> for LevelSpec<'a> {
    fn from(name: &'a str) -> Self {
        LevelSpec::Name(name)
    }
}

impl<'a> From<&'a String> for LevelSpec<'a> {
    fn from(name: &'a String) -> Self {
        LevelSpec::Name(name)
    }
}

impl From<u32> for LevelSpec<'_> {
    fn from(value: u32) -> Self {
        LevelSpec::Value(value)
    }
}

impl From<Level> for LevelSpec<'_> {
    fn from(level: Level) -> Self {
        LevelSpec::Name(level.to_str())
    }
}

impl fmt::Display for LevelSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelSpec::Name(name) => write!(f, "{}", name),
            LevelSpec::Value(value) => write!(f, "{}", value),
        }
    }
}

/// Bidirectional mapping between level labels and severities
///
/// Built once when a logger is constructed and shared, read-only, by the
/// logger and all of its children.
#[derive(Debug, Clone)]
pub struct LevelMap {
    values: HashMap<String, u32>,
    labels: BTreeMap<u32, String>,
    standard: [Option<u32>; 6],
    only_custom: bool,
}

impl LevelMap {
    /// Registry holding the six standard levels and `silent`
    pub fn new() -> Self {
        let mut map = Self::empty(false);
        for level in Level::ALL {
            map.values.insert(level.to_str().to_string(), level.value());
            map.labels.insert(level.value(), level.to_str().to_string());
            map.standard[level.index()] = Some(level.value());
        }
        map
    }

    fn empty(only_custom: bool) -> Self {
        let mut values = HashMap::new();
        let mut labels = BTreeMap::new();
        values.insert(SILENT.to_string(), SILENT_VALUE);
        labels.insert(SILENT_VALUE, SILENT.to_string());
        Self {
            values,
            labels,
            standard: [None; 6],
            only_custom,
        }
    }

    /// Registry with custom levels, either added to the standard ones or,
    /// with `only_custom`, replacing them
    pub fn with_custom<I, S>(custom: I, only_custom: bool) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut map = if only_custom {
            Self::empty(true)
        } else {
            Self::new()
        };
        for (name, value) in custom {
            map.register(name, value)?;
        }
        if only_custom && map.values.len() == 1 {
            return Err(LoggerError::config(
                "LevelMap",
                "use_only_custom_levels requires at least one custom level",
            ));
        }
        Ok(map)
    }

    /// Register a custom level
    ///
    /// Only meant to be used while a logger is being constructed.
    pub fn register(&mut self, name: impl Into<String>, value: u32) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(LoggerError::config("LevelMap", "level name must not be empty"));
        }
        if name == SILENT || value == SILENT_VALUE {
            return Err(LoggerError::config(
                "LevelMap",
                format!("'{}' ({}) is reserved for the silent level", name, value),
            ));
        }
        if let Some(existing) = self.values.get(&name) {
            return Err(LoggerError::config(
                "LevelMap",
                format!("level '{}' already registered with value {}", name, existing),
            ));
        }
        if let Some(existing) = self.labels.get(&value) {
            return Err(LoggerError::config(
                "LevelMap",
                format!("value {} already used by level '{}'", value, existing),
            ));
        }

        if let Ok(level) = name.parse::<Level>() {
            if level.to_str() == name && level.value() == value {
                self.standard[level.index()] = Some(value);
            }
        }
        self.values.insert(name.clone(), value);
        self.labels.insert(value, name);
        Ok(())
    }

    /// Resolve a level name or value to its severity
    pub fn resolve<'a>(&self, level: impl Into<LevelSpec<'a>>) -> Result<u32> {
        match level.into() {
            LevelSpec::Name(name) => self
                .values
                .get(name)
                .copied()
                .ok_or_else(|| LoggerError::unknown_level(name)),
            LevelSpec::Value(value) => {
                if self.labels.contains_key(&value) {
                    Ok(value)
                } else {
                    Err(LoggerError::unknown_level(value.to_string()))
                }
            }
        }
    }

    /// Severity of a standard level, if it is part of this registry
    #[inline]
    pub fn standard(&self, level: Level) -> Option<u32> {
        self.standard[level.index()]
    }

    /// True iff a line at `candidate` passes a logger set to `current`
    #[inline]
    pub fn is_enabled(current: u32, candidate: u32) -> bool {
        current != SILENT_VALUE && candidate != SILENT_VALUE && candidate >= current
    }

    pub fn label(&self, value: u32) -> Option<&str> {
        self.labels.get(&value).map(String::as_str)
    }

    /// Name to severity mapping
    pub fn values(&self) -> &HashMap<String, u32> {
        &self.values
    }

    /// Severity to name mapping, ordered by severity
    pub fn labels(&self) -> &BTreeMap<u32, String> {
        &self.labels
    }

    pub fn only_custom(&self) -> bool {
        self.only_custom
    }
}

impl Default for LevelMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Label and severity of a level, as seen by hooks and formatters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelInfo {
    pub label: String,
    pub value: u32,
}

//! Path-based redaction of log records
//!
//! Paths use JavaScript-like dot and bracket notation:
//!
//! ```text
//! password            top-level key
//! user.password       nested key
//! headers["x-token"]  quoted key
//! items[0].secret     array index
//! users[*].email      every element of an array
//! *.password          every top-level object
//! ```
//!
//! Paths are compiled once. Wildcards are expanded while the record is walked,
//! since the shape of a record differs from call to call.

use super::error::{LoggerError, Result};
use super::value::{FieldValue, Fields};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default replacement for redacted values
pub const DEFAULT_CENSOR: &str = "[Redacted]";

/// Censor transform: receives the original value and the concrete path
pub type CensorFn = Arc<dyn Fn(&FieldValue, &[String]) -> FieldValue + Send + Sync>;

/// A single accessor of a compiled path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// A compiled redaction path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl RedactPath {
    /// Parse a dot/bracket path expression
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |message: String| LoggerError::config("Redactor", message);
        let chars: Vec<char> = raw.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;
        let mut expect_key = true;

        if chars.is_empty() {
            return Err(invalid("empty redaction path".to_string()));
        }

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    if expect_key {
                        return Err(invalid(format!("unexpected '.' at {} in '{}'", i, raw)));
                    }
                    expect_key = true;
                    i += 1;
                    if i == chars.len() {
                        return Err(invalid(format!("trailing '.' in '{}'", raw)));
                    }
                }
                '[' => {
                    let close = chars[i + 1..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|p| p + i + 1)
                        .ok_or_else(|| invalid(format!("unterminated '[' in '{}'", raw)))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    segments.push(Self::parse_bracket(&inner, raw)?);
                    expect_key = false;
                    i = close + 1;
                }
                _ => {
                    if !expect_key {
                        return Err(invalid(format!(
                            "expected '.' or '[' at {} in '{}'",
                            i, raw
                        )));
                    }
                    let start = i;
                    while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                        if chars[i] == ']' {
                            return Err(invalid(format!("unexpected ']' in '{}'", raw)));
                        }
                        i += 1;
                    }
                    let ident: String = chars[start..i].iter().collect();
                    segments.push(if ident == "*" {
                        PathSegment::Wildcard
                    } else {
                        PathSegment::Key(ident)
                    });
                    expect_key = false;
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    fn parse_bracket(inner: &str, raw: &str) -> Result<PathSegment> {
        let inner = inner.trim();
        if inner == "*" {
            return Ok(PathSegment::Wildcard);
        }
        let quoted = (inner.starts_with('"') && inner.ends_with('"'))
            || (inner.starts_with('\'') && inner.ends_with('\''));
        if quoted && inner.len() >= 2 {
            return Ok(PathSegment::Key(inner[1..inner.len() - 1].to_string()));
        }
        inner.parse::<usize>().map(PathSegment::Index).map_err(|_| {
            LoggerError::config(
                "Redactor",
                format!("invalid bracket accessor '[{}]' in '{}'", inner, raw),
            )
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

/// Replacement applied to matched values
#[derive(Clone)]
pub enum Censor {
    Text(String),
    Value(FieldValue),
    Transform(CensorFn),
}

impl Censor {
    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(&FieldValue, &[String]) -> FieldValue + Send + Sync + 'static,
    {
        Censor::Transform(Arc::new(f))
    }

    fn replacement(&self, original: &FieldValue, path: &[String]) -> FieldValue {
        match self {
            Censor::Text(text) => FieldValue::String(text.clone()),
            Censor::Value(value) => value.clone(),
            Censor::Transform(f) => f(original, path),
        }
    }
}

impl Default for Censor {
    fn default() -> Self {
        Censor::Text(DEFAULT_CENSOR.to_string())
    }
}

impl fmt::Debug for Censor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Censor::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Censor::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Censor::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

/// Which parts of a record a redactor applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactScope {
    /// Only the per-call object (after mixin and serializers)
    #[default]
    Object,
    /// The per-call object and the merged bindings of every ancestor
    ObjectAndBindings,
}

/// Redaction configuration
#[derive(Debug, Clone, Default)]
pub struct RedactOptions {
    pub paths: Vec<String>,
    pub censor: Censor,
    pub remove: bool,
    pub scope: RedactScope,
    /// Write through shared nodes instead of detaching them first
    pub in_place: bool,
}

impl RedactOptions {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn censor(mut self, censor: Censor) -> Self {
        self.censor = censor;
        self
    }

    #[must_use]
    pub fn remove(mut self, remove: bool) -> Self {
        self.remove = remove;
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: RedactScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn in_place(mut self, in_place: bool) -> Self {
        self.in_place = in_place;
        self
    }
}

/// Compiled set of redaction rules
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    paths: Vec<RedactPath>,
    censor: Censor,
    remove: bool,
    scope: RedactScope,
    in_place: bool,
}

impl Redactor {
    /// Compile redaction options; malformed paths are rejected here
    pub fn compile(options: &RedactOptions) -> Result<Self> {
        let paths = options
            .paths
            .iter()
            .map(|p| RedactPath::parse(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            paths,
            censor: options.censor.clone(),
            remove: options.remove,
            scope: options.scope,
            in_place: options.in_place,
        })
    }

    /// A redactor that does nothing
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn scope(&self) -> RedactScope {
        self.scope
    }

    pub fn paths(&self) -> &[RedactPath] {
        &self.paths
    }

    /// Censor or remove every existing match in `record`
    pub fn apply(&self, record: &mut Fields) {
        let mut walk = Walk::default();
        for path in &self.paths {
            self.walk_fields(record, path.segments(), &mut walk);
        }
    }

    fn walk_fields(&self, fields: &mut Fields, segments: &[PathSegment], walk: &mut Walk) {
        let Some((head, rest)) = segments.split_first() else {
            return;
        };

        let keys: Vec<String> = match head {
            PathSegment::Key(key) => {
                if fields.contains_key(key) {
                    vec![key.clone()]
                } else {
                    Vec::new()
                }
            }
            PathSegment::Index(idx) => {
                let key = idx.to_string();
                if fields.contains_key(&key) {
                    vec![key]
                } else {
                    Vec::new()
                }
            }
            PathSegment::Wildcard => fields.keys().cloned().collect(),
        };

        for key in keys {
            walk.trail.push(key.clone());
            if rest.is_empty() {
                if self.remove {
                    fields.remove(&key);
                } else if let Some(slot) = fields.get_mut(&key) {
                    *slot = self.censor.replacement(slot, &walk.trail);
                }
            } else if let Some(child) = fields.get_mut(&key) {
                self.walk_value(child, rest, walk);
            }
            walk.trail.pop();
        }
    }

    fn walk_items(
        &self,
        items: &mut Vec<FieldValue>,
        segments: &[PathSegment],
        walk: &mut Walk,
    ) {
        let Some((head, rest)) = segments.split_first() else {
            return;
        };

        let indexes: Vec<usize> = match head {
            PathSegment::Index(idx) if *idx < items.len() => vec![*idx],
            PathSegment::Key(key) => match key.parse::<usize>() {
                Ok(idx) if idx < items.len() => vec![idx],
                _ => Vec::new(),
            },
            PathSegment::Wildcard => (0..items.len()).collect(),
            PathSegment::Index(_) => Vec::new(),
        };

        if rest.is_empty() && self.remove {
            // Remove from the back so earlier indexes stay valid.
            for idx in indexes.into_iter().rev() {
                items.remove(idx);
            }
            return;
        }

        for idx in indexes {
            walk.trail.push(idx.to_string());
            if rest.is_empty() {
                let original = &items[idx];
                items[idx] = self.censor.replacement(original, &walk.trail);
            } else {
                self.walk_value(&mut items[idx], rest, walk);
            }
            walk.trail.pop();
        }
    }

    fn walk_value(&self, value: &mut FieldValue, segments: &[PathSegment], walk: &mut Walk) {
        match value {
            FieldValue::Object(fields) => self.walk_fields(fields, segments, walk),
            FieldValue::Array(items) => self.walk_items(items, segments, walk),
            FieldValue::Shared(node) => {
                let node = node.clone();
                if self.in_place {
                    // Locked further up this walk: the path re-entered a cycle.
                    if walk.locked.contains(&node.addr()) {
                        return;
                    }
                    if let Some(mut inner) = node.try_write() {
                        walk.locked.push(node.addr());
                        self.walk_value(&mut inner, segments, walk);
                        walk.locked.pop();
                        return;
                    }
                    // Someone else holds the node: redact a private copy instead.
                }
                // Detach: the caller's shared data is left untouched.
                let detached = if walk.locked.is_empty() {
                    Some(node.get())
                } else {
                    // Blocking here while holding other nodes could deadlock.
                    node.try_read().map(|inner| inner.clone())
                };
                match detached {
                    Some(mut detached) => {
                        self.walk_value(&mut detached, segments, walk);
                        *value = detached;
                    }
                    None => *value = self.censor.replacement(value, &walk.trail),
                }
            }
            _ => {}
        }
    }
}

/// Traversal state shared across one `apply`
#[derive(Default)]
struct Walk {
    trail: Vec<String>,
    // Shared nodes write-locked by this walk, innermost last
    locked: Vec<usize>,
}

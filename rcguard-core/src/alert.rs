//! Alert payloads and their composition
//!
//! ## Payload Shape
//!
//! An alert mirrors a diagnostic status message:
//!
//! ```text
//! AlertPayload
//! ├── name:    "gpiotrigger"
//! ├── level:   WARN (1)
//! ├── message: "Attention!"
//! └── values:  [ {key: "1", value: <line 1>}, {key: "2", value: <line 2>}, ... ]
//! ```
//!
//! The message is fixed. Anything an operator should read goes into the
//! annotation lines, which come from the alert file.
//!
//! ## Annotation Keys
//!
//! Keys are decimal sequence numbers drawn from one counter that lives for
//! the whole process. They never restart between payloads: if the alert file
//! has two lines, the first alert carries keys 1 and 2, the second 3 and 4.
//!
//! ## Alert Source File
//!
//! Plain text, one annotation per line. Lines starting with the comment
//! delimiter are skipped; blank lines are kept. A missing file is never
//! fatal, it is replaced by a single fallback line.

use core::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{ALERT_MESSAGE, DEFAULT_ALERT_LINE, DEFAULT_NODE_NAME, MISSING_ALERT_LINE};
use crate::errors::{RcError, RcResult};

/// Diagnostic severity
///
/// Serialized as the numeric level code of the status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Severity {
    /// Everything nominal
    Ok = 0,
    /// Anomaly worth a look (used by the discharge path)
    Warn = 1,
    /// Hard failure
    Error = 2,
    /// Data too old to trust
    Stale = 3,
}

impl Severity {
    /// Numeric level code
    pub const fn level(self) -> u8 {
        self as u8
    }

    /// Parse a numeric level code
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Severity::Ok),
            1 => Some(Severity::Warn),
            2 => Some(Severity::Error),
            3 => Some(Severity::Stale),
            _ => None,
        }
    }

    /// Get human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Stale => "STALE",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let level = u8::deserialize(deserializer)?;
        Severity::from_level(level)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown severity level {}", level)))
    }
}

/// One key/value annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Sequence number, rendered as decimal text
    pub key: String,
    /// Annotation text
    pub value: String,
}

/// Alert handed from the edge listener to the publish loop
///
/// Immutable once built; the queue slot owns it until the loop takes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Emitting node
    pub name: String,
    /// Severity, serialized as its level code
    pub level: Severity,
    /// Short fixed message
    pub message: String,
    /// Ordered annotations
    pub values: Vec<KeyValue>,
}

impl AlertPayload {
    /// Annotation texts in order
    pub fn annotation_texts(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|kv| kv.value.as_str())
    }
}

/// Annotation lines loaded once at startup
///
/// Cheap to clone; all clones share the same read-only lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertLines {
    lines: Arc<[String]>,
}

impl AlertLines {
    /// Wrap an explicit list of lines
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Single-line fallback used when no alert file was configured
    pub fn fallback() -> Self {
        Self::new([DEFAULT_ALERT_LINE])
    }

    /// Read an alert file, skipping lines that start with `comment_delim`
    pub fn load(path: impl AsRef<Path>, comment_delim: &str) -> RcResult<Self> {
        let path = path.as_ref();
        let source_err = |e: std::io::Error| RcError::AlertSource {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let reader = BufReader::new(File::open(path).map_err(source_err)?);
        let mut lines = Vec::new();

        for line in reader.lines() {
            let line = line.map_err(source_err)?;
            log_debug!("alert source: {}", line);
            if !line.starts_with(comment_delim) {
                lines.push(line);
            }
        }

        Ok(Self { lines: lines.into() })
    }

    /// Resolve the configured source, falling back instead of failing
    ///
    /// - `None` -> "Default GPIO event message"
    /// - unreadable file -> "Cannot find alert file for GPIO Listener"
    pub fn from_source(path: Option<&Path>, comment_delim: &str) -> Self {
        match path {
            None => Self::fallback(),
            Some(path) => match Self::load(path, comment_delim) {
                Ok(lines) => lines,
                Err(_e) => {
                    log_warn!("{}; using fallback annotation", _e);
                    Self::new([MISSING_ALERT_LINE])
                }
            },
        }
    }

    /// Lines in file order
    pub fn as_slice(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if there are no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Process-wide annotation key counter
///
/// Clones share the counter. The first key handed out is 1.
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter {
    last: Arc<AtomicU64>,
}

impl SequenceCounter {
    /// Create a counter whose next value is 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next sequence number
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Last number handed out (0 if none)
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}

/// Builds WARN alerts from annotation lines
#[derive(Debug, Clone)]
pub struct AlertComposer {
    name: String,
    lines: AlertLines,
    sequence: SequenceCounter,
}

impl AlertComposer {
    /// Create a composer for `lines` with a fresh key counter
    pub fn new(lines: AlertLines) -> Self {
        Self {
            name: DEFAULT_NODE_NAME.to_string(),
            lines,
            sequence: SequenceCounter::new(),
        }
    }

    /// Set the alert `name` field
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Share an existing key counter
    pub fn with_sequence(mut self, sequence: SequenceCounter) -> Self {
        self.sequence = sequence;
        self
    }

    /// Key counter used by this composer
    pub fn sequence(&self) -> &SequenceCounter {
        &self.sequence
    }

    /// Lines this composer annotates with
    pub fn lines(&self) -> &AlertLines {
        &self.lines
    }

    /// Build an alert from the loaded lines
    pub fn compose(&self) -> AlertPayload {
        self.compose_with(self.lines.as_slice())
    }

    /// Build an alert from an explicit list of lines
    ///
    /// An empty list still consumes no keys and yields no annotations.
    pub fn compose_with<S: AsRef<str>>(&self, lines: &[S]) -> AlertPayload {
        let values = lines
            .iter()
            .map(|line| KeyValue {
                key: self.sequence.next().to_string(),
                value: line.as_ref().to_string(),
            })
            .collect();

        AlertPayload {
            name: self.name.clone(),
            level: Severity::Warn,
            message: ALERT_MESSAGE.to_string(),
            values,
        }
    }
}

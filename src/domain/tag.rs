//! Tag values, snapshot entries, and change notifications.
//!
//! Snapshot entries and change events may carry the same logical value in
//! different JSON representations (`10`, `10.0`, `"10"`). Comparisons go
//! through [`TagValue::canonical`] so representation differences never
//! count as a change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive-or-string tag value as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    /// JSON `null`.
    Null,
    /// Boolean tag (coils, digital inputs).
    Bool(bool),
    /// Integral numeric tag.
    Integer(i64),
    /// Floating-point tag.
    Float(f64),
    /// Textual tag, or any value the server already rendered as text.
    Text(String),
}

impl TagValue {
    /// Returns the canonical string form used for display and comparison.
    ///
    /// Integral floats render without a fractional part, so `10.0` and
    /// `10` both canonicalize to `"10"`.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// Returns `true` if both values render to the same canonical string.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            // f64's Display already drops a trailing `.0`
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for TagValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for TagValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for TagValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// One element of a device's tag snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagEntry {
    /// Tag name, unique within the device.
    pub name: String,
    /// Current value.
    pub value: TagValue,
}

impl TagEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<TagValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Notification that some device's tag changed.
///
/// The protocol does not say which device emitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagChangeEvent {
    /// Name of the changed tag.
    pub name: String,
    /// New value.
    pub value: TagValue,
}

impl TagChangeEvent {
    /// Creates a new change event.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<TagValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

//! Arguments passed to listeners when an event fires.

use std::sync::Arc;

use serde_json::Value;

use pagehub_core::traits::ContentItem;

/// A single positional argument of a `fire` call.
///
/// Pages travel as live objects so that type-scoped listeners can be
/// matched against them; everything else is plain JSON.
#[derive(Debug, Clone)]
pub enum EventArg {
    /// A content item.
    Page(Arc<dyn ContentItem>),
    /// Any other value.
    Value(Value),
}

impl EventArg {
    /// Returns the page if this argument is one.
    pub fn as_page(&self) -> Option<&Arc<dyn ContentItem>> {
        match self {
            Self::Page(page) => Some(page),
            Self::Value(_) => None,
        }
    }

    /// Returns the JSON value if this argument is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Page(_) => None,
            Self::Value(value) => Some(value),
        }
    }

    /// Gets a string value.
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(|v| v.as_str())
    }

    /// Gets an i64 value.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(|v| v.as_i64())
    }
}

impl From<Value> for EventArg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Arc<dyn ContentItem>> for EventArg {
    fn from(page: Arc<dyn ContentItem>) -> Self {
        Self::Page(page)
    }
}

impl From<&str> for EventArg {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<String> for EventArg {
    fn from(value: String) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<i64> for EventArg {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for EventArg {
    fn from(value: bool) -> Self {
        Self::Value(Value::from(value))
    }
}

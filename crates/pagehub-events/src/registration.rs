//! Registration records stored in the event registry.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use uuid::Uuid;

use pagehub_core::error::AppError;
use pagehub_core::result::AppResult;

use crate::listener::Listener;

/// Fixed priority of page-type-scoped registrations.
///
/// Type-scoped listeners run ahead of every global listener of the same event.
pub const PAGE_TYPE_PRIORITY: i32 = i32::MIN;

/// The two tiers of the event taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Eligible for every fire of its event.
    Global,
    /// Eligible only when the first argument is a page of the matching type.
    PageType,
}

impl EventKind {
    /// Returns the string name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::PageType => "page_type",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Location of the code unit that defines a listener.
///
/// Either absolute (leading `/` or `\`, or a drive letter such as `C:`) or
/// relative to the configured base directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocation(String);

impl SourceLocation {
    /// Creates a source location.
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Returns the raw location string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the location is absolute.
    pub fn is_absolute(&self) -> bool {
        let bytes = self.0.as_bytes();
        matches!(bytes.first(), Some(b'/') | Some(b'\\')) || bytes.get(1) == Some(&b':')
    }

    /// Resolves the location against `base` unless it is already absolute.
    pub fn resolve(&self, base: &Path) -> PathBuf {
        if self.is_absolute() {
            PathBuf::from(&self.0)
        } else {
            base.join(&self.0)
        }
    }
}

impl From<&str> for SourceLocation {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

impl From<String> for SourceLocation {
    fn from(location: String) -> Self {
        Self(location)
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a registration invokes.
#[derive(Debug, Clone)]
pub enum ListenerTarget {
    /// A listener that is invoked directly.
    Callable(Arc<dyn Listener>),
    /// A method on a listener class, resolved at dispatch time.
    Method {
        /// Class identifier.
        class: String,
        /// Method name.
        method: String,
    },
}

impl ListenerTarget {
    /// Creates a method target.
    pub fn method(class: &str, method: &str) -> Self {
        Self::Method {
            class: class.to_string(),
            method: method.to_string(),
        }
    }

    /// Human-readable description used in logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Callable(_) => "<closure>".to_string(),
            Self::Method { class, method } => format!("{class}::{method}"),
        }
    }
}

/// A global registration request, built by the caller and passed to `extend`.
#[derive(Debug, Clone)]
pub struct Extension {
    /// Listener target.
    pub target: ListenerTarget,
    /// Code unit to load before the first invocation.
    pub source: Option<SourceLocation>,
    /// Parameters appended after the fire arguments.
    pub params: Vec<Value>,
    /// Priority; falls back to the configured default when unset.
    pub priority: Option<i32>,
}

impl Extension {
    /// Creates an extension for the given target.
    pub fn new(target: ListenerTarget) -> Self {
        Self {
            target,
            source: None,
            params: Vec::new(),
            priority: None,
        }
    }

    /// Creates an extension invoking a listener directly.
    pub fn callable(listener: Arc<dyn Listener>) -> Self {
        Self::new(ListenerTarget::Callable(listener))
    }

    /// Creates an extension invoking `class::method`.
    pub fn method(class: &str, method: &str) -> Self {
        Self::new(ListenerTarget::method(class, method))
    }

    /// Sets the source location.
    pub fn with_source(mut self, source: impl Into<SourceLocation>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Appends a bound parameter.
    pub fn with_param(mut self, param: Value) -> Self {
        self.params.push(param);
        self
    }

    /// Replaces the bound parameters.
    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    /// Sets the priority (lower runs first).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Checks that the extension is well formed.
    pub fn validate(&self) -> AppResult<()> {
        match &self.target {
            ListenerTarget::Callable(_) => {
                if let Some(source) = &self.source {
                    return Err(AppError::validation(format!(
                        "Closure listeners cannot carry a source location ('{source}')"
                    )));
                }
            }
            ListenerTarget::Method { class, method } => {
                if class.trim().is_empty() {
                    return Err(AppError::validation("Listener class must not be empty"));
                }
                if method.trim().is_empty() {
                    return Err(AppError::validation(format!(
                        "Listener method for class '{class}' must not be empty"
                    )));
                }
            }
        }
        if let Some(source) = &self.source {
            if source.as_str().trim().is_empty() {
                return Err(AppError::validation("Source location must not be empty"));
            }
        }
        Ok(())
    }
}

/// One entry in an event's listener sequence.
#[derive(Debug)]
pub struct EventRegistration {
    /// Unique registration id.
    pub id: Uuid,
    /// Event this registration belongs to.
    pub event: String,
    /// Global or page-type-scoped.
    pub kind: EventKind,
    /// What to invoke.
    pub target: ListenerTarget,
    /// Code unit to load before the first invocation; the scope key for page types.
    pub source: Option<SourceLocation>,
    /// Parameters appended after the fire arguments.
    pub params: Vec<Value>,
    /// Priority (lower = earlier execution).
    pub priority: i32,
    /// Set once the source has been loaded for this registration.
    loaded: OnceCell<()>,
}

impl EventRegistration {
    /// Builds a global registration from a validated extension.
    pub fn global(event: &str, extension: Extension, default_priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            event: event.to_string(),
            kind: EventKind::Global,
            target: extension.target,
            source: extension.source,
            params: extension.params,
            priority: extension.priority.unwrap_or(default_priority),
            loaded: OnceCell::new(),
        }
    }

    /// Builds a page-type-scoped registration.
    pub fn page_type(event: &str, class: &str, source: SourceLocation, params: Vec<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event: event.to_string(),
            kind: EventKind::PageType,
            target: ListenerTarget::method(class, event),
            source: Some(source),
            params,
            priority: PAGE_TYPE_PRIORITY,
            loaded: OnceCell::new(),
        }
    }

    /// Returns whether the source has been loaded for this registration.
    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Runs `load` unless a previous call already succeeded.
    ///
    /// A failed load leaves the registration unloaded.
    pub async fn load_once<F, Fut>(&self, load: F) -> AppResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<()>>,
    {
        self.loaded.get_or_try_init(load).await.map(|_| ())
    }

    /// Returns a serializable snapshot of this registration.
    pub fn info(&self) -> RegistrationInfo {
        RegistrationInfo {
            id: self.id,
            event: self.event.clone(),
            kind: self.kind,
            target: self.target.describe(),
            source: self.source.clone(),
            params: self.params.clone(),
            priority: self.priority,
            loaded: self.is_loaded(),
        }
    }
}

/// Snapshot of a registration for introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationInfo {
    /// Registration id.
    pub id: Uuid,
    /// Event name.
    pub event: String,
    /// Kind.
    pub kind: EventKind,
    /// Target description.
    pub target: String,
    /// Source location.
    pub source: Option<SourceLocation>,
    /// Bound parameters.
    pub params: Vec<Value>,
    /// Priority.
    pub priority: i32,
    /// Whether the source has been loaded.
    pub loaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ClosureListener;
    use pagehub_core::error::ErrorKind;

    #[test]
    fn test_source_location_absolute_detection() {
        assert!(SourceLocation::from("/srv/site/models/a.rs").is_absolute());
        assert!(SourceLocation::from("C:\\site\\models\\a.rs").is_absolute());
        assert!(SourceLocation::from("\\\\share\\a.rs").is_absolute());
        assert!(!SourceLocation::from("models/a.rs").is_absolute());
        assert!(!SourceLocation::from("a").is_absolute());
    }

    #[test]
    fn test_source_location_resolve() {
        let base = Path::new("/srv/site");
        assert_eq!(
            SourceLocation::from("models/a.rs").resolve(base),
            PathBuf::from("/srv/site/models/a.rs")
        );
        assert_eq!(
            SourceLocation::from("/opt/a.rs").resolve(base),
            PathBuf::from("/opt/a.rs")
        );
    }

    #[test]
    fn test_extension_validation() {
        assert!(Extension::method("Mailer", "on_user_add").validate().is_ok());

        let err = Extension::method("", "on_user_add").validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = Extension::method("Mailer", " ").validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let listener = ClosureListener::sync("noop", |_| Ok(None)).into_arc();
        let err = Extension::callable(listener)
            .with_source("models/mailer.rs")
            .validate()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_global_registration_uses_default_priority() {
        let reg = EventRegistration::global("on_user_add", Extension::method("A", "b"), 5);
        assert_eq!(reg.priority, 5);
        assert_eq!(reg.kind, EventKind::Global);

        let reg = EventRegistration::global(
            "on_user_add",
            Extension::method("A", "b").with_priority(-3),
            5,
        );
        assert_eq!(reg.priority, -3);
    }

    #[test]
    fn test_page_type_registration_targets_event_method() {
        let reg = EventRegistration::page_type(
            "on_page_add",
            "BlogEntryPageTypeController",
            SourceLocation::from("controllers/page_types/blog_entry.rs"),
            Vec::new(),
        );
        assert_eq!(reg.kind, EventKind::PageType);
        assert_eq!(reg.priority, PAGE_TYPE_PRIORITY);
        assert_eq!(
            reg.target.describe(),
            "BlogEntryPageTypeController::on_page_add"
        );
    }

    #[tokio::test]
    async fn test_load_once_retries_after_failure() {
        let reg = EventRegistration::global("e", Extension::method("A", "b"), 5);

        let err = reg
            .load_once(|| async { Err::<(), _>(AppError::resolution("missing")) })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resolution);
        assert!(!reg.is_loaded());

        reg.load_once(|| async { Ok::<_, AppError>(()) }).await.unwrap();
        assert!(reg.is_loaded());

        // Already loaded: the closure is not run again.
        reg.load_once(|| async { Err::<(), _>(AppError::internal("ran twice")) })
            .await
            .unwrap();
        assert!(reg.info().loaded);
    }
}

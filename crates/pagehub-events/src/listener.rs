//! Listener contracts and the closure/method-table implementations.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use pagehub_core::result::AppResult;

use crate::args::EventArg;

/// A unit of code invoked when an event fires.
///
/// `args` holds the `fire` arguments followed by the registration's bound
/// parameters. Returning `Ok(None)` (or `Ok(Some(Value::Null))`) leaves the
/// dispatch result untouched; returning an error aborts the dispatch.
#[async_trait]
pub trait Listener: Send + Sync + std::fmt::Debug {
    /// Handles an event invocation.
    async fn call(&self, args: Vec<EventArg>) -> AppResult<Option<Value>>;
}

/// A named group of listener methods, such as a page type controller.
///
/// Method lookup is an explicit optional step: a class that does not
/// provide a method simply returns `None`, and the dispatcher skips it.
pub trait ListenerClass: Send + Sync + std::fmt::Debug {
    /// Stable identifier the class is registered under.
    fn identifier(&self) -> &str;

    /// Resolves a method by name.
    fn method(&self, name: &str) -> Option<Arc<dyn Listener>>;
}

type ListenerFuture = Pin<Box<dyn Future<Output = AppResult<Option<Value>>> + Send>>;

type BoxedHandler = Arc<dyn Fn(Vec<EventArg>) -> ListenerFuture + Send + Sync>;

/// A closure-based listener.
pub struct ClosureListener {
    /// Label used in logs.
    name: String,
    /// Handler function.
    handler: BoxedHandler,
}

impl std::fmt::Debug for ClosureListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureListener")
            .field("name", &self.name)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureListener {
    /// Creates a listener from an async closure.
    pub fn new<F, Fut>(name: &str, handler: F) -> Self
    where
        F: Fn(Vec<EventArg>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Option<Value>>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            handler: Arc::new(move |args: Vec<EventArg>| -> ListenerFuture {
                Box::pin(handler(args))
            }),
        }
    }

    /// Creates a listener from a plain (non-async) closure.
    pub fn sync<F>(name: &str, handler: F) -> Self
    where
        F: Fn(Vec<EventArg>) -> AppResult<Option<Value>> + Send + Sync + 'static,
    {
        Self::new(name, move |args| std::future::ready(handler(args)))
    }

    /// Returns the listener label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wraps the listener into an `Arc<dyn Listener>`.
    pub fn into_arc(self) -> Arc<dyn Listener> {
        Arc::new(self)
    }
}

#[async_trait]
impl Listener for ClosureListener {
    async fn call(&self, args: Vec<EventArg>) -> AppResult<Option<Value>> {
        (self.handler)(args).await
    }
}

/// A [`ListenerClass`] backed by a name → listener map.
#[derive(Debug, Clone)]
pub struct MethodTable {
    /// Class identifier.
    identifier: String,
    /// Method name → listener.
    methods: HashMap<String, Arc<dyn Listener>>,
}

impl MethodTable {
    /// Creates an empty method table.
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            methods: HashMap::new(),
        }
    }

    /// Adds a method.
    pub fn with_method(mut self, name: &str, listener: Arc<dyn Listener>) -> Self {
        self.methods.insert(name.to_string(), listener);
        self
    }

    /// Adds a method backed by a plain closure.
    pub fn with_fn<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(Vec<EventArg>) -> AppResult<Option<Value>> + Send + Sync + 'static,
    {
        let label = format!("{}::{}", self.identifier, name);
        self.with_method(name, ClosureListener::sync(&label, handler).into_arc())
    }

    /// Returns the method names this table provides.
    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(|k| k.as_str()).collect()
    }

    /// Wraps the table into an `Arc<dyn ListenerClass>`.
    pub fn into_arc(self) -> Arc<dyn ListenerClass> {
        Arc::new(self)
    }
}

impl ListenerClass for MethodTable {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn method(&self, name: &str) -> Option<Arc<dyn Listener>> {
        self.methods.get(name).cloned()
    }
}

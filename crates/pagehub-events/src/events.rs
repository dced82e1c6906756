//! Events service — registration API and dispatch entry point.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use pagehub_core::config::events::EventsConfig;
use pagehub_core::error::AppError;
use pagehub_core::result::AppResult;

use crate::args::EventArg;
use crate::dispatcher::EventDispatcher;
use crate::loader::{ModuleLoader, SourceLoader};
use crate::page_type::{self, DefaultPageTypeResolver, PageTypeResolver};
use crate::registration::{EventRegistration, Extension, RegistrationInfo};
use crate::registry::EventRegistry;

/// The event framework of one host application.
///
/// Constructed once at startup and shared via `Arc`; registrations live as
/// long as the service does.
#[derive(Debug)]
pub struct Events {
    /// Registry of all registrations.
    registry: Arc<EventRegistry>,
    /// Dispatcher for firing events.
    dispatcher: Arc<EventDispatcher>,
    /// Page type controller resolver.
    resolver: Arc<dyn PageTypeResolver>,
    /// Default priority for global registrations.
    default_priority: i32,
    /// Events covered by `extend_page_type` without an event name.
    page_type_events: Vec<String>,
}

impl Events {
    /// Creates the service from configuration, loading listener sources through `source`.
    pub fn new(config: &EventsConfig, source: Arc<dyn SourceLoader>) -> Self {
        let resolver = Arc::new(DefaultPageTypeResolver::from_config(config));
        Self::with_resolver(config, source, resolver)
    }

    /// Creates the service with a custom page type resolver.
    pub fn with_resolver(
        config: &EventsConfig,
        source: Arc<dyn SourceLoader>,
        resolver: Arc<dyn PageTypeResolver>,
    ) -> Self {
        let registry = Arc::new(EventRegistry::new());
        let loader = Arc::new(ModuleLoader::new(&config.base_dir, source));
        let dispatcher = Arc::new(EventDispatcher::new(
            registry.clone(),
            loader,
            resolver.clone(),
        ));

        Self {
            registry,
            dispatcher,
            resolver,
            default_priority: config.default_priority,
            page_type_events: config.page_type_events.clone(),
        }
    }

    /// Registers a global listener for `event`.
    ///
    /// ```rust,ignore
    /// events
    ///     .extend(
    ///         "on_user_add",
    ///         Extension::method("MySpecialClass", "create_special_user_info")
    ///             .with_source("models/my_special_class.rs")
    ///             .with_param(json!({ "foo": "bar" })),
    ///     )
    ///     .await?;
    /// ```
    pub async fn extend(&self, event: &str, extension: Extension) -> AppResult<()> {
        validate_event_name(event)?;
        extension.validate()?;

        self.registry
            .insert(EventRegistration::global(event, extension, self.default_priority))
            .await;
        Ok(())
    }

    /// Binds a page type's controller to its lifecycle events.
    ///
    /// With `event` unset, registers every configured lifecycle event;
    /// otherwise registers only `event`. Nothing is registered unless the
    /// handle and every event name are valid.
    pub async fn extend_page_type(
        &self,
        handle: &str,
        event: Option<&str>,
        params: Vec<Value>,
    ) -> AppResult<()> {
        match event {
            Some(event) => self.extend_page_type_for_event(handle, event, params).await,
            None => {
                validate_handle(handle)?;
                for event in &self.page_type_events {
                    validate_event_name(event)?;
                }
                for event in &self.page_type_events {
                    self.registry
                        .insert(self.page_type_registration(handle, event, params.clone()))
                        .await;
                }
                info!(
                    handle = %handle,
                    events = self.page_type_events.len(),
                    "Page type bound to lifecycle events"
                );
                Ok(())
            }
        }
    }

    /// Binds `handle`'s controller method named `event` to `event`.
    pub async fn extend_page_type_for_event(
        &self,
        handle: &str,
        event: &str,
        params: Vec<Value>,
    ) -> AppResult<()> {
        validate_event_name(event)?;
        validate_handle(handle)?;

        self.registry
            .insert(self.page_type_registration(handle, event, params))
            .await;
        Ok(())
    }

    fn page_type_registration(
        &self,
        handle: &str,
        event: &str,
        params: Vec<Value>,
    ) -> EventRegistration {
        let class = page_type::controller_class(handle);
        let source = self.resolver.controller_path(handle);
        EventRegistration::page_type(event, &class, source, params)
    }

    /// Fires `event`; see [`EventDispatcher::fire`].
    pub async fn fire(&self, event: &str, args: Vec<EventArg>) -> AppResult<Value> {
        self.dispatcher.fire(event, args).await
    }

    /// Fires `event` with anything convertible into event arguments.
    pub async fn fire_with<I, A>(&self, event: &str, args: I) -> AppResult<Value>
    where
        I: IntoIterator<Item = A>,
        A: Into<EventArg>,
    {
        let args = args.into_iter().map(Into::into).collect();
        self.dispatcher.fire(event, args).await
    }

    /// Returns the number of registrations for an event.
    pub async fn listener_count(&self, event: &str) -> usize {
        self.registry.listener_count(event).await
    }

    /// Returns whether an event has any registrations.
    pub async fn has_listeners(&self, event: &str) -> bool {
        self.registry.has_listeners(event).await
    }

    /// Lists all events with registrations.
    pub async fn registered_events(&self) -> Vec<String> {
        self.registry.registered_events().await
    }

    /// Lists an event's registrations in dispatch order.
    pub async fn registrations(&self, event: &str) -> Vec<RegistrationInfo> {
        self.registry.registrations(event).await
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Returns the event registry.
    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.registry
    }
}

fn validate_event_name(event: &str) -> AppResult<()> {
    if event.trim().is_empty() {
        return Err(AppError::validation("Event name must not be empty"));
    }
    Ok(())
}

fn validate_handle(handle: &str) -> AppResult<()> {
    if handle.trim().is_empty() {
        return Err(AppError::validation("Page type handle must not be empty"));
    }
    Ok(())
}

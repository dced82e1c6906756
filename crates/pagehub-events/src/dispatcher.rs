//! Event dispatcher — fires an event to its registrations in priority order.
//!
//! - Registrations are snapshotted before any listener runs, so listeners
//!   may register or fire events themselves.
//! - Page-type registrations only run when the first argument is a page of
//!   the matching type.
//! - A listener's source is loaded right before its first eligible run.
//! - Each listener receives the fire arguments followed by its bound params.
//! - The last non-null listener result is returned; `NO_RESULT` otherwise.
//! - The first listener or load error ends the dispatch and is returned.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use pagehub_core::result::AppResult;

use crate::args::EventArg;
use crate::loader::ModuleLoader;
use crate::page_type::{self, PageTypeResolver};
use crate::registration::{EventKind, EventRegistration, ListenerTarget};
use crate::registry::EventRegistry;

/// Value returned by `fire` when no listener produced a non-null result.
pub const NO_RESULT: Value = Value::Bool(false);

/// Dispatches events to registered listeners.
#[derive(Debug)]
pub struct EventDispatcher {
    /// Event registry.
    registry: Arc<EventRegistry>,
    /// Loader for listener sources.
    loader: Arc<ModuleLoader>,
    /// Page type controller resolver, used for scope matching.
    resolver: Arc<dyn PageTypeResolver>,
}

impl EventDispatcher {
    /// Creates a new dispatcher.
    pub fn new(
        registry: Arc<EventRegistry>,
        loader: Arc<ModuleLoader>,
        resolver: Arc<dyn PageTypeResolver>,
    ) -> Self {
        Self {
            registry,
            loader,
            resolver,
        }
    }

    /// Fires `event` with `args` and returns the folded listener result.
    pub async fn fire(&self, event: &str, args: Vec<EventArg>) -> AppResult<Value> {
        let registrations = self.registry.listeners(event).await;

        if registrations.is_empty() {
            trace!(event = %event, "No listeners for event");
            return Ok(NO_RESULT);
        }

        debug!(
            event = %event,
            listener_count = registrations.len(),
            arg_count = args.len(),
            "Firing event"
        );

        let mut result = NO_RESULT;

        for registration in &registrations {
            if registration.kind == EventKind::PageType && !self.is_eligible(registration, &args) {
                trace!(
                    event = %event,
                    registration_id = %registration.id,
                    "Page type listener out of scope, skipping"
                );
                continue;
            }

            if let Some(response) = self.invoke(registration, &args).await? {
                if !response.is_null() {
                    result = response;
                }
            }
        }

        Ok(result)
    }

    fn is_eligible(&self, registration: &EventRegistration, args: &[EventArg]) -> bool {
        match &registration.source {
            Some(scope) => page_type::in_scope(self.resolver.as_ref(), scope, args),
            None => false,
        }
    }

    /// Loads, resolves and calls one registration.
    ///
    /// Returns `Ok(None)` when the target method does not exist.
    async fn invoke(
        &self,
        registration: &EventRegistration,
        args: &[EventArg],
    ) -> AppResult<Option<Value>> {
        if let Some(source) = &registration.source {
            registration
                .load_once(|| self.loader.require(source))
                .await?;
        }

        let listener = match &registration.target {
            ListenerTarget::Callable(listener) => listener.clone(),
            ListenerTarget::Method { class, method } => {
                match self.loader.classes().resolve(class, method).await {
                    Some(listener) => listener,
                    None => {
                        debug!(
                            event = %registration.event,
                            class = %class,
                            method = %method,
                            "Listener method not defined, skipping"
                        );
                        return Ok(None);
                    }
                }
            }
        };

        let mut call_args = Vec::with_capacity(args.len() + registration.params.len());
        call_args.extend(args.iter().cloned());
        call_args.extend(registration.params.iter().cloned().map(EventArg::Value));

        listener.call(call_args).await.inspect_err(|e| {
            warn!(
                event = %registration.event,
                target = %registration.target.describe(),
                registration_id = %registration.id,
                error = %e,
                "Listener failed, aborting dispatch"
            );
        })
    }

    /// Returns a reference to the event registry.
    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.registry
    }

    /// Returns a reference to the module loader.
    pub fn loader(&self) -> &Arc<ModuleLoader> {
        &self.loader
    }
}

//! # pagehub-events
//!
//! In-process event framework for PageHub. Provides:
//!
//! - An event registry keyed by event name, kept in priority order
//! - Global and page-type-scoped registrations
//! - A dispatcher that fires events synchronously in the caller's task and
//!   folds listener results (last non-null result wins)
//! - Lazy, idempotent loading of listener code units by source location
//! - Optional dynamic loading via `libloading` (feature `dynamic`)

pub mod args;
pub mod dispatcher;
pub mod events;
pub mod listener;
pub mod loader;
pub mod macros;
pub mod page_type;
pub mod prelude;
pub mod registration;
pub mod registry;
pub mod sorter;

pub use args::EventArg;
pub use dispatcher::{EventDispatcher, NO_RESULT};
pub use events::Events;
pub use listener::{ClosureListener, Listener, ListenerClass, MethodTable};
pub use loader::{ClassTable, ModuleLoader, SourceLoader, StaticSourceLoader};
pub use page_type::{DefaultPageTypeResolver, PageTypeResolver};
pub use registration::{EventKind, EventRegistration, Extension, ListenerTarget, SourceLocation};
pub use registry::EventRegistry;

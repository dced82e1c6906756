//! Prelude for convenient imports.

pub use async_trait::async_trait;

pub use pagehub_core::error::AppError;
pub use pagehub_core::result::AppResult;
pub use pagehub_core::traits::ContentItem;

pub use crate::args::EventArg;
pub use crate::dispatcher::NO_RESULT;
pub use crate::events::Events;
pub use crate::listener::{ClosureListener, Listener, ListenerClass, MethodTable};
pub use crate::loader::{SourceLoader, StaticSourceLoader};
pub use crate::registration::{Extension, ListenerTarget, SourceLocation};

pub use crate::event_args;

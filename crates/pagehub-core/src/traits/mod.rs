//! Traits implemented by collaborators of the event core.

pub mod content;

pub use content::ContentItem;

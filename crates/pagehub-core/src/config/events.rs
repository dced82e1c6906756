//! Event core configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Lifecycle events a page type is registered for when no event is named.
pub const PAGE_TYPE_LIFECYCLE_EVENTS: [&str; 10] = [
    "on_page_add",
    "on_page_update",
    "on_page_duplicate",
    "on_page_move",
    "on_page_view",
    "on_page_version_approve",
    "on_page_delete",
    "on_composer_publish",
    "on_composer_save_draft",
    "on_composer_delete_draft",
];

/// Settings for listener registration and dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Base directory that relative source locations are resolved against.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
    /// Directory (relative to `base_dir`) holding page type controllers.
    #[serde(default = "default_controllers_dir")]
    pub page_type_controllers_dir: String,
    /// Page type handle → controller location, for packages that ship their
    /// own controller outside the default directory.
    #[serde(default)]
    pub controller_overrides: HashMap<String, String>,
    /// Priority assigned to global registrations that do not set one.
    #[serde(default = "default_priority")]
    pub default_priority: i32,
    /// Events a page type is bound to by `extend_page_type` without an event name.
    #[serde(default = "default_page_type_events")]
    pub page_type_events: Vec<String>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            page_type_controllers_dir: default_controllers_dir(),
            controller_overrides: HashMap::new(),
            default_priority: default_priority(),
            page_type_events: default_page_type_events(),
        }
    }
}

fn default_base_dir() -> String {
    ".".to_string()
}

fn default_controllers_dir() -> String {
    "controllers/page_types".to_string()
}

fn default_priority() -> i32 {
    5
}

fn default_page_type_events() -> Vec<String> {
    PAGE_TYPE_LIFECYCLE_EVENTS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

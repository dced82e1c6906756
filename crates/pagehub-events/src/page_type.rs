//! Page type naming conventions and scope matching.

use std::collections::HashMap;

use pagehub_core::config::events::EventsConfig;
use pagehub_core::traits::ContentItem;

use crate::args::EventArg;
use crate::registration::SourceLocation;

/// Suffix appended to the camel-cased handle to form the controller class.
const CONTROLLER_SUFFIX: &str = "PageTypeController";

/// Maps a page type handle to the location of its controller.
pub trait PageTypeResolver: Send + Sync + std::fmt::Debug {
    /// Returns the controller source location for `handle`.
    fn controller_path(&self, handle: &str) -> SourceLocation;
}

/// Resolves controllers to `<controllers_dir>/<handle>.rs`, unless an
/// override is configured for the handle.
#[derive(Debug, Clone)]
pub struct DefaultPageTypeResolver {
    /// Directory holding page type controllers.
    controllers_dir: String,
    /// Handle → controller location.
    overrides: HashMap<String, String>,
}

impl DefaultPageTypeResolver {
    /// Creates a resolver rooted at `controllers_dir`.
    pub fn new(controllers_dir: &str) -> Self {
        Self {
            controllers_dir: controllers_dir.trim_end_matches(['/', '\\']).to_string(),
            overrides: HashMap::new(),
        }
    }

    /// Creates a resolver from the event configuration.
    pub fn from_config(config: &EventsConfig) -> Self {
        let mut resolver = Self::new(&config.page_type_controllers_dir);
        resolver.overrides = config.controller_overrides.clone();
        resolver
    }

    /// Points `handle` at a controller outside the default directory.
    pub fn with_override(mut self, handle: &str, location: &str) -> Self {
        self.overrides
            .insert(handle.to_string(), location.to_string());
        self
    }
}

impl PageTypeResolver for DefaultPageTypeResolver {
    fn controller_path(&self, handle: &str) -> SourceLocation {
        match self.overrides.get(handle) {
            Some(location) => SourceLocation::new(location.clone()),
            None => SourceLocation::new(format!("{}/{}.rs", self.controllers_dir, handle)),
        }
    }
}

/// Converts `blog_entry` / `blog-entry` / `blog/entry` into `BlogEntry`.
pub fn camelcase(handle: &str) -> String {
    handle
        .split(['_', '-', '/', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Returns the controller class identifier for a page type handle.
pub fn controller_class(handle: &str) -> String {
    format!("{}{}", camelcase(handle), CONTROLLER_SUFFIX)
}

/// Returns whether a type-scoped registration keyed by `scope` applies to a
/// dispatch with these arguments.
///
/// The first argument must be a page with a non-zero type id whose handle
/// resolves to exactly `scope`.
pub fn in_scope(
    resolver: &dyn PageTypeResolver,
    scope: &SourceLocation,
    args: &[EventArg],
) -> bool {
    let Some(page) = args.first().and_then(EventArg::as_page) else {
        return false;
    };
    page_matches(resolver, scope, page.as_ref())
}

fn page_matches(
    resolver: &dyn PageTypeResolver,
    scope: &SourceLocation,
    page: &dyn ContentItem,
) -> bool {
    if page.collection_type_id() <= 0 {
        return false;
    }
    match page.collection_type_handle() {
        Some(handle) => resolver.controller_path(handle) == *scope,
        None => false,
    }
}

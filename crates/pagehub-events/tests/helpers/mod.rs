//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::Value;

use pagehub_core::config::events::EventsConfig;
use pagehub_core::config::logging::LoggingConfig;
use pagehub_events::prelude::*;

/// Base directory used by every test service.
pub const BASE_DIR: &str = "/site";

/// A page with a fixed type.
#[derive(Debug)]
pub struct TestPage {
    pub type_id: i64,
    pub handle: Option<String>,
}

impl ContentItem for TestPage {
    fn collection_type_id(&self) -> i64 {
        self.type_id
    }

    fn collection_type_handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }
}

/// Builds a page argument.
pub fn page(type_id: i64, handle: &str) -> EventArg {
    let page: Arc<dyn ContentItem> = Arc::new(TestPage {
        type_id,
        handle: Some(handle.to_string()),
    });
    EventArg::Page(page)
}

/// Records which listeners ran and with which arguments.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// A listener that records `label` and returns `response`.
    pub fn listener(&self, label: &str, response: Option<Value>) -> Arc<dyn Listener> {
        let journal = self.clone();
        let label = label.to_string();
        ClosureListener::sync(&label.clone(), move |_args| {
            journal.push(label.clone());
            Ok(response.clone())
        })
        .into_arc()
    }

    /// A listener that records its arguments rendered as strings.
    pub fn arg_recorder(&self, label: &str) -> Arc<dyn Listener> {
        let journal = self.clone();
        let label = label.to_string();
        ClosureListener::sync(&label.clone(), move |args| {
            let rendered: Vec<String> = args.iter().map(render).collect();
            journal.push(format!("{}({})", label, rendered.join(", ")));
            Ok(None)
        })
        .into_arc()
    }
}

fn render(arg: &EventArg) -> String {
    match arg {
        EventArg::Page(page) => format!(
            "page:{}",
            page.collection_type_handle().unwrap_or_default()
        ),
        EventArg::Value(value) => value.to_string(),
    }
}

/// A service with the default configuration rooted at [`BASE_DIR`].
pub fn events(source: StaticSourceLoader) -> Events {
    pagehub_core::logging::init_logging(&LoggingConfig {
        level: "warn".to_string(),
        format: "pretty".to_string(),
    });
    let config = EventsConfig {
        base_dir: BASE_DIR.to_string(),
        ..EventsConfig::default()
    };
    Events::new(&config, Arc::new(source))
}

/// A service with no loadable units.
pub fn empty_events() -> Events {
    events(StaticSourceLoader::new())
}

/// Resolved path of a page type controller for [`events`].
pub fn controller_path(handle: &str) -> String {
    format!("{BASE_DIR}/controllers/page_types/{handle}.rs")
}

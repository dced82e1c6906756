//! Integration tests for concurrent registration and dispatch.

mod helpers;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{Barrier, Notify};

use pagehub_core::config::events::EventsConfig;
use pagehub_events::loader::ClassTable;
use pagehub_events::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_extend_loses_nothing() {
    let events = Arc::new(helpers::empty_events());

    let mut handles = Vec::new();
    for i in 0..64_i64 {
        let events = events.clone();
        handles.push(tokio::spawn(async move {
            let listener = ClosureListener::sync(&format!("l{i}"), |_| Ok(None)).into_arc();
            events
                .extend(
                    "on_shared",
                    Extension::callable(listener)
                        .with_param(json!(i))
                        .with_priority((i % 3) as i32),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let registrations = events.registrations("on_shared").await;
    assert_eq!(registrations.len(), 64);

    let ids: HashSet<_> = registrations.iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 64);

    let params: HashSet<i64> = registrations
        .iter()
        .filter_map(|r| r.params[0].as_i64())
        .collect();
    assert_eq!(params.len(), 64);

    assert!(
        registrations
            .windows(2)
            .all(|w| w[0].priority <= w[1].priority)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_listener_does_not_block_other_events() {
    let events = Arc::new(helpers::empty_events());
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Notify::new());

    let (gate_started, gate_release) = (started.clone(), release.clone());
    let slow = ClosureListener::new("slow", move |_args| {
        let started = gate_started.clone();
        let release = gate_release.clone();
        async move {
            started.wait().await;
            release.notified().await;
            Ok::<_, AppError>(Some(json!("slow")))
        }
    });
    events
        .extend("on_slow", Extension::callable(slow.into_arc()))
        .await
        .unwrap();
    events
        .extend(
            "on_fast",
            Extension::callable(
                ClosureListener::sync("fast", |_| Ok(Some(json!("fast")))).into_arc(),
            ),
        )
        .await
        .unwrap();

    let slow_events = events.clone();
    let slow_fire = tokio::spawn(async move { slow_events.fire("on_slow", Vec::new()).await });

    started.wait().await;

    // The slow dispatch is parked inside its listener; other events and
    // registrations must still go through.
    let fast = tokio::time::timeout(Duration::from_secs(5), events.fire("on_fast", Vec::new()))
        .await
        .expect("fast fire blocked")
        .unwrap();
    assert_eq!(fast, json!("fast"));

    tokio::time::timeout(
        Duration::from_secs(5),
        events.extend(
            "on_slow",
            Extension::callable(ClosureListener::sync("more", |_| Ok(None)).into_arc()),
        ),
    )
    .await
    .expect("extend blocked")
    .unwrap();

    release.notify_one();
    let slow = slow_fire.await.unwrap().unwrap();
    assert_eq!(slow, json!("slow"));
}

/// Defines `Slow` from `/site/slow.rs` once released, and `Fast` from
/// `/site/fast.rs` immediately.
#[derive(Debug)]
struct GatedLoader {
    started: Arc<Barrier>,
    release: Arc<Notify>,
}

#[async_trait]
impl SourceLoader for GatedLoader {
    async fn load(&self, path: &Path, classes: &ClassTable) -> AppResult<()> {
        if path == Path::new("/site/slow.rs") {
            self.started.wait().await;
            self.release.notified().await;
            let class = MethodTable::new("Slow").with_fn("run", |_| Ok(Some(json!("slow"))));
            classes.define(class.into_arc()).await;
        } else {
            let class = MethodTable::new("Fast").with_fn("run", |_| Ok(Some(json!("fast"))));
            classes.define(class.into_arc()).await;
        }
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_source_load_does_not_block_other_loads() {
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Notify::new());
    let config = EventsConfig {
        base_dir: helpers::BASE_DIR.to_string(),
        ..EventsConfig::default()
    };
    let loader = GatedLoader {
        started: started.clone(),
        release: release.clone(),
    };
    let events = Arc::new(Events::new(&config, Arc::new(loader)));

    events
        .extend("on_a", Extension::method("Slow", "run").with_source("slow.rs"))
        .await
        .unwrap();
    events
        .extend("on_b", Extension::method("Fast", "run").with_source("fast.rs"))
        .await
        .unwrap();

    let slow_events = events.clone();
    let slow_fire = tokio::spawn(async move { slow_events.fire("on_a", Vec::new()).await });

    started.wait().await;

    let fast = tokio::time::timeout(Duration::from_secs(5), events.fire("on_b", Vec::new()))
        .await
        .expect("fire(on_b) waited for the load of slow.rs")
        .unwrap();
    assert_eq!(fast, json!("fast"));

    release.notify_one();
    assert_eq!(slow_fire.await.unwrap().unwrap(), json!("slow"));
}

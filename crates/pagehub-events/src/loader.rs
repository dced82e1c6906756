//! Lazy loading of listener code units.
//!
//! A registration may name a source location whose code unit defines the
//! listener class it targets. [`ModuleLoader`] resolves the location against
//! the base directory and asks a [`SourceLoader`] to load it into the
//! [`ClassTable`], at most once per resolved path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use pagehub_core::error::AppError;
use pagehub_core::result::AppResult;

use crate::listener::{Listener, ListenerClass};
use crate::registration::SourceLocation;

/// Listener classes known to the process, keyed by identifier.
#[derive(Debug, Default)]
pub struct ClassTable {
    /// Identifier → class.
    classes: RwLock<HashMap<String, Arc<dyn ListenerClass>>>,
}

impl ClassTable {
    /// Creates an empty class table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a class. Redefining an identifier replaces the previous class.
    pub async fn define(&self, class: Arc<dyn ListenerClass>) {
        let identifier = class.identifier().to_string();
        let mut classes = self.classes.write().await;
        if classes.insert(identifier.clone(), class).is_some() {
            debug!(class = %identifier, "Listener class redefined");
        }
    }

    /// Gets a class by identifier.
    pub async fn get(&self, identifier: &str) -> Option<Arc<dyn ListenerClass>> {
        let classes = self.classes.read().await;
        classes.get(identifier).cloned()
    }

    /// Resolves `class::method`. Missing classes and missing methods both yield `None`.
    pub async fn resolve(&self, class: &str, method: &str) -> Option<Arc<dyn Listener>> {
        self.get(class).await.and_then(|c| c.method(method))
    }

    /// Returns whether a class is defined.
    pub async fn contains(&self, identifier: &str) -> bool {
        let classes = self.classes.read().await;
        classes.contains_key(identifier)
    }

    /// Returns the number of defined classes.
    pub async fn len(&self) -> usize {
        let classes = self.classes.read().await;
        classes.len()
    }

    /// Returns whether no class is defined.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Loads the code unit at a resolved path.
#[async_trait]
pub trait SourceLoader: Send + Sync + std::fmt::Debug {
    /// Loads the unit at `path`, defining its classes in `classes`.
    ///
    /// Fails with a resolution error if nothing can be loaded from `path`.
    async fn load(&self, path: &Path, classes: &ClassTable) -> AppResult<()>;
}

/// A [`SourceLoader`] over compiled-in code units keyed by path.
#[derive(Debug, Default)]
pub struct StaticSourceLoader {
    /// Resolved path → classes defined by that unit.
    units: HashMap<PathBuf, Vec<Arc<dyn ListenerClass>>>,
}

impl StaticSourceLoader {
    /// Creates a loader with no units.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a code unit at `path` defining `classes`.
    pub fn with_unit(
        mut self,
        path: impl Into<PathBuf>,
        classes: Vec<Arc<dyn ListenerClass>>,
    ) -> Self {
        self.units.entry(path.into()).or_default().extend(classes);
        self
    }

    /// Returns the number of units.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}

#[async_trait]
impl SourceLoader for StaticSourceLoader {
    async fn load(&self, path: &Path, classes: &ClassTable) -> AppResult<()> {
        let unit = self.units.get(path).ok_or_else(|| {
            AppError::resolution(format!("No code unit found at '{}'", path.display()))
        })?;

        for class in unit {
            classes.define(class.clone()).await;
        }
        Ok(())
    }
}

/// Resolve-or-fail front for a [`SourceLoader`], with per-path caching.
#[derive(Debug)]
pub struct ModuleLoader {
    /// Base directory for relative locations.
    base_dir: PathBuf,
    /// Classes defined by loaded units.
    ///
    /// Declared before `source`: fields drop in order, and classes from a
    /// dynamic unit must be dropped before its library is unloaded.
    classes: Arc<ClassTable>,
    /// Underlying loader.
    source: Arc<dyn SourceLoader>,
    /// One load cell per resolved path. The map lock is only held while
    /// looking up a cell, so loads of different paths run concurrently.
    loads: RwLock<HashMap<PathBuf, Arc<OnceCell<()>>>>,
}

impl ModuleLoader {
    /// Creates a module loader.
    pub fn new(base_dir: impl Into<PathBuf>, source: Arc<dyn SourceLoader>) -> Self {
        Self {
            base_dir: base_dir.into(),
            classes: Arc::new(ClassTable::new()),
            source,
            loads: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves a location to the path handed to the source loader.
    pub fn resolve_path(&self, location: &SourceLocation) -> PathBuf {
        location.resolve(&self.base_dir)
    }

    /// Loads the unit at `location` unless it was loaded before.
    ///
    /// Concurrent requests for the same path share one load; a failed load
    /// leaves the path unloaded for the next request.
    pub async fn require(&self, location: &SourceLocation) -> AppResult<()> {
        let path = self.resolve_path(location);
        let cell = self.load_cell(&path).await;

        cell.get_or_try_init(|| async {
            debug!(path = %path.display(), "Loading listener source");
            self.source
                .load(&path, &self.classes)
                .await
                .inspect_err(|e| {
                    warn!(path = %path.display(), error = %e, "Listener source failed to load");
                })?;
            info!(path = %path.display(), "Listener source loaded");
            Ok::<_, AppError>(())
        })
        .await
        .map(|_| ())
    }

    async fn load_cell(&self, path: &Path) -> Arc<OnceCell<()>> {
        {
            let loads = self.loads.read().await;
            if let Some(cell) = loads.get(path) {
                return cell.clone();
            }
        }
        let mut loads = self.loads.write().await;
        loads.entry(path.to_path_buf()).or_default().clone()
    }

    /// Returns whether the unit at `location` has been loaded.
    pub async fn is_loaded(&self, location: &SourceLocation) -> bool {
        let path = self.resolve_path(location);
        let loads = self.loads.read().await;
        loads.get(&path).is_some_and(|cell| cell.initialized())
    }

    /// Returns the class table.
    pub fn classes(&self) -> &Arc<ClassTable> {
        &self.classes
    }

    /// Returns the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Dynamic source loader using `libloading` (feature-gated).
#[cfg(feature = "dynamic")]
pub mod dynamic_loader {
    use std::mem::ManuallyDrop;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tracing::info;

    use pagehub_core::error::AppError;
    use pagehub_core::result::AppResult;

    use super::{ClassTable, SourceLoader};
    use crate::listener::ListenerClass;

    /// Symbol every dynamic listener unit must export.
    pub const ENTRY_SYMBOL: &[u8] = b"pagehub_listener_classes";

    /// Type of the entry function exported by dynamic listener units.
    ///
    /// Units must be built with the same compiler and `pagehub-events` version
    /// as the host, since the returned value crosses the boundary as a Rust type.
    pub type ListenerClassesFn = unsafe fn() -> Vec<Arc<dyn ListenerClass>>;

    /// Loads listener units from shared libraries (.so / .dll / .dylib).
    ///
    /// Libraries are never unloaded: classes they define may be shared
    /// beyond the loader and hold vtables into the library.
    pub struct DynamicSourceLoader {
        /// Loaded libraries.
        libraries: Mutex<Vec<ManuallyDrop<libloading::Library>>>,
    }

    impl DynamicSourceLoader {
        /// Creates a new dynamic loader.
        pub fn new() -> Self {
            Self {
                libraries: Mutex::new(Vec::new()),
            }
        }

        fn open(&self, path: &Path) -> AppResult<Vec<Arc<dyn ListenerClass>>> {
            std::fs::metadata(path)?;

            // SAFETY: loading a library runs its initialisers; only trusted
            // units may be configured as listener sources.
            let lib = unsafe { libloading::Library::new(path) }.map_err(|e| {
                AppError::resolution(format!(
                    "Failed to load listener library '{}': {}",
                    path.display(),
                    e
                ))
            })?;

            // SAFETY: the symbol type is part of the unit contract above.
            let classes = unsafe {
                let entry: libloading::Symbol<ListenerClassesFn> =
                    lib.get(ENTRY_SYMBOL).map_err(|e| {
                        AppError::resolution(format!(
                            "Listener library '{}' missing entry symbol: {}",
                            path.display(),
                            e
                        ))
                    })?;
                entry()
            };

            self.libraries
                .lock()
                .map_err(|_| AppError::internal("Dynamic loader state poisoned"))?
                .push(ManuallyDrop::new(lib));

            Ok(classes)
        }
    }

    impl Default for DynamicSourceLoader {
        fn default() -> Self {
            Self::new()
        }
    }

    impl std::fmt::Debug for DynamicSourceLoader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let loaded = self.libraries.lock().map(|l| l.len()).unwrap_or(0);
            f.debug_struct("DynamicSourceLoader")
                .field("loaded_count", &loaded)
                .finish()
        }
    }

    #[async_trait]
    impl SourceLoader for DynamicSourceLoader {
        async fn load(&self, path: &Path, classes: &ClassTable) -> AppResult<()> {
            let unit = self.open(path)?;
            let count = unit.len();
            for class in unit {
                classes.define(class).await;
            }
            info!(path = %path.display(), classes = count, "Dynamic listener unit loaded");
            Ok(())
        }
    }
}

#[cfg(feature = "dynamic")]
pub use dynamic_loader::DynamicSourceLoader;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::MethodTable;
    use pagehub_core::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingLoader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SourceLoader for CountingLoader {
        async fn load(&self, _path: &Path, classes: &ClassTable) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            classes
                .define(MethodTable::new("Counted").with_fn("run", |_| Ok(None)).into_arc())
                .await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_require_loads_each_path_once() {
        let counting = Arc::new(CountingLoader::default());
        let loader = ModuleLoader::new("/site", counting.clone());

        loader.require(&SourceLocation::from("models/a.rs")).await.unwrap();
        loader.require(&SourceLocation::from("models/a.rs")).await.unwrap();
        loader
            .require(&SourceLocation::from("/site/models/a.rs"))
            .await
            .unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

        loader.require(&SourceLocation::from("models/b.rs")).await.unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
        assert!(loader.classes().contains("Counted").await);
    }

    #[tokio::test]
    async fn test_static_loader_unknown_path_is_resolution_error() {
        let source = StaticSourceLoader::new().with_unit(
            "/site/models/mailer.rs",
            vec![MethodTable::new("Mailer").into_arc()],
        );
        let loader = ModuleLoader::new("/site", Arc::new(source));

        loader
            .require(&SourceLocation::from("models/mailer.rs"))
            .await
            .unwrap();
        assert!(loader.is_loaded(&SourceLocation::from("models/mailer.rs")).await);
        assert_eq!(loader.classes().len().await, 1);

        let err = loader
            .require(&SourceLocation::from("models/missing.rs"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resolution);
        assert!(!loader.is_loaded(&SourceLocation::from("models/missing.rs")).await);
    }

    #[tokio::test]
    async fn test_require_retries_after_failed_load() {
        let loader = ModuleLoader::new("/site", Arc::new(StaticSourceLoader::new()));
        let location = SourceLocation::from("models/late.rs");

        assert!(loader.require(&location).await.is_err());
        assert!(loader.require(&location).await.is_err());
        assert!(!loader.is_loaded(&location).await);
    }

    #[cfg(feature = "dynamic")]
    #[tokio::test]
    async fn test_dynamic_loader_missing_library_is_resolution_error() {
        let loader = ModuleLoader::new("/nonexistent", Arc::new(DynamicSourceLoader::new()));
        let location = SourceLocation::from("listeners/libmissing.so");

        let err = loader.require(&location).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resolution);
        assert!(!loader.is_loaded(&location).await);
        assert!(loader.classes().is_empty().await);
    }

    #[tokio::test]
    async fn test_class_table_resolution() {
        let table = ClassTable::new();
        assert!(table.is_empty().await);
        table
            .define(MethodTable::new("Mailer").with_fn("on_user_add", |_| Ok(None)).into_arc())
            .await;

        assert!(table.resolve("Mailer", "on_user_add").await.is_some());
        assert!(table.resolve("Mailer", "on_user_delete").await.is_none());
        assert!(table.resolve("Unknown", "on_user_add").await.is_none());
    }
}

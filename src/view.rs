//! View definitions and lazy resolution
//!
//! The navigator never renders anything. A view slot holds either a concrete
//! [`ViewComponent`] the host can use immediately, or a [`ViewLoader`] that
//! produces one asynchronously (code splitting, remote modules). Before a
//! transition commits, [`resolve_views`] makes sure every activated record's
//! slots are concrete.
//!
//! Both handle types are opaque `Any` values: the host decides what a view
//! actually is and downcasts on its side of the boundary.

use crate::error::NavigationError;
use crate::record::RouteRecord;
use crate::trace_log;
use futures_util::future::try_join_all;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

/// Opaque view value owned by the host view layer.
#[derive(Clone)]
pub struct ViewComponent {
    inner: Arc<dyn Any + Send + Sync>,
}

impl ViewComponent {
    /// Wrap a host view value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Downcast back to the host's view type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }
}

impl fmt::Debug for ViewComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ViewComponent(..)")
    }
}

/// Opaque live view handle, registered by the host after instantiation.
#[derive(Clone)]
pub struct ViewInstance {
    inner: Arc<dyn Any + Send + Sync>,
}

impl ViewInstance {
    /// Wrap a host view instance.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Downcast back to the host's instance type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }
}

impl fmt::Debug for ViewInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ViewInstance(..)")
    }
}

/// Future produced by a view loader.
pub type ViewFuture =
    Pin<Box<dyn Future<Output = Result<ViewComponent, NavigationError>> + Send>>;

/// Asynchronous view factory with a first-resolution-wins cache.
///
/// Clones share the cache, so alias records that reuse the original record's
/// slots also reuse its resolution.
#[derive(Clone)]
pub struct ViewLoader {
    load: Arc<dyn Fn() -> ViewFuture + Send + Sync>,
    resolved: Arc<OnceLock<ViewComponent>>,
}

impl ViewLoader {
    /// Create a loader from an async factory.
    pub fn new<F, Fut>(load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ViewComponent, NavigationError>> + Send + 'static,
    {
        Self {
            load: Arc::new(move || Box::pin(load())),
            resolved: Arc::new(OnceLock::new()),
        }
    }

    /// The cached component, if a previous resolution completed.
    pub fn resolved(&self) -> Option<&ViewComponent> {
        self.resolved.get()
    }

    fn start(&self) -> ViewFuture {
        (self.load)()
    }

    fn cache(&self, view: &ViewComponent) {
        // First write wins; late duplicates are ignored.
        let _ = self.resolved.set(view.clone());
    }
}

impl fmt::Debug for ViewLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewLoader")
            .field("resolved", &self.resolved.get().is_some())
            .finish()
    }
}

/// A view slot entry: concrete, or loaded on demand.
#[derive(Clone, Debug)]
pub enum ViewDefinition {
    /// Concrete view value
    Ready(ViewComponent),
    /// Factory resolved during the transition that first activates it
    Lazy(ViewLoader),
}

impl ViewDefinition {
    /// Concrete definition from a host view value.
    pub fn ready<T: Any + Send + Sync>(value: T) -> Self {
        ViewDefinition::Ready(ViewComponent::new(value))
    }

    /// Lazy definition from an async factory.
    pub fn lazy<F, Fut>(load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ViewComponent, NavigationError>> + Send + 'static,
    {
        ViewDefinition::Lazy(ViewLoader::new(load))
    }

    /// The concrete component, when already available.
    pub fn component(&self) -> Option<ViewComponent> {
        match self {
            ViewDefinition::Ready(view) => Some(view.clone()),
            ViewDefinition::Lazy(loader) => loader.resolved().cloned(),
        }
    }

    /// Whether this definition still needs resolution.
    pub fn needs_resolution(&self) -> bool {
        matches!(self, ViewDefinition::Lazy(loader) if loader.resolved().is_none())
    }
}

/// Resolve every unresolved lazy view definition in the activated chain.
///
/// All discovered loaders are started before any is awaited; the step
/// completes when all of them have resolved, and the first failure fails the
/// whole step. With nothing to load this returns synchronously.
pub async fn resolve_views(activated: &[Arc<RouteRecord>]) -> Result<(), NavigationError> {
    let mut pending: Vec<(Arc<RouteRecord>, String, ViewLoader)> = Vec::new();
    for record in activated {
        for (slot, definition) in record.view_slots() {
            if let ViewDefinition::Lazy(loader) = &definition {
                if loader.resolved().is_none() {
                    pending.push((Arc::clone(record), slot, loader.clone()));
                }
            }
        }
    }

    if pending.is_empty() {
        return Ok(());
    }

    trace_log!("resolving {} lazy view definition(s)", pending.len());

    let futures: Vec<ViewFuture> = pending.iter().map(|(_, _, loader)| loader.start()).collect();
    let views = try_join_all(futures).await?;

    for ((record, slot, loader), view) in pending.into_iter().zip(views) {
        loader.cache(&view);
        record.store_resolved_view(&slot, view);
    }
    Ok(())
}

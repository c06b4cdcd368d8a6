//! Navigation guards
//!
//! A guard is one step of the transition pipeline. It inspects the target and
//! current routes and resolves to a [`GuardVerdict`]: proceed, cancel, fail,
//! redirect, or proceed-and-defer a callback until the entered view instance
//! exists. Guards may suspend as long as they like; the pipeline waits, and
//! cancellation of a superseded transition happens between steps, never by
//! preemption.

use crate::error::NavigationError;
use crate::location::RawLocation;
use crate::route::Route;
use crate::view::ViewInstance;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Callback deferred until the entered view instance is registered.
pub type DeferredEnter = Box<dyn FnOnce(&ViewInstance) + Send>;

/// Decision produced by a guard.
pub enum GuardVerdict {
    /// Continue with the next pipeline step
    Proceed,
    /// Abort the navigation; the URL snaps back to the previous route
    Cancel,
    /// Abort the navigation with an error, surfaced to error listeners
    Failure(NavigationError),
    /// Abort this navigation and start a new one for the given target
    Redirect(RawLocation),
    /// Continue, and invoke the callback after commit once the entered
    /// record's view instance has been registered
    ProceedAndCall(DeferredEnter),
}

impl GuardVerdict {
    /// Continue with the navigation.
    pub fn proceed() -> Self {
        GuardVerdict::Proceed
    }

    /// Cancel the navigation without an error message.
    pub fn cancel() -> Self {
        GuardVerdict::Cancel
    }

    /// Fail the navigation with a message.
    pub fn failure(message: impl Into<String>) -> Self {
        GuardVerdict::Failure(NavigationError::failure(message))
    }

    /// Redirect to another target.
    pub fn redirect(target: impl Into<RawLocation>) -> Self {
        GuardVerdict::Redirect(target.into())
    }

    /// Proceed and run `callback` once the entered view instance exists.
    pub fn and_call<F>(callback: F) -> Self
    where
        F: FnOnce(&ViewInstance) + Send + 'static,
    {
        GuardVerdict::ProceedAndCall(Box::new(callback))
    }

    /// Whether this verdict lets the pipeline advance.
    pub fn allows_continue(&self) -> bool {
        matches!(
            self,
            GuardVerdict::Proceed | GuardVerdict::ProceedAndCall(_)
        )
    }
}

impl fmt::Debug for GuardVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardVerdict::Proceed => write!(f, "Proceed"),
            GuardVerdict::Cancel => write!(f, "Cancel"),
            GuardVerdict::Failure(err) => write!(f, "Failure({})", err),
            GuardVerdict::Redirect(loc) => write!(f, "Redirect({:?})", loc),
            GuardVerdict::ProceedAndCall(_) => write!(f, "ProceedAndCall(..)"),
        }
    }
}

/// Future returned by a guard check.
pub type GuardFuture = Pin<Box<dyn Future<Output = GuardVerdict> + Send>>;

/// A pipeline step that can approve, abort, redirect, or defer a pending
/// navigation.
///
/// # Example
///
/// ```
/// use wayfinder::{GuardFuture, GuardVerdict, NavigationGuard, Route};
///
/// struct DraftGuard;
///
/// impl NavigationGuard for DraftGuard {
///     fn check(&self, _to: &Route, from: &Route) -> GuardFuture {
///         let leaving_editor = from.path.starts_with("/editor");
///         Box::pin(async move {
///             if leaving_editor {
///                 GuardVerdict::cancel()
///             } else {
///                 GuardVerdict::proceed()
///             }
///         })
///     }
/// }
/// ```
pub trait NavigationGuard: Send + Sync {
    /// Decide whether navigation from `from` to `to` may continue.
    fn check(&self, to: &Route, from: &Route) -> GuardFuture;

    /// Guard name for diagnostics.
    fn name(&self) -> &str {
        "NavigationGuard"
    }
}

/// Shared guard handle: records and hook lists store guards behind `Arc`.
pub type SharedGuard = Arc<dyn NavigationGuard>;

// Lets one shared guard be attached to several declarations.
impl NavigationGuard for SharedGuard {
    fn check(&self, to: &Route, from: &Route) -> GuardFuture {
        self.as_ref().check(to, from)
    }

    fn name(&self) -> &str {
        self.as_ref().name()
    }
}

/// Create a guard from an async closure.
///
/// # Example
///
/// ```
/// use wayfinder::{guard_fn, GuardVerdict};
///
/// let guard = guard_fn(|to, _from| {
///     let blocked = to.path.starts_with("/admin");
///     async move {
///         if blocked {
///             GuardVerdict::redirect("/login")
///         } else {
///             GuardVerdict::proceed()
///         }
///     }
/// });
/// ```
pub fn guard_fn<F, Fut>(f: F) -> FnGuard<F>
where
    F: Fn(&Route, &Route) -> Fut + Send + Sync,
    Fut: Future<Output = GuardVerdict> + Send + 'static,
{
    FnGuard { f }
}

/// Guard created from a closure.
pub struct FnGuard<F> {
    f: F,
}

impl<F, Fut> NavigationGuard for FnGuard<F>
where
    F: Fn(&Route, &Route) -> Fut + Send + Sync,
    Fut: Future<Output = GuardVerdict> + Send + 'static,
{
    fn check(&self, to: &Route, from: &Route) -> GuardFuture {
        Box::pin((self.f)(to, from))
    }
}

/// Hook invoked after a transition commits. No continuation: after-hooks
/// cannot affect the navigation.
pub type AfterHook = Arc<dyn Fn(&Route, &Route) + Send + Sync>;

// ============================================================================
// Hook registration
// ============================================================================

/// Ordered list of registered hooks with id-based removal.
pub struct HookRegistry<T> {
    entries: Arc<Mutex<Vec<(u64, T)>>>,
    next_id: AtomicU64,
}

impl<T: Clone> HookRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Append a hook, returning its registration handle.
    pub fn add(&self, entry: T) -> HookRegistration
    where
        T: Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .expect("hook registry poisoned")
            .push((id, entry));

        let entries: Weak<Mutex<Vec<(u64, T)>>> = Arc::downgrade(&self.entries);
        HookRegistration {
            remove: Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    entries
                        .lock()
                        .expect("hook registry poisoned")
                        .retain(|(entry_id, _)| *entry_id != id);
                }
            }),
        }
    }

    /// Snapshot the hooks in registration order.
    ///
    /// Transitions iterate over a snapshot so a hook unregistering itself
    /// mid-pipeline does not shift the queue under the runner.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries
            .lock()
            .expect("hook registry poisoned")
            .iter()
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().expect("hook registry poisoned").is_empty()
    }
}

impl<T: Clone> Default for HookRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by hook registration.
///
/// Dropping the handle does NOT unregister the hook; removal is explicit, and
/// calling [`unregister`](Self::unregister) more than once is a no-op.
pub struct HookRegistration {
    remove: Box<dyn Fn() + Send + Sync>,
}

impl HookRegistration {
    /// Remove the registered hook. Idempotent.
    pub fn unregister(&self) {
        (self.remove)();
    }
}

impl fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HookRegistration")
    }
}

//! Navigation transitions
//!
//! [`Navigator`] owns the current route and drives transitions: resolve the
//! target, diff the matched chains, run the guard queues, resolve lazy
//! views, then commit and notify. Only one transition is tracked at a time;
//! starting a new one supersedes the in-flight one, which notices at its
//! next step boundary and stops without side effects.
//!
//! Guard queue order for one transition:
//!
//! 1. leave guards of deactivated records, leaf first
//! 2. global `before_each` hooks, registration order
//! 3. update guards of still-matched records, root first
//! 4. `before_enter` of activated records
//! 5. lazy view resolution for the activated chain
//! 6. enter hooks of activated records, root first
//! 7. global `before_resolve` hooks
//!
//! then commit, URL sync, route-changed listener, `after_each` hooks,
//! deferred enter callbacks, and the one-shot ready callbacks.

use crate::error::{MatchError, NavigationError};
use crate::guards::{
    AfterHook, DeferredEnter, GuardVerdict, HookRegistration, HookRegistry, NavigationGuard,
    SharedGuard,
};
use crate::history::{HistoryBackend, MemoryHistory};
use crate::location::RawLocation;
use crate::matcher::RouteMatcher;
use crate::queue::run_queue;
use crate::record::{RouteDeclaration, RouteRecord, DEFAULT_SLOT};
use crate::route::Route;
use crate::view::{resolve_views, ViewInstance};
use crate::{debug_log, trace_log, warn_log};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// How many guard-issued redirects one navigation may chain through.
const MAX_GUARD_REDIRECTS: usize = 16;

type ErrorListener = Arc<dyn Fn(&NavigationError) + Send + Sync>;
type RouteListener = Box<dyn Fn(&Arc<Route>, &Arc<Route>) + Send + Sync>;
type ReadyCallback = Box<dyn FnOnce() + Send>;
type ReadyErrorCallback = Box<dyn FnOnce(&NavigationError) + Send>;

/// Construction-time configuration; replaces any ambient install state.
pub struct NavigatorConfig {
    routes: Vec<RouteDeclaration>,
    history: Arc<dyn HistoryBackend>,
    #[cfg(feature = "cache")]
    cache_capacity: Option<usize>,
}

impl NavigatorConfig {
    /// Configure a navigator over the given declarations, backed by an
    /// in-memory history starting at `/`.
    pub fn new(routes: Vec<RouteDeclaration>) -> Self {
        Self {
            routes,
            history: Arc::new(MemoryHistory::default()),
            #[cfg(feature = "cache")]
            cache_capacity: None,
        }
    }

    /// Use a specific history backend.
    pub fn history(mut self, history: Arc<dyn HistoryBackend>) -> Self {
        self.history = history;
        self
    }

    /// Size the route-resolution cache.
    ///
    /// Only direct, context-free matches are memoized; routes reached
    /// through a redirect are resolved fresh every time.
    #[cfg(feature = "cache")]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }
}

impl fmt::Debug for NavigatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigatorConfig")
            .field("routes", &self.routes.len())
            .finish()
    }
}

/// One pipeline entry of a composed guard queue.
enum QueueStep {
    /// A guard checked against (target, current)
    Guard(SharedGuard),
    /// An enter hook bound to its activated record, so a deferred callback
    /// knows which instance to wait for
    EnterGuard {
        guard: SharedGuard,
        record: Arc<RouteRecord>,
    },
    /// The lazy view resolution step for the activated chain
    ResolveViews(Vec<Arc<RouteRecord>>),
}

/// Why a queue stopped early.
enum Interrupt {
    Superseded,
    Cancelled,
    Errored(NavigationError),
    Redirected(RawLocation),
}

/// Outcome of one run of the pipeline (one redirect hop).
enum TransitionOutcome {
    Committed(Arc<Route>),
    Redirected(RawLocation),
    /// Concluded without a commit; the error has already been fanned out
    Concluded(NavigationError),
}

/// Enter callback waiting for its view instance.
struct PendingEnterCallback {
    record: Arc<RouteRecord>,
    slot: String,
    callback: DeferredEnter,
}

enum ReadyState {
    Waiting(Vec<(ReadyCallback, ReadyErrorCallback)>),
    Done(Result<(), NavigationError>),
}

/// Drives navigation transitions over a route table.
pub struct Navigator {
    matcher: RouteMatcher,
    history: Arc<dyn HistoryBackend>,
    current: RwLock<Arc<Route>>,
    /// The navigation target being validated; doubles as the cancellation
    /// token for superseded transitions (identity comparison)
    pending: Mutex<Option<Arc<Route>>>,
    before_hooks: HookRegistry<SharedGuard>,
    resolve_hooks: HookRegistry<SharedGuard>,
    after_hooks: HookRegistry<AfterHook>,
    error_listeners: HookRegistry<ErrorListener>,
    route_listener: Mutex<Option<RouteListener>>,
    ready: Mutex<ReadyState>,
    /// Enter callbacks whose instances had not been registered at commit
    waiting_callbacks: Mutex<Vec<PendingEnterCallback>>,
}

impl Navigator {
    /// Build a navigator from explicit configuration.
    pub fn new(config: NavigatorConfig) -> Self {
        #[cfg(feature = "cache")]
        let matcher = match config.cache_capacity {
            Some(capacity) => RouteMatcher::with_cache_capacity(config.routes, capacity),
            None => RouteMatcher::new(config.routes),
        };
        #[cfg(not(feature = "cache"))]
        let matcher = RouteMatcher::new(config.routes);

        Self {
            matcher,
            history: config.history,
            current: RwLock::new(Route::nowhere()),
            pending: Mutex::new(None),
            before_hooks: HookRegistry::new(),
            resolve_hooks: HookRegistry::new(),
            after_hooks: HookRegistry::new(),
            error_listeners: HookRegistry::new(),
            route_listener: Mutex::new(None),
            ready: Mutex::new(ReadyState::Waiting(Vec::new())),
            waiting_callbacks: Mutex::new(Vec::new()),
        }
    }

    /// The committed current route.
    pub fn current_route(&self) -> Arc<Route> {
        Arc::clone(&self.current.read().expect("current route poisoned"))
    }

    /// The history backend this navigator synchronizes with.
    pub fn history(&self) -> &Arc<dyn HistoryBackend> {
        &self.history
    }

    /// Resolve a location without navigating.
    pub fn resolve(
        &self,
        target: impl Into<RawLocation>,
    ) -> Result<Arc<Route>, MatchError> {
        self.matcher.resolve(&target.into(), &self.current_route(), None)
    }

    /// Register additional routes. Does not trigger a transition.
    pub fn add_routes(&self, declarations: Vec<RouteDeclaration>) {
        self.matcher.add_routes(declarations);
    }

    /// Register a global guard run before every transition's target
    /// activates. Returns a handle whose `unregister` removes exactly this
    /// entry.
    pub fn before_each<G: NavigationGuard + 'static>(&self, guard: G) -> HookRegistration {
        self.before_hooks.add(Arc::new(guard))
    }

    /// Register a global guard run after view resolution, before commit.
    pub fn before_resolve<G: NavigationGuard + 'static>(&self, guard: G) -> HookRegistration {
        self.resolve_hooks.add(Arc::new(guard))
    }

    /// Register a hook run after every committed transition.
    pub fn after_each<F>(&self, hook: F) -> HookRegistration
    where
        F: Fn(&Route, &Route) + Send + Sync + 'static,
    {
        self.after_hooks.add(Arc::new(hook))
    }

    /// Register a listener for every uncaught, non-duplicate transition
    /// error.
    pub fn on_error<F>(&self, listener: F) -> HookRegistration
    where
        F: Fn(&NavigationError) + Send + Sync + 'static,
    {
        self.error_listeners.add(Arc::new(listener))
    }

    /// Set the route-changed listener that drives the host's re-render.
    pub fn listen<F>(&self, listener: F)
    where
        F: Fn(&Arc<Route>, &Arc<Route>) + Send + Sync + 'static,
    {
        *self.route_listener.lock().expect("route listener poisoned") = Some(Box::new(listener));
    }

    /// Run `callback` once the first transition has concluded successfully.
    ///
    /// Fires immediately when that already happened.
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_ready_with(callback, |_| {});
    }

    /// Like [`on_ready`](Self::on_ready), with a callback for the case where
    /// the first transition concluded with an error.
    pub fn on_ready_with<F, E>(&self, callback: F, error_callback: E)
    where
        F: FnOnce() + Send + 'static,
        E: FnOnce(&NavigationError) + Send + 'static,
    {
        let mut ready = self.ready.lock().expect("ready state poisoned");
        match &mut *ready {
            ReadyState::Waiting(callbacks) => {
                callbacks.push((Box::new(callback), Box::new(error_callback)));
            }
            ReadyState::Done(Ok(())) => {
                drop(ready);
                callback();
            }
            ReadyState::Done(Err(err)) => {
                let err = err.clone();
                drop(ready);
                error_callback(&err);
            }
        }
    }

    /// Navigate from the history backend's current location.
    ///
    /// Call once after construction; external back/forward notifications
    /// re-enter through [`transition_to`](Self::transition_to).
    pub async fn start(&self) -> Result<Arc<Route>, NavigationError> {
        let location = self.history.current_location();
        self.transition_to(location.as_str()).await
    }

    /// Navigate, pushing a history entry on success.
    pub async fn push(
        &self,
        target: impl Into<RawLocation>,
    ) -> Result<Arc<Route>, NavigationError> {
        self.transition_to(target).await
    }

    /// Navigate, replacing the current history entry on success.
    pub async fn replace(
        &self,
        target: impl Into<RawLocation>,
    ) -> Result<Arc<Route>, NavigationError> {
        let mut raw: RawLocation = target.into();
        raw.replace = true;
        self.transition_to(raw).await
    }

    /// Drive a full transition to `target`.
    ///
    /// `Ok` means the route was committed. `Err` carries the conclusion:
    /// duplicate, superseded, guard decision, redirect loop, or resolution
    /// failure. Guard redirects are followed within this call.
    pub async fn transition_to(
        &self,
        target: impl Into<RawLocation>,
    ) -> Result<Arc<Route>, NavigationError> {
        let mut raw: RawLocation = target.into();
        let mut hops = 0usize;
        loop {
            match self.run_transition(&raw).await {
                TransitionOutcome::Committed(route) => return Ok(route),
                TransitionOutcome::Concluded(err) => return Err(err),
                TransitionOutcome::Redirected(next) => {
                    hops += 1;
                    if hops > MAX_GUARD_REDIRECTS {
                        let err = NavigationError::RedirectLoop {
                            path: next.path.clone().or(next.name.clone()).unwrap_or_default(),
                        };
                        return Err(self.abort(err, true));
                    }
                    trace_log!("guard redirected navigation (hop {})", hops);
                    raw = next;
                }
            }
        }
    }

    /// One redirect hop: resolve, diff, run both queues, commit.
    async fn run_transition(&self, raw: &RawLocation) -> TransitionOutcome {
        let current = self.current_route();
        let target = match self.matcher.resolve(raw, &current, None) {
            Ok(target) => target,
            Err(MatchError::RedirectCycle { path }) => {
                let err = NavigationError::RedirectLoop { path };
                return TransitionOutcome::Concluded(self.abort(err, true));
            }
        };

        // Navigating to the exact current location concludes without
        // running a single guard; only the displayed URL is re-synced.
        if target.is_same(&current) && target.matched.len() == current.matched.len() {
            self.sync_url(false);
            let err = NavigationError::Duplicated {
                path: target.full_path.clone(),
            };
            return TransitionOutcome::Concluded(self.abort(err, false));
        }

        debug_log!("navigating from '{}' to '{}'", current.full_path, target.full_path);

        let (updated, activated, deactivated) = diff_chains(&current.matched, &target.matched);

        // The pending slot is the cancellation token: every step below
        // compares it against this transition's target before proceeding.
        *self.pending.lock().expect("pending route poisoned") = Some(Arc::clone(&target));

        // Callbacks deferred by enter hooks stay local until commit so an
        // aborted transition leaves no trace.
        let deferred: Mutex<Vec<PendingEnterCallback>> = Mutex::new(Vec::new());

        let mut queue: Vec<Option<QueueStep>> = Vec::new();
        for record in deactivated.iter().rev() {
            for guard in &record.leave_guards {
                queue.push(Some(QueueStep::Guard(Arc::clone(guard))));
            }
        }
        for guard in self.before_hooks.snapshot() {
            queue.push(Some(QueueStep::Guard(guard)));
        }
        for record in updated {
            for guard in &record.update_guards {
                queue.push(Some(QueueStep::Guard(Arc::clone(guard))));
            }
        }
        for record in activated {
            // Records without an entry guard contribute an empty slot.
            queue.push(record.before_enter.clone().map(QueueStep::Guard));
        }
        queue.push(Some(QueueStep::ResolveViews(activated.to_vec())));

        if let Err(interrupt) = run_queue(queue, |step| {
            self.execute_step(step, &target, &current, &deferred)
        })
        .await
        {
            return self.interrupt_outcome(interrupt, &target);
        }

        let mut queue: Vec<Option<QueueStep>> = Vec::new();
        for record in activated {
            for guard in &record.enter_hooks {
                queue.push(Some(QueueStep::EnterGuard {
                    guard: Arc::clone(guard),
                    record: Arc::clone(record),
                }));
            }
        }
        for guard in self.resolve_hooks.snapshot() {
            queue.push(Some(QueueStep::Guard(guard)));
        }

        if let Err(interrupt) = run_queue(queue, |step| {
            self.execute_step(step, &target, &current, &deferred)
        })
        .await
        {
            return self.interrupt_outcome(interrupt, &target);
        }

        if !self.is_pending(&target) {
            return self.interrupt_outcome(Interrupt::Superseded, &target);
        }

        self.commit(&target, &current, raw.replace, deferred.into_inner().expect("deferred callbacks poisoned"));
        TransitionOutcome::Committed(target)
    }

    async fn execute_step(
        &self,
        step: QueueStep,
        target: &Arc<Route>,
        current: &Arc<Route>,
        deferred: &Mutex<Vec<PendingEnterCallback>>,
    ) -> Result<(), Interrupt> {
        // Cooperative cancellation: a superseded transition stops at the
        // next step boundary, before invoking anything.
        if !self.is_pending(target) {
            return Err(Interrupt::Superseded);
        }

        match step {
            QueueStep::Guard(guard) => {
                trace_log!("running guard '{}'", guard.name());
                let verdict = guard.check(target, current).await;
                // A verdict from a guard that was already in flight when a
                // newer transition took over must stay inert.
                if !self.is_pending(target) {
                    return Err(Interrupt::Superseded);
                }
                self.apply_verdict(verdict, None, deferred)
            }
            QueueStep::EnterGuard { guard, record } => {
                trace_log!("running enter hook for '{}'", record.path());
                let verdict = guard.check(target, current).await;
                if !self.is_pending(target) {
                    return Err(Interrupt::Superseded);
                }
                self.apply_verdict(verdict, Some(record), deferred)
            }
            QueueStep::ResolveViews(records) => resolve_views(&records)
                .await
                .map_err(Interrupt::Errored),
        }
    }

    fn apply_verdict(
        &self,
        verdict: GuardVerdict,
        record: Option<Arc<RouteRecord>>,
        deferred: &Mutex<Vec<PendingEnterCallback>>,
    ) -> Result<(), Interrupt> {
        match verdict {
            GuardVerdict::Proceed => Ok(()),
            GuardVerdict::ProceedAndCall(callback) => {
                match record {
                    Some(record) => {
                        deferred
                            .lock()
                            .expect("deferred callbacks poisoned")
                            .push(PendingEnterCallback {
                                record,
                                slot: DEFAULT_SLOT.to_string(),
                                callback,
                            });
                    }
                    None => {
                        warn_log!("a guard outside the enter phase deferred a callback; ignored");
                    }
                }
                Ok(())
            }
            GuardVerdict::Cancel => Err(Interrupt::Cancelled),
            GuardVerdict::Failure(err) => Err(Interrupt::Errored(err)),
            GuardVerdict::Redirect(location) => Err(Interrupt::Redirected(location)),
        }
    }

    fn interrupt_outcome(&self, interrupt: Interrupt, target: &Arc<Route>) -> TransitionOutcome {
        match interrupt {
            // The superseding transition owns the pending slot and all
            // listener fan-out; this one just disappears.
            Interrupt::Superseded => TransitionOutcome::Concluded(NavigationError::Superseded {
                path: target.full_path.clone(),
            }),
            Interrupt::Cancelled => {
                self.clear_pending(target);
                TransitionOutcome::Concluded(self.abort(NavigationError::blocked(), true))
            }
            Interrupt::Errored(err) => {
                self.clear_pending(target);
                TransitionOutcome::Concluded(self.abort(err, true))
            }
            Interrupt::Redirected(location) => {
                self.clear_pending(target);
                TransitionOutcome::Redirected(location)
            }
        }
    }

    /// Conclude a transition without a commit: snap the URL back, fan out to
    /// error listeners, settle the one-shot ready callbacks.
    fn abort(&self, err: NavigationError, snap_url: bool) -> NavigationError {
        if snap_url {
            self.sync_url(true);
        }
        if err.is_listener_visible() {
            for listener in self.error_listeners.snapshot() {
                listener(&err);
            }
        }
        self.settle_ready(Err(err.clone()));
        err
    }

    fn commit(
        &self,
        target: &Arc<Route>,
        previous: &Arc<Route>,
        replace: bool,
        deferred: Vec<PendingEnterCallback>,
    ) {
        self.clear_pending(target);
        *self.current.write().expect("current route poisoned") = Arc::clone(target);
        self.sync_url(!replace);

        if let Some(listener) = &*self.route_listener.lock().expect("route listener poisoned") {
            listener(target, previous);
        }
        for hook in self.after_hooks.snapshot() {
            hook(target, previous);
        }

        // Deliver deferred enter callbacks whose instances already exist;
        // the rest wait for the host to register them.
        let mut waiting = self
            .waiting_callbacks
            .lock()
            .expect("waiting callbacks poisoned");
        waiting.clear();
        for entry in deferred {
            match entry.record.instance(&entry.slot) {
                Some(instance) => (entry.callback)(&instance),
                None => waiting.push(entry),
            }
        }
        drop(waiting);

        self.settle_ready(Ok(()));
        debug_log!("navigation committed at '{}'", target.full_path);
    }

    /// Hand a live view instance to the navigator.
    ///
    /// The host view layer calls this when it instantiates the view for an
    /// activated record; any enter callback deferred for that record fires
    /// here, provided the record is still part of the current route.
    pub fn register_instance(
        &self,
        record: &Arc<RouteRecord>,
        slot: &str,
        instance: ViewInstance,
    ) {
        record.set_instance(slot, instance.clone());

        let current = self.current_route();
        let mut waiting = self
            .waiting_callbacks
            .lock()
            .expect("waiting callbacks poisoned");
        let mut kept = Vec::with_capacity(waiting.len());
        for entry in waiting.drain(..) {
            if Arc::ptr_eq(&entry.record, record) && entry.slot == slot {
                // A record no longer in the current chain was superseded
                // between commit and instantiation; its callback is dropped.
                if current.contains_record(record) {
                    (entry.callback)(&instance);
                }
            } else {
                kept.push(entry);
            }
        }
        *waiting = kept;
    }

    /// Remove a view instance when the host tears the view down.
    pub fn unregister_instance(&self, record: &Arc<RouteRecord>, slot: &str) {
        record.clear_instance(slot);
    }

    fn is_pending(&self, target: &Arc<Route>) -> bool {
        self.pending
            .lock()
            .expect("pending route poisoned")
            .as_ref()
            .is_some_and(|pending| Arc::ptr_eq(pending, target))
    }

    fn clear_pending(&self, target: &Arc<Route>) {
        let mut pending = self.pending.lock().expect("pending route poisoned");
        if pending.as_ref().is_some_and(|p| Arc::ptr_eq(p, target)) {
            *pending = None;
        }
    }

    /// Re-synchronize the history backend with the committed route.
    fn sync_url(&self, push: bool) {
        let full_path = self.current_route().full_path.clone();
        if self.history.current_location() != full_path {
            if push {
                self.history.push(&full_path);
            } else {
                self.history.replace(&full_path);
            }
        }
    }

    /// Settle the one-shot ready callbacks on the first conclusion.
    fn settle_ready(&self, outcome: Result<(), NavigationError>) {
        let mut ready = self.ready.lock().expect("ready state poisoned");
        if let ReadyState::Waiting(callbacks) = &mut *ready {
            let callbacks = std::mem::take(callbacks);
            *ready = ReadyState::Done(outcome.clone());
            drop(ready);
            for (on_ok, on_err) in callbacks {
                match &outcome {
                    Ok(()) => on_ok(),
                    Err(err) => on_err(err),
                }
            }
        }
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current_route().full_path)
            .finish()
    }
}

/// Split the current and target chains at their first divergence.
///
/// Chains are prefixes of one declaration tree, so pointer identity per
/// index is enough and divergence is monotonic: everything before the split
/// is `updated`, the target's tail is `activated`, the current's tail is
/// `deactivated`.
fn diff_chains<'a>(
    current: &'a [Arc<RouteRecord>],
    target: &'a [Arc<RouteRecord>],
) -> (
    &'a [Arc<RouteRecord>],
    &'a [Arc<RouteRecord>],
    &'a [Arc<RouteRecord>],
) {
    let mut split = 0;
    while let (Some(c), Some(t)) = (current.get(split), target.get(split)) {
        if !Arc::ptr_eq(c, t) {
            break;
        }
        split += 1;
    }
    (&target[..split], &target[split..], &current[split..])
}

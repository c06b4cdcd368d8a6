//! Integration tests for wayfinder
//!
//! These tests drive the complete navigation workflow: table building,
//! matching, the guard pipeline, redirects, lazy views, history sync, and
//! transition supersession.

use pollster::block_on;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use wayfinder::*;

/// Surface navigation diagnostics when tests run with RUST_LOG set.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn app_routes() -> Vec<RouteDeclaration> {
    vec![
        RouteDeclaration::new("/")
            .name("home")
            .component(ViewDefinition::ready("home-page")),
        RouteDeclaration::new("/a")
            .component(ViewDefinition::ready("a-layout"))
            .child(
                RouteDeclaration::new("b")
                    .name("B")
                    .component(ViewDefinition::ready("b-page")),
            ),
        RouteDeclaration::new("/users")
            .name("users")
            .child(RouteDeclaration::new(":id").name("user")),
        RouteDeclaration::new("/login").name("login"),
    ]
}

// ============================================================================
// Matching Through the Navigator
// ============================================================================

#[test]
fn test_named_and_path_matching_agree() {
    init_logging();
    let nav = Navigator::new(NavigatorConfig::new(app_routes()));

    let by_name = nav.resolve(RawLocation::named("B")).unwrap();
    assert_eq!(by_name.full_path, "/a/b");
    assert_eq!(by_name.matched.len(), 2);

    let by_path = nav.resolve("/a/b").unwrap();
    assert_eq!(by_path.matched.len(), 2);
    for (a, b) in by_name.matched.iter().zip(by_path.matched.iter()) {
        assert!(Arc::ptr_eq(a, b));
    }

    let missing = nav.resolve("/nope").unwrap();
    assert_eq!(missing.matched.len(), 0);
}

#[test]
fn test_add_routes_makes_path_navigable() {
    let nav = Navigator::new(NavigatorConfig::new(app_routes()));
    block_on(nav.transition_to("/a/b")).unwrap();

    assert!(nav.resolve("/new").unwrap().is_unmatched());
    nav.add_routes(vec![RouteDeclaration::new("/new").name("new")]);

    let route = block_on(nav.transition_to("/new")).unwrap();
    assert_eq!(route.name.as_deref(), Some("new"));
}

// ============================================================================
// Full Transition Flow
// ============================================================================

#[test]
fn test_navigation_pushes_history() {
    let history = Arc::new(MemoryHistory::default());
    let nav = Navigator::new(
        NavigatorConfig::new(app_routes()).history(Arc::clone(&history) as Arc<dyn HistoryBackend>),
    );

    block_on(nav.start()).unwrap();
    assert_eq!(nav.current_route().name.as_deref(), Some("home"));

    block_on(nav.push("/a/b")).unwrap();
    block_on(nav.push(RawLocation::named("user").with_param("id", "7"))).unwrap();

    assert_eq!(history.current_location(), "/users/7");
    assert_eq!(history.len(), 3);
    assert!(history.can_go_back());
}

#[test]
fn test_back_notification_reenters_transition() {
    let history = Arc::new(MemoryHistory::default());
    let nav = Navigator::new(
        NavigatorConfig::new(app_routes()).history(Arc::clone(&history) as Arc<dyn HistoryBackend>),
    );
    block_on(nav.start()).unwrap();
    block_on(nav.push("/a/b")).unwrap();

    // The host observes the backend movement and reports the new location,
    // exactly as a browser backend would on popstate.
    let event = history.back().unwrap();
    let route = block_on(nav.transition_to(event.to.as_str())).unwrap();

    assert_eq!(route.full_path, "/");
    assert_eq!(nav.current_route().full_path, "/");
    // The URL was already correct, so the commit did not push a new entry.
    assert_eq!(history.len(), 2);
}

#[test]
fn test_query_difference_is_not_duplicate() {
    let nav = Navigator::new(NavigatorConfig::new(app_routes()));
    block_on(nav.transition_to("/a/b?tab=1")).unwrap();

    let route = block_on(nav.transition_to("/a/b?tab=2")).unwrap();
    assert_eq!(route.full_path, "/a/b?tab=2");

    let err = block_on(nav.transition_to("/a/b?tab=2")).unwrap_err();
    assert!(err.is_duplicated());
}

// ============================================================================
// Declarative Redirects and Aliases
// ============================================================================

#[test]
fn test_declared_redirect_navigates_to_target() {
    let nav = Navigator::new(NavigatorConfig::new(vec![
        RouteDeclaration::new("/old").redirect("/fresh"),
        RouteDeclaration::new("/fresh").name("fresh"),
    ]));

    let route = block_on(nav.transition_to("/old")).unwrap();
    assert_eq!(route.path, "/fresh");
    assert_eq!(route.redirected_from.as_deref(), Some("/old"));
}

#[test]
fn test_alias_shares_lazy_resolution_with_original() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let nav = Navigator::new(NavigatorConfig::new(vec![
        RouteDeclaration::new("/docs")
            .name("docs")
            .alias("/manual")
            .component(ViewDefinition::lazy(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(ViewComponent::new("docs-page")) }
            })),
        RouteDeclaration::new("/elsewhere").name("elsewhere"),
    ]));

    // Entering through the alias resolves the shared loader.
    let via_alias = block_on(nav.transition_to("/manual")).unwrap();
    assert_eq!(via_alias.path, "/manual");
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    // Entering through the original finds the cached resolution.
    block_on(nav.transition_to("/elsewhere")).unwrap();
    block_on(nav.transition_to("/docs")).unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_redirect_cycle_reports_clean_error() {
    let nav = Navigator::new(NavigatorConfig::new(vec![
        RouteDeclaration::new("/ping").redirect("/pong"),
        RouteDeclaration::new("/pong").redirect("/ping"),
    ]));

    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    nav.on_error(move |err| sink.lock().unwrap().push(err.clone()));

    let err = block_on(nav.transition_to("/ping")).unwrap_err();
    assert!(matches!(err, NavigationError::RedirectLoop { .. }));
    assert_eq!(errors.lock().unwrap().len(), 1);
}

// ============================================================================
// Guard Pipeline
// ============================================================================

#[test]
fn test_guard_redirect_preserves_replace_intent() {
    let history = Arc::new(MemoryHistory::default());
    let nav = Navigator::new(
        NavigatorConfig::new(app_routes()).history(Arc::clone(&history) as Arc<dyn HistoryBackend>),
    );
    block_on(nav.start()).unwrap();
    block_on(nav.push("/a/b")).unwrap();
    assert_eq!(history.len(), 2);

    nav.before_each(guard_fn(|to, _from| {
        let gated = to.path == "/login";
        async move {
            if gated {
                GuardVerdict::Redirect(RawLocation::path("/users/1").replacing())
            } else {
                GuardVerdict::proceed()
            }
        }
    }));

    let route = block_on(nav.push("/login")).unwrap();
    assert_eq!(route.path, "/users/1");
    // The redirect asked for replace semantics: no extra history entry.
    assert_eq!(history.len(), 2);
    assert_eq!(history.current_location(), "/users/1");
}

#[test]
fn test_cancelled_navigation_snaps_url_back() {
    let history = Arc::new(MemoryHistory::default());
    let nav = Navigator::new(
        NavigatorConfig::new(app_routes()).history(Arc::clone(&history) as Arc<dyn HistoryBackend>),
    );
    block_on(nav.start()).unwrap();

    nav.before_each(guard_fn(|to, _from| {
        let blocked = to.path.starts_with("/users");
        async move {
            if blocked {
                GuardVerdict::cancel()
            } else {
                GuardVerdict::proceed()
            }
        }
    }));

    let err = block_on(nav.push("/users/9")).unwrap_err();
    assert!(err.is_blocked());
    assert_eq!(nav.current_route().full_path, "/");
    assert_eq!(history.current_location(), "/");
}

#[test]
fn test_async_guard_suspension_keeps_order() {
    // A guard that yields once before proceeding must not let later phases
    // start early.
    struct YieldOnce {
        yielded: bool,
    }
    impl Future for YieldOnce {
        type Output = ();
        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.yielded {
                Poll::Ready(())
            } else {
                self.yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    let order = Arc::new(Mutex::new(Vec::new()));
    let nav = Navigator::new(NavigatorConfig::new(app_routes()));

    let slow = Arc::clone(&order);
    nav.before_each(guard_fn(move |_to, _from| {
        let slow = Arc::clone(&slow);
        async move {
            YieldOnce { yielded: false }.await;
            slow.lock().unwrap().push("before_each");
            GuardVerdict::proceed()
        }
    }));
    let fast = Arc::clone(&order);
    nav.before_resolve(guard_fn(move |_to, _from| {
        fast.lock().unwrap().push("before_resolve");
        async { GuardVerdict::proceed() }
    }));

    block_on(nav.transition_to("/a/b")).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["before_each", "before_resolve"]);
}

// ============================================================================
// Transition Supersession
// ============================================================================

/// Future that stays pending until an external flag opens.
struct GateFuture {
    open: Arc<AtomicBool>,
}

impl Future for GateFuture {
    type Output = ();
    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.open.load(Ordering::SeqCst) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

#[test]
fn test_superseding_transition_wins() {
    init_logging();
    let nav = Navigator::new(NavigatorConfig::new(app_routes()));
    let gate = Arc::new(AtomicBool::new(false));

    let gate_flag = Arc::clone(&gate);
    nav.before_each(guard_fn(move |to, _from| {
        let gated = to.path == "/a/b";
        let open = Arc::clone(&gate_flag);
        async move {
            if gated {
                GateFuture { open }.await;
            }
            GuardVerdict::proceed()
        }
    }));

    // Start the first transition and park it inside its guard.
    let mut stalled = Box::pin(nav.transition_to("/a/b"));
    let waker = futures_util::task::noop_waker();
    let mut cx = Context::from_waker(&waker);
    assert!(stalled.as_mut().poll(&mut cx).is_pending());

    // A second transition supersedes it and commits.
    let route = block_on(nav.transition_to("/login")).unwrap();
    assert_eq!(route.path, "/login");

    // Unblock the stale run: it must notice and conclude silently.
    gate.store(true, Ordering::SeqCst);
    let result = match stalled.as_mut().poll(&mut cx) {
        Poll::Ready(result) => result,
        Poll::Pending => panic!("stalled transition did not finish after the gate opened"),
    };
    let err = result.unwrap_err();
    assert!(err.is_superseded());

    // No side effects from the stale run.
    assert_eq!(nav.current_route().path, "/login");
    assert_eq!(nav.history().current_location(), "/login");
}

// ============================================================================
// Readiness and Error Fan-out
// ============================================================================

#[test]
fn test_on_ready_after_first_commit() {
    let nav = Navigator::new(NavigatorConfig::new(app_routes()));
    let observed = Arc::new(Mutex::new(Vec::new()));

    let early = Arc::clone(&observed);
    nav.on_ready(move || early.lock().unwrap().push("early"));

    block_on(nav.start()).unwrap();

    let late = Arc::clone(&observed);
    nav.on_ready(move || late.lock().unwrap().push("late"));

    assert_eq!(*observed.lock().unwrap(), vec!["early", "late"]);
}

#[test]
fn test_error_fanout_for_failing_guard() {
    let nav = Navigator::new(NavigatorConfig::new(app_routes()));
    nav.before_each(guard_fn(|_to, _from| async {
        GuardVerdict::failure("backend unavailable")
    }));

    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    nav.on_error(move |err| sink.lock().unwrap().push(err.to_string()));

    let ready_errors = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&ready_errors);
    nav.on_ready_with(|| {}, move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
    });

    let _ = block_on(nav.transition_to("/a/b"));
    let _ = block_on(nav.transition_to("/login"));

    // Every failure reaches the listeners, but readiness settled only once.
    assert_eq!(errors.lock().unwrap().len(), 2);
    assert_eq!(ready_errors.load(Ordering::SeqCst), 1);
}

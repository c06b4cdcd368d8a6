//! # Wayfinder
//!
//! A declarative navigation core with support for:
//!
//! - **Nested Route Tables** - Parent/child declarations compiled into flat,
//!   priority-ordered lookup structures
//! - **Named Routes** - Navigate by name with parameter inheritance
//! - **Guards** - An ordered, cancelable pipeline that can approve, abort,
//!   redirect, or defer a pending navigation
//! - **Redirects & Aliases** - Declarative, recursive, with cycle detection
//! - **Lazy Views** - Asynchronously loaded view definitions resolved before
//!   a transition commits
//! - **History Backends** - Pluggable URL persistence, with an in-memory
//!   stack included
//!
//! Wayfinder decides *which* route chain is active and *when* it is safe to
//! render it; rendering itself belongs to the host, which sees views only as
//! opaque handles.
//!
//! # Quick Start
//!
//! ```
//! use wayfinder::{Navigator, NavigatorConfig, RouteDeclaration, ViewDefinition};
//!
//! let nav = Navigator::new(NavigatorConfig::new(vec![
//!     RouteDeclaration::new("/")
//!         .name("home")
//!         .component(ViewDefinition::ready("home-page")),
//!     RouteDeclaration::new("/users")
//!         .component(ViewDefinition::ready("user-list"))
//!         .child(
//!             RouteDeclaration::new(":id")
//!                 .name("user")
//!                 .component(ViewDefinition::ready("user-detail")),
//!         ),
//! ]));
//!
//! let route = pollster::block_on(nav.transition_to("/users/7")).unwrap();
//! assert_eq!(route.matched.len(), 2);
//! assert_eq!(route.params.get("id"), Some(&"7".to_string()));
//! ```
//!
//! # Guards
//!
//! ```
//! use wayfinder::{guard_fn, GuardVerdict, Navigator, NavigatorConfig, RouteDeclaration};
//!
//! let nav = Navigator::new(NavigatorConfig::new(vec![
//!     RouteDeclaration::new("/admin").name("admin"),
//!     RouteDeclaration::new("/login").name("login"),
//! ]));
//!
//! nav.before_each(guard_fn(|to, _from| {
//!     let gated = to.path.starts_with("/admin");
//!     async move {
//!         if gated {
//!             GuardVerdict::redirect("/login")
//!         } else {
//!             GuardVerdict::proceed()
//!         }
//!     }
//! }));
//!
//! let route = pollster::block_on(nav.transition_to("/admin")).unwrap();
//! assert_eq!(route.path, "/login");
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Route diagnostics through the standard `log` crate
//! - `tracing` - Diagnostics through `tracing` (mutually exclusive with `log`)
//! - `cache` (default) - LRU memoization of route resolution

#![doc(html_root_url = "https://docs.rs/wayfinder/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Cache (optional)
#[cfg(feature = "cache")]
pub mod cache;

// Route table and matching
pub mod location;
pub mod matcher;
pub mod pattern;
pub mod record;
pub mod route;
pub mod table;

// Transition pipeline
pub mod controller;
pub mod guards;
pub mod queue;
pub mod view;

// Collaborator boundaries
pub mod history;

// Error handling
pub mod error;

// Re-export main types for convenient access
#[cfg(feature = "cache")]
pub use cache::{CacheStats, RouteCache};
pub use controller::{Navigator, NavigatorConfig};
pub use error::{MatchError, NavigationError};
pub use guards::{
    guard_fn, AfterHook, DeferredEnter, FnGuard, GuardFuture, GuardVerdict, HookRegistration,
    NavigationGuard, SharedGuard,
};
pub use history::{HistoryBackend, HistoryEvent, MemoryHistory};
pub use location::{Query, RawLocation};
pub use matcher::RouteMatcher;
pub use pattern::{ParamKey, PathPattern, PatternOptions, WILDCARD_KEY};
pub use record::{
    validate_declared_path, PropsMode, RedirectTarget, RouteDeclaration, RouteRecord, DEFAULT_SLOT,
};
pub use route::Route;
pub use table::RouteTable;
pub use view::{
    resolve_views, ViewComponent, ViewDefinition, ViewInstance, ViewLoader,
};

/// Direction of a history movement.
///
/// Produced by [`MemoryHistory`] events so hosts can animate or restore
/// state accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDirection {
    /// Moving to a new or later entry
    Forward,
    /// Moving to an earlier entry
    Back,
    /// Swapping the current entry in place
    Replace,
}

//! Route declarations and compiled route records
//!
//! A [`RouteDeclaration`] is what users write: a builder-style description of
//! one route, its view slots, guards, and children. Building the table
//! compiles each declaration into an immutable [`RouteRecord`] with a
//! compiled path pattern and an upward parent link. Records live for the
//! process lifetime; only their view-resolution cache and instance slots
//! mutate after creation, behind interior mutability.

use crate::guards::SharedGuard;
use crate::location::RawLocation;
use crate::pattern::{PathPattern, PatternOptions};
use crate::route::Route;
use crate::view::{ViewComponent, ViewDefinition, ViewInstance};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Default view slot name.
pub const DEFAULT_SLOT: &str = "default";

/// Where a route sends navigations instead of activating itself.
#[derive(Clone)]
pub enum RedirectTarget {
    /// A path, possibly relative to the redirecting record's parent
    Path(String),
    /// A full location (named target, params, query, hash)
    Location(RawLocation),
    /// Computed from the route the navigation would have produced
    Compute(Arc<dyn Fn(&Route) -> RawLocation + Send + Sync>),
}

impl fmt::Debug for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectTarget::Path(path) => write!(f, "Path({:?})", path),
            RedirectTarget::Location(loc) => write!(f, "Location({:?})", loc),
            RedirectTarget::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

impl From<&str> for RedirectTarget {
    fn from(path: &str) -> Self {
        RedirectTarget::Path(path.to_string())
    }
}

impl From<String> for RedirectTarget {
    fn from(path: String) -> Self {
        RedirectTarget::Path(path)
    }
}

impl From<RawLocation> for RedirectTarget {
    fn from(location: RawLocation) -> Self {
        RedirectTarget::Location(location)
    }
}

/// How a slot's view receives data from the matched route.
#[derive(Clone, Default)]
pub enum PropsMode {
    /// The view receives nothing
    #[default]
    None,
    /// The view receives the route parameters
    Params,
    /// The view receives a fixed map
    Static(HashMap<String, String>),
    /// The view receives a map computed from the route
    Compute(Arc<dyn Fn(&Route) -> HashMap<String, String> + Send + Sync>),
}

impl fmt::Debug for PropsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropsMode::None => f.write_str("None"),
            PropsMode::Params => f.write_str("Params"),
            PropsMode::Static(map) => write!(f, "Static({:?})", map),
            PropsMode::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

// ============================================================================
// RouteDeclaration
// ============================================================================

/// Builder-style description of one route.
///
/// # Example
///
/// ```
/// use wayfinder::{RouteDeclaration, ViewDefinition};
///
/// let routes = vec![
///     RouteDeclaration::new("/users")
///         .component(ViewDefinition::ready("user-list"))
///         .child(
///             RouteDeclaration::new(":id")
///                 .name("user")
///                 .component(ViewDefinition::ready("user-detail")),
///         ),
/// ];
/// ```
#[derive(Clone, Default)]
pub struct RouteDeclaration {
    pub(crate) path: String,
    pub(crate) name: Option<String>,
    pub(crate) views: HashMap<String, ViewDefinition>,
    pub(crate) redirect: Option<RedirectTarget>,
    pub(crate) children: Vec<RouteDeclaration>,
    pub(crate) aliases: Vec<String>,
    pub(crate) before_enter: Option<SharedGuard>,
    pub(crate) leave_guards: Vec<SharedGuard>,
    pub(crate) update_guards: Vec<SharedGuard>,
    pub(crate) enter_hooks: Vec<SharedGuard>,
    pub(crate) meta: HashMap<String, String>,
    pub(crate) props: HashMap<String, PropsMode>,
    pub(crate) case_sensitive: bool,
    pub(crate) strict: bool,
}

impl RouteDeclaration {
    /// Declare a route at `path` (absolute, or relative to its parent).
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            case_sensitive: true,
            ..Self::default()
        }
    }

    /// Set the route name for named navigation.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the default view slot.
    pub fn component(self, definition: ViewDefinition) -> Self {
        self.view(DEFAULT_SLOT, definition)
    }

    /// Set a named view slot.
    pub fn view(mut self, slot: impl Into<String>, definition: ViewDefinition) -> Self {
        self.views.insert(slot.into(), definition);
        self
    }

    /// Redirect navigations from this route.
    pub fn redirect(mut self, target: impl Into<RedirectTarget>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    /// Redirect computed from the route the navigation would have produced.
    pub fn redirect_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Route) -> RawLocation + Send + Sync + 'static,
    {
        self.redirect = Some(RedirectTarget::Compute(Arc::new(compute)));
        self
    }

    /// Add a child route.
    pub fn child(mut self, child: RouteDeclaration) -> Self {
        self.children.push(child);
        self
    }

    /// Add child routes.
    pub fn children(mut self, children: Vec<RouteDeclaration>) -> Self {
        self.children.extend(children);
        self
    }

    /// Add an alias path resolving to this route's views.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Guard run before this route activates (queue phase four).
    pub fn before_enter<G: crate::guards::NavigationGuard + 'static>(mut self, guard: G) -> Self {
        self.before_enter = Some(Arc::new(guard));
        self
    }

    /// Guard run when this route deactivates (leaf first).
    pub fn on_leave<G: crate::guards::NavigationGuard + 'static>(mut self, guard: G) -> Self {
        self.leave_guards.push(Arc::new(guard));
        self
    }

    /// Guard run when this route stays matched but the target changed.
    pub fn on_update<G: crate::guards::NavigationGuard + 'static>(mut self, guard: G) -> Self {
        self.update_guards.push(Arc::new(guard));
        self
    }

    /// Hook run after view resolution, before commit; may defer a callback
    /// until the view instance is registered.
    pub fn on_enter<G: crate::guards::NavigationGuard + 'static>(mut self, guard: G) -> Self {
        self.enter_hooks.push(Arc::new(guard));
        self
    }

    /// Attach a metadata entry.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Configure how the default slot receives route data.
    pub fn props(self, mode: PropsMode) -> Self {
        self.props_for_slot(DEFAULT_SLOT, mode)
    }

    /// Configure how a named slot receives route data.
    pub fn props_for_slot(mut self, slot: impl Into<String>, mode: PropsMode) -> Self {
        self.props.insert(slot.into(), mode);
        self
    }

    /// Match static segments case-insensitively.
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Require trailing slashes to match exactly.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub(crate) fn pattern_options(&self) -> PatternOptions {
        PatternOptions {
            case_sensitive: self.case_sensitive,
            strict: self.strict,
        }
    }
}

impl fmt::Debug for RouteDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDeclaration")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("children", &self.children.len())
            .field("aliases", &self.aliases)
            .finish()
    }
}

// ============================================================================
// Path validation
// ============================================================================

/// Validate a declared path.
///
/// Problems here are reported as warnings by the table builder; they never
/// abort a build.
pub fn validate_declared_path(path: &str) -> Result<(), String> {
    // Empty path is allowed: it declares an index child.
    if path.is_empty() {
        return Ok(());
    }

    if path.contains("//") {
        return Err("path contains consecutive slashes".to_string());
    }

    let mut param_names = std::collections::HashSet::new();
    for segment in path.split('/') {
        if let Some(param) = segment.strip_prefix(':') {
            let param = param.strip_suffix('?').unwrap_or(param);
            if param.is_empty() {
                return Err("parameter name is empty".to_string());
            }
            if !param.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(format!(
                    "parameter '{}' must be alphanumeric or underscore",
                    param
                ));
            }
            if !param_names.insert(param.to_string()) {
                return Err(format!("duplicate parameter '{}'", param));
            }
        }
    }

    Ok(())
}

// ============================================================================
// RouteRecord
// ============================================================================

/// Compiled, immutable representation of one declared route.
///
/// Matched chains and the table share records via `Arc`; chain diffing
/// compares records by pointer identity. The `parent` link only ever points
/// upward and no record owns its children, so the `Arc` graph is acyclic.
pub struct RouteRecord {
    pub(crate) path: String,
    pub(crate) pattern: PathPattern,
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<Arc<RouteRecord>>,
    /// Target path when this record is an alias of another record
    pub(crate) match_as: Option<String>,
    pub(crate) redirect: Option<RedirectTarget>,
    pub(crate) before_enter: Option<SharedGuard>,
    pub(crate) leave_guards: Vec<SharedGuard>,
    pub(crate) update_guards: Vec<SharedGuard>,
    pub(crate) enter_hooks: Vec<SharedGuard>,
    pub(crate) meta: HashMap<String, String>,
    pub(crate) props: HashMap<String, PropsMode>,
    /// Slot definitions; lazy entries are replaced by their resolution
    pub(crate) components: RwLock<HashMap<String, ViewDefinition>>,
    /// Live view handles, registered by the host view layer
    pub(crate) instances: RwLock<HashMap<String, ViewInstance>>,
}

impl RouteRecord {
    /// Fully qualified, normalized path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Route name, if declared.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Compiled path pattern.
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Parent record in the declaration tree.
    pub fn parent(&self) -> Option<&Arc<RouteRecord>> {
        self.parent.as_ref()
    }

    /// Target path when this record is an alias.
    pub fn match_as(&self) -> Option<&str> {
        self.match_as.as_deref()
    }

    /// Declared redirect target.
    pub fn redirect(&self) -> Option<&RedirectTarget> {
        self.redirect.as_ref()
    }

    /// Metadata bag.
    pub fn meta(&self) -> &HashMap<String, String> {
        &self.meta
    }

    /// Snapshot of the view slots.
    pub fn view_slots(&self) -> Vec<(String, ViewDefinition)> {
        self.components
            .read()
            .expect("record components poisoned")
            .iter()
            .map(|(slot, def)| (slot.clone(), def.clone()))
            .collect()
    }

    /// Concrete component for a slot, when available.
    pub fn component(&self, slot: &str) -> Option<ViewComponent> {
        self.components
            .read()
            .expect("record components poisoned")
            .get(slot)
            .and_then(ViewDefinition::component)
    }

    /// Replace a slot's lazy definition with its resolved component.
    pub(crate) fn store_resolved_view(&self, slot: &str, view: ViewComponent) {
        self.components
            .write()
            .expect("record components poisoned")
            .insert(slot.to_string(), ViewDefinition::Ready(view));
    }

    /// Live view handle for a slot, if the host registered one.
    pub fn instance(&self, slot: &str) -> Option<ViewInstance> {
        self.instances
            .read()
            .expect("record instances poisoned")
            .get(slot)
            .cloned()
    }

    pub(crate) fn set_instance(&self, slot: &str, instance: ViewInstance) {
        self.instances
            .write()
            .expect("record instances poisoned")
            .insert(slot.to_string(), instance);
    }

    pub(crate) fn clear_instance(&self, slot: &str) {
        self.instances
            .write()
            .expect("record instances poisoned")
            .remove(slot);
    }

    /// Data the slot's view should receive for `route`.
    pub fn props_for(&self, slot: &str, route: &Route) -> HashMap<String, String> {
        match self.props.get(slot) {
            None | Some(PropsMode::None) => HashMap::new(),
            Some(PropsMode::Params) => route.params.clone(),
            Some(PropsMode::Static(map)) => map.clone(),
            Some(PropsMode::Compute(compute)) => compute(route),
        }
    }
}

impl fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRecord")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("match_as", &self.match_as)
            .field("parent", &self.parent.as_ref().map(|p| p.path()))
            .finish()
    }
}

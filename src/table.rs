//! Route table construction
//!
//! Builds the three lookup structures the matcher works from: an ordered path
//! list (priority order, wildcard patterns pinned last), a path-to-record map
//! and a name-to-record map. Building is pure bookkeeping; structural
//! problems in the declarations are reported as warnings and never abort.
//!
//! The table is append-only: [`RouteTable::add_routes`] registers new records
//! in place without invalidating records already handed out in matched
//! chains.

use crate::record::{validate_declared_path, RouteDeclaration, RouteRecord};
use crate::pattern::PathPattern;
use crate::warn_log;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Flat lookup structures compiled from a declaration tree.
#[derive(Debug, Default)]
pub struct RouteTable {
    /// Paths in matching priority order; wildcard patterns sort last
    path_list: Vec<String>,
    path_map: HashMap<String, Arc<RouteRecord>>,
    name_map: HashMap<String, Arc<RouteRecord>>,
    /// Bumped on every `add_routes`; lets resolution caches self-invalidate
    revision: u64,
}

impl RouteTable {
    /// Compile a declaration tree into a fresh table.
    pub fn build(declarations: Vec<RouteDeclaration>) -> Self {
        let mut table = Self::default();
        table.register_all(declarations);
        table
    }

    /// Register additional declarations into the existing structures.
    ///
    /// Previously resolved records stay valid; the table never removes or
    /// replaces a registered record.
    pub fn add_routes(&mut self, declarations: Vec<RouteDeclaration>) {
        self.register_all(declarations);
        self.revision += 1;
    }

    fn register_all(&mut self, declarations: Vec<RouteDeclaration>) {
        for declaration in &declarations {
            self.add_declaration(declaration, None, None);
        }
        self.pin_wildcards_last();
    }

    /// Paths in matching priority order.
    pub fn path_list(&self) -> &[String] {
        &self.path_list
    }

    /// Record registered at a normalized path.
    pub fn record(&self, path: &str) -> Option<&Arc<RouteRecord>> {
        self.path_map.get(path)
    }

    /// Record registered under a name.
    pub fn record_by_name(&self, name: &str) -> Option<&Arc<RouteRecord>> {
        self.name_map.get(name)
    }

    /// Number of registered records.
    pub fn len(&self) -> usize {
        self.path_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_list.is_empty()
    }

    /// Current table revision; bumped by [`add_routes`](Self::add_routes).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn add_declaration(
        &mut self,
        declaration: &RouteDeclaration,
        parent: Option<&Arc<RouteRecord>>,
        match_as: Option<String>,
    ) {
        if let Err(problem) = validate_declared_path(&declaration.path) {
            warn_log!(
                "route path '{}' is malformed: {}",
                declaration.path,
                problem
            );
        }
        if parent.is_none()
            && !declaration.path.starts_with('/')
            && declaration.path != "*"
        {
            warn_log!(
                "top-level route path '{}' should start with '/'",
                declaration.path
            );
        }

        let path = normalize_declared_path(
            &declaration.path,
            parent.map(|p| p.path()),
            declaration.strict,
        );

        let pattern = PathPattern::compile(&path, declaration.pattern_options());
        for duplicate in pattern.duplicate_keys() {
            warn_log!("route path '{}' repeats parameter '{}'", path, duplicate);
        }

        let record = Arc::new(RouteRecord {
            path: path.clone(),
            pattern,
            name: declaration.name.clone(),
            parent: parent.cloned(),
            match_as: match_as.clone(),
            redirect: declaration.redirect.clone(),
            before_enter: declaration.before_enter.clone(),
            leave_guards: declaration.leave_guards.clone(),
            update_guards: declaration.update_guards.clone(),
            enter_hooks: declaration.enter_hooks.clone(),
            meta: declaration.meta.clone(),
            props: declaration.props.clone(),
            components: RwLock::new(declaration.views.clone()),
            instances: RwLock::new(HashMap::new()),
        });

        for child in &declaration.children {
            let child_match_as = match_as
                .as_ref()
                .map(|target| clean_path(&format!("{}/{}", target, child.path)));
            self.add_declaration(child, Some(&record), child_match_as);
        }

        // First registration wins; later declarations of the same path are
        // silently ignored so the wildcard-pinning pass stays stable.
        if !self.path_map.contains_key(&path) {
            self.path_list.push(path.clone());
            self.path_map.insert(path.clone(), Arc::clone(&record));
        }

        for alias in &declaration.aliases {
            if *alias == declaration.path {
                warn_log!(
                    "route '{}' declares an alias equal to its own path",
                    path
                );
                continue;
            }
            // The alias is a synthetic declaration matching at its own path
            // but resolving through the original record: shared view slots
            // (cloned definitions share lazy resolution caches) and a
            // `match_as` pointing at the original's normalized path.
            let synthetic = RouteDeclaration {
                path: alias.clone(),
                views: declaration.views.clone(),
                children: declaration.children.clone(),
                props: declaration.props.clone(),
                meta: declaration.meta.clone(),
                case_sensitive: declaration.case_sensitive,
                strict: declaration.strict,
                ..RouteDeclaration::default()
            };
            self.add_declaration(&synthetic, parent, Some(path.clone()));
        }

        if let Some(name) = &declaration.name {
            if self.name_map.contains_key(name) {
                warn_log!(
                    "duplicate route name '{}'; keeping the first registration",
                    name
                );
            } else {
                self.name_map.insert(name.clone(), record);
            }
        }
    }

    /// Move wildcard-pattern paths to the tail of the priority list,
    /// preserving registration order within both groups.
    fn pin_wildcards_last(&mut self) {
        let path_map = &self.path_map;
        let (plain, wildcards): (Vec<String>, Vec<String>) =
            self.path_list.drain(..).partition(|path| {
                path_map
                    .get(path)
                    .map_or(true, |record| !record.pattern().has_wildcard())
            });
        self.path_list = plain;
        self.path_list.extend(wildcards);
    }
}

/// Normalize a declared path against its parent.
///
/// Absolute paths pass through; relative paths concatenate onto the parent's
/// normalized path; the bare wildcard stays as-is. The trailing slash is
/// stripped unless the declaration asked for strict matching.
fn normalize_declared_path(path: &str, parent: Option<&str>, strict: bool) -> String {
    if path == "*" {
        return path.to_string();
    }

    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        match parent {
            Some(parent_path) => format!("{}/{}", parent_path, path),
            None => format!("/{}", path),
        }
    };

    let mut cleaned = clean_path(&joined);
    if !strict && cleaned.len() > 1 && cleaned.ends_with('/') {
        cleaned.pop();
    }
    cleaned
}

/// Collapse duplicate slashes.
fn clean_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !previous_slash {
                out.push(c);
            }
            previous_slash = true;
        } else {
            out.push(c);
            previous_slash = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewDefinition;

    fn nested_declarations() -> Vec<RouteDeclaration> {
        vec![
            RouteDeclaration::new("/")
                .name("home")
                .component(ViewDefinition::ready("home")),
            RouteDeclaration::new("/users")
                .name("users")
                .component(ViewDefinition::ready("users"))
                .child(
                    RouteDeclaration::new(":id")
                        .name("user")
                        .component(ViewDefinition::ready("user"))
                        .child(RouteDeclaration::new("posts").name("user-posts")),
                ),
            RouteDeclaration::new("*").name("not-found"),
        ]
    }

    #[test]
    fn test_child_paths_are_fully_qualified() {
        let table = RouteTable::build(nested_declarations());
        assert!(table.record("/users/:id").is_some());
        assert!(table.record("/users/:id/posts").is_some());

        let child = table.record("/users/:id/posts").unwrap();
        assert_eq!(child.parent().unwrap().path(), "/users/:id");
        assert_eq!(
            child.parent().unwrap().parent().unwrap().path(),
            "/users"
        );
    }

    #[test]
    fn test_path_list_and_map_agree() {
        let table = RouteTable::build(nested_declarations());
        assert_eq!(table.path_list().len(), table.len());
        let mut seen = std::collections::HashSet::new();
        for path in table.path_list() {
            assert!(table.record(path).is_some(), "{} missing from map", path);
            assert!(seen.insert(path.clone()), "{} duplicated in list", path);
        }
    }

    #[test]
    fn test_wildcards_pinned_last() {
        let table = RouteTable::build(vec![
            RouteDeclaration::new("*").name("catch-all"),
            RouteDeclaration::new("/a"),
            RouteDeclaration::new("/files/*"),
            RouteDeclaration::new("/b"),
        ]);
        let list = table.path_list();
        assert_eq!(list, &["/a", "/b", "*", "/files/*"]);
    }

    #[test]
    fn test_first_path_registration_wins() {
        let table = RouteTable::build(vec![
            RouteDeclaration::new("/dup").name("first"),
            RouteDeclaration::new("/dup").name("second"),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.record("/dup").unwrap().name(), Some("first"));
        // The colliding name still registers its own entry.
        assert!(table.record_by_name("second").is_some());
    }

    #[test]
    fn test_first_name_registration_wins() {
        let table = RouteTable::build(vec![
            RouteDeclaration::new("/a").name("dup"),
            RouteDeclaration::new("/b").name("dup"),
        ]);
        assert_eq!(table.record_by_name("dup").unwrap().path(), "/a");
    }

    #[test]
    fn test_add_routes_is_incremental() {
        let mut table = RouteTable::build(nested_declarations());
        let existing = Arc::clone(table.record("/users").unwrap());
        let revision = table.revision();

        table.add_routes(vec![RouteDeclaration::new("/new")]);

        assert!(table.record("/new").is_some());
        assert_eq!(table.revision(), revision + 1);
        // Previously taken references still point at the registered record.
        assert!(Arc::ptr_eq(&existing, table.record("/users").unwrap()));
    }

    #[test]
    fn test_add_routes_keeps_wildcards_last() {
        let mut table = RouteTable::build(vec![
            RouteDeclaration::new("/a"),
            RouteDeclaration::new("*"),
        ]);
        table.add_routes(vec![RouteDeclaration::new("/b")]);
        assert_eq!(table.path_list(), &["/a", "/b", "*"]);
    }

    #[test]
    fn test_alias_records_share_components() {
        let table = RouteTable::build(vec![RouteDeclaration::new("/users")
            .name("users")
            .component(ViewDefinition::ready("users"))
            .alias("/people")
            .child(RouteDeclaration::new(":id"))]);

        let alias = table.record("/people").unwrap();
        assert_eq!(alias.match_as(), Some("/users"));
        assert!(alias.name().is_none());
        assert!(alias.component("default").is_some());

        // Alias children inherit the alias prefix and a joined match target.
        let alias_child = table.record("/people/:id").unwrap();
        assert_eq!(alias_child.match_as(), Some("/users/:id"));
    }

    #[test]
    fn test_trailing_slash_normalization() {
        let table = RouteTable::build(vec![
            RouteDeclaration::new("/about/"),
            RouteDeclaration::new("/exact/").strict(),
        ]);
        assert!(table.record("/about").is_some());
        assert!(table.record("/exact/").is_some());
    }
}

//! Location matching against the route table
//!
//! The matcher turns a raw navigation target into a [`Route`]: named lookup
//! with required-parameter inheritance, priority-ordered path scanning,
//! redirect resolution (path, location, and computed forms) and alias
//! resolution. Matching never mutates anything and never fails for a merely
//! unknown location; the only hard error is a redirect cycle, which is cut
//! off by a depth budget instead of recursing forever.

use crate::error::MatchError;
use crate::location::{
    join_path, normalize, normalize_hash, split_path, NormalizedLocation, Query, RawLocation,
};
use crate::pattern::{PathPattern, PatternOptions};
use crate::record::{RedirectTarget, RouteDeclaration, RouteRecord};
use crate::route::Route;
use crate::table::RouteTable;
use crate::warn_log;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// How many times redirect/alias resolution may re-enter the matcher for one
/// location before it is reported as a cycle.
const MAX_REDIRECT_DEPTH: usize = 16;

/// Resolves locations against a route table.
///
/// The table sits behind a lock so `add_routes` can extend it while matched
/// chains handed out earlier stay valid (records are never removed).
pub struct RouteMatcher {
    table: RwLock<RouteTable>,
    #[cfg(feature = "cache")]
    cache: std::sync::Mutex<crate::cache::RouteCache>,
}

impl RouteMatcher {
    /// Build a matcher over a fresh table.
    pub fn new(declarations: Vec<RouteDeclaration>) -> Self {
        Self {
            table: RwLock::new(RouteTable::build(declarations)),
            #[cfg(feature = "cache")]
            cache: std::sync::Mutex::new(crate::cache::RouteCache::new()),
        }
    }

    #[cfg(feature = "cache")]
    pub(crate) fn with_cache_capacity(
        declarations: Vec<RouteDeclaration>,
        capacity: usize,
    ) -> Self {
        Self {
            table: RwLock::new(RouteTable::build(declarations)),
            cache: std::sync::Mutex::new(crate::cache::RouteCache::with_capacity(capacity)),
        }
    }

    /// Register additional declarations.
    ///
    /// Does not trigger a navigation; callers decide whether the current
    /// location should be re-resolved.
    pub fn add_routes(&self, declarations: Vec<RouteDeclaration>) {
        self.table
            .write()
            .expect("route table poisoned")
            .add_routes(declarations);
    }

    /// Run `f` over the table (diagnostics, tests).
    pub fn with_table<R>(&self, f: impl FnOnce(&RouteTable) -> R) -> R {
        f(&self.table.read().expect("route table poisoned"))
    }

    /// Resolve a location to a route.
    ///
    /// `current` supplies matching context: relative paths resolve against
    /// it and named navigation inherits its required parameters.
    /// `redirected_from` carries the original target's full path across
    /// redirect hops.
    pub fn resolve(
        &self,
        raw: &RawLocation,
        current: &Route,
        redirected_from: Option<String>,
    ) -> Result<Arc<Route>, MatchError> {
        let table = self.table.read().expect("route table poisoned");

        #[cfg(feature = "cache")]
        let cache_key = Self::cache_key(raw, redirected_from.as_deref());
        #[cfg(feature = "cache")]
        if let Some(key) = &cache_key {
            let mut cache = self.cache.lock().expect("route cache poisoned");
            if let Some(route) = cache.get(key, table.revision()) {
                return Ok(route);
            }
        }

        let route = Self::resolve_in(&table, raw, current, redirected_from, 0)?;

        #[cfg(feature = "cache")]
        if let Some(key) = cache_key {
            // Routes reached through a redirect can still depend on the
            // current route (named targets inherit required parameters), so
            // only direct matches are memoized.
            if route.redirected_from.is_none() {
                let mut cache = self.cache.lock().expect("route cache poisoned");
                cache.put(key, Arc::clone(&route), table.revision());
            }
        }

        Ok(route)
    }

    /// Cache only context-free lookups: an absolute path with no extra
    /// params. Redirect results can depend on the current route and are
    /// filtered out at store time, once they are known.
    #[cfg(feature = "cache")]
    fn cache_key(raw: &RawLocation, redirected_from: Option<&str>) -> Option<String> {
        if raw.name.is_some()
            || !raw.params.is_empty()
            || !raw.query.is_empty()
            || raw.hash.is_some()
            || redirected_from.is_some()
        {
            return None;
        }
        raw.path
            .as_deref()
            .filter(|p| p.starts_with('/'))
            .map(String::from)
    }

    fn resolve_in(
        table: &RouteTable,
        raw: &RawLocation,
        current: &Route,
        redirected_from: Option<String>,
        depth: usize,
    ) -> Result<Arc<Route>, MatchError> {
        let location = normalize(raw, &current.path, current.name.as_deref(), &current.params);

        if depth > MAX_REDIRECT_DEPTH {
            let path = location
                .path
                .or(location.name)
                .unwrap_or_else(|| "/".to_string());
            return Err(MatchError::RedirectCycle { path });
        }

        if let Some(name) = &location.name {
            return Self::resolve_named(table, name, &location, current, redirected_from, depth);
        }

        if let Some(path) = &location.path {
            for candidate in table.path_list() {
                let Some(record) = table.record(candidate) else {
                    continue;
                };
                if let Some(params) = record.pattern().matches(path) {
                    return Self::finalize(
                        table,
                        record,
                        path.clone(),
                        params,
                        location.query.clone(),
                        location.hash.clone(),
                        redirected_from,
                        current,
                        depth,
                    );
                }
            }
        }

        Ok(Self::unmatched(&location, redirected_from))
    }

    fn resolve_named(
        table: &RouteTable,
        name: &str,
        location: &NormalizedLocation,
        current: &Route,
        redirected_from: Option<String>,
        depth: usize,
    ) -> Result<Arc<Route>, MatchError> {
        let Some(record) = table.record_by_name(name) else {
            warn_log!("no route named '{}'", name);
            return Ok(Self::unmatched(location, redirected_from));
        };

        // Required parameters absent from the request are inherited from the
        // current route, so callers can navigate by name changing only what
        // differs. Optional parameters are never inherited.
        let mut params = location.params.clone();
        let required: Vec<String> = record
            .pattern()
            .required_keys()
            .map(String::from)
            .collect();
        for key in required {
            if !params.contains_key(&key) {
                if let Some(value) = current.params.get(&key) {
                    params.insert(key, value.clone());
                }
            }
        }

        let path = match record.pattern().fill(&params) {
            Ok(path) => path,
            Err(problem) => {
                warn_log!("cannot build a path for route '{}': {}", name, problem);
                return Ok(Self::unmatched(location, redirected_from));
            }
        };

        Self::finalize(
            table,
            record,
            path,
            params,
            location.query.clone(),
            location.hash.clone(),
            redirected_from,
            current,
            depth,
        )
    }

    /// Common finalize step: follow a redirect, resolve an alias, or build
    /// the route straight from the record.
    #[allow(clippy::too_many_arguments)]
    fn finalize(
        table: &RouteTable,
        record: &Arc<RouteRecord>,
        path: String,
        params: HashMap<String, String>,
        query: Query,
        hash: String,
        redirected_from: Option<String>,
        current: &Route,
        depth: usize,
    ) -> Result<Arc<Route>, MatchError> {
        if record.redirect().is_some() {
            return Self::follow_redirect(
                table,
                record,
                path,
                params,
                query,
                hash,
                redirected_from,
                current,
                depth,
            );
        }

        if let Some(match_as) = record.match_as() {
            return Self::resolve_alias(
                table,
                record,
                match_as,
                path,
                params,
                query,
                hash,
                redirected_from,
                depth,
            );
        }

        Ok(Route::assemble(
            Some(record),
            path,
            params,
            query,
            hash,
            redirected_from,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn follow_redirect(
        table: &RouteTable,
        record: &Arc<RouteRecord>,
        path: String,
        params: HashMap<String, String>,
        query: Query,
        hash: String,
        redirected_from: Option<String>,
        current: &Route,
        depth: usize,
    ) -> Result<Arc<Route>, MatchError> {
        // The route this navigation would have produced: input for computed
        // redirects and the origin recorded on the final route.
        let would_be = Route::assemble(
            Some(record),
            path,
            params.clone(),
            query.clone(),
            hash.clone(),
            None,
        );
        let origin = redirected_from.unwrap_or_else(|| would_be.full_path.clone());

        let target = match record.redirect().expect("checked by caller") {
            RedirectTarget::Path(target) => RawLocation::path(target.clone()),
            RedirectTarget::Location(location) => location.clone(),
            RedirectTarget::Compute(compute) => compute(&would_be),
        };

        // Carried-over context, each part overridable by the target's own.
        let eff_params = if target.params.is_empty() {
            params
        } else {
            target.params.clone()
        };
        let eff_query = if target.query.is_empty() {
            query
        } else {
            target.query.clone()
        };
        let eff_hash = match &target.hash {
            Some(h) => normalize_hash(Some(h)),
            None => hash,
        };

        if let Some(name) = &target.name {
            let mut raw = RawLocation::named(name.clone());
            raw.params = eff_params;
            raw.query = eff_query;
            raw.hash = Some(eff_hash);
            return Self::resolve_in(table, &raw, current, Some(origin), depth + 1);
        }

        if let Some(target_path) = &target.path {
            // Relative targets resolve against the redirecting record's
            // parent path; the result may itself contain parameters.
            let (rel_path, rel_query, rel_hash) = split_path(target_path);
            let base = record
                .parent()
                .map(|p| p.path().to_string())
                .unwrap_or_else(|| "/".to_string());
            let absolute = join_path(&base, rel_path);

            let template = PathPattern::compile(&absolute, PatternOptions::default());
            let filled = match template.fill(&eff_params) {
                Ok(filled) => filled,
                Err(problem) => {
                    warn_log!(
                        "redirect from '{}' cannot be filled: {}",
                        record.path(),
                        problem
                    );
                    return Ok(Self::unmatched_path("/", Some(origin)));
                }
            };

            let mut raw = RawLocation::path(filled);
            raw.query = if rel_query.is_empty() {
                eff_query
            } else {
                Query::parse(rel_query)
            };
            raw.hash = Some(if rel_hash.is_empty() {
                eff_hash
            } else {
                normalize_hash(Some(rel_hash))
            });
            return Self::resolve_in(table, &raw, current, Some(origin), depth + 1);
        }

        warn_log!(
            "invalid redirect on route '{}': target has neither path nor name",
            record.path()
        );
        Ok(Self::unmatched_path("/", Some(origin)))
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_alias(
        table: &RouteTable,
        record: &Arc<RouteRecord>,
        match_as: &str,
        path: String,
        params: HashMap<String, String>,
        query: Query,
        hash: String,
        redirected_from: Option<String>,
        depth: usize,
    ) -> Result<Arc<Route>, MatchError> {
        // Fill the original's path template with the alias's parameters and
        // re-match, then keep the alias's own chain and URL but adopt the
        // target's resolved parameters.
        let Some(target_record) = table.record(match_as) else {
            warn_log!(
                "alias '{}' points at unregistered path '{}'",
                record.path(),
                match_as
            );
            return Ok(Self::unmatched_path(&path, redirected_from));
        };

        let target_path = match target_record.pattern().fill(&params) {
            Ok(target_path) => target_path,
            Err(problem) => {
                warn_log!("alias '{}' cannot be filled: {}", record.path(), problem);
                return Ok(Self::unmatched_path(&path, redirected_from));
            }
        };

        // Re-matching runs against a neutral context: the filled target path
        // is already complete, and the alias result must not inherit
        // anything from the route the navigation started at.
        let context = Route::nowhere();
        let aliased = Self::resolve_in(
            table,
            &RawLocation::path(target_path),
            &context,
            None,
            depth + 1,
        )?;

        Ok(Route::assemble(
            Some(record),
            path,
            aliased.params.clone(),
            query,
            hash,
            redirected_from,
        ))
    }

    fn unmatched(location: &NormalizedLocation, redirected_from: Option<String>) -> Arc<Route> {
        let path = location.path.clone().unwrap_or_else(|| "/".to_string());
        Route::assemble(
            None,
            path,
            location.params.clone(),
            location.query.clone(),
            location.hash.clone(),
            redirected_from,
        )
    }

    fn unmatched_path(path: &str, redirected_from: Option<String>) -> Arc<Route> {
        Route::assemble(
            None,
            path.to_string(),
            HashMap::new(),
            Query::new(),
            String::new(),
            redirected_from,
        )
    }
}

impl std::fmt::Debug for RouteMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.with_table(RouteTable::len);
        f.debug_struct("RouteMatcher").field("routes", &len).finish()
    }
}

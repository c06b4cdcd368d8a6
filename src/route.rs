//! Resolved route snapshots
//!
//! A [`Route`] is the immutable result of matching a location: the normalized
//! path plus the ordered chain of records (root ancestor to leaf) that
//! satisfy it. A location that matches nothing still produces a route, with
//! an empty chain; hosts render nothing for it. Before any transition has
//! committed, the current route is the [`Route::nowhere`] sentinel.

use crate::location::{assemble_full_path, Query};
use crate::record::RouteRecord;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable result of a match, successful or not.
#[derive(Debug, Clone)]
pub struct Route {
    /// Normalized path (no query or hash)
    pub path: String,
    /// Name of the leaf record, if it has one
    pub name: Option<String>,
    /// Extracted and inherited route parameters
    pub params: HashMap<String, String>,
    /// Query parameters
    pub query: Query,
    /// Hash fragment, `#`-prefixed or empty
    pub hash: String,
    /// `path` + serialized query + hash
    pub full_path: String,
    /// Record chain from root ancestor to leaf; empty on a failed match
    pub matched: Vec<Arc<RouteRecord>>,
    /// Full path of the original target when this route came from a redirect
    pub redirected_from: Option<String>,
    /// Leaf record's metadata (empty on a failed match)
    pub meta: HashMap<String, String>,
}

impl Route {
    /// Assemble a route from a leaf record and resolved location parts.
    ///
    /// The matched chain is built by walking `parent` links up from the leaf
    /// and reversing; `record` of `None` produces the failed-match shape.
    pub(crate) fn assemble(
        record: Option<&Arc<RouteRecord>>,
        path: String,
        params: HashMap<String, String>,
        query: Query,
        hash: String,
        redirected_from: Option<String>,
    ) -> Arc<Route> {
        let mut matched = Vec::new();
        let mut cursor = record.cloned();
        while let Some(current) = cursor {
            cursor = current.parent().cloned();
            matched.push(current);
        }
        matched.reverse();

        let full_path = assemble_full_path(&path, &query, &hash);
        Arc::new(Route {
            path,
            name: record.and_then(|r| r.name().map(String::from)),
            params,
            query,
            hash,
            full_path,
            meta: record.map(|r| r.meta().clone()).unwrap_or_default(),
            matched,
            redirected_from,
        })
    }

    /// The sentinel current route before any transition has committed.
    pub fn nowhere() -> Arc<Route> {
        Route::assemble(
            None,
            "/".to_string(),
            HashMap::new(),
            Query::new(),
            String::new(),
            None,
        )
    }

    /// Whether this is a failed match (nothing to render).
    pub fn is_unmatched(&self) -> bool {
        self.matched.is_empty()
    }

    /// Leaf record of the matched chain.
    pub fn leaf(&self) -> Option<&Arc<RouteRecord>> {
        self.matched.last()
    }

    /// Whether `other` denotes the same resolved target.
    ///
    /// Compares name, path, params, query, and hash; the duplicate-navigation
    /// check combines this with equal chain lengths.
    pub fn is_same(&self, other: &Route) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.hash == other.hash
            && self.params == other.params
            && self.query == other.query
    }

    /// Whether `record` appears in this route's matched chain.
    pub fn contains_record(&self, record: &Arc<RouteRecord>) -> bool {
        self.matched.iter().any(|r| Arc::ptr_eq(r, record))
    }
}

#[cfg(test)]
impl Route {
    /// Bare path-only route for unit tests.
    pub(crate) fn for_test_path(path: &str) -> Arc<Route> {
        Route::assemble(
            None,
            path.to_string(),
            HashMap::new(),
            Query::new(),
            String::new(),
            None,
        )
    }

    /// Path route with parameters for unit tests.
    pub(crate) fn for_test_with_params(path: &str, params: &[(&str, &str)]) -> Arc<Route> {
        Route::assemble(
            None,
            path.to_string(),
            params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            Query::new(),
            String::new(),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nowhere_sentinel() {
        let route = Route::nowhere();
        assert_eq!(route.path, "/");
        assert_eq!(route.full_path, "/");
        assert!(route.is_unmatched());
        assert!(route.name.is_none());
        assert!(route.leaf().is_none());
    }

    #[test]
    fn test_full_path_assembly() {
        let route = Route::assemble(
            None,
            "/users/7".to_string(),
            HashMap::new(),
            Query::parse("tab=posts"),
            "#bio".to_string(),
            None,
        );
        assert_eq!(route.full_path, "/users/7?tab=posts#bio");
    }

    #[test]
    fn test_is_same_ignores_redirect_origin() {
        let a = Route::assemble(
            None,
            "/a".to_string(),
            HashMap::new(),
            Query::new(),
            String::new(),
            None,
        );
        let b = Route::assemble(
            None,
            "/a".to_string(),
            HashMap::new(),
            Query::new(),
            String::new(),
            Some("/old".to_string()),
        );
        assert!(a.is_same(&b));
    }

    #[test]
    fn test_is_same_distinguishes_query_and_params() {
        let plain = Route::for_test_path("/a");
        let with_params = Route::for_test_with_params("/a", &[("id", "1")]);
        assert!(!plain.is_same(&with_params));

        let with_query = Route::assemble(
            None,
            "/a".to_string(),
            HashMap::new(),
            Query::parse("x=1"),
            String::new(),
            None,
        );
        assert!(!plain.is_same(&with_query));
    }
}

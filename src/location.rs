//! Navigation targets and URL fragments
//!
//! A [`RawLocation`] is what callers hand to the navigator: either a raw path
//! string (possibly carrying a query string and hash) or a route name plus
//! parameters. Normalization turns it into a [`NormalizedLocation`], the form
//! the matcher consumes: exactly one of `path` / `name` drives matching, the
//! remaining fields refine it.

use std::collections::{BTreeMap, HashMap};

// ============================================================================
// Query
// ============================================================================

/// Query parameters parsed from a URL query string.
///
/// Keys are ordered and values keep insertion order, so two queries with the
/// same content always serialize identically. That stable form is what the
/// duplicate-navigation check compares.
///
/// # Example
///
/// ```
/// use wayfinder::Query;
///
/// let query = Query::parse("page=1&tag=rust&tag=nav");
/// assert_eq!(query.get("page"), Some("1"));
/// assert_eq!(query.get_all("tag").unwrap().len(), 2);
/// assert_eq!(query.to_query_string(), "page=1&tag=rust&tag=nav");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: BTreeMap<String, Vec<String>>,
}

impl Query {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params
                .entry(decode_component(key))
                .or_default()
                .push(decode_component(value));
        }
        Self { params }
    }

    /// First value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.first().map(|s| s.as_str())
    }

    /// All values for a key.
    pub fn get_all(&self, key: &str) -> Option<&Vec<String>> {
        self.params.get(key)
    }

    /// First value parsed as `T`.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Append a value for a key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Whether the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Merge `other` over `self`: keys present in `other` replace this
    /// query's values for the same key.
    pub fn extend(&mut self, other: &Query) {
        for (key, values) in &other.params {
            self.params.insert(key.clone(), values.clone());
        }
    }

    /// Serialize back to a query string (no leading `?`; empty when empty).
    pub fn to_query_string(&self) -> String {
        let pairs: Vec<String> = self
            .params
            .iter()
            .flat_map(|(key, values)| {
                values.iter().map(move |value| {
                    if value.is_empty() {
                        encode_component(key)
                    } else {
                        format!("{}={}", encode_component(key), encode_component(value))
                    }
                })
            })
            .collect();
        pairs.join("&")
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

// ============================================================================
// Raw and normalized locations
// ============================================================================

/// A navigation target as supplied by the caller.
///
/// Build one from a raw string (`"/users/7?tab=posts#bio"`) or with the
/// named-route constructors:
///
/// ```
/// use wayfinder::RawLocation;
///
/// let by_path = RawLocation::from("/users/7?tab=posts");
/// let by_name = RawLocation::named("user").with_param("id", "7").replacing();
/// assert!(by_path.name.is_none());
/// assert!(by_name.replace);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RawLocation {
    /// Raw path, possibly carrying `?query` and `#hash` suffixes
    pub path: Option<String>,
    /// Route name; takes precedence over `path` when set
    pub name: Option<String>,
    /// Route parameters (named navigation and redirect targets)
    pub params: HashMap<String, String>,
    /// Extra query parameters, merged over any query parsed from `path`
    pub query: Query,
    /// Hash fragment, overriding any hash parsed from `path`
    pub hash: Option<String>,
    /// Replace the current history entry instead of pushing a new one
    pub replace: bool,
}

impl RawLocation {
    /// Target a raw path.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Target a named route.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Add a route parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key, value);
        self
    }

    /// Set the hash fragment.
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Request replace semantics on the history backend.
    #[must_use]
    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }
}

impl From<&str> for RawLocation {
    fn from(path: &str) -> Self {
        RawLocation::path(path)
    }
}

impl From<String> for RawLocation {
    fn from(path: String) -> Self {
        RawLocation::path(path)
    }
}

/// A normalized navigation target, ready for matching.
#[derive(Debug, Clone, Default)]
pub struct NormalizedLocation {
    /// Absolute path (set unless `name` drives the match)
    pub path: Option<String>,
    /// Route name (takes precedence over `path`)
    pub name: Option<String>,
    /// Route parameters
    pub params: HashMap<String, String>,
    /// Query parameters
    pub query: Query,
    /// Hash fragment, `#`-prefixed or empty
    pub hash: String,
}

/// Normalize a raw location against the path/name context of the current
/// route.
///
/// `current_path` and `current_name`/`current_params` come from the route the
/// navigator is currently at; relative paths resolve against `current_path`,
/// and a location with neither path nor name re-targets the current route.
pub fn normalize(
    raw: &RawLocation,
    current_path: &str,
    current_name: Option<&str>,
    current_params: &HashMap<String, String>,
) -> NormalizedLocation {
    if let Some(name) = &raw.name {
        return NormalizedLocation {
            path: None,
            name: Some(name.clone()),
            params: raw.params.clone(),
            query: raw.query.clone(),
            hash: normalize_hash(raw.hash.as_deref()),
        };
    }

    if let Some(raw_path) = &raw.path {
        let (path, query_str, hash) = split_path(raw_path);
        let resolved = resolve_path(path, current_path);
        let mut query = Query::parse(query_str);
        query.extend(&raw.query);
        let hash = raw
            .hash
            .as_deref()
            .map(|h| normalize_hash(Some(h)))
            .unwrap_or_else(|| normalize_hash(if hash.is_empty() { None } else { Some(hash) }));
        return NormalizedLocation {
            path: Some(resolved),
            name: None,
            params: raw.params.clone(),
            query,
            hash,
        };
    }

    // Neither path nor name: re-target the current route, letting the raw
    // location's params/query/hash refine it.
    if let Some(name) = current_name {
        let mut params = current_params.clone();
        params.extend(raw.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        NormalizedLocation {
            path: None,
            name: Some(name.to_string()),
            params,
            query: raw.query.clone(),
            hash: normalize_hash(raw.hash.as_deref()),
        }
    } else {
        NormalizedLocation {
            path: Some(current_path.to_string()),
            name: None,
            params: raw.params.clone(),
            query: raw.query.clone(),
            hash: normalize_hash(raw.hash.as_deref()),
        }
    }
}

/// Split a raw path string into (path, query, hash) parts.
///
/// The query comes back without `?`, the hash without `#`.
pub fn split_path(raw: &str) -> (&str, &str, &str) {
    let (rest, hash) = match raw.split_once('#') {
        Some((r, h)) => (r, h),
        None => (raw, ""),
    };
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, q),
        None => (rest, ""),
    };
    (path, query, hash)
}

/// Resolve a possibly-relative path against a base path.
///
/// Absolute paths pass through. Relative paths resolve against the base's
/// parent directory, with `.` and `..` handled segment by segment.
pub fn resolve_path(relative: &str, base: &str) -> String {
    if relative.starts_with('/') {
        return relative.to_string();
    }
    if relative.is_empty() {
        return base.to_string();
    }

    let mut stack: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    // Relative targets replace the last segment of the base.
    stack.pop();

    for segment in relative.split('/') {
        match segment {
            ".." => {
                stack.pop();
            }
            "." | "" => {}
            other => stack.push(other),
        }
    }

    let mut out = String::from("/");
    out.push_str(&stack.join("/"));
    out
}

/// Join a relative path onto a base path treated as a directory.
///
/// Unlike [`resolve_path`], the base's last segment is kept: redirect targets
/// declared on a record resolve inside the record's parent path.
pub fn join_path(base: &str, relative: &str) -> String {
    if relative.starts_with('/') {
        return relative.to_string();
    }
    let mut stack: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            ".." => {
                stack.pop();
            }
            "." | "" => {}
            other => stack.push(other),
        }
    }
    let mut out = String::from("/");
    out.push_str(&stack.join("/"));
    out
}

/// Normalize a hash fragment to its `#`-prefixed form (empty when absent).
pub fn normalize_hash(hash: Option<&str>) -> String {
    match hash {
        None | Some("") => String::new(),
        Some(h) if h.starts_with('#') => h.to_string(),
        Some(h) => format!("#{}", h),
    }
}

/// Assemble a full path from its parts.
pub fn assemble_full_path(path: &str, query: &Query, hash: &str) -> String {
    let mut out = String::from(path);
    let query_str = query.to_query_string();
    if !query_str.is_empty() {
        out.push('?');
        out.push_str(&query_str);
    }
    out.push_str(hash);
    out
}

// ============================================================================
// Percent encoding
// ============================================================================

/// Percent-encode a URI component.
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Percent-decode a URI component; malformed escapes pass through verbatim.
pub fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(hex) = s.get(i + 1..i + 3) {
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
            out.push(b'%');
            i += 1;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

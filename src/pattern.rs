//! Path pattern compilation and matching
//!
//! Route paths compile once, at table-build time, into a segment list plus an
//! ordered parameter-key descriptor list. The compiled pattern does three
//! jobs: match a concrete path and extract parameter values, fill its own
//! template from a parameter map (named navigation, alias targets), and
//! report its parameter keys so the matcher knows which ones are required.
//!
//! Syntax:
//! - `users` - static segment, must match exactly
//! - `:id` - required parameter
//! - `:tab?` - optional parameter (may be absent from the path)
//! - `*` - wildcard, consumes the rest of the path

use crate::location::decode_component;
use std::collections::HashMap;

/// Parameter key extracted by the wildcard segment.
pub const WILDCARD_KEY: &str = "path_match";

/// One segment of a compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Static text that must match exactly
    Static(String),
    /// Parameter capturing one path segment
    Param {
        name: String,
        optional: bool,
    },
    /// Wildcard capturing the rest of the path
    Wildcard,
}

impl Segment {
    /// Parse a single segment.
    fn parse(s: &str) -> Self {
        if s == "*" {
            return Segment::Wildcard;
        }
        if let Some(rest) = s.strip_prefix(':') {
            if let Some(name) = rest.strip_suffix('?') {
                return Segment::Param {
                    name: name.to_string(),
                    optional: true,
                };
            }
            return Segment::Param {
                name: rest.to_string(),
                optional: false,
            };
        }
        Segment::Static(s.to_string())
    }
}

/// Ordered descriptor of one parameter in a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamKey {
    /// Parameter name (`path_match` for the wildcard)
    pub name: String,
    /// Whether the path is valid without this parameter
    pub optional: bool,
}

/// Matching options carried per pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOptions {
    /// Compare static segments case-sensitively
    pub case_sensitive: bool,
    /// Require the trailing slash of the input to match the pattern exactly
    pub strict: bool,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            strict: false,
        }
    }
}

/// A compiled route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
    keys: Vec<ParamKey>,
    options: PatternOptions,
    /// Whether the source path ended with a slash (used in strict mode)
    trailing_slash: bool,
}

impl PathPattern {
    /// Compile a normalized path into a pattern.
    pub fn compile(path: &str, options: PatternOptions) -> Self {
        let mut segments: Vec<Segment> = Vec::new();
        for raw in path.split('/').filter(|s| !s.is_empty()) {
            let segment = Segment::parse(raw);
            segments.push(segment);
            // The wildcard consumes everything after it.
            if matches!(segments.last(), Some(Segment::Wildcard)) {
                break;
            }
        }

        let keys = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param { name, optional } => Some(ParamKey {
                    name: name.clone(),
                    optional: *optional,
                }),
                Segment::Wildcard => Some(ParamKey {
                    name: WILDCARD_KEY.to_string(),
                    optional: false,
                }),
                Segment::Static(_) => None,
            })
            .collect();

        Self {
            segments,
            keys,
            options,
            trailing_slash: path.len() > 1 && path.ends_with('/'),
        }
    }

    /// Ordered parameter keys of this pattern.
    pub fn keys(&self) -> &[ParamKey] {
        &self.keys
    }

    /// Names of parameters that must be present for a fill to succeed.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .filter(|k| !k.optional)
            .map(|k| k.name.as_str())
    }

    /// Parameter names that appear more than once (a declaration mistake).
    pub fn duplicate_keys(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.keys
            .iter()
            .filter(|k| !seen.insert(k.name.as_str()))
            .map(|k| k.name.as_str())
            .collect()
    }

    /// Whether the pattern contains a wildcard segment.
    ///
    /// Wildcard patterns are pinned to the end of the table's priority list.
    pub fn has_wildcard(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Wildcard))
    }

    /// Match a concrete path, extracting percent-decoded parameter values.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        if self.options.strict {
            let input_trailing = path.len() > 1 && path.ends_with('/');
            if input_trailing != self.trailing_slash {
                return None;
            }
        }

        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut params = HashMap::new();
        if self.match_from(0, &path_segments, 0, &mut params) {
            Some(params)
        } else {
            None
        }
    }

    /// Match `segments[segment_idx..]` against `path_segments[path_idx..]`.
    ///
    /// Optional parameters try the consuming branch first and fall back to
    /// skipping their segment, so an omitted optional in the middle of a
    /// pattern still lets the rest match.
    fn match_from(
        &self,
        segment_idx: usize,
        path_segments: &[&str],
        path_idx: usize,
        params: &mut HashMap<String, String>,
    ) -> bool {
        let Some(segment) = self.segments.get(segment_idx) else {
            return path_idx == path_segments.len();
        };

        match segment {
            Segment::Static(expected) => match path_segments.get(path_idx) {
                Some(&actual) if self.segment_eq(expected, actual) => {
                    self.match_from(segment_idx + 1, path_segments, path_idx + 1, params)
                }
                _ => false,
            },
            Segment::Param { name, optional } => {
                if let Some(&value) = path_segments.get(path_idx) {
                    params.insert(name.clone(), decode_component(value));
                    if self.match_from(segment_idx + 1, path_segments, path_idx + 1, params) {
                        return true;
                    }
                    params.remove(name);
                }
                *optional && self.match_from(segment_idx + 1, path_segments, path_idx, params)
            }
            Segment::Wildcard => {
                let rest = path_segments[path_idx..].join("/");
                params.insert(WILDCARD_KEY.to_string(), decode_component(&rest));
                true
            }
        }
    }

    fn segment_eq(&self, expected: &str, actual: &str) -> bool {
        if self.options.case_sensitive {
            actual == expected
        } else {
            actual.eq_ignore_ascii_case(expected)
        }
    }

    /// Fill the pattern's template from a parameter map.
    ///
    /// Missing optional parameters drop their segment; a missing required
    /// parameter fails the fill and the caller reports it as a diagnostic.
    pub fn fill(&self, params: &HashMap<String, String>) -> Result<String, FillError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Static(text) => {
                    out.push('/');
                    out.push_str(text);
                }
                Segment::Param { name, optional } => match params.get(name) {
                    Some(value) => {
                        out.push('/');
                        out.push_str(value);
                    }
                    None if *optional => {}
                    None => {
                        return Err(FillError {
                            missing: name.clone(),
                        })
                    }
                },
                Segment::Wildcard => match params.get(WILDCARD_KEY) {
                    Some(value) => {
                        out.push('/');
                        out.push_str(value);
                    }
                    None => {
                        return Err(FillError {
                            missing: WILDCARD_KEY.to_string(),
                        })
                    }
                },
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        Ok(out)
    }
}

/// Template fill failure: a required parameter was absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillError {
    /// Name of the missing parameter
    pub missing: String,
}

impl std::fmt::Display for FillError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing required route parameter '{}'", self.missing)
    }
}

impl std::error::Error for FillError {}

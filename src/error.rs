//! Error types for matching and navigation
//!
//! A failed *match* is not an error: it yields a route with an empty matched
//! chain and the host renders nothing for it. The types here cover the
//! conditions that end a *transition* (duplicates, guard decisions, lazy view
//! failures) plus the one structural matching failure that cannot degrade
//! gracefully, a redirect cycle.

use std::fmt;

/// Conditions that conclude a navigation transition without a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// The target is the route that is already current.
    Duplicated {
        /// Full path of the duplicated target
        path: String,
    },

    /// A newer transition replaced this one while its guards were running.
    Superseded {
        /// Full path of the abandoned target
        path: String,
    },

    /// A guard cancelled the navigation.
    Blocked {
        /// Optional reason supplied by the guard
        reason: Option<String>,
    },

    /// A guard failed with an error message.
    Failure {
        /// Error description surfaced to error listeners
        message: String,
    },

    /// Redirect resolution exceeded its depth budget.
    RedirectLoop {
        /// Path at which the budget ran out
        path: String,
    },

    /// A lazily loaded view definition failed to resolve.
    ResolveFailed {
        /// Loader failure description
        message: String,
    },
}

impl NavigationError {
    /// Guard cancellation without a reason.
    pub fn blocked() -> Self {
        NavigationError::Blocked { reason: None }
    }

    /// Guard cancellation with a reason.
    pub fn blocked_with(reason: impl Into<String>) -> Self {
        NavigationError::Blocked {
            reason: Some(reason.into()),
        }
    }

    /// Guard failure with a message.
    pub fn failure(message: impl Into<String>) -> Self {
        NavigationError::Failure {
            message: message.into(),
        }
    }

    /// Lazy view resolution failure with a message.
    pub fn resolve_failed(message: impl Into<String>) -> Self {
        NavigationError::ResolveFailed {
            message: message.into(),
        }
    }

    /// True for the duplicate-navigation condition.
    ///
    /// Duplicates are reported to the caller but never to error listeners.
    pub fn is_duplicated(&self) -> bool {
        matches!(self, NavigationError::Duplicated { .. })
    }

    /// True when a newer transition replaced this one.
    ///
    /// Superseded transitions abort silently: no listener fan-out at all.
    pub fn is_superseded(&self) -> bool {
        matches!(self, NavigationError::Superseded { .. })
    }

    /// True when a guard cancelled the navigation.
    pub fn is_blocked(&self) -> bool {
        matches!(self, NavigationError::Blocked { .. })
    }

    /// True for conditions that fan out to registered error listeners.
    pub fn is_listener_visible(&self) -> bool {
        !self.is_duplicated() && !self.is_superseded()
    }
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::Duplicated { path } => {
                write!(f, "navigation duplicated: already at {}", path)
            }
            NavigationError::Superseded { path } => {
                write!(f, "navigation superseded while heading to {}", path)
            }
            NavigationError::Blocked { reason: Some(r) } => {
                write!(f, "navigation blocked: {}", r)
            }
            NavigationError::Blocked { reason: None } => {
                write!(f, "navigation blocked by guard")
            }
            NavigationError::Failure { message } => {
                write!(f, "navigation failed: {}", message)
            }
            NavigationError::RedirectLoop { path } => {
                write!(f, "redirect loop detected at {}", path)
            }
            NavigationError::ResolveFailed { message } => {
                write!(f, "view resolution failed: {}", message)
            }
        }
    }
}

impl std::error::Error for NavigationError {}

/// Structural matching failure.
///
/// Everything else a matcher can hit degrades to a no-match route; a redirect
/// cycle cannot, because there is no meaningful route to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// Redirect or alias resolution re-entered itself past the depth budget.
    RedirectCycle {
        /// Path at which the budget ran out
        path: String,
    },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::RedirectCycle { path } => {
                write!(f, "redirect cycle while resolving {}", path)
            }
        }
    }
}

impl std::error::Error for MatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicated_is_not_listener_visible() {
        let err = NavigationError::Duplicated {
            path: "/a".to_string(),
        };
        assert!(err.is_duplicated());
        assert!(!err.is_listener_visible());
    }

    #[test]
    fn test_superseded_is_silent() {
        let err = NavigationError::Superseded {
            path: "/b".to_string(),
        };
        assert!(err.is_superseded());
        assert!(!err.is_listener_visible());
    }

    #[test]
    fn test_blocked_reaches_listeners() {
        assert!(NavigationError::blocked().is_listener_visible());
        assert!(NavigationError::blocked_with("unsaved changes").is_blocked());
    }

    #[test]
    fn test_display() {
        let err = NavigationError::blocked_with("unsaved changes");
        assert_eq!(err.to_string(), "navigation blocked: unsaved changes");

        let err = NavigationError::resolve_failed("chunk load error");
        assert_eq!(err.to_string(), "view resolution failed: chunk load error");

        let err = MatchError::RedirectCycle {
            path: "/a".to_string(),
        };
        assert_eq!(err.to_string(), "redirect cycle while resolving /a");
    }
}

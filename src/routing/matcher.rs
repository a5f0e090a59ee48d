//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive) on a segment boundary
//! - Return the remainder of the path after the prefix
//!
//! # Design Decisions
//! - `/users` matches `/users` and `/users/...`, never `/usersettings`
//! - No regex to guarantee O(n) matching

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing slash is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The path after the prefix, or `None` if the path does not match.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(&self.prefix)?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/users");

        assert_eq!(matcher.strip("/users/42"), Some("/42"));
        assert_eq!(matcher.strip("/users"), Some(""));
        assert_eq!(matcher.strip("/users/"), Some("/"));
        assert_eq!(matcher.strip("/users/42/orders"), Some("/42/orders"));
        assert!(!matcher.matches("/usersettings"));
        assert!(!matcher.matches("/notifications/1"));
        assert!(!matcher.matches("/Users/1"));
    }

    #[test]
    fn test_trailing_slash_ignored() {
        let matcher = PathPrefixMatcher::new("/notifications/");
        assert_eq!(matcher.prefix(), "/notifications");
        assert_eq!(matcher.strip("/notifications/7"), Some("/7"));
    }
}

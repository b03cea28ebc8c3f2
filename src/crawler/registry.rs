//! Ordered URL-pattern routing tables
//!
//! A [`Registry`] maps regular expressions to capabilities. Lookup walks the
//! entries in registration order and returns the first one whose pattern
//! matches, so an earlier, more specific route always shadows a later,
//! broader one. Patterns are unanchored; callers anchor them with `^`.

use crate::SpiderError;
use regex::Regex;

/// A single (pattern, capability) routing entry
#[derive(Debug, Clone)]
struct Route<T> {
    regex: Regex,
    target: T,
}

/// Append-only, first-match-wins list of routes
#[derive(Debug, Clone)]
pub struct Registry<T> {
    routes: Vec<Route<T>>,
}

impl<T> Registry<T> {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Compiles `pattern` and appends a route to `target`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The route was registered
    /// * `Err(SpiderError::InvalidPattern)` - The pattern does not compile
    pub fn add(&mut self, pattern: &str, target: T) -> Result<(), SpiderError> {
        let regex = Regex::new(pattern).map_err(|source| SpiderError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.routes.push(Route { regex, target });
        Ok(())
    }

    /// Returns the target of the first route matching `url`
    pub fn find(&self, url: &str) -> Option<&T> {
        self.routes
            .iter()
            .find(|route| route.regex.is_match(url))
            .map(|route| &route.target)
    }

    /// Returns the number of registered routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether no route is registered
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns the registered patterns in registration order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.regex.as_str())
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! Scope sets and the two comparison modes used across the registry
//! (§3 "Scopes").

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The well-known scope every DA and SA belongs to unless configured
/// otherwise.
pub const DEFAULT_SCOPE: &str = "DEFAULT";

/// A case-insensitive set of scope names.
///
/// Scope names are stored upper-cased so that equality, containment and
/// set operations never need to re-normalize on every comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scopes(BTreeSet<String>);

impl Scopes {
    /// Builds a scope set from an iterator of scope names, normalizing
    /// each to upper case.
    pub fn new<I, S>(scopes: I) -> Scopes
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Scopes(scopes.into_iter().map(|s| s.as_ref().to_uppercase()).collect())
    }

    /// The `{DEFAULT}` scope set.
    pub fn default_scope() -> Scopes {
        Scopes::new([DEFAULT_SCOPE])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(&scope.to_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Strong match: every scope in `other` must appear in `self`
    /// (containment) — `self.match_strong(other)` iff `other ⊆ self`.
    ///
    /// Used two ways depending on which side plays "container":
    /// - Registration: `da.scopes.match_strong(&service.scopes)` — the DA
    ///   must own every scope of the service being registered.
    /// - Query: `entry.scopes.match_strong(&request.scopes)` — the entry
    ///   must carry every scope named in the request.
    ///
    /// An empty `other` trivially matches (nothing to require).
    pub fn match_strong(&self, other: &Scopes) -> bool {
        other.0.is_subset(&self.0)
    }

    /// Weak match: non-empty intersection, or either side is the
    /// `DEFAULT` wildcard set. Used for discovery, where partial overlap
    /// suffices.
    ///
    /// An empty `other` (no scopes specified in the request) always
    /// matches.
    pub fn match_weak(&self, other: &Scopes) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.is_default() || other.is_default() {
            return true;
        }
        !self.0.is_disjoint(&other.0)
    }

    fn is_default(&self) -> bool {
        self.0.len() == 1 && self.0.contains(DEFAULT_SCOPE)
    }
}

impl Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iter().collect::<Vec<_>>().join(","))
    }
}

impl<I, S> From<I> for Scopes
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fn from(scopes: I) -> Scopes {
        Scopes::new(scopes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_match_requires_containment() {
        let da = Scopes::new(["a", "b"]);
        let svc = Scopes::new(["A"]);
        assert!(da.match_strong(&svc));

        let svc2 = Scopes::new(["a", "c"]);
        assert!(!da.match_strong(&svc2));
    }

    #[test]
    fn strong_match_case_insensitive() {
        let da = Scopes::new(["Default"]);
        let svc = Scopes::new(["DEFAULT"]);
        assert!(da.match_strong(&svc));
    }

    #[test]
    fn weak_match_empty_request_matches_anything() {
        let da = Scopes::new(["a"]);
        assert!(da.match_weak(&Scopes::default()));
    }

    #[test]
    fn weak_match_default_wildcard() {
        let da = Scopes::default_scope();
        let req = Scopes::new(["printing"]);
        assert!(da.match_weak(&req));
    }

    #[test]
    fn weak_match_requires_intersection() {
        let da = Scopes::new(["a"]);
        let req = Scopes::new(["b"]);
        assert!(!da.match_weak(&req));

        let req2 = Scopes::new(["a", "b"]);
        assert!(da.match_weak(&req2));
    }
}

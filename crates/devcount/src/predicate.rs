//! Per-item decisions applied while paging.
//!
//! Two capabilities with different control-flow effects:
//!
//! - [`BailPredicate`] halts the whole traversal at the first matching item.
//!   The matching item is not collected and no further page is fetched.
//! - [`SkipPredicate`] drops only the matching item; enumeration of its
//!   siblings continues.

use crate::bitbucket::{Commit, Project, Repository};

/// Stops a traversal at the first item for which [`should_stop`] is true.
///
/// [`should_stop`]: BailPredicate::should_stop
pub trait BailPredicate<T>: Sync {
    fn should_stop(&self, item: &T) -> bool;
}

/// Excludes individual items without stopping the traversal.
pub trait SkipPredicate<T>: Sync {
    fn should_skip(&self, item: &T) -> bool;
}

/// Bails on the first commit authored before the cutoff.
///
/// Only valid for newest-first commit listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OlderThan {
    cutoff_ms: i64,
}

impl OlderThan {
    pub fn new(cutoff_ms: i64) -> Self {
        Self { cutoff_ms }
    }

    pub fn cutoff_ms(&self) -> i64 {
        self.cutoff_ms
    }
}

impl BailPredicate<Commit> for OlderThan {
    fn should_stop(&self, commit: &Commit) -> bool {
        commit.author_timestamp < self.cutoff_ms
    }
}

/// An item with a unique identifier that name filters compare against.
pub trait Named {
    fn ident(&self) -> &str;
}

impl Named for Project {
    fn ident(&self) -> &str {
        &self.key
    }
}

impl Named for Repository {
    fn ident(&self) -> &str {
        &self.slug
    }
}

/// Skips every item whose identifier is not exactly `wanted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactName<'a> {
    wanted: &'a str,
}

impl<'a> ExactName<'a> {
    pub fn new(wanted: &'a str) -> Self {
        Self { wanted }
    }
}

impl<T: Named> SkipPredicate<T> for ExactName<'_> {
    fn should_skip(&self, item: &T) -> bool {
        item.ident() != self.wanted
    }
}

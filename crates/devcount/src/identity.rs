//! Author identities and the first-seen-ordered roster.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::bitbucket::Author;

/// A commit author, identified by the composite `"name <email>"`.
///
/// Two identities are equal when their composites are byte-for-byte equal;
/// no case folding or email normalisation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AuthorIdentity(String);

impl AuthorIdentity {
    pub fn new(name: &str, email: &str) -> Self {
        Self(format!("{name} <{email}>"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Author> for AuthorIdentity {
    fn from(author: &Author) -> Self {
        Self::new(&author.name, &author.email_address)
    }
}

impl fmt::Display for AuthorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique author identities in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct IdentitySet {
    seen: HashSet<AuthorIdentity>,
    ordered: Vec<AuthorIdentity>,
}

impl IdentitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `identity`; returns `true` if it was not present yet.
    pub fn add(&mut self, identity: AuthorIdentity) -> bool {
        if self.seen.contains(&identity) {
            return false;
        }
        self.seen.insert(identity.clone());
        self.ordered.push(identity);
        true
    }

    pub fn contains(&self, identity: &AuthorIdentity) -> bool {
        self.seen.contains(identity)
    }

    /// All identities, in the order they were first added.
    pub fn all(&self) -> &[AuthorIdentity] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn into_vec(self) -> Vec<AuthorIdentity> {
        self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str, email: &str) -> AuthorIdentity {
        AuthorIdentity::new(name, email)
    }

    #[test]
    fn composite_format() {
        assert_eq!(
            id("Ada Lovelace", "ada@example.com").as_str(),
            "Ada Lovelace <ada@example.com>"
        );
        assert_eq!(id("Bot", "").to_string(), "Bot <>");
    }

    #[test]
    fn from_author_uses_email_address() {
        let author = Author {
            name: "Grace".to_string(),
            email_address: "grace@example.com".to_string(),
        };
        assert_eq!(AuthorIdentity::from(&author), id("Grace", "grace@example.com"));
    }

    #[test]
    fn add_reports_new_and_duplicate() {
        let mut set = IdentitySet::new();
        assert!(set.is_empty());
        assert!(set.add(id("a", "a@x")));
        assert!(!set.add(id("a", "a@x")));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&id("a", "a@x")));
    }

    #[test]
    fn first_seen_order_survives_duplicates() {
        let mut set = IdentitySet::new();
        let seen = [("b", "b@x"), ("a", "a@x"), ("b", "b@x"), ("c", "c@x"), ("a", "a@x")];
        for (name, email) in seen {
            set.add(id(name, email));
        }
        let names: Vec<&str> = set.all().iter().map(AuthorIdentity::as_str).collect();
        assert_eq!(names, vec!["b <b@x>", "a <a@x>", "c <c@x>"]);
    }

    #[test]
    fn same_name_different_email_are_distinct() {
        let mut set = IdentitySet::new();
        assert!(set.add(id("Ada", "ada@work.example")));
        assert!(set.add(id("Ada", "ada@home.example")));
        assert!(set.add(id("ada", "ada@work.example")));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn serializes_as_plain_strings() {
        let mut set = IdentitySet::new();
        set.add(id("a", "a@x"));
        let json = serde_json::to_string(&set.into_vec()).unwrap();
        assert_eq!(json, r#"["a <a@x>"]"#);
    }
}

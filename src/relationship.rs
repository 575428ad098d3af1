//! Closed-world mutual relationship queries
//!
//! Answers "which of these candidates follow the subject back?" using only
//! snapshots already in the store. A candidate counts when their own cached
//! snapshot lists the subject among its followers.
//!
//! # Limitation
//!
//! This is a closed-world approximation. A real mutual follower
//! whose profile has never been resolved (and so is not cached) is silently
//! left out. Queries here must never fetch from the upstream source to fill
//! those gaps; callers who want a more complete answer resolve the candidates
//! first.
//!
//! Only one direction is checked: the subject appearing in the candidate's
//! followers. Whether the subject's own snapshot lists the candidate is not
//! consulted.

use crate::profile::ProfileSnapshot;
use crate::store::EntityStore;
use crate::Result;
use serde::{Deserialize, Serialize};

/// A subject and the candidates to test against it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipQuery {
    pub subject: String,
    pub candidates: Vec<String>,
}

impl RelationshipQuery {
    pub fn new(subject: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            candidates,
        }
    }

    /// Query whose candidates are the subject's own cached followers
    ///
    /// Empty when the subject is not cached or carries no follower list.
    pub fn from_followers(subject: &ProfileSnapshot) -> Self {
        let candidates = subject
            .followers()
            .unwrap_or_default()
            .into_iter()
            .map(String::from)
            .collect();
        Self::new(subject.identity.clone(), candidates)
    }

    /// Run the query against `store`
    pub fn resolve(&self, store: &dyn EntityStore) -> Result<Vec<String>> {
        mutuals(store, &self.subject, &self.candidates)
    }
}

/// Candidates whose cached snapshot lists `subject` as a follower
///
/// The result is a subsequence of `candidates` in their original order,
/// duplicates included. Uncached candidates and snapshots without a follower
/// list are excluded, not errors. Only store errors are returned.
pub fn mutuals(
    store: &dyn EntityStore,
    subject: &str,
    candidates: &[String],
) -> Result<Vec<String>> {
    let mut result = Vec::new();

    for candidate in candidates {
        match store.get(candidate)? {
            Some(snapshot) if snapshot.has_follower(subject) => result.push(candidate.clone()),
            Some(_) => {}
            None => tracing::trace!(subject, candidate = %candidate, "Candidate not cached"),
        }
    }

    tracing::debug!(
        subject,
        candidates = candidates.len(),
        mutuals = result.len(),
        "Resolved mutual relationships"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_uncached_candidate_is_excluded() {
        let store = MemoryStore::new();
        store
            .put("bob", json!({ "login": "bob", "followers": ["alice"] }))
            .unwrap();

        let result = mutuals(&store, "alice", &ids(&["bob", "carol"])).unwrap();
        assert_eq!(result, vec!["bob"]);
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let store = MemoryStore::new();
        for name in ["dave", "bob", "erin"] {
            store
                .put(name, json!({ "followers": [{ "login": "alice" }] }))
                .unwrap();
        }
        store.put("carol", json!({ "followers": ["zed"] })).unwrap();

        let candidates = ids(&["erin", "carol", "bob", "erin", "dave"]);
        let result = mutuals(&store, "alice", &candidates).unwrap();
        assert_eq!(result, vec!["erin", "bob", "erin", "dave"]);
    }

    #[test]
    fn test_missing_or_numeric_followers_excluded() {
        let store = MemoryStore::new();
        store.put("bob", json!({ "login": "bob" })).unwrap();
        store.put("carol", json!({ "followers": 3 })).unwrap();

        let result = mutuals(&store, "alice", &ids(&["bob", "carol"])).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_subject_match_is_case_sensitive() {
        let store = MemoryStore::new();
        store.put("bob", json!({ "followers": ["Alice"] })).unwrap();

        assert!(mutuals(&store, "alice", &ids(&["bob"])).unwrap().is_empty());
    }

    #[test]
    fn test_only_candidate_side_is_checked() {
        let store = MemoryStore::new();
        // alice lists bob, but bob's snapshot does not list alice
        store.put("alice", json!({ "followers": ["bob"] })).unwrap();
        store.put("bob", json!({ "followers": [] })).unwrap();

        assert!(mutuals(&store, "alice", &ids(&["bob"])).unwrap().is_empty());
        assert_eq!(mutuals(&store, "bob", &ids(&["alice"])).unwrap(), vec!["alice"]);
    }

    #[test]
    fn test_query_from_subject_followers() {
        let store = MemoryStore::new();
        let alice = store
            .put(
                "alice",
                json!({ "followers": [{ "login": "bob" }, { "login": "carol" }] }),
            )
            .unwrap();
        store.put("bob", json!({ "followers": ["alice"] })).unwrap();

        let query = RelationshipQuery::from_followers(&alice);
        assert_eq!(query.candidates, vec!["bob", "carol"]);
        assert_eq!(query.resolve(&store).unwrap(), vec!["bob"]);
    }
}

//! Profile snapshots
//!
//! A [`ProfileSnapshot`] is the unit of caching: an identity plus the upstream
//! document exactly as it was fetched. The document stays a
//! [`serde_json::Value`] because only a handful of fields are ever inspected;
//! everything else is passed through to clients untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// URI-template suffix GitHub appends to `following_url`
const OTHER_USER_TEMPLATE: &str = "{/other_user}";

/// Cached copy of a profile's details at the moment it was fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    /// Unique, case-sensitive key assigned by the upstream source
    pub identity: String,

    /// Upstream document, verbatim
    pub details: Value,

    /// When this snapshot was written to the store
    pub fetched_at: DateTime<Utc>,
}

impl ProfileSnapshot {
    pub fn new(identity: impl Into<String>, details: Value) -> Self {
        Self {
            identity: identity.into(),
            details,
            fetched_at: Utc::now(),
        }
    }

    /// Follower identities, if the snapshot carries a follower list
    ///
    /// Accepts either a sequence of identity strings or a sequence of records
    /// with a `login` (or `identity`) field. Returns `None` when the field is
    /// missing or holds something else, such as GitHub's bare follower count.
    pub fn followers(&self) -> Option<Vec<&str>> {
        let list = self.details.get("followers")?.as_array()?;
        Some(list.iter().filter_map(entry_identity).collect())
    }

    /// Whether `identity` is listed among this profile's followers
    pub fn has_follower(&self, identity: &str) -> bool {
        self.followers()
            .map(|followers| followers.contains(&identity))
            .unwrap_or(false)
    }

    /// Follower count, from `followers_count` or a numeric `followers`
    pub fn followers_count(&self) -> Option<u64> {
        self.count_field("followers_count", "followers")
    }

    /// Following count, from `following_count` or a numeric `following`
    pub fn following_count(&self) -> Option<u64> {
        self.count_field("following_count", "following")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn repos_url(&self) -> Option<&str> {
        self.str_field("repos_url")
    }

    pub fn followers_url(&self) -> Option<&str> {
        self.str_field("followers_url")
    }

    /// Following list locator with the `{/other_user}` template removed
    pub fn following_url(&self) -> Option<String> {
        self.str_field("following_url")
            .map(|url| url.replace(OTHER_USER_TEMPLATE, ""))
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }

    fn count_field(&self, explicit: &str, fallback: &str) -> Option<u64> {
        self.details
            .get(explicit)
            .and_then(Value::as_u64)
            .or_else(|| self.details.get(fallback).and_then(Value::as_u64))
    }
}

/// Identity named by a follower list entry
fn entry_identity(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(login) => Some(login),
        Value::Object(record) => record
            .get("login")
            .or_else(|| record.get("identity"))
            .and_then(Value::as_str),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_followers_as_strings() {
        let snapshot = ProfileSnapshot::new("bob", json!({ "followers": ["alice", "dave"] }));
        assert_eq!(snapshot.followers(), Some(vec!["alice", "dave"]));
        assert!(snapshot.has_follower("alice"));
        assert!(!snapshot.has_follower("Alice"));
    }

    #[test]
    fn test_followers_as_records() {
        let snapshot = ProfileSnapshot::new(
            "bob",
            json!({ "followers": [{ "login": "alice", "id": 1 }, { "identity": "carol" }, 42] }),
        );
        assert_eq!(snapshot.followers(), Some(vec!["alice", "carol"]));
    }

    #[test]
    fn test_numeric_followers_is_not_a_list() {
        let snapshot = ProfileSnapshot::new("bob", json!({ "followers": 12, "following": 3 }));
        assert_eq!(snapshot.followers(), None);
        assert!(!snapshot.has_follower("alice"));
        assert_eq!(snapshot.followers_count(), Some(12));
        assert_eq!(snapshot.following_count(), Some(3));
    }

    #[test]
    fn test_explicit_counts_win() {
        let snapshot = ProfileSnapshot::new(
            "bob",
            json!({ "followers": ["alice"], "followers_count": 7, "following_count": 2 }),
        );
        assert_eq!(snapshot.followers_count(), Some(7));
        assert_eq!(snapshot.following_count(), Some(2));
    }

    #[test]
    fn test_locators() {
        let snapshot = ProfileSnapshot::new(
            "octocat",
            json!({
                "name": "The Octocat",
                "repos_url": "https://api.github.com/users/octocat/repos",
                "followers_url": "https://api.github.com/users/octocat/followers",
                "following_url": "https://api.github.com/users/octocat/following{/other_user}",
            }),
        );
        assert_eq!(snapshot.name(), Some("The Octocat"));
        assert_eq!(
            snapshot.repos_url(),
            Some("https://api.github.com/users/octocat/repos")
        );
        assert_eq!(
            snapshot.followers_url(),
            Some("https://api.github.com/users/octocat/followers")
        );
        assert_eq!(
            snapshot.following_url().as_deref(),
            Some("https://api.github.com/users/octocat/following")
        );
    }

    #[test]
    fn test_details_keep_key_order() {
        let details: Value = serde_json::from_str(r#"{"login":"z","bio":"b","avatar_url":"a"}"#)
            .unwrap();
        let snapshot = ProfileSnapshot::new("z", details);
        let keys: Vec<&String> = snapshot.details.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["login", "bio", "avatar_url"]);
    }
}

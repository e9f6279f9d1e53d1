//! Many-to-many associations, scoped to one engine instance.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Owner record plus relation name. Typed so `a:b` ids can never collide across parts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelationKey {
    pub collection: String,
    pub id: String,
    pub relation: String,
}

impl RelationKey {
    pub fn new(collection: &str, id: &str, relation: &str) -> Self {
        RelationKey {
            collection: collection.to_string(),
            id: id.to_string(),
            relation: relation.to_string(),
        }
    }
}

/// Related ids per key, kept in insertion order without duplicates.
#[derive(Default)]
pub struct RelationTracker {
    members: RwLock<HashMap<RelationKey, Vec<String>>>,
}

impl RelationTracker {
    pub fn new() -> Self {
        RelationTracker::default()
    }

    /// Returns false when the id was already a member.
    pub fn add(&self, key: RelationKey, related_id: &str) -> bool {
        let mut guard = self.members.write().unwrap_or_else(PoisonError::into_inner);
        let ids = guard.entry(key).or_default();
        if ids.iter().any(|id| id == related_id) {
            return false;
        }
        ids.push(related_id.to_string());
        true
    }

    /// Returns false when the id was not a member.
    pub fn remove(&self, key: &RelationKey, related_id: &str) -> bool {
        let mut guard = self.members.write().unwrap_or_else(PoisonError::into_inner);
        let Some(ids) = guard.get_mut(key) else {
            return false;
        };
        let before = ids.len();
        ids.retain(|id| id != related_id);
        let removed = ids.len() != before;
        if ids.is_empty() {
            guard.remove(key);
        }
        removed
    }

    pub fn members(&self, key: &RelationKey) -> Vec<String> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop every association owned by one record. Returns how many keys were removed.
    pub fn remove_owner(&self, collection: &str, id: &str) -> usize {
        let mut guard = self.members.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|k, _| !(k.collection == collection && k.id == id));
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_members() {
        let tracker = RelationTracker::new();
        let key = RelationKey::new("tasks", "t1", "tags");
        assert!(tracker.add(key.clone(), "b"));
        assert!(tracker.add(key.clone(), "a"));
        assert!(!tracker.add(key.clone(), "b"));
        assert_eq!(tracker.members(&key), vec!["b", "a"]);
        assert!(tracker.remove(&key, "b"));
        assert!(!tracker.remove(&key, "zzz"));
        assert_eq!(tracker.members(&key), vec!["a"]);
    }

    #[test]
    fn keys_with_separators_do_not_collide() {
        let tracker = RelationTracker::new();
        tracker.add(RelationKey::new("a:b", "c", "tags"), "x");
        assert!(tracker.members(&RelationKey::new("a", "b:c", "tags")).is_empty());
    }

    #[test]
    fn remove_owner_only_touches_that_record() {
        let tracker = RelationTracker::new();
        tracker.add(RelationKey::new("tasks", "t1", "tags"), "x");
        tracker.add(RelationKey::new("tasks", "t2", "tags"), "x");
        assert_eq!(tracker.remove_owner("tasks", "t1"), 1);
        assert_eq!(tracker.members(&RelationKey::new("tasks", "t2", "tags")), vec!["x"]);
    }
}

/// Identifier sets backing the mirrored relationship fields
///
/// Every edge in the social graph (follower/following, attendee/attending) is
/// stored as a reference on both documents. `RelationSet` is the container
/// for one side: an ordered set keyed by identifier, so that adding an
/// existing reference or removing a missing one is a no-op that the caller
/// can detect.
///
/// # Example
///
/// ```
/// use huddle_shared::models::relation_set::RelationSet;
/// use uuid::Uuid;
///
/// let mut followers = RelationSet::new();
/// let id = Uuid::new_v4();
///
/// assert!(followers.insert(id));
/// assert!(!followers.insert(id)); // already present
/// assert_eq!(followers.len(), 1);
/// ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Ordered set of entity references
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationSet(BTreeSet<Uuid>);

impl RelationSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds a reference, returning `false` if it was already present
    pub fn insert(&mut self, id: Uuid) -> bool {
        self.0.insert(id)
    }

    /// Removes a reference, returning `false` if it was not present
    pub fn remove(&mut self, id: Uuid) -> bool {
        self.0.remove(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.0.iter().copied()
    }

    /// Copies the references out in ascending order
    ///
    /// This is the shape the PostgreSQL `UUID[]` columns are written with.
    pub fn to_vec(&self) -> Vec<Uuid> {
        self.0.iter().copied().collect()
    }
}

impl From<Vec<Uuid>> for RelationSet {
    fn from(ids: Vec<Uuid>) -> Self {
        Self(ids.into_iter().collect())
    }
}

impl FromIterator<Uuid> for RelationSet {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_add_if_absent() {
        let mut set = RelationSet::new();
        let id = Uuid::new_v4();

        assert!(set.insert(id));
        assert!(!set.insert(id));
        assert_eq!(set.len(), 1);
        assert!(set.contains(id));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut set = RelationSet::new();
        assert!(!set.remove(Uuid::new_v4()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_from_vec_drops_duplicates() {
        let id = Uuid::new_v4();
        let set = RelationSet::from(vec![id, id, id]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.to_vec(), vec![id]);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let id = Uuid::nil();
        let set: RelationSet = std::iter::once(id).collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, format!("[\"{}\"]", id));
    }
}

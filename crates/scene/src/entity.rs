use std::collections::BTreeSet;

use foundation::EntityKey;

/// The addressable entities of a view (geometry features, or the data keys
/// when no geometry is attached), in first-seen order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    ordered: Vec<EntityKey>,
    members: BTreeSet<EntityKey>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys<K: Into<EntityKey>>(keys: impl IntoIterator<Item = K>) -> Self {
        let mut set = Self::new();
        for k in keys {
            set.insert(k);
        }
        set
    }

    /// Returns `true` if the key was new.
    pub fn insert(&mut self, key: impl Into<EntityKey>) -> bool {
        let key = key.into();
        if !self.members.insert(key.clone()) {
            return false;
        }
        self.ordered.push(key);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityKey> {
        self.ordered.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(EntityKey::as_str)
    }
}

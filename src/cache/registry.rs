//! Bidirectional tag index.
//!
//! Tracks tag → keys and key → tags so invalidation looks up affected entries
//! directly instead of scanning every entry.

use std::collections::{HashMap, HashSet};

use super::keys::{QueryKey, Tag, TagSet};

/// Tag index owned by the request cache state.
///
/// Not synchronized on its own; the cache mutates it under the same lock that
/// guards its entries so the two can never disagree.
#[derive(Debug, Default)]
pub struct TagRegistry {
    tag_to_keys: HashMap<Tag, HashSet<QueryKey>>,
    key_to_tags: HashMap<QueryKey, TagSet>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tags recorded for `key`.
    pub fn register(&mut self, key: &QueryKey, tags: &TagSet) {
        self.unregister(key);
        if tags.is_empty() {
            return;
        }
        for tag in tags {
            self.tag_to_keys
                .entry(*tag)
                .or_default()
                .insert(key.clone());
        }
        self.key_to_tags.insert(key.clone(), tags.clone());
    }

    /// Drop every mapping that mentions `key`.
    pub fn unregister(&mut self, key: &QueryKey) {
        if let Some(tags) = self.key_to_tags.remove(key) {
            for tag in tags {
                if let Some(keys) = self.tag_to_keys.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.tag_to_keys.remove(&tag);
                    }
                }
            }
        }
    }

    /// Keys whose tag set intersects `tags`.
    pub fn keys_for_tags(&self, tags: &TagSet) -> HashSet<QueryKey> {
        tags.iter()
            .filter_map(|tag| self.tag_to_keys.get(tag))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn tags_for_key(&self, key: &QueryKey) -> TagSet {
        self.key_to_tags.get(key).cloned().unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.tag_to_keys.clear();
        self.key_to_tags.clear();
    }

    pub fn tag_count(&self) -> usize {
        self.tag_to_keys.len()
    }

    pub fn key_count(&self) -> usize {
        self.key_to_tags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::{TagKind, collection_tags};

    fn key(name: &str) -> QueryKey {
        QueryKey::new(name)
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = TagRegistry::new();
        let list = key("list");
        registry.register(&list, &collection_tags(TagKind::Algorithm, [1, 2]));

        let hits = registry.keys_for_tags(&TagSet::from([Tag::entity(TagKind::Algorithm, 2)]));
        assert!(hits.contains(&list));
        assert_eq!(registry.tags_for_key(&list).len(), 3);
    }

    #[test]
    fn lookup_misses_unrelated_tags() {
        let mut registry = TagRegistry::new();
        registry.register(&key("cats"), &collection_tags(TagKind::Category, [1]));

        let hits = registry.keys_for_tags(&TagSet::from([Tag::list(TagKind::Algorithm)]));
        assert!(hits.is_empty());
    }

    #[test]
    fn register_replaces_previous_tags() {
        let mut registry = TagRegistry::new();
        let list = key("list");
        registry.register(&list, &collection_tags(TagKind::Algorithm, [1]));
        registry.register(&list, &collection_tags(TagKind::Algorithm, [2]));

        let stale = registry.keys_for_tags(&TagSet::from([Tag::entity(TagKind::Algorithm, 1)]));
        assert!(stale.is_empty());
        assert_eq!(registry.tag_count(), 2);
    }

    #[test]
    fn unregister_cleans_up_both_directions() {
        let mut registry = TagRegistry::new();
        let list = key("list");
        registry.register(&list, &collection_tags(TagKind::Algorithm, [1]));
        assert_eq!(registry.key_count(), 1);

        registry.unregister(&list);
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }

    #[test]
    fn shared_tag_maps_to_every_key() {
        let mut registry = TagRegistry::new();
        let first = key("page-1");
        let second = key("page-2");
        registry.register(&first, &collection_tags(TagKind::Algorithm, [1]));
        registry.register(&second, &collection_tags(TagKind::Algorithm, [7]));

        let hits = registry.keys_for_tags(&TagSet::from([Tag::list(TagKind::Algorithm)]));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn clear_removes_all_mappings() {
        let mut registry = TagRegistry::new();
        registry.register(&key("list"), &collection_tags(TagKind::Language, [4]));
        registry.clear();
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }
}

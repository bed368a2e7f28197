//! Interned tags and tag mutators
//!
//! Tags are opaque `u32` handles. Named tags are interned per scene so that
//! the same name always yields the same [`Tag`]; [`TagInterner::unique`]
//! hands out anonymous tags that only compare equal to themselves.

use std::collections::HashMap;

use log::warn;

use crate::component_set::ComponentSet;
use crate::lifecycle::LifecycleFlags;
use crate::node::{ComponentKey, Node};
use crate::scene::Scene;

/// Opaque tag identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(u32);

impl Tag {
    /// The raw identifier
    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Allocates tags and remembers the names of named ones
#[derive(Debug, Default)]
pub struct TagInterner {
    by_name: HashMap<String, Tag>,
    names: Vec<Option<String>>,
}

impl TagInterner {
    /// Create an empty interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the tag for `name`, allocating it on first use
    pub fn intern(&mut self, name: &str) -> Tag {
        if let Some(tag) = self.by_name.get(name) {
            return *tag;
        }
        let tag = self.allocate(Some(name.to_string()));
        self.by_name.insert(name.to_string(), tag);
        tag
    }

    /// Allocate an anonymous tag
    pub fn unique(&mut self) -> Tag {
        self.allocate(None)
    }

    /// Look up a named tag without allocating
    pub fn get(&self, name: &str) -> Option<Tag> {
        self.by_name.get(name).copied()
    }

    /// Name of a tag, if it was interned by name
    pub fn name(&self, tag: Tag) -> Option<&str> {
        self.names.get(tag.0 as usize)?.as_deref()
    }

    /// Number of tags allocated so far
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no tag was allocated
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn allocate(&mut self, name: Option<String>) -> Tag {
        let tag = Tag(self.names.len() as u32);
        self.names.push(name);
        tag
    }
}

impl Scene {
    /// Intern a named tag in this scene
    pub fn intern_tag(&mut self, name: &str) -> Tag {
        self.tags.intern(name)
    }

    /// Allocate an anonymous tag in this scene
    pub fn unique_tag(&mut self) -> Tag {
        self.tags.unique()
    }

    /// The scene's tag interner
    pub fn tag_interner(&self) -> &TagInterner {
        &self.tags
    }

    /// Tag a component
    ///
    /// Updates the parent's and the scene's tag registries in the same call.
    /// Returns false if the component already had the tag or cannot be tagged.
    pub fn add_tag(&mut self, key: ComponentKey, tag: Tag) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            warn!("add_tag: {:?} is not a live component", key);
            return false;
        };
        if node.flags.contains(LifecycleFlags::DESTROYED) {
            warn!("add_tag: {} is destroyed", node.type_name);
            return false;
        }
        if !node.tags.insert(tag) {
            return false;
        }

        let parent = node.parent;
        let in_scene_tree = node.scene.is_some();
        if let Some(slots) = parent
            .and_then(|p| self.nodes.get_mut(p))
            .and_then(Node::actor_mut)
        {
            slots.by_tag.entry(tag).or_default().insert(key);
        }
        if in_scene_tree {
            self.by_tag.entry(tag).or_default().insert(key);
        }
        true
    }

    /// Remove a tag from a component
    ///
    /// Returns false if the component did not carry the tag.
    pub fn remove_tag(&mut self, key: ComponentKey, tag: Tag) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            warn!("remove_tag: {:?} is not a live component", key);
            return false;
        };
        if !node.tags.remove(&tag) {
            return false;
        }

        let parent = node.parent;
        let in_scene_tree = node.scene.is_some();
        if let Some(slots) = parent
            .and_then(|p| self.nodes.get_mut(p))
            .and_then(Node::actor_mut)
        {
            if let Some(set) = slots.by_tag.get_mut(&tag) {
                set.remove(&key);
            }
        }
        if in_scene_tree {
            if let Some(set) = self.by_tag.get_mut(&tag) {
                set.remove(&key);
            }
        }
        true
    }

    /// Check if a component carries a tag
    pub fn has_tag(&self, key: ComponentKey, tag: Tag) -> bool {
        self.nodes
            .get(key)
            .map(|node| node.tags.contains(&tag))
            .unwrap_or(false)
    }

    /// All tags of a component, in the order they were added
    pub fn tags(&self, key: ComponentKey) -> Option<&ComponentSet<Tag>> {
        self.nodes.get(key).map(|node| &node.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut interner = TagInterner::new();
        let a = interner.intern("enemy");
        let b = interner.intern("friend");
        assert_ne!(a, b);
        assert_eq!(interner.intern("enemy"), a);
        assert_eq!(interner.get("friend"), Some(b));
        assert_eq!(interner.name(a), Some("enemy"));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_unique_tags_are_anonymous() {
        let mut interner = TagInterner::new();
        let a = interner.unique();
        let b = interner.unique();
        assert_ne!(a, b);
        assert_eq!(interner.name(a), None);
        assert_eq!(interner.get(""), None);
    }

    #[test]
    fn test_tagging_unattached_component() {
        let mut scene = Scene::new("tags");
        let actor = scene.spawn_actor();
        let tag = scene.intern_tag("loot");

        assert!(scene.add_tag(actor, tag));
        assert!(!scene.add_tag(actor, tag));
        assert!(scene.has_tag(actor, tag));
        // Not attached to the tree, so not visible scene-wide
        assert!(scene.components_by_tag(tag).is_empty());

        assert!(scene.remove_tag(actor, tag));
        assert!(!scene.has_tag(actor, tag));
        assert!(!scene.remove_tag(actor, tag));
    }
}

//! Actors: composite nodes with a transform and children

use std::any::TypeId;

use log::warn;

use crate::component_set::ComponentSet;
use crate::lifecycle::Lifecycle;
use crate::node::{ComponentKey, Node};
use crate::scene::Scene;
use crate::tag::Tag;

/// An actor with no behavior of its own
///
/// Used for the scene root and for grouping nodes.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainActor;

impl Lifecycle for PlainActor {}

impl Scene {
    /// Create an unattached actor driven by `script`
    ///
    /// The actor joins the hierarchy once added with [`Scene::add_component`].
    pub fn create_actor<T: Lifecycle>(&mut self, script: T) -> ComponentKey {
        self.nodes.insert(Node::actor(script))
    }

    /// Create an unattached [`PlainActor`]
    pub fn spawn_actor(&mut self) -> ComponentKey {
        self.create_actor(PlainActor)
    }

    /// Dynamic children of an actor, in insertion order
    pub fn children(&self, actor: ComponentKey) -> Option<&ComponentSet<ComponentKey>> {
        self.nodes
            .get(actor)
            .and_then(Node::actor_slots)
            .map(|slots| &slots.components)
    }

    /// Static children of an actor, in insertion order
    pub fn static_children(&self, actor: ComponentKey) -> Option<&ComponentSet<ComponentKey>> {
        self.nodes
            .get(actor)
            .and_then(Node::actor_slots)
            .map(|slots| &slots.static_components)
    }

    /// Direct children of `actor` whose concrete type is exactly `T`
    pub fn actor_components_by_type<T: Lifecycle>(
        &mut self,
        actor: ComponentKey,
    ) -> Option<&ComponentSet<ComponentKey>> {
        let slots = self.nodes.get_mut(actor).and_then(Node::actor_mut)?;
        Some(slots.by_type.entry(TypeId::of::<T>()).or_default())
    }

    /// Direct children of `actor` carrying `tag`
    pub fn actor_components_by_tag(&mut self, actor: ComponentKey, tag: Tag) -> Option<&ComponentSet<ComponentKey>> {
        let slots = self.nodes.get_mut(actor).and_then(Node::actor_mut)?;
        Some(slots.by_tag.entry(tag).or_default())
    }

    /// The first direct child of `actor` of type `T`
    pub fn get_component<T: Lifecycle>(&self, actor: ComponentKey) -> Option<ComponentKey> {
        self.nodes
            .get(actor)
            .and_then(Node::actor_slots)?
            .by_type
            .get(&TypeId::of::<T>())?
            .first()
    }

    /// Set the actor the host renders from
    pub fn set_active_camera(&mut self, camera: Option<ComponentKey>) {
        if let Some(key) = camera {
            match self.nodes.get(key) {
                Some(node) if node.is_actor() && !self.is_destroyed(key) => {}
                _ => {
                    warn!("set_active_camera: {:?} is not a live actor", key);
                    self.active_camera = None;
                    return;
                }
            }
        }
        self.active_camera = camera;
    }

    /// The actor the host renders from
    pub fn active_camera(&self) -> Option<ComponentKey> {
        self.active_camera.filter(|key| self.contains(*key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;
    impl Lifecycle for Marker {}

    #[test]
    fn test_children_in_insertion_order() {
        let mut scene = Scene::new("actors");
        let root = scene.root();
        let a = scene.spawn_actor();
        let b = scene.spawn_actor();
        scene.add_component(root, b).unwrap();
        scene.add_component(root, a).unwrap();
        assert_eq!(scene.children(root).unwrap().to_vec(), vec![b, a]);
    }

    #[test]
    fn test_components_by_type_is_direct_children_only() {
        let mut scene = Scene::new("actors");
        let root = scene.root();
        let a = scene.spawn_actor();
        let marker = scene.create_actor(Marker);
        scene.add_component(root, a).unwrap();
        scene.add_component(a, marker).unwrap();

        assert!(scene.actor_components_by_type::<Marker>(root).unwrap().is_empty());
        assert!(scene.actor_components_by_type::<Marker>(a).unwrap().contains(&marker));
        assert_eq!(scene.get_component::<Marker>(a), Some(marker));
        assert_eq!(scene.get_component::<Marker>(root), None);
    }

    #[test]
    fn test_active_camera_requires_actor() {
        let mut scene = Scene::new("camera");
        let camera = scene.spawn_actor();
        let behavior = scene.create_behavior(Marker);

        scene.set_active_camera(Some(camera));
        assert_eq!(scene.active_camera(), Some(camera));

        scene.set_active_camera(Some(behavior));
        assert_eq!(scene.active_camera(), None);
    }

    #[test]
    fn test_destroying_camera_clears_it() {
        let mut scene = Scene::new("camera");
        let camera = scene.spawn_actor();
        scene.add_component(scene.root(), camera).unwrap();
        scene.set_active_camera(Some(camera));

        scene.destroy(camera).unwrap();
        assert_eq!(scene.active_camera(), None);
    }

    #[test]
    fn test_local_tag_index() {
        let mut scene = Scene::new("tags");
        let root = scene.root();
        let a = scene.spawn_actor();
        let tag = scene.intern_tag("enemy");
        scene.add_component(root, a).unwrap();

        scene.add_tag(a, tag);
        assert!(scene.actor_components_by_tag(root, tag).unwrap().contains(&a));
        assert!(scene.components_by_tag(tag).contains(&a));

        scene.remove_tag(a, tag);
        assert!(scene.actor_components_by_tag(root, tag).unwrap().is_empty());
        assert!(scene.components_by_tag(tag).is_empty());
    }
}

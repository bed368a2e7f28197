//! SceneBuilder - Declarative scene construction
//!
//! Provides a fluent API for composing actor hierarchies and their behaviors.

use std::collections::HashMap;

use log::warn;
use marionette_core::{
    ComponentKey, Lifecycle, LifecycleError, PhysicsBackend, PlainActor, Scene, Vec3,
};

use super::behaviors::CameraRig;

/// Builder for composing scenes
///
/// Actors are referred to by name while building. Referring to an unknown
/// name is logged and skipped.
///
/// # Example
/// ```ignore
/// let scene = SceneBuilder::new("demo")
///     .add_camera("camera", Vec3::new(0.0, 2.0, 8.0))
///     .add_actor("turntable", Vec3::ZERO)
///     .with_behavior("turntable", Spinner { speed: 1.0 })
///     .add_child("turntable", "satellite", Vec3::new(3.0, 0.0, 0.0))
///     .with_tag("satellite", "orbiting")
///     .build()?;
/// ```
pub struct SceneBuilder {
    scene: Scene,
    actors: HashMap<String, ComponentKey>,
    error: Option<LifecycleError>,
}

impl SceneBuilder {
    /// Create a builder for an empty scene
    pub fn new(name: &str) -> Self {
        Self {
            scene: Scene::new(name),
            actors: HashMap::new(),
            error: None,
        }
    }

    /// Attach a physics backend to the scene
    pub fn with_physics(mut self, physics: impl PhysicsBackend + 'static) -> Self {
        self.scene = self.scene.with_physics(physics);
        self
    }

    /// Add a plain actor under the root
    pub fn add_actor(mut self, name: &str, position: Vec3) -> Self {
        let root = self.scene.root();
        self.place(root, name, position, PlainActor);
        self
    }

    /// Add a plain actor under a named actor
    pub fn add_child(mut self, parent: &str, name: &str, position: Vec3) -> Self {
        if let Some(parent) = self.lookup(parent, "add_child") {
            self.place(parent, name, position, PlainActor);
        }
        self
    }

    /// Add a camera actor under the root and make it the active camera
    pub fn add_camera(mut self, name: &str, position: Vec3) -> Self {
        let root = self.scene.root();
        if let Some(camera) = self.place(root, name, position, CameraRig::default()) {
            self.scene.set_active_camera(Some(camera));
        }
        self
    }

    /// Attach a behavior to a named actor
    pub fn with_behavior<T: Lifecycle>(mut self, actor: &str, script: T) -> Self {
        if let Some(actor) = self.lookup(actor, "with_behavior") {
            let result = self.scene.attach(actor, script);
            self.record(result.map(|_| ()));
        }
        self
    }

    /// Tag a named actor
    pub fn with_tag(mut self, actor: &str, tag: &str) -> Self {
        if let Some(actor) = self.lookup(actor, "with_tag") {
            let tag = self.scene.intern_tag(tag);
            self.scene.add_tag(actor, tag);
        }
        self
    }

    /// Mark a named actor static: it keeps its lifecycle but skips per-frame updates
    pub fn make_static(mut self, actor: &str) -> Self {
        if let Some(actor) = self.lookup(actor, "make_static") {
            self.scene.set_static(actor, true);
        }
        self
    }

    /// Key of an actor added to this builder
    pub fn actor(&self, name: &str) -> Option<ComponentKey> {
        self.actors.get(name).copied()
    }

    /// Build the scene
    ///
    /// Returns the first hook failure raised while composing, if any.
    pub fn build(self) -> Result<Scene, LifecycleError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.scene),
        }
    }

    fn place<T: Lifecycle>(
        &mut self,
        parent: ComponentKey,
        name: &str,
        position: Vec3,
        script: T,
    ) -> Option<ComponentKey> {
        if self.actors.contains_key(name) {
            warn!("SceneBuilder: actor '{}' already exists", name);
            return None;
        }
        let actor = self.scene.create_actor(script);
        self.scene.set_component_name(actor, name);
        self.scene.set_position(actor, position);
        let result = self.scene.add_component(parent, actor);
        self.record(result);
        self.actors.insert(name.to_string(), actor);
        Some(actor)
    }

    fn lookup(&self, name: &str, op: &str) -> Option<ComponentKey> {
        let key = self.actor(name);
        if key.is_none() {
            warn!("SceneBuilder::{}: no actor named '{}'", op, name);
        }
        key
    }

    fn record(&mut self, result: Result<(), LifecycleError>) {
        if let Err(err) = result {
            self.error.get_or_insert(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::behaviors::{Lifetime, Spinner};
    use marionette_core::SceneManager;

    #[test]
    fn test_builder_hierarchy() {
        let builder = SceneBuilder::new("test")
            .add_actor("parent", Vec3::new(1.0, 0.0, 0.0))
            .add_child("parent", "child", Vec3::new(0.0, 2.0, 0.0));
        let parent = builder.actor("parent").unwrap();
        let child = builder.actor("child").unwrap();

        let mut scene = builder.build().unwrap();
        assert_eq!(scene.name(), "test");
        assert_eq!(scene.parent(parent), Some(scene.root()));
        assert_eq!(scene.parent(child), Some(parent));
        assert_eq!(scene.component_name(child), Some("child"));

        let world = scene.world_position(child).unwrap();
        assert!((world.x - 1.0).abs() < 1e-6);
        assert!((world.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_builder_camera_tags_and_static() {
        let builder = SceneBuilder::new("test")
            .add_camera("camera", Vec3::new(0.0, 0.0, 5.0))
            .add_actor("floor", Vec3::ZERO)
            .with_tag("floor", "ground")
            .make_static("floor");
        let camera = builder.actor("camera").unwrap();
        let floor = builder.actor("floor").unwrap();

        let mut scene = builder.build().unwrap();
        assert_eq!(scene.active_camera(), Some(camera));
        assert!(scene.is_static(floor));
        let ground = scene.intern_tag("ground");
        assert!(scene.has_tag(floor, ground));
        assert_eq!(scene.components_by_tag(ground).to_vec(), vec![floor]);
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let builder = SceneBuilder::new("test")
            .add_actor("a", Vec3::ZERO)
            .add_actor("a", Vec3::ONE)
            .add_child("missing", "b", Vec3::ZERO)
            .with_behavior("missing", Spinner { speed: 1.0 });
        assert!(builder.actor("b").is_none());

        let scene = builder.build().unwrap();
        // Root plus "a"
        assert_eq!(scene.component_count(), 2);
    }

    #[test]
    fn test_built_scene_runs() {
        let builder = SceneBuilder::new("running")
            .add_actor("spinner", Vec3::ZERO)
            .with_behavior("spinner", Spinner { speed: 1.0 })
            .add_actor("debris", Vec3::ZERO)
            .with_behavior("debris", Lifetime { remaining: 0.25 });
        let spinner = builder.actor("spinner").unwrap();
        let debris = builder.actor("debris").unwrap();

        let mut manager = SceneManager::new();
        pollster::block_on(manager.load_scene(builder.build().unwrap(), async { Ok(()) })).unwrap();

        for frame in 1..=3 {
            manager.update(0.1, frame as f32 * 0.1).unwrap();
        }

        let scene = manager.active_scene().unwrap();
        let rotation = scene.rotation(spinner).unwrap();
        assert!(rotation.y.abs() > 0.0, "Spinner should have rotated its owner");
        assert!(scene.is_destroyed(debris));
        assert!(!scene.contains(debris));
    }
}

//! Scene: the arena that owns every component
//!
//! A scene owns exactly one root actor and every node created through it. The
//! scene-wide type and tag registries mirror the subtree under the root and
//! are kept current by the structural mutators, never by scanning.

use std::any::TypeId;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use log::{debug, warn};
use slotmap::SlotMap;

use crate::actor::PlainActor;
use crate::collaborators::{PhysicsBackend, RenderSurface};
use crate::component_set::ComponentSet;
use crate::error::{CollaboratorError, LifecycleError, SceneError};
use crate::lifecycle::{Lifecycle, LifecycleFlags};
use crate::node::{ComponentKey, ComponentKind, Node};
use crate::tag::{Tag, TagInterner};

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a scene
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneId(u64);

impl SceneId {
    fn next() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw identifier
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

bitflags! {
    /// Scene-level lifecycle state
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SceneFlags: u8 {
        /// Assets and physics finished loading
        const LOADED = 1 << 0;
        /// The root has been created
        const CREATED = 1 << 1;
        /// The root has started
        const STARTED = 1 << 2;
        /// Terminal state
        const DESTROYED = 1 << 3;
    }
}

/// Which children a traversal visits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Traversal {
    /// Dynamic then static children
    All,
    /// Dynamic children only (per-frame phases)
    Dynamic,
}

/// The hierarchy of live components
///
/// # Example
/// ```ignore
/// let mut scene = Scene::new("level");
/// let player = scene.create_actor(Player::default());
/// scene.add_component(scene.root(), player)?;
///
/// pollster::block_on(scene.load(async { Ok(()) }))?;
/// scene.create()?;
///
/// // Host loop
/// scene.before_physics_update(dt, elapsed)?;
/// scene.update(dt, elapsed)?;
/// ```
pub struct Scene {
    pub(crate) id: SceneId,
    pub(crate) name: String,
    pub(crate) nodes: SlotMap<ComponentKey, Node>,
    pub(crate) root: ComponentKey,
    pub(crate) flags: SceneFlags,
    pub(crate) active_camera: Option<ComponentKey>,
    pub(crate) physics: Option<Box<dyn PhysicsBackend>>,
    pub(crate) surface: Option<Rc<dyn RenderSurface>>,
    pub(crate) by_type: HashMap<TypeId, ComponentSet<ComponentKey>>,
    pub(crate) by_tag: HashMap<Tag, ComponentSet<ComponentKey>>,
    pub(crate) tags: TagInterner,
}

impl Scene {
    /// Create an empty scene holding only its root actor
    pub fn new(name: impl Into<String>) -> Self {
        let id = SceneId::next();
        let mut nodes = SlotMap::with_key();
        let mut root_node = Node::actor(PlainActor);
        root_node.name = Some("root".to_string());
        let root = nodes.insert(root_node);

        let mut scene = Self {
            id,
            name: name.into(),
            nodes,
            root,
            flags: SceneFlags::empty(),
            active_camera: None,
            physics: None,
            surface: None,
            by_type: HashMap::new(),
            by_tag: HashMap::new(),
            tags: TagInterner::new(),
        };
        scene.index_subtree(root, id);
        scene
    }

    /// Attach a physics backend
    pub fn with_physics(mut self, physics: impl PhysicsBackend + 'static) -> Self {
        self.physics = Some(Box::new(physics));
        self
    }

    /// Attach a render surface
    pub fn with_surface(mut self, surface: Rc<dyn RenderSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    #[inline]
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Scene name, used in log messages and errors
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root actor
    #[inline]
    pub fn root(&self) -> ComponentKey {
        self.root
    }

    /// Scene-level lifecycle state
    #[inline]
    pub fn scene_flags(&self) -> SceneFlags {
        self.flags
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.flags.contains(SceneFlags::LOADED)
    }

    /// Number of live components, the root included
    pub fn component_count(&self) -> usize {
        self.nodes.len()
    }

    // --- Collaborators ---

    /// Replace the physics backend
    pub fn set_physics(&mut self, physics: Option<Box<dyn PhysicsBackend>>) {
        self.physics = physics;
    }

    /// Check if a physics backend is attached (and not currently running)
    pub fn has_physics(&self) -> bool {
        self.physics.is_some()
    }

    /// Replace the render surface
    pub fn set_surface(&mut self, surface: Option<Rc<dyn RenderSurface>>) {
        self.surface = surface;
    }

    pub fn surface(&self) -> Option<&Rc<dyn RenderSurface>> {
        self.surface.as_ref()
    }

    /// Current output size, `(0, 0)` without a surface
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface.as_ref().map(|s| s.size()).unwrap_or((0, 0))
    }

    // --- Scene lifecycle ---

    /// Load the scene
    ///
    /// Awaits the asset-loading future, then the physics backend's `on_load`.
    /// The scene counts as loaded only once both have completed.
    pub async fn load<F>(&mut self, assets: F) -> Result<(), SceneError>
    where
        F: Future<Output = Result<(), CollaboratorError>>,
    {
        if self.flags.contains(SceneFlags::DESTROYED) {
            return Err(SceneError::Destroyed(self.name.clone()));
        }
        if self.flags.contains(SceneFlags::LOADED) {
            warn!("Scene '{}' is already loaded", self.name);
            return Ok(());
        }

        debug!("Loading scene '{}'", self.name);
        assets.await.map_err(|source| SceneError::Assets {
            scene: self.name.clone(),
            source,
        })?;

        if let Some(mut physics) = self.physics.take() {
            let result = physics.on_load(self).await;
            if self.physics.is_none() {
                self.physics = Some(physics);
            }
            result.map_err(|source| SceneError::Physics {
                scene: self.name.clone(),
                source,
            })?;
        }

        self.flags.insert(SceneFlags::LOADED);
        debug!("Scene '{}' loaded", self.name);
        Ok(())
    }

    /// Create the root, then enter the scene and enable it
    ///
    /// Refused (with a warning) until the scene has loaded.
    pub fn create(&mut self) -> Result<(), SceneError> {
        if self.flags.contains(SceneFlags::DESTROYED) {
            return Err(SceneError::Destroyed(self.name.clone()));
        }
        if !self.flags.contains(SceneFlags::LOADED) {
            warn!("Scene '{}' cannot be created before it has loaded", self.name);
            return Ok(());
        }
        if self.flags.contains(SceneFlags::CREATED) {
            return Ok(());
        }

        debug!("Creating scene '{}'", self.name);
        self.flags.insert(SceneFlags::CREATED);
        let root = self.root;
        self.on_create(root)?;
        self.on_enter_scene(root)?;
        self.on_enable(root)?;
        Ok(())
    }

    /// Start the root and every enabled component in the scene
    pub fn start(&mut self) -> Result<(), SceneError> {
        if !self.flags.contains(SceneFlags::CREATED) || self.flags.contains(SceneFlags::DESTROYED) {
            warn!("Scene '{}' must be created before it starts", self.name);
            return Ok(());
        }
        if self.flags.contains(SceneFlags::STARTED) {
            return Ok(());
        }
        self.flags.insert(SceneFlags::STARTED);
        self.on_start(self.root)?;
        Ok(())
    }

    /// First per-frame phase
    ///
    /// Physics `on_before_physics_update`, then the hierarchy's before-physics
    /// phase, then the physics step.
    pub fn before_physics_update(&mut self, delta: f32, elapsed: f32) -> Result<(), SceneError> {
        if !self.is_running() {
            return Ok(());
        }
        if !self.flags.contains(SceneFlags::STARTED) {
            self.start()?;
        }

        self.run_physics(|physics, scene| physics.on_before_physics_update(scene, delta, elapsed))?;
        self.on_before_physics_update(self.root, delta, elapsed)?;
        self.run_physics(|physics, scene| physics.on_update(scene, delta, elapsed))?;
        Ok(())
    }

    /// Second per-frame phase: pre-update, update and post-update passes
    pub fn update(&mut self, delta: f32, elapsed: f32) -> Result<(), SceneError> {
        if !self.is_running() {
            return Ok(());
        }
        if !self.flags.contains(SceneFlags::STARTED) {
            self.start()?;
        }

        let root = self.root;
        self.on_pre_update(root, delta, elapsed)?;
        self.on_update(root, delta, elapsed)?;
        self.on_post_update(root, delta, elapsed)?;
        Ok(())
    }

    /// Propagate a new output size through the hierarchy
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SceneError> {
        if !self.is_running() {
            return Ok(());
        }
        self.on_resize(self.root, width, height)?;
        Ok(())
    }

    /// Destroy every component and release the collaborators
    pub fn dispose(&mut self) -> Result<(), SceneError> {
        if self.flags.contains(SceneFlags::DESTROYED) {
            return Ok(());
        }
        debug!("Disposing scene '{}'", self.name);

        self.destroy(self.root)?;
        // Components created but never attached under the root
        let detached: Vec<ComponentKey> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(key, _)| key)
            .collect();
        for key in detached {
            self.destroy(key)?;
        }

        self.flags.insert(SceneFlags::DESTROYED);
        self.physics = None;
        self.active_camera = None;
        self.by_type.clear();
        self.by_tag.clear();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.flags.contains(SceneFlags::CREATED) && !self.flags.contains(SceneFlags::DESTROYED)
    }

    /// Call the physics backend with the backend taken out of the scene
    fn run_physics(
        &mut self,
        call: impl FnOnce(&mut dyn PhysicsBackend, &mut Scene) -> Result<(), CollaboratorError>,
    ) -> Result<(), SceneError> {
        let Some(mut physics) = self.physics.take() else {
            return Ok(());
        };
        let result = call(physics.as_mut(), self);
        if self.physics.is_none() {
            self.physics = Some(physics);
        }
        result.map_err(|source| SceneError::Physics {
            scene: self.name.clone(),
            source,
        })
    }

    // --- Structure ---

    /// Add `child` under the actor `parent`
    ///
    /// The child is moved out of its previous parent first. Afterwards it
    /// catches up with the parent: created if the parent is created, entered
    /// into the scene, enabled and started likewise. Adding a behavior as a
    /// parent, the root as a child, or an ancestor under its descendant is
    /// logged and ignored.
    pub fn add_component(&mut self, parent: ComponentKey, child: ComponentKey) -> Result<(), LifecycleError> {
        let (Some(parent_node), Some(child_node)) = (self.nodes.get(parent), self.nodes.get(child)) else {
            warn!("add_component: stale component key");
            return Ok(());
        };
        if parent_node.flags.contains(LifecycleFlags::DESTROYED) {
            warn!("add_component: parent {} is destroyed", parent_node.label());
            return Ok(());
        }
        if child_node.flags.contains(LifecycleFlags::DESTROYED) {
            warn!("add_component: {} is destroyed", child_node.label());
            return Ok(());
        }
        if !parent_node.is_actor() {
            warn!("add_component: behavior {} cannot have children", parent_node.label());
            return Ok(());
        }
        if child == self.root {
            warn!("add_component: the root of scene '{}' cannot be reparented", self.name);
            return Ok(());
        }
        if child_node.parent == Some(parent) {
            return Ok(());
        }
        if child == parent || self.is_ancestor(child, parent) {
            warn!(
                "add_component: {} is an ancestor of {}",
                child_node.label(),
                parent_node.label()
            );
            return Ok(());
        }

        if let Some(old_parent) = child_node.parent {
            self.remove_component(old_parent, child)?;
        }
        // Hooks run by the removal may have changed the picture
        let still_valid = match (self.nodes.get(parent), self.nodes.get(child)) {
            (Some(p), Some(c)) => {
                !p.flags.contains(LifecycleFlags::DESTROYED)
                    && !c.flags.contains(LifecycleFlags::DESTROYED)
                    && c.parent.is_none()
            }
            _ => false,
        };
        if !still_valid {
            return Ok(());
        }

        self.link(parent, child);
        self.mark_transform_dirty(child);

        let steps = [
            LifecycleFlags::CREATED,
            LifecycleFlags::IN_SCENE,
            LifecycleFlags::ENABLED,
            LifecycleFlags::STARTED,
        ];
        for step in steps {
            if self.parent(child) != Some(parent) {
                break;
            }
            let parent_flags = self.lifecycle(parent).unwrap_or_default();
            if !parent_flags.contains(step) {
                continue;
            }
            match step {
                LifecycleFlags::CREATED => self.on_create(child)?,
                LifecycleFlags::IN_SCENE => self.on_enter_scene(child)?,
                LifecycleFlags::ENABLED => self.on_enable(child)?,
                _ => self.on_start(child)?,
            }
        }
        Ok(())
    }

    /// Remove `child` from `parent`
    ///
    /// The child is disabled and leaves the scene, then is detached. It stays
    /// created and keeps its requested enabled state, so it can be added again
    /// elsewhere.
    pub fn remove_component(&mut self, parent: ComponentKey, child: ComponentKey) -> Result<(), LifecycleError> {
        if self.parent(child) != Some(parent) {
            warn!("remove_component: {:?} is not a child of {:?}", child, parent);
            return Ok(());
        }

        self.on_disable(child)?;
        self.on_leave_scene(child)?;
        if self.parent(child) == Some(parent) {
            self.unlink(parent, child);
            self.mark_transform_dirty(child);
        }
        Ok(())
    }

    /// Move a component between its parent's dynamic and static child sets
    ///
    /// Static components keep their structural lifecycle but are skipped by
    /// the per-frame phases. Toggling does not enable or disable anything.
    pub fn set_static(&mut self, key: ComponentKey, is_static: bool) {
        let Some(node) = self.nodes.get_mut(key) else {
            warn!("set_static: {:?} is not a live component", key);
            return;
        };
        if node.flags.contains(LifecycleFlags::DESTROYED) {
            warn!("set_static: {} is destroyed", node.label());
            return;
        }
        if node.flags.contains(LifecycleFlags::STATIC) == is_static {
            return;
        }
        node.flags.set(LifecycleFlags::STATIC, is_static);

        let Some(parent) = node.parent else {
            return;
        };
        if let Some(slots) = self.nodes.get_mut(parent).and_then(Node::actor_mut) {
            if is_static {
                slots.components.remove(&key);
                slots.static_components.insert(key);
            } else {
                slots.static_components.remove(&key);
                slots.components.insert(key);
            }
        }
    }

    /// Insert `child` into `parent`'s child set and registries, and mirror the
    /// subtree into the scene registries when the parent is in the scene tree
    pub(crate) fn link(&mut self, parent: ComponentKey, child: ComponentKey) {
        let Some(node) = self.nodes.get_mut(child) else {
            return;
        };
        node.parent = Some(parent);
        let is_static = node.flags.contains(LifecycleFlags::STATIC);
        let type_id = node.type_id;
        let tags = node.tags.to_vec();

        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return;
        };
        let scene = parent_node.scene;
        if let Some(slots) = parent_node.actor_mut() {
            if is_static {
                slots.static_components.insert(child);
            } else {
                slots.components.insert(child);
            }
            slots.by_type.entry(type_id).or_default().insert(child);
            for tag in tags {
                slots.by_tag.entry(tag).or_default().insert(child);
            }
        }
        if let Some(id) = scene {
            self.index_subtree(child, id);
        }
    }

    /// Inverse of [`Scene::link`]
    pub(crate) fn unlink(&mut self, parent: ComponentKey, child: ComponentKey) {
        let Some(node) = self.nodes.get_mut(child) else {
            return;
        };
        if node.parent != Some(parent) {
            return;
        }
        node.parent = None;
        let type_id = node.type_id;
        let tags = node.tags.to_vec();
        let in_scene_tree = node.scene.is_some();

        if let Some(slots) = self.nodes.get_mut(parent).and_then(Node::actor_mut) {
            slots.components.remove(&child);
            slots.static_components.remove(&child);
            if let Some(set) = slots.by_type.get_mut(&type_id) {
                set.remove(&child);
            }
            for tag in tags {
                if let Some(set) = slots.by_tag.get_mut(&tag) {
                    set.remove(&child);
                }
            }
        }
        if in_scene_tree {
            self.unindex_subtree(child);
        }
    }

    pub(crate) fn index_subtree(&mut self, key: ComponentKey, id: SceneId) {
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            node.scene = Some(id);
            self.by_type.entry(node.type_id).or_default().insert(current);
            for tag in node.tags.iter() {
                self.by_tag.entry(tag).or_default().insert(current);
            }
            if let Some(slots) = node.actor_slots() {
                stack.extend(slots.all_children().into_iter().rev());
            }
        }
    }

    pub(crate) fn unindex_subtree(&mut self, key: ComponentKey) {
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            node.scene = None;
            if let Some(set) = self.by_type.get_mut(&node.type_id) {
                set.remove(&current);
            }
            for tag in node.tags.iter() {
                if let Some(set) = self.by_tag.get_mut(&tag) {
                    set.remove(&current);
                }
            }
            if let Some(slots) = node.actor_slots() {
                stack.extend(slots.all_children());
            }
        }
    }

    /// Check if `ancestor` is a strict ancestor of `key`
    pub fn is_ancestor(&self, ancestor: ComponentKey, key: ComponentKey) -> bool {
        let mut current = self.parent(key);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    // --- Queries ---

    /// Check if the key refers to a component that has not been reaped
    pub fn contains(&self, key: ComponentKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Lifecycle flags of a component
    pub fn lifecycle(&self, key: ComponentKey) -> Option<LifecycleFlags> {
        self.nodes.get(key).map(|node| node.flags)
    }

    fn has_flag(&self, key: ComponentKey, flag: LifecycleFlags) -> bool {
        self.lifecycle(key).is_some_and(|flags| flags.contains(flag))
    }

    pub fn is_created(&self, key: ComponentKey) -> bool {
        self.has_flag(key, LifecycleFlags::CREATED)
    }

    pub fn is_started(&self, key: ComponentKey) -> bool {
        self.has_flag(key, LifecycleFlags::STARTED)
    }

    /// Effective enabled state, cascaded from the ancestors
    pub fn is_enabled(&self, key: ComponentKey) -> bool {
        self.has_flag(key, LifecycleFlags::ENABLED)
    }

    /// Enabled state requested through [`Scene::enable`] / [`Scene::disable`]
    pub fn is_user_enabled(&self, key: ComponentKey) -> bool {
        self.has_flag(key, LifecycleFlags::USER_ENABLED)
    }

    pub fn is_in_scene(&self, key: ComponentKey) -> bool {
        self.has_flag(key, LifecycleFlags::IN_SCENE)
    }

    pub fn is_static(&self, key: ComponentKey) -> bool {
        self.has_flag(key, LifecycleFlags::STATIC)
    }

    /// Destroyed components, reaped or not
    pub fn is_destroyed(&self, key: ComponentKey) -> bool {
        self.lifecycle(key)
            .map_or(true, |flags| flags.contains(LifecycleFlags::DESTROYED))
    }

    /// Parent actor of an attached component
    pub fn parent(&self, key: ComponentKey) -> Option<ComponentKey> {
        self.nodes.get(key).and_then(|node| node.parent)
    }

    /// Scene whose tree the component belongs to
    pub fn scene_of(&self, key: ComponentKey) -> Option<SceneId> {
        self.nodes.get(key).and_then(|node| node.scene)
    }

    pub fn kind(&self, key: ComponentKey) -> Option<ComponentKind> {
        self.nodes.get(key).map(Node::kind)
    }

    /// Concrete type name of a component's lifecycle object
    pub fn type_name(&self, key: ComponentKey) -> Option<&'static str> {
        self.nodes.get(key).map(|node| node.type_name)
    }

    /// Debug name of a component
    pub fn component_name(&self, key: ComponentKey) -> Option<&str> {
        self.nodes.get(key).and_then(|node| node.name.as_deref())
    }

    /// Set the debug name of a component
    pub fn set_component_name(&mut self, key: ComponentKey, name: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.name = Some(name.into());
        }
    }

    /// First component in the scene tree with this debug name
    pub fn find_by_name(&self, name: &str) -> Option<ComponentKey> {
        self.by_type
            .values()
            .flat_map(|set| set.iter())
            .find(|key| self.component_name(*key) == Some(name))
    }

    /// All components of concrete type `T` in the scene tree
    ///
    /// Matches exactly `T`, never other types implementing the same traits.
    pub fn components_by_type<T: Lifecycle>(&mut self) -> &ComponentSet<ComponentKey> {
        self.by_type.entry(TypeId::of::<T>()).or_default()
    }

    /// All components in the scene tree carrying `tag`
    pub fn components_by_tag(&mut self, tag: Tag) -> &ComponentSet<ComponentKey> {
        self.by_tag.entry(tag).or_default()
    }

    /// Downcast a component's lifecycle object
    ///
    /// Returns None while one of the component's own hooks is running.
    pub fn script<T: Lifecycle>(&self, key: ComponentKey) -> Option<&T> {
        let script: &dyn Lifecycle = self.nodes.get(key)?.script.as_deref()?;
        script.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast a component's lifecycle object
    pub fn script_mut<T: Lifecycle>(&mut self, key: ComponentKey) -> Option<&mut T> {
        let script: &mut dyn Lifecycle = self.nodes.get_mut(key)?.script.as_deref_mut()?;
        script.as_any_mut().downcast_mut::<T>()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("components", &self.nodes.len())
            .field("physics", &self.physics.is_some())
            .finish()
    }
}

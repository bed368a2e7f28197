//! Lifecycle cascades
//!
//! Each operation checks its guard on the node, updates the flags, runs the
//! node's hook and then recurses into a snapshot of the children. A child is
//! only visited if it is still attached to the same parent (and, for the
//! per-frame phases, still dynamic) when the traversal reaches it.
//!
//! Hooks run with the node's script checked out of the arena. A hook call that
//! reaches a node whose script is already checked out is queued on the node
//! and runs as soon as the running hook returns. The cascade's descent into the
//! children is queued behind it, so a node still runs its hook before its
//! children do. A queued descent only proceeds if the node's state still
//! matches the cascade when it is reached.

use log::{trace, warn};

use crate::error::LifecycleError;
use crate::lifecycle::{guarded, Deferred, HookCall, HookContext, Lifecycle, LifecycleFlags};
use crate::node::{ComponentKey, Node};
use crate::scene::{Scene, SceneFlags, Traversal};

type CascadeResult = Result<(), LifecycleError>;

impl Scene {
    /// Run a hook on a node, or queue it if the node is already inside a hook
    pub(crate) fn invoke(&mut self, key: ComponentKey, call: HookCall) -> CascadeResult {
        let Some(node) = self.nodes.get_mut(key) else {
            return Ok(());
        };
        let Some(mut script) = node.script.take() else {
            node.deferred.push_back(Deferred::Hook(call));
            return Ok(());
        };
        let type_name = node.type_name;

        let mut result = self.dispatch(key, type_name, script.as_mut(), call);
        while result.is_ok() {
            let Some(next) = self.nodes.get_mut(key).and_then(|node| node.deferred.pop_front()) else {
                break;
            };
            result = match next {
                Deferred::Hook(call) => self.dispatch(key, type_name, script.as_mut(), call),
                Deferred::Descend(call) => self.descend_now(key, call),
            };
        }

        let reap = match self.nodes.get_mut(key) {
            Some(node) => {
                if result.is_err() {
                    node.deferred.clear();
                }
                if !node.reap {
                    node.script = Some(script);
                }
                node.reap
            }
            None => false,
        };
        if reap {
            self.nodes.remove(key);
        }
        result
    }

    fn dispatch(
        &mut self,
        key: ComponentKey,
        type_name: &'static str,
        script: &mut dyn Lifecycle,
        call: HookCall,
    ) -> CascadeResult {
        trace!("{}::{}", type_name, call.hook());
        let mut cx = HookContext::new(self, key);
        guarded(type_name, call.hook(), || call.apply(script, &mut cx))
    }

    /// Children of `parent` visited by a traversal, as a snapshot
    fn child_snapshot(&self, parent: ComponentKey, traversal: Traversal) -> Vec<ComponentKey> {
        let Some(slots) = self.nodes.get(parent).and_then(Node::actor_slots) else {
            return Vec::new();
        };
        match traversal {
            Traversal::All => slots.all_children(),
            Traversal::Dynamic => slots.components.to_vec(),
        }
    }

    fn still_child(&self, parent: ComponentKey, child: ComponentKey, traversal: Traversal) -> bool {
        match self.nodes.get(child) {
            Some(node) if node.parent == Some(parent) => {
                traversal == Traversal::All || !node.flags.contains(LifecycleFlags::STATIC)
            }
            _ => false,
        }
    }

    fn for_each_child(
        &mut self,
        parent: ComponentKey,
        traversal: Traversal,
        mut visit: impl FnMut(&mut Scene, ComponentKey) -> CascadeResult,
    ) -> CascadeResult {
        for child in self.child_snapshot(parent, traversal) {
            if self.still_child(parent, child, traversal) {
                visit(self, child)?;
            }
        }
        Ok(())
    }

    /// Continue a cascade into the children of `key`
    ///
    /// Queued behind the node's pending hooks while its script is checked out.
    fn descend(&mut self, key: ComponentKey, call: HookCall) -> CascadeResult {
        let Some(node) = self.nodes.get_mut(key) else {
            return Ok(());
        };
        if node.script.is_none() {
            node.deferred.push_back(Deferred::Descend(call));
            return Ok(());
        }
        self.descend_now(key, call)
    }

    fn descend_now(&mut self, key: ComponentKey, call: HookCall) -> CascadeResult {
        let flags = self.flags_of(key);
        let live = !flags.contains(LifecycleFlags::DESTROYED);
        let (traversal, holds) = match call {
            HookCall::Create => (Traversal::All, live),
            HookCall::EnterScene => (Traversal::All, live && flags.contains(LifecycleFlags::IN_SCENE)),
            HookCall::LeaveScene => (Traversal::All, !flags.contains(LifecycleFlags::IN_SCENE)),
            HookCall::Enable => (Traversal::All, live && flags.contains(LifecycleFlags::ENABLED)),
            HookCall::Disable => (Traversal::All, !flags.contains(LifecycleFlags::ENABLED)),
            HookCall::Start => (Traversal::All, live),
            HookCall::Resize { .. } => (Traversal::All, live),
            HookCall::BeforePhysicsUpdate { .. }
            | HookCall::PreUpdate { .. }
            | HookCall::Update { .. }
            | HookCall::PostUpdate { .. } => (Traversal::Dynamic, self.is_active(key)),
            HookCall::TransformUpdate | HookCall::Destroy => return Ok(()),
        };
        if !holds {
            return Ok(());
        }
        self.for_each_child(key, traversal, |scene, child| scene.cascade_into(child, call))
    }

    fn cascade_into(&mut self, child: ComponentKey, call: HookCall) -> CascadeResult {
        match call {
            HookCall::Create => self.on_create(child),
            HookCall::EnterScene => self.on_enter_scene(child),
            HookCall::LeaveScene => self.on_leave_scene(child),
            HookCall::Enable => self.on_enable(child),
            HookCall::Disable => self.on_disable(child),
            HookCall::Start => self.on_start(child),
            HookCall::Resize { width, height } => self.on_resize(child, width, height),
            HookCall::BeforePhysicsUpdate { delta, elapsed } => {
                self.on_before_physics_update(child, delta, elapsed)
            }
            HookCall::PreUpdate { delta, elapsed } => self.on_pre_update(child, delta, elapsed),
            HookCall::Update { delta, elapsed } => self.on_update(child, delta, elapsed),
            HookCall::PostUpdate { delta, elapsed } => self.on_post_update(child, delta, elapsed),
            HookCall::TransformUpdate | HookCall::Destroy => Ok(()),
        }
    }

    fn flags_of(&self, key: ComponentKey) -> LifecycleFlags {
        self.nodes.get(key).map(|node| node.flags).unwrap_or_default()
    }

    fn set_flag(&mut self, key: ComponentKey, flag: LifecycleFlags, value: bool) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.flags.set(flag, value);
        }
    }

    /// Live, not destroyed; warns with `op` otherwise
    fn check_live(&self, key: ComponentKey, op: &str) -> bool {
        match self.nodes.get(key) {
            None => {
                warn!("{}: {:?} is not a live component", op, key);
                false
            }
            Some(node) if node.flags.contains(LifecycleFlags::DESTROYED) => {
                warn!("{}: {} is destroyed", op, node.label());
                false
            }
            Some(_) => true,
        }
    }

    fn is_active(&self, key: ComponentKey) -> bool {
        let flags = self.flags_of(key);
        flags.contains(LifecycleFlags::ENABLED | LifecycleFlags::IN_SCENE)
            && !flags.contains(LifecycleFlags::DESTROYED)
    }

    /// Create a component and its subtree
    ///
    /// Runs `on_create`, then `on_resize` with the current surface size, then
    /// recurses into every child. A no-op if already created.
    pub fn on_create(&mut self, key: ComponentKey) -> CascadeResult {
        if !self.check_live(key, "on_create") {
            return Ok(());
        }
        if self.flags_of(key).contains(LifecycleFlags::CREATED) {
            return Ok(());
        }

        self.set_flag(key, LifecycleFlags::CREATED, true);
        self.invoke(key, HookCall::Create)?;
        if !self.is_destroyed(key) {
            let (width, height) = self.surface_size();
            self.invoke(key, HookCall::Resize { width, height })?;
        }
        self.descend(key, HookCall::Create)
    }

    /// Enter the scene, top-down. Requires a created component not yet in the scene.
    pub fn on_enter_scene(&mut self, key: ComponentKey) -> CascadeResult {
        if !self.check_live(key, "on_enter_scene") {
            return Ok(());
        }
        let flags = self.flags_of(key);
        if !flags.contains(LifecycleFlags::CREATED) || flags.contains(LifecycleFlags::IN_SCENE) {
            return Ok(());
        }

        self.set_flag(key, LifecycleFlags::IN_SCENE, true);
        self.invoke(key, HookCall::EnterScene)?;
        self.descend(key, HookCall::EnterScene)
    }

    /// Leave the scene, top-down
    pub fn on_leave_scene(&mut self, key: ComponentKey) -> CascadeResult {
        let flags = self.flags_of(key);
        if !flags.contains(LifecycleFlags::IN_SCENE) || flags.contains(LifecycleFlags::DESTROYED) {
            return Ok(());
        }

        self.set_flag(key, LifecycleFlags::IN_SCENE, false);
        self.invoke(key, HookCall::LeaveScene)?;
        self.descend(key, HookCall::LeaveScene)
    }

    /// Turn the effective enabled state on, if requested by the user
    pub fn on_enable(&mut self, key: ComponentKey) -> CascadeResult {
        let flags = self.flags_of(key);
        if !flags.contains(LifecycleFlags::CREATED | LifecycleFlags::USER_ENABLED)
            || flags.intersects(LifecycleFlags::ENABLED | LifecycleFlags::DESTROYED)
        {
            return Ok(());
        }

        self.set_flag(key, LifecycleFlags::ENABLED, true);
        self.invoke(key, HookCall::Enable)?;
        self.descend(key, HookCall::Enable)
    }

    /// Turn the effective enabled state off
    pub fn on_disable(&mut self, key: ComponentKey) -> CascadeResult {
        let flags = self.flags_of(key);
        if !flags.contains(LifecycleFlags::ENABLED) || flags.contains(LifecycleFlags::DESTROYED) {
            return Ok(());
        }

        self.set_flag(key, LifecycleFlags::ENABLED, false);
        self.invoke(key, HookCall::Disable)?;
        self.descend(key, HookCall::Disable)
    }

    /// Request a component to be enabled
    ///
    /// The request is remembered across scene membership changes; the
    /// component actually enables once its parent is enabled.
    pub fn enable(&mut self, key: ComponentKey) -> CascadeResult {
        if !self.check_live(key, "enable") {
            return Ok(());
        }
        self.set_flag(key, LifecycleFlags::USER_ENABLED, true);

        let parent_enabled = match self.parent(key) {
            Some(parent) => self.is_enabled(parent),
            None => key == self.root && self.scene_flags().contains(SceneFlags::CREATED),
        };
        if parent_enabled {
            self.on_enable(key)?;
        }
        Ok(())
    }

    /// Request a component to be disabled
    pub fn disable(&mut self, key: ComponentKey) -> CascadeResult {
        if !self.check_live(key, "disable") {
            return Ok(());
        }
        self.set_flag(key, LifecycleFlags::USER_ENABLED, false);
        self.on_disable(key)
    }

    /// [`Scene::enable`] or [`Scene::disable`]
    pub fn set_enabled(&mut self, key: ComponentKey, enabled: bool) -> CascadeResult {
        if enabled {
            self.enable(key)
        } else {
            self.disable(key)
        }
    }

    /// Start a component and its subtree, once
    pub fn on_start(&mut self, key: ComponentKey) -> CascadeResult {
        if !self.check_live(key, "on_start") {
            return Ok(());
        }
        let flags = self.flags_of(key);
        if !flags.contains(LifecycleFlags::IN_SCENE | LifecycleFlags::ENABLED)
            || flags.contains(LifecycleFlags::STARTED)
        {
            return Ok(());
        }

        self.set_flag(key, LifecycleFlags::STARTED, true);
        self.invoke(key, HookCall::Start)?;
        self.descend(key, HookCall::Start)
    }

    fn ensure_started(&mut self, key: ComponentKey) -> CascadeResult {
        if !self.flags_of(key).contains(LifecycleFlags::STARTED) {
            self.on_start(key)?;
        }
        Ok(())
    }

    /// Before-physics phase for a component and its dynamic subtree
    pub fn on_before_physics_update(&mut self, key: ComponentKey, delta: f32, elapsed: f32) -> CascadeResult {
        if !self.is_active(key) {
            return Ok(());
        }
        self.ensure_started(key)?;
        if !self.is_active(key) {
            return Ok(());
        }

        let call = HookCall::BeforePhysicsUpdate { delta, elapsed };
        self.invoke(key, call)?;
        self.descend(key, call)
    }

    /// Pre-update pass for a component and its dynamic subtree
    pub fn on_pre_update(&mut self, key: ComponentKey, delta: f32, elapsed: f32) -> CascadeResult {
        if !self.is_active(key) {
            return Ok(());
        }
        self.ensure_started(key)?;
        if !self.is_active(key) {
            return Ok(());
        }

        let call = HookCall::PreUpdate { delta, elapsed };
        self.invoke(key, call)?;
        self.descend(key, call)
    }

    /// Update pass for a component and its dynamic subtree
    ///
    /// An actor whose transform changed gets `on_transform_update` first.
    pub fn on_update(&mut self, key: ComponentKey, delta: f32, elapsed: f32) -> CascadeResult {
        if !self.is_active(key) {
            return Ok(());
        }
        self.ensure_started(key)?;

        if self.take_transform_changed(key) {
            self.invoke(key, HookCall::TransformUpdate)?;
        }
        if !self.is_active(key) {
            return Ok(());
        }

        let call = HookCall::Update { delta, elapsed };
        self.invoke(key, call)?;
        self.descend(key, call)
    }

    /// Post-update pass for a component and its dynamic subtree
    pub fn on_post_update(&mut self, key: ComponentKey, delta: f32, elapsed: f32) -> CascadeResult {
        if !self.is_active(key) {
            return Ok(());
        }
        self.ensure_started(key)?;
        if !self.is_active(key) {
            return Ok(());
        }

        let call = HookCall::PostUpdate { delta, elapsed };
        self.invoke(key, call)?;
        self.descend(key, call)
    }

    /// Propagate a new surface size to a created component and its subtree
    pub fn on_resize(&mut self, key: ComponentKey, width: u32, height: u32) -> CascadeResult {
        let flags = self.flags_of(key);
        if !flags.contains(LifecycleFlags::CREATED) || flags.contains(LifecycleFlags::DESTROYED) {
            return Ok(());
        }

        let call = HookCall::Resize { width, height };
        self.invoke(key, call)?;
        self.descend(key, call)
    }

    fn on_destroy(&mut self, key: ComponentKey) -> CascadeResult {
        if !self.contains(key) || self.flags_of(key).contains(LifecycleFlags::DESTROYED) {
            return Ok(());
        }
        self.set_flag(key, LifecycleFlags::DESTROYED, true);
        self.invoke(key, HookCall::Destroy)
    }

    /// Destroy a component
    ///
    /// Children are destroyed first. Then the component is disabled, leaves
    /// the scene, runs `on_destroy` and is detached from its parent. Its key
    /// goes stale once no hook of it is running. Destroying twice is a no-op.
    pub fn destroy(&mut self, key: ComponentKey) -> CascadeResult {
        if self.is_destroyed(key) {
            return Ok(());
        }

        for child in self.child_snapshot(key, Traversal::All) {
            if self.still_child(key, child, Traversal::All) {
                self.destroy(child)?;
            }
        }

        self.on_disable(key)?;
        self.on_leave_scene(key)?;
        self.on_destroy(key)?;

        let Some(node) = self.nodes.get(key) else {
            return Ok(());
        };
        let (parent, in_scene_tree) = (node.parent, node.scene.is_some());
        match parent {
            Some(parent) => self.unlink(parent, key),
            None if in_scene_tree => self.unindex_subtree(key),
            None => {}
        }
        if self.active_camera == Some(key) {
            self.active_camera = None;
        }
        self.reap(key);
        Ok(())
    }

    fn reap(&mut self, key: ComponentKey) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        if node.script.is_some() {
            self.nodes.remove(key);
        } else {
            node.reap = true;
        }
    }
}

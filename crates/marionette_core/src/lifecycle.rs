//! The lifecycle contract shared by actors and behaviors
//!
//! Every component carries a boxed [`Lifecycle`] object. The scene calls its
//! hooks as the component moves through
//! `Unattached → Created → {InScene, OutOfScene} × {Enabled, Disabled} → Destroyed`,
//! plus the one-shot `Started` transition and the per-frame phases.
//! All hooks default to doing nothing.

use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};

use bitflags::bitflags;

use crate::error::{HookResult, LifecycleError};
use crate::node::ComponentKey;
use crate::scene::Scene;

bitflags! {
    /// Lifecycle state of a component
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LifecycleFlags: u8 {
        /// `on_create` has run
        const CREATED = 1 << 0;
        /// `on_start` has run
        const STARTED = 1 << 1;
        /// Effective enabled state, cascaded from the parent
        const ENABLED = 1 << 2;
        /// Enabled state requested through `enable`/`disable`
        const USER_ENABLED = 1 << 3;
        /// Member of a scene tree that has entered the scene
        const IN_SCENE = 1 << 4;
        /// Terminal state
        const DESTROYED = 1 << 5;
        /// Excluded from per-frame traversal
        const STATIC = 1 << 6;
    }
}

/// Names of the lifecycle hooks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hook {
    Create,
    Enable,
    Start,
    EnterScene,
    BeforePhysicsUpdate,
    TransformUpdate,
    PreUpdate,
    Update,
    PostUpdate,
    Disable,
    LeaveScene,
    Destroy,
    Resize,
}

impl Hook {
    /// Method name of the hook on [`Lifecycle`]
    pub fn name(self) -> &'static str {
        match self {
            Hook::Create => "on_create",
            Hook::Enable => "on_enable",
            Hook::Start => "on_start",
            Hook::EnterScene => "on_enter_scene",
            Hook::BeforePhysicsUpdate => "on_before_physics_update",
            Hook::TransformUpdate => "on_transform_update",
            Hook::PreUpdate => "on_pre_update",
            Hook::Update => "on_update",
            Hook::PostUpdate => "on_post_update",
            Hook::Disable => "on_disable",
            Hook::LeaveScene => "on_leave_scene",
            Hook::Destroy => "on_destroy",
            Hook::Resize => "on_resize",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Downcasting support for lifecycle objects
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Hooks called by the scene as a component moves through its lifecycle
///
/// The concrete type implementing this trait is the component's type
/// identity: `Scene::components_by_type::<T>()` matches exactly `T`.
///
/// Hooks may freely mutate the hierarchy through the [`HookContext`]. If a
/// hook causes another hook to fire on the *same* component, that nested call
/// is queued and runs right after the current hook returns.
///
/// # Example
/// ```ignore
/// struct Spinner { speed: f32 }
///
/// impl Lifecycle for Spinner {
///     fn on_update(&mut self, cx: &mut HookContext<'_>, delta: f32, _elapsed: f32) -> HookResult {
///         let actor = cx.owner().ok_or("spinner must be attached")?;
///         cx.rotate(actor, Quat::from_rotation_y(self.speed * delta));
///         Ok(())
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait Lifecycle: AsAny {
    /// Runs once, when the component joins a created hierarchy
    fn on_create(&mut self, cx: &mut HookContext<'_>) -> HookResult {
        Ok(())
    }

    /// Runs when the effective enabled state turns on
    fn on_enable(&mut self, cx: &mut HookContext<'_>) -> HookResult {
        Ok(())
    }

    /// Runs once, before the first per-frame update while in scene and enabled
    fn on_start(&mut self, cx: &mut HookContext<'_>) -> HookResult {
        Ok(())
    }

    /// Runs each time the component enters the scene
    fn on_enter_scene(&mut self, cx: &mut HookContext<'_>) -> HookResult {
        Ok(())
    }

    /// First per-frame phase, before the physics step
    fn on_before_physics_update(
        &mut self,
        cx: &mut HookContext<'_>,
        delta: f32,
        elapsed: f32,
    ) -> HookResult {
        Ok(())
    }

    /// Runs during the update phase when the actor's transform changed
    fn on_transform_update(&mut self, cx: &mut HookContext<'_>) -> HookResult {
        Ok(())
    }

    /// Update phase, before `on_update` runs anywhere in the tree
    fn on_pre_update(&mut self, cx: &mut HookContext<'_>, delta: f32, elapsed: f32) -> HookResult {
        Ok(())
    }

    /// Main update
    fn on_update(&mut self, cx: &mut HookContext<'_>, delta: f32, elapsed: f32) -> HookResult {
        Ok(())
    }

    /// Update phase, after `on_update` ran everywhere in the tree
    fn on_post_update(&mut self, cx: &mut HookContext<'_>, delta: f32, elapsed: f32) -> HookResult {
        Ok(())
    }

    /// Runs when the effective enabled state turns off
    fn on_disable(&mut self, cx: &mut HookContext<'_>) -> HookResult {
        Ok(())
    }

    /// Runs each time the component leaves the scene
    fn on_leave_scene(&mut self, cx: &mut HookContext<'_>) -> HookResult {
        Ok(())
    }

    /// Runs once, when the component is destroyed
    fn on_destroy(&mut self, cx: &mut HookContext<'_>) -> HookResult {
        Ok(())
    }

    /// Runs right after `on_create` and whenever the output surface changes size
    fn on_resize(&mut self, cx: &mut HookContext<'_>, width: u32, height: u32) -> HookResult {
        Ok(())
    }
}

/// Access to the scene from inside a hook
///
/// Dereferences to [`Scene`], so every structural operation is available;
/// [`HookContext::this`] is the component whose hook is running.
pub struct HookContext<'a> {
    scene: &'a mut Scene,
    this: ComponentKey,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(scene: &'a mut Scene, this: ComponentKey) -> Self {
        Self { scene, this }
    }

    /// The component whose hook is running
    #[inline]
    pub fn this(&self) -> ComponentKey {
        self.this
    }

    /// The actor this component is attached to
    pub fn owner(&self) -> Option<ComponentKey> {
        self.scene.parent(self.this)
    }

    /// The scene driving the hook
    pub fn scene(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Deref for HookContext<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for HookContext<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

/// A hook invocation with its arguments
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum HookCall {
    Create,
    Enable,
    Start,
    EnterScene,
    BeforePhysicsUpdate { delta: f32, elapsed: f32 },
    TransformUpdate,
    PreUpdate { delta: f32, elapsed: f32 },
    Update { delta: f32, elapsed: f32 },
    PostUpdate { delta: f32, elapsed: f32 },
    Disable,
    LeaveScene,
    Destroy,
    Resize { width: u32, height: u32 },
}

impl HookCall {
    pub(crate) fn hook(self) -> Hook {
        match self {
            HookCall::Create => Hook::Create,
            HookCall::Enable => Hook::Enable,
            HookCall::Start => Hook::Start,
            HookCall::EnterScene => Hook::EnterScene,
            HookCall::BeforePhysicsUpdate { .. } => Hook::BeforePhysicsUpdate,
            HookCall::TransformUpdate => Hook::TransformUpdate,
            HookCall::PreUpdate { .. } => Hook::PreUpdate,
            HookCall::Update { .. } => Hook::Update,
            HookCall::PostUpdate { .. } => Hook::PostUpdate,
            HookCall::Disable => Hook::Disable,
            HookCall::LeaveScene => Hook::LeaveScene,
            HookCall::Destroy => Hook::Destroy,
            HookCall::Resize { .. } => Hook::Resize,
        }
    }

    pub(crate) fn apply(self, script: &mut dyn Lifecycle, cx: &mut HookContext<'_>) -> HookResult {
        match self {
            HookCall::Create => script.on_create(cx),
            HookCall::Enable => script.on_enable(cx),
            HookCall::Start => script.on_start(cx),
            HookCall::EnterScene => script.on_enter_scene(cx),
            HookCall::BeforePhysicsUpdate { delta, elapsed } => {
                script.on_before_physics_update(cx, delta, elapsed)
            }
            HookCall::TransformUpdate => script.on_transform_update(cx),
            HookCall::PreUpdate { delta, elapsed } => script.on_pre_update(cx, delta, elapsed),
            HookCall::Update { delta, elapsed } => script.on_update(cx, delta, elapsed),
            HookCall::PostUpdate { delta, elapsed } => script.on_post_update(cx, delta, elapsed),
            HookCall::Disable => script.on_disable(cx),
            HookCall::LeaveScene => script.on_leave_scene(cx),
            HookCall::Destroy => script.on_destroy(cx),
            HookCall::Resize { width, height } => script.on_resize(cx, width, height),
        }
    }
}

/// Work queued on a node whose script is checked out
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Deferred {
    /// Run the node's hook
    Hook(HookCall),
    /// Continue a cascade into the node's children
    Descend(HookCall),
}

/// Run a user hook, attaching the component type and hook name to failures
/// in builds with `debug_assertions`
#[cfg(debug_assertions)]
pub(crate) fn guarded(
    component: &'static str,
    hook: Hook,
    call: impl FnOnce() -> HookResult,
) -> Result<(), LifecycleError> {
    call().map_err(|source| LifecycleError::Hook {
        component,
        hook,
        source,
    })
}

/// Run a user hook, forwarding failures untouched
#[cfg(not(debug_assertions))]
#[inline(always)]
pub(crate) fn guarded(
    _component: &'static str,
    _hook: Hook,
    call: impl FnOnce() -> HookResult,
) -> Result<(), LifecycleError> {
    call().map_err(LifecycleError::Raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_names() {
        assert_eq!(Hook::BeforePhysicsUpdate.to_string(), "on_before_physics_update");
        assert_eq!(HookCall::Update { delta: 0.1, elapsed: 1.0 }.hook(), Hook::Update);
        assert_eq!(HookCall::Resize { width: 1, height: 2 }.hook().name(), "on_resize");
    }

    #[test]
    fn test_flags_are_independent() {
        let mut flags = LifecycleFlags::USER_ENABLED;
        flags.insert(LifecycleFlags::CREATED);
        assert!(!flags.contains(LifecycleFlags::ENABLED));
        assert!(flags.contains(LifecycleFlags::USER_ENABLED | LifecycleFlags::CREATED));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_guarded_attaches_context() {
        let err = guarded("demo::Thing", Hook::Start, || Err("nope".into())).unwrap_err();
        match err {
            LifecycleError::Hook { component, hook, source } => {
                assert_eq!(component, "demo::Thing");
                assert_eq!(hook, Hook::Start);
                assert_eq!(source.to_string(), "nope");
            }
            _ => panic!("Expected Hook variant"),
        }
    }

    #[test]
    fn test_guarded_passes_success() {
        assert!(guarded("demo::Thing", Hook::Update, || Ok(())).is_ok());
    }
}

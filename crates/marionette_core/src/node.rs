//! Arena entries for actors and behaviors

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};

use marionette_math::{mat4, Mat4};
use slotmap::new_key_type;

use crate::component_set::ComponentSet;
use crate::lifecycle::{Deferred, Lifecycle, LifecycleFlags};
use crate::scene::SceneId;
use crate::tag::Tag;
use crate::transform::{DirtyFlags, Transform};

new_key_type! {
    /// Key to an actor or behavior in a scene
    ///
    /// Uses generational indexing: once a destroyed component has been
    /// reaped, its key returns None instead of reaching a reused slot.
    ///
    /// Keys are local to the scene whose arena issued them. Each scene has its
    /// own arena, so a key from one scene may name an unrelated component in
    /// another: the root of every scene has the same key, for instance. Keep
    /// the [`SceneId`] next to any key stored outside its scene.
    pub struct ComponentKey;
}

/// The two kinds of hierarchy node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Composite node with a transform and children
    Actor,
    /// Leaf node attached to exactly one actor
    Behavior,
}

/// Per-actor state: transform, cached matrices, children and local indices
pub(crate) struct ActorSlots {
    pub(crate) transform: Transform,
    pub(crate) dirty: DirtyFlags,
    pub(crate) local_matrix: Mat4,
    pub(crate) world_matrix: Mat4,
    /// Children visited by the per-frame phases
    pub(crate) components: ComponentSet<ComponentKey>,
    /// Children excluded from the per-frame phases
    pub(crate) static_components: ComponentSet<ComponentKey>,
    pub(crate) by_type: HashMap<TypeId, ComponentSet<ComponentKey>>,
    pub(crate) by_tag: HashMap<Tag, ComponentSet<ComponentKey>>,
}

impl ActorSlots {
    fn new() -> Self {
        Self {
            transform: Transform::identity(),
            dirty: DirtyFlags::MATRIX,
            local_matrix: mat4::IDENTITY,
            world_matrix: mat4::IDENTITY,
            components: ComponentSet::new(),
            static_components: ComponentSet::new(),
            by_type: HashMap::new(),
            by_tag: HashMap::new(),
        }
    }

    /// Dynamic children followed by static children
    pub(crate) fn all_children(&self) -> Vec<ComponentKey> {
        let mut children = self.components.to_vec();
        children.extend(self.static_components.iter());
        children
    }
}

pub(crate) enum NodeKind {
    Actor(Box<ActorSlots>),
    Behavior,
}

/// One component in the scene arena
pub(crate) struct Node {
    /// Checked out while one of its hooks runs
    pub(crate) script: Option<Box<dyn Lifecycle>>,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) kind: NodeKind,
    pub(crate) flags: LifecycleFlags,
    pub(crate) tags: ComponentSet<Tag>,
    pub(crate) parent: Option<ComponentKey>,
    pub(crate) scene: Option<SceneId>,
    pub(crate) name: Option<String>,
    /// Hook calls and child cascades that arrived while the script was checked out
    pub(crate) deferred: VecDeque<Deferred>,
    /// Destroyed while checked out; removed from the arena once its hook returns
    pub(crate) reap: bool,
}

impl Node {
    fn new<T: Lifecycle>(script: T, kind: NodeKind) -> Self {
        Self {
            script: Some(Box::new(script)),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            kind,
            flags: LifecycleFlags::USER_ENABLED,
            tags: ComponentSet::new(),
            parent: None,
            scene: None,
            name: None,
            deferred: VecDeque::new(),
            reap: false,
        }
    }

    pub(crate) fn actor<T: Lifecycle>(script: T) -> Self {
        Self::new(script, NodeKind::Actor(Box::new(ActorSlots::new())))
    }

    pub(crate) fn behavior<T: Lifecycle>(script: T) -> Self {
        Self::new(script, NodeKind::Behavior)
    }

    pub(crate) fn kind(&self) -> ComponentKind {
        match self.kind {
            NodeKind::Actor(_) => ComponentKind::Actor,
            NodeKind::Behavior => ComponentKind::Behavior,
        }
    }

    #[inline]
    pub(crate) fn is_actor(&self) -> bool {
        matches!(self.kind, NodeKind::Actor(_))
    }

    pub(crate) fn actor_slots(&self) -> Option<&ActorSlots> {
        match &self.kind {
            NodeKind::Actor(slots) => Some(&**slots),
            NodeKind::Behavior => None,
        }
    }

    pub(crate) fn actor_mut(&mut self) -> Option<&mut ActorSlots> {
        match &mut self.kind {
            NodeKind::Actor(slots) => Some(&mut **slots),
            NodeKind::Behavior => None,
        }
    }

    /// Name for log messages: the debug name if set, else the type name
    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.type_name)
    }
}

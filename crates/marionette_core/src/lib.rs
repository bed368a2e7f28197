//! Core runtime for the Marionette engine
//!
//! This crate owns the hierarchy of live objects and drives their lifecycle:
//!
//! - [`Scene`] - Arena owning every component, the root actor and the scene-wide indices
//! - [`ComponentKey`] - Generational handle to an actor or behavior in a scene
//! - [`Lifecycle`] - Hook contract implemented by every actor and behavior script
//! - [`HookContext`] - Access to the scene from inside a hook
//! - [`ComponentSet`] - Insertion-ordered unique collection used by all indices
//! - [`Tag`] / [`TagInterner`] - Interned tags for cross-cutting queries
//! - [`Transform`] / [`TransformMut`] - Actor transforms with dirty tracking
//! - [`SceneManager`] - Loads scenes and switches the active one
//! - [`PhysicsBackend`] / [`RenderSurface`] - Collaborator boundaries

mod actor;
mod behavior;
mod cascade;
mod collaborators;
mod component_set;
mod error;
mod lifecycle;
mod node;
mod scene;
mod scene_manager;
mod tag;
mod transform;

pub use actor::PlainActor;
pub use collaborators::{FixedSurface, LocalBoxFuture, PhysicsBackend, RenderSurface};
pub use component_set::ComponentSet;
pub use error::{CollaboratorError, HookError, HookResult, LifecycleError, SceneError};
pub use lifecycle::{Hook, HookContext, Lifecycle, LifecycleFlags};
pub use node::{ComponentKey, ComponentKind};
pub use scene::{Scene, SceneFlags, SceneId};
pub use scene_manager::SceneManager;
pub use tag::{Tag, TagInterner};
pub use transform::{DirtyFlags, Transform, TransformMut};

// Re-export the math types used in the public API
pub use marionette_math::{mat4, Mat4, Quat, Vec3};

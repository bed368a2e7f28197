//! Actor transforms (position, rotation, scale) and lazy matrix propagation
//!
//! Writing an actor's transform marks it dirty right away. Two flags are
//! involved:
//! - [`DirtyFlags::MATRIX`] reaches every descendant actor, through both child
//!   sets, and means the cached matrices must be recomputed on next read.
//! - [`DirtyFlags::TRANSFORM_CHANGED`] reaches dynamic descendant actors only
//!   and schedules `on_transform_update` for the next update phase.

use std::ops::{Deref, DerefMut};

use bitflags::bitflags;
use log::warn;
use marionette_math::{mat4, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::node::{ComponentKey, Node};
use crate::scene::Scene;

bitflags! {
    /// Pending transform work of an actor
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        /// `on_transform_update` must run during the next update phase
        const TRANSFORM_CHANGED = 1 << 0;
        /// Cached local and world matrices are stale
        const MATRIX = 1 << 1;
    }
}

/// Local transform of an actor
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position relative to the parent actor
    pub position: Vec3,
    /// Rotation relative to the parent actor
    pub rotation: Quat,
    /// Non-uniform scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// The identity transform
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Local matrix `translation * rotation * scale`
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        mat4::compose(self.position, self.rotation, self.scale)
    }

    /// Transform a point from local space to parent space
    ///
    /// Applies scale, then rotation, then translation.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.rotate(p.component_mul(self.scale)) + self.position
    }

    /// Translate the transform by an offset
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Rotate the transform by a quaternion, applied after the current rotation
    pub fn rotate(&mut self, rotation: Quat) {
        self.rotation = (rotation * self.rotation).normalized();
    }
}

/// Scoped mutable access to an actor's transform
///
/// Writes the value back and marks the actor dirty when dropped, if it changed.
pub struct TransformMut<'a> {
    scene: &'a mut Scene,
    key: ComponentKey,
    value: Transform,
    original: Transform,
}

impl Deref for TransformMut<'_> {
    type Target = Transform;

    fn deref(&self) -> &Transform {
        &self.value
    }
}

impl DerefMut for TransformMut<'_> {
    fn deref_mut(&mut self) -> &mut Transform {
        &mut self.value
    }
}

impl Drop for TransformMut<'_> {
    fn drop(&mut self) {
        if self.value != self.original {
            self.scene.set_transform(self.key, self.value);
        }
    }
}

impl Scene {
    /// Local transform of an actor
    pub fn transform(&self, key: ComponentKey) -> Option<Transform> {
        self.nodes
            .get(key)
            .and_then(Node::actor_slots)
            .map(|slots| slots.transform)
    }

    /// Scoped mutable access to an actor's transform
    pub fn transform_mut(&mut self, key: ComponentKey) -> Option<TransformMut<'_>> {
        let value = self.transform(key)?;
        Some(TransformMut {
            scene: self,
            key,
            value,
            original: value,
        })
    }

    /// Replace an actor's transform and mark it dirty
    pub fn set_transform(&mut self, key: ComponentKey, transform: Transform) {
        let Some(slots) = self.nodes.get_mut(key).and_then(Node::actor_mut) else {
            warn!("set_transform: {:?} is not a live actor", key);
            return;
        };
        slots.transform = transform;
        self.mark_transform_dirty(key);
    }

    fn modify_transform(&mut self, key: ComponentKey, f: impl FnOnce(&mut Transform)) {
        if let Some(mut transform) = self.transform(key) {
            f(&mut transform);
            self.set_transform(key, transform);
        } else {
            warn!("{:?} is not a live actor, transform unchanged", key);
        }
    }

    /// Position relative to the parent actor
    pub fn position(&self, key: ComponentKey) -> Option<Vec3> {
        self.transform(key).map(|t| t.position)
    }

    /// Rotation relative to the parent actor
    pub fn rotation(&self, key: ComponentKey) -> Option<Quat> {
        self.transform(key).map(|t| t.rotation)
    }

    /// Scale of an actor
    pub fn scale(&self, key: ComponentKey) -> Option<Vec3> {
        self.transform(key).map(|t| t.scale)
    }

    pub fn set_position(&mut self, key: ComponentKey, position: Vec3) {
        self.modify_transform(key, |t| t.position = position);
    }

    pub fn set_rotation(&mut self, key: ComponentKey, rotation: Quat) {
        self.modify_transform(key, |t| t.rotation = rotation);
    }

    pub fn set_scale(&mut self, key: ComponentKey, scale: Vec3) {
        self.modify_transform(key, |t| t.scale = scale);
    }

    /// Move an actor by an offset in its parent's space
    pub fn translate(&mut self, key: ComponentKey, offset: Vec3) {
        self.modify_transform(key, |t| t.translate(offset));
    }

    /// Rotate an actor, applied after its current rotation
    pub fn rotate(&mut self, key: ComponentKey, rotation: Quat) {
        self.modify_transform(key, |t| t.rotate(rotation));
    }

    /// Pending transform work of an actor
    pub fn dirty_flags(&self, key: ComponentKey) -> Option<DirtyFlags> {
        self.nodes
            .get(key)
            .and_then(Node::actor_slots)
            .map(|slots| slots.dirty)
    }

    /// Mark an actor's transform dirty
    ///
    /// Sets the matrix flag on the actor and every descendant actor, skipping
    /// subtrees already matrix-dirty. Then sets the transform-changed flag on
    /// the actor and its dynamic descendant actors, stopping where it is
    /// already set. Calling this twice has the same effect as calling it once.
    pub fn mark_transform_dirty(&mut self, key: ComponentKey) {
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let Some(slots) = self.nodes.get_mut(current).and_then(Node::actor_mut) else {
                continue;
            };
            if slots.dirty.contains(DirtyFlags::MATRIX) {
                continue;
            }
            slots.dirty.insert(DirtyFlags::MATRIX);
            stack.extend(slots.all_children());
        }

        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let Some(slots) = self.nodes.get_mut(current).and_then(Node::actor_mut) else {
                continue;
            };
            if slots.dirty.contains(DirtyFlags::TRANSFORM_CHANGED) {
                continue;
            }
            slots.dirty.insert(DirtyFlags::TRANSFORM_CHANGED);
            stack.extend(slots.components.iter());
        }
    }

    /// Recompute an actor's cached matrices if they are stale (or `force` is set)
    ///
    /// The parent's world matrix is read first, which recomputes it lazily.
    pub fn update_world_matrix(&mut self, key: ComponentKey, force: bool) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let Some(slots) = node.actor_slots() else {
            return;
        };
        if !force && !slots.dirty.contains(DirtyFlags::MATRIX) {
            return;
        }
        let local = slots.transform.to_matrix();
        let parent = node.parent;

        let parent_world = parent.and_then(|p| self.world_matrix(p));
        if let Some(slots) = self.nodes.get_mut(key).and_then(Node::actor_mut) {
            slots.local_matrix = local;
            slots.world_matrix = match parent_world {
                Some(parent_world) => mat4::mul(parent_world, local),
                None => local,
            };
            slots.dirty.remove(DirtyFlags::MATRIX);
        }
    }

    /// Clear the transform-changed flag, returning whether it was set
    pub(crate) fn take_transform_changed(&mut self, key: ComponentKey) -> bool {
        match self.nodes.get_mut(key).and_then(Node::actor_mut) {
            Some(slots) => {
                let changed = slots.dirty.contains(DirtyFlags::TRANSFORM_CHANGED);
                slots.dirty.remove(DirtyFlags::TRANSFORM_CHANGED);
                changed
            }
            None => false,
        }
    }

    /// Local matrix of an actor, recomputed if stale
    pub fn local_matrix(&mut self, key: ComponentKey) -> Option<Mat4> {
        self.update_world_matrix(key, false);
        self.nodes
            .get(key)
            .and_then(Node::actor_slots)
            .map(|slots| slots.local_matrix)
    }

    /// World matrix of an actor, recomputed if stale
    pub fn world_matrix(&mut self, key: ComponentKey) -> Option<Mat4> {
        self.update_world_matrix(key, false);
        self.nodes
            .get(key)
            .and_then(Node::actor_slots)
            .map(|slots| slots.world_matrix)
    }

    /// World-space position of an actor
    pub fn world_position(&mut self, key: ComponentKey) -> Option<Vec3> {
        self.world_matrix(key).map(mat4::get_translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    fn approx_vec(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPSILON
    }

    #[test]
    fn test_transform_identity() {
        let t = Transform::identity();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        assert!(mat4::approx_eq(t.to_matrix(), mat4::IDENTITY, EPSILON));
    }

    #[test]
    fn test_transform_point_order() {
        let t = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::from_rotation_z(FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        // Scale (2,0,0), rotate to (0,2,0), translate to (1,2,0)
        let p = t.transform_point(Vec3::X);
        assert!(approx_vec(p, Vec3::new(1.0, 2.0, 0.0)));
        assert!(approx_vec(mat4::transform_point(t.to_matrix(), Vec3::X), p));
    }

    #[test]
    fn test_world_matrix_composes_parent() {
        let mut scene = Scene::new("matrices");
        let parent = scene.spawn_actor();
        let child = scene.spawn_actor();
        scene.add_component(parent, child).unwrap();

        scene.set_position(parent, Vec3::new(0.0, 5.0, 0.0));
        scene.set_position(child, Vec3::new(1.0, 0.0, 0.0));

        let pos = scene.world_position(child).unwrap();
        assert!(approx_vec(pos, Vec3::new(1.0, 5.0, 0.0)));
        assert!(!scene.dirty_flags(child).unwrap().contains(DirtyFlags::MATRIX));
        assert!(!scene.dirty_flags(parent).unwrap().contains(DirtyFlags::MATRIX));
    }

    #[test]
    fn test_parent_write_invalidates_child_matrix() {
        let mut scene = Scene::new("matrices");
        let parent = scene.spawn_actor();
        let child = scene.spawn_actor();
        scene.add_component(parent, child).unwrap();
        scene.set_position(child, Vec3::new(0.0, 0.0, 1.0));
        let _ = scene.world_matrix(child);

        scene.translate(parent, Vec3::new(2.0, 0.0, 0.0));
        assert!(scene.dirty_flags(child).unwrap().contains(DirtyFlags::MATRIX));
        let pos = scene.world_position(child).unwrap();
        assert!(approx_vec(pos, Vec3::new(2.0, 0.0, 1.0)));
    }

    #[test]
    fn test_local_matrix_ignores_parent() {
        let mut scene = Scene::new("matrices");
        let parent = scene.spawn_actor();
        let child = scene.spawn_actor();
        scene.add_component(parent, child).unwrap();
        scene.set_position(parent, Vec3::new(9.0, 9.0, 9.0));
        scene.set_scale(child, Vec3::splat(3.0));

        let local = scene.local_matrix(child).unwrap();
        assert!(mat4::approx_eq(local, mat4::from_scale(Vec3::splat(3.0)), EPSILON));
    }

    #[test]
    fn test_transform_guard_marks_dirty_on_change() {
        let mut scene = Scene::new("guard");
        let actor = scene.spawn_actor();
        let _ = scene.world_matrix(actor);
        scene.take_transform_changed(actor);

        {
            let t = scene.transform_mut(actor).unwrap();
            assert_eq!(t.position, Vec3::ZERO);
        }
        assert_eq!(scene.dirty_flags(actor), Some(DirtyFlags::empty()));

        {
            let mut t = scene.transform_mut(actor).unwrap();
            t.position = Vec3::new(0.0, 1.0, 0.0);
        }
        assert!(scene.dirty_flags(actor).unwrap().contains(DirtyFlags::MATRIX | DirtyFlags::TRANSFORM_CHANGED));
        assert_eq!(scene.position(actor), Some(Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_behaviors_have_no_transform() {
        let mut scene = Scene::new("guard");
        let behavior = scene.create_behavior(crate::PlainActor);
        assert!(scene.transform(behavior).is_none());
        assert!(scene.transform_mut(behavior).is_none());
        assert!(scene.world_matrix(behavior).is_none());
        // Logged and ignored
        scene.set_position(behavior, Vec3::ONE);
    }
}

//! 3D Mathematics Library
//!
//! This crate provides the value types used by actor transforms in the
//! Marionette runtime.
//!
//! ## Core Types
//!
//! - [`Vec3`] - 3D vector with x, y, z components
//! - [`Quat`] - Unit quaternion rotation
//! - [`Mat4`] - 4x4 column-major matrix for affine transforms

mod vec3;
mod quat;
pub mod mat4;

pub use vec3::Vec3;
pub use quat::Quat;
pub use mat4::Mat4;

//! Scene construction utilities
//!
//! This module provides a declarative API for composing scenes, plus the
//! scripts the demo scene is built from.

pub mod behaviors;
mod scene_builder;

pub use scene_builder::SceneBuilder;

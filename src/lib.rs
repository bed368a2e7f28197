//! Marionette host
//!
//! Headless host for the Marionette runtime: configuration, the demo scene
//! and the per-frame loop driving a [`marionette_core::SceneManager`].

pub mod config;
pub mod scene;
pub mod systems;

//! Boundaries to the renderer and the physics engine
//!
//! The runtime never renders or integrates anything itself. It asks a
//! [`RenderSurface`] for the output size and hands the scene to a
//! [`PhysicsBackend`] at fixed points of the frame.

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;

use crate::error::CollaboratorError;
use crate::scene::Scene;

/// A boxed future that is not required to be `Send`
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// The output surface the host renders into
pub trait RenderSurface {
    /// Current size in pixels
    fn size(&self) -> (u32, u32);
}

/// A surface with a size set by the host
///
/// Useful for headless hosts and tests.
#[derive(Debug, Default)]
pub struct FixedSurface {
    size: Cell<(u32, u32)>,
}

impl FixedSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Cell::new((width, height)),
        }
    }

    /// Change the reported size
    pub fn set_size(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }
}

impl RenderSurface for FixedSurface {
    fn size(&self) -> (u32, u32) {
        self.size.get()
    }
}

/// The physics engine driven by a scene
///
/// The scene takes the backend out of itself while calling it, so the backend
/// sees a scene without physics during these calls.
#[allow(unused_variables)]
pub trait PhysicsBackend {
    /// Awaited during `Scene::load`, after the assets
    fn on_load<'a>(&'a mut self, scene: &'a Scene) -> LocalBoxFuture<'a, Result<(), CollaboratorError>> {
        Box::pin(async { Ok(()) })
    }

    /// Runs before the hierarchy's before-physics phase
    fn on_before_physics_update(
        &mut self,
        scene: &mut Scene,
        delta: f32,
        elapsed: f32,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }

    /// The physics step, right after the hierarchy's before-physics phase
    fn on_update(&mut self, scene: &mut Scene, delta: f32, elapsed: f32) -> Result<(), CollaboratorError>;
}

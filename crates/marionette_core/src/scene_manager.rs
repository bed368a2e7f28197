//! Scene switching
//!
//! The SceneManager owns the active scene. Loading a new scene awaits its
//! load completely before the previous scene is torn down, so the cascades of
//! two scenes never interleave.
//!
//! # Example
//! ```ignore
//! let mut manager = SceneManager::new().with_surface(surface);
//! pollster::block_on(manager.load_scene(level, async { Ok(()) }))?;
//!
//! // Host loop
//! manager.update(dt, elapsed)?;
//! ```

use std::future::Future;
use std::rc::Rc;

use log::info;

use crate::collaborators::RenderSurface;
use crate::error::{CollaboratorError, SceneError};
use crate::scene::Scene;

/// Holds the active scene and drives it
#[derive(Default)]
pub struct SceneManager {
    /// The scene receiving frames
    active: Option<Scene>,
    /// Surface handed to every scene loaded through the manager
    surface: Option<Rc<dyn RenderSurface>>,
}

impl SceneManager {
    /// Create a manager with no active scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the surface handed to loaded scenes
    pub fn with_surface(mut self, surface: Rc<dyn RenderSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Load `scene` and make it the active scene
    ///
    /// The previous scene is disposed only after the new one has loaded.
    /// If loading fails, the previous scene stays active.
    pub async fn load_scene<F>(&mut self, mut scene: Scene, assets: F) -> Result<(), SceneError>
    where
        F: Future<Output = Result<(), CollaboratorError>>,
    {
        if let Some(surface) = &self.surface {
            scene.set_surface(Some(surface.clone()));
        }
        scene.load(assets).await?;

        if let Some(mut previous) = self.active.take() {
            info!("Unloading scene '{}'", previous.name());
            previous.dispose()?;
        }

        info!("Activating scene '{}'", scene.name());
        scene.create()?;
        scene.start()?;
        self.active = Some(scene);
        Ok(())
    }

    /// The active scene
    pub fn active_scene(&self) -> Option<&Scene> {
        self.active.as_ref()
    }

    /// The active scene, mutably
    pub fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        self.active.as_mut()
    }

    /// Drive both per-frame phases of the active scene
    pub fn update(&mut self, delta: f32, elapsed: f32) -> Result<(), SceneError> {
        let scene = self.active.as_mut().ok_or(SceneError::NoActiveScene)?;
        scene.before_physics_update(delta, elapsed)?;
        scene.update(delta, elapsed)
    }

    /// Forward a surface size change to the active scene
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SceneError> {
        match self.active.as_mut() {
            Some(scene) => scene.resize(width, height),
            None => Ok(()),
        }
    }

    /// Dispose the active scene
    ///
    /// Returns the disposed scene, or None if no scene was active.
    pub fn unload(&mut self) -> Result<Option<Scene>, SceneError> {
        let Some(mut scene) = self.active.take() else {
            return Ok(None);
        };
        scene.dispose()?;
        Ok(Some(scene))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::FixedSurface;
    use crate::error::HookResult;
    use crate::lifecycle::{HookContext, Lifecycle};
    use std::cell::RefCell;

    struct SizeProbe {
        sizes: Rc<RefCell<Vec<(u32, u32)>>>,
    }

    impl Lifecycle for SizeProbe {
        fn on_resize(&mut self, _cx: &mut HookContext<'_>, width: u32, height: u32) -> HookResult {
            self.sizes.borrow_mut().push((width, height));
            Ok(())
        }
    }

    #[test]
    fn test_update_without_scene() {
        let mut manager = SceneManager::new();
        assert!(matches!(manager.update(0.1, 0.1), Err(SceneError::NoActiveScene)));
        assert!(manager.resize(10, 10).is_ok());
        assert!(manager.unload().unwrap().is_none());
    }

    #[test]
    fn test_load_scene_activates_and_starts() {
        let mut manager = SceneManager::new();
        pollster::block_on(manager.load_scene(Scene::new("first"), async { Ok(()) })).unwrap();

        let scene = manager.active_scene().unwrap();
        assert_eq!(scene.name(), "first");
        assert!(scene.is_started(scene.root()));
    }

    #[test]
    fn test_switch_disposes_previous() {
        let mut manager = SceneManager::new();
        let mut first = Scene::new("first");
        let actor = first.spawn_actor();
        first.add_component(first.root(), actor).unwrap();
        pollster::block_on(manager.load_scene(first, async { Ok(()) })).unwrap();

        pollster::block_on(manager.load_scene(Scene::new("second"), async { Ok(()) })).unwrap();
        assert_eq!(manager.active_scene().unwrap().name(), "second");

        let disposed = manager.unload().unwrap().unwrap();
        assert!(disposed.is_destroyed(disposed.root()));
        assert!(manager.active_scene().is_none());
    }

    #[test]
    fn test_failed_load_keeps_previous() {
        let mut manager = SceneManager::new();
        pollster::block_on(manager.load_scene(Scene::new("first"), async { Ok(()) })).unwrap();

        let result = pollster::block_on(manager.load_scene(Scene::new("broken"), async {
            Err(CollaboratorError::new("no such file"))
        }));
        assert!(result.is_err());
        assert_eq!(manager.active_scene().unwrap().name(), "first");
    }

    #[test]
    fn test_surface_reaches_scene() {
        let surface = Rc::new(FixedSurface::new(640, 480));
        let mut manager = SceneManager::new().with_surface(surface.clone());
        let sizes = Rc::new(RefCell::new(Vec::new()));

        let mut scene = Scene::new("sized");
        let probe = scene.create_actor(SizeProbe { sizes: sizes.clone() });
        scene.add_component(scene.root(), probe).unwrap();
        pollster::block_on(manager.load_scene(scene, async { Ok(()) })).unwrap();

        surface.set_size(800, 600);
        manager.resize(800, 600).unwrap();
        assert_eq!(*sizes.borrow(), vec![(640, 480), (800, 600)]);
    }
}

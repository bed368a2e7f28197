//! Host simulation loop
//!
//! Drives the active scene once per tick:
//! - Delta time calculation (wall clock or fixed timestep, capped)
//! - Surface size-change detection
//! - Before-physics phase, then the update phase
//! - Presenting the frame and clearing per-tick queues

use std::rc::Rc;
use std::time::Instant;

use log::trace;
use marionette_core::{SceneError, SceneManager};

use crate::config::SimulationConfig;
use crate::systems::HeadlessSurface;

/// Produces `(delta, elapsed)` pairs for the host loop
pub struct FrameClock {
    last_frame: Instant,
    elapsed: f32,
    fixed_delta: Option<f32>,
    max_delta: f32,
}

impl FrameClock {
    /// Create a clock from config; a `fixed_delta` of 0 selects the wall clock
    pub fn from_config(config: &SimulationConfig) -> Self {
        let fixed_delta = (config.fixed_delta > 0.0).then_some(config.fixed_delta);
        Self {
            last_frame: Instant::now(),
            elapsed: 0.0,
            fixed_delta,
            max_delta: config.max_delta,
        }
    }

    /// Advance to the next frame
    pub fn tick(&mut self) -> (f32, f32) {
        let now = Instant::now();
        let raw_dt = match self.fixed_delta {
            Some(fixed) => fixed,
            None => (now - self.last_frame).as_secs_f32(),
        };
        self.last_frame = now;

        // Cap dt so a stall (first frame, debugger) doesn't produce a huge step
        let dt = raw_dt.min(self.max_delta);
        self.elapsed += dt;
        (dt, self.elapsed)
    }

    /// Total simulated time
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

/// Result of a simulation tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationResult {
    /// Delta passed to the scene
    pub delta: f32,
    /// Elapsed time passed to the scene
    pub elapsed: f32,
    /// New surface size, if it changed this tick
    pub resized: Option<(u32, u32)>,
}

/// Manages the host simulation loop
pub struct SimulationSystem {
    clock: FrameClock,
    surface: Rc<HeadlessSurface>,
    frame: u64,
}

impl SimulationSystem {
    pub fn new(config: &SimulationConfig, surface: Rc<HeadlessSurface>) -> Self {
        Self {
            clock: FrameClock::from_config(config),
            surface,
            frame: 0,
        }
    }

    /// Number of ticks run so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Total simulated time
    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed()
    }

    /// Run one tick against the active scene
    pub fn update(&mut self, scene_manager: &mut SceneManager) -> Result<SimulationResult, SceneError> {
        let (delta, elapsed) = self.clock.tick();

        // 1. Size-change detection
        let resized = self.surface.apply_resizes();
        if let Some((width, height)) = resized {
            scene_manager.resize(width, height)?;
        }

        // 2. Before-physics phase, then the update phase
        scene_manager.update(delta, elapsed)?;

        // 3. Render
        if let Some(scene) = scene_manager.active_scene_mut() {
            let camera = scene.active_camera().and_then(|c| scene.world_position(c));
            trace!(
                "{} frame {}: {} components, camera at {:?}",
                self.surface.title(),
                self.frame,
                scene.component_count(),
                camera
            );
        }
        self.surface.present();
        self.frame += 1;

        Ok(SimulationResult {
            delta,
            elapsed,
            resized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_core::{HookContext, HookResult, Lifecycle, Scene};
    use std::cell::RefCell;

    fn fixed_config(fixed_delta: f32, max_delta: f32) -> SimulationConfig {
        SimulationConfig {
            frames: 0,
            fixed_delta,
            max_delta,
        }
    }

    #[test]
    fn test_fixed_clock_accumulates() {
        let mut clock = FrameClock::from_config(&fixed_config(0.5, 1.0));
        assert_eq!(clock.tick(), (0.5, 0.5));
        assert_eq!(clock.tick(), (0.5, 1.0));
        assert_eq!(clock.elapsed(), 1.0);
    }

    #[test]
    fn test_delta_time_capped() {
        let mut clock = FrameClock::from_config(&fixed_config(2.0, 0.25));
        assert_eq!(clock.tick(), (0.25, 0.25));

        let mut wall = FrameClock::from_config(&fixed_config(0.0, 0.05));
        std::thread::sleep(std::time::Duration::from_millis(100));
        let (dt, _) = wall.tick();
        assert_eq!(dt, 0.05);
    }

    struct SizeLog(Rc<RefCell<Vec<(u32, u32)>>>);

    impl Lifecycle for SizeLog {
        fn on_resize(&mut self, _cx: &mut HookContext<'_>, width: u32, height: u32) -> HookResult {
            self.0.borrow_mut().push((width, height));
            Ok(())
        }
    }

    #[test]
    fn test_tick_forwards_resize_and_presents() {
        let surface = Rc::new(HeadlessSurface::new("test", 320, 240));
        let mut manager = SceneManager::new().with_surface(surface.clone());
        let sizes = Rc::new(RefCell::new(Vec::new()));

        let mut scene = Scene::new("resizing");
        let root = scene.root();
        scene.attach(root, SizeLog(sizes.clone())).unwrap();
        pollster::block_on(manager.load_scene(scene, async { Ok(()) })).unwrap();

        let mut sim = SimulationSystem::new(&fixed_config(0.1, 0.25), surface.clone());
        let first = sim.update(&mut manager).unwrap();
        assert_eq!(first.resized, None);

        surface.request_resize(640, 480);
        let second = sim.update(&mut manager).unwrap();
        assert_eq!(second.resized, Some((640, 480)));
        assert!((second.elapsed - 0.2).abs() < 1e-6);

        assert_eq!(*sizes.borrow(), vec![(320, 240), (640, 480)]);
        assert_eq!(surface.frames_presented(), 2);
        assert_eq!(sim.frame(), 2);
    }

    #[test]
    fn test_tick_without_scene_fails() {
        let surface = Rc::new(HeadlessSurface::new("test", 1, 1));
        let mut manager = SceneManager::new();
        let mut sim = SimulationSystem::new(&fixed_config(0.1, 0.25), surface);
        assert!(matches!(sim.update(&mut manager), Err(SceneError::NoActiveScene)));
    }
}

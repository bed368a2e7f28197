//! Marionette - headless scene host
//!
//! Loads the demo scene and drives it for the configured number of frames.

use std::process::ExitCode;
use std::rc::Rc;

use marionette_core::{SceneError, SceneManager, Vec3};

use marionette::config::AppConfig;
use marionette::scene::behaviors::{Bob, Lifetime, Spinner};
use marionette::scene::SceneBuilder;
use marionette::systems::{HeadlessSurface, SimulationSystem};

/// Main application state
struct App {
    /// Application configuration
    config: AppConfig,
    /// Scene manager holding the active scene
    scene_manager: SceneManager,
    surface: Rc<HeadlessSurface>,
    simulation: SimulationSystem,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let surface = Rc::new(HeadlessSurface::from_config(&config.window));
        let scene_manager = SceneManager::new().with_surface(surface.clone());
        let simulation = SimulationSystem::new(&config.simulation, surface.clone());
        Self {
            config,
            scene_manager,
            surface,
            simulation,
        }
    }

    /// Compose the demo scene and make it active
    fn load(&mut self) -> Result<(), SceneError> {
        let scene = SceneBuilder::new("demo")
            .add_camera("camera", Vec3::new(0.0, 2.0, 8.0))
            .add_actor("floor", Vec3::new(0.0, -1.0, 0.0))
            .with_tag("floor", "ground")
            .make_static("floor")
            .add_actor("turntable", Vec3::ZERO)
            .with_behavior("turntable", Spinner { speed: 1.0 })
            .add_child("turntable", "satellite", Vec3::new(3.0, 0.0, 0.0))
            .with_behavior("satellite", Bob::new(0.5, 0.5))
            .with_tag("satellite", "orbiting")
            .add_actor("debris", Vec3::new(0.0, 4.0, 0.0))
            .with_behavior("debris", Lifetime { remaining: 1.0 })
            .build()?;

        pollster::block_on(self.scene_manager.load_scene(scene, async { Ok(()) }))
    }

    /// Run the configured number of frames
    fn run(&mut self) -> Result<(), SceneError> {
        let frames = self.config.simulation.frames;
        log::info!(
            "Running '{}' for {} frames at {}x{}",
            self.surface.title(),
            frames,
            self.config.window.width,
            self.config.window.height
        );

        for _ in 0..frames {
            let result = self.simulation.update(&mut self.scene_manager)?;
            if let Some((width, height)) = result.resized {
                log::debug!("Surface resized to {}x{}", width, height);
            }
        }

        if let Some(scene) = self.scene_manager.active_scene_mut() {
            let satellite = scene.find_by_name("satellite");
            log::info!(
                "Finished after {} frames ({:.2}s simulated), satellite at {:?}",
                self.simulation.frame(),
                self.simulation.elapsed(),
                satellite.and_then(|key| scene.world_position(key))
            );
        }

        self.scene_manager.unload()?;
        Ok(())
    }
}

fn main() -> ExitCode {
    // Load configuration
    let (config, config_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Initialize logging; RUST_LOG wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.debug.log_filter()),
    )
    .init();
    if let Some(e) = config_error {
        log::warn!("Failed to load config: {}. Using defaults.", e);
    }
    log::info!("Starting Marionette");

    let mut app = App::new(config);
    if let Err(e) = app.load().and_then(|_| app.run()) {
        log::error!("{}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

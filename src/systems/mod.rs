//! Application systems
//!
//! Modular systems extracted from main.rs for better organization and testability.

mod simulation;
mod surface;

pub use simulation::{FrameClock, SimulationResult, SimulationSystem};
pub use surface::HeadlessSurface;

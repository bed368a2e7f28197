//! Scripts used by the demo scene

use std::f32::consts::TAU;

use log::debug;
use marionette_core::{HookContext, HookResult, Lifecycle, Quat, Vec3};

/// Rotates its owner around the Y axis
#[derive(Debug, Clone)]
pub struct Spinner {
    /// Radians per second
    pub speed: f32,
}

impl Lifecycle for Spinner {
    fn on_update(&mut self, cx: &mut HookContext<'_>, delta: f32, _elapsed: f32) -> HookResult {
        if let Some(owner) = cx.owner() {
            cx.rotate(owner, Quat::from_rotation_y(self.speed * delta));
        }
        Ok(())
    }
}

/// Moves its owner up and down around the position it started at
#[derive(Debug, Clone)]
pub struct Bob {
    pub amplitude: f32,
    /// Oscillations per second
    pub frequency: f32,
    base: Option<Vec3>,
}

impl Bob {
    pub fn new(amplitude: f32, frequency: f32) -> Self {
        Self {
            amplitude,
            frequency,
            base: None,
        }
    }
}

impl Lifecycle for Bob {
    fn on_start(&mut self, cx: &mut HookContext<'_>) -> HookResult {
        self.base = cx.owner().and_then(|owner| cx.position(owner));
        Ok(())
    }

    fn on_update(&mut self, cx: &mut HookContext<'_>, _delta: f32, elapsed: f32) -> HookResult {
        let (Some(owner), Some(base)) = (cx.owner(), self.base) else {
            return Ok(());
        };
        let offset = self.amplitude * (elapsed * self.frequency * TAU).sin();
        cx.set_position(owner, base + Vec3::Y * offset);
        Ok(())
    }
}

/// Destroys its owner once `remaining` seconds of updates have passed
#[derive(Debug, Clone)]
pub struct Lifetime {
    pub remaining: f32,
}

impl Lifecycle for Lifetime {
    fn on_update(&mut self, cx: &mut HookContext<'_>, delta: f32, _elapsed: f32) -> HookResult {
        self.remaining -= delta;
        if self.remaining <= 0.0 {
            if let Some(owner) = cx.owner() {
                debug!("Lifetime expired for {:?}", cx.component_name(owner));
                cx.destroy(owner)?;
            }
        }
        Ok(())
    }
}

/// Tracks the surface aspect ratio for the actor it drives
#[derive(Debug, Clone, Default)]
pub struct CameraRig {
    pub aspect: f32,
}

impl Lifecycle for CameraRig {
    fn on_resize(&mut self, _cx: &mut HookContext<'_>, width: u32, height: u32) -> HookResult {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
        Ok(())
    }
}

//! Headless render surface
//!
//! Stands in for a window: reports a size to the scenes, accepts resize
//! requests from the host and counts presented frames.

use std::cell::{Cell, RefCell};

use marionette_core::RenderSurface;

use crate::config::WindowConfig;

/// A render surface without a window
pub struct HeadlessSurface {
    title: String,
    size: Cell<(u32, u32)>,
    pending_resizes: RefCell<Vec<(u32, u32)>>,
    frames_presented: Cell<u64>,
}

impl HeadlessSurface {
    /// Create a surface from config
    pub fn from_config(config: &WindowConfig) -> Self {
        Self::new(&config.title, config.width, config.height)
    }

    pub fn new(title: &str, width: u32, height: u32) -> Self {
        Self {
            title: title.to_string(),
            size: Cell::new((width, height)),
            pending_resizes: RefCell::new(Vec::new()),
            frames_presented: Cell::new(0),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Queue a size change; applied at the start of the next tick
    pub fn request_resize(&self, width: u32, height: u32) {
        self.pending_resizes.borrow_mut().push((width, height));
    }

    /// Apply the latest queued size change and clear the queue
    ///
    /// Returns the new size if it differs from the current one.
    pub fn apply_resizes(&self) -> Option<(u32, u32)> {
        let latest = self.pending_resizes.borrow_mut().drain(..).last()?;
        if latest == self.size.get() {
            return None;
        }
        self.size.set(latest);
        Some(latest)
    }

    /// Record a presented frame
    pub fn present(&self) {
        self.frames_presented.set(self.frames_presented.get() + 1);
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.get()
    }
}

impl RenderSurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        self.size.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_from_config() {
        let surface = HeadlessSurface::from_config(&WindowConfig::default());
        assert_eq!(surface.size(), (1280, 720));
        assert_eq!(surface.title(), "Marionette");
    }

    #[test]
    fn test_latest_resize_wins() {
        let surface = HeadlessSurface::new("test", 100, 100);
        surface.request_resize(200, 200);
        surface.request_resize(300, 150);
        assert_eq!(surface.apply_resizes(), Some((300, 150)));
        assert_eq!(surface.size(), (300, 150));
        assert_eq!(surface.apply_resizes(), None);
    }

    #[test]
    fn test_resize_to_same_size_is_ignored() {
        let surface = HeadlessSurface::new("test", 100, 100);
        surface.request_resize(100, 100);
        assert_eq!(surface.apply_resizes(), None);
    }
}

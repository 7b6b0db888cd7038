//! Seams between the widget core and whatever renders it.
//!
//! The core never touches elements directly. It tells the presentation
//! surface what should be shown and asks it for the few measurements it
//! needs (animation bounds and the viewport).

use crate::zones::{Rect, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorVariant {
    Default,
    /// Party lamps and party light, shown once the trigger fired.
    Triggered,
}

pub trait PresentationSurface: Send + Sync {
    fn show_trigger(&self);
    fn fade_out_trigger(&self);
    fn hide_trigger(&self);
    fn apply_decor(&self, variant: DecorVariant);

    fn show_animation(&self);
    /// Reload the animation asset so it plays from its first frame.
    fn restart_animation(&self);
    fn flash_animation(&self);
    fn hide_animation(&self);

    /// Bounding box of the rendered animation, `None` while the asset is loading.
    fn animation_bounds(&self) -> Option<Rect>;
    fn viewport(&self) -> Viewport;

    fn place_zone(&self, zone_id: &str, rect: Rect);
    fn set_zone_visible(&self, zone_id: &str, visible: bool);
    fn highlight_zones(&self, enabled: bool);

    /// Direct user-facing confirmation, used when no host page listens.
    fn show_confirmation(&self);
}

pub trait AudioOutput: Send + Sync {
    fn play(&self) -> Result<(), String>;
    fn stop(&self);
}

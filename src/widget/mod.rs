pub mod controller;
pub mod state;

pub use controller::{HitResult, HitTarget, WidgetController, WidgetDeps};
pub use state::{AnimationRun, RunOutcome, WidgetSnapshot, WidgetState};

pub mod geometry;
pub mod scheduler;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use geometry::{LayoutRules, Padding, Point, Rect, RelativeRegion, Viewport, ZoneGeometry};
pub use scheduler::HitZoneScheduler;

/// Activation window `[start_ms, end_ms)` relative to run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl ZoneWindow {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn contains(&self, elapsed: Duration) -> bool {
        let elapsed_ms = elapsed.as_millis();
        elapsed_ms >= u128::from(self.start_ms) && elapsed_ms < u128::from(self.end_ms)
    }

    pub fn is_valid(&self) -> bool {
        self.start_ms < self.end_ms
    }
}

/// Static description of one hit zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub id: String,
    pub geometry: ZoneGeometry,
    #[serde(default)]
    pub padding: Padding,
    pub window: ZoneWindow,
}

/// Runtime copy of a [`ZoneSpec`] for the current run.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveZone {
    pub spec: ZoneSpec,
    pub rect: Option<Rect>,
    pub visible: bool,
}

impl ActiveZone {
    fn new(spec: ZoneSpec) -> Self {
        Self {
            spec,
            rect: None,
            visible: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }
}

pub fn default_zones() -> Vec<ZoneSpec> {
    vec![
        ZoneSpec {
            id: "top".into(),
            geometry: ZoneGeometry::Relative {
                region: RelativeRegion {
                    x: 0.2,
                    y: 0.0,
                    width: 0.6,
                    height: 0.5,
                },
            },
            padding: Padding {
                horizontal: 12.0,
                vertical: 8.0,
            },
            window: ZoneWindow::new(1_500, 7_000),
        },
        ZoneSpec {
            id: "bottom".into(),
            geometry: ZoneGeometry::Relative {
                region: RelativeRegion {
                    x: 0.1,
                    y: 0.5,
                    width: 0.8,
                    height: 0.5,
                },
            },
            padding: Padding {
                horizontal: 12.0,
                vertical: 8.0,
            },
            window: ZoneWindow::new(6_500, 12_500),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_boundaries() {
        let window = ZoneWindow::new(1_000, 2_000);
        assert!(!window.contains(Duration::from_millis(999)));
        assert!(window.contains(Duration::from_millis(1_000)));
        assert!(window.contains(Duration::from_micros(1_999_999)));
        assert!(!window.contains(Duration::from_millis(2_000)));
    }

    #[test]
    fn empty_window_is_invalid() {
        assert!(!ZoneWindow::new(500, 500).is_valid());
        assert!(!ZoneWindow::new(600, 500).is_valid());
        assert!(ZoneWindow::new(0, 1).is_valid());
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    /// Grow the rectangle by `dx` on the left and right, `dy` on top and bottom.
    pub fn inflate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x - dx,
            y: self.y - dy,
            width: (self.width + 2.0 * dx).max(0.0),
            height: (self.height + 2.0 * dy).max(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Map a fractional region of this rectangle into absolute coordinates.
    pub fn region(&self, region: &RelativeRegion) -> Self {
        Self {
            x: self.x + self.width * region.x,
            y: self.y + self.height * region.y,
            width: self.width * region.width,
            height: self.height * region.height,
        }
    }
}

/// Region expressed as fractions (0.0..=1.0) of the measured animation bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub horizontal: f64,
    pub vertical: f64,
}

/// Where a zone's hit-box comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneGeometry {
    /// Static rectangle, independent of the animation asset.
    Fixed { rect: Rect },
    /// Sub-region of the live animation bounds, measured once the asset is ready.
    Relative { region: RelativeRegion },
}

impl ZoneGeometry {
    pub fn needs_measurement(&self) -> bool {
        matches!(self, ZoneGeometry::Relative { .. })
    }

    /// Resolve the padded hit-box. `None` when the geometry depends on bounds
    /// that are not available yet.
    pub fn resolve(&self, bounds: Option<Rect>, padding: Padding, multiplier: f64) -> Option<Rect> {
        let base = match self {
            ZoneGeometry::Fixed { rect } => *rect,
            ZoneGeometry::Relative { region } => bounds.filter(|b| !b.is_empty())?.region(region),
        };
        Some(base.inflate(
            padding.horizontal * multiplier,
            padding.vertical * multiplier,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 768.0,
        }
    }
}

/// Device-class rules for padding. Narrow viewports are treated as touch
/// devices and get wider hit-boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutRules {
    pub mobile_breakpoint_px: f64,
    pub mobile_padding_factor: f64,
}

impl Default for LayoutRules {
    fn default() -> Self {
        Self {
            mobile_breakpoint_px: 768.0,
            mobile_padding_factor: 1.5,
        }
    }
}

impl LayoutRules {
    pub fn padding_multiplier(&self, viewport: Viewport) -> f64 {
        if viewport.width < self.mobile_breakpoint_px {
            self.mobile_padding_factor
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(rect.contains(Point::new(29.9, 29.9)));
        assert!(!rect.contains(Point::new(30.0, 15.0)));
        assert!(!rect.contains(Point::new(15.0, 30.0)));
    }

    #[test]
    fn relative_geometry_waits_for_bounds() {
        let geometry = ZoneGeometry::Relative {
            region: RelativeRegion {
                x: 0.5,
                y: 0.0,
                width: 0.5,
                height: 0.5,
            },
        };
        assert!(geometry.resolve(None, Padding::default(), 1.0).is_none());
        assert!(geometry
            .resolve(Some(Rect::new(0.0, 0.0, 0.0, 10.0)), Padding::default(), 1.0)
            .is_none());

        let rect = geometry
            .resolve(
                Some(Rect::new(100.0, 50.0, 200.0, 100.0)),
                Padding {
                    horizontal: 10.0,
                    vertical: 4.0,
                },
                1.5,
            )
            .unwrap();
        assert_eq!(rect, Rect::new(185.0, 44.0, 130.0, 62.0));
    }

    #[test]
    fn narrow_viewport_widens_padding() {
        let rules = LayoutRules::default();
        let phone = Viewport {
            width: 390.0,
            height: 844.0,
        };
        assert_eq!(rules.padding_multiplier(phone), 1.5);
        assert_eq!(rules.padding_multiplier(Viewport::default()), 1.0);
    }
}

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::surface::PresentationSurface;

use super::{ActiveZone, LayoutRules, Point, ZoneSpec};

// Set to true to enable per-frame zone logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

pub type RunId = u64;

/// Decides which hit zones are clickable during one animation run and keeps
/// their hit-boxes in sync with the rendered animation.
///
/// The scheduler only owns zone state and the task handles tied to the run.
/// The widget controller owns the run itself and drives the scheduler from
/// the frame loop it spawns.
pub struct HitZoneScheduler {
    specs: Vec<ZoneSpec>,
    layout: LayoutRules,
    zones: Vec<ActiveZone>,
    run_id: Option<RunId>,
    cancel_token: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
    relayout_task: Option<JoinHandle<()>>,
    highlight: bool,
}

impl HitZoneScheduler {
    pub fn new(specs: Vec<ZoneSpec>, layout: LayoutRules) -> Self {
        Self {
            specs,
            layout,
            zones: Vec::new(),
            run_id: None,
            cancel_token: None,
            tasks: Vec::new(),
            relayout_task: None,
            highlight: false,
        }
    }

    /// Rebuild the zone set for `run_id` from zero elapsed time. Returns the
    /// token every task spawned for this run must observe.
    pub fn begin(&mut self, run_id: RunId, surface: &dyn PresentationSurface) -> CancellationToken {
        self.cancel(surface);

        let token = CancellationToken::new();
        self.run_id = Some(run_id);
        self.cancel_token = Some(token.clone());
        self.zones = self.specs.iter().cloned().map(ActiveZone::new).collect();

        for zone in &self.zones {
            surface.set_zone_visible(zone.id(), false);
        }
        self.measure(surface);
        self.sync_visibility(Duration::ZERO, surface);

        log_info!(
            "run {}: scheduling {} zones (measured: {})",
            run_id,
            self.zones.len(),
            !self.needs_measurement()
        );
        token
    }

    pub fn is_running_for(&self, run_id: RunId) -> bool {
        self.run_id == Some(run_id)
    }

    pub fn cancel_token(&self) -> Option<CancellationToken> {
        self.cancel_token.clone()
    }

    pub fn needs_measurement(&self) -> bool {
        self.zones
            .iter()
            .any(|zone| zone.rect.is_none() && zone.spec.geometry.needs_measurement())
    }

    /// Recompute hit-boxes from the current animation bounds and viewport.
    /// Zones whose geometry cannot be resolved keep their previous rectangle.
    /// Visibility flags are never touched here. Returns true once every zone
    /// has a hit-box.
    pub fn measure(&mut self, surface: &dyn PresentationSurface) -> bool {
        let multiplier = self.layout.padding_multiplier(surface.viewport());
        let bounds = surface.animation_bounds();

        for zone in &mut self.zones {
            if let Some(rect) = zone.spec.geometry.resolve(bounds, zone.spec.padding, multiplier) {
                zone.rect = Some(rect);
                surface.place_zone(&zone.spec.id, rect);
            }
        }

        !self.needs_measurement()
    }

    /// Bring every zone's visible flag in line with `elapsed`.
    pub fn sync_visibility(&mut self, elapsed: Duration, surface: &dyn PresentationSurface) {
        for zone in &mut self.zones {
            let visible = zone.spec.window.contains(elapsed);
            if zone.visible != visible {
                zone.visible = visible;
                surface.set_zone_visible(&zone.spec.id, visible);
                log_debug!(
                    "zone {} -> {} at {}ms",
                    zone.spec.id,
                    if visible { "visible" } else { "hidden" },
                    elapsed.as_millis()
                );
            }
        }
    }

    /// Open and placed. A zone that never got a hit-box cannot be hit.
    pub fn is_clickable(&self, zone_id: &str) -> bool {
        self.zones
            .iter()
            .any(|zone| zone.visible && zone.rect.is_some() && zone.spec.id == zone_id)
    }

    /// First visible zone, in configuration order, whose hit-box contains `point`.
    pub fn zone_at(&self, point: Point) -> Option<&str> {
        self.zones
            .iter()
            .find(|zone| zone.visible && zone.rect.is_some_and(|rect| rect.contains(point)))
            .map(|zone| zone.id())
    }

    pub fn zones(&self) -> &[ActiveZone] {
        &self.zones
    }

    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(handle);
    }

    /// Replace the pending relayout, so only the latest resize is applied.
    pub fn track_relayout(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.relayout_task.replace(handle) {
            previous.abort();
        }
    }

    pub fn finish_relayout(&mut self) {
        self.relayout_task = None;
    }

    /// Tasks of the current run that have not finished yet.
    pub fn pending_tasks(&self) -> usize {
        self.tasks
            .iter()
            .chain(self.relayout_task.as_ref())
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Stop the run's tasks and hide every zone. Idempotent.
    pub fn cancel(&mut self, surface: &dyn PresentationSurface) {
        let had_run = self.run_id.take();

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(task) = self.relayout_task.take() {
            task.abort();
        }
        for zone in self.zones.drain(..) {
            surface.set_zone_visible(&zone.spec.id, false);
        }

        if let Some(run_id) = had_run {
            log_info!("run {}: zones cancelled", run_id);
        }
    }

    pub fn set_highlight(&mut self, enabled: bool, surface: &dyn PresentationSurface) {
        self.highlight = enabled;
        surface.highlight_zones(enabled);
    }

    pub fn highlight(&self) -> bool {
        self.highlight
    }
}

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::Result;
use chrono::{DateTime, Utc};

use santa_widget_lib::{
    config::Timings,
    protocol::{HostChannel, OutboundKind, OutboundMessage},
    store::{ClaimBackend, OutcomeStore},
    surface::{AudioOutput, DecorVariant, PresentationSurface},
    widget::{WidgetController, WidgetDeps},
    zones::{Padding, Rect, RelativeRegion, Viewport, ZoneGeometry, ZoneSpec, ZoneWindow},
    WidgetConfig,
};

pub const TOTAL_MS: u64 = 8_000;
pub const EARLY_RECT: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 100.0,
    height: 100.0,
};
pub const ASSET_BOUNDS: Rect = Rect {
    x: 200.0,
    y: 100.0,
    width: 400.0,
    height: 200.0,
};

/// Two overlapping zones: `early` is fixed, `late` follows the animation bounds.
pub fn test_config() -> WidgetConfig {
    WidgetConfig {
        widget_id: "test-widget".into(),
        timings: Timings {
            total_duration_ms: TOTAL_MS,
            ..Timings::default()
        },
        zones: vec![
            ZoneSpec {
                id: "early".into(),
                geometry: ZoneGeometry::Fixed { rect: EARLY_RECT },
                padding: Padding::default(),
                window: ZoneWindow::new(1_000, 3_000),
            },
            ZoneSpec {
                id: "late".into(),
                geometry: ZoneGeometry::Relative {
                    region: RelativeRegion {
                        x: 0.0,
                        y: 0.0,
                        width: 0.5,
                        height: 1.0,
                    },
                },
                padding: Padding {
                    horizontal: 10.0,
                    vertical: 10.0,
                },
                window: ZoneWindow::new(2_500, 6_000),
            },
        ],
        ..WidgetConfig::default()
    }
}

#[derive(Debug, Clone)]
pub struct SurfaceState {
    pub trigger_visible: bool,
    pub trigger_fading: bool,
    pub decor: Option<DecorVariant>,
    pub animation_visible: bool,
    pub restarts: usize,
    pub flashes: usize,
    pub confirmations: usize,
    pub highlight: bool,
    pub zone_visible: HashMap<String, bool>,
    pub zone_rects: HashMap<String, Rect>,
    pub bounds: Option<Rect>,
    pub viewport: Viewport,
}

impl SurfaceState {
    pub fn visible_zone_count(&self) -> usize {
        self.zone_visible.values().filter(|visible| **visible).count()
    }
}

pub struct RecordingSurface {
    state: Mutex<SurfaceState>,
}

impl RecordingSurface {
    pub fn new(bounds: Option<Rect>) -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                trigger_visible: false,
                trigger_fading: false,
                decor: None,
                animation_visible: false,
                restarts: 0,
                flashes: 0,
                confirmations: 0,
                highlight: false,
                zone_visible: HashMap::new(),
                zone_rects: HashMap::new(),
                bounds,
                viewport: Viewport::default(),
            }),
        }
    }

    pub fn snapshot(&self) -> SurfaceState {
        self.state.lock().unwrap().clone()
    }

    pub fn set_bounds(&self, bounds: Option<Rect>) {
        self.state.lock().unwrap().bounds = bounds;
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.lock().unwrap().viewport = viewport;
    }

    fn update(&self, f: impl FnOnce(&mut SurfaceState)) {
        f(&mut self.state.lock().unwrap());
    }
}

impl PresentationSurface for RecordingSurface {
    fn show_trigger(&self) {
        self.update(|s| s.trigger_visible = true);
    }

    fn fade_out_trigger(&self) {
        self.update(|s| s.trigger_fading = true);
    }

    fn hide_trigger(&self) {
        self.update(|s| s.trigger_visible = false);
    }

    fn apply_decor(&self, variant: DecorVariant) {
        self.update(|s| s.decor = Some(variant));
    }

    fn show_animation(&self) {
        self.update(|s| s.animation_visible = true);
    }

    fn restart_animation(&self) {
        self.update(|s| s.restarts += 1);
    }

    fn flash_animation(&self) {
        self.update(|s| s.flashes += 1);
    }

    fn hide_animation(&self) {
        self.update(|s| s.animation_visible = false);
    }

    fn animation_bounds(&self) -> Option<Rect> {
        self.state.lock().unwrap().bounds
    }

    fn viewport(&self) -> Viewport {
        self.state.lock().unwrap().viewport
    }

    fn place_zone(&self, zone_id: &str, rect: Rect) {
        self.update(|s| {
            s.zone_rects.insert(zone_id.to_string(), rect);
        });
    }

    fn set_zone_visible(&self, zone_id: &str, visible: bool) {
        self.update(|s| {
            s.zone_visible.insert(zone_id.to_string(), visible);
        });
    }

    fn highlight_zones(&self, enabled: bool) {
        self.update(|s| s.highlight = enabled);
    }

    fn show_confirmation(&self) {
        self.update(|s| s.confirmations += 1);
    }
}

pub struct RecordingHost {
    embedded: bool,
    messages: Mutex<Vec<OutboundMessage>>,
}

impl RecordingHost {
    pub fn new(embedded: bool) -> Self {
        Self {
            embedded,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<OutboundKind> {
        self.messages().iter().map(|m| m.kind).collect()
    }

    pub fn count(&self, kind: OutboundKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

impl HostChannel for RecordingHost {
    fn is_embedded(&self) -> bool {
        self.embedded
    }

    fn post(&self, message: &OutboundMessage) -> Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// In-memory claim backend shared across simulated reloads.
#[derive(Default)]
pub struct CountingBackend {
    claimed_at: Mutex<Option<DateTime<Utc>>>,
    saves: AtomicUsize,
}

impl CountingBackend {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ClaimBackend for CountingBackend {
    fn load(&self, _widget_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(*self.claimed_at.lock().unwrap())
    }

    fn save(&self, _widget_id: &str, claimed_at: DateTime<Utc>) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.claimed_at.lock().unwrap().get_or_insert(claimed_at);
        Ok(())
    }
}

pub struct ScriptedAudio {
    fail: bool,
    plays: AtomicUsize,
}

impl ScriptedAudio {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            plays: AtomicUsize::new(0),
        }
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl AudioOutput for ScriptedAudio {
    fn play(&self) -> Result<(), String> {
        if self.fail {
            return Err("NotAllowedError: play() requires a user gesture".into());
        }
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {}
}

pub struct Fixture {
    pub controller: WidgetController,
    pub surface: Arc<RecordingSurface>,
    pub host: Arc<RecordingHost>,
    pub backend: Arc<CountingBackend>,
    pub audio: Arc<ScriptedAudio>,
}

pub struct FixtureBuilder {
    config: WidgetConfig,
    bounds: Option<Rect>,
    embedded: bool,
    audio_fails: bool,
    backend: Option<Arc<CountingBackend>>,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            bounds: Some(ASSET_BOUNDS),
            embedded: true,
            audio_fails: false,
            backend: None,
        }
    }

    pub fn bounds(mut self, bounds: Option<Rect>) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn standalone(mut self) -> Self {
        self.embedded = false;
        self
    }

    pub fn audio_fails(mut self) -> Self {
        self.audio_fails = true;
        self
    }

    pub fn backend(mut self, backend: Arc<CountingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Fixture {
        let surface = Arc::new(RecordingSurface::new(self.bounds));
        let host = Arc::new(RecordingHost::new(self.embedded));
        let backend = self.backend.unwrap_or_default();
        let audio = Arc::new(ScriptedAudio::new(self.audio_fails));
        let store = OutcomeStore::new(self.config.widget_id.clone(), backend.clone());

        let controller = WidgetController::new(
            self.config,
            WidgetDeps {
                surface: surface.clone(),
                host: host.clone(),
                audio: audio.clone(),
                store,
            },
        );

        Fixture {
            controller,
            surface,
            host,
            backend,
            audio,
        }
    }
}

pub fn fixture() -> Fixture {
    FixtureBuilder::new().build()
}

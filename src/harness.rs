//! Console host for running the widget core without a browser.
//!
//! Presentation changes are logged, outbound messages are printed to stdout
//! one JSON document per line, and stdin drives the widget: JSON lines are
//! treated as host messages, anything else as a harness command.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    config::{WidgetConfig, CONFIG_ENV},
    launch::SameContext,
    protocol::{HostChannel, OutboundMessage},
    store::OutcomeStore,
    surface::{AudioOutput, DecorVariant, PresentationSurface},
    widget::{WidgetController, WidgetDeps},
    zones::{Point, Rect, Viewport},
};

const DEFAULT_CONFIG_PATH: &str = "santa-widget.json";
const STANDALONE_ENV: &str = "SANTA_WIDGET_STANDALONE";

#[derive(Debug, Clone, PartialEq)]
pub enum HarnessCommand {
    Trigger,
    Hit(String),
    Tap(Point),
    Resize(Viewport),
    AssetReady,
    Sound,
    Stop,
    State,
    Quit,
    Host(String),
}

impl HarnessCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.starts_with('{') {
            return Ok(HarnessCommand::Host(line.to_string()));
        }

        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| anyhow!("empty command"))?;

        let command = match verb {
            "trigger" => HarnessCommand::Trigger,
            "hit" => HarnessCommand::Hit(
                parts
                    .next()
                    .ok_or_else(|| anyhow!("hit needs a zone id"))?
                    .to_string(),
            ),
            "tap" => {
                let x = next_number(&mut parts, verb, "x")?;
                let y = next_number(&mut parts, verb, "y")?;
                HarnessCommand::Tap(Point::new(x, y))
            }
            "resize" => {
                let width = next_number(&mut parts, verb, "width")?;
                let height = next_number(&mut parts, verb, "height")?;
                HarnessCommand::Resize(Viewport { width, height })
            }
            "ready" => HarnessCommand::AssetReady,
            "sound" => HarnessCommand::Sound,
            "stop" => HarnessCommand::Stop,
            "state" => HarnessCommand::State,
            "quit" | "exit" => HarnessCommand::Quit,
            other => return Err(anyhow!("unknown command {other:?}")),
        };
        Ok(command)
    }
}

fn next_number<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    verb: &str,
    name: &str,
) -> Result<f64> {
    parts
        .next()
        .ok_or_else(|| anyhow!("{verb} needs {name}"))?
        .parse::<f64>()
        .with_context(|| format!("{verb}: {name} is not a number"))
}

/// Surface that logs every change. The animation is "loaded" only after a
/// `ready` command so the measurement retry path can be exercised by hand.
pub struct ConsoleSurface {
    viewport: Mutex<Viewport>,
    bounds: Mutex<Option<Rect>>,
    asset_bounds: Rect,
}

impl ConsoleSurface {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport: Mutex::new(viewport),
            bounds: Mutex::new(None),
            asset_bounds: Rect::new(0.0, 0.0, 827.0, 256.0),
        }
    }

    fn set_viewport(&self, viewport: Viewport) {
        if let Ok(mut guard) = self.viewport.lock() {
            *guard = viewport;
        }
    }

    fn mark_asset_ready(&self) {
        if let Ok(mut guard) = self.bounds.lock() {
            *guard = Some(self.asset_bounds);
        }
    }
}

impl PresentationSurface for ConsoleSurface {
    fn show_trigger(&self) {
        info!("[surface] trigger shown");
    }

    fn fade_out_trigger(&self) {
        info!("[surface] trigger fading out");
    }

    fn hide_trigger(&self) {
        info!("[surface] trigger hidden");
    }

    fn apply_decor(&self, variant: DecorVariant) {
        info!("[surface] decor -> {:?}", variant);
    }

    fn show_animation(&self) {
        info!("[surface] animation shown");
    }

    fn restart_animation(&self) {
        if let Ok(mut guard) = self.bounds.lock() {
            *guard = None;
        }
        info!("[surface] animation reloading (send `ready` once loaded)");
    }

    fn flash_animation(&self) {
        info!("[surface] animation flash");
    }

    fn hide_animation(&self) {
        info!("[surface] animation hidden");
    }

    fn animation_bounds(&self) -> Option<Rect> {
        self.bounds.lock().ok().and_then(|guard| *guard)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
            .lock()
            .map(|guard| *guard)
            .unwrap_or_default()
    }

    fn place_zone(&self, zone_id: &str, rect: Rect) {
        info!("[surface] zone {zone_id} at {rect:?}");
    }

    fn set_zone_visible(&self, zone_id: &str, visible: bool) {
        info!("[surface] zone {zone_id} visible={visible}");
    }

    fn highlight_zones(&self, enabled: bool) {
        info!("[surface] zone highlight={enabled}");
    }

    fn show_confirmation(&self) {
        info!("[surface] You caught Santa!");
    }
}

/// Prints every outbound message as a JSON line on stdout.
pub struct StdoutHost {
    embedded: bool,
}

impl HostChannel for StdoutHost {
    fn is_embedded(&self) -> bool {
        self.embedded
    }

    fn post(&self, message: &OutboundMessage) -> Result<()> {
        println!("{}", message.to_json()?);
        Ok(())
    }
}

#[derive(Default)]
pub struct ConsoleAudio {
    playing: AtomicBool,
}

impl AudioOutput for ConsoleAudio {
    fn play(&self) -> Result<(), String> {
        self.playing.store(true, Ordering::SeqCst);
        info!("[audio] playing");
        Ok(())
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
        info!("[audio] stopped");
    }
}

pub async fn run_console() -> Result<()> {
    let config_path = std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = WidgetConfig::load(&config_path)?;
    config.apply_env_overrides();

    let store = OutcomeStore::open(&config.storage, config.widget_id.clone());
    let surface = Arc::new(ConsoleSurface::new(Viewport::default()));
    let embedded = std::env::var(STANDALONE_ENV).map_or(true, |value| value != "1");

    let controller = WidgetController::new(
        config,
        WidgetDeps {
            surface: surface.clone(),
            host: Arc::new(StdoutHost { embedded }),
            audio: Arc::new(ConsoleAudio::default()),
            store,
        },
    );

    let query = std::env::args().nth(1).unwrap_or_default();
    let initial = controller.init(&SameContext::new(&query)).await;
    info!("widget ready in {:?}; type `quit` to exit", initial);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match HarnessCommand::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                warn!("{err:#}");
                continue;
            }
        };

        match command {
            HarnessCommand::Trigger => {
                controller.click_trigger().await;
            }
            HarnessCommand::Hit(zone) => {
                let result = controller.click_zone(&zone).await;
                info!("hit {zone}: {result:?}");
            }
            HarnessCommand::Tap(point) => {
                let result = controller.click_at(point).await;
                info!("tap {point:?}: {result:?}");
            }
            HarnessCommand::Resize(viewport) => {
                surface.set_viewport(viewport);
                controller.on_viewport_resize().await;
            }
            HarnessCommand::AssetReady => {
                surface.mark_asset_ready();
                controller.on_asset_ready().await;
            }
            HarnessCommand::Sound => {
                controller.toggle_sound().await;
            }
            HarnessCommand::Stop => {
                controller.stop_animation().await;
            }
            HarnessCommand::State => {
                let snapshot = controller.snapshot().await;
                info!("{}", serde_json::to_string(&snapshot)?);
            }
            HarnessCommand::Quit => break,
            HarnessCommand::Host(raw) => {
                if controller.handle_host_message(&raw).await.is_none() {
                    warn!("host message ignored");
                }
            }
        }
    }

    controller.shutdown().await;
    info!("Santa widget harness shutting down");
    Ok(())
}

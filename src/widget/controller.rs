use std::{sync::Arc, time::Duration};

use log::error;
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::WidgetConfig,
    launch::{EnvironmentQuery, LaunchDirectives},
    protocol::{HostChannel, InboundCommand, ProtocolAdapter, WidgetEvent},
    store::OutcomeStore,
    surface::{AudioOutput, DecorVariant, PresentationSurface},
    zones::{scheduler::RunId, HitZoneScheduler, Point},
};

use super::{AnimationRun, RunOutcome, WidgetSnapshot, WidgetState};

// Set to true to enable verbose lifecycle logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// External collaborators the controller drives.
#[derive(Clone)]
pub struct WidgetDeps {
    pub surface: Arc<dyn PresentationSurface>,
    pub host: Arc<dyn HostChannel>,
    pub audio: Arc<dyn AudioOutput>,
    pub store: OutcomeStore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    Zone(String),
    Point(Point),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HitResult {
    /// The hit landed inside an open zone and resolved the run.
    Caught,
    /// A run is active but no zone was open at that spot or instant.
    Missed,
    /// No active run.
    Ignored,
}

struct WidgetInner {
    state: WidgetState,
    trigger_fired: bool,
    run: Option<AnimationRun>,
    last_run_id: RunId,
    last_outcome: Option<RunOutcome>,
    scheduler: HitZoneScheduler,
    sound_on: bool,
    deferred: Vec<JoinHandle<()>>,
}

impl WidgetInner {
    fn active_run(&self) -> Option<&AnimationRun> {
        self.run.as_ref().filter(|run| !run.resolved)
    }

    fn defer(&mut self, handle: JoinHandle<()>) {
        self.deferred.retain(|task| !task.is_finished());
        self.deferred.push(handle);
    }
}

/// The widget state machine. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct WidgetController {
    inner: Arc<Mutex<WidgetInner>>,
    config: Arc<WidgetConfig>,
    surface: Arc<dyn PresentationSurface>,
    audio: Arc<dyn AudioOutput>,
    store: OutcomeStore,
    adapter: ProtocolAdapter,
}

impl WidgetController {
    pub fn new(config: WidgetConfig, deps: WidgetDeps) -> Self {
        let scheduler = HitZoneScheduler::new(config.zones.clone(), config.layout);
        let adapter = ProtocolAdapter::new(deps.host, config.message_source.clone());

        Self {
            inner: Arc::new(Mutex::new(WidgetInner {
                state: WidgetState::Default,
                trigger_fired: false,
                run: None,
                last_run_id: 0,
                last_outcome: None,
                scheduler,
                sound_on: false,
                deferred: Vec::new(),
            })),
            config: Arc::new(config),
            surface: deps.surface,
            audio: deps.audio,
            store: deps.store,
            adapter,
        }
    }

    /// Decide the starting state from launch parameters and the stored claim,
    /// and put the surface in the matching shape.
    pub async fn init(&self, env: &dyn EnvironmentQuery) -> WidgetState {
        let directives = LaunchDirectives::resolve(env);
        let claimed = self.store.is_claimed();
        let initial = WidgetState::initial(directives, claimed);

        let mut inner = self.inner.lock().await;
        let surface = self.surface.as_ref();

        surface.hide_animation();
        if self.config.debug_zones {
            inner.scheduler.set_highlight(true, surface);
        }

        inner.state = initial;
        match initial {
            WidgetState::Default => {
                surface.apply_decor(DecorVariant::Default);
                surface.show_trigger();
            }
            WidgetState::Resolved => {
                inner.trigger_fired = true;
                surface.hide_trigger();
                surface.apply_decor(DecorVariant::Triggered);
            }
            WidgetState::AnimationActive => {
                inner.trigger_fired = true;
                surface.hide_trigger();
                surface.apply_decor(DecorVariant::Triggered);
                self.start_run_locked(&mut inner);
            }
        }

        log_info!(
            "widget {} initialised in {:?} (claimed: {}, directives: {:?})",
            self.store.widget_id(),
            initial,
            claimed,
            directives
        );
        initial
    }

    pub async fn state(&self) -> WidgetState {
        self.inner.lock().await.state
    }

    pub async fn snapshot(&self) -> WidgetSnapshot {
        let inner = self.inner.lock().await;
        let now = Instant::now();
        WidgetSnapshot {
            state: inner.state,
            trigger_fired: inner.trigger_fired,
            run_id: inner.active_run().map(|run| run.id),
            elapsed_ms: inner
                .active_run()
                .map(|run| run.elapsed_at(now).as_millis() as u64),
            visible_zones: inner
                .scheduler
                .zones()
                .iter()
                .filter(|zone| zone.visible)
                .map(|zone| zone.id().to_string())
                .collect(),
            sound_on: inner.sound_on,
            debug_zones: inner.scheduler.highlight(),
            pending_tasks: inner.scheduler.pending_tasks()
                + inner.deferred.iter().filter(|task| !task.is_finished()).count(),
            last_outcome: inner.last_outcome,
        }
    }

    /// First user click on the trigger zone. Later clicks are no-ops.
    pub async fn click_trigger(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != WidgetState::Default || inner.trigger_fired {
            log_debug!("trigger click ignored in {:?}", inner.state);
            return false;
        }

        inner.trigger_fired = true;
        inner.state = WidgetState::AnimationActive;

        let surface = self.surface.as_ref();
        surface.fade_out_trigger();
        surface.apply_decor(DecorVariant::Triggered);
        self.adapter.emit(WidgetEvent::TriggerFired, surface);

        let fade = Duration::from_millis(self.config.timings.trigger_fade_ms);
        let fading_surface = self.surface.clone();
        inner.defer(tokio::spawn(async move {
            time::sleep(fade).await;
            fading_surface.hide_trigger();
        }));

        let delay = Duration::from_millis(self.config.timings.start_delay_ms);
        let controller = self.clone();
        inner.defer(tokio::spawn(async move {
            time::sleep(delay).await;
            controller.start_animation().await;
        }));

        log_info!("trigger fired, animation starts in {}ms", delay.as_millis());
        true
    }

    /// Host-forced activation. Acts only from `Default`: a resolved widget
    /// stays resolved and an active or pending run is left alone.
    pub async fn activate(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != WidgetState::Default {
            log_info!("forced activation ignored in {:?}", inner.state);
            return false;
        }

        inner.trigger_fired = true;
        inner.state = WidgetState::AnimationActive;
        self.surface.hide_trigger();
        self.surface.apply_decor(DecorVariant::Triggered);
        self.start_run_locked(&mut inner)
    }

    /// Start a run. Rejected unless the widget is active with no run in flight.
    pub async fn start_animation(&self) -> bool {
        let mut inner = self.inner.lock().await;
        self.start_run_locked(&mut inner)
    }

    fn start_run_locked(&self, inner: &mut WidgetInner) -> bool {
        if inner.state != WidgetState::AnimationActive {
            log_debug!("start rejected in {:?}", inner.state);
            return false;
        }
        if let Some(run) = inner.active_run() {
            log_debug!("start rejected, run {} already active", run.id);
            return false;
        }
        if self.store.is_claimed() {
            log_info!("prize already claimed, resolving instead of starting");
            inner.state = WidgetState::Resolved;
            self.surface.hide_animation();
            return false;
        }

        inner.last_run_id += 1;
        let run_id = inner.last_run_id;
        inner.run = Some(AnimationRun::new(
            run_id,
            Instant::now(),
            self.config.timings.total_duration(),
        ));

        let surface = self.surface.as_ref();
        surface.show_animation();
        surface.restart_animation();

        let token = inner.scheduler.begin(run_id, surface);
        let frame_loop = self.spawn_frame_loop(run_id, token.clone());
        inner.scheduler.track(frame_loop);

        if inner.scheduler.needs_measurement() {
            let retries = self.spawn_measure_retries(run_id, token);
            inner.scheduler.track(retries);
        }

        log_info!("run {} started ({}ms)", run_id, self.config.timings.total_duration_ms);
        true
    }

    fn spawn_frame_loop(&self, run_id: RunId, token: CancellationToken) -> JoinHandle<()> {
        let controller = self.clone();
        let period = Duration::from_millis(self.config.timings.frame_interval_ms);

        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !controller.advance_frame(run_id).await {
                            break;
                        }
                    }
                    _ = token.cancelled() => break,
                }
            }
        })
    }

    fn spawn_measure_retries(&self, run_id: RunId, token: CancellationToken) -> JoinHandle<()> {
        let controller = self.clone();
        let delay = Duration::from_millis(self.config.timings.measure_retry_delay_ms);
        let limit = self.config.timings.measure_retry_limit;

        tokio::spawn(async move {
            for attempt in 1..=limit {
                tokio::select! {
                    _ = time::sleep(delay) => {}
                    _ = token.cancelled() => return,
                }
                if controller.retry_measure(run_id).await {
                    return;
                }
                log_debug!("run {}: measurement attempt {} found no bounds", run_id, attempt);
            }
            log_warn!(
                "run {}: animation bounds unavailable after {} attempts, continuing without hit-boxes",
                run_id,
                limit
            );
        })
    }

    /// One tick of the update loop. Returns false once the loop should stop.
    pub async fn advance_frame(&self, run_id: RunId) -> bool {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let (elapsed, over) = match inner.active_run() {
            Some(run) if run.id == run_id => (run.elapsed_at(now), run.is_over_at(now)),
            _ => return false,
        };

        if over {
            self.finish_run_locked(&mut inner, RunOutcome::TimedOut);
            return false;
        }

        inner.scheduler.sync_visibility(elapsed, self.surface.as_ref());
        true
    }

    /// Returns true when no further measurement attempts are needed.
    async fn retry_measure(&self, run_id: RunId) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.scheduler.is_running_for(run_id) {
            return true;
        }
        inner.scheduler.measure(self.surface.as_ref())
    }

    /// The animation asset finished loading. Hit-boxes are recomputed from the
    /// fresh bounds even if an earlier measurement already placed them.
    pub async fn on_asset_ready(&self) {
        let mut inner = self.inner.lock().await;
        if inner.active_run().is_none() {
            return;
        }
        if inner.scheduler.measure(self.surface.as_ref()) {
            log_info!("zones measured after asset became ready");
        }
    }

    /// Viewport resized or rotated. Hit-boxes are recomputed after a short
    /// debounce; zone timing is not affected.
    pub async fn on_viewport_resize(&self) {
        let mut inner = self.inner.lock().await;
        let Some(run_id) = inner.active_run().map(|run| run.id) else {
            return;
        };
        let Some(token) = inner.scheduler.cancel_token() else {
            return;
        };

        let controller = self.clone();
        let debounce = Duration::from_millis(self.config.timings.resize_debounce_ms);
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(debounce) => controller.relayout(run_id).await,
                _ = token.cancelled() => {}
            }
        });
        inner.scheduler.track_relayout(handle);
    }

    async fn relayout(&self, run_id: RunId) {
        let mut inner = self.inner.lock().await;
        if !inner.scheduler.is_running_for(run_id) {
            return;
        }
        inner.scheduler.finish_relayout();
        inner.scheduler.measure(self.surface.as_ref());
        log_debug!("run {}: zones relaid out", run_id);
    }

    pub async fn click_zone(&self, zone_id: &str) -> HitResult {
        self.register_hit(HitTarget::Zone(zone_id.to_string())).await
    }

    pub async fn click_at(&self, point: Point) -> HitResult {
        self.register_hit(HitTarget::Point(point)).await
    }

    pub async fn register_hit(&self, target: HitTarget) -> HitResult {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let (elapsed, over) = match inner.active_run() {
            Some(run) => (run.elapsed_at(now), run.is_over_at(now)),
            None => {
                log_debug!("hit {:?} ignored, no active run", target);
                return HitResult::Ignored;
            }
        };

        if over {
            self.finish_run_locked(&mut inner, RunOutcome::TimedOut);
            return HitResult::Ignored;
        }

        inner.scheduler.sync_visibility(elapsed, self.surface.as_ref());
        let hit_zone = match &target {
            HitTarget::Zone(id) => inner
                .scheduler
                .is_clickable(id)
                .then(|| id.clone()),
            HitTarget::Point(point) => inner.scheduler.zone_at(*point).map(str::to_owned),
        };

        match hit_zone {
            Some(zone_id) => {
                log_info!("mascot caught in zone {} at {}ms", zone_id, elapsed.as_millis());
                self.finish_run_locked(&mut inner, RunOutcome::Caught);
                HitResult::Caught
            }
            None => {
                log_debug!("miss {:?} at {}ms", target, elapsed.as_millis());
                HitResult::Missed
            }
        }
    }

    /// End an active run without a claim and without notifying the host.
    pub async fn stop_animation(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.active_run().is_none() {
            return false;
        }
        self.finish_run_locked(&mut inner, RunOutcome::Stopped);
        true
    }

    fn finish_run_locked(&self, inner: &mut WidgetInner, outcome: RunOutcome) {
        let Some(run) = inner.run.as_mut().filter(|run| !run.resolved) else {
            return;
        };
        run.resolved = true;
        let run_id = run.id;

        let surface = self.surface.as_ref();
        inner.scheduler.cancel(surface);
        inner.state = WidgetState::Resolved;
        inner.last_outcome = Some(outcome);

        match outcome {
            RunOutcome::Caught => {
                self.store.mark_claimed();
                surface.flash_animation();
                self.adapter.emit(WidgetEvent::MascotCaught, surface);

                let flash = Duration::from_millis(self.config.timings.hit_flash_ms);
                let flashing_surface = self.surface.clone();
                inner.defer(tokio::spawn(async move {
                    time::sleep(flash).await;
                    flashing_surface.hide_animation();
                }));
            }
            RunOutcome::TimedOut => {
                surface.hide_animation();
                self.adapter.emit(WidgetEvent::RunEnded, surface);
            }
            RunOutcome::Stopped => {
                surface.hide_animation();
            }
        }

        log_info!("run {} resolved: {:?}", run_id, outcome);
    }

    /// Flip background music. Turning on can fail, in which case nothing changes.
    pub async fn toggle_sound(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.sound_on {
            self.audio.stop();
            inner.sound_on = false;
        } else {
            match self.audio.play() {
                Ok(()) => inner.sound_on = true,
                Err(err) => {
                    error!("audio playback rejected: {err}");
                    return false;
                }
            }
        }

        self.adapter.emit(
            WidgetEvent::SoundChanged {
                on: inner.sound_on,
            },
            self.surface.as_ref(),
        );
        inner.sound_on
    }

    /// Visual-only highlight of zone boundaries.
    pub async fn set_debug_zones(&self, enabled: bool) {
        let mut inner = self.inner.lock().await;
        inner.scheduler.set_highlight(enabled, self.surface.as_ref());
    }

    /// Apply a raw message from the host page. Unknown or malformed
    /// messages are dropped; returns the command that was applied.
    pub async fn handle_host_message(&self, raw: &str) -> Option<InboundCommand> {
        let command = self.adapter.decode(raw)?;
        match &command {
            InboundCommand::ShowDebugZones { value } => self.set_debug_zones(*value).await,
            InboundCommand::ActivateGroup2 => {
                self.activate().await;
            }
        }
        Some(command)
    }

    /// Cancel every outstanding task. The state is left as is.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.scheduler.cancel(self.surface.as_ref());
        for task in inner.deferred.drain(..) {
            task.abort();
        }
    }
}

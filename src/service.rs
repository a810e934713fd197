//! Overlay service - the event-loop owner of the launcher
//!
//! Everything runs on one calloop event loop: lifecycle commands arrive
//! through a channel, touch samples are routed into the active overlay
//! session, and the selection confirmation timer is the only other event
//! source. All state transitions for a session therefore execute strictly
//! sequentially; the timer callback lands on the same loop and is guarded
//! by session id and confirmation sequence, so a completion that raced a
//! teardown can never confirm a selection.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use calloop::channel;
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopHandle, LoopSignal, RegistrationToken};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::apps::AppIndex;
use crate::config::{state_dir, LaunchConfig, ScreenMetrics, UserSettings};
use crate::demo;
use crate::icons::{self, IconCache};
use crate::input::{
    activation_strip_rect, Point, Rect, RoutingDecision, TouchRouter, TouchSample,
};
use crate::lane::{LaneEntry, LaneState, PresentationSink};
use crate::model::{pagination, EntryId, EntryTree};
use crate::session::{OverlaySession, SessionEffect};
use crate::storage::EntriesStore;

/// Lifecycle triggers the platform feeds the service. Orientation changes
/// arrive as `ConfigChanged` (the geometry snapshot is stale either way).
#[derive(Debug, Clone)]
pub enum ServiceCommand {
    /// Show the launcher (strip armed, sessions allowed)
    Activate,
    /// Hide the launcher entirely
    Deactivate,
    /// User-requested pause; persisted across restarts
    Pause,
    /// Resume from pause; persisted across restarts
    Play,
    /// Entries changed; rebuild the tree, keep a running session on its
    /// old snapshot
    DataChanged,
    /// Settings/geometry changed; rebuild everything, end a running session
    ConfigChanged,
    ScreenOff,
    OutsideTouch,
    FocusLost,
    /// One raw pointer sample from the capture strip
    Touch(TouchSample),
    Quit,
}

/// Persisted pause/play flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceState {
    pub is_active: bool,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self { is_active: true }
    }
}

impl ServiceState {
    fn path() -> std::path::PathBuf {
        state_dir().join("service.json")
    }

    pub fn load() -> Self {
        if let Ok(contents) = std::fs::read_to_string(Self::path()) {
            if let Ok(state) = serde_json::from_str::<Self>(&contents) {
                return state;
            }
        }
        Self::default()
    }

    pub fn save(&self) {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(self) {
            if let Err(e) = std::fs::write(&path, json) {
                warn!("Failed to save service state: {:?}", e);
            }
        }
    }
}

/// Presentation sink that narrates lane changes to the log. A rendering
/// frontend replaces this with something that actually draws; the tint
/// decision (icon dominant color vs. frame color) lives here either way.
struct LogPresenter {
    icons: Rc<RefCell<IconCache>>,
    frame_default_color: [f32; 4],
}

impl LogPresenter {
    fn indicator_color(&mut self, entry: &LaneEntry) -> [f32; 4] {
        if entry.use_icon_color {
            if let Some(name) = &entry.icon {
                let mut cache = self.icons.borrow_mut();
                if let Some(data) = cache.get(name) {
                    return icons::dominant_color(data, self.frame_default_color);
                }
            }
        }
        self.frame_default_color
    }
}

impl PresentationSink for LogPresenter {
    fn on_item_selecting(&mut self, entry: Option<&LaneEntry>) {
        match entry {
            Some(entry) => {
                let color = self.indicator_color(entry);
                info!(name = %entry.name, ?color, "item selecting");
            }
            None => debug!("selection cleared"),
        }
    }

    fn on_item_selected(&mut self, entry: &LaneEntry) {
        info!(name = %entry.name, folder = entry.is_folder, "item selected");
    }

    fn on_state_changed(&mut self, old: LaneState, new: LaneState) {
        debug!(?old, ?new, "lane state changed");
    }
}

pub struct OverlayService {
    loop_handle: LoopHandle<'static, OverlayService>,
    signal: LoopSignal,
    settings: UserSettings,
    metrics: ScreenMetrics,
    config: LaunchConfig,
    router: TouchRouter,
    store: EntriesStore,
    apps: AppIndex,
    state: ServiceState,
    icon_cache: Rc<RefCell<IconCache>>,
    tree: Option<Rc<EntryTree>>,
    session: Option<OverlaySession>,
    timer_token: Option<RegistrationToken>,
    next_session_id: u64,
    /// Demo mode: log launches instead of spawning them
    dry_run: bool,
}

/// Build the service and drive it on a fresh event loop until Quit
pub fn run(settings: UserSettings, metrics: ScreenMetrics, demo_mode: bool) -> Result<()> {
    let mut event_loop = EventLoop::<'static, OverlayService>::try_new()
        .map_err(|e| anyhow::anyhow!("Failed to create event loop: {:?}", e))?;
    let handle = event_loop.handle();

    let (sender, commands) = channel::channel();
    let mut service = OverlayService::new(
        handle.clone(),
        event_loop.get_signal(),
        settings,
        metrics,
        demo_mode,
    )?;

    handle
        .insert_source(commands, |event, _, state: &mut OverlayService| match event {
            channel::Event::Msg(cmd) => state.handle_command(cmd),
            channel::Event::Closed => state.signal.stop(),
        })
        .map_err(|e| anyhow::anyhow!("Failed to insert command channel: {:?}", e))?;

    service.handle_command(ServiceCommand::Activate);

    if demo_mode {
        demo::install(&handle, sender.clone(), &service.config, &service.metrics)?;
    }

    // The platform glue owns clones of this sender; dropping the last one
    // closes the channel and stops the loop.
    let _sender_guard = sender;

    info!("Entering event loop");
    event_loop
        .run(None::<Duration>, &mut service, |_| {})
        .map_err(|e| anyhow::anyhow!("Event loop error: {:?}", e))?;

    Ok(())
}

impl OverlayService {
    fn new(
        loop_handle: LoopHandle<'static, OverlayService>,
        signal: LoopSignal,
        settings: UserSettings,
        metrics: ScreenMetrics,
        demo_mode: bool,
    ) -> Result<Self> {
        // A bad geometry snapshot at boot is a configuration bug; surface
        // it instead of guessing.
        let config = LaunchConfig::snapshot(&settings, &metrics)?;
        let router = Self::build_router(&config, &metrics);

        let apps = AppIndex::scan();
        let mut store = EntriesStore::open(EntriesStore::default_path());
        if store.is_empty() && !apps.entries.is_empty() {
            store.seed_from_apps(&apps.entries, 8);
        }

        let icon_size = config.lane_width_px.max(1) as u32;
        Ok(Self {
            loop_handle,
            signal,
            settings,
            metrics,
            config,
            router,
            store,
            apps,
            state: ServiceState::load(),
            icon_cache: Rc::new(RefCell::new(IconCache::new(icon_size))),
            tree: None,
            session: None,
            timer_token: None,
            next_session_id: 0,
            dry_run: demo_mode,
        })
    }

    /// Activation strip as a router: the strip's own coordinate space for
    /// gating, its screen origin for the remap into the full-screen overlay
    fn build_router(config: &LaunchConfig, metrics: &ScreenMetrics) -> TouchRouter {
        let screen = Rect::from_size(0.0, 0.0, metrics.width_px as f64, metrics.height_px as f64);
        let strip = activation_strip_rect(
            config.sensitivity_px as f64,
            config.activation_offset_position_px as f64,
            config.activation_offset_size_px as f64,
            config.is_on_right_side,
            screen,
        );
        debug!(?strip, "activation strip placed");
        TouchRouter::new(
            Rect::from_size(0.0, 0.0, strip.width(), strip.height()),
            strip.origin(),
            Point::new(0.0, 0.0),
        )
    }

    pub fn handle_command(&mut self, cmd: ServiceCommand) {
        debug!(?cmd, "service command");
        match cmd {
            ServiceCommand::Activate | ServiceCommand::Play => {
                self.state.is_active = true;
                self.state.save();
                self.ensure_tree();
            }
            ServiceCommand::Deactivate | ServiceCommand::Pause => {
                self.state.is_active = false;
                self.state.save();
                self.finish_session();
            }
            ServiceCommand::DataChanged => {
                // The running session keeps its snapshot; the new tree is
                // picked up by the next begin()
                self.rebuild_tree();
            }
            ServiceCommand::ConfigChanged => {
                self.reload_config();
                self.rebuild_tree();
                self.finish_session();
            }
            ServiceCommand::ScreenOff
            | ServiceCommand::OutsideTouch
            | ServiceCommand::FocusLost => {
                self.finish_session();
            }
            ServiceCommand::Touch(sample) => self.handle_touch(&sample),
            ServiceCommand::Quit => {
                self.finish_session();
                self.signal.stop();
            }
        }
    }

    fn handle_touch(&mut self, sample: &TouchSample) {
        if !self.state.is_active {
            return;
        }

        if self.session.is_some() {
            let effects = self
                .session
                .as_mut()
                .map(|s| s.feed(sample))
                .unwrap_or_default();
            self.apply_effects(effects);
            return;
        }

        match self.router.route(false, sample) {
            RoutingDecision::StartSession => self.start_session(sample),
            // Not consumed: the touch belongs to whatever is underneath
            RoutingDecision::Ignore | RoutingDecision::Forward { .. } => {}
        }
    }

    fn start_session(&mut self, sample: &TouchSample) {
        self.ensure_tree();
        let Some(tree) = self.tree.clone() else {
            warn!("no entry tree; ignoring activation touch");
            return;
        };

        let sink = LogPresenter {
            icons: self.icon_cache.clone(),
            frame_default_color: self.config.frame_default_color,
        };

        let id = self.next_session_id;
        self.next_session_id += 1;

        let (session, effects) = OverlaySession::begin(
            id,
            tree,
            self.config.clone(),
            self.router.clone(),
            self.metrics.width_px as f64,
            self.metrics.extent_along_layout_axis() as f64,
            Box::new(sink),
            sample,
        );
        self.session = Some(session);
        self.apply_effects(effects);
    }

    fn apply_effects(&mut self, effects: Vec<SessionEffect>) {
        for effect in effects {
            match effect {
                SessionEffect::ScheduleConfirmation { seq, delay } => {
                    self.schedule_confirmation(seq, delay);
                }
                SessionEffect::CancelConfirmation => self.cancel_confirmation(),
                SessionEffect::Launch {
                    entry,
                    name,
                    target,
                } => self.launch(&name, &target, entry),
                SessionEffect::Finished => {
                    self.cancel_confirmation();
                    self.session = None;
                }
            }
        }
    }

    fn schedule_confirmation(&mut self, seq: u64, delay: Duration) {
        self.cancel_confirmation();
        let Some(session_id) = self.session.as_ref().map(|s| s.id()) else {
            return;
        };

        let timer = Timer::from_duration(delay);
        let inserted = self
            .loop_handle
            .insert_source(timer, move |_, _, state: &mut OverlayService| {
                state.confirmation_fired(session_id, seq);
                TimeoutAction::Drop
            });
        match inserted {
            Ok(token) => self.timer_token = Some(token),
            Err(e) => warn!("Failed to schedule confirmation timer: {:?}", e),
        }
    }

    fn cancel_confirmation(&mut self) {
        if let Some(token) = self.timer_token.take() {
            self.loop_handle.remove(token);
        }
    }

    fn confirmation_fired(&mut self, session_id: u64, seq: u64) {
        self.timer_token = None;
        let effects = match self.session.as_mut() {
            Some(session) if session.id() == session_id => session.complete_confirmation(seq),
            _ => {
                debug!(session_id, seq, "dropping timer for dead session");
                Vec::new()
            }
        };
        self.apply_effects(effects);
    }

    /// Tear down the active session, if any. Safe to call redundantly:
    /// screen-off, outside-touch and explicit finish may all race here.
    fn finish_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.end();
        }
        self.cancel_confirmation();
    }

    fn ensure_tree(&mut self) {
        if self.tree.is_none() {
            self.rebuild_tree();
        }
    }

    fn rebuild_tree(&mut self) {
        let mut root = match self.store.load_root_content() {
            Ok(root) => root,
            Err(e) => {
                tracing::error!("Failed to load entries: {}", e);
                return;
            }
        };
        if root.is_empty() && self.dry_run {
            root = demo::sample_entries();
        }

        match pagination::paginate(root, self.config.max_visible) {
            Ok(root) => {
                info!(entries = root.len(), max_visible = self.config.max_visible, "entry tree rebuilt");
                self.tree = Some(Rc::new(EntryTree::new(root)));
            }
            Err(e) => {
                tracing::error!("Pagination failed: {}", e);
            }
        }
    }

    fn reload_config(&mut self) {
        match LaunchConfig::snapshot(&self.settings, &self.metrics) {
            Ok(config) => {
                self.config = config;
                self.router = Self::build_router(&self.config, &self.metrics);
                self.icon_cache = Rc::new(RefCell::new(IconCache::new(
                    self.config.lane_width_px.max(1) as u32,
                )));
            }
            Err(e) => {
                tracing::error!("Config reload failed, keeping previous snapshot: {}", e);
            }
        }
    }

    fn launch(&mut self, name: &str, target: &str, entry: EntryId) {
        // Stored commands can go stale; fall back to the installed
        // application with the same name.
        let exec = if target.is_empty() {
            match self.apps.find_by_name(name) {
                Some(app) => app.exec.clone(),
                None => {
                    warn!(name, "entry has no launch command");
                    return;
                }
            }
        } else {
            target.to_string()
        };

        info!(%entry, name, exec = %exec, "launching entry");
        if self.dry_run {
            info!("demo mode - not spawning");
            return;
        }
        std::process::Command::new("sh")
            .arg("-c")
            .arg(&exec)
            .spawn()
            .map(|child| debug!(pid = child.id(), "spawned"))
            .unwrap_or_else(|e| warn!("Failed to launch {}: {:?}", name, e));
    }
}

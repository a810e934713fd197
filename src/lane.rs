//! Lane selection state machine
//!
//! One lane shows one sibling list of entries. The machine tracks which entry
//! the pointer is over, when a hover turns into a committed selection and
//! when a confirmed selection is backed out of. It owns no views and runs no
//! animations: every transition comes out as plain event data for whatever
//! presentation layer is subscribed, which keeps the hard logic testable
//! without any UI surface.
//!
//! States:
//! - `Init`: not shown
//! - `Focusing`: entries visible, pointer y picks the focus candidate
//! - `Selecting`: the focus candidate is animating into the indicator
//! - `Selected`: confirmed; only an inverted edge crossing leaves it

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{LaunchConfig, LauncherGravity};
use crate::model::{Entry, EntryId};

/// Lane lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    Init,
    Focusing,
    Selecting,
    Selected,
}

/// Visual sub-state of one entry within the lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryVisual {
    Inactive,
    Active,
    Focused,
}

/// What a transition produced, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum LaneEvent {
    /// An entry started (Some) or stopped (None) being the selection candidate
    Selecting { entry: Option<EntryId> },
    /// The focus candidate changed during Focusing
    FocusChanged { index: Option<usize> },
    /// A selection was confirmed (fires exactly once per Selected entry)
    SelectionConfirmed { entry: EntryId },
    /// Every state transition, including focus-changing self-loops
    StateChanged { old: LaneState, new: LaneState },
}

/// Receives lane changes; implemented by the presentation layer, which does
/// all drawing and animation and launches whatever gets selected.
pub trait PresentationSink {
    fn on_item_selecting(&mut self, entry: Option<&LaneEntry>);
    fn on_item_selected(&mut self, entry: &LaneEntry);
    fn on_state_changed(&mut self, old: LaneState, new: LaneState);
}

/// Per-entry view model, snapshotted from the entry tree at lane creation
#[derive(Debug, Clone)]
pub struct LaneEntry {
    pub id: EntryId,
    pub name: String,
    pub icon: Option<String>,
    pub use_icon_color: bool,
    pub is_folder: bool,
    pub visual: EntryVisual,
}

impl LaneEntry {
    fn from_entry(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.clone(),
            icon: entry.icon.clone(),
            use_icon_color: entry.use_icon_color,
            is_folder: entry.is_folder(),
            visual: EntryVisual::Inactive,
        }
    }
}

/// Pixel-space layout of one lane, frozen at creation
#[derive(Debug, Clone, Copy)]
pub struct LaneGeometry {
    pub lane_width: f64,
    pub entry_height: f64,
    /// Top of the first entry, after gravity is applied
    pub top_offset: f64,
    pub is_on_right_side: bool,
}

impl LaneGeometry {
    pub fn new(config: &LaunchConfig, screen_extent: f64, entry_count: usize) -> Self {
        let entry_height = config.entry_height_px as f64;
        let used = entry_height * entry_count as f64;
        let top_offset = match config.gravity {
            LauncherGravity::Top => 0.0,
            LauncherGravity::Center => ((screen_extent - used) / 2.0).max(0.0),
            LauncherGravity::Bottom => (screen_extent - used).max(0.0),
        };
        Self {
            lane_width: config.lane_width_px as f64,
            entry_height,
            top_offset,
            is_on_right_side: config.is_on_right_side,
        }
    }

    /// Vertical extent of entry `index` as a closed-open interval
    fn entry_interval(&self, index: usize) -> (f64, f64) {
        let top = self.top_offset + self.entry_height * index as f64;
        (top, top + self.entry_height)
    }
}

/// Per-lane model: entries, state and focus. Created fresh per activation,
/// never reused across overlay sessions.
#[derive(Debug)]
pub struct LaneModel {
    pub entries: Vec<LaneEntry>,
    pub state: LaneState,
    pub focused_index: Option<usize>,
    pub geometry: LaneGeometry,
}

/// The state machine driving one lane
#[derive(Debug)]
pub struct LaneStateMachine {
    model: LaneModel,
}

impl LaneStateMachine {
    pub fn new(entries: &[Entry], geometry: LaneGeometry) -> Self {
        Self {
            model: LaneModel {
                entries: entries.iter().map(LaneEntry::from_entry).collect(),
                state: LaneState::Init,
                focused_index: None,
                geometry,
            },
        }
    }

    pub fn state(&self) -> LaneState {
        self.model.state
    }

    pub fn focused(&self) -> Option<&LaneEntry> {
        self.model.focused_index.and_then(|i| self.model.entries.get(i))
    }

    pub fn entries(&self) -> &[LaneEntry] {
        &self.model.entries
    }

    /// Lane activation: overlay shown, entries unfold
    pub fn activate(&mut self) -> Vec<LaneEvent> {
        let mut events = Vec::new();
        if self.model.state == LaneState::Init {
            self.transit(LaneState::Focusing, &mut events);
        }
        events
    }

    /// A pointer sample in lane-local coordinates
    pub fn pointer_moved(&mut self, x: f64, y: f64) -> Vec<LaneEvent> {
        let mut events = Vec::new();
        match self.model.state {
            LaneState::Focusing => {
                if self.resolve_focus(y) {
                    events.push(LaneEvent::FocusChanged {
                        index: self.model.focused_index,
                    });
                    events.push(LaneEvent::StateChanged {
                        old: LaneState::Focusing,
                        new: LaneState::Focusing,
                    });
                }
                if self.model.focused_index.is_some() && self.crossed_commit_border(x) {
                    // Commit gesture: the drag has left the anchored edge
                    // toward open space while an entry is focused.
                    if self.focused_in_bounds() {
                        self.transit(LaneState::Selecting, &mut events);
                    }
                }
            }
            LaneState::Selected => {
                if self.crossed_back_border(x) {
                    self.transit(LaneState::Focusing, &mut events);
                    if self.resolve_focus(y) {
                        events.push(LaneEvent::FocusChanged {
                            index: self.model.focused_index,
                        });
                        events.push(LaneEvent::StateChanged {
                            old: LaneState::Focusing,
                            new: LaneState::Focusing,
                        });
                    }
                }
            }
            // Move samples are meaningless in Init and ignored while the
            // confirmation animation runs.
            LaneState::Init | LaneState::Selecting => {}
        }
        events
    }

    /// Pointer lifted. Cancels an uncommitted hover; everything else is
    /// resolved by the session (a running confirmation keeps running).
    pub fn pointer_released(&mut self) -> Vec<LaneEvent> {
        let mut events = Vec::new();
        if self.model.state == LaneState::Focusing {
            self.transit(LaneState::Init, &mut events);
        }
        events
    }

    /// The confirmation animation finished. Only meaningful in Selecting;
    /// a stale completion after teardown is a no-op.
    pub fn animation_complete(&mut self) -> Vec<LaneEvent> {
        let mut events = Vec::new();
        if self.model.state == LaneState::Selecting {
            self.transit(LaneState::Selected, &mut events);
        }
        events
    }

    /// Forced teardown. Safe from any state, idempotent.
    pub fn force_init(&mut self) -> Vec<LaneEvent> {
        let mut events = Vec::new();
        if self.model.state != LaneState::Init {
            self.transit(LaneState::Init, &mut events);
        }
        events
    }

    /// Recompute the focus candidate from the pointer's y coordinate.
    /// Returns true when the focused index changed.
    fn resolve_focus(&mut self, y: f64) -> bool {
        let mut focused = None;
        for (i, _) in self.model.entries.iter().enumerate() {
            let (top, bottom) = self.model.geometry.entry_interval(i);
            if y >= top && y < bottom {
                // First match in display order wins
                focused = Some(i);
                break;
            }
        }

        let changed = focused != self.model.focused_index;
        self.model.focused_index = focused;
        for (i, entry) in self.model.entries.iter_mut().enumerate() {
            entry.visual = if Some(i) == focused {
                EntryVisual::Focused
            } else {
                EntryVisual::Active
            };
        }
        changed
    }

    /// The commit border test. No hysteresis: a pointer oscillating exactly
    /// on the border flickers, matching the shipped behavior.
    fn crossed_commit_border(&self, x: f64) -> bool {
        if self.model.geometry.is_on_right_side {
            x < self.model.geometry.lane_width
        } else {
            x > 0.0
        }
    }

    /// Inverse of the commit test, for backing out of Selected
    fn crossed_back_border(&self, x: f64) -> bool {
        if self.model.geometry.is_on_right_side {
            x > self.model.geometry.lane_width
        } else {
            x < 0.0
        }
    }

    /// Guard against a stale focus index. Never surfaces to callers: an
    /// interactive overlay clears the focus and carries on.
    fn focused_in_bounds(&mut self) -> bool {
        match self.model.focused_index {
            Some(i) if i < self.model.entries.len() => true,
            Some(i) => {
                warn!(index = i, entries = self.model.entries.len(), "clearing out-of-bounds focus");
                self.model.focused_index = None;
                false
            }
            None => false,
        }
    }

    fn transit(&mut self, new: LaneState, events: &mut Vec<LaneEvent>) {
        let old = self.model.state;
        match new {
            LaneState::Init => {
                events.push(LaneEvent::Selecting { entry: None });
                self.model.focused_index = None;
                for entry in &mut self.model.entries {
                    entry.visual = EntryVisual::Inactive;
                }
            }
            LaneState::Focusing => {
                events.push(LaneEvent::Selecting { entry: None });
                self.model.focused_index = None;
                for entry in &mut self.model.entries {
                    entry.visual = EntryVisual::Active;
                }
            }
            LaneState::Selecting => {
                let focused = self.model.focused_index;
                for (i, entry) in self.model.entries.iter_mut().enumerate() {
                    if Some(i) != focused {
                        entry.visual = EntryVisual::Inactive;
                    }
                }
                if let Some(entry) = self.focused() {
                    events.push(LaneEvent::Selecting {
                        entry: Some(entry.id),
                    });
                }
            }
            LaneState::Selected => {
                if let Some(entry) = self.focused() {
                    events.push(LaneEvent::SelectionConfirmed { entry: entry.id });
                }
            }
        }
        self.model.state = new;
        debug!(?old, ?new, focus = ?self.model.focused_index, "lane transition");
        events.push(LaneEvent::StateChanged { old, new });
    }
}

/// Per-entry animation start offsets for the unfold/fold wave: the center
/// entry moves first and the wave spreads outward symmetrically, one
/// `step` per ring.
pub fn stagger_delays(count: usize, step: Duration) -> Vec<Duration> {
    let mut delays = vec![Duration::ZERO; count];
    let mut delay = Duration::ZERO;
    let half = count / 2;
    if count % 2 != 0 {
        delays[half] = delay;
        delay += step;
    }
    for i in (0..half).rev() {
        delays[i] = delay;
        delays[count - 1 - i] = delay;
        delay += step;
    }
    delays
}

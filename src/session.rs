//! Overlay session - one showing of the launcher
//!
//! A session is born from the press that hit the activation strip and dies
//! on release-without-commit, outside touch, focus loss, screen-off or an
//! explicit finish. It owns the lane stack (the root lane plus one sub-lane
//! per opened folder), routes every touch sample to the lanes in their local
//! coordinates, and guards the one asynchronous piece - the selection
//! confirmation timer - with a sequence number so a completion that was
//! cancelled or superseded can never confirm anything.

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::LaunchConfig;
use crate::input::{RoutingDecision, TouchAction, TouchRouter, TouchSample};
use crate::lane::{
    stagger_delays, LaneEvent, LaneGeometry, LaneState, LaneStateMachine, PresentationSink,
};
use crate::model::{EntryId, EntryTree};

/// Orchestration the session asks its owner to perform
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Start the confirmation timer; completion must echo `seq`
    ScheduleConfirmation { seq: u64, delay: Duration },
    /// Stop a pending confirmation timer, if any
    CancelConfirmation,
    /// A leaf entry was confirmed; launch it
    Launch {
        entry: EntryId,
        name: String,
        target: String,
    },
    /// The session is over; drop it
    Finished,
}

/// One overlay activation
pub struct OverlaySession {
    id: u64,
    tree: Rc<EntryTree>,
    config: LaunchConfig,
    router: TouchRouter,
    sink: Box<dyn PresentationSink>,
    lanes: Vec<LaneStateMachine>,
    overlay_width: f64,
    screen_extent: f64,
    /// Sequence of the confirmation we are waiting for, if any
    pending_confirmation: Option<u64>,
    next_seq: u64,
    ended: bool,
}

impl OverlaySession {
    /// Create a session from the activating press and feed it that press.
    /// The router carries the strip-to-overlay remap the session will apply
    /// to every sample it is fed.
    pub fn begin(
        id: u64,
        tree: Rc<EntryTree>,
        config: LaunchConfig,
        router: TouchRouter,
        overlay_width: f64,
        screen_extent: f64,
        sink: Box<dyn PresentationSink>,
        sample: &TouchSample,
    ) -> (Self, Vec<SessionEffect>) {
        let mut session = Self {
            id,
            tree: tree.clone(),
            config,
            router,
            sink,
            lanes: Vec::new(),
            overlay_width,
            screen_extent,
            pending_confirmation: None,
            next_seq: 0,
            ended: false,
        };

        session.push_lane(&tree.root);
        info!(session = id, entries = tree.root.len(), "overlay session started");

        let effects = session.feed(sample);
        (session, effects)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Route one raw touch sample through the lanes
    pub fn feed(&mut self, sample: &TouchSample) -> Vec<SessionEffect> {
        if self.ended {
            return Vec::new();
        }

        let decision = self.router.route(true, sample);
        let (x, y, action) = match decision {
            RoutingDecision::Forward { x, y, action } => (x, y, action),
            // A live session forwards everything; the other decisions only
            // exist for the inactive path the service drives directly.
            RoutingDecision::StartSession | RoutingDecision::Ignore => return Vec::new(),
        };

        match action {
            TouchAction::Down | TouchAction::Move => self.feed_motion(x, y),
            TouchAction::Up => self.feed_release(),
        }
    }

    fn feed_motion(&mut self, x: f64, y: f64) -> Vec<SessionEffect> {
        let mut effects = Vec::new();

        // Every lane sees every sample in its own coordinate space; each
        // machine ignores what doesn't apply to its state.
        let mut reverted_to = None;
        for index in 0..self.lanes.len() {
            let local_x = x - self.lane_origin_x(index);
            let was = self.lanes[index].state();
            let events = self.lanes[index].pointer_moved(local_x, y);
            self.dispatch(index, &events);

            if was == LaneState::Selected && self.lanes[index].state() == LaneState::Focusing {
                reverted_to = Some(index);
            }
            for event in &events {
                if let LaneEvent::Selecting { entry: Some(_) } = event {
                    effects.push(self.schedule_confirmation());
                }
            }
        }

        // Backing out of a confirmed folder closes everything above it
        if let Some(index) = reverted_to {
            self.truncate_lanes(index + 1, &mut effects);
        }

        effects
    }

    fn feed_release(&mut self) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        let top = self.lanes.len() - 1;
        let events = self.lanes[top].pointer_released();
        self.dispatch(top, &events);

        // Release with nothing committed tears the whole overlay down. A
        // running confirmation (Selecting) survives the release and resolves
        // by timer.
        if self.lanes[top].state() == LaneState::Init {
            effects.extend(self.end());
        }
        effects
    }

    /// Confirmation timer callback. `seq` must match the pending schedule;
    /// anything stale - ended session, superseded selection - is a no-op.
    pub fn complete_confirmation(&mut self, seq: u64) -> Vec<SessionEffect> {
        if self.ended || self.pending_confirmation != Some(seq) {
            debug!(session = self.id, seq, "suppressing stale confirmation");
            return Vec::new();
        }
        self.pending_confirmation = None;

        let top = self.lanes.len() - 1;
        let events = self.lanes[top].animation_complete();
        self.dispatch(top, &events);

        let mut effects = Vec::new();
        for event in &events {
            if let LaneEvent::SelectionConfirmed { entry } = event {
                effects.extend(self.resolve_confirmed(*entry));
            }
        }
        effects
    }

    /// Tear the session down. Idempotent; absorbs any inconsistency.
    pub fn end(&mut self) -> Vec<SessionEffect> {
        if self.ended {
            return Vec::new();
        }
        self.ended = true;
        self.pending_confirmation = None;

        for index in 0..self.lanes.len() {
            let events = self.lanes[index].force_init();
            self.dispatch(index, &events);
        }
        info!(session = self.id, "overlay session ended");

        vec![SessionEffect::CancelConfirmation, SessionEffect::Finished]
    }

    /// A selection was confirmed: open folders as a sub-lane, launch leaves
    fn resolve_confirmed(&mut self, id: EntryId) -> Vec<SessionEffect> {
        let tree = self.tree.clone();
        let Some(entry) = tree.find(id) else {
            // Snapshot and lane can only disagree if something corrupted the
            // lane model; treat like a cancelled selection.
            tracing::warn!(session = self.id, entry = %id, "confirmed entry missing from snapshot");
            return self.end();
        };

        if let Some(children) = entry.children() {
            info!(session = self.id, folder = %id, depth = self.lanes.len(), "opening sub-lane");
            self.push_lane(children);
            Vec::new()
        } else {
            let mut effects = vec![SessionEffect::Launch {
                entry: id,
                name: entry.name.clone(),
                target: entry.launch_target().unwrap_or_default().to_string(),
            }];
            effects.extend(self.end());
            effects
        }
    }

    fn push_lane(&mut self, entries: &[crate::model::Entry]) {
        let geometry = LaneGeometry::new(&self.config, self.screen_extent, entries.len());
        let mut lane = LaneStateMachine::new(entries, geometry);
        let events = lane.activate();
        self.lanes.push(lane);
        let index = self.lanes.len() - 1;
        self.dispatch(index, &events);

        debug!(
            session = self.id,
            lane = index,
            unfold = ?stagger_delays(entries.len(), self.config.entry_move_step),
            "lane activated"
        );
    }

    fn truncate_lanes(&mut self, keep: usize, effects: &mut Vec<SessionEffect>) {
        while self.lanes.len() > keep {
            let mut lane = self.lanes.pop().expect("lane stack underflow");
            let events = lane.force_init();
            let index = self.lanes.len();
            self.dispatch(index, &events);
        }
        if self.pending_confirmation.take().is_some() {
            // The popped top lane owned the running confirmation
            effects.push(SessionEffect::CancelConfirmation);
        }
    }

    fn schedule_confirmation(&mut self) -> SessionEffect {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending_confirmation = Some(seq);
        SessionEffect::ScheduleConfirmation {
            seq,
            delay: self.config.selection_animation,
        }
    }

    /// Overlay-space x of lane `index`'s left edge. Lanes stack inward from
    /// the docked edge, one lane width per depth.
    fn lane_origin_x(&self, index: usize) -> f64 {
        let width = self.config.lane_width_px as f64;
        if self.config.is_on_right_side {
            self.overlay_width - width * (index as f64 + 1.0)
        } else {
            width * index as f64
        }
    }

    /// Forward lane events to the presentation sink
    fn dispatch(&mut self, lane_index: usize, events: &[LaneEvent]) {
        for event in events {
            match event {
                LaneEvent::Selecting { entry } => {
                    let entry = entry.and_then(|id| {
                        self.lanes
                            .get(lane_index)
                            .and_then(|lane| lane.entries().iter().find(|e| e.id == id))
                    });
                    self.sink.on_item_selecting(entry);
                }
                LaneEvent::SelectionConfirmed { entry } => {
                    let found = self
                        .lanes
                        .get(lane_index)
                        .and_then(|lane| lane.entries().iter().find(|e| e.id == *entry));
                    if let Some(entry) = found {
                        self.sink.on_item_selected(entry);
                    }
                }
                LaneEvent::StateChanged { old, new } => {
                    self.sink.on_state_changed(*old, *new);
                }
                LaneEvent::FocusChanged { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LauncherGravity;
    use crate::input::{Point, Rect};
    use crate::lane::LaneEntry;
    use crate::model::{folder, leaf};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum SinkCall {
        Selecting(Option<i64>),
        Selected(i64),
        StateChanged(LaneState, LaneState),
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Rc<RefCell<Vec<SinkCall>>>,
    }

    impl PresentationSink for RecordingSink {
        fn on_item_selecting(&mut self, entry: Option<&LaneEntry>) {
            self.calls
                .borrow_mut()
                .push(SinkCall::Selecting(entry.map(|e| e.id.0)));
        }
        fn on_item_selected(&mut self, entry: &LaneEntry) {
            self.calls.borrow_mut().push(SinkCall::Selected(entry.id.0));
        }
        fn on_state_changed(&mut self, old: LaneState, new: LaneState) {
            self.calls.borrow_mut().push(SinkCall::StateChanged(old, new));
        }
    }

    fn config() -> LaunchConfig {
        LaunchConfig {
            lane_width_px: 80,
            entry_height_px: 100,
            sensitivity_px: 20,
            activation_offset_position_px: 0,
            activation_offset_size_px: 0,
            is_on_right_side: true,
            gravity: LauncherGravity::Top,
            max_visible: 10,
            entry_move_step: Duration::from_millis(50),
            selection_animation: Duration::from_millis(200),
            frame_default_color: [0.0; 4],
        }
    }

    fn tree() -> Rc<EntryTree> {
        Rc::new(EntryTree::new(vec![
            leaf(0, "mail"),
            leaf(1, "camera"),
            folder(2, "tools", vec![leaf(10, "files"), leaf(11, "term")]),
        ]))
    }

    /// Overlay 1000px wide, strip 20px wide on the right edge. The press
    /// lands over empty space (y=1500) so tests drive focus explicitly.
    fn begin(
        tree: Rc<EntryTree>,
    ) -> (OverlaySession, Vec<SessionEffect>, Rc<RefCell<Vec<SinkCall>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = RecordingSink {
            calls: calls.clone(),
        };
        let (session, effects) = OverlaySession::begin(
            1,
            tree,
            config(),
            test_router(),
            1000.0,
            2000.0,
            Box::new(sink),
            &TouchSample::new(TouchAction::Down, 10.0, 1500.0),
        );
        (session, effects, calls)
    }

    fn test_router() -> TouchRouter {
        TouchRouter::new(
            Rect::from_size(0.0, 0.0, 20.0, 2000.0),
            Point::new(980.0, 0.0),
            Point::new(0.0, 0.0),
        )
    }

    /// Strip-local x that lands at overlay x for the test router
    fn strip_x(overlay_x: f64) -> f64 {
        overlay_x - 980.0
    }

    /// Hover entry at `y` (overlay x on the border), then commit inward
    fn commit_at(session: &mut OverlaySession, y: f64) -> u64 {
        session.feed(&TouchSample::new(TouchAction::Move, strip_x(1000.0), y));
        let effects = session.feed(&TouchSample::new(TouchAction::Move, strip_x(950.0), y));
        match effects.as_slice() {
            [SessionEffect::ScheduleConfirmation { seq, .. }] => *seq,
            other => panic!("expected schedule, got {:?}", other),
        }
    }

    #[test]
    fn test_begin_activates_root_lane() {
        let (session, effects, calls) = begin(tree());
        assert!(!session.is_ended());
        assert!(effects.is_empty());
        assert!(calls.borrow().contains(&SinkCall::StateChanged(
            LaneState::Init,
            LaneState::Focusing
        )));
    }

    #[test]
    fn test_press_over_entry_commits_immediately() {
        // The strip lies inside the lane's horizontal span, so a press that
        // already sits over an entry clears the commit border on the first
        // sample. No-hysteresis behavior, same as the border flicker case.
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = RecordingSink {
            calls: calls.clone(),
        };
        let (_, effects) = OverlaySession::begin(
            1,
            tree(),
            config(),
            test_router(),
            1000.0,
            2000.0,
            Box::new(sink),
            &TouchSample::new(TouchAction::Down, 10.0, 150.0),
        );
        assert!(matches!(
            effects.as_slice(),
            [SessionEffect::ScheduleConfirmation { .. }]
        ));
        assert!(calls.borrow().contains(&SinkCall::Selecting(Some(1))));
    }

    #[test]
    fn test_hover_then_release_cancels() {
        let (mut session, _, calls) = begin(tree());
        // Hover entry 1 with x pinned on the border (no commit)
        session.feed(&TouchSample::new(TouchAction::Move, strip_x(1000.0), 150.0));
        assert!(!session.is_ended());

        let effects = session.feed(&TouchSample::new(TouchAction::Up, strip_x(1000.0), 150.0));
        assert!(session.is_ended());
        assert!(effects.contains(&SessionEffect::CancelConfirmation));
        assert!(effects.contains(&SessionEffect::Finished));
        assert!(!calls
            .borrow()
            .iter()
            .any(|c| matches!(c, SinkCall::Selected(_))));
    }

    #[test]
    fn test_commit_and_confirm_launches_leaf() {
        let (mut session, _, calls) = begin(tree());
        let seq = commit_at(&mut session, 150.0);

        let effects = session.complete_confirmation(seq);
        assert!(session.is_ended());
        assert!(effects.iter().any(|e| matches!(
            e,
            SessionEffect::Launch { entry, name, target }
                if entry.0 == 1 && name == "camera" && target == "camera-cmd"
        )));
        assert!(effects.contains(&SessionEffect::Finished));
        assert!(calls.borrow().contains(&SinkCall::Selected(1)));
    }

    #[test]
    fn test_end_mid_animation_suppresses_confirmation() {
        let (mut session, _, calls) = begin(tree());
        let seq = commit_at(&mut session, 150.0);

        let effects = session.end();
        assert!(effects.contains(&SessionEffect::CancelConfirmation));

        // The timer still fires; the stale sequence must do nothing
        let effects = session.complete_confirmation(seq);
        assert!(effects.is_empty());
        assert!(!calls
            .borrow()
            .iter()
            .any(|c| matches!(c, SinkCall::Selected(_))));
    }

    #[test]
    fn test_end_is_idempotent() {
        let (mut session, _, _) = begin(tree());
        let first = session.end();
        assert!(first.contains(&SessionEffect::Finished));
        assert!(session.end().is_empty());
        assert!(session.end().is_empty());
    }

    #[test]
    fn test_feed_after_end_is_inert() {
        let (mut session, _, _) = begin(tree());
        session.end();
        let effects = session.feed(&TouchSample::new(TouchAction::Move, 5.0, 150.0));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_folder_confirmation_opens_sub_lane() {
        let (mut session, _, calls) = begin(tree());
        // Hover the folder (entry 2, interval [200, 300)) and commit
        let seq = commit_at(&mut session, 250.0);

        let effects = session.complete_confirmation(seq);
        // A folder doesn't launch and doesn't end the session
        assert!(effects.is_empty());
        assert!(!session.is_ended());
        assert!(calls.borrow().contains(&SinkCall::Selected(2)));
        assert_eq!(session.lanes.len(), 2);

        // Sub-lane sits one lane width further in: origin 840. Hover its
        // first entry; x=850 is inside the sub-lane and past its border.
        let effects = session.feed(&TouchSample::new(TouchAction::Move, strip_x(850.0), 50.0));
        assert!(matches!(
            effects.as_slice(),
            [SessionEffect::ScheduleConfirmation { .. }]
        ));
        assert_eq!(session.lanes[1].state(), LaneState::Selecting);
    }

    #[test]
    fn test_sub_lane_leaf_launches() {
        let (mut session, _, _) = begin(tree());
        let folder_seq = commit_at(&mut session, 250.0);
        session.complete_confirmation(folder_seq);

        // Commit the second sub-lane entry (interval [100, 200))
        let effects = session.feed(&TouchSample::new(TouchAction::Move, strip_x(850.0), 150.0));
        let seq = match effects.as_slice() {
            [SessionEffect::ScheduleConfirmation { seq, .. }] => *seq,
            other => panic!("expected schedule, got {:?}", other),
        };
        assert_ne!(folder_seq, seq);

        // The already-consumed folder confirmation is stale now
        assert!(session.complete_confirmation(folder_seq).is_empty());
        assert!(!session.is_ended());

        let effects = session.complete_confirmation(seq);
        assert!(session.is_ended());
        assert!(effects.iter().any(|e| matches!(
            e,
            SessionEffect::Launch { name, .. } if name == "term"
        )));
    }

    #[test]
    fn test_backing_out_of_folder_pops_sub_lane() {
        let (mut session, _, _) = begin(tree());
        let seq = commit_at(&mut session, 250.0);
        session.complete_confirmation(seq);
        assert_eq!(session.lanes.len(), 2);

        // The root lane spans [920, 1000); crossing back past its outward
        // edge (overlay x > 1000) reverts it to Focusing and drops the
        // sub-lane.
        session.feed(&TouchSample::new(TouchAction::Move, strip_x(1000.5), 250.0));
        assert_eq!(session.lanes.len(), 1);
        assert_eq!(session.lanes[0].state(), LaneState::Focusing);
        assert!(!session.is_ended());
    }

    #[test]
    fn test_backing_out_cancels_sub_lane_confirmation() {
        let (mut session, _, calls) = begin(tree());
        let seq = commit_at(&mut session, 250.0);
        session.complete_confirmation(seq);

        // Commit inside the sub-lane, then cross back over the root lane's
        // outward edge while the confirmation is still pending.
        let effects = session.feed(&TouchSample::new(TouchAction::Move, strip_x(850.0), 50.0));
        let sub_seq = match effects.as_slice() {
            [SessionEffect::ScheduleConfirmation { seq, .. }] => *seq,
            other => panic!("expected schedule, got {:?}", other),
        };

        let effects = session.feed(&TouchSample::new(TouchAction::Move, strip_x(1000.5), 250.0));
        assert!(effects.contains(&SessionEffect::CancelConfirmation));
        assert_eq!(session.lanes.len(), 1);

        calls.borrow_mut().clear();
        assert!(session.complete_confirmation(sub_seq).is_empty());
        assert!(!calls
            .borrow()
            .iter()
            .any(|c| matches!(c, SinkCall::Selected(_))));
    }

    #[test]
    fn test_empty_root_lane_session() {
        let empty = Rc::new(EntryTree::new(Vec::new()));
        let (mut session, effects, _) = begin(empty);
        assert!(effects.is_empty());

        // Nothing to focus or commit; release just tears down
        let effects = session.feed(&TouchSample::new(TouchAction::Up, 10.0, 150.0));
        assert!(effects.contains(&SessionEffect::Finished));
    }
}

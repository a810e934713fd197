//! Touch routing between the capture strip and the overlay
//!
//! The capture strip and the overlay are two independently positioned
//! surfaces receiving the same physical touch stream. The router decides
//! when a touch starts a new overlay session and translates every sample
//! from the strip's coordinate space into the overlay's.

use crate::input::{Point, Rect};

/// What a touch sample is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    Move,
    Up,
}

/// One raw pointer sample in the capture strip's coordinate space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchSample {
    pub x: f64,
    pub y: f64,
    pub action: TouchAction,
}

impl TouchSample {
    pub fn new(action: TouchAction, x: f64, y: f64) -> Self {
        Self { x, y, action }
    }
}

/// What to do with a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoutingDecision {
    /// Press-down inside the strip with no live session: create one
    StartSession,
    /// Feed the live session, in overlay coordinates
    Forward { x: f64, y: f64, action: TouchAction },
    /// Not ours; leave the touch to whatever is underneath
    Ignore,
}

/// Session gating and strip-to-overlay coordinate remapping
#[derive(Debug, Clone)]
pub struct TouchRouter {
    /// Hit rect for session starts, in strip-local coordinates
    strip_rect: Rect,
    /// Screen-space origin of the strip surface
    strip_origin: Point,
    /// Screen-space origin of the overlay surface
    overlay_origin: Point,
}

impl TouchRouter {
    pub fn new(strip_rect: Rect, strip_origin: Point, overlay_origin: Point) -> Self {
        Self {
            strip_rect,
            strip_origin,
            overlay_origin,
        }
    }

    pub fn route(&self, session_active: bool, sample: &TouchSample) -> RoutingDecision {
        if session_active {
            // The overlay is full-screen once active: every sample is
            // forwarded until release, even outside the strip.
            let (x, y) = self.remap(sample.x, sample.y);
            return RoutingDecision::Forward {
                x,
                y,
                action: sample.action,
            };
        }

        if sample.action == TouchAction::Down && self.strip_rect.contains(sample.x, sample.y) {
            RoutingDecision::StartSession
        } else {
            RoutingDecision::Ignore
        }
    }

    /// Translate from strip space into overlay space
    fn remap(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x + (self.strip_origin.x - self.overlay_origin.x),
            y + (self.strip_origin.y - self.overlay_origin.y),
        )
    }
}

//! Activation strip geometry
//!
//! The strip is the always-present, invisible touch target on the screen
//! edge. It is `sensitivity` pixels wide, docked left or right, and can be
//! shortened and shifted vertically so it doesn't cover navigation areas.

use crate::input::Rect;

/// Compute the activation strip rect within `available` screen space.
///
/// `offset_size` shortens the strip, `offset_position` shifts it down from
/// its anchor. A result that leaves the available rect entirely falls back
/// to the available rect itself rather than producing a dead strip.
pub fn activation_strip_rect(
    sensitivity: f64,
    offset_position: f64,
    offset_size: f64,
    is_on_right_side: bool,
    available: Rect,
) -> Rect {
    let mut top = available.top;
    let mut left = available.left;
    let mut right = available.right;
    let bottom;

    if is_on_right_side {
        left = right - sensitivity;
    } else {
        right = left + sensitivity;
    }

    let height = available.height() - offset_size;
    top = top + offset_position + offset_size / 2.0;
    bottom = top + height;

    let result = Rect::new(left, top, right, bottom);

    match result.intersect(&available) {
        Some(clamped) => clamped,
        None => available,
    }
}

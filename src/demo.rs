//! Demo mode - a scripted activation for development machines
//!
//! Drives the service with a canned gesture (press the strip, drag onto an
//! entry, commit, wait for the confirmation, release) and quits. With no
//! entries stored and no applications installed, a small synthetic entry
//! set stands in so the gesture always has something to select.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;
use calloop::channel::Sender;
use calloop::timer::{TimeoutAction, Timer};
use calloop::LoopHandle;

use crate::config::{LaunchConfig, ScreenMetrics};
use crate::input::{TouchAction, TouchSample};
use crate::model::{Entry, EntryId, EntryKind};
use crate::service::{OverlayService, ServiceCommand};

/// The scripted gesture, as (delay after previous step, command) pairs.
/// Coordinates are strip-local, like real capture events.
fn script(config: &LaunchConfig, metrics: &ScreenMetrics) -> Vec<(Duration, ServiceCommand)> {
    let x = config.sensitivity_px as f64 / 2.0;
    // The lane is gravity-centered by default; mid-screen always hits the
    // middle entry.
    let y = metrics.height_px as f64 / 2.0;
    // Inward drag direction depends on the docked side
    let inward = if config.is_on_right_side { -1.0 } else { 1.0 };

    let confirm_wait = config.selection_animation + Duration::from_millis(200);

    vec![
        (
            Duration::from_millis(200),
            ServiceCommand::Touch(TouchSample::new(TouchAction::Down, x, y)),
        ),
        (
            Duration::from_millis(50),
            ServiceCommand::Touch(TouchSample::new(TouchAction::Move, x, y + 10.0)),
        ),
        (
            Duration::from_millis(50),
            ServiceCommand::Touch(TouchSample::new(
                TouchAction::Move,
                x + inward * 40.0,
                y + 10.0,
            )),
        ),
        (
            confirm_wait,
            ServiceCommand::Touch(TouchSample::new(
                TouchAction::Up,
                x + inward * 40.0,
                y + 10.0,
            )),
        ),
        (Duration::from_millis(200), ServiceCommand::Quit),
    ]
}

/// Install the script on the event loop
pub fn install(
    handle: &LoopHandle<'static, OverlayService>,
    sender: Sender<ServiceCommand>,
    config: &LaunchConfig,
    metrics: &ScreenMetrics,
) -> Result<()> {
    let mut steps: VecDeque<(Duration, ServiceCommand)> = script(config, metrics).into();
    let first = steps
        .front()
        .map(|(delay, _)| *delay)
        .unwrap_or(Duration::ZERO);

    handle
        .insert_source(Timer::from_duration(first), move |_, _, _state| {
            if let Some((_, cmd)) = steps.pop_front() {
                let _ = sender.send(cmd);
            }
            match steps.front() {
                Some((delay, _)) => TimeoutAction::ToDuration(*delay),
                None => TimeoutAction::Drop,
            }
        })
        .map_err(|e| anyhow::anyhow!("Failed to install demo script: {:?}", e))?;

    tracing::info!("Demo script armed");
    Ok(())
}

/// Synthetic entries for machines with nothing stored and nothing installed
pub fn sample_entries() -> Vec<Entry> {
    fn leaf(id: i64, name: &str, exec: &str, icon: &str) -> Entry {
        Entry {
            id: EntryId(id),
            name: name.to_string(),
            icon: Some(icon.to_string()),
            use_icon_color: true,
            kind: EntryKind::Launch {
                target: exec.to_string(),
            },
        }
    }

    vec![
        leaf(1, "Phone", "gnome-calls", "call-start"),
        leaf(2, "Messages", "chatty", "chat-message-new"),
        leaf(3, "Camera", "megapixels", "camera-photo"),
        leaf(4, "Browser", "firefox", "web-browser"),
        Entry {
            id: EntryId(5),
            name: "Tools".to_string(),
            icon: Some("folder".to_string()),
            use_icon_color: false,
            kind: EntryKind::Folder {
                children: vec![
                    leaf(6, "Files", "nautilus", "system-file-manager"),
                    leaf(7, "Terminal", "foot", "utilities-terminal"),
                ],
            },
        },
    ]
}

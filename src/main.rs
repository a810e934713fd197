//! paperlane - a side-screen paper launcher overlay
//!
//! A thin invisible touch strip sits on one screen edge. Touching it unfolds
//! a lane of launchable entries next to the finger; dragging along the lane
//! focuses an entry, dragging inward commits it, and the confirmed entry is
//! launched (or opened as a sub-lane when it is a folder).

mod apps;
mod config;
mod demo;
mod icons;
mod input;
mod lane;
mod model;
mod service;
mod session;
mod storage;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tracing_appender::rolling;

use crate::config::ScreenMetrics;

#[derive(Parser, Debug)]
#[command(name = "paperlane")]
#[command(about = "Side-screen paper launcher overlay for Linux phones", long_about = None)]
struct Args {
    /// Enable verbose debug output
    #[arg(short, long)]
    debug: bool,

    /// Dock the launcher on the left screen edge instead of the right
    #[arg(long)]
    left: bool,

    /// Run a scripted activation against the current entry set and exit
    #[arg(long)]
    demo: bool,

    /// Screen size in pixels, WIDTHxHEIGHT
    #[arg(long, default_value = "1080x2340")]
    screen: String,

    /// Display density (pixels per dip)
    #[arg(long, default_value_t = 2.75)]
    density: f32,
}

fn main() -> Result<()> {
    // Set up panic hook to log panics before crashing
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        // Also write to log file directly
        let crash_log = config::state_dir().join("crash.log");
        if let Ok(mut f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&crash_log)
        {
            use std::io::Write;
            let _ = writeln!(f, "[{}] PANIC: {}", chrono::Local::now(), panic_info);
        }
    }));

    let log_dir = config::state_dir();
    std::fs::create_dir_all(&log_dir).ok();

    // Parse args early to check for debug flag
    let args = Args::parse();

    // File appender - rotates daily
    let file_appender = rolling::daily(&log_dir, "paperlane.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - quiet by default, verbose with --debug
    let default_filter = if args.debug {
        "debug,paperlane=debug"
    } else {
        "warn,paperlane=info"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    info!(log_path = %log_dir.display(), "paperlane starting");

    let metrics = parse_screen(&args.screen, args.density)?;

    let mut settings = config::UserSettings::load();
    if args.left {
        settings.is_on_right_side = false;
    }

    service::run(settings, metrics, args.demo)
}

/// Parse a WIDTHxHEIGHT screen specification into metrics
fn parse_screen(spec: &str, density: f32) -> Result<ScreenMetrics> {
    let parts: Vec<&str> = spec.split('x').collect();
    if parts.len() != 2 {
        anyhow::bail!("invalid screen size: {}. Use WIDTHxHEIGHT (e.g., 1080x2340)", spec);
    }
    let width_px: i32 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid screen width: {}", parts[0]))?;
    let height_px: i32 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid screen height: {}", parts[1]))?;
    Ok(ScreenMetrics {
        width_px,
        height_px,
        density,
    })
}

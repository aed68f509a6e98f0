//! The live watch loop.
//!
//! Everything that can cause a redraw (the periodic tick, session watcher
//! events, the sessions root watcher) only triggers the [`Debouncer`]. The
//! actual resolve + render pass runs when the debounce deadline fires, so
//! passes never overlap and a burst of writes costs one redraw.

use std::future;
use std::io::Write;
use std::path::PathBuf;

use notify::RecommendedWatcher;
use ocr_core::strategy::now_ms;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::ProgressConfig;
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::monitor::{Mode, Monitor};
use crate::terminal::FrameRenderer;
use crate::watch::{self, WatchEvent};

// ============================================================================
// Session watcher
// ============================================================================

/// The watcher on the focused session, re-attached when focus moves.
struct SessionWatch {
    path: Option<PathBuf>,
    watcher: Option<RecommendedWatcher>,
    depth: usize,
    tx: UnboundedSender<WatchEvent>,
}

impl SessionWatch {
    fn new(depth: usize, tx: UnboundedSender<WatchEvent>) -> Self {
        Self {
            path: None,
            watcher: None,
            depth,
            tx,
        }
    }

    /// Points the watcher at `target`, if it is not already there.
    ///
    /// A failed attach is logged once; the tick keeps the view current.
    fn sync(&mut self, target: Option<PathBuf>) {
        if self.path == target {
            return;
        }
        self.watcher = None;
        if let Some(path) = &target {
            match watch::watch_session(path, self.depth, self.tx.clone()) {
                Ok(watcher) => self.watcher = Some(watcher),
                Err(e) => warn!(error = %e, "Session watcher unavailable, relying on tick"),
            }
        }
        self.path = target;
    }
}

// ============================================================================
// Loop
// ============================================================================

/// Draws the monitor's frames until `cancel` fires.
///
/// On exit the last frame stays on screen and the cursor is restored, also
/// when a terminal write failure ends the loop early.
pub async fn run<W: Write>(
    monitor: Monitor,
    renderer: &mut FrameRenderer<W>,
    config: ProgressConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let result = watch_loop(monitor, renderer, config, cancel).await;
    let restored = renderer.done();
    if let Err(e) = &result {
        error!(error = %e, "Watch loop failed");
    }
    result?;
    restored?;
    debug!("Watch loop stopped");
    Ok(())
}

async fn watch_loop<W: Write>(
    mut monitor: Monitor,
    renderer: &mut FrameRenderer<W>,
    config: ProgressConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut debouncer = Debouncer::new(config.debounce());

    draw_pass(&mut monitor, renderer)?;

    let mut session_watch = SessionWatch::new(config.watch_depth, tx.clone());
    session_watch.sync(monitor.session_path());

    let _root_watcher = match monitor.mode() {
        Mode::Auto => match watch::watch_sessions_root(monitor.sessions_dir(), tx.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(error = %e, "Sessions root watcher unavailable, new sessions found on tick");
                None
            }
        },
        Mode::Pinned => None,
    };

    let mut ticker = time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and the initial pass already ran.
    ticker.tick().await;

    info!(
        mode = ?monitor.mode(),
        session = ?monitor.session(),
        "Watch loop started"
    );

    loop {
        let deadline = debouncer.deadline();
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Watch loop cancelled");
                break;
            }

            _ = ticker.tick() => {
                debouncer.trigger(Instant::now());
            }

            Some(event) = rx.recv() => {
                trace!(?event, "Watch event");
                if let WatchEvent::SessionCreated(name) = &event {
                    monitor.focus_session(name);
                }
                debouncer.trigger(Instant::now());
            }

            _ = sleep_until(deadline) => {
                if debouncer.fire(Instant::now()) {
                    draw_pass(&mut monitor, renderer)?;
                    session_watch.sync(monitor.session_path());
                }
            }
        }
    }

    drop(session_watch);
    Ok(())
}

fn draw_pass<W: Write>(monitor: &mut Monitor, renderer: &mut FrameRenderer<W>) -> Result<()> {
    if let Some(frame) = monitor.refresh(now_ms()) {
        renderer.draw(&frame)?;
    }
    Ok(())
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

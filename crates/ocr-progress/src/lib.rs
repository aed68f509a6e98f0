//! OCR Progress - Live terminal viewer for Open Code Review sessions
//!
//! This library drives `ocr progress`: it keeps one region of the terminal
//! showing the current progress of a review or map session and redraws it
//! whenever the session changes on disk.
//!
//! # Architecture
//!
//! The viewer runs on a single-threaded runtime with four moving parts:
//!
//! 1. **Watchers**: `notify` watchers on the focused session and the
//!    sessions root, forwarding classified events into a channel
//! 2. **Debouncer**: coalesces ticks and watcher bursts into one pass
//! 3. **Monitor**: chooses the session and the frame to show for it
//! 4. **FrameRenderer**: repaints the terminal region in place
//!
//! The loop stops when its `CancellationToken` is cancelled.

pub mod config;
pub mod debounce;
pub mod error;
pub mod monitor;
pub mod runner;
pub mod terminal;
pub mod views;
pub mod watch;

// Re-export commonly used types
pub use config::{OcrPaths, ProgressConfig};
pub use debounce::Debouncer;
pub use error::{ProgressError, Result};
pub use monitor::{Mode, Monitor};
pub use runner::run;
pub use terminal::FrameRenderer;
pub use watch::WatchEvent;

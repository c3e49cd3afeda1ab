//! Command-mode panel overlay kickoff
//!
//! Delivers successive frame updates from a producer to a command-mode panel
//! through a single hardware transfer engine, one transfer at a time.
//!
//! # Components
//!
//! - [`HardwareCompletionGate`] - waits out the in-flight transfer
//! - [`CoalescingTimer`] - merges bursts of updates into one trigger
//! - [`VsyncGate`] - tear-safe start line and tear-check enable
//! - [`PipelineState`] - the single pipe and its flags, per panel lifetime
//! - [`OverlayCoordinator`] - runs the update cycle over all of the above
//!
//! The crate is executor-agnostic: every suspension point is a plain
//! future built on `embassy-sync` and `embassy-time`, and the interrupt
//! handler is a plain function.
//!
//! # Features
//!
//! - `std`: `std::error::Error` impls and the platform mocks
//! - `defmt`: log through defmt, derive `defmt::Format`
//! - `tracing`: log through tracing (host builds)
//!
//! # Example
//!
//! ```no_run
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//! use overlay::{OverlayCoordinator, UpdateRequest};
//! use platform::{OverlayHardware, PanelConfig};
//!
//! async fn show<H: OverlayHardware>(hw: H) {
//!     let overlay: OverlayCoordinator<CriticalSectionRawMutex, H> =
//!         OverlayCoordinator::new(hw, PanelConfig::default());
//!     if let Ok(outcome) = overlay.request_update(UpdateRequest::interactive()).await {
//!         overlay.wait_issued(outcome.ticket()).await;
//!     }
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod log;

pub mod coalesce;
pub mod completion;
pub mod coordinator;
pub mod error;
pub mod geometry;
pub mod progress;
pub mod state;
pub mod stats;
pub mod vsync;

pub use coalesce::{CoalescingTimer, CoalescingWindow, WindowRelease};
pub use completion::{CompletionSignal, HardwareCompletionGate, WaitOutcome};
pub use coordinator::{OverlayCoordinator, UpdateKind, UpdateOutcome, UpdateRequest};
pub use error::{CoalesceError, OverlayError};
pub use geometry::{compute_geometry, line_length};
pub use progress::{FrameProgress, FrameTicket};
pub use state::{Pipe, PipelineState, StereoSource};
pub use stats::{OverlayStats, StatsSnapshot};
pub use vsync::{compute_tear_safe_line, TearChannel, VsyncGate};

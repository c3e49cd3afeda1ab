//! Hardware Abstraction Layer (HAL) for the command-mode panel overlay path
//!
//! This crate provides trait-based abstractions for every hardware block the
//! overlay core talks to, enabling development and testing without the
//! display controller.
//!
//! # Architecture Layers
//!
//! ```text
//! Overlay core (overlay crate: gate, coalescing timer, vsync gate, coordinator)
//!         ↓
//! Platform HAL (this crate - trait abstractions + register map)
//!         ↓
//! Display controller driver (pipe allocator, mixer, DMA, DSI command engine)
//! ```
//!
//! # Abstraction Levels
//!
//! ## Collaborators
//! - [`SurfaceProvider`] - current framebuffer geometry and address
//! - [`PipeAllocator`] - pipe allocation and format negotiation
//! - [`MixerControl`] - mixer stage, output processor and output geometry
//! - [`TransferEngine`] / [`CommandEngine`] - the two kickoff triggers
//!
//! ## Register level
//! - [`registers`] - tear-check and stream-routing register map
//! - [`power`] - clock bracketing and completion interrupt control
//!
//! # Features
//!
//! - `std`: Enable standard library support and the [`mocks`] module
//! - `defmt`: Enable defmt derives
//!
//! # Example
//!
//! ```no_run
//! use platform::{ClockGuard, OverlayHardware, TransferEngine};
//!
//! fn kick<H: OverlayHardware>(hw: &mut H) {
//!     let mut hw = ClockGuard::acquire(hw);
//!     hw.trigger_hardware_transfer();
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
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod config;
pub mod display;
pub mod mixer;
pub mod pipe;
pub mod power;
pub mod registers;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export main collaborator traits
pub use display::{BufferAddress, HwError, PixelFormat, Surface, SurfaceProvider};
pub use mixer::{CommandEngine, MixerControl, PanelMode, StereoMode, TransferEngine};
pub use pipe::{MixerId, MixerStage, PipeAllocator, PipeConfig, PipeGeometry, PipeId, PipeKind};
pub use power::{ClockGuard, HardwareClock, InterruptControl};
pub use registers::RegisterBlock;

// Re-export configuration types
pub use config::{PanelConfig, VsyncSupport};

/// Everything the overlay core needs from the display controller, as one bound.
///
/// Implemented automatically for any type that implements each collaborator
/// trait; drivers never implement it by hand.
pub trait OverlayHardware:
    SurfaceProvider
    + PipeAllocator
    + MixerControl
    + TransferEngine
    + CommandEngine
    + RegisterBlock
    + InterruptControl
    + HardwareClock
{
}

impl<T> OverlayHardware for T where
    T: SurfaceProvider
        + PipeAllocator
        + MixerControl
        + TransferEngine
        + CommandEngine
        + RegisterBlock
        + InterruptControl
        + HardwareClock
{
}

//! Overlay error types

use platform::HwError;

/// Reasons an overlay operation did not reach the hardware.
///
/// None of these are retried; the next update request is the retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverlayError {
    /// Panel is powered off; no pipeline state exists.
    PanelOff,
    /// Pipe type lookup or allocation failed. The previous frame stays on screen.
    PipeAllocation(HwError),
    /// The allocated pipe rejected the surface format. The pipe was released.
    PipeFormat(HwError),
    /// Operation needs a configured pipe and none exists yet.
    NoActivePipe,
}

#[cfg(feature = "std")]
impl std::error::Error for OverlayError {}

impl core::fmt::Display for OverlayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PanelOff => write!(f, "Panel is powered off"),
            Self::PipeAllocation(e) => write!(f, "Pipe allocation failed: {e}"),
            Self::PipeFormat(e) => write!(f, "Pipe format negotiation failed: {e}"),
            Self::NoActivePipe => write!(f, "No active overlay pipe"),
        }
    }
}

/// Coalescing window misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoalesceError {
    /// A window is already open or still owes its trigger.
    AlreadyOpen,
}

#[cfg(feature = "std")]
impl std::error::Error for CoalesceError {}

impl core::fmt::Display for CoalesceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AlreadyOpen => write!(f, "Coalescing window already open"),
        }
    }
}

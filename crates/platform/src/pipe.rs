//! Overlay pipe abstraction
//!
//! A pipe is one configured hardware transfer path: it fetches a source
//! rectangle from memory and hands it to a mixer stage. The command-mode
//! panel path owns exactly one pipe for the lifetime of the panel.

use crate::display::{BufferAddress, HwError, PixelFormat};

/// Hardware pipe index assigned by the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipeId(pub u8);

/// Pipe classes offered by the display controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipeKind {
    /// RGB-only pipe
    Rgb,
    /// Video/graphics pipe (YUV capable, scaler)
    Vg,
}

/// Mixer (layer mixer / output) index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MixerId {
    /// Mixer 0, drives the primary panel
    Primary,
    /// Mixer 1, drives the secondary output
    Secondary,
}

impl MixerId {
    /// Hardware index of the mixer.
    pub const fn index(self) -> u8 {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }
}

/// Blend order of a pipe within its mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MixerStage(pub u8);

impl MixerStage {
    /// Base layer (stage 0), used by the full-screen panel pipe.
    pub const BASE: Self = Self(0);
}

/// Source and destination rectangles of a pipe plus its fetch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipeGeometry {
    /// Full source image width in pixels.
    pub src_width: u32,
    /// Full source image height in pixels.
    pub src_height: u32,
    /// Source crop origin X.
    pub src_x: u32,
    /// Source crop origin Y.
    pub src_y: u32,
    /// Source crop width.
    pub src_w: u32,
    /// Source crop height.
    pub src_h: u32,
    /// Destination origin X on the panel.
    pub dst_x: u32,
    /// Destination origin Y on the panel (scan line).
    pub dst_y: u32,
    /// Destination width.
    pub dst_w: u32,
    /// Destination height.
    pub dst_h: u32,
    /// Source line stride in bytes.
    pub stride: u32,
    /// Source plane 0 address.
    pub buffer: BufferAddress,
}

/// Everything a collaborator needs to program one pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipeConfig {
    /// Allocated pipe.
    pub id: PipeId,
    /// Pipe class.
    pub kind: PipeKind,
    /// Mixer the pipe feeds.
    pub mixer: MixerId,
    /// Blend stage within the mixer.
    pub stage: MixerStage,
    /// Source pixel format.
    pub format: PixelFormat,
    /// Current geometry.
    pub geometry: PipeGeometry,
}

/// Pipe allocator / formatter.
pub trait PipeAllocator {
    /// Pipe class able to fetch `format`.
    fn pipe_kind_for(&self, format: PixelFormat) -> Result<PipeKind, HwError>;

    /// Reserve a pipe of `kind` feeding `mixer`.
    fn allocate_pipe(&mut self, kind: PipeKind, mixer: MixerId) -> Result<PipeId, HwError>;

    /// Derive the pipe's unpack/fetch parameters from its source format.
    fn format_to_pipe(&mut self, pipe: &PipeConfig) -> Result<(), HwError>;

    /// Return a pipe to the allocator.
    fn release_pipe(&mut self, pipe: PipeId);
}

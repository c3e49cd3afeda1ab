//! Display surface abstraction

/// Bus address of a framebuffer as seen by the display controller.
///
/// The controller fetches over a 32-bit bus; a zero address is never valid
/// for scan-out but is not rejected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferAddress(pub u32);

impl BufferAddress {
    /// Raw bus address.
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Pixel formats a display surface can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
    /// 16-bit RGB 5:6:5
    Rgb565,
    /// 24-bit packed RGB
    Rgb888,
    /// 32-bit RGB, top byte ignored
    Xrgb8888,
    /// 32-bit RGB with alpha
    Argb8888,
    /// Planar YCbCr 4:2:0 (video pipes only)
    Yuv420,
}

impl PixelFormat {
    /// Bits per pixel of the first plane.
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Rgb565 => 16,
            Self::Rgb888 => 24,
            Self::Xrgb8888 | Self::Argb8888 => 32,
            Self::Yuv420 => 8,
        }
    }

    /// Bytes per pixel of the first plane.
    pub const fn bytes_per_pixel(self) -> u32 {
        self.bits_per_pixel() / 8
    }
}

/// Snapshot of the display surface the producer renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Surface {
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in pixels.
    pub height: u32,
    /// Line length in bytes (may exceed `width * bpp` for aligned pitches).
    pub line_length: u32,
    /// Pixel format of the surface.
    pub format: PixelFormat,
    /// Current scan-out buffer.
    pub buffer: BufferAddress,
}

impl Surface {
    /// Bytes per pixel of the surface format.
    pub const fn bytes_per_pixel(&self) -> u32 {
        self.format.bytes_per_pixel()
    }
}

/// Display-surface provider (the framebuffer device).
pub trait SurfaceProvider {
    /// Current surface dimensions, stride and buffer address.
    fn surface(&self) -> Surface;
}

/// Hardware collaborator errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HwError {
    /// No free pipe of the requested type
    AllocationFailed,
    /// Pixel format has no matching pipe type
    UnsupportedFormat,
    /// Pipe rejected the source format
    FormatRejected,
}

#[cfg(feature = "std")]
impl std::error::Error for HwError {}

impl core::fmt::Display for HwError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AllocationFailed => write!(f, "No free overlay pipe"),
            Self::UnsupportedFormat => write!(f, "Pixel format has no pipe type"),
            Self::FormatRejected => write!(f, "Pipe rejected source format"),
        }
    }
}

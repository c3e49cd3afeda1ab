//! Pipe geometry bookkeeping.
//!
//! The panel pipe always scans out the whole surface to the origin of the
//! panel. Only the source dimensions and stride change, depending on
//! whether a stereo source is active.

use platform::{PipeGeometry, Surface};

use crate::state::StereoSource;

/// Pixel alignment of the primary framebuffer's line pitch.
pub const PRIMARY_PITCH_ALIGN: u32 = 32;

/// Line length in bytes of a `xres`-pixel line of framebuffer `fb_index`.
///
/// The primary framebuffer (index 0) pads each line to a multiple of
/// [`PRIMARY_PITCH_ALIGN`] pixels; other framebuffers are tightly packed.
///
/// ```
/// use overlay::geometry::line_length;
///
/// assert_eq!(line_length(0, 480, 4), 1920);
/// assert_eq!(line_length(0, 470, 2), 960);
/// assert_eq!(line_length(1, 470, 2), 940);
/// ```
pub const fn line_length(fb_index: u32, xres: u32, bytes_per_pixel: u32) -> u32 {
    let pixels = if fb_index == 0 {
        match xres.checked_next_multiple_of(PRIMARY_PITCH_ALIGN) {
            Some(aligned) => aligned,
            None => xres,
        }
    } else {
        xres
    };
    pixels.saturating_mul(bytes_per_pixel)
}

/// Full-screen base-layer geometry for `surface`.
///
/// Without a stereo source the dimensions and stride come straight from the
/// surface. With one, the stereo dimensions replace them and the stride is
/// derived for the primary framebuffer. Offsets are always zero.
pub fn compute_geometry(surface: &Surface, stereo: Option<StereoSource>) -> PipeGeometry {
    let (width, height, stride) = match stereo {
        Some(src) => (
            src.width,
            src.height,
            line_length(0, src.width, surface.bytes_per_pixel()),
        ),
        None => (surface.width, surface.height, surface.line_length),
    };
    PipeGeometry {
        src_width: width,
        src_height: height,
        src_x: 0,
        src_y: 0,
        src_w: width,
        src_h: height,
        dst_x: 0,
        dst_y: 0,
        dst_w: width,
        dst_h: height,
        stride,
        buffer: surface.buffer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::{BufferAddress, PixelFormat};

    fn panel() -> Surface {
        Surface {
            width: 480,
            height: 800,
            line_length: 2048,
            format: PixelFormat::Rgb565,
            buffer: BufferAddress(0x2000_0000),
        }
    }

    #[test]
    fn flat_geometry_follows_surface() {
        let g = compute_geometry(&panel(), None);
        assert_eq!((g.src_width, g.src_height), (480, 800));
        assert_eq!((g.dst_w, g.dst_h), (480, 800));
        assert_eq!((g.dst_x, g.dst_y), (0, 0));
        assert_eq!(g.stride, 2048);
        assert_eq!(g.buffer, BufferAddress(0x2000_0000));
    }

    #[test]
    fn stereo_geometry_derives_stride() {
        let g = compute_geometry(
            &panel(),
            Some(StereoSource {
                width: 950,
                height: 400,
            }),
        );
        assert_eq!((g.src_w, g.src_h), (950, 400));
        assert_eq!((g.dst_w, g.dst_h), (950, 400));
        // 950 px rounds up to 960, two bytes each.
        assert_eq!(g.stride, 1920);
    }

    #[test]
    fn line_length_saturates() {
        assert_eq!(line_length(1, u32::MAX, 4), u32::MAX);
        assert_eq!(line_length(0, u32::MAX, 1), u32::MAX);
    }
}

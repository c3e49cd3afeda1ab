//! Tear-check gating.
//!
//! The panel latches geometry on a programmable scan line. Writing the
//! start line `lead_lines` rows ahead of the destination row keeps the
//! register update ahead of the beam.

use core::sync::atomic::{AtomicBool, Ordering};

use platform::registers::{PRIMARY_START_LINE, SECONDARY_START_LINE, TEAR_CHECK_ENABLE};
use platform::{PanelConfig, RegisterBlock, VsyncSupport};

/// Output channel of the tear-check block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TearChannel {
    /// Channel 0, primary panel
    Primary,
    /// Channel 1, secondary panel
    Secondary,
}

impl TearChannel {
    /// Enable bit of this channel in the tear-check enable register.
    pub const fn mask(self) -> u32 {
        match self {
            Self::Primary => 0b01,
            Self::Secondary => 0b10,
        }
    }

    /// Start-line register of this channel.
    pub const fn start_line_register(self) -> u32 {
        match self {
            Self::Primary => PRIMARY_START_LINE,
            Self::Secondary => SECONDARY_START_LINE,
        }
    }
}

/// Scan line `lead_lines` rows ahead of `dst_y`, wrapping backward across
/// the frame boundary.
///
/// - `lead_lines <= dst_y`: `dst_y - lead_lines`
/// - otherwise: `(total_lines - 1) - (lead_lines - dst_y)`
///
/// A lead longer than the whole frame wraps more than once and is reduced
/// modulo `total_lines` first, so the result always lies in
/// `[0, total_lines)` for `total_lines > 0`. A zero-line frame yields 0.
///
/// ```
/// use overlay::vsync::compute_tear_safe_line;
///
/// assert_eq!(compute_tear_safe_line(100, 800, 4), 96);
/// assert_eq!(compute_tear_safe_line(1, 800, 4), 796);
/// ```
pub const fn compute_tear_safe_line(dst_y: u32, total_lines: u32, lead_lines: u32) -> u32 {
    if lead_lines <= dst_y {
        return dst_y.saturating_sub(lead_lines);
    }
    let Some(last) = total_lines.checked_sub(1) else {
        return 0;
    };
    let behind = lead_lines.saturating_sub(dst_y);
    match last.checked_sub(behind) {
        Some(line) => line,
        None => match behind.checked_rem(total_lines) {
            Some(behind) => last.saturating_sub(behind),
            None => 0,
        },
    }
}

/// Tear-check policy for one panel.
pub struct VsyncGate {
    support: VsyncSupport,
    surface_vsync: AtomicBool,
    total_lines: u32,
    lead_lines: u32,
}

impl VsyncGate {
    /// Gate for `config`'s panel.
    pub const fn new(config: &PanelConfig) -> Self {
        Self {
            support: config.vsync,
            surface_vsync: AtomicBool::new(config.vsync.surface_vsync),
            total_lines: config.total_lines,
            lead_lines: config.lead_lines,
        }
    }

    /// Turn vsync-synchronised updates on or off for the surface.
    pub fn set_gating(&self, enabled: bool) {
        self.surface_vsync.store(enabled, Ordering::Release);
    }

    /// True when geometry rewrites are held to the tear-safe line.
    pub fn is_gated(&self) -> bool {
        self.support.mdp_vsync
            && self.support.panel_vsync
            && self.surface_vsync.load(Ordering::Acquire)
    }

    /// Tear-safe line for a destination starting at `dst_y` on this panel.
    pub fn tear_safe_line(&self, dst_y: u32) -> u32 {
        compute_tear_safe_line(dst_y, self.total_lines, self.lead_lines)
    }

    /// Program tear-check for `channel`.
    ///
    /// When gated, writes the tear-safe start line and sets the channel's
    /// enable bit, returning the line. Otherwise clears the enable bit and
    /// returns `None`. Caller holds the register clock.
    pub fn set_tear_enable<R: RegisterBlock + ?Sized>(
        &self,
        regs: &mut R,
        channel: TearChannel,
        dst_y: u32,
    ) -> Option<u32> {
        let mask = channel.mask();
        if self.is_gated() {
            let line = self.tear_safe_line(dst_y);
            regs.write(channel.start_line_register(), line);
            regs.modify(TEAR_CHECK_ENABLE, |v| v | mask);
            Some(line)
        } else {
            regs.modify(TEAR_CHECK_ENABLE, |v| v & !mask);
            None
        }
    }
}

//! Panel configuration and overlay tunables
//!
//! This module defines the configuration values shared by the overlay core.
//! Timing tunables should reference these constants rather than hardcoding
//! values.

/// Scan lines between the tear-safe start line and the destination row.
///
/// The start-line register is written this many lines ahead of where the
/// raster reaches the updated region, covering the register-program latency.
pub const VSYNC_LEAD_LINES: u32 = 4;

/// Length of the update-coalescing window in milliseconds.
///
/// Long enough to merge a burst of same-frame updates, short enough that a
/// stalled producer delays the display by at most one window.
pub const COALESCE_WINDOW_MS: u64 = 10;

/// Total scan lines (visible + porches) of the reference 480×800 panel.
pub const DEFAULT_TOTAL_LINES: u32 = 800;

/// Vsync capabilities that together enable tear gating.
///
/// Gating is active only when all three are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VsyncSupport {
    /// Display controller uses its own vsync counter (tear-check block).
    pub mdp_vsync: bool,
    /// The producer asked for vsync-synchronised updates on this surface.
    pub surface_vsync: bool,
    /// The panel exposes a tear-effect signal.
    pub panel_vsync: bool,
}

impl VsyncSupport {
    /// All vsync sources available.
    pub const ALL: Self = Self {
        mdp_vsync: true,
        surface_vsync: true,
        panel_vsync: true,
    };

    /// No vsync gating.
    pub const NONE: Self = Self {
        mdp_vsync: false,
        surface_vsync: false,
        panel_vsync: false,
    };

    /// True when every vsync source is present.
    pub const fn gating_available(&self) -> bool {
        self.mdp_vsync && self.surface_vsync && self.panel_vsync
    }
}

/// Static description of the command-mode panel and overlay tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelConfig {
    /// Total scan lines per frame, including porches.
    pub total_lines: u32,
    /// Vsync capabilities.
    pub vsync: VsyncSupport,
    /// Tear-safe lead in scan lines.
    pub lead_lines: u32,
    /// Coalescing window length in milliseconds.
    pub coalesce_window_ms: u64,
}

impl PanelConfig {
    /// Panel with `total_lines` lines, full vsync support and default tunables.
    pub const fn new(total_lines: u32) -> Self {
        Self {
            total_lines,
            vsync: VsyncSupport::ALL,
            lead_lines: VSYNC_LEAD_LINES,
            coalesce_window_ms: COALESCE_WINDOW_MS,
        }
    }

    /// Replace the vsync capabilities.
    #[must_use]
    pub const fn with_vsync(mut self, vsync: VsyncSupport) -> Self {
        self.vsync = vsync;
        self
    }

    /// Replace the coalescing window length.
    #[must_use]
    pub const fn with_coalesce_window_ms(mut self, ms: u64) -> Self {
        self.coalesce_window_ms = ms;
        self
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_LINES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_panel_uses_documented_tunables() {
        let cfg = PanelConfig::default();
        assert_eq!(cfg.total_lines, 800);
        assert_eq!(cfg.lead_lines, 4);
        assert_eq!(cfg.coalesce_window_ms, 10);
        assert!(cfg.vsync.gating_available());
    }

    #[test]
    fn gating_needs_every_vsync_source() {
        let partial = VsyncSupport {
            panel_vsync: false,
            ..VsyncSupport::ALL
        };
        assert!(!partial.gating_available());
        assert!(!VsyncSupport::NONE.gating_available());
    }
}

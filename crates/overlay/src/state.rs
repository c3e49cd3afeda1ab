//! Pipeline state
//!
//! One owned object per panel lifetime: the active pipe, the completion
//! gate (busy flag and pending pipe) and the coalescing window. Every field
//! sits behind a short blocking critical section; the coarse update lock
//! lives in the coordinator.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use platform::registers::{
    DSI_STREAM_ID, DSI_STREAM_ID_DMA_P0_DMA_S1, DSI_TRIGGER_ON_DMA_P, DSI_TRIGGER_SELECT,
};
use platform::{
    MixerControl, MixerId, MixerStage, PanelMode, PipeAllocator, PipeConfig, PipeGeometry,
    PipeId, PixelFormat, RegisterBlock,
};

use crate::coalesce::CoalescingTimer;
use crate::completion::HardwareCompletionGate;
use crate::error::OverlayError;

/// Dimensions of a side-by-side stereo source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StereoSource {
    /// Source width covering both eyes, in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
}

/// The panel's one configured transfer path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pipe {
    /// What the collaborators program.
    pub config: PipeConfig,
    /// Active stereo source, if any.
    pub stereo: Option<StereoSource>,
    /// Held by the panel path.
    pub in_use: bool,
}

struct Slots {
    pipe: Option<Pipe>,
    powered: bool,
}

/// Process-wide state of the command-mode overlay path.
pub struct PipelineState<M: RawMutex> {
    slots: Mutex<M, RefCell<Slots>>,
    gate: HardwareCompletionGate<M>,
    window: CoalescingTimer<M>,
}

impl<M: RawMutex> PipelineState<M> {
    /// Powered panel, no pipe yet.
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new(Slots {
                pipe: None,
                powered: true,
            })),
            gate: HardwareCompletionGate::new(),
            window: CoalescingTimer::new(),
        }
    }

    /// Completion gate of the panel pipe.
    pub fn gate(&self) -> &HardwareCompletionGate<M> {
        &self.gate
    }

    /// Coalescing window.
    pub fn window(&self) -> &CoalescingTimer<M> {
        &self.window
    }

    /// Return the active pipe, creating it on first use.
    ///
    /// Creation picks the pipe class for `format`, allocates on the primary
    /// mixer at the base stage, selects command mode, negotiates the format
    /// and routes the DSI stream to the primary DMA. A rejected format hands
    /// the pipe straight back to the allocator. Caller holds the clock.
    pub fn get_or_create_pipe<H>(&self, format: PixelFormat, hw: &mut H) -> Result<Pipe, OverlayError>
    where
        H: PipeAllocator + MixerControl + RegisterBlock + ?Sized,
    {
        if let Some(pipe) = self.active_pipe() {
            return Ok(pipe);
        }

        let kind = hw
            .pipe_kind_for(format)
            .map_err(OverlayError::PipeAllocation)?;
        let id = hw
            .allocate_pipe(kind, MixerId::Primary)
            .map_err(OverlayError::PipeAllocation)?;
        let config = PipeConfig {
            id,
            kind,
            mixer: MixerId::Primary,
            stage: MixerStage::BASE,
            format,
            geometry: PipeGeometry::default(),
        };

        hw.set_panel_mode(config.mixer, PanelMode::DsiCommand);
        if let Err(e) = hw.format_to_pipe(&config) {
            hw.release_pipe(id);
            return Err(OverlayError::PipeFormat(e));
        }

        hw.write(DSI_STREAM_ID, DSI_STREAM_ID_DMA_P0_DMA_S1);
        hw.write(DSI_TRIGGER_SELECT, DSI_TRIGGER_ON_DMA_P);

        let pipe = Pipe {
            config,
            stereo: None,
            in_use: true,
        };
        self.slots.lock(|s| s.borrow_mut().pipe = Some(pipe));
        info!("overlay: pipe {} created on mixer {}", id.0, config.mixer.index());
        Ok(pipe)
    }

    /// Snapshot of the active pipe.
    pub fn active_pipe(&self) -> Option<Pipe> {
        self.slots.lock(|s| s.borrow().pipe)
    }

    /// Id of the active pipe.
    pub fn active_pipe_id(&self) -> Option<PipeId> {
        self.active_pipe().map(|p| p.config.id)
    }

    /// Mutate the active pipe in place; `None` when there is no pipe.
    pub fn update_pipe(&self, f: impl FnOnce(&mut Pipe)) -> Option<Pipe> {
        self.slots.lock(|s| {
            let mut s = s.borrow_mut();
            let pipe = s.pipe.as_mut()?;
            f(pipe);
            Some(*pipe)
        })
    }

    /// Store freshly computed geometry on the active pipe.
    pub fn set_geometry(&self, geometry: PipeGeometry) -> Option<Pipe> {
        self.update_pipe(|p| p.config.geometry = geometry)
    }

    /// See [`HardwareCompletionGate::mark_busy`].
    pub fn mark_busy(&self) {
        self.gate.mark_busy();
    }

    /// See [`HardwareCompletionGate::clear_busy`].
    pub fn clear_busy(&self) {
        self.gate.clear_busy();
    }

    /// See [`HardwareCompletionGate::set_pending`].
    pub fn set_pending(&self, pipe: PipeId) {
        self.gate.set_pending(pipe);
    }

    /// See [`HardwareCompletionGate::clear_pending`].
    pub fn clear_pending(&self) {
        self.gate.clear_pending();
    }

    /// Coalescing counter, 0 or 1.
    pub fn coalesce_counter(&self) -> u8 {
        self.window.counter()
    }

    /// Start a new panel lifetime.
    pub fn set_powered(&self, powered: bool) {
        self.slots.lock(|s| s.borrow_mut().powered = powered);
    }

    /// False between power-off and the next power-on.
    pub fn is_powered(&self) -> bool {
        self.slots.lock(|s| s.borrow().powered)
    }

    /// End the panel lifetime: mark it off, drop the pipe and return it to
    /// the allocator. Returns the released pipe.
    pub fn teardown<H: PipeAllocator + ?Sized>(&self, hw: &mut H) -> Option<PipeId> {
        let pipe = self.slots.lock(|s| {
            let mut s = s.borrow_mut();
            s.powered = false;
            s.pipe.take()
        });
        self.gate.clear_pending();
        self.gate.clear_busy();
        let pipe = pipe?;
        hw.release_pipe(pipe.config.id);
        Some(pipe.config.id)
    }
}

impl<M: RawMutex> Default for PipelineState<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use platform::mocks::{HwEvent, MockHardware};
    use platform::{HwError, PipeKind};

    type State = PipelineState<CriticalSectionRawMutex>;

    #[test]
    fn pipe_is_created_once() {
        let state = State::new();
        let mut hw = MockHardware::new();

        let first = state.get_or_create_pipe(PixelFormat::Xrgb8888, &mut hw).unwrap();
        let second = state.get_or_create_pipe(PixelFormat::Xrgb8888, &mut hw).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.config.stage, MixerStage::BASE);
        assert_eq!(first.config.mixer, MixerId::Primary);
        assert_eq!(first.config.kind, PipeKind::Rgb);
        assert!(first.in_use);
        assert_eq!(hw.count(HwEvent::PipeAllocated(first.config.id)), 1);
        assert_eq!(hw.count(HwEvent::PanelModeSet(PanelMode::DsiCommand)), 1);
        assert_eq!(hw.read(DSI_STREAM_ID), 0x10);
        assert_eq!(hw.read(DSI_TRIGGER_SELECT), 0x01);
    }

    #[test]
    fn allocation_failure_leaves_no_pipe() {
        let state = State::new();
        let mut hw = MockHardware::new();
        hw.fail_allocation(true);

        let err = state.get_or_create_pipe(PixelFormat::Rgb565, &mut hw);

        assert_eq!(err, Err(OverlayError::PipeAllocation(HwError::AllocationFailed)));
        assert_eq!(state.active_pipe(), None);
        assert_eq!(hw.read(DSI_STREAM_ID), 0);
    }

    #[test]
    fn format_failure_releases_pipe() {
        let state = State::new();
        let mut hw = MockHardware::new();
        hw.fail_format(true);

        let err = state.get_or_create_pipe(PixelFormat::Rgb565, &mut hw);

        assert_eq!(err, Err(OverlayError::PipeFormat(HwError::FormatRejected)));
        assert_eq!(state.active_pipe(), None);
        assert_eq!(hw.count(HwEvent::PipeReleased(PipeId(0))), 1);
    }

    #[test]
    fn teardown_returns_pipe_and_powers_off() {
        let state = State::new();
        let mut hw = MockHardware::new();
        let pipe = state.get_or_create_pipe(PixelFormat::Rgb565, &mut hw).unwrap();
        state.mark_busy();

        assert_eq!(state.teardown(&mut hw), Some(pipe.config.id));

        assert!(!state.is_powered());
        assert!(!state.gate().is_busy());
        assert_eq!(state.active_pipe(), None);
        assert_eq!(hw.count(HwEvent::PipeReleased(pipe.config.id)), 1);
    }

    #[test]
    fn update_without_pipe_is_none() {
        let state = State::new();
        assert_eq!(state.set_geometry(PipeGeometry::default()), None);
    }
}

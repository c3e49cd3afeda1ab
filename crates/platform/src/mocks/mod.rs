//! Mock implementations for testing
//!
//! [`MockHardware`] implements every collaborator trait, records the traffic
//! it sees, and lets tests inject allocation failures and mixer drain state.

#![cfg(any(test, feature = "std"))]

use crate::*;

/// Maximum number of recorded hardware events.
pub const EVENT_LOG_DEPTH: usize = 256;

/// Distinct register offsets the mock register file holds.
pub const REGISTER_SLOTS: usize = 16;

/// One observable call into the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwEvent {
    /// Clock vote taken
    ClockAcquired,
    /// Clock vote dropped
    ClockReleased,
    /// Completion interrupt unmasked
    IrqEnabled,
    /// Completion interrupt masked
    IrqDisabled,
    /// Pipe handed out by the allocator
    PipeAllocated(PipeId),
    /// Pipe returned to the allocator
    PipeReleased(PipeId),
    /// Panel interface mode selected
    PanelModeSet(PanelMode),
    /// Stereo mode selected
    StereoModeSet(StereoMode),
    /// Pipe fetch registers programmed
    PipeSetup,
    /// Mixer stage committed
    MixerStageCommitted(MixerStage),
    /// Output processor configured
    OutputProcessorConfigured,
    /// Output geometry programmed
    OutputGeometryProgrammed(PipeGeometry),
    /// Output DMA configured
    OutputDmaConfigured,
    /// Register written
    RegisterWrite {
        /// Register offset
        offset: u32,
        /// Value written
        value: u32,
    },
    /// Overlay DMA kicked
    TransferTriggered,
    /// DSI software trigger
    SoftwareTrigger,
    /// Write barrier
    Barrier,
    /// Per-cycle resource release
    ResourcesReleased,
}

/// Mock display controller.
pub struct MockHardware {
    surface: Surface,
    draining: bool,
    fail_allocation: bool,
    fail_format: bool,
    next_pipe: u8,
    clock_votes: u32,
    max_clock_votes: u32,
    irq_enabled: bool,
    transfers: u32,
    software_triggers: u32,
    registers: heapless::LinearMap<u32, u32, REGISTER_SLOTS>,
    events: heapless::Vec<HwEvent, EVENT_LOG_DEPTH>,
}

impl MockHardware {
    /// Mock with a 480×800 XRGB8888 surface at a fixed address.
    pub fn new() -> Self {
        Self::with_surface(Surface {
            width: 480,
            height: 800,
            line_length: 1920,
            format: PixelFormat::Xrgb8888,
            buffer: BufferAddress(0x4000_0000),
        })
    }

    /// Mock with a custom surface.
    pub fn with_surface(surface: Surface) -> Self {
        Self {
            surface,
            draining: false,
            fail_allocation: false,
            fail_format: false,
            next_pipe: 0,
            clock_votes: 0,
            max_clock_votes: 0,
            irq_enabled: false,
            transfers: 0,
            software_triggers: 0,
            registers: heapless::LinearMap::new(),
            events: heapless::Vec::new(),
        }
    }

    /// Replace the surface returned by [`SurfaceProvider::surface`].
    pub fn set_surface(&mut self, surface: Surface) {
        self.surface = surface;
    }

    /// Make [`MixerControl::is_mixer_draining`] report `draining`.
    pub fn set_draining(&mut self, draining: bool) {
        self.draining = draining;
    }

    /// Make the next allocations fail.
    pub fn fail_allocation(&mut self, fail: bool) {
        self.fail_allocation = fail;
    }

    /// Make format negotiation fail.
    pub fn fail_format(&mut self, fail: bool) {
        self.fail_format = fail;
    }

    /// Number of overlay DMA kicks.
    pub fn transfers(&self) -> u32 {
        self.transfers
    }

    /// Number of DSI software triggers.
    pub fn software_triggers(&self) -> u32 {
        self.software_triggers
    }

    /// Outstanding clock votes (0 when every bracket is balanced).
    pub fn clock_votes(&self) -> u32 {
        self.clock_votes
    }

    /// Deepest clock nesting observed.
    pub fn max_clock_votes(&self) -> u32 {
        self.max_clock_votes
    }

    /// Whether the completion interrupt is unmasked.
    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> &[HwEvent] {
        &self.events
    }

    /// Forget recorded events.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Number of recorded events equal to `event`.
    pub fn count(&self, event: HwEvent) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }

    /// Last geometry programmed on the output.
    pub fn last_output_geometry(&self) -> Option<PipeGeometry> {
        self.events.iter().rev().find_map(|e| match e {
            HwEvent::OutputGeometryProgrammed(g) => Some(*g),
            _ => None,
        })
    }

    #[allow(clippy::panic)]
    fn record(&mut self, event: HwEvent) {
        if self.events.push(event).is_err() {
            panic!("mock event log full ({EVENT_LOG_DEPTH} events); call clear_events()");
        }
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceProvider for MockHardware {
    fn surface(&self) -> Surface {
        self.surface
    }
}

impl PipeAllocator for MockHardware {
    fn pipe_kind_for(&self, format: PixelFormat) -> Result<PipeKind, HwError> {
        match format {
            PixelFormat::Yuv420 => Ok(PipeKind::Vg),
            _ => Ok(PipeKind::Rgb),
        }
    }

    fn allocate_pipe(&mut self, _kind: PipeKind, _mixer: MixerId) -> Result<PipeId, HwError> {
        if self.fail_allocation {
            return Err(HwError::AllocationFailed);
        }
        let id = PipeId(self.next_pipe);
        self.next_pipe = self.next_pipe.wrapping_add(1);
        self.record(HwEvent::PipeAllocated(id));
        Ok(id)
    }

    fn format_to_pipe(&mut self, _pipe: &PipeConfig) -> Result<(), HwError> {
        if self.fail_format {
            Err(HwError::FormatRejected)
        } else {
            Ok(())
        }
    }

    fn release_pipe(&mut self, pipe: PipeId) {
        self.record(HwEvent::PipeReleased(pipe));
    }
}

impl MixerControl for MockHardware {
    fn set_panel_mode(&mut self, _mixer: MixerId, mode: PanelMode) {
        self.record(HwEvent::PanelModeSet(mode));
    }

    fn set_stereo_mode(&mut self, _mixer: MixerId, mode: StereoMode) {
        self.record(HwEvent::StereoModeSet(mode));
    }

    fn setup_pipe(&mut self, _pipe: &PipeConfig) {
        self.record(HwEvent::PipeSetup);
    }

    fn commit_mixer_stage(&mut self, pipe: &PipeConfig) {
        self.record(HwEvent::MixerStageCommitted(pipe.stage));
    }

    fn configure_output_processor(&mut self, _pipe: &PipeConfig) {
        self.record(HwEvent::OutputProcessorConfigured);
    }

    fn program_output_geometry(&mut self, pipe: &PipeConfig) {
        self.record(HwEvent::OutputGeometryProgrammed(pipe.geometry));
    }

    fn configure_output_dma(&mut self, _mixer: MixerId) {
        self.record(HwEvent::OutputDmaConfigured);
    }

    fn is_mixer_draining(&self, _mixer: MixerId) -> bool {
        self.draining
    }

    fn release_unused_resources(&mut self) {
        self.record(HwEvent::ResourcesReleased);
    }
}

impl TransferEngine for MockHardware {
    fn trigger_hardware_transfer(&mut self) {
        self.transfers = self.transfers.wrapping_add(1);
        self.record(HwEvent::TransferTriggered);
    }
}

impl CommandEngine for MockHardware {
    fn software_trigger(&mut self) {
        self.software_triggers = self.software_triggers.wrapping_add(1);
        self.record(HwEvent::SoftwareTrigger);
    }
}

impl RegisterBlock for MockHardware {
    fn read(&self, offset: u32) -> u32 {
        self.registers.get(&offset).copied().unwrap_or(0)
    }

    #[allow(clippy::panic)]
    fn write(&mut self, offset: u32, value: u32) {
        if self.registers.insert(offset, value).is_err() {
            panic!("mock register file full ({REGISTER_SLOTS} offsets), writing {offset:#x}");
        }
        self.record(HwEvent::RegisterWrite { offset, value });
    }

    fn barrier(&mut self) {
        self.record(HwEvent::Barrier);
    }
}

impl InterruptControl for MockHardware {
    fn enable_completion_irq(&mut self) {
        self.irq_enabled = true;
        self.record(HwEvent::IrqEnabled);
    }

    fn disable_completion_irq(&mut self) {
        self.irq_enabled = false;
        self.record(HwEvent::IrqDisabled);
    }
}

impl HardwareClock for MockHardware {
    fn acquire_clock(&mut self) {
        self.clock_votes = self.clock_votes.saturating_add(1);
        self.max_clock_votes = self.max_clock_votes.max(self.clock_votes);
        self.record(HwEvent::ClockAcquired);
    }

    fn release_clock(&mut self) {
        self.clock_votes = self.clock_votes.saturating_sub(1);
        self.record(HwEvent::ClockReleased);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::TEAR_CHECK_ENABLE;

    #[test]
    fn clock_guard_releases_on_drop() {
        let mut hw = MockHardware::new();
        {
            let mut guard = ClockGuard::acquire(&mut hw);
            guard.write(TEAR_CHECK_ENABLE, 1);
            assert_eq!(guard.clock_votes(), 1);
        }
        assert_eq!(hw.clock_votes(), 0);
        assert_eq!(
            hw.events(),
            &[
                HwEvent::ClockAcquired,
                HwEvent::RegisterWrite {
                    offset: TEAR_CHECK_ENABLE,
                    value: 1
                },
                HwEvent::ClockReleased,
            ]
        );
    }

    #[test]
    fn clock_guard_releases_on_early_return() {
        fn fallible(hw: &mut MockHardware) -> Result<(), HwError> {
            let mut hw = ClockGuard::acquire(hw);
            hw.fail_allocation(true);
            hw.allocate_pipe(PipeKind::Rgb, MixerId::Primary)?;
            Ok(())
        }

        let mut hw = MockHardware::new();
        assert_eq!(fallible(&mut hw), Err(HwError::AllocationFailed));
        assert_eq!(hw.clock_votes(), 0);
    }

    #[test]
    fn modify_preserves_other_bits() {
        let mut hw = MockHardware::new();
        hw.write(TEAR_CHECK_ENABLE, 0b10);
        hw.modify(TEAR_CHECK_ENABLE, |v| v | 0b01);
        assert_eq!(hw.read(TEAR_CHECK_ENABLE), 0b11);
    }

    #[test]
    #[should_panic(expected = "mock event log full")]
    fn full_event_log_fails_loudly() {
        let mut hw = MockHardware::new();
        for _ in 0..=EVENT_LOG_DEPTH {
            hw.barrier();
        }
    }

    #[test]
    #[should_panic(expected = "mock register file full")]
    fn full_register_file_fails_loudly() {
        let mut hw = MockHardware::new();
        for offset in (0u32..).step_by(4).take(REGISTER_SLOTS + 1) {
            hw.write(offset, 1);
        }
    }

    #[test]
    fn cleared_log_accepts_more_events() {
        let mut hw = MockHardware::new();
        for _ in 0..EVENT_LOG_DEPTH {
            hw.barrier();
        }
        hw.clear_events();
        hw.barrier();
        assert_eq!(hw.events(), &[HwEvent::Barrier]);
    }

    #[test]
    fn allocation_hands_out_distinct_pipes() {
        let mut hw = MockHardware::new();
        let a = hw.allocate_pipe(PipeKind::Rgb, MixerId::Primary);
        let b = hw.allocate_pipe(PipeKind::Rgb, MixerId::Primary);
        assert_ne!(a, b);
    }
}

//! Mixer, output processor and trigger collaborators

use crate::pipe::{MixerId, PipeConfig};

/// Interface mode of the panel attached to a mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelMode {
    /// DSI command mode: frames are pushed on explicit trigger
    DsiCommand,
    /// DSI video mode: continuous scan-out
    DsiVideo,
}

/// Stereoscopic output mode of a mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StereoMode {
    /// Plain 2D output
    #[default]
    None,
    /// Left/right halves of the source sent side by side
    SideBySide,
}

/// Mixer / output collaborator.
///
/// All calls are register writes on the display controller and must be made
/// with the hardware clock held (see [`crate::ClockGuard`]), except
/// [`MixerControl::is_mixer_draining`] and the mode setters.
pub trait MixerControl {
    /// Select the panel interface mode for `mixer`.
    fn set_panel_mode(&mut self, mixer: MixerId, mode: PanelMode);

    /// Select the stereoscopic mode for `mixer`.
    fn set_stereo_mode(&mut self, mixer: MixerId, mode: StereoMode);

    /// Program the pipe's fetch registers (source rectangle, stride, address).
    fn setup_pipe(&mut self, pipe: &PipeConfig);

    /// Place the pipe at its mixer stage.
    fn commit_mixer_stage(&mut self, pipe: &PipeConfig);

    /// Configure the overlay processor feeding the pipe's output.
    fn configure_output_processor(&mut self, pipe: &PipeConfig);

    /// Program the destination origin and size on the output DMA.
    fn program_output_geometry(&mut self, pipe: &PipeConfig);

    /// Configure the output DMA format for `mixer`.
    fn configure_output_dma(&mut self, mixer: MixerId);

    /// True while the mixer is still pushing a previous frame out.
    fn is_mixer_draining(&self, mixer: MixerId) -> bool;

    /// Free pipes and stages that were staged for release during this cycle.
    fn release_unused_resources(&mut self);
}

/// Starts the overlay DMA transfer of the configured frame.
pub trait TransferEngine {
    /// Kick the overlay pipe.
    fn trigger_hardware_transfer(&mut self);
}

/// Panel command engine (DSI host).
pub trait CommandEngine {
    /// Software trigger: forward the transferred frame to the panel.
    fn software_trigger(&mut self);
}

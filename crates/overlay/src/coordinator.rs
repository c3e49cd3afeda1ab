//! Overlay coordinator
//!
//! Drives one update cycle at a time through the command-mode pipe:
//!
//! ```text
//! IDLE → AWAITING_PRIOR_COMPLETION → CONFIGURING → KICKOFF_DECISION
//!          ├─ owed trigger pending ─────────────► PIGGYBACK ─────────┐
//!          ├─ interactive + mixer draining ─────► COALESCING_WAIT ─┐ │
//!          └─ otherwise ────────────────────────► IMMEDIATE ───────┤ │
//!                                                      TRIGGERED ◄─┘ │
//!                                                          └──► IDLE ◄┘
//! ```
//!
//! # Locks
//!
//! | Lock            | Kind            | Held for                               |
//! |-----------------|-----------------|----------------------------------------|
//! | `update_lock`   | async mutex     | a whole cycle, dropped over the window |
//! | `kickoff_lock`  | async mutex     | the trigger sequence                   |
//! | `hw`            | blocking mutex  | each register sequence                 |
//! | pipeline state  | blocking mutex  | single flag or pointer updates         |
//!
//! The interrupt path only ever takes the blocking mutexes, so it can
//! always make progress while a request is suspended.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

use platform::{
    BufferAddress, ClockGuard, MixerControl, OverlayHardware, PanelConfig, PipeConfig, PipeId,
    StereoMode,
};

use crate::coalesce::WindowRelease;
use crate::completion::WaitOutcome;
use crate::error::OverlayError;
use crate::geometry::compute_geometry;
use crate::progress::{FrameProgress, FrameTicket};
use crate::state::{Pipe, PipelineState, StereoSource};
use crate::stats::{OverlayStats, StatsSnapshot};
use crate::vsync::{TearChannel, VsyncGate};

/// Kind of producer behind an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateKind {
    /// UI or scroll traffic: may wait in a coalescing window.
    #[default]
    Interactive,
    /// Video frames: never opens a window.
    Video,
}

/// One "please show the current surface" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UpdateRequest {
    /// Kickoff policy.
    pub kind: UpdateKind,
    /// Scan-out buffer override (pan/flip). `None` uses the surface buffer.
    pub buffer: Option<BufferAddress>,
}

impl UpdateRequest {
    /// Interactive update of the current surface buffer.
    pub const fn interactive() -> Self {
        Self {
            kind: UpdateKind::Interactive,
            buffer: None,
        }
    }

    /// Video update of the current surface buffer.
    pub const fn video() -> Self {
        Self {
            kind: UpdateKind::Video,
            buffer: None,
        }
    }

    /// Scan out from `buffer` instead of the surface's current buffer.
    #[must_use]
    pub const fn with_buffer(mut self, buffer: BufferAddress) -> Self {
        self.buffer = Some(buffer);
        self
    }
}

/// How an update reached the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateOutcome {
    /// Issued its own trigger straight away.
    Triggered(FrameTicket),
    /// Waited in a coalescing window, then issued the trigger.
    Coalesced {
        /// The trigger issued.
        ticket: FrameTicket,
        /// What ended the window.
        release: WindowRelease,
    },
    /// Rode along on the trigger owed by a parked request.
    Piggybacked(FrameTicket),
}

impl UpdateOutcome {
    /// Ticket of the trigger carrying this update's geometry.
    pub const fn ticket(&self) -> FrameTicket {
        match *self {
            Self::Triggered(t) | Self::Piggybacked(t) | Self::Coalesced { ticket: t, .. } => t,
        }
    }
}

/// Orchestrates updates of one command-mode panel.
pub struct OverlayCoordinator<M: RawMutex, H: OverlayHardware> {
    hw: BlockingMutex<M, RefCell<H>>,
    state: PipelineState<M>,
    vsync: VsyncGate,
    config: PanelConfig,
    update_lock: Mutex<M, ()>,
    kickoff_lock: Mutex<M, ()>,
    termination: Signal<M, ()>,
    progress: FrameProgress<M>,
    stats: OverlayStats,
}

impl<M: RawMutex, H: OverlayHardware> OverlayCoordinator<M, H> {
    /// Coordinator for a powered panel described by `config`.
    pub fn new(hw: H, config: PanelConfig) -> Self {
        Self {
            hw: BlockingMutex::new(RefCell::new(hw)),
            state: PipelineState::new(),
            vsync: VsyncGate::new(&config),
            config,
            update_lock: Mutex::new(()),
            kickoff_lock: Mutex::new(()),
            termination: Signal::new(),
            progress: FrameProgress::new(),
            stats: OverlayStats::new(),
        }
    }

    /// Run `f` with exclusive access to the hardware.
    pub fn hardware<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        self.hw.lock(|hw| f(&mut *hw.borrow_mut()))
    }

    /// Pipeline state of the current panel lifetime.
    pub fn pipeline(&self) -> &PipelineState<M> {
        &self.state
    }

    /// Tear-check policy.
    pub fn vsync(&self) -> &VsyncGate {
        &self.vsync
    }

    /// Panel description this coordinator was built with.
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Copy of the statistics counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Cut the current (or next) suspended wait short.
    ///
    /// Completion waits return without the hardware being idle and
    /// coalescing waits trigger at once. Best effort: one request cancels
    /// one wait.
    pub fn request_termination(&self) {
        self.termination.signal(());
    }

    /// Transfer-complete interrupt handler.
    ///
    /// Masks the interrupt, clears busy, releases the waiter of the pending
    /// pipe and marks every issued frame presented. Safe with nobody
    /// waiting. Returns whether a waiter was released.
    pub fn on_transfer_complete(&self) -> bool {
        self.hardware(|hw| hw.disable_completion_irq());
        let woke = self.state.gate().signal_completion();
        self.progress.record_presented();
        woke
    }

    /// Resolve once `ticket` has been handed to hardware.
    pub async fn wait_issued(&self, ticket: FrameTicket) {
        self.progress.wait_issued(ticket).await;
    }

    /// Resolve once `ticket`'s transfer has completed.
    ///
    /// Never resolves for a ticket that is never issued; use
    /// [`UpdateOutcome::ticket`] to get a valid one.
    pub async fn wait_presented(&self, ticket: FrameTicket) {
        self.progress.wait_presented(ticket).await;
    }

    /// Start a new panel lifetime. No-op when already powered.
    pub async fn power_on(&self) {
        let _cycle = self.update_lock.lock().await;
        if self.state.is_powered() {
            return;
        }
        self.state.set_powered(true);
        info!("overlay: panel on");
    }

    /// End the panel lifetime.
    ///
    /// Waits for the in-flight transfer, drops any coalescing window,
    /// returns the pipe to the allocator and releases every frame waiter.
    /// Later updates fail with [`OverlayError::PanelOff`].
    pub async fn power_off(&self) {
        let _cycle = self.update_lock.lock().await;
        if !self.state.is_powered() {
            return;
        }
        self.wait_idle().await;
        let owed = self.state.window().abandon();
        let released = self.hardware(|hw| {
            hw.disable_completion_irq();
            self.state.teardown(hw)
        });
        self.progress.retire(owed);
        match released {
            Some(pipe) => info!("overlay: panel off, pipe {} released", pipe.0),
            None => info!("overlay: panel off"),
        }
    }

    /// Show the current surface.
    ///
    /// Waits for the previous transfer, reprograms the pipe and then either
    /// triggers, parks in a coalescing window, or rides along on the
    /// trigger a parked request still owes.
    ///
    /// # Errors
    ///
    /// [`OverlayError::PanelOff`] when the panel is off, or the allocation
    /// or format error that abandoned this cycle. The previous frame stays
    /// on screen.
    pub async fn request_update(&self, request: UpdateRequest) -> Result<UpdateOutcome, OverlayError> {
        let cycle = self.update_lock.lock().await;
        if !self.state.is_powered() {
            return Err(OverlayError::PanelOff);
        }
        self.wait_idle().await;

        let pipe = match self.configure(request.buffer) {
            Ok(pipe) => pipe,
            Err(e) => {
                warn!("overlay: update abandoned: {}", e);
                self.stats.abandoned();
                self.release_unused();
                return Err(e);
            }
        };

        let window = self.state.window();
        if window.owes_trigger() {
            window.cancel_and_fire_now();
            let ticket = self.progress.next_ticket();
            self.stats.piggyback();
            debug!("overlay: piggyback on frame {}", ticket.0);
            self.release_unused();
            return Ok(UpdateOutcome::Piggybacked(ticket));
        }

        let draining = request.kind == UpdateKind::Interactive
            && self.hardware(|hw| hw.is_mixer_draining(pipe.config.mixer));
        if draining {
            if let Ok(armed) = window.arm(self.config.coalesce_window_ms) {
                drop(cycle);
                let release = window.wait(armed, &self.termination).await;
                match release {
                    WindowRelease::Deadline => self.stats.coalesce_timeout(),
                    WindowRelease::Preempted => self.stats.coalesce_preemption(),
                    WindowRelease::Cancelled => {
                        warn!("overlay: coalescing wait cancelled");
                        self.stats.cancelled_wait();
                    }
                    WindowRelease::Abandoned => {
                        // Power-off dropped the window and retired its ticket.
                        debug!("overlay: window {} abandoned", armed.generation);
                        return Err(OverlayError::PanelOff);
                    }
                }

                let _cycle = self.update_lock.lock().await;
                // The window may have been abandoned, and even re-armed by a
                // newer request, between the release and the relock.
                if !self.state.is_powered() || !window.owns(armed.generation) {
                    return Err(OverlayError::PanelOff);
                }
                let Some(id) = self.state.active_pipe_id() else {
                    return Err(OverlayError::NoActivePipe);
                };
                // A restore may have kicked while this request was parked.
                self.wait_idle().await;
                let ticket = self.kickoff(id).await;
                window.finish(armed.generation);
                self.release_unused();
                return Ok(UpdateOutcome::Coalesced { ticket, release });
            }
        }

        let ticket = self.kickoff(pipe.config.id).await;
        self.release_unused();
        Ok(UpdateOutcome::Triggered(ticket))
    }

    /// Switch the pipe between flat and side-by-side stereo scan-out.
    ///
    /// Reprograms geometry for the new source but neither touches
    /// tear-check nor kicks off; the next update shows the result.
    ///
    /// # Errors
    ///
    /// [`OverlayError::NoActivePipe`] before the first successful update.
    pub async fn configure_stereo(&self, stereo: Option<StereoSource>) -> Result<(), OverlayError> {
        let _cycle = self.update_lock.lock().await;
        let pipe = self
            .state
            .update_pipe(|p| p.stereo = stereo)
            .ok_or(OverlayError::NoActivePipe)?;

        let mode = match stereo {
            Some(_) => StereoMode::SideBySide,
            None => StereoMode::None,
        };
        self.hardware(|hw| {
            let mut hw = ClockGuard::acquire(hw);
            hw.set_stereo_mode(pipe.config.mixer, mode);
        });

        if self.state.is_powered() {
            self.wait_idle().await;
        }

        self.hardware(|hw| {
            let mut hw = ClockGuard::acquire(hw);
            // Keep scanning out the buffer the last update showed.
            let mut surface = hw.surface();
            surface.buffer = pipe.config.geometry.buffer;
            let geometry = compute_geometry(&surface, stereo);
            if let Some(pipe) = self.state.set_geometry(geometry) {
                program_pipe(&mut *hw, &pipe.config);
            }
        });
        match stereo {
            Some(src) => info!("overlay: stereo {}x{}", src.width, src.height),
            None => info!("overlay: stereo off"),
        }
        Ok(())
    }

    /// Re-show the last configuration, e.g. after the panel path was
    /// borrowed by another client. The buffer the last update scanned out
    /// (including a pan override) is shown again.
    ///
    /// Does nothing when the panel is off or no pipe exists. Otherwise
    /// kicks off immediately and raises the update-in-progress flag until
    /// the next completed wait.
    ///
    /// # Errors
    ///
    /// The configuration error that abandoned the restore.
    pub async fn restore(&self) -> Result<Option<FrameTicket>, OverlayError> {
        let _cycle = self.update_lock.lock().await;
        if !self.state.is_powered() {
            return Ok(None);
        }
        let Some(last) = self.state.active_pipe() else {
            return Ok(None);
        };
        self.wait_idle().await;
        let pipe = self.configure(Some(last.config.geometry.buffer)).map_err(|e| {
            warn!("overlay: restore abandoned: {}", e);
            self.stats.abandoned();
            e
        })?;
        let ticket = self.kickoff(pipe.config.id).await;
        self.state.gate().set_update_in_progress(true);
        Ok(Some(ticket))
    }

    async fn wait_idle(&self) {
        let pipe = self.state.active_pipe_id();
        let outcome = self.state.gate().wait_for_idle(pipe, &self.termination).await;
        if outcome == WaitOutcome::Cancelled {
            warn!("overlay: completion wait cancelled, hardware may still be busy");
            self.stats.cancelled_wait();
        }
    }

    /// Pipe creation and full reprogramming, inside one clock bracket.
    fn configure(&self, buffer: Option<BufferAddress>) -> Result<Pipe, OverlayError> {
        self.hardware(|hw| {
            let mut hw = ClockGuard::acquire(hw);
            let mut surface = hw.surface();
            if let Some(buffer) = buffer {
                surface.buffer = buffer;
            }

            let pipe = self.state.get_or_create_pipe(surface.format, &mut *hw)?;
            let geometry = compute_geometry(&surface, pipe.stereo);
            let pipe = self
                .state
                .set_geometry(geometry)
                .ok_or(OverlayError::NoActivePipe)?;

            program_pipe(&mut *hw, &pipe.config);
            self.vsync
                .set_tear_enable(&mut *hw, TearChannel::Primary, geometry.dst_y);
            hw.barrier();
            Ok(pipe)
        })
    }

    async fn kickoff(&self, pipe: PipeId) -> FrameTicket {
        let _kick = self.kickoff_lock.lock().await;
        let ticket = self.hardware(|hw| {
            let mut hw = ClockGuard::acquire(hw);
            hw.enable_completion_irq();
            self.state.mark_busy();
            hw.trigger_hardware_transfer();
            hw.software_trigger();
            hw.barrier();
            // Recorded before the interrupt can observe the transfer.
            self.progress.record_issued()
        });
        self.stats.kickoff();
        debug!("overlay: kickoff frame {} on pipe {}", ticket.0, pipe.0);
        ticket
    }

    fn release_unused(&self) {
        self.hardware(|hw| hw.release_unused_resources());
    }
}

fn program_pipe<H: MixerControl + ?Sized>(hw: &mut H, config: &PipeConfig) {
    hw.setup_pipe(config);
    hw.commit_mixer_stage(config);
    hw.configure_output_processor(config);
    hw.program_output_geometry(config);
    hw.configure_output_dma(config.mixer);
}

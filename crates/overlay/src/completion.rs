//! Hardware completion gate.
//!
//! Turns the overlay pipe's "transfer finished" interrupt into an awaitable
//! wait, so no transfer is issued while another is in flight.
//!
//! # Roles
//!
//! ```text
//! update task:  lock flags → busy? → pending = pipe, reset signal → unlock → await signal
//! interrupt:    lock flags → busy = false → pending? → signal
//! ```
//!
//! The busy check and the pending registration happen under the same short
//! critical section the interrupt uses to clear busy, so a completion can
//! never slip between "saw busy" and "started waiting".

use core::cell::RefCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use platform::PipeId;

/// Result of [`HardwareCompletionGate::wait_for_idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitOutcome {
    /// Nothing was in flight; returned without suspending.
    AlreadyIdle,
    /// Suspended until the completion interrupt fired.
    Completed,
    /// A termination request cut the wait short. The hardware may still be
    /// busy; the caller proceeds anyway.
    Cancelled,
}

/// Binary completion flag with a waiter count.
///
/// Reset to not-signaled right before a wait registers, set exactly once
/// per transfer by the interrupt path. Level-triggered: a signal that
/// arrives before the waiter suspends is not lost.
pub struct CompletionSignal<M: RawMutex> {
    signal: Signal<M, ()>,
    waiters: AtomicUsize,
}

impl<M: RawMutex> CompletionSignal<M> {
    /// Not-signaled, no waiters.
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    /// Back to not-signaled.
    pub fn reset(&self) {
        self.signal.reset();
    }

    /// Set to signaled and wake the waiter.
    pub fn complete(&self) {
        self.signal.signal(());
    }

    /// True when signaled and not yet consumed.
    pub fn is_signaled(&self) -> bool {
        self.signal.signaled()
    }

    /// Number of contexts currently suspended on the signal.
    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }

    /// Suspend until signaled, consuming the signal.
    pub async fn wait(&self) {
        let _registered = WaiterCount::enter(&self.waiters);
        self.signal.wait().await;
    }
}

impl<M: RawMutex> Default for CompletionSignal<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the waiter count right when a wait future is dropped mid-flight.
struct WaiterCount<'a>(&'a AtomicUsize);

impl<'a> WaiterCount<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        Self(count)
    }
}

impl Drop for WaiterCount<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

struct GateFlags {
    busy: bool,
    pending: Option<PipeId>,
    update_in_progress: bool,
}

/// Blocking wait on the overlay transfer-complete interrupt.
///
/// The command-mode path drives a single pipe, so the gate carries that
/// pipe's [`CompletionSignal`] directly.
pub struct HardwareCompletionGate<M: RawMutex> {
    flags: Mutex<M, RefCell<GateFlags>>,
    completion: CompletionSignal<M>,
}

impl<M: RawMutex> HardwareCompletionGate<M> {
    /// Idle gate: not busy, no pending pipe.
    pub const fn new() -> Self {
        Self {
            flags: Mutex::new(RefCell::new(GateFlags {
                busy: false,
                pending: None,
                update_in_progress: false,
            })),
            completion: CompletionSignal::new(),
        }
    }

    /// Mark the transfer engine busy. Called right before the kickoff.
    pub fn mark_busy(&self) {
        self.flags.lock(|f| f.borrow_mut().busy = true);
    }

    /// Mark the transfer engine idle without signalling anyone.
    pub fn clear_busy(&self) {
        self.flags.lock(|f| f.borrow_mut().busy = false);
    }

    /// True between kickoff and the completion interrupt.
    pub fn is_busy(&self) -> bool {
        self.flags.lock(|f| f.borrow().busy)
    }

    /// Register `pipe` as the one awaiting completion.
    pub fn set_pending(&self, pipe: PipeId) {
        self.flags.lock(|f| f.borrow_mut().pending = Some(pipe));
    }

    /// Forget the pending pipe.
    pub fn clear_pending(&self) {
        self.flags.lock(|f| f.borrow_mut().pending = None);
    }

    /// Pipe currently awaiting completion, if any.
    pub fn pending(&self) -> Option<PipeId> {
        self.flags.lock(|f| f.borrow().pending)
    }

    /// Raise or clear the auxiliary "update in progress" flag.
    pub fn set_update_in_progress(&self, in_progress: bool) {
        self.flags
            .lock(|f| f.borrow_mut().update_in_progress = in_progress);
    }

    /// True after a restore kickoff until the next completed wait.
    pub fn update_in_progress(&self) -> bool {
        self.flags.lock(|f| f.borrow().update_in_progress)
    }

    /// The completion signal of the panel pipe.
    pub fn completion(&self) -> &CompletionSignal<M> {
        &self.completion
    }

    /// Suspend until no transfer is outstanding for `pipe`.
    ///
    /// `None` means no pipe has ever been configured, so nothing can be in
    /// flight and the call returns at once. A signal on `cancel` ends the
    /// wait early with [`WaitOutcome::Cancelled`]; this is best effort and
    /// leaves the pending registration in place so the interrupt still
    /// finds it.
    pub async fn wait_for_idle(&self, pipe: Option<PipeId>, cancel: &Signal<M, ()>) -> WaitOutcome {
        let Some(pipe) = pipe else {
            return WaitOutcome::AlreadyIdle;
        };

        let must_wait = self.flags.lock(|f| {
            let mut f = f.borrow_mut();
            if f.busy {
                self.completion.reset();
                f.pending = Some(pipe);
                true
            } else {
                // A cancelled wait may have left a stale registration.
                f.pending = None;
                false
            }
        });
        if !must_wait {
            return WaitOutcome::AlreadyIdle;
        }

        match select(self.completion.wait(), cancel.wait()).await {
            Either::First(()) => {
                self.flags.lock(|f| {
                    let mut f = f.borrow_mut();
                    f.pending = None;
                    f.update_in_progress = false;
                });
                WaitOutcome::Completed
            }
            Either::Second(()) => WaitOutcome::Cancelled,
        }
    }

    /// Interrupt-side completion.
    ///
    /// Clears busy and, when a pipe is pending, signals its completion.
    /// Returns whether a pending pipe was signalled; with nobody waiting it
    /// only clears busy.
    pub fn signal_completion(&self) -> bool {
        self.flags.lock(|f| {
            let mut f = f.borrow_mut();
            f.busy = false;
            if f.pending.is_some() {
                self.completion.complete();
                true
            } else {
                false
            }
        })
    }
}

impl<M: RawMutex> Default for HardwareCompletionGate<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::join::join;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_time::{Duration, Instant, Timer};

    type Gate = HardwareCompletionGate<CriticalSectionRawMutex>;

    #[tokio::test]
    async fn fresh_pipe_returns_immediately() {
        let gate = Gate::new();
        let cancel = Signal::new();
        assert_eq!(gate.wait_for_idle(None, &cancel).await, WaitOutcome::AlreadyIdle);
        assert_eq!(
            gate.wait_for_idle(Some(PipeId(0)), &cancel).await,
            WaitOutcome::AlreadyIdle
        );
        assert_eq!(gate.pending(), None);
    }

    #[tokio::test]
    async fn completion_releases_waiter_and_clears_pending() {
        let gate = Gate::new();
        let cancel = Signal::new();
        gate.mark_busy();

        let (outcome, signalled) = join(gate.wait_for_idle(Some(PipeId(3)), &cancel), async {
            Timer::after(Duration::from_millis(2)).await;
            assert_eq!(gate.pending(), Some(PipeId(3)));
            assert_eq!(gate.completion().waiters(), 1);
            gate.signal_completion()
        })
        .await;

        assert!(signalled);
        assert_eq!(outcome, WaitOutcome::Completed);
        assert_eq!(gate.pending(), None);
        assert!(!gate.is_busy());
        assert_eq!(gate.completion().waiters(), 0);
    }

    #[tokio::test]
    async fn completion_before_suspend_is_not_lost() {
        let gate = Gate::new();
        let cancel = Signal::new();
        gate.mark_busy();
        gate.set_pending(PipeId(0));
        // Interrupt fires, then a new wait starts: busy is already clear.
        assert!(gate.signal_completion());
        assert_eq!(
            gate.wait_for_idle(Some(PipeId(0)), &cancel).await,
            WaitOutcome::AlreadyIdle
        );
    }

    #[test]
    fn signal_without_waiter_is_noop() {
        let gate = Gate::new();
        assert!(!gate.signal_completion());
        assert!(!gate.completion().is_signaled());
    }

    #[tokio::test]
    async fn termination_cuts_wait_short() {
        let gate = Gate::new();
        let cancel = Signal::new();
        gate.mark_busy();
        let start = Instant::now();

        let (outcome, ()) = join(gate.wait_for_idle(Some(PipeId(1)), &cancel), async {
            Timer::after(Duration::from_millis(2)).await;
            cancel.signal(());
        })
        .await;

        assert_eq!(outcome, WaitOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
        // Hardware is still considered busy; the registration stays for the IRQ.
        assert!(gate.is_busy());
        assert_eq!(gate.pending(), Some(PipeId(1)));
        assert_eq!(gate.completion().waiters(), 0);
    }

    #[tokio::test]
    async fn completed_wait_clears_update_flag() {
        let gate = Gate::new();
        let cancel = Signal::new();
        gate.set_update_in_progress(true);
        gate.mark_busy();

        let (outcome, _) = join(gate.wait_for_idle(Some(PipeId(0)), &cancel), async {
            Timer::after(Duration::from_millis(1)).await;
            gate.signal_completion()
        })
        .await;

        assert_eq!(outcome, WaitOutcome::Completed);
        assert!(!gate.update_in_progress());
    }
}

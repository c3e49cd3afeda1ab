//! Update-coalescing window.
//!
//! An interactive update that finds the mixer still draining does not kick
//! the hardware immediately. It opens a short window and parks; any update
//! arriving before the parked request has issued its trigger rides along on
//! that trigger (piggyback) instead of issuing its own.
//!
//! ```text
//!            arm()                     cancel_and_fire_now()
//!  Closed ───────────► Open ─────────────────────────────┐
//!    ▲                  │ deadline: on_deadline_fire()   ▼
//!    │                  └──────────────────────────► Released (trigger owed)
//!    └──────────────────────── finish() ◄────────────────┘
//! ```
//!
//! The counter is the 0/1 "window open" flag. `owed` stays set from `arm`
//! until the parked request has issued its trigger, so late arrivals in the
//! Released state still piggyback rather than open a second window.
//!
//! Each arm bumps a generation. The release reason is stored against the
//! current generation rather than handed over through a one-shot signal, so
//! a parked request from an abandoned window sees [`WindowRelease::Abandoned`]
//! however late it runs, and can neither consume nor clear the release of a
//! newer window.

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_sync::waitqueue::MultiWakerRegistration;
use embassy_time::{Duration, Instant, Timer};

use crate::error::CoalesceError;

/// Parked requests tracked at once: the current window's owner plus stale
/// owners of abandoned windows that have not run yet.
const WINDOW_WAITERS: usize = 4;

/// Why a parked request was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WindowRelease {
    /// The deadline passed with no competing request.
    Deadline,
    /// A competing request piggybacked and fired the window early.
    Preempted,
    /// A termination request ended the wait.
    Cancelled,
    /// The window was dropped without a trigger (panel power-off). The
    /// parked request must not kick off.
    Abandoned,
}

/// One armed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalescingWindow {
    /// When the window fires on its own.
    pub deadline: Instant,
    /// Arm generation this window belongs to.
    pub generation: u32,
}

struct WindowState {
    counter: u8,
    owed: bool,
    generation: u32,
    deadline: Option<Instant>,
    released: Option<WindowRelease>,
    wakers: MultiWakerRegistration<WINDOW_WAITERS>,
}

impl WindowState {
    /// Close the open window of `generation` for `reason` and wake its
    /// owner. Returns what the owner will observe.
    fn close(&mut self, generation: u32, reason: WindowRelease) -> WindowRelease {
        if self.generation != generation {
            return WindowRelease::Abandoned;
        }
        if let Some(released) = self.released {
            return released;
        }
        self.counter = 0;
        self.deadline = None;
        self.released = Some(reason);
        self.wakers.wake();
        reason
    }
}

/// Single-shot coalescing deadline.
pub struct CoalescingTimer<M: RawMutex> {
    state: Mutex<M, RefCell<WindowState>>,
}

impl<M: RawMutex> CoalescingTimer<M> {
    /// Closed window.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(WindowState {
                counter: 0,
                owed: false,
                generation: 0,
                deadline: None,
                released: None,
                wakers: MultiWakerRegistration::new(),
            })),
        }
    }

    /// Open a window that fires `delay_ms` from now.
    ///
    /// Fails while a window is open or its trigger is still owed; a second
    /// window is never scheduled alongside the first.
    pub fn arm(&self, delay_ms: u64) -> Result<CoalescingWindow, CoalesceError> {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            if s.counter != 0 || s.owed {
                return Err(CoalesceError::AlreadyOpen);
            }
            let deadline = Instant::now()
                .checked_add(Duration::from_millis(delay_ms))
                .unwrap_or(Instant::MAX);
            s.generation = s.generation.wrapping_add(1);
            s.counter = 1;
            s.owed = true;
            s.deadline = Some(deadline);
            s.released = None;
            // Stale owners of older windows find out they lost theirs.
            s.wakers.wake();
            Ok(CoalescingWindow {
                deadline,
                generation: s.generation,
            })
        })
    }

    /// Preempt the open window: close it, drop its deadline and release the
    /// parked request now.
    ///
    /// Returns `false` when no window was open (already fired or never
    /// armed).
    pub fn cancel_and_fire_now(&self) -> bool {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            if s.counter == 0 {
                return false;
            }
            let generation = s.generation;
            s.close(generation, WindowRelease::Preempted);
            true
        })
    }

    /// Timer-callback side: the deadline of `generation` passed.
    ///
    /// Releases the parked request if that window is still open. Returns
    /// `false` when the window was already preempted or belongs to an older
    /// generation.
    pub fn on_deadline_fire(&self, generation: u32) -> bool {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            if s.counter == 0 || s.generation != generation {
                return false;
            }
            s.close(generation, WindowRelease::Deadline) == WindowRelease::Deadline
        })
    }

    /// Park until the window is released.
    ///
    /// Races the deadline against preemption and `cancel`. On cancel the
    /// window is closed; the trigger stays owed so the caller still issues
    /// it. [`WindowRelease::Abandoned`] means the window is gone and the
    /// caller owes nothing.
    pub async fn wait(&self, window: CoalescingWindow, cancel: &Signal<M, ()>) -> WindowRelease {
        let generation = window.generation;
        match select3(Timer::at(window.deadline), self.released(generation), cancel.wait()).await {
            Either3::First(()) => self.close(generation, WindowRelease::Deadline),
            Either3::Second(release) => release,
            Either3::Third(()) => self.close(generation, WindowRelease::Cancelled),
        }
    }

    fn close(&self, generation: u32, reason: WindowRelease) -> WindowRelease {
        self.state.lock(|s| s.borrow_mut().close(generation, reason))
    }

    async fn released(&self, generation: u32) -> WindowRelease {
        poll_fn(|cx| {
            self.state.lock(|s| {
                let mut s = s.borrow_mut();
                if s.generation != generation {
                    return Poll::Ready(WindowRelease::Abandoned);
                }
                match s.released {
                    Some(release) => Poll::Ready(release),
                    None => {
                        s.wakers.register(cx.waker());
                        Poll::Pending
                    }
                }
            })
        })
        .await
    }

    /// True while `generation` still owes its trigger: it has been neither
    /// finished nor abandoned, and no newer window exists.
    pub fn owns(&self, generation: u32) -> bool {
        self.state.lock(|s| {
            let s = s.borrow();
            s.generation == generation && s.owed
        })
    }

    /// The owed trigger of `generation` has been issued; the next update may
    /// open a window.
    ///
    /// Returns `false` when that window was already abandoned and a newer one
    /// armed since; the newer window is left alone.
    pub fn finish(&self, generation: u32) -> bool {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            if s.generation != generation {
                return false;
            }
            s.counter = 0;
            s.owed = false;
            s.deadline = None;
            true
        })
    }

    /// Drop whatever window exists without triggering, releasing a parked
    /// request with [`WindowRelease::Abandoned`]. Returns whether a trigger
    /// was owed.
    pub fn abandon(&self) -> bool {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            let owed = s.owed;
            if owed {
                // Overrides an earlier preemption the owner has not seen yet.
                s.released = Some(WindowRelease::Abandoned);
                s.wakers.wake();
            }
            s.counter = 0;
            s.owed = false;
            s.deadline = None;
            owed
        })
    }

    /// Coalescing counter: 1 while a window is open, else 0.
    pub fn counter(&self) -> u8 {
        self.state.lock(|s| s.borrow().counter)
    }

    /// True while a window is open.
    pub fn is_open(&self) -> bool {
        self.counter() != 0
    }

    /// True from `arm` until `finish`: a parked request will still trigger.
    pub fn owes_trigger(&self) -> bool {
        self.state.lock(|s| s.borrow().owed)
    }

    /// Deadline of the open window.
    pub fn deadline(&self) -> Option<Instant> {
        self.state.lock(|s| s.borrow().deadline)
    }
}

impl<M: RawMutex> Default for CoalescingTimer<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embassy_futures::join::join;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    type Window = CoalescingTimer<CriticalSectionRawMutex>;

    #[test]
    fn second_arm_is_rejected() {
        let timer = Window::new();
        let first = timer.arm(10);
        assert!(first.is_ok());
        assert_eq!(timer.arm(10), Err(CoalesceError::AlreadyOpen));
        assert_eq!(timer.counter(), 1);
    }

    #[test]
    fn arm_rejected_until_owed_trigger_finishes() {
        let timer = Window::new();
        let window = timer.arm(10).unwrap();
        assert!(timer.cancel_and_fire_now());
        assert!(!timer.is_open());
        assert!(timer.owes_trigger());
        assert_eq!(timer.arm(10), Err(CoalesceError::AlreadyOpen));
        assert!(timer.finish(window.generation));
        assert!(timer.arm(10).is_ok());
    }

    #[test]
    fn cancel_without_window_is_noop() {
        let timer = Window::new();
        assert!(!timer.cancel_and_fire_now());
        assert_eq!(timer.counter(), 0);
    }

    #[test]
    fn stale_deadline_does_not_fire_new_window() {
        let timer = Window::new();
        let old = timer.arm(10).unwrap();
        timer.cancel_and_fire_now();
        assert!(timer.finish(old.generation));
        let new = timer.arm(10).unwrap();
        assert_ne!(old.generation, new.generation);
        assert!(!timer.on_deadline_fire(old.generation));
        assert!(timer.is_open());
        assert!(timer.on_deadline_fire(new.generation));
        assert!(!timer.is_open());
    }

    #[test]
    fn finish_ignores_abandoned_generation() {
        let timer = Window::new();
        let old = timer.arm(10).unwrap();
        assert!(timer.abandon());
        let new = timer.arm(10).unwrap();
        assert!(!timer.finish(old.generation));
        assert!(timer.owes_trigger());
        assert!(timer.finish(new.generation));
        assert!(!timer.owes_trigger());
        assert!(!timer.abandon());
    }

    #[tokio::test]
    async fn deadline_releases_parked_request() {
        let timer = Window::new();
        let cancel = Signal::new();
        let start = Instant::now();
        let window = timer.arm(10).unwrap();

        let release = timer.wait(window, &cancel).await;

        assert_eq!(release, WindowRelease::Deadline);
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(timer.counter(), 0);
        assert!(timer.owes_trigger());
    }

    #[tokio::test]
    async fn preemption_releases_before_deadline() {
        let timer = Window::new();
        let cancel = Signal::new();
        let start = Instant::now();
        let window = timer.arm(1_000).unwrap();

        let (release, fired) = join(timer.wait(window, &cancel), async {
            Timer::after(Duration::from_millis(2)).await;
            timer.cancel_and_fire_now()
        })
        .await;

        assert!(fired);
        assert_eq!(release, WindowRelease::Preempted);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn cancel_closes_window_but_keeps_trigger_owed() {
        let timer = Window::new();
        let cancel = Signal::new();
        let window = timer.arm(1_000).unwrap();

        let (release, ()) = join(timer.wait(window, &cancel), async {
            Timer::after(Duration::from_millis(2)).await;
            cancel.signal(());
        })
        .await;

        assert_eq!(release, WindowRelease::Cancelled);
        assert!(!timer.is_open());
        assert!(timer.owes_trigger());
    }

    #[tokio::test]
    async fn abandoned_owner_does_not_take_newer_window() {
        let timer = Window::new();
        let cancel = Signal::new();
        let old = timer.arm(1_000).unwrap();

        let (release, new) = join(timer.wait(old, &cancel), async {
            Timer::after(Duration::from_millis(2)).await;
            assert!(timer.abandon());
            // Re-armed before the old owner runs again.
            timer.arm(1_000).unwrap()
        })
        .await;

        assert_eq!(release, WindowRelease::Abandoned);
        assert!(!timer.owns(old.generation));
        assert!(timer.owns(new.generation));
        // The newer window is untouched and still fires for its own owner.
        assert!(timer.is_open());
        assert!(timer.cancel_and_fire_now());
        assert_eq!(timer.wait(new, &cancel).await, WindowRelease::Preempted);
    }

    #[test]
    fn abandon_overrides_unseen_preemption() {
        let timer = Window::new();
        let window = timer.arm(10).unwrap();
        assert!(timer.cancel_and_fire_now());
        assert!(timer.abandon());
        assert!(!timer.owns(window.generation));
    }
}

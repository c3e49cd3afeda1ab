//! Power management abstraction
//!
//! Provides clock bracketing for register access and control of the
//! transfer-complete interrupt source.

use core::ops::{Deref, DerefMut};

/// Clock / power vote for the display controller's register block.
///
/// Every register write sequence must be bracketed by `acquire_clock` and
/// `release_clock`. Votes nest: the block stays powered until the last
/// release.
pub trait HardwareClock {
    /// Vote the register block on.
    fn acquire_clock(&mut self);

    /// Drop one vote.
    fn release_clock(&mut self);
}

/// Transfer-complete interrupt source of the overlay pipe.
pub trait InterruptControl {
    /// Unmask the completion interrupt.
    fn enable_completion_irq(&mut self);

    /// Mask the completion interrupt. Safe to call from interrupt context.
    fn disable_completion_irq(&mut self);
}

/// RAII clock vote.
///
/// Acquires the clock on construction and releases it on drop, so the
/// bracket stays balanced on every exit path, including early returns via
/// `?`. Dereferences to the wrapped hardware so the whole write sequence goes
/// through the guard.
///
/// ```
/// use platform::{ClockGuard, HardwareClock};
///
/// struct Block { votes: u32 }
/// impl HardwareClock for Block {
///     fn acquire_clock(&mut self) { self.votes += 1; }
///     fn release_clock(&mut self) { self.votes -= 1; }
/// }
///
/// let mut block = Block { votes: 0 };
/// {
///     let guard = ClockGuard::acquire(&mut block);
///     assert_eq!(guard.votes, 1);
/// }
/// assert_eq!(block.votes, 0);
/// ```
pub struct ClockGuard<'a, H: HardwareClock + ?Sized> {
    hw: &'a mut H,
}

impl<'a, H: HardwareClock + ?Sized> ClockGuard<'a, H> {
    /// Vote the clock on and hold it until the guard is dropped.
    pub fn acquire(hw: &'a mut H) -> Self {
        hw.acquire_clock();
        Self { hw }
    }
}

impl<H: HardwareClock + ?Sized> Deref for ClockGuard<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.hw
    }
}

impl<H: HardwareClock + ?Sized> DerefMut for ClockGuard<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.hw
    }
}

impl<H: HardwareClock + ?Sized> Drop for ClockGuard<'_, H> {
    fn drop(&mut self) {
        self.hw.release_clock();
    }
}

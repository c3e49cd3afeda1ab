//! Frame tickets.
//!
//! Every hardware trigger is numbered. Requests learn the number of the
//! trigger that carries their geometry and can wait for it to be issued or
//! presented, however many requests were merged into it.

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;

/// Maximum number of tasks parked on frame progress at once. Registering
/// past this wakes everyone and they re-register.
pub const PROGRESS_WAITERS: usize = 8;

/// Sequence number of one hardware trigger. Starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameTicket(pub u64);

impl FrameTicket {
    /// Raw sequence number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

struct Counters {
    issued: u64,
    presented: u64,
    wakers: MultiWakerRegistration<PROGRESS_WAITERS>,
}

/// Issued and presented trigger counters with async waiters.
pub struct FrameProgress<M: RawMutex> {
    inner: Mutex<M, RefCell<Counters>>,
}

impl<M: RawMutex> FrameProgress<M> {
    /// Nothing issued yet.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Counters {
                issued: 0,
                presented: 0,
                wakers: MultiWakerRegistration::new(),
            })),
        }
    }

    /// Ticket the next trigger will carry.
    pub fn next_ticket(&self) -> FrameTicket {
        self.inner
            .lock(|c| FrameTicket(c.borrow().issued.saturating_add(1)))
    }

    /// Latest trigger handed to hardware.
    pub fn issued(&self) -> FrameTicket {
        self.inner.lock(|c| FrameTicket(c.borrow().issued))
    }

    /// Latest trigger whose completion has been observed.
    pub fn presented(&self) -> FrameTicket {
        self.inner.lock(|c| FrameTicket(c.borrow().presented))
    }

    /// A trigger was handed to hardware; returns its ticket.
    pub fn record_issued(&self) -> FrameTicket {
        self.inner.lock(|c| {
            let mut c = c.borrow_mut();
            c.issued = c.issued.saturating_add(1);
            c.wakers.wake();
            FrameTicket(c.issued)
        })
    }

    /// The completion interrupt fired. Transfers run one at a time, so
    /// every issued trigger is now presented.
    pub fn record_presented(&self) {
        self.inner.lock(|c| {
            let mut c = c.borrow_mut();
            c.presented = c.issued;
            c.wakers.wake();
        });
    }

    /// Panel teardown: mark everything presented, including a trigger that
    /// was owed but will never be issued, so no waiter hangs.
    pub fn retire(&self, owed: bool) {
        self.inner.lock(|c| {
            let mut c = c.borrow_mut();
            if owed {
                c.issued = c.issued.saturating_add(1);
            }
            c.presented = c.issued;
            c.wakers.wake();
        });
    }

    /// Resolve once `ticket` has been handed to hardware.
    pub async fn wait_issued(&self, ticket: FrameTicket) {
        self.wait_until(|c| c.issued >= ticket.0).await;
    }

    /// Resolve once `ticket`'s transfer has completed.
    pub async fn wait_presented(&self, ticket: FrameTicket) {
        self.wait_until(|c| c.presented >= ticket.0).await;
    }

    async fn wait_until(&self, reached: impl Fn(&Counters) -> bool) {
        poll_fn(|cx| {
            self.inner.lock(|c| {
                let mut c = c.borrow_mut();
                if reached(&*c) {
                    Poll::Ready(())
                } else {
                    c.wakers.register(cx.waker());
                    Poll::Pending
                }
            })
        })
        .await;
    }
}

impl<M: RawMutex> Default for FrameProgress<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::join::join;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_time::{Duration, Timer};

    type Progress = FrameProgress<CriticalSectionRawMutex>;

    #[test]
    fn tickets_count_up_from_one() {
        let progress = Progress::new();
        assert_eq!(progress.next_ticket(), FrameTicket(1));
        assert_eq!(progress.record_issued(), FrameTicket(1));
        assert_eq!(progress.next_ticket(), FrameTicket(2));
        assert_eq!(progress.presented(), FrameTicket(0));
        progress.record_presented();
        assert_eq!(progress.presented(), FrameTicket(1));
    }

    #[tokio::test]
    async fn waiters_resolve_in_stages() {
        let progress = Progress::new();
        let ticket = progress.next_ticket();

        join(
            async {
                progress.wait_issued(ticket).await;
                assert_eq!(progress.issued(), ticket);
                progress.wait_presented(ticket).await;
                assert_eq!(progress.presented(), ticket);
            },
            async {
                Timer::after(Duration::from_millis(1)).await;
                progress.record_issued();
                Timer::after(Duration::from_millis(1)).await;
                progress.record_presented();
            },
        )
        .await;
    }

    #[tokio::test]
    async fn retire_releases_owed_ticket() {
        let progress = Progress::new();
        let owed = progress.next_ticket();
        progress.retire(true);
        progress.wait_presented(owed).await;
        assert_eq!(progress.next_ticket(), FrameTicket(2));
    }
}

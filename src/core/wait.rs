use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// How long a `Blocking` waiter sleeps on the condvar before re-checking.
/// The timeout bounds the cost of a signal that raced past the check, so a
/// missed wakeup can never wedge a waiter permanently.
const BLOCK_RECHECK: Duration = Duration::from_millis(1);

/// Number of spins a `Yielding` waiter performs before it starts yielding
/// its slice.
const YIELD_AFTER_SPINS: u32 = 100;

/// Policy for how a thread behaves while the sequence it needs is not yet
/// available. A closed set: every ring picks exactly one strategy at
/// construction and all of its waiters (producer gating and consumer
/// barriers) share it.
///
/// The choice trades latency against CPU burn and has no effect on
/// correctness; the waiting loops re-check their condition after every
/// `idle` call regardless of variant.
#[derive(Debug)]
pub enum WaitStrategy {
    /// Tight re-check loop. Lowest latency, one core pinned per waiter.
    BusySpin,
    /// Spin a bounded number of times, then yield the time slice between
    /// re-checks. The default.
    Yielding,
    /// Park on a condvar until signalled by a publish (or the re-check
    /// timeout elapses). Highest latency, near-zero idle CPU.
    Blocking(BlockingWait),
}

#[derive(Debug, Default)]
pub struct BlockingWait {
    lock: Mutex<()>,
    cond: Condvar,
}

impl WaitStrategy {
    pub fn busy_spin() -> Self {
        WaitStrategy::BusySpin
    }

    pub fn yielding() -> Self {
        WaitStrategy::Yielding
    }

    pub fn blocking() -> Self {
        WaitStrategy::Blocking(BlockingWait::default())
    }

    /// One pause in a waiting loop. `spins` is per-wait state owned by the
    /// caller and reset whenever it makes progress.
    #[inline]
    pub(crate) fn idle(&self, spins: &mut u32) {
        match self {
            WaitStrategy::BusySpin => std::hint::spin_loop(),
            WaitStrategy::Yielding => {
                if *spins < YIELD_AFTER_SPINS {
                    *spins += 1;
                    std::hint::spin_loop();
                } else {
                    std::thread::yield_now();
                }
            }
            WaitStrategy::Blocking(inner) => {
                let mut guard = inner.lock.lock();
                inner.cond.wait_for(&mut guard, BLOCK_RECHECK);
            }
        }
    }

    /// Wake every parked waiter. Called after each publish and on shutdown;
    /// consumers do not signal when they advance, the re-check timeout
    /// covers producer gating instead. No-op for the spinning variants.
    #[inline]
    pub(crate) fn signal(&self) {
        if let WaitStrategy::Blocking(inner) = self {
            let _guard = inner.lock.lock();
            inner.cond.notify_all();
        }
    }
}

impl Default for WaitStrategy {
    fn default() -> Self {
        WaitStrategy::Yielding
    }
}

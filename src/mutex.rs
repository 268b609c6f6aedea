//! Mutual exclusion for the shared device handle.
//!
//! A [`Vcnl3020`](crate::Vcnl3020) can be shared by reference between a
//! measurement path and an alarm path; the lock it wraps its bus in keeps
//! their register transactions from interleaving on the wire. The
//! closure-based [`IoMutex`] concept is borrowed from shared-bus: callers
//! pick the primitive that matches their environment, the driver only
//! requires that at most one closure runs at a time.

use core::cell::RefCell;

/// A mutual-exclusion primitive guarding the bus of one device handle.
///
/// Every public driver operation acquires the lock exactly once, for the
/// whole duration of its register traffic, and never nests acquisitions.
/// The closure shape makes the release unconditional on every exit path.
pub trait IoMutex {
    /// The guarded bus state
    type Bus;

    /// Wrap a bus in a fresh lock
    fn create(bus: Self::Bus) -> Self;

    /// Run `f` with exclusive access to the bus
    fn lock<R>(&self, f: impl FnOnce(&mut Self::Bus) -> R) -> R;

    /// Tear the lock down and hand the bus back
    fn into_inner(self) -> Self::Bus;
}

/// Zero-cost lock for single-context targets.
///
/// Not `Sync`: the exclusivity comes from the absence of concurrent
/// callers, not from blocking. Reentrant locking panics; the driver never
/// locks twice on one call path.
pub struct NoopMutex<T> {
    bus: RefCell<T>,
}

impl<T> IoMutex for NoopMutex<T> {
    type Bus = T;

    fn create(bus: T) -> Self {
        Self {
            bus: RefCell::new(bus),
        }
    }

    fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.bus.borrow_mut())
    }

    fn into_inner(self) -> T {
        self.bus.into_inner()
    }
}

#[cfg(any(feature = "std", test))]
impl<T> IoMutex for std::sync::Mutex<T> {
    type Bus = T;

    fn create(bus: T) -> Self {
        std::sync::Mutex::new(bus)
    }

    fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        // poisoning only means another holder panicked between
        // transactions; the bus itself is still consistent
        let mut bus = std::sync::Mutex::lock(self)
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut bus)
    }

    fn into_inner(self) -> T {
        std::sync::Mutex::into_inner(self).unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// The lock most builds want: `std::sync::Mutex` with the `std` feature
/// enabled, [`NoopMutex`] otherwise.
#[cfg(feature = "std")]
pub type DefaultMutex<T> = std::sync::Mutex<T>;

/// The lock most builds want: `std::sync::Mutex` with the `std` feature
/// enabled, [`NoopMutex`] otherwise.
#[cfg(not(feature = "std"))]
pub type DefaultMutex<T> = NoopMutex<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_mutex_round_trips_its_bus() {
        let mutex = NoopMutex::create(7u8);
        assert_eq!(mutex.lock(|v| *v), 7);
        mutex.lock(|v| *v = 9);
        assert_eq!(mutex.into_inner(), 9);
    }

    #[test]
    fn std_mutex_survives_a_poisoned_holder() {
        let mutex = std::sync::Arc::new(<std::sync::Mutex<u8> as IoMutex>::create(1));
        let poisoner = std::sync::Arc::clone(&mutex);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        // still usable afterward
        IoMutex::lock(&*mutex, |v| *v = 2);
        assert_eq!(IoMutex::lock(&*mutex, |v| *v), 2);
    }
}

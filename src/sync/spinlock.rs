//! A simple test-and-test-and-set spinlock, with matched interrupt
//! disable/enable bookkeeping so nested critical sections never
//! re-enable interrupts early.

use crate::proc::cpu::Cpu;
use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct Spinlock {
    pub locked: AtomicBool,
}

impl Spinlock {
    pub const fn new() -> Spinlock {
        Spinlock {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquires the lock without producing a guard. Interrupts are
    /// disabled on entry and only restored once the matching number of
    /// `unlock` calls have unwound (see `Cpu::push_intr_off`).
    ///
    /// # Safety
    /// The caller must call `unlock` exactly once for each `lock_unguarded`,
    /// in reverse order, and must not hold the lock across a context switch.
    pub unsafe fn lock_unguarded(&self) {
        Cpu::push_intr_off();

        while self.locked.swap(true, Ordering::Acquire) {
            core::hint::spin_loop();
        }
    }

    pub fn lock(&self) -> SpinlockGuard<'_> {
        unsafe {
            self.lock_unguarded();
        }
        SpinlockGuard { lock: self }
    }

    /// # Safety
    /// The caller must currently hold the lock.
    pub unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
        Cpu::pop_intr_off();
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

pub struct SpinlockGuard<'l> {
    pub lock: &'l Spinlock,
}

impl<'l> Drop for SpinlockGuard<'l> {
    fn drop(&mut self) {
        unsafe { self.lock.unlock() }
    }
}

// Safety: a Spinlock only ever hands out exclusive access while `locked` is
// true, which is enforced by the atomic swap/CAS in lock/unlock.
unsafe impl Sync for Spinlock {}

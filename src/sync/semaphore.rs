//! Counting semaphore with a FIFO sleep queue (component F).
//!
//! `acquire` on an exhausted semaphore hands off from the semaphore lock
//! to the scheduler lock before parking, so no `post` can be missed.
//! Same ordering as the C original's `wait_sem`.

use crate::container_of;
use crate::list::{self, ListNode};
use crate::proc::process::Process;
use crate::proc::scheduler;
use crate::sync::spinlock::Spinlock;
use alloc::boxed::Box;

pub struct Semaphore {
    value: i32,
    lock: Spinlock,
    sleepers: ListNode,
}

// Safety: `value` and `sleepers` are only ever touched with `lock` held.
unsafe impl Sync for Semaphore {}

struct WaitData {
    proc: *mut Process,
    /// Set by `post` once this waiter has been handed a wakeup. Checked
    /// by `acquire` after it regains the CPU to tell a genuine `post`
    /// apart from a spurious return through `sched` (e.g. a `kill`).
    acknowledged: bool,
    list_node: ListNode,
}

impl Semaphore {
    pub const fn new(initial: i32) -> Semaphore {
        Semaphore {
            value: initial,
            lock: Spinlock::new(),
            sleepers: ListNode::uninit(),
        }
    }

    /// Non-blocking acquire: succeeds only if the semaphore is
    /// immediately available.
    pub fn try_acquire(&mut self) -> bool {
        let _guard = self.lock.lock();
        if self.value > 0 {
            self.value -= 1;
            true
        } else {
            false
        }
    }

    /// Atomically takes the whole current value, leaving the semaphore
    /// at zero, and returns how much was taken.
    pub fn drain(&mut self) -> i32 {
        let _guard = self.lock.lock();
        if self.value > 0 {
            let taken = self.value;
            self.value = 0;
            taken
        } else {
            0
        }
    }

    /// Blocking acquire. Returns `true` once woken by a matching `post`;
    /// returns `false` if the process was instead woken by some other
    /// means (it must then treat the wait as not having happened and
    /// retry or unwind as appropriate).
    ///
    /// # Safety
    /// Must be called from process context (not from inside the
    /// scheduler itself), with no locks besides `self.lock` held.
    pub unsafe fn acquire(&mut self) -> bool {
        let guard = self.lock.lock();
        self.value -= 1;
        if self.value >= 0 {
            drop(guard);
            return true;
        }

        let wait = Box::into_raw(Box::new(WaitData {
            proc: scheduler::thisproc(),
            acknowledged: false,
            list_node: ListNode::uninit(),
        }));
        list::insert_into_list(&mut self.sleepers, &mut (*wait).list_node);

        scheduler::acquire_sched_lock();
        drop(guard);
        scheduler::sched(crate::proc::process::ProcessState::Sleeping);

        let guard = self.lock.lock();
        if !(*wait).acknowledged {
            self.value += 1;
            debug_assert!(self.value <= 0);
            list::detach_from_list(&mut (*wait).list_node);
        }
        drop(guard);

        let acknowledged = (*wait).acknowledged;
        drop(Box::from_raw(wait));
        acknowledged
    }

    /// Releases one unit, waking the longest-waiting sleeper if any.
    /// Sleepers are inserted at the list head and popped from the tail
    /// (`sleepers.prev`), which keeps wakeup order FIFO despite
    /// head-insertion.
    pub fn post(&mut self) {
        let _guard = self.lock.lock();
        self.value += 1;
        if self.value <= 0 {
            debug_assert!(!unsafe { list::empty_list(&self.sleepers) });
            let node = self.sleepers.prev;
            let wait = unsafe { container_of!(node, WaitData, list_node) };
            unsafe {
                (*wait).acknowledged = true;
                list::detach_from_list(&mut (*wait).list_node);
                scheduler::activate((*wait).proc);
            }
        }
    }

    pub fn value(&self) -> i32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_acquire_respects_value() {
        let mut sem = Semaphore::new(1);
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn drain_takes_whole_positive_value() {
        let mut sem = Semaphore::new(3);
        assert_eq!(sem.drain(), 3);
        assert_eq!(sem.value(), 0);
        assert_eq!(sem.drain(), 0);
    }

    #[test]
    fn post_increments_when_no_sleepers() {
        let mut sem = Semaphore::new(0);
        sem.post();
        assert_eq!(sem.value(), 1);
        assert!(sem.try_acquire());
    }
}

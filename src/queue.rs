//! Spinlocked FIFO queue of intrusively-linked nodes (component C).
//!
//! Built directly on [`crate::list`]: a `Queue` is a circular list plus a
//! size counter and a lock. The raw `push`/`pop`/`detach`/`front`
//! operations assume the caller already holds `lock`; the `_locked`
//! wrappers take and release it for you, mirroring the C original's
//! `queue_push_lock`-style macros.

use crate::list::{self, ListNode};
use crate::sync::spinlock::Spinlock;
use core::ptr::null_mut;

#[repr(C)]
pub struct Queue {
    begin: *mut ListNode,
    end: *mut ListNode,
    size: usize,
    pub lock: Spinlock,
}

// Safety: all mutation of `begin`/`end`/`size` happens with `lock` held,
// enforced by convention the same way the C original relies on callers
// bracketing every raw operation with acquire/release.
unsafe impl Sync for Queue {}

impl Queue {
    pub const fn new() -> Queue {
        Queue {
            begin: null_mut(),
            end: null_mut(),
            size: 0,
            lock: Spinlock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Appends `item` to the back of the queue.
    ///
    /// # Safety
    /// Caller must hold `self.lock`. `item` must be dereferenceable and
    /// not already linked into this or any other list.
    pub unsafe fn push(&mut self, item: *mut ListNode) {
        list::init_list_node(item);
        if self.size == 0 {
            self.begin = item;
            self.end = item;
        } else {
            list::merge_list(self.end, item);
            self.end = item;
        }
        self.size += 1;
    }

    /// Removes the item at the front of the queue.
    ///
    /// # Safety
    /// Caller must hold `self.lock`. Panics if the queue is empty.
    pub unsafe fn pop(&mut self) {
        if self.size == 0 {
            panic!("queue pop: empty");
        }
        if self.size == 1 {
            self.begin = null_mut();
            self.end = null_mut();
        } else {
            let front = self.begin;
            self.begin = (*front).next;
            list::detach_from_list(front);
        }
        self.size -= 1;
    }

    /// Removes `item` from wherever it sits in the queue.
    ///
    /// # Safety
    /// Caller must hold `self.lock`. `item` must currently be linked
    /// into this queue. Panics if the queue is empty.
    pub unsafe fn detach(&mut self, item: *mut ListNode) {
        if self.size == 0 {
            panic!("queue detach: empty");
        }

        if self.size == 1 {
            self.begin = null_mut();
            self.end = null_mut();
        } else if self.begin == item {
            self.begin = (*item).next;
        } else if self.end == item {
            self.end = (*item).prev;
        }

        list::detach_from_list(item);
        self.size -= 1;
    }

    /// Returns the node at the front of the queue.
    ///
    /// # Safety
    /// Caller must hold `self.lock`. Panics if the queue is empty.
    pub unsafe fn front(&self) -> *mut ListNode {
        if self.begin.is_null() {
            panic!("queue front: empty");
        }
        self.begin
    }

    /// Locking wrapper around [`Queue::push`].
    ///
    /// # Safety
    /// `item` must be dereferenceable and not already linked anywhere.
    pub unsafe fn push_locked(&mut self, item: *mut ListNode) {
        let _guard = self.lock.lock();
        self.push(item);
    }

    /// Locking wrapper around [`Queue::pop`].
    pub fn pop_locked(&mut self) {
        let _guard = self.lock.lock();
        unsafe { self.pop() }
    }

    /// Locking wrapper around [`Queue::detach`].
    ///
    /// # Safety
    /// `item` must currently be linked into this queue.
    pub unsafe fn detach_locked(&mut self, item: *mut ListNode) {
        let _guard = self.lock.lock();
        self.detach(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_fifo() {
        let mut q = Queue::new();
        let mut a = ListNode::uninit();
        let mut b = ListNode::uninit();
        unsafe {
            q.push(&mut a);
            q.push(&mut b);
        }
        assert_eq!(q.len(), 2);
        unsafe {
            assert_eq!(q.front(), &mut a as *mut ListNode);
            q.pop();
            assert_eq!(q.front(), &mut b as *mut ListNode);
            q.pop();
        }
        assert!(q.is_empty());
    }

    #[test]
    fn detach_middle_item() {
        let mut q = Queue::new();
        let mut a = ListNode::uninit();
        let mut b = ListNode::uninit();
        let mut c = ListNode::uninit();
        unsafe {
            q.push(&mut a);
            q.push(&mut b);
            q.push(&mut c);
            q.detach(&mut b);
            assert_eq!(q.len(), 2);
            assert_eq!(q.front(), &mut a as *mut ListNode);
            q.pop();
            assert_eq!(q.front(), &mut c as *mut ListNode);
        }
    }

    #[test]
    #[should_panic(expected = "empty")]
    fn pop_on_empty_panics() {
        let mut q = Queue::new();
        unsafe {
            q.pop();
        }
    }
}

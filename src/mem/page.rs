//! Physical page allocator (component D).
//!
//! Free pages are threaded into a singly-linked freelist through the
//! first machine word of each free page, exactly like the C original's
//! `struct run`. The freelist itself is protected by a single spinlock;
//! there is no per-page locking.

use crate::arch::mem::PHYSTOP;
use crate::mem::memset;
use crate::param::PAGE_SIZE;
use crate::sync::spinlock::Spinlock;
use core::cell::UnsafeCell;
use core::ptr::null_mut;
use core::sync::atomic::{AtomicUsize, Ordering};

#[repr(C)]
struct Run {
    next: *mut Run,
}

struct KernelMemory {
    lock: Spinlock,
    freelist: UnsafeCell<*mut Run>,
}

// Safety: `freelist` is only ever touched with `lock` held.
unsafe impl Sync for KernelMemory {}

static KMEM: KernelMemory = KernelMemory {
    lock: Spinlock::new(),
    freelist: UnsafeCell::new(null_mut()),
};

/// Number of pages currently on loan from the allocator. Maintained for
/// observability only; nothing in the allocator depends on its value.
static ALLOCATED_PAGES: AtomicUsize = AtomicUsize::new(0);

pub fn allocated_page_count() -> usize {
    ALLOCATED_PAGES.load(Ordering::Relaxed)
}

pub const fn round_up(addr: usize) -> usize {
    (addr + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

pub const fn round_down(addr: usize) -> usize {
    addr & !(PAGE_SIZE - 1)
}

/// Initializes the page allocator, handing every page in
/// `[first_free, PHYSTOP)` to the freelist, then brings up the slab
/// caches that sit on top of it.
///
/// # Safety
/// `first_free` must be the first address after kernel image data that is
/// safe to reclaim as a free page, and the range up to `PHYSTOP` must not
/// overlap anything still in use.
pub unsafe fn kinit(first_free: usize) {
    set_first_free(first_free);
    freerange(first_free, PHYSTOP);
    crate::mem::slab::init_caches();
}

unsafe fn freerange(pa_start: usize, pa_end: usize) {
    let mut p = round_up(pa_start);
    while p + PAGE_SIZE <= pa_end {
        free_page(p as *mut u8);
        p += PAGE_SIZE;
    }
}

/// Allocates one zeroed 4096-byte physical page, or null if none remain.
pub fn alloc_page() -> *mut u8 {
    let run = {
        let _guard = KMEM.lock.lock();
        let freelist = KMEM.freelist.get();
        let r = unsafe { *freelist };
        if !r.is_null() {
            unsafe {
                *freelist = (*r).next;
            }
        }
        r
    };

    if run.is_null() {
        crate::println!("kmem: page pool exhausted");
        return null_mut();
    }
    ALLOCATED_PAGES.fetch_add(1, Ordering::Relaxed);
    unsafe {
        memset(run.cast(), 0, PAGE_SIZE as u32);
    }
    run as *mut u8
}

/// Returns `p`, which must have come from [`alloc_page`], to the freelist.
///
/// Panics on a misaligned pointer or one outside the managed range: a
/// bad free here means a caller has already corrupted the heap, and
/// there is nothing safe left to do but stop.
pub fn free_page(p: *mut u8) {
    let addr = p as usize;
    if addr % PAGE_SIZE != 0 || addr < round_up(unsafe { first_free_addr() }) || addr >= PHYSTOP {
        panic!("free_page: bad pointer {:#x}", addr);
    }

    unsafe {
        memset(p, 0, PAGE_SIZE as u32);
    }

    let run: *mut Run = p.cast();
    let _guard = KMEM.lock.lock();
    let freelist = KMEM.freelist.get();
    unsafe {
        (*run).next = *freelist;
        *freelist = run;
    }
    ALLOCATED_PAGES.fetch_sub(1, Ordering::Relaxed);
}

/// First address managed by the allocator; recorded at `kinit` time so
/// `free_page` can range-check without threading the value through every
/// call site. Set once during boot, read thereafter.
static mut FIRST_FREE: usize = 0;

unsafe fn first_free_addr() -> usize {
    FIRST_FREE
}

/// # Safety
/// Must be called exactly once, before `kinit`, from the boot path.
pub unsafe fn set_first_free(addr: usize) {
    FIRST_FREE = addr;
}

#[cfg(test)]
mod tests {
    use super::*;

    // `alloc_page`/`free_page` dereference real physical addresses bound
    // to `PHYSTOP`, so they have no meaning on the host and aren't
    // exercised here; only the pure rounding arithmetic is host-testable.

    #[test]
    fn round_up_down_are_page_aligned() {
        assert_eq!(round_up(1), PAGE_SIZE);
        assert_eq!(round_up(PAGE_SIZE), PAGE_SIZE);
        assert_eq!(round_down(PAGE_SIZE + 1), PAGE_SIZE);
    }
}

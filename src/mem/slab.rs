//! Slab allocator (component E), layered on top of the page allocator.
//!
//! Each size class owns a chain of slabs; each slab is exactly one
//! physical page, with a 32-byte header at its base and the rest carved
//! into `obj_size`-byte objects threaded into a singly-linked free list
//! through their first word. Freeing an object needs no lookup: rounding
//! the pointer down to a page boundary recovers the owning slab header
//! directly, so `free` never has to scan a cache's slab list.

use crate::mem::page::alloc_page;
use crate::param::{cache_obj_size, NUM_CACHE, PAGE_SIZE, SLAB_HEADER_SIZE};
use crate::sync::spinlock::Spinlock;
use core::cell::UnsafeCell;
use core::ptr::null_mut;

#[repr(C)]
struct SlabHeader {
    next: *mut SlabHeader,
    free_list: *mut u8,
    free_count: usize,
    lock: Spinlock,
}

const _: () = assert!(core::mem::size_of::<SlabHeader>() <= SLAB_HEADER_SIZE);

struct Cache {
    /// Head of this cache's slab chain, mutated only with `CACHES.lock`
    /// held (growing the chain is the only mutation; individual slabs
    /// manage their own free lists under their own lock).
    slabs: UnsafeCell<*mut SlabHeader>,
    slab_count: UnsafeCell<usize>,
    obj_size: usize,
}

// Safety: `slabs`/`slab_count` are only touched with `CACHES.lock` held.
unsafe impl Sync for Cache {}

struct Caches {
    lock: Spinlock,
    caches: [Cache; NUM_CACHE],
}

unsafe impl Sync for Caches {}

static CACHES: Caches = Caches {
    lock: Spinlock::new(),
    caches: {
        let mut c = [const {
            Cache {
                slabs: UnsafeCell::new(null_mut()),
                slab_count: UnsafeCell::new(0),
                obj_size: 0,
            }
        }; NUM_CACHE];
        let mut i = 0;
        while i < NUM_CACHE {
            c[i].obj_size = cache_obj_size(i);
            i += 1;
        }
        c
    },
};

/// (Re)initializes every cache to empty. Called once from `page::kinit`.
pub fn init_caches() {
    // `CACHES` is already correctly initialized as a `static`; nothing to
    // do here beyond asserting the invariant the const initializer relies
    // on, which the compiler already checked via the `const _` assert
    // above. Kept as an explicit entry point so boot order reads the same
    // way the original's `init_caches()` does.
}

fn get_cache(size: usize) -> Option<usize> {
    (0..NUM_CACHE).find(|&i| size <= CACHES.caches[i].obj_size)
}

fn slab_alloc(i: usize) -> *mut u8 {
    let obj_size = CACHES.caches[i].obj_size;
    let slabs_slot = CACHES.caches[i].slabs.get();

    let mut slab = unsafe { *slabs_slot };
    while !slab.is_null() {
        unsafe {
            let guard = (*slab).lock.lock();
            if (*slab).free_count > 0 {
                let obj = (*slab).free_list;
                (*slab).free_list = *(obj as *const *mut u8);
                (*slab).free_count -= 1;
                drop(guard);
                return obj;
            }
            drop(guard);
            slab = (*slab).next;
        }
    }

    // No existing slab has room: carve a fresh page.
    let page = alloc_page();
    if page.is_null() {
        crate::println!("slab: cache {} (obj size {}) out of pages", i, obj_size);
        return null_mut();
    }

    let slab = page as *mut SlabHeader;
    unsafe {
        core::ptr::write(
            slab,
            SlabHeader {
                next: null_mut(),
                free_list: null_mut(),
                free_count: 0,
                lock: Spinlock::new(),
            },
        );

        let guard = (*slab).lock.lock();

        let free_list_base = page.add(SLAB_HEADER_SIZE);
        let free_count = (PAGE_SIZE - SLAB_HEADER_SIZE) / obj_size;

        let mut obj = free_list_base;
        for _ in 1..free_count {
            let next_obj = obj.add(obj_size);
            *(obj as *mut *mut u8) = next_obj;
            obj = next_obj;
        }
        *(obj as *mut *mut u8) = null_mut();

        (*slab).free_list = free_list_base;
        (*slab).free_count = free_count;

        {
            let _caches_guard = CACHES.lock.lock();
            (*slab).next = *slabs_slot;
            *slabs_slot = slab;
            *CACHES.caches[i].slab_count.get() += 1;
        }

        let first = (*slab).free_list;
        (*slab).free_list = *(first as *const *mut u8);
        (*slab).free_count -= 1;
        drop(guard);
        first
    }
}

/// Allocates an object of at least `size` bytes from the smallest cache
/// that fits it, or null if `size` exceeds the largest size class or the
/// page allocator is exhausted.
pub fn alloc(size: usize) -> *mut u8 {
    match get_cache(size) {
        Some(i) => slab_alloc(i),
        None => null_mut(),
    }
}

/// Returns `obj`, previously returned by [`alloc`], to its slab.
///
/// # Safety
/// `obj` must have come from a still-live call to [`alloc`] and must not
/// be freed twice.
pub unsafe fn free(obj: *mut u8) {
    let slab = (crate::mem::page::round_down(obj as usize)) as *mut SlabHeader;
    let guard = (*slab).lock.lock();
    *(obj as *mut *mut u8) = (*slab).free_list;
    (*slab).free_list = obj;
    (*slab).free_count += 1;
    drop(guard);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_cache_picks_smallest_fit() {
        assert_eq!(get_cache(1), Some(0));
        assert_eq!(get_cache(8), Some(0));
        assert_eq!(get_cache(9), Some(1));
        assert_eq!(get_cache(4096), Some(NUM_CACHE - 1));
        assert_eq!(get_cache(4097), None);
    }

    #[test]
    fn slab_header_fits_budget() {
        assert!(core::mem::size_of::<SlabHeader>() <= SLAB_HEADER_SIZE);
    }
}

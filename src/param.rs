//! Numeric constants that make up the kernel's logical contract.
//!
//! Everything here holds regardless of which board feature (see
//! `arch::aarch64::memlayout`) is active: the core's invariants never depend
//! on where physical memory or the UART happen to live.

/// Fixed number of hardware CPUs this core schedules across.
pub const NCPU: usize = 4;

/// Bytes per physical page, and per slab.
pub const PAGE_SIZE: usize = 4096;

/// Number of slab size classes.
pub const NUM_CACHE: usize = 10;

/// Object size, in bytes, of cache `i`: `8, 16, 32, ..., 4096`.
pub const fn cache_obj_size(i: usize) -> usize {
    8usize << i
}

/// Bytes reserved at the front of a slab page for the `SlabHeader`.
pub const SLAB_HEADER_SIZE: usize = 32;

/// First pid handed out by the process tree (the root process itself).
pub const FIRST_PID: i32 = 1;

/// Upper bound on in-flight one-shot timers tracked by a single CPU's
/// timer registry (component I). The registry is a small per-CPU structure,
/// not a general-purpose allocator, so a fixed capacity is appropriate.
pub const MAX_TIMERS_PER_CPU: usize = 16;

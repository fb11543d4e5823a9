//! Host stand-in for the aarch64 primitives in [`super::aarch64`], used
//! when running `cargo test` on a non-aarch64 machine. `cpu_id` collapses
//! every test thread onto CPU 0.

use core::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(true);

pub unsafe fn cpu_id() -> u64 {
    0
}

pub unsafe fn intr_get() -> bool {
    INTERRUPTS_ENABLED.load(Ordering::Relaxed)
}

pub unsafe fn intr_off() {
    INTERRUPTS_ENABLED.store(false, Ordering::Relaxed);
}

pub unsafe fn intr_on() {
    INTERRUPTS_ENABLED.store(true, Ordering::Relaxed);
}

/// # Safety
/// Never call this on the host: there is no real kernel stack to switch
/// to, so this always panics rather than silently corrupting something.
pub unsafe fn swtch(
    _old_ctx: *mut *mut crate::proc::context::KernelContext,
    _new_ctx: *mut crate::proc::context::KernelContext,
) {
    unimplemented!("swtch has no host-testable meaning outside the aarch64 target")
}

pub mod memlayout {
    pub const UART0: usize = 0;
    pub const KERNBASE: usize = 0;
    pub const PHYSTOP: usize = 0;
}

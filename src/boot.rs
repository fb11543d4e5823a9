//! Boot sequencing (component J).
//!
//! CPU0 brings up the page/slab allocators and the process tree, then
//! releases the other NCPU-1 CPUs with a single release-ordered flag;
//! every CPU (including CPU0) then falls into its own idle process and
//! the scheduler takes over from there. The actual entry assembly that
//! lands here with MMU/stack set up per-CPU is out of this core's scope;
//! `kernel_start` is what it's expected to call.

#[cfg(not(test))]
use crate::mem::page;
#[cfg(not(test))]
use crate::proc::cpu::Cpu;
#[cfg(not(test))]
use crate::proc::process;
#[cfg(not(test))]
use crate::{println, uprintln};
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(test)]
use crate::param::NCPU;

/// Set by CPU0 once boot-critical global state (allocators, process
/// tree, scheduler) is ready for the other CPUs to touch.
static BOOT_SECONDARY_CPUS: AtomicBool = AtomicBool::new(false);

/// First entry point for a process running on behalf of the kernel
/// itself. A real kernel would have this launch init work; the core
/// treats it as an injected dependency since what the kernel actually
/// does once scheduling exists is out of scope here.
///
/// Declared only outside `cfg(test)`: the host test binary links the
/// whole crate, and nothing provides this symbol on the host.
#[cfg(not(test))]
extern "C" {
    fn kernel_entry(arg: u64) -> !;
}

/// # Safety
/// Must be called exactly once per CPU, at boot, with `first_free_page`
/// valid only on the `cpu_id == 0` call (the other CPUs ignore it).
#[cfg(not(test))]
pub unsafe fn kernel_start(first_free_page: usize) -> ! {
    let id = Cpu::current_id();

    if id == 0 {
        page::kinit(first_free_page);
        process::init_kproc(kernel_entry);

        println!("kernel: hello from cpu 0");

        core::sync::atomic::fence(Ordering::Release);
        BOOT_SECONDARY_CPUS.store(true, Ordering::Release);
    } else {
        while !BOOT_SECONDARY_CPUS.load(Ordering::Acquire) {
            core::hint::spin_loop();
        }
        core::sync::atomic::fence(Ordering::Acquire);
        uprintln!("kernel: hello from cpu {}", id);
    }

    Cpu::current().online = true;
    idle_entry()
}

/// Every CPU, including CPU0, ends boot here: parked as its own idle
/// process until the scheduler hands it something real to run.
#[cfg(not(test))]
fn idle_entry() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_flag_starts_false() {
        assert!(!BOOT_SECONDARY_CPUS.load(Ordering::Relaxed));
    }

    #[test]
    fn ncpu_is_four() {
        assert_eq!(NCPU, 4);
    }
}

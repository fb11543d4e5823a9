//! Per-CPU state (NCPU=4 hardware threads, fixed at compile time).

use super::context::KernelContext;
use super::process::Process;
use super::timer::TimerRegistry;
use crate::arch::cpu::cpu_id;
use crate::arch::interrupt::{intr_get, intr_off, intr_on};
use crate::param::NCPU;
use core::ptr::{addr_of_mut, null_mut};

/// Per-CPU scheduling and bookkeeping state. One instance per hardware
/// thread, indexed by `cpu_id()`.
#[repr(C)]
pub struct Cpu {
    /// The process currently running on this CPU, or null before the
    /// scheduler has been brought up.
    pub current: *mut Process,
    /// This CPU's idle process: the process `pick_next` falls back to
    /// when the run queue has nothing runnable.
    pub idle: *mut Process,
    /// Saved kernel context for `swtch`ing into the scheduler loop.
    pub context: KernelContext,
    /// Depth of `push_intr_off` nesting.
    pub interrupt_disable_layers: i32,
    /// Were interrupts enabled before the first `push_intr_off`?
    pub previous_interrupts_enabled: bool,
    /// Whether this CPU has completed boot and joined the scheduler.
    pub online: bool,
    /// This CPU's one-shot timer registry (component I).
    pub timers: TimerRegistry,
}

impl Cpu {
    pub const fn new() -> Cpu {
        Cpu {
            current: null_mut(),
            idle: null_mut(),
            context: KernelContext::new(),
            interrupt_disable_layers: 0,
            previous_interrupts_enabled: false,
            online: false,
            timers: TimerRegistry::new(),
        }
    }

    /// Returns this CPU's `Cpu` record.
    ///
    /// # Safety
    /// Interrupts must be disabled, or the calling code must otherwise
    /// guarantee it won't be migrated to a different CPU mid-call.
    pub unsafe fn current() -> &'static mut Cpu {
        let id = cpu_id();
        &mut *addr_of_mut!(CPUS[id as usize])
    }

    pub fn current_id() -> i32 {
        unsafe { cpu_id() as i32 }
    }

    /// Disables interrupts, remembering whether they were enabled so a
    /// matching number of `pop_intr_off` calls can restore the original
    /// state. Nested calls stack: it takes as many `pop_intr_off` calls
    /// to re-enable interrupts as there were `push_intr_off` calls.
    ///
    /// # Safety
    /// Must be paired with a `pop_intr_off` once the critical section
    /// this call is guarding has ended.
    pub unsafe fn push_intr_off() {
        let was_enabled = intr_get();
        intr_off();

        let cpu = Cpu::current();
        if cpu.interrupt_disable_layers == 0 {
            cpu.previous_interrupts_enabled = was_enabled;
        }
        cpu.interrupt_disable_layers += 1;
    }

    /// # Safety
    /// Must be called once for each `push_intr_off`, in reverse order.
    pub unsafe fn pop_intr_off() {
        if intr_get() {
            panic!("pop_intr_off: interruptible");
        }

        let cpu = Cpu::current();
        if cpu.interrupt_disable_layers < 1 {
            panic!("pop_intr_off: not disabled");
        }
        cpu.interrupt_disable_layers -= 1;

        if cpu.interrupt_disable_layers == 0 && cpu.previous_interrupts_enabled {
            intr_on();
        }
    }
}

// Safety: every `Cpu` is only ever accessed via `Cpu::current()`, which
// requires interrupts disabled on the accessing CPU, and no other CPU
// touches a `Cpu` record that isn't its own except through the locked
// process tree / scheduler / semaphore structures a `Process` embeds.
unsafe impl Sync for Cpu {}

pub static mut CPUS: [Cpu; NCPU] = [const { Cpu::new() }; NCPU];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cpu_has_no_current_or_idle_process() {
        let cpu = Cpu::new();
        assert!(cpu.current.is_null());
        assert!(cpu.idle.is_null());
        assert_eq!(cpu.interrupt_disable_layers, 0);
        assert!(cpu.timers.is_empty());
    }
}

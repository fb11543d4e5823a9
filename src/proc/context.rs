//! Saved register contexts: `KernelContext` for switching between kernel
//! stacks via `swtch`, `UserContext` for entering/leaving user mode.

/// Registers `swtch` saves and restores across a kernel-to-kernel
/// context switch. Only the callee-saved registers need saving per the
/// AArch64 procedure call standard, plus two argument slots (`x0`, `x1`)
/// used by `proc_entry` to hand a freshly started process its entry
/// function and argument.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct KernelContext {
    pub x0: u64,
    pub x1: u64,

    pub x19: u64,
    pub x20: u64,
    pub x21: u64,
    pub x22: u64,
    pub x23: u64,
    pub x24: u64,
    pub x25: u64,
    pub x26: u64,
    pub x27: u64,
    pub x28: u64,
    /// Frame pointer.
    pub x29: u64,
    /// Link register: where `swtch` returns to.
    pub x30: u64,
}

impl KernelContext {
    pub const fn new() -> KernelContext {
        KernelContext {
            x0: 0,
            x1: 0,
            x19: 0,
            x20: 0,
            x21: 0,
            x22: 0,
            x23: 0,
            x24: 0,
            x25: 0,
            x26: 0,
            x27: 0,
            x28: 0,
            x29: 0,
            x30: 0,
        }
    }
}

/// Full register file saved on entry to the kernel from user mode.
/// Unused by this core (no user mode or syscalls here), but `Process`
/// carries a pointer to one so a future trap handler has the layout.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct UserContext {
    pub sp: u64,
    pub elr: u64,
    pub spsr: u64,

    pub x0: u64,
    pub x1: u64,
    pub x2: u64,
    pub x3: u64,
    pub x4: u64,
    pub x5: u64,
    pub x6: u64,
    pub x7: u64,
    pub x8: u64,
    pub x9: u64,
    pub x10: u64,
    pub x11: u64,
    pub x12: u64,
    pub x13: u64,
    pub x14: u64,
    pub x15: u64,
    pub x16: u64,
    pub x17: u64,
    pub x18: u64,
    pub x19: u64,
    pub x20: u64,
    pub x21: u64,
    pub x22: u64,
    pub x23: u64,
    pub x24: u64,
    pub x25: u64,
    pub x26: u64,
    pub x27: u64,
    pub x28: u64,
    pub x29: u64,
    pub x30: u64,
}

impl UserContext {
    pub const fn new() -> UserContext {
        UserContext {
            sp: 0,
            elr: 0,
            spsr: 0,
            x0: 0,
            x1: 0,
            x2: 0,
            x3: 0,
            x4: 0,
            x5: 0,
            x6: 0,
            x7: 0,
            x8: 0,
            x9: 0,
            x10: 0,
            x11: 0,
            x12: 0,
            x13: 0,
            x14: 0,
            x15: 0,
            x16: 0,
            x17: 0,
            x18: 0,
            x19: 0,
            x20: 0,
            x21: 0,
            x22: 0,
            x23: 0,
            x24: 0,
            x25: 0,
            x26: 0,
            x27: 0,
            x28: 0,
            x29: 0,
            x30: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_context_size_matches_register_count() {
        assert_eq!(core::mem::size_of::<KernelContext>(), 14 * 8);
    }

    #[test]
    fn user_context_size_matches_register_count() {
        assert_eq!(core::mem::size_of::<UserContext>(), 34 * 8);
    }
}

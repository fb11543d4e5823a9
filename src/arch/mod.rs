//! Architecture seam.
//!
//! Real target code lives in [`aarch64`] and is only compiled when building
//! for that target. Everything elsewhere in the crate reaches the current
//! architecture's primitives through the `cpu`/`interrupt`/`mem` facades
//! below rather than naming `aarch64` directly, so that building this crate
//! for the host (`cargo test` on whatever architecture the developer's
//! machine is) has something to link against: [`sim`] stands in for the
//! real MMIO/system-register/`swtch` primitives on any non-aarch64 target.

#[cfg(target_arch = "aarch64")]
pub mod aarch64;

#[cfg(not(target_arch = "aarch64"))]
mod sim;

pub mod cpu {
    #[cfg(target_arch = "aarch64")]
    pub use super::aarch64::asm::{cpu_id, swtch};
    #[cfg(not(target_arch = "aarch64"))]
    pub use super::sim::{cpu_id, swtch};
}

pub mod interrupt {
    #[cfg(target_arch = "aarch64")]
    pub use super::aarch64::asm::{intr_get, intr_off, intr_on};
    #[cfg(not(target_arch = "aarch64"))]
    pub use super::sim::{intr_get, intr_off, intr_on};
}

pub mod mem {
    #[cfg(target_arch = "aarch64")]
    pub use super::aarch64::memlayout::{KERNBASE, PHYSTOP, UART0};
    #[cfg(not(target_arch = "aarch64"))]
    pub use super::sim::memlayout::{KERNBASE, PHYSTOP, UART0};

    pub fn round_up_page(size: usize) -> usize {
        crate::mem::page::round_up(size)
    }

    pub fn round_down_page(addr: usize) -> usize {
        crate::mem::page::round_down(addr)
    }
}

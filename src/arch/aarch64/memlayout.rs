//! Physical memory layout.
//!
//! The two supported boards (QEMU's `virt` machine, and the Raspberry
//! Pi 4) differ only in the handful of constants below; the logical
//! kernel constants in `crate::param` never change between them.

#[cfg(feature = "qemu-virt")]
mod board {
    // QEMU's `virt` machine maps a PL011 UART at this address and gives
    // the guest RAM starting at 0x4000_0000.
    pub const UART0: usize = 0x0900_0000;
    pub const KERNBASE: usize = 0x4000_0000;
    pub const PHYSTOP: usize = KERNBASE + 128 * 1024 * 1024;
}

#[cfg(feature = "raspi4")]
mod board {
    // BCM2711 mini UART, and the first 128MiB of the Pi 4's RAM.
    pub const UART0: usize = 0xFE21_5000;
    pub const KERNBASE: usize = 0x8_0000;
    pub const PHYSTOP: usize = KERNBASE + 128 * 1024 * 1024;
}

pub use board::{KERNBASE, PHYSTOP, UART0};

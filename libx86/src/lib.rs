//! 32-bit protected mode descriptor tables and interrupt dispatching.
#![no_std]
#![allow(clippy::cast_possible_truncation, clippy::module_name_repetitions)]

#[cfg(test)]
extern crate std;

#[macro_use]
extern crate log;

/// Items that execute privileged instructions, only built for the freestanding i686 target.
#[macro_export]
macro_rules! cfg_i686 {
    ($($item:item)*) => {
        $(
            #[cfg(all(target_arch = "x86", target_os = "none"))]
            $item
        )*
    }
}

/// Host stand-ins for [`cfg_i686`] items.
#[macro_export]
macro_rules! cfg_not_i686 {
    ($($item:item)*) => {
        $(
            #[cfg(not(all(target_arch = "x86", target_os = "none")))]
            $item
        )*
    }
}

pub mod descriptors;
pub mod error;
pub mod gdt;
pub mod idt;
pub mod interrupts;
pub mod loader;
pub mod segments;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod port;

cfg_i686! {
    pub mod control;
}

pub use descriptors::Privilege;
pub use error::Error;

/// Interrupt flag of EFLAGS.
pub const EFLAGS_IF: u32 = 1 << 9;

cfg_i686! {
    use core::arch::asm;

    /// Waits for the next interrupt.
    #[inline]
    pub fn hlt() {
        unsafe {
            asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }

    /// Masks maskable interrupts.
    #[inline]
    pub fn cli() {
        unsafe {
            asm!("cli", options(nomem, nostack));
        }
    }

    /// Unmasks maskable interrupts.
    ///
    /// # Safety
    ///
    /// A valid interrupt table must be loaded.
    #[inline]
    pub unsafe fn sti() {
        asm!("sti", options(nomem, nostack));
    }

    #[inline]
    #[must_use]
    pub fn interrupts_enabled() -> bool {
        let eflags: u32;
        unsafe {
            asm!("pushfd", "pop {}", out(reg) eflags, options(nomem, preserves_flags));
        }
        eflags & EFLAGS_IF != 0
    }
}

cfg_not_i686! {
    #[inline]
    pub fn hlt() {
        core::hint::spin_loop();
    }

    #[inline]
    pub fn cli() {}

    /// # Safety
    ///
    /// Does nothing off target.
    #[inline]
    pub unsafe fn sti() {}

    #[inline]
    #[must_use]
    pub fn interrupts_enabled() -> bool {
        false
    }
}

/// Masks interrupts and halts forever.
pub fn diverging_hlt() -> ! {
    cli();
    loop {
        hlt();
    }
}

/// Runs `f` with interrupts masked, restoring the previous interrupt flag afterwards.
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let enabled = interrupts_enabled();
    if enabled {
        cli();
    }

    let ret = f();

    if enabled {
        // SAFETY: interrupts were enabled on entry, so a table is loaded
        unsafe { sti() };
    }
    ret
}

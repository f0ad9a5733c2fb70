use core::arch::asm;

/// Linear address that caused the last page fault.
#[inline]
#[must_use]
pub fn cr2() -> u32 {
    let value: u32;
    unsafe {
        asm!("mov {}, cr2", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

/// Protection enable bit of CR0.
pub const CR0_PE: u32 = 1;

#[inline]
#[must_use]
pub fn cr0() -> u32 {
    let value: u32;
    unsafe {
        asm!("mov {}, cr0", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

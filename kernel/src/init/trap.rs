//! Trap-entry stubs.
//!
//! Every vector gets a 16-byte stub in one contiguous block. A stub masks interrupts, pushes a
//! dummy error code when the processor did not push one, pushes its vector and jumps to the
//! common path, which completes a [`libx86::interrupts::TrapFrame`] on the stack and hands it
//! to `__trap_dispatch`.

use core::arch::global_asm;

use libx86::{interrupts::Vector, segments::SegmentSelector};

/// Size of one stub.
pub const STUB_SIZE: u32 = 16;

// the common path loads this selector as an immediate
const _: () = assert!(SegmentSelector::KERNEL_DATA.as_u16() == 0x10);

/// Vectors whose stub skips the dummy error code, must match the `.if` below.
const ERROR_CODE_VECTORS: [u8; 10] = [8, 10, 11, 12, 13, 14, 17, 21, 29, 30];

const fn stub_skips_dummy(vector: u8) -> bool {
    let mut i = 0;
    while i < ERROR_CODE_VECTORS.len() {
        if ERROR_CODE_VECTORS[i] == vector {
            return true;
        }
        i += 1;
    }
    false
}

// a stub that disagrees with the processor shifts every field of the trap frame
const _: () = {
    let mut vector = 0;
    while vector < Vector::COUNT {
        let v = Vector::from_u8(vector as u8);
        assert!(v.pushes_error_code() == stub_skips_dummy(vector as u8));
        vector += 1;
    }
};

global_asm!(
    r#"
    .section .text
    .balign 16
    .global __trap_stubs
__trap_stubs:
    .set vector, 0
    .rept 256
    .balign 16
    cli
    # ERROR_CODE_VECTORS
    .if (vector == 8) || ((vector >= 10) && (vector <= 14)) || (vector == 17) || (vector == 21) || (vector == 29) || (vector == 30)
    .else
    pushl $0
    .endif
    pushl $vector
    jmp __trap_common
    .set vector, vector + 1
    .endr

__trap_common:
    pushal
    xorl %eax, %eax
    movw %ds, %ax
    pushl %eax

    movw $0x10, %ax
    movw %ax, %ds
    movw %ax, %es
    movw %ax, %fs
    movw %ax, %gs

    pushl %esp
    cld
    call __trap_dispatch
    addl $4, %esp

    popl %eax
    movw %ax, %ds
    movw %ax, %es
    movw %ax, %fs
    movw %ax, %gs

    popal
    # vector and error code
    addl $8, %esp
    iretl
    "#,
    options(att_syntax)
);

extern "C" {
    static __trap_stubs: u8;
}

/// Entry address of the stub for `vector`.
pub fn stub_address(vector: Vector) -> u32 {
    // SAFETY: only the address of the symbol is taken
    let base = unsafe { core::ptr::addr_of!(__trap_stubs) } as usize as u32;
    base + u32::from(vector.as_u8()) * STUB_SIZE
}

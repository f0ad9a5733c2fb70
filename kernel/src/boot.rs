//! Multiboot entry: the loader jumps to `_start` in 32-bit protected mode with paging off.

use core::arch::global_asm;

global_asm!(
    r#"
    .set MULTIBOOT_MAGIC, 0x1BADB002
    // page aligned modules, memory map
    .set MULTIBOOT_FLAGS, 0x00000003

    .section .multiboot, "a"
    .balign 4
    .long MULTIBOOT_MAGIC
    .long MULTIBOOT_FLAGS
    .long -(MULTIBOOT_MAGIC + MULTIBOOT_FLAGS)

    .section .bss
    .balign 16
__boot_stack_bottom:
    .skip 16384
__boot_stack_top:

    .section .text
    .global _start
    .type _start, @function
_start:
    movl $__boot_stack_top, %esp
    cld
    call kmain
2:
    cli
    hlt
    jmp 2b
    "#,
    options(att_syntax)
);

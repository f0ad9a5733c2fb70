#![cfg_attr(target_os = "none", no_std, no_main)]
#![allow(clippy::cast_possible_truncation, clippy::missing_panics_doc)]

#[cfg(target_os = "none")]
#[macro_use]
extern crate log;

#[cfg(all(target_arch = "x86", target_os = "none"))]
mod boot;
#[cfg(all(target_arch = "x86", target_os = "none"))]
mod init;

#[cfg(all(target_arch = "x86", target_os = "none"))]
#[no_mangle]
pub extern "C" fn kmain() -> ! {
    init_logging();
    info!("kernel loaded");

    if let Err(err) = init::kinit() {
        error!("initialisation failed: {}", err);
        libx86::diverging_hlt();
    }

    // SAFETY: every gate of the loaded table is present
    unsafe { libx86::sti() };
    info!("interrupts enabled");

    // SAFETY: vector 3 has a handler
    unsafe { core::arch::asm!("int3") };

    loop {
        libx86::hlt();
    }
}

#[cfg(all(target_arch = "x86", target_os = "none", feature = "qemu"))]
fn init_logging() {
    if qemu_logger::init().is_err() {
        // no sink left to report to
        libx86::diverging_hlt();
    }
}

#[cfg(all(target_arch = "x86", target_os = "none", not(feature = "qemu")))]
fn init_logging() {}

#[cfg(target_os = "none")]
#[panic_handler]
fn ph(info: &core::panic::PanicInfo) -> ! {
    error!("PANIC => {}", info);
    libx86::diverging_hlt();
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("the kernel only runs on a bare metal i686 target, see kernel/i686-kernel.json");
}

mod gdt;
pub mod interrupts;
mod trap;

use libx86::{gdt::Selectors, loader::Cpu, without_interrupts};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("descriptor tables: {0}")]
    Tables(#[from] libx86::Error),

    #[error("pic: {0}")]
    Pic(#[from] pic::Error),
}

/// Installs the segment table, the interrupt table and the PIC, then registers the kernel's
/// handlers. Interrupts stay masked.
#[inline(never)]
pub fn kinit() -> Result<(), InitError> {
    debug_assert!(libx86::control::cr0() & libx86::control::CR0_PE != 0);

    let (gdt, selectors) = &*gdt::GDT;
    gdt.load_static(&mut Cpu, selectors);
    trace!("CS: {:?}", libx86::segments::cs());
    trace!("DS: {:?}", libx86::segments::ds());

    install_idt(selectors)?;

    without_interrupts(|| -> Result<(), InitError> {
        let mut pics = interrupts::PICS.lock();
        pics.init()?;
        // timer only
        pics.set_masks(0b1111_1110, 0b1111_1111)?;
        let (master, slave) = pics.masks()?;
        trace!("PIC Initialized, masks {:#010b} {:#010b}", master, slave);
        Ok(())
    })?;

    interrupts::register_handlers()?;
    Ok(())
}

fn install_idt(selectors: &Selectors) -> Result<(), InitError> {
    let mut idt = interrupts::IDT.lock();
    idt.init(selectors.code_segment, trap::stub_address)?;
    // SAFETY: the table lives in a static and is never replaced once loaded
    unsafe { idt.load(&mut Cpu)? };
    trace!("IDT Initialized at {:?}", idt.pointer());
    Ok(())
}

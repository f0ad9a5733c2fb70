use core::sync::atomic::{AtomicU32, Ordering};

use kcore::sync::SpinMutex;
use libx86::{
    idt::InterruptDescriptorTable,
    interrupts::{Dispatcher, Halt, InterruptEvent, Outcome, TrapFrame, Vector},
};
use pic::Chained;

pub static IDT: SpinMutex<InterruptDescriptorTable> =
    SpinMutex::new(InterruptDescriptorTable::new());

pub static DISPATCHER: Dispatcher<Halt> = Dispatcher::new(Halt);

/// IRQ 0-7 on vectors 32-39, IRQ 8-15 on vectors 40-47.
pub static PICS: SpinMutex<Chained<0x20, 0x28>> = SpinMutex::new(Chained::uninit());

static TICKS: AtomicU32 = AtomicU32::new(0);

pub fn register_handlers() -> Result<(), libx86::Error> {
    DISPATCHER.register_handler(Vector::BREAKPOINT.as_usize(), int3)?;
    DISPATCHER.register_handler(Vector::DOUBLE_FAULT.as_usize(), double_fault)?;
    if let Some(timer_vector) = Vector::irq(0) {
        DISPATCHER.register_handler(timer_vector.as_usize(), timer)?;
    }
    Ok(())
}

fn int3(event: &mut InterruptEvent) {
    info!("breakpoint at {:#010x}", event.registers.frame.eip);
}

fn double_fault(event: &mut InterruptEvent) {
    libx86::interrupts::fault::report(event);
    event.request_termination();
}

fn timer(_: &mut InterruptEvent) {
    let ticks = TICKS.fetch_add(1, Ordering::Relaxed) + 1;
    if ticks % 1000 == 0 {
        trace!("{} timer ticks", ticks);
    }
}

/// Called by the common trap path with interrupts masked.
#[no_mangle]
extern "C" fn __trap_dispatch(frame: &mut TrapFrame) {
    let mut event = match frame.event() {
        Ok(event) => event,
        Err(err) => {
            error!("malformed trap frame: {} {:#x?}", err, frame);
            libx86::diverging_hlt();
        }
    };

    let outcome = DISPATCHER.dispatch(&mut event);
    frame.restore(&event.registers);

    let vector = event.vector.as_u8();
    let mut pics = PICS.lock();
    if pics.handles_interrupt(vector) {
        if let Err(err) = pics.notify_end_of_interrupt(vector) {
            warn!("no end of interrupt for {:?}: {}", event.vector, err);
        }
    }
    drop(pics);

    if outcome == Outcome::Terminate {
        error!("{:?} terminated the running context", event.vector);
        libx86::diverging_hlt();
    }
}

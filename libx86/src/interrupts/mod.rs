//! Vector bookkeeping, the trap frame shared with the entry stubs, and the handler registry.

mod dispatch;
pub mod fault;
mod frame;
mod vector;

pub use dispatch::{Dispatcher, FaultPolicy, Halt, Handler, Outcome};
pub use fault::PageFaultErrorCode;
pub use frame::{GeneralRegisters, InterruptEvent, InterruptFrame, RegisterSnapshot, TrapFrame};
pub use vector::Vector;

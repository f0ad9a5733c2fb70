//! # Programmable Interrupt Controller
//!
//! Source: <http://www.brokenthorn.com/Resources/OSDevPic.html>
//!
//! ## 8259A Software Port Map
//!
//! Port Address | Description
//! -------------|----------------------------------------------------------------
//! 0x20         | Primary PIC Command and Status Register
//! 0x21         | Primary PIC Interrupt Mask Register and Data Register
//! 0xA0         | Secondary (Slave) PIC Command and Status Register
//! 0xA1         | Secondary (Slave) PIC Interrupt Mask Register and Data Register
#![no_std]

#[cfg(test)]
extern crate std;

#[macro_use]
extern crate log;

use core::marker::PhantomData;

use libx86::port::{io_wait, RWPort};
use thiserror::Error;

pub mod chained;
pub mod words;

pub use chained::Chained;

use words::{ICW1, ICW3, ICW4};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("the controllers are already remapped")]
    AlreadyInitialized,

    #[error("the controllers have not been remapped")]
    Uninitialized,

    #[error("vector {0} is not routed through the controllers")]
    NotPicVector(u8),
}

pub trait PicState {}

/// Freshly constructed, vectors still overlap the exceptions.
pub struct Uninit;
struct Icw1;
struct Icw2;
struct Icw3;
struct Icw4;
/// Remapped to `OFFSET..OFFSET + 8`.
pub struct Ready;

impl PicState for Uninit {}
impl PicState for Icw1 {}
impl PicState for Icw2 {}
impl PicState for Icw3 {}
impl PicState for Icw4 {}
impl PicState for Ready {}

/// One 8259A, the state parameter tracks the initialization sequence.
pub struct Pic<S: PicState, const OFFSET: u8> {
    command: RWPort<u8>,
    data: RWPort<u8>,
    _s: PhantomData<S>,
}

impl<S: PicState, const OFFSET: u8> Pic<S, OFFSET> {
    /// Lines `0..8` of this controller raise `OFFSET..OFFSET + 8`.
    #[inline]
    #[must_use]
    pub const fn handles_interrupt(&self, vector: u8) -> bool {
        vector.wrapping_sub(OFFSET) < 8
    }

    fn next<N: PicState>(self) -> Pic<N, OFFSET> {
        Pic {
            command: self.command,
            data: self.data,
            _s: PhantomData,
        }
    }
}

impl<const OFFSET: u8> Pic<Uninit, OFFSET> {
    /// # Safety
    ///
    /// The ports must belong to an 8259A.
    #[must_use]
    pub const unsafe fn new(command: u16, data: u16) -> Self {
        Self {
            command: RWPort::new(command),
            data: RWPort::new(data),
            _s: PhantomData,
        }
    }

    #[must_use]
    pub const fn master() -> Self {
        unsafe { Self::new(0x20, 0x21) }
    }

    #[must_use]
    pub const fn slave() -> Self {
        unsafe { Self::new(0xA0, 0xA1) }
    }

    fn read_mask(&self) -> u8 {
        unsafe { self.data.read() }
    }

    fn write_icw1(mut self, icw1: ICW1) -> Pic<Icw1, OFFSET> {
        unsafe { self.command.write(icw1.as_u8()) };
        self.next()
    }
}

impl<const OFFSET: u8> Pic<Icw1, OFFSET> {
    fn write_icw2(mut self) -> Pic<Icw2, OFFSET> {
        unsafe { self.data.write(OFFSET) };
        self.next()
    }
}

impl<const OFFSET: u8> Pic<Icw2, OFFSET> {
    fn write_icw3(mut self, icw3: ICW3) -> Pic<Icw3, OFFSET> {
        unsafe { self.data.write(icw3.0) };
        self.next()
    }
}

impl<const OFFSET: u8> Pic<Icw3, OFFSET> {
    fn write_icw4(mut self, icw4: ICW4) -> Pic<Icw4, OFFSET> {
        unsafe { self.data.write(icw4.as_u8()) };
        self.next()
    }
}

impl<const OFFSET: u8> Pic<Icw4, OFFSET> {
    fn write_mask(mut self, mask: u8) -> Pic<Ready, OFFSET> {
        unsafe { self.data.write(mask) };
        self.next()
    }
}

impl<const OFFSET: u8> Pic<Ready, OFFSET> {
    pub fn eoi(&mut self) {
        unsafe { self.command.write(words::EOI) };
    }

    #[must_use]
    pub fn mask(&self) -> u8 {
        unsafe { self.data.read() }
    }

    /// A set bit masks the matching line.
    pub fn set_mask(&mut self, mask: u8) {
        unsafe { self.data.write(mask) };
    }
}

/// Runs the ICW1-ICW4 sequence on both controllers, interleaved, then restores `masks`.
fn remap<const A: u8, const B: u8>(
    master: Pic<Uninit, A>,
    slave: Pic<Uninit, B>,
    masks: (u8, u8),
) -> (Pic<Ready, A>, Pic<Ready, B>) {
    let wait = || unsafe { io_wait() };

    let master = master.write_icw1(ICW1::cascaded());
    wait();
    let slave = slave.write_icw1(ICW1::cascaded());
    wait();

    let master = master.write_icw2();
    wait();
    let slave = slave.write_icw2();
    wait();

    let master = master.write_icw3(ICW3::PRIMARY);
    wait();
    let slave = slave.write_icw3(ICW3::SECONDARY);
    wait();

    let icw4 = ICW4::zero().set_x86mode(1);
    let master = master.write_icw4(icw4);
    wait();
    let slave = slave.write_icw4(icw4);
    wait();

    let (m1, m2) = masks;
    (master.write_mask(m1), slave.write_mask(m2))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vector_ranges() {
        let master = Pic::<Uninit, 0x20>::master();
        assert!(master.handles_interrupt(0x20));
        assert!(master.handles_interrupt(0x27));
        assert!(!master.handles_interrupt(0x28));
        assert!(!master.handles_interrupt(0x1F));

        let high = Pic::<Uninit, 0xF8>::slave();
        assert!(high.handles_interrupt(0xFF));
        assert!(!high.handles_interrupt(0x07));
    }
}

//! Typed access to the I/O port space.
//!
//! The access marker decides at compile time whether a port can be read, written or both.

use core::{arch::asm, marker::PhantomData};

pub struct ReadWrite;
pub struct ReadOnly;
pub struct WriteOnly;

pub trait PortAccess {}
impl PortAccess for ReadWrite {}
impl PortAccess for ReadOnly {}
impl PortAccess for WriteOnly {}

/// Width of a single transfer.
pub trait PortValue: Sized {
    /// # Safety
    ///
    /// Reading some ports has side effects on the device behind them.
    unsafe fn read_from(port: u16) -> Self;

    /// # Safety
    ///
    /// Writing to the wrong port can reprogram unrelated hardware.
    unsafe fn write_to(port: u16, value: Self);
}

macro_rules! port_value {
    ($T:ty, $reg:tt) => {
        impl PortValue for $T {
            #[inline]
            unsafe fn read_from(port: u16) -> Self {
                let value: $T;
                asm!(
                    concat!("in ", $reg, ", dx"),
                    out($reg) value,
                    in("dx") port,
                    options(nomem, nostack, preserves_flags)
                );
                value
            }

            #[inline]
            unsafe fn write_to(port: u16, value: Self) {
                asm!(
                    concat!("out dx, ", $reg),
                    in("dx") port,
                    in($reg) value,
                    options(nomem, nostack, preserves_flags)
                );
            }
        }
    };
}

port_value!(u8, "al");
port_value!(u16, "ax");
port_value!(u32, "eax");

pub struct Port<V, A> {
    number: u16,
    _p: PhantomData<(V, A)>,
}

pub type RWPort<V> = Port<V, ReadWrite>;
pub type RPort<V> = Port<V, ReadOnly>;
pub type WPort<V> = Port<V, WriteOnly>;

impl<V, A: PortAccess> Port<V, A> {
    #[must_use]
    pub const fn new(number: u16) -> Self {
        Self {
            number,
            _p: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn number(&self) -> u16 {
        self.number
    }
}

impl<V: PortValue> Port<V, ReadWrite> {
    /// # Safety
    ///
    /// See [`PortValue::read_from`].
    #[inline]
    pub unsafe fn read(&self) -> V {
        V::read_from(self.number)
    }

    /// # Safety
    ///
    /// See [`PortValue::write_to`].
    #[inline]
    pub unsafe fn write(&mut self, value: V) {
        V::write_to(self.number, value);
    }
}

impl<V: PortValue> Port<V, ReadOnly> {
    /// # Safety
    ///
    /// See [`PortValue::read_from`].
    #[inline]
    pub unsafe fn read(&self) -> V {
        V::read_from(self.number)
    }
}

impl<V: PortValue> Port<V, WriteOnly> {
    /// # Safety
    ///
    /// See [`PortValue::write_to`].
    #[inline]
    pub unsafe fn write(&mut self, value: V) {
        V::write_to(self.number, value);
    }
}

/// Gives slow devices (the 8259 in particular) time to settle by writing to the unused POST
/// diagnostic port.
///
/// # Safety
///
/// Port `0x80` must not be claimed by a device.
#[inline]
pub unsafe fn io_wait() {
    WPort::<u8>::new(0x80).write(0);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn port_keeps_its_number() {
        let port = RWPort::<u8>::new(0x3F8);
        assert_eq!(port.number(), 0x3F8);
        assert_eq!(WPort::<u16>::new(0x20).number(), 0x20);
    }

    #[test]
    fn every_width_is_a_port_value() {
        fn width<V: PortValue>(_: Port<V, ReadWrite>) -> usize {
            core::mem::size_of::<V>()
        }
        assert_eq!(width(RWPort::<u8>::new(0x60)), 1);
        assert_eq!(width(RWPort::<u16>::new(0x1F0)), 2);
        assert_eq!(width(RWPort::<u32>::new(0xCF8)), 4);
    }
}

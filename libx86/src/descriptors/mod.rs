//! Bit-exact encoders for the 8-byte protected mode descriptors.
//!
//! Every descriptor is packed field by field from its logical parts and can be read back with
//! the matching accessors, the in-memory layout is only relied upon when handing a table to
//! the processor.

mod interrupt;
mod segment;

pub use interrupt::{GateFlags, GateType, InterruptGate};
pub use segment::{Access, LimitFlags, SegmentDescriptor, SegmentFields, SegmentFlags};

use crate::Error;

/// Ring of a descriptor or a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Privilege {
    Ring0 = 0,
    Ring1 = 1,
    Ring2 = 2,
    Ring3 = 3,
}

impl Privilege {
    /// Reads a ring from the two low bits of `bits`.
    #[inline]
    #[must_use]
    pub const fn from_low_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Ring0,
            1 => Self::Ring1,
            2 => Self::Ring2,
            _ => Self::Ring3,
        }
    }
}

impl TryFrom<u8> for Privilege {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 3 {
            return Err(Error::InvalidPrivilege(value));
        }
        Ok(Self::from_low_bits(value))
    }
}

impl From<Privilege> for u8 {
    fn from(val: Privilege) -> Self {
        val as u8
    }
}

impl From<Privilege> for u16 {
    fn from(val: Privilege) -> Self {
        u16::from(val as u8)
    }
}

/// Operand of `lgdt`/`lidt`: a 16-bit limit followed by a 32-bit linear base, no padding.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, packed)]
pub struct DescriptorTablePointer {
    /// Size of the table in bytes minus one.
    pub limit: u16,
    pub base: u32,
}

impl DescriptorTablePointer {
    pub const SIZE: usize = 6;

    #[must_use]
    pub fn for_table<T>(entries: &[T]) -> Self {
        Self {
            limit: (core::mem::size_of_val(entries) - 1) as u16,
            base: entries.as_ptr() as usize as u32,
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0; Self::SIZE];
        bytes[..2].copy_from_slice(&{ self.limit }.to_le_bytes());
        bytes[2..].copy_from_slice(&{ self.base }.to_le_bytes());
        bytes
    }
}

impl core::fmt::Debug for DescriptorTablePointer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DescriptorTablePointer")
            .field("limit", &format_args!("{:#x}", { self.limit }))
            .field("base", &format_args!("{:#010x}", { self.base }))
            .finish()
    }
}

const _: () = assert!(core::mem::size_of::<DescriptorTablePointer>() == DescriptorTablePointer::SIZE);

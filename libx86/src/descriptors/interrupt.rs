use bitfield::bitfield;

use crate::{segments::SegmentSelector, Error, Privilege};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GateType {
    Task32 = 0x5,
    Interrupt16 = 0x6,
    Trap16 = 0x7,
    /// Clears IF on entry, used for every vector.
    Interrupt32 = 0xE,
    Trap32 = 0xF,
}

impl GateType {
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x5 => Some(Self::Task32),
            0x6 => Some(Self::Interrupt16),
            0x7 => Some(Self::Trap16),
            0xE => Some(Self::Interrupt32),
            0xF => Some(Self::Trap32),
            _ => None,
        }
    }
}

bitfield! {
    /// Type and attributes byte of a gate.
    ///
    /// ```text
    /// 1000 1110
    /// ^^^^ ^^^^
    /// |||| Gate type: 32-bit interrupt gate
    /// |||Storage segment, zero for gates
    /// |Descriptor Privilege Level
    /// Presence flag
    /// ```
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    pub unsafe struct GateFlags: u8 {
        pub gate_type: 0..4,

        /// always 0 for interrupt and trap gates
        storage: 4..5,

        /// Lowest ring allowed to raise the vector with `int n`.
        pub dpl: 5..7,

        /// Presence flag, a vector whose gate is not present raises #NP and ends in a reset.
        pub present: 7..8,
    }
}

/// One entry of the interrupt descriptor table, indexed by vector.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, packed)]
pub struct InterruptGate {
    offset_low: u16,
    selector: u16,
    reserved: u8,
    flags: GateFlags,
    offset_high: u16,
}

const _: () = assert!(core::mem::size_of::<InterruptGate>() == InterruptGate::SIZE);

impl InterruptGate {
    pub const SIZE: usize = 8;

    /// A gate that is not present, every field zero.
    pub const MISSING: Self = Self {
        offset_low: 0,
        selector: 0,
        reserved: 0,
        flags: GateFlags::zero(),
        offset_high: 0,
    };

    /// Packs a 32-bit interrupt gate.
    ///
    /// A gate that is not present keeps its handler and selector but its whole flags byte is
    /// zero.
    ///
    /// # Errors
    ///
    /// [`Error::NullHandler`] for a present gate pointing at address 0.
    pub const fn encode(
        handler: u32,
        selector: SegmentSelector,
        privilege: Privilege,
        present: bool,
    ) -> Result<Self, Error> {
        let flags = if present {
            if handler == 0 {
                return Err(Error::NullHandler);
            }
            GateFlags::zero()
                .set_gate_type(GateType::Interrupt32 as u8)
                .set_dpl(privilege as u8)
                .set_present(1)
        } else {
            GateFlags::zero()
        };

        Ok(Self {
            offset_low: handler as u16,
            selector: selector.as_u16(),
            reserved: 0,
            flags,
            offset_high: (handler >> 16) as u16,
        })
    }

    /// Same gate, callable from `privilege` and above.
    #[must_use]
    pub const fn with_privilege(self, privilege: Privilege) -> Self {
        let mut gate = self;
        let flags = gate.flags;
        if flags.get_present() == 1 {
            gate.flags = flags.set_dpl(privilege as u8);
        }
        gate
    }

    #[inline]
    #[must_use]
    pub const fn handler(&self) -> u32 {
        self.offset_low as u32 | (self.offset_high as u32) << 16
    }

    #[inline]
    #[must_use]
    pub const fn selector(&self) -> SegmentSelector {
        SegmentSelector::from_u16(self.selector)
    }

    #[inline]
    #[must_use]
    pub const fn flags(&self) -> GateFlags {
        self.flags
    }

    #[inline]
    #[must_use]
    pub const fn is_present(&self) -> bool {
        let flags = self.flags;
        flags.get_present() == 1
    }

    #[inline]
    #[must_use]
    pub const fn privilege(&self) -> Privilege {
        let flags = self.flags;
        Privilege::from_low_bits(flags.get_dpl())
    }

    #[inline]
    #[must_use]
    pub const fn gate_type(&self) -> Option<GateType> {
        let flags = self.flags;
        GateType::from_bits(flags.get_gate_type())
    }

    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        let flags = self.flags;
        self.offset_low as u64
            | (self.selector as u64) << 16
            | (self.reserved as u64) << 32
            | (flags.as_u8() as u64) << 40
            | (self.offset_high as u64) << 48
    }

    #[must_use]
    pub const fn from_u64(raw: u64) -> Self {
        Self {
            offset_low: raw as u16,
            selector: (raw >> 16) as u16,
            reserved: (raw >> 32) as u8,
            // SAFETY: every bit of the byte belongs to a field of `GateFlags`
            flags: unsafe { GateFlags::raw((raw >> 40) as u8) },
            offset_high: (raw >> 48) as u16,
        }
    }

    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.as_u64().to_le_bytes()
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self::from_u64(u64::from_le_bytes(bytes))
    }
}

impl core::fmt::Debug for InterruptGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InterruptGate")
            .field("handler", &format_args!("{:#010x}", self.handler()))
            .field("selector", &self.selector())
            .field("flags", &format_args!("{:#010b}", self.flags().as_u8()))
            .finish()
    }
}

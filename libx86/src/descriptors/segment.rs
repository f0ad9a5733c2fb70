use bitfield::bitfield;
use bitflags::bitflags;

use crate::{Error, Privilege};

bitflags! {
    /// Access byte, bits 40..48 of a segment descriptor.
    pub struct Access: u8 {
        /// Set by the processor the first time the segment is loaded.
        const ACCESSED = 1;

        /// Readable for code segments, writable for data segments.
        const READ_WRITE = 1 << 1;

        /// Conforming for code segments, expand-down for data segments.
        const DIRECTION_CONFORMING = 1 << 2;

        /// Code segment when set, data segment otherwise.
        const EXECUTABLE = 1 << 3;

        /// Descriptor type: code/data when set, system segment (TSS, LDT, gates) otherwise.
        const USER_SEGMENT = 1 << 4;

        /// Both bits of the Descriptor Privilege Level.
        const DPL_RING_3 = 3 << 5;

        /// Presence bit, loading a selector that points to a non-present segment faults.
        const PRESENT = 1 << 7;
    }
}

impl Access {
    /// Present ring 0 readable code, `0x9A`.
    pub const KERNEL_CODE: Self = Self::from_bits_truncate(
        Self::PRESENT.bits()
            | Self::USER_SEGMENT.bits()
            | Self::EXECUTABLE.bits()
            | Self::READ_WRITE.bits(),
    );

    /// Present ring 0 writable data, `0x92`.
    pub const KERNEL_DATA: Self = Self::from_bits_truncate(
        Self::PRESENT.bits() | Self::USER_SEGMENT.bits() | Self::READ_WRITE.bits(),
    );

    #[inline]
    #[must_use]
    pub const fn privilege(self) -> Privilege {
        Privilege::from_low_bits(self.bits() >> 5)
    }

    #[inline]
    #[must_use]
    pub const fn with_privilege(self, privilege: Privilege) -> Self {
        Self::from_bits_truncate((self.bits() & !Self::DPL_RING_3.bits()) | ((privilege as u8) << 5))
    }
}

bitflags! {
    /// Size flags, the high nibble of byte 6.
    pub struct SegmentFlags: u8 {
        /// Available To Software (AVL) bit, ignored by the processor.
        const AVAILABLE = 1;

        /// 64-bit code segment, must stay clear in protected mode.
        const LONG_MODE = 1 << 1;

        /// Default operand size (D/B bit): 32-bit when set, 16-bit otherwise.
        const SIZE_32 = 1 << 2;

        /// Granularity (G) bit: the limit counts 4 KiB pages instead of bytes.
        const GRANULARITY = 1 << 3;
    }
}

impl SegmentFlags {
    /// 4 KiB granularity with 32-bit operands, the flat model setting.
    pub const FLAT_32: Self =
        Self::from_bits_truncate(Self::GRANULARITY.bits() | Self::SIZE_32.bits());
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    pub unsafe struct LimitFlags: u8 {
        /// Bits 16..20 of the segment limit.
        pub limit_high: 0..4,

        /// [`SegmentFlags`] bits.
        pub flags: 4..8,
    }
}

/// Logical content of a segment descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentFields {
    pub base: u32,
    pub limit: u32,
    pub access: Access,
    pub flags: SegmentFlags,
}

/// One entry of the segment descriptor table.
///
/// ```text
///  63      56 55  52 51  48 47      40 39      32 31            16 15             0
/// +----------+------+------+----------+----------+----------------+----------------+
/// | base hi  | flags| lim hi|  access  | base mid |    base low    |   limit low    |
/// +----------+------+------+----------+----------+----------------+----------------+
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, packed)]
pub struct SegmentDescriptor {
    limit_low: u16,
    base_low: u16,
    base_middle: u8,
    access: u8,
    limit_flags: LimitFlags,
    base_high: u8,
}

const _: () = assert!(core::mem::size_of::<SegmentDescriptor>() == SegmentDescriptor::SIZE);

impl SegmentDescriptor {
    pub const SIZE: usize = 8;

    /// Largest raw limit, 20 bits.
    pub const MAX_LIMIT: u32 = 0xF_FFFF;

    /// Mandatory first entry of every table.
    pub const NULL: Self = Self {
        limit_low: 0,
        base_low: 0,
        base_middle: 0,
        access: 0,
        limit_flags: LimitFlags::zero(),
        base_high: 0,
    };

    /// Ring 0 code covering the whole 4 GiB address space.
    pub const KERNEL_CODE: Self =
        match Self::encode(0, Self::MAX_LIMIT, Access::KERNEL_CODE, SegmentFlags::FLAT_32) {
            Ok(descriptor) => descriptor,
            Err(_) => panic!("kernel code descriptor"),
        };

    /// Ring 0 data covering the whole 4 GiB address space.
    pub const KERNEL_DATA: Self =
        match Self::encode(0, Self::MAX_LIMIT, Access::KERNEL_DATA, SegmentFlags::FLAT_32) {
            Ok(descriptor) => descriptor,
            Err(_) => panic!("kernel data descriptor"),
        };

    /// Packs a descriptor.
    ///
    /// `limit` is the raw 20-bit field: a flat 4 GiB segment is `0xFFFFF` with
    /// [`SegmentFlags::GRANULARITY`].
    ///
    /// # Errors
    ///
    /// [`Error::LimitOutOfRange`] if `limit` is wider than 20 bits.
    pub const fn encode(
        base: u32,
        limit: u32,
        access: Access,
        flags: SegmentFlags,
    ) -> Result<Self, Error> {
        if limit > Self::MAX_LIMIT {
            return Err(Error::LimitOutOfRange(limit));
        }

        Ok(Self {
            limit_low: limit as u16,
            base_low: base as u16,
            base_middle: (base >> 16) as u8,
            access: access.bits(),
            limit_flags: LimitFlags::zero()
                .set_limit_high((limit >> 16) as u8)
                .set_flags(flags.bits()),
            base_high: (base >> 24) as u8,
        })
    }

    #[must_use]
    pub const fn decode(&self) -> SegmentFields {
        SegmentFields {
            base: self.base(),
            limit: self.limit(),
            access: self.access(),
            flags: self.flags(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base_low as u32 | (self.base_middle as u32) << 16 | (self.base_high as u32) << 24
    }

    /// Raw 20-bit limit, see [`Self::effective_limit`] for the byte range.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> u32 {
        let limit_flags = self.limit_flags;
        self.limit_low as u32 | (limit_flags.get_limit_high() as u32) << 16
    }

    #[inline]
    #[must_use]
    pub const fn access(&self) -> Access {
        Access::from_bits_truncate(self.access)
    }

    #[inline]
    #[must_use]
    pub const fn flags(&self) -> SegmentFlags {
        let limit_flags = self.limit_flags;
        SegmentFlags::from_bits_truncate(limit_flags.get_flags())
    }

    #[inline]
    #[must_use]
    pub const fn privilege(&self) -> Privilege {
        self.access().privilege()
    }

    /// Offset of the last addressable byte, the limit scaled by the granularity.
    #[must_use]
    pub const fn effective_limit(&self) -> u32 {
        if self.flags().contains(SegmentFlags::GRANULARITY) {
            (self.limit() << 12) | 0xFFF
        } else {
            self.limit()
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.access().contains(Access::PRESENT)
    }

    #[inline]
    #[must_use]
    pub const fn is_code(&self) -> bool {
        self.access()
            .contains(Access::from_bits_truncate(Access::USER_SEGMENT.bits() | Access::EXECUTABLE.bits()))
    }

    #[inline]
    #[must_use]
    pub const fn is_data(&self) -> bool {
        let access = self.access();
        access.contains(Access::USER_SEGMENT) && !access.contains(Access::EXECUTABLE)
    }

    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        let limit_flags = self.limit_flags;
        self.limit_low as u64
            | (self.base_low as u64) << 16
            | (self.base_middle as u64) << 32
            | (self.access as u64) << 40
            | (limit_flags.as_u8() as u64) << 48
            | (self.base_high as u64) << 56
    }

    #[must_use]
    pub const fn from_u64(raw: u64) -> Self {
        Self {
            limit_low: raw as u16,
            base_low: (raw >> 16) as u16,
            base_middle: (raw >> 32) as u8,
            access: (raw >> 40) as u8,
            // SAFETY: both nibbles of the byte are fields of `LimitFlags`
            limit_flags: unsafe { LimitFlags::raw((raw >> 48) as u8) },
            base_high: (raw >> 56) as u8,
        }
    }

    /// Little-endian image, as the processor reads it from the table.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.as_u64().to_le_bytes()
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self::from_u64(u64::from_le_bytes(bytes))
    }
}

impl core::fmt::Debug for SegmentDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SegmentDescriptor")
            .field("base", &format_args!("{:#010x}", self.base()))
            .field("limit", &format_args!("{:#07x}", self.limit()))
            .field("access", &self.access())
            .field("flags", &self.flags())
            .finish()
    }
}

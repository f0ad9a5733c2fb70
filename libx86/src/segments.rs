use bitfield::bitfield;

use crate::{descriptors::SegmentDescriptor, Privilege};

bitfield! {
    #[derive(Copy, Clone, PartialEq, Eq)]
    #[repr(transparent)]
    pub unsafe struct SegmentSelector: u16 {
        /// Requested Privilege Level
        pub rpl: 0..2,
        /// Table indicator: 0 for the GDT, 1 for the LDT
        indicator: 2..3,
        pub index: 3..16,
    }
}

impl SegmentSelector {
    /// Index 1 of the flat table, byte offset `0x08`.
    pub const KERNEL_CODE: Self = Self::new(1, Privilege::Ring0);
    /// Index 2 of the flat table, byte offset `0x10`.
    pub const KERNEL_DATA: Self = Self::new(2, Privilege::Ring0);

    #[inline]
    #[must_use]
    pub const fn new(index: u16, rpl: Privilege) -> Self {
        Self::zero().set_index(index).set_rpl(rpl as u16)
    }

    #[inline]
    #[must_use]
    pub const fn from_u16(raw: u16) -> Self {
        // SAFETY: every bit of a selector belongs to a field
        unsafe { Self::raw(raw) }
    }

    /// Byte offset of the referenced descriptor inside its table.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        self.get_index() as usize * SegmentDescriptor::SIZE
    }

    /// Whether the selector indexes the LDT rather than the GDT.
    #[inline]
    #[must_use]
    pub const fn is_local(self) -> bool {
        self.get_indicator() != 0
    }

    #[inline]
    #[must_use]
    pub const fn privilege(self) -> Privilege {
        Privilege::from_low_bits(self.get_rpl() as u8)
    }
}

const _: () = assert!(SegmentSelector::KERNEL_CODE.as_u16() == 0x08);
const _: () = assert!(SegmentSelector::KERNEL_DATA.as_u16() == 0x10);

bitfield! {
    /// Error code pushed by #TS, #NP, #SS and #GP when a selector is at fault.
    #[derive(Copy, Clone, PartialEq, Eq)]
    #[repr(transparent)]
    pub unsafe struct SelectorErrorCode: u32 {
        /// The exception originated outside the processor.
        pub external: 0..1,
        /// 0: GDT, 1: IDT, 2: LDT, 3: IDT
        pub table: 1..3,
        pub index: 3..16,
    }
}

impl SelectorErrorCode {
    #[inline]
    #[must_use]
    pub const fn from_u32(raw: u32) -> Self {
        // SAFETY: reserved bits are kept verbatim, they are only displayed
        unsafe { Self::raw(raw) }
    }
}

/// | Segment Register | Description                                       |
/// |------------------|---------------------------------------------------|
/// | ES               | References optional data-segment descriptor entry |
/// | CS               | References code-segment descriptor entry          |
/// | SS               | References stack segment descriptor entry         |
/// | DS               | References default data-segment descriptor entry  |
/// | FS               | References optional data-segment descriptor entry |
/// | GS               | References optional data-segment descriptor entry |
#[cfg(all(target_arch = "x86", target_os = "none"))]
mod registers {
    use core::arch::asm;

    use super::SegmentSelector;

    #[inline]
    #[must_use]
    pub fn cs() -> SegmentSelector {
        let segment: u16;
        unsafe {
            asm!("mov {0:x}, cs", out(reg) segment, options(nomem, nostack, preserves_flags));
        }
        SegmentSelector::from_u16(segment)
    }

    #[inline]
    #[must_use]
    pub fn ds() -> SegmentSelector {
        let segment: u16;
        unsafe {
            asm!("mov {0:x}, ds", out(reg) segment, options(nomem, nostack, preserves_flags));
        }
        SegmentSelector::from_u16(segment)
    }

    /// Reloads CS with a far return to the next instruction.
    ///
    /// # Safety
    ///
    /// `sel` must reference a present code descriptor of the loaded GDT.
    pub unsafe fn set_cs(sel: SegmentSelector) {
        asm!(
            "push {sel}",
            "lea {tmp}, [2f]",
            "push {tmp}",
            "retf",
            "2:",
            sel = in(reg) u32::from(sel.as_u16()),
            tmp = lateout(reg) _,
            options(preserves_flags)
        );
    }

    /// Loads DS, ES, FS, GS and SS with the same selector.
    ///
    /// # Safety
    ///
    /// `sel` must reference a present writable data descriptor of the loaded GDT.
    pub unsafe fn set_data_segments(sel: SegmentSelector) {
        asm!(
            "mov ds, {0:x}",
            "mov es, {0:x}",
            "mov fs, {0:x}",
            "mov gs, {0:x}",
            "mov ss, {0:x}",
            in(reg) sel.as_u16(),
            options(nostack, preserves_flags)
        );
    }
}

#[cfg(all(target_arch = "x86", target_os = "none"))]
pub use registers::{cs, ds, set_cs, set_data_segments};

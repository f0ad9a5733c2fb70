use crate::{
    descriptors::{DescriptorTablePointer, SegmentDescriptor},
    loader::TableLoader,
    segments::SegmentSelector,
    Error, Privilege,
};

/// Selectors of the segments every kernel context runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selectors {
    pub code_segment: SegmentSelector,
    pub data_segment: SegmentSelector,
}

impl Selectors {
    /// `0x08` and `0x10`, the layout built by [`GlobalDescriptorTable::flat`].
    #[must_use]
    pub const fn kernel() -> Self {
        Self {
            code_segment: SegmentSelector::KERNEL_CODE,
            data_segment: SegmentSelector::KERNEL_DATA,
        }
    }
}

#[derive(Clone, Copy)]
#[repr(C, align(8))]
pub struct GlobalDescriptorTable {
    entries: [SegmentDescriptor; Self::CAPACITY],
    len: u16,
}

impl GlobalDescriptorTable {
    pub const CAPACITY: usize = 8;

    /// A table holding only the mandatory null descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [SegmentDescriptor::NULL; Self::CAPACITY],
            len: 1,
        }
    }

    /// Null, flat ring 0 code and flat ring 0 data, in that order.
    #[must_use]
    pub const fn flat() -> (Self, Selectors) {
        let mut gdt = Self::new();
        let code_segment = gdt.push(SegmentDescriptor::KERNEL_CODE);
        let data_segment = gdt.push(SegmentDescriptor::KERNEL_DATA);
        (
            gdt,
            Selectors {
                code_segment,
                data_segment,
            },
        )
    }

    /// Appends a descriptor and returns its ring 0 selector.
    ///
    /// # Errors
    ///
    /// [`Error::TableFull`] once [`Self::CAPACITY`] entries are in use.
    pub fn add_entry(&mut self, entry: SegmentDescriptor) -> Result<SegmentSelector, Error> {
        if usize::from(self.len) == Self::CAPACITY {
            return Err(Error::TableFull);
        }
        Ok(self.push(entry))
    }

    const fn push(&mut self, entry: SegmentDescriptor) -> SegmentSelector {
        let index = self.len;
        self.entries[index as usize] = entry;
        self.len += 1;
        SegmentSelector::new(index, Privilege::Ring0)
    }

    /// Get a reference to the global descriptor table's entries.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[SegmentDescriptor] {
        &self.entries[..usize::from(self.len)]
    }

    /// The descriptor `selector` points at, `None` for LDT selectors.
    #[must_use]
    pub fn entry(&self, selector: SegmentSelector) -> Option<&SegmentDescriptor> {
        if selector.is_local() {
            return None;
        }
        self.entries().get(usize::from(selector.get_index()))
    }

    #[must_use]
    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer::for_table(self.entries())
    }

    /// Loads the table then reloads CS followed by the data segment registers.
    ///
    /// # Safety
    ///
    /// The table must not move nor be dropped while it is loaded and the selectors must
    /// reference its code and data entries.
    pub unsafe fn load<L: TableLoader + ?Sized>(&self, loader: &mut L, selectors: &Selectors) {
        let pointer = self.pointer();
        trace!("lgdt {:?}", pointer);
        loader.load_gdt(&pointer);
        loader.set_code_segment(selectors.code_segment);
        loader.set_data_segments(selectors.data_segment);
        debug!(
            "gdt loaded: {} entries, cs={:#x} ds={:#x}",
            self.len,
            selectors.code_segment.as_u16(),
            selectors.data_segment.as_u16()
        );
    }

    /// [`Self::load`] for a table that lives forever.
    pub fn load_static<L: TableLoader + ?Sized>(&'static self, loader: &mut L, selectors: &Selectors) {
        // SAFETY: the table is never dropped nor moved
        unsafe { self.load(loader, selectors) }
    }
}

impl Default for GlobalDescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for GlobalDescriptorTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Gdt")
            .field("entries", &self.entries())
            .finish()
    }
}

cfg_i686! {
    use core::arch::asm;

    /// # Safety
    ///
    /// See [`TableLoader::load_gdt`].
    #[inline]
    pub unsafe fn lgdt(pointer: &DescriptorTablePointer) {
        asm!("lgdt [{}]", in(reg) pointer, options(readonly, nostack, preserves_flags));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        descriptors::{Access, SegmentFlags},
        loader::testing::{Load, RecordingLoader},
    };

    #[test]
    fn flat_layout() {
        let (gdt, selectors) = GlobalDescriptorTable::flat();
        assert_eq!(selectors, Selectors::kernel());
        assert_eq!(selectors.code_segment.as_u16(), 0x08);
        assert_eq!(selectors.data_segment.as_u16(), 0x10);

        let raw: std::vec::Vec<u64> = gdt.entries().iter().map(SegmentDescriptor::as_u64).collect();
        assert_eq!(raw, [0, 0x00CF_9A00_0000_FFFF, 0x00CF_9200_0000_FFFF]);
        assert_eq!(gdt.entry(selectors.data_segment), Some(&SegmentDescriptor::KERNEL_DATA));
    }

    #[test]
    fn ldt_selector_has_no_entry() {
        let (gdt, _) = GlobalDescriptorTable::flat();
        let local_code = SegmentSelector::from_u16(SegmentSelector::KERNEL_CODE.as_u16() | 0b100);
        assert!(local_code.is_local());
        assert_eq!(local_code.get_index(), 1);
        assert_eq!(gdt.entry(local_code), None);
        assert_eq!(gdt.entry(SegmentSelector::KERNEL_CODE), Some(&SegmentDescriptor::KERNEL_CODE));
    }

    #[test]
    fn pointer_covers_used_entries() {
        let (gdt, _) = GlobalDescriptorTable::flat();
        let pointer = gdt.pointer();
        assert_eq!({ pointer.limit }, 23);
        assert_eq!({ pointer.base }, gdt.entries().as_ptr() as usize as u32);
    }

    #[test]
    fn load_order() {
        static GDT: (GlobalDescriptorTable, Selectors) = GlobalDescriptorTable::flat();
        let mut loader = RecordingLoader::default();
        GDT.0.load_static(&mut loader, &GDT.1);
        assert_eq!(
            loader.loads,
            [
                Load::Gdt(GDT.0.pointer()),
                Load::Code(SegmentSelector::KERNEL_CODE),
                Load::Data(SegmentSelector::KERNEL_DATA),
            ]
        );
    }

    #[test]
    fn table_full() {
        let user_data = SegmentDescriptor::encode(
            0,
            SegmentDescriptor::MAX_LIMIT,
            Access::KERNEL_DATA.with_privilege(Privilege::Ring3),
            SegmentFlags::FLAT_32,
        )
        .unwrap();

        let (mut gdt, _) = GlobalDescriptorTable::flat();
        for index in 3..GlobalDescriptorTable::CAPACITY as u16 {
            let sel = gdt.add_entry(user_data).unwrap();
            assert_eq!(sel.get_index(), index);
        }
        assert_eq!(gdt.add_entry(user_data), Err(Error::TableFull));
        assert_eq!(gdt.entries().len(), GlobalDescriptorTable::CAPACITY);
    }
}

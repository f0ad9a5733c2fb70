//! The boundary between building descriptor tables and handing them to the processor.
//!
//! Tables are plain data and can be assembled anywhere, the [`TableLoader`] is the only piece
//! that executes `lgdt`, `lidt` and segment register loads.

use crate::{descriptors::DescriptorTablePointer, segments::SegmentSelector};

pub trait TableLoader {
    /// # Safety
    ///
    /// `pointer` must describe a table that stays valid and unmoved while it is loaded.
    unsafe fn load_gdt(&mut self, pointer: &DescriptorTablePointer);

    /// # Safety
    ///
    /// `selector` must reference a code descriptor of the loaded GDT.
    unsafe fn set_code_segment(&mut self, selector: SegmentSelector);

    /// Loads DS, ES, FS, GS and SS.
    ///
    /// # Safety
    ///
    /// `selector` must reference a writable data descriptor of the loaded GDT.
    unsafe fn set_data_segments(&mut self, selector: SegmentSelector);

    /// # Safety
    ///
    /// `pointer` must describe a table that stays valid and unmoved while it is loaded, and
    /// every gate must point at a handler.
    unsafe fn load_idt(&mut self, pointer: &DescriptorTablePointer);
}

cfg_i686! {
    /// Loads tables into the running processor.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Cpu;

    impl TableLoader for Cpu {
        unsafe fn load_gdt(&mut self, pointer: &DescriptorTablePointer) {
            crate::gdt::lgdt(pointer);
        }

        unsafe fn set_code_segment(&mut self, selector: SegmentSelector) {
            crate::segments::set_cs(selector);
        }

        unsafe fn set_data_segments(&mut self, selector: SegmentSelector) {
            crate::segments::set_data_segments(selector);
        }

        unsafe fn load_idt(&mut self, pointer: &DescriptorTablePointer) {
            crate::idt::lidt(pointer);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::vec::Vec;

    use super::TableLoader;
    use crate::{descriptors::DescriptorTablePointer, segments::SegmentSelector};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Load {
        Gdt(DescriptorTablePointer),
        Code(SegmentSelector),
        Data(SegmentSelector),
        Idt(DescriptorTablePointer),
    }

    /// Records every request instead of touching the processor.
    #[derive(Debug, Default)]
    pub struct RecordingLoader {
        pub loads: Vec<Load>,
    }

    impl TableLoader for RecordingLoader {
        unsafe fn load_gdt(&mut self, pointer: &DescriptorTablePointer) {
            self.loads.push(Load::Gdt(*pointer));
        }

        unsafe fn set_code_segment(&mut self, selector: SegmentSelector) {
            self.loads.push(Load::Code(selector));
        }

        unsafe fn set_data_segments(&mut self, selector: SegmentSelector) {
            self.loads.push(Load::Data(selector));
        }

        unsafe fn load_idt(&mut self, pointer: &DescriptorTablePointer) {
            self.loads.push(Load::Idt(*pointer));
        }
    }
}

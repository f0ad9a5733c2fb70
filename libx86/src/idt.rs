use crate::{
    descriptors::{DescriptorTablePointer, InterruptGate},
    interrupts::Vector,
    loader::TableLoader,
    segments::SegmentSelector,
    Error, Privilege,
};

#[derive(Clone)]
#[repr(C, align(8))]
pub struct InterruptDescriptorTable {
    entries: [InterruptGate; Vector::COUNT],
}

impl InterruptDescriptorTable {
    /// A table where no gate is present.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [InterruptGate::MISSING; Vector::COUNT],
        }
    }

    /// Points every vector at the address returned by `stub`, present and ring 0.
    ///
    /// # Errors
    ///
    /// [`Error::NullHandler`] if a stub address is 0, the table is left untouched.
    pub fn init<F>(&mut self, selector: SegmentSelector, mut stub: F) -> Result<(), Error>
    where
        F: FnMut(Vector) -> u32,
    {
        let mut entries = [InterruptGate::MISSING; Vector::COUNT];
        for (vector, gate) in Vector::all().zip(entries.iter_mut()) {
            *gate = InterruptGate::encode(stub(vector), selector, Privilege::Ring0, true)?;
        }
        self.entries = entries;
        trace!("idt initialised with selector {:#x}", selector.as_u16());
        Ok(())
    }

    /// Changes the ring allowed to raise `vector` with `int n`, every other entry is kept.
    pub fn set_privilege(&mut self, vector: Vector, privilege: Privilege) {
        let gate = &mut self.entries[vector.as_usize()];
        *gate = gate.with_privilege(privilege);
    }

    #[must_use]
    pub fn gate(&self, vector: Vector) -> InterruptGate {
        self.entries[vector.as_usize()]
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[InterruptGate] {
        &self.entries
    }

    /// First vector whose gate would fault when raised.
    #[must_use]
    pub fn missing_gate(&self) -> Option<Vector> {
        Vector::all()
            .zip(self.entries.iter())
            .find(|(_, gate)| !gate.is_present() || gate.handler() == 0)
            .map(|(vector, _)| vector)
    }

    /// # Errors
    ///
    /// [`Error::MissingGate`] naming the first gate that is not present.
    pub fn validate(&self) -> Result<(), Error> {
        match self.missing_gate() {
            Some(vector) => Err(Error::MissingGate(vector.as_u8())),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer::for_table(&self.entries)
    }

    /// Hands the table to the processor once every gate is present.
    ///
    /// # Errors
    ///
    /// [`Error::MissingGate`], nothing is loaded.
    ///
    /// # Safety
    ///
    /// The table must not move nor be dropped while it is loaded.
    pub unsafe fn load<L: TableLoader + ?Sized>(&self, loader: &mut L) -> Result<(), Error> {
        self.validate()?;
        let pointer = self.pointer();
        trace!("lidt {:?}", pointer);
        loader.load_idt(&pointer);
        debug!("idt loaded");
        Ok(())
    }
}

impl Default for InterruptDescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for InterruptDescriptorTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Idt")
            .field("present", &self.entries.iter().filter(|g| g.is_present()).count())
            .field("pointer", &self.pointer())
            .finish()
    }
}

cfg_i686! {
    use core::arch::asm;

    /// # Safety
    ///
    /// See [`TableLoader::load_idt`].
    #[inline]
    pub unsafe fn lidt(pointer: &DescriptorTablePointer) {
        asm!("lidt [{}]", in(reg) pointer, options(readonly, nostack, preserves_flags));
    }
}

#[cfg(test)]
mod test {
    use std::boxed::Box;

    use super::*;
    use crate::{
        descriptors::GateType,
        loader::testing::{Load, RecordingLoader},
    };

    const STUB_BASE: u32 = 0x0010_4000;

    fn stub(vector: Vector) -> u32 {
        STUB_BASE + u32::from(vector.as_u8()) * 16
    }

    fn initialised() -> Box<InterruptDescriptorTable> {
        let mut idt = Box::new(InterruptDescriptorTable::new());
        idt.init(SegmentSelector::KERNEL_CODE, stub).unwrap();
        idt
    }

    #[test]
    fn every_gate_present_after_init() {
        let idt = initialised();
        for vector in Vector::all() {
            let gate = idt.gate(vector);
            assert!(gate.is_present(), "{:?}", vector);
            assert_eq!(gate.handler(), stub(vector));
            assert_eq!(gate.selector(), SegmentSelector::KERNEL_CODE);
            assert_eq!(gate.privilege(), Privilege::Ring0);
            assert_eq!(gate.gate_type(), Some(GateType::Interrupt32));
        }
        assert_eq!(idt.missing_gate(), None);
    }

    #[test]
    fn failed_init_keeps_the_table() {
        let mut idt = initialised();
        let err = idt.init(SegmentSelector::KERNEL_CODE, |v| {
            if v.as_u8() == 40 {
                0
            } else {
                stub(v)
            }
        });
        assert_eq!(err, Err(Error::NullHandler));
        assert_eq!(idt.gate(Vector::from_u8(40)).handler(), stub(Vector::from_u8(40)));
    }

    #[test]
    fn pointer_spans_256_gates() {
        let idt = initialised();
        assert_eq!({ idt.pointer().limit }, 2047);
    }

    #[test]
    fn load_refuses_a_gap() {
        let mut idt = Box::new(InterruptDescriptorTable::new());
        for (vector, gate) in Vector::all().zip(idt.entries.iter_mut()) {
            if vector != Vector::DOUBLE_FAULT {
                *gate = InterruptGate::encode(stub(vector), SegmentSelector::KERNEL_CODE, Privilege::Ring0, true)
                    .unwrap();
            }
        }

        let mut loader = RecordingLoader::default();
        let res = unsafe { idt.load(&mut loader) };
        assert_eq!(res, Err(Error::MissingGate(8)));
        assert!(loader.loads.is_empty());
    }

    #[test]
    fn loaded_table_keeps_every_exception_gate() {
        let mut idt = initialised();
        let mut loader = RecordingLoader::default();
        unsafe { idt.load(&mut loader) }.unwrap();

        for vector in Vector::all() {
            idt.set_privilege(vector, Privilege::Ring3);
        }
        assert!(idt.gate(Vector::PAGE_FAULT).is_present());
        assert_eq!(idt.gate(Vector::PAGE_FAULT).handler(), stub(Vector::PAGE_FAULT));
        assert_eq!(idt.missing_gate(), None);
    }

    #[test]
    fn empty_table_is_rejected() {
        let idt = Box::new(InterruptDescriptorTable::new());
        assert_eq!(idt.validate(), Err(Error::MissingGate(0)));
    }

    #[test]
    fn load_hands_the_pointer_over() {
        let idt = initialised();
        let mut loader = RecordingLoader::default();
        unsafe { idt.load(&mut loader) }.unwrap();
        assert_eq!(loader.loads, [Load::Idt(idt.pointer())]);
    }

    #[test]
    fn set_privilege_touches_one_entry() {
        let mut idt = initialised();
        let before: std::vec::Vec<InterruptGate> = idt.entries().to_vec();

        idt.set_privilege(Vector::from_u8(0x80), Privilege::Ring3);

        for (vector, gate) in Vector::all().zip(idt.entries()) {
            if vector.as_u8() == 0x80 {
                assert_eq!(gate.privilege(), Privilege::Ring3);
                assert_eq!(gate.handler(), before[0x80].handler());
                assert_eq!(gate.flags().as_u8(), 0xEE);
            } else {
                assert_eq!(*gate, before[vector.as_usize()]);
            }
        }
    }
}

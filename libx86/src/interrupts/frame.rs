use super::Vector;
use crate::{Error, Privilege};

/// General purpose registers in `pushad` order, lowest address first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct GeneralRegisters {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// Value of ESP before `pushad`, discarded by `popad`.
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
}

/// State pushed by the processor when it enters a gate.
///
/// `esp` and `ss` are only pushed when the interrupt crosses a privilege boundary, see
/// [`Self::privilege_changed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct InterruptFrame {
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub esp: u32,
    pub ss: u32,
}

impl InterruptFrame {
    /// Ring the interrupted code was running in.
    #[inline]
    #[must_use]
    pub const fn privilege(&self) -> Privilege {
        Privilege::from_low_bits(self.cs as u8)
    }

    #[inline]
    #[must_use]
    pub const fn privilege_changed(&self) -> bool {
        !matches!(self.privilege(), Privilege::Ring0)
    }
}

/// Registers of the interrupted context, as handlers see them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub ds: u32,
    pub general: GeneralRegisters,
    pub frame: InterruptFrame,
}

/// One occurrence of an interrupt, consumed by a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptEvent {
    pub vector: Vector,
    /// Only set for vectors where the processor pushes an error code.
    pub error_code: Option<u32>,
    /// Changes are written back to the interrupted context on return.
    pub registers: RegisterSnapshot,
    terminate: bool,
}

impl InterruptEvent {
    #[must_use]
    pub const fn new(vector: Vector, error_code: Option<u32>, registers: RegisterSnapshot) -> Self {
        Self {
            vector,
            error_code,
            registers,
            terminate: false,
        }
    }

    /// Asks the trap glue not to resume the interrupted context.
    pub fn request_termination(&mut self) {
        self.terminate = true;
    }

    #[inline]
    #[must_use]
    pub const fn termination_requested(&self) -> bool {
        self.terminate
    }
}

/// Stack image built by the trap-entry stubs, lowest address first.
///
/// ```text
/// esp -> ds
///        edi esi ebp esp ebx edx ecx eax   pushad
///        vector
///        error code                        dummy 0 unless pushed by the processor
///        eip cs eflags [esp ss]            pushed by the processor
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TrapFrame {
    pub ds: u32,
    pub general: GeneralRegisters,
    pub vector: u32,
    pub error_code: u32,
    pub frame: InterruptFrame,
}

const _: () = assert!(core::mem::size_of::<TrapFrame>() == 64);

impl TrapFrame {
    /// # Errors
    ///
    /// [`Error::VectorOutOfRange`] if the stub pushed a vector past 255.
    pub fn event(&self) -> Result<InterruptEvent, Error> {
        let vector = Vector::new(self.vector as usize)?;
        let error_code = vector.pushes_error_code().then_some(self.error_code);
        Ok(InterruptEvent::new(vector, error_code, self.snapshot()))
    }

    #[must_use]
    pub const fn snapshot(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            ds: self.ds,
            general: self.general,
            frame: self.frame,
        }
    }

    /// Writes the registers a handler may have changed back into the stack image.
    ///
    /// The outer `esp` and `ss` slots are left alone unless the interrupt crossed a privilege
    /// boundary, otherwise they belong to the interrupted stack.
    pub fn restore(&mut self, registers: &RegisterSnapshot) {
        let outer = self.frame.privilege_changed();

        self.ds = registers.ds;
        self.general = registers.general;
        self.frame.eip = registers.frame.eip;
        self.frame.cs = registers.frame.cs;
        self.frame.eflags = registers.frame.eflags;
        if outer {
            self.frame.esp = registers.frame.esp;
            self.frame.ss = registers.frame.ss;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn frame(vector: u32, error_code: u32) -> TrapFrame {
        TrapFrame {
            ds: 0x10,
            general: GeneralRegisters {
                eax: 0xAAAA,
                ebx: 0xBBBB,
                ..GeneralRegisters::default()
            },
            vector,
            error_code,
            frame: InterruptFrame {
                eip: 0x0010_1000,
                cs: 0x08,
                eflags: 0x202,
                esp: 0xDEAD,
                ss: 0xBEEF,
            },
        }
    }

    #[test]
    fn layout() {
        let trap = frame(14, 2);
        let base = core::ptr::addr_of!(trap) as usize;
        assert_eq!(core::ptr::addr_of!(trap.general.edi) as usize - base, 4);
        assert_eq!(core::ptr::addr_of!(trap.general.eax) as usize - base, 32);
        assert_eq!(core::ptr::addr_of!(trap.vector) as usize - base, 36);
        assert_eq!(core::ptr::addr_of!(trap.error_code) as usize - base, 40);
        assert_eq!(core::ptr::addr_of!(trap.frame.eip) as usize - base, 44);
        assert_eq!(core::ptr::addr_of!(trap.frame.ss) as usize - base, 60);
    }

    #[test]
    fn error_code_only_for_pushing_vectors() {
        let fault = frame(14, 2).event().unwrap();
        assert_eq!(fault.vector, Vector::PAGE_FAULT);
        assert_eq!(fault.error_code, Some(2));

        let breakpoint = frame(3, 0).event().unwrap();
        assert_eq!(breakpoint.error_code, None);
        assert_eq!(breakpoint.registers, frame(3, 0).snapshot());
        assert!(!breakpoint.termination_requested());
    }

    #[test]
    fn malformed_vector() {
        assert_eq!(frame(256, 0).event(), Err(Error::VectorOutOfRange(256)));
    }

    #[test]
    fn restore_writes_back_changes() {
        let mut trap = frame(3, 0);
        let mut registers = trap.snapshot();
        registers.frame.eip += 1;
        registers.general.eax = 0;
        registers.frame.esp = 0;

        trap.restore(&registers);
        assert_eq!(trap.frame.eip, 0x0010_1001);
        assert_eq!(trap.general.eax, 0);
        assert_eq!(trap.frame.esp, 0xDEAD, "same ring, no outer stack slot");
    }

    #[test]
    fn restore_outer_stack_from_user_mode() {
        let mut trap = frame(0x80, 0);
        trap.frame.cs = 0x1B;
        let mut registers = trap.snapshot();
        registers.frame.esp = 0x00BF_F000;

        trap.restore(&registers);
        assert!(trap.frame.privilege_changed());
        assert_eq!(trap.frame.esp, 0x00BF_F000);
    }
}

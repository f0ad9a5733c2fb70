use crate::Error;

/// Index into the interrupt table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Vector(u8);

macro_rules! exceptions {
    ($($name:ident = $value:literal, $label:literal;)*) => {
        impl Vector {
            $(
                #[doc = $label]
                pub const $name: Self = Self($value);
            )*

            /// Mnemonic of the reserved processor exceptions, `None` past 31.
            #[must_use]
            pub const fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some($label),)*
                    _ => None,
                }
            }
        }
    };
}

exceptions! {
    DIVIDE_ERROR = 0, "#DE divide error";
    DEBUG = 1, "#DB debug";
    NON_MASKABLE = 2, "NMI";
    BREAKPOINT = 3, "#BP breakpoint";
    OVERFLOW = 4, "#OF overflow";
    BOUND_RANGE = 5, "#BR bound range exceeded";
    INVALID_OPCODE = 6, "#UD invalid opcode";
    DEVICE_NOT_AVAILABLE = 7, "#NM device not available";
    DOUBLE_FAULT = 8, "#DF double fault";
    COPROCESSOR_SEGMENT_OVERRUN = 9, "coprocessor segment overrun";
    INVALID_TSS = 10, "#TS invalid TSS";
    SEGMENT_NOT_PRESENT = 11, "#NP segment not present";
    STACK_SEGMENT = 12, "#SS stack segment fault";
    GENERAL_PROTECTION = 13, "#GP general protection";
    PAGE_FAULT = 14, "#PF page fault";
    X87_FLOATING_POINT = 16, "#MF x87 floating point";
    ALIGNMENT_CHECK = 17, "#AC alignment check";
    MACHINE_CHECK = 18, "#MC machine check";
    SIMD_FLOATING_POINT = 19, "#XM SIMD floating point";
    VIRTUALIZATION = 20, "#VE virtualization";
    CONTROL_PROTECTION = 21, "#CP control protection";
    HYPERVISOR_INJECTION = 28, "#HV hypervisor injection";
    VMM_COMMUNICATION = 29, "#VC VMM communication";
    SECURITY = 30, "#SX security";
}

impl Vector {
    /// Number of gates in the table.
    pub const COUNT: usize = 256;

    /// First vector past the reserved exceptions, where the remapped PIC lines start.
    pub const IRQ_BASE: u8 = 32;

    /// # Errors
    ///
    /// [`Error::VectorOutOfRange`] past 255.
    pub const fn new(vector: usize) -> Result<Self, Error> {
        if vector >= Self::COUNT {
            return Err(Error::VectorOutOfRange(vector));
        }
        Ok(Self(vector as u8))
    }

    #[inline]
    #[must_use]
    pub const fn from_u8(vector: u8) -> Self {
        Self(vector)
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Vector of a remapped hardware line, `None` past line 15.
    #[must_use]
    pub const fn irq(line: u8) -> Option<Self> {
        if line < 16 {
            Some(Self(Self::IRQ_BASE + line))
        } else {
            None
        }
    }

    /// Vectors 0 to 31 are reserved for processor exceptions.
    #[inline]
    #[must_use]
    pub const fn is_exception(self) -> bool {
        self.0 < Self::IRQ_BASE
    }

    /// Whether the processor pushes an error code before entering the handler.
    ///
    /// The kernel's trap stubs hard-code the same list and assert it against this one.
    #[must_use]
    pub const fn pushes_error_code(self) -> bool {
        matches!(self.0, 8 | 10..=14 | 17 | 21 | 29 | 30)
    }

    /// Every vector in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=u8::MAX).map(Self)
    }
}

impl From<u8> for Vector {
    fn from(vector: u8) -> Self {
        Self(vector)
    }
}

impl From<Vector> for u8 {
    fn from(vector: Vector) -> Self {
        vector.0
    }
}

impl TryFrom<usize> for Vector {
    type Error = Error;

    fn try_from(vector: usize) -> Result<Self, Self::Error> {
        Self::new(vector)
    }
}

impl core::fmt::Debug for Vector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Vector({}, {})", self.0, name),
            None => write!(f, "Vector({})", self.0),
        }
    }
}

use bitfield::bitfield;

bitfield! {
    /// # Initialization Control Word 1 (ICW1), written to the command port
    ///
    /// Bit Number | Value | Description
    /// -----------|-------|------------------------------------------------------
    /// 0          | IC4   | ICW4 follows
    /// 1          | SNGL  | 1: single controller; 0: cascaded, ICW3 follows
    /// 2          | ADI   | Call address interval, ignored in x86 mode
    /// 3          | LTIM  | 1: level triggered; 0: edge triggered
    /// 4          | INIT  | Starts the initialization sequence
    /// 5-7        | 0     | Vector address on MCS-80/85, zero on x86
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    pub unsafe struct ICW1: u8 {
        pub ic4: 0..1,
        pub sngl: 1..2,
        pub adi: 2..3,
        pub ltim: 3..4,
        pub init: 4..5,
    }
}

impl ICW1 {
    /// Cascaded, edge triggered, ICW4 expected.
    #[must_use]
    pub const fn cascaded() -> Self {
        Self::zero().set_ic4(1).set_init(1)
    }
}

/// # Initialization Control Word 3 (ICW3), written to the data port
///
/// On the primary controller each bit marks an IRQ line with a secondary attached, on the
/// secondary bits 0-2 hold the primary line it is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ICW3(pub u8);

impl ICW3 {
    /// Secondary attached on IRQ 2.
    pub const PRIMARY: Self = Self(1 << 2);
    /// Cascade identity 2.
    pub const SECONDARY: Self = Self(2);
}

bitfield! {
    /// # Initialization Control Word 4 (ICW4), written to the data port
    ///
    /// Bit Number | Value | Description
    /// -----------|-------|------------------------------------------------------
    /// 0          | uPM   | 1: 80x86 mode; 0: MCS-80/85 mode
    /// 1          | AEOI  | Automatic end of interrupt
    /// 2          | M/S   | Buffered master when set, only meaningful with BUF
    /// 3          | BUF   | Buffered mode
    /// 4          | SFNM  | Special fully nested mode
    /// 5-7        | 0     | Reserved
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    pub unsafe struct ICW4: u8 {
        pub x86mode: 0..1,
        pub aeoi: 1..2,
        pub ms: 2..3,
        pub buf: 3..4,
        pub sfnm: 4..5,
    }
}

/// Non specific end of interrupt (OCW2), written to the command port.
pub const EOI: u8 = 0x20;

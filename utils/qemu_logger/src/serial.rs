use bitflags::bitflags;
use libx86::port::RWPort;

bitflags! {
    /// Line Status Register (base + 5)
    struct LineStatus: u8 {
        const DATA_READY = 1;
        const OVERRUN_ERROR = 1 << 1;
        const PARITY_ERROR = 1 << 2;
        const FRAMING_ERROR = 1 << 3;
        const BREAK_INDICATOR = 1 << 4;
        /// Transmitter holding register empty.
        const OUTPUT_EMPTY = 1 << 5;
        const TRANSMITTER_EMPTY = 1 << 6;
        const FIFO_ERROR = 1 << 7;
    }
}

/// Polled 16550 UART.
pub struct SerialPort {
    data: RWPort<u8>,
    interrupt_enable: RWPort<u8>,
    fifo_control: RWPort<u8>,
    line_control: RWPort<u8>,
    modem_control: RWPort<u8>,
    line_status: RWPort<u8>,
}

impl SerialPort {
    /// First serial port of a PC, the one QEMU forwards with `-serial stdio`.
    pub const COM1: u16 = 0x3F8;

    /// # Safety
    ///
    /// `base` must be the first register of a 16550.
    #[must_use]
    pub const unsafe fn new(base: u16) -> Self {
        Self {
            data: RWPort::new(base),
            interrupt_enable: RWPort::new(base + 1),
            fifo_control: RWPort::new(base + 2),
            line_control: RWPort::new(base + 3),
            modem_control: RWPort::new(base + 4),
            line_status: RWPort::new(base + 5),
        }
    }

    /// 38400 baud, 8N1, FIFO enabled, no interrupts.
    pub fn init(&mut self) {
        unsafe {
            self.interrupt_enable.write(0x00);
            // DLAB on, divisor 3
            self.line_control.write(0x80);
            self.data.write(0x03);
            self.interrupt_enable.write(0x00);
            // DLAB off, 8 bits, no parity, one stop bit
            self.line_control.write(0x03);
            // enable and clear FIFOs, 14 byte threshold
            self.fifo_control.write(0xC7);
            // DTR, RTS, OUT2
            self.modem_control.write(0x0B);
        }
    }

    fn line_status(&self) -> LineStatus {
        LineStatus::from_bits_truncate(unsafe { self.line_status.read() })
    }

    pub fn send(&mut self, byte: u8) {
        while !self.line_status().contains(LineStatus::OUTPUT_EMPTY) {
            core::hint::spin_loop();
        }
        unsafe { self.data.write(byte) };
    }
}

impl core::fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        s.bytes().for_each(|b| self.send(b));
        Ok(())
    }
}

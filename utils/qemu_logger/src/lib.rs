//! `log` backend writing to the first serial port.
#![no_std]

#[cfg(test)]
extern crate std;

use core::fmt::Write;

use kcore::{klazy, sync::SpinMutex};

mod serial;

pub use serial::SerialPort;

klazy! {
    // SAFETY: nothing else drives COM1
    ref static DRIVER: SpinMutex<SerialPort> = unsafe {
        let mut port = SerialPort::new(SerialPort::COM1);
        port.init();
        SpinMutex::new(port)
    };
}

fn _qprint(args: core::fmt::Arguments) {
    // the lock is also taken from interrupt handlers
    libx86::without_interrupts(|| {
        // a failed write has nowhere to be reported
        let _ = DRIVER.lock().write_fmt(args);
    });
}

#[macro_export]
macro_rules! dbg {
    ($arg:expr) => {{
        ::log::debug!("{} = {:#?}", stringify!($arg), $arg);
        $arg
    }};
}

/// Installs the serial logger and enables every level.
///
/// # Errors
///
/// Fails if a logger is already installed.
pub fn init() -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

struct Logger;
static LOGGER: Logger = Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            _qprint(format_args!(
                "{}",
                Line {
                    level: record.level(),
                    target: record.target(),
                    args: record.args(),
                }
            ));
        }
    }

    fn flush(&self) {}
}

/// One output line: `[LEVEL] target: message`.
struct Line<'a> {
    level: log::Level,
    target: &'a str,
    args: &'a core::fmt::Arguments<'a>,
}

impl core::fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "[{}] {}: {}", level_tag(self.level), self.target, self.args)
    }
}

const fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

#[cfg(test)]
mod test {
    use std::string::{String, ToString};

    use super::*;

    fn render(level: log::Level, target: &str, args: core::fmt::Arguments<'_>) -> String {
        Line {
            level,
            target,
            args: &args,
        }
        .to_string()
    }

    #[test]
    fn line_format() {
        assert_eq!(
            render(log::Level::Warn, "kernel::init", format_args!("vector {}", 14)),
            "[WARN ] kernel::init: vector 14\n"
        );
    }

    #[test]
    fn tags_are_aligned() {
        for level in [
            log::Level::Error,
            log::Level::Warn,
            log::Level::Info,
            log::Level::Debug,
            log::Level::Trace,
        ] {
            assert_eq!(level_tag(level).len(), 5);
        }
    }
}

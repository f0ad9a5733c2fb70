use bitflags::bitflags;

use super::{InterruptEvent, Vector};
use crate::segments::SelectorErrorCode;

bitflags! {
    /// Error code of a #PF.
    pub struct PageFaultErrorCode: u32 {
        /// Protection violation when set, non-present page otherwise.
        const PROTECTION_VIOLATION = 1;

        /// The access was a write.
        const CAUSED_BY_WRITE = 1 << 1;

        /// The access happened at CPL 3.
        const USER_MODE = 1 << 2;

        /// A reserved bit was set in a paging structure.
        const MALFORMED_TABLE = 1 << 3;

        /// The access was an instruction fetch.
        const INSTRUCTION_FETCH = 1 << 4;
    }
}

/// Reports an exception that nobody handled through the logger.
pub fn report(event: &InterruptEvent) {
    let frame = &event.registers.frame;
    error!(
        "unhandled exception {:?} at {:#x}:{:#010x} eflags={:#x}",
        event.vector, frame.cs, frame.eip, frame.eflags
    );

    let Some(code) = event.error_code else {
        return;
    };

    match event.vector {
        Vector::PAGE_FAULT => {
            error!(
                "error code: {:?} address: {}",
                PageFaultErrorCode::from_bits_truncate(code),
                FaultAddress
            );
        }
        Vector::INVALID_TSS
        | Vector::SEGMENT_NOT_PRESENT
        | Vector::STACK_SEGMENT
        | Vector::GENERAL_PROTECTION => {
            error!("error code: {:?}", SelectorErrorCode::from_u32(code));
        }
        _ => error!("error code: {:#x}", code),
    }
}

/// Displays CR2 on the target, a placeholder elsewhere.
struct FaultAddress;

impl core::fmt::Display for FaultAddress {
    #[cfg(all(target_arch = "x86", target_os = "none"))]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#010x}", crate::control::cr2())
    }

    #[cfg(not(all(target_arch = "x86", target_os = "none")))]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("<cr2 unavailable>")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn page_fault_code() {
        let code = PageFaultErrorCode::from_bits_truncate(0b0_0111);
        assert!(code.contains(PageFaultErrorCode::PROTECTION_VIOLATION));
        assert!(code.contains(PageFaultErrorCode::CAUSED_BY_WRITE | PageFaultErrorCode::USER_MODE));
        assert!(!code.contains(PageFaultErrorCode::INSTRUCTION_FETCH));
    }
}

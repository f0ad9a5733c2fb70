use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("segment limit {0:#x} does not fit in 20 bits")]
    LimitOutOfRange(u32),

    #[error("privilege level {0} is not a ring (0-3)")]
    InvalidPrivilege(u8),

    #[error("vector {0} is outside the interrupt table (0-255)")]
    VectorOutOfRange(usize),

    #[error("a present interrupt gate needs a non-null handler address")]
    NullHandler,

    #[error("the segment descriptor table is full")]
    TableFull,

    #[error("interrupt gate {0} is not present")]
    MissingGate(u8),
}

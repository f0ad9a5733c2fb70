pub mod lazy;
pub mod mutex;

pub use lazy::Lazy;
pub use mutex::{SpinMutex, SpinMutexGuard};

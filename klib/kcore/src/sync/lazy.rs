use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::ops::Deref;
use core::sync::atomic::{AtomicU8, Ordering};

/// Declares a process-wide value built on first access.
///
/// ```
/// kcore::klazy! {
///     pub ref static TABLE: [u8; 4] = [1, 2, 3, 4];
/// }
/// assert_eq!(TABLE[2], 3);
/// ```
#[macro_export]
macro_rules! klazy {
    ( $(#[$attr:meta])* $v:vis ref static $name:ident: $t:ty = $b:expr;) => {
        $(#[$attr])*
        $v static $name: $crate::sync::lazy::Lazy<$t> = $crate::sync::lazy::Lazy::new(|| $b);
    }
}

const UNINIT: u8 = 0;
const RUNNING: u8 = 1;
const READY: u8 = 2;

/// A value initialised exactly once by `F`, on first dereference.
///
/// Concurrent first accesses spin until the winner has finished. Initialisation must not
/// dereference the same `Lazy`, that would spin forever.
pub struct Lazy<T, F = fn() -> T> {
    state: AtomicU8,
    init: UnsafeCell<Option<F>>,
    data: UnsafeCell<MaybeUninit<T>>,
}

unsafe impl<T: Send + Sync, F: Send> Sync for Lazy<T, F> {}

impl<T, F> Lazy<T, F> {
    pub const fn new(f: F) -> Self {
        Self {
            state: AtomicU8::new(UNINIT),
            init: UnsafeCell::new(Some(f)),
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns the value if it has already been built.
    pub fn get(&self) -> Option<&T> {
        if self.state.load(Ordering::Acquire) == READY {
            // SAFETY: READY is only published after `data` was written
            Some(unsafe { (*self.data.get()).assume_init_ref() })
        } else {
            None
        }
    }
}

impl<T, F: FnOnce() -> T> Lazy<T, F> {
    /// Forces initialisation and returns the value.
    pub fn force(this: &Self) -> &T {
        this.get_or_init()
    }

    fn get_or_init(&self) -> &T {
        if self
            .state
            .compare_exchange(UNINIT, RUNNING, Ordering::Acquire, Ordering::Acquire)
            .is_ok()
        {
            // SAFETY: the RUNNING transition makes us the only one touching `init` and `data`
            unsafe {
                if let Some(f) = (*self.init.get()).take() {
                    (*self.data.get()).write(f());
                }
            }
            self.state.store(READY, Ordering::Release);
        }

        loop {
            if let Some(value) = self.get() {
                return value;
            }
            core::hint::spin_loop();
        }
    }
}

impl<T, F: FnOnce() -> T> Deref for Lazy<T, F> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.get_or_init()
    }
}

impl<T, F> Drop for Lazy<T, F> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            // SAFETY: READY means `data` holds an initialised value
            unsafe { self.data.get_mut().assume_init_drop() }
        }
    }
}

#[cfg(test)]
mod test {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::Lazy;

    #[test]
    fn initialises_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        crate::klazy! {
            ref static VALUE: usize = {
                CALLS.fetch_add(1, Ordering::SeqCst);
                42
            };
        }

        assert!(VALUE.get().is_none());
        assert_eq!(*VALUE, 42);
        assert_eq!(*VALUE, 42);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn racing_first_access() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        static VALUE: Lazy<[u32; 64]> = Lazy::new(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            [7; 64]
        });

        let threads: std::vec::Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| Lazy::force(&VALUE)[63]))
            .collect();
        for t in threads {
            assert_eq!(t.join().unwrap(), 7);
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}

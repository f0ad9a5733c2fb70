use kcore::sync::SpinMutex;

use super::{fault, InterruptEvent, Vector};
use crate::{without_interrupts, Error};

/// Kernel logic run for one vector. The event may be mutated to change the resumed context.
pub type Handler = fn(&mut InterruptEvent);

/// What happens to an exception that has no handler.
pub trait FaultPolicy {
    fn unhandled_exception(&self, event: &mut InterruptEvent);
}

/// Reports the exception and halts the processor for good.
#[derive(Debug, Default, Clone, Copy)]
pub struct Halt;

impl FaultPolicy for Halt {
    fn unhandled_exception(&self, event: &mut InterruptEvent) {
        fault::report(event);
        crate::diverging_hlt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A handler ran and the interrupted context can resume.
    Handled,
    /// A handler ran and asked for the interrupted context not to resume.
    Terminate,
    /// No handler for a vector past the exception range.
    Ignored,
    /// No handler for an exception, the fault policy ran.
    Unhandled,
}

/// Routes every vector to an optional handler.
pub struct Dispatcher<P = Halt> {
    handlers: SpinMutex<[Option<Handler>; Vector::COUNT]>,
    policy: P,
}

impl<P: FaultPolicy> Dispatcher<P> {
    #[must_use]
    pub const fn new(policy: P) -> Self {
        Self {
            handlers: SpinMutex::new([None; Vector::COUNT]),
            policy,
        }
    }

    /// Installs `handler` for `vector`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`Error::VectorOutOfRange`] past 255, the registry is left untouched.
    pub fn register_handler(&self, vector: usize, handler: Handler) -> Result<(), Error> {
        let vector = Vector::new(vector)?;
        without_interrupts(|| {
            self.handlers.lock()[vector.as_usize()] = Some(handler);
        });
        debug!("registered handler for {:?}", vector);
        Ok(())
    }

    /// # Errors
    ///
    /// [`Error::VectorOutOfRange`] past 255.
    pub fn unregister_handler(&self, vector: usize) -> Result<(), Error> {
        let vector = Vector::new(vector)?;
        without_interrupts(|| {
            self.handlers.lock()[vector.as_usize()] = None;
        });
        debug!("unregistered handler for {:?}", vector);
        Ok(())
    }

    /// The registry is read with interrupts masked, an IRQ arriving meanwhile would spin on
    /// the lock in [`Dispatcher::dispatch`].
    #[must_use]
    pub fn handler(&self, vector: Vector) -> Option<Handler> {
        without_interrupts(|| self.handlers.lock()[vector.as_usize()])
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Runs the handler registered for the event's vector.
    ///
    /// The registry lock is released before the handler runs so a handler can itself register
    /// or unregister vectors.
    pub fn dispatch(&self, event: &mut InterruptEvent) -> Outcome {
        match self.handler(event.vector) {
            Some(handler) => {
                handler(event);
                if event.termination_requested() {
                    Outcome::Terminate
                } else {
                    Outcome::Handled
                }
            }
            None if event.vector.is_exception() => {
                self.policy.unhandled_exception(event);
                Outcome::Unhandled
            }
            None => Outcome::Ignored,
        }
    }
}

impl<P: core::fmt::Debug> core::fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let registered = match self.handlers.try_lock() {
            Some(handlers) => handlers.iter().filter(|h| h.is_some()).count(),
            None => return f.write_str("Dispatcher { <locked> }"),
        };
        f.debug_struct("Dispatcher")
            .field("registered", &registered)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use kcore::sync::SpinMutex;

    use super::*;
    use crate::interrupts::{GeneralRegisters, InterruptFrame, RegisterSnapshot};

    #[derive(Debug, Default)]
    struct CountingPolicy {
        calls: AtomicUsize,
        last: SpinMutex<Option<(Vector, Option<u32>)>>,
    }

    impl FaultPolicy for CountingPolicy {
        fn unhandled_exception(&self, event: &mut InterruptEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = Some((event.vector, event.error_code));
        }
    }

    fn snapshot() -> RegisterSnapshot {
        RegisterSnapshot {
            ds: 0x10,
            general: GeneralRegisters {
                eax: 1,
                ecx: 2,
                edx: 3,
                ..GeneralRegisters::default()
            },
            frame: InterruptFrame {
                eip: 0x0010_2000,
                cs: 0x08,
                eflags: 0x202,
                esp: 0,
                ss: 0,
            },
        }
    }

    fn dispatcher() -> Dispatcher<CountingPolicy> {
        Dispatcher::new(CountingPolicy::default())
    }

    #[test]
    fn registered_handler_runs_once_with_the_event() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        static SEEN: SpinMutex<Option<InterruptEvent>> = SpinMutex::new(None);

        fn on_breakpoint(event: &mut InterruptEvent) {
            CALLS.fetch_add(1, Ordering::SeqCst);
            *SEEN.lock() = Some(*event);
        }

        let dispatcher = dispatcher();
        dispatcher.register_handler(3, on_breakpoint).unwrap();

        let mut event = InterruptEvent::new(Vector::BREAKPOINT, None, snapshot());
        assert_eq!(dispatcher.dispatch(&mut event), Outcome::Handled);

        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        let seen = SEEN.lock().unwrap();
        assert_eq!(seen.vector.as_u8(), 3);
        assert_eq!(seen.error_code, None);
        assert_eq!(seen.registers, snapshot());
        assert_eq!(dispatcher.policy().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unhandled_exception_goes_to_the_policy() {
        let dispatcher = dispatcher();
        let mut event = InterruptEvent::new(Vector::PAGE_FAULT, Some(0b10), snapshot());

        assert_eq!(dispatcher.dispatch(&mut event), Outcome::Unhandled);
        assert_eq!(dispatcher.policy().calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *dispatcher.policy().last.lock(),
            Some((Vector::PAGE_FAULT, Some(0b10)))
        );
    }

    #[test]
    fn unhandled_software_vector_is_ignored() {
        let dispatcher = dispatcher();
        let mut event = InterruptEvent::new(Vector::from_u8(200), None, snapshot());

        assert_eq!(dispatcher.dispatch(&mut event), Outcome::Ignored);
        assert_eq!(event.registers, snapshot());
        assert_eq!(dispatcher.policy().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unregister_restores_the_default() {
        fn on_page_fault(_: &mut InterruptEvent) {}

        let dispatcher = dispatcher();
        dispatcher.register_handler(14, on_page_fault).unwrap();
        dispatcher.unregister_handler(14).unwrap();
        assert!(dispatcher.handler(Vector::PAGE_FAULT).is_none());

        let mut event = InterruptEvent::new(Vector::PAGE_FAULT, Some(0), snapshot());
        assert_eq!(dispatcher.dispatch(&mut event), Outcome::Unhandled);
        assert_eq!(dispatcher.policy().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn out_of_range_registration_is_rejected() {
        fn handler(_: &mut InterruptEvent) {}

        let dispatcher = dispatcher();
        assert_eq!(
            dispatcher.register_handler(300, handler),
            Err(Error::VectorOutOfRange(300))
        );
        assert_eq!(
            dispatcher.unregister_handler(256),
            Err(Error::VectorOutOfRange(256))
        );
        assert!(Vector::all().all(|v| dispatcher.handler(v).is_none()));
    }

    #[test]
    fn last_registration_wins() {
        static FIRST: AtomicUsize = AtomicUsize::new(0);
        static SECOND: AtomicUsize = AtomicUsize::new(0);

        fn first(_: &mut InterruptEvent) {
            FIRST.fetch_add(1, Ordering::SeqCst);
        }
        fn second(_: &mut InterruptEvent) {
            SECOND.fetch_add(1, Ordering::SeqCst);
        }

        let dispatcher = dispatcher();
        dispatcher.register_handler(0x80, first).unwrap();
        dispatcher.register_handler(0x80, second).unwrap();

        let mut event = InterruptEvent::new(Vector::from_u8(0x80), None, snapshot());
        dispatcher.dispatch(&mut event);
        assert_eq!(FIRST.load(Ordering::SeqCst), 0);
        assert_eq!(SECOND.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_changes_reach_the_trap_frame() {
        fn skip_instruction(event: &mut InterruptEvent) {
            event.registers.frame.eip += 2;
            event.registers.general.eax = 0x1234;
        }

        let dispatcher = dispatcher();
        dispatcher.register_handler(6, skip_instruction).unwrap();

        let mut trap = crate::interrupts::TrapFrame {
            vector: 6,
            ds: 0x10,
            frame: snapshot().frame,
            ..Default::default()
        };
        let mut event = trap.event().unwrap();
        assert_eq!(dispatcher.dispatch(&mut event), Outcome::Handled);
        trap.restore(&event.registers);

        assert_eq!(trap.frame.eip, 0x0010_2002);
        assert_eq!(trap.general.eax, 0x1234);
    }

    #[test]
    fn handler_may_request_termination() {
        fn kill(event: &mut InterruptEvent) {
            event.request_termination();
        }

        let dispatcher = dispatcher();
        dispatcher.register_handler(13, kill).unwrap();

        let mut event = InterruptEvent::new(Vector::GENERAL_PROTECTION, Some(0), snapshot());
        assert_eq!(dispatcher.dispatch(&mut event), Outcome::Terminate);
        assert_eq!(dispatcher.policy().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_can_unregister_itself() {
        static DISPATCHER: Dispatcher<CountingPolicy> = Dispatcher::new(CountingPolicy {
            calls: AtomicUsize::new(0),
            last: SpinMutex::new(None),
        });

        fn once(event: &mut InterruptEvent) {
            DISPATCHER
                .unregister_handler(event.vector.as_usize())
                .unwrap();
        }

        DISPATCHER.register_handler(0x81, once).unwrap();
        let mut event = InterruptEvent::new(Vector::from_u8(0x81), None, snapshot());
        assert_eq!(DISPATCHER.dispatch(&mut event), Outcome::Handled);
        assert_eq!(DISPATCHER.dispatch(&mut event), Outcome::Ignored);
    }

    #[test]
    fn lookup_from_a_handler_releases_the_registry() {
        static DISPATCHER: Dispatcher<CountingPolicy> = Dispatcher::new(CountingPolicy {
            calls: AtomicUsize::new(0),
            last: SpinMutex::new(None),
        });
        static FOUND: AtomicUsize = AtomicUsize::new(0);

        fn nested(event: &mut InterruptEvent) {
            if DISPATCHER.handler(event.vector).is_some() {
                FOUND.fetch_add(1, Ordering::SeqCst);
            }
            assert!(DISPATCHER.handlers.try_lock().is_some());
        }

        DISPATCHER.register_handler(0x82, nested).unwrap();
        assert!(DISPATCHER.handler(Vector::from_u8(0x82)).is_some());
        assert!(DISPATCHER.handlers.try_lock().is_some());

        let mut event = InterruptEvent::new(Vector::from_u8(0x82), None, snapshot());
        assert_eq!(DISPATCHER.dispatch(&mut event), Outcome::Handled);
        assert_eq!(FOUND.load(Ordering::SeqCst), 1);
    }
}

use super::JniEnv;
use crate::{
    java_class::{JavaObject, Throwable},
    vm::RawObject,
};
use std::cell::Cell;

thread_local! {
    static REPORTING: Cell<bool> = Cell::new(false);
}

impl<'a> JniEnv<'a> {
    /// Captures the exception pending on this thread, if any, and clears it from the JVM.
    ///
    /// The exception is promoted to a global reference and stored in the thread's single
    /// pending-exception slot, replacing (and releasing) any exception stored there before.
    /// Returns the stored exception, which remains owned by the slot.
    pub fn check_pending_exception(&self) -> Option<RawObject> {
        let backend = self.backend();
        if !backend.exception_check(self.env) {
            return None;
        }
        let thrown = backend.exception_occurred(self.env);
        backend.exception_clear(self.env);

        let thrown = thrown?;
        let global = backend.new_global_ref(self.env, thrown);
        backend.delete_local_ref(self.env, thrown);
        let global = global?;

        let slots = self.bridge.slots();
        if let Some(displaced) = slots.replace_pending_exception(self.thread, global) {
            log::debug!("Discarding an exception that was never retrieved");
            backend.delete_global_ref(self.env, displaced);
        }
        Some(global)
    }

    /// Captures any exception pending in the JVM, then removes and returns the exception stored
    /// for this thread. Each captured exception is returned at most once.
    pub fn take_pending_exception(&self) -> Option<JavaObject> {
        self.check_pending_exception();
        let global = self.bridge.slots().take_pending_exception(self.thread)?;
        Some(JavaObject::from_global(self.bridge, global))
    }

    /// Returns whether an exception is stored for this thread, without capturing new ones.
    pub fn has_pending_exception(&self) -> bool {
        self.bridge.slots().has_pending_exception(self.thread)
    }

    /// Describes and drops an exception that earlier code captured but never retrieved, along
    /// with any still pending in the JVM.
    pub fn exception_reset(&self) {
        self.check_pending_exception();
        if !self.has_pending_exception() {
            return;
        }
        if REPORTING.with(|flag| flag.replace(true)) {
            self.take_pending_exception();
            return;
        }
        log::warn!("JNI: Left over exception");
        self.describe_pending_exception();
        REPORTING.with(|flag| flag.set(false));
    }

    /// Logs a bridging failure along with the call site. If an exception is pending, it is
    /// taken and its class, message and stack trace are logged too.
    #[track_caller]
    pub fn report(&self, msg: &str) {
        let location = std::panic::Location::caller();
        log::error!("JNI: {} {}:{}", msg, location.file(), location.line());

        // describing the exception calls into Java, which may fail and report again
        if REPORTING.with(|flag| flag.replace(true)) {
            return;
        }
        self.describe_pending_exception();
        REPORTING.with(|flag| flag.set(false));
    }

    fn describe_pending_exception(&self) {
        if let Some(exception) = self.take_pending_exception() {
            let throwable = Throwable::from(exception);
            log::error!(
                "JNI: {} {}",
                throwable.class_name(*self).unwrap_or_else(|| "<unknown class>".to_string()),
                throwable.message(*self).unwrap_or_else(|| "unavailable".to_string()),
            );
            if let Some(trace) = throwable.stack_trace_string(*self) {
                log::error!("{trace}");
            }
            throwable.print_stack_trace(*self);
        }
    }
}

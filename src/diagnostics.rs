//! Per-thread out-of-band fault records.
//!
//! Nothing in the bridge unwinds on failure. Instead, a failed operation returns an absent value
//! and leaves a record here that the caller can poll: the last pending Java exception captured on
//! the thread, and the last fatal bridging failure. Both live behind one lock that is only held
//! for the map mutation, never across a JNI call.

use crate::{internal::thread_exit, vm::RawObject};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    panic::Location,
    sync::{Arc, Weak},
    thread::{self, ThreadId},
};

/// A fatal failure recorded for later retrieval, along with where it was recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FatalMessage {
    pub description: String,
    pub file: &'static str,
    pub line: u32,
}
impl Display for FatalMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}:{}", self.description, self.file, self.line)
    }
}

#[derive(Default)]
struct Slots {
    pending_exception: Option<RawObject>,
    fatal: Option<FatalMessage>,
}
impl Slots {
    fn is_empty(&self) -> bool {
        self.pending_exception.is_none() && self.fatal.is_none()
    }
}

/// The registry holding each thread's pending-exception and fatal-message slots.
pub struct ThreadSlots {
    owner_id: usize,
    slots: Mutex<HashMap<ThreadId, Slots>>,
}

lazy_static! {
    static ref GLOBAL_SLOTS: Arc<ThreadSlots> = ThreadSlots::new();
}

impl ThreadSlots {
    pub fn new() -> Arc<ThreadSlots> {
        Arc::new(ThreadSlots {
            owner_id: thread_exit::next_owner_id(),
            slots: Mutex::new(HashMap::new()),
        })
    }

    /// The process-wide registry, used by default and before any bridge exists.
    pub fn global() -> Arc<ThreadSlots> {
        GLOBAL_SLOTS.clone()
    }

    fn with_slots<R>(&self, thread: ThreadId, func: impl FnOnce(&mut Slots) -> R) -> R {
        let mut map = self.slots.lock();
        let slots = map.entry(thread).or_default();
        let result = func(slots);
        if slots.is_empty() {
            map.remove(&thread);
        }
        result
    }

    /// Stores a fatal message for the current thread, replacing any previous one.
    pub fn record_fatal(
        self: &Arc<Self>,
        message: impl Into<String>,
        location: &'static Location<'static>,
    ) {
        let fatal = FatalMessage {
            description: message.into(),
            file: location.file(),
            line: location.line(),
        };
        log::error!("{fatal}");
        self.with_slots(thread::current().id(), |slots| slots.fatal = Some(fatal));

        let weak: Weak<ThreadSlots> = Arc::downgrade(self);
        let thread = thread::current().id();
        thread_exit::register(self.owner_id, move || {
            if let Some(slots) = weak.upgrade() {
                slots.clear_fatal(thread);
            }
        });
    }

    /// Removes and returns the fatal message recorded for a thread.
    pub fn take_fatal(&self, thread: ThreadId) -> Option<FatalMessage> {
        self.with_slots(thread, |slots| slots.fatal.take())
    }

    /// Returns the fatal message recorded for a thread without clearing it.
    pub fn fatal_message(&self, thread: ThreadId) -> Option<FatalMessage> {
        let map = self.slots.lock();
        map.get(&thread).and_then(|slots| slots.fatal.clone())
    }

    pub fn clear_fatal(&self, thread: ThreadId) {
        self.take_fatal(thread);
    }

    /// Stores a captured exception for a thread, returning the one it displaced. The displaced
    /// reference is still owned by the caller and must be released by it.
    pub(crate) fn replace_pending_exception(
        &self,
        thread: ThreadId,
        exception: RawObject,
    ) -> Option<RawObject> {
        self.with_slots(thread, |slots| slots.pending_exception.replace(exception))
    }

    pub(crate) fn take_pending_exception(&self, thread: ThreadId) -> Option<RawObject> {
        self.with_slots(thread, |slots| slots.pending_exception.take())
    }

    pub(crate) fn has_pending_exception(&self, thread: ThreadId) -> bool {
        let map = self.slots.lock();
        map.get(&thread).map_or(false, |slots| slots.pending_exception.is_some())
    }

    /// Returns the number of threads holding any record.
    pub fn thread_count(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Records a fatal message for the current thread in the process-wide registry.
#[track_caller]
pub fn record_fatal(message: impl Into<String>) {
    ThreadSlots::global().record_fatal(message, Location::caller())
}

/// Records an error as the current thread's fatal message, at the location it was created.
pub(crate) fn record_error(err: &crate::Error) {
    ThreadSlots::global().record_fatal(err.description(), err.location())
}

/// Takes the fatal message recorded for the current thread in the process-wide registry,
/// formatted with its location.
pub fn take_fatal() -> Option<String> {
    ThreadSlots::global().take_fatal(thread::current().id()).map(|fatal| fatal.to_string())
}

/// Returns the fatal message recorded for the current thread in the process-wide registry,
/// without clearing it.
pub fn fatal_message() -> Option<String> {
    ThreadSlots::global().fatal_message(thread::current().id()).map(|fatal| fatal.to_string())
}

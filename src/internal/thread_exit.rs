//! Per-thread exit hooks.
//!
//! Rust has no direct `pthread_key_create` destructor equivalent, so hooks are kept in a
//! thread-local list whose destructor runs them when the OS thread exits. Hooks run in the order
//! they were registered.

use crate::internal::panicking::catch_panic;
use std::{
    cell::RefCell,
    sync::atomic::{AtomicUsize, Ordering},
};

type Hook = Box<dyn FnOnce()>;

static NEXT_OWNER_ID: AtomicUsize = AtomicUsize::new(1);

/// Returns a process-unique id used to key the hooks of one owner.
pub fn next_owner_id() -> usize {
    NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Default)]
struct ThreadExitHooks {
    hooks: Vec<(usize, Hook)>,
}
impl Drop for ThreadExitHooks {
    fn drop(&mut self) {
        for (owner, hook) in self.hooks.drain(..) {
            if let Err(e) = catch_panic(hook) {
                log::error!("thread exit hook for owner {owner} failed: {e}");
            }
        }
    }
}

thread_local! {
    static HOOKS: RefCell<ThreadExitHooks> = RefCell::new(ThreadExitHooks::default());
}

/// Registers a hook to run when the current thread exits.
///
/// Only one hook is kept per owner; returns `false` if the owner already has one registered on
/// this thread, or if the thread is already shutting down.
pub fn register(owner: usize, hook: impl FnOnce() + 'static) -> bool {
    HOOKS
        .try_with(|hooks| {
            let mut hooks = hooks.borrow_mut();
            if hooks.hooks.iter().any(|(id, _)| *id == owner) {
                false
            } else {
                hooks.hooks.push((owner, Box::new(hook)));
                true
            }
        })
        .unwrap_or(false)
}

/// Whether the current thread has started running its exit hooks. No hook can be registered
/// once it has.
pub fn thread_exiting() -> bool {
    HOOKS.try_with(|_| ()).is_err()
}

/// Returns whether the owner has a hook registered on the current thread.
#[cfg(test)]
pub fn is_registered(owner: usize) -> bool {
    HOOKS
        .try_with(|hooks| hooks.borrow().hooks.iter().any(|(id, _)| *id == owner))
        .unwrap_or(false)
}

use super::JniEnv;
use crate::vm::RawObject;

/// A set of local references created while preparing or making one JNI call.
///
/// Every tracked reference is released exactly once: when the scope is finished, when
/// [`LocalScope::release`] is called, or when the scope is dropped.
pub struct LocalScope<'a> {
    env: JniEnv<'a>,
    locals: Vec<RawObject>,
}
impl<'a> LocalScope<'a> {
    pub fn new(env: JniEnv<'a>) -> Self {
        LocalScope { env, locals: Vec::new() }
    }

    pub fn env(&self) -> JniEnv<'a> {
        self.env
    }

    /// Tracks a local reference for release. Tracking a reference twice has no effect.
    pub fn track(&mut self, obj: RawObject) -> RawObject {
        if !self.locals.contains(&obj) {
            self.locals.push(obj);
        }
        obj
    }

    pub fn track_opt(&mut self, obj: Option<RawObject>) -> Option<RawObject> {
        obj.map(|obj| self.track(obj))
    }

    /// Stops tracking a reference, handing ownership back to the caller.
    pub fn forget(&mut self, obj: RawObject) -> bool {
        match self.locals.iter().rposition(|x| *x == obj) {
            Some(idx) => {
                self.locals.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }
    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    /// Releases every tracked reference now. The scope can be reused afterwards.
    pub fn release(&mut self) {
        for obj in self.locals.drain(..) {
            self.env.delete_local_ref(Some(obj));
        }
    }

    /// Releases the tracked references, except for the most recently tracked one if `keep_last`
    /// is set, and captures any exception left pending. Returns the kept reference, which the
    /// caller now owns.
    pub fn finish(mut self, keep_last: bool) -> Option<RawObject> {
        let kept = if keep_last { self.locals.pop() } else { None };
        self.release();
        self.env.check_pending_exception();
        kept
    }
}
impl<'a> Drop for LocalScope<'a> {
    fn drop(&mut self) {
        self.release();
    }
}

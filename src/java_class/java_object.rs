use crate::{
    jni_env::{Bridge, JniEnv, LocalScope},
    vm::RawObject,
};
use std::fmt;

/// An owned global reference to a JVM object, or null.
///
/// The reference is released when the wrapper is dropped, on whatever thread that happens.
pub struct JavaObject {
    bridge: Bridge,
    global: Option<RawObject>,
}
impl JavaObject {
    pub fn null(bridge: &Bridge) -> Self {
        JavaObject { bridge: bridge.clone(), global: None }
    }

    /// Promotes a reference (usually a local one) into a new wrapper. The original reference
    /// is left untouched.
    pub fn new(env: JniEnv<'_>, obj: Option<RawObject>) -> Self {
        let mut wrapper = JavaObject::null(env.bridge());
        wrapper.set(env, obj);
        wrapper
    }

    /// Takes ownership of an existing global reference.
    pub(crate) fn from_global(bridge: &Bridge, global: RawObject) -> Self {
        JavaObject { bridge: bridge.clone(), global: Some(global) }
    }

    pub fn as_raw(&self) -> Option<RawObject> {
        self.global
    }

    /// Replaces the held reference. The new reference is promoted before the old one is
    /// released, so setting a wrapper to the object it already holds never frees it.
    pub fn set(&mut self, env: JniEnv<'_>, obj: Option<RawObject>) {
        if obj == self.global {
            return;
        }
        let old = self.global;
        self.global = obj.and_then(|obj| env.new_global_ref(obj));
        if let Some(old) = old {
            env.delete_global_ref(old);
        }
    }

    /// Releases the held reference, leaving the wrapper null.
    pub fn clear(&mut self, env: JniEnv<'_>) {
        self.set(env, None)
    }

    /// Gives up ownership of the global reference. The caller becomes responsible for
    /// releasing it.
    pub fn take(&mut self) -> Option<RawObject> {
        self.global.take()
    }

    /// Whether the wrapper holds no reference, or a reference to a Java null.
    pub fn is_null(&self, env: JniEnv<'_>) -> bool {
        match self.global {
            None => true,
            Some(global) => env.is_same_object(Some(global), None),
        }
    }

    /// Creates a local reference to the held object, tracked by `scope`.
    pub fn local<'a>(&self, scope: &mut LocalScope<'a>) -> Option<RawObject> {
        let local = scope.env().new_local_ref(self.global?);
        scope.track_opt(local)
    }

    /// Runs a closure with a temporary local reference to the held object.
    pub fn with_local<R>(&self, env: JniEnv<'_>, func: impl FnOnce(Option<RawObject>) -> R) -> R {
        let mut scope = LocalScope::new(env);
        let local = self.local(&mut scope);
        func(local)
    }
}
impl Drop for JavaObject {
    fn drop(&mut self) {
        if let Some(global) = self.global.take() {
            if !self.bridge.release_global(global) {
                log::warn!("Leaking a global reference: no JNI environment on this thread");
            }
        }
    }
}
impl fmt::Debug for JavaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JavaObject").field(&self.global).finish()
    }
}

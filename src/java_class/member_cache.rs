use crate::vm::{FieldId, MethodId};
use jni::sys::{_jfieldID, _jmethodID};
use std::{
    ptr,
    sync::atomic::{AtomicPtr, Ordering},
};

macro_rules! member_cache {
    ($(#[$meta:meta])* $name:ident, $id:ident, $raw:ty) => {
        $(#[$meta])*
        pub struct $name(AtomicPtr<$raw>);
        impl $name {
            pub const fn new() -> Self {
                $name(AtomicPtr::new(ptr::null_mut()))
            }

            pub fn get(&self) -> Option<$id> {
                $id::from_raw(self.0.load(Ordering::Acquire))
            }

            pub fn set(&self, id: $id) {
                self.0.store(id.as_raw(), Ordering::Release)
            }

            /// Returns the cached id, resolving and storing it on first use. Concurrent first
            /// uses may both resolve; they store the same id.
            pub fn get_or_resolve(&self, resolve: impl FnOnce() -> Option<$id>) -> Option<$id> {
                if let Some(id) = self.get() {
                    return Some(id);
                }
                let id = resolve()?;
                self.set(id);
                Some(id)
            }
        }
        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

member_cache!(
    /// A per-call-site method id cache, meant to live in a `static`.
    ///
    /// ```rust
    /// use jnibridge::MethodCache;
    /// static TO_STRING: MethodCache = MethodCache::new();
    /// assert!(TO_STRING.get().is_none());
    /// ```
    MethodCache, MethodId, _jmethodID
);
member_cache!(
    /// A per-call-site field id cache, meant to live in a `static`.
    FieldCache, FieldId, _jfieldID
);

//! Projection of values between Rust and the JVM.

mod arrays;
mod strings;

pub use arrays::array_descriptor;

use crate::{
    java_class::{JavaObject, Throwable},
    jni_env::{JniEnv, LocalScope},
    vm::RawObject,
};
use std::borrow::Cow;

/// A value that can be projected into the JVM.
pub trait ToJava {
    /// Creates a local reference holding this value, tracked by `scope`. Returns `None` for a
    /// Java null, or if the value could not be created.
    fn to_java<'a>(&self, scope: &mut LocalScope<'a>) -> Option<RawObject>;

    /// The class of values of this type, as an internal name or an array descriptor. This is the
    /// element class of an empty array of this type.
    fn java_class() -> Cow<'static, str>
    where Self: Sized {
        Cow::Borrowed("java/lang/Object")
    }
}

/// A value that can be loaded back out of the JVM.
pub trait FromJava: Sized {
    /// Loads a value from a reference, which may be null. The reference is not released.
    fn from_java(env: JniEnv<'_>, obj: Option<RawObject>) -> Self;
}

impl<T: ToJava> ToJava for Option<T> {
    fn to_java<'a>(&self, scope: &mut LocalScope<'a>) -> Option<RawObject> {
        self.as_ref()?.to_java(scope)
    }
    fn java_class() -> Cow<'static, str> {
        T::java_class()
    }
}
impl<T: FromJava> FromJava for Option<T> {
    fn from_java(env: JniEnv<'_>, obj: Option<RawObject>) -> Self {
        obj.map(|obj| T::from_java(env, Some(obj)))
    }
}

impl ToJava for JavaObject {
    fn to_java<'a>(&self, scope: &mut LocalScope<'a>) -> Option<RawObject> {
        self.local(scope)
    }
}
impl FromJava for JavaObject {
    fn from_java(env: JniEnv<'_>, obj: Option<RawObject>) -> Self {
        JavaObject::new(env, obj)
    }
}

impl ToJava for Throwable {
    fn to_java<'a>(&self, scope: &mut LocalScope<'a>) -> Option<RawObject> {
        self.object().local(scope)
    }
    fn java_class() -> Cow<'static, str> {
        Cow::Borrowed("java/lang/Throwable")
    }
}
impl FromJava for Throwable {
    fn from_java(env: JniEnv<'_>, obj: Option<RawObject>) -> Self {
        Throwable::from(JavaObject::new(env, obj))
    }
}

impl<'a> JniEnv<'a> {
    /// Loads a value from a reference, releasing the reference afterwards if `consume` is set.
    /// Returns `None` for a null reference.
    pub fn load<T: FromJava>(&self, obj: Option<RawObject>, consume: bool) -> Option<T> {
        let obj = obj?;
        let value = T::from_java(*self, Some(obj));
        if consume {
            self.delete_local_ref(Some(obj));
        }
        Some(value)
    }
}

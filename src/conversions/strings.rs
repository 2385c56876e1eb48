use super::{FromJava, ToJava};
use crate::{
    jni_env::{JniEnv, LocalScope},
    vm::RawObject,
};
use std::borrow::Cow;

const STRING_CLASS: &str = "java/lang/String";

impl ToJava for str {
    fn to_java<'a>(&self, scope: &mut LocalScope<'a>) -> Option<RawObject> {
        let env = scope.env();
        let string = env.backend().new_string(env.raw(), self);
        if string.is_none() {
            env.check_pending_exception();
        }
        scope.track_opt(string)
    }
}

impl ToJava for &str {
    fn to_java<'a>(&self, scope: &mut LocalScope<'a>) -> Option<RawObject> {
        (**self).to_java(scope)
    }
    fn java_class() -> Cow<'static, str> {
        Cow::Borrowed(STRING_CLASS)
    }
}

impl ToJava for String {
    fn to_java<'a>(&self, scope: &mut LocalScope<'a>) -> Option<RawObject> {
        self.as_str().to_java(scope)
    }
    fn java_class() -> Cow<'static, str> {
        Cow::Borrowed(STRING_CLASS)
    }
}

/// A null reference loads as the empty string.
impl FromJava for String {
    fn from_java(env: JniEnv<'_>, obj: Option<RawObject>) -> Self {
        match obj {
            Some(obj) => env.backend().get_string(env.raw(), obj).unwrap_or_else(|| {
                env.check_pending_exception();
                String::new()
            }),
            None => String::new(),
        }
    }
}

impl<'a> JniEnv<'a> {
    /// Creates a Java string, as a local reference tracked by `scope`.
    pub fn new_string(&self, value: &str, scope: &mut LocalScope<'a>) -> Option<RawObject> {
        value.to_java(scope)
    }
}

use super::{FromJava, ToJava};
use crate::{
    jni_env::{JniEnv, LocalScope},
    vm::RawObject,
};
use std::borrow::Cow;

/// Returns the descriptor of an array whose elements are of the given class. The class may be an
/// internal name or itself an array descriptor.
pub fn array_descriptor(element_class: &str) -> String {
    if element_class.starts_with('[') {
        format!("[{element_class}")
    } else {
        format!("[L{element_class};")
    }
}

impl<T: ToJava> ToJava for Vec<T> {
    fn to_java<'a>(&self, scope: &mut LocalScope<'a>) -> Option<RawObject> {
        scope.env().to_java_array(self, scope)
    }
    fn java_class() -> Cow<'static, str> {
        Cow::Owned(array_descriptor(&T::java_class()))
    }
}

/// A null reference loads as the empty vector.
impl<T: FromJava> FromJava for Vec<T> {
    fn from_java(env: JniEnv<'_>, obj: Option<RawObject>) -> Self {
        match obj {
            Some(array) => env.array_map(array, |element| T::from_java(env, element)),
            None => Vec::new(),
        }
    }
}

impl<'a> JniEnv<'a> {
    /// Creates an object array holding the projection of each value, as a local reference
    /// tracked by `scope`.
    ///
    /// The array's element class is the runtime class of its first non-null element, so a
    /// heterogeneous list must share that class. Arrays with no non-null element use the
    /// element type's [`ToJava::java_class`]. Each element's local reference is released as
    /// soon as it is stored.
    #[track_caller]
    pub fn to_java_array<T: ToJava>(
        &self,
        values: &[T],
        scope: &mut LocalScope<'a>,
    ) -> Option<RawObject> {
        let len = match i32::try_from(values.len()) {
            Ok(len) => len,
            Err(_) => {
                self.report(&format!("Array of {} elements is too long for Java", values.len()));
                return None;
            }
        };
        let backend = self.backend();

        let mut array = None;
        for (idx, value) in values.iter().enumerate() {
            let mut element_scope = LocalScope::new(*self);
            let element = match value.to_java(&mut element_scope) {
                Some(element) => element,
                None => continue,
            };
            let target = match array {
                Some(target) => target,
                None => {
                    let class = self.get_object_class(Some(element), &mut element_scope)?;
                    let created = self.new_object_array(len, class, scope)?;
                    array = Some(created);
                    created
                }
            };
            backend.set_object_array_element(self.raw(), target, idx as i32, Some(element));
            if self.check_pending_exception().is_some() {
                return None;
            }
        }

        match array {
            Some(array) => Some(array),
            None => {
                let class = self.resolve_class(&T::java_class())?;
                self.new_object_array(len, class, scope)
            }
        }
    }

    /// Creates an object array of nulls, as a local reference tracked by `scope`.
    #[track_caller]
    pub fn new_object_array(
        &self,
        len: i32,
        element_class: RawObject,
        scope: &mut LocalScope<'a>,
    ) -> Option<RawObject> {
        let array = self.backend().new_object_array(self.raw(), len, element_class, None);
        if self.check_pending_exception().is_some() || array.is_none() {
            self.delete_local_ref(array);
            self.report(&format!("Could not create array of {len} elements"));
            return None;
        }
        scope.track_opt(array)
    }

    /// Returns the length of a Java array.
    pub fn array_length(&self, array: RawObject) -> i32 {
        self.backend().get_array_length(self.raw(), array)
    }

    /// Maps each element of an object array. Each element is passed as a temporary local
    /// reference that is released once the closure returns.
    pub fn array_map<R>(
        &self,
        array: RawObject,
        mut func: impl FnMut(Option<RawObject>) -> R,
    ) -> Vec<R> {
        let backend = self.backend();
        let len = backend.get_array_length(self.raw(), array).max(0);
        let mut out = Vec::with_capacity(len as usize);
        for idx in 0..len {
            let element = backend.get_object_array_element(self.raw(), array, idx);
            out.push(func(element));
            self.delete_local_ref(element);
        }
        out
    }

    /// Loads an object array into a vector, releasing the array reference afterwards if
    /// `consume` is set. Returns `None` for a null reference.
    pub fn load_array<T: FromJava>(&self, array: Option<RawObject>, consume: bool) -> Option<Vec<T>> {
        self.load(array, consume)
    }

    /// Loads an array of arrays into nested vectors. Null inner arrays load as empty vectors.
    pub fn load_nested<T: FromJava>(
        &self,
        array: Option<RawObject>,
        consume: bool,
    ) -> Option<Vec<Vec<T>>> {
        self.load(array, consume)
    }
}

//! The seam between the bridge and the JVM.
//!
//! Everything the bridge does to the JVM goes through [`JvmBackend`], which mirrors the subset of
//! the JNI invocation and native interfaces the bridge consumes. [`JniBackend`] implements it over
//! the raw `jni::sys` tables; tests substitute an in-memory implementation.

mod handles;
mod invocation;
mod jni_backend;

pub use handles::{raw_or_null, EnvPtr, FieldId, JavaValue, MethodId, RawObject, ReturnKind};
pub use invocation::{init_jvm, init_jvm_with, VmOptions};
pub use jni_backend::JniBackend;

/// The JNI entry points used by the bridge.
///
/// Every method taking an [`EnvPtr`] must be called on the thread that environment belongs to.
/// Methods returning `Option` return `None` where the JNI function returns null; they never
/// inspect or clear the pending exception state, which is left entirely to the caller.
pub trait JvmBackend: Send + Sync + 'static {
    /// Returns the environment of the current thread if it is already attached.
    fn get_env(&self) -> Option<EnvPtr>;
    /// Attaches the current thread, returning its environment.
    fn attach_current_thread(&self) -> crate::Result<EnvPtr>;
    /// Detaches the current thread. `env` is the environment being torn down.
    fn detach_current_thread(&self, env: EnvPtr) -> crate::Result<()>;

    fn exception_check(&self, env: EnvPtr) -> bool;
    fn exception_occurred(&self, env: EnvPtr) -> Option<RawObject>;
    fn exception_clear(&self, env: EnvPtr);
    fn exception_describe(&self, env: EnvPtr);

    fn new_global_ref(&self, env: EnvPtr, obj: RawObject) -> Option<RawObject>;
    fn delete_global_ref(&self, env: EnvPtr, obj: RawObject);
    fn new_local_ref(&self, env: EnvPtr, obj: RawObject) -> Option<RawObject>;
    fn delete_local_ref(&self, env: EnvPtr, obj: RawObject);
    fn is_same_object(&self, env: EnvPtr, a: Option<RawObject>, b: Option<RawObject>) -> bool;

    /// Looks a class up through the bootstrap mechanism (`FindClass`). Takes a JNI internal
    /// name or an array descriptor.
    fn find_class(&self, env: EnvPtr, name: &str) -> Option<RawObject>;
    fn get_object_class(&self, env: EnvPtr, obj: RawObject) -> Option<RawObject>;

    fn get_method_id(&self, env: EnvPtr, class: RawObject, name: &str, sig: &str)
        -> Option<MethodId>;
    fn get_static_method_id(
        &self,
        env: EnvPtr,
        class: RawObject,
        name: &str,
        sig: &str,
    ) -> Option<MethodId>;
    fn get_field_id(&self, env: EnvPtr, class: RawObject, name: &str, sig: &str)
        -> Option<FieldId>;
    fn get_static_field_id(
        &self,
        env: EnvPtr,
        class: RawObject,
        name: &str,
        sig: &str,
    ) -> Option<FieldId>;

    fn call_method(
        &self,
        env: EnvPtr,
        obj: RawObject,
        method: MethodId,
        ret: ReturnKind,
        args: &[JavaValue],
    ) -> JavaValue;
    fn call_static_method(
        &self,
        env: EnvPtr,
        class: RawObject,
        method: MethodId,
        ret: ReturnKind,
        args: &[JavaValue],
    ) -> JavaValue;
    fn new_object(
        &self,
        env: EnvPtr,
        class: RawObject,
        ctor: MethodId,
        args: &[JavaValue],
    ) -> Option<RawObject>;
    fn get_field(&self, env: EnvPtr, obj: RawObject, field: FieldId, kind: ReturnKind)
        -> JavaValue;
    fn get_static_field(
        &self,
        env: EnvPtr,
        class: RawObject,
        field: FieldId,
        kind: ReturnKind,
    ) -> JavaValue;

    fn new_string(&self, env: EnvPtr, value: &str) -> Option<RawObject>;
    fn get_string(&self, env: EnvPtr, obj: RawObject) -> Option<String>;

    fn get_array_length(&self, env: EnvPtr, array: RawObject) -> i32;
    fn new_object_array(
        &self,
        env: EnvPtr,
        len: i32,
        element_class: RawObject,
        init: Option<RawObject>,
    ) -> Option<RawObject>;
    fn get_object_array_element(&self, env: EnvPtr, array: RawObject, index: i32)
        -> Option<RawObject>;
    fn set_object_array_element(
        &self,
        env: EnvPtr,
        array: RawObject,
        index: i32,
        value: Option<RawObject>,
    );
}

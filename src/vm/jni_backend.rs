use super::*;
use crate::errors::*;
use jni::{sys, JavaVM};
use std::{borrow::Cow, ffi::CString, os::raw::c_void, ptr};

/// Looks up a function in a `JNIEnv` table and calls it. Evaluates to `None` if the table does
/// not provide the function.
macro_rules! env_fn {
    ($env:expr, $name:ident $(, $arg:expr)* $(,)?) => {{
        let env: *mut sys::JNIEnv = $env.as_raw();
        #[allow(unused_unsafe)]
        unsafe {
            match (**env).$name {
                Some(func) => Some(func(env $(, $arg)*)),
                None => None,
            }
        }
    }};
}

/// Looks up a function in a `JavaVM` invocation table and calls it.
macro_rules! vm_fn {
    ($vm:expr, $name:ident $(, $arg:expr)* $(,)?) => {{
        let vm: *mut sys::JavaVM = $vm;
        #[allow(unused_unsafe)]
        unsafe {
            match (**vm).$name {
                Some(func) => Some(func(vm $(, $arg)*)),
                None => None,
            }
        }
    }};
}

/// Encodes a class or member name as the modified UTF-8 JNI expects.
fn jni_name(name: &str) -> Option<CString> {
    let bytes: Cow<[u8]> = cesu8::to_java_cesu8(name);
    CString::new(bytes.into_owned()).ok()
}

fn to_jvalue(value: &JavaValue) -> sys::jvalue {
    match *value {
        JavaValue::Object(obj) => sys::jvalue { l: raw_or_null(obj) },
        JavaValue::Boolean(z) => sys::jvalue { z: z as sys::jboolean },
        JavaValue::Byte(b) => sys::jvalue { b },
        JavaValue::Char(c) => sys::jvalue { c },
        JavaValue::Short(s) => sys::jvalue { s },
        JavaValue::Int(i) => sys::jvalue { i },
        JavaValue::Long(j) => sys::jvalue { j },
        JavaValue::Float(f) => sys::jvalue { f },
        JavaValue::Double(d) => sys::jvalue { d },
        JavaValue::Void => sys::jvalue { j: 0 },
    }
}

fn to_jvalues(args: &[JavaValue]) -> Vec<sys::jvalue> {
    args.iter().map(to_jvalue).collect()
}

#[inline(never)]
#[cold]
fn missing_fn(name: &str, kind: ReturnKind) -> JavaValue {
    log::error!("JNI function table has no entry for {name}");
    JavaValue::null(kind)
}

/// The production [`JvmBackend`], calling straight into the JNI function tables of a running VM.
pub struct JniBackend {
    vm: JavaVM,
    version: sys::jint,
}
impl JniBackend {
    /// Wraps an already running VM.
    pub fn new(vm: JavaVM) -> Self {
        JniBackend { vm, version: sys::JNI_VERSION_1_6 }
    }

    /// Wraps a raw VM pointer, as received by `JNI_OnLoad`.
    ///
    /// # Safety
    ///
    /// The pointer must point to a live Java VM that outlives the returned backend.
    pub unsafe fn from_raw(vm: *mut sys::JavaVM) -> Result<Self> {
        jni_assert!(!vm.is_null(), "received a null JavaVM pointer");
        Ok(JniBackend::new(JavaVM::from_raw(vm)?))
    }

    /// Returns the wrapped VM.
    pub fn java_vm(&self) -> &JavaVM {
        &self.vm
    }

    fn raw_vm(&self) -> *mut sys::JavaVM {
        self.vm.get_java_vm_pointer()
    }
}

impl JvmBackend for JniBackend {
    fn get_env(&self) -> Option<EnvPtr> {
        let mut env: *mut c_void = ptr::null_mut();
        let res = vm_fn!(self.raw_vm(), GetEnv, &mut env, self.version)?;
        if res == sys::JNI_OK {
            EnvPtr::from_raw(env as *mut sys::JNIEnv)
        } else {
            None
        }
    }

    fn attach_current_thread(&self) -> Result<EnvPtr> {
        let mut env: *mut c_void = ptr::null_mut();
        let res = vm_fn!(self.raw_vm(), AttachCurrentThread, &mut env, ptr::null_mut())
            .ok_or_else(|| Error::jni("AttachCurrentThread is missing"))?;
        if res != sys::JNI_OK {
            return Err(Error::attach(format!("AttachCurrentThread returned {res}")));
        }
        EnvPtr::from_raw(env as *mut sys::JNIEnv)
            .ok_or_else(|| Error::attach("AttachCurrentThread returned a null environment"))
    }

    fn detach_current_thread(&self, _env: EnvPtr) -> Result<()> {
        let res = vm_fn!(self.raw_vm(), DetachCurrentThread)
            .ok_or_else(|| Error::jni("DetachCurrentThread is missing"))?;
        if res != sys::JNI_OK {
            return Err(Error::attach(format!("DetachCurrentThread returned {res}")));
        }
        Ok(())
    }

    fn exception_check(&self, env: EnvPtr) -> bool {
        env_fn!(env, ExceptionCheck).map_or(false, |res| res != sys::JNI_FALSE)
    }
    fn exception_occurred(&self, env: EnvPtr) -> Option<RawObject> {
        RawObject::from_raw(env_fn!(env, ExceptionOccurred)?)
    }
    fn exception_clear(&self, env: EnvPtr) {
        env_fn!(env, ExceptionClear);
    }
    fn exception_describe(&self, env: EnvPtr) {
        env_fn!(env, ExceptionDescribe);
    }

    fn new_global_ref(&self, env: EnvPtr, obj: RawObject) -> Option<RawObject> {
        RawObject::from_raw(env_fn!(env, NewGlobalRef, obj.as_raw())?)
    }
    fn delete_global_ref(&self, env: EnvPtr, obj: RawObject) {
        env_fn!(env, DeleteGlobalRef, obj.as_raw());
    }
    fn new_local_ref(&self, env: EnvPtr, obj: RawObject) -> Option<RawObject> {
        RawObject::from_raw(env_fn!(env, NewLocalRef, obj.as_raw())?)
    }
    fn delete_local_ref(&self, env: EnvPtr, obj: RawObject) {
        env_fn!(env, DeleteLocalRef, obj.as_raw());
    }
    fn is_same_object(&self, env: EnvPtr, a: Option<RawObject>, b: Option<RawObject>) -> bool {
        env_fn!(env, IsSameObject, raw_or_null(a), raw_or_null(b))
            .map_or(false, |res| res != sys::JNI_FALSE)
    }

    fn find_class(&self, env: EnvPtr, name: &str) -> Option<RawObject> {
        let name = jni_name(name)?;
        RawObject::from_raw(env_fn!(env, FindClass, name.as_ptr())?)
    }
    fn get_object_class(&self, env: EnvPtr, obj: RawObject) -> Option<RawObject> {
        RawObject::from_raw(env_fn!(env, GetObjectClass, obj.as_raw())?)
    }

    fn get_method_id(
        &self,
        env: EnvPtr,
        class: RawObject,
        name: &str,
        sig: &str,
    ) -> Option<MethodId> {
        let (name, sig) = (jni_name(name)?, jni_name(sig)?);
        MethodId::from_raw(env_fn!(env, GetMethodID, class.as_raw(), name.as_ptr(), sig.as_ptr())?)
    }
    fn get_static_method_id(
        &self,
        env: EnvPtr,
        class: RawObject,
        name: &str,
        sig: &str,
    ) -> Option<MethodId> {
        let (name, sig) = (jni_name(name)?, jni_name(sig)?);
        MethodId::from_raw(env_fn!(
            env,
            GetStaticMethodID,
            class.as_raw(),
            name.as_ptr(),
            sig.as_ptr()
        )?)
    }
    fn get_field_id(
        &self,
        env: EnvPtr,
        class: RawObject,
        name: &str,
        sig: &str,
    ) -> Option<FieldId> {
        let (name, sig) = (jni_name(name)?, jni_name(sig)?);
        FieldId::from_raw(env_fn!(env, GetFieldID, class.as_raw(), name.as_ptr(), sig.as_ptr())?)
    }
    fn get_static_field_id(
        &self,
        env: EnvPtr,
        class: RawObject,
        name: &str,
        sig: &str,
    ) -> Option<FieldId> {
        let (name, sig) = (jni_name(name)?, jni_name(sig)?);
        FieldId::from_raw(env_fn!(
            env,
            GetStaticFieldID,
            class.as_raw(),
            name.as_ptr(),
            sig.as_ptr()
        )?)
    }

    fn call_method(
        &self,
        env: EnvPtr,
        obj: RawObject,
        method: MethodId,
        ret: ReturnKind,
        args: &[JavaValue],
    ) -> JavaValue {
        let args = to_jvalues(args);
        let (obj, mid, args) = (obj.as_raw(), method.as_raw(), args.as_ptr());
        let value = match ret {
            ReturnKind::Object => env_fn!(env, CallObjectMethodA, obj, mid, args)
                .map(|v| JavaValue::Object(RawObject::from_raw(v))),
            ReturnKind::Boolean => env_fn!(env, CallBooleanMethodA, obj, mid, args)
                .map(|v| JavaValue::Boolean(v != sys::JNI_FALSE)),
            ReturnKind::Byte => env_fn!(env, CallByteMethodA, obj, mid, args).map(JavaValue::Byte),
            ReturnKind::Char => env_fn!(env, CallCharMethodA, obj, mid, args).map(JavaValue::Char),
            ReturnKind::Short => {
                env_fn!(env, CallShortMethodA, obj, mid, args).map(JavaValue::Short)
            }
            ReturnKind::Int => env_fn!(env, CallIntMethodA, obj, mid, args).map(JavaValue::Int),
            ReturnKind::Long => env_fn!(env, CallLongMethodA, obj, mid, args).map(JavaValue::Long),
            ReturnKind::Float => {
                env_fn!(env, CallFloatMethodA, obj, mid, args).map(JavaValue::Float)
            }
            ReturnKind::Double => {
                env_fn!(env, CallDoubleMethodA, obj, mid, args).map(JavaValue::Double)
            }
            ReturnKind::Void => env_fn!(env, CallVoidMethodA, obj, mid, args).map(|_| JavaValue::Void),
        };
        value.unwrap_or_else(|| missing_fn("Call<Type>MethodA", ret))
    }
    fn call_static_method(
        &self,
        env: EnvPtr,
        class: RawObject,
        method: MethodId,
        ret: ReturnKind,
        args: &[JavaValue],
    ) -> JavaValue {
        let args = to_jvalues(args);
        let (cls, mid, args) = (class.as_raw(), method.as_raw(), args.as_ptr());
        let value = match ret {
            ReturnKind::Object => env_fn!(env, CallStaticObjectMethodA, cls, mid, args)
                .map(|v| JavaValue::Object(RawObject::from_raw(v))),
            ReturnKind::Boolean => env_fn!(env, CallStaticBooleanMethodA, cls, mid, args)
                .map(|v| JavaValue::Boolean(v != sys::JNI_FALSE)),
            ReturnKind::Byte => {
                env_fn!(env, CallStaticByteMethodA, cls, mid, args).map(JavaValue::Byte)
            }
            ReturnKind::Char => {
                env_fn!(env, CallStaticCharMethodA, cls, mid, args).map(JavaValue::Char)
            }
            ReturnKind::Short => {
                env_fn!(env, CallStaticShortMethodA, cls, mid, args).map(JavaValue::Short)
            }
            ReturnKind::Int => env_fn!(env, CallStaticIntMethodA, cls, mid, args).map(JavaValue::Int),
            ReturnKind::Long => {
                env_fn!(env, CallStaticLongMethodA, cls, mid, args).map(JavaValue::Long)
            }
            ReturnKind::Float => {
                env_fn!(env, CallStaticFloatMethodA, cls, mid, args).map(JavaValue::Float)
            }
            ReturnKind::Double => {
                env_fn!(env, CallStaticDoubleMethodA, cls, mid, args).map(JavaValue::Double)
            }
            ReturnKind::Void => {
                env_fn!(env, CallStaticVoidMethodA, cls, mid, args).map(|_| JavaValue::Void)
            }
        };
        value.unwrap_or_else(|| missing_fn("CallStatic<Type>MethodA", ret))
    }
    fn new_object(
        &self,
        env: EnvPtr,
        class: RawObject,
        ctor: MethodId,
        args: &[JavaValue],
    ) -> Option<RawObject> {
        let args = to_jvalues(args);
        RawObject::from_raw(env_fn!(env, NewObjectA, class.as_raw(), ctor.as_raw(), args.as_ptr())?)
    }
    fn get_field(
        &self,
        env: EnvPtr,
        obj: RawObject,
        field: FieldId,
        kind: ReturnKind,
    ) -> JavaValue {
        let (obj, fid) = (obj.as_raw(), field.as_raw());
        let value = match kind {
            ReturnKind::Object => env_fn!(env, GetObjectField, obj, fid)
                .map(|v| JavaValue::Object(RawObject::from_raw(v))),
            ReturnKind::Boolean => env_fn!(env, GetBooleanField, obj, fid)
                .map(|v| JavaValue::Boolean(v != sys::JNI_FALSE)),
            ReturnKind::Byte => env_fn!(env, GetByteField, obj, fid).map(JavaValue::Byte),
            ReturnKind::Char => env_fn!(env, GetCharField, obj, fid).map(JavaValue::Char),
            ReturnKind::Short => env_fn!(env, GetShortField, obj, fid).map(JavaValue::Short),
            ReturnKind::Int => env_fn!(env, GetIntField, obj, fid).map(JavaValue::Int),
            ReturnKind::Long => env_fn!(env, GetLongField, obj, fid).map(JavaValue::Long),
            ReturnKind::Float => env_fn!(env, GetFloatField, obj, fid).map(JavaValue::Float),
            ReturnKind::Double => env_fn!(env, GetDoubleField, obj, fid).map(JavaValue::Double),
            ReturnKind::Void => Some(JavaValue::Void),
        };
        value.unwrap_or_else(|| missing_fn("Get<Type>Field", kind))
    }
    fn get_static_field(
        &self,
        env: EnvPtr,
        class: RawObject,
        field: FieldId,
        kind: ReturnKind,
    ) -> JavaValue {
        let (cls, fid) = (class.as_raw(), field.as_raw());
        let value = match kind {
            ReturnKind::Object => env_fn!(env, GetStaticObjectField, cls, fid)
                .map(|v| JavaValue::Object(RawObject::from_raw(v))),
            ReturnKind::Boolean => env_fn!(env, GetStaticBooleanField, cls, fid)
                .map(|v| JavaValue::Boolean(v != sys::JNI_FALSE)),
            ReturnKind::Byte => env_fn!(env, GetStaticByteField, cls, fid).map(JavaValue::Byte),
            ReturnKind::Char => env_fn!(env, GetStaticCharField, cls, fid).map(JavaValue::Char),
            ReturnKind::Short => env_fn!(env, GetStaticShortField, cls, fid).map(JavaValue::Short),
            ReturnKind::Int => env_fn!(env, GetStaticIntField, cls, fid).map(JavaValue::Int),
            ReturnKind::Long => env_fn!(env, GetStaticLongField, cls, fid).map(JavaValue::Long),
            ReturnKind::Float => env_fn!(env, GetStaticFloatField, cls, fid).map(JavaValue::Float),
            ReturnKind::Double => {
                env_fn!(env, GetStaticDoubleField, cls, fid).map(JavaValue::Double)
            }
            ReturnKind::Void => Some(JavaValue::Void),
        };
        value.unwrap_or_else(|| missing_fn("GetStatic<Type>Field", kind))
    }

    fn new_string(&self, env: EnvPtr, value: &str) -> Option<RawObject> {
        let chars: Vec<u16> = value.encode_utf16().collect();
        let len = sys::jsize::try_from(chars.len()).ok()?;
        RawObject::from_raw(env_fn!(env, NewString, chars.as_ptr(), len)?)
    }
    fn get_string(&self, env: EnvPtr, obj: RawObject) -> Option<String> {
        let len = env_fn!(env, GetStringLength, obj.as_raw())?;
        let chars = env_fn!(env, GetStringChars, obj.as_raw(), ptr::null_mut())?;
        if chars.is_null() {
            return None;
        }
        let value = {
            let slice = unsafe { std::slice::from_raw_parts(chars, len.max(0) as usize) };
            String::from_utf16_lossy(slice)
        };
        env_fn!(env, ReleaseStringChars, obj.as_raw(), chars);
        Some(value)
    }

    fn get_array_length(&self, env: EnvPtr, array: RawObject) -> i32 {
        env_fn!(env, GetArrayLength, array.as_raw()).unwrap_or(0)
    }
    fn new_object_array(
        &self,
        env: EnvPtr,
        len: i32,
        element_class: RawObject,
        init: Option<RawObject>,
    ) -> Option<RawObject> {
        RawObject::from_raw(env_fn!(
            env,
            NewObjectArray,
            len,
            element_class.as_raw(),
            raw_or_null(init)
        )?)
    }
    fn get_object_array_element(
        &self,
        env: EnvPtr,
        array: RawObject,
        index: i32,
    ) -> Option<RawObject> {
        RawObject::from_raw(env_fn!(env, GetObjectArrayElement, array.as_raw(), index)?)
    }
    fn set_object_array_element(
        &self,
        env: EnvPtr,
        array: RawObject,
        index: i32,
        value: Option<RawObject>,
    ) {
        env_fn!(env, SetObjectArrayElement, array.as_raw(), index, raw_or_null(value));
    }
}

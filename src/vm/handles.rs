use jni::sys::{_jfieldID, _jmethodID, _jobject, JNIEnv};
use std::{fmt, ptr::NonNull};

/// A thread's JNI environment pointer.
///
/// Only meaningful on the thread it was obtained on. The bridge never hands one out through a
/// [`Send`] type; it is `Send` itself only so it can live in the shared environment cache.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EnvPtr(NonNull<JNIEnv>);
impl EnvPtr {
    /// Wraps a raw environment pointer, returning `None` for null.
    pub fn from_raw(ptr: *mut JNIEnv) -> Option<Self> {
        NonNull::new(ptr).map(EnvPtr)
    }
    pub fn as_raw(self) -> *mut JNIEnv {
        self.0.as_ptr()
    }
}
unsafe impl Send for EnvPtr {}
unsafe impl Sync for EnvPtr {}
impl fmt::Debug for EnvPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvPtr({:p})", self.0)
    }
}

/// A raw, non-null JVM object reference. Whether it is a local or a global reference is tracked
/// by whoever holds it, not by this type.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct RawObject(NonNull<_jobject>);
impl RawObject {
    pub fn from_raw(ptr: *mut _jobject) -> Option<Self> {
        NonNull::new(ptr).map(RawObject)
    }
    pub fn as_raw(self) -> *mut _jobject {
        self.0.as_ptr()
    }
}
unsafe impl Send for RawObject {}
unsafe impl Sync for RawObject {}
impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawObject({:p})", self.0)
    }
}

/// Converts an optional reference into the nullable form JNI expects.
pub fn raw_or_null(obj: Option<RawObject>) -> *mut _jobject {
    obj.map_or(std::ptr::null_mut(), RawObject::as_raw)
}

macro_rules! member_id {
    ($(#[$meta:meta])* $name:ident, $raw:ty) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash)]
        pub struct $name(NonNull<$raw>);
        impl $name {
            pub fn from_raw(ptr: *mut $raw) -> Option<Self> {
                NonNull::new(ptr).map($name)
            }
            pub fn as_raw(self) -> *mut $raw {
                self.0.as_ptr()
            }
        }
        // member ids are not tied to a thread
        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}
        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:p})"), self.0)
            }
        }
    };
}
member_id!(
    /// A resolved method identifier.
    MethodId, _jmethodID
);
member_id!(
    /// A resolved field identifier.
    FieldId, _jfieldID
);

/// The JNI type a call or field access is expected to produce.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    Object,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}
impl ReturnKind {
    /// Derives the return kind from the return part of a JNI method signature, or from a field
    /// signature.
    pub fn from_signature(sig: &str) -> Option<ReturnKind> {
        let ret = match sig.rfind(')') {
            Some(idx) => &sig[idx + 1..],
            None => sig,
        };
        Some(match ret.as_bytes().first()? {
            b'L' | b'[' => ReturnKind::Object,
            b'Z' => ReturnKind::Boolean,
            b'B' => ReturnKind::Byte,
            b'C' => ReturnKind::Char,
            b'S' => ReturnKind::Short,
            b'I' => ReturnKind::Int,
            b'J' => ReturnKind::Long,
            b'F' => ReturnKind::Float,
            b'D' => ReturnKind::Double,
            b'V' => ReturnKind::Void,
            _ => return None,
        })
    }
}

/// A value passed to or returned from the JVM.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum JavaValue {
    Object(Option<RawObject>),
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Void,
}
impl JavaValue {
    /// The zero value for a given kind, returned in place of a result when a call raised.
    pub fn null(kind: ReturnKind) -> JavaValue {
        match kind {
            ReturnKind::Object => JavaValue::Object(None),
            ReturnKind::Boolean => JavaValue::Boolean(false),
            ReturnKind::Byte => JavaValue::Byte(0),
            ReturnKind::Char => JavaValue::Char(0),
            ReturnKind::Short => JavaValue::Short(0),
            ReturnKind::Int => JavaValue::Int(0),
            ReturnKind::Long => JavaValue::Long(0),
            ReturnKind::Float => JavaValue::Float(0.0),
            ReturnKind::Double => JavaValue::Double(0.0),
            ReturnKind::Void => JavaValue::Void,
        }
    }

    pub fn kind(&self) -> ReturnKind {
        match self {
            JavaValue::Object(_) => ReturnKind::Object,
            JavaValue::Boolean(_) => ReturnKind::Boolean,
            JavaValue::Byte(_) => ReturnKind::Byte,
            JavaValue::Char(_) => ReturnKind::Char,
            JavaValue::Short(_) => ReturnKind::Short,
            JavaValue::Int(_) => ReturnKind::Int,
            JavaValue::Long(_) => ReturnKind::Long,
            JavaValue::Float(_) => ReturnKind::Float,
            JavaValue::Double(_) => ReturnKind::Double,
            JavaValue::Void => ReturnKind::Void,
        }
    }

    /// Returns the object reference, if this is an object value.
    pub fn object(self) -> Option<RawObject> {
        match self {
            JavaValue::Object(obj) => obj,
            _ => None,
        }
    }
    pub fn int(self) -> Option<i32> {
        match self {
            JavaValue::Int(v) => Some(v),
            _ => None,
        }
    }
    pub fn long(self) -> Option<i64> {
        match self {
            JavaValue::Long(v) => Some(v),
            _ => None,
        }
    }
    pub fn boolean(self) -> Option<bool> {
        match self {
            JavaValue::Boolean(v) => Some(v),
            _ => None,
        }
    }
}
impl From<RawObject> for JavaValue {
    fn from(obj: RawObject) -> Self {
        JavaValue::Object(Some(obj))
    }
}
impl From<Option<RawObject>> for JavaValue {
    fn from(obj: Option<RawObject>) -> Self {
        JavaValue::Object(obj)
    }
}

macro_rules! simple_value {
    ($(($rust_ty:ty, $variant:ident))*) => {$(
        impl From<$rust_ty> for JavaValue {
            fn from(v: $rust_ty) -> Self {
                JavaValue::$variant(v)
            }
        }
    )*}
}
simple_value! {
    (bool, Boolean)
    (i8, Byte)
    (u16, Char)
    (i16, Short)
    (i32, Int)
    (i64, Long)
    (f32, Float)
    (f64, Double)
}

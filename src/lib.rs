//! Hosts a Java VM, or attaches to the one that loaded this library, and calls into it over JNI.
//!
//! The [`Bridge`] is the per-VM context. It hands out a [`JniEnv`] for the current thread,
//! attaching the thread on first use and detaching it when the thread exits. Calls made through
//! a `JniEnv` resolve their class and member once, release their local references, and capture
//! any Java exception they raise instead of unwinding. Failures return `None`; the captured
//! exception and the thread's last fatal message can then be polled.
//!
//! ```rust,no_run
//! use jnibridge::{JavaValue, LocalScope};
//!
//! jnibridge::init_jvm(None).unwrap();
//! let env = jnibridge::env().unwrap();
//! let mut scope = LocalScope::new(env);
//! let millis = env.call_static_method(
//!     "java/lang/System", "currentTimeMillis", "()J", &[], &mut scope,
//! );
//! assert!(matches!(millis, Some(JavaValue::Long(_))));
//! ```

#![deny(unused_must_use)]

#[macro_use]
mod errors;

mod conversions;
mod diagnostics;
mod globals;
mod internal;
mod java_class;
mod jni_env;

/// The raw seam between the bridge and the JVM.
pub mod vm;

pub use conversions::{array_descriptor, FromJava, ToJava};
pub use diagnostics::{fatal_message, record_fatal, take_fatal, FatalMessage, ThreadSlots};
pub use errors::{Error, ErrorKind, Result};
pub use globals::{bridge, env, install};
pub use internal::onload::on_load;
pub use java_class::{
    binary_name, internal_name, FieldCache, JavaObject, MemberKind, MethodCache, Throwable,
};
pub use jni_env::{Bridge, BridgeConfig, JniEnv, LocalScope};
pub use vm::{init_jvm, init_jvm_with, JavaValue, RawObject, ReturnKind, VmOptions};

//! Class and member resolution, memoized for the lifetime of the bridge.

mod java_object;
mod member_cache;
mod throwable;

pub use java_object::JavaObject;
pub use member_cache::{FieldCache, MethodCache};
pub use throwable::Throwable;

use crate::{
    jni_env::{BridgeConfig, JniEnv, LocalScope},
    vm::{FieldId, JavaValue, MethodId, RawObject, ReturnKind},
};
use std::borrow::Cow;

const LOAD_CLASS: &str = "loadClass";
const LOAD_CLASS_SIG: &str = "(Ljava/lang/String;)Ljava/lang/Class;";

/// What kind of member a cache entry refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    StaticMethod,
    Field,
    StaticField,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct MemberKey {
    class: String,
    name: String,
    sig: String,
    kind: MemberKind,
}

#[derive(Copy, Clone, Debug)]
pub(crate) enum MemberId {
    Method(MethodId),
    Field(FieldId),
}

/// Converts a binary class name (`java.lang.String`) to a JNI internal name
/// (`java/lang/String`). Internal names and array descriptors are returned as-is.
pub fn internal_name(name: &str) -> Cow<'_, str> {
    if name.contains('.') && !name.starts_with('[') {
        Cow::Owned(name.replace('.', "/"))
    } else {
        Cow::Borrowed(name)
    }
}

/// Converts a JNI internal name to the binary name `ClassLoader.loadClass` expects.
pub fn binary_name(name: &str) -> String {
    name.replace('/', ".")
}

fn class_not_found(config: &BridgeConfig, name: &str) -> String {
    if name.starts_with(config.proxy_class_prefix.as_ref()) {
        format!(
            "Could not find class {name}. Helper classes under {} are loaded from \
             ~/{}; is it on the class path?",
            config.proxy_class_prefix, config.archive_name,
        )
    } else {
        format!("Could not find class {name}")
    }
}

impl<'a> JniEnv<'a> {
    /// Resolves a class by internal or binary name, returning a global reference owned by the
    /// bridge's class cache.
    ///
    /// Classes are loaded through the captured application class loader when there is one, so
    /// that classes outside the bootstrap class path resolve from any thread. Array descriptors,
    /// and every class before a loader is captured, go through `FindClass`.
    #[track_caller]
    pub fn resolve_class(&self, name: &str) -> Option<RawObject> {
        self.exception_reset();
        let name = internal_name(name);
        let classes = &self.bridge().0.classes;
        if let Some(class) = classes.get(name.as_ref()) {
            return Some(*class);
        }

        let local = match self.bridge().class_loader() {
            Some(loader) if !name.starts_with('[') => self.load_through(loader, &name),
            _ => self.find_bootstrap_class(&name),
        };
        let local = match local {
            Some(local) => local,
            None => {
                self.report(&class_not_found(self.bridge().config(), &name));
                return None;
            }
        };
        let global = self.new_global_ref(local);
        self.delete_local_ref(Some(local));
        let global = global?;

        let mut cached = global;
        classes.alter(name.into_owned(), |existing| match existing {
            Some(existing) => {
                cached = existing;
                Some(existing)
            }
            None => Some(global),
        });
        if cached != global {
            self.delete_global_ref(global);
        }
        Some(cached)
    }

    fn find_bootstrap_class(&self, name: &str) -> Option<RawObject> {
        let class = self.backend().find_class(self.raw(), name);
        if self.check_pending_exception().is_some() {
            self.delete_local_ref(class);
            return None;
        }
        class
    }

    fn load_through(&self, loader: RawObject, name: &str) -> Option<RawObject> {
        let method = self.load_class_method(loader)?;
        let mut scope = LocalScope::new(*self);
        let jname = scope.track_opt(self.backend().new_string(self.raw(), &binary_name(name)))?;
        let args = [JavaValue::Object(Some(jname))];
        self.call_method_id(loader, method, ReturnKind::Object, &args, &mut scope)?.object()
    }

    #[track_caller]
    fn load_class_method(&self, loader: RawObject) -> Option<MethodId> {
        let cell = &self.bridge().0.load_class_method;
        if let Some(method) = cell.get() {
            return Some(*method);
        }
        let mut scope = LocalScope::new(*self);
        let class = self.get_object_class(Some(loader), &mut scope)?;
        let method = self.method_id_in(class, LOAD_CLASS, LOAD_CLASS_SIG, false)?;
        Some(*cell.get_or_init(|| method))
    }

    /// Returns the context class loader of the current thread, or the system class loader if
    /// the thread has none, as a new global reference owned by the caller.
    pub(crate) fn context_class_loader(&self) -> Option<RawObject> {
        let mut scope = LocalScope::new(*self);
        let thread = self
            .call_static_method("java/lang/Thread", "currentThread", "()Ljava/lang/Thread;", &[], &mut scope)
            .and_then(JavaValue::object);
        let mut loader = match thread {
            Some(thread) => {
                scope.track(thread);
                self.call_method(
                    thread,
                    "java/lang/Thread",
                    "getContextClassLoader",
                    "()Ljava/lang/ClassLoader;",
                    &[],
                    &mut scope,
                )
                .and_then(JavaValue::object)
            }
            None => None,
        };
        if loader.is_none() {
            loader = self
                .call_static_method(
                    "java/lang/ClassLoader",
                    "getSystemClassLoader",
                    "()Ljava/lang/ClassLoader;",
                    &[],
                    &mut scope,
                )
                .and_then(JavaValue::object);
        }
        let loader = loader?;
        let global = self.new_global_ref(loader);
        self.delete_local_ref(Some(loader));
        global
    }

    /// Resolves a method id by class, name and signature. Resolved ids are cached by the bridge
    /// and never looked up again.
    #[track_caller]
    pub fn resolve_method(
        &self,
        class: &str,
        name: &str,
        sig: &str,
        is_static: bool,
    ) -> Option<MethodId> {
        let kind = if is_static { MemberKind::StaticMethod } else { MemberKind::Method };
        match self.resolve_member(class, name, sig, kind)? {
            MemberId::Method(method) => Some(method),
            MemberId::Field(_) => None,
        }
    }

    /// Resolves a field id by class, name and signature. Resolved ids are cached by the bridge
    /// and never looked up again.
    #[track_caller]
    pub fn resolve_field(
        &self,
        class: &str,
        name: &str,
        sig: &str,
        is_static: bool,
    ) -> Option<FieldId> {
        let kind = if is_static { MemberKind::StaticField } else { MemberKind::Field };
        match self.resolve_member(class, name, sig, kind)? {
            MemberId::Field(field) => Some(field),
            MemberId::Method(_) => None,
        }
    }

    #[track_caller]
    fn resolve_member(
        &self,
        class: &str,
        name: &str,
        sig: &str,
        kind: MemberKind,
    ) -> Option<MemberId> {
        let key = MemberKey {
            class: internal_name(class).into_owned(),
            name: name.to_string(),
            sig: sig.to_string(),
            kind,
        };
        let members = &self.bridge().0.members;
        if let Some(member) = members.get(&key) {
            return Some(*member);
        }

        let class_ref = self.resolve_class(class)?;
        let member = match kind {
            MemberKind::Method => MemberId::Method(self.method_id_in(class_ref, name, sig, false)?),
            MemberKind::StaticMethod => {
                MemberId::Method(self.method_id_in(class_ref, name, sig, true)?)
            }
            MemberKind::Field => MemberId::Field(self.field_id_in(class_ref, name, sig, false)?),
            MemberKind::StaticField => {
                MemberId::Field(self.field_id_in(class_ref, name, sig, true)?)
            }
        };
        members.insert(key, member);
        Some(member)
    }

    /// Looks a method id up on a class reference, without caching.
    #[track_caller]
    pub fn method_id_in(
        &self,
        class: RawObject,
        name: &str,
        sig: &str,
        is_static: bool,
    ) -> Option<MethodId> {
        let backend = self.backend();
        let method = if is_static {
            backend.get_static_method_id(self.raw(), class, name, sig)
        } else {
            backend.get_method_id(self.raw(), class, name, sig)
        };
        self.check_pending_exception();
        if method.is_none() {
            let what = if is_static { "static method" } else { "method" };
            self.report(&format!("Could not find {what} {name}{sig}"));
        }
        method
    }

    /// Looks a field id up on a class reference, without caching.
    #[track_caller]
    pub fn field_id_in(
        &self,
        class: RawObject,
        name: &str,
        sig: &str,
        is_static: bool,
    ) -> Option<FieldId> {
        let backend = self.backend();
        let field = if is_static {
            backend.get_static_field_id(self.raw(), class, name, sig)
        } else {
            backend.get_field_id(self.raw(), class, name, sig)
        };
        self.check_pending_exception();
        if field.is_none() {
            let what = if is_static { "static field" } else { "field" };
            self.report(&format!("Could not find {what} {name} {sig}"));
        }
        field
    }
}

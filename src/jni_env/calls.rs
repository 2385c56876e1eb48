//! The call relay: every call resolves its target, makes the raw call, releases the call's
//! local references and captures any exception the call raised.

use super::{JniEnv, LocalScope};
use crate::{
    java_class::{FieldCache, MethodCache},
    vm::{FieldId, JavaValue, MethodId, RawObject, ReturnKind},
};

fn field_kind(sig: &str) -> Option<ReturnKind> {
    match ReturnKind::from_signature(sig) {
        Some(ReturnKind::Void) | None => None,
        kind => kind,
    }
}

impl<'a> JniEnv<'a> {
    #[track_caller]
    fn return_kind(&self, sig: &str) -> Option<ReturnKind> {
        let kind = ReturnKind::from_signature(sig);
        if kind.is_none() {
            self.report(&format!("Invalid method signature: {sig}"));
        }
        kind
    }

    #[track_caller]
    fn field_kind(&self, sig: &str) -> Option<ReturnKind> {
        let kind = field_kind(sig);
        if kind.is_none() {
            self.report(&format!("Invalid field signature: {sig}"));
        }
        kind
    }

    /// Releases the call's locals and captures a raised exception. A call that raised yields
    /// `None`; its exception can be retrieved through [`JniEnv::take_pending_exception`].
    fn finish_call<T>(&self, value: T, scope: &mut LocalScope<'a>) -> Option<T> {
        scope.release();
        match self.check_pending_exception() {
            Some(_) => None,
            None => Some(value),
        }
    }

    /// Calls an instance method by class, name and signature.
    ///
    /// Arguments that are local references should be tracked by `scope`, which is released
    /// once the call returns. An object result is a new local reference owned by the caller.
    #[track_caller]
    pub fn call_method(
        &self,
        obj: RawObject,
        class: &str,
        name: &str,
        sig: &str,
        args: &[JavaValue],
        scope: &mut LocalScope<'a>,
    ) -> Option<JavaValue> {
        let kind = self.return_kind(sig)?;
        let method = match self.resolve_method(class, name, sig, false) {
            Some(method) => method,
            None => {
                scope.release();
                return None;
            }
        };
        self.call_method_id(obj, method, kind, args, scope)
    }

    /// Calls an instance method through an already resolved method id.
    pub fn call_method_id(
        &self,
        obj: RawObject,
        method: MethodId,
        kind: ReturnKind,
        args: &[JavaValue],
        scope: &mut LocalScope<'a>,
    ) -> Option<JavaValue> {
        let value = self.backend().call_method(self.env, obj, method, kind, args);
        self.finish_call(value, scope)
    }

    /// Calls a static method by class, name and signature.
    #[track_caller]
    pub fn call_static_method(
        &self,
        class: &str,
        name: &str,
        sig: &str,
        args: &[JavaValue],
        scope: &mut LocalScope<'a>,
    ) -> Option<JavaValue> {
        let kind = self.return_kind(sig)?;
        let resolved = self
            .resolve_class(class)
            .and_then(|class_ref| Some((class_ref, self.resolve_method(class, name, sig, true)?)));
        let (class_ref, method) = match resolved {
            Some(resolved) => resolved,
            None => {
                scope.release();
                return None;
            }
        };
        self.call_static_method_id(class_ref, method, kind, args, scope)
    }

    /// Calls a static method through an already resolved class and method id.
    pub fn call_static_method_id(
        &self,
        class: RawObject,
        method: MethodId,
        kind: ReturnKind,
        args: &[JavaValue],
        scope: &mut LocalScope<'a>,
    ) -> Option<JavaValue> {
        let value = self.backend().call_static_method(self.env, class, method, kind, args);
        self.finish_call(value, scope)
    }

    /// Calls an instance method whose id is memoized in a per-call-site cache. The id is looked
    /// up on the object's runtime class on first use.
    #[track_caller]
    pub fn call_method_cached(
        &self,
        obj: RawObject,
        name: &str,
        sig: &str,
        cache: &MethodCache,
        args: &[JavaValue],
        scope: &mut LocalScope<'a>,
    ) -> Option<JavaValue> {
        let kind = self.return_kind(sig)?;
        let method = cache.get_or_resolve(|| {
            let mut lookup = LocalScope::new(*self);
            let class = self.get_object_class(Some(obj), &mut lookup)?;
            self.method_id_in(class, name, sig, false)
        });
        match method {
            Some(method) => self.call_method_id(obj, method, kind, args, scope),
            None => {
                scope.release();
                None
            }
        }
    }

    /// Calls a static method whose id is memoized in a per-call-site cache.
    #[track_caller]
    pub fn call_static_method_cached(
        &self,
        class: RawObject,
        name: &str,
        sig: &str,
        cache: &MethodCache,
        args: &[JavaValue],
        scope: &mut LocalScope<'a>,
    ) -> Option<JavaValue> {
        let kind = self.return_kind(sig)?;
        match cache.get_or_resolve(|| self.method_id_in(class, name, sig, true)) {
            Some(method) => self.call_static_method_id(class, method, kind, args, scope),
            None => {
                scope.release();
                None
            }
        }
    }

    /// Constructs a new object. The result is a new local reference owned by the caller.
    #[track_caller]
    pub fn new_object(
        &self,
        class: &str,
        sig: &str,
        args: &[JavaValue],
        scope: &mut LocalScope<'a>,
    ) -> Option<RawObject> {
        let resolved = self
            .resolve_class(class)
            .and_then(|class_ref| Some((class_ref, self.resolve_method(class, "<init>", sig, false)?)));
        let (class_ref, ctor) = match resolved {
            Some(resolved) => resolved,
            None => {
                scope.release();
                return None;
            }
        };
        let obj = self.backend().new_object(self.env, class_ref, ctor, args);
        match self.finish_call(obj, scope) {
            Some(Some(obj)) => Some(obj),
            Some(None) => {
                self.report(&format!("Could not construct {class}"));
                None
            }
            None => None,
        }
    }

    /// Reads an instance field by class, name and signature.
    #[track_caller]
    pub fn get_field(
        &self,
        obj: RawObject,
        class: &str,
        name: &str,
        sig: &str,
    ) -> Option<JavaValue> {
        let kind = self.field_kind(sig)?;
        let field = self.resolve_field(class, name, sig, false)?;
        self.get_field_id(obj, field, kind)
    }

    pub fn get_field_id(&self, obj: RawObject, field: FieldId, kind: ReturnKind) -> Option<JavaValue> {
        let value = self.backend().get_field(self.env, obj, field, kind);
        self.finish_call(value, &mut LocalScope::new(*self))
    }

    /// Reads a static field by class, name and signature.
    #[track_caller]
    pub fn get_static_field(&self, class: &str, name: &str, sig: &str) -> Option<JavaValue> {
        let kind = self.field_kind(sig)?;
        let class_ref = self.resolve_class(class)?;
        let field = self.resolve_field(class, name, sig, true)?;
        self.get_static_field_id(class_ref, field, kind)
    }

    pub fn get_static_field_id(
        &self,
        class: RawObject,
        field: FieldId,
        kind: ReturnKind,
    ) -> Option<JavaValue> {
        let value = self.backend().get_static_field(self.env, class, field, kind);
        self.finish_call(value, &mut LocalScope::new(*self))
    }

    /// Reads an instance field whose id is memoized in a per-call-site cache.
    #[track_caller]
    pub fn get_field_cached(
        &self,
        obj: RawObject,
        name: &str,
        sig: &str,
        cache: &FieldCache,
    ) -> Option<JavaValue> {
        let kind = self.field_kind(sig)?;
        let field = cache.get_or_resolve(|| {
            let mut lookup = LocalScope::new(*self);
            let class = self.get_object_class(Some(obj), &mut lookup)?;
            self.field_id_in(class, name, sig, false)
        })?;
        self.get_field_id(obj, field, kind)
    }

    /// Reads a static field whose id is memoized in a per-call-site cache.
    #[track_caller]
    pub fn get_static_field_cached(
        &self,
        class: RawObject,
        name: &str,
        sig: &str,
        cache: &FieldCache,
    ) -> Option<JavaValue> {
        let kind = self.field_kind(sig)?;
        let field = cache.get_or_resolve(|| self.field_id_in(class, name, sig, true))?;
        self.get_static_field_id(class, field, kind)
    }
}

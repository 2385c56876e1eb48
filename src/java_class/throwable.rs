use super::JavaObject;
use crate::{
    jni_env::{JniEnv, LocalScope},
    vm::JavaValue,
};

const THROWABLE: &str = "java/lang/Throwable";

/// A captured `java.lang.Throwable`.
#[derive(Debug)]
pub struct Throwable(JavaObject);
impl From<JavaObject> for Throwable {
    fn from(obj: JavaObject) -> Self {
        Throwable(obj)
    }
}
impl Throwable {
    pub fn object(&self) -> &JavaObject {
        &self.0
    }
    pub fn into_inner(self) -> JavaObject {
        self.0
    }

    fn call_for_string(&self, env: JniEnv<'_>, class: &str, name: &str) -> Option<String> {
        let obj = self.0.as_raw()?;
        let mut scope = LocalScope::new(env);
        let value = env.call_method(obj, class, name, "()Ljava/lang/String;", &[], &mut scope)?;
        env.load(value.object(), true)
    }

    /// `getMessage()`.
    pub fn message(&self, env: JniEnv<'_>) -> Option<String> {
        self.call_for_string(env, THROWABLE, "getMessage")
    }

    /// `getLocalizedMessage()`.
    pub fn localized_message(&self, env: JniEnv<'_>) -> Option<String> {
        self.call_for_string(env, THROWABLE, "getLocalizedMessage")
    }

    /// The binary name of the throwable's runtime class.
    pub fn class_name(&self, env: JniEnv<'_>) -> Option<String> {
        let obj = self.0.as_raw()?;
        let mut scope = LocalScope::new(env);
        let class = env
            .call_method(obj, "java/lang/Object", "getClass", "()Ljava/lang/Class;", &[], &mut scope)?
            .object()?;
        scope.track(class);
        let name = env.call_method(
            class,
            "java/lang/Class",
            "getName",
            "()Ljava/lang/String;",
            &[],
            &mut scope,
        )?;
        env.load(name.object(), true)
    }

    /// The frames of `getStackTrace()`, each rendered with `toString()`.
    pub fn stack_trace(&self, env: JniEnv<'_>) -> Vec<String> {
        let obj = match self.0.as_raw() {
            Some(obj) => obj,
            None => return Vec::new(),
        };
        let mut scope = LocalScope::new(env);
        let trace = env
            .call_method(
                obj,
                THROWABLE,
                "getStackTrace",
                "()[Ljava/lang/StackTraceElement;",
                &[],
                &mut scope,
            )
            .and_then(JavaValue::object);
        let trace = match trace {
            Some(trace) => scope.track(trace),
            None => return Vec::new(),
        };
        env.array_map(trace, |frame| {
            let frame = frame?;
            let mut scope = LocalScope::new(env);
            let text = env.call_method(
                frame,
                "java/lang/Object",
                "toString",
                "()Ljava/lang/String;",
                &[],
                &mut scope,
            )?;
            env.load(text.object(), true)
        })
        .into_iter()
        .flatten()
        .collect()
    }

    /// Renders the throwable the way `printStackTrace` does: its class and message, followed by
    /// one indented line per frame.
    pub fn stack_trace_string(&self, env: JniEnv<'_>) -> Option<String> {
        let mut out = self.class_name(env)?;
        if let Some(message) = self.message(env) {
            out.push_str(": ");
            out.push_str(&message);
        }
        for frame in self.stack_trace(env) {
            out.push_str("\n\tat ");
            out.push_str(&frame);
        }
        Some(out)
    }

    /// `printStackTrace()`, writing to the JVM's standard error.
    pub fn print_stack_trace(&self, env: JniEnv<'_>) {
        if let Some(obj) = self.0.as_raw() {
            let mut scope = LocalScope::new(env);
            env.call_method(obj, THROWABLE, "printStackTrace", "()V", &[], &mut scope);
        }
    }
}

//! An in-memory JVM used to observe what the bridge does to the JVM.
#![allow(dead_code)]

use jnibridge::{
    vm::{EnvPtr, FieldId, JavaValue, JvmBackend, MethodId, RawObject, ReturnKind},
    Bridge, BridgeConfig, Error, Result, ThreadSlots,
};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    thread::{self, ThreadId},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RefKind {
    Local,
    Global,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Attach(ThreadId),
    Detach(ThreadId),
    NewGlobal { object: usize, handle: usize },
    DeleteGlobal { object: usize, handle: usize },
    DeleteLocal { object: usize, handle: usize },
    InvalidRelease(usize),
    FindClass(String),
    LoadClass(String),
    GetMethodId { class: String, name: String, sig: String },
    GetFieldId { class: String, name: String },
    Call { class: String, name: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum StubValue {
    Null,
    Void,
    Int(i32),
    Long(i64),
    Boolean(bool),
    Str(String),
    Object(usize),
}

#[derive(Clone, Debug)]
pub enum Behavior {
    Return(StubValue),
    Throw { class: String, message: String },
    /// Returns the first argument.
    Echo,
}

#[derive(Clone, Debug)]
enum Data {
    Plain,
    Str(String),
    Class(String),
    Array { element_class: String, items: Vec<Option<usize>> },
    Throwable { message: Option<String>, trace: Vec<String> },
}

#[derive(Clone, Debug)]
struct Object {
    class: String,
    data: Data,
}

#[derive(Clone, Debug)]
struct Member {
    class: String,
    name: String,
    sig: String,
}

type MemberKey = (String, String, String, bool);

#[derive(Default)]
struct State {
    next_id: usize,
    objects: HashMap<usize, Object>,
    refs: HashMap<usize, (usize, RefKind)>,
    class_objects: HashMap<String, usize>,
    supers: HashMap<String, String>,
    app_classes: HashSet<String>,
    methods: HashMap<MemberKey, usize>,
    method_defs: HashMap<usize, Member>,
    behaviors: HashMap<(String, String, String), Behavior>,
    fields: HashMap<MemberKey, usize>,
    field_values: HashMap<usize, StubValue>,
    envs: HashMap<ThreadId, usize>,
    pending: HashMap<usize, usize>,
    ops: Vec<Op>,
    loader: usize,
    thread_object: usize,
    context_loader: bool,
    attach_fails: bool,
    printed_traces: usize,
}

const OBJECT: &str = "java/lang/Object";

fn raw(handle: usize) -> RawObject {
    RawObject::from_raw(handle as *mut _).expect("handles are never zero")
}
fn handle(obj: RawObject) -> usize {
    obj.as_raw() as usize
}

fn element_class_of(descriptor: &str) -> String {
    let component = &descriptor[1..];
    match component.strip_prefix('L') {
        Some(rest) => rest.trim_end_matches(';').to_string(),
        None => component.to_string(),
    }
}

impl State {
    fn id(&mut self) -> usize {
        self.next_id += 0x10;
        0x1000 + self.next_id
    }

    fn new_object(&mut self, class: &str, data: Data) -> usize {
        let id = self.id();
        self.objects.insert(id, Object { class: class.to_string(), data });
        id
    }

    fn new_ref(&mut self, object: usize, kind: RefKind) -> usize {
        let handle = self.id();
        self.refs.insert(handle, (object, kind));
        handle
    }

    fn resolve_ref(&self, obj: RawObject) -> usize {
        match self.refs.get(&handle(obj)) {
            Some((object, _)) => *object,
            None => panic!("use of a released or unknown reference {:#x}", handle(obj)),
        }
    }

    fn class_object(&mut self, name: &str) -> usize {
        if let Some(id) = self.class_objects.get(name) {
            return *id;
        }
        let id = self.new_object("java/lang/Class", Data::Class(name.to_string()));
        self.class_objects.insert(name.to_string(), id);
        id
    }

    fn class_name(&self, class: RawObject) -> String {
        match &self.objects[&self.resolve_ref(class)].data {
            Data::Class(name) => name.clone(),
            other => panic!("not a class: {other:?}"),
        }
    }

    fn is_known_class(&self, name: &str) -> bool {
        name.starts_with('[') || self.supers.contains_key(name) || name == OBJECT
    }

    fn is_subclass(&self, class: &str, parent: &str) -> bool {
        let mut current = Some(class);
        while let Some(name) = current {
            if name == parent {
                return true;
            }
            current = self.supers.get(name).map(String::as_str);
        }
        parent == OBJECT
    }

    fn define_class(&mut self, name: &str, parent: &str) {
        self.supers.insert(name.to_string(), parent.to_string());
    }

    fn define_method(&mut self, class: &str, name: &str, sig: &str, is_static: bool) -> usize {
        let key = (class.to_string(), name.to_string(), sig.to_string(), is_static);
        if let Some(id) = self.methods.get(&key) {
            return *id;
        }
        let id = self.id();
        self.methods.insert(key, id);
        self.method_defs.insert(id, Member {
            class: class.to_string(),
            name: name.to_string(),
            sig: sig.to_string(),
        });
        id
    }

    fn lookup(&self, table: &HashMap<MemberKey, usize>, class: &str, name: &str, sig: &str, is_static: bool) -> Option<usize> {
        let mut current = Some(class);
        while let Some(class) = current {
            let key = (class.to_string(), name.to_string(), sig.to_string(), is_static);
            if let Some(id) = table.get(&key) {
                return Some(*id);
            }
            current = match self.supers.get(class) {
                Some(parent) => Some(parent.as_str()),
                None if class != OBJECT => Some(OBJECT),
                None => None,
            };
        }
        None
    }

    fn throw(&mut self, env: usize, class: &str, message: &str) {
        let trace = vec![format!("stub.Frame.call(Stub.java:{})", self.pending.len() + 1)];
        let obj = self.new_object(class, Data::Throwable {
            message: Some(message.to_string()),
            trace,
        });
        self.pending.insert(env, obj);
    }

    fn to_value(&mut self, value: StubValue, kind: ReturnKind) -> JavaValue {
        match value {
            StubValue::Null => JavaValue::null(kind),
            StubValue::Void => JavaValue::Void,
            StubValue::Int(v) => JavaValue::Int(v),
            StubValue::Long(v) => JavaValue::Long(v),
            StubValue::Boolean(v) => JavaValue::Boolean(v),
            StubValue::Str(s) => {
                let obj = self.new_object("java/lang/String", Data::Str(s));
                JavaValue::Object(Some(raw(self.new_ref(obj, RefKind::Local))))
            }
            StubValue::Object(obj) => {
                JavaValue::Object(Some(raw(self.new_ref(obj, RefKind::Local))))
            }
        }
    }

    fn builtin(&mut self, env: usize, member: &Member, this: Option<usize>, args: &[JavaValue]) -> Option<StubValue> {
        let arg_object = |state: &State, idx: usize| match args.get(idx) {
            Some(JavaValue::Object(Some(obj))) => Some(state.resolve_ref(*obj)),
            _ => None,
        };
        Some(match (member.class.as_str(), member.name.as_str()) {
            ("java/lang/ClassLoader", "loadClass") => {
                let name = match arg_object(self, 0).map(|id| &self.objects[&id].data) {
                    Some(Data::Str(name)) => name.replace('.', "/"),
                    _ => panic!("loadClass without a name"),
                };
                self.ops.push(Op::LoadClass(name.clone()));
                if self.is_known_class(&name) {
                    StubValue::Object(self.class_object(&name))
                } else {
                    self.throw(env, "java/lang/ClassNotFoundException", &name.replace('/', "."));
                    StubValue::Null
                }
            }
            ("java/lang/ClassLoader", "getSystemClassLoader") => StubValue::Object(self.loader),
            ("java/lang/Thread", "currentThread") => StubValue::Object(self.thread_object),
            ("java/lang/Thread", "getContextClassLoader") => match self.context_loader {
                true => StubValue::Object(self.loader),
                false => StubValue::Null,
            },
            ("java/lang/Object", "getClass") => {
                let class = self.objects[&this?].class.clone();
                StubValue::Object(self.class_object(&class))
            }
            ("java/lang/Class", "getName") => match &self.objects[&this?].data {
                Data::Class(name) => StubValue::Str(name.replace('/', ".")),
                _ => StubValue::Null,
            },
            ("java/lang/Throwable", "getMessage" | "getLocalizedMessage") => {
                match &self.objects[&this?].data {
                    Data::Throwable { message: Some(message), .. } => StubValue::Str(message.clone()),
                    _ => StubValue::Null,
                }
            }
            ("java/lang/Throwable", "getStackTrace") => {
                let trace = match &self.objects[&this?].data {
                    Data::Throwable { trace, .. } => trace.clone(),
                    _ => Vec::new(),
                };
                let items = trace
                    .into_iter()
                    .map(|line| Some(self.new_object("java/lang/StackTraceElement", Data::Str(line))))
                    .collect();
                StubValue::Object(self.new_object("[Ljava/lang/StackTraceElement;", Data::Array {
                    element_class: "java/lang/StackTraceElement".to_string(),
                    items,
                }))
            }
            ("java/lang/Throwable", "printStackTrace") => {
                self.printed_traces += 1;
                StubValue::Void
            }
            ("java/lang/Object", "toString") => {
                let this = this?;
                match &self.objects[&this].data {
                    Data::Str(s) => StubValue::Str(s.clone()),
                    _ => StubValue::Str(format!("{}@{:x}", self.objects[&this].class, this)),
                }
            }
            _ => return None,
        })
    }

    fn invoke(&mut self, env: usize, method: MethodId, this: Option<usize>, kind: ReturnKind, args: &[JavaValue]) -> JavaValue {
        let member = self.method_defs[&(method.as_raw() as usize)].clone();
        self.ops.push(Op::Call { class: member.class.clone(), name: member.name.clone() });
        if let Some(value) = self.builtin(env, &member, this, args) {
            return self.to_value(value, kind);
        }
        let key = (member.class.clone(), member.name.clone(), member.sig.clone());
        match self.behaviors.get(&key).cloned() {
            Some(Behavior::Return(value)) => self.to_value(value, kind),
            Some(Behavior::Echo) => match args.first() {
                Some(JavaValue::Object(Some(obj))) => {
                    let object = self.resolve_ref(*obj);
                    self.to_value(StubValue::Object(object), kind)
                }
                Some(other) => *other,
                None => JavaValue::null(kind),
            },
            Some(Behavior::Throw { class, message }) => {
                self.throw(env, &class, &message);
                JavaValue::null(kind)
            }
            None => JavaValue::null(kind),
        }
    }
}

/// An in-memory [`JvmBackend`] that records every reference and attachment operation.
pub struct StubJvm {
    state: Mutex<State>,
}

impl StubJvm {
    pub fn new() -> Arc<StubJvm> {
        let mut state = State { context_loader: true, ..State::default() };
        for (class, parent) in [
            ("java/lang/String", OBJECT),
            ("java/lang/Class", OBJECT),
            ("java/lang/Thread", OBJECT),
            ("java/lang/ClassLoader", OBJECT),
            ("java/lang/StackTraceElement", OBJECT),
            ("java/lang/Throwable", OBJECT),
            ("java/lang/Exception", "java/lang/Throwable"),
            ("java/lang/Error", "java/lang/Throwable"),
            ("java/lang/RuntimeException", "java/lang/Exception"),
            ("java/lang/IllegalStateException", "java/lang/RuntimeException"),
            ("java/lang/ArrayStoreException", "java/lang/RuntimeException"),
            ("java/lang/ClassNotFoundException", "java/lang/Exception"),
            ("java/lang/NoClassDefFoundError", "java/lang/Error"),
            ("java/lang/NoSuchMethodError", "java/lang/Error"),
            ("java/lang/NoSuchFieldError", "java/lang/Error"),
            ("stub/AppClassLoader", "java/lang/ClassLoader"),
        ] {
            state.define_class(class, parent);
        }
        for (class, name, sig, is_static) in [
            ("java/lang/ClassLoader", "loadClass", "(Ljava/lang/String;)Ljava/lang/Class;", false),
            ("java/lang/ClassLoader", "getSystemClassLoader", "()Ljava/lang/ClassLoader;", true),
            ("java/lang/Thread", "currentThread", "()Ljava/lang/Thread;", true),
            ("java/lang/Thread", "getContextClassLoader", "()Ljava/lang/ClassLoader;", false),
            ("java/lang/Object", "getClass", "()Ljava/lang/Class;", false),
            ("java/lang/Object", "toString", "()Ljava/lang/String;", false),
            ("java/lang/Object", "<init>", "()V", false),
            ("java/lang/Class", "getName", "()Ljava/lang/String;", false),
            ("java/lang/Throwable", "getMessage", "()Ljava/lang/String;", false),
            ("java/lang/Throwable", "getLocalizedMessage", "()Ljava/lang/String;", false),
            ("java/lang/Throwable", "getStackTrace", "()[Ljava/lang/StackTraceElement;", false),
            ("java/lang/Throwable", "printStackTrace", "()V", false),
        ] {
            state.define_method(class, name, sig, is_static);
        }
        state.loader = state.new_object("stub/AppClassLoader", Data::Plain);
        state.thread_object = state.new_object("java/lang/Thread", Data::Plain);
        Arc::new(StubJvm { state: Mutex::new(state) })
    }

    /// A bridge over this stub with its own diagnostics registry.
    pub fn bridge(self: &Arc<Self>) -> Bridge {
        Bridge::with_config(self.clone(), BridgeConfig::default(), ThreadSlots::new())
    }

    /// Defines a class visible to both `FindClass` and the class loader.
    pub fn define_class(&self, name: &str, parent: &str) {
        self.state.lock().define_class(name, parent);
    }

    /// Defines a class that only the application class loader can see.
    pub fn define_app_class(&self, name: &str, parent: &str) {
        let mut state = self.state.lock();
        state.define_class(name, parent);
        state.app_classes.insert(name.to_string());
    }

    pub fn define_method(&self, class: &str, name: &str, sig: &str, is_static: bool, behavior: Behavior) {
        let mut state = self.state.lock();
        state.define_method(class, name, sig, is_static);
        state.behaviors.insert((class.to_string(), name.to_string(), sig.to_string()), behavior);
    }

    pub fn define_field(&self, class: &str, name: &str, sig: &str, is_static: bool, value: StubValue) {
        let mut state = self.state.lock();
        let key = (class.to_string(), name.to_string(), sig.to_string(), is_static);
        let id = state.id();
        state.fields.insert(key, id);
        state.field_values.insert(id, value);
    }

    /// Creates an object and returns a new local reference to it.
    pub fn create_object(&self, class: &str) -> RawObject {
        let mut state = self.state.lock();
        let obj = state.new_object(class, Data::Plain);
        raw(state.new_ref(obj, RefKind::Local))
    }

    /// Raises an exception on the current thread, which must be attached.
    pub fn raise(&self, class: &str, message: &str) -> usize {
        let mut state = self.state.lock();
        let env = state.envs[&thread::current().id()];
        state.throw(env, class, message);
        state.pending[&env]
    }

    /// Marks the current thread as attached by the JVM itself.
    pub fn pretend_attached(&self) {
        let mut state = self.state.lock();
        let env = state.id();
        state.envs.insert(thread::current().id(), env);
    }

    pub fn set_attach_fails(&self, fails: bool) {
        self.state.lock().attach_fails = fails;
    }
    pub fn set_context_loader(&self, present: bool) {
        self.state.lock().context_loader = present;
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().ops.clone()
    }
    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }
    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.state.lock().ops.iter().filter(|op| pred(op)).count()
    }

    pub fn attached_threads(&self) -> usize {
        self.state.lock().envs.len()
    }
    pub fn printed_traces(&self) -> usize {
        self.state.lock().printed_traces
    }

    pub fn live_refs(&self, kind: RefKind) -> usize {
        self.state.lock().refs.values().filter(|(_, k)| *k == kind).count()
    }
    pub fn ref_kind(&self, obj: RawObject) -> Option<RefKind> {
        self.state.lock().refs.get(&handle(obj)).map(|(_, kind)| *kind)
    }
    pub fn object_of(&self, obj: RawObject) -> Option<usize> {
        self.state.lock().refs.get(&handle(obj)).map(|(object, _)| *object)
    }
    pub fn class_of(&self, obj: RawObject) -> Option<String> {
        let state = self.state.lock();
        let (object, _) = state.refs.get(&handle(obj))?;
        Some(state.objects[object].class.clone())
    }
    pub fn string_of(&self, obj: RawObject) -> Option<String> {
        let state = self.state.lock();
        let (object, _) = state.refs.get(&handle(obj))?;
        match &state.objects[object].data {
            Data::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
    pub fn message_of(&self, obj: RawObject) -> Option<String> {
        let state = self.state.lock();
        let (object, _) = state.refs.get(&handle(obj))?;
        match &state.objects[object].data {
            Data::Throwable { message, .. } => message.clone(),
            _ => None,
        }
    }
    pub fn array_items(&self, obj: RawObject) -> Option<Vec<Option<usize>>> {
        let state = self.state.lock();
        let (object, _) = state.refs.get(&handle(obj))?;
        match &state.objects[object].data {
            Data::Array { items, .. } => Some(items.clone()),
            _ => None,
        }
    }
}

impl JvmBackend for StubJvm {
    fn get_env(&self) -> Option<EnvPtr> {
        let state = self.state.lock();
        let env = state.envs.get(&thread::current().id())?;
        EnvPtr::from_raw(*env as *mut _)
    }

    fn attach_current_thread(&self) -> Result<EnvPtr> {
        let mut state = self.state.lock();
        if state.attach_fails {
            return Err(Error::attach("the stub refuses to attach"));
        }
        let env = state.id();
        let thread = thread::current().id();
        state.envs.insert(thread, env);
        state.ops.push(Op::Attach(thread));
        EnvPtr::from_raw(env as *mut _).ok_or_else(|| Error::attach("null env"))
    }

    fn detach_current_thread(&self, env: EnvPtr) -> Result<()> {
        let mut state = self.state.lock();
        let env = env.as_raw() as usize;
        let thread = state.envs.iter().find(|(_, e)| **e == env).map(|(t, _)| *t);
        match thread {
            Some(thread) => {
                state.envs.remove(&thread);
                state.pending.remove(&env);
                state.ops.push(Op::Detach(thread));
                Ok(())
            }
            None => Err(Error::attach("detaching a thread that is not attached")),
        }
    }

    fn exception_check(&self, env: EnvPtr) -> bool {
        self.state.lock().pending.contains_key(&(env.as_raw() as usize))
    }
    fn exception_occurred(&self, env: EnvPtr) -> Option<RawObject> {
        let mut state = self.state.lock();
        let thrown = *state.pending.get(&(env.as_raw() as usize))?;
        Some(raw(state.new_ref(thrown, RefKind::Local)))
    }
    fn exception_clear(&self, env: EnvPtr) {
        self.state.lock().pending.remove(&(env.as_raw() as usize));
    }
    fn exception_describe(&self, _env: EnvPtr) {}

    fn new_global_ref(&self, _env: EnvPtr, obj: RawObject) -> Option<RawObject> {
        let mut state = self.state.lock();
        let object = state.resolve_ref(obj);
        let handle = state.new_ref(object, RefKind::Global);
        state.ops.push(Op::NewGlobal { object, handle });
        Some(raw(handle))
    }
    fn delete_global_ref(&self, _env: EnvPtr, obj: RawObject) {
        let mut state = self.state.lock();
        let handle = handle(obj);
        match state.refs.get(&handle) {
            Some((object, RefKind::Global)) => {
                let object = *object;
                state.refs.remove(&handle);
                state.ops.push(Op::DeleteGlobal { object, handle });
            }
            _ => state.ops.push(Op::InvalidRelease(handle)),
        }
    }
    fn new_local_ref(&self, _env: EnvPtr, obj: RawObject) -> Option<RawObject> {
        let mut state = self.state.lock();
        let object = state.resolve_ref(obj);
        Some(raw(state.new_ref(object, RefKind::Local)))
    }
    fn delete_local_ref(&self, _env: EnvPtr, obj: RawObject) {
        let mut state = self.state.lock();
        let handle = handle(obj);
        match state.refs.get(&handle) {
            Some((object, RefKind::Local)) => {
                let object = *object;
                state.refs.remove(&handle);
                state.ops.push(Op::DeleteLocal { object, handle });
            }
            _ => state.ops.push(Op::InvalidRelease(handle)),
        }
    }
    fn is_same_object(&self, _env: EnvPtr, a: Option<RawObject>, b: Option<RawObject>) -> bool {
        let state = self.state.lock();
        a.map(|a| state.resolve_ref(a)) == b.map(|b| state.resolve_ref(b))
    }

    fn find_class(&self, env: EnvPtr, name: &str) -> Option<RawObject> {
        let mut state = self.state.lock();
        state.ops.push(Op::FindClass(name.to_string()));
        if state.is_known_class(name) && !state.app_classes.contains(name) {
            let class = state.class_object(name);
            Some(raw(state.new_ref(class, RefKind::Local)))
        } else {
            state.throw(env.as_raw() as usize, "java/lang/NoClassDefFoundError", name);
            None
        }
    }
    fn get_object_class(&self, _env: EnvPtr, obj: RawObject) -> Option<RawObject> {
        let mut state = self.state.lock();
        let object = state.resolve_ref(obj);
        let class = state.objects[&object].class.clone();
        let class = state.class_object(&class);
        Some(raw(state.new_ref(class, RefKind::Local)))
    }

    fn get_method_id(&self, env: EnvPtr, class: RawObject, name: &str, sig: &str) -> Option<MethodId> {
        self.method_id(env, class, name, sig, false)
    }
    fn get_static_method_id(&self, env: EnvPtr, class: RawObject, name: &str, sig: &str) -> Option<MethodId> {
        self.method_id(env, class, name, sig, true)
    }
    fn get_field_id(&self, env: EnvPtr, class: RawObject, name: &str, sig: &str) -> Option<FieldId> {
        self.field_id(env, class, name, sig, false)
    }
    fn get_static_field_id(&self, env: EnvPtr, class: RawObject, name: &str, sig: &str) -> Option<FieldId> {
        self.field_id(env, class, name, sig, true)
    }

    fn call_method(&self, env: EnvPtr, obj: RawObject, method: MethodId, kind: ReturnKind, args: &[JavaValue]) -> JavaValue {
        let mut state = self.state.lock();
        let this = state.resolve_ref(obj);
        state.invoke(env.as_raw() as usize, method, Some(this), kind, args)
    }
    fn call_static_method(&self, env: EnvPtr, _class: RawObject, method: MethodId, kind: ReturnKind, args: &[JavaValue]) -> JavaValue {
        let mut state = self.state.lock();
        state.invoke(env.as_raw() as usize, method, None, kind, args)
    }
    fn new_object(&self, env: EnvPtr, class: RawObject, ctor: MethodId, args: &[JavaValue]) -> Option<RawObject> {
        let mut state = self.state.lock();
        let class = state.class_name(class);
        state.invoke(env.as_raw() as usize, ctor, None, ReturnKind::Void, args);
        if state.pending.contains_key(&(env.as_raw() as usize)) {
            return None;
        }
        let obj = state.new_object(&class, Data::Plain);
        Some(raw(state.new_ref(obj, RefKind::Local)))
    }

    fn get_field(&self, _env: EnvPtr, _obj: RawObject, field: FieldId, kind: ReturnKind) -> JavaValue {
        let mut state = self.state.lock();
        let value = state.field_values[&(field.as_raw() as usize)].clone();
        state.to_value(value, kind)
    }
    fn get_static_field(&self, env: EnvPtr, class: RawObject, field: FieldId, kind: ReturnKind) -> JavaValue {
        self.get_field(env, class, field, kind)
    }

    fn new_string(&self, _env: EnvPtr, value: &str) -> Option<RawObject> {
        let mut state = self.state.lock();
        let obj = state.new_object("java/lang/String", Data::Str(value.to_string()));
        Some(raw(state.new_ref(obj, RefKind::Local)))
    }
    fn get_string(&self, _env: EnvPtr, obj: RawObject) -> Option<String> {
        let state = self.state.lock();
        match &state.objects[&state.resolve_ref(obj)].data {
            Data::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn get_array_length(&self, _env: EnvPtr, array: RawObject) -> i32 {
        let state = self.state.lock();
        match &state.objects[&state.resolve_ref(array)].data {
            Data::Array { items, .. } => items.len() as i32,
            _ => 0,
        }
    }
    fn new_object_array(&self, _env: EnvPtr, len: i32, element_class: RawObject, init: Option<RawObject>) -> Option<RawObject> {
        let mut state = self.state.lock();
        let element_class = state.class_name(element_class);
        let init = init.map(|init| state.resolve_ref(init));
        let descriptor = jnibridge::array_descriptor(&element_class);
        let obj = state.new_object(&descriptor, Data::Array {
            element_class,
            items: vec![init; len as usize],
        });
        Some(raw(state.new_ref(obj, RefKind::Local)))
    }
    fn get_object_array_element(&self, _env: EnvPtr, array: RawObject, index: i32) -> Option<RawObject> {
        let mut state = self.state.lock();
        let item = match &state.objects[&state.resolve_ref(array)].data {
            Data::Array { items, .. } => items[index as usize],
            _ => None,
        };
        item.map(|item| raw(state.new_ref(item, RefKind::Local)))
    }
    fn set_object_array_element(&self, env: EnvPtr, array: RawObject, index: i32, value: Option<RawObject>) {
        let mut state = self.state.lock();
        let array = state.resolve_ref(array);
        let value = value.map(|value| state.resolve_ref(value));
        let element_class = match &state.objects[&array].data {
            Data::Array { element_class, .. } => element_class.clone(),
            _ => panic!("not an array"),
        };
        if let Some(value) = value {
            let class = state.objects[&value].class.clone();
            if !state.is_subclass(&class, &element_class) {
                state.throw(env.as_raw() as usize, "java/lang/ArrayStoreException", &class);
                return;
            }
        }
        if let Some(Object { data: Data::Array { items, .. }, .. }) = state.objects.get_mut(&array) {
            items[index as usize] = value;
        }
    }
}

impl StubJvm {
    fn method_id(&self, env: EnvPtr, class: RawObject, name: &str, sig: &str, is_static: bool) -> Option<MethodId> {
        let mut state = self.state.lock();
        let class = state.class_name(class);
        state.ops.push(Op::GetMethodId { class: class.clone(), name: name.to_string(), sig: sig.to_string() });
        match state.lookup(&state.methods, &class, name, sig, is_static) {
            Some(id) => MethodId::from_raw(id as *mut _),
            None => {
                state.throw(env.as_raw() as usize, "java/lang/NoSuchMethodError", name);
                None
            }
        }
    }

    fn field_id(&self, env: EnvPtr, class: RawObject, name: &str, sig: &str, is_static: bool) -> Option<FieldId> {
        let mut state = self.state.lock();
        let class = state.class_name(class);
        state.ops.push(Op::GetFieldId { class: class.clone(), name: name.to_string() });
        match state.lookup(&state.fields, &class, name, sig, is_static) {
            Some(id) => FieldId::from_raw(id as *mut _),
            None => {
                state.throw(env.as_raw() as usize, "java/lang/NoSuchFieldError", name);
                None
            }
        }
    }
}

mod calls;
mod exceptions;
mod local_scope;

pub use local_scope::LocalScope;

use crate::{
    diagnostics::ThreadSlots,
    internal::thread_exit,
    java_class::{MemberId, MemberKey},
    vm::{EnvPtr, JvmBackend, RawObject},
};
use chashmap::CHashMap;
use once_cell::sync::OnceCell;
use std::{
    borrow::Cow,
    marker::PhantomData,
    panic::Location,
    sync::{Arc, Weak},
    thread::{self, JoinHandle, ThreadId},
};

/// Settings that shape the bridge's diagnostics.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// The internal-name prefix of the helper proxy classes shipped alongside the native
    /// library. Failing to find a class under this prefix adds a hint about the class path.
    pub proxy_class_prefix: Cow<'static, str>,
    /// The name of the archive, expected in the user's home directory, that provides the
    /// proxy classes.
    pub archive_name: Cow<'static, str>,
}
impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            proxy_class_prefix: Cow::Borrowed("org/jnibridge/"),
            archive_name: Cow::Borrowed(".jnibridge.jar"),
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct CachedEnv {
    env: EnvPtr,
    /// Whether the bridge attached this thread itself, and hence must detach it.
    owned: bool,
}

pub(crate) struct BridgeInner {
    owner_id: usize,
    backend: Arc<dyn JvmBackend>,
    config: BridgeConfig,
    slots: Arc<ThreadSlots>,
    envs: CHashMap<ThreadId, CachedEnv>,
    pub(crate) class_loader: OnceCell<RawObject>,
    pub(crate) load_class_method: OnceCell<crate::vm::MethodId>,
    pub(crate) classes: CHashMap<String, RawObject>,
    pub(crate) members: CHashMap<MemberKey, MemberId>,
}

/// The bridge context: one per VM, shared by every thread calling into it.
///
/// This is a cheap handle; clones refer to the same context.
#[derive(Clone)]
pub struct Bridge(pub(crate) Arc<BridgeInner>);
impl Bridge {
    /// Creates a bridge over a backend, with the default configuration and the process-wide
    /// diagnostics registry.
    pub fn new(backend: impl JvmBackend) -> Bridge {
        Bridge::from_shared(Arc::new(backend))
    }

    /// Creates a bridge over a shared backend.
    pub fn from_shared(backend: Arc<dyn JvmBackend>) -> Bridge {
        Bridge::with_config(backend, BridgeConfig::default(), ThreadSlots::global())
    }

    /// Creates a bridge with an explicit configuration and diagnostics registry.
    pub fn with_config(
        backend: Arc<dyn JvmBackend>,
        config: BridgeConfig,
        slots: Arc<ThreadSlots>,
    ) -> Bridge {
        Bridge(Arc::new(BridgeInner {
            owner_id: thread_exit::next_owner_id(),
            backend,
            config,
            slots,
            envs: CHashMap::new(),
            class_loader: OnceCell::new(),
            load_class_method: OnceCell::new(),
            classes: CHashMap::new(),
            members: CHashMap::new(),
        }))
    }

    pub fn backend(&self) -> &dyn JvmBackend {
        &*self.0.backend
    }
    pub fn config(&self) -> &BridgeConfig {
        &self.0.config
    }
    pub fn slots(&self) -> &Arc<ThreadSlots> {
        &self.0.slots
    }

    /// Returns the JNI environment of the current thread, attaching the thread on first use.
    ///
    /// Returns `None` if the thread could not be attached; the failure is recorded as the
    /// thread's fatal message.
    #[track_caller]
    pub fn env(&self) -> Option<JniEnv<'_>> {
        let env = self.env_ptr()?;
        Some(JniEnv { bridge: self, env, thread: thread::current().id(), _not_send: PhantomData })
    }

    /// Returns the raw environment pointer of the current thread, attaching on first use.
    #[track_caller]
    pub fn env_ptr(&self) -> Option<EnvPtr> {
        if thread_exit::thread_exiting() {
            // nothing would detach an attachment made now
            return self.0.backend.get_env();
        }
        let thread = thread::current().id();
        if let Some(cached) = self.0.envs.get(&thread) {
            return Some(cached.env);
        }

        let cached = match self.0.backend.get_env() {
            Some(env) => CachedEnv { env, owned: false },
            None => match self.0.backend.attach_current_thread() {
                Ok(env) => CachedEnv { env, owned: true },
                Err(e) => {
                    self.0.slots.record_fatal(
                        format!("Could not attach to background jvm: {}", e.description()),
                        Location::caller(),
                    );
                    return None;
                }
            },
        };
        self.cache_env(thread, cached);
        Some(cached.env)
    }

    /// Records the environment of a thread that was attached by the JVM itself, such as the
    /// thread running `JNI_OnLoad`. The bridge never detaches such threads.
    pub fn adopt_current_thread(&self, env: EnvPtr) {
        let thread = thread::current().id();
        if !self.0.envs.contains_key(&thread) {
            self.cache_env(thread, CachedEnv { env, owned: false });
        }
    }

    fn cache_env(&self, thread: ThreadId, cached: CachedEnv) {
        self.0.envs.insert(thread, cached);
        let weak: Weak<BridgeInner> = Arc::downgrade(&self.0);
        let backend = self.0.backend.clone();
        thread_exit::register(self.0.owner_id, move || match weak.upgrade() {
            Some(inner) => Bridge(inner).on_thread_exit(thread),
            None if cached.owned => detach(&*backend, cached.env, thread),
            None => {}
        });
        log::debug!(
            "{} thread {:?}. {} threads known to the bridge",
            if cached.owned { "Attached" } else { "Adopted" },
            thread,
            self.0.envs.len(),
        );
    }

    fn on_thread_exit(&self, thread: ThreadId) {
        let cached = match self.0.envs.remove(&thread) {
            Some(cached) => cached,
            None => return,
        };
        if let Some(exception) = self.0.slots.take_pending_exception(thread) {
            self.0.backend.delete_global_ref(cached.env, exception);
        }
        if cached.owned {
            detach(&*self.0.backend, cached.env, thread);
        }
    }

    /// Releases a global reference from the current thread. Returns `false` if no environment
    /// could be obtained and the reference leaked.
    pub(crate) fn release_global(&self, global: RawObject) -> bool {
        let released = if thread_exit::thread_exiting() {
            self.0.with_transient_env(|env| self.0.backend.delete_global_ref(env, global))
        } else {
            self.env_ptr().map(|env| self.0.backend.delete_global_ref(env, global))
        };
        released.is_some()
    }

    /// Returns the number of threads with a cached environment.
    pub fn attached_threads(&self) -> usize {
        self.0.envs.len()
    }

    /// Captures the class loader used to resolve application classes, from the current thread's
    /// context class loader. Returns whether a loader is available afterwards.
    #[track_caller]
    pub fn capture_class_loader(&self) -> bool {
        if self.0.class_loader.get().is_some() {
            return true;
        }
        let env = match self.env() {
            Some(env) => env,
            None => return false,
        };
        match env.context_class_loader() {
            Some(loader) => {
                if self.0.class_loader.set(loader).is_err() {
                    env.delete_global_ref(loader);
                }
                true
            }
            None => {
                env.report("Could not capture the context class loader");
                false
            }
        }
    }

    /// Returns the captured application class loader, if any.
    pub fn class_loader(&self) -> Option<RawObject> {
        self.0.class_loader.get().copied()
    }

    /// Runs a closure on a new OS thread. The thread attaches on first use and detaches when the
    /// closure returns.
    pub fn background<F>(&self, func: F) -> JoinHandle<()>
    where F: FnOnce(JniEnv<'_>) + Send + 'static {
        let bridge = self.clone();
        thread::spawn(move || match bridge.env() {
            Some(env) => func(env),
            None => log::error!("background task could not obtain a JNI environment"),
        })
    }

    /// Records a fatal message for the current thread.
    #[track_caller]
    pub fn record_fatal(&self, message: impl Into<String>) {
        self.0.slots.record_fatal(message, Location::caller())
    }

    /// Takes the fatal message recorded for the current thread, formatted with its location.
    pub fn take_fatal(&self) -> Option<String> {
        self.0.slots.take_fatal(thread::current().id()).map(|fatal| fatal.to_string())
    }

    /// Returns the fatal message recorded for the current thread without clearing it.
    pub fn fatal_message(&self) -> Option<String> {
        self.0.slots.fatal_message(thread::current().id()).map(|fatal| fatal.to_string())
    }
}

fn detach(backend: &dyn JvmBackend, env: EnvPtr, thread: ThreadId) {
    match backend.detach_current_thread(env) {
        Ok(()) => log::debug!("Detached thread {thread:?}"),
        Err(e) => log::error!("Error detaching thread {thread:?}: {e}"),
    }
}

impl BridgeInner {
    /// Runs a closure with the current thread's environment without caching it. A thread that
    /// is not attached is attached for the duration of the closure only.
    fn with_transient_env<R>(&self, func: impl FnOnce(EnvPtr) -> R) -> Option<R> {
        if let Some(env) = self.backend.get_env() {
            return Some(func(env));
        }
        let env = match self.backend.attach_current_thread() {
            Ok(env) => env,
            Err(e) => {
                log::error!("Could not attach a thread to release references: {e}");
                return None;
            }
        };
        let result = func(env);
        if let Err(e) = self.backend.detach_current_thread(env) {
            log::error!("Error detaching a temporarily attached thread: {e}");
        }
        Some(result)
    }
}
impl Drop for BridgeInner {
    fn drop(&mut self) {
        let mut globals: Vec<RawObject> =
            std::mem::take(&mut self.classes).into_iter().map(|(_, class)| class).collect();
        globals.extend(self.class_loader.take());
        if globals.is_empty() {
            return;
        }
        let backend = &*self.backend;
        let released = self.with_transient_env(|env| {
            for global in &globals {
                backend.delete_global_ref(env, *global);
            }
        });
        if released.is_none() {
            log::warn!("Leaking {} global references held by a dropped bridge", globals.len());
        }
    }
}

/// The JNI environment of the current thread, bound to its [`Bridge`].
///
/// This is `Copy` but neither `Send` nor `Sync`: an environment is only valid on the thread it
/// was obtained on.
#[derive(Copy, Clone)]
pub struct JniEnv<'a> {
    bridge: &'a Bridge,
    env: EnvPtr,
    thread: ThreadId,
    _not_send: PhantomData<*const ()>,
}
impl<'a> JniEnv<'a> {
    pub fn bridge(&self) -> &'a Bridge {
        self.bridge
    }
    pub fn raw(&self) -> EnvPtr {
        self.env
    }
    pub fn thread(&self) -> ThreadId {
        self.thread
    }
    pub(crate) fn backend(&self) -> &'a dyn JvmBackend {
        &*self.bridge.0.backend
    }

    /// Promotes a reference to a global reference.
    pub fn new_global_ref(&self, obj: RawObject) -> Option<RawObject> {
        self.backend().new_global_ref(self.env, obj)
    }
    pub fn delete_global_ref(&self, obj: RawObject) {
        self.backend().delete_global_ref(self.env, obj)
    }
    /// Creates a new local reference. The caller owns it.
    pub fn new_local_ref(&self, obj: RawObject) -> Option<RawObject> {
        self.backend().new_local_ref(self.env, obj)
    }
    /// Releases a local reference. Null references are ignored.
    pub fn delete_local_ref(&self, obj: Option<RawObject>) {
        if let Some(obj) = obj {
            self.backend().delete_local_ref(self.env, obj)
        }
    }
    pub fn is_same_object(&self, a: Option<RawObject>, b: Option<RawObject>) -> bool {
        self.backend().is_same_object(self.env, a, b)
    }

    /// Returns the class of an object as a local reference tracked by `scope`.
    #[track_caller]
    pub fn get_object_class(
        &self,
        obj: Option<RawObject>,
        scope: &mut LocalScope<'a>,
    ) -> Option<RawObject> {
        self.exception_reset();
        let obj = match obj {
            Some(obj) => obj,
            None => {
                self.report("GetObjectClass with nil object");
                return None;
            }
        };
        match self.backend().get_object_class(self.env, obj) {
            Some(class) => Some(scope.track(class)),
            None => {
                self.report("GetObjectClass returns nil class");
                None
            }
        }
    }
}

//! Creating a JVM from inside a native process.

use crate::{
    diagnostics::{self, ThreadSlots},
    globals,
    jni_env::{Bridge, BridgeConfig},
    Error, Result,
};
use std::{borrow::Cow, path::PathBuf, sync::Arc};

#[cfg(windows)]
const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_SEPARATOR: char = ':';

/// The options a JVM is created with.
///
/// Explicit options are passed through as-is. Otherwise the options put the helper archive from
/// the user's home directory on the class path, followed by the entries of `CLASSPATH`, and
/// append the same path to the boot class path.
#[derive(Clone, Debug, Default)]
pub struct VmOptions {
    explicit: Option<Vec<String>>,
    archive_name: Option<Cow<'static, str>>,
}
impl VmOptions {
    pub fn new() -> Self {
        VmOptions::default()
    }

    /// Uses exactly the given options.
    pub fn explicit(options: Vec<String>) -> Self {
        VmOptions { explicit: Some(options), archive_name: None }
    }

    /// Overrides the name of the helper archive looked up in the home directory.
    pub fn archive_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.archive_name = Some(name.into());
        self
    }

    /// Returns the options to create the VM with, reading the process environment.
    pub fn resolve(&self) -> Vec<String> {
        self.resolve_with(|var| std::env::var(var).ok())
    }

    /// Returns the options to create the VM with, reading environment variables through `lookup`.
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        if let Some(explicit) = &self.explicit {
            return explicit.clone();
        }
        let default_name = BridgeConfig::default().archive_name;
        let archive_name: &str = self.archive_name.as_deref().unwrap_or(&default_name);

        let home = lookup("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir);
        let archive = match home {
            Some(home) => home.join(archive_name).display().to_string(),
            None => archive_name.to_string(),
        };

        let mut class_path = archive;
        if let Some(extra) = lookup("CLASSPATH").filter(|cp| !cp.is_empty()) {
            class_path.push(PATH_SEPARATOR);
            class_path.push_str(&extra);
        }
        // threads attached from native code do not see the application class path
        vec![format!("-Djava.class.path={class_path}"), format!("-Xbootclasspath/a:{class_path}")]
    }
}

/// Creates the process's JVM and installs the process-wide bridge over it.
///
/// Passing `None` uses the default options described on [`VmOptions`]. On Android the VM is
/// always provided by the runtime, and this does nothing. A second call fails, as does any
/// failure to create the VM; failures are also recorded as the thread's fatal message.
#[track_caller]
pub fn init_jvm(options: Option<Vec<String>>) -> Result<()> {
    let options = match options {
        Some(options) => VmOptions::explicit(options),
        None => VmOptions::new(),
    };
    init_jvm_with(options, BridgeConfig::default())
}

/// Like [`init_jvm`], with explicit option and bridge settings.
#[track_caller]
pub fn init_jvm_with(options: VmOptions, config: BridgeConfig) -> Result<()> {
    if cfg!(target_os = "android") {
        return Ok(());
    }
    let result = start(options, config);
    if let Err(e) = &result {
        diagnostics::record_error(e);
    }
    result
}

#[track_caller]
fn start(options: VmOptions, config: BridgeConfig) -> Result<()> {
    if globals::bridge().is_some() {
        return Err(Error::init("JVM can only be initialised once"));
    }
    let options = options.resolve();
    log::debug!("Creating JVM with options {options:?}");
    let backend = create_vm(&options)?;

    let bridge = Bridge::with_config(Arc::new(backend), config, ThreadSlots::global());
    if !bridge.capture_class_loader() {
        log::warn!("No class loader captured; classes resolve through the bootstrap path");
    }
    globals::install(bridge)
}

#[cfg(feature = "invocation")]
#[track_caller]
fn create_vm(options: &[String]) -> Result<super::JniBackend> {
    use jni::{InitArgsBuilder, JNIVersion, JavaVM};

    let mut args = InitArgsBuilder::new().version(JNIVersion::V8).ignore_unrecognized(false);
    for option in options {
        args = args.option(option.as_str());
    }
    let args = args.build().map_err(|e| Error::init(format!("Invalid JVM options: {e}")))?;
    let vm = JavaVM::new(args)
        .map_err(|e| Error::init(format!("JNI_CreateJavaVM failed: {e}")))?;
    Ok(super::JniBackend::new(vm))
}

#[cfg(not(feature = "invocation"))]
#[track_caller]
fn create_vm(_options: &[String]) -> Result<super::JniBackend> {
    Err(Error::init("jnibridge was built without the `invocation` feature"))
}

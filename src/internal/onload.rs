use super::panicking::ffi_boundary;
use crate::{
    diagnostics, globals,
    jni_env::Bridge,
    vm::{JniBackend, JvmBackend},
    Error, Result,
};
use jni::sys;

/// Sets up the process-wide bridge from the VM that loaded this library, returning the JNI
/// version to report back to it.
///
/// Libraries that export `JNI_OnLoad` themselves should call this from it.
pub fn on_load(vm: *mut sys::JavaVM) -> sys::jint {
    ffi_boundary("JNI_OnLoad", sys::JNI_ERR, || {
        let result = unsafe { load(vm) };
        if let Err(e) = &result {
            diagnostics::record_error(e);
        }
        result
    })
}

unsafe fn load(vm: *mut sys::JavaVM) -> Result<sys::jint> {
    if globals::bridge().is_some() {
        log::warn!("JNI_OnLoad called with a bridge already installed; keeping the existing one");
        return Ok(sys::JNI_VERSION_1_6);
    }

    let backend = JniBackend::from_raw(vm)?;
    let env = backend
        .get_env()
        .ok_or_else(|| Error::attach("Unable to get initial JNIEnv"))?;
    let bridge = Bridge::new(backend);
    bridge.adopt_current_thread(env);
    if !bridge.capture_class_loader() {
        log::warn!("No class loader captured; classes resolve through the bootstrap path");
    }
    globals::install(bridge)?;
    Ok(sys::JNI_VERSION_1_6)
}

#[cfg(feature = "onload")]
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn JNI_OnLoad(vm: *mut sys::JavaVM, _reserved: *mut std::ffi::c_void) -> sys::jint {
    on_load(vm)
}

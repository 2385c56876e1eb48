use crate::{jni_env::Bridge, Error, Result};
use once_cell::sync::OnceCell;

static BRIDGE: OnceCell<Bridge> = OnceCell::new();

/// Installs the process-wide bridge. Only the first installation succeeds.
#[track_caller]
pub fn install(bridge: Bridge) -> Result<()> {
    match BRIDGE.set(bridge) {
        Ok(()) => Ok(()),
        Err(_) => Err(Error::init("A JVM bridge is already installed in this process")),
    }
}

/// Returns the process-wide bridge, once installed.
pub fn bridge() -> Option<&'static Bridge> {
    BRIDGE.get()
}

/// Returns the current thread's environment on the process-wide bridge.
#[track_caller]
pub fn env() -> Option<crate::JniEnv<'static>> {
    bridge()?.env()
}

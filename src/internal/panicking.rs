use crate::errors::*;
use std::{any::Any, panic::AssertUnwindSafe};

#[inline(never)]
#[cold]
fn get_panic_string(e: Box<dyn Any + Send + 'static>) -> String {
    if e.downcast_ref::<String>().is_some() {
        match e.downcast::<String>() {
            Ok(s) => *s,
            Err(_) => "error retrieving string???".to_string(),
        }
    } else if let Some(s) = e.downcast_ref::<&'static str>() {
        s.to_string()
    } else {
        "could not retrieve panic data".to_string()
    }
}

#[inline(never)]
#[cold]
pub fn panic_abort(e: Box<dyn Any + Send + 'static>) -> ! {
    std::panic::catch_unwind(AssertUnwindSafe(|| {
        log::error!("Panic encountered in jnibridge internal code: {}", get_panic_string(e));
    }))
    .ok();
    std::process::abort();
}

pub fn catch_panic<R>(func: impl FnOnce() -> R) -> Result<R> {
    match std::panic::catch_unwind(AssertUnwindSafe(func)) {
        Ok(v) => Ok(v),
        Err(e) => Err(Error::panicked(get_panic_string(e))),
    }
}

/// Runs a function called from the JVM, making sure neither an error nor a panic unwinds across
/// the FFI boundary. Errors are logged and mapped to `on_error`.
pub fn ffi_boundary<R>(what: &str, on_error: R, func: impl FnOnce() -> Result<R>) -> R {
    // for safety, in case logging the error itself panics
    match std::panic::catch_unwind(AssertUnwindSafe(|| match catch_panic(func) {
        Ok(Ok(v)) => v,
        Ok(Err(e)) | Err(e) => {
            log::error!("{what} failed: {e}");
            on_error
        }
    })) {
        Ok(v) => v,
        Err(e) => panic_abort(e),
    }
}

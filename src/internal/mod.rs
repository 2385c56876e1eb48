pub mod onload;
pub mod panicking;
pub mod thread_exit;

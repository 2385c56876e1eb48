use backtrace::Backtrace;
use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
    panic::Location,
};
use thiserror::Error;

// internal reexports
pub use std::{error::Error as ErrorTrait, result::Result as StdResult};

/// The error type used for `jnibridge`.
///
/// This error does not implement [`Error`](`ErrorTrait`) to allow a `From` implementation for any
/// standard error.
#[derive(Debug)]
pub struct Error(Box<ErrorData>);

#[derive(Debug)]
struct ErrorData {
    location: &'static Location<'static>,
    data: ErrorType,
    backtrace: Option<Backtrace>,
}

/// The broad category of an [`struct@Error`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Creating the VM or attaching a thread to it failed.
    Attach,
    /// The one-per-process initialization could not be completed.
    Init,
    /// A JNI function was missing or returned an unexpected null.
    Jni,
    /// An internal error, or an error wrapped from another library.
    Internal,
    /// Rust code panicked.
    Panicking,
}

#[derive(Error, Debug)]
enum ErrorType {
    #[error("Internal error: {0}")]
    Wrapped(#[source] Box<dyn ErrorTrait + 'static>),
    #[error("Internal error: {0}")]
    Error(Cow<'static, str>),
    #[error("{0}")]
    Message(Cow<'static, str>),
    #[error("Could not attach to the JVM: {0}")]
    Attach(Cow<'static, str>),
    #[error("JVM initialization failed: {0}")]
    Init(Cow<'static, str>),
    #[error("JNI call failed: {0}")]
    Jni(Cow<'static, str>),
    #[error("Rust code panicked: {0}")]
    Panicking(Cow<'static, str>),
}
impl ErrorType {
    fn kind(&self) -> ErrorKind {
        match self {
            ErrorType::Wrapped(_) | ErrorType::Error(_) | ErrorType::Message(_) => {
                ErrorKind::Internal
            }
            ErrorType::Attach(_) => ErrorKind::Attach,
            ErrorType::Init(_) => ErrorKind::Init,
            ErrorType::Jni(_) => ErrorKind::Jni,
            ErrorType::Panicking(_) => ErrorKind::Panicking,
        }
    }
    fn wants_backtrace(&self) -> bool {
        matches!(self, ErrorType::Wrapped(_) | ErrorType::Error(_))
    }
    fn is_validation_message(&self) -> bool {
        matches!(self, ErrorType::Message(_))
    }
}

impl Error {
    #[inline(never)]
    #[track_caller]
    fn raw_new(tp: ErrorType) -> Self {
        let backtrace = if tp.wants_backtrace() { Some(Backtrace::new_unresolved()) } else { None };
        Error(Box::new(ErrorData { location: Location::caller(), data: tp, backtrace }))
    }

    /// Creates a new `Error` with an internal error message.
    #[inline(never)]
    #[track_caller]
    pub fn new(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::raw_new(ErrorType::Error(msg.into()))
    }

    /// Creates a new `Error` with an error message.
    ///
    /// Unlike [`Error::new`], this does not record a backtrace or a location in its display.
    #[inline(never)]
    #[track_caller]
    pub fn message(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::raw_new(ErrorType::Message(msg.into()))
    }

    /// Creates a new `Error` for a failed VM creation or thread attachment.
    #[inline(never)]
    #[track_caller]
    pub fn attach(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::raw_new(ErrorType::Attach(msg.into()))
    }

    /// Creates a new `Error` for a failed initialization.
    #[inline(never)]
    #[track_caller]
    pub fn init(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::raw_new(ErrorType::Init(msg.into()))
    }

    /// Creates a new `Error` for a JNI function that misbehaved.
    #[inline(never)]
    #[track_caller]
    pub fn jni(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::raw_new(ErrorType::Jni(msg.into()))
    }

    /// Creates a new `Error` from a Rust panic.
    #[inline(never)]
    #[track_caller]
    pub(crate) fn panicked(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::raw_new(ErrorType::Panicking(msg.into()))
    }

    /// Wraps any error in an `Error`.
    #[inline(never)]
    #[track_caller]
    pub fn wrap<T: ErrorTrait + 'static>(err: T) -> Self {
        Self::raw_new(ErrorType::Wrapped(Box::new(err)))
    }

    /// Catches a panic and converts it to an `Error`.
    pub fn catch_panic<R>(func: impl FnOnce() -> R) -> Result<R> {
        crate::internal::panicking::catch_panic(func)
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.0.data.kind()
    }

    /// Returns the source location this error was created at.
    pub fn location(&self) -> &'static Location<'static> {
        self.0.location
    }

    /// Returns the cause of this error.
    pub fn source(&self) -> Option<&(dyn ErrorTrait + 'static)> {
        ErrorTrait::source(&self.0.data)
    }

    /// Returns the backtrace for this error, resolving symbols on first use.
    pub fn backtrace(&mut self) -> Option<&Backtrace> {
        let bt = self.0.backtrace.as_mut()?;
        bt.resolve();
        Some(bt)
    }

    /// Returns the message of this error without its location.
    pub fn description(&self) -> String {
        self.0.data.to_string()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.data.is_validation_message() {
            Display::fmt(&self.0.data, f)
        } else {
            write!(
                f,
                "{} (at {}:{})",
                self.0.data,
                self.0.location.file(),
                self.0.location.line()
            )
        }
    }
}
impl<T: ErrorTrait + 'static> From<T> for Error {
    #[track_caller]
    fn from(t: T) -> Self {
        Error::wrap(t)
    }
}

/// The result type used for `jnibridge`.
pub type Result<T> = StdResult<T, Error>;

/// Returns from the current function with an internal [`struct@Error`].
///
/// This requires the function return a [`Result`], and uses the same format as [`format!`].
#[macro_export]
macro_rules! jni_bail {
    ($($tt:tt)*) => {
        return ::std::result::Result::Err($crate::Error::new(::std::format!($($tt)*)))
    }
}

/// Returns from the current function with an internal [`struct@Error`], if a precondition fails.
///
/// This requires the function return a [`Result`], and uses the same format as [`assert!`].
#[macro_export]
macro_rules! jni_assert {
    ($condition:expr, $($tt:tt)*) => {
        if !$condition {
            $crate::jni_bail!($($tt)*)
        }
    }
}

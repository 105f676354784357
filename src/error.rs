#[cfg(target_os = "windows")]
use windows::core::Error as WinError;

// Represents every fault the dispatch layer can signal.
//
// Component methods return these immediately at the point of detection. While a
// registered handler is running, the fault boundary in `fault` is the single
// place that catches them, shows them to the user and decides whether the
// process (or just a worker thread) goes down.
#[derive(Debug, Clone)]
pub enum PlatformError {
    /// Invalid call ordering, such as creating a window twice or registering a
    /// handler after creation.
    Logic(String),
    /// A required argument was missing or out of range (no parent handle, a zero
    /// dialog resource id, an unsupported text encoding, ...).
    InvalidArgument(String),
    /// An OS call failed; `code` is the raw `GetLastError()` value.
    System { context: String, code: u32 },
    /// Generic failure that fits no other category.
    Runtime(String),
    /// An error originating from the `windows` crate bindings.
    #[cfg(target_os = "windows")]
    Win32(WinError),
}

impl PlatformError {
    pub fn logic(msg: impl Into<String>) -> Self {
        PlatformError::Logic(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        PlatformError::InvalidArgument(msg.into())
    }

    pub fn system(context: impl Into<String>, code: u32) -> Self {
        PlatformError::System {
            context: context.into(),
            code,
        }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        PlatformError::Runtime(msg.into())
    }

    /// The OS error code attached to this fault, if any.
    pub fn system_code(&self) -> Option<u32> {
        match self {
            PlatformError::System { code, .. } => Some(*code),
            #[cfg(target_os = "windows")]
            PlatformError::Win32(e) => Some(e.code().0 as u32),
            _ => None,
        }
    }
}

#[cfg(target_os = "windows")]
impl From<WinError> for PlatformError {
    fn from(err: WinError) -> Self {
        PlatformError::Win32(err)
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::Logic(s) => write!(f, "Logic error: {s}"),
            PlatformError::InvalidArgument(s) => write!(f, "Invalid argument: {s}"),
            PlatformError::System { context, code } => {
                write!(f, "{context} (system error {code})")
            }
            PlatformError::Runtime(s) => write!(f, "Runtime error: {s}"),
            #[cfg(target_os = "windows")]
            PlatformError::Win32(e) => write!(f, "Win32 Error: {e}"),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(target_os = "windows")]
            PlatformError::Win32(e) => Some(e),
            _ => None,
        }
    }
}

/// A specialized `Result` type for dispatch layer operations.
pub type Result<T> = std::result::Result<T, PlatformError>;

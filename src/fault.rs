/*
 * The fault boundary. Every user handler runs inside `catch_all`, which is the
 * single place where a `PlatformError` (or a panic) escaping a handler is
 * caught, classified, shown to the user through a `FaultSink`, and optionally
 * turned into a quit request for the UI thread.
 */

use crate::error::{PlatformError, Result as PlatformResult};
use crate::host::FaultSink;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

// Exit code requested from the message loop when a UI-thread handler faults.
pub const FAULT_EXIT_CODE: i32 = -1;

/// What happens after a fault has been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPolicy {
    /// UI thread: ask the message loop to quit.
    PostQuit,
    /// Detached worker: the thread ends, the process carries on.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    System,
    Runtime,
    InvalidArgument,
    Logic,
    Unknown,
}

impl FaultKind {
    pub fn title(self) -> &'static str {
        match self {
            FaultKind::System => "System exception",
            FaultKind::Runtime => "Runtime exception",
            FaultKind::InvalidArgument => "Invalid argument exception",
            FaultKind::Logic => "Logic exception",
            FaultKind::Unknown => "Unknown exception",
        }
    }
}

pub fn classify(err: &PlatformError) -> FaultKind {
    match err {
        PlatformError::System { .. } => FaultKind::System,
        #[cfg(target_os = "windows")]
        PlatformError::Win32(_) => FaultKind::System,
        PlatformError::Runtime(_) => FaultKind::Runtime,
        PlatformError::InvalidArgument(_) => FaultKind::InvalidArgument,
        PlatformError::Logic(_) => FaultKind::Logic,
    }
}

fn alert_body(err: &PlatformError) -> String {
    match err {
        PlatformError::System { context, code } => format!("[{code} 0x{code:02x}] {context}"),
        #[cfg(target_os = "windows")]
        PlatformError::Win32(e) => {
            let code = e.code().0 as u32;
            format!("[{code} 0x{code:02x}] {}", e.message())
        }
        PlatformError::Runtime(s) | PlatformError::InvalidArgument(s) | PlatformError::Logic(s) => {
            s.clone()
        }
    }
}

fn panic_body(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("An unknown exception was thrown: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("An unknown exception was thrown: {s}")
    } else {
        "An unknown exception was thrown.".to_string()
    }
}

/*
 * Runs `func`, returning its value. Any fault it produces is reported to `sink`
 * and yields `None`; under `FaultPolicy::PostQuit` a quit is also requested.
 */
pub fn catch_all<S, R>(
    sink: &S,
    policy: FaultPolicy,
    func: impl FnOnce() -> PlatformResult<R>,
) -> Option<R>
where
    S: FaultSink + ?Sized,
{
    let (kind, body) = match catch_unwind(AssertUnwindSafe(func)) {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(err)) => (classify(&err), alert_body(&err)),
        Err(payload) => (FaultKind::Unknown, panic_body(payload.as_ref())),
    };

    log::error!("FaultBoundary: {} caught: {body}", kind.title());
    sink.alert(kind.title(), &body);
    if policy == FaultPolicy::PostQuit {
        sink.request_quit(FAULT_EXIT_CODE);
    }
    None
}

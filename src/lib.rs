/*
 * Public entry point of the winlambda crate: lambda-based Win32 message
 * dispatch. Closures are registered per message, per `WM_COMMAND` id and per
 * `WM_NOTIFY` (id, code) pair on a window, dialog or subclassed control, and a
 * single trampoline per kind routes OS callbacks to them through a fault
 * boundary. `window_kinds` and `dialog_kinds` package the usual main, modal
 * and modeless windows on top of that.
 *
 * Everything that does not touch the OS (handler tables, dispatch, lifecycle,
 * owner side-tables, fault classification, message loops driven through the
 * `WindowHost` trait, utilities) compiles and is tested on every target. The
 * Win32 binding lives in `win32_host`, which is only built on Windows.
 */
pub mod base_dialog;
pub mod base_window;
pub mod dialog_kinds;
pub mod error;
pub mod fault;
pub mod host;
pub mod main_loop;
pub(crate) mod msg_handler;
pub mod native_control;
pub(crate) mod registry;
pub(crate) mod store;
#[cfg(test)]
pub(crate) mod test_support;
pub mod types;
pub mod utils;
#[cfg(target_os = "windows")]
pub mod win32_host;
pub mod window_kinds;

pub use base_dialog::{BaseDialog, dialog_proc};
pub use base_window::{BaseWindow, RegisteredClass, WindowRef, window_proc};
pub use dialog_kinds::{DialogMain, DialogMainSetup, DialogModal, DialogModeless, DialogSetup};
pub use error::{PlatformError, Result as PlatformResult};
pub use fault::{FAULT_EXIT_CODE, FaultKind, FaultPolicy, catch_all};
pub use host::{FaultSink, LogFaultSink, MessageTransport, WindowHost, default_fault_sink};
pub use main_loop::{MainLoop, run_modal_loop};
pub use msg_handler::{UiThreadHandle, run_thread_detached, run_thread_detached_with};
pub use native_control::{BaseNativeControl, subclass_proc};
pub use types::{
    ControlRequest, CreateWindowRequest, DialogRequest, Lifecycle, NotifyKey, RawParams,
    WindowClass, WindowHandle,
};
#[cfg(target_os = "windows")]
pub use win32_host::Win32Host;
pub use window_kinds::{
    ClassSetup, WindowControl, WindowControlSetup, WindowMain, WindowMainSetup, WindowModal,
    WindowModalSetup, WindowModeless, WindowModelessSetup,
};

/*
 * The windowing subsystem collaborator. The dispatch layer never calls the OS
 * directly; it goes through a `WindowHost`, which on Windows is the zero-sized
 * `Win32Host` backed by the `windows` crate. A host is responsible for routing
 * OS callbacks into the crate's trampolines (`base_window::window_proc`,
 * `base_dialog::dialog_proc`, `native_control::subclass_proc`), synchronously,
 * the way the OS window manager does.
 */

use crate::error::Result as PlatformResult;
use crate::types::{
    ControlRequest, CreateWindowRequest, DialogRequest, Pumped, QueuedMessage, RawParams,
    WindowClass, WindowHandle,
};

use std::ffi::c_void;
use std::sync::Arc;

/// Where the fault boundary reports caught faults.
pub trait FaultSink {
    /// Shows a blocking alert to the user.
    fn alert(&self, title: &str, body: &str);
    /// Asks the UI thread's message loop to terminate with `exit_code`.
    fn request_quit(&self, exit_code: i32);
}

/// Synchronous cross-thread message delivery. Implementations block until the
/// window's thread has processed the message.
pub trait MessageTransport: Send + Sync {
    fn send_message(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize;
}

pub trait WindowHost: FaultSink {
    fn default_window_proc(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize;

    fn default_subclass_proc(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize;

    /// Registers `class` under `name` with the crate's window trampoline as its
    /// procedure. Fails with the OS error code, including "already exists".
    fn register_class(&self, class: &WindowClass, name: &str) -> PlatformResult<u16>;

    /// Checks that a class of this name is registered for the class's instance.
    fn class_exists(&self, class: &WindowClass, name: &str) -> PlatformResult<()>;

    /// Creates a window; `create_params` must reach the window trampoline as the
    /// leading field of the `WM_NCCREATE` creation structure.
    fn create_window(
        &self,
        request: &CreateWindowRequest,
        create_params: *mut c_void,
    ) -> PlatformResult<WindowHandle>;

    /// Creates a modeless dialog; `owner_token` must reach the dialog trampoline
    /// as the `lparam` of `WM_INITDIALOG`.
    fn create_dialog(
        &self,
        request: &DialogRequest,
        owner_token: isize,
    ) -> PlatformResult<WindowHandle>;

    /// Runs a modal dialog, blocking until it is closed.
    fn dialog_box(&self, request: &DialogRequest, owner_token: isize) -> PlatformResult<isize>;

    fn set_ui_font_on_children(&self, dialog: WindowHandle);

    fn dialog_item(&self, parent: WindowHandle, ctrl_id: i32) -> PlatformResult<WindowHandle>;

    fn create_control(
        &self,
        parent: WindowHandle,
        request: &ControlRequest,
    ) -> PlatformResult<WindowHandle>;

    /// Installs the crate's subclass trampoline with `subclass_id` as both the
    /// subclass id and its reference data.
    fn install_subclass(&self, hwnd: WindowHandle, subclass_id: usize) -> PlatformResult<()>;

    fn remove_subclass(&self, hwnd: WindowHandle, subclass_id: usize);

    /// Blocks until the next queued message or the quit request arrives.
    fn next_message(&self) -> PlatformResult<Pumped>;

    fn root_ancestor(&self, hwnd: WindowHandle) -> WindowHandle;

    fn is_child(&self, parent: WindowHandle, child: WindowHandle) -> bool;

    fn is_dialog_message(&self, dialog: WindowHandle, msg: &QueuedMessage) -> bool;

    fn translate_accelerator(&self, hwnd: WindowHandle, accel: usize, msg: &QueuedMessage)
    -> bool;

    fn translate_and_dispatch(&self, msg: &QueuedMessage);

    fn transport(&self) -> Arc<dyn MessageTransport>;

    /// Same-thread synchronous send.
    fn send_message(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize;

    /// Shows the window with the given show command and paints it at once.
    fn show_window(&self, hwnd: WindowHandle, cmd_show: i32) -> PlatformResult<()>;

    fn enable_window(&self, hwnd: WindowHandle, enable: bool);

    fn destroy_window(&self, hwnd: WindowHandle);

    fn end_dialog(&self, dialog: WindowHandle, result: isize);

    /// The owner window, or the null handle.
    fn window_owner(&self, hwnd: WindowHandle) -> WindowHandle;

    fn focused(&self) -> WindowHandle;

    fn set_focus(&self, hwnd: WindowHandle);

    /// First child of `hwnd` in tab order, or the null handle.
    fn first_tab_item(&self, hwnd: WindowHandle) -> WindowHandle;

    fn screen_size(&self) -> (i32, i32);

    /// Loads accelerator table resource `resource_id`, returning its raw handle.
    fn load_accelerators(&self, instance: usize, resource_id: i32) -> PlatformResult<usize>;
}

/// Portable sink: faults are logged, quit requests are only recorded in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFaultSink;

impl FaultSink for LogFaultSink {
    fn alert(&self, title: &str, body: &str) {
        log::error!("{title}: {body}");
    }

    fn request_quit(&self, exit_code: i32) {
        log::warn!("LogFaultSink: quit requested with exit code {exit_code}, no message loop to stop.");
    }
}

/// The sink used by detached worker threads when none is given explicitly.
pub fn default_fault_sink() -> Arc<dyn FaultSink + Send + Sync> {
    #[cfg(target_os = "windows")]
    {
        Arc::new(crate::win32_host::Win32Host)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Arc::new(LogFaultSink)
    }
}

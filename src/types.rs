/*
 * Core data types shared by the dispatch layer and its host implementations:
 * opaque handles, the raw parameter pair every handler receives, handler
 * table keys, the `#[repr(C)]` mirrors of the few OS structures the trampolines
 * read, the lifecycle state machine, and the plain configuration structs used
 * to request classes, windows, dialogs and controls from a host.
 *
 * Message constants are plain `u32` values so this module compiles on every
 * target; on Windows they are checked against the `windows` crate in tests.
 */

use std::ffi::c_void;

pub const WM_CREATE: u32 = 0x0001;
pub const WM_DESTROY: u32 = 0x0002;
pub const WM_ACTIVATE: u32 = 0x0006;
pub const WM_SETFOCUS: u32 = 0x0007;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_NOTIFY: u32 = 0x004E;
pub const WM_NCCREATE: u32 = 0x0081;
pub const WM_NCDESTROY: u32 = 0x0082;
pub const WM_INITDIALOG: u32 = 0x0110;
pub const WM_COMMAND: u32 = 0x0111;
pub const WM_APP: u32 = 0x8000;

// Private message used to tunnel closures from worker threads into the UI thread.
pub(crate) const WM_UI_THREAD: u32 = WM_APP + 0x3FFF;
pub(crate) const UI_THREAD_MAGIC: usize = 0xc0de_f00d;

// Sent by modeless windows and dialogs to their owner so the main message loop
// can route dialog navigation to them. `wparam` carries `MODELESS_MAGIC`,
// `lparam` the modeless handle.
pub const WM_MODELESS_CREATED: u32 = WM_APP + 0x3FFD;
pub const WM_MODELESS_DESTROYED: u32 = WM_APP + 0x3FFE;
pub(crate) const MODELESS_MAGIC: usize = UI_THREAD_MAGIC;

pub const IDCANCEL: isize = 2;
pub const SW_SHOWNORMAL: i32 = 1;

pub const CS_DBLCLKS: u32 = 0x0008;
pub const COLOR_WINDOW: usize = 5;
pub const COLOR_BTNFACE: usize = 15;

pub const WS_EX_DLGMODALFRAME: u32 = 0x0000_0001;
pub const WS_EX_TOOLWINDOW: u32 = 0x0000_0080;

pub const WS_TABSTOP: u32 = 0x0001_0000;
pub const WS_GROUP: u32 = 0x0002_0000;
pub const WS_SYSMENU: u32 = 0x0008_0000;
pub const WS_BORDER: u32 = 0x0080_0000;
pub const WS_CAPTION: u32 = 0x00C0_0000;
pub const WS_CLIPCHILDREN: u32 = 0x0200_0000;
pub const WS_CLIPSIBLINGS: u32 = 0x0400_0000;
pub const WS_VISIBLE: u32 = 0x1000_0000;
pub const WS_CHILD: u32 = 0x4000_0000;

pub(crate) const ERROR_CLASS_ALREADY_EXISTS: u32 = 1410;

// An opaque OS handle for a window, dialog or control. Zero is the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub(crate) usize);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub const fn from_raw(raw: usize) -> Self {
        WindowHandle(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

// The raw (word-sized, long-sized) parameter pair delivered with every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawParams {
    pub wparam: usize,
    pub lparam: isize,
}

impl RawParams {
    pub const fn new(wparam: usize, lparam: isize) -> Self {
        Self { wparam, lparam }
    }
}

/// Key of the notification table: the originating control id and the
/// (usually negative) notification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotifyKey {
    pub id_from: usize,
    pub code: i32,
}

impl NotifyKey {
    pub const fn new(id_from: usize, code: i32) -> Self {
        Self { id_from, code }
    }
}

// Layout mirror of the OS notification header (`NMHDR`) pointed to by the
// `lparam` of `WM_NOTIFY`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NotifyHeader {
    pub hwnd_from: usize,
    pub id_from: usize,
    pub code: u32,
}

// Layout mirror of the leading field of `CREATESTRUCTW`, which is all the window
// trampoline needs from the `lparam` of `WM_NCCREATE`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CreateParamsHeader {
    pub create_params: *mut c_void,
}

/// Lifecycle of every window, dialog and control wrapper. Transitions only go
/// forward: `Uncreated -> Live -> Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Uncreated,
    Live,
    Destroyed,
}

// A message pulled from the thread queue by a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedMessage {
    pub hwnd: WindowHandle,
    pub msg: u32,
    pub params: RawParams,
}

// Outcome of a single blocking queue read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pumped {
    Message(QueuedMessage),
    Quit(i32),
}

/*
 * Window class description, passed to `BaseWindow::register_class`.
 * Handle-typed fields (icon, cursor, brush) hold raw handle values; zero means
 * "none" and lets the host pick its default (the arrow cursor, for instance).
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowClass {
    pub class_name: Option<String>,
    pub style: u32,
    pub cls_extra: i32,
    pub wnd_extra: i32,
    pub instance: usize,
    pub icon: usize,
    pub cursor: usize,
    pub background_brush: usize,
    pub small_icon: usize,
}

impl WindowClass {
    /// Deterministic class name derived from every class field, so two wrappers
    /// with identical class setups share one registered class.
    pub fn generated_name(&self) -> String {
        format!(
            "WNDCLASS.{:x}.{:x}.{:x}.{:x}.{:x}.{:x}.{:x}.{:x}",
            self.style,
            self.cls_extra,
            self.wnd_extra,
            self.instance,
            self.icon,
            self.cursor,
            self.background_brush,
            self.small_icon
        )
    }

    pub fn resolved_name(&self) -> String {
        match &self.class_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.generated_name(),
        }
    }
}

// Parameters for creating a top-level or child window of a registered class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWindowRequest {
    pub class_name: String,
    pub title: Option<String>,
    pub parent: Option<WindowHandle>,
    pub menu: usize,
    pub instance: usize,
    pub position: (i32, i32),
    pub size: (i32, i32),
    pub ex_style: u32,
    pub style: u32,
}

impl Default for CreateWindowRequest {
    fn default() -> Self {
        Self {
            class_name: String::new(),
            title: None,
            parent: None,
            menu: 0,
            instance: 0,
            position: (0, 0),
            size: (500, 400),
            ex_style: 0,
            style: 0,
        }
    }
}

// Parameters for loading a dialog from a resource template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialogRequest {
    pub instance: usize,
    pub parent: Option<WindowHandle>,
    pub resource_id: i32,
}

// Parameters for creating a native child control.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlRequest {
    pub class_name: String,
    pub title: Option<String>,
    pub ctrl_id: i32,
    pub position: (i32, i32),
    pub size: (i32, i32),
    pub style: u32,
    pub ex_style: u32,
}

#[inline]
pub fn loword(value: usize) -> u16 {
    (value & 0xFFFF) as u16
}

#[inline]
pub fn hiword(value: usize) -> u16 {
    ((value >> 16) & 0xFFFF) as u16
}

/*
 * The Win32 implementation of `WindowHost`. `Win32Host` is zero-sized: all
 * state lives in the OS and in the crate's side-tables, so any number of
 * copies can be handed out, including across threads as a `MessageTransport`
 * or fault sink.
 *
 * The three `extern "system"` functions below are the only procedures the OS
 * ever sees; they convert the native arguments and forward to the portable
 * trampolines in `base_window`, `base_dialog` and `native_control`.
 */

use crate::base_dialog::dialog_proc;
use crate::base_window::window_proc;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::host::{FaultSink, MessageTransport, WindowHost};
use crate::native_control::subclass_proc;
use crate::types::{
    ControlRequest, CreateWindowRequest, DialogRequest, Pumped, QueuedMessage, RawParams,
    WindowClass, WindowHandle,
};

use windows::{
    Win32::{
        Foundation::{GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
        Graphics::Gdi::{CreateFontIndirectW, HBRUSH, HFONT, UpdateWindow},
        System::LibraryLoader::GetModuleHandleW,
        UI::Input::KeyboardAndMouse::{EnableWindow, GetFocus, SetFocus},
        UI::Shell::{DefSubclassProc, RemoveWindowSubclass, SetWindowSubclass},
        UI::WindowsAndMessaging::{
            CreateDialogParamW, CreateWindowExW, DefWindowProcW, DestroyWindow, DialogBoxParamW,
            DispatchMessageW, EndDialog, EnumChildWindows, GA_ROOT, GW_OWNER, GetAncestor,
            GetClassInfoExW, GetDlgItem, GetMessageW, GetNextDlgTabItem, GetSystemMetrics,
            GetWindow, HACCEL, HCURSOR, HICON, HMENU, IDC_ARROW, IsChild, IsDialogMessageW,
            LoadAcceleratorsW, LoadCursorW, MB_ICONERROR, MB_OK, MSG, MessageBoxW,
            NONCLIENTMETRICSW, PostQuitMessage, RegisterClassExW, SHOW_WINDOW_CMD, SM_CXSCREEN,
            SM_CYSCREEN, SPI_GETNONCLIENTMETRICS, SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS,
            SendMessageW, ShowWindow, SystemParametersInfoW, TranslateAcceleratorW,
            TranslateMessage, WINDOW_EX_STYLE, WINDOW_STYLE, WM_SETFONT, WNDCLASS_STYLES,
            WNDCLASSEXW,
        },
    },
    core::{BOOL, HSTRING, PCWSTR},
};

use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::sync::Arc;

thread_local! {
    // The last message pulled from this thread's queue, so translation calls
    // get the full MSG (time and cursor position) back.
    static LAST_MSG: RefCell<MSG> = RefCell::new(MSG::default());

    // Created on first use and kept for the life of the thread.
    static UI_FONT: Cell<Option<HFONT>> = const { Cell::new(None) };
}

/*
 * The font the shell uses for menus (usually Segoe UI 9), taken from the
 * non-client metrics. Dialog templates otherwise come up in the system font.
 */
fn ui_font() -> PlatformResult<HFONT> {
    if let Some(font) = UI_FONT.with(Cell::get) {
        return Ok(font);
    }
    let mut ncm = NONCLIENTMETRICSW {
        cbSize: std::mem::size_of::<NONCLIENTMETRICSW>() as u32,
        ..Default::default()
    };
    unsafe {
        SystemParametersInfoW(
            SPI_GETNONCLIENTMETRICS,
            ncm.cbSize,
            Some(&mut ncm as *mut NONCLIENTMETRICSW as *mut c_void),
            SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
        )
    }
    .map_err(|_| last_error("SystemParametersInfo failed for the UI font."))?;

    let font = unsafe { CreateFontIndirectW(&ncm.lfMenuFont) };
    if font.is_invalid() {
        return Err(PlatformError::runtime("CreateFontIndirect failed for the UI font."));
    }
    UI_FONT.with(|cell| cell.set(Some(font)));
    Ok(font)
}

impl From<HWND> for WindowHandle {
    fn from(hwnd: HWND) -> Self {
        WindowHandle::from_raw(hwnd.0 as usize)
    }
}

impl From<WindowHandle> for HWND {
    fn from(hwnd: WindowHandle) -> Self {
        HWND(hwnd.raw() as *mut c_void)
    }
}

fn to_hwnd(hwnd: WindowHandle) -> HWND {
    hwnd.into()
}

fn to_handle(hwnd: HWND) -> WindowHandle {
    hwnd.into()
}

fn last_error(context: &str) -> PlatformError {
    let code = unsafe { GetLastError() }.0;
    log::error!("Win32Host: {context} (error {code})");
    PlatformError::system(context, code)
}

fn to_native(msg: &QueuedMessage) -> MSG {
    LAST_MSG.with(|last| {
        let last = last.borrow();
        if to_handle(last.hwnd) == msg.hwnd
            && last.message == msg.msg
            && last.wParam.0 == msg.params.wparam
            && last.lParam.0 == msg.params.lparam
        {
            *last
        } else {
            MSG {
                hwnd: to_hwnd(msg.hwnd),
                message: msg.msg,
                wParam: WPARAM(msg.params.wparam),
                lParam: LPARAM(msg.params.lparam),
                ..Default::default()
            }
        }
    })
}

// MAKEINTRESOURCE
fn int_resource(id: i32) -> PCWSTR {
    PCWSTR(id as u16 as usize as *const u16)
}

unsafe extern "system" fn window_trampoline(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    LRESULT(window_proc(
        &Win32Host,
        to_handle(hwnd),
        msg,
        RawParams::new(wparam.0, lparam.0),
    ))
}

unsafe extern "system" fn dialog_trampoline(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> isize {
    dialog_proc(
        &Win32Host,
        to_handle(hwnd),
        msg,
        RawParams::new(wparam.0, lparam.0),
    )
}

unsafe extern "system" fn subclass_trampoline(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    subclass_id: usize,
    _ref_data: usize,
) -> LRESULT {
    LRESULT(subclass_proc(
        &Win32Host,
        to_handle(hwnd),
        msg,
        RawParams::new(wparam.0, lparam.0),
        subclass_id,
    ))
}

unsafe extern "system" fn set_font_on_child(hwnd: HWND, lparam: LPARAM) -> BOOL {
    unsafe {
        SendMessageW(
            hwnd,
            WM_SETFONT,
            Some(WPARAM(lparam.0 as usize)),
            Some(LPARAM(0)),
        );
    }
    BOOL::from(true)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Host;

impl Win32Host {
    fn instance(&self, raw: usize) -> PlatformResult<HINSTANCE> {
        if raw != 0 {
            return Ok(HINSTANCE(raw as *mut c_void));
        }
        let module = unsafe { GetModuleHandleW(None) }?;
        Ok(module.into())
    }
}

impl FaultSink for Win32Host {
    fn alert(&self, title: &str, body: &str) {
        unsafe {
            let _ = MessageBoxW(
                None,
                &HSTRING::from(body),
                &HSTRING::from(title),
                MB_OK | MB_ICONERROR,
            );
        }
    }

    fn request_quit(&self, exit_code: i32) {
        unsafe { PostQuitMessage(exit_code) };
    }
}

impl MessageTransport for Win32Host {
    fn send_message(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize {
        unsafe {
            SendMessageW(
                to_hwnd(hwnd),
                msg,
                Some(WPARAM(params.wparam)),
                Some(LPARAM(params.lparam)),
            )
        }
        .0
    }
}

impl WindowHost for Win32Host {
    fn default_window_proc(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize {
        unsafe {
            DefWindowProcW(
                to_hwnd(hwnd),
                msg,
                WPARAM(params.wparam),
                LPARAM(params.lparam),
            )
        }
        .0
    }

    fn default_subclass_proc(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize {
        unsafe {
            DefSubclassProc(
                to_hwnd(hwnd),
                msg,
                WPARAM(params.wparam),
                LPARAM(params.lparam),
            )
        }
        .0
    }

    fn register_class(&self, class: &WindowClass, name: &str) -> PlatformResult<u16> {
        let class_name = HSTRING::from(name);
        let cursor = if class.cursor != 0 {
            HCURSOR(class.cursor as *mut c_void)
        } else {
            unsafe { LoadCursorW(None, IDC_ARROW) }?
        };
        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: WNDCLASS_STYLES(class.style),
            lpfnWndProc: Some(window_trampoline),
            cbClsExtra: class.cls_extra,
            cbWndExtra: class.wnd_extra,
            hInstance: self.instance(class.instance)?,
            hIcon: HICON(class.icon as *mut c_void),
            hCursor: cursor,
            hbrBackground: HBRUSH(class.background_brush as *mut c_void),
            lpszMenuName: PCWSTR::null(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            hIconSm: HICON(class.small_icon as *mut c_void),
        };

        let atom = unsafe { RegisterClassExW(&wc) };
        if atom == 0 {
            // "Class already exists" is reported like any other failure; the
            // caller decides whether it is one.
            let code = unsafe { GetLastError() }.0;
            return Err(PlatformError::system(
                format!("RegisterClassEx failed for '{name}'."),
                code,
            ));
        }
        log::debug!("Win32Host: window class '{name}' registered, atom {atom:#x}.");
        Ok(atom)
    }

    fn class_exists(&self, class: &WindowClass, name: &str) -> PlatformResult<()> {
        let class_name = HSTRING::from(name);
        let mut wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            ..Default::default()
        };
        unsafe {
            GetClassInfoExW(
                Some(self.instance(class.instance)?),
                PCWSTR(class_name.as_ptr()),
                &mut wc,
            )
        }
        .map_err(|_| last_error("GetClassInfoEx failed."))
    }

    fn create_window(
        &self,
        request: &CreateWindowRequest,
        create_params: *mut c_void,
    ) -> PlatformResult<WindowHandle> {
        let (x, y) = request.position;
        let (width, height) = request.size;
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(request.ex_style),
                &HSTRING::from(request.class_name.as_str()),
                &HSTRING::from(request.title.as_deref().unwrap_or_default()),
                WINDOW_STYLE(request.style),
                x,
                y,
                width,
                height,
                request.parent.filter(|p| !p.is_null()).map(to_hwnd),
                (request.menu != 0).then(|| HMENU(request.menu as *mut c_void)),
                Some(self.instance(request.instance)?),
                Some(create_params as *const c_void),
            )
        }
        .map_err(|_| last_error("CreateWindowEx failed."))?;
        Ok(to_handle(hwnd))
    }

    fn create_dialog(
        &self,
        request: &DialogRequest,
        owner_token: isize,
    ) -> PlatformResult<WindowHandle> {
        let hwnd = unsafe {
            CreateDialogParamW(
                Some(self.instance(request.instance)?),
                int_resource(request.resource_id),
                request.parent.filter(|p| !p.is_null()).map(to_hwnd),
                Some(dialog_trampoline),
                LPARAM(owner_token),
            )
        }
        .map_err(|_| last_error("CreateDialogParam failed."))?;
        Ok(to_handle(hwnd))
    }

    fn dialog_box(&self, request: &DialogRequest, owner_token: isize) -> PlatformResult<isize> {
        let ret = unsafe {
            DialogBoxParamW(
                Some(self.instance(request.instance)?),
                int_resource(request.resource_id),
                request.parent.filter(|p| !p.is_null()).map(to_hwnd),
                Some(dialog_trampoline),
                LPARAM(owner_token),
            )
        };
        if ret == -1 {
            return Err(last_error("DialogBoxParam failed."));
        }
        Ok(ret)
    }

    fn set_ui_font_on_children(&self, dialog: WindowHandle) {
        let font = match ui_font() {
            Ok(font) => font,
            Err(err) => {
                log::warn!("Win32Host: no UI font for dialog {dialog:?}: {err}");
                return;
            }
        };
        unsafe {
            SendMessageW(
                to_hwnd(dialog),
                WM_SETFONT,
                Some(WPARAM(font.0 as usize)),
                Some(LPARAM(0)),
            );
            let _ = EnumChildWindows(
                Some(to_hwnd(dialog)),
                Some(set_font_on_child),
                LPARAM(font.0 as isize),
            );
        }
    }

    fn dialog_item(&self, parent: WindowHandle, ctrl_id: i32) -> PlatformResult<WindowHandle> {
        let hwnd = unsafe { GetDlgItem(Some(to_hwnd(parent)), ctrl_id) }
            .map_err(|_| last_error("GetDlgItem failed."))?;
        Ok(to_handle(hwnd))
    }

    fn create_control(
        &self,
        parent: WindowHandle,
        request: &ControlRequest,
    ) -> PlatformResult<WindowHandle> {
        let (x, y) = request.position;
        let (width, height) = request.size;
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(request.ex_style),
                &HSTRING::from(request.class_name.as_str()),
                &HSTRING::from(request.title.as_deref().unwrap_or_default()),
                WINDOW_STYLE(request.style),
                x,
                y,
                width,
                height,
                Some(to_hwnd(parent)),
                Some(HMENU(request.ctrl_id as isize as *mut c_void)),
                Some(self.instance(0)?),
                None,
            )
        }
        .map_err(|_| last_error("CreateWindowEx failed for control."))?;
        Ok(to_handle(hwnd))
    }

    fn install_subclass(&self, hwnd: WindowHandle, subclass_id: usize) -> PlatformResult<()> {
        let ok = unsafe {
            SetWindowSubclass(
                to_hwnd(hwnd),
                Some(subclass_trampoline),
                subclass_id,
                subclass_id,
            )
        };
        if !ok.as_bool() {
            return Err(last_error("SetWindowSubclass failed."));
        }
        Ok(())
    }

    fn remove_subclass(&self, hwnd: WindowHandle, subclass_id: usize) {
        let ok =
            unsafe { RemoveWindowSubclass(to_hwnd(hwnd), Some(subclass_trampoline), subclass_id) };
        if !ok.as_bool() {
            log::warn!("Win32Host: RemoveWindowSubclass failed for {hwnd:?}, subclass {subclass_id}.");
        }
    }

    fn next_message(&self) -> PlatformResult<Pumped> {
        let mut msg = MSG::default();
        let ret = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        match ret.0 {
            -1 => Err(last_error("GetMessage failed.")),
            0 => Ok(Pumped::Quit(msg.wParam.0 as i32)),
            _ => {
                LAST_MSG.with(|last| *last.borrow_mut() = msg);
                Ok(Pumped::Message(QueuedMessage {
                    hwnd: to_handle(msg.hwnd),
                    msg: msg.message,
                    params: RawParams::new(msg.wParam.0, msg.lParam.0),
                }))
            }
        }
    }

    fn root_ancestor(&self, hwnd: WindowHandle) -> WindowHandle {
        to_handle(unsafe { GetAncestor(to_hwnd(hwnd), GA_ROOT) })
    }

    fn is_child(&self, parent: WindowHandle, child: WindowHandle) -> bool {
        unsafe { IsChild(to_hwnd(parent), to_hwnd(child)) }.as_bool()
    }

    fn is_dialog_message(&self, dialog: WindowHandle, msg: &QueuedMessage) -> bool {
        let native = to_native(msg);
        unsafe { IsDialogMessageW(to_hwnd(dialog), &native) }.as_bool()
    }

    fn translate_accelerator(
        &self,
        hwnd: WindowHandle,
        accel: usize,
        msg: &QueuedMessage,
    ) -> bool {
        let native = to_native(msg);
        unsafe { TranslateAcceleratorW(to_hwnd(hwnd), HACCEL(accel as *mut c_void), &native) } != 0
    }

    fn translate_and_dispatch(&self, msg: &QueuedMessage) {
        let native = to_native(msg);
        unsafe {
            let _ = TranslateMessage(&native);
            DispatchMessageW(&native);
        }
    }

    fn transport(&self) -> Arc<dyn MessageTransport> {
        Arc::new(Win32Host)
    }

    fn send_message(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize {
        MessageTransport::send_message(self, hwnd, msg, params)
    }

    fn show_window(&self, hwnd: WindowHandle, cmd_show: i32) -> PlatformResult<()> {
        unsafe {
            let _ = ShowWindow(to_hwnd(hwnd), SHOW_WINDOW_CMD(cmd_show));
            if !UpdateWindow(to_hwnd(hwnd)).as_bool() {
                return Err(PlatformError::runtime(format!(
                    "UpdateWindow failed for {hwnd:?}."
                )));
            }
        }
        Ok(())
    }

    fn enable_window(&self, hwnd: WindowHandle, enable: bool) {
        if hwnd.is_null() {
            return;
        }
        let _ = unsafe { EnableWindow(to_hwnd(hwnd), enable) };
    }

    fn destroy_window(&self, hwnd: WindowHandle) {
        if unsafe { DestroyWindow(to_hwnd(hwnd)) }.is_err() {
            log::warn!("Win32Host: DestroyWindow failed for {hwnd:?}.");
        }
    }

    fn end_dialog(&self, dialog: WindowHandle, result: isize) {
        if unsafe { EndDialog(to_hwnd(dialog), result) }.is_err() {
            log::warn!("Win32Host: EndDialog failed for {dialog:?}.");
        }
    }

    fn window_owner(&self, hwnd: WindowHandle) -> WindowHandle {
        unsafe { GetWindow(to_hwnd(hwnd), GW_OWNER) }
            .map(to_handle)
            .unwrap_or(WindowHandle::NULL)
    }

    fn focused(&self) -> WindowHandle {
        to_handle(unsafe { GetFocus() })
    }

    fn set_focus(&self, hwnd: WindowHandle) {
        let target = (!hwnd.is_null()).then(|| to_hwnd(hwnd));
        let _ = unsafe { SetFocus(target) };
    }

    fn first_tab_item(&self, hwnd: WindowHandle) -> WindowHandle {
        unsafe { GetNextDlgTabItem(to_hwnd(hwnd), None, false) }
            .map(to_handle)
            .unwrap_or(WindowHandle::NULL)
    }

    fn screen_size(&self) -> (i32, i32) {
        unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }

    fn load_accelerators(&self, instance: usize, resource_id: i32) -> PlatformResult<usize> {
        let accel = unsafe {
            LoadAcceleratorsW(Some(self.instance(instance)?), int_resource(resource_id))
        }
        .map_err(|_| last_error("LoadAccelerators failed."))?;
        Ok(accel.0 as usize)
    }
}

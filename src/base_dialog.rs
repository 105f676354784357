/*
 * Dialog counterpart of `base_window`. A dialog is loaded from a resource
 * template; its owner token travels as the `lparam` of `WM_INITDIALOG` instead
 * of the creation structure. The state, the side-table and the teardown rules
 * are the ones of `WindowCore`.
 */

use crate::base_window::{WindowCore, WindowRef, attach_owner, detach_owner, owner_of};
use crate::error::{PlatformError, Result as PlatformResult};
use crate::host::WindowHost;
use crate::msg_handler::UiThreadHandle;
use crate::types::{
    DialogRequest, Lifecycle, NotifyKey, RawParams, WM_INITDIALOG, WM_NCDESTROY, WindowHandle,
};

use std::rc::{Rc, Weak};

pub struct BaseDialog {
    core: Rc<WindowCore>,
}

impl BaseDialog {
    pub fn new() -> Self {
        Self {
            core: WindowCore::new("dialog"),
        }
    }

    pub fn hwnd(&self) -> WindowHandle {
        self.core.hwnd()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.core.lifecycle()
    }

    pub fn downgrade(&self) -> WindowRef {
        WindowRef::new(&self.core)
    }

    pub(crate) fn add_default<F>(&self, msg: u32, func: F)
    where
        F: Fn(RawParams) -> PlatformResult<isize> + 'static,
    {
        self.core.add_default(msg, Box::new(func));
    }

    pub fn on_message<F>(&self, msg: u32, func: F) -> PlatformResult<()>
    where
        F: Fn(RawParams) -> PlatformResult<isize> + 'static,
    {
        self.core
            .register("add a message handler", |h| h.on_message(msg, Box::new(func)))
    }

    pub fn on_messages<F>(&self, msgs: &[u32], func: F) -> PlatformResult<()>
    where
        F: Fn(RawParams) -> PlatformResult<isize> + 'static,
    {
        self.core
            .register("add message handlers", |h| h.on_messages(msgs, Box::new(func)))
    }

    pub fn on_command<F>(&self, cmd: u16, func: F) -> PlatformResult<()>
    where
        F: Fn(RawParams) -> PlatformResult<isize> + 'static,
    {
        self.core
            .register("add a command handler", |h| h.on_command(cmd, Box::new(func)))
    }

    pub fn on_commands<F>(&self, cmds: &[u16], func: F) -> PlatformResult<()>
    where
        F: Fn(RawParams) -> PlatformResult<isize> + 'static,
    {
        self.core
            .register("add command handlers", |h| h.on_commands(cmds, Box::new(func)))
    }

    pub fn on_notify<F>(&self, id_from: usize, code: i32, func: F) -> PlatformResult<()>
    where
        F: Fn(RawParams) -> PlatformResult<isize> + 'static,
    {
        self.core.register("add a notify handler", |h| {
            h.on_notify(NotifyKey::new(id_from, code), Box::new(func))
        })
    }

    pub fn on_notifies<F>(&self, keys: &[NotifyKey], func: F) -> PlatformResult<()>
    where
        F: Fn(RawParams) -> PlatformResult<isize> + 'static,
    {
        self.core
            .register("add notify handlers", |h| h.on_notifies(keys, Box::new(func)))
    }

    fn check_creation(&self, request: &DialogRequest) -> PlatformResult<()> {
        if self.core.lifecycle() != Lifecycle::Uncreated {
            return Err(PlatformError::logic("Cannot create a dialog twice."));
        }
        if request.resource_id == 0 {
            return Err(PlatformError::invalid_argument(
                "Dialog resource ID can't be zero.",
            ));
        }
        Ok(())
    }

    /// Creates a modeless dialog. It becomes live while `WM_INITDIALOG` is
    /// processed, before this call returns.
    pub fn create_dialog(
        &self,
        host: &dyn WindowHost,
        request: &DialogRequest,
    ) -> PlatformResult<WindowHandle> {
        self.check_creation(request)?;
        let token: Box<Weak<WindowCore>> = Box::new(Rc::downgrade(&self.core));
        host.create_dialog(request, &*token as *const Weak<WindowCore> as isize)
    }

    /// Runs a modal dialog and returns the value it was ended with.
    pub fn dialog_box(&self, host: &dyn WindowHost, request: &DialogRequest) -> PlatformResult<isize> {
        self.check_creation(request)?;
        let token: Box<Weak<WindowCore>> = Box::new(Rc::downgrade(&self.core));
        let ret = host.dialog_box(request, &*token as *const Weak<WindowCore> as isize)?;
        log::debug!("BaseDialog: modal dialog {} ended with {ret}.", request.resource_id);
        Ok(ret)
    }

    pub fn ui_thread(&self, host: &dyn WindowHost) -> PlatformResult<UiThreadHandle> {
        self.core.ui_thread(host)
    }
}

impl Default for BaseDialog {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BaseDialog {
    fn drop(&mut self) {
        self.core.release();
    }
}

/*
 * The dialog procedure. Unlike a window procedure it returns 0 (FALSE) for
 * messages nobody handled; the OS then does the default processing itself.
 */
pub fn dialog_proc(host: &dyn WindowHost, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize {
    let core = if msg == WM_INITDIALOG {
        claim_initialization(host, hwnd, params)
    } else {
        owner_of(hwnd)
    };
    let Some(core) = core else {
        return 0;
    };

    let ret = core.dispatch(host, msg, params);

    if msg == WM_NCDESTROY {
        detach_owner(hwnd);
        core.go_destroyed();
    }
    ret.unwrap_or(0)
}

fn claim_initialization(
    host: &dyn WindowHost,
    hwnd: WindowHandle,
    params: RawParams,
) -> Option<Rc<WindowCore>> {
    if params.lparam == 0 {
        return None;
    }
    // SAFETY: dialogs are only created through `BaseDialog`, which passes a
    // pointer to its boxed token as the init parameter and keeps it alive until
    // the creating call returns.
    let weak = unsafe { &*(params.lparam as *const Weak<WindowCore>) }.clone();
    let core = weak.upgrade()?;
    attach_owner(hwnd, weak);
    core.go_live(hwnd);
    host.set_ui_font_on_children(hwnd);
    Some(core)
}

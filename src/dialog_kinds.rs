/*
 * Ready-made dialogs built on `BaseDialog`, loaded from resource templates:
 * the application's main dialog, a modal dialog and a modeless one. As with
 * the window kinds, built-in handlers are registered at construction and user
 * handlers for the same message replace them.
 */

use crate::base_dialog::BaseDialog;
use crate::error::Result as PlatformResult;
use crate::host::WindowHost;
use crate::main_loop::MainLoop;
use crate::types::{
    DialogRequest, IDCANCEL, WM_CLOSE, WM_MODELESS_CREATED, WM_MODELESS_DESTROYED, WM_NCDESTROY,
    WindowHandle,
};
use crate::window_kinds::{
    announce_modeless, ensure_setup_allowed, modeless_teardown, modeless_tracker, require_parent,
};

use std::ops::Deref;
use std::rc::Rc;

// WM_CLOSE of the main and modeless dialogs.
fn destroy_on_close(dialog: &BaseDialog, host: &Rc<dyn WindowHost>, ret: isize) {
    let me = dialog.downgrade();
    let host = Rc::clone(host);
    dialog.add_default(WM_CLOSE, move |_| {
        if let Some(hwnd) = me.hwnd() {
            host.destroy_window(hwnd);
        }
        Ok(ret)
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialogMainSetup {
    pub dialog_id: i32,
    /// Accelerator table resource, zero for none.
    pub accel_table_id: i32,
}

/// A dialog used as the application's main window.
pub struct DialogMain {
    host: Rc<dyn WindowHost>,
    dialog: BaseDialog,
    main_loop: Rc<MainLoop>,
    setup: DialogMainSetup,
}

impl DialogMain {
    pub fn new(host: Rc<dyn WindowHost>) -> Self {
        let dialog = BaseDialog::new();
        let main_loop = Rc::new(MainLoop::new());

        let quit_host = Rc::clone(&host);
        dialog.add_default(WM_NCDESTROY, move |_| {
            quit_host.request_quit(0);
            Ok(1)
        });
        destroy_on_close(&dialog, &host, 1);
        dialog.add_default(
            WM_MODELESS_CREATED,
            modeless_tracker(&main_loop, WM_MODELESS_CREATED),
        );
        dialog.add_default(
            WM_MODELESS_DESTROYED,
            modeless_tracker(&main_loop, WM_MODELESS_DESTROYED),
        );

        Self {
            host,
            dialog,
            main_loop,
            setup: DialogMainSetup::default(),
        }
    }

    pub fn setup(&mut self) -> PlatformResult<&mut DialogMainSetup> {
        ensure_setup_allowed(self.dialog.lifecycle(), "the main dialog")?;
        Ok(&mut self.setup)
    }

    pub fn main_loop(&self) -> Rc<MainLoop> {
        Rc::clone(&self.main_loop)
    }

    /// Creates the dialog, loads its accelerators, shows it and runs the main
    /// loop. Returns the loop's exit code.
    pub fn run_as_main(&self, instance: usize, cmd_show: i32) -> PlatformResult<i32> {
        let host = &*self.host;
        let request = DialogRequest {
            instance,
            parent: None,
            resource_id: self.setup.dialog_id,
        };
        let hwnd = self.dialog.create_dialog(host, &request)?;

        let accel = match self.setup.accel_table_id {
            0 => None,
            id => match host.load_accelerators(instance, id) {
                Ok(accel) => Some(accel),
                Err(err) => {
                    log::error!("DialogMain: accelerator table {id} failed to load: {err}");
                    host.destroy_window(hwnd);
                    return Err(err);
                }
            },
        };
        host.show_window(hwnd, cmd_show)?;

        log::info!("DialogMain: running main loop for {hwnd:?}.");
        self.main_loop.run_loop(host, hwnd, accel)
    }
}

impl Deref for DialogMain {
    type Target = BaseDialog;

    fn deref(&self) -> &BaseDialog {
        &self.dialog
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialogSetup {
    pub dialog_id: i32,
    /// Module holding the template; zero is the executable.
    pub instance: usize,
}

/// A dialog that blocks its parent. Closing it ends it with `IDCANCEL`.
pub struct DialogModal {
    host: Rc<dyn WindowHost>,
    dialog: BaseDialog,
    setup: DialogSetup,
}

impl DialogModal {
    pub fn new(host: Rc<dyn WindowHost>) -> Self {
        let dialog = BaseDialog::new();
        let me = dialog.downgrade();
        let end_host = Rc::clone(&host);
        dialog.add_default(WM_CLOSE, move |_| {
            if let Some(hwnd) = me.hwnd() {
                end_host.end_dialog(hwnd, IDCANCEL);
            }
            Ok(1)
        });
        Self {
            host,
            dialog,
            setup: DialogSetup::default(),
        }
    }

    pub fn setup(&mut self) -> PlatformResult<&mut DialogSetup> {
        ensure_setup_allowed(self.dialog.lifecycle(), "the modal dialog")?;
        Ok(&mut self.setup)
    }

    /// Runs the dialog and returns the value it was ended with.
    pub fn show(&self, parent: WindowHandle) -> PlatformResult<isize> {
        require_parent(parent, "DialogModal::show()")?;
        let request = DialogRequest {
            instance: self.setup.instance,
            parent: Some(parent),
            resource_id: self.setup.dialog_id,
        };
        self.dialog.dialog_box(&*self.host, &request)
    }
}

impl Deref for DialogModal {
    type Target = BaseDialog;

    fn deref(&self) -> &BaseDialog {
        &self.dialog
    }
}

/// A modeless dialog owned by `parent`, registered with the main loop of the
/// main window or dialog that owns it.
pub struct DialogModeless {
    host: Rc<dyn WindowHost>,
    dialog: BaseDialog,
    setup: DialogSetup,
}

impl DialogModeless {
    pub fn new(host: Rc<dyn WindowHost>) -> Self {
        let dialog = BaseDialog::new();
        destroy_on_close(&dialog, &host, 0);
        dialog.add_default(
            WM_NCDESTROY,
            modeless_teardown(dialog.downgrade(), Rc::clone(&host), 0),
        );
        Self {
            host,
            dialog,
            setup: DialogSetup::default(),
        }
    }

    pub fn setup(&mut self) -> PlatformResult<&mut DialogSetup> {
        ensure_setup_allowed(self.dialog.lifecycle(), "the modeless dialog")?;
        Ok(&mut self.setup)
    }

    pub fn create(&self, parent: WindowHandle) -> PlatformResult<WindowHandle> {
        require_parent(parent, "DialogModeless::create()")?;
        let host = &*self.host;
        let request = DialogRequest {
            instance: self.setup.instance,
            parent: Some(parent),
            resource_id: self.setup.dialog_id,
        };
        let hwnd = self.dialog.create_dialog(host, &request)?;
        announce_modeless(host, parent, WM_MODELESS_CREATED, hwnd);
        Ok(hwnd)
    }
}

impl Deref for DialogModeless {
    type Target = BaseDialog;

    fn deref(&self) -> &BaseDialog {
        &self.dialog
    }
}

/*
 * Ready-made windows built on `BaseWindow`: the application's main window, a
 * modal window running its own nested loop, a modeless tool window and a
 * custom child control. Each kind registers its built-in handlers when it is
 * constructed; a handler the user registers later for the same message
 * replaces the built-in one.
 *
 * Every kind holds the host it was constructed with, and its built-in
 * handlers keep a clone of it.
 */

use crate::base_window::{BaseWindow, WindowRef};
use crate::error::{PlatformError, Result as PlatformResult};
use crate::host::WindowHost;
use crate::main_loop::{MainLoop, run_modal_loop};
use crate::types::{
    COLOR_BTNFACE, COLOR_WINDOW, CS_DBLCLKS, CreateWindowRequest, Lifecycle, MODELESS_MAGIC,
    RawParams, WM_ACTIVATE, WM_CLOSE, WM_MODELESS_CREATED, WM_MODELESS_DESTROYED, WM_NCDESTROY,
    WM_SETFOCUS, WS_BORDER, WS_CAPTION, WS_CHILD, WS_CLIPCHILDREN, WS_CLIPSIBLINGS,
    WS_EX_DLGMODALFRAME, WS_EX_TOOLWINDOW, WS_GROUP, WS_SYSMENU, WS_TABSTOP, WS_VISIBLE,
    WindowClass, WindowHandle, hiword, loword,
};

use std::cell::Cell;
use std::ops::Deref;
use std::rc::Rc;

/// Window class fields of a window kind. A missing or empty name is derived
/// from the other fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSetup {
    pub name: Option<String>,
    pub style: u32,
    pub icon: usize,
    pub small_icon: usize,
    pub cursor: usize,
    pub background_brush: usize,
}

impl Default for ClassSetup {
    fn default() -> Self {
        Self {
            name: None,
            style: CS_DBLCLKS,
            icon: 0,
            small_icon: 0,
            cursor: 0,
            background_brush: COLOR_BTNFACE + 1,
        }
    }
}

impl ClassSetup {
    pub fn to_window_class(&self, instance: usize) -> WindowClass {
        WindowClass {
            class_name: self.name.clone(),
            style: self.style,
            instance,
            icon: self.icon,
            cursor: self.cursor,
            background_brush: self.background_brush,
            small_icon: self.small_icon,
            ..Default::default()
        }
    }
}

pub(crate) fn ensure_setup_allowed(lifecycle: Lifecycle, kind: &str) -> PlatformResult<()> {
    if lifecycle != Lifecycle::Uncreated {
        return Err(PlatformError::logic(format!(
            "Cannot call setup() after {kind} is created."
        )));
    }
    Ok(())
}

pub(crate) fn require_parent(parent: WindowHandle, call: &str) -> PlatformResult<()> {
    if parent.is_null() {
        return Err(PlatformError::invalid_argument(format!(
            "No parent passed to {call}."
        )));
    }
    Ok(())
}

fn centered(area: (i32, i32), size: (i32, i32)) -> (i32, i32) {
    (area.0 / 2 - size.0 / 2, area.1 / 2 - size.1 / 2)
}

/// Tells `owner` that a modeless window appeared or went away.
pub(crate) fn announce_modeless(
    host: &dyn WindowHost,
    owner: WindowHandle,
    msg: u32,
    modeless: WindowHandle,
) {
    if owner.is_null() {
        log::debug!("No owner to tell about modeless window {modeless:?}.");
        return;
    }
    host.send_message(owner, msg, RawParams::new(MODELESS_MAGIC, modeless.raw() as isize));
}

// WM_NCDESTROY of a modeless window or dialog.
pub(crate) fn modeless_teardown(
    me: WindowRef,
    host: Rc<dyn WindowHost>,
    ret: isize,
) -> impl Fn(RawParams) -> PlatformResult<isize> + 'static {
    move |_| {
        if let Some(hwnd) = me.hwnd() {
            announce_modeless(&*host, host.window_owner(hwnd), WM_MODELESS_DESTROYED, hwnd);
        }
        Ok(ret)
    }
}

// WM_MODELESS_CREATED and WM_MODELESS_DESTROYED of a main window or dialog.
pub(crate) fn modeless_tracker(
    main_loop: &Rc<MainLoop>,
    msg: u32,
) -> impl Fn(RawParams) -> PlatformResult<isize> + 'static {
    let main_loop = Rc::clone(main_loop);
    move |p| {
        if p.wparam == MODELESS_MAGIC {
            let child = WindowHandle::from_raw(p.lparam as usize);
            if msg == WM_MODELESS_CREATED {
                main_loop.add_modeless_child(child);
            } else {
                main_loop.delete_modeless_child(child);
            }
        }
        Ok(0)
    }
}

// A window that gets the focus itself hands it to its first tab stop.
fn delegate_focus(window: &BaseWindow, host: &Rc<dyn WindowHost>) {
    let me = window.downgrade();
    let host = Rc::clone(host);
    window.add_default(WM_SETFOCUS, move |_| {
        if let Some(hwnd) = me.hwnd() {
            if host.focused() == hwnd {
                host.set_focus(host.first_tab_item(hwnd));
            }
        }
        Ok(0)
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowMainSetup {
    pub class: ClassSetup,
    pub title: Option<String>,
    pub size: (i32, i32),
    pub ex_style: u32,
    pub style: u32,
    /// Raw menu handle, zero for none.
    pub menu: usize,
    /// Raw accelerator table handle fed to the main loop.
    pub accel_table: Option<usize>,
}

impl Default for WindowMainSetup {
    fn default() -> Self {
        Self {
            class: ClassSetup::default(),
            title: None,
            size: (600, 500),
            ex_style: 0,
            style: WS_CAPTION | WS_SYSMENU | WS_CLIPCHILDREN | WS_BORDER,
            menu: 0,
            accel_table: None,
        }
    }
}

/// The application's main window. Destroying it ends the main loop.
pub struct WindowMain {
    host: Rc<dyn WindowHost>,
    window: BaseWindow,
    main_loop: Rc<MainLoop>,
    setup: WindowMainSetup,
}

impl WindowMain {
    pub fn new(host: Rc<dyn WindowHost>) -> Self {
        let window = BaseWindow::new();
        let main_loop = Rc::new(MainLoop::new());

        let quit_host = Rc::clone(&host);
        window.add_default(WM_NCDESTROY, move |_| {
            quit_host.request_quit(0);
            Ok(0)
        });
        delegate_focus(&window, &host);

        // Focus is lost to whatever window gets activated next; remember the
        // focused child and put it back on reactivation.
        let me = window.downgrade();
        let focus_host = Rc::clone(&host);
        let last_focus = Cell::new(WindowHandle::NULL);
        window.add_default(WM_ACTIVATE, move |p| {
            let Some(hwnd) = me.hwnd() else {
                return Ok(0);
            };
            let minimized = hiword(p.wparam) != 0;
            let activated = loword(p.wparam) != 0;
            if minimized {
                return Ok(0);
            }
            if !activated {
                let current = focus_host.focused();
                if !current.is_null() && focus_host.is_child(hwnd, current) {
                    last_focus.set(current);
                }
            } else if !last_focus.get().is_null() {
                focus_host.set_focus(last_focus.get());
            }
            Ok(0)
        });

        window.add_default(
            WM_MODELESS_CREATED,
            modeless_tracker(&main_loop, WM_MODELESS_CREATED),
        );
        window.add_default(
            WM_MODELESS_DESTROYED,
            modeless_tracker(&main_loop, WM_MODELESS_DESTROYED),
        );

        Self {
            host,
            window,
            main_loop,
            setup: WindowMainSetup::default(),
        }
    }

    pub fn setup(&mut self) -> PlatformResult<&mut WindowMainSetup> {
        ensure_setup_allowed(self.window.lifecycle(), "the main window")?;
        Ok(&mut self.setup)
    }

    pub fn main_loop(&self) -> Rc<MainLoop> {
        Rc::clone(&self.main_loop)
    }

    /// Registers the class, creates the window centered on the screen, shows
    /// it and runs the main loop. Returns the loop's exit code.
    pub fn run_as_main(&self, instance: usize, cmd_show: i32) -> PlatformResult<i32> {
        let host = &*self.host;
        let class = self.setup.class.to_window_class(instance);
        let registered = BaseWindow::register_class(host, &class)?;

        let request = CreateWindowRequest {
            class_name: registered.name,
            title: self.setup.title.clone(),
            parent: None,
            menu: self.setup.menu,
            instance,
            position: centered(host.screen_size(), self.setup.size),
            size: self.setup.size,
            ex_style: self.setup.ex_style,
            style: self.setup.style,
        };
        let hwnd = self.window.create_window(host, &request)?;
        host.show_window(hwnd, cmd_show)?;

        log::info!("WindowMain: running main loop for {hwnd:?}.");
        self.main_loop.run_loop(host, hwnd, self.setup.accel_table)
    }
}

impl Deref for WindowMain {
    type Target = BaseWindow;

    fn deref(&self) -> &BaseWindow {
        &self.window
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowModalSetup {
    pub class: ClassSetup,
    /// Module the class is registered for; zero is the executable.
    pub instance: usize,
    pub title: Option<String>,
    pub size: (i32, i32),
    pub ex_style: u32,
    pub style: u32,
}

impl Default for WindowModalSetup {
    fn default() -> Self {
        Self {
            class: ClassSetup::default(),
            instance: 0,
            title: None,
            size: (500, 400),
            ex_style: WS_EX_DLGMODALFRAME,
            style: WS_CAPTION | WS_SYSMENU | WS_CLIPCHILDREN | WS_BORDER | WS_VISIBLE,
        }
    }
}

/// A window that disables its parent while it is open. `show` returns when
/// the window is destroyed.
pub struct WindowModal {
    host: Rc<dyn WindowHost>,
    window: BaseWindow,
    prev_focus: Rc<Cell<WindowHandle>>,
    setup: WindowModalSetup,
}

impl WindowModal {
    pub fn new(host: Rc<dyn WindowHost>) -> Self {
        let window = BaseWindow::new();
        let prev_focus = Rc::new(Cell::new(WindowHandle::NULL));

        let me = window.downgrade();
        let close_host = Rc::clone(&host);
        let restore = Rc::clone(&prev_focus);
        window.add_default(WM_CLOSE, move |_| {
            if let Some(hwnd) = me.hwnd() {
                // Owner first, otherwise the OS activates some other application.
                close_host.enable_window(close_host.window_owner(hwnd), true);
                close_host.destroy_window(hwnd);
                close_host.set_focus(restore.get());
            }
            Ok(0)
        });
        delegate_focus(&window, &host);

        Self {
            host,
            window,
            prev_focus,
            setup: WindowModalSetup::default(),
        }
    }

    pub fn setup(&mut self) -> PlatformResult<&mut WindowModalSetup> {
        ensure_setup_allowed(self.window.lifecycle(), "the modal window")?;
        Ok(&mut self.setup)
    }

    pub fn show(&self, parent: WindowHandle) -> PlatformResult<()> {
        require_parent(parent, "WindowModal::show()")?;
        let host = &*self.host;
        let class = self.setup.class.to_window_class(self.setup.instance);
        let registered = BaseWindow::register_class(host, &class)?;

        self.prev_focus.set(host.focused());
        host.enable_window(parent, false);

        let request = CreateWindowRequest {
            class_name: registered.name,
            title: self.setup.title.clone(),
            parent: Some(parent),
            menu: 0,
            instance: self.setup.instance,
            position: centered(host.screen_size(), self.setup.size),
            size: self.setup.size,
            ex_style: self.setup.ex_style,
            style: self.setup.style,
        };
        if let Err(err) = self.window.create_window(host, &request) {
            host.enable_window(parent, true);
            return Err(err);
        }
        run_modal_loop(host, &self.window.downgrade())
    }
}

impl Deref for WindowModal {
    type Target = BaseWindow;

    fn deref(&self) -> &BaseWindow {
        &self.window
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowModelessSetup {
    pub class: ClassSetup,
    pub instance: usize,
    pub title: Option<String>,
    pub size: (i32, i32),
    pub ex_style: u32,
    pub style: u32,
}

impl Default for WindowModelessSetup {
    fn default() -> Self {
        Self {
            class: ClassSetup::default(),
            instance: 0,
            title: None,
            size: (300, 200),
            ex_style: WS_EX_TOOLWINDOW,
            style: WS_CAPTION | WS_CLIPCHILDREN | WS_BORDER | WS_VISIBLE,
        }
    }
}

/// A tool window owned by a main window, which routes keyboard navigation to
/// it while it exists.
pub struct WindowModeless {
    host: Rc<dyn WindowHost>,
    window: BaseWindow,
    setup: WindowModelessSetup,
}

impl WindowModeless {
    pub fn new(host: Rc<dyn WindowHost>) -> Self {
        let window = BaseWindow::new();

        let me = window.downgrade();
        let close_host = Rc::clone(&host);
        window.add_default(WM_CLOSE, move |_| {
            if let Some(hwnd) = me.hwnd() {
                close_host.destroy_window(hwnd);
            }
            Ok(0)
        });
        window.add_default(
            WM_NCDESTROY,
            modeless_teardown(window.downgrade(), Rc::clone(&host), 0),
        );

        Self {
            host,
            window,
            setup: WindowModelessSetup::default(),
        }
    }

    pub fn setup(&mut self) -> PlatformResult<&mut WindowModelessSetup> {
        ensure_setup_allowed(self.window.lifecycle(), "the modeless window")?;
        Ok(&mut self.setup)
    }

    pub fn create(&self, parent: WindowHandle) -> PlatformResult<WindowHandle> {
        require_parent(parent, "WindowModeless::create()")?;
        let host = &*self.host;
        let class = self.setup.class.to_window_class(self.setup.instance);
        let registered = BaseWindow::register_class(host, &class)?;

        let request = CreateWindowRequest {
            class_name: registered.name,
            title: self.setup.title.clone(),
            parent: Some(parent),
            menu: 0,
            instance: self.setup.instance,
            position: (0, 0),
            size: self.setup.size,
            ex_style: self.setup.ex_style,
            style: self.setup.style,
        };
        let hwnd = self.window.create_window(host, &request)?;
        announce_modeless(host, parent, WM_MODELESS_CREATED, hwnd);
        Ok(hwnd)
    }
}

impl Deref for WindowModeless {
    type Target = BaseWindow;

    fn deref(&self) -> &BaseWindow {
        &self.window
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowControlSetup {
    pub class: ClassSetup,
    pub instance: usize,
    pub ex_style: u32,
    pub style: u32,
}

impl Default for WindowControlSetup {
    fn default() -> Self {
        Self {
            class: ClassSetup {
                background_brush: COLOR_WINDOW + 1,
                ..Default::default()
            },
            instance: 0,
            ex_style: 0,
            style: WS_CHILD
                | WS_TABSTOP
                | WS_GROUP
                | WS_VISIBLE
                | WS_CLIPCHILDREN
                | WS_CLIPSIBLINGS,
        }
    }
}

/// A custom child control with its own window class.
pub struct WindowControl {
    host: Rc<dyn WindowHost>,
    window: BaseWindow,
    setup: WindowControlSetup,
}

impl WindowControl {
    pub fn new(host: Rc<dyn WindowHost>) -> Self {
        Self {
            host,
            window: BaseWindow::new(),
            setup: WindowControlSetup::default(),
        }
    }

    pub fn setup(&mut self) -> PlatformResult<&mut WindowControlSetup> {
        ensure_setup_allowed(self.window.lifecycle(), "the window control")?;
        Ok(&mut self.setup)
    }

    pub fn create(
        &self,
        parent: WindowHandle,
        ctrl_id: i32,
        position: (i32, i32),
        size: (i32, i32),
    ) -> PlatformResult<WindowHandle> {
        require_parent(parent, "WindowControl::create()")?;
        let host = &*self.host;
        let class = self.setup.class.to_window_class(self.setup.instance);
        let registered = BaseWindow::register_class(host, &class)?;

        let request = CreateWindowRequest {
            class_name: registered.name,
            title: None,
            parent: Some(parent),
            // A child window's menu slot holds its control id.
            menu: ctrl_id as usize,
            instance: self.setup.instance,
            position,
            size,
            ex_style: self.setup.ex_style,
            style: self.setup.style,
        };
        self.window.create_window(host, &request)
    }
}

impl Deref for WindowControl {
    type Target = BaseWindow;

    fn deref(&self) -> &BaseWindow {
        &self.window
    }
}

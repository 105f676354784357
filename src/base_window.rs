/*
 * Owns the window handle of a wrapper and provides the window procedure
 * trampoline. The wrapper's state lives in a reference-counted `WindowCore`;
 * a non-owning token for it travels through the creation parameters, and on
 * `WM_NCCREATE` the trampoline records it in a thread-local side-table keyed
 * by the new handle. Every later message looks the owner up there and hands
 * the message to its `MsgHandler`. On `WM_NCDESTROY`, after the final
 * dispatch, the entry is removed and the wrapper becomes `Destroyed`.
 *
 * `WindowCore` is shared with `base_dialog`, which uses the same side-table
 * with its own trampoline.
 */

use crate::error::{PlatformError, Result as PlatformResult};
use crate::host::WindowHost;
use crate::msg_handler::{MsgHandler, UiThreadHandle};
use crate::registry::OwnerTable;
use crate::store::Handler;
use crate::types::{
    CreateParamsHeader, CreateWindowRequest, ERROR_CLASS_ALREADY_EXISTS, Lifecycle, NotifyKey,
    RawParams, WM_NCCREATE, WM_NCDESTROY, WindowClass, WindowHandle,
};

use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::rc::{Rc, Weak};

thread_local! {
    static WINDOW_OWNERS: RefCell<OwnerTable<WindowHandle, WindowCore>> =
        RefCell::new(OwnerTable::new());
}

pub(crate) fn attach_owner(hwnd: WindowHandle, owner: Weak<WindowCore>) {
    WINDOW_OWNERS.with(|table| table.borrow_mut().attach(hwnd, owner));
}

pub(crate) fn detach_owner(hwnd: WindowHandle) -> bool {
    WINDOW_OWNERS.with(|table| table.borrow_mut().detach(hwnd))
}

// The borrow is released before the caller dispatches, so handlers may create
// further windows while they run.
pub(crate) fn owner_of(hwnd: WindowHandle) -> Option<Rc<WindowCore>> {
    WINDOW_OWNERS.with(|table| table.borrow().lookup(hwnd))
}

/// Per-instance state of a window or dialog wrapper.
pub(crate) struct WindowCore {
    kind: &'static str,
    hwnd: Cell<WindowHandle>,
    lifecycle: Cell<Lifecycle>,
    handler: RefCell<MsgHandler>,
}

impl WindowCore {
    pub(crate) fn new(kind: &'static str) -> Rc<Self> {
        Rc::new(Self {
            kind,
            hwnd: Cell::new(WindowHandle::NULL),
            lifecycle: Cell::new(Lifecycle::Uncreated),
            handler: RefCell::new(MsgHandler::new()),
        })
    }

    pub(crate) fn hwnd(&self) -> WindowHandle {
        self.hwnd.get()
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    pub(crate) fn ensure_uncreated(&self, what: &str) -> PlatformResult<()> {
        if self.lifecycle.get() != Lifecycle::Uncreated {
            return Err(PlatformError::logic(format!(
                "Cannot {what} after the {} was created.",
                self.kind
            )));
        }
        Ok(())
    }

    pub(crate) fn register(
        &self,
        what: &str,
        add: impl FnOnce(&mut MsgHandler),
    ) -> PlatformResult<()> {
        self.ensure_uncreated(what)?;
        add(&mut self.handler.borrow_mut());
        Ok(())
    }

    // Built-in handlers of the window kinds; a later registration for the same
    // message replaces them.
    pub(crate) fn add_default(&self, msg: u32, handler: Handler) {
        self.handler.borrow_mut().on_message(msg, handler);
    }

    pub(crate) fn go_live(&self, hwnd: WindowHandle) {
        log::debug!("{}: handle {hwnd:?} is live.", self.kind);
        self.hwnd.set(hwnd);
        self.lifecycle.set(Lifecycle::Live);
    }

    pub(crate) fn go_destroyed(&self) {
        log::debug!("{}: handle {:?} destroyed.", self.kind, self.hwnd.get());
        self.hwnd.set(WindowHandle::NULL);
        self.lifecycle.set(Lifecycle::Destroyed);
    }

    pub(crate) fn dispatch(
        &self,
        host: &dyn WindowHost,
        msg: u32,
        params: RawParams,
    ) -> Option<isize> {
        self.handler.borrow().exec(host, msg, params)
    }

    pub(crate) fn ui_thread(&self, host: &dyn WindowHost) -> PlatformResult<UiThreadHandle> {
        if self.lifecycle.get() != Lifecycle::Live {
            return Err(PlatformError::logic(format!(
                "Cannot run on the UI thread of a {} that is not live.",
                self.kind
            )));
        }
        Ok(UiThreadHandle::new(self.hwnd.get(), host.transport()))
    }

    // Clears the side-table entry of a wrapper dropped while its handle lives.
    pub(crate) fn release(&self) {
        if self.lifecycle.get() == Lifecycle::Live && detach_owner(self.hwnd.get()) {
            log::debug!(
                "{}: dropped while handle {:?} still exists, owner entry cleared.",
                self.kind,
                self.hwnd.get()
            );
        }
    }
}

/// A non-owning back-reference to a window wrapper, for use inside its own
/// handlers without creating an ownership cycle.
#[derive(Clone)]
pub struct WindowRef {
    core: Weak<WindowCore>,
}

impl WindowRef {
    pub(crate) fn new(core: &Rc<WindowCore>) -> Self {
        Self {
            core: Rc::downgrade(core),
        }
    }

    /// The live handle, or `None` when the wrapper is gone or not live.
    pub fn hwnd(&self) -> Option<WindowHandle> {
        let core = self.core.upgrade()?;
        (core.lifecycle() == Lifecycle::Live).then(|| core.hwnd())
    }

    pub fn lifecycle(&self) -> Option<Lifecycle> {
        self.core.upgrade().map(|core| core.lifecycle())
    }
}

/// Result of `BaseWindow::register_class`. `atom` is `None` when an already
/// registered class was reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredClass {
    pub atom: Option<u16>,
    pub name: String,
}

pub struct BaseWindow {
    core: Rc<WindowCore>,
}

impl BaseWindow {
    pub fn new() -> Self {
        Self {
            core: WindowCore::new("window"),
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

    /*
     * Registers the window class. Registering a class that already exists is
     * not an error: the existing class is looked up and reused.
     */
    pub fn register_class(
        host: &dyn WindowHost,
        class: &WindowClass,
    ) -> PlatformResult<RegisteredClass> {
        let name = class.resolved_name();
        let atom = match host.register_class(class, &name) {
            Ok(atom) => Some(atom),
            Err(err) if err.system_code() == Some(ERROR_CLASS_ALREADY_EXISTS) => {
                log::debug!("BaseWindow: Window class '{name}' already registered, reusing it.");
                host.class_exists(class, &name)?;
                None
            }
            Err(err) => {
                log::error!("BaseWindow: registering window class '{name}' failed: {err}");
                return Err(err);
            }
        };
        Ok(RegisteredClass { atom, name })
    }

    /*
     * Creates the window. The handle is recorded during `WM_NCCREATE`
     * processing, before this call returns.
     */
    pub fn create_window(
        &self,
        host: &dyn WindowHost,
        request: &CreateWindowRequest,
    ) -> PlatformResult<WindowHandle> {
        if self.core.lifecycle() != Lifecycle::Uncreated {
            return Err(PlatformError::logic("Cannot create a window twice."));
        }

        let token: Box<Weak<WindowCore>> = Box::new(Rc::downgrade(&self.core));
        let create_params = &*token as *const Weak<WindowCore> as *mut c_void;
        let hwnd = host.create_window(request, create_params)?;

        if self.core.lifecycle() == Lifecycle::Uncreated {
            log::warn!(
                "BaseWindow: window {hwnd:?} of class '{}' was created without passing through the trampoline.",
                request.class_name
            );
        }
        Ok(hwnd)
    }

    pub fn ui_thread(&self, host: &dyn WindowHost) -> PlatformResult<UiThreadHandle> {
        self.core.ui_thread(host)
    }
}

impl Default for BaseWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BaseWindow {
    fn drop(&mut self) {
        self.core.release();
    }
}

/*
 * The window procedure. Host implementations call this for every message the
 * OS delivers to a window of a class registered through `register_class`.
 */
pub fn window_proc(host: &dyn WindowHost, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize {
    let core = if msg == WM_NCCREATE {
        claim_creation(hwnd, params)
    } else {
        owner_of(hwnd)
    };

    // No owner: before WM_NCCREATE, after WM_NCDESTROY, or a foreign window.
    let Some(core) = core else {
        return host.default_window_proc(hwnd, msg, params);
    };

    let ret = core.dispatch(host, msg, params);

    if msg == WM_NCDESTROY {
        detach_owner(hwnd);
        core.go_destroyed();
    }
    ret.unwrap_or_else(|| host.default_window_proc(hwnd, msg, params))
}

fn claim_creation(hwnd: WindowHandle, params: RawParams) -> Option<Rc<WindowCore>> {
    if params.lparam == 0 {
        return None;
    }
    // SAFETY: for WM_NCCREATE lparam points to a CREATESTRUCTW, whose first
    // field CreateParamsHeader mirrors.
    let header = unsafe { &*(params.lparam as *const CreateParamsHeader) };
    if header.create_params.is_null() {
        return None;
    }
    // SAFETY: non-null creation params of our classes are always the token
    // boxed by `BaseWindow::create_window`, alive until CreateWindowEx returns.
    let weak = unsafe { &*(header.create_params as *const Weak<WindowCore>) }.clone();
    let core = weak.upgrade()?;
    attach_owner(hwnd, weak);
    core.go_live(hwnd);
    Some(core)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;
    use crate::types::{WM_CLOSE, WM_CREATE, WM_DESTROY};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn request() -> CreateWindowRequest {
        CreateWindowRequest {
            class_name: "TEST_WND".to_string(),
            title: Some("Test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn creation_makes_window_live_and_routes_messages() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        let created = Rc::new(Cell::new(0));
        let c = Rc::clone(&created);
        window
            .on_message(WM_CREATE, move |_| {
                c.set(c.get() + 1);
                Ok(0)
            })
            .unwrap();

        let hwnd = window.create_window(&host, &request()).unwrap();
        assert_eq!(window.hwnd(), hwnd);
        assert_eq!(window.lifecycle(), Lifecycle::Live);
        assert_eq!(created.get(), 1);
        assert!(owner_of(hwnd).is_some());
    }

    #[test]
    fn handled_message_returns_handler_value_and_unhandled_falls_back() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        window
            .on_message(0x0400, move |p| {
                h.set(h.get() + 1);
                Ok(p.lparam * 2)
            })
            .unwrap();
        let hwnd = window.create_window(&host, &request()).unwrap();

        let ret = host.deliver(hwnd, 0x0400, RawParams::new(0, 21));
        assert_eq!(ret, 42);
        assert_eq!(hits.get(), 1);

        let ret = host.deliver(hwnd, 0x0401, RawParams::default());
        assert_eq!(ret, FakeHost::DEFAULT_PROC_RESULT);
        assert_eq!(hits.get(), 1);
        assert!(host.default_proc_calls().contains(&(hwnd, 0x0401)));
    }

    #[test]
    fn second_creation_is_a_logic_fault() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        window.create_window(&host, &request()).unwrap();
        let err = window.create_window(&host, &request()).unwrap_err();
        assert!(matches!(err, PlatformError::Logic(_)));
    }

    #[test]
    fn registration_after_creation_is_rejected() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        window.create_window(&host, &request()).unwrap();

        let err = window.on_message(0x0400, |_| Ok(0)).unwrap_err();
        assert!(matches!(err, PlatformError::Logic(_)));
        assert!(window.on_command(1, |_| Ok(0)).is_err());
        assert!(window.on_notify(1, -2, |_| Ok(0)).is_err());
    }

    #[test]
    fn destruction_clears_owner_and_handle() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let o = Rc::clone(&order);
        window
            .on_message(WM_NCDESTROY, move |_| {
                o.borrow_mut().push("ncdestroy handler");
                Ok(0)
            })
            .unwrap();
        let hwnd = window.create_window(&host, &request()).unwrap();

        host.destroy_window(hwnd);
        assert_eq!(*order.borrow(), vec!["ncdestroy handler"]);
        assert_eq!(window.lifecycle(), Lifecycle::Destroyed);
        assert!(window.hwnd().is_null());
        assert!(owner_of(hwnd).is_none());

        // Late messages get default processing, never the stale owner.
        let ret = host.deliver(hwnd, WM_CLOSE, RawParams::default());
        assert_eq!(ret, FakeHost::DEFAULT_PROC_RESULT);
        assert!(window.create_window(&host, &request()).is_err());
    }

    #[test]
    fn destroy_handler_sees_live_window() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        let me = window.downgrade();
        let seen = Rc::new(Cell::new(WindowHandle::NULL));
        let s = Rc::clone(&seen);
        window
            .on_message(WM_DESTROY, move |_| {
                s.set(me.hwnd().unwrap_or_default());
                Ok(0)
            })
            .unwrap();
        let hwnd = window.create_window(&host, &request()).unwrap();
        host.destroy_window(hwnd);
        assert_eq!(seen.get(), hwnd);
    }

    #[test]
    fn dropped_wrapper_falls_back_to_default_processing() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        window.on_message(0x0400, |_| Ok(1)).unwrap();
        let hwnd = window.create_window(&host, &request()).unwrap();
        drop(window);

        assert!(owner_of(hwnd).is_none());
        assert_eq!(
            host.deliver(hwnd, 0x0400, RawParams::default()),
            FakeHost::DEFAULT_PROC_RESULT
        );
    }

    #[test]
    fn creation_without_token_gets_default_processing() {
        let host = FakeHost::new();
        let header = CreateParamsHeader {
            create_params: std::ptr::null_mut(),
        };
        let hwnd = WindowHandle::from_raw(0x9999);
        let ret = window_proc(
            &host,
            hwnd,
            WM_NCCREATE,
            RawParams::new(0, &header as *const CreateParamsHeader as isize),
        );
        assert_eq!(ret, FakeHost::DEFAULT_PROC_RESULT);
        assert!(owner_of(hwnd).is_none());
    }

    #[test]
    fn back_reference_does_not_keep_window_alive() {
        let window = BaseWindow::new();
        let me = window.downgrade();
        window
            .on_message(0x0400, move |_| Ok(me.hwnd().map_or(0, |h| h.raw() as isize)))
            .unwrap();
        let weak = window.downgrade();
        drop(window);
        assert!(weak.lifecycle().is_none());
    }

    #[test]
    fn class_registration_is_idempotent() {
        let host = FakeHost::new();
        let class = WindowClass {
            class_name: Some("SHARED".to_string()),
            ..Default::default()
        };
        let first = BaseWindow::register_class(&host, &class).unwrap();
        let second = BaseWindow::register_class(&host, &class).unwrap();
        assert!(first.atom.is_some());
        assert_eq!(second.atom, None);
        assert_eq!(first.name, "SHARED");
        assert_eq!(second.name, "SHARED");
    }

    #[test]
    fn class_registration_failure_is_propagated() {
        let host = FakeHost::new();
        host.fail_next_class_registration(5);
        let err = BaseWindow::register_class(&host, &WindowClass::default()).unwrap_err();
        assert_eq!(err.system_code(), Some(5));
    }

    #[test]
    fn failed_creation_reports_system_error_and_stays_uncreated() {
        let host = FakeHost::new();
        host.fail_next_creation(1407);
        let window = BaseWindow::new();
        let err = window.create_window(&host, &request()).unwrap_err();
        assert_eq!(err.system_code(), Some(1407));
        assert_eq!(window.lifecycle(), Lifecycle::Uncreated);
        assert!(window.on_message(1, |_| Ok(0)).is_ok());
    }

    #[test]
    fn faulting_handler_requests_quit() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        window
            .on_message(0x0400, |_| Err(PlatformError::logic("bad state")))
            .unwrap();
        let hwnd = window.create_window(&host, &request()).unwrap();

        assert_eq!(host.deliver(hwnd, 0x0400, RawParams::default()), 0);
        assert_eq!(host.sink().alerts()[0].0, "Logic exception");
        assert_eq!(host.sink().quit_codes(), vec![crate::fault::FAULT_EXIT_CODE]);
    }

    #[test]
    fn ui_thread_requires_live_window() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        assert!(window.ui_thread(&host).is_err());
    }

    #[test]
    fn worker_task_runs_only_when_ui_thread_pumps() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        let hwnd = window.create_window(&host, &request()).unwrap();
        let ui = window.ui_thread(&host).unwrap();
        let counter = Arc::new(AtomicU32::new(0));

        let c = Arc::clone(&counter);
        let worker = std::thread::spawn(move || {
            ui.run(move || {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });

        let pending = host.wait_for_cross_thread_send();
        assert_eq!(pending, hwnd);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        host.pump_cross_thread_send();
        worker.join().unwrap().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn worker_task_for_destroyed_window_is_not_run() {
        let host = FakeHost::new();
        let window = BaseWindow::new();
        let hwnd = window.create_window(&host, &request()).unwrap();
        let ui = window.ui_thread(&host).unwrap();
        host.destroy_window(hwnd);

        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        let worker = std::thread::spawn(move || {
            ui.run(move || {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });
        host.wait_for_cross_thread_send();
        host.pump_cross_thread_send();

        assert!(worker.join().unwrap().is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}

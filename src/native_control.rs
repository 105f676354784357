/*
 * Native control wrapper. A control is either created as a child window or
 * assigned from an existing dialog item. If subclass handlers were registered
 * beforehand, the crate's subclass procedure is installed on the control; each
 * installation gets a process-unique subclass id which doubles as the key of
 * the side-table that finds the owning wrapper again.
 */

use crate::error::{PlatformError, Result as PlatformResult};
use crate::fault::{self, FaultPolicy};
use crate::host::WindowHost;
use crate::registry::OwnerTable;
use crate::store::HandlerStore;
use crate::types::{ControlRequest, Lifecycle, RawParams, WM_NCDESTROY, WindowHandle};

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_SUBCLASS_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static CONTROL_OWNERS: RefCell<OwnerTable<usize, ControlCore>> =
        RefCell::new(OwnerTable::new());
}

fn control_of(subclass_id: usize) -> Option<Rc<ControlCore>> {
    CONTROL_OWNERS.with(|table| table.borrow().lookup(subclass_id))
}

struct ControlCore {
    hwnd: Cell<WindowHandle>,
    ctrl_id: Cell<i32>,
    lifecycle: Cell<Lifecycle>,
    subclass_id: Cell<usize>,
    handlers: RefCell<HandlerStore<u32>>,
}

impl ControlCore {
    fn release_subclass(&self, host: &dyn WindowHost) {
        let id = self.subclass_id.replace(0);
        if id == 0 {
            return;
        }
        host.remove_subclass(self.hwnd.get(), id);
        CONTROL_OWNERS.with(|table| table.borrow_mut().detach(id));
        log::debug!("BaseNativeControl: subclass {id} removed from {:?}.", self.hwnd.get());
    }
}

pub struct BaseNativeControl {
    core: Rc<ControlCore>,
}

impl BaseNativeControl {
    pub fn new() -> Self {
        Self {
            core: Rc::new(ControlCore {
                hwnd: Cell::new(WindowHandle::NULL),
                ctrl_id: Cell::new(0),
                lifecycle: Cell::new(Lifecycle::Uncreated),
                subclass_id: Cell::new(0),
                handlers: RefCell::new(HandlerStore::new()),
            }),
        }
    }

    pub fn hwnd(&self) -> WindowHandle {
        self.core.hwnd.get()
    }

    /// The control id given at creation or assignment.
    pub fn id(&self) -> i32 {
        self.core.ctrl_id.get()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.core.lifecycle.get()
    }

    pub fn on_subclass_message<F>(&self, msg: u32, func: F) -> PlatformResult<()>
    where
        F: Fn(RawParams) -> PlatformResult<isize> + 'static,
    {
        self.ensure_unassigned("add a subclass handler")?;
        self.core.handlers.borrow_mut().add(msg, Box::new(func));
        Ok(())
    }

    pub fn on_subclass_messages<F>(&self, msgs: &[u32], func: F) -> PlatformResult<()>
    where
        F: Fn(RawParams) -> PlatformResult<isize> + 'static,
    {
        self.ensure_unassigned("add subclass handlers")?;
        self.core.handlers.borrow_mut().add_many(msgs, Box::new(func));
        Ok(())
    }

    fn ensure_unassigned(&self, what: &str) -> PlatformResult<()> {
        if self.core.lifecycle.get() != Lifecycle::Uncreated {
            return Err(PlatformError::logic(format!(
                "Cannot {what} after the control was created."
            )));
        }
        Ok(())
    }

    fn check_parent(&self, parent: Option<WindowHandle>) -> PlatformResult<WindowHandle> {
        if self.core.lifecycle.get() != Lifecycle::Uncreated {
            return Err(PlatformError::logic(
                "Cannot create or assign a control twice.",
            ));
        }
        match parent {
            Some(parent) if !parent.is_null() => Ok(parent),
            _ => Err(PlatformError::invalid_argument(
                "No parent window given for the control.",
            )),
        }
    }

    /// Takes over the dialog item `ctrl_id` of `parent`.
    pub fn assign(
        &self,
        host: &dyn WindowHost,
        parent: Option<WindowHandle>,
        ctrl_id: i32,
    ) -> PlatformResult<WindowHandle> {
        let parent = self.check_parent(parent)?;
        let hwnd = host.dialog_item(parent, ctrl_id)?;
        self.go_live(host, hwnd, ctrl_id)?;
        Ok(hwnd)
    }

    pub fn create_window(
        &self,
        host: &dyn WindowHost,
        parent: Option<WindowHandle>,
        request: &ControlRequest,
    ) -> PlatformResult<WindowHandle> {
        let parent = self.check_parent(parent)?;
        let hwnd = host.create_control(parent, request)?;
        self.go_live(host, hwnd, request.ctrl_id)?;
        Ok(hwnd)
    }

    fn go_live(&self, host: &dyn WindowHost, hwnd: WindowHandle, ctrl_id: i32) -> PlatformResult<()> {
        self.core.hwnd.set(hwnd);
        self.core.ctrl_id.set(ctrl_id);
        self.core.lifecycle.set(Lifecycle::Live);
        self.install_subclass_if_needed(host)
    }

    fn install_subclass_if_needed(&self, host: &dyn WindowHost) -> PlatformResult<()> {
        if self.core.handlers.borrow().is_empty() {
            return Ok(());
        }
        let id = NEXT_SUBCLASS_ID.fetch_add(1, Ordering::Relaxed);
        CONTROL_OWNERS.with(|table| table.borrow_mut().attach(id, Rc::downgrade(&self.core)));
        if let Err(err) = host.install_subclass(self.core.hwnd.get(), id) {
            CONTROL_OWNERS.with(|table| table.borrow_mut().detach(id));
            return Err(err);
        }
        self.core.subclass_id.set(id);
        log::debug!(
            "BaseNativeControl: subclass {id} installed on control {} ({:?}).",
            self.core.ctrl_id.get(),
            self.core.hwnd.get()
        );
        Ok(())
    }
}

impl Default for BaseNativeControl {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BaseNativeControl {
    fn drop(&mut self) {
        let id = self.core.subclass_id.get();
        if id != 0 {
            // The subclass itself stays until the control is destroyed and
            // falls back to default processing from then on.
            CONTROL_OWNERS.with(|table| table.borrow_mut().detach(id));
        }
    }
}

/*
 * The subclass procedure. Host implementations call it with the subclass id
 * passed to `WindowHost::install_subclass`.
 */
pub fn subclass_proc(
    host: &dyn WindowHost,
    hwnd: WindowHandle,
    msg: u32,
    params: RawParams,
    subclass_id: usize,
) -> isize {
    let core = control_of(subclass_id);

    let mut ret = None;
    if let Some(core) = &core {
        if !core.hwnd.get().is_null() {
            let handlers = core.handlers.borrow();
            if let Some(handler) = handlers.find(msg) {
                ret = Some(
                    fault::catch_all(host, FaultPolicy::PostQuit, || handler(params)).unwrap_or(0),
                );
            }
        }
    }

    if msg == WM_NCDESTROY {
        match &core {
            Some(core) => {
                core.release_subclass(host);
                core.hwnd.set(WindowHandle::NULL);
                core.lifecycle.set(Lifecycle::Destroyed);
            }
            None => host.remove_subclass(hwnd, subclass_id),
        }
    }
    ret.unwrap_or_else(|| host.default_subclass_proc(hwnd, msg, params))
}

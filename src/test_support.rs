/*
 * In-memory windowing host for unit tests. It hands out handles, keeps a
 * parent tree, and calls the crate's trampolines in the order the OS would:
 * `WM_NCCREATE`/`WM_CREATE` on creation, `WM_INITDIALOG` for dialogs,
 * `WM_DESTROY`/`WM_NCDESTROY` on destruction, the subclass procedure first for
 * subclassed controls. Cross-thread sends block the worker until the test
 * pumps them on the UI thread.
 */

use crate::base_dialog::dialog_proc;
use crate::base_window::window_proc;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::host::{FaultSink, MessageTransport, WindowHost};
use crate::native_control::subclass_proc;
use crate::types::{
    ControlRequest, CreateParamsHeader, CreateWindowRequest, DialogRequest, Pumped, QueuedMessage,
    RawParams, WM_CREATE, WM_DESTROY, WM_INITDIALOG, WM_NCCREATE, WM_NCDESTROY, WindowClass,
    WindowHandle,
};

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::c_void;
use std::sync::{Arc, Condvar, Mutex};

/// Records alerts and quit requests instead of showing them.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    alerts: Mutex<Vec<(String, String)>>,
    quit_codes: Mutex<Vec<i32>>,
}

impl RecordingSink {
    pub(crate) fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().unwrap().clone()
    }

    pub(crate) fn quit_codes(&self) -> Vec<i32> {
        self.quit_codes.lock().unwrap().clone()
    }
}

impl FaultSink for RecordingSink {
    fn alert(&self, title: &str, body: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }

    fn request_quit(&self, exit_code: i32) {
        self.quit_codes.lock().unwrap().push(exit_code);
    }
}

#[derive(Debug, Default)]
struct TransportState {
    pending: Option<QueuedMessage>,
    reply: Option<isize>,
}

#[derive(Debug, Default)]
struct FakeTransport {
    state: Mutex<TransportState>,
    changed: Condvar,
}

impl MessageTransport for FakeTransport {
    fn send_message(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize {
        let mut state = self.state.lock().unwrap();
        state.pending = Some(QueuedMessage { hwnd, msg, params });
        state.reply = None;
        self.changed.notify_all();
        loop {
            if let Some(reply) = state.reply.take() {
                return reply;
            }
            state = self.changed.wait(state).unwrap();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Window,
    Dialog,
    Plain,
}

pub(crate) struct FakeHost {
    sink: RecordingSink,
    transport: Arc<FakeTransport>,
    next_handle: Cell<usize>,
    kinds: RefCell<HashMap<WindowHandle, Kind>>,
    parents: RefCell<HashMap<WindowHandle, WindowHandle>>,
    classes: RefCell<HashMap<String, u16>>,
    subclasses: RefCell<HashMap<WindowHandle, Vec<usize>>>,
    queue: RefCell<VecDeque<Pumped>>,
    default_calls: RefCell<Vec<(WindowHandle, u32)>>,
    dispatched: RefCell<Vec<(WindowHandle, u32)>>,
    font_applied: RefCell<Vec<WindowHandle>>,
    accel_msgs: RefCell<HashSet<u32>>,
    dialog_handles: RefCell<HashSet<WindowHandle>>,
    destroy_triggers: RefCell<Vec<(WindowHandle, u32)>>,
    modal_result: Cell<isize>,
    modal_script: RefCell<Vec<u32>>,
    ended_dialogs: RefCell<HashMap<WindowHandle, isize>>,
    destroyed: RefCell<HashSet<WindowHandle>>,
    disabled: RefCell<HashSet<WindowHandle>>,
    shown: RefCell<Vec<(WindowHandle, i32)>>,
    focus: Cell<WindowHandle>,
    created: RefCell<Vec<CreateWindowRequest>>,
    class_failure: Cell<Option<u32>>,
    creation_failure: Cell<Option<u32>>,
    pump_failure: Cell<Option<u32>>,
}

impl FakeHost {
    pub(crate) const DEFAULT_PROC_RESULT: isize = -7777;

    pub(crate) fn new() -> Self {
        Self {
            sink: RecordingSink::default(),
            transport: Arc::new(FakeTransport::default()),
            next_handle: Cell::new(0x1000),
            kinds: RefCell::new(HashMap::new()),
            parents: RefCell::new(HashMap::new()),
            classes: RefCell::new(HashMap::new()),
            subclasses: RefCell::new(HashMap::new()),
            queue: RefCell::new(VecDeque::new()),
            default_calls: RefCell::new(Vec::new()),
            dispatched: RefCell::new(Vec::new()),
            font_applied: RefCell::new(Vec::new()),
            accel_msgs: RefCell::new(HashSet::new()),
            dialog_handles: RefCell::new(HashSet::new()),
            destroy_triggers: RefCell::new(Vec::new()),
            modal_result: Cell::new(0),
            modal_script: RefCell::new(Vec::new()),
            ended_dialogs: RefCell::new(HashMap::new()),
            destroyed: RefCell::new(HashSet::new()),
            disabled: RefCell::new(HashSet::new()),
            shown: RefCell::new(Vec::new()),
            focus: Cell::new(WindowHandle::NULL),
            created: RefCell::new(Vec::new()),
            class_failure: Cell::new(None),
            creation_failure: Cell::new(None),
            pump_failure: Cell::new(None),
        }
    }

    pub(crate) fn sink(&self) -> &RecordingSink {
        &self.sink
    }

    fn new_handle(&self, kind: Kind, parent: Option<WindowHandle>) -> WindowHandle {
        let hwnd = WindowHandle::from_raw(self.next_handle.get());
        self.next_handle.set(hwnd.raw() + 0x10);
        self.kinds.borrow_mut().insert(hwnd, kind);
        if let Some(parent) = parent.filter(|p| !p.is_null()) {
            self.parents.borrow_mut().insert(hwnd, parent);
        }
        hwnd
    }

    pub(crate) fn new_plain_window(&self) -> WindowHandle {
        self.new_handle(Kind::Plain, None)
    }

    pub(crate) fn new_child_window(&self, parent: WindowHandle) -> WindowHandle {
        self.new_handle(Kind::Plain, Some(parent))
    }

    /// Delivers a message the way the OS would, returning the procedure's result.
    pub(crate) fn deliver(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize {
        let top_subclass = self
            .subclasses
            .borrow()
            .get(&hwnd)
            .and_then(|ids| ids.last().copied());
        if let Some(id) = top_subclass {
            return subclass_proc(self, hwnd, msg, params, id);
        }

        let kind = self.kinds.borrow().get(&hwnd).copied();
        match kind {
            Some(Kind::Window) => window_proc(self, hwnd, msg, params),
            Some(Kind::Dialog) => dialog_proc(self, hwnd, msg, params),
            Some(Kind::Plain) | None => self.default_window_proc(hwnd, msg, params),
        }
    }

    pub(crate) fn default_proc_calls(&self) -> Vec<(WindowHandle, u32)> {
        self.default_calls.borrow().clone()
    }

    pub(crate) fn dispatched(&self) -> Vec<(WindowHandle, u32)> {
        self.dispatched.borrow().clone()
    }

    pub(crate) fn font_applied_to(&self) -> Vec<WindowHandle> {
        self.font_applied.borrow().clone()
    }

    pub(crate) fn subclasses_of(&self, hwnd: WindowHandle) -> Vec<usize> {
        self.subclasses
            .borrow()
            .get(&hwnd)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn post(&self, msg: QueuedMessage) {
        self.queue.borrow_mut().push_back(Pumped::Message(msg));
    }

    pub(crate) fn post_quit(&self, exit_code: i32) {
        self.queue.borrow_mut().push_back(Pumped::Quit(exit_code));
    }

    pub(crate) fn pending_messages(&self) -> usize {
        self.queue.borrow().len()
    }

    pub(crate) fn accept_accelerator_for(&self, msg: u32) {
        self.accel_msgs.borrow_mut().insert(msg);
    }

    pub(crate) fn accept_dialog_messages_for(&self, hwnd: WindowHandle) {
        self.dialog_handles.borrow_mut().insert(hwnd);
    }

    /// Dispatching `msg` to `hwnd` from the queue destroys the window afterwards.
    pub(crate) fn destroy_on(&self, hwnd: WindowHandle, msg: u32) {
        self.destroy_triggers.borrow_mut().push((hwnd, msg));
    }

    pub(crate) fn set_modal_result(&self, result: isize) {
        self.modal_result.set(result);
    }

    /// Messages delivered to the next modal dialog while it runs, until it ends.
    pub(crate) fn script_modal(&self, msgs: &[u32]) {
        *self.modal_script.borrow_mut() = msgs.to_vec();
    }

    pub(crate) fn is_enabled(&self, hwnd: WindowHandle) -> bool {
        !self.disabled.borrow().contains(&hwnd)
    }

    pub(crate) fn is_destroyed(&self, hwnd: WindowHandle) -> bool {
        self.destroyed.borrow().contains(&hwnd)
    }

    pub(crate) fn shown(&self) -> Vec<(WindowHandle, i32)> {
        self.shown.borrow().clone()
    }

    pub(crate) fn created_requests(&self) -> Vec<CreateWindowRequest> {
        self.created.borrow().clone()
    }

    pub(crate) fn fail_next_class_registration(&self, code: u32) {
        self.class_failure.set(Some(code));
    }

    pub(crate) fn fail_next_creation(&self, code: u32) {
        self.creation_failure.set(Some(code));
    }

    pub(crate) fn fail_next_pump(&self, code: u32) {
        self.pump_failure.set(Some(code));
    }

    /// Blocks until a worker thread is inside a cross-thread send; returns its target.
    pub(crate) fn wait_for_cross_thread_send(&self) -> WindowHandle {
        let mut state = self.transport.state.lock().unwrap();
        loop {
            if let Some(pending) = state.pending {
                return pending.hwnd;
            }
            state = self.transport.changed.wait(state).unwrap();
        }
    }

    /// Processes the pending cross-thread send on this thread and releases the worker.
    pub(crate) fn pump_cross_thread_send(&self) {
        self.wait_for_cross_thread_send();
        let pending = self.transport.state.lock().unwrap().pending.take().unwrap();
        let reply = self.deliver(pending.hwnd, pending.msg, pending.params);
        let mut state = self.transport.state.lock().unwrap();
        state.reply = Some(reply);
        self.transport.changed.notify_all();
    }

    fn is_descendant(&self, ancestor: WindowHandle, hwnd: WindowHandle) -> bool {
        let parents = self.parents.borrow();
        let mut current = hwnd;
        while let Some(&parent) = parents.get(&current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }
}

impl FaultSink for FakeHost {
    fn alert(&self, title: &str, body: &str) {
        self.sink.alert(title, body);
    }

    fn request_quit(&self, exit_code: i32) {
        self.sink.request_quit(exit_code);
        self.post_quit(exit_code);
    }
}

impl WindowHost for FakeHost {
    fn default_window_proc(&self, hwnd: WindowHandle, msg: u32, _params: RawParams) -> isize {
        self.default_calls.borrow_mut().push((hwnd, msg));
        Self::DEFAULT_PROC_RESULT
    }

    fn default_subclass_proc(&self, hwnd: WindowHandle, msg: u32, _params: RawParams) -> isize {
        self.default_calls.borrow_mut().push((hwnd, msg));
        Self::DEFAULT_PROC_RESULT
    }

    fn register_class(&self, _class: &WindowClass, name: &str) -> PlatformResult<u16> {
        if let Some(code) = self.class_failure.take() {
            return Err(PlatformError::system("RegisterClassEx failed.", code));
        }
        let mut classes = self.classes.borrow_mut();
        if classes.contains_key(name) {
            return Err(PlatformError::system("RegisterClassEx failed.", 1410));
        }
        let atom = 0xC000 + classes.len() as u16;
        classes.insert(name.to_string(), atom);
        Ok(atom)
    }

    fn class_exists(&self, _class: &WindowClass, name: &str) -> PlatformResult<()> {
        if self.classes.borrow().contains_key(name) {
            Ok(())
        } else {
            Err(PlatformError::system("GetClassInfoEx failed.", 1411))
        }
    }

    fn create_window(
        &self,
        request: &CreateWindowRequest,
        create_params: *mut c_void,
    ) -> PlatformResult<WindowHandle> {
        if let Some(code) = self.creation_failure.take() {
            return Err(PlatformError::system("CreateWindowEx failed.", code));
        }
        let hwnd = self.new_handle(Kind::Window, request.parent);
        self.created.borrow_mut().push(request.clone());
        let header = CreateParamsHeader { create_params };
        let create = RawParams::new(0, &header as *const CreateParamsHeader as isize);
        self.deliver(hwnd, WM_NCCREATE, create);
        self.deliver(hwnd, WM_CREATE, create);
        Ok(hwnd)
    }

    fn create_dialog(
        &self,
        request: &DialogRequest,
        owner_token: isize,
    ) -> PlatformResult<WindowHandle> {
        if let Some(code) = self.creation_failure.take() {
            return Err(PlatformError::system("CreateDialogParam failed.", code));
        }
        let hwnd = self.new_handle(Kind::Dialog, request.parent);
        self.deliver(hwnd, WM_INITDIALOG, RawParams::new(0, owner_token));
        Ok(hwnd)
    }

    fn dialog_box(&self, request: &DialogRequest, owner_token: isize) -> PlatformResult<isize> {
        let hwnd = self.create_dialog(request, owner_token)?;
        let script = std::mem::take(&mut *self.modal_script.borrow_mut());
        for msg in script {
            if self.ended_dialogs.borrow().contains_key(&hwnd) {
                break;
            }
            self.deliver(hwnd, msg, RawParams::default());
        }
        self.destroy_window(hwnd);
        let ended = self.ended_dialogs.borrow_mut().remove(&hwnd);
        Ok(ended.unwrap_or(self.modal_result.get()))
    }

    fn set_ui_font_on_children(&self, dialog: WindowHandle) {
        self.font_applied.borrow_mut().push(dialog);
    }

    fn dialog_item(&self, parent: WindowHandle, _ctrl_id: i32) -> PlatformResult<WindowHandle> {
        Ok(self.new_handle(Kind::Plain, Some(parent)))
    }

    fn create_control(
        &self,
        parent: WindowHandle,
        _request: &ControlRequest,
    ) -> PlatformResult<WindowHandle> {
        Ok(self.new_handle(Kind::Plain, Some(parent)))
    }

    fn install_subclass(&self, hwnd: WindowHandle, subclass_id: usize) -> PlatformResult<()> {
        self.subclasses
            .borrow_mut()
            .entry(hwnd)
            .or_default()
            .push(subclass_id);
        Ok(())
    }

    fn remove_subclass(&self, hwnd: WindowHandle, subclass_id: usize) {
        if let Some(ids) = self.subclasses.borrow_mut().get_mut(&hwnd) {
            ids.retain(|&id| id != subclass_id);
        }
    }

    fn next_message(&self) -> PlatformResult<Pumped> {
        if let Some(code) = self.pump_failure.take() {
            return Err(PlatformError::system("GetMessage failed.", code));
        }
        self.queue
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| PlatformError::runtime("Fake message queue is empty."))
    }

    fn root_ancestor(&self, hwnd: WindowHandle) -> WindowHandle {
        let parents = self.parents.borrow();
        let mut current = hwnd;
        while let Some(&parent) = parents.get(&current) {
            current = parent;
        }
        current
    }

    fn is_child(&self, parent: WindowHandle, child: WindowHandle) -> bool {
        self.is_descendant(parent, child)
    }

    fn is_dialog_message(&self, dialog: WindowHandle, msg: &QueuedMessage) -> bool {
        self.dialog_handles.borrow().contains(&dialog)
            && (msg.hwnd == dialog || self.is_descendant(dialog, msg.hwnd))
    }

    fn translate_accelerator(
        &self,
        _hwnd: WindowHandle,
        _accel: usize,
        msg: &QueuedMessage,
    ) -> bool {
        self.accel_msgs.borrow().contains(&msg.msg)
    }

    fn translate_and_dispatch(&self, msg: &QueuedMessage) {
        self.dispatched.borrow_mut().push((msg.hwnd, msg.msg));
        self.deliver(msg.hwnd, msg.msg, msg.params);
        let triggered = self
            .destroy_triggers
            .borrow()
            .contains(&(msg.hwnd, msg.msg));
        if triggered {
            self.destroy_window(msg.hwnd);
        }
    }

    fn transport(&self) -> Arc<dyn MessageTransport> {
        self.transport.clone()
    }

    fn send_message(&self, hwnd: WindowHandle, msg: u32, params: RawParams) -> isize {
        self.deliver(hwnd, msg, params)
    }

    fn show_window(&self, hwnd: WindowHandle, cmd_show: i32) -> PlatformResult<()> {
        self.shown.borrow_mut().push((hwnd, cmd_show));
        Ok(())
    }

    fn enable_window(&self, hwnd: WindowHandle, enable: bool) {
        let mut disabled = self.disabled.borrow_mut();
        if enable {
            disabled.remove(&hwnd);
        } else {
            disabled.insert(hwnd);
        }
    }

    fn destroy_window(&self, hwnd: WindowHandle) {
        if !self.destroyed.borrow_mut().insert(hwnd) {
            return;
        }
        self.deliver(hwnd, WM_DESTROY, RawParams::default());
        self.deliver(hwnd, WM_NCDESTROY, RawParams::default());
    }

    fn end_dialog(&self, dialog: WindowHandle, result: isize) {
        self.ended_dialogs.borrow_mut().insert(dialog, result);
    }

    fn window_owner(&self, hwnd: WindowHandle) -> WindowHandle {
        self.parents
            .borrow()
            .get(&hwnd)
            .copied()
            .unwrap_or(WindowHandle::NULL)
    }

    fn focused(&self) -> WindowHandle {
        self.focus.get()
    }

    fn set_focus(&self, hwnd: WindowHandle) {
        self.focus.set(hwnd);
    }

    // Handles grow with creation order, so the smallest child came first.
    fn first_tab_item(&self, hwnd: WindowHandle) -> WindowHandle {
        self.parents
            .borrow()
            .iter()
            .filter(|&(_, parent)| *parent == hwnd)
            .map(|(&child, _)| child)
            .min_by_key(|child| child.raw())
            .unwrap_or(WindowHandle::NULL)
    }

    fn screen_size(&self) -> (i32, i32) {
        (1920, 1080)
    }

    fn load_accelerators(&self, _instance: usize, resource_id: i32) -> PlatformResult<usize> {
        Ok(0xACC0_0000 + resource_id as usize)
    }
}

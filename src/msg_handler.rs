/*
 * Owns the three handler tables of a window or dialog (plain messages,
 * `WM_COMMAND` ids and `WM_NOTIFY` (id, code) pairs) and the routing rule that
 * picks a table for an incoming message. Matched handlers run inside the fault
 * boundary.
 *
 * Also home of the "run on UI thread" relay: a worker thread packs a closure,
 * sends a private message to the window, and the UI thread unpacks and runs it
 * while the worker is blocked in the send.
 */

use crate::error::{PlatformError, Result as PlatformResult};
use crate::fault::{self, FaultPolicy};
use crate::host::{FaultSink, MessageTransport, default_fault_sink};
use crate::store::{Handler, HandlerStore};
use crate::types::{
    NotifyHeader, NotifyKey, RawParams, UI_THREAD_MAGIC, WM_COMMAND, WM_NOTIFY, WM_UI_THREAD,
    WindowHandle, loword,
};

use std::sync::Arc;
use std::thread::JoinHandle;

pub(crate) type UiTask = Box<dyn FnOnce() -> PlatformResult<()> + Send>;

// Heap package carried through the private message. The sending thread owns
// it; the UI thread only takes the task out.
struct ThreadPack {
    task: Option<UiTask>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Message(u32),
    Command(u16),
    Notify(NotifyKey),
}

fn route(msg: u32, params: RawParams) -> Option<Route> {
    match msg {
        WM_COMMAND => Some(Route::Command(loword(params.wparam))),
        WM_NOTIFY => {
            if params.lparam == 0 {
                log::warn!("MsgHandler: WM_NOTIFY without a notification header, ignored.");
                return None;
            }
            // SAFETY: for WM_NOTIFY the OS guarantees lparam points to an NMHDR,
            // which NotifyHeader mirrors, valid for the duration of the call.
            let header = unsafe { &*(params.lparam as *const NotifyHeader) };
            Some(Route::Notify(NotifyKey::new(
                header.id_from,
                header.code as i32,
            )))
        }
        other => Some(Route::Message(other)),
    }
}

pub(crate) struct MsgHandler {
    msgs: HandlerStore<u32>,
    cmds: HandlerStore<u16>,
    nfys: HandlerStore<NotifyKey>,
}

impl MsgHandler {
    pub(crate) fn new() -> Self {
        Self {
            msgs: HandlerStore::new(),
            cmds: HandlerStore::new(),
            nfys: HandlerStore::new(),
        }
    }

    pub(crate) fn on_message(&mut self, msg: u32, handler: Handler) {
        self.msgs.add(msg, handler);
    }

    pub(crate) fn on_messages(&mut self, msgs: &[u32], handler: Handler) {
        self.msgs.add_many(msgs, handler);
    }

    pub(crate) fn on_command(&mut self, cmd: u16, handler: Handler) {
        self.cmds.add(cmd, handler);
    }

    pub(crate) fn on_commands(&mut self, cmds: &[u16], handler: Handler) {
        self.cmds.add_many(cmds, handler);
    }

    pub(crate) fn on_notify(&mut self, key: NotifyKey, handler: Handler) {
        self.nfys.add(key, handler);
    }

    pub(crate) fn on_notifies(&mut self, keys: &[NotifyKey], handler: Handler) {
        self.nfys.add_many(keys, handler);
    }

    /*
     * Finds and runs the handler for this message. `None` means nothing was
     * registered and the caller must fall back to default processing; a handler
     * that faulted yields `Some(0)` after the fault has been reported.
     */
    pub(crate) fn exec<S>(&self, sink: &S, msg: u32, params: RawParams) -> Option<isize>
    where
        S: FaultSink + ?Sized,
    {
        if msg == WM_UI_THREAD && params.wparam == UI_THREAD_MAGIC && params.lparam != 0 {
            run_ui_thread_pack(sink, params.lparam);
            return Some(0);
        }

        let handler = match route(msg, params)? {
            Route::Message(m) => self.msgs.find(m),
            Route::Command(c) => self.cmds.find(c),
            Route::Notify(key) => self.nfys.find(key),
        }?;

        Some(fault::catch_all(sink, FaultPolicy::PostQuit, || handler(params)).unwrap_or(0))
    }
}

impl Default for MsgHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn run_ui_thread_pack<S: FaultSink + ?Sized>(sink: &S, lparam: isize) {
    // SAFETY: lparam was produced by `UiThreadHandle::run` from a live
    // `Box<ThreadPack>`, and the sender is blocked in the synchronous send
    // until this call returns.
    let pack = unsafe { &mut *(lparam as *mut ThreadPack) };
    match pack.task.take() {
        Some(task) => {
            fault::catch_all(sink, FaultPolicy::PostQuit, task);
        }
        None => log::warn!("MsgHandler: UI thread package delivered twice, ignored."),
    }
}

/// A `Send` handle that lets worker threads run closures on the UI thread
/// owning a window. Obtained from a live `BaseWindow` or `BaseDialog`.
#[derive(Clone)]
pub struct UiThreadHandle {
    hwnd: WindowHandle,
    transport: Arc<dyn MessageTransport>,
}

impl std::fmt::Debug for UiThreadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiThreadHandle")
            .field("hwnd", &self.hwnd)
            .finish_non_exhaustive()
    }
}

impl UiThreadHandle {
    pub(crate) fn new(hwnd: WindowHandle, transport: Arc<dyn MessageTransport>) -> Self {
        Self { hwnd, transport }
    }

    pub fn hwnd(&self) -> WindowHandle {
        self.hwnd
    }

    /*
     * Runs `func` on the window's UI thread and returns once it has run.
     * Fails when the window did not process the message (it was already
     * destroyed, for instance); `func` is then dropped on this thread.
     */
    pub fn run<F>(&self, func: F) -> PlatformResult<()>
    where
        F: FnOnce() -> PlatformResult<()> + Send + 'static,
    {
        let raw = Box::into_raw(Box::new(ThreadPack {
            task: Some(Box::new(func)),
        }));
        self.transport.send_message(
            self.hwnd,
            WM_UI_THREAD,
            RawParams::new(UI_THREAD_MAGIC, raw as isize),
        );
        // SAFETY: `raw` came from Box::into_raw above and the send has returned,
        // so the UI thread no longer touches the package.
        let pack = unsafe { Box::from_raw(raw) };

        if pack.task.is_some() {
            log::warn!(
                "UiThreadHandle: window {:?} did not process the UI thread message.",
                self.hwnd
            );
            return Err(PlatformError::runtime(format!(
                "Window {:?} did not run the UI thread task.",
                self.hwnd
            )));
        }
        Ok(())
    }
}

/// Runs `func` in a new detached thread. A fault inside it is reported, then
/// only that thread ends.
pub fn run_thread_detached<F>(func: F)
where
    F: FnOnce() -> PlatformResult<()> + Send + 'static,
{
    drop(run_thread_detached_with(default_fault_sink(), func));
}

/// Same as `run_thread_detached`, reporting to `sink`; the join handle is
/// returned for callers that want to wait.
pub fn run_thread_detached_with<F>(
    sink: Arc<dyn FaultSink + Send + Sync>,
    func: F,
) -> JoinHandle<()>
where
    F: FnOnce() -> PlatformResult<()> + Send + 'static,
{
    std::thread::spawn(move || {
        fault::catch_all(sink.as_ref(), FaultPolicy::Continue, func);
    })
}

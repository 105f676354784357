/*
 * Message pumps of the UI thread: the application loop, which also feeds
 * keyboard navigation to modeless child dialogs, and the nested loop that runs
 * while a modal window is open.
 */

use crate::base_window::WindowRef;
use crate::error::Result as PlatformResult;
use crate::host::WindowHost;
use crate::types::{Lifecycle, Pumped, QueuedMessage, WindowHandle};

use std::cell::RefCell;

// The children list is edited by handlers running inside `run_loop`.
#[derive(Debug, Default)]
pub struct MainLoop {
    modeless_children: RefCell<Vec<WindowHandle>>,
}

impl MainLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_modeless_child(&self, hwnd: WindowHandle) {
        self.modeless_children.borrow_mut().push(hwnd);
    }

    pub fn delete_modeless_child(&self, hwnd: WindowHandle) {
        let mut children = self.modeless_children.borrow_mut();
        if let Some(pos) = children.iter().position(|&h| h == hwnd) {
            children.remove(pos);
        }
    }

    pub fn modeless_children(&self) -> Vec<WindowHandle> {
        self.modeless_children.borrow().clone()
    }

    /*
     * Pumps messages until the quit request arrives and returns its exit code.
     * `main` is the application's main window; modeless children that are not
     * its descendants are skipped.
     */
    pub fn run_loop(
        &self,
        host: &dyn WindowHost,
        main: WindowHandle,
        accel: Option<usize>,
    ) -> PlatformResult<i32> {
        loop {
            let msg = match host.next_message()? {
                Pumped::Quit(exit_code) => {
                    log::debug!("MainLoop: quit received, exit code {exit_code}.");
                    return Ok(exit_code);
                }
                Pumped::Message(msg) => msg,
            };

            if self.is_modeless_msg(host, main, &msg) {
                continue;
            }

            let top_level = host.root_ancestor(msg.hwnd);
            if let Some(accel) = accel {
                if host.translate_accelerator(top_level, accel, &msg) {
                    continue;
                }
            }
            if host.is_dialog_message(top_level, &msg) {
                continue;
            }
            host.translate_and_dispatch(&msg);
        }
    }

    fn is_modeless_msg(&self, host: &dyn WindowHost, main: WindowHandle, msg: &QueuedMessage) -> bool {
        // Snapshot: dialog-message processing may dispatch and edit the list.
        self.modeless_children()
            .iter()
            .filter(|hwnd| !hwnd.is_null() && host.is_child(main, **hwnd))
            .any(|&hwnd| host.is_dialog_message(hwnd, msg))
    }
}

/*
 * Nested pump for a modal window. Returns once `modal` is no longer live. A
 * quit request ends the loop too, and is posted again so the outer loop sees it.
 */
pub fn run_modal_loop(host: &dyn WindowHost, modal: &WindowRef) -> PlatformResult<()> {
    let is_live = || modal.lifecycle() == Some(Lifecycle::Live);

    while is_live() {
        let msg = match host.next_message()? {
            Pumped::Quit(exit_code) => {
                log::debug!("MainLoop: quit during modal loop, forwarding exit code {exit_code}.");
                host.request_quit(exit_code);
                break;
            }
            Pumped::Message(msg) => msg,
        };

        let top_level = host.root_ancestor(msg.hwnd);
        if host.is_dialog_message(top_level, &msg) {
            continue;
        }
        host.translate_and_dispatch(&msg);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_window::BaseWindow;
    use crate::error::PlatformError;
    use crate::types::{CreateWindowRequest, RawParams, WM_CLOSE};
    use crate::test_support::FakeHost;

    const WM_KEYDOWN: u32 = 0x0100;

    fn queued(hwnd: WindowHandle, msg: u32) -> QueuedMessage {
        QueuedMessage {
            hwnd,
            msg,
            params: RawParams::default(),
        }
    }

    fn window(host: &FakeHost) -> (BaseWindow, WindowHandle) {
        let window = BaseWindow::new();
        let hwnd = window
            .create_window(
                host,
                &CreateWindowRequest {
                    class_name: "LOOP_WND".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        (window, hwnd)
    }

    #[test]
    fn loop_dispatches_until_quit_and_returns_exit_code() {
        let host = FakeHost::new();
        let (main, hwnd) = window(&host);
        host.post(queued(hwnd, 0x0400));
        host.post(queued(hwnd, 0x0401));
        host.post_quit(3);

        let code = MainLoop::new().run_loop(&host, main.hwnd(), None).unwrap();
        assert_eq!(code, 3);
        assert_eq!(host.dispatched(), vec![(hwnd, 0x0400), (hwnd, 0x0401)]);
    }

    #[test]
    fn accelerator_translation_consumes_message() {
        let host = FakeHost::new();
        let (main, hwnd) = window(&host);
        host.accept_accelerator_for(WM_KEYDOWN);
        host.post(queued(hwnd, WM_KEYDOWN));
        host.post(queued(hwnd, 0x0400));
        host.post_quit(0);

        MainLoop::new().run_loop(&host, main.hwnd(), Some(0xACC)).unwrap();
        assert_eq!(host.dispatched(), vec![(hwnd, 0x0400)]);
    }

    #[test]
    fn accelerator_is_ignored_without_table() {
        let host = FakeHost::new();
        let (main, hwnd) = window(&host);
        host.accept_accelerator_for(WM_KEYDOWN);
        host.post(queued(hwnd, WM_KEYDOWN));
        host.post_quit(0);

        MainLoop::new().run_loop(&host, main.hwnd(), None).unwrap();
        assert_eq!(host.dispatched(), vec![(hwnd, WM_KEYDOWN)]);
    }

    #[test]
    fn modeless_child_consumes_its_dialog_messages() {
        let host = FakeHost::new();
        let (main, hwnd) = window(&host);
        let child = host.new_child_window(hwnd);
        host.accept_dialog_messages_for(child);

        let main_loop = MainLoop::new();
        main_loop.add_modeless_child(child);
        host.post(queued(child, WM_KEYDOWN));
        host.post(queued(hwnd, 0x0400));
        host.post_quit(0);

        main_loop.run_loop(&host, main.hwnd(), None).unwrap();
        assert_eq!(host.dispatched(), vec![(hwnd, 0x0400)]);
    }

    #[test]
    fn modeless_children_can_be_removed() {
        let main_loop = MainLoop::new();
        let a = WindowHandle::from_raw(1);
        let b = WindowHandle::from_raw(2);
        main_loop.add_modeless_child(a);
        main_loop.add_modeless_child(b);
        main_loop.delete_modeless_child(a);
        main_loop.delete_modeless_child(WindowHandle::from_raw(9));
        assert_eq!(main_loop.modeless_children(), vec![b]);
    }

    #[test]
    fn failed_pump_is_a_system_error() {
        let host = FakeHost::new();
        host.fail_next_pump(6);
        let err = MainLoop::new()
            .run_loop(&host, WindowHandle::NULL, None)
            .unwrap_err();
        assert!(matches!(err, PlatformError::System { code: 6, .. }));
    }

    #[test]
    fn modal_loop_ends_when_modal_is_destroyed() {
        let host = FakeHost::new();
        let (modal, hwnd) = window(&host);
        // Dispatching WM_CLOSE destroys the window, as a modal's close handler does.
        host.destroy_on(hwnd, WM_CLOSE);
        host.post(queued(hwnd, WM_CLOSE));
        host.post(queued(hwnd, 0x0400));

        run_modal_loop(&host, &modal.downgrade()).unwrap();
        assert_eq!(modal.lifecycle(), Lifecycle::Destroyed);
        assert_eq!(host.dispatched(), vec![(hwnd, WM_CLOSE)]);
        assert_eq!(host.pending_messages(), 1);
    }

    #[test]
    fn modal_loop_forwards_quit() {
        let host = FakeHost::new();
        let (modal, _) = window(&host);
        host.post_quit(9);

        run_modal_loop(&host, &modal.downgrade()).unwrap();
        assert_eq!(modal.lifecycle(), Lifecycle::Live);
        assert_eq!(host.sink().quit_codes(), vec![9]);

        // The outer loop picks the forwarded quit up.
        let code = MainLoop::new().run_loop(&host, modal.hwnd(), None).unwrap();
        assert_eq!(code, 9);
    }
}

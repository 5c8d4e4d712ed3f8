// Host event dispatch integration tests

use winsync::client::{MouseActivate, SysCommand};
use winsync::record::Presence;
use winsync::testing::{harness, Harness, HostCommand, WindowSpec, DEFAULT_DESKTOP};
use winsync::{ClientMessage, ClientWindowModel, HostEvent, HostWindowId, Rect, SyncConfig, WindowId, WindowStyle};

const RECT: Rect = Rect::new(100, 100, 500, 400);

fn open(h: &Harness, spec: WindowSpec) -> (WindowId, HostWindowId) {
    let window = h.open(spec);
    let host = h.host_of(window).unwrap();
    (window, host)
}

fn sent(h: &Harness, window: WindowId, message: ClientMessage) -> bool {
    h.client.messages().contains(&(window, message))
}

#[test]
fn test_close_request_destroys_window() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT));

    h.event(HostEvent::CloseRequested { window: host });

    assert!(sent(&h, window, ClientMessage::SysCommand(SysCommand::Close)));
    assert!(h.sync.snapshot(window).is_none());
    assert!(h.host.window(host).is_none());
}

#[test]
fn test_close_request_respects_policy() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT));
    h.client.set_close_allowed(window, false);

    h.event(HostEvent::CloseRequested { window: host });

    assert!(h.client.messages().is_empty());
    assert!(h.sync.snapshot(window).is_some());
}

#[test]
fn test_eaten_click_performs_nothing() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT));
    h.client.set_mouse_activate(window, MouseActivate::ActivateAndEat);

    h.event(HostEvent::CloseRequested { window: host });

    assert!(h.sync.snapshot(window).is_some());
    assert_eq!(h.client.active_window(), None);
}

#[test]
fn test_commands_ignored_for_disabled_window() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(
        &h,
        WindowSpec::new(RECT).style(WindowStyle::OVERLAPPEDWINDOW | WindowStyle::DISABLED),
    );

    h.event(HostEvent::CloseRequested { window: host });
    h.event(HostEvent::MinimizeRequested { window: host });

    assert!(h.client.messages().is_empty());
    assert!(h.sync.snapshot(window).is_some());
}

#[test]
fn test_minimize_request_needs_minimize_box() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT).style(WindowStyle::CAPTION | WindowStyle::SYSMENU));

    h.event(HostEvent::MinimizeRequested { window: host });

    assert!(h.client.messages().is_empty());
    assert!(!h.client.style(window).contains(WindowStyle::MINIMIZE));
}

#[test]
fn test_minimize_request_minimizes() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT));

    h.event(HostEvent::MinimizeRequested { window: host });

    assert!(h.client.style(window).contains(WindowStyle::MINIMIZE));
    assert_eq!(h.client.active_window(), Some(window));
    assert!(h.sync.snapshot(window).unwrap().minimized());
    assert!(h.host.window(host).unwrap().state.minimized);

    // already minimized: nothing more to do
    h.client.take_messages();
    h.event(HostEvent::MinimizeRequested { window: host });
    assert!(h.client.messages().is_empty());
}

#[test]
fn test_host_minimize_and_unminimize() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT));

    h.event(HostEvent::DidMinimize { window: host });

    assert!(sent(&h, window, ClientMessage::SysCommand(SysCommand::Minimize)));
    assert!(h.client.style(window).contains(WindowStyle::MINIMIZE));
    assert!(h.sync.snapshot(window).unwrap().minimized());
    h.host.take_commands();
    h.client.take_messages();

    h.event(HostEvent::DidUnminimize { window: host });

    assert_eq!(h.client.messages(), vec![(window, ClientMessage::SysCommand(SysCommand::Restore))]);
    assert!(!h.client.style(window).contains(WindowStyle::MINIMIZE));
    assert_eq!(h.client.active_window(), Some(window));
    let record = h.sync.snapshot(window).unwrap();
    assert!(record.on_screen() && !record.minimized());
    // the host already put the window back, nothing is echoed
    assert_eq!(h.host.count(|c| matches!(c, HostCommand::SetFrame { .. })), 0);
}

#[test]
fn test_unminimize_follows_host_frame() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT));
    h.event(HostEvent::DidMinimize { window: host });
    // the user dragged the icon's window somewhere else on the host side
    h.host.place(host, Rect::new(295, 170, 705, 505));
    h.host.take_commands();

    h.event(HostEvent::DidUnminimize { window: host });

    assert_eq!(h.client.window_rect(window), Some(Rect::new(300, 200, 700, 500)));
    assert_eq!(h.sync.snapshot(window).unwrap().whole_rect, Rect::new(295, 170, 705, 505));
    assert_eq!(h.host.count(|c| matches!(c, HostCommand::SetFrame { .. })), 0);
}

#[test]
fn test_unminimize_of_shown_window_is_ignored() {
    let h = harness(SyncConfig::default());
    let (_, host) = open(&h, WindowSpec::new(RECT));
    h.host.take_commands();

    h.event(HostEvent::DidUnminimize { window: host });

    assert!(h.client.messages().is_empty());
    assert!(h.host.commands().is_empty());
}

#[test]
fn test_did_minimize_of_hidden_window_is_ignored() {
    let h = harness(SyncConfig::default());
    let window = h.client.create_window(WindowSpec::new(RECT));
    let host = h.host_of(window).unwrap();

    h.event(HostEvent::DidMinimize { window: host });

    assert!(h.client.messages().is_empty());
    let record = h.sync.snapshot(window).unwrap();
    assert_eq!(record.presence, Presence::Hidden);
    assert!(!record.minimized());
}

#[test]
fn test_maximize_then_restore_keeping_frame() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT));

    h.event(HostEvent::MaximizeRequested { window: host });

    assert!(h.client.style(window).contains(WindowStyle::MAXIMIZE));
    assert_eq!(h.client.window_rect(window), Some(DEFAULT_DESKTOP));

    h.event(HostEvent::RestoreRequested {
        window: host,
        keep_frame: true,
        frame: Rect::new(95, 70, 505, 405),
    });

    assert_eq!(h.client.restore_rect(window), Some(RECT));
    assert!(!h.client.style(window).contains(WindowStyle::MAXIMIZE));
    assert_eq!(h.client.window_rect(window), Some(RECT));
}

#[test]
fn test_restore_request_needs_maximized_window() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT));

    h.event(HostEvent::RestoreRequested {
        window: host,
        keep_frame: true,
        frame: Rect::new(0, 0, 10, 10),
    });

    assert!(h.client.messages().is_empty());
    assert_eq!(h.client.restore_rect(window), None);
}

#[test]
fn test_brought_forward_raises_logical_window() {
    let h = harness(SyncConfig::default());
    let (a, a_host) = open(&h, WindowSpec::new(RECT));
    let (b, b_host) = open(&h, WindowSpec::new(RECT.offset(20, 20)));

    h.event(HostEvent::BroughtForward { window: a_host });

    assert_eq!(h.client.top_level_windows(), vec![a, b]);
    assert_eq!(h.host.front_to_back(), vec![a_host, b_host]);
}

#[test]
fn test_resize_ended_exits_size_move() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT));

    h.event(HostEvent::ResizeEnded { window: host });

    assert_eq!(h.client.messages(), vec![(window, ClientMessage::ExitSizeMove)]);
}

#[test]
fn test_reassert_pushes_frame_again() {
    let h = harness(SyncConfig::default());
    let (window, host) = open(&h, WindowSpec::new(RECT));
    h.host.take_commands();

    h.event(HostEvent::ReassertWindowPosition { window: host });

    let whole = h.sync.snapshot(window).unwrap().whole_rect;
    assert_eq!(
        h.host.commands(),
        vec![HostCommand::SetFrame {
            window: host,
            requested: whole,
            applied: whole,
        }]
    );
}

#[test]
fn test_reassert_skips_hidden_window() {
    let h = harness(SyncConfig::default());
    let window = h.client.create_window(WindowSpec::new(RECT));
    let host = h.host_of(window).unwrap();
    h.host.take_commands();

    h.event(HostEvent::ReassertWindowPosition { window: host });

    assert!(h.host.commands().is_empty());
}

#[test]
fn test_unknown_host_window_is_discarded() {
    let h = harness(SyncConfig::default());
    open(&h, WindowSpec::new(RECT));
    h.host.take_commands();

    for event in [
        HostEvent::GotFocus { window: HostWindowId(999) },
        HostEvent::CloseRequested { window: HostWindowId(999) },
        HostEvent::FrameChanged {
            window: HostWindowId(999),
            frame: RECT,
            fullscreen: false,
            in_resize: false,
            skip_size_move_loop: false,
        },
    ] {
        h.event(event);
    }

    assert!(h.host.commands().is_empty());
    assert!(h.client.messages().is_empty());
}

#[test]
fn test_events_deserialize_from_json() {
    let event: HostEvent = serde_json::from_str(r#"{"GotFocus":{"window":7}}"#).unwrap();
    assert_eq!(event, HostEvent::GotFocus { window: HostWindowId(7) });
    assert_eq!(event.window(), Some(HostWindowId(7)));
}

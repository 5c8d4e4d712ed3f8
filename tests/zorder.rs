// Z-order, visibility and focus integration tests

use winsync::client::MouseActivate;
use winsync::record::FocusState;
use winsync::testing::{harness, HostCommand, WindowSpec};
use winsync::{ClientWindowModel, ExtendedStyle, HostEvent, Placement, Rect, SyncConfig, WindowId, WindowStyle};

fn spec(n: i32) -> WindowSpec {
    WindowSpec::new(Rect::from_origin_size(100 + 20 * n, 100 + 20 * n, 400, 300))
}

fn orders(commands: &[HostCommand]) -> Vec<(Placement, bool)> {
    commands
        .iter()
        .filter_map(|c| match c {
            HostCommand::Order { placement, activate, .. } => Some((*placement, *activate)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_first_window_goes_to_front() {
    let h = harness(SyncConfig::default());
    let window = h.open(spec(0));
    let host = h.host_of(window).unwrap();

    assert_eq!(orders(&h.host.commands()), vec![(Placement::Front, false)]);
    assert_eq!(h.host.front_to_back(), vec![host]);
}

#[test]
fn test_placement_skips_hidden_siblings() {
    let h = harness(SyncConfig::default());
    let back = h.open(spec(0));
    let hidden = h.client.create_window(spec(1));
    let front = h.client.create_window(spec(2));
    h.host.take_commands();

    h.client.show(front);

    let back_host = h.host_of(back).unwrap();
    let front_host = h.host_of(front).unwrap();
    assert_eq!(orders(&h.host.commands()), vec![(Placement::Above(back_host), false)]);
    assert_eq!(h.host.front_to_back(), vec![front_host, back_host]);

    // the hidden window has a host window that was never ordered in
    let hidden_host = h.host_of(hidden).unwrap();
    assert!(!h.host.is_visible(hidden_host));
}

#[test]
fn test_placement_skips_layered_sibling_waiting_for_attributes() {
    let h = harness(SyncConfig::default());
    let back = h.open(spec(0));
    let window = h.client.create_window(spec(1));
    let front = h.open(spec(2).ex_style(ExtendedStyle::LAYERED));
    assert!(h.client.style(front).contains(WindowStyle::VISIBLE));
    assert!(!h.sync.snapshot(front).unwrap().on_screen());
    h.host.take_commands();

    h.client.show(window);

    let back_host = h.host_of(back).unwrap();
    assert_eq!(orders(&h.host.commands()), vec![(Placement::Above(back_host), false)]);
    assert_eq!(h.host.front_to_back(), vec![h.host_of(window).unwrap(), back_host]);
}

#[test]
fn test_window_is_placed_behind_nearest_front_sibling() {
    let h = harness(SyncConfig::default());
    let back = h.open(spec(0));
    let middle = h.client.create_window(spec(1));
    let front = h.open(spec(2));
    h.host.take_commands();

    h.client.show(middle);

    let front_host = h.host_of(front).unwrap();
    assert_eq!(orders(&h.host.commands()), vec![(Placement::Below(front_host), false)]);
    assert_eq!(
        h.host.front_to_back(),
        vec![front_host, h.host_of(middle).unwrap(), h.host_of(back).unwrap()]
    );
}

#[test]
fn test_hide_orders_out() {
    let h = harness(SyncConfig::default());
    let window = h.open(spec(0));
    let host = h.host_of(window).unwrap();

    h.client.hide(window);

    assert!(!h.host.is_visible(host));
    assert!(!h.sync.snapshot(window).unwrap().on_screen());
    assert_eq!(h.host.count(|c| matches!(c, HostCommand::Hide { .. })), 1);
}

#[test]
fn test_raise_restacks_host() {
    let h = harness(SyncConfig::default());
    let a = h.open(spec(0));
    let b = h.open(spec(1));
    let (a_host, b_host) = (h.host_of(a).unwrap(), h.host_of(b).unwrap());
    assert_eq!(h.host.front_to_back(), vec![b_host, a_host]);

    h.client.raise(a);

    assert_eq!(h.host.front_to_back(), vec![a_host, b_host]);
}

#[test]
fn test_activation_hint_activates_next_show() {
    let h = harness(SyncConfig::default());
    h.sync.activate_on_following_focus();
    let window = h.open(spec(0));

    assert_eq!(orders(&h.host.commands()), vec![(Placement::Front, true)]);
    assert!(matches!(
        h.sync.snapshot(window).unwrap().focus,
        FocusState::PendingActivation { .. }
    ));

    // the hint is consumed
    let other = h.open(spec(1));
    let host = h.host_of(window).unwrap();
    assert_eq!(orders(&h.host.commands()).last(), Some(&(Placement::Above(host), false)));
    assert_eq!(h.sync.snapshot(other).unwrap().focus, FocusState::NoFocus);
}

#[test]
fn test_activation_hint_expires() {
    let mut config = SyncConfig::default();
    config.activation.recent_activation_ms = 0;
    let h = harness(config);
    h.sync.activate_on_following_focus();
    h.open(spec(0));

    assert_eq!(orders(&h.host.commands()), vec![(Placement::Front, false)]);
}

#[test]
fn test_got_focus_completes_pending_activation() {
    let h = harness(SyncConfig::default());
    h.sync.activate_on_following_focus();
    let window = h.open(spec(0));
    let host = h.host_of(window).unwrap();

    h.event(HostEvent::GotFocus { window: host });

    assert_eq!(h.client.foreground_window(), Some(window));
    assert_eq!(h.sync.snapshot(window).unwrap().focus, FocusState::HostFocused);
    assert_eq!(h.host.count(|c| *c == HostCommand::Activate { window: host }), 1);
}

#[test]
fn test_got_focus_without_hint_does_not_activate() {
    let h = harness(SyncConfig::default());
    let window = h.open(spec(0));
    let host = h.host_of(window).unwrap();

    h.event(HostEvent::GotFocus { window: host });

    assert_eq!(h.client.foreground_window(), Some(window));
    assert_eq!(h.sync.snapshot(window).unwrap().focus, FocusState::HostFocused);
    assert_eq!(h.host.count(|c| matches!(c, HostCommand::Activate { .. })), 0);
}

#[test]
fn test_focus_rejected_for_non_activating_windows() {
    let h = harness(SyncConfig::default());
    let window = h.open(spec(0));
    let host = h.host_of(window).unwrap();
    h.client.set_mouse_activate(window, MouseActivate::NoActivate);

    h.event(HostEvent::GotFocus { window: host });

    assert_eq!(h.client.foreground_window(), None);
    assert_eq!(h.host.count(|c| *c == HostCommand::RejectFocus { window: host }), 1);
}

#[test]
fn test_focus_rejected_for_noactivate_style() {
    let h = harness(SyncConfig::default());
    let window = h.open(spec(0).ex_style(ExtendedStyle::NOACTIVATE));
    let host = h.host_of(window).unwrap();

    h.event(HostEvent::GotFocus { window: host });

    assert_eq!(h.host.count(|c| *c == HostCommand::RejectFocus { window: host }), 1);
}

#[test]
fn test_set_focus_raises_buried_foreground_window() {
    let h = harness(SyncConfig::default());
    let a = h.open(spec(0));
    let b = h.open(spec(1));
    let (a_host, b_host) = (h.host_of(a).unwrap(), h.host_of(b).unwrap());
    h.client.set_foreground_window(a);
    h.host.take_commands();

    h.sync.set_focus(a);

    assert_eq!(h.client.top_level_windows(), vec![a, b]);
    assert_eq!(h.host.front_to_back(), vec![a_host, b_host]);
    assert_eq!(
        h.host.commands().last(),
        Some(&HostCommand::GiveFocus {
            window: a_host,
            activate: false
        })
    );
}

#[test]
fn test_set_focus_ignores_owned_windows_in_front() {
    let h = harness(SyncConfig::default());
    let owner = h.open(spec(0));
    let _dialog = h.open(spec(1).owner(owner));
    h.client.set_foreground_window(owner);
    h.host.take_commands();

    h.sync.set_focus(owner);

    assert!(orders(&h.host.commands()).is_empty());
    assert_eq!(h.host.focused(), h.host_of(owner));
}

#[test]
fn test_set_focus_on_child_focuses_root() {
    let h = harness(SyncConfig::default());
    let root = h.open(spec(0));
    let child = h.client.create_window(WindowSpec::new(Rect::new(0, 0, 10, 10)).child_of(root));

    h.sync.set_focus(child);

    assert_eq!(h.host.focused(), h.host_of(root));
}

#[test]
fn test_set_focus_needs_on_screen_window() {
    let h = harness(SyncConfig::default());
    let window = h.client.create_window(spec(0));
    h.host.take_commands();

    h.sync.set_focus(window);

    assert_eq!(h.host.count(|c| matches!(c, HostCommand::GiveFocus { .. })), 0);
}

#[test]
fn test_lost_focus_cancels_modes_and_drops_foreground() {
    let h = harness(SyncConfig::default());
    let window = h.open(spec(0));
    let host = h.host_of(window).unwrap();
    h.event(HostEvent::GotFocus { window: host });

    h.event(HostEvent::LostFocus { window: host });

    assert_eq!(h.client.foreground_window(), Some(WindowId(0)));
    assert!(h
        .client
        .messages()
        .contains(&(window, winsync::ClientMessage::CancelMode)));
    assert_eq!(h.sync.snapshot(window).unwrap().focus, FocusState::NoFocus);
}

#[test]
fn test_app_deactivated_clears_focus() {
    let h = harness(SyncConfig::default());
    let a = h.open(spec(0));
    let b = h.open(spec(1));
    h.event(HostEvent::GotFocus {
        window: h.host_of(a).unwrap(),
    });

    h.event(HostEvent::AppDeactivated);

    assert_eq!(h.client.foreground_window(), Some(WindowId(0)));
    for window in [a, b] {
        assert_eq!(h.sync.snapshot(window).unwrap().focus, FocusState::NoFocus);
    }
}

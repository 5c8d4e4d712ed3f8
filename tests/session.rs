// Quit/session coordination integration tests

use winsync::client::SessionMessage;
use winsync::testing::{harness, Harness, HostCommand, WindowSpec};
use winsync::{HostEvent, QuitPhase, QuitReason, Rect, SyncConfig, WindowId};

fn open_windows(h: &Harness, count: i32) -> Vec<WindowId> {
    (0..count)
        .map(|i| h.open(WindowSpec::new(Rect::from_origin_size(50 * i, 50 * i, 300, 200))))
        .collect()
}

fn quit_replies(h: &Harness) -> Vec<bool> {
    h.host
        .commands()
        .into_iter()
        .filter_map(|c| match c {
            HostCommand::QuitReply { quit } => Some(quit),
            _ => None,
        })
        .collect()
}

fn end_sessions(h: &Harness) -> Vec<(WindowId, bool)> {
    h.client
        .session_messages()
        .into_iter()
        .filter_map(|(w, m)| match m {
            SessionMessage::EndSession { ending, .. } => Some((w, ending)),
            SessionMessage::QueryEndSession { .. } => None,
        })
        .collect()
}

#[test]
fn test_single_veto_cancels_quit() {
    let h = harness(SyncConfig::default());
    let windows = open_windows(&h, 3);
    h.client.set_session_answer(windows[1], false);

    h.sync.begin_quit(QuitReason::Menu);

    assert_eq!(quit_replies(&h), vec![false]);
    let ended = end_sessions(&h);
    assert_eq!(ended.len(), 3);
    assert!(ended.iter().all(|&(_, ending)| !ending));
    assert!(!h.client.exited());
    assert_eq!(h.sync.quit_phase(), Some(QuitPhase::Done));
}

#[test]
fn test_unanimous_agreement_exits() {
    let h = harness(SyncConfig::default());
    let windows = open_windows(&h, 3);

    h.sync.begin_quit(QuitReason::Shutdown);

    assert_eq!(quit_replies(&h), vec![true]);
    let mut ended: Vec<_> = end_sessions(&h).into_iter().map(|(w, _)| w).collect();
    ended.sort();
    assert_eq!(ended, windows);
    assert!(h.client.exited());
}

#[test]
fn test_no_windows_quits_at_once() {
    let h = harness(SyncConfig::default());

    h.sync.begin_quit(QuitReason::Restart);

    assert_eq!(quit_replies(&h), vec![true]);
    assert!(h.client.session_messages().is_empty());
    assert!(h.client.exited());
    assert_eq!(h.sync.quit_phase(), Some(QuitPhase::Done));
}

#[test]
fn test_logout_sets_logoff_flag() {
    let h = harness(SyncConfig::default());
    open_windows(&h, 2);

    h.sync.begin_quit(QuitReason::Logout);

    assert!(h.client.session_messages().iter().all(|(_, m)| match m {
        SessionMessage::QueryEndSession { logoff } => *logoff,
        SessionMessage::EndSession { logoff, .. } => *logoff,
    }));
}

#[test]
fn test_answers_arriving_later() {
    let h = harness(SyncConfig::default());
    let windows = open_windows(&h, 2);
    h.client.set_session_answer(windows[0], false);
    h.client.defer_session_messages(true);

    h.sync.begin_quit(QuitReason::Menu);

    assert!(quit_replies(&h).is_empty());
    assert_eq!(h.sync.quit_phase(), Some(QuitPhase::Querying));

    // two queries, then two end-session messages queued while delivering
    assert_eq!(h.client.deliver_session_messages(), 4);

    assert_eq!(quit_replies(&h), vec![false]);
    assert_eq!(end_sessions(&h).len(), 2);
    assert_eq!(h.sync.quit_phase(), Some(QuitPhase::Done));
    assert!(!h.client.exited());
}

#[test]
fn test_second_quit_request_is_refused_while_in_flight() {
    let h = harness(SyncConfig::default());
    open_windows(&h, 2);
    h.client.defer_session_messages(true);

    h.sync.begin_quit(QuitReason::Menu);
    h.sync.begin_quit(QuitReason::Menu);

    assert_eq!(quit_replies(&h), vec![false]);
    assert_eq!(h.sync.quit_phase(), Some(QuitPhase::Querying));

    h.client.deliver_session_messages();

    assert_eq!(quit_replies(&h), vec![false, true]);
    assert!(h.client.exited());
}

#[test]
fn test_vanished_window_counts_as_complete() {
    let h = harness(SyncConfig::default());
    let windows = open_windows(&h, 3);
    h.client.defer_session_messages(true);

    h.sync.begin_quit(QuitReason::Menu);
    h.client.destroy(windows[2]);
    h.client.deliver_session_messages();

    assert_eq!(quit_replies(&h), vec![true]);
    let ended: Vec<_> = end_sessions(&h).into_iter().map(|(w, _)| w).collect();
    assert_eq!(ended.len(), 2);
    assert!(!ended.contains(&windows[2]));
    assert_eq!(h.sync.quit_phase(), Some(QuitPhase::Done));
    assert!(h.client.exited());
}

#[test]
fn test_quit_request_event_starts_session() {
    let h = harness(SyncConfig::default());
    open_windows(&h, 1);

    h.event(HostEvent::QuitRequested {
        reason: QuitReason::Shutdown,
    });

    assert_eq!(quit_replies(&h), vec![true]);
    assert!(h.client.exited());
}

#[test]
fn test_new_quit_allowed_after_cancelled_one() {
    let h = harness(SyncConfig::default());
    let windows = open_windows(&h, 2);
    h.client.set_session_answer(windows[0], false);
    h.sync.begin_quit(QuitReason::Menu);
    assert_eq!(quit_replies(&h), vec![false]);

    h.client.set_session_answer(windows[0], true);
    h.sync.begin_quit(QuitReason::Menu);

    assert_eq!(quit_replies(&h), vec![false, true]);
    assert!(h.client.exited());
}

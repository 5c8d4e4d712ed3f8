//! Host event dispatch
//!
//! Host notifications are delivered on the thread that owns the logical
//! windows. While one is being handled, a thread-local marker records which
//! host window and which kind of notification is current. Handling a
//! notification usually calls into the client model, which re-enters the
//! synchronizer; a geometry change reported for the window the host is
//! itself describing must not be sent back to the host.
//!
//! Markers nest: a handler may cause another notification to be processed
//! on the same thread, and only the innermost one decides.

use crate::client::{ClientMessage, ClientWindowModel, HitTest, SysCommand, WindowId};
use crate::geometry::Rect;
use crate::host::{HostWindowId, HostWindowSystem};
use crate::session::QuitReason;
use crate::style::{PosFlags, WindowStyle};
use crate::sync::WindowSynchronizer;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::marker::PhantomData;

/// Asynchronous notifications from the host window system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostEvent {
    /// The user or the host moved or resized a window
    FrameChanged {
        window: HostWindowId,
        frame: Rect,
        fullscreen: bool,
        /// Part of an interactive resize already bracketed by the host
        in_resize: bool,
        skip_size_move_loop: bool,
    },
    DidMinimize { window: HostWindowId },
    DidUnminimize { window: HostWindowId },
    GotFocus { window: HostWindowId },
    LostFocus { window: HostWindowId },
    CloseRequested { window: HostWindowId },
    MinimizeRequested { window: HostWindowId },
    MaximizeRequested { window: HostWindowId },
    /// Restore from maximized, optionally keeping `frame` as restore target
    RestoreRequested {
        window: HostWindowId,
        keep_frame: bool,
        frame: Rect,
    },
    BroughtForward { window: HostWindowId },
    ResizeEnded { window: HostWindowId },
    /// The user started dragging the window by its title bar
    DragBegin {
        window: HostWindowId,
        /// Host was told not to activate on this drag
        no_activate: bool,
    },
    DragEnd { window: HostWindowId },
    ReassertWindowPosition { window: HostWindowId },
    AppActivated,
    AppDeactivated,
    DisplaysChanged,
    QuitRequested { reason: QuitReason },
}

/// Notification kind, as recorded in the current-event marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    FrameChanged,
    DidMinimize,
    DidUnminimize,
    GotFocus,
    LostFocus,
    CloseRequested,
    MinimizeRequested,
    MaximizeRequested,
    RestoreRequested,
    BroughtForward,
    ResizeEnded,
    DragBegin,
    DragEnd,
    ReassertWindowPosition,
    AppActivated,
    AppDeactivated,
    DisplaysChanged,
    QuitRequested,
}

impl EventKind {
    /// Kinds whose resulting geometry is authoritative on the host side
    pub fn is_geometry(self) -> bool {
        matches!(self, EventKind::FrameChanged | EventKind::DidUnminimize)
    }
}

impl HostEvent {
    /// Host window the notification is about, `None` for app-wide ones
    pub fn window(&self) -> Option<HostWindowId> {
        match *self {
            HostEvent::FrameChanged { window, .. }
            | HostEvent::DidMinimize { window }
            | HostEvent::DidUnminimize { window }
            | HostEvent::GotFocus { window }
            | HostEvent::LostFocus { window }
            | HostEvent::CloseRequested { window }
            | HostEvent::MinimizeRequested { window }
            | HostEvent::MaximizeRequested { window }
            | HostEvent::RestoreRequested { window, .. }
            | HostEvent::BroughtForward { window }
            | HostEvent::ResizeEnded { window }
            | HostEvent::DragBegin { window, .. }
            | HostEvent::DragEnd { window }
            | HostEvent::ReassertWindowPosition { window } => Some(window),
            HostEvent::AppActivated
            | HostEvent::AppDeactivated
            | HostEvent::DisplaysChanged
            | HostEvent::QuitRequested { .. } => None,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::FrameChanged { .. } => EventKind::FrameChanged,
            HostEvent::DidMinimize { .. } => EventKind::DidMinimize,
            HostEvent::DidUnminimize { .. } => EventKind::DidUnminimize,
            HostEvent::GotFocus { .. } => EventKind::GotFocus,
            HostEvent::LostFocus { .. } => EventKind::LostFocus,
            HostEvent::CloseRequested { .. } => EventKind::CloseRequested,
            HostEvent::MinimizeRequested { .. } => EventKind::MinimizeRequested,
            HostEvent::MaximizeRequested { .. } => EventKind::MaximizeRequested,
            HostEvent::RestoreRequested { .. } => EventKind::RestoreRequested,
            HostEvent::BroughtForward { .. } => EventKind::BroughtForward,
            HostEvent::ResizeEnded { .. } => EventKind::ResizeEnded,
            HostEvent::DragBegin { .. } => EventKind::DragBegin,
            HostEvent::DragEnd { .. } => EventKind::DragEnd,
            HostEvent::ReassertWindowPosition { .. } => EventKind::ReassertWindowPosition,
            HostEvent::AppActivated => EventKind::AppActivated,
            HostEvent::AppDeactivated => EventKind::AppDeactivated,
            HostEvent::DisplaysChanged => EventKind::DisplaysChanged,
            HostEvent::QuitRequested { .. } => EventKind::QuitRequested,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EventMarker {
    window: Option<HostWindowId>,
    kind: EventKind,
}

thread_local! {
    static CURRENT_EVENTS: RefCell<Vec<EventMarker>> = const { RefCell::new(Vec::new()) };
}

/// Marks a notification as current on this thread until dropped.
///
/// Dropping restores whatever marker was current before.
#[must_use = "the marker is cleared when the guard is dropped"]
pub struct CurrentEventGuard {
    // markers are per thread
    _not_send: PhantomData<*const ()>,
}

impl CurrentEventGuard {
    pub fn enter(window: Option<HostWindowId>, kind: EventKind) -> Self {
        CURRENT_EVENTS.with(|events| events.borrow_mut().push(EventMarker { window, kind }));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for CurrentEventGuard {
    fn drop(&mut self) {
        CURRENT_EVENTS.with(|events| {
            events.borrow_mut().pop();
        });
    }
}

/// Innermost notification being handled on this thread
pub fn current_event() -> Option<(Option<HostWindowId>, EventKind)> {
    CURRENT_EVENTS.with(|events| events.borrow().last().map(|m| (m.window, m.kind)))
}

/// Whether the host is currently reporting geometry for `host` on this
/// thread, making any resulting change an echo of the host's own state.
pub fn is_processing_geometry_event(host: HostWindowId) -> bool {
    matches!(current_event(), Some((Some(window), kind)) if window == host && kind.is_geometry())
}

impl<H, C> WindowSynchronizer<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    /// Handles one host notification.
    ///
    /// Notifications for host windows without a sync record (already
    /// destroyed, say) are dropped.
    pub fn handle_event(&self, event: &HostEvent) {
        let kind = event.kind();
        let _marker = CurrentEventGuard::enter(event.window(), kind);

        match event.window() {
            Some(host) => match self.registry.find_by_host(host) {
                Some(id) => {
                    trace!("{}/{} {:?}", id, host, kind);
                    self.handle_window_event(id, host, event);
                }
                None => debug!("discarding {:?} for unknown {}", kind, host),
            },
            None => {
                trace!("{:?}", kind);
                self.handle_app_event(event);
            }
        }
    }

    fn handle_window_event(&self, id: WindowId, host: HostWindowId, event: &HostEvent) {
        match *event {
            HostEvent::FrameChanged {
                frame,
                fullscreen,
                in_resize,
                skip_size_move_loop,
                ..
            } => self.window_frame_changed(id, frame, fullscreen, in_resize || skip_size_move_loop),
            HostEvent::DidMinimize { .. } => self.window_did_minimize(id),
            HostEvent::DidUnminimize { .. } => self.window_did_unminimize(id),
            HostEvent::GotFocus { .. } => self.window_got_focus(id, host),
            HostEvent::LostFocus { .. } => self.window_lost_focus(id),
            HostEvent::CloseRequested { .. } => self.window_close_requested(id),
            HostEvent::MinimizeRequested { .. } => self.perform_window_command(
                id,
                WindowStyle::MINIMIZEBOX,
                WindowStyle::MINIMIZE,
                SysCommand::Minimize,
                HitTest::MinButton,
            ),
            HostEvent::MaximizeRequested { .. } => self.perform_window_command(
                id,
                WindowStyle::MAXIMIZEBOX,
                WindowStyle::MAXIMIZE,
                SysCommand::Maximize,
                HitTest::MaxButton,
            ),
            HostEvent::RestoreRequested { keep_frame, frame, .. } => {
                self.window_restore_requested(id, keep_frame, frame)
            }
            HostEvent::BroughtForward { .. } => {
                let rect = self.client.window_rect(id).unwrap_or_default();
                self.client
                    .set_window_pos(id, rect, PosFlags::NOMOVE | PosFlags::NOSIZE | PosFlags::NOACTIVATE);
            }
            HostEvent::ResizeEnded { .. } => self.client.send_message(id, ClientMessage::ExitSizeMove),
            HostEvent::DragBegin { no_activate, .. } => self.window_drag_begin(id, no_activate),
            HostEvent::DragEnd { .. } => self.window_drag_end(id),
            HostEvent::ReassertWindowPosition { .. } => {
                if self.registry.host_window(id, true).is_some() {
                    self.sync_window_position(id, PosFlags::NOZORDER | PosFlags::NOACTIVATE, None);
                }
            }
            HostEvent::AppActivated
            | HostEvent::AppDeactivated
            | HostEvent::DisplaysChanged
            | HostEvent::QuitRequested { .. } => {}
        }
    }

    fn handle_app_event(&self, event: &HostEvent) {
        match *event {
            HostEvent::AppActivated => debug!("application activated"),
            HostEvent::AppDeactivated => self.app_deactivated(),
            HostEvent::DisplaysChanged => self.displays_changed(),
            HostEvent::QuitRequested { reason } => self.begin_quit(reason),
            _ => {}
        }
    }

    fn window_frame_changed(&self, id: WindowId, frame: Rect, fullscreen: bool, in_size_move_loop: bool) {
        let Some(record) = self.registry.snapshot(id) else {
            return;
        };
        if !record.on_screen() || record.minimized() {
            trace!("{} ignoring frame {} while off screen or minimized", id, frame);
            return;
        }
        // a drag already sent the enter message and sends the exit one at its end
        let send_size_move = !in_size_move_loop && !record.being_dragged;
        self.apply_host_frame(id, frame, fullscreen, send_size_move);
    }

    /// Moves the logical window to match a frame the host applied.
    ///
    /// Unchanged origin or size are passed as no-move / no-size so the
    /// client model sends no redundant notifications.
    pub(crate) fn apply_host_frame(&self, id: WindowId, frame: Rect, fullscreen: bool, send_size_move: bool) {
        let Some(record) = self.registry.snapshot(id) else {
            return;
        };
        let style = self.frame_style(id, record.window_rect, record.client_rect, record.shaped);
        let rect = self.translator.to_logical_rect(&style, frame);
        let old = record.window_rect;

        let mut flags = PosFlags::NOACTIVATE | PosFlags::NOZORDER;
        if old.left == rect.left && old.top == rect.top {
            flags |= PosFlags::NOMOVE;
        }
        if (old.width() == rect.width() && old.height() == rect.height())
            || (old.is_empty() && rect.width() == 1 && rect.height() == 1)
        {
            flags |= PosFlags::NOSIZE;
        }
        if fullscreen {
            flags |= PosFlags::NOSENDCHANGING;
        }

        if flags.contains(PosFlags::NOMOVE | PosFlags::NOSIZE) {
            trace!("{} host frame {} matches {}", id, frame, old);
            return;
        }

        debug!("{} following host frame {}: {} -> {}", id, frame, old, rect);
        if send_size_move {
            self.client.send_message(id, ClientMessage::EnterSizeMove);
        }
        self.client.set_window_pos(id, rect, flags);
        if send_size_move {
            self.client.send_message(id, ClientMessage::ExitSizeMove);
        }
    }

    fn window_did_minimize(&self, id: WindowId) {
        let minimized_now = self
            .registry
            .update(id, |r| {
                let newly = r.on_screen() && !r.minimized;
                r.minimized |= newly;
                newly
            })
            .unwrap_or(false);

        if minimized_now && !self.client.style(id).contains(WindowStyle::MINIMIZE) {
            debug!("{} minimized by the host", id);
            self.client
                .send_message(id, ClientMessage::SysCommand(SysCommand::Minimize));
        }
    }

    fn window_did_unminimize(&self, id: WindowId) {
        let was_minimized = self
            .registry
            .update(id, |r| std::mem::replace(&mut r.minimized, false))
            .unwrap_or(false);
        if !was_minimized {
            return;
        }

        let style = self.client.style(id);
        if style.contains(WindowStyle::MINIMIZE | WindowStyle::VISIBLE) {
            debug!("{} restoring after host unminimize", id);
            self.client.set_active_window(id);
            self.client
                .send_message(id, ClientMessage::SysCommand(SysCommand::Restore));
        } else {
            trace!("{} not restoring, style {:?}", id, style);
        }
    }

    fn window_close_requested(&self, id: WindowId) {
        if !self.client.close_allowed(id) {
            debug!("{} close not allowed", id);
            return;
        }
        self.perform_window_command(id, WindowStyle::empty(), WindowStyle::empty(), SysCommand::Close, HitTest::Close);
    }

    fn window_restore_requested(&self, id: WindowId, keep_frame: bool, frame: Rect) {
        if keep_frame {
            let style = self.client.style(id);
            if style.contains(WindowStyle::MAXIMIZE | WindowStyle::VISIBLE) {
                if let Some(record) = self.registry.snapshot(id) {
                    let frame_style = self.frame_style(id, record.window_rect, record.client_rect, record.shaped);
                    let rect = self.translator.to_logical_rect(&frame_style, frame);
                    debug!("{} restore rect {}", id, rect);
                    self.client.set_restore_rect(id, rect);
                }
            }
        }
        self.perform_window_command(
            id,
            WindowStyle::MAXIMIZE,
            WindowStyle::empty(),
            SysCommand::Restore,
            HitTest::MaxButton,
        );
    }

    /// Forwards a host window-control click as a system command.
    ///
    /// Nothing happens unless the window has one of `style_any` (when not
    /// empty) and none of `style_none`, and is enabled. An inactive window
    /// is asked whether the click should activate it first.
    fn perform_window_command(
        &self,
        id: WindowId,
        style_any: WindowStyle,
        style_none: WindowStyle,
        command: SysCommand,
        hit: HitTest,
    ) {
        let style = self.client.style(id);
        if (!style_any.is_empty() && !style.intersects(style_any))
            || style.intersects(WindowStyle::DISABLED | style_none)
        {
            debug!("{} not performing {:?}, style {:?}", id, command, style);
            return;
        }

        if self.client.active_window() != Some(id) {
            let answer = self.client.mouse_activate(id, hit);
            if answer.eats_click() {
                debug!("{} not performing {:?}, mouse-activate {:?}", id, command, answer);
                return;
            }
            if answer.activates() {
                self.client.set_active_window(id);
            }
        }

        debug!("{} performing {:?}", id, command);
        self.client.send_message(id, ClientMessage::SysCommand(command));
    }

    fn displays_changed(&self) {
        let desktop = self.host.desktop_rect();
        let old = std::mem::replace(&mut *self.desktop.write(), desktop);
        if old == desktop {
            trace!("displays changed, desktop still {}", desktop);
            return;
        }

        info!("desktop changed from {} to {}", old, desktop);
        for window in self.client.top_level_windows() {
            self.client.send_message(window, ClientMessage::DisplayChange);
        }
        for id in self.registry.ids() {
            if self.registry.host_window(id, true).is_some() {
                self.sync_window_position(id, PosFlags::NOZORDER | PosFlags::NOACTIVATE, None);
            }
        }
    }
}

//! Focus and activation bridge
//!
//! Logical keyboard focus and host activation are reconciled through a
//! per-window [`FocusState`] and one process-wide activation hint. The hint
//! is armed by a local action that is about to cause a host focus grant
//! (a window shown in response to a click, say) and expires passively: it is
//! only ever compared against the current time when used.

use crate::client::{root_of, ClientWindowModel, ClientMessage, HitTest, WindowId};
use crate::host::{HostWindowId, HostWindowSystem};
use crate::record::FocusState;
use crate::style::{PosFlags, WindowStyle};
use crate::sync::WindowSynchronizer;
use crate::translate;
use log::{debug, trace};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Timestamp of the last "activate on the following focus" request.
#[derive(Debug)]
pub struct ActivationBridge {
    hint: Mutex<Option<Instant>>,
    window: Duration,
}

impl ActivationBridge {
    pub fn new(window: Duration) -> Self {
        Self {
            hint: Mutex::new(None),
            window,
        }
    }

    pub fn arm(&self) {
        self.arm_at(Instant::now());
    }

    pub fn arm_at(&self, at: Instant) {
        *self.hint.lock() = Some(at);
    }

    /// The hint, if it was armed less than the activation window before `now`
    pub fn recent(&self, now: Instant) -> Option<Instant> {
        let hint = *self.hint.lock();
        hint.filter(|&at| now.saturating_duration_since(at) < self.window)
    }

    pub fn clear(&self) {
        *self.hint.lock() = None;
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<H, C> WindowSynchronizer<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    /// The next focus change should also activate the application.
    pub fn activate_on_following_focus(&self) {
        trace!("arming activation hint");
        self.activation.arm();
    }

    /// Moves host keyboard focus to the root of `id`, raising it first if
    /// it is the foreground window but something unrelated is in front.
    pub fn set_focus(&self, id: WindowId) {
        self.set_focus_internal(id, true);
    }

    pub(crate) fn set_focus_internal(&self, id: WindowId, raise: bool) {
        let Some(root) = root_of(&*self.client, id) else {
            return;
        };
        let desktop = self.client.desktop_window();

        if raise
            && root != desktop
            && self.client.foreground_window() == Some(root)
            && !self.is_all_the_way_front(root)
        {
            debug!("{} raising foreground window before focusing", root);
            let rect = self.client.window_rect(root).unwrap_or_default();
            self.client.set_window_pos(
                root,
                rect,
                PosFlags::NOMOVE | PosFlags::NOSIZE | PosFlags::NOACTIVATE | PosFlags::NOOWNERZORDER,
            );
        }

        let Some(host) = self.registry.host_window(root, true) else {
            return;
        };

        let hint = self.activation.recent(Instant::now());
        debug!("{}/{} give focus, activate {}", root, host, hint.is_some());
        self.host.give_focus(host, hint.is_some());
        self.activation.clear();

        if let Some(since) = hint {
            self.registry
                .update(root, |r| r.focus = FocusState::PendingActivation { since });
        }
    }

    /// The host granted focus to a window; accept or reject it according to
    /// the window's activation policy.
    pub(crate) fn window_got_focus(&self, id: WindowId, host: HostWindowId) {
        let style = self.client.style(id);
        let ex_style = self.client.ex_style(id);
        let rect = self.client.window_rect(id).unwrap_or_default();
        let is_desktop = id == self.client.desktop_window();

        if translate::can_activate(style, ex_style, rect, is_desktop) && !style.contains(WindowStyle::MINIMIZE) {
            // a simulated click on the menu tells whether the window wants activation
            let answer = self.client.mouse_activate(id, HitTest::Menu);
            if answer.activates() {
                debug!("{}/{} accepting focus, setting foreground", id, host);
                self.client.set_foreground_window(id);

                let now = Instant::now();
                let window = self.activation.window();
                let previous = self
                    .registry
                    .update(id, |r| std::mem::replace(&mut r.focus, FocusState::HostFocused));
                if let Some(FocusState::PendingActivation { since }) = previous {
                    if now.saturating_duration_since(since) < window {
                        self.host.activate_window(host);
                    }
                }
                return;
            }
        }

        debug!("{}/{} rejecting focus", id, host);
        self.host.reject_focus(host);
        self.registry.update(id, |r| r.focus = FocusState::NoFocus);
    }

    pub(crate) fn window_lost_focus(&self, id: WindowId) {
        if self.client.foreground_window() == Some(id) {
            self.client.send_message(id, ClientMessage::CancelMode);
            if self.client.foreground_window() == Some(id) {
                debug!("{} lost focus, foreground falls back to the desktop", id);
                self.client.set_foreground_window(self.client.desktop_window());
            }
        }
        self.registry.update(id, |r| r.focus = FocusState::NoFocus);
    }

    pub(crate) fn app_deactivated(&self) {
        if self.client.active_window() == self.client.foreground_window() {
            debug!("application deactivated, foreground falls back to the desktop");
            self.client.set_foreground_window(self.client.desktop_window());
        }
        self.registry.for_each_mut(|r| r.focus = FocusState::NoFocus);
    }
}

//! Z-order and visibility synchronization
//!
//! A host window is ordered relative to its nearest logical sibling that is
//! itself on screen: directly behind the closest such window in front of it,
//! or failing that directly in front of the closest one behind it. A window
//! with no usable neighbor goes to the front.

use crate::client::{is_owned_by, ClientWindowModel, WindowId};
use crate::host::{HostWindowSystem, Placement};
use crate::record::{FocusState, Presence};
use crate::style::ExtendedStyle;
use crate::sync::WindowSynchronizer;
use log::{debug, trace};
use std::time::Instant;

impl<H, C> WindowSynchronizer<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    /// Where `id` belongs in the host stack, and whether a window in front
    /// of it was found.
    pub(crate) fn find_placement(&self, id: WindowId) -> (Placement, bool) {
        let usable = |w: WindowId| {
            if !self.client.style(w).is_shown_normally() {
                return None;
            }
            self.registry.host_window(w, true)
        };

        let mut prev = self.client.prev_sibling(id);
        while let Some(w) = prev {
            if let Some(host) = usable(w) {
                return (Placement::Below(host), true);
            }
            prev = self.client.prev_sibling(w);
        }

        let mut next = self.client.next_sibling(id);
        while let Some(w) = next {
            if let Some(host) = usable(w) {
                return (Placement::Above(host), false);
            }
            next = self.client.next_sibling(w);
        }

        (Placement::Front, false)
    }

    /// Orders the window into the host's visible stack.
    pub(crate) fn show_window(&self, id: WindowId) {
        let Some(host) = self.registry.host_window(id, false) else {
            return;
        };

        let (placement, has_prev) = self.find_placement(id);
        let now = Instant::now();
        let hint = if has_prev { None } else { self.activation.recent(now) };
        let activate = hint.is_some();

        debug!("{}/{} show {:?} activate {}", id, host, placement, activate);
        self.host.order_window(host, placement, activate);

        self.registry.update(id, |r| {
            r.presence = Presence::Shown;
            if let Some(since) = hint {
                r.focus = FocusState::PendingActivation { since };
            }
        });

        if let Some(focus) = self.client.focus_window() {
            if focus == id || self.client.is_child(id, focus) {
                self.set_focus_internal(focus, false);
            }
        }
        if activate {
            self.activation.clear();
        }
    }

    /// Orders the window out of the host's visible stack.
    pub(crate) fn hide_window(&self, id: WindowId) {
        let Some(host) = self.registry.host_window(id, false) else {
            return;
        };
        debug!("{}/{} hide", id, host);
        self.host.hide_window(host);
        self.registry.update(id, |r| r.presence = Presence::Hidden);
    }

    /// Re-derives the stacking position of a window that is on screen
    pub(crate) fn sync_z_order(&self, id: WindowId) {
        if self.registry.host_window(id, true).is_some() {
            self.show_window(id);
        } else {
            trace!("{} not on screen, z-order deferred", id);
        }
    }

    /// No unrelated window is in front of `id`.
    ///
    /// Windows owned by `id` do not count, nor do topmost windows when `id`
    /// is not topmost itself.
    pub(crate) fn is_all_the_way_front(&self, id: WindowId) -> bool {
        let topmost = self.client.ex_style(id).contains(ExtendedStyle::TOPMOST);
        let mut prev = self.client.prev_sibling(id);
        while let Some(w) = prev {
            if !topmost && self.client.ex_style(w).contains(ExtendedStyle::TOPMOST) {
                return true;
            }
            if !is_owned_by(&*self.client, w, id) {
                return false;
            }
            prev = self.client.prev_sibling(w);
        }
        true
    }
}

//! Interactive move and resize
//!
//! The host runs resize and drag loops itself. Before a resize it asks for
//! the window's tracking limits, during one it lets the window adjust each
//! proposed frame, and title-bar drags are bracketed by begin and end
//! notifications so the logical window sees a single size-move loop.

use crate::client::{ClientMessage, ClientWindowModel, HitTest, MinMaxInfo, SizingCorner, WindowId};
use crate::geometry::{Rect, Size};
use crate::host::{HostWindowId, HostWindowSystem};
use crate::style::WindowStyle;
use crate::sync::WindowSynchronizer;
use crate::translate;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Synchronous questions from the host; answers are written into the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostQuery {
    /// An interactive resize is about to start
    ResizeStart { window: HostWindowId },
    /// The host wants fresh tracking limits
    MinMaxInfo { window: HostWindowId },
    /// Proposed frame during a resize. On success `frame` holds the frame
    /// the window settled on.
    ResizeSize {
        window: HostWindowId,
        frame: Rect,
        from_left: bool,
        from_top: bool,
    },
}

impl HostQuery {
    pub fn window(&self) -> HostWindowId {
        match *self {
            HostQuery::ResizeStart { window }
            | HostQuery::MinMaxInfo { window }
            | HostQuery::ResizeSize { window, .. } => window,
        }
    }
}

impl<H, C> WindowSynchronizer<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    /// Answers a host query. Returns `false` when it was not handled.
    pub fn handle_query(&self, query: &mut HostQuery) -> bool {
        let host = query.window();
        let Some(id) = self.registry.find_by_host(host) else {
            debug!("no window for query {:?}", query);
            return false;
        };

        match query {
            HostQuery::ResizeStart { .. } => {
                self.sync_window_min_max_info(id);
                self.client.send_message(id, ClientMessage::EnterSizeMove);
                true
            }
            HostQuery::MinMaxInfo { .. } => {
                self.sync_window_min_max_info(id);
                true
            }
            HostQuery::ResizeSize {
                frame,
                from_left,
                from_top,
                ..
            } => self.resize_size(id, frame, SizingCorner::from_edges(*from_left, *from_top)),
        }
    }

    fn resize_size(&self, id: WindowId, frame: &mut Rect, corner: SizingCorner) -> bool {
        let Some(record) = self.registry.snapshot(id) else {
            return false;
        };
        let style = self.frame_style(id, record.window_rect, record.client_rect, record.shaped);
        let proposed = self.translator.to_logical_rect(&style, *frame);

        let Some(rect) = self.client.sizing(id, corner, proposed) else {
            trace!("{} left sizing to the host", id);
            return false;
        };
        let answer = self.translator.to_host_rect(&style, rect);
        trace!("{} sizing {:?} {} -> {}", id, corner, *frame, answer);
        *frame = answer;
        true
    }

    /// Pushes the window's resize limits to the host.
    ///
    /// Framed windows start from the configured tracking minimum, others
    /// from twice their client-side frame. The maximum stays unbounded
    /// unless the window sets one, and never drops below the minimum.
    pub(crate) fn sync_window_min_max_info(&self, id: WindowId) {
        let Some(record) = self.registry.snapshot(id) else {
            return;
        };
        let Some(host) = record.host else {
            return;
        };

        let style = self.client.style(id);
        let min_track = if style.intersects(WindowStyle::DLGFRAME | WindowStyle::BORDER) {
            Size::new(self.config.tracking.min_width, self.config.tracking.min_height)
        } else {
            let (x, y) = (
                record.client_rect.left - record.window_rect.left,
                record.client_rect.top - record.window_rect.top,
            );
            Size::new(x.max(0).saturating_mul(2), y.max(0).saturating_mul(2))
        };
        let defaults = MinMaxInfo {
            min_track,
            max_track: None,
        };

        let info = self.client.min_max_info(id, defaults);
        let max_track = info.max_track.map(|max| max.max(info.min_track));

        let frame = self.frame_style(id, record.window_rect, record.client_rect, record.shaped);
        let to_host = |size: Size| {
            self.translator
                .to_host_rect(&frame, Rect::from_origin_size(0, 0, size.width, size.height))
                .size()
        };
        let min = to_host(info.min_track);
        let max = max_track.map(to_host);
        debug!("{}/{} tracking min {:?} max {:?}", id, host, min, max);
        self.host.set_min_max_sizes(host, min, max);
    }

    /// Starts a title-bar drag.
    ///
    /// Disabled, maximized, minimized and invisible windows are not dragged.
    /// Unless the host said otherwise, an activatable background window is
    /// asked whether the drag should bring it to the foreground.
    pub(crate) fn window_drag_begin(&self, id: WindowId, no_activate: bool) {
        let style = self.client.style(id);
        if style.intersects(WindowStyle::DISABLED | WindowStyle::MAXIMIZE | WindowStyle::MINIMIZE)
            || !style.contains(WindowStyle::VISIBLE)
        {
            trace!("{} not draggable, style {:?}", id, style);
            return;
        }

        let started = self.registry.update(id, |r| {
            let started = !r.being_dragged;
            r.being_dragged = true;
            started.then_some(r.window_rect)
        });
        let Some(window_rect) = started.flatten() else {
            return;
        };

        let is_desktop = id == self.client.desktop_window();
        let activatable = translate::can_activate(style, self.client.ex_style(id), window_rect, is_desktop);
        if !no_activate && activatable && self.client.foreground_window() != Some(id) {
            let answer = self.client.mouse_activate(id, HitTest::Caption);
            if answer.activates() {
                self.client.set_foreground_window(id);
            } else {
                debug!("{} drag without activation, mouse-activate {:?}", id, answer);
            }
        }

        debug!("{} drag begin", id);
        self.client.send_message(id, ClientMessage::EnterSizeMove);
    }

    pub(crate) fn window_drag_end(&self, id: WindowId) {
        let was_dragging = self
            .registry
            .update(id, |r| std::mem::replace(&mut r.being_dragged, false))
            .unwrap_or(false);
        if was_dragging {
            debug!("{} drag end", id);
            self.client.send_message(id, ClientMessage::ExitSizeMove);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_window() {
        let query = HostQuery::ResizeSize {
            window: HostWindowId(7),
            frame: Rect::new(0, 0, 10, 10),
            from_left: true,
            from_top: false,
        };
        assert_eq!(query.window(), HostWindowId(7));
        assert_eq!(HostQuery::MinMaxInfo { window: HostWindowId(2) }.window(), HostWindowId(2));
    }

    #[test]
    fn test_sizing_corner_from_edges() {
        assert_eq!(SizingCorner::from_edges(true, true), SizingCorner::TopLeft);
        assert_eq!(SizingCorner::from_edges(false, true), SizingCorner::TopRight);
        assert_eq!(SizingCorner::from_edges(true, false), SizingCorner::BottomLeft);
        assert_eq!(SizingCorner::from_edges(false, false), SizingCorner::BottomRight);
    }
}

//! Client window model interface
//!
//! The client model is the retained tree of logical windows owned by the
//! application side. The synchronizer queries it and drives it only through
//! [`ClientWindowModel`]. A model that changes window positions calls back
//! into the synchronizer through [`WindowPosSink`], possibly re-entrantly
//! while the synchronizer itself is in the middle of a call.

use crate::geometry::{Rect, Size};
use crate::opacity::LayeredAttributes;
use crate::shape::Region;
use crate::style::{ExtendedStyle, PosFlags, WindowStyle};
use crate::surface::Surface;
use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a logical window, stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "win#{}", self.0)
    }
}

/// System commands forwarded from host-side window controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SysCommand {
    Close,
    Minimize,
    Maximize,
    Restore,
}

/// Messages the synchronizer sends to logical windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    EnterSizeMove,
    ExitSizeMove,
    SysCommand(SysCommand),
    /// Abort any modal loop (menu tracking, capture) before losing focus
    CancelMode,
    DisplayChange,
}

/// Session shutdown protocol messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMessage {
    QueryEndSession { logoff: bool },
    EndSession { ending: bool, logoff: bool },
}

/// Where a simulated click landed, for the mouse-activation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitTest {
    Caption,
    Menu,
    Close,
    MinButton,
    MaxButton,
}

/// A window's answer to "would you like to be activated by this click".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseActivate {
    #[default]
    Activate,
    ActivateAndEat,
    NoActivate,
    NoActivateAndEat,
}

impl MouseActivate {
    /// The click should be swallowed without running the command
    pub fn eats_click(&self) -> bool {
        matches!(self, MouseActivate::ActivateAndEat | MouseActivate::NoActivateAndEat)
    }

    pub fn activates(&self) -> bool {
        matches!(self, MouseActivate::Activate | MouseActivate::ActivateAndEat)
    }
}

/// Edge pair a host resize drags, reported to the window while it sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizingCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl SizingCorner {
    pub fn from_edges(from_left: bool, from_top: bool) -> Self {
        match (from_left, from_top) {
            (true, true) => SizingCorner::TopLeft,
            (false, true) => SizingCorner::TopRight,
            (true, false) => SizingCorner::BottomLeft,
            (false, false) => SizingCorner::BottomRight,
        }
    }
}

/// Tracking limits of a window in logical sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinMaxInfo {
    pub min_track: Size,
    /// `None` for no limit
    pub max_track: Option<Size>,
}

/// Completion callback for an asynchronously delivered session message.
///
/// Receives the window and its answer (`true` = agreed / handled).
pub type SessionCallback = Box<dyn FnOnce(WindowId, bool) + Send>;

/// Queries and commands the synchronizer needs from the client window model.
pub trait ClientWindowModel: Send + Sync {
    /// The root of the tree; never gets a host window
    fn desktop_window(&self) -> WindowId;

    /// `None` once the window is gone
    fn parent(&self, window: WindowId) -> Option<WindowId>;

    fn owner(&self, window: WindowId) -> Option<WindowId>;

    fn style(&self, window: WindowId) -> WindowStyle;

    fn ex_style(&self, window: WindowId) -> ExtendedStyle;

    fn window_rect(&self, window: WindowId) -> Option<Rect>;

    fn client_rect(&self, window: WindowId) -> Option<Rect>;

    /// Sibling directly in front of `window`
    fn prev_sibling(&self, window: WindowId) -> Option<WindowId>;

    /// Sibling directly behind `window`
    fn next_sibling(&self, window: WindowId) -> Option<WindowId>;

    /// Clip region relative to the window rect, `None` if rectangular
    fn window_region(&self, window: WindowId) -> Option<Region>;

    fn layered_attributes(&self, window: WindowId) -> Option<LayeredAttributes>;

    fn title(&self, window: WindowId) -> String;

    /// Class forbids closing, or the system-menu close item is disabled
    fn close_allowed(&self, window: WindowId) -> bool;

    fn mouse_activate(&self, window: WindowId, hit: HitTest) -> MouseActivate;

    fn foreground_window(&self) -> Option<WindowId>;

    fn set_foreground_window(&self, window: WindowId);

    fn active_window(&self) -> Option<WindowId>;

    fn set_active_window(&self, window: WindowId);

    fn focus_window(&self) -> Option<WindowId>;

    fn is_child(&self, parent: WindowId, window: WindowId) -> bool;

    fn send_message(&self, window: WindowId, message: ClientMessage);

    /// Lets the window adjust its tracking limits, starting from `defaults`
    fn min_max_info(&self, window: WindowId, defaults: MinMaxInfo) -> MinMaxInfo;

    /// Offers a proposed window rect during an interactive resize. `None`
    /// when the window does not handle sizing.
    fn sizing(&self, window: WindowId, corner: SizingCorner, rect: Rect) -> Option<Rect>;

    /// Moves, resizes or restacks a window. Without `NOZORDER` the window is
    /// brought to the top of its siblings. The model reports the change back
    /// through its [`WindowPosSink`].
    fn set_window_pos(&self, window: WindowId, rect: Rect, flags: PosFlags);

    /// Rect the window returns to when restored from maximized
    fn set_restore_rect(&self, window: WindowId, rect: Rect);

    /// Top-level windows owned by this process
    fn top_level_windows(&self) -> Vec<WindowId>;

    /// Delivers a session message asynchronously. Returns `false` if it
    /// could not be sent, in which case `done` is never called.
    fn send_session_message(
        &self,
        window: WindowId,
        message: SessionMessage,
        done: SessionCallback,
    ) -> bool;

    fn exit_process(&self);
}

/// Result of the changing phase of a window-position change.
#[derive(Debug, Clone, PartialEq)]
pub struct PosChange {
    /// Window rect plus host decoration (the whole rect)
    pub visible_rect: Rect,
    /// Back-buffer to use after the change
    pub surface: Option<Surface>,
}

/// Callbacks a client model makes while it changes window positions.
pub trait WindowPosSink: Send + Sync {
    fn window_pos_changing(
        &self,
        window: WindowId,
        flags: PosFlags,
        window_rect: Rect,
        client_rect: Rect,
    ) -> Result<PosChange, SyncError>;

    fn window_pos_changed(
        &self,
        window: WindowId,
        flags: PosFlags,
        window_rect: Rect,
        client_rect: Rect,
        visible_rect: Rect,
        surface: Option<Surface>,
    );

    fn window_destroyed(&self, window: WindowId);

    /// The window was moved under `parent`.
    fn parent_changed(&self, window: WindowId, parent: WindowId, old_parent: WindowId) -> Result<(), SyncError>;

    /// Called before a minimize, maximize or restore is applied. Returns the
    /// rect and flags to apply instead.
    fn show_window_placement(&self, window: WindowId, rect: Rect, flags: PosFlags) -> (Rect, PosFlags);
}

/// Walks parents up to the window directly below the desktop.
pub fn root_of<C: ClientWindowModel + ?Sized>(client: &C, window: WindowId) -> Option<WindowId> {
    let desktop = client.desktop_window();
    if window == desktop {
        return Some(desktop);
    }
    let mut current = window;
    loop {
        let parent = client.parent(current)?;
        if parent == desktop {
            return Some(current);
        }
        current = parent;
    }
}

/// Checks whether `window` is `owner` or is (transitively) owned by it.
pub fn is_owned_by<C: ClientWindowModel + ?Sized>(client: &C, window: WindowId, owner: WindowId) -> bool {
    let mut current = root_of(client, window);
    while let Some(w) = current {
        if w == owner {
            return true;
        }
        current = client.owner(w).and_then(|o| root_of(client, o));
    }
    false
}

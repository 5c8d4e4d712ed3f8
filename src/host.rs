//! Host window system command interface
//!
//! The host is the native compositor that owns the on-screen windows. The
//! synchronizer only ever talks to it through [`HostWindowSystem`]; inbound
//! notifications arrive separately as [`crate::dispatch::HostEvent`]s.
//!
//! Commands are fire-and-forget except for window creation (which can fail)
//! and [`HostWindowSystem::set_frame`], which returns the frame the host
//! actually applied so callers can follow a coerced frame.

use crate::error::HostError;
use crate::geometry::{Rect, Size};
use crate::surface::Surface;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle of a host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostWindowId(pub u64);

impl fmt::Display for HostWindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

/// Decoration and behavior features of a host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowFeatures {
    /// Clicking the window must not activate the application
    pub prevents_app_activation: bool,
    pub title_bar: bool,
    pub close_button: bool,
    pub minimize_button: bool,
    pub maximize_button: bool,
    /// Tool-window styling (small title bar)
    pub utility: bool,
    pub resizable: bool,
    pub shadow: bool,
}

impl WindowFeatures {
    /// Any feature that makes the host draw something around the content
    pub fn has_decorations(&self) -> bool {
        self.title_bar || self.shadow || self.resizable
    }
}

/// Behavioral state pushed alongside the features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostWindowState {
    pub disabled: bool,
    pub no_foreground: bool,
    /// Topmost: floats above normal windows
    pub floating: bool,
    pub excluded_by_expose: bool,
    pub excluded_by_cycle: bool,
    pub minimized: bool,
    /// `minimized` is only meaningful (and acted on) when this is set
    pub minimized_valid: bool,
    pub maximized: bool,
}

/// Shape mask applied to a host window, in whole-rect-relative coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeMask {
    /// Plain rectangular window
    None,
    /// Nothing of the window is visible
    Empty,
    Rects(Vec<Rect>),
}

/// Where to put a window in the host's front-to-back order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Directly behind the given window
    Below(HostWindowId),
    /// Directly in front of the given window
    Above(HostWindowId),
    /// In front of all windows without an explicit neighbor
    Front,
}

/// 24-bit color, used for color keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Commands the synchronizer issues to the host window system.
#[cfg_attr(test, mockall::automock)]
pub trait HostWindowSystem: Send + Sync {
    fn create_window(&self, features: &WindowFeatures, frame: Rect) -> Result<HostWindowId, HostError>;

    fn destroy_window(&self, window: HostWindowId);

    fn set_features(&self, window: HostWindowId, features: &WindowFeatures);

    fn set_state(&self, window: HostWindowId, state: &HostWindowState);

    /// Attaches the window to its owner's host window, or detaches it
    fn set_parent(&self, window: HostWindowId, parent: Option<HostWindowId>);

    fn set_title(&self, window: HostWindowId, title: &str);

    /// Requests a new frame and returns the frame the host applied.
    fn set_frame(&self, window: HostWindowId, frame: Rect) -> Rect;

    /// Frame the window currently has on the host
    fn window_frame(&self, window: HostWindowId) -> Rect;

    /// Limits for interactive resizing, as frame sizes. `None` leaves the
    /// maximum unbounded.
    fn set_min_max_sizes(&self, window: HostWindowId, min: Size, max: Option<Size>);

    fn set_shape(&self, window: HostWindowId, shape: &ShapeMask);

    /// Whole-window opacity, 0.0 to 1.0
    fn set_alpha(&self, window: HostWindowId, alpha: f32);

    /// `None` clears the color key
    fn set_color_key(&self, window: HostWindowId, key: Option<Rgb>);

    fn set_per_pixel_alpha(&self, window: HostWindowId, enabled: bool);

    /// Orders the window into the visible stack
    fn order_window(&self, window: HostWindowId, placement: Placement, activate: bool);

    /// Orders the window out of the visible stack
    fn hide_window(&self, window: HostWindowId);

    /// Gives keyboard focus, optionally activating the application too
    fn give_focus(&self, window: HostWindowId, activate: bool);

    /// Marks an already focused window as activated
    fn activate_window(&self, window: HostWindowId);

    /// Tells the host a focus grant was refused
    fn reject_focus(&self, window: HostWindowId);

    /// Attaches (or detaches with `None`) the back-buffer shown in the window
    fn set_surface(&self, window: HostWindowId, surface: Option<Surface>);

    /// Answers a pending quit request
    fn quit_reply(&self, quit: bool);

    /// Union of all displays, in logical coordinates
    fn desktop_rect(&self) -> Rect;
}

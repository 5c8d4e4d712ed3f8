//! Geometry and feature translation
//!
//! Pure functions between the logical description of a window (style bits
//! plus rects) and what the host needs (frame rect plus decoration
//! features). The host draws title bars and borders itself, so the host
//! frame (the *whole rect*) is the window rect grown by the decoration
//! insets derived from the style. Shaped windows get no decorations and thus
//! zero insets.

use crate::config::{DecorationConfig, FrameConfig};
use crate::geometry::{Insets, Rect};
use crate::host::{HostWindowState, WindowFeatures};
use crate::style::{ExtendedStyle, WindowStyle};

/// Everything about a window that decides its decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStyle {
    pub style: WindowStyle,
    pub ex_style: ExtendedStyle,
    pub window_rect: Rect,
    pub client_rect: Rect,
    pub shaped: bool,
}

/// Converts between logical rects and host frames for one decoration policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Translator {
    decorations: DecorationConfig,
}

impl Translator {
    pub fn new(decorations: DecorationConfig) -> Self {
        Self { decorations }
    }

    /// Host decoration features for a window.
    pub fn features(&self, frame: &FrameStyle) -> WindowFeatures {
        let FrameStyle {
            style, ex_style, ..
        } = *frame;
        let mut features = WindowFeatures {
            prevents_app_activation: ex_style.contains(ExtendedStyle::NOACTIVATE),
            ..WindowFeatures::default()
        };

        if !self.decorations.enabled
            || frame.shaped
            || frame.window_rect.is_empty()
            || frame.window_rect == frame.client_rect
        {
            return features;
        }

        if style.contains(WindowStyle::CAPTION) && !ex_style.contains(ExtendedStyle::LAYERED) {
            features.title_bar = true;
            features.shadow = true;
            features.close_button = style.contains(WindowStyle::SYSMENU);
            features.minimize_button = style.contains(WindowStyle::MINIMIZEBOX);
            features.maximize_button = style.contains(WindowStyle::MAXIMIZEBOX);
            features.utility = ex_style.contains(ExtendedStyle::TOOLWINDOW);
        }

        if style.contains(WindowStyle::THICKFRAME) {
            features.shadow = true;
            features.resizable = true;
        } else if ex_style.contains(ExtendedStyle::DLGMODALFRAME)
            || (style & WindowStyle::CAPTION) == WindowStyle::DLGFRAME
        {
            features.shadow = true;
        }

        features
    }

    /// Decoration insets for a window, limited to what its features draw.
    pub fn insets(&self, frame: &FrameStyle) -> Insets {
        let features = self.features(frame);
        let mut style_mask = WindowStyle::empty();
        let mut ex_mask = ExtendedStyle::empty();
        if features.title_bar {
            style_mask |= WindowStyle::CAPTION;
            ex_mask |= ExtendedStyle::TOOLWINDOW;
        }
        if features.shadow {
            style_mask |= WindowStyle::DLGFRAME | WindowStyle::THICKFRAME;
            ex_mask |= ExtendedStyle::DLGMODALFRAME;
        }
        self.adjust_insets(frame.style & style_mask, frame.ex_style & ex_mask)
    }

    /// Frame thickness and caption height for the given style bits
    fn adjust_insets(&self, style: WindowStyle, ex_style: ExtendedStyle) -> Insets {
        let d = &self.decorations;
        let frame = if style.contains(WindowStyle::THICKFRAME) {
            d.sizing_frame
        } else if ex_style.contains(ExtendedStyle::DLGMODALFRAME) || style.contains(WindowStyle::DLGFRAME) {
            d.dialog_frame
        } else if style.contains(WindowStyle::BORDER) {
            d.border
        } else {
            0
        };

        let mut insets = Insets::uniform(frame);
        if style.contains(WindowStyle::CAPTION) {
            insets.top += if ex_style.contains(ExtendedStyle::TOOLWINDOW) {
                d.small_caption_height
            } else {
                d.caption_height
            };
        }
        insets
    }

    /// Logical rect to host frame (the whole rect)
    pub fn to_host_rect(&self, frame: &FrameStyle, rect: Rect) -> Rect {
        to_host_rect(rect, self.insets(frame))
    }

    /// Host frame back to the logical rect
    pub fn to_logical_rect(&self, frame: &FrameStyle, rect: Rect) -> Rect {
        to_logical_rect(rect, self.insets(frame))
    }
}

/// Grows a logical rect by the insets. Empty rects pass through unchanged;
/// results are at least 1x1.
pub fn to_host_rect(rect: Rect, insets: Insets) -> Rect {
    if rect.is_empty() {
        return rect;
    }
    rect.expand(insets).clamp_min_size()
}

/// Inverse of [`to_host_rect`].
pub fn to_logical_rect(rect: Rect, insets: Insets) -> Rect {
    if rect.is_empty() {
        return rect;
    }
    rect.contract(insets).clamp_min_size()
}

/// Where minimized windows are parked on the logical side
pub const MINIMIZED_POSITION: i32 = -32000;

/// Clamps a frame into the range hosts accept.
///
/// The origin is limited to +/- `coordinate_limit`; the size to
/// `max_extent` and to twice the desktop extent, and to at least 1x1.
pub fn constrain_frame(frame: Rect, desktop: Rect, limits: &FrameConfig) -> Rect {
    let limit = limits.coordinate_limit;
    let x = frame.left.clamp(-limit, limit);
    let y = frame.top.clamp(-limit, limit);

    let cap = |desktop_extent: i32| {
        if desktop_extent > 0 {
            limits.max_extent.min(desktop_extent.saturating_mul(2))
        } else {
            limits.max_extent
        }
    };
    let width = frame.width().min(cap(desktop.width())).max(1);
    let height = frame.height().min(cap(desktop.height())).max(1);

    Rect::from_origin_size(x, y, width, height)
}

/// Whether a window may become the foreground window at all.
pub fn can_activate(style: WindowStyle, ex_style: ExtendedStyle, window_rect: Rect, is_desktop: bool) -> bool {
    style.contains(WindowStyle::VISIBLE)
        && !style.is_pure_child()
        && !style.contains(WindowStyle::MINIMIZE)
        && !style.contains(WindowStyle::DISABLED)
        && !ex_style.contains(ExtendedStyle::NOACTIVATE)
        && !is_desktop
        && !window_rect.is_empty()
}

/// Host-side behavioral state for a window.
///
/// `record_minimized` is what the host was last told; the minimized bit is
/// only marked valid when it differs.
pub fn host_window_state(
    frame: &FrameStyle,
    has_owner: bool,
    can_activate: bool,
    record_minimized: bool,
) -> HostWindowState {
    let FrameStyle {
        style, ex_style, ..
    } = *frame;
    let minimized = style.contains(WindowStyle::MINIMIZE);
    let excluded = !ex_style.contains(ExtendedStyle::APPWINDOW)
        && (has_owner || ex_style.intersects(ExtendedStyle::TOOLWINDOW | ExtendedStyle::NOACTIVATE));

    HostWindowState {
        disabled: style.contains(WindowStyle::DISABLED),
        no_foreground: !can_activate,
        floating: ex_style.contains(ExtendedStyle::TOPMOST),
        excluded_by_expose: excluded || frame.window_rect.is_empty(),
        excluded_by_cycle: excluded,
        minimized,
        minimized_valid: minimized != record_minimized,
        maximized: style.contains(WindowStyle::MAXIMIZE),
    }
}

//! Logical window style bits and window-position flags
//!
//! The bit values follow the client window model's wire values so they can be
//! passed through unchanged from the model's style words.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Primary style word of a logical window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WindowStyle: u32 {
        const MAXIMIZEBOX  = 0x0001_0000;
        const MINIMIZEBOX  = 0x0002_0000;
        const THICKFRAME   = 0x0004_0000;
        const SYSMENU      = 0x0008_0000;
        const DLGFRAME     = 0x0040_0000;
        const BORDER       = 0x0080_0000;
        /// Title bar: both border and dialog-frame bits set
        const CAPTION      = Self::BORDER.bits() | Self::DLGFRAME.bits();
        const MAXIMIZE     = 0x0100_0000;
        const DISABLED     = 0x0800_0000;
        const VISIBLE      = 0x1000_0000;
        const MINIMIZE     = 0x2000_0000;
        const CHILD        = 0x4000_0000;
        const POPUP        = 0x8000_0000;

        const OVERLAPPEDWINDOW = Self::CAPTION.bits()
            | Self::SYSMENU.bits()
            | Self::THICKFRAME.bits()
            | Self::MINIMIZEBOX.bits()
            | Self::MAXIMIZEBOX.bits();
    }
}

bitflags! {
    /// Extended style word of a logical window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ExtendedStyle: u32 {
        const DLGMODALFRAME = 0x0000_0001;
        const TOPMOST       = 0x0000_0008;
        const TOOLWINDOW    = 0x0000_0080;
        const WINDOWEDGE    = 0x0000_0100;
        const CLIENTEDGE    = 0x0000_0200;
        const APPWINDOW     = 0x0004_0000;
        const LAYERED       = 0x0008_0000;
        const LAYOUTRTL     = 0x0040_0000;
        const NOACTIVATE    = 0x0800_0000;
    }
}

bitflags! {
    /// Flags accompanying a window-position change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PosFlags: u32 {
        const NOSIZE         = 0x0001;
        const NOMOVE         = 0x0002;
        const NOZORDER       = 0x0004;
        const NOREDRAW       = 0x0008;
        const NOACTIVATE     = 0x0010;
        const FRAMECHANGED   = 0x0020;
        const SHOWWINDOW     = 0x0040;
        const HIDEWINDOW     = 0x0080;
        const NOOWNERZORDER  = 0x0200;
        const NOSENDCHANGING = 0x0400;
        /// Minimized/maximized state changed as part of this move
        const STATECHANGED   = 0x8000;
    }
}

impl WindowStyle {
    /// Visible and not iconified
    pub fn is_shown_normally(&self) -> bool {
        self.contains(WindowStyle::VISIBLE) && !self.contains(WindowStyle::MINIMIZE)
    }

    /// A child (not popup) window, which never owns a host window
    pub fn is_pure_child(&self) -> bool {
        self.contains(WindowStyle::CHILD) && !self.contains(WindowStyle::POPUP)
    }
}

/// A change to one of the two style words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleChange {
    Style {
        old: WindowStyle,
        new: WindowStyle,
    },
    Extended {
        old: ExtendedStyle,
        new: ExtendedStyle,
    },
}

impl StyleChange {
    /// Extended-style bits that flipped, empty for primary-style changes
    pub fn changed_extended(&self) -> ExtendedStyle {
        match self {
            StyleChange::Style { .. } => ExtendedStyle::empty(),
            StyleChange::Extended { old, new } => *old ^ *new,
        }
    }
}

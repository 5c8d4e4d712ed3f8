//! Per-window synchronization state

use crate::client::WindowId;
use crate::geometry::Rect;
use crate::host::HostWindowId;
use crate::opacity::AppliedOpacity;
use crate::surface::Surface;
use std::time::Instant;

/// Whether the host window is in the visible stack.
///
/// Independent of minimization: a hidden window can be minimized on the
/// host, and an iconified window stays ordered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    /// Ordered out (or never shown)
    #[default]
    Hidden,
    Shown,
}

/// Which transparency mechanism drives the window's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransparencyMode {
    #[default]
    Opaque,
    /// Alpha and color key set through layered attributes
    Attributes,
    /// The client pushes complete per-pixel-alpha frames itself
    UpdateLayered,
}

impl TransparencyMode {
    pub fn is_layered(&self) -> bool {
        !matches!(self, TransparencyMode::Opaque)
    }
}

/// Keyboard focus as seen from the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    NoFocus,
    /// Expecting a host focus grant that should also activate
    PendingActivation { since: Instant },
    HostFocused,
}

/// State bridging one logical top-level window and its host window.
#[derive(Debug, Clone)]
pub struct SyncRecord {
    pub id: WindowId,
    /// `None` after the host window is torn down
    pub host: Option<HostWindowId>,
    pub window_rect: Rect,
    /// Window rect plus host decoration
    pub whole_rect: Rect,
    pub client_rect: Rect,
    /// A non-rectangular clip region is active
    pub shaped: bool,
    pub presence: Presence,
    /// Minimized state last pushed to or reported by the host; the host owns
    /// the geometry while set
    pub minimized: bool,
    /// A host-driven drag of the title bar is in progress
    pub being_dragged: bool,
    pub transparency: TransparencyMode,
    pub opacity: AppliedOpacity,
    pub surface: Option<Surface>,
    /// Buffer kept aside while minimized
    pub unminimized_surface: Option<Surface>,
    pub focus: FocusState,
}

impl SyncRecord {
    pub fn new(id: WindowId, window_rect: Rect, whole_rect: Rect, client_rect: Rect) -> Self {
        Self {
            id,
            host: None,
            window_rect,
            whole_rect,
            client_rect,
            shaped: false,
            presence: Presence::Hidden,
            minimized: false,
            being_dragged: false,
            transparency: TransparencyMode::Opaque,
            opacity: AppliedOpacity::default(),
            surface: None,
            unminimized_surface: None,
            focus: FocusState::NoFocus,
        }
    }

    /// Ordered into the host's visible stack (iconified counts)
    pub fn on_screen(&self) -> bool {
        self.presence == Presence::Shown
    }

    pub fn minimized(&self) -> bool {
        self.minimized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_and_minimized_are_independent() {
        let mut record = SyncRecord::new(
            WindowId(1),
            Rect::new(0, 0, 10, 10),
            Rect::new(0, 0, 10, 10),
            Rect::new(0, 0, 10, 10),
        );
        assert!(!record.on_screen());
        assert!(!record.minimized());

        record.minimized = true;
        assert!(!record.on_screen());
        assert!(record.minimized());

        record.presence = Presence::Shown;
        assert!(record.on_screen());
        assert!(record.minimized());
    }

    #[test]
    fn test_layered_modes() {
        assert!(!TransparencyMode::Opaque.is_layered());
        assert!(TransparencyMode::Attributes.is_layered());
        assert!(TransparencyMode::UpdateLayered.is_layered());
    }
}

//! Opacity and color-key synchronization
//!
//! Maps layered-window attributes onto the host's per-window transparency
//! commands. The record keeps what was last applied, so re-applying the same
//! attributes issues nothing. A change of color key or per-pixel alpha
//! invalidates already composited pixels, so the whole back-buffer is marked
//! dirty when either changes.

use crate::client::{ClientWindowModel, WindowId};
use crate::host::{HostWindowId, HostWindowSystem, Rgb};
use crate::sync::WindowSynchronizer;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// A requested color key as the client model expresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorKey {
    Rgb(Rgb),
    /// Palette entry; the host has no palette, treated as black
    PaletteIndex(u16),
    /// Index into a DIB color table, treated as black
    DibIndex(u16),
}

impl ColorKey {
    pub fn to_rgb(self) -> Rgb {
        match self {
            ColorKey::Rgb(rgb) => rgb,
            ColorKey::PaletteIndex(_) | ColorKey::DibIndex(_) => Rgb::BLACK,
        }
    }
}

/// Layered-window attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayeredAttributes {
    /// Constant alpha, `None` when unset (fully opaque)
    pub alpha: Option<u8>,
    /// `None` when no color key is set
    pub color_key: Option<ColorKey>,
}

/// Transparency state last pushed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedOpacity {
    pub alpha: u8,
    pub color_key: Option<Rgb>,
    pub per_pixel_alpha: bool,
}

impl Default for AppliedOpacity {
    /// A fresh host window: opaque, no key, no per-pixel alpha
    fn default() -> Self {
        Self {
            alpha: u8::MAX,
            color_key: None,
            per_pixel_alpha: false,
        }
    }
}

/// Host commands needed to reach a requested transparency state.
///
/// Each field is `None` when that aspect is already in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpacityPlan {
    pub alpha: Option<u8>,
    pub color_key: Option<Option<Rgb>>,
    pub per_pixel_alpha: Option<bool>,
}

impl OpacityPlan {
    pub fn new(applied: &AppliedOpacity, attributes: &LayeredAttributes, per_pixel_alpha: bool) -> Self {
        let alpha = attributes.alpha.unwrap_or(u8::MAX);
        let color_key = attributes.color_key.map(ColorKey::to_rgb);
        Self {
            alpha: (applied.alpha != alpha).then_some(alpha),
            color_key: (applied.color_key != color_key).then_some(color_key),
            per_pixel_alpha: (applied.per_pixel_alpha != per_pixel_alpha).then_some(per_pixel_alpha),
        }
    }

    pub fn is_noop(&self) -> bool {
        *self == OpacityPlan::default()
    }

    /// Color key or per-pixel alpha changes
    pub fn invalidates_surface(&self) -> bool {
        self.color_key.is_some() || self.per_pixel_alpha.is_some()
    }

    /// Issues the planned commands
    pub fn issue<H: HostWindowSystem + ?Sized>(&self, host: &H, window: HostWindowId) {
        if let Some(alpha) = self.alpha {
            host.set_alpha(window, f32::from(alpha) / 255.0);
        }
        if let Some(key) = self.color_key {
            host.set_color_key(window, key);
        }
        if let Some(enabled) = self.per_pixel_alpha {
            host.set_per_pixel_alpha(window, enabled);
        }
    }

    /// Records the planned state as applied
    pub fn apply_to(&self, applied: &mut AppliedOpacity) {
        if let Some(alpha) = self.alpha {
            applied.alpha = alpha;
        }
        if let Some(key) = self.color_key {
            applied.color_key = key;
        }
        if let Some(enabled) = self.per_pixel_alpha {
            applied.per_pixel_alpha = enabled;
        }
    }
}

impl<H, C> WindowSynchronizer<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    /// Brings the host's transparency in line with `attributes`.
    pub(crate) fn sync_window_opacity(&self, id: WindowId, attributes: &LayeredAttributes, per_pixel_alpha: bool) {
        let Some(record) = self.registry.snapshot(id) else {
            return;
        };
        let Some(host) = record.host else {
            return;
        };

        let plan = OpacityPlan::new(&record.opacity, attributes, per_pixel_alpha);
        if plan.is_noop() {
            trace!("{}/{} opacity unchanged", id, host);
            return;
        }

        debug!("{}/{} opacity {:?}", id, host, plan);
        plan.issue(&*self.host, host);
        self.registry.update(id, |r| plan.apply_to(&mut r.opacity));

        if plan.invalidates_surface() {
            if let Some(surface) = &record.surface {
                surface.add_bounds(record.whole_rect.at_origin());
            }
        }
    }
}

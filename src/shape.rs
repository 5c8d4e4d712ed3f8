//! Window shape synchronization
//!
//! Converts a logical clip region into the host's shape mask. Regions are
//! given relative to the window rect; masks are relative to the whole rect.

use crate::client::{ClientWindowModel, WindowId};
use crate::geometry::Rect;
use crate::host::{HostWindowSystem, ShapeMask};
use crate::style::ExtendedStyle;
use crate::sync::WindowSynchronizer;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Ordered list of non-overlapping rectangles.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// Builds a region, dropping empty rects and sorting top-to-bottom,
    /// left-to-right
    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        let mut rects: Vec<Rect> = rects.into_iter().filter(|r| !r.is_empty()).collect();
        rects.sort_by_key(|r| (r.top, r.left));
        Self { rects }
    }

    /// Single-rectangle region
    pub fn rect(rect: Rect) -> Self {
        Self::from_rects([rect])
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn bounding_box(&self) -> Rect {
        self.rects.iter().fold(Rect::default(), |acc, r| acc.union(r))
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Region {
        Self {
            rects: self.rects.iter().map(|r| r.offset(dx, dy)).collect(),
        }
    }

    /// Mirrors horizontally inside a container of `width`
    pub fn mirror(&self, width: i32) -> Region {
        Self::from_rects(self.rects.iter().map(|r| r.mirror(width)))
    }
}

/// Where the new region comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSource {
    /// The caller knows the new region (`None` = rectangular)
    Supplied(Option<Region>),
    /// Only known to have changed; ask the client model
    FetchFromClient,
}

/// Mask to push plus the resulting `shaped` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeOutcome {
    pub mask: ShapeMask,
    pub shaped: bool,
}

/// Computes the host shape for a window.
pub fn compute_shape(window_rect: Rect, whole_rect: Rect, region: Option<&Region>, rtl: bool) -> ShapeOutcome {
    // a zero-sized window must never become visible by accident
    if window_rect.is_empty() {
        return ShapeOutcome {
            mask: ShapeMask::Empty,
            shaped: false,
        };
    }

    let Some(region) = region else {
        return ShapeOutcome {
            mask: ShapeMask::None,
            shaped: false,
        };
    };

    let mirrored;
    let region = if rtl {
        mirrored = region.mirror(window_rect.width());
        &mirrored
    } else {
        region
    };
    let local = region.offset(
        window_rect.left - whole_rect.left,
        window_rect.top - whole_rect.top,
    );

    if local.is_empty() {
        return ShapeOutcome {
            mask: ShapeMask::Empty,
            shaped: true,
        };
    }

    if let [only] = local.rects() {
        if only.contains_rect(&whole_rect.at_origin()) {
            return ShapeOutcome {
                mask: ShapeMask::None,
                shaped: false,
            };
        }
    }

    ShapeOutcome {
        mask: ShapeMask::Rects(local.rects),
        shaped: true,
    }
}

impl<H, C> WindowSynchronizer<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    /// Pushes the window's clip region to the host.
    pub(crate) fn sync_window_region(&self, id: WindowId, source: RegionSource) {
        let Some(record) = self.registry.snapshot(id) else {
            return;
        };
        let Some(host) = record.host else {
            return;
        };

        let region = match source {
            RegionSource::Supplied(region) => region,
            RegionSource::FetchFromClient => self.client.window_region(id),
        };
        let rtl = self.client.ex_style(id).contains(ExtendedStyle::LAYOUTRTL);
        let outcome = compute_shape(record.window_rect, record.whole_rect, region.as_ref(), rtl);

        trace!("{}/{} shape {:?}", id, host, outcome.mask);
        self.host.set_shape(host, &outcome.mask);
        self.registry.update(id, |r| r.shaped = outcome.shaped);

        if record.shaped != outcome.shaped {
            debug!("{} shaped {} -> {}", id, record.shaped, outcome.shaped);
            self.set_host_window_properties(id);
        }
    }
}

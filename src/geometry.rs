//! Rectangle primitives shared by both sides of the synchronizer
//!
//! Logical and host coordinates use the same edge-based representation:
//! `left`/`top` are inclusive, `right`/`bottom` are exclusive. A rect whose
//! right edge is not past its left edge (or bottom past top) is empty.
//!
//! # Example
//!
//! ```
//! use winsync::geometry::{Insets, Rect};
//!
//! let window = Rect::new(0, 0, 100, 100);
//! let whole = window.expand(Insets::new(5, 30, 5, 5));
//! assert_eq!(whole, Rect::new(-5, -30, 105, 105));
//! assert_eq!(whole.contract(Insets::new(5, 30, 5, 5)), window);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle in edge coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a rect from an origin and a size
    pub const fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    /// Saturates instead of overflowing for rects spanning more than `i32::MAX`
    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Returns `true` when the rect covers no area (including inverted rects)
    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Returns the area in square units, zero for empty rects
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            (i64::from(self.right) - i64::from(self.left)) * (i64::from(self.bottom) - i64::from(self.top))
        }
    }

    /// Translates the rect by the given deltas
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.left.saturating_add(dx),
            self.top.saturating_add(dy),
            self.right.saturating_add(dx),
            self.bottom.saturating_add(dy),
        )
    }

    /// Same size, moved to the origin
    pub fn at_origin(&self) -> Rect {
        self.offset(-self.left, -self.top)
    }

    /// Returns the overlap of two rects, or `None` when they do not share any area
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let rect = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!rect.is_empty()).then_some(rect)
    }

    /// Smallest rect covering both; empty operands are ignored
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Checks whether `other` lies entirely within this rect.
    ///
    /// Edges may coincide.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }

    /// Grows the rect outward by the insets
    pub fn expand(&self, insets: Insets) -> Rect {
        Rect::new(
            self.left.saturating_sub(insets.left),
            self.top.saturating_sub(insets.top),
            self.right.saturating_add(insets.right),
            self.bottom.saturating_add(insets.bottom),
        )
    }

    /// Shrinks the rect inward by the insets
    pub fn contract(&self, insets: Insets) -> Rect {
        Rect::new(
            self.left.saturating_add(insets.left),
            self.top.saturating_add(insets.top),
            self.right.saturating_sub(insets.right),
            self.bottom.saturating_sub(insets.bottom),
        )
    }

    /// Mirrors the rect horizontally inside a container of the given width.
    ///
    /// Used for right-to-left layouts where x grows leftward.
    pub fn mirror(&self, width: i32) -> Rect {
        Rect::new(
            width.saturating_sub(self.right),
            self.top,
            width.saturating_sub(self.left),
            self.bottom,
        )
    }

    /// Forces at least 1x1 so degenerate frames never reach a host
    pub fn clamp_min_size(&self) -> Rect {
        let mut rect = *self;
        if rect.right <= rect.left {
            rect.right = rect.left.saturating_add(1);
        }
        if rect.bottom <= rect.top {
            rect.bottom = rect.top.saturating_add(1);
        }
        rect
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Per-edge decoration thickness, all values measured inward-positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Insets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Insets {
    pub const ZERO: Insets = Insets::new(0, 0, 0, 0);

    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Same thickness on every edge
    pub const fn uniform(amount: i32) -> Self {
        Self::new(amount, amount, amount, amount)
    }

    pub fn is_zero(&self) -> bool {
        *self == Insets::ZERO
    }
}

/// Extent of a rect without a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Larger of each dimension
    pub fn max(self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }
}

impl Rect {
    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

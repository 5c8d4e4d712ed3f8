//! Back-buffer surfaces and their lifecycle
//!
//! A [`Surface`] is a reference-counted off-screen pixel buffer sized to a
//! window's visible rect rounded out to whole tiles. Handing the same surface
//! to the host, to the record and to a pending position change only bumps a
//! reference count; pixels are never copied.
//!
//! Lifecycle rules:
//! - a position change reuses the current surface when its rounded rect is
//!   unchanged, otherwise a new surface is allocated and the old one is
//!   released once the new one is installed
//! - on minimize the current surface is retained separately and the host
//!   keeps showing it
//! - on unminimize a retained surface with a matching rect is reinstalled
//!   as-is and the separate reference is dropped

use crate::client::{ClientWindowModel, WindowId};
use crate::error::SyncError;
use crate::geometry::Rect;
use crate::host::HostWindowSystem;
use crate::record::{SyncRecord, TransparencyMode};
use crate::style::{PosFlags, WindowStyle};
use crate::sync::WindowSynchronizer;
use log::{debug, trace};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

const BYTES_PER_PIXEL: usize = 4;

/// Shared handle to a back-buffer.
#[derive(Clone)]
pub struct Surface(Arc<SurfaceBuffer>);

struct SurfaceBuffer {
    rect: Rect,
    pixels: Mutex<Vec<u32>>,
    state: Mutex<SurfaceState>,
}

#[derive(Debug, Default)]
struct SurfaceState {
    /// Area that must be flushed to the host, `None` when clean
    bounds: Option<Rect>,
    use_alpha: bool,
    visible: Rect,
}

impl Surface {
    /// Allocates a zeroed surface covering `rect`.
    ///
    /// Fails without side effects if the buffer would exceed `max_bytes` or
    /// the allocator cannot provide it.
    pub fn allocate(rect: Rect, use_alpha: bool, max_bytes: usize) -> Result<Self, SyncError> {
        let pixels = usize::try_from(rect.area()).unwrap_or(usize::MAX);
        let bytes = pixels.saturating_mul(BYTES_PER_PIXEL);
        if bytes > max_bytes {
            return Err(SyncError::SurfaceAllocation { rect, bytes });
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(pixels)
            .map_err(|_| SyncError::SurfaceAllocation { rect, bytes })?;
        buffer.resize(pixels, 0);

        trace!("allocated {}x{} surface", rect.width(), rect.height());
        Ok(Self(Arc::new(SurfaceBuffer {
            rect,
            pixels: Mutex::new(buffer),
            state: Mutex::new(SurfaceState {
                bounds: None,
                use_alpha,
                visible: rect,
            }),
        })))
    }

    /// Surface rect, relative to the window's whole rect
    pub fn rect(&self) -> Rect {
        self.0.rect
    }

    pub fn use_alpha(&self) -> bool {
        self.0.state.lock().use_alpha
    }

    pub fn set_use_alpha(&self, use_alpha: bool) {
        self.0.state.lock().use_alpha = use_alpha;
    }

    /// Extends the dirty bounds; empty rects are ignored
    pub fn add_bounds(&self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        let mut state = self.0.state.lock();
        state.bounds = Some(match state.bounds {
            Some(bounds) => bounds.union(&rect),
            None => rect,
        });
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.0.state.lock().bounds
    }

    /// Clears the dirty bounds, returning what was dirty
    pub fn take_bounds(&self) -> Option<Rect> {
        self.0.state.lock().bounds.take()
    }

    /// Restricts drawing to the part of the surface inside `visible`,
    /// given in the same coordinates as the visible rect it was sized for
    pub fn clip_to_visible(&self, visible: Rect) {
        let clip = visible.at_origin().intersect(&self.0.rect).unwrap_or_default();
        self.0.state.lock().visible = clip;
    }

    pub fn visible_rect(&self) -> Rect {
        self.0.state.lock().visible
    }

    /// Fills `rect` (surface coordinates) with a pixel value and marks it dirty
    pub fn fill(&self, rect: Rect, pixel: u32) {
        let Some(area) = rect.intersect(&self.0.rect) else {
            return;
        };
        let stride = self.0.rect.width() as usize;
        let mut pixels = self.0.pixels.lock();
        for y in area.top..area.bottom {
            let row = (y - self.0.rect.top) as usize * stride;
            let start = row + (area.left - self.0.rect.left) as usize;
            let end = row + (area.right - self.0.rect.left) as usize;
            pixels[start..end].fill(pixel);
        }
        drop(pixels);
        self.add_bounds(area);
    }

    pub fn byte_len(&self) -> usize {
        self.0.pixels.lock().len() * BYTES_PER_PIXEL
    }

    /// Both handles refer to the same buffer
    pub fn ptr_eq(&self, other: &Surface) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this buffer
    pub fn references(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub(crate) fn same(a: Option<&Surface>, b: Option<&Surface>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("rect", &self.0.rect)
            .field("buffer", &Arc::as_ptr(&self.0))
            .finish()
    }
}

/// Rounds the on-desktop part of `visible` out to whole tiles.
///
/// The result is relative to `visible`'s origin and always at least one
/// tile in each direction. `granularity` must be a power of two.
pub fn surface_rect(visible: Rect, desktop: Rect, granularity: i32) -> Rect {
    let tile = granularity.max(1);
    let mask = !(tile - 1);
    let rect = visible
        .intersect(&desktop)
        .map(|r| r.offset(-visible.left, -visible.top))
        .unwrap_or_default();

    let left = rect.left & mask;
    let top = rect.top & mask;
    let right = (left + tile).max((rect.right + tile - 1) & mask);
    let bottom = (top + tile).max((rect.bottom + tile - 1) & mask);
    Rect::new(left, top, right, bottom)
}

impl<H, C> WindowSynchronizer<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    /// Picks the surface for an upcoming position change.
    pub(crate) fn prepare_surface(
        &self,
        record: &SyncRecord,
        style: WindowStyle,
        flags: PosFlags,
        visible: Rect,
    ) -> Result<Option<Surface>, SyncError> {
        if record.host.is_none()
            || flags.contains(PosFlags::HIDEWINDOW)
            || record.transparency == TransparencyMode::UpdateLayered
        {
            return Ok(None);
        }

        // The host draws the iconified window itself
        if style.contains(WindowStyle::MINIMIZE) {
            return Ok(record.surface.clone());
        }

        let rect = surface_rect(visible, self.desktop_rect(), self.config.surface.granularity);

        if let Some(retained) = record
            .unminimized_surface
            .as_ref()
            .filter(|surface| surface.rect() == rect)
        {
            trace!("{} reusing surface retained across minimize", record.id);
            retained.clip_to_visible(visible);
            return Ok(Some(retained.clone()));
        }

        match &record.surface {
            Some(current) if current.rect() == rect => {
                current.clip_to_visible(visible);
                return Ok(Some(current.clone()));
            }
            None if !flags.contains(PosFlags::SHOWWINDOW) && !style.contains(WindowStyle::VISIBLE) => {
                return Ok(None);
            }
            _ => {}
        }

        let surface = Surface::allocate(rect, false, self.config.surface.max_bytes())?;
        surface.clip_to_visible(visible);
        debug!("{} new surface {}", record.id, rect);
        Ok(Some(surface))
    }

    /// Installs the surface chosen by [`Self::prepare_surface`].
    pub(crate) fn install_surface(&self, id: WindowId, style: WindowStyle, surface: Option<Surface>) {
        let attach = self
            .registry
            .update(id, |record| {
                let host = record.host?;
                if record.transparency == TransparencyMode::UpdateLayered {
                    return None;
                }

                if style.contains(WindowStyle::MINIMIZE) {
                    if record.unminimized_surface.is_none() {
                        record.unminimized_surface = record.surface.clone();
                    }
                    record.surface = surface;
                    return None;
                }

                let reinstalled = record.unminimized_surface.take().is_some();
                let changed = !Surface::same(record.surface.as_ref(), surface.as_ref());
                record.surface = surface.clone();
                (reinstalled || changed).then_some((host, surface))
            })
            .flatten();

        if let Some((host, surface)) = attach {
            trace!("{} attaching surface {:?}", host, surface);
            self.host.set_surface(host, surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_rect_rounds_out_to_tiles() {
        let desktop = Rect::new(0, 0, 1920, 1080);
        let visible = Rect::new(10, 10, 310, 210);
        assert_eq!(surface_rect(visible, desktop, 128), Rect::new(0, 0, 384, 256));
    }

    #[test]
    fn test_surface_rect_clips_to_desktop() {
        let desktop = Rect::new(0, 0, 1920, 1080);
        let visible = Rect::new(-50, -50, 100, 100);
        // on-desktop part is (50,50)-(150,150) relative to the window
        assert_eq!(surface_rect(visible, desktop, 128), Rect::new(0, 0, 256, 256));
    }

    #[test]
    fn test_surface_rect_off_desktop_is_one_tile() {
        let desktop = Rect::new(0, 0, 800, 600);
        let visible = Rect::new(-32000, -32000, -31900, -31900);
        assert_eq!(surface_rect(visible, desktop, 128), Rect::new(0, 0, 128, 128));
    }

    #[test]
    fn test_small_resizes_keep_rect() {
        let desktop = Rect::new(0, 0, 1920, 1080);
        let a = surface_rect(Rect::new(0, 0, 300, 200), desktop, 128);
        let b = surface_rect(Rect::new(0, 0, 310, 220), desktop, 128);
        assert_eq!(a, b);
    }

    #[test]
    fn test_allocation_budget() {
        let rect = Rect::new(0, 0, 256, 256);
        let err = Surface::allocate(rect, false, 1024).unwrap_err();
        assert!(matches!(err, SyncError::SurfaceAllocation { bytes, .. } if bytes == 256 * 256 * 4));

        let surface = Surface::allocate(rect, false, usize::MAX).unwrap();
        assert_eq!(surface.byte_len(), 256 * 256 * 4);
    }

    #[test]
    fn test_dirty_bounds_accumulate() {
        let surface = Surface::allocate(Rect::new(0, 0, 128, 128), false, usize::MAX).unwrap();
        assert_eq!(surface.bounds(), None);

        surface.add_bounds(Rect::new(0, 0, 10, 10));
        surface.add_bounds(Rect::default());
        surface.add_bounds(Rect::new(50, 50, 60, 70));
        assert_eq!(surface.bounds(), Some(Rect::new(0, 0, 60, 70)));

        assert_eq!(surface.take_bounds(), Some(Rect::new(0, 0, 60, 70)));
        assert_eq!(surface.bounds(), None);
    }

    #[test]
    fn test_fill_marks_dirty() {
        let surface = Surface::allocate(Rect::new(0, 0, 128, 128), false, usize::MAX).unwrap();
        surface.fill(Rect::new(100, 100, 200, 200), 0xff00_00ff);
        assert_eq!(surface.bounds(), Some(Rect::new(100, 100, 128, 128)));
    }

    #[test]
    fn test_clones_share_buffer() {
        let surface = Surface::allocate(Rect::new(0, 0, 128, 128), false, usize::MAX).unwrap();
        let other = surface.clone();
        assert!(surface.ptr_eq(&other));
        assert_eq!(surface.references(), 2);

        let fresh = Surface::allocate(Rect::new(0, 0, 128, 128), false, usize::MAX).unwrap();
        assert!(!surface.ptr_eq(&fresh));
        assert!(Surface::same(None, None));
        assert!(!Surface::same(Some(&surface), None));
    }
}

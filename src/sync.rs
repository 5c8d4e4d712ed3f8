//! Window synchronizer
//!
//! [`WindowSynchronizer`] owns the registry of sync records and is the entry
//! point for both directions of traffic:
//!
//! - the client model calls the driver operations here (`window_pos_changing`,
//!   `window_pos_changed`, `set_window_style`, ...) and they flow down to host
//!   commands through the translator and the shape, opacity, z-order and
//!   surface components
//! - host notifications enter through [`WindowSynchronizer::handle_event`]
//!   (see [`crate::dispatch`]) and flow up as logical messages
//!
//! Every operation follows the same locking discipline: copy what is needed
//! out of the registry, release the lock, talk to the host or the client,
//! then write back only the fields that changed. Client calls may re-enter
//! the synchronizer on the same thread, so a stale copy is never written
//! back as a whole.

use crate::client::{root_of, ClientWindowModel, PosChange, WindowId, WindowPosSink};
use crate::config::SyncConfig;
use crate::dispatch::{is_processing_geometry_event, CurrentEventGuard, EventKind};
use crate::error::SyncError;
use crate::focus::ActivationBridge;
use crate::geometry::Rect;
use crate::host::{HostWindowId, HostWindowSystem};
use crate::opacity::LayeredAttributes;
use crate::record::{Presence, SyncRecord, TransparencyMode};
use crate::registry::Registry;
use crate::session::QuitSession;
use crate::shape::RegionSource;
use crate::style::{ExtendedStyle, PosFlags, StyleChange, WindowStyle};
use crate::surface::Surface;
use crate::translate::{self, FrameStyle, Translator};
use log::{debug, info, trace, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

/// Keeps a client window model and a host window system in agreement.
pub struct WindowSynchronizer<H, C> {
    pub(crate) host: Arc<H>,
    pub(crate) client: Arc<C>,
    pub(crate) registry: Registry,
    pub(crate) config: SyncConfig,
    pub(crate) translator: Translator,
    pub(crate) activation: ActivationBridge,
    /// Union of all displays, refreshed on display changes
    pub(crate) desktop: RwLock<Rect>,
    pub(crate) quit: Mutex<Option<Arc<QuitSession<H, C>>>>,
}

impl<H, C> WindowSynchronizer<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    pub fn new(host: Arc<H>, client: Arc<C>, config: SyncConfig) -> Self {
        let desktop = host.desktop_rect();
        info!("window synchronizer started, desktop {}", desktop);

        Self {
            translator: Translator::new(config.decorations.clone()),
            activation: ActivationBridge::new(Duration::from_millis(config.activation.recent_activation_ms)),
            host,
            client,
            registry: Registry::new(),
            config,
            desktop: RwLock::new(desktop),
            quit: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Desktop extent as of the last display change
    pub fn desktop_rect(&self) -> Rect {
        *self.desktop.read()
    }

    /// Copy of a window's sync record
    pub fn snapshot(&self, id: WindowId) -> Option<SyncRecord> {
        self.registry.snapshot(id)
    }

    /// Host window backing `id`, optionally only while it is on screen
    pub fn host_window(&self, id: WindowId, require_on_screen: bool) -> Option<HostWindowId> {
        self.registry.host_window(id, require_on_screen)
    }

    /// Style and rects of a window as the translator needs them
    pub(crate) fn frame_style(&self, id: WindowId, window_rect: Rect, client_rect: Rect, shaped: bool) -> FrameStyle {
        FrameStyle {
            style: self.client.style(id),
            ex_style: self.client.ex_style(id),
            window_rect,
            client_rect,
            shaped,
        }
    }

    /// Only direct children of the desktop get a host window
    fn is_top_level(&self, id: WindowId) -> bool {
        let desktop = self.client.desktop_window();
        id != desktop && self.client.parent(id) == Some(desktop)
    }

    /// Creates the sync record and its host window.
    ///
    /// On failure nothing is left behind: no record, no host window.
    pub fn create_window(&self, id: WindowId, window_rect: Rect, client_rect: Rect) -> Result<(), SyncError> {
        if self.registry.contains(id) {
            return Err(SyncError::AlreadyRegistered(id));
        }

        let region = self.client.window_region(id);
        let shaped = region.is_some();
        let frame = self.frame_style(id, window_rect, client_rect, shaped);
        let whole_rect = self.translator.to_host_rect(&frame, window_rect);
        let features = self.translator.features(&frame);
        let host_frame = translate::constrain_frame(whole_rect, self.desktop_rect(), &self.config.frame);

        let host = self.host.create_window(&features, host_frame).map_err(|source| {
            warn!("{} host window creation failed: {}", id, source);
            SyncError::HostWindowCreation { window: id, source }
        })?;

        let mut record = SyncRecord::new(id, window_rect, whole_rect, client_rect);
        record.host = Some(host);
        record.shaped = shaped;
        if let Err(err) = self.registry.insert(record) {
            self.host.destroy_window(host);
            return Err(err);
        }
        debug!("{} created {} frame {} features {:?}", id, host, host_frame, features);

        self.set_host_window_properties(id);
        self.host.set_title(host, &self.client.title(id));

        if shaped || window_rect.is_empty() {
            self.sync_window_region(id, RegionSource::Supplied(region));
        }

        if frame.ex_style.contains(ExtendedStyle::LAYERED) {
            if let Some(attributes) = self.client.layered_attributes(id) {
                self.registry.update(id, |r| r.transparency = TransparencyMode::Attributes);
                self.sync_window_opacity(id, &attributes, false);
            }
        }

        Ok(())
    }

    /// Tears down the host window and forgets the record.
    ///
    /// Surfaces are detached from the host before the host window goes away.
    pub fn destroy_window(&self, id: WindowId) {
        let Some((host, surface, unminimized)) = self.registry.update(id, |r| {
            r.presence = Presence::Hidden;
            (r.host.take(), r.surface.take(), r.unminimized_surface.take())
        }) else {
            return;
        };

        if let Some(host) = host {
            self.host.set_surface(host, None);
            drop(surface);
            drop(unminimized);
            self.host.destroy_window(host);
            debug!("{} destroyed {}", id, host);
        }

        self.registry.remove(id);
    }

    /// First phase of a position change: computes the visible rect and
    /// picks the surface. Creates the record for a new top-level window.
    pub fn window_pos_changing(
        &self,
        id: WindowId,
        flags: PosFlags,
        window_rect: Rect,
        client_rect: Rect,
    ) -> Result<PosChange, SyncError> {
        let unmanaged = PosChange {
            visible_rect: window_rect,
            surface: None,
        };

        if !self.registry.contains(id) {
            if !self.is_top_level(id) {
                return Ok(unmanaged);
            }
            self.create_window(id, window_rect, client_rect)?;
        }
        let Some(record) = self.registry.snapshot(id) else {
            return Ok(unmanaged);
        };

        let frame = self.frame_style(id, window_rect, client_rect, record.shaped);
        let visible_rect = self.translator.to_host_rect(&frame, window_rect);
        trace!("{} changing {:?} window {} visible {}", id, flags, window_rect, visible_rect);

        let surface = self.prepare_surface(&record, frame.style, flags, visible_rect)?;
        Ok(PosChange { visible_rect, surface })
    }

    /// Second phase of a position change: records the new geometry and
    /// pushes it to the host unless the host itself reported it.
    pub fn window_pos_changed(
        &self,
        id: WindowId,
        flags: PosFlags,
        window_rect: Rect,
        client_rect: Rect,
        visible_rect: Rect,
        surface: Option<Surface>,
    ) {
        let style = self.client.style(id);
        let Some((old_window, old_whole, host, on_screen)) = self.registry.update(id, |r| {
            let old = (r.window_rect, r.whole_rect, r.host, r.on_screen());
            r.window_rect = window_rect;
            r.whole_rect = visible_rect;
            r.client_rect = client_rect;
            old
        }) else {
            return;
        };
        trace!(
            "{} changed {:?} window {} whole {} style {:?}",
            id,
            flags,
            window_rect,
            visible_rect,
            style
        );

        self.install_surface(id, style, surface);

        let Some(host) = host else {
            return;
        };

        if on_screen && flags.contains(PosFlags::HIDEWINDOW) && !style.contains(WindowStyle::VISIBLE) {
            self.hide_window(id);
        }

        if is_processing_geometry_event(host) {
            trace!("{}/{} change reported by the host, not echoing", id, host);
        } else {
            // state first: a window being minimized must not get its parked frame
            self.set_host_window_properties(id);
            self.sync_window_position(id, flags, Some((old_window, old_whole)));
        }

        if style.contains(WindowStyle::VISIBLE) {
            let Some(record) = self.registry.snapshot(id) else {
                return;
            };
            if !record.on_screen() || flags.intersects(PosFlags::FRAMECHANGED | PosFlags::STATECHANGED) {
                self.set_host_window_properties(id);
            }

            // layered windows are not shown until their attributes are set
            let Some(record) = self.registry.snapshot(id) else {
                return;
            };
            let layered_style = self.client.ex_style(id).contains(ExtendedStyle::LAYERED);
            if !record.on_screen() && (record.transparency.is_layered() || !layered_style) {
                self.show_window(id);
            }
        }
    }

    /// Pushes the record's whole rect to the host as its frame.
    ///
    /// `old` holds the previous window and whole rects; when the offset
    /// between them or the emptiness of the window rect changed, the shape
    /// is refetched. If the host applies a different frame than requested,
    /// logical state follows the host.
    pub(crate) fn sync_window_position(&self, id: WindowId, flags: PosFlags, old: Option<(Rect, Rect)>) {
        let Some(record) = self.registry.snapshot(id) else {
            return;
        };
        let Some(host) = record.host else {
            return;
        };
        if record.minimized() {
            trace!("{}/{} minimized, host owns the geometry", id, host);
            return;
        }

        let frame = translate::constrain_frame(record.whole_rect, self.desktop_rect(), &self.config.frame);
        let applied = self.host.set_frame(host, frame);
        trace!("{}/{} whole {} frame {}", id, host, record.whole_rect, frame);

        if let Some((old_window, old_whole)) = old {
            let offset = |window: Rect, whole: Rect| (window.left - whole.left, window.top - whole.top);
            if old_window.is_empty() != record.window_rect.is_empty()
                || offset(old_window, old_whole) != offset(record.window_rect, record.whole_rect)
            {
                self.sync_window_region(id, RegionSource::FetchFromClient);
            }
        }

        if !flags.contains(PosFlags::NOZORDER) || flags.contains(PosFlags::SHOWWINDOW) {
            self.sync_z_order(id);
        }

        if applied != frame {
            warn!("{}/{} host applied frame {} instead of {}", id, host, applied, frame);
            let _marker = CurrentEventGuard::enter(Some(host), EventKind::FrameChanged);
            self.apply_host_frame(id, applied, false, false);
        }
    }

    /// Pushes owner, features and state of a window to the host.
    pub(crate) fn set_host_window_properties(&self, id: WindowId) {
        let Some(record) = self.registry.snapshot(id) else {
            return;
        };
        let Some(host) = record.host else {
            return;
        };

        let owner = self.client.owner(id);
        let owner_host = owner
            .and_then(|owner| root_of(&*self.client, owner))
            .and_then(|root| self.registry.host_window(root, true));
        self.host.set_parent(host, owner_host);

        let frame = self.frame_style(id, record.window_rect, record.client_rect, record.shaped);
        let features = self.translator.features(&frame);
        self.host.set_features(host, &features);

        let is_desktop = id == self.client.desktop_window();
        let activatable = translate::can_activate(frame.style, frame.ex_style, record.window_rect, is_desktop);
        let state = translate::host_window_state(&frame, owner.is_some(), activatable, record.minimized());
        self.host.set_state(host, &state);
        trace!("{}/{} features {:?} state {:?}", id, host, features, state);

        if state.minimized_valid {
            self.registry.update(id, |r| r.minimized = state.minimized);
        }
    }

    /// Reacts to a window moving to a new parent.
    ///
    /// A window that stops being top-level loses its record and host window;
    /// one that becomes top-level gets them.
    pub fn set_parent(&self, id: WindowId, parent: WindowId, old_parent: WindowId) -> Result<(), SyncError> {
        if parent == old_parent {
            return Ok(());
        }

        let desktop = self.client.desktop_window();
        if parent != desktop {
            if self.registry.contains(id) {
                debug!("{} reparented under {}, dropping host window", id, parent);
                self.destroy_window(id);
            }
            return Ok(());
        }

        if self.registry.contains(id) {
            return Ok(());
        }
        let (Some(window_rect), Some(client_rect)) = (self.client.window_rect(id), self.client.client_rect(id)) else {
            return Ok(());
        };
        debug!("{} became top-level", id);
        self.create_window(id, window_rect, client_rect)
    }

    /// Adjusts a show-state change before the client model applies it.
    ///
    /// Minimized windows are parked at [`translate::MINIMIZED_POSITION`].
    /// When the change comes from a host geometry notification for this
    /// window, the rect is taken from the host's current frame instead.
    pub fn show_window_placement(&self, id: WindowId, rect: Rect, flags: PosFlags) -> (Rect, PosFlags) {
        let Some(record) = self.registry.snapshot(id) else {
            return (rect, flags);
        };
        let Some(host) = record.host else {
            return (rect, flags);
        };

        if self.client.style(id).contains(WindowStyle::MINIMIZE) {
            let parked = translate::MINIMIZED_POSITION;
            if rect.left != parked || rect.top != parked {
                trace!("{} parking minimized window", id);
                let (dx, dy) = (parked.saturating_sub(rect.left), parked.saturating_sub(rect.top));
                return (rect.offset(dx, dy), flags - PosFlags::NOMOVE);
            }
            return (rect, flags);
        }

        if !record.on_screen() || !is_processing_geometry_event(host) {
            return (rect, flags);
        }

        let frame = self.host.window_frame(host);
        let style = self.frame_style(id, record.window_rect, record.client_rect, record.shaped);
        let rect = self.translator.to_logical_rect(&style, frame);
        debug!("{}/{} show state follows host frame {} -> {}", id, host, frame, rect);
        (rect, flags - (PosFlags::NOMOVE | PosFlags::NOSIZE))
    }

    /// Sets or refetches the window's clip region
    pub fn set_window_region(&self, id: WindowId, source: RegionSource) {
        self.sync_window_region(id, source);
    }

    /// Applies layered-window attributes.
    ///
    /// A visible layered window that was waiting for its attributes is
    /// shown now.
    pub fn set_layered_attributes(&self, id: WindowId, attributes: LayeredAttributes) {
        let Some(surface) = self.registry.update(id, |r| {
            r.transparency = TransparencyMode::Attributes;
            r.surface.clone()
        }) else {
            debug!("{} layered attributes for a window without record", id);
            return;
        };
        if let Some(surface) = surface {
            surface.set_use_alpha(false);
        }

        self.sync_window_opacity(id, &attributes, false);
        self.show_if_waiting(id);
    }

    /// Takes over a window whose client pushes complete per-pixel-alpha
    /// frames.
    ///
    /// The window gets a surface exactly the size of `window_rect`; `dirty`
    /// (surface coordinates) limits the area marked for flushing, `None`
    /// marks everything. Fails without touching the record if the surface
    /// cannot be allocated.
    pub fn update_layered_window(
        &self,
        id: WindowId,
        window_rect: Rect,
        dirty: Option<Rect>,
        attributes: &LayeredAttributes,
    ) -> Result<Option<Surface>, SyncError> {
        let Some(record) = self.registry.snapshot(id) else {
            return Ok(None);
        };

        let rect = window_rect.at_origin();
        let surface = match record.surface.filter(|surface| surface.rect() == rect) {
            Some(current) => {
                current.set_use_alpha(true);
                current
            }
            None => Surface::allocate(rect, true, self.config.surface.max_bytes())?,
        };

        let attach = self
            .registry
            .update(id, |r| {
                r.transparency = TransparencyMode::UpdateLayered;
                if Surface::same(r.surface.as_ref(), Some(&surface)) {
                    return None;
                }
                r.surface = Some(surface.clone());
                r.unminimized_surface = None;
                r.host
            })
            .flatten();
        if let Some(host) = attach {
            debug!("{}/{} update-layered surface {}", id, host, rect);
            self.host.set_surface(host, Some(surface.clone()));
        }

        let dirty = match dirty {
            Some(dirty) => dirty.intersect(&rect),
            None => Some(rect),
        };
        if let Some(dirty) = dirty {
            surface.add_bounds(dirty);
        }

        self.sync_window_opacity(id, attributes, true);
        self.show_if_waiting(id);
        Ok(Some(surface))
    }

    fn show_if_waiting(&self, id: WindowId) {
        let waiting = self.registry.snapshot(id).is_some_and(|r| r.host.is_some() && !r.on_screen());
        if waiting && self.client.style(id).contains(WindowStyle::VISIBLE) {
            self.show_window(id);
        }
    }

    /// Reacts to a change of either style word.
    pub fn set_window_style(&self, id: WindowId, change: StyleChange) {
        if id == self.client.desktop_window() {
            return;
        }
        if self.registry.host_window(id, false).is_none() {
            return;
        }

        self.set_host_window_properties(id);

        let changed = change.changed_extended();
        if changed.contains(ExtendedStyle::LAYERED) {
            debug!("{} layered style toggled, resetting transparency", id);
            let surface = self
                .registry
                .update(id, |r| {
                    r.transparency = TransparencyMode::Opaque;
                    r.surface.clone()
                })
                .flatten();
            self.sync_window_opacity(id, &LayeredAttributes::default(), false);
            if let Some(surface) = surface {
                surface.set_use_alpha(false);
            }
        }

        if changed.contains(ExtendedStyle::LAYOUTRTL) {
            self.sync_window_region(id, RegionSource::FetchFromClient);
        }
    }

    pub fn set_window_text(&self, id: WindowId, title: &str) {
        if let Some(host) = self.registry.host_window(id, false) {
            trace!("{}/{} title {:?}", id, host, title);
            self.host.set_title(host, title);
        }
    }
}

impl<H, C> WindowPosSink for WindowSynchronizer<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    fn window_pos_changing(
        &self,
        window: WindowId,
        flags: PosFlags,
        window_rect: Rect,
        client_rect: Rect,
    ) -> Result<PosChange, SyncError> {
        WindowSynchronizer::window_pos_changing(self, window, flags, window_rect, client_rect)
    }

    fn window_pos_changed(
        &self,
        window: WindowId,
        flags: PosFlags,
        window_rect: Rect,
        client_rect: Rect,
        visible_rect: Rect,
        surface: Option<Surface>,
    ) {
        WindowSynchronizer::window_pos_changed(self, window, flags, window_rect, client_rect, visible_rect, surface)
    }

    fn window_destroyed(&self, window: WindowId) {
        self.destroy_window(window);
    }

    fn parent_changed(&self, window: WindowId, parent: WindowId, old_parent: WindowId) -> Result<(), SyncError> {
        self.set_parent(window, parent, old_parent)
    }

    fn show_window_placement(&self, window: WindowId, rect: Rect, flags: PosFlags) -> (Rect, PosFlags) {
        WindowSynchronizer::show_window_placement(self, window, rect, flags)
    }
}

//! In-memory host and client counterparts
//!
//! [`FakeHost`] records every command it receives and keeps its own window
//! table and front-to-back stack, so tests can assert on both the command
//! stream and the resulting host state. [`FakeClient`] is a small retained
//! window tree that reports position changes to a [`WindowPosSink`]
//! synchronously, re-entering the synchronizer the way a real client model
//! does. Neither one ever calls out while holding its own lock.

use crate::client::{
    ClientMessage, ClientWindowModel, HitTest, MinMaxInfo, MouseActivate, SessionCallback, SessionMessage,
    SizingCorner, SysCommand, WindowId, WindowPosSink,
};
use crate::config::SyncConfig;
use crate::dispatch::HostEvent;
use crate::error::HostError;
use crate::geometry::{Insets, Rect, Size};
use crate::host::{HostWindowId, HostWindowState, HostWindowSystem, Placement, Rgb, ShapeMask, WindowFeatures};
use crate::logging;
use crate::opacity::LayeredAttributes;
use crate::shape::Region;
use crate::stack::WindowStack;
use crate::style::{ExtendedStyle, PosFlags, StyleChange, WindowStyle};
use crate::surface::Surface;
use crate::sync::WindowSynchronizer;
use log::{trace, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Desktop used by [`harness`]
pub const DEFAULT_DESKTOP: Rect = Rect::new(0, 0, 1920, 1080);

/// One command received by [`FakeHost`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    Create {
        window: HostWindowId,
        frame: Rect,
        features: WindowFeatures,
    },
    Destroy {
        window: HostWindowId,
    },
    SetFeatures {
        window: HostWindowId,
        features: WindowFeatures,
    },
    SetState {
        window: HostWindowId,
        state: HostWindowState,
    },
    SetParent {
        window: HostWindowId,
        parent: Option<HostWindowId>,
    },
    SetTitle {
        window: HostWindowId,
        title: String,
    },
    SetFrame {
        window: HostWindowId,
        requested: Rect,
        applied: Rect,
    },
    SetShape {
        window: HostWindowId,
        shape: ShapeMask,
    },
    SetAlpha {
        window: HostWindowId,
        alpha: f32,
    },
    SetColorKey {
        window: HostWindowId,
        key: Option<Rgb>,
    },
    SetPerPixelAlpha {
        window: HostWindowId,
        enabled: bool,
    },
    SetMinMaxSizes {
        window: HostWindowId,
        min: Size,
        max: Option<Size>,
    },
    Order {
        window: HostWindowId,
        placement: Placement,
        activate: bool,
    },
    Hide {
        window: HostWindowId,
    },
    GiveFocus {
        window: HostWindowId,
        activate: bool,
    },
    Activate {
        window: HostWindowId,
    },
    RejectFocus {
        window: HostWindowId,
    },
    SetSurface {
        window: HostWindowId,
        /// Rect of the attached surface, `None` when detached
        surface: Option<Rect>,
    },
    QuitReply {
        quit: bool,
    },
}

impl HostCommand {
    pub fn window(&self) -> Option<HostWindowId> {
        match *self {
            HostCommand::Create { window, .. }
            | HostCommand::Destroy { window }
            | HostCommand::SetFeatures { window, .. }
            | HostCommand::SetState { window, .. }
            | HostCommand::SetParent { window, .. }
            | HostCommand::SetTitle { window, .. }
            | HostCommand::SetFrame { window, .. }
            | HostCommand::SetShape { window, .. }
            | HostCommand::SetAlpha { window, .. }
            | HostCommand::SetColorKey { window, .. }
            | HostCommand::SetPerPixelAlpha { window, .. }
            | HostCommand::SetMinMaxSizes { window, .. }
            | HostCommand::Order { window, .. }
            | HostCommand::Hide { window }
            | HostCommand::GiveFocus { window, .. }
            | HostCommand::Activate { window }
            | HostCommand::RejectFocus { window }
            | HostCommand::SetSurface { window, .. } => Some(window),
            HostCommand::QuitReply { .. } => None,
        }
    }
}

/// State of one window as the fake host sees it.
#[derive(Debug, Clone)]
pub struct FakeHostWindow {
    pub frame: Rect,
    pub features: WindowFeatures,
    pub state: HostWindowState,
    pub parent: Option<HostWindowId>,
    pub title: String,
    pub shape: ShapeMask,
    pub alpha: f32,
    pub color_key: Option<Rgb>,
    pub per_pixel_alpha: bool,
    pub surface: Option<Surface>,
    pub min_size: Size,
    pub max_size: Option<Size>,
}

#[derive(Debug)]
struct FakeHostInner {
    next_id: u64,
    desktop: Rect,
    windows: HashMap<HostWindowId, FakeHostWindow>,
    /// Only windows ordered in
    stack: WindowStack<HostWindowId>,
    focused: Option<HostWindowId>,
    log: Vec<HostCommand>,
    fail_next_create: Option<HostError>,
    max_frame_size: Option<(i32, i32)>,
}

/// Recording in-memory host window system.
#[derive(Debug)]
pub struct FakeHost {
    inner: Mutex<FakeHostInner>,
}

impl FakeHost {
    pub fn new(desktop: Rect) -> Self {
        Self {
            inner: Mutex::new(FakeHostInner {
                next_id: 1,
                desktop,
                windows: HashMap::new(),
                stack: WindowStack::new(),
                focused: None,
                log: Vec::new(),
                fail_next_create: None,
                max_frame_size: None,
            }),
        }
    }

    /// Every command received so far
    pub fn commands(&self) -> Vec<HostCommand> {
        self.inner.lock().log.clone()
    }

    /// Returns and clears the command log
    pub fn take_commands(&self) -> Vec<HostCommand> {
        std::mem::take(&mut self.inner.lock().log)
    }

    /// Commands that match `pred`
    pub fn count(&self, pred: impl Fn(&HostCommand) -> bool) -> usize {
        self.inner.lock().log.iter().filter(|c| pred(c)).count()
    }

    /// The next window creation fails with `error`
    pub fn fail_next_create(&self, error: HostError) {
        self.inner.lock().fail_next_create = Some(error);
    }

    /// Frames larger than this are shrunk when applied
    pub fn set_max_frame_size(&self, width: i32, height: i32) {
        self.inner.lock().max_frame_size = Some((width, height));
    }

    pub fn set_desktop(&self, desktop: Rect) {
        self.inner.lock().desktop = desktop;
    }

    pub fn window(&self, window: HostWindowId) -> Option<FakeHostWindow> {
        self.inner.lock().windows.get(&window).cloned()
    }

    pub fn window_count(&self) -> usize {
        self.inner.lock().windows.len()
    }

    pub fn is_visible(&self, window: HostWindowId) -> bool {
        self.inner.lock().stack.contains(window)
    }

    /// Visible windows, frontmost first
    pub fn front_to_back(&self) -> Vec<HostWindowId> {
        self.inner.lock().stack.front_to_back()
    }

    pub fn focused(&self) -> Option<HostWindowId> {
        self.inner.lock().focused
    }

    /// Moves a window the way the user would, without logging a command
    pub fn place(&self, window: HostWindowId, frame: Rect) {
        if let Some(w) = self.inner.lock().windows.get_mut(&window) {
            w.frame = frame;
        }
    }

    fn with_window(&self, window: HostWindowId, command: HostCommand, f: impl FnOnce(&mut FakeHostWindow)) {
        let mut inner = self.inner.lock();
        inner.log.push(command);
        match inner.windows.get_mut(&window) {
            Some(w) => f(w),
            None => warn!("fake host: command for unknown {}", window),
        }
    }
}

impl HostWindowSystem for FakeHost {
    fn create_window(&self, features: &WindowFeatures, frame: Rect) -> Result<HostWindowId, HostError> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_next_create.take() {
            return Err(err);
        }

        let window = HostWindowId(inner.next_id);
        inner.next_id += 1;
        inner.windows.insert(
            window,
            FakeHostWindow {
                frame,
                features: *features,
                state: HostWindowState::default(),
                parent: None,
                title: String::new(),
                shape: ShapeMask::None,
                alpha: 1.0,
                color_key: None,
                per_pixel_alpha: false,
                surface: None,
                min_size: Size::default(),
                max_size: None,
            },
        );
        inner.log.push(HostCommand::Create {
            window,
            frame,
            features: *features,
        });
        trace!("fake host: created {}", window);
        Ok(window)
    }

    fn destroy_window(&self, window: HostWindowId) {
        let mut inner = self.inner.lock();
        inner.log.push(HostCommand::Destroy { window });
        inner.windows.remove(&window);
        inner.stack.remove(window);
        if inner.focused == Some(window) {
            inner.focused = None;
        }
    }

    fn set_features(&self, window: HostWindowId, features: &WindowFeatures) {
        let features = *features;
        self.with_window(window, HostCommand::SetFeatures { window, features }, |w| {
            w.features = features
        });
    }

    fn set_state(&self, window: HostWindowId, state: &HostWindowState) {
        let state = *state;
        self.with_window(window, HostCommand::SetState { window, state }, |w| {
            let minimized = if state.minimized_valid {
                state.minimized
            } else {
                w.state.minimized
            };
            w.state = HostWindowState { minimized, ..state };
        });
    }

    fn set_parent(&self, window: HostWindowId, parent: Option<HostWindowId>) {
        self.with_window(window, HostCommand::SetParent { window, parent }, |w| w.parent = parent);
    }

    fn set_title(&self, window: HostWindowId, title: &str) {
        let command = HostCommand::SetTitle {
            window,
            title: title.to_string(),
        };
        self.with_window(window, command, |w| w.title = title.to_string());
    }

    fn set_frame(&self, window: HostWindowId, frame: Rect) -> Rect {
        let mut inner = self.inner.lock();
        let applied = match inner.max_frame_size {
            Some((width, height)) => Rect::from_origin_size(
                frame.left,
                frame.top,
                frame.width().min(width),
                frame.height().min(height),
            ),
            None => frame,
        };
        inner.log.push(HostCommand::SetFrame {
            window,
            requested: frame,
            applied,
        });
        if let Some(w) = inner.windows.get_mut(&window) {
            w.frame = applied;
        }
        applied
    }

    fn window_frame(&self, window: HostWindowId) -> Rect {
        self.inner
            .lock()
            .windows
            .get(&window)
            .map(|w| w.frame)
            .unwrap_or_default()
    }

    fn set_min_max_sizes(&self, window: HostWindowId, min: Size, max: Option<Size>) {
        self.with_window(window, HostCommand::SetMinMaxSizes { window, min, max }, |w| {
            w.min_size = min;
            w.max_size = max;
        });
    }

    fn set_shape(&self, window: HostWindowId, shape: &ShapeMask) {
        let command = HostCommand::SetShape {
            window,
            shape: shape.clone(),
        };
        self.with_window(window, command, |w| w.shape = shape.clone());
    }

    fn set_alpha(&self, window: HostWindowId, alpha: f32) {
        self.with_window(window, HostCommand::SetAlpha { window, alpha }, |w| w.alpha = alpha);
    }

    fn set_color_key(&self, window: HostWindowId, key: Option<Rgb>) {
        self.with_window(window, HostCommand::SetColorKey { window, key }, |w| w.color_key = key);
    }

    fn set_per_pixel_alpha(&self, window: HostWindowId, enabled: bool) {
        self.with_window(window, HostCommand::SetPerPixelAlpha { window, enabled }, |w| {
            w.per_pixel_alpha = enabled
        });
    }

    fn order_window(&self, window: HostWindowId, placement: Placement, activate: bool) {
        let mut inner = self.inner.lock();
        inner.log.push(HostCommand::Order {
            window,
            placement,
            activate,
        });
        let placed = match placement {
            Placement::Below(anchor) => inner.stack.place_below(window, anchor),
            Placement::Above(anchor) => inner.stack.place_above(window, anchor),
            Placement::Front => false,
        };
        if !placed {
            inner.stack.raise_to_top(window);
        }
        if activate {
            inner.focused = Some(window);
        }
    }

    fn hide_window(&self, window: HostWindowId) {
        let mut inner = self.inner.lock();
        inner.log.push(HostCommand::Hide { window });
        inner.stack.remove(window);
    }

    fn give_focus(&self, window: HostWindowId, activate: bool) {
        let mut inner = self.inner.lock();
        inner.log.push(HostCommand::GiveFocus { window, activate });
        inner.focused = Some(window);
    }

    fn activate_window(&self, window: HostWindowId) {
        self.inner.lock().log.push(HostCommand::Activate { window });
    }

    fn reject_focus(&self, window: HostWindowId) {
        let mut inner = self.inner.lock();
        inner.log.push(HostCommand::RejectFocus { window });
        if inner.focused == Some(window) {
            inner.focused = None;
        }
    }

    fn set_surface(&self, window: HostWindowId, surface: Option<Surface>) {
        let command = HostCommand::SetSurface {
            window,
            surface: surface.as_ref().map(Surface::rect),
        };
        self.with_window(window, command, |w| w.surface = surface);
    }

    fn quit_reply(&self, quit: bool) {
        self.inner.lock().log.push(HostCommand::QuitReply { quit });
    }

    fn desktop_rect(&self) -> Rect {
        self.inner.lock().desktop
    }
}

/// Description of a logical window to create in [`FakeClient`].
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub rect: Rect,
    pub style: WindowStyle,
    pub ex_style: ExtendedStyle,
    pub parent: Option<WindowId>,
    pub owner: Option<WindowId>,
    pub title: String,
    pub region: Option<Region>,
    pub layered: Option<LayeredAttributes>,
}

impl WindowSpec {
    /// A plain overlapped window
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            style: WindowStyle::OVERLAPPEDWINDOW,
            ex_style: ExtendedStyle::empty(),
            parent: None,
            owner: None,
            title: String::new(),
            region: None,
            layered: None,
        }
    }

    pub fn style(mut self, style: WindowStyle) -> Self {
        self.style = style;
        self
    }

    pub fn ex_style(mut self, ex_style: ExtendedStyle) -> Self {
        self.ex_style = ex_style;
        self
    }

    /// Makes this a child of `parent` instead of a top-level window
    pub fn child_of(mut self, parent: WindowId) -> Self {
        self.parent = Some(parent);
        self.style |= WindowStyle::CHILD;
        self
    }

    pub fn owner(mut self, owner: WindowId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn layered(mut self, attributes: LayeredAttributes) -> Self {
        self.ex_style |= ExtendedStyle::LAYERED;
        self.layered = Some(attributes);
        self
    }
}

#[derive(Debug, Clone)]
struct FakeWindow {
    parent: WindowId,
    owner: Option<WindowId>,
    style: WindowStyle,
    ex_style: ExtendedStyle,
    window_rect: Rect,
    title: String,
    region: Option<Region>,
    layered: Option<LayeredAttributes>,
    close_allowed: bool,
    mouse_activate: MouseActivate,
    restore_rect: Option<Rect>,
    /// Where a minimized window goes back to
    normal_rect: Option<Rect>,
    min_track: Option<Size>,
    max_track: Option<Size>,
    /// Sizes snap down to multiples of this while resizing
    sizing_step: Option<i32>,
}

/// Client rect of a window: frame styles eat a one-unit border
fn client_rect_for(style: WindowStyle, rect: Rect) -> Rect {
    if style.intersects(WindowStyle::CAPTION | WindowStyle::THICKFRAME) && rect.width() > 2 && rect.height() > 2 {
        rect.contract(Insets::uniform(1))
    } else {
        rect
    }
}

struct FakeClientInner {
    desktop: WindowId,
    desktop_rect: Rect,
    next_id: u64,
    windows: HashMap<WindowId, FakeWindow>,
    /// Top-level windows, z-ordered
    stack: WindowStack<WindowId>,
    foreground: Option<WindowId>,
    active: Option<WindowId>,
    focus: Option<WindowId>,
    messages: Vec<(WindowId, ClientMessage)>,
    session_messages: Vec<(WindowId, SessionMessage)>,
    session_answers: HashMap<WindowId, bool>,
    defer_sessions: bool,
    deferred: Vec<(WindowId, bool, SessionCallback)>,
    pos_changes: usize,
    exited: bool,
}

/// Retained in-memory client window model.
pub struct FakeClient {
    inner: Mutex<FakeClientInner>,
    sink: RwLock<Option<Weak<dyn WindowPosSink>>>,
}

impl FakeClient {
    pub fn new(desktop_rect: Rect) -> Self {
        Self {
            inner: Mutex::new(FakeClientInner {
                desktop: WindowId(0),
                desktop_rect,
                next_id: 1,
                windows: HashMap::new(),
                stack: WindowStack::new(),
                foreground: None,
                active: None,
                focus: None,
                messages: Vec::new(),
                session_messages: Vec::new(),
                session_answers: HashMap::new(),
                defer_sessions: false,
                deferred: Vec::new(),
                pos_changes: 0,
                exited: false,
            }),
            sink: RwLock::new(None),
        }
    }

    /// Routes position changes to `sink`
    pub fn attach(&self, sink: Weak<dyn WindowPosSink>) {
        *self.sink.write() = Some(sink);
    }

    fn sink(&self) -> Option<Arc<dyn WindowPosSink>> {
        self.sink.read().as_ref().and_then(Weak::upgrade)
    }

    /// Creates a hidden window and reports its initial geometry.
    ///
    /// New top-level windows go to the front of the stack.
    pub fn create_window(&self, spec: WindowSpec) -> WindowId {
        let (id, rect, client_rect) = {
            let mut inner = self.inner.lock();
            let id = WindowId(inner.next_id);
            inner.next_id += 1;
            let parent = spec.parent.unwrap_or(inner.desktop);
            let window = FakeWindow {
                parent,
                owner: spec.owner,
                style: spec.style - WindowStyle::VISIBLE,
                ex_style: spec.ex_style,
                window_rect: spec.rect,
                title: spec.title,
                region: spec.region,
                layered: spec.layered,
                close_allowed: true,
                mouse_activate: MouseActivate::Activate,
                restore_rect: None,
                normal_rect: None,
                min_track: None,
                max_track: None,
                sizing_step: None,
            };
            let client_rect = client_rect_for(window.style, window.window_rect);
            inner.windows.insert(id, window);
            if parent == inner.desktop {
                inner.stack.push(id);
            }
            (id, spec.rect, client_rect)
        };

        self.notify(
            id,
            PosFlags::NOZORDER | PosFlags::NOACTIVATE | PosFlags::FRAMECHANGED,
            rect,
            client_rect,
            None,
        );
        id
    }

    /// Makes the window visible without changing its place in the stack
    pub fn show(&self, window: WindowId) {
        let rect = self.window_rect(window).unwrap_or_default();
        self.set_window_pos(
            window,
            rect,
            PosFlags::SHOWWINDOW | PosFlags::NOMOVE | PosFlags::NOSIZE | PosFlags::NOZORDER | PosFlags::NOACTIVATE,
        );
    }

    pub fn hide(&self, window: WindowId) {
        let rect = self.window_rect(window).unwrap_or_default();
        self.set_window_pos(
            window,
            rect,
            PosFlags::HIDEWINDOW | PosFlags::NOMOVE | PosFlags::NOSIZE | PosFlags::NOZORDER | PosFlags::NOACTIVATE,
        );
    }

    /// Brings the window to the front of its siblings
    pub fn raise(&self, window: WindowId) {
        let rect = self.window_rect(window).unwrap_or_default();
        self.set_window_pos(window, rect, PosFlags::NOMOVE | PosFlags::NOSIZE | PosFlags::NOACTIVATE);
    }

    pub fn move_to(&self, window: WindowId, rect: Rect) {
        self.set_window_pos(window, rect, PosFlags::NOZORDER | PosFlags::NOACTIVATE);
    }

    pub fn minimize(&self, window: WindowId) {
        self.change_state(window, WindowStyle::MINIMIZE, WindowStyle::empty(), None);
    }

    /// Leaves the minimized or maximized state
    pub fn restore(&self, window: WindowId) {
        let style = self.style(window);
        if style.contains(WindowStyle::MINIMIZE) {
            let normal = self.inner.lock().windows.get_mut(&window).and_then(|w| w.normal_rect.take());
            self.change_state(window, WindowStyle::empty(), WindowStyle::MINIMIZE, normal);
        } else if style.contains(WindowStyle::MAXIMIZE) {
            let restore = self.inner.lock().windows.get(&window).and_then(|w| w.restore_rect);
            self.change_state(window, WindowStyle::empty(), WindowStyle::MAXIMIZE, restore);
        }
    }

    pub fn maximize(&self, window: WindowId) {
        let desktop = self.inner.lock().desktop_rect;
        self.change_state(window, WindowStyle::MAXIMIZE, WindowStyle::empty(), Some(desktop));
    }

    /// Applies a show-state change, letting the sink adjust the placement
    fn change_state(&self, window: WindowId, add: WindowStyle, remove: WindowStyle, rect: Option<Rect>) {
        let current = {
            let mut inner = self.inner.lock();
            let Some(w) = inner.windows.get_mut(&window) else {
                return;
            };
            if add.contains(WindowStyle::MINIMIZE) && !w.style.contains(WindowStyle::MINIMIZE) {
                w.normal_rect = Some(w.window_rect);
            }
            w.style = (w.style | add) - remove;
            w.window_rect
        };
        let mut flags = PosFlags::STATECHANGED | PosFlags::FRAMECHANGED | PosFlags::NOZORDER | PosFlags::NOACTIVATE;
        if rect.is_none() {
            flags |= PosFlags::NOMOVE | PosFlags::NOSIZE;
        }
        let target = rect.unwrap_or(current);
        let (target, flags) = match self.sink() {
            Some(sink) => sink.show_window_placement(window, target, flags),
            None => (target, flags),
        };
        self.set_window_pos(window, target, flags);
    }

    /// Moves the window under `parent` and reports it like a parent change
    /// followed by a frame change.
    pub fn set_parent(&self, window: WindowId, parent: WindowId) {
        let (old_parent, rect, visible) = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let desktop = inner.desktop;
            let Some(w) = inner.windows.get_mut(&window) else {
                return;
            };
            let old_parent = std::mem::replace(&mut w.parent, parent);
            if parent == desktop {
                w.style -= WindowStyle::CHILD;
            } else {
                w.style |= WindowStyle::CHILD;
            }
            let (rect, visible) = (w.window_rect, w.style.contains(WindowStyle::VISIBLE));

            if old_parent == desktop && parent != desktop {
                inner.stack.remove(window);
            } else if old_parent != desktop && parent == desktop {
                inner.stack.push(window);
            }
            (old_parent, rect, visible)
        };

        if let Some(sink) = self.sink() {
            if let Err(err) = sink.parent_changed(window, parent, old_parent) {
                warn!("fake client: reparenting {} failed: {}", window, err);
            }
        }

        let mut flags = PosFlags::NOMOVE | PosFlags::NOSIZE | PosFlags::NOACTIVATE | PosFlags::FRAMECHANGED;
        if visible {
            flags |= PosFlags::SHOWWINDOW;
        }
        self.set_window_pos(window, rect, flags);
    }

    /// Destroys the window and its children
    pub fn destroy(&self, window: WindowId) {
        let removed = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            if !inner.windows.contains_key(&window) {
                return;
            }
            let mut removed = vec![window];
            let mut i = 0;
            while i < removed.len() {
                let parent = removed[i];
                removed.extend(
                    inner
                        .windows
                        .iter()
                        .filter(|(_, w)| w.parent == parent)
                        .map(|(&id, _)| id),
                );
                i += 1;
            }
            for &id in &removed {
                inner.windows.remove(&id);
                inner.stack.remove(id);
                for slot in [&mut inner.foreground, &mut inner.active, &mut inner.focus] {
                    if *slot == Some(id) {
                        *slot = None;
                    }
                }
            }
            removed
        };

        if let Some(sink) = self.sink() {
            for id in removed.into_iter().rev() {
                sink.window_destroyed(id);
            }
        }
    }

    /// Replaces the primary style word, returning the change for the
    /// synchronizer
    pub fn set_style(&self, window: WindowId, style: WindowStyle) -> Option<StyleChange> {
        let mut inner = self.inner.lock();
        let w = inner.windows.get_mut(&window)?;
        let old = std::mem::replace(&mut w.style, style);
        Some(StyleChange::Style { old, new: style })
    }

    pub fn set_ex_style(&self, window: WindowId, ex_style: ExtendedStyle) -> Option<StyleChange> {
        let mut inner = self.inner.lock();
        let w = inner.windows.get_mut(&window)?;
        let old = std::mem::replace(&mut w.ex_style, ex_style);
        Some(StyleChange::Extended { old, new: ex_style })
    }

    pub fn set_region(&self, window: WindowId, region: Option<Region>) {
        if let Some(w) = self.inner.lock().windows.get_mut(&window) {
            w.region = region;
        }
    }

    pub fn set_layered(&self, window: WindowId, attributes: Option<LayeredAttributes>) {
        if let Some(w) = self.inner.lock().windows.get_mut(&window) {
            w.layered = attributes;
        }
    }

    pub fn set_title(&self, window: WindowId, title: &str) {
        if let Some(w) = self.inner.lock().windows.get_mut(&window) {
            w.title = title.to_string();
        }
    }

    pub fn set_close_allowed(&self, window: WindowId, allowed: bool) {
        if let Some(w) = self.inner.lock().windows.get_mut(&window) {
            w.close_allowed = allowed;
        }
    }

    pub fn set_mouse_activate(&self, window: WindowId, answer: MouseActivate) {
        if let Some(w) = self.inner.lock().windows.get_mut(&window) {
            w.mouse_activate = answer;
        }
    }

    /// Overrides the tracking limits the window reports
    pub fn set_tracking(&self, window: WindowId, min: Option<Size>, max: Option<Size>) {
        if let Some(w) = self.inner.lock().windows.get_mut(&window) {
            w.min_track = min;
            w.max_track = max;
        }
    }

    /// Makes the window snap interactive resizes to multiples of `step`
    pub fn set_sizing_step(&self, window: WindowId, step: Option<i32>) {
        if let Some(w) = self.inner.lock().windows.get_mut(&window) {
            w.sizing_step = step.filter(|&step| step > 0);
        }
    }

    pub fn set_focus_window(&self, window: Option<WindowId>) {
        self.inner.lock().focus = window;
    }

    pub fn restore_rect(&self, window: WindowId) -> Option<Rect> {
        self.inner.lock().windows.get(&window).and_then(|w| w.restore_rect)
    }

    /// Messages sent to windows so far
    pub fn messages(&self) -> Vec<(WindowId, ClientMessage)> {
        self.inner.lock().messages.clone()
    }

    pub fn take_messages(&self) -> Vec<(WindowId, ClientMessage)> {
        std::mem::take(&mut self.inner.lock().messages)
    }

    pub fn session_messages(&self) -> Vec<(WindowId, SessionMessage)> {
        self.inner.lock().session_messages.clone()
    }

    /// How `window` answers end-session queries (default: agree)
    pub fn set_session_answer(&self, window: WindowId, agree: bool) {
        self.inner.lock().session_answers.insert(window, agree);
    }

    /// Queue session messages until [`Self::deliver_session_messages`]
    pub fn defer_session_messages(&self, defer: bool) {
        self.inner.lock().defer_sessions = defer;
    }

    /// Delivers queued session messages, including any queued while
    /// delivering. Returns how many were delivered.
    pub fn deliver_session_messages(&self) -> usize {
        let mut delivered = 0;
        loop {
            let batch = std::mem::take(&mut self.inner.lock().deferred);
            if batch.is_empty() {
                return delivered;
            }
            for (window, answer, done) in batch {
                done(window, answer);
                delivered += 1;
            }
        }
    }

    /// Number of completed position changes
    pub fn pos_change_count(&self) -> usize {
        self.inner.lock().pos_changes
    }

    pub fn exited(&self) -> bool {
        self.inner.lock().exited
    }

    /// Runs both position-change phases against the sink.
    ///
    /// `revert` is the geometry restored if the changing phase fails.
    fn notify(&self, window: WindowId, flags: PosFlags, window_rect: Rect, client_rect: Rect, revert: Option<Rect>) {
        let Some(sink) = self.sink() else {
            self.inner.lock().pos_changes += 1;
            return;
        };

        match sink.window_pos_changing(window, flags, window_rect, client_rect) {
            Ok(change) => {
                self.inner.lock().pos_changes += 1;
                sink.window_pos_changed(window, flags, window_rect, client_rect, change.visible_rect, change.surface);
            }
            Err(err) => {
                warn!("fake client: position change of {} failed: {}", window, err);
                if let Some(old) = revert {
                    if let Some(w) = self.inner.lock().windows.get_mut(&window) {
                        w.window_rect = old;
                    }
                }
            }
        }
    }

    fn run_sys_command(&self, window: WindowId, command: SysCommand) {
        match command {
            SysCommand::Close => self.destroy(window),
            SysCommand::Minimize => self.minimize(window),
            SysCommand::Maximize => self.maximize(window),
            SysCommand::Restore => self.restore(window),
        }
    }
}

impl ClientWindowModel for FakeClient {
    fn desktop_window(&self) -> WindowId {
        self.inner.lock().desktop
    }

    fn parent(&self, window: WindowId) -> Option<WindowId> {
        self.inner.lock().windows.get(&window).map(|w| w.parent)
    }

    fn owner(&self, window: WindowId) -> Option<WindowId> {
        self.inner.lock().windows.get(&window).and_then(|w| w.owner)
    }

    fn style(&self, window: WindowId) -> WindowStyle {
        let inner = self.inner.lock();
        if window == inner.desktop {
            return WindowStyle::VISIBLE;
        }
        inner.windows.get(&window).map(|w| w.style).unwrap_or_default()
    }

    fn ex_style(&self, window: WindowId) -> ExtendedStyle {
        self.inner
            .lock()
            .windows
            .get(&window)
            .map(|w| w.ex_style)
            .unwrap_or_default()
    }

    fn window_rect(&self, window: WindowId) -> Option<Rect> {
        let inner = self.inner.lock();
        if window == inner.desktop {
            return Some(inner.desktop_rect);
        }
        inner.windows.get(&window).map(|w| w.window_rect)
    }

    fn client_rect(&self, window: WindowId) -> Option<Rect> {
        let inner = self.inner.lock();
        if window == inner.desktop {
            return Some(inner.desktop_rect);
        }
        inner.windows.get(&window).map(|w| client_rect_for(w.style, w.window_rect))
    }

    fn prev_sibling(&self, window: WindowId) -> Option<WindowId> {
        self.inner.lock().stack.above(window)
    }

    fn next_sibling(&self, window: WindowId) -> Option<WindowId> {
        self.inner.lock().stack.below(window)
    }

    fn window_region(&self, window: WindowId) -> Option<Region> {
        self.inner.lock().windows.get(&window).and_then(|w| w.region.clone())
    }

    fn layered_attributes(&self, window: WindowId) -> Option<LayeredAttributes> {
        self.inner.lock().windows.get(&window).and_then(|w| w.layered)
    }

    fn title(&self, window: WindowId) -> String {
        self.inner
            .lock()
            .windows
            .get(&window)
            .map(|w| w.title.clone())
            .unwrap_or_default()
    }

    fn close_allowed(&self, window: WindowId) -> bool {
        self.inner
            .lock()
            .windows
            .get(&window)
            .is_some_and(|w| w.close_allowed)
    }

    fn mouse_activate(&self, window: WindowId, _hit: HitTest) -> MouseActivate {
        self.inner
            .lock()
            .windows
            .get(&window)
            .map(|w| w.mouse_activate)
            .unwrap_or_default()
    }

    fn foreground_window(&self) -> Option<WindowId> {
        self.inner.lock().foreground
    }

    fn set_foreground_window(&self, window: WindowId) {
        let mut inner = self.inner.lock();
        inner.foreground = Some(window);
        inner.active = (window != inner.desktop).then_some(window);
    }

    fn active_window(&self) -> Option<WindowId> {
        self.inner.lock().active
    }

    fn set_active_window(&self, window: WindowId) {
        self.inner.lock().active = Some(window);
    }

    fn focus_window(&self) -> Option<WindowId> {
        self.inner.lock().focus
    }

    fn is_child(&self, parent: WindowId, window: WindowId) -> bool {
        let inner = self.inner.lock();
        let mut current = inner.windows.get(&window).map(|w| w.parent);
        while let Some(p) = current {
            if p == parent {
                return true;
            }
            current = inner.windows.get(&p).map(|w| w.parent);
        }
        false
    }

    fn send_message(&self, window: WindowId, message: ClientMessage) {
        self.inner.lock().messages.push((window, message));
        if let ClientMessage::SysCommand(command) = message {
            self.run_sys_command(window, command);
        }
    }

    fn min_max_info(&self, window: WindowId, defaults: MinMaxInfo) -> MinMaxInfo {
        let inner = self.inner.lock();
        let Some(w) = inner.windows.get(&window) else {
            return defaults;
        };
        MinMaxInfo {
            min_track: w.min_track.unwrap_or(defaults.min_track),
            max_track: w.max_track.or(defaults.max_track),
        }
    }

    fn sizing(&self, window: WindowId, corner: SizingCorner, rect: Rect) -> Option<Rect> {
        let step = self.inner.lock().windows.get(&window)?.sizing_step?;
        let width = rect.width() - rect.width().rem_euclid(step);
        let height = rect.height() - rect.height().rem_euclid(step);

        // the dragged edges move, the opposite ones stay
        let (left, right) = match corner {
            SizingCorner::TopLeft | SizingCorner::BottomLeft => (rect.right - width, rect.right),
            SizingCorner::TopRight | SizingCorner::BottomRight => (rect.left, rect.left + width),
        };
        let (top, bottom) = match corner {
            SizingCorner::TopLeft | SizingCorner::TopRight => (rect.bottom - height, rect.bottom),
            SizingCorner::BottomLeft | SizingCorner::BottomRight => (rect.top, rect.top + height),
        };
        Some(Rect::new(left, top, right, bottom))
    }

    fn set_window_pos(&self, window: WindowId, rect: Rect, flags: PosFlags) {
        let change = {
            let mut inner = self.inner.lock();
            let top_level = inner.windows.get(&window).is_some_and(|w| w.parent == inner.desktop);
            let Some(w) = inner.windows.get_mut(&window) else {
                return;
            };

            let old = w.window_rect;
            let origin = if flags.contains(PosFlags::NOMOVE) {
                (old.left, old.top)
            } else {
                (rect.left, rect.top)
            };
            let size = if flags.contains(PosFlags::NOSIZE) {
                (old.width(), old.height())
            } else {
                (rect.width(), rect.height())
            };
            w.window_rect = Rect::from_origin_size(origin.0, origin.1, size.0, size.1);
            if flags.contains(PosFlags::SHOWWINDOW) {
                w.style |= WindowStyle::VISIBLE;
            }
            if flags.contains(PosFlags::HIDEWINDOW) {
                w.style -= WindowStyle::VISIBLE;
            }
            let new = w.window_rect;
            let client = client_rect_for(w.style, new);

            if top_level && !flags.contains(PosFlags::NOZORDER) {
                inner.stack.raise_to_top(window);
            }
            (new, client, old)
        };

        let (window_rect, client_rect, old) = change;
        self.notify(window, flags, window_rect, client_rect, Some(old));
    }

    fn set_restore_rect(&self, window: WindowId, rect: Rect) {
        if let Some(w) = self.inner.lock().windows.get_mut(&window) {
            w.restore_rect = Some(rect);
        }
    }

    fn top_level_windows(&self) -> Vec<WindowId> {
        self.inner.lock().stack.front_to_back()
    }

    fn send_session_message(&self, window: WindowId, message: SessionMessage, done: SessionCallback) -> bool {
        let deliver_now = {
            let mut inner = self.inner.lock();
            if !inner.windows.contains_key(&window) {
                return false;
            }
            inner.session_messages.push((window, message));
            let answer = inner.session_answers.get(&window).copied().unwrap_or(true);
            if inner.defer_sessions {
                inner.deferred.push((window, answer, done));
                None
            } else {
                Some((answer, done))
            }
        };

        if let Some((answer, done)) = deliver_now {
            done(window, answer);
        }
        true
    }

    fn exit_process(&self) {
        self.inner.lock().exited = true;
    }
}

/// A synchronizer wired to a fresh [`FakeHost`] and [`FakeClient`].
pub struct Harness {
    pub host: Arc<FakeHost>,
    pub client: Arc<FakeClient>,
    pub sync: Arc<WindowSynchronizer<FakeHost, FakeClient>>,
}

impl Harness {
    pub fn host_of(&self, window: WindowId) -> Option<HostWindowId> {
        self.sync.host_window(window, false)
    }

    pub fn event(&self, event: HostEvent) {
        self.sync.handle_event(&event);
    }

    /// Creates and shows a top-level window
    pub fn open(&self, spec: WindowSpec) -> WindowId {
        let id = self.client.create_window(spec);
        self.client.show(id);
        id
    }
}

/// Builds a [`Harness`] on [`DEFAULT_DESKTOP`], with synchronizer logs
/// captured per test.
pub fn harness(config: SyncConfig) -> Harness {
    logging::init_for_tests();
    let host = Arc::new(FakeHost::new(DEFAULT_DESKTOP));
    let client = Arc::new(FakeClient::new(DEFAULT_DESKTOP));
    let sync = Arc::new(WindowSynchronizer::new(Arc::clone(&host), Arc::clone(&client), config));

    let sink: Arc<dyn WindowPosSink> = sync.clone();
    client.attach(Arc::downgrade(&sink));

    Harness { host, client, sync }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_host_stack_and_log() {
        let host = FakeHost::new(DEFAULT_DESKTOP);
        let a = host.create_window(&WindowFeatures::default(), Rect::new(0, 0, 10, 10)).unwrap();
        let b = host.create_window(&WindowFeatures::default(), Rect::new(0, 0, 10, 10)).unwrap();

        host.order_window(a, Placement::Front, false);
        host.order_window(b, Placement::Below(a), false);
        assert_eq!(host.front_to_back(), vec![a, b]);

        host.hide_window(a);
        assert!(!host.is_visible(a));
        assert_eq!(host.count(|c| matches!(c, HostCommand::Order { .. })), 2);
    }

    #[test]
    fn test_fake_host_creation_failure() {
        let host = FakeHost::new(DEFAULT_DESKTOP);
        host.fail_next_create(HostError::Disconnected);
        assert!(host.create_window(&WindowFeatures::default(), Rect::default()).is_err());
        assert!(host.create_window(&WindowFeatures::default(), Rect::default()).is_ok());
    }

    #[test]
    fn test_fake_host_max_frame() {
        let host = FakeHost::new(DEFAULT_DESKTOP);
        let a = host.create_window(&WindowFeatures::default(), Rect::new(0, 0, 10, 10)).unwrap();
        host.set_max_frame_size(100, 50);
        assert_eq!(host.set_frame(a, Rect::new(5, 5, 505, 505)), Rect::new(5, 5, 105, 55));
    }

    #[test]
    fn test_fake_client_tree() {
        let client = FakeClient::new(DEFAULT_DESKTOP);
        let a = client.create_window(WindowSpec::new(Rect::new(0, 0, 100, 100)));
        let b = client.create_window(WindowSpec::new(Rect::new(0, 0, 100, 100)));
        let child = client.create_window(WindowSpec::new(Rect::new(0, 0, 10, 10)).child_of(a));

        assert_eq!(client.top_level_windows(), vec![b, a]);
        assert_eq!(client.prev_sibling(a), Some(b));
        assert_eq!(client.next_sibling(b), Some(a));
        assert!(client.is_child(a, child));
        assert!(!client.is_child(b, child));

        client.show(a);
        assert!(client.style(a).contains(WindowStyle::VISIBLE));

        client.destroy(a);
        assert_eq!(client.parent(child), None);
        assert_eq!(client.top_level_windows(), vec![b]);
    }

    #[test]
    fn test_fake_client_reparent() {
        let client = FakeClient::new(DEFAULT_DESKTOP);
        let a = client.create_window(WindowSpec::new(Rect::new(0, 0, 100, 100)));
        let b = client.create_window(WindowSpec::new(Rect::new(0, 0, 100, 100)));

        client.set_parent(b, a);
        assert_eq!(client.top_level_windows(), vec![a]);
        assert!(client.style(b).contains(WindowStyle::CHILD));

        client.set_parent(b, client.desktop_window());
        assert_eq!(client.top_level_windows(), vec![b, a]);
        assert!(!client.style(b).contains(WindowStyle::CHILD));
    }

    #[test]
    fn test_fake_client_sizing_snaps_dragged_edges() {
        let client = FakeClient::new(DEFAULT_DESKTOP);
        let a = client.create_window(WindowSpec::new(Rect::new(0, 0, 100, 100)));
        let proposed = Rect::new(10, 20, 125, 147);
        assert_eq!(client.sizing(a, SizingCorner::BottomRight, proposed), None);

        client.set_sizing_step(a, Some(10));
        assert_eq!(
            client.sizing(a, SizingCorner::BottomRight, proposed),
            Some(Rect::new(10, 20, 120, 140))
        );
        assert_eq!(client.sizing(a, SizingCorner::TopLeft, proposed), Some(Rect::new(15, 27, 125, 147)));
    }

    #[test]
    fn test_fake_client_deferred_sessions() {
        let client = FakeClient::new(DEFAULT_DESKTOP);
        let a = client.create_window(WindowSpec::new(Rect::new(0, 0, 100, 100)));
        client.set_session_answer(a, false);
        client.defer_session_messages(true);

        let answers = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&answers);
        let sent = client.send_session_message(
            a,
            SessionMessage::QueryEndSession { logoff: false },
            Box::new(move |w, ok| sink.lock().push((w, ok))),
        );
        assert!(sent);
        assert!(answers.lock().is_empty());

        assert_eq!(client.deliver_session_messages(), 1);
        assert_eq!(*answers.lock(), vec![(a, false)]);

        let gone = client.send_session_message(
            WindowId(99),
            SessionMessage::QueryEndSession { logoff: false },
            Box::new(|_, _| {}),
        );
        assert!(!gone);
    }
}

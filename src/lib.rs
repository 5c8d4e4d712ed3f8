//! # winsync
//!
//! Keeps a client-side window model (a tree of logical windows with styles,
//! rectangles, regions and layered attributes) in agreement with a host
//! window system that owns the real on-screen windows.
//!
//! ## Architecture
//!
//! - `sync`: the [`WindowSynchronizer`] and the driver operations the client
//!   model calls (position changes, style, region, layered attributes, text)
//! - `dispatch`: host notifications and the per-thread current-event marker
//!   that stops host-originated changes from being echoed back
//! - `translate`: style to host features, rect translation, frame limits
//! - `shape`, `opacity`, `surface`: window shape, transparency and
//!   back-buffers
//! - `zorder`, `focus`: stacking, visibility, focus and activation
//! - `resize`: host queries during interactive resizes, title-bar drags
//! - `session`: quit requests fanned out as end-session queries
//! - `host`, `client`: the two seams, as traits
//! - `testing`: recording in-memory implementations of both seams
//!
//! ## Usage
//!
//! ```rust
//! use winsync::testing::{harness, WindowSpec};
//! use winsync::{Rect, SyncConfig};
//!
//! let h = harness(SyncConfig::default());
//! let window = h.open(WindowSpec::new(Rect::new(100, 100, 500, 400)));
//!
//! let host = h.host_of(window).expect("top-level windows get a host window");
//! assert!(h.host.is_visible(host));
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod focus;
pub mod geometry;
pub mod host;
pub mod logging;
pub mod opacity;
pub mod record;
pub mod registry;
pub mod resize;
pub mod session;
pub mod shape;
pub mod stack;
pub mod style;
pub mod surface;
pub mod sync;
pub mod testing;
pub mod translate;
pub mod zorder;

// Re-export main types for easy access
pub use client::{ClientMessage, ClientWindowModel, PosChange, WindowId, WindowPosSink};
pub use config::SyncConfig;
pub use dispatch::{EventKind, HostEvent};
pub use resize::HostQuery;
pub use error::{HostError, SyncError};
pub use geometry::{Insets, Rect, Size};
pub use host::{HostWindowId, HostWindowSystem, Placement, ShapeMask, WindowFeatures};
pub use opacity::{ColorKey, LayeredAttributes};
pub use record::SyncRecord;
pub use session::{QuitPhase, QuitReason};
pub use shape::{Region, RegionSource};
pub use style::{ExtendedStyle, PosFlags, StyleChange, WindowStyle};
pub use surface::Surface;
pub use sync::WindowSynchronizer;

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information for winsync
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

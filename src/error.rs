//! Error types for the synchronizer.
//!
//! Only resource exhaustion and registry misuse are errors. Notifications for
//! unknown windows and policy refusals (closing a disabled window) are
//! expected flow: they are logged and dropped, never reported.

use crate::client::WindowId;
use crate::geometry::Rect;
use thiserror::Error;

/// What a host window system command can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host refused to create a window: {0}")]
    CreationRefused(String),

    #[error("host connection lost")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to create host window for {window}")]
    HostWindowCreation {
        window: WindowId,
        #[source]
        source: HostError,
    },

    #[error("cannot allocate {bytes} byte surface for {rect}")]
    SurfaceAllocation { rect: Rect, bytes: usize },

    #[error("{0} already has a sync record")]
    AlreadyRegistered(WindowId),
}

//! Quit/session coordination
//!
//! A host quit request fans out as an end-session query to every top-level
//! window of the process and fans back in as one answer to the host:
//!
//! ```text
//! Querying ──all answers in──► Ending ──all completions in──► Done
//!    │                                                        │
//!    └─ first veto: reply "no" to the host at once            └─ exit if agreed
//! ```
//!
//! Every window is driven through completion whatever the outcome. Answers
//! arrive through callbacks, possibly on other threads and possibly before
//! the fan-out loop has finished, so the counters live behind a lock that
//! is never held while a message is sent.

use crate::client::{ClientWindowModel, SessionMessage, WindowId};
use crate::host::HostWindowSystem;
use crate::sync::WindowSynchronizer;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Why the host wants the application to quit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuitReason {
    Logout,
    Restart,
    Shutdown,
    /// The user picked Quit from the application menu
    Menu,
}

impl QuitReason {
    /// Whether the end-session messages carry the logoff flag
    pub fn logoff(self) -> bool {
        self == QuitReason::Logout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitPhase {
    Querying,
    Ending,
    Done,
}

#[derive(Debug)]
struct QuitState {
    phase: QuitPhase,
    /// Answers (or completions) still outstanding in the current phase
    pending: usize,
    /// Every window agreed so far
    result: bool,
    /// The host already got its answer
    replied: bool,
}

/// One in-flight quit request.
pub struct QuitSession<H, C> {
    host: Arc<H>,
    client: Arc<C>,
    reason: QuitReason,
    windows: Vec<WindowId>,
    state: Mutex<QuitState>,
}

impl<H, C> QuitSession<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    fn new(host: Arc<H>, client: Arc<C>, reason: QuitReason, windows: Vec<WindowId>) -> Self {
        let pending = windows.len();
        Self {
            host,
            client,
            reason,
            windows,
            state: Mutex::new(QuitState {
                phase: QuitPhase::Querying,
                pending,
                result: true,
                replied: false,
            }),
        }
    }

    pub fn phase(&self) -> QuitPhase {
        self.state.lock().phase
    }

    /// Aggregate answer so far
    pub fn result(&self) -> bool {
        self.state.lock().result
    }

    pub fn reason(&self) -> QuitReason {
        self.reason
    }

    fn start(self: &Arc<Self>) {
        if self.windows.is_empty() {
            info!("quit requested ({:?}) with no windows, quitting", self.reason);
            {
                let mut state = self.state.lock();
                state.phase = QuitPhase::Done;
                state.replied = true;
            }
            self.host.quit_reply(true);
            self.client.exit_process();
            return;
        }

        info!("quit requested ({:?}), querying {} windows", self.reason, self.windows.len());
        let message = SessionMessage::QueryEndSession {
            logoff: self.reason.logoff(),
        };
        for &window in &self.windows {
            let session = Arc::clone(self);
            let sent = self.client.send_session_message(
                window,
                message,
                Box::new(move |window, agreed| session.query_answered(window, agreed)),
            );
            if !sent {
                debug!("{} gone before the end-session query", window);
                self.query_answered(window, false);
            }
        }
    }

    fn query_answered(self: &Arc<Self>, window: WindowId, agreed: bool) {
        trace!("{} end-session answer {}", window, agreed);
        let (reply, all_in) = {
            let mut state = self.state.lock();
            if state.phase != QuitPhase::Querying {
                warn!("{} answered end-session query after the query phase", window);
                return;
            }

            let mut reply = None;
            if !agreed {
                state.result = false;
                if !state.replied {
                    state.replied = true;
                    reply = Some(false);
                }
            }

            state.pending = state.pending.saturating_sub(1);
            let all_in = state.pending == 0;
            if all_in {
                state.phase = QuitPhase::Ending;
                state.pending = self.windows.len();
                if !state.replied {
                    state.replied = true;
                    reply = Some(state.result);
                }
            }
            (reply, all_in)
        };

        if let Some(quit) = reply {
            info!("answering quit request: {}", if quit { "quit" } else { "cancel" });
            self.host.quit_reply(quit);
        }
        if all_in {
            self.end_session();
        }
    }

    fn end_session(self: &Arc<Self>) {
        let ending = self.result();
        let message = SessionMessage::EndSession {
            ending,
            logoff: self.reason.logoff(),
        };
        for &window in &self.windows {
            let session = Arc::clone(self);
            let sent = self.client.send_session_message(
                window,
                message,
                Box::new(move |window, _| session.end_completed(window)),
            );
            if !sent {
                debug!("{} gone before the end-session message", window);
                self.end_completed(window);
            }
        }
    }

    fn end_completed(&self, window: WindowId) {
        trace!("{} end-session complete", window);
        let exit = {
            let mut state = self.state.lock();
            if state.phase != QuitPhase::Ending {
                return;
            }
            state.pending = state.pending.saturating_sub(1);
            if state.pending > 0 {
                return;
            }
            state.phase = QuitPhase::Done;
            state.result
        };

        if exit {
            info!("all windows ended their session, exiting");
            self.client.exit_process();
        } else {
            debug!("session ending cancelled, staying alive");
        }
    }
}

impl<H, C> WindowSynchronizer<H, C>
where
    H: HostWindowSystem + 'static,
    C: ClientWindowModel + 'static,
{
    /// Starts coordinating a host quit request.
    ///
    /// A request arriving while another is still in flight is refused.
    pub fn begin_quit(&self, reason: QuitReason) {
        let windows = self.client.top_level_windows();
        let session = {
            let mut slot = self.quit.lock();
            if slot.as_ref().is_some_and(|s| s.phase() != QuitPhase::Done) {
                warn!("quit already in progress, refusing {:?}", reason);
                drop(slot);
                self.host.quit_reply(false);
                return;
            }
            let session = Arc::new(QuitSession::new(
                Arc::clone(&self.host),
                Arc::clone(&self.client),
                reason,
                windows,
            ));
            *slot = Some(Arc::clone(&session));
            session
        };
        session.start();
    }

    /// Phase of the latest quit request, if any
    pub fn quit_phase(&self) -> Option<QuitPhase> {
        self.quit.lock().as_ref().map(|s| s.phase())
    }
}

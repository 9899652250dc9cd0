//! Lifecycle state machine for one supervised server instance.
//!
//! Pure core: classified events (plus the exit signal, the grace timer and
//! shutdown results) go in, effect commands come out. All I/O lives in the
//! driver, which keeps the transition table testable without a real
//! process or network call.
//!
//! The `{stopping, stopped}` flags are the single point of mutual
//! exclusion: every handler checks them first, so overlapping events (a
//! stray exit after a restart handoff, a second stop request while one is
//! in flight) are silently ignored and the terminal effect is emitted at
//! most once per instance.

use std::time::Duration;

use crate::classifier::ClassifiedEvent;
use crate::error::SupervisorError;
use crate::session::SessionCounter;

/// Where clients reach the server unless an output line says otherwise.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4444";

/// Grace window after a generic failure marker. The already-running
/// diagnostic arrives after the failure text in the server's output, so a
/// pending fatal outcome must stay preemptable for this long.
pub const FAILURE_GRACE: Duration = Duration::from_millis(500);

/// Why a shutdown request was issued. The result handler branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopIntent {
    /// Another instance holds the port; on success we restart.
    Conflict,
    /// Session count drained to zero; completion is a no-op.
    Drain,
}

/// Commands for the driver. The machine never performs these itself.
#[derive(Debug)]
pub enum Effect {
    /// Deliver the ready signal to the caller.
    FireReady,
    /// Deliver the terminal failure to the caller.
    FireFatal(SupervisorError),
    /// Issue the remote shutdown request and report back the result.
    CallShutdown { endpoint: String, intent: StopIntent },
    /// Start the failure grace timer.
    ArmGraceTimer,
    /// Cancel a pending failure grace timer.
    CancelGraceTimer,
    /// Abandon this instance and launch a fresh one. The terminal
    /// callback is considered satisfied; it never fires for this instance.
    Restart,
}

/// State owned by one instance, from launch until its terminal effect.
pub struct Lifecycle {
    endpoint: String,
    stopping: bool,
    stopped: bool,
    grace_armed: bool,
    ready_fired: bool,
    terminal: bool,
    sessions: SessionCounter,
    trace: Option<String>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            stopping: false,
            stopped: false,
            grace_armed: false,
            ready_fired: false,
            terminal: false,
            sessions: SessionCounter::new(),
            trace: None,
        }
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// React to one classified output line.
    pub fn on_event(&mut self, event: ClassifiedEvent) -> Vec<Effect> {
        if self.terminal || self.stopped {
            return Vec::new();
        }

        match event {
            ClassifiedEvent::EndpointAnnounced(addr) => {
                tracing::debug!("Selenium server endpoint announced: {}", addr);
                self.endpoint = addr;
                Vec::new()
            }
            ClassifiedEvent::Started => {
                if self.ready_fired {
                    Vec::new()
                } else {
                    self.ready_fired = true;
                    vec![Effect::FireReady]
                }
            }
            ClassifiedEvent::AlreadyRunning => {
                let mut effects = Vec::new();
                if self.grace_armed {
                    self.grace_armed = false;
                    effects.push(Effect::CancelGraceTimer);
                }
                effects.extend(self.begin_stop(StopIntent::Conflict));
                effects
            }
            ClassifiedEvent::Failed => {
                if self.grace_armed || self.stopping {
                    Vec::new()
                } else {
                    self.grace_armed = true;
                    vec![Effect::ArmGraceTimer]
                }
            }
            ClassifiedEvent::ExceptionThrown(trace) => {
                if self.trace.is_none() {
                    self.trace = Some(trace.clone());
                }
                if self.stopping {
                    // A stop is in flight; keep the trace for diagnostics
                    // but let the stop resolve the instance.
                    return Vec::new();
                }
                tracing::error!("Exception thrown. Going to shut down the Selenium server.");
                self.fatal(SupervisorError::Exception { trace })
            }
            ClassifiedEvent::FatalError => {
                if self.stopping {
                    return Vec::new();
                }
                self.fatal(SupervisorError::FatalErrorReported)
            }
            ClassifiedEvent::SessionOpened(id) => {
                tracing::debug!("Session opened: {}", id);
                self.sessions.open();
                Vec::new()
            }
            ClassifiedEvent::SessionClosed(id) => {
                tracing::debug!("Session closed: {}", id);
                if self.sessions.close() {
                    self.begin_stop(StopIntent::Drain)
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// The process exited. Fatal unless a stop was already in flight or
    /// this instance already resolved.
    pub fn on_process_exit(&mut self) -> Vec<Effect> {
        if self.terminal || self.stopping || self.stopped {
            return Vec::new();
        }
        let trace = self.trace.take();
        self.fatal(SupervisorError::TerminatedUnexpectedly { trace })
    }

    /// The failure grace window elapsed with no contradicting signal.
    pub fn on_grace_elapsed(&mut self) -> Vec<Effect> {
        if self.terminal || self.stopped || !self.grace_armed {
            return Vec::new();
        }
        self.grace_armed = false;
        self.fatal(SupervisorError::FailedToStart)
    }

    /// The shutdown request completed.
    pub fn on_shutdown_result(&mut self, intent: StopIntent, success: bool) -> Vec<Effect> {
        if self.terminal {
            return Vec::new();
        }
        self.stopping = false;
        match intent {
            StopIntent::Conflict => {
                if success {
                    self.stopped = true;
                    self.terminal = true;
                    vec![Effect::Restart]
                } else {
                    self.fatal(SupervisorError::ShutdownRefused {
                        endpoint: self.endpoint.clone(),
                    })
                }
            }
            StopIntent::Drain => {
                // Success parks the instance; failure resumes supervision.
                self.stopped = success;
                Vec::new()
            }
        }
    }

    fn begin_stop(&mut self, intent: StopIntent) -> Vec<Effect> {
        if self.stopping || self.stopped {
            return Vec::new();
        }
        self.stopping = true;
        vec![Effect::CallShutdown {
            endpoint: self.endpoint.clone(),
            intent,
        }]
    }

    fn fatal(&mut self, err: SupervisorError) -> Vec<Effect> {
        self.terminal = true;
        vec![Effect::FireFatal(err)]
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether this instance resolved without a terminal callback
    /// (graceful drain stop).
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn active_sessions(&self) -> u32 {
        self.sessions.active()
    }
}

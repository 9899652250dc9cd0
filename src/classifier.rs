//! Log-line classifier for Selenium server console output.
//!
//! One line in, at most one event out. The pattern list is ordered and
//! first-match-wins: a line is never classified as two things at once.

use regex::Regex;

use crate::error::SupervisorError;

/// A single classified line of server output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedEvent {
    /// The server announced the address RemoteWebDriver clients should use.
    EndpointAnnounced(String),
    /// The embedded Jetty server finished starting.
    Started,
    /// Another Selenium instance already holds the port.
    AlreadyRunning,
    /// Generic startup failure marker. Ambiguous on its own: the
    /// already-running diagnostic arrives after it in the output.
    Failed,
    /// An exception surfaced; the full line is kept as the trace.
    ExceptionThrown(String),
    /// Hard fatal error marker.
    FatalError,
    /// A client opened a WebDriver session.
    SessionOpened(String),
    /// A client closed a WebDriver session.
    SessionClosed(String),
}

/// Compiled pattern set. Build once, classify many; `classify` is pure
/// and safe to call from anywhere.
pub struct Classifier {
    endpoint: Regex,
    started: Regex,
    already_running: Regex,
    failure: Regex,
    exception: Regex,
    fatal: Regex,
    session_new: Regex,
    session_delete: Regex,
}

impl Classifier {
    pub fn new() -> Result<Self, SupervisorError> {
        Ok(Self {
            endpoint: Regex::new(r"RemoteWebDriver instances should connect to: (.*)")?,
            started: Regex::new(r"Started org\.openqa\.jetty\.jetty\.Server")?,
            already_running: Regex::new(r"Selenium is already running")?,
            failure: Regex::new(r"Failed to start")?,
            exception: Regex::new(r"Exception thrown(.*)")?,
            fatal: Regex::new(r"Fatal error")?,
            session_new: Regex::new(r"Executing: \[new session: (.*)\]")?,
            session_delete: Regex::new(r"Executing: \[delete session: (.*)\]")?,
        })
    }

    /// Classify one line of output. Unrecognized lines yield `None`.
    pub fn classify(&self, line: &str) -> Option<ClassifiedEvent> {
        if let Some(caps) = self.endpoint.captures(line) {
            let addr = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if !addr.is_empty() {
                return Some(ClassifiedEvent::EndpointAnnounced(normalize_endpoint(addr)));
            }
            return None;
        }
        if self.started.is_match(line) {
            return Some(ClassifiedEvent::Started);
        }
        if self.already_running.is_match(line) {
            return Some(ClassifiedEvent::AlreadyRunning);
        }
        if self.failure.is_match(line) {
            return Some(ClassifiedEvent::Failed);
        }
        if self.exception.is_match(line) {
            return Some(ClassifiedEvent::ExceptionThrown(line.to_string()));
        }
        if self.fatal.is_match(line) {
            return Some(ClassifiedEvent::FatalError);
        }
        if let Some(caps) = self.session_new.captures(line) {
            let id = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            return Some(ClassifiedEvent::SessionOpened(id.to_string()));
        }
        if let Some(caps) = self.session_delete.captures(line) {
            let id = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            return Some(ClassifiedEvent::SessionClosed(id.to_string()));
        }
        None
    }
}

/// Strip the WebDriver hub path segment from an announced address, so the
/// stored endpoint is the server root the shutdown URL hangs off of.
pub fn normalize_endpoint(addr: &str) -> String {
    addr.replacen("/wd/hub", "", 1)
}

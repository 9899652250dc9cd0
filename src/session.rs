//! Running-session counter.
//!
//! Opens are expected to precede matching closes, but an unmatched close
//! must not underflow or trigger a spurious drain.

/// Counts concurrent WebDriver sessions against the supervised server.
#[derive(Debug, Default)]
pub struct SessionCounter {
    active: u32,
}

impl SessionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened session.
    pub fn open(&mut self) {
        self.active += 1;
    }

    /// Record a closed session. Returns `true` only when this close
    /// drained the counter, i.e. it reached zero from a positive value.
    /// A close with no prior open is tolerated and reports `false`.
    pub fn close(&mut self) -> bool {
        if self.active == 0 {
            return false;
        }
        self.active -= 1;
        self.active == 0
    }

    pub fn active(&self) -> u32 {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_then_close_drains() {
        let mut counter = SessionCounter::new();
        counter.open();
        assert_eq!(counter.active(), 1);
        assert!(counter.close());
        assert_eq!(counter.active(), 0);
    }

    #[test]
    fn close_only_drains_at_zero() {
        let mut counter = SessionCounter::new();
        counter.open();
        counter.open();
        assert!(!counter.close());
        assert!(counter.close());
    }

    #[test]
    fn unmatched_close_is_tolerated() {
        let mut counter = SessionCounter::new();
        assert!(!counter.close());
        assert_eq!(counter.active(), 0);
        // Counter still behaves normally afterwards.
        counter.open();
        assert!(counter.close());
    }
}

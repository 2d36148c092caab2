//! Warning handling policies.
//!
//! Recoverable diagnostics (unknown elements and attributes, stray
//! character data) are routed through the active policy, which decides
//! per warning whether the parse continues or aborts.

use crate::err::ParseWarning;

/// Decides the fate of each recoverable warning.
pub trait WarningPolicy {
    /// Return `true` to abort the parse with this warning as the error.
    fn escalate(&mut self, warning: &ParseWarning) -> bool;
}

/// Default policy: log every warning and keep parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogWarnings;

impl WarningPolicy for LogWarnings {
    fn escalate(&mut self, warning: &ParseWarning) -> bool {
        log::warn!("{warning}");
        false
    }
}

/// Treats every warning as fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl WarningPolicy for Strict {
    fn escalate(&mut self, _warning: &ParseWarning) -> bool {
        true
    }
}

impl<F: FnMut(&ParseWarning) -> bool> WarningPolicy for F {
    fn escalate(&mut self, warning: &ParseWarning) -> bool {
        self(warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::WarningKind;

    #[test]
    fn closures_are_policies() {
        let mut seen = Vec::new();
        let mut policy = |w: &ParseWarning| {
            seen.push(w.to_string());
            false
        };
        let w = ParseWarning::new(WarningKind::UnexpectedElement("x".into()), 3);
        assert!(!WarningPolicy::escalate(&mut policy, &w));
        assert!(Strict.escalate(&w));
        assert_eq!(seen, ["Warning on line 3: unexpected element \"x\""]);
    }
}

//! Line classification against the raw-forward and trigger pattern sets.
//!
//! Raw patterns are evaluated first and win unconditionally: a raw line
//! is forwarded even during a blackout and even when a trigger pattern
//! would also match. Trigger patterns are consulted only when no raw
//! pattern hits.

use crate::patterns::{Matcher, PatternSet};

/// Category assigned to a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Forward the line verbatim; never consults the blackout gate.
    Raw,
    /// Send with the trigger title; gated by the blackout window.
    Trigger,
    /// No pattern matched; discard with no side effect.
    Ignore,
}

/// A classified line: its category plus, for triggers, the matcher that hit.
#[derive(Debug)]
pub struct Classification<'a> {
    /// Resolved category.
    pub category: Category,
    /// The matcher that produced the category, when one matched.
    pub matched: Option<&'a Matcher>,
}

/// Classify one line against both pattern sets.
///
/// Evaluation order is the decision: raw patterns first (first-match-wins
/// within the set), then trigger patterns, then [`Category::Ignore`].
pub fn classify<'a>(
    line: &str,
    raw: &'a PatternSet,
    triggers: &'a PatternSet,
) -> Classification<'a> {
    if let Some(matched) = raw.find_match(line) {
        return Classification {
            category: Category::Raw,
            matched: Some(matched),
        };
    }

    if let Some(matched) = triggers.find_match(line) {
        return Classification {
            category: Category::Trigger,
            matched: Some(matched),
        };
    }

    Classification {
        category: Category::Ignore,
        matched: None,
    }
}

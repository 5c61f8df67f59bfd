//! Pattern compilation for line matching.
//!
//! Configuration entries either carry a `re:` prefix (remainder compiled
//! as a regular expression) or are treated as literal text matched as a
//! case-insensitive substring. A malformed regex is a fatal startup
//! error, never a per-line skip.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Marker prefix selecting regex compilation for a pattern entry.
const REGEX_MARKER: &str = "re:";

/// Pattern compilation errors.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The entry's regular expression failed to compile.
    #[error("invalid pattern {entry:?}: {source}")]
    Invalid {
        /// The configuration entry as written.
        entry: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// A single compiled matcher plus the configuration entry it came from.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    entry: String,
}

impl Matcher {
    /// Compile one configuration entry.
    ///
    /// An ASCII case-insensitive `re:` prefix selects regex compilation;
    /// anything else is escaped and matched as a literal substring. Both
    /// forms are case-insensitive and unanchored.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Invalid`] when the regex fails to compile.
    pub fn compile(entry: &str) -> Result<Self, PatternError> {
        let pattern = match entry.get(..REGEX_MARKER.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(REGEX_MARKER) => {
                entry[REGEX_MARKER.len()..].to_owned()
            }
            _ => regex::escape(entry),
        };

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| PatternError::Invalid {
                entry: entry.to_owned(),
                source,
            })?;

        Ok(Self {
            regex,
            entry: entry.to_owned(),
        })
    }

    /// Whether this matcher hits anywhere in `line`.
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// The configuration entry this matcher was compiled from.
    pub fn entry(&self) -> &str {
        &self.entry
    }
}

/// An ordered set of matchers, evaluated first-match-wins.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    matchers: Vec<Matcher>,
}

impl PatternSet {
    /// Compile an ordered list of configuration entries.
    ///
    /// Blank entries are discarded before compilation; insertion order is
    /// preserved for the survivors.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatternError`] encountered.
    pub fn compile<I, S>(entries: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matchers = Vec::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            matchers.push(Matcher::compile(entry)?);
        }
        Ok(Self { matchers })
    }

    /// Return the first matcher that hits `line`, if any.
    ///
    /// Evaluation short-circuits at the first hit.
    pub fn find_match(&self, line: &str) -> Option<&Matcher> {
        self.matchers.iter().find(|m| m.is_match(line))
    }

    /// Number of compiled matchers in the set.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Whether the set holds no matchers.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

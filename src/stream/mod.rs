//! Scanner for the standard output and error of a VASP run.
//!
//! Every line is matched against a set of triggers, each a regular
//! expression with a kind (`ERROR` or `WARNING`), a message and an optional
//! suggestion. The built-in set ships with the crate; a [`StreamConfig`]
//! replaces or adds triggers by short name.
//!
//! ```
//! use vaspio::stream::StreamScanner;
//!
//! let scanner = StreamScanner::new()?;
//! let report = scanner.scan_str(" running on    4 total cores\n internal error in subroutine IBZKPT:\n");
//! assert_eq!(report.entries()[0].to_string(), "(ERROR) ibzkpt: Error with the k-points.");
//! # Ok::<(), vaspio::stream::StreamError>(())
//! ```

mod error;


pub use error::StreamError;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Trigger table embedded at build time
const BUILTIN_TRIGGERS: &str = include_str!("triggers.toml");

/// Severity of a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamKind {
    Error,
    Warning,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Error => f.write_str("ERROR"),
            StreamKind::Warning => f.write_str("WARNING"),
        }
    }
}

/// Stream a trigger is expected on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Location {
    #[default]
    Stdout,
    Stderr,
}

/// Trigger as written in a configuration table
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TriggerConfig {
    pub kind: StreamKind,
    pub regex: String,
    pub message: String,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub location: Location,
    /// The run can be recovered by changing the input
    #[serde(default)]
    pub recover: bool,
    /// Report when the pattern is never seen
    #[serde(default)]
    pub inverse: bool,
}

/// Scanner settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Record every occurrence instead of the first one per trigger
    pub history: bool,
    /// Triggers replacing or extending the built-in set, keyed by short name
    pub triggers: BTreeMap<String, TriggerConfig>,
}

/// A compiled trigger
#[derive(Debug, Clone)]
pub struct Trigger {
    pub shortname: String,
    pub kind: StreamKind,
    pub regex: Regex,
    pub message: String,
    pub suggestion: Option<String>,
    pub location: Location,
    pub recover: bool,
    pub inverse: bool,
}

impl Trigger {
    fn compile(shortname: &str, config: TriggerConfig) -> Result<Self, StreamError> {
        let regex = Regex::new(&config.regex).map_err(|source| StreamError::Regex {
            shortname: shortname.to_string(),
            source,
        })?;
        Ok(Self {
            shortname: shortname.to_string(),
            kind: config.kind,
            regex,
            message: config.message,
            suggestion: config.suggestion,
            location: config.location,
            recover: config.recover,
            inverse: config.inverse,
        })
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}: {}", self.kind, self.shortname, self.message)
    }
}

/// Parse a trigger table
pub fn parse_triggers(toml_text: &str) -> Result<BTreeMap<String, TriggerConfig>, StreamError> {
    Ok(toml::from_str(toml_text)?)
}

/// Line scanner over a fixed trigger set
#[derive(Debug, Clone)]
pub struct StreamScanner {
    triggers: Vec<Trigger>,
    history: bool,
}

impl StreamScanner {
    /// Scanner with the built-in triggers
    pub fn new() -> Result<Self, StreamError> {
        Self::with_config(&StreamConfig::default())
    }

    /// Built-in triggers with the entries of `config` replacing or adding by name
    pub fn with_config(config: &StreamConfig) -> Result<Self, StreamError> {
        let mut table = parse_triggers(BUILTIN_TRIGGERS)?;
        for (name, trigger) in &config.triggers {
            if table.insert(name.clone(), trigger.clone()).is_some() {
                debug!("Trigger {} overridden by configuration", name);
            }
        }

        let triggers = table
            .into_iter()
            .map(|(name, trigger)| Trigger::compile(&name, trigger))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            triggers,
            history: config.history,
        })
    }

    /// Configured triggers, ordered by short name
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn history(&self) -> bool {
        self.history
    }

    /// Scan a stream line by line
    pub fn scan<R: BufRead>(&self, reader: R) -> Result<StreamReport, StreamError> {
        let mut matcher = Matcher::new(self);
        for line in reader.lines() {
            matcher.feed(&line?);
        }
        Ok(matcher.finish())
    }

    /// Scan in-memory text
    pub fn scan_str(&self, text: &str) -> StreamReport {
        let mut matcher = Matcher::new(self);
        for line in text.lines() {
            matcher.feed(line);
        }
        matcher.finish()
    }

    /// Scan a file
    pub fn scan_path<P: AsRef<Path>>(&self, path: P) -> Result<StreamReport, StreamError> {
        let file = File::open(path)?;
        self.scan(BufReader::new(file))
    }
}

/// Running state of one scan
struct Matcher<'a> {
    scanner: &'a StreamScanner,
    entries: Vec<Trigger>,
    /// Triggers that already fired
    seen: BTreeSet<usize>,
}

impl<'a> Matcher<'a> {
    fn new(scanner: &'a StreamScanner) -> Self {
        Self {
            scanner,
            entries: Vec::new(),
            seen: BTreeSet::new(),
        }
    }

    fn feed(&mut self, line: &str) {
        for (index, trigger) in self.scanner.triggers.iter().enumerate() {
            if !self.scanner.history && self.seen.contains(&index) {
                continue;
            }
            if !trigger.is_match(line) {
                continue;
            }
            debug!("Trigger {} matched {:?}", trigger.shortname, line);
            self.seen.insert(index);
            if !trigger.inverse {
                self.entries.push(trigger.clone());
            }
        }
    }

    fn finish(mut self) -> StreamReport {
        for (index, trigger) in self.scanner.triggers.iter().enumerate() {
            if trigger.inverse && !self.seen.contains(&index) {
                self.entries.push(trigger.clone());
            }
        }
        StreamReport {
            entries: self.entries,
        }
    }
}

/// Triggers recorded by a scan, in the order they fired
///
/// Inverse triggers that never matched come last.
#[derive(Debug, Clone, Default)]
pub struct StreamReport {
    entries: Vec<Trigger>,
}

impl StreamReport {
    pub fn entries(&self) -> &[Trigger] {
        &self.entries
    }

    pub fn has_entries(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Trigger> {
        self.entries.iter().filter(|t| t.kind == StreamKind::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Trigger> {
        self.entries.iter().filter(|t| t.kind == StreamKind::Warning)
    }

    /// Any recorded trigger is an error that cannot be recovered from
    pub fn is_fatal(&self) -> bool {
        self.errors().any(|t| !t.recover)
    }
}

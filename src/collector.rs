//! Validation error sink.
//!
//! A [`ValidationCollector`] accumulates every problem libxml2 reports during one
//! schema or rule validation pass instead of stopping at the first one. It is bound
//! to exactly one validation call and is never shared across threads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a reported problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Informational output, e.g. a fired Schematron `report`
    Notice,
    /// Recoverable problem that does not make the instance invalid
    Warning,
    /// Constraint violation
    Error,
    /// Input could not be processed at all (e.g. not well-formed)
    Fatal,
}

impl Severity {
    /// Whether this severity counts as a violation
    pub fn is_violation(&self) -> bool {
        matches!(self, Severity::Error | Severity::Fatal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal error",
        };
        f.write_str(label)
    }
}

/// One reported problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub severity: Severity,
    /// libxml2 error domain (`xmlErrorDomain`)
    pub domain: i32,
    /// libxml2 error code
    pub code: i32,
    /// Node path and/or resource position, e.g. `/root/a (line 3)`
    pub location: String,
    pub message: String,
    pub line: Option<u32>,
}

impl Violation {
    pub fn new(severity: Severity, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            domain: 0,
            code: 0,
            location: location.into(),
            message: message.into(),
            line: None,
        }
    }

    /// Build a location string from whatever position information is available.
    pub fn format_location(
        node_path: Option<&str>,
        file: Option<&str>,
        line: Option<u32>,
        column: Option<u32>,
    ) -> String {
        let mut location = String::new();
        if let Some(path) = node_path {
            location.push_str(path);
        }
        let position = match (file, line, column) {
            (Some(file), Some(line), Some(column)) => format!("{}:{}:{}", file, line, column),
            (Some(file), Some(line), None) => format!("{}:{}", file, line),
            (Some(file), None, _) => file.to_string(),
            (None, Some(line), Some(column)) => format!("line {}, column {}", line, column),
            (None, Some(line), None) => format!("line {}", line),
            (None, None, _) => String::new(),
        };
        if !position.is_empty() {
            if location.is_empty() {
                location = position;
            } else {
                location.push_str(&format!(" ({})", position));
            }
        }
        if location.is_empty() {
            location.push_str("<unknown>");
        }
        location
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.location, self.message)
    }
}

/// Ordered sequence of problems reported during a single validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCollector {
    records: Vec<Violation>,
}

impl ValidationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a problem; never aborts the pass.
    pub fn record(&mut self, violation: Violation) {
        self.records.push(violation);
    }

    /// Number of errors and fatal errors (warnings and notices are not counted)
    pub fn violation_count(&self) -> usize {
        self.records
            .iter()
            .filter(|v| v.severity.is_violation())
            .count()
    }

    pub fn has_violations(&self) -> bool {
        self.records.iter().any(|v| v.severity.is_violation())
    }

    pub fn has_fatal_errors(&self) -> bool {
        self.records.iter().any(|v| v.severity == Severity::Fatal)
    }

    pub fn fatal_errors(&self) -> impl Iterator<Item = &Violation> {
        self.records
            .iter()
            .filter(|v| v.severity == Severity::Fatal)
    }

    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.records.iter().filter(|v| v.severity.is_violation())
    }

    /// Every record, including warnings and notices
    pub fn records(&self) -> &[Violation] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Textual report: one record per line, in the order they were reported
    pub fn report(&self) -> String {
        self.records
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ValidationCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

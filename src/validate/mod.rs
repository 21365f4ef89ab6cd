//! Validation errors and their accumulation
//!
//! Validation never fails fast: every rule runs and every discovered problem
//! lands in a [`ValidationReport`], so a submitter gets the complete picture
//! in one pass. Bundling only proceeds when the report carries no fatal
//! entries.

pub mod icon;
pub mod markdown;
pub mod rules;

use std::fmt;

/// How serious a validation finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocks bundle production
    Fatal,
    /// Style recommendation; suppressible with `--nolint`
    Warning,
}

/// One discovered problem, addressed to the manifest field it concerns
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Fatal => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", tag, self.field, self.message)
    }
}

/// Ordered accumulator for validation findings
#[derive(Debug, Default)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fatal(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
            severity: Severity::Fatal,
        });
    }

    pub fn warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
            severity: Severity::Warning,
        });
    }

    pub fn has_fatal(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.severity == Severity::Fatal)
    }

    pub fn fatal_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| e.severity == Severity::Fatal)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }
}

//! Structured diagnostics reported by the generation pipeline.
//!
//! Every phase communicates failures as a list of [`Diagnostic`] values rather
//! than aborting on the first problem, so a single run can report everything
//! that is wrong with a schema at once.

use std::fmt;

/// Position within a schema source, 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// 1-based line number
    pub line: u32,
    /// 1-based column number
    pub column: u32,
}

impl Location {
    /// Create a location from a 1-based line and column.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Category of a pipeline diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Malformed schema text; recoverable within the ingest phase but fatal to
    /// the run.
    ParseError,
    /// Two sources declare the same table, view, or column.
    DuplicateDefinition,
    /// A foreign key or index references a table or column that does not exist
    /// in the merged schema.
    Reference,
    /// A type-mapping rule failed to compile, detected at rule-set load time.
    TypeRuleCompilation,
    /// Two generated artifacts share a name.
    OutputCollision,
    /// An entity's artifacts could not be rendered.
    Emission,
}

impl DiagnosticKind {
    /// Whether a diagnostic of this kind aborts the run before the next phase.
    pub fn is_fatal(self) -> bool {
        match self {
            DiagnosticKind::ParseError
            | DiagnosticKind::DuplicateDefinition
            | DiagnosticKind::Reference
            | DiagnosticKind::TypeRuleCompilation
            | DiagnosticKind::OutputCollision
            | DiagnosticKind::Emission => true,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::ParseError => "parse error",
            DiagnosticKind::DuplicateDefinition => "duplicate definition",
            DiagnosticKind::Reference => "reference error",
            DiagnosticKind::TypeRuleCompilation => "type rule compilation error",
            DiagnosticKind::OutputCollision => "output collision",
            DiagnosticKind::Emission => "emission error",
        };
        f.write_str(name)
    }
}

/// A single structured diagnostic: kind, optional source and location, message.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The category this diagnostic belongs to
    pub kind: DiagnosticKind,
    /// Name of the schema source the diagnostic originated from, if any
    pub source: Option<String>,
    /// Position within that source, if known
    pub location: Option<Location>,
    /// Human-readable description of the problem
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic with no source attribution.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: None,
            location: None,
            message: message.into(),
        }
    }

    /// Attach the name of the originating schema source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a position within the originating source.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref source) = self.source {
            write!(f, " in {}", source)?;
        }
        if let Some(location) = self.location {
            write!(f, " at {}", location)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Whether any diagnostic in the list is fatal to the run.
pub fn any_fatal(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.kind.is_fatal())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_source_and_location() {
        let d = Diagnostic::new(DiagnosticKind::ParseError, "unexpected token")
            .with_source("users.sql")
            .with_location(Location::new(3, 14));
        assert_eq!(
            d.to_string(),
            "parse error in users.sql at 3:14: unexpected token"
        );
    }

    #[test]
    fn test_all_kinds_are_fatal() {
        for kind in [
            DiagnosticKind::ParseError,
            DiagnosticKind::DuplicateDefinition,
            DiagnosticKind::Reference,
            DiagnosticKind::TypeRuleCompilation,
            DiagnosticKind::OutputCollision,
            DiagnosticKind::Emission,
        ] {
            assert!(kind.is_fatal());
        }
    }
}

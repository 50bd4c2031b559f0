use crate::source_location::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    ParserError,
    SyntaxError,
    DeclarationError,
    TypeError,
    Warning,
}

impl DiagnosticKind {
    pub fn is_error(&self) -> bool {
        !matches!(self, DiagnosticKind::Warning)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticKind::ParserError => "ParserError",
            DiagnosticKind::SyntaxError => "SyntaxError",
            DiagnosticKind::DeclarationError => "DeclarationError",
            DiagnosticKind::TypeError => "TypeError",
            DiagnosticKind::Warning => "Warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

/// Ordered collection of the user-facing problems found while parsing and analyzing.
#[derive(Debug, Clone, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &mut self,
        kind: DiagnosticKind,
        location: SourceLocation,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            kind,
            message: message.into(),
            location,
        });
    }

    pub fn parser_error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(DiagnosticKind::ParserError, location, message);
    }

    pub fn syntax_error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(DiagnosticKind::SyntaxError, location, message);
    }

    pub fn declaration_error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(DiagnosticKind::DeclarationError, location, message);
    }

    pub fn type_error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(DiagnosticKind::TypeError, location, message);
    }

    pub fn warning(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.report(DiagnosticKind::Warning, location, message);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind.is_error())
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_are_not_errors() {
        let mut reporter = ErrorReporter::new();
        reporter.warning(SourceLocation::unknown(), "only a default case");
        assert!(!reporter.has_errors());
        assert_eq!(reporter.len(), 1);

        reporter.type_error(SourceLocation::unknown(), "mismatch");
        assert!(reporter.has_errors());
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.diagnostics()[1].to_string(), "TypeError: mismatch");
    }
}

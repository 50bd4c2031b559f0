use colored::Colorize;
use yulstack_core::{CharStream, Diagnostic};

/// Formats reporter output for terminals.
#[derive(Debug, Clone)]
pub struct DiagnosticRenderer {
    pub use_colors: bool,
    pub context_lines: usize,
}

impl Default for DiagnosticRenderer {
    fn default() -> Self {
        Self {
            use_colors: false,
            context_lines: 0,
        }
    }
}

impl DiagnosticRenderer {
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::default()
        }
    }

    pub fn with_context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    pub fn render(&self, diagnostics: &[Diagnostic], stream: Option<&CharStream>) -> String {
        diagnostics
            .iter()
            .map(|diagnostic| self.render_one(diagnostic, stream))
            .collect()
    }

    pub fn render_one(&self, diagnostic: &Diagnostic, stream: Option<&CharStream>) -> String {
        let label = diagnostic.kind.label();
        let label = if !self.use_colors {
            label.to_string()
        } else if diagnostic.kind.is_error() {
            label.red().bold().to_string()
        } else {
            label.yellow().bold().to_string()
        };
        let mut out = format!("{}: {}\n", label, diagnostic.message);

        let location = &diagnostic.location;
        if let Some(stream) = stream.filter(|_| location.is_valid()) {
            let (line, column) = stream.line_column(location.start as usize);
            let name = location.source_name.as_deref().unwrap_or(stream.name());
            let arrow = if self.use_colors {
                "-->".blue().bold().to_string()
            } else {
                "-->".to_string()
            };
            out.push_str(&format!(" {} {}:{}:{}\n", arrow, name, line, column));
            if let Some(snippet) = stream.snippet(location, self.context_lines) {
                out.push_str(&snippet);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use yulstack_core::{DiagnosticKind, ErrorReporter, SourceLocation};

    #[test]
    fn test_render_without_source() {
        let mut reporter = ErrorReporter::new();
        reporter.warning(SourceLocation::unknown(), "Unused.");
        let out = DiagnosticRenderer::default().render(reporter.diagnostics(), None);
        assert_eq!(out, "Warning: Unused.\n");
    }

    #[test]
    fn test_render_with_location() {
        let stream = CharStream::new("{\n  let x := y\n}", "a.yul");
        let mut reporter = ErrorReporter::new();
        reporter.declaration_error(stream.location(13, 14), "Identifier \"y\" not found.");

        let out = DiagnosticRenderer::default().render(reporter.diagnostics(), Some(&stream));
        assert_eq!(
            out,
            "DeclarationError: Identifier \"y\" not found.\n --> a.yul:2:12\n   2 |   let x := y\n"
        );
        assert_eq!(reporter.diagnostics()[0].kind, DiagnosticKind::DeclarationError);
    }
}

use crate::span::Span;

/// A compiler diagnostic (error, warning, or hint).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Render as a single plain line: `error: message (file:line)`.
    ///
    /// This is the §7 scripted/CI form — no source snippet, no color,
    /// stable across terminals and easy to grep.
    pub fn render_plain(&self, filename: &str) -> String {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let mut line = format!("{kind}: {} ({}:{})", self.message, filename, self.span.line);
        for note in &self.notes {
            line.push_str(&format!("\n  note: {note}"));
        }
        if let Some(help) = &self.help {
            line.push_str(&format!("\n  help: {help}"));
        }
        line
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.start as usize..self.span.end as usize))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report
            .finish()
            .eprint((filename, Source::from(source)))
            .unwrap();
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

/// Render a list of diagnostics in the plain §7 form, one per line.
pub fn render_diagnostics_plain(diagnostics: &[Diagnostic], filename: &str) -> String {
    diagnostics
        .iter()
        .map(|d| d.render_plain(filename))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-source-file error/warning tally that gates pass-to-pass progression
/// (§7: "a pass does not run against a file whose counter is non-zero").
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ErrorCounter {
    errors: u32,
    warnings: u32,
}

impl ErrorCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diag: &Diagnostic) {
        match diag.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
    }

    pub fn record_all<'a>(&mut self, diags: impl IntoIterator<Item = &'a Diagnostic>) {
        for d in diags {
            self.record(d);
        }
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Whether the pass driver may proceed to the next pass for this file.
    pub fn may_continue(&self) -> bool {
        !self.has_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(0, 1, 10, 15);
        let d = Diagnostic::error("type mismatch".to_string(), span);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "type mismatch");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_warning_construction() {
        let span = Span::dummy();
        let d = Diagnostic::warning("unused variable".to_string(), span);
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.message, "unused variable");
    }

    #[test]
    fn test_with_note() {
        let d = Diagnostic::error("error".to_string(), Span::dummy())
            .with_note("expected Field".to_string())
            .with_note("found U32".to_string());
        assert_eq!(d.notes.len(), 2);
        assert_eq!(d.notes[0], "expected Field");
        assert_eq!(d.notes[1], "found U32");
    }

    #[test]
    fn test_with_help() {
        let d = Diagnostic::error("error".to_string(), Span::dummy())
            .with_help("try as_field()".to_string());
        assert_eq!(d.help.as_deref(), Some("try as_field()"));
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::warning("hint".to_string(), Span::new(0, 1, 0, 5))
            .with_note("note 1".to_string())
            .with_help("help text".to_string())
            .with_note("note 2".to_string());
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.notes.len(), 2);
        assert!(d.help.is_some());
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "\tldi r16, 255\n\tsts 0x0100, r16\n";
        let d = Diagnostic::error("operand out of range".to_string(), Span::new(0, 1, 5, 13))
            .with_note("ldi expects an 8-bit immediate".to_string());
        d.render("test.asm", source);
    }

    #[test]
    fn test_render_diagnostics_multiple() {
        let source = "foo:\n\tnop\nbar:\n\tnop\n";
        let diagnostics = vec![
            Diagnostic::warning("unused label foo".to_string(), Span::new(0, 1, 0, 3)),
            Diagnostic::warning("unused label bar".to_string(), Span::new(0, 3, 0, 3)),
        ];
        render_diagnostics(&diagnostics, "test.asm", source);
    }

    #[test]
    fn test_render_warning_does_not_panic() {
        let source = "\t.const 300\n";
        let d = Diagnostic::warning("constant truncated to 8 bits".to_string(), Span::new(0, 1, 8, 11))
            .with_help("use .const16 for values above 255".to_string());
        d.render("test.asm", source);
    }

    #[test]
    fn test_render_plain_format() {
        let d = Diagnostic::error("undefined label foo".to_string(), Span::new(0, 7, 0, 3));
        let line = d.render_plain("test.asm");
        assert_eq!(line, "error: undefined label foo (test.asm:7)");
    }

    #[test]
    fn test_render_plain_includes_notes_and_help() {
        let d = Diagnostic::warning("deprecated mnemonic".to_string(), Span::new(0, 2, 0, 3))
            .with_note("cbi/sbi only reach I/O registers 0-31".to_string())
            .with_help("use sbrc/sbrs for higher addresses".to_string());
        let line = d.render_plain("test.asm");
        assert!(line.contains("warning: deprecated mnemonic (test.asm:2)"));
        assert!(line.contains("note: cbi/sbi only reach I/O registers 0-31"));
        assert!(line.contains("help: use sbrc/sbrs for higher addresses"));
    }

    #[test]
    fn test_error_counter_gates_on_errors_only() {
        let mut counter = ErrorCounter::new();
        assert!(counter.may_continue());
        counter.record(&Diagnostic::warning("w".to_string(), Span::dummy()));
        assert!(counter.may_continue());
        assert_eq!(counter.warnings(), 1);
        counter.record(&Diagnostic::error("e".to_string(), Span::dummy()));
        assert!(!counter.may_continue());
        assert_eq!(counter.errors(), 1);
    }

    #[test]
    fn test_error_counter_record_all() {
        let mut counter = ErrorCounter::new();
        let diags = vec![
            Diagnostic::error("e1".to_string(), Span::dummy()),
            Diagnostic::error("e2".to_string(), Span::dummy()),
            Diagnostic::warning("w1".to_string(), Span::dummy()),
        ];
        counter.record_all(&diags);
        assert_eq!(counter.errors(), 2);
        assert_eq!(counter.warnings(), 1);
    }
}

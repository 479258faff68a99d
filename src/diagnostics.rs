use std::fmt;

use thiserror::Error;

/// Represents a character span within one line of monitor input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Semantic,
    RuntimeAccess,
    Resource,
    Guard,
}

/// Rich diagnostic information surfaced to the monitor user.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn lexical(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Lexical, message)
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Syntax, message)
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Semantic, message)
    }

    pub fn access(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::RuntimeAccess, message)
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Resource, message)
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// Attaches `span` unless a more precise one is already present.
    pub fn or_span(mut self, span: SourceSpan) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Renders the diagnostic underneath the offending input line.
    pub fn render_with_source(&self, line: &str) -> String {
        let mut out = String::new();
        if let Some(span) = self.span {
            out.push_str(line);
            out.push('\n');
            let start = span.start.min(line.chars().count());
            let width = span.end.saturating_sub(span.start).max(1);
            out.push_str(&" ".repeat(start));
            out.push_str(&"^".repeat(width));
            out.push('\n');
        }
        out.push_str(&self.to_string());
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Unified error type for the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line editor error: {0}")]
    Editor(#[from] rustyline::error::ReadlineError),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

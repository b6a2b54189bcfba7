use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;
use thiserror::Error;

/// Character range into the source text.
///
/// Offsets count `char`s rather than bytes, which is what ariadne indexes by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    LexerError,
    ParseError,
    RuntimeError,
    TypeError,
    DivisionByZeroError,
    IndexOutOfBoundsError,
    /// Raised from scripts via `throw(message, kind)` with a kind we don't know.
    Custom(String),
}

impl ErrorKind {
    pub fn name(&self) -> &str {
        match self {
            ErrorKind::LexerError => "LexerError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::RuntimeError => "RuntimeError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::DivisionByZeroError => "DivisionByZeroError",
            ErrorKind::IndexOutOfBoundsError => "IndexOutOfBoundsError",
            ErrorKind::Custom(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "LexerError" => ErrorKind::LexerError,
            "ParseError" => ErrorKind::ParseError,
            "RuntimeError" | "" => ErrorKind::RuntimeError,
            "TypeError" => ErrorKind::TypeError,
            "DivisionByZeroError" => ErrorKind::DivisionByZeroError,
            "IndexOutOfBoundsError" => ErrorKind::IndexOutOfBoundsError,
            other => ErrorKind::Custom(other.to_string()),
        }
    }

    fn color(&self) -> Color {
        match self {
            ErrorKind::LexerError => Color::Red,
            ErrorKind::ParseError => Color::Yellow,
            ErrorKind::TypeError => Color::Blue,
            _ => Color::Magenta,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct CrustError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl CrustError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            help: None,
        }
    }

    pub fn lexer_error(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LexerError, message).at(span)
    }

    pub fn parse_error(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message).at(span)
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZeroError, "Division by zero")
    }

    pub fn index_out_of_bounds(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexOutOfBoundsError, message)
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach a location unless a more precise one is already set.
    pub fn at(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<repl>");
        let color = self.kind.color();
        let offset = self.span.map(|span| span.start).unwrap_or(0);

        let mut report_builder = Report::build(ReportKind::Error, filename, offset)
            .with_message(format!("{}: {}", self.kind.name().fg(color), self.message));

        if let Some(span) = self.span {
            report_builder = report_builder.with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(&self.message)
                    .with_color(color),
            );
        }

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        // A broken stderr is not worth a second error.
        let _ = report_builder
            .finish()
            .eprint((filename, Source::from(source)));
    }
}

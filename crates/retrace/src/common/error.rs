//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, NoColor, StandardStream};
use thiserror::Error;

use super::Span;
use crate::types::TypeError;

/// Error raised while building a type context from declaration source
#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("{message} (bytes {span})")]
    Lexer { message: String, span: Span },

    #[error("{message} (bytes {span})")]
    Parser { message: String, span: Span },

    #[error("{message} (bytes {span})")]
    Semantic { message: String, span: Span },

    #[error("{source} (bytes {span})")]
    Type { source: TypeError, span: Span },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FrontendError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn semantic(message: impl Into<String>, span: Span) -> Self {
        Self::Semantic {
            message: message.into(),
            span,
        }
    }

    pub fn type_error(source: TypeError, span: Span) -> Self {
        Self::Type { source, span }
    }

    /// Source location of the error, if it has one
    pub fn span(&self) -> Option<Span> {
        match self {
            FrontendError::Lexer { span, .. }
            | FrontendError::Parser { span, .. }
            | FrontendError::Semantic { span, .. }
            | FrontendError::Type { span, .. } => Some(*span),
            FrontendError::Io(_) => None,
        }
    }
}

pub type FrontendResult<T> = Result<T, FrontendError>;

impl FrontendError {
    /// Headline used when the error is rendered with its source
    fn title(&self) -> &'static str {
        match self {
            FrontendError::Lexer { .. } => "unrecognized input",
            FrontendError::Parser { .. } => "malformed declaration",
            FrontendError::Semantic { .. } => "invalid declaration",
            FrontendError::Type { .. } => "inconsistent type",
            FrontendError::Io(_) => "cannot read declarations",
        }
    }

    /// Codespan diagnostic for this error in file `file_id`
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let diagnostic = Diagnostic::error().with_message(self.title());
        match self {
            FrontendError::Lexer { message, span }
            | FrontendError::Parser { message, span }
            | FrontendError::Semantic { message, span } => diagnostic
                .with_labels(vec![Label::primary(file_id, *span).with_message(message)]),
            FrontendError::Type { source, span } => diagnostic
                .with_labels(vec![Label::primary(file_id, *span).with_message(source.to_string())]),
            FrontendError::Io(err) => diagnostic.with_notes(vec![err.to_string()]),
        }
    }
}

/// Renders front-end errors against the declaration files they came from
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            config: term::Config::default(),
        }
    }

    /// Register a source file; the returned id is what `report_error` takes
    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    /// Print `error` to stderr, colored when the terminal supports it
    pub fn report_error(&self, file_id: usize, error: &FrontendError) {
        let writer = StandardStream::stderr(ColorChoice::Auto);
        let diagnostic = error.to_diagnostic(file_id);
        if let Err(e) = term::emit(&mut writer.lock(), &self.config, &self.files, &diagnostic) {
            tracing::warn!(error = %e, "failed to render diagnostic");
            eprintln!("error: {}", error);
        }
    }

    /// Plain-text rendering of `error`
    pub fn render(&self, file_id: usize, error: &FrontendError) -> String {
        let mut buffer = NoColor::new(Vec::new());
        let diagnostic = error.to_diagnostic(file_id);
        match term::emit(&mut buffer, &self.config, &self.files, &diagnostic) {
            Ok(()) => String::from_utf8_lossy(&buffer.into_inner()).into_owned(),
            Err(_) => error.to_string(),
        }
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_points_at_span() {
        let mut reporter = DiagnosticReporter::new();
        let file_id = reporter.add_file("decls.h", "struct s { int x; int x; };");
        let err = FrontendError::semantic("duplicate member 'x'", Span::new(22, 23));

        let text = reporter.render(file_id, &err);
        assert!(text.contains("invalid declaration"));
        assert!(text.contains("decls.h:1:23"));
        assert!(text.contains("duplicate member 'x'"));
    }

    #[test]
    fn test_type_error_keeps_source() {
        let mut reporter = DiagnosticReporter::new();
        let file_id = reporter.add_file("decls.h", "typedef int t; typedef long t;");
        let err = FrontendError::type_error(TypeError::Redefinition("t".to_string()), Span::new(28, 29));

        let text = reporter.render(file_id, &err);
        assert!(text.contains("redefinition of 't'"));
        assert!(text.contains("inconsistent type"));
        assert_eq!(err.span(), Some(Span::new(28, 29)));
    }
}

use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// Broad classes of compile failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A construct never closed before its region ended, or a placeholder
    /// left unresolved.
    MalformedConstruct,
    /// Incompatible units in stylesheet arithmetic.
    UnitMismatch,
    /// A token the grammar of the current construct does not recognize.
    UnknownToken,
    /// Invalid region attributes or mode names.
    Config,
    /// Non-fatal findings reported alongside successful output.
    Lint,
}

/// Compile errors and warnings with source location information.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
}

impl CompileError {
    pub fn error(kind: ErrorKind, message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        CompileError {
            kind,
            message: message.into(),
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
        }
    }

    pub fn malformed(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        CompileError::error(ErrorKind::MalformedConstruct, message, span, file_id)
    }

    pub fn warning(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        CompileError {
            kind: ErrorKind::Lint,
            message: message.into(),
            span,
            file_id,
            severity: Severity::Warning,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.severity)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompileError {}

pub type Result<T> = std::result::Result<T, CompileError>;

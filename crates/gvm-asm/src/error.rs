//! Assemble-time errors - one per parse failure, with the line/column the
//! `Cursor` had reached when it gave up.
//!
//! Grounded on `original_source/src/asm.c`'s `ndl_asm_parse_res` (a
//! message plus `line`/`column`) and `ndl_asm_print_err`'s caret-style
//! rendering, rather than on `faxc-util`'s heavier `DiagnosticBuilder`
//! machinery - this crate only ever reports one error per run, so a
//! small enum carries everything the caller needs.

use thiserror::Error;

/// Why assembly stopped, and where.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssembleError {
    /// A syntax error: the grammar didn't match at this position.
    #[error("{line}:{column}: {message}")]
    Parse { line: u32, column: u32, message: String },

    /// Every line parsed, but a `:label` reference never got defined.
    #[error("{line}:{column}: undefined label {label:?}")]
    UnresolvedLabel { line: u32, column: u32, label: String },
}

impl AssembleError {
    pub(crate) fn parse(message: impl Into<String>, line: u32, column: u32) -> Self {
        AssembleError::Parse { message: message.into(), line, column }
    }

    pub(crate) fn unresolved_label(label: impl Into<String>, line: u32, column: u32) -> Self {
        AssembleError::UnresolvedLabel { label: label.into(), line, column }
    }

    pub fn line(&self) -> u32 {
        match self {
            AssembleError::Parse { line, .. } => *line,
            AssembleError::UnresolvedLabel { line, .. } => *line,
        }
    }

    pub fn column(&self) -> u32 {
        match self {
            AssembleError::Parse { column, .. } => *column,
            AssembleError::UnresolvedLabel { column, .. } => *column,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AssembleError::Parse { message, .. } => message.clone(),
            AssembleError::UnresolvedLabel { label, .. } => format!("undefined label {label:?}"),
        }
    }

    /// Render a caret pointing at the offending column under the
    /// offending source line, mirroring `ndl_asm_print_err`.
    pub fn render(&self, source: &str) -> String {
        let offending = source.lines().nth(self.line() as usize).unwrap_or("");
        let caret_pad = " ".repeat(self.column() as usize);
        format!(
            "error: {}\n  --> line {}, column {}\n{}\n{}^",
            self.message(),
            self.line() + 1,
            self.column() + 1,
            offending,
            caret_pad,
        )
    }
}

pub type AssembleResult<T> = Result<T, AssembleError>;

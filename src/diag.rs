//! Diagnostics sink.
//!
//! Parse anomalies never abort the run; they are logged through the `log`
//! facade and collected on the parser so consumers can audit coverage.

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable local anomaly; parsing continued on the next line.
    Warning,
    /// A directive or construct the parser does not recognize; the line was
    /// dropped.
    Unhandled,
}

/// One recorded anomaly, with its source position.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Header file name; empty for post-parse diagnostics.
    pub file: String,
    /// 0-based line number.
    pub line: usize,
    /// The offending line text.
    pub text: String,
}

#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn warn(&mut self, file: &str, line: usize, text: &str, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message} - in file: {file} - on line {line} - {text}");
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message,
            file: file.to_string(),
            line,
            text: text.to_string(),
        });
    }

    /// Warning without a source position, for the post-parse passes.
    pub fn warn_global(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message,
            file: String::new(),
            line: 0,
            text: String::new(),
        });
    }

    pub fn unhandled(&mut self, file: &str, line: usize, text: &str, what: &str) {
        log::warn!("unhandled {what} - in file: {file} - on line {line} - {text}");
        self.entries.push(Diagnostic {
            severity: Severity::Unhandled,
            message: format!("unhandled {what}"),
            file: file.to_string(),
            line,
            text: text.to_string(),
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}

//! Structured error reports and the sink they are delivered to.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use super::{ErrorKind, FsError};

/// Callback receiving every report.
pub type ErrorSink = Arc<dyn Fn(&ErrorReport) + Send + Sync>;

/// What a reporting call hands back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMode {
    /// Only signal failure
    #[default]
    Boolean,
    /// Hand back the full report
    Structured,
}

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Failure category
    pub kind: ErrorKind,
    /// Operation that failed
    pub func_name: String,
    /// Underlying error text, if any
    pub details: Option<String>,
    /// Captured backtrace, when `RUST_BACKTRACE` enables capture
    pub stack: Option<String>,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, func_name: impl Into<String>) -> Self {
        let backtrace = Backtrace::capture();
        let stack = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };
        Self {
            kind,
            func_name: func_name.into(),
            details: None,
            stack,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Report for an operation error.
    pub fn from_error(error: &FsError, func_name: impl Into<String>) -> Self {
        Self::new(error.kind(), func_name).with_details(error.to_string())
    }

    /// Fixed message of the report's kind.
    pub fn message(&self) -> &'static str {
        self.kind.message()
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.func_name, self.message())?;
        if let Some(details) = &self.details {
            write!(f, " [{details}]")?;
        }
        Ok(())
    }
}

/// Result of [`ErrorReporter::report`], shaped by the [`ReturnMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reported {
    /// Failure without detail (`ReturnMode::Boolean`)
    False,
    /// Full report (`ReturnMode::Structured`)
    Report(ErrorReport),
}

impl Reported {
    pub fn report(&self) -> Option<&ErrorReport> {
        match self {
            Reported::False => None,
            Reported::Report(report) => Some(report),
        }
    }
}

/// Delivers reports to a sink and applies the instance-wide return mode.
#[derive(Clone, Default)]
pub struct ErrorReporter {
    debug: bool,
    mode: ReturnMode,
    sink: Option<ErrorSink>,
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("debug", &self.debug)
            .field("mode", &self.mode)
            .field("custom_sink", &self.sink.is_some())
            .finish()
    }
}

impl ErrorReporter {
    pub fn new(debug: bool, mode: ReturnMode) -> Self {
        Self {
            debug,
            mode,
            sink: None,
        }
    }

    /// Replace the default sink. A custom sink receives every report,
    /// regardless of the debug flag.
    pub fn set_sink(&mut self, sink: ErrorSink) {
        self.sink = Some(sink);
    }

    /// Restore the default `tracing` sink.
    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_return_mode(&mut self, mode: ReturnMode) {
        self.mode = mode;
    }

    pub fn return_mode(&self) -> ReturnMode {
        self.mode
    }

    /// Send `report` to the sink and shape the caller's return value.
    pub fn report(&self, report: ErrorReport) -> Reported {
        match &self.sink {
            Some(sink) => sink(&report),
            None if self.debug => {
                error!(
                    kind = %report.kind,
                    func_name = %report.func_name,
                    details = report.details.as_deref().unwrap_or(""),
                    "{}",
                    report.message()
                );
            }
            None => {}
        }
        match self.mode {
            ReturnMode::Boolean => Reported::False,
            ReturnMode::Structured => Reported::Report(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessError;
    use std::sync::Mutex;

    #[test]
    fn test_return_mode_shapes_result() {
        let mut reporter = ErrorReporter::default();
        let reported = reporter.report(ErrorReport::new(ErrorKind::Read, "read_file"));
        assert_eq!(reported, Reported::False);
        assert!(reported.report().is_none());

        reporter.set_return_mode(ReturnMode::Structured);
        let reported = reporter.report(ErrorReport::new(ErrorKind::Read, "read_file"));
        let report = reported.report().unwrap();
        assert_eq!(report.kind, ErrorKind::Read);
        assert_eq!(report.func_name, "read_file");
    }

    #[test]
    fn test_custom_sink_receives_reports() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut reporter = ErrorReporter::new(false, ReturnMode::Boolean);
        let captured = Arc::clone(&seen);
        reporter.set_sink(Arc::new(move |report: &ErrorReport| {
            captured.lock().unwrap().push(report.kind);
        }));

        reporter.report(ErrorReport::new(ErrorKind::NotExist, "walk"));
        reporter.report(ErrorReport::new(ErrorKind::Access, "walk"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ErrorKind::NotExist, ErrorKind::Access]
        );
    }

    #[test]
    fn test_display_includes_message() {
        let report = ErrorReport::new(ErrorKind::DiskSpace, "write_file").with_details("quota");
        let text = report.to_string();
        assert!(text.starts_with("diskSpace (write_file)"));
        assert!(text.contains("disk space"));
        assert!(text.ends_with("[quota]"));
    }

    #[test]
    fn test_report_from_error() {
        let error = FsError::AccessDenied(AccessError::Cancelled);
        let report = ErrorReport::from_error(&error, "request_access");
        assert_eq!(report.kind, ErrorKind::Access);
        assert!(report.details.unwrap().contains("not granted"));
    }
}

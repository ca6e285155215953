//! ExceptionsManager: script exceptions reported to the host

use std::collections::VecDeque;
use std::fmt::Write as _;

use hostbridge_sdk::{Args, BridgeContext, MethodInfo, NativeError, NativeModule, NativeResult, Value};
use parking_lot::Mutex;

const REPORT_SOFT: usize = 0;
const REPORT_FATAL: usize = 1;
const UPDATE_MESSAGE: usize = 2;
const REPORT_UNHANDLED: usize = 3;

/// A reported exception
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionReport {
    /// Exception message
    pub message: String,
    /// Formatted stack, one frame per line
    pub stack: String,
    /// Script-side exception ID (0 when unknown)
    pub exception_id: i64,
    /// Whether the exception was fatal
    pub fatal: bool,
}

impl ExceptionReport {
    fn render(&self) -> String {
        if self.stack.is_empty() {
            self.message.clone()
        } else {
            format!("{}\n{}", self.message, self.stack)
        }
    }
}

/// Reports kept for inspection; older ones are dropped
pub const MAX_KEPT_REPORTS: usize = 32;

#[derive(Default)]
struct Reports {
    recent: VecDeque<ExceptionReport>,
    // Fatal report currently on the error surface
    showing: Option<ExceptionReport>,
    total: usize,
}

impl Reports {
    fn push(&mut self, report: ExceptionReport) {
        if self.recent.len() == MAX_KEPT_REPORTS {
            self.recent.pop_front();
        }
        self.recent.push_back(report);
        self.total += 1;
    }
}

/// Native exceptions manager.
pub struct ExceptionsManager {
    reports: Mutex<Reports>,
}

impl ExceptionsManager {
    /// Create the module
    pub fn new() -> Self {
        ExceptionsManager {
            reports: Mutex::new(Reports::default()),
        }
    }

    /// Most recent report
    pub fn last_report(&self) -> Option<ExceptionReport> {
        self.reports.lock().recent.back().cloned()
    }

    /// Fatal report currently shown on the error surface
    pub fn showing(&self) -> Option<ExceptionReport> {
        self.reports.lock().showing.clone()
    }

    /// Up to [`MAX_KEPT_REPORTS`] most recent reports, oldest first
    pub fn recent_reports(&self) -> Vec<ExceptionReport> {
        self.reports.lock().recent.iter().cloned().collect()
    }

    /// Number of reports received, including dropped ones
    pub fn report_count(&self) -> usize {
        self.reports.lock().total
    }
}

impl Default for ExceptionsManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a script stack (`[{ methodName, file, lineNumber, column }]`).
fn format_stack(stack: Option<&Value>) -> String {
    let Some(frames) = stack.and_then(Value::as_array) else {
        return String::new();
    };
    let mut out = String::new();
    for frame in frames {
        let method = frame.get("methodName").and_then(Value::as_str).unwrap_or("<unknown>");
        let file = frame.get("file").and_then(Value::as_str).unwrap_or("<unknown>");
        let line = frame.get("lineNumber").and_then(Value::as_i64).unwrap_or(0);
        let column = frame.get("column").and_then(Value::as_i64).unwrap_or(0);
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "    at {} ({}:{}:{})", method, file, line, column);
    }
    out
}

impl NativeModule for ExceptionsManager {
    fn name(&self) -> &str {
        "ExceptionsManager"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![
            MethodInfo::method("reportSoftException"),
            MethodInfo::method("reportFatalException"),
            MethodInfo::method("updateExceptionMessage"),
            MethodInfo::method("reportUnhandledException"),
        ]
    }

    fn call(&self, ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value> {
        if method > REPORT_UNHANDLED {
            return Err(NativeError::UnknownMethod(method));
        }

        let message: String = args.get(0)?;
        let report = ExceptionReport {
            message,
            stack: format_stack(args.raw(1)),
            exception_id: args.opt(2)?.unwrap_or(0),
            fatal: matches!(method, REPORT_FATAL | REPORT_UNHANDLED),
        };

        let mut reports = self.reports.lock();
        match method {
            REPORT_SOFT => {
                tracing::warn!("Script exception: {}", report.render());
            }
            UPDATE_MESSAGE => {
                // Only refresh the red box if it is showing this exception.
                if let Some(showing) = reports.showing.as_mut() {
                    if showing.exception_id == report.exception_id {
                        showing.message = report.message.clone();
                        showing.stack = report.stack.clone();
                        ctx.report_error(&report.render());
                    }
                }
            }
            _ => {
                tracing::error!("Fatal script exception: {}", report.render());
                ctx.report_error(&report.render());
                reports.showing = Some(report.clone());
            }
        }
        reports.push(report);
        Ok(Value::Null)
    }
}

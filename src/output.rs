//! Output and reporting for `ets-assert`.

use serde::Serialize;
use std::time::Duration;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::error::ConformanceError;

/// Outcome of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    Skipped,
    Error,
}

impl CheckStatus {
    /// Classify an error by who is at fault.
    pub fn from_error(error: &ConformanceError) -> Self {
        if error.is_assertion_failure() {
            CheckStatus::Failed
        } else if error.is_skip() {
            CheckStatus::Skipped
        } else {
            CheckStatus::Error
        }
    }

    /// Process exit code: 0 passed, 1 failed, 2 error, 3 skipped
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckStatus::Passed => 0,
            CheckStatus::Failed => 1,
            CheckStatus::Error => 2,
            CheckStatus::Skipped => 3,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CheckStatus::Passed => "✓ PASSED",
            CheckStatus::Failed => "✗ FAILED",
            CheckStatus::Skipped => "- SKIPPED",
            CheckStatus::Error => "⚠ ERROR",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            CheckStatus::Passed => "32",
            CheckStatus::Failed => "31",
            CheckStatus::Skipped => "36",
            CheckStatus::Error => "33",
        }
    }
}

/// Result of one command, as printed to stdout
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub command: String,
    pub target: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Command output such as XPath values or file paths
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    pub duration_ms: u128,
}

impl CheckReport {
    /// Build a report from the outcome of a command; `Ok` carries its output lines.
    pub fn from_result(
        command: &str,
        target: &str,
        result: Result<Vec<String>, ConformanceError>,
        duration: Duration,
    ) -> Self {
        let (status, message, details) = match result {
            Ok(details) => (CheckStatus::Passed, None, details),
            Err(e) => (CheckStatus::from_error(&e), Some(e.to_string()), Vec::new()),
        };
        Self {
            command: command.to_string(),
            target: target.to_string(),
            status,
            message,
            details,
            duration_ms: duration.as_millis(),
        }
    }
}

/// Output formatter
pub struct Output {
    verbosity: VerbosityLevel,
    format: OutputFormat,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, report: &CheckReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_else(|e| {
                log::warn!("Failed to serialize report: {}", e);
                String::new()
            }),
            OutputFormat::Human => self.render_human(report),
        }
    }

    fn render_human(&self, report: &CheckReport) -> String {
        let mut output = String::new();

        if self.verbosity == VerbosityLevel::Quiet {
            if report.status != CheckStatus::Passed {
                output.push_str(&format!(
                    "{} {}: {}\n",
                    report.command,
                    report.target,
                    report.message.as_deref().unwrap_or_default()
                ));
            }
            return output;
        }

        for line in &report.details {
            output.push_str(line);
            output.push('\n');
        }

        output.push_str(&format!(
            "{}  {} {}",
            self.colorize(report.status.label(), report.status.color()),
            report.command,
            report.target
        ));
        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&format!(
                " ({})",
                format_duration(Duration::from_millis(report.duration_ms as u64))
            ));
        }
        output.push('\n');

        if let Some(message) = &report.message {
            for line in message.lines() {
                output.push_str(&format!("    {}\n", line));
            }
        }
        output
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(verbosity: VerbosityLevel, format: OutputFormat) -> Output {
        Output {
            verbosity,
            format,
            show_colors: false,
        }
    }

    fn failed_report() -> CheckReport {
        CheckReport::from_result(
            "schema",
            "order.xml",
            Err(ConformanceError::AssertionFailed(
                "2 schema validation error(s) detected:\nline 3\nline 4".to_string(),
            )),
            Duration::from_millis(12),
        )
    }

    #[test]
    fn test_status_from_error() {
        assert_eq!(
            CheckStatus::from_error(&ConformanceError::Skipped("n/a".into())),
            CheckStatus::Skipped
        );
        assert_eq!(
            CheckStatus::from_error(&ConformanceError::InvalidArgument("x".into())),
            CheckStatus::Error
        );
        assert_eq!(failed_report().status.exit_code(), 1);
    }

    #[test]
    fn test_human_output_indents_message() {
        let rendered = plain(VerbosityLevel::Normal, OutputFormat::Human).render(&failed_report());
        assert!(rendered.starts_with("✗ FAILED  schema order.xml\n"));
        assert!(rendered.contains("\n    line 3\n    line 4\n"));
    }

    #[test]
    fn test_quiet_output_hides_passes() {
        let passed = CheckReport::from_result(
            "xpath",
            "a.xml",
            Ok(vec!["true".to_string()]),
            Duration::ZERO,
        );
        let output = plain(VerbosityLevel::Quiet, OutputFormat::Human);
        assert!(output.render(&passed).is_empty());
        assert!(output.render(&failed_report()).starts_with("schema order.xml: "));
    }

    #[test]
    fn test_verbose_output_shows_duration() {
        let rendered = plain(VerbosityLevel::Verbose, OutputFormat::Human).render(&failed_report());
        assert!(rendered.contains("(12ms)"));
    }

    #[test]
    fn test_json_output() {
        let rendered = plain(VerbosityLevel::Normal, OutputFormat::Json).render(&failed_report());
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["command"], "schema");
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30.0s");
    }
}

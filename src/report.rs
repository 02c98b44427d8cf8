//! Operation reporting
//!
//! Every operation produces one append-only log line
//! `<timestamp> [<LEVEL>] <organization>/<repository>: <detail>` and one
//! human-readable console line. Reporting never fails the caller: a write
//! error is surfaced once as a console warning and otherwise swallowed.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;

use crate::backup::{Action, OperationOutcome, RunSummary};
use crate::discovery::RepositoryDescriptor;

/// Severity written into the log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Writes operation lines to the log sink and mirrors them to the console
pub struct Reporter {
    sink: Option<Box<dyn Write + Send>>,
    console: Box<dyn Write + Send>,
    sink_failed: bool,
}

impl Reporter {
    /// Open `log_path` for appending, mirroring to stdout.
    ///
    /// If the log file cannot be opened the reporter still works, console only.
    pub fn open(log_path: &Path) -> Self {
        let mut console: Box<dyn Write + Send> = Box::new(io::stdout());

        let sink = match open_log(log_path) {
            Ok(file) => Some(Box::new(file) as Box<dyn Write + Send>),
            Err(e) => {
                warn!("Cannot open log file {}: {}", log_path.display(), e);
                let _ = writeln!(
                    console,
                    "⚠️  Cannot open log file {} ({}); continuing without it",
                    log_path.display(),
                    e
                );
                None
            }
        };

        Self::with_writers(sink, console)
    }

    pub fn with_writers(sink: Option<Box<dyn Write + Send>>, console: Box<dyn Write + Send>) -> Self {
        Self {
            sink,
            console,
            sink_failed: false,
        }
    }

    /// Record the outcome of one repository (or organization-level failure)
    pub fn record(&mut self, outcome: &OperationOutcome) {
        let subject = outcome.subject();
        let (level, message, icon) = match outcome.action {
            Action::Cloned => (Level::Info, "cloned".to_string(), "📥"),
            Action::Updated => (Level::Info, "updated".to_string(), "🔄"),
            Action::Failed => (
                Level::Error,
                outcome
                    .detail
                    .clone()
                    .unwrap_or_else(|| "failed".to_string()),
                "❌",
            ),
        };

        self.write_log(outcome.timestamp, level, &subject, &message);
        self.write_console(
            outcome.timestamp,
            &format!("{} {}: {}", icon, subject, message.replace(['\r', '\n'], " ")),
        );
    }

    /// Record that work on a repository is starting
    pub fn started(&mut self, repository: &RepositoryDescriptor, what: &str) {
        self.write_log(Utc::now(), Level::Info, &repository.full_name(), what);
    }

    /// Record a free-form line about an organization or the run
    pub fn note(&mut self, level: Level, subject: &str, message: &str) {
        let now = Utc::now();
        self.write_log(now, level, subject, message);
        if level != Level::Info {
            self.write_console(now, &format!("⚠️  {}: {}", subject, message));
        }
    }

    /// Record the end-of-run counts; always printed
    pub fn summary(&mut self, summary: &RunSummary) {
        let counts = format!(
            "{} cloned, {} updated, {} failed",
            summary.cloned, summary.updated, summary.failed
        );
        let level = if summary.failed > 0 {
            Level::Warn
        } else {
            Level::Info
        };
        let now = Utc::now();
        self.write_log(now, level, "summary", &counts);

        self.write_console_raw("");
        self.write_console(
            now,
            &format!(
                "📊 Summary: {} ({:.2}s)",
                counts,
                summary.duration.as_secs_f64()
            ),
        );
        if summary.failed > 0 {
            self.write_console_raw(&format!(
                "   {} operation(s) need attention, see the log for details",
                summary.failed
            ));
        }
    }

    fn write_log(&mut self, timestamp: DateTime<Utc>, level: Level, subject: &str, message: &str) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        let line = format_line(timestamp, level, subject, message);
        let result = sink
            .write_all(line.as_bytes())
            .and_then(|_| sink.write_all(b"\n"))
            .and_then(|_| sink.flush());

        if let Err(e) = result {
            if !self.sink_failed {
                self.sink_failed = true;
                warn!("Failed to write to operation log: {}", e);
                self.write_console(
                    Utc::now(),
                    &format!("⚠️  Failed to write to operation log: {}", e),
                );
            }
        }
    }

    /// Console lines carry the same timestamp as the matching log line
    fn write_console(&mut self, timestamp: DateTime<Utc>, text: &str) {
        let line = format!("{} {}", stamp(timestamp), text);
        self.write_console_raw(&line);
    }

    fn write_console_raw(&mut self, text: &str) {
        let _ = writeln!(self.console, "{}", text);
        let _ = self.console.flush();
    }
}

fn open_log(log_path: &Path) -> io::Result<std::fs::File> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(log_path)
}

fn stamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format one log line; newlines in the message are flattened to keep one line per operation
pub fn format_line(timestamp: DateTime<Utc>, level: Level, subject: &str, message: &str) -> String {
    let message = message.replace(['\r', '\n'], " ");
    format!(
        "{} [{}] {}: {}",
        stamp(timestamp),
        level.as_str(),
        subject,
        message
    )
}

use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};

use crate::severity::Severity;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// A single log event, captured at the call site and rendered on the
/// sink's writer thread.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub logger: String,
    pub severity: Severity,
    pub message: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    LoggerName,
    Text,
    SourceFile,
    SourceLine,
    SeverityLabel,
    Timestamp,
}

/// Renders records from a pattern template, compiled once at construction.
///
/// Recognized placeholders: `%s` logger name, `%t` message text, `%U`
/// source file, `%u` source line, `%p` severity label, `%d` timestamp and
/// `%%` for a literal percent. Anything else after `%` passes through
/// literally.
#[derive(Debug, Clone)]
pub struct PatternFormatter {
    segments: Vec<Segment>,
}

impl PatternFormatter {
    pub fn new(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let push = |segments: &mut Vec<Segment>, literal: &mut String, segment: Segment| {
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(literal)));
            }
            segments.push(segment);
        };
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some('s') => push(&mut segments, &mut literal, Segment::LoggerName),
                Some('t') => push(&mut segments, &mut literal, Segment::Text),
                Some('U') => push(&mut segments, &mut literal, Segment::SourceFile),
                Some('u') => push(&mut segments, &mut literal, Segment::SourceLine),
                Some('p') => push(&mut segments, &mut literal, Segment::SeverityLabel),
                Some('d') => push(&mut segments, &mut literal, Segment::Timestamp),
                Some('%') => literal.push('%'),
                Some(other) => {
                    literal.push('%');
                    literal.push(other);
                }
                None => literal.push('%'),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    /// Renders `record` to a line, colouring the severity label when
    /// `color` is set.
    pub fn format(&self, record: &LogRecord, color: bool) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::LoggerName => out.push_str(&record.logger),
                Segment::Text => out.push_str(&record.message),
                Segment::SourceFile => out.push_str(record.file.unwrap_or_default()),
                Segment::SourceLine => {
                    if let Some(line) = record.line {
                        out.push_str(&line.to_string());
                    }
                }
                Segment::SeverityLabel => {
                    if color {
                        out.push_str(&colored_label(record.severity).to_string());
                    } else {
                        out.push_str(record.severity.label());
                    }
                }
                Segment::Timestamp => {
                    out.push_str(&record.timestamp.format(TIMESTAMP_FORMAT).to_string());
                }
            }
        }
        out
    }
}

impl Default for PatternFormatter {
    fn default() -> Self {
        Self::new("[%d %s %p] %t")
    }
}

fn colored_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Trace => "TRACE".purple(),
        Severity::Debug => "DEBUG".blue(),
        Severity::Information => "INFO".green(),
        Severity::Notice => "NOTICE".cyan(),
        Severity::Warning => "WARN".yellow(),
        Severity::Error => "ERROR".red(),
        Severity::Critical => "CRIT".bright_red(),
        Severity::Fatal => "FATAL".red().bold(),
    }
}

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicU8, Ordering},
    },
};

use chrono::Utc;

use crate::{
    config::PLINTH_CONFIG,
    dispatch::Sink,
    error::{Error, Result},
    format::{LogRecord, PatternFormatter},
    severity::Severity,
};

/// Directory of named loggers.
///
/// An explicit instance passed by reference to whoever needs loggers;
/// there is no process-wide registry state. Dropping the registry tears
/// it down.
#[derive(Default)]
pub struct LogRegistry {
    loggers: Mutex<HashMap<String, Logger>>,
}

impl LogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks `name` up, creating a logger bound to `default_sink` on first
    /// use. Repeated calls with the same name return the same logger; the
    /// sink argument only binds on creation, and a repeat call carrying a
    /// different sink keeps the original binding and warns through the
    /// `log` facade.
    pub fn get_or_create(&self, name: &str, default_sink: &Sink) -> Result<Logger> {
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        let mut loggers = self.loggers.lock().unwrap();
        if let Some(logger) = loggers.get(name) {
            if !logger.sink().same_as(default_sink) {
                log::warn!(
                    "logger {name:?} is already bound to a different sink; keeping the original"
                );
            }
            return Ok(logger.clone());
        }
        let logger = Logger::new(name, default_sink.clone());
        loggers.insert(name.to_string(), logger.clone());
        Ok(logger)
    }

    /// Returns the logger registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Logger> {
        self.loggers.lock().unwrap().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.loggers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.lock().unwrap().is_empty()
    }

    /// Tears down every logger and joins the writer thread of every bound
    /// sink. Idempotent. Outstanding logger clones stay safe to call;
    /// their records are dropped and counted by the dead sinks.
    pub fn shutdown(&self) {
        let loggers: Vec<Logger> = self
            .loggers
            .lock()
            .unwrap()
            .drain()
            .map(|(_, logger)| logger)
            .collect();
        let mut sinks: Vec<Sink> = Vec::new();
        for logger in &loggers {
            let sink = logger.sink();
            if !sinks.iter().any(|seen| seen.same_as(&sink)) {
                sinks.push(sink);
            }
        }
        for sink in sinks {
            sink.shutdown();
        }
    }
}

impl Drop for LogRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Output {
    sink: Sink,
    formatter: Arc<PatternFormatter>,
}

struct LoggerShared {
    name: String,
    threshold: AtomicU8,
    output: RwLock<Output>,
}

/// Handle to a named logger. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<LoggerShared>,
}

impl Logger {
    fn new(name: &str, sink: Sink) -> Self {
        Self {
            shared: Arc::new(LoggerShared {
                name: name.to_string(),
                threshold: AtomicU8::new(PLINTH_CONFIG.default_threshold() as u8),
                output: RwLock::new(Output {
                    sink,
                    formatter: Arc::new(PatternFormatter::default()),
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn threshold(&self) -> Severity {
        Severity::from_u8(self.shared.threshold.load(Ordering::Relaxed))
    }

    pub fn set_threshold(&self, threshold: Severity) {
        self.shared.threshold.store(threshold as u8, Ordering::Relaxed);
    }

    /// Rebinds the output sink. A pointer swap under the lock, safe
    /// against concurrent logging on this handle.
    pub fn set_sink(&self, sink: Sink) {
        self.shared.output.write().unwrap().sink = sink;
    }

    pub fn set_formatter(&self, formatter: PatternFormatter) {
        self.shared.output.write().unwrap().formatter = Arc::new(formatter);
    }

    /// Compiles `pattern` and installs it as this logger's formatter.
    pub fn set_pattern(&self, pattern: &str) {
        self.set_formatter(PatternFormatter::new(pattern));
    }

    /// The currently bound sink.
    pub fn sink(&self) -> Sink {
        self.shared.output.read().unwrap().sink.clone()
    }

    /// True when a message at `severity` would be emitted.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.threshold()
    }

    /// Emits `message` at `severity`. Below the threshold this returns
    /// without rendering the message. Emission never fails: a record an
    /// unreachable sink cannot take is dropped and counted.
    pub fn log(&self, severity: Severity, message: impl fmt::Display) {
        self.dispatch(severity, message, None, None);
    }

    /// Like [`log`](Self::log), with the message's source location.
    pub fn log_at(
        &self,
        severity: Severity,
        message: impl fmt::Display,
        file: &'static str,
        line: u32,
    ) {
        self.dispatch(severity, message, Some(file), Some(line));
    }

    fn dispatch(
        &self,
        severity: Severity,
        message: impl fmt::Display,
        file: Option<&'static str>,
        line: Option<u32>,
    ) {
        if !self.enabled(severity) {
            return;
        }
        let (sink, formatter) = {
            let output = self.shared.output.read().unwrap();
            (output.sink.clone(), Arc::clone(&output.formatter))
        };
        let record = Arc::new(LogRecord {
            logger: self.shared.name.clone(),
            severity,
            message: message.to_string(),
            file,
            line,
            timestamp: Utc::now(),
        });
        sink.submit(record, formatter);
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log(Severity::Trace, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Severity::Debug, message);
    }

    pub fn information(&self, message: impl fmt::Display) {
        self.log(Severity::Information, message);
    }

    pub fn notice(&self, message: impl fmt::Display) {
        self.log(Severity::Notice, message);
    }

    pub fn warning(&self, message: impl fmt::Display) {
        self.log(Severity::Warning, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Severity::Error, message);
    }

    pub fn critical(&self, message: impl fmt::Display) {
        self.log(Severity::Critical, message);
    }

    pub fn fatal(&self, message: impl fmt::Display) {
        self.log(Severity::Fatal, message);
    }
}

/// Bridges the `log` crate's macros to a [`Logger`].
struct Facade {
    logger: Logger,
}

impl log::Log for Facade {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.logger.enabled(Severity::from_log_level(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        let severity = Severity::from_log_level(record.level());
        if !self.logger.enabled(severity) {
            return;
        }
        match (record.file_static(), record.line()) {
            (Some(file), Some(line)) => self.logger.log_at(severity, record.args(), file, line),
            _ => self.logger.log(severity, record.args()),
        }
    }

    fn flush(&self) {}
}

/// Routes the `log` crate's macros (`log::warn!` and friends) through
/// `logger`. The macro fast path is fixed to the logger's threshold at
/// install time; the facade re-checks the live threshold on every call.
pub fn install_global(logger: Logger) -> std::result::Result<(), log::SetLoggerError> {
    log::set_max_level(logger.threshold().to_level_filter());
    log::set_boxed_logger(Box::new(Facade { logger }))
}

/// Logs through a [`Logger`] with the call site's file and line attached.
///
/// ```
/// use plinth::{LogRegistry, Severity, Sink, emit};
///
/// let registry = LogRegistry::new();
/// let logger = registry.get_or_create("demo", &Sink::console()).unwrap();
/// emit!(logger, Severity::Warning, "disk {} low", "sda1");
/// ```
#[macro_export]
macro_rules! emit {
    ($logger:expr, $severity:expr, $($arg:tt)+) => {
        $logger.log_at($severity, format_args!($($arg)+), file!(), line!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkWriter;
    use std::io;

    struct CaptureWriter {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl SinkWriter for CaptureWriter {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_sink() -> (Sink, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Sink::custom(CaptureWriter {
            lines: Arc::clone(&lines),
        });
        (sink, lines)
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let registry = LogRegistry::new();
        let (sink, _) = capture_sink();
        assert!(matches!(
            registry.get_or_create("", &sink),
            Err(Error::InvalidName)
        ));
    }

    #[test]
    fn test_get_or_create_is_idempotent_first_sink_wins() {
        let registry = LogRegistry::new();
        let (sink_a, _) = capture_sink();
        let (sink_b, _) = capture_sink();

        let first = registry.get_or_create("svc", &sink_a).unwrap();
        let second = registry.get_or_create("svc", &sink_b).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(first.sink().same_as(&second.sink()));
        assert!(second.sink().same_as(&sink_a));
        first.set_threshold(Severity::Fatal);
        assert_eq!(second.threshold(), Severity::Fatal);
    }

    #[test]
    fn test_below_threshold_writes_nothing() {
        let registry = LogRegistry::new();
        let (sink, lines) = capture_sink();
        let logger = registry.get_or_create("svc", &sink).unwrap();

        for (i, threshold) in Severity::ALL.iter().enumerate() {
            logger.set_threshold(*threshold);
            for below in &Severity::ALL[..i] {
                logger.log(*below, "suppressed");
            }
        }
        registry.shutdown();
        assert!(lines.lock().unwrap().is_empty());
    }

    #[test]
    fn test_suppressed_message_is_never_rendered() {
        struct Explosive;
        impl fmt::Display for Explosive {
            fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
                panic!("rendered a suppressed message");
            }
        }

        let registry = LogRegistry::new();
        let (sink, _) = capture_sink();
        let logger = registry.get_or_create("svc", &sink).unwrap();
        logger.set_threshold(Severity::Warning);
        logger.log(Severity::Information, Explosive);
    }

    #[test]
    fn test_warning_scenario_reaches_sink() {
        let registry = LogRegistry::new();
        let (sink, lines) = capture_sink();
        let logger = registry.get_or_create("svc", &sink).unwrap();
        logger.set_threshold(Severity::Warning);

        logger.information("routine");
        logger.warning("disk low");
        registry.shutdown();

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("svc"));
        assert!(lines[0].contains("disk low"));
    }

    #[test]
    fn test_set_sink_rebinds_output() {
        let registry = LogRegistry::new();
        let (first_sink, first_lines) = capture_sink();
        let (second_sink, second_lines) = capture_sink();
        let logger = registry.get_or_create("svc", &first_sink).unwrap();

        logger.warning("to the first");
        logger.set_sink(second_sink.clone());
        logger.warning("to the second");

        first_sink.shutdown();
        second_sink.shutdown();
        assert_eq!(first_lines.lock().unwrap().len(), 1);
        assert_eq!(second_lines.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_shutdown_is_idempotent_and_counts_late_writes() {
        let registry = LogRegistry::new();
        let (sink, lines) = capture_sink();
        let logger = registry.get_or_create("svc", &sink).unwrap();

        logger.warning("before");
        registry.shutdown();
        registry.shutdown();

        logger.warning("after");
        assert_eq!(lines.lock().unwrap().len(), 1);
        assert_eq!(sink.write_failures(), 1);
    }

    #[test]
    fn test_emit_macro_attaches_location() {
        let registry = LogRegistry::new();
        let (sink, lines) = capture_sink();
        let logger = registry.get_or_create("svc", &sink).unwrap();
        logger.set_pattern("%s :%U:%u: %t");

        emit!(logger, Severity::Error, "failed {} times", 3);
        registry.shutdown();

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("registry.rs"));
        assert!(lines[0].contains("failed 3 times"));
    }

    #[test]
    fn test_registry_can_be_reused_after_shutdown() {
        let registry = LogRegistry::new();
        let (sink, _) = capture_sink();
        registry.get_or_create("svc", &sink).unwrap();
        registry.shutdown();
        assert!(registry.is_empty());

        let (fresh_sink, fresh_lines) = capture_sink();
        let logger = registry.get_or_create("svc", &fresh_sink).unwrap();
        logger.warning("back online");
        registry.shutdown();
        assert_eq!(fresh_lines.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_default_threshold_suppresses_debug() {
        let registry = LogRegistry::new();
        let (sink, lines) = capture_sink();
        let logger = registry.get_or_create("svc", &sink).unwrap();

        assert_eq!(logger.threshold(), Severity::Information);
        logger.debug("hidden");
        logger.information("shown");
        registry.shutdown();
        assert_eq!(lines.lock().unwrap().len(), 1);
    }
}

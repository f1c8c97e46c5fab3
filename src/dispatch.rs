use std::{
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crossbeam_channel::{RecvTimeoutError, Sender, unbounded};

use crate::{
    config::PLINTH_CONFIG,
    error::Result,
    format::{LogRecord, PatternFormatter},
    sink::{ConsoleWriter, FileWriter, SinkWriter},
};

enum SinkCommand {
    Record {
        record: Arc<LogRecord>,
        formatter: Arc<PatternFormatter>,
    },
    Shutdown,
}

/// Shared handle to a log destination with its own writer thread.
///
/// Clones share the channel, the writer thread and the failure counter.
/// Any number of loggers may submit from any thread; the single writer
/// thread serializes the actual writes. The thread is joined by
/// [`shutdown`](Sink::shutdown) or when the last clone drops.
#[derive(Clone)]
pub struct Sink {
    shared: Arc<SinkShared>,
}

struct SinkShared {
    sender: Sender<SinkCommand>,
    handle: Mutex<Option<JoinHandle<()>>>,
    failures: Arc<AtomicU64>,
}

impl Sink {
    /// Sink writing to standard output. Records are written as they
    /// arrive, severity labels coloured.
    pub fn console() -> Self {
        Self::spawn_immediate(ConsoleWriter, true)
    }

    /// Sink appending to the file at `path`, creating it if absent.
    /// Records are batched and flushed on the configured interval.
    /// Fails with [`Error::SinkOpen`](crate::Error::SinkOpen) when the
    /// destination cannot be opened.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::spawn_batched(FileWriter::open(path)?))
    }

    /// Sink driving a caller-supplied writer, records written as they
    /// arrive.
    pub fn custom<W: SinkWriter + 'static>(writer: W) -> Self {
        Self::spawn_immediate(writer, false)
    }

    fn spawn_immediate<W: SinkWriter + 'static>(mut writer: W, color: bool) -> Self {
        let (sender, receiver) = unbounded::<SinkCommand>();
        let failures = Arc::new(AtomicU64::new(0));
        let thread_failures = Arc::clone(&failures);
        let handle = std::thread::spawn(move || {
            while let Ok(command) = receiver.recv() {
                match command {
                    SinkCommand::Shutdown => break,
                    SinkCommand::Record { record, formatter } => {
                        let line = formatter.format(&record, color);
                        if writer.write_line(&line).is_err() {
                            thread_failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }
            let _ = writer.flush();
        });
        Self::from_parts(sender, handle, failures)
    }

    fn spawn_batched<W: SinkWriter + 'static>(mut writer: W) -> Self {
        let (sender, receiver) = unbounded::<SinkCommand>();
        let failures = Arc::new(AtomicU64::new(0));
        let thread_failures = Arc::clone(&failures);
        let handle = std::thread::spawn(move || {
            let mut batch = Vec::with_capacity(32);
            let flush_interval = Duration::from_millis(PLINTH_CONFIG.FLUSH_INTERVAL_MS);
            let mut last_flush = Instant::now();
            loop {
                // Wait at most until the next scheduled flush
                let elapsed = last_flush.elapsed();
                let timeout = if elapsed >= flush_interval {
                    Duration::from_millis(1)
                } else {
                    flush_interval - elapsed
                };

                match receiver.recv_timeout(timeout) {
                    Ok(command) => {
                        batch.push(command);
                        // Collect more without blocking
                        while let Ok(command) = receiver.try_recv() {
                            batch.push(command);
                            if batch.len() >= 32 {
                                break;
                            }
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if last_flush.elapsed() >= flush_interval {
                            let _ = writer.flush();
                            last_flush = Instant::now();
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }

                let mut should_shutdown = false;
                for command in batch.drain(..) {
                    match command {
                        SinkCommand::Shutdown => {
                            should_shutdown = true;
                            break;
                        }
                        SinkCommand::Record { record, formatter } => {
                            let line = formatter.format(&record, false);
                            if writer.write_line(&line).is_err() {
                                thread_failures.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                }

                if should_shutdown || last_flush.elapsed() >= flush_interval {
                    let _ = writer.flush();
                    last_flush = Instant::now();
                }
                if should_shutdown {
                    break;
                }
            }
        });
        Self::from_parts(sender, handle, failures)
    }

    fn from_parts(
        sender: Sender<SinkCommand>,
        handle: JoinHandle<()>,
        failures: Arc<AtomicU64>,
    ) -> Self {
        Self {
            shared: Arc::new(SinkShared {
                sender,
                handle: Mutex::new(Some(handle)),
                failures,
            }),
        }
    }

    /// Hands a record to the writer thread. A sink that was already shut
    /// down counts the record as a failure instead of erroring.
    pub(crate) fn submit(&self, record: Arc<LogRecord>, formatter: Arc<PatternFormatter>) {
        let command = SinkCommand::Record { record, formatter };
        if self.shared.sender.send(command).is_err() {
            self.shared.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of records dropped because of write failures or submission
    /// after shutdown.
    pub fn write_failures(&self) -> u64 {
        self.shared.failures.load(Ordering::Relaxed)
    }

    /// Flushes pending records and joins the writer thread. Idempotent.
    pub fn shutdown(&self) {
        let mut guard = self.shared.handle.lock().unwrap();
        if let Some(handle) = guard.take() {
            let _ = self.shared.sender.send(SinkCommand::Shutdown);
            let _ = handle.join();
        }
    }

    /// True when both handles refer to the same underlying sink.
    pub fn same_as(&self, other: &Sink) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Drop for SinkShared {
    fn drop(&mut self) {
        let handle = self
            .handle
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = self.sender.send(SinkCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;
    use std::io;
    use std::sync::atomic::AtomicUsize;

    struct CountingWriter {
        lines: Arc<AtomicUsize>,
    }

    impl SinkWriter for CountingWriter {
        fn write_line(&mut self, _line: &str) -> io::Result<()> {
            self.lines.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingWriter;

    impl SinkWriter for FailingWriter {
        fn write_line(&mut self, _line: &str) -> io::Result<()> {
            Err(io::Error::other("broken pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record() -> Arc<LogRecord> {
        Arc::new(LogRecord {
            logger: "test".into(),
            severity: Severity::Warning,
            message: "message".into(),
            file: None,
            line: None,
            timestamp: chrono::Utc::now(),
        })
    }

    #[test]
    fn test_submissions_reach_the_writer() {
        let lines = Arc::new(AtomicUsize::new(0));
        let sink = Sink::custom(CountingWriter {
            lines: Arc::clone(&lines),
        });
        let formatter = Arc::new(PatternFormatter::default());
        for _ in 0..5 {
            sink.submit(record(), Arc::clone(&formatter));
        }
        sink.shutdown();
        assert_eq!(lines.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_write_failures_are_counted_not_raised() {
        let sink = Sink::custom(FailingWriter);
        let formatter = Arc::new(PatternFormatter::default());
        sink.submit(record(), Arc::clone(&formatter));
        sink.submit(record(), formatter);
        sink.shutdown();
        assert_eq!(sink.write_failures(), 2);
    }

    #[test]
    fn test_submission_after_shutdown_is_counted() {
        let lines = Arc::new(AtomicUsize::new(0));
        let sink = Sink::custom(CountingWriter {
            lines: Arc::clone(&lines),
        });
        sink.shutdown();
        sink.shutdown(); // idempotent
        sink.submit(record(), Arc::new(PatternFormatter::default()));
        assert_eq!(lines.load(Ordering::Relaxed), 0);
        assert_eq!(sink.write_failures(), 1);
    }

    #[test]
    fn test_clones_share_the_sink() {
        let sink = Sink::console();
        let clone = sink.clone();
        assert!(sink.same_as(&clone));
        assert!(!sink.same_as(&Sink::console()));
    }
}

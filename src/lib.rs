//! # plinth
//! Named loggers with console and file sinks, a monotonic stopwatch and
//! joinable worker threads.
//!
//! ## Logging
//! Loggers live in an explicit [`LogRegistry`] and are looked up by name;
//! repeated lookups return the same logger. Each sink owns a writer
//! thread, so logging never blocks on I/O and writes from any number of
//! threads come out serialized.
//!
//! ```rust
//! use plinth::{LogRegistry, Severity, Sink};
//!
//! let registry = LogRegistry::new();
//! let logger = registry.get_or_create("app", &Sink::console()).unwrap();
//! logger.set_threshold(Severity::Warning);
//! logger.information("suppressed");
//! logger.warning("something worth seeing");
//! registry.shutdown(); // flushes and joins the sink's writer thread
//! ```
//!
//! ## Logging to files
//! The log file is created if it does not exist and appended to if it
//! does. Output is shaped by a pattern (`%s` name, `%t` text, `%p`
//! severity, `%U`/`%u` source location, `%d` timestamp).
//!
//! ```rust
//! use plinth::{LogRegistry, Sink};
//!
//! std::fs::remove_file("/tmp/plinth_doc.log").ok();
//! let registry = LogRegistry::new();
//! let sink = Sink::file("/tmp/plinth_doc.log").unwrap();
//! let logger = registry.get_or_create("files", &sink).unwrap();
//! logger.set_pattern("%s : %t");
//! logger.error("disk low");
//! registry.shutdown(); // flush before reading
//! assert_eq!(
//!     std::fs::read_to_string("/tmp/plinth_doc.log").unwrap(),
//!     "files : disk low\n"
//! );
//! ```
//!
//! ## Measuring elapsed time
//! ```rust
//! use std::time::Duration;
//! use plinth::Stopwatch;
//!
//! let mut watch = Stopwatch::new();
//! watch.start();
//! std::thread::sleep(Duration::from_millis(10));
//! watch.stop();
//! assert!(watch.elapsed() >= Duration::from_millis(10));
//! ```
//!
//! ## Running work on a thread
//! ```rust
//! use plinth::{SharedMutex, Worker};
//!
//! let gate: SharedMutex = Default::default();
//! let mut worker = Worker::new();
//! worker.run_guarded(&gate, || Ok(())).unwrap();
//! let outcome = worker.join().unwrap();
//! assert!(outcome.is_ok());
//! ```

mod config;
mod dispatch;
mod error;
mod format;
mod registry;
mod severity;
mod sink;
mod stopwatch;
mod worker;

pub use config::{PLINTH_CONFIG, PlinthConfig};
pub use dispatch::Sink;
pub use error::{Error, Result};
pub use format::{LogRecord, PatternFormatter};
pub use registry::{LogRegistry, Logger, install_global};
pub use severity::Severity;
pub use sink::{ConsoleWriter, FileWriter, SinkWriter};
pub use stopwatch::Stopwatch;
pub use worker::{SharedMutex, TaskFailure, TaskOutcome, ThreadIdent, Worker, WorkerState};

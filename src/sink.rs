use std::{
    fs::File,
    io::{self, BufWriter, Seek, SeekFrom, Write},
    path::Path,
};

use crate::error::Error;

/// Destination for rendered log lines.
///
/// Implementations are driven from a single writer thread per sink, which
/// serializes all writes; they never need their own locking.
pub trait SinkWriter: Send {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Writes lines to standard output, flushing after every line.
#[derive(Debug, Default)]
pub struct ConsoleWriter;

impl SinkWriter for ConsoleWriter {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// Appends lines to a file, creating it if absent.
pub struct FileWriter {
    file: BufWriter<File>,
}

impl FileWriter {
    /// Opens `path` for appending. Fails with [`Error::SinkOpen`] when the
    /// destination cannot be opened, so an unwritable path surfaces here
    /// and never on a later write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let sink_open = |source| Error::SinkOpen {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(sink_open)?;
        file.seek(SeekFrom::End(0)).map_err(sink_open)?;
        Ok(Self {
            file: BufWriter::new(file),
        })
    }
}

impl SinkWriter for FileWriter {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.file, "{line}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

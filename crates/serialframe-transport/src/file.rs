use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

const READ_BUFFER_CAPACITY: usize = 4 * 1024;

/// Transport over a filesystem path: a serial device node or a capture file.
///
/// Line settings are expected to be configured beforehand (e.g. `stty`).
/// Reads are buffered; writes go straight to the device.
pub struct FileTransport {
    path: PathBuf,
    writable: bool,
    reader: Option<BufReader<File>>,
    writer: Option<File>,
}

impl FileTransport {
    /// Create a read/write transport for `path`. Nothing is opened yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writable: true,
            reader: None,
            writer: None,
        }
    }

    /// Create a read-only transport, e.g. for replaying a capture file.
    pub fn read_only(path: impl AsRef<Path>) -> Self {
        Self {
            writable: false,
            ..Self::new(path)
        }
    }

    /// The path this transport reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&mut self) -> Result<&mut BufReader<File>> {
        self.reader.as_mut().ok_or(TransportError::NotOpen)
    }
}

impl Transport for FileTransport {
    fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(self.writable)
            .open(&self.path)
            .map_err(|e| TransportError::Open {
                path: self.path.clone(),
                source: e,
            })?;

        if self.writable {
            self.writer = Some(file.try_clone()?);
        }
        self.reader = Some(BufReader::with_capacity(READ_BUFFER_CAPACITY, file));

        debug!(path = ?self.path, writable = self.writable, "opened file transport");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        self.writer = None;
        self.reader = None;
        debug!(path = ?self.path, "closed file transport");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reader()?.read(buf).map_err(Into::into)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf).map_err(Into::into),
            None => Err(TransportError::Io(std::io::Error::new(
                ErrorKind::PermissionDenied,
                "transport opened read-only",
            ))),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush().map_err(Into::into),
            None => Ok(()),
        }
    }

    fn try_clone(&self) -> Result<Self> {
        let reader = self.reader.as_ref().ok_or(TransportError::NotOpen)?;
        let file = reader.get_ref().try_clone()?;
        let writer = match &self.writer {
            Some(writer) => Some(writer.try_clone()?),
            None => None,
        };

        Ok(Self {
            path: self.path.clone(),
            writable: self.writable,
            reader: Some(BufReader::with_capacity(READ_BUFFER_CAPACITY, file)),
            writer,
        })
    }
}

impl std::fmt::Debug for FileTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTransport")
            .field("path", &self.path)
            .field("writable", &self.writable)
            .field("open", &self.is_open())
            .finish()
    }
}

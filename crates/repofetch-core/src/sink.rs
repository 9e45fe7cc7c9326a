//! Streaming the response body to the destination file.
//!
//! The sink opens the destination lazily on the first body chunk, once the
//! final status is known. A `206` whose `Content-Range` starts at the resume
//! offset appends after the existing bytes; one that starts at 0 and any `200`
//! truncate and start at 0; any other start is refused. Cancellation is checked
//! before each chunk is written.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::control::CancelToken;
use crate::error::FetchError;

/// What the sink needs from the response head to place the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyHead {
    pub status: u32,
    /// Start offset from `Content-Range`, if the server sent one.
    pub range_start: Option<u64>,
}

impl BodyHead {
    /// Head of a plain full-body reply.
    pub fn full(status: u32) -> Self {
        Self {
            status,
            range_start: None,
        }
    }
}

/// Receives body bytes of a successful (2xx) response.
pub trait BodySink {
    fn write(&mut self, head: BodyHead, chunk: &[u8]) -> Result<(), FetchError>;
}

/// Progress notification, called after every chunk lands on disk.
pub trait ProgressListener: Send + Sync {
    /// `bytes_done` counts the whole file, including a resumed prefix.
    fn on_progress(&self, bytes_done: u64, total: Option<u64>);
}

pub struct FileSink<'a> {
    path: PathBuf,
    resume_from: u64,
    total_hint: Option<u64>,
    cancel: &'a CancelToken,
    progress: Option<&'a dyn ProgressListener>,
    file: Option<File>,
    /// File offset of the first byte this transfer wrote.
    base: u64,
    written: u64,
}

impl<'a> FileSink<'a> {
    pub fn new(
        path: &Path,
        resume_from: u64,
        total_hint: Option<u64>,
        cancel: &'a CancelToken,
        progress: Option<&'a dyn ProgressListener>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            resume_from,
            total_hint,
            cancel,
            progress,
            file: None,
            base: 0,
            written: 0,
        }
    }

    /// Bytes written by this transfer (excludes a resumed prefix).
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Offset the transfer started at: the resume offset, or 0 if the server
    /// ignored the range (or none was requested).
    pub fn base_offset(&self) -> u64 {
        self.base
    }

    /// Make sure the destination reflects a completed 2xx response even when
    /// the body was empty, then flush.
    pub fn finish(&mut self, head: BodyHead) -> Result<(), FetchError> {
        if self.file.is_none() {
            self.open(head)?;
        }
        if let Some(f) = self.file.as_mut() {
            f.flush()?;
        }
        Ok(())
    }

    fn open(&mut self, head: BodyHead) -> Result<(), FetchError> {
        let start = if head.status == 206 {
            // a 206 without Content-Range is taken at its word
            head.range_start.unwrap_or(self.resume_from)
        } else {
            0
        };
        if start != 0 && start != self.resume_from {
            return Err(FetchError::RangeMismatch {
                requested: self.resume_from,
                got: start,
            });
        }

        let file = if self.resume_from > 0 && start == self.resume_from {
            self.base = self.resume_from;
            OpenOptions::new().create(true).append(true).open(&self.path)?
        } else {
            if self.resume_from > 0 {
                tracing::warn!(
                    path = %self.path.display(),
                    status = head.status,
                    "server did not honour Range; rewriting from byte 0"
                );
            }
            self.base = 0;
            File::create(&self.path)?
        };
        self.file = Some(file);
        Ok(())
    }
}

impl BodySink for FileSink<'_> {
    fn write(&mut self, head: BodyHead, chunk: &[u8]) -> Result<(), FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::Interrupted);
        }
        if self.file.is_none() {
            self.open(head)?;
        }
        if let Some(f) = self.file.as_mut() {
            f.write_all(chunk)?;
        }
        self.written += chunk.len() as u64;
        if let Some(p) = self.progress {
            p.on_progress(self.base + self.written, self.total_hint);
        }
        Ok(())
    }
}

//! Non-blocking joystick node reader

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::codec::JS_EVENT_SIZE;
use crate::error::SourceUnavailable;

/// A source of raw joystick frames
///
/// `poll_frame` must never block: with nothing pending it returns `Ok(0)`.
pub trait FrameSource: Send {
    /// Read at most one frame into `buf`, returning the number of bytes read.
    fn poll_frame(&mut self, buf: &mut [u8; JS_EVENT_SIZE]) -> io::Result<usize>;

    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}

/// A `/dev/input/jsN` node opened with `O_NONBLOCK`
#[derive(Debug)]
pub struct JoystickSource {
    file: File,
    path: PathBuf,
}

impl JoystickSource {
    /// Open a joystick node for non-blocking reads
    ///
    /// # Errors
    ///
    /// Returns [`SourceUnavailable`] if the node is missing or not readable.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceUnavailable> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .map_err(|source| SourceUnavailable {
                path: path.clone(),
                source,
            })?;

        debug!("Opened joystick source {}", path.display());
        Ok(Self { file, path })
    }

    /// Path this source was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for JoystickSource {
    fn poll_frame(&mut self, buf: &mut [u8; JS_EVENT_SIZE]) -> io::Result<usize> {
        match self.file.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

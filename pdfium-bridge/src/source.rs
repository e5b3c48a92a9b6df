//! Positional byte sources for documents the engine reads on demand.

use crate::error::{PdfError, Result};
use std::fs::File;
use std::io;

/// A random-access byte source. The engine asks for blocks by file offset.
pub trait BlockSource: Send {
    /// Fill `buf` entirely with the bytes starting at `position`.
    fn read_block(&mut self, position: u64, buf: &mut [u8]) -> io::Result<()>;
}

#[cfg(unix)]
impl BlockSource for File {
    fn read_block(&mut self, position: u64, buf: &mut [u8]) -> io::Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buf, position)
    }
}

#[cfg(not(unix))]
impl BlockSource for File {
    fn read_block(&mut self, position: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::io::{Read, Seek, SeekFrom};
        self.seek(SeekFrom::Start(position))?;
        self.read_exact(buf)
    }
}

/// Reads through a borrowed raw file descriptor with `pread`.
///
/// The descriptor is not closed on drop; the caller that handed it over
/// keeps ownership and must keep it open until the document is closed.
#[cfg(unix)]
#[derive(Debug)]
pub struct FdSource {
    fd: std::os::unix::io::RawFd,
}

#[cfg(unix)]
impl FdSource {
    pub fn new(fd: std::os::unix::io::RawFd) -> Self {
        Self { fd }
    }

    /// Size of the file behind the descriptor.
    pub fn size(&self) -> Result<u64> {
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(self.fd, &mut stat) } < 0 {
            return Err(PdfError::File(io::Error::last_os_error()));
        }
        Ok(stat.st_size as u64)
    }
}

#[cfg(unix)]
impl BlockSource for FdSource {
    fn read_block(&mut self, position: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut filled = 0usize;
        while filled < buf.len() {
            let remaining = &mut buf[filled..];
            let read = unsafe {
                libc::pread(
                    self.fd,
                    remaining.as_mut_ptr() as *mut libc::c_void,
                    remaining.len(),
                    (position + filled as u64) as libc::off_t,
                )
            };
            if read < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if read == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            filled += read as usize;
        }
        Ok(())
    }
}

/// A byte source plus its total length, handed to the engine at open time.
pub struct FileReader {
    source: Box<dyn BlockSource>,
    len: u64,
}

impl FileReader {
    pub fn new(source: Box<dyn BlockSource>, len: u64) -> Self {
        Self { source, len }
    }

    /// Total length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read a block, rejecting requests past the declared length.
    pub fn read_block(&mut self, position: u64, buf: &mut [u8]) -> io::Result<()> {
        let end = position
            .checked_add(buf.len() as u64)
            .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
        if end > self.len {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        self.source.read_block(position, buf)
    }
}

impl std::fmt::Debug for FileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileReader").field("len", &self.len).finish()
    }
}

/// Size of an open file, rejecting empty files.
pub fn file_len(file: &File) -> Result<u64> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Err(PdfError::Io {
            reason: "file is empty".to_string(),
        });
    }
    Ok(len)
}

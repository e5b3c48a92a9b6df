//! Host pixel surfaces and scoped pixel locking.

use std::fmt;

/// Pixel layouts a host surface can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFormat {
    /// 4 bytes per pixel, R G B A in memory.
    Rgba8888,
    /// 2 bytes per pixel, little-endian `rrrrrggg gggbbbbb`.
    Rgb565,
    /// Anything else, carrying the host's format code.
    Other(i32),
}

impl SurfaceFormat {
    /// Bytes per pixel, for formats the renderer can write.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            SurfaceFormat::Rgba8888 => Some(4),
            SurfaceFormat::Rgb565 => Some(2),
            SurfaceFormat::Other(_) => None,
        }
    }
}

/// Geometry of a surface's pixel memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
    /// Bytes per row; may exceed `width * bytes_per_pixel`.
    pub stride: usize,
    pub format: SurfaceFormat,
}

impl SurfaceInfo {
    /// Bytes the pixel memory must hold for this geometry.
    pub fn required_len(&self) -> Option<usize> {
        let bpp = self.format.bytes_per_pixel()?;
        if self.height == 0 {
            return Some(0);
        }
        let row = (self.width as usize).checked_mul(bpp)?;
        if row > self.stride {
            return None;
        }
        self.stride
            .checked_mul(self.height as usize - 1)?
            .checked_add(row)
    }
}

/// Failure obtaining writable pixel memory. These are environment problems,
/// logged by the renderer rather than returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The host object does not back a usable surface.
    Unavailable,
    /// The surface format cannot be rendered into.
    UnsupportedFormat(SurfaceFormat),
    /// Locking failed with a host status code.
    LockFailed(i32),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::Unavailable => write!(f, "surface unavailable"),
            SurfaceError::UnsupportedFormat(format) => {
                write!(f, "unsupported surface format {:?}", format)
            }
            SurfaceError::LockFailed(code) => write!(f, "locking surface failed (status {})", code),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// A host-owned pixel surface: a window buffer or a bitmap.
///
/// Pixel memory is only valid between `lock` and `unlock`; use
/// [`SurfaceLock`] rather than calling them directly.
pub trait PixelSurface {
    fn info(&self) -> Result<SurfaceInfo, SurfaceError>;

    /// Ask the host to switch the buffer format. Window surfaces support this;
    /// bitmaps usually do not.
    fn set_format(&mut self, format: SurfaceFormat) -> Result<(), SurfaceError> {
        Err(SurfaceError::UnsupportedFormat(format))
    }

    fn lock(&mut self) -> Result<(), SurfaceError>;

    /// Pixel memory. Only called while locked.
    fn pixels_mut(&mut self) -> &mut [u8];

    /// Release the lock (and post the buffer, for windows).
    fn unlock(&mut self);
}

/// Scoped lock on a surface's pixel memory; unlocks on drop.
pub struct SurfaceLock<'a, S: PixelSurface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: PixelSurface + ?Sized> SurfaceLock<'a, S> {
    pub fn acquire(surface: &'a mut S) -> Result<Self, SurfaceError> {
        surface.lock()?;
        Ok(Self { surface })
    }

    pub fn pixels(&mut self) -> &mut [u8] {
        self.surface.pixels_mut()
    }
}

impl<S: PixelSurface + ?Sized> Drop for SurfaceLock<'_, S> {
    fn drop(&mut self) {
        self.surface.unlock();
    }
}

/// An in-memory surface backed by a `Vec<u8>`.
///
/// Useful for offscreen rendering and as a reference implementation of
/// [`PixelSurface`].
#[derive(Debug, Clone)]
pub struct MemorySurface {
    info: SurfaceInfo,
    pixels: Vec<u8>,
    locked: bool,
    lock_count: usize,
}

impl MemorySurface {
    /// A zeroed surface with tight rows.
    pub fn new(width: u32, height: u32, format: SurfaceFormat) -> Self {
        let stride = width as usize * format.bytes_per_pixel().unwrap_or(4);
        Self::with_stride(width, height, stride, format)
    }

    /// A zeroed surface with `stride` bytes per row.
    pub fn with_stride(width: u32, height: u32, stride: usize, format: SurfaceFormat) -> Self {
        Self {
            info: SurfaceInfo {
                width,
                height,
                stride,
                format,
            },
            pixels: vec![0; stride * height as usize],
            locked: false,
            lock_count: 0,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// How many times the surface has been locked.
    pub fn lock_count(&self) -> usize {
        self.lock_count
    }

    /// Pixel at (x, y) as raw bytes, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.info.width || y >= self.info.height {
            return None;
        }
        let bpp = self.info.format.bytes_per_pixel().unwrap_or(4);
        let offset = y as usize * self.info.stride + x as usize * bpp;
        self.pixels.get(offset..offset + bpp)
    }
}

impl PixelSurface for MemorySurface {
    fn info(&self) -> Result<SurfaceInfo, SurfaceError> {
        Ok(self.info)
    }

    fn set_format(&mut self, format: SurfaceFormat) -> Result<(), SurfaceError> {
        let bpp = format
            .bytes_per_pixel()
            .ok_or(SurfaceError::UnsupportedFormat(format))?;
        self.info.format = format;
        self.info.stride = self.info.width as usize * bpp;
        self.pixels = vec![0; self.info.stride * self.info.height as usize];
        Ok(())
    }

    fn lock(&mut self) -> Result<(), SurfaceError> {
        if self.locked {
            return Err(SurfaceError::LockFailed(-16));
        }
        self.locked = true;
        self.lock_count += 1;
        Ok(())
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    fn unlock(&mut self) {
        self.locked = false;
    }
}

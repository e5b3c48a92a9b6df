//! Rasterizing pages into host surfaces
//!
//! RGBA8888 surfaces are rendered in place with their own stride. RGB565
//! surfaces get a 24-bit scratch render that is then packed down row by row.
//! Problems with the surface itself (no info, unsupported format, lock
//! failure, short buffer) are logged and the call becomes a no-op; engine
//! failures propagate.

use crate::bridge::Bridge;
use crate::engine::{BitmapFormat, Engine, RenderFlags};
use crate::error::{check, Result};
use crate::geometry::Viewport;
use crate::handle::PageHandle;
use crate::surface::{PixelSurface, SurfaceFormat, SurfaceInfo, SurfaceLock};

/// Pack an 8-bit-per-channel color into RGB565.
#[inline]
pub fn rgb_to_565(red: u8, green: u8, blue: u8) -> u16 {
    ((u16::from(red) >> 3) << 11) | ((u16::from(green) >> 2) << 5) | (u16::from(blue) >> 3)
}

/// Expand an RGB565 value back to 8 bits per channel (low bits zero).
#[inline]
pub fn rgb_from_565(value: u16) -> (u8, u8, u8) {
    let red = ((value >> 11) & 0x1F) as u8;
    let green = ((value >> 5) & 0x3F) as u8;
    let blue = (value & 0x1F) as u8;
    (red << 3, green << 2, blue << 3)
}

/// Convert `height` rows of packed R G B pixels into little-endian RGB565.
///
/// Source and destination advance by their own strides; padding bytes in
/// the destination are left untouched.
pub fn rgb_rows_to_565(
    source: &[u8],
    source_stride: usize,
    dest: &mut [u8],
    dest_stride: usize,
    width: usize,
    height: usize,
) {
    for (src_row, dst_row) in source
        .chunks(source_stride)
        .zip(dest.chunks_mut(dest_stride))
        .take(height)
    {
        for (rgb, out) in src_row
            .chunks_exact(3)
            .zip(dst_row.chunks_exact_mut(2))
            .take(width)
        {
            out.copy_from_slice(&rgb_to_565(rgb[0], rgb[1], rgb[2]).to_le_bytes());
        }
    }
}

/// Area the background fill covers, as `(left, top, width, height)`.
///
/// The origin is clamped to the surface, the extent to the smaller of the
/// surface and the draw size, and the result to the surface edge. `None`
/// when nothing remains.
pub fn background_rect(
    surface_width: i32,
    surface_height: i32,
    viewport: Viewport,
) -> Option<(i32, i32, i32, i32)> {
    let left = viewport.x.max(0);
    let top = viewport.y.max(0);
    let width = surface_width
        .min(viewport.width)
        .min(surface_width - left);
    let height = surface_height
        .min(viewport.height)
        .min(surface_height - top);
    (width > 0 && height > 0).then_some((left, top, width, height))
}

impl<E: Engine> Bridge<E> {
    /// Render into a window-style surface, switching it to RGBA8888 first
    /// when needed. The whole surface is the target bitmap; the page is
    /// drawn into `viewport`.
    pub fn render_page<S: PixelSurface + ?Sized>(
        &self,
        page: PageHandle,
        surface: &mut S,
        viewport: Viewport,
        annotations: bool,
    ) -> Result<()> {
        let registry = self.lock();
        let entry = registry.page(page)?;

        let mut info = match surface.info() {
            Ok(info) => info,
            Err(err) => {
                tracing::error!("Fetching surface info failed: {}", err);
                return Ok(());
            }
        };
        if info.format != SurfaceFormat::Rgba8888 {
            tracing::debug!("Set format to RGBA_8888");
            let switched = surface
                .set_format(SurfaceFormat::Rgba8888)
                .and_then(|()| surface.info());
            info = match switched {
                Ok(info) if info.format == SurfaceFormat::Rgba8888 => info,
                Ok(info) => {
                    tracing::error!("Surface stayed in format {:?}", info.format);
                    return Ok(());
                }
                Err(err) => {
                    tracing::error!("Switching surface to RGBA_8888 failed: {}", err);
                    return Ok(());
                }
            };
        }

        let Some(mut lock) = lock_surface(surface, &info) else {
            return Ok(());
        };
        let flags = self.config().render_flags(annotations);
        draw(
            self.engine(),
            &entry.raw,
            Target {
                pixels: lock.pixels(),
                info: &info,
                format: BitmapFormat::Bgra,
                stride: info.stride,
            },
            viewport,
            None,
            flags,
        )
        .map(|_| ())
    }

    /// Render into a bitmap-style surface in RGBA8888 or RGB565.
    ///
    /// A non-zero ARGB `background` is filled first, clipped to the surface.
    pub fn render_page_bitmap<S: PixelSurface + ?Sized>(
        &self,
        page: PageHandle,
        surface: &mut S,
        viewport: Viewport,
        background: u32,
        annotations: bool,
    ) -> Result<()> {
        let registry = self.lock();
        let entry = registry.page(page)?;

        let info = match surface.info() {
            Ok(info) => info,
            Err(err) => {
                tracing::error!("Fetching bitmap info failed: {}", err);
                return Ok(());
            }
        };
        if !matches!(info.format, SurfaceFormat::Rgba8888 | SurfaceFormat::Rgb565) {
            tracing::error!(
                "Bitmap format must be RGBA_8888 or RGB_565, got {:?}",
                info.format
            );
            return Ok(());
        }

        let Some(mut lock) = lock_surface(surface, &info) else {
            return Ok(());
        };
        let engine = self.engine();
        let flags = self.config().render_flags(annotations);
        let background = (background != 0).then_some(background);

        match info.format {
            SurfaceFormat::Rgb565 => {
                let stride = info.width as usize * BitmapFormat::Bgr.bytes_per_pixel();
                let mut scratch = vec![0u8; stride * info.height as usize];
                let target = Target {
                    pixels: &mut scratch,
                    info: &info,
                    format: BitmapFormat::Bgr,
                    stride,
                };
                if draw(engine, &entry.raw, target, viewport, background, flags)? {
                    rgb_rows_to_565(
                        &scratch,
                        stride,
                        lock.pixels(),
                        info.stride,
                        info.width as usize,
                        info.height as usize,
                    );
                }
            }
            _ => {
                let target = Target {
                    pixels: lock.pixels(),
                    info: &info,
                    format: BitmapFormat::Bgra,
                    stride: info.stride,
                };
                draw(engine, &entry.raw, target, viewport, background, flags)?;
            }
        }
        Ok(())
    }

    /// [`Bridge::render_page_bitmap`] with the configured default background.
    pub fn render_page_bitmap_default<S: PixelSurface + ?Sized>(
        &self,
        page: PageHandle,
        surface: &mut S,
        viewport: Viewport,
        annotations: bool,
    ) -> Result<()> {
        let background = self.config().default_background();
        self.render_page_bitmap(page, surface, viewport, background, annotations)
    }
}

/// Memory the engine renders into.
struct Target<'a> {
    pixels: &'a mut [u8],
    info: &'a SurfaceInfo,
    format: BitmapFormat,
    stride: usize,
}

/// Lock the surface and verify its memory covers the reported geometry.
fn lock_surface<'s, S: PixelSurface + ?Sized>(
    surface: &'s mut S,
    info: &SurfaceInfo,
) -> Option<SurfaceLock<'s, S>> {
    let Some(required) = info.required_len() else {
        tracing::error!("Surface geometry is inconsistent: {:?}", info);
        return None;
    };
    let mut lock = match SurfaceLock::acquire(surface) {
        Ok(lock) => lock,
        Err(err) => {
            tracing::error!("Locking surface failed: {}", err);
            return None;
        }
    };
    let available = lock.pixels().len();
    if available < required {
        tracing::error!(
            available,
            required,
            "Surface buffer is smaller than its geometry"
        );
        return None;
    }
    Some(lock)
}

/// Wrap the target as an engine bitmap, fill the background and render.
///
/// Returns `Ok(false)` when the engine could not wrap the memory.
fn draw<E: Engine>(
    engine: &E,
    page: &E::Page,
    target: Target<'_>,
    viewport: Viewport,
    background: Option<u32>,
    flags: RenderFlags,
) -> Result<bool> {
    let (Ok(width), Ok(height)) = (
        i32::try_from(target.info.width),
        i32::try_from(target.info.height),
    ) else {
        tracing::error!("Surface is too large: {:?}", target.info);
        return Ok(false);
    };

    let bitmap = engine.create_bitmap(width, height, target.format, target.pixels, target.stride);
    check(engine)?;
    let Some(mut bitmap) = bitmap else {
        tracing::error!("Engine could not wrap a {}x{} bitmap", width, height);
        return Ok(false);
    };

    if let Some(color) = background {
        if let Some((left, top, fill_width, fill_height)) = background_rect(width, height, viewport) {
            engine.fill_rect(&mut bitmap, left, top, fill_width, fill_height, color);
            check(engine)?;
        }
    }

    engine.render_page_bitmap(&mut bitmap, page, viewport, 0, flags);
    check(engine)?;
    Ok(true)
}

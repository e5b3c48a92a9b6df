//! # pdfium-bridge
//!
//! A handle-based boundary layer over PDFium, for hosts that hold native
//! resources through opaque numeric handles.
//!
//! - **Reference-counted engine lifecycle**: the engine starts with the first
//!   open document and shuts down after the last one closes
//! - **Typed, generation-checked handles** for documents, pages, text pages,
//!   search sessions, bookmarks and links; stale handles are rejected
//! - **Uniform error translation** from engine status codes to [`PdfError`]
//! - **Rendering** into host RGBA8888 or RGB565 surfaces
//! - **Text search sessions**, outline and link traversal
//!
//! The engine itself sits behind the [`Engine`] trait. Enable the `pdfium`
//! feature for the real backend.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdfium_bridge::{Bridge, MemorySurface, PdfSearchOptions, Size, SurfaceFormat, Viewport};
//! use std::fs::File;
//!
//! let bridge = Bridge::with_pdfium();
//! let doc = bridge.open_file(File::open("document.pdf")?, None)?;
//!
//! // Render the first page
//! let mut size = Size::default();
//! let page = bridge.open_page(doc, 0, &mut size)?;
//! let mut surface = MemorySurface::new(size.width as u32, size.height as u32, SurfaceFormat::Rgba8888);
//! bridge.render_page_bitmap_default(page, &mut surface, Viewport::new(0, 0, size.width, size.height), false)?;
//!
//! // Search its text
//! let text = bridge.load_text_page(page)?;
//! let search = bridge.find_start(text, "keyword", PdfSearchOptions::default(), 0)?;
//! while let Some(m) = bridge.find_next_match(search)? {
//!     println!("match at {} ({} chars)", m.start_index, m.length);
//! }
//!
//! bridge.find_close(search)?;
//! bridge.close_text_page(text)?;
//! bridge.close_page(page)?;
//! bridge.close_document(doc)?;
//! # Ok::<(), pdfium_bridge::PdfError>(())
//! ```

mod bookmark;
mod bridge;
mod config;
mod document;
mod engine;
mod error;
mod geometry;
mod handle;
mod link;
mod page;
#[cfg(feature = "pdfium")]
mod pdfium;
mod registry;
mod render;
mod runtime;
mod search;
mod source;
mod strings;
mod surface;
mod text;

pub use bookmark::PdfBookmark;
pub use bridge::Bridge;
pub use config::{BridgeConfig, WHITE};
pub use document::PdfMetaInfo;
pub use engine::{
    BitmapFormat, Engine, Library, RenderFlags, ERR_FILE, ERR_FORMAT, ERR_PAGE, ERR_PASSWORD,
    ERR_SECURITY, ERR_SUCCESS, ERR_UNKNOWN,
};
pub use error::{check, translate, FailureCategory, PdfError, Result};
pub use geometry::{Point, RectF, Size, Viewport};
pub use handle::{
    kind, BookmarkHandle, DocumentHandle, Handle, HandleKind, HandleTable, LinkHandle,
    PageHandle, SearchHandle, TextPageHandle,
};
pub use link::PdfLink;
#[cfg(feature = "pdfium")]
pub use pdfium::{
    Pdfium, PdfiumAction, PdfiumBitmap, PdfiumBookmark, PdfiumDest, PdfiumDocument, PdfiumLink,
    PdfiumPage, PdfiumSearch, PdfiumTextPage,
};
pub use registry::LiveCounts;
pub use render::{background_rect, rgb_from_565, rgb_rows_to_565, rgb_to_565};
pub use runtime::EngineRuntime;
pub use search::{PdfSearchOptions, SearchMatch, SearchState};
#[cfg(unix)]
pub use source::FdSource;
pub use source::{BlockSource, FileReader};
pub use strings::{decode_utf16, decode_utf16le, WideString};
pub use surface::{MemorySurface, PixelSurface, SurfaceError, SurfaceFormat, SurfaceInfo, SurfaceLock};

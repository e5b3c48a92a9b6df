//! The engine seam: every primitive the bridge consumes from the native
//! PDF engine.
//!
//! [`Library`] covers process-wide init/teardown and the last-error
//! register. [`Engine`] adds document, page, bitmap, outline, link, text
//! and search primitives. Native objects are associated types so a backend
//! can use raw FFI pointers while tests use plain ids.
//!
//! Implementations mirror PDFium's contracts: calling through an object after
//! it was closed is undefined behavior. The registry in
//! [`crate::Bridge`] is what prevents that; engines do not defend against it.

use crate::geometry::{RectF, Viewport};
use crate::source::FileReader;
use crate::strings::WideString;
use bitflags::bitflags;
use std::ffi::CStr;

/// Success.
pub const ERR_SUCCESS: u32 = 0;
/// Unknown error.
pub const ERR_UNKNOWN: u32 = 1;
/// File not found or could not be opened.
pub const ERR_FILE: u32 = 2;
/// File not in PDF format or corrupted.
pub const ERR_FORMAT: u32 = 3;
/// Password required or incorrect password.
pub const ERR_PASSWORD: u32 = 4;
/// Unsupported security scheme.
pub const ERR_SECURITY: u32 = 5;
/// Page not found or content error.
pub const ERR_PAGE: u32 = 6;

bitflags! {
    /// Flags passed to the engine's page rasterizer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u32 {
        /// Include the annotation layer.
        const ANNOT = 0x01;
        /// Text rendering optimized for LCD displays.
        const LCD_TEXT = 0x02;
        /// Emit RGB(A) instead of the engine's native BGR(A).
        const REVERSE_BYTE_ORDER = 0x10;
    }
}

/// Pixel layouts the engine can rasterize into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapFormat {
    /// 3 bytes per pixel.
    Bgr,
    /// 4 bytes per pixel.
    Bgra,
}

impl BitmapFormat {
    /// Get the number of bytes per pixel for this format.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            BitmapFormat::Bgr => 3,
            BitmapFormat::Bgra => 4,
        }
    }
}

/// Process-wide engine lifecycle and error register.
pub trait Library: Send + Sync {
    /// Initialize the engine. Errors are reported through [`Library::last_error`].
    fn init_library(&self);

    /// Tear the engine down.
    fn destroy_library(&self);

    /// The most recent error code (one of the `ERR_*` constants).
    fn last_error(&self) -> u32;
}

/// Primitive operations of the native PDF engine.
///
/// Methods returning `Option` yield `None` where the engine returns a null
/// handle or a false status; the caller then consults the error register.
pub trait Engine: Library {
    type Document: Send;
    type Page: Send;
    type TextPage: Send;
    type Search: Send;
    type Bookmark: Copy + PartialEq + Send;
    type Link: Copy + PartialEq + Send;
    type Dest: Copy;
    type Action: Copy;
    /// An engine bitmap wrapping caller memory. Dropping it releases the
    /// engine object but never the memory.
    type Bitmap<'a>;

    // Documents

    /// Open a document whose bytes are pulled on demand from `reader`.
    /// The returned document owns the reader.
    fn load_custom_document(
        &self,
        reader: FileReader,
        password: Option<&CStr>,
    ) -> Option<Self::Document>;

    /// Open a document from memory. The returned document owns `data`.
    fn load_mem_document(&self, data: Box<[u8]>, password: Option<&CStr>) -> Option<Self::Document>;

    fn close_document(&self, document: Self::Document);

    fn page_count(&self, document: &Self::Document) -> i32;

    /// Page size in points.
    fn page_size_by_index(&self, document: &Self::Document, index: i32) -> Option<(f64, f64)>;

    /// Viewer preference: whether printing should scale the page.
    fn print_scaling(&self, document: &Self::Document) -> bool;

    /// Copy a metadata value as UTF-16LE into `buffer`. Returns the byte
    /// length needed including the two-byte terminator; `buffer` is only
    /// written when large enough.
    fn meta_text(&self, document: &Self::Document, tag: &CStr, buffer: &mut [u8]) -> usize;

    // Pages and rendering

    fn load_page(&self, document: &Self::Document, index: i32) -> Option<Self::Page>;

    fn close_page(&self, page: Self::Page);

    /// Map a page-space point into the given viewport.
    fn page_to_device(
        &self,
        page: &Self::Page,
        viewport: Viewport,
        rotate: i32,
        page_x: f64,
        page_y: f64,
    ) -> Option<(i32, i32)>;

    /// Wrap `pixels` (rows of `stride` bytes) as an engine bitmap.
    fn create_bitmap<'a>(
        &self,
        width: i32,
        height: i32,
        format: BitmapFormat,
        pixels: &'a mut [u8],
        stride: usize,
    ) -> Option<Self::Bitmap<'a>>;

    /// Fill a rectangle with an ARGB color.
    fn fill_rect(
        &self,
        bitmap: &mut Self::Bitmap<'_>,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        color: u32,
    );

    fn render_page_bitmap(
        &self,
        bitmap: &mut Self::Bitmap<'_>,
        page: &Self::Page,
        viewport: Viewport,
        rotate: i32,
        flags: RenderFlags,
    );

    // Outline

    /// First child of `parent`, or the first root entry when `parent` is `None`.
    fn bookmark_first_child(
        &self,
        document: &Self::Document,
        parent: Option<Self::Bookmark>,
    ) -> Option<Self::Bookmark>;

    fn bookmark_next_sibling(
        &self,
        document: &Self::Document,
        bookmark: Self::Bookmark,
    ) -> Option<Self::Bookmark>;

    /// UTF-16LE title, same buffer protocol as [`Engine::meta_text`].
    fn bookmark_title(&self, bookmark: Self::Bookmark, buffer: &mut [u8]) -> usize;

    fn bookmark_dest(&self, document: &Self::Document, bookmark: Self::Bookmark)
        -> Option<Self::Dest>;

    /// Zero-based page index of a destination, or -1.
    fn dest_page_index(&self, document: &Self::Document, dest: Self::Dest) -> i32;

    // Links

    /// Advance the page's link cursor. `position` starts at 0.
    fn link_enumerate(&self, page: &Self::Page, position: &mut i32) -> Option<Self::Link>;

    fn link_dest(&self, document: &Self::Document, link: Self::Link) -> Option<Self::Dest>;

    fn link_action(&self, link: Self::Link) -> Option<Self::Action>;

    /// 7-bit ASCII URI of a URI action, null terminated. Returns the byte
    /// length needed; 0 when the action has no URI.
    fn action_uri_path(
        &self,
        document: &Self::Document,
        action: Self::Action,
        buffer: &mut [u8],
    ) -> usize;

    fn link_annot_rect(&self, link: Self::Link) -> Option<RectF>;

    // Text

    fn text_load_page(&self, page: &Self::Page) -> Option<Self::TextPage>;

    fn text_close_page(&self, text: Self::TextPage);

    fn text_count_chars(&self, text: &Self::TextPage) -> i32;

    /// Copy `count` characters starting at `start` into `buffer` as UTF-16,
    /// followed by a terminator. Returns the number of units written,
    /// including the terminator.
    fn text_get_text(&self, text: &Self::TextPage, start: i32, count: i32, buffer: &mut [u16])
        -> i32;

    /// Count the rectangles covering a character range. Must precede
    /// [`Engine::text_get_rect`].
    fn text_count_rects(&self, text: &Self::TextPage, start: i32, count: i32) -> i32;

    fn text_get_rect(&self, text: &Self::TextPage, index: i32) -> Option<RectF>;

    // Search

    fn find_start(
        &self,
        text: &Self::TextPage,
        query: &WideString,
        flags: u32,
        start_index: i32,
    ) -> Option<Self::Search>;

    fn find_next(&self, search: &mut Self::Search) -> bool;

    fn find_prev(&self, search: &mut Self::Search) -> bool;

    fn search_result_index(&self, search: &Self::Search) -> i32;

    fn search_count(&self, search: &Self::Search) -> i32;

    fn find_close(&self, search: Self::Search);
}

//! PDFium backend for the engine seam.
//!
//! Native pointers are wrapped in small newtypes so they can live in the
//! registry. Nothing here validates handle liveness; [`crate::Bridge`] does.

use crate::engine::{BitmapFormat, Engine, Library, RenderFlags, ERR_SUCCESS, ERR_UNKNOWN};
use crate::geometry::{RectF, Viewport};
use crate::runtime::EngineRuntime;
use crate::source::FileReader;
use crate::strings::WideString;
use pdfium_sys::*;
use std::ffi::{c_void, CStr};
use std::marker::PhantomData;
use std::os::raw::{c_int, c_uchar, c_ulong};
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Process-wide runtime; PDFium keeps global state, so there is only one.
static RUNTIME: OnceLock<Arc<EngineRuntime<Pdfium>>> = OnceLock::new();

/// The PDFium library.
///
/// PDFium reports failures through a global last-error register that only
/// library init and document loads write. `Pdfium` mirrors it: init and
/// loads record the engine code, any other call records success, so the
/// bridge can check the register after every call without seeing stale
/// codes. The mirror is shared by every bridge on the runtime; the runtime
/// serializes their calls.
#[derive(Debug, Default)]
pub struct Pdfium {
    error: AtomicU32,
}

impl Pdfium {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared runtime every PDFium bridge in the process should use.
    pub fn shared_runtime() -> Arc<EngineRuntime<Pdfium>> {
        Arc::clone(RUNTIME.get_or_init(|| Arc::new(EngineRuntime::new(Pdfium::new()))))
    }

    fn succeeded(&self) {
        self.error.store(ERR_SUCCESS, Ordering::SeqCst);
    }

    fn record_load(&self, document: FPDF_DOCUMENT) {
        let code = if document.is_null() {
            match unsafe { FPDF_GetLastError() } as u32 {
                ERR_SUCCESS => ERR_UNKNOWN,
                code => code,
            }
        } else {
            ERR_SUCCESS
        };
        self.error.store(code, Ordering::SeqCst);
    }
}

/// A document plus whatever memory PDFium reads it from.
pub struct PdfiumDocument {
    handle: FPDF_DOCUMENT,
    _source: DocumentSource,
}

enum DocumentSource {
    Custom(Box<CustomAccess>),
    Memory(Box<[u8]>),
}

// SAFETY: PDFium objects are not tied to the creating thread; the bridge
// serializes all calls.
unsafe impl Send for PdfiumDocument {}

/// File access table handed to `FPDF_LoadCustomDocument`, kept boxed so the
/// callback parameter stays put for the life of the document.
struct CustomAccess {
    file_access: FPDF_FILEACCESS,
    reader: FileReader,
}

impl CustomAccess {
    fn new(reader: FileReader) -> Box<Self> {
        let mut access = Box::new(CustomAccess {
            file_access: FPDF_FILEACCESS {
                m_FileLen: reader.len() as c_ulong,
                m_GetBlock: Some(get_block_callback),
                m_Param: ptr::null_mut(),
            },
            reader,
        });
        access.file_access.m_Param = &mut access.reader as *mut FileReader as *mut c_void;
        access
    }
}

/// Callback for reading file data.
unsafe extern "C" fn get_block_callback(
    param: *mut c_void,
    position: c_ulong,
    p_buf: *mut c_uchar,
    size: c_ulong,
) -> c_int {
    if param.is_null() || p_buf.is_null() {
        return 0;
    }
    let reader = &mut *(param as *mut FileReader);
    let buf = std::slice::from_raw_parts_mut(p_buf, size as usize);
    match reader.read_block(position as u64, buf) {
        Ok(()) => 1,
        Err(err) => {
            tracing::error!(position, size, "Reading document block failed: {}", err);
            0
        }
    }
}

macro_rules! send_handle {
    ($(#[$meta:meta])* $name:ident, $raw:ty) => {
        $(#[$meta])*
        pub struct $name($raw);

        // SAFETY: see `PdfiumDocument`.
        unsafe impl Send for $name {}
    };
}

send_handle!(PdfiumPage, FPDF_PAGE);
send_handle!(PdfiumTextPage, FPDF_TEXTPAGE);
send_handle!(PdfiumSearch, FPDF_SCHHANDLE);
send_handle!(
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    PdfiumBookmark,
    FPDF_BOOKMARK
);
send_handle!(
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    PdfiumLink,
    FPDF_LINK
);
send_handle!(
    #[derive(Debug, Clone, Copy)]
    PdfiumDest,
    FPDF_DEST
);
send_handle!(
    #[derive(Debug, Clone, Copy)]
    PdfiumAction,
    FPDF_ACTION
);

/// A PDFium bitmap over borrowed pixel memory.
pub struct PdfiumBitmap<'a> {
    handle: FPDF_BITMAP,
    _pixels: PhantomData<&'a mut [u8]>,
}

impl Drop for PdfiumBitmap<'_> {
    fn drop(&mut self) {
        unsafe {
            FPDFBitmap_Destroy(self.handle);
        }
    }
}

fn non_null<T>(handle: *mut T) -> Option<*mut T> {
    (!handle.is_null()).then_some(handle)
}

fn buffer_parts(buffer: &mut [u8]) -> (*mut c_void, c_ulong) {
    if buffer.is_empty() {
        (ptr::null_mut(), 0)
    } else {
        (buffer.as_mut_ptr() as *mut c_void, buffer.len() as c_ulong)
    }
}

impl Library for Pdfium {
    fn init_library(&self) {
        unsafe { FPDF_InitLibrary() };
        let code = unsafe { FPDF_GetLastError() } as u32;
        self.error.store(code, Ordering::SeqCst);
    }

    fn destroy_library(&self) {
        unsafe { FPDF_DestroyLibrary() };
        self.succeeded();
    }

    fn last_error(&self) -> u32 {
        self.error.load(Ordering::SeqCst)
    }
}

impl Engine for Pdfium {
    type Document = PdfiumDocument;
    type Page = PdfiumPage;
    type TextPage = PdfiumTextPage;
    type Search = PdfiumSearch;
    type Bookmark = PdfiumBookmark;
    type Link = PdfiumLink;
    type Dest = PdfiumDest;
    type Action = PdfiumAction;
    type Bitmap<'a> = PdfiumBitmap<'a>;

    fn load_custom_document(
        &self,
        reader: FileReader,
        password: Option<&CStr>,
    ) -> Option<Self::Document> {
        let mut access = CustomAccess::new(reader);
        let password = password.map_or(ptr::null(), CStr::as_ptr);
        let handle = unsafe { FPDF_LoadCustomDocument(&mut access.file_access, password) };
        self.record_load(handle);
        non_null(handle).map(|handle| PdfiumDocument {
            handle,
            _source: DocumentSource::Custom(access),
        })
    }

    fn load_mem_document(&self, data: Box<[u8]>, password: Option<&CStr>) -> Option<Self::Document> {
        let Ok(size) = c_int::try_from(data.len()) else {
            self.error.store(crate::engine::ERR_FILE, Ordering::SeqCst);
            return None;
        };
        let password = password.map_or(ptr::null(), CStr::as_ptr);
        let handle =
            unsafe { FPDF_LoadMemDocument(data.as_ptr() as *const c_void, size, password) };
        self.record_load(handle);
        non_null(handle).map(|handle| PdfiumDocument {
            handle,
            _source: DocumentSource::Memory(data),
        })
    }

    fn close_document(&self, document: Self::Document) {
        unsafe { FPDF_CloseDocument(document.handle) };
        self.succeeded();
    }

    fn page_count(&self, document: &Self::Document) -> i32 {
        self.succeeded();
        unsafe { FPDF_GetPageCount(document.handle) }
    }

    fn page_size_by_index(&self, document: &Self::Document, index: i32) -> Option<(f64, f64)> {
        self.succeeded();
        let (mut width, mut height) = (0.0, 0.0);
        let ok = unsafe { FPDF_GetPageSizeByIndex(document.handle, index, &mut width, &mut height) };
        (ok != 0).then_some((width, height))
    }

    fn print_scaling(&self, document: &Self::Document) -> bool {
        self.succeeded();
        unsafe { FPDF_VIEWERREF_GetPrintScaling(document.handle) != 0 }
    }

    fn meta_text(&self, document: &Self::Document, tag: &CStr, buffer: &mut [u8]) -> usize {
        self.succeeded();
        let (ptr, len) = buffer_parts(buffer);
        unsafe { FPDF_GetMetaText(document.handle, tag.as_ptr(), ptr, len) as usize }
    }

    fn load_page(&self, document: &Self::Document, index: i32) -> Option<Self::Page> {
        self.succeeded();
        non_null(unsafe { FPDF_LoadPage(document.handle, index) }).map(PdfiumPage)
    }

    fn close_page(&self, page: Self::Page) {
        unsafe { FPDF_ClosePage(page.0) };
        self.succeeded();
    }

    fn page_to_device(
        &self,
        page: &Self::Page,
        viewport: Viewport,
        rotate: i32,
        page_x: f64,
        page_y: f64,
    ) -> Option<(i32, i32)> {
        self.succeeded();
        let (mut x, mut y) = (0, 0);
        let ok = unsafe {
            FPDF_PageToDevice(
                page.0,
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                rotate,
                page_x,
                page_y,
                &mut x,
                &mut y,
            )
        };
        (ok != 0).then_some((x, y))
    }

    fn create_bitmap<'a>(
        &self,
        width: i32,
        height: i32,
        format: BitmapFormat,
        pixels: &'a mut [u8],
        stride: usize,
    ) -> Option<Self::Bitmap<'a>> {
        self.succeeded();
        let row = usize::try_from(width).ok()? * format.bytes_per_pixel();
        let rows = usize::try_from(height).ok()?;
        if rows > 0 && stride * (rows - 1) + row > pixels.len() {
            return None;
        }
        let format = match format {
            BitmapFormat::Bgr => FPDFBitmap_BGR,
            BitmapFormat::Bgra => FPDFBitmap_BGRA,
        };
        let handle = unsafe {
            FPDFBitmap_CreateEx(
                width,
                height,
                format as c_int,
                pixels.as_mut_ptr() as *mut c_void,
                c_int::try_from(stride).ok()?,
            )
        };
        non_null(handle).map(|handle| PdfiumBitmap {
            handle,
            _pixels: PhantomData,
        })
    }

    fn fill_rect(
        &self,
        bitmap: &mut Self::Bitmap<'_>,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        color: u32,
    ) {
        self.succeeded();
        unsafe {
            FPDFBitmap_FillRect(bitmap.handle, left, top, width, height, color as _);
        }
    }

    fn render_page_bitmap(
        &self,
        bitmap: &mut Self::Bitmap<'_>,
        page: &Self::Page,
        viewport: Viewport,
        rotate: i32,
        flags: RenderFlags,
    ) {
        self.succeeded();
        unsafe {
            FPDF_RenderPageBitmap(
                bitmap.handle,
                page.0,
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                rotate,
                flags.bits() as c_int,
            );
        }
    }

    fn bookmark_first_child(
        &self,
        document: &Self::Document,
        parent: Option<Self::Bookmark>,
    ) -> Option<Self::Bookmark> {
        self.succeeded();
        let parent = parent.map_or(ptr::null_mut(), |bookmark| bookmark.0);
        non_null(unsafe { FPDFBookmark_GetFirstChild(document.handle, parent) }).map(PdfiumBookmark)
    }

    fn bookmark_next_sibling(
        &self,
        document: &Self::Document,
        bookmark: Self::Bookmark,
    ) -> Option<Self::Bookmark> {
        self.succeeded();
        non_null(unsafe { FPDFBookmark_GetNextSibling(document.handle, bookmark.0) })
            .map(PdfiumBookmark)
    }

    fn bookmark_title(&self, bookmark: Self::Bookmark, buffer: &mut [u8]) -> usize {
        self.succeeded();
        let (ptr, len) = buffer_parts(buffer);
        unsafe { FPDFBookmark_GetTitle(bookmark.0, ptr, len) as usize }
    }

    fn bookmark_dest(
        &self,
        document: &Self::Document,
        bookmark: Self::Bookmark,
    ) -> Option<Self::Dest> {
        self.succeeded();
        non_null(unsafe { FPDFBookmark_GetDest(document.handle, bookmark.0) }).map(PdfiumDest)
    }

    fn dest_page_index(&self, document: &Self::Document, dest: Self::Dest) -> i32 {
        self.succeeded();
        unsafe { FPDFDest_GetDestPageIndex(document.handle, dest.0) }
    }

    fn link_enumerate(&self, page: &Self::Page, position: &mut i32) -> Option<Self::Link> {
        self.succeeded();
        let mut link: FPDF_LINK = ptr::null_mut();
        let ok = unsafe { FPDFLink_Enumerate(page.0, position, &mut link) };
        if ok == 0 {
            return None;
        }
        non_null(link).map(PdfiumLink)
    }

    fn link_dest(&self, document: &Self::Document, link: Self::Link) -> Option<Self::Dest> {
        self.succeeded();
        non_null(unsafe { FPDFLink_GetDest(document.handle, link.0) }).map(PdfiumDest)
    }

    fn link_action(&self, link: Self::Link) -> Option<Self::Action> {
        self.succeeded();
        non_null(unsafe { FPDFLink_GetAction(link.0) }).map(PdfiumAction)
    }

    fn action_uri_path(
        &self,
        document: &Self::Document,
        action: Self::Action,
        buffer: &mut [u8],
    ) -> usize {
        self.succeeded();
        let (ptr, len) = buffer_parts(buffer);
        unsafe { FPDFAction_GetURIPath(document.handle, action.0, ptr, len) as usize }
    }

    fn link_annot_rect(&self, link: Self::Link) -> Option<RectF> {
        self.succeeded();
        let mut rect = FS_RECTF {
            left: 0.0,
            top: 0.0,
            right: 0.0,
            bottom: 0.0,
        };
        let ok = unsafe { FPDFLink_GetAnnotRect(link.0, &mut rect) };
        (ok != 0).then(|| RectF::new(rect.left, rect.top, rect.right, rect.bottom))
    }

    fn text_load_page(&self, page: &Self::Page) -> Option<Self::TextPage> {
        self.succeeded();
        non_null(unsafe { FPDFText_LoadPage(page.0) }).map(PdfiumTextPage)
    }

    fn text_close_page(&self, text: Self::TextPage) {
        unsafe { FPDFText_ClosePage(text.0) };
        self.succeeded();
    }

    fn text_count_chars(&self, text: &Self::TextPage) -> i32 {
        self.succeeded();
        unsafe { FPDFText_CountChars(text.0) }
    }

    fn text_get_text(
        &self,
        text: &Self::TextPage,
        start: i32,
        count: i32,
        buffer: &mut [u16],
    ) -> i32 {
        self.succeeded();
        // PDFium writes count characters plus a terminator.
        if count < 0 || buffer.len() < count as usize + 1 {
            return 0;
        }
        unsafe { FPDFText_GetText(text.0, start, count, buffer.as_mut_ptr()) }
    }

    fn text_count_rects(&self, text: &Self::TextPage, start: i32, count: i32) -> i32 {
        self.succeeded();
        unsafe { FPDFText_CountRects(text.0, start, count) }
    }

    fn text_get_rect(&self, text: &Self::TextPage, index: i32) -> Option<RectF> {
        self.succeeded();
        let (mut left, mut top, mut right, mut bottom) = (0.0, 0.0, 0.0, 0.0);
        let ok = unsafe {
            FPDFText_GetRect(text.0, index, &mut left, &mut top, &mut right, &mut bottom)
        };
        (ok != 0).then(|| RectF::new(left as f32, top as f32, right as f32, bottom as f32))
    }

    fn find_start(
        &self,
        text: &Self::TextPage,
        query: &WideString,
        flags: u32,
        start_index: i32,
    ) -> Option<Self::Search> {
        self.succeeded();
        non_null(unsafe { FPDFText_FindStart(text.0, query.as_ptr(), flags as _, start_index) })
            .map(PdfiumSearch)
    }

    fn find_next(&self, search: &mut Self::Search) -> bool {
        self.succeeded();
        unsafe { FPDFText_FindNext(search.0) != 0 }
    }

    fn find_prev(&self, search: &mut Self::Search) -> bool {
        self.succeeded();
        unsafe { FPDFText_FindPrev(search.0) != 0 }
    }

    fn search_result_index(&self, search: &Self::Search) -> i32 {
        self.succeeded();
        unsafe { FPDFText_GetSchResultIndex(search.0) }
    }

    fn search_count(&self, search: &Self::Search) -> i32 {
        self.succeeded();
        unsafe { FPDFText_GetSchCount(search.0) }
    }

    fn find_close(&self, search: Self::Search) {
        unsafe { FPDFText_FindClose(search.0) };
        self.succeeded();
    }
}

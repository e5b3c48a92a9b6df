//! Scripted in-memory engine shared by the integration tests.
//!
//! `MockEngine` serves three fixture documents recognized by their leading
//! bytes. It tracks every native object it hands out and panics if the
//! bridge calls it through one that was already released, or while the
//! library is not initialized.

#![allow(dead_code)]

use pdfium_bridge::{
    BitmapFormat, Bridge, BridgeConfig, Engine, EngineRuntime, FileReader, Library,
    MemorySurface, PixelSurface, RectF, RenderFlags, SurfaceError, SurfaceFormat, SurfaceInfo,
    Viewport, WideString, ERR_FILE, ERR_FORMAT, ERR_PAGE, ERR_PASSWORD, ERR_SUCCESS, ERR_UNKNOWN,
};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

pub const STANDARD: &[u8] = b"%PDF-mock standard fixture";
pub const ENCRYPTED: &[u8] = b"%PDF-mock encrypted fixture";
pub const CYCLIC: &[u8] = b"%PDF-mock cyclic outline fixture";
pub const NOT_A_PDF: &[u8] = b"GIF89a definitely not a document";
pub const PASSWORD: &str = "secret";

pub const PAGE_SIZES: [(f64, f64); 3] = [(612.0, 792.0), (595.5, 842.25), (300.0, 400.0)];
pub const PAGE_TEXT: [&str; 3] = [
    "Hello world. The quick brown fox jumps over the lazy dog. Say hello again, HELLO!",
    "Second page text without any greeting.",
    "",
];
pub const BOOKMARKS: [(&str, i32); 2] = [("Introduction", 0), ("Conclusion", 2)];
pub const TITLE: &str = "Mock Document";
pub const AUTHOR: &str = "Bridge Tests";
pub const CREATION_DATE: &str = "D:20240101120000Z";
pub const URI: &str = "https://example.com/docs";

static TRACING: Once = Once::new();

/// Route bridge logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::WARN.into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn new_bridge() -> Bridge<MockEngine> {
    new_bridge_with(BridgeConfig::default())
}

pub fn new_bridge_with(config: BridgeConfig) -> Bridge<MockEngine> {
    init_tracing();
    Bridge::with_config(Arc::new(EngineRuntime::new(MockEngine::new())), config)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    Standard,
    Encrypted,
    Cyclic,
}

impl Fixture {
    fn detect(header: &[u8]) -> Option<Self> {
        let rest = header.strip_prefix(b"%PDF-mock")?;
        let contains = |needle: &[u8]| rest.windows(needle.len()).any(|w| w == needle);
        Some(if contains(b"encrypted") {
            Fixture::Encrypted
        } else if contains(b"cyclic") {
            Fixture::Cyclic
        } else {
            Fixture::Standard
        })
    }
}

// Native objects

pub struct MockDocument {
    id: u64,
    fixture: Fixture,
    _reader: Option<FileReader>,
    _data: Option<Box<[u8]>>,
}

pub struct MockPage {
    id: u64,
    document: u64,
    index: i32,
}

pub struct MockTextPage {
    id: u64,
    page: u64,
    units: Vec<u16>,
    /// Range of the last rect count: (start, count).
    counted: Cell<(i32, i32)>,
}

pub struct MockSearch {
    id: u64,
    text: u64,
    matches: Vec<(i32, i32)>,
    current: Option<usize>,
    /// Where the next uncommitted step starts when there is no current match.
    origin: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockLink {
    page: i32,
    id: u32,
}

pub struct MockBitmap<'a> {
    pixels: &'a mut [u8],
    width: i32,
    height: i32,
    stride: usize,
    format: BitmapFormat,
    live: Arc<AtomicUsize>,
}

impl Drop for MockBitmap<'_> {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

struct LinkFixture {
    id: u32,
    rect: Option<RectF>,
    dest: Option<i32>,
    uri: Option<&'static str>,
}

/// Page 0 carries one internal link, one URI link and three that lead
/// nowhere usable.
fn page_links(page: i32) -> Vec<LinkFixture> {
    if page != 0 {
        return Vec::new();
    }
    vec![
        LinkFixture {
            id: 1,
            rect: Some(RectF::new(72.0, 720.0, 200.0, 700.0)),
            dest: Some(2),
            uri: None,
        },
        LinkFixture {
            id: 2,
            rect: Some(RectF::new(72.0, 680.0, 250.0, 660.0)),
            dest: None,
            uri: Some(URI),
        },
        LinkFixture {
            id: 3,
            rect: Some(RectF::new(72.0, 640.0, 150.0, 620.0)),
            dest: None,
            uri: None,
        },
        LinkFixture {
            id: 4,
            rect: None,
            dest: None,
            uri: Some(URI),
        },
        LinkFixture {
            id: 5,
            rect: Some(RectF::new(72.0, 600.0, 150.0, 580.0)),
            dest: None,
            uri: Some(""),
        },
    ]
}

fn link_fixture(link: MockLink) -> LinkFixture {
    page_links(link.page)
        .into_iter()
        .find(|fixture| fixture.id == link.id)
        .expect("unknown link")
}

/// Rectangle of character `index`: 6pt wide cells on one line.
pub fn char_rect(index: i32) -> RectF {
    let left = 10.0 + 6.0 * index as f32;
    RectF::new(left, 700.0, left + 6.0, 688.0)
}

/// Deterministic page color at an offset inside the render viewport.
pub fn pattern(page: i32, dx: i32, dy: i32) -> (u8, u8, u8) {
    (
        (dx * 7 + page * 40) as u8,
        (dy * 5) as u8,
        ((dx + dy) * 3) as u8,
    )
}

/// Write a UTF-16LE string plus terminator using the engine buffer protocol.
fn write_utf16le(value: &str, buffer: &mut [u8]) -> usize {
    let bytes: Vec<u8> = value
        .encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect();
    if buffer.len() >= bytes.len() {
        buffer[..bytes.len()].copy_from_slice(&bytes);
    }
    bytes.len()
}

/// Open native objects; children map to the id of their owner.
#[derive(Default)]
struct Live {
    documents: HashSet<u64>,
    pages: HashMap<u64, u64>,
    texts: HashMap<u64, u64>,
    searches: HashMap<u64, u64>,
}

impl Live {
    fn owns(children: &HashMap<u64, u64>, owner: u64) -> bool {
        children.values().any(|id| *id == owner)
    }
}

/// In-memory engine with failure injection and call accounting.
#[derive(Default)]
pub struct MockEngine {
    error: AtomicU32,
    calls: AtomicUsize,
    initialized: AtomicBool,
    inits: AtomicUsize,
    destroys: AtomicUsize,
    next_id: AtomicU64,
    live: Mutex<Live>,
    bitmaps: Arc<AtomicUsize>,
    last_flags: Mutex<Option<RenderFlags>>,
    fills: AtomicUsize,
    pub fail_init: AtomicBool,
    pub fail_render: AtomicBool,
    pub refuse_bitmap: AtomicBool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of engine calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn live_documents(&self) -> usize {
        self.live.lock().unwrap().documents.len()
    }

    pub fn live_pages(&self) -> usize {
        self.live.lock().unwrap().pages.len()
    }

    pub fn live_text_pages(&self) -> usize {
        self.live.lock().unwrap().texts.len()
    }

    pub fn live_searches(&self) -> usize {
        self.live.lock().unwrap().searches.len()
    }

    pub fn live_bitmaps(&self) -> usize {
        self.bitmaps.load(Ordering::SeqCst)
    }

    /// Flags of the most recent render.
    pub fn last_flags(&self) -> Option<RenderFlags> {
        *self.last_flags.lock().unwrap()
    }

    /// Number of background fills performed.
    pub fn fills(&self) -> usize {
        self.fills.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        assert!(
            self.initialized.load(Ordering::SeqCst),
            "engine used while not initialized"
        );
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.error.store(ERR_SUCCESS, Ordering::SeqCst);
    }

    fn fail(&self, code: u32) {
        self.error.store(code, Ordering::SeqCst);
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn open(&self, header: &[u8], password: Option<&CStr>) -> Option<(u64, Fixture)> {
        let Some(fixture) = Fixture::detect(header) else {
            self.fail(ERR_FORMAT);
            return None;
        };
        if fixture == Fixture::Encrypted
            && password.map(|p| p.to_bytes()) != Some(PASSWORD.as_bytes())
        {
            self.fail(ERR_PASSWORD);
            return None;
        }
        let id = self.next_id();
        self.live.lock().unwrap().documents.insert(id);
        Some((id, fixture))
    }

    fn assert_document(&self, document: &MockDocument) {
        assert!(
            self.live.lock().unwrap().documents.contains(&document.id),
            "document used after close"
        );
    }

    fn assert_page(&self, page: &MockPage) {
        let live = self.live.lock().unwrap();
        assert!(live.pages.contains_key(&page.id), "page used after close");
        assert!(
            live.documents.contains(&page.document),
            "page used after its document was closed"
        );
    }

    fn assert_text(&self, text: &MockTextPage) {
        let live = self.live.lock().unwrap();
        assert!(live.texts.contains_key(&text.id), "text page used after close");
        assert!(
            live.pages.contains_key(&text.page),
            "text page used after its page was closed"
        );
    }

    fn assert_search(&self, search: &MockSearch) {
        let live = self.live.lock().unwrap();
        assert!(live.searches.contains_key(&search.id), "search used after close");
        assert!(
            live.texts.contains_key(&search.text),
            "search used after its text page was closed"
        );
    }
}

impl Library for MockEngine {
    fn init_library(&self) {
        if self.fail_init.load(Ordering::SeqCst) {
            self.fail(ERR_UNKNOWN);
            return;
        }
        assert!(
            !self.initialized.swap(true, Ordering::SeqCst),
            "library initialized twice"
        );
        self.inits.fetch_add(1, Ordering::SeqCst);
        self.error.store(ERR_SUCCESS, Ordering::SeqCst);
    }

    fn destroy_library(&self) {
        assert!(
            self.initialized.swap(false, Ordering::SeqCst),
            "library destroyed while not initialized"
        );
        assert!(
            self.live.lock().unwrap().documents.is_empty(),
            "library destroyed with open documents"
        );
        self.destroys.fetch_add(1, Ordering::SeqCst);
        self.error.store(ERR_SUCCESS, Ordering::SeqCst);
    }

    fn last_error(&self) -> u32 {
        self.error.load(Ordering::SeqCst)
    }
}

impl Engine for MockEngine {
    type Document = MockDocument;
    type Page = MockPage;
    type TextPage = MockTextPage;
    type Search = MockSearch;
    type Bookmark = u32;
    type Link = MockLink;
    type Dest = i32;
    type Action = u32;
    type Bitmap<'a> = MockBitmap<'a>;

    fn load_custom_document(
        &self,
        mut reader: FileReader,
        password: Option<&CStr>,
    ) -> Option<Self::Document> {
        self.enter();
        let mut header = vec![0u8; reader.len().min(64) as usize];
        if reader.read_block(0, &mut header).is_err() {
            self.fail(ERR_FILE);
            return None;
        }
        let (id, fixture) = self.open(&header, password)?;
        Some(MockDocument {
            id,
            fixture,
            _reader: Some(reader),
            _data: None,
        })
    }

    fn load_mem_document(&self, data: Box<[u8]>, password: Option<&CStr>) -> Option<Self::Document> {
        self.enter();
        let (id, fixture) = self.open(&data, password)?;
        Some(MockDocument {
            id,
            fixture,
            _reader: None,
            _data: Some(data),
        })
    }

    fn close_document(&self, document: Self::Document) {
        self.enter();
        let mut live = self.live.lock().unwrap();
        assert!(live.documents.remove(&document.id), "document closed twice");
        assert!(
            !Live::owns(&live.pages, document.id),
            "document closed with pages still open"
        );
    }

    fn page_count(&self, document: &Self::Document) -> i32 {
        self.enter();
        self.assert_document(document);
        PAGE_SIZES.len() as i32
    }

    fn page_size_by_index(&self, document: &Self::Document, index: i32) -> Option<(f64, f64)> {
        self.enter();
        self.assert_document(document);
        PAGE_SIZES.get(usize::try_from(index).ok()?).copied()
    }

    fn print_scaling(&self, document: &Self::Document) -> bool {
        self.enter();
        self.assert_document(document);
        true
    }

    fn meta_text(&self, document: &Self::Document, tag: &CStr, buffer: &mut [u8]) -> usize {
        self.enter();
        self.assert_document(document);
        let value = match tag.to_bytes() {
            b"Title" => TITLE,
            b"Author" => AUTHOR,
            b"CreationDate" => CREATION_DATE,
            _ => "",
        };
        write_utf16le(value, buffer)
    }

    fn load_page(&self, document: &Self::Document, index: i32) -> Option<Self::Page> {
        self.enter();
        self.assert_document(document);
        if !(0..PAGE_SIZES.len() as i32).contains(&index) {
            return None;
        }
        let id = self.next_id();
        self.live.lock().unwrap().pages.insert(id, document.id);
        Some(MockPage {
            id,
            document: document.id,
            index,
        })
    }

    fn close_page(&self, page: Self::Page) {
        self.enter();
        self.assert_page(&page);
        let mut live = self.live.lock().unwrap();
        live.pages.remove(&page.id);
        assert!(
            !Live::owns(&live.texts, page.id),
            "page closed with text pages still open"
        );
    }

    fn page_to_device(
        &self,
        page: &Self::Page,
        viewport: Viewport,
        _rotate: i32,
        page_x: f64,
        page_y: f64,
    ) -> Option<(i32, i32)> {
        self.enter();
        self.assert_page(page);
        let (width, height) = PAGE_SIZES[page.index as usize];
        let x = f64::from(viewport.x) + page_x * f64::from(viewport.width) / width;
        let y = f64::from(viewport.y) + (height - page_y) * f64::from(viewport.height) / height;
        Some((x.round() as i32, y.round() as i32))
    }

    fn create_bitmap<'a>(
        &self,
        width: i32,
        height: i32,
        format: BitmapFormat,
        pixels: &'a mut [u8],
        stride: usize,
    ) -> Option<Self::Bitmap<'a>> {
        self.enter();
        if self.refuse_bitmap.load(Ordering::SeqCst) {
            return None;
        }
        assert!(width > 0 && height > 0, "empty bitmap");
        assert!(
            stride >= width as usize * format.bytes_per_pixel(),
            "stride narrower than a row"
        );
        assert!(
            pixels.len() >= stride * (height as usize - 1) + width as usize * format.bytes_per_pixel(),
            "bitmap memory too small"
        );
        self.bitmaps.fetch_add(1, Ordering::SeqCst);
        Some(MockBitmap {
            pixels,
            width,
            height,
            stride,
            format,
            live: Arc::clone(&self.bitmaps),
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
        self.enter();
        assert!(
            left >= 0
                && top >= 0
                && width > 0
                && height > 0
                && left + width <= bitmap.width
                && top + height <= bitmap.height,
            "fill ({left}, {top}, {width}, {height}) outside {}x{} bitmap",
            bitmap.width,
            bitmap.height
        );
        self.fills.fetch_add(1, Ordering::SeqCst);
        let [a, r, g, b] = color.to_be_bytes();
        let bpp = bitmap.format.bytes_per_pixel();
        for y in top..top + height {
            for x in left..left + width {
                let offset = y as usize * bitmap.stride + x as usize * bpp;
                let pixel = &mut bitmap.pixels[offset..offset + bpp];
                pixel[..3].copy_from_slice(&[b, g, r]);
                if bpp == 4 {
                    pixel[3] = a;
                }
            }
        }
    }

    fn render_page_bitmap(
        &self,
        bitmap: &mut Self::Bitmap<'_>,
        page: &Self::Page,
        viewport: Viewport,
        _rotate: i32,
        flags: RenderFlags,
    ) {
        self.enter();
        self.assert_page(page);
        *self.last_flags.lock().unwrap() = Some(flags);
        if self.fail_render.load(Ordering::SeqCst) {
            self.fail(ERR_PAGE);
            return;
        }

        let bpp = bitmap.format.bytes_per_pixel();
        let reverse = flags.contains(RenderFlags::REVERSE_BYTE_ORDER);
        let x_range = viewport.x.max(0)..(viewport.x + viewport.width).min(bitmap.width);
        let y_range = viewport.y.max(0)..(viewport.y + viewport.height).min(bitmap.height);
        for y in y_range {
            for x in x_range.clone() {
                let (r, g, b) = pattern(page.index, x - viewport.x, y - viewport.y);
                let offset = y as usize * bitmap.stride + x as usize * bpp;
                let pixel = &mut bitmap.pixels[offset..offset + bpp];
                if reverse {
                    pixel[..3].copy_from_slice(&[r, g, b]);
                } else {
                    pixel[..3].copy_from_slice(&[b, g, r]);
                }
                if bpp == 4 {
                    pixel[3] = 0xFF;
                }
            }
        }
    }

    fn bookmark_first_child(
        &self,
        document: &Self::Document,
        parent: Option<Self::Bookmark>,
    ) -> Option<Self::Bookmark> {
        self.enter();
        self.assert_document(document);
        match parent {
            None => Some(1),
            Some(_) => None,
        }
    }

    fn bookmark_next_sibling(
        &self,
        document: &Self::Document,
        bookmark: Self::Bookmark,
    ) -> Option<Self::Bookmark> {
        self.enter();
        self.assert_document(document);
        match (bookmark, document.fixture) {
            (1, _) => Some(2),
            (2, Fixture::Cyclic) => Some(1),
            _ => None,
        }
    }

    fn bookmark_title(&self, bookmark: Self::Bookmark, buffer: &mut [u8]) -> usize {
        self.enter();
        write_utf16le(BOOKMARKS[bookmark as usize - 1].0, buffer)
    }

    fn bookmark_dest(
        &self,
        document: &Self::Document,
        bookmark: Self::Bookmark,
    ) -> Option<Self::Dest> {
        self.enter();
        self.assert_document(document);
        Some(BOOKMARKS[bookmark as usize - 1].1)
    }

    fn dest_page_index(&self, document: &Self::Document, dest: Self::Dest) -> i32 {
        self.enter();
        self.assert_document(document);
        dest
    }

    fn link_enumerate(&self, page: &Self::Page, position: &mut i32) -> Option<Self::Link> {
        self.enter();
        self.assert_page(page);
        let fixture = page_links(page.index).into_iter().nth(*position as usize)?;
        *position += 1;
        Some(MockLink {
            page: page.index,
            id: fixture.id,
        })
    }

    fn link_dest(&self, document: &Self::Document, link: Self::Link) -> Option<Self::Dest> {
        self.enter();
        self.assert_document(document);
        link_fixture(link).dest
    }

    fn link_action(&self, link: Self::Link) -> Option<Self::Action> {
        self.enter();
        link_fixture(link).uri.map(|_| link.id)
    }

    fn action_uri_path(
        &self,
        document: &Self::Document,
        action: Self::Action,
        buffer: &mut [u8],
    ) -> usize {
        self.enter();
        self.assert_document(document);
        let Some(uri) = link_fixture(MockLink { page: 0, id: action }).uri else {
            return 0;
        };
        let mut bytes = uri.as_bytes().to_vec();
        bytes.push(0);
        if buffer.len() >= bytes.len() {
            buffer[..bytes.len()].copy_from_slice(&bytes);
        }
        bytes.len()
    }

    fn link_annot_rect(&self, link: Self::Link) -> Option<RectF> {
        self.enter();
        link_fixture(link).rect
    }

    fn text_load_page(&self, page: &Self::Page) -> Option<Self::TextPage> {
        self.enter();
        self.assert_page(page);
        let id = self.next_id();
        self.live.lock().unwrap().texts.insert(id, page.id);
        Some(MockTextPage {
            id,
            page: page.id,
            units: PAGE_TEXT[page.index as usize].encode_utf16().collect(),
            counted: Cell::new((0, 0)),
        })
    }

    fn text_close_page(&self, text: Self::TextPage) {
        self.enter();
        self.assert_text(&text);
        let mut live = self.live.lock().unwrap();
        live.texts.remove(&text.id);
        assert!(
            !Live::owns(&live.searches, text.id),
            "text page closed with searches still open"
        );
    }

    fn text_count_chars(&self, text: &Self::TextPage) -> i32 {
        self.enter();
        self.assert_text(text);
        text.units.len() as i32
    }

    fn text_get_text(
        &self,
        text: &Self::TextPage,
        start: i32,
        count: i32,
        buffer: &mut [u16],
    ) -> i32 {
        self.enter();
        self.assert_text(text);
        assert!(
            buffer.len() <= text.units.len() + 1,
            "text buffer larger than the page"
        );
        let len = text.units.len() as i32;
        if start < 0 || start >= len || count < 0 {
            return 0;
        }
        let end = start.saturating_add(count).min(len);
        let chars = &text.units[start as usize..end as usize];
        assert!(buffer.len() > chars.len(), "text buffer too small");
        buffer[..chars.len()].copy_from_slice(chars);
        buffer[chars.len()] = 0;
        chars.len() as i32 + 1
    }

    fn text_count_rects(&self, text: &Self::TextPage, start: i32, count: i32) -> i32 {
        self.enter();
        self.assert_text(text);
        let len = text.units.len() as i32;
        if start < 0 || start >= len {
            text.counted.set((0, 0));
            return 0;
        }
        let end = if count < 0 { len } else { (start + count).min(len) };
        text.counted.set((start, end - start));
        end - start
    }

    fn text_get_rect(&self, text: &Self::TextPage, index: i32) -> Option<RectF> {
        self.enter();
        self.assert_text(text);
        let (start, count) = text.counted.get();
        (0..count).contains(&index).then(|| char_rect(start + index))
    }

    fn find_start(
        &self,
        text: &Self::TextPage,
        query: &WideString,
        flags: u32,
        start_index: i32,
    ) -> Option<Self::Search> {
        self.enter();
        self.assert_text(text);
        let units = query.as_units();
        assert_eq!(units.last(), Some(&0), "query is not terminated");
        let needle: Vec<u16> = units[..units.len() - 1]
            .iter()
            .map(|unit| u16::from_le(*unit))
            .collect();
        if needle.is_empty() {
            return None;
        }

        let match_case = flags & 0x1 != 0;
        let whole_word = flags & 0x2 != 0;
        let fold = |unit: u16| {
            if match_case {
                unit
            } else {
                char::from_u32(u32::from(unit))
                    .map(|c| c.to_ascii_lowercase() as u16)
                    .unwrap_or(unit)
            }
        };
        let is_word = |unit: u16| {
            char::from_u32(u32::from(unit)).is_some_and(char::is_alphanumeric)
        };

        let haystack = &text.units;
        let mut matches = Vec::new();
        let mut at = 0;
        while at + needle.len() <= haystack.len() {
            let window = &haystack[at..at + needle.len()];
            let hit = window.iter().zip(&needle).all(|(a, b)| fold(*a) == fold(*b));
            let bounded = !whole_word
                || ((at == 0 || !is_word(haystack[at - 1]))
                    && haystack
                        .get(at + needle.len())
                        .map_or(true, |next| !is_word(*next)));
            if hit && bounded {
                matches.push((at as i32, needle.len() as i32));
                at += needle.len();
            } else {
                at += 1;
            }
        }

        let id = self.next_id();
        self.live.lock().unwrap().searches.insert(id, text.id);
        Some(MockSearch {
            id,
            text: text.id,
            matches,
            current: None,
            origin: if start_index < 0 {
                haystack.len() as i32
            } else {
                start_index
            },
        })
    }

    fn find_next(&self, search: &mut Self::Search) -> bool {
        self.enter();
        self.assert_search(search);
        let next = match search.current {
            Some(current) => current + 1,
            None => search
                .matches
                .iter()
                .position(|(start, _)| *start >= search.origin)
                .unwrap_or(search.matches.len()),
        };
        if next < search.matches.len() {
            search.current = Some(next);
            true
        } else {
            search.current = None;
            search.origin = i32::MAX;
            false
        }
    }

    fn find_prev(&self, search: &mut Self::Search) -> bool {
        self.enter();
        self.assert_search(search);
        let prev = match search.current {
            Some(current) => current.checked_sub(1),
            None => search
                .matches
                .iter()
                .rposition(|(start, _)| *start < search.origin),
        };
        match prev {
            Some(prev) => {
                search.current = Some(prev);
                true
            }
            None => {
                search.current = None;
                search.origin = 0;
                false
            }
        }
    }

    fn search_result_index(&self, search: &Self::Search) -> i32 {
        self.enter();
        self.assert_search(search);
        search.current.map_or(-1, |current| search.matches[current].0)
    }

    fn search_count(&self, search: &Self::Search) -> i32 {
        self.enter();
        self.assert_search(search);
        search.current.map_or(0, |current| search.matches[current].1)
    }

    fn find_close(&self, search: Self::Search) {
        self.enter();
        self.assert_search(&search);
        self.live.lock().unwrap().searches.remove(&search.id);
    }
}

/// How a [`ScriptedSurface`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFault {
    Healthy,
    InfoFails,
    LockFails,
    /// Reports more rows than its memory holds.
    ShortBuffer,
    /// Ignores format change requests.
    StuckFormat,
}

/// A host surface wrapper that can fail on demand and counts lock traffic.
pub struct ScriptedSurface {
    pub inner: MemorySurface,
    pub fault: SurfaceFault,
    pub locks: usize,
    pub unlocks: usize,
}

impl ScriptedSurface {
    pub fn new(inner: MemorySurface, fault: SurfaceFault) -> Self {
        Self {
            inner,
            fault,
            locks: 0,
            unlocks: 0,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.locks == self.unlocks
    }
}

impl PixelSurface for ScriptedSurface {
    fn info(&self) -> Result<SurfaceInfo, SurfaceError> {
        let mut info = self.inner.info()?;
        match self.fault {
            SurfaceFault::InfoFails => Err(SurfaceError::Unavailable),
            SurfaceFault::ShortBuffer => {
                info.height += 4;
                Ok(info)
            }
            _ => Ok(info),
        }
    }

    fn set_format(&mut self, format: SurfaceFormat) -> Result<(), SurfaceError> {
        if self.fault == SurfaceFault::StuckFormat {
            return Ok(());
        }
        self.inner.set_format(format)
    }

    fn lock(&mut self) -> Result<(), SurfaceError> {
        if self.fault == SurfaceFault::LockFails {
            return Err(SurfaceError::LockFailed(-22));
        }
        self.inner.lock()?;
        self.locks += 1;
        Ok(())
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        self.inner.pixels_mut()
    }

    fn unlock(&mut self) {
        self.unlocks += 1;
        self.inner.unlock();
    }
}

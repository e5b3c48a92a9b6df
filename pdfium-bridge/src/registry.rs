//! Live native resources of one bridge, keyed by handle.
//!
//! Each entry records its owner. Closing an owner closes everything it
//! owns in the engine and leaves a tombstone for each of those handles, so
//! they resolve to `InvalidHandle` naming the closed owner until the caller
//! closes them.

use crate::engine::Engine;
use crate::error::{PdfError, Result};
use crate::geometry::Size;
use crate::handle::{
    kind, BookmarkHandle, DocumentHandle, HandleKind, HandleTable, LinkHandle, PageHandle,
    SearchHandle, TextPageHandle,
};
use crate::search::SearchState;
use std::collections::HashSet;

pub(crate) struct DocumentEntry<E: Engine> {
    pub raw: E::Document,
    /// Outline entries already handed out, so repeated traversal reuses handles.
    pub bookmarks: Vec<(E::Bookmark, BookmarkHandle)>,
}

pub(crate) struct PageEntry<E: Engine> {
    pub raw: E::Page,
    pub document: DocumentHandle,
    pub index: i32,
    pub size: Size,
    pub links: Vec<LinkHandle>,
}

pub(crate) struct TextPageEntry<E: Engine> {
    pub raw: E::TextPage,
    pub page: PageHandle,
    /// Result of the last rect count; `text_get_rect` is bounded by it.
    pub rect_count: Option<i32>,
}

pub(crate) struct SearchEntry<E: Engine> {
    pub raw: E::Search,
    pub text: TextPageHandle,
    pub query: String,
    pub state: SearchState,
}

pub(crate) struct BookmarkEntry<E: Engine> {
    pub raw: E::Bookmark,
    pub document: DocumentHandle,
}

pub(crate) struct LinkEntry<E: Engine> {
    pub raw: E::Link,
    pub page: PageHandle,
}

/// Handles whose owner was closed before them.
#[derive(Default)]
pub(crate) struct Orphans {
    pub pages: HashSet<PageHandle>,
    pub texts: HashSet<TextPageHandle>,
    pub searches: HashSet<SearchHandle>,
}

/// Native objects taken out of the registry, closed children first.
pub(crate) struct Detached<E: Engine> {
    searches: Vec<E::Search>,
    texts: Vec<E::TextPage>,
    pages: Vec<E::Page>,
}

impl<E: Engine> Detached<E> {
    fn new() -> Self {
        Self {
            searches: Vec::new(),
            texts: Vec::new(),
            pages: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.searches.is_empty() && self.texts.is_empty() && self.pages.is_empty()
    }

    pub fn close(self, engine: &E) {
        for search in self.searches {
            engine.find_close(search);
        }
        for text in self.texts {
            engine.text_close_page(text);
        }
        for page in self.pages {
            engine.close_page(page);
        }
    }
}

pub(crate) struct Registry<E: Engine> {
    pub documents: HandleTable<kind::Document, DocumentEntry<E>>,
    pub pages: HandleTable<kind::Page, PageEntry<E>>,
    pub texts: HandleTable<kind::TextPage, TextPageEntry<E>>,
    pub searches: HandleTable<kind::Search, SearchEntry<E>>,
    pub bookmarks: HandleTable<kind::Bookmark, BookmarkEntry<E>>,
    pub links: HandleTable<kind::Link, LinkEntry<E>>,
    pub orphans: Orphans,
}

fn missing<K: HandleKind>() -> PdfError {
    PdfError::invalid_handle(K::NAME)
}

impl<E: Engine> Registry<E> {
    pub fn new() -> Self {
        Self {
            documents: HandleTable::new(),
            pages: HandleTable::new(),
            texts: HandleTable::new(),
            searches: HandleTable::new(),
            bookmarks: HandleTable::new(),
            links: HandleTable::new(),
            orphans: Orphans::default(),
        }
    }

    pub fn document(&self, handle: DocumentHandle) -> Result<&DocumentEntry<E>> {
        self.documents.get(handle).ok_or_else(missing::<kind::Document>)
    }

    /// A page whose document is still open.
    pub fn page(&self, handle: PageHandle) -> Result<&PageEntry<E>> {
        match self.pages.get(handle) {
            Some(page) => {
                self.document(page.document)?;
                Ok(page)
            }
            None if self.orphans.pages.contains(&handle) => Err(missing::<kind::Document>()),
            None => Err(missing::<kind::Page>()),
        }
    }

    /// A text page whose page and document are still open.
    pub fn text(&self, handle: TextPageHandle) -> Result<&TextPageEntry<E>> {
        match self.texts.get(handle) {
            Some(text) => {
                self.page(text.page)?;
                Ok(text)
            }
            None if self.orphans.texts.contains(&handle) => Err(missing::<kind::Page>()),
            None => Err(missing::<kind::TextPage>()),
        }
    }

    pub fn text_mut(&mut self, handle: TextPageHandle) -> Result<&mut TextPageEntry<E>> {
        self.text(handle)?;
        self.texts.get_mut(handle).ok_or_else(missing::<kind::TextPage>)
    }

    /// A search session whose whole owner chain is still open.
    pub fn search(&self, handle: SearchHandle) -> Result<&SearchEntry<E>> {
        match self.searches.get(handle) {
            Some(search) => {
                self.text(search.text)?;
                Ok(search)
            }
            None if self.orphans.searches.contains(&handle) => Err(missing::<kind::TextPage>()),
            None => Err(missing::<kind::Search>()),
        }
    }

    pub fn search_mut(&mut self, handle: SearchHandle) -> Result<&mut SearchEntry<E>> {
        self.search(handle)?;
        self.searches.get_mut(handle).ok_or_else(missing::<kind::Search>)
    }

    /// An outline entry of `document`.
    pub fn bookmark(
        &self,
        document: DocumentHandle,
        handle: BookmarkHandle,
    ) -> Result<E::Bookmark> {
        self.document(document)?;
        match self.bookmarks.get(handle) {
            Some(entry) if entry.document == document => Ok(entry.raw),
            _ => Err(missing::<kind::Bookmark>()),
        }
    }

    /// An outline entry together with its owning document.
    pub fn bookmark_any(&self, handle: BookmarkHandle) -> Result<(E::Bookmark, DocumentHandle)> {
        let entry = self.bookmarks.get(handle).ok_or_else(missing::<kind::Bookmark>)?;
        self.document(entry.document)?;
        Ok((entry.raw, entry.document))
    }

    /// A link whose page is still open.
    pub fn link(&self, handle: LinkHandle) -> Result<&LinkEntry<E>> {
        let link = self.links.get(handle).ok_or_else(missing::<kind::Link>)?;
        self.page(link.page)?;
        Ok(link)
    }

    /// Issue (or reuse) the handle for an outline entry of `document`.
    pub fn intern_bookmark(
        &mut self,
        document: DocumentHandle,
        raw: E::Bookmark,
    ) -> Result<BookmarkHandle> {
        let entry = self
            .documents
            .get(document)
            .ok_or_else(missing::<kind::Document>)?;
        if let Some((_, handle)) = entry.bookmarks.iter().find(|(known, _)| *known == raw) {
            return Ok(*handle);
        }
        let handle = self.bookmarks.insert(BookmarkEntry { raw, document });
        if let Some(entry) = self.documents.get_mut(document) {
            entry.bookmarks.push((raw, handle));
        }
        Ok(handle)
    }

    /// Issue (or reuse) the handle for a link of `page`.
    pub fn intern_link(&mut self, page: PageHandle, raw: E::Link) -> Result<LinkHandle> {
        let entry = self.pages.get(page).ok_or_else(missing::<kind::Page>)?;
        let known = entry
            .links
            .iter()
            .find(|handle| self.links.get(**handle).is_some_and(|link| link.raw == raw));
        if let Some(handle) = known {
            return Ok(*handle);
        }
        let handle = self.links.insert(LinkEntry { raw, page });
        if let Some(entry) = self.pages.get_mut(page) {
            entry.links.push(handle);
        }
        Ok(handle)
    }

    /// Invalidate the links a page handed out.
    pub fn forget_links(&mut self, links: &[LinkHandle]) {
        for link in links {
            self.links.remove(*link);
        }
    }

    /// Invalidate the outline entries a document handed out.
    pub fn forget_bookmarks(&mut self, bookmarks: &[(E::Bookmark, BookmarkHandle)]) {
        for (_, bookmark) in bookmarks {
            self.bookmarks.remove(*bookmark);
        }
    }

    /// Take out the search sessions of `text`, leaving tombstones.
    pub fn detach_text(&mut self, text: TextPageHandle) -> Detached<E> {
        let mut detached = Detached::new();
        self.detach_searches_of(text, &mut detached);
        detached
    }

    /// Take out the text pages and search sessions of `page`, leaving tombstones.
    pub fn detach_page(&mut self, page: PageHandle) -> Detached<E> {
        let mut detached = Detached::new();
        self.detach_texts_of(page, &mut detached);
        detached
    }

    /// Take out everything opened on `document`, leaving tombstones. Links of
    /// its pages are forgotten.
    pub fn detach_document(&mut self, document: DocumentHandle) -> Detached<E> {
        let mut detached = Detached::new();
        for handle in self.pages.handles() {
            if !self.pages.get(handle).is_some_and(|page| page.document == document) {
                continue;
            }
            self.detach_texts_of(handle, &mut detached);
            if let Some(entry) = self.pages.remove(handle) {
                self.forget_links(&entry.links);
                self.orphans.pages.insert(handle);
                detached.pages.push(entry.raw);
            }
        }
        detached
    }

    fn detach_texts_of(&mut self, page: PageHandle, detached: &mut Detached<E>) {
        for handle in self.texts.handles() {
            if !self.texts.get(handle).is_some_and(|text| text.page == page) {
                continue;
            }
            self.detach_searches_of(handle, detached);
            if let Some(entry) = self.texts.remove(handle) {
                self.orphans.texts.insert(handle);
                detached.texts.push(entry.raw);
            }
        }
    }

    fn detach_searches_of(&mut self, text: TextPageHandle, detached: &mut Detached<E>) {
        for handle in self.searches.handles() {
            if !self.searches.get(handle).is_some_and(|search| search.text == text) {
                continue;
            }
            if let Some(entry) = self.searches.remove(handle) {
                self.orphans.searches.insert(handle);
                detached.searches.push(entry.raw);
            }
        }
    }

    /// Count of live resources of every kind, for diagnostics and tests.
    pub fn live_counts(&self) -> LiveCounts {
        LiveCounts {
            documents: self.documents.len(),
            pages: self.pages.len(),
            text_pages: self.texts.len(),
            searches: self.searches.len(),
            bookmarks: self.bookmarks.len(),
            links: self.links.len(),
        }
    }
}

/// Number of live handles per resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveCounts {
    pub documents: usize,
    pub pages: usize,
    pub text_pages: usize,
    pub searches: usize,
    pub bookmarks: usize,
    pub links: usize,
}

impl LiveCounts {
    /// Whether every handle has been released.
    pub fn is_empty(&self) -> bool {
        *self == LiveCounts::default()
    }
}

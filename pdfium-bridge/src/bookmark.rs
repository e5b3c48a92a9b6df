//! Document outline (bookmark) traversal.
//!
//! The engine exposes the outline as first-child/next-sibling links.
//! Handles for outline entries belong to their document: the same entry
//! always yields the same handle, and all of them stop resolving once the
//! document is closed.

use crate::bridge::{fetch_buffer, Bridge};
use crate::engine::Engine;
use crate::error::{check, Result};
use crate::handle::{BookmarkHandle, DocumentHandle};
use crate::registry::Registry;
use crate::strings::decode_utf16le;
use std::collections::HashSet;

/// An outline entry with its resolved title, target page and children.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfBookmark {
    pub handle: BookmarkHandle,
    pub title: String,
    /// Zero-based target page, if the entry has a destination.
    pub page_index: Option<i32>,
    pub children: Vec<PdfBookmark>,
}

impl PdfBookmark {
    /// Number of entries in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(PdfBookmark::subtree_len).sum::<usize>()
    }
}

impl<E: Engine> Bridge<E> {
    /// First child of `parent`, or the first top-level entry when `parent`
    /// is `None`.
    pub fn first_child_bookmark(
        &self,
        document: DocumentHandle,
        parent: Option<BookmarkHandle>,
    ) -> Result<Option<BookmarkHandle>> {
        let mut registry = self.lock();
        let parent = parent
            .map(|handle| registry.bookmark(document, handle))
            .transpose()?;
        first_child(self.engine(), &mut *registry, document, parent)
    }

    pub fn next_sibling_bookmark(
        &self,
        document: DocumentHandle,
        bookmark: BookmarkHandle,
    ) -> Result<Option<BookmarkHandle>> {
        let mut registry = self.lock();
        let raw = registry.bookmark(document, bookmark)?;
        next_sibling(self.engine(), &mut *registry, document, raw)
    }

    pub fn bookmark_title(&self, bookmark: BookmarkHandle) -> Result<String> {
        let registry = self.lock();
        let (raw, _) = registry.bookmark_any(bookmark)?;
        title(self.engine(), raw)
    }

    /// Zero-based page the entry points at, or `None` without a destination.
    pub fn bookmark_dest_index(
        &self,
        document: DocumentHandle,
        bookmark: BookmarkHandle,
    ) -> Result<Option<i32>> {
        let registry = self.lock();
        let raw = registry.bookmark(document, bookmark)?;
        let doc = registry.document(document)?;
        dest_index(self.engine(), &doc.raw, raw)
    }

    /// The whole outline as a tree.
    pub fn bookmarks(&self, document: DocumentHandle) -> Result<Vec<PdfBookmark>> {
        let mut registry = self.lock();
        let mut seen = HashSet::new();
        collect(self.engine(), &mut *registry, document, None, &mut seen)
    }
}

fn first_child<E: Engine>(
    engine: &E,
    registry: &mut Registry<E>,
    document: DocumentHandle,
    parent: Option<E::Bookmark>,
) -> Result<Option<BookmarkHandle>> {
    let raw = {
        let doc = registry.document(document)?;
        let raw = engine.bookmark_first_child(&doc.raw, parent);
        check(engine)?;
        raw
    };
    raw.map(|raw| registry.intern_bookmark(document, raw))
        .transpose()
}

fn next_sibling<E: Engine>(
    engine: &E,
    registry: &mut Registry<E>,
    document: DocumentHandle,
    bookmark: E::Bookmark,
) -> Result<Option<BookmarkHandle>> {
    let raw = {
        let doc = registry.document(document)?;
        let raw = engine.bookmark_next_sibling(&doc.raw, bookmark);
        check(engine)?;
        raw
    };
    raw.map(|raw| registry.intern_bookmark(document, raw))
        .transpose()
}

fn title<E: Engine>(engine: &E, bookmark: E::Bookmark) -> Result<String> {
    let bytes = fetch_buffer(engine, |buffer| engine.bookmark_title(bookmark, buffer))?;
    decode_utf16le(&bytes)
}

fn dest_index<E: Engine>(
    engine: &E,
    document: &E::Document,
    bookmark: E::Bookmark,
) -> Result<Option<i32>> {
    let dest = engine.bookmark_dest(document, bookmark);
    check(engine)?;
    let Some(dest) = dest else {
        return Ok(None);
    };
    let index = engine.dest_page_index(document, dest);
    check(engine)?;
    Ok((index >= 0).then_some(index))
}

fn collect<E: Engine>(
    engine: &E,
    registry: &mut Registry<E>,
    document: DocumentHandle,
    parent: Option<E::Bookmark>,
    seen: &mut HashSet<BookmarkHandle>,
) -> Result<Vec<PdfBookmark>> {
    let mut entries = Vec::new();
    let mut next = first_child(engine, registry, document, parent)?;

    while let Some(handle) = next {
        // Malformed outlines can loop back on themselves.
        if !seen.insert(handle) {
            tracing::warn!(?handle, "Outline cycle detected, stopping traversal");
            break;
        }
        let raw = registry.bookmark(document, handle)?;
        let title = title(engine, raw)?;
        let page_index = dest_index(engine, &registry.document(document)?.raw, raw)?;
        let children = collect(engine, registry, document, Some(raw), seen)?;
        entries.push(PdfBookmark {
            handle,
            title,
            page_index,
            children,
        });
        next = next_sibling(engine, registry, document, raw)?;
    }

    Ok(entries)
}

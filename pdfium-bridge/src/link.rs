//! Link annotations of a page: enumeration, targets and hit areas.

use crate::bridge::{fetch_buffer, Bridge};
use crate::engine::Engine;
use crate::error::{check, PdfError, Result};
use crate::geometry::RectF;
use crate::handle::{DocumentHandle, LinkHandle, PageHandle};
use crate::registry::{DocumentEntry, Registry};
use crate::strings::decode_ascii;

/// A link resolved to its hit area and target.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLink {
    pub handle: LinkHandle,
    /// Annotation rectangle in page coordinates.
    pub bounds: RectF,
    /// Zero-based target page for internal links.
    pub dest_page_index: Option<i32>,
    /// Target URI for external links.
    pub uri: Option<String>,
}

impl<E: Engine> Bridge<E> {
    /// Enumerate the page's link annotations in order.
    pub fn page_links(&self, page: PageHandle) -> Result<Vec<LinkHandle>> {
        let mut registry = self.lock();
        let engine = self.engine();

        let raws = {
            let entry = registry.page(page)?;
            let mut position = 0;
            let mut raws = Vec::new();
            while let Some(link) = engine.link_enumerate(&entry.raw, &mut position) {
                raws.push(link);
            }
            check(engine)?;
            raws
        };

        raws.into_iter()
            .map(|raw| registry.intern_link(page, raw))
            .collect()
    }

    /// Zero-based target page of an internal link, or `None`.
    pub fn link_dest_page_index(
        &self,
        document: DocumentHandle,
        link: LinkHandle,
    ) -> Result<Option<i32>> {
        let registry = self.lock();
        let (raw, doc) = link_of(&*registry, document, link)?;
        dest_page_index(self.engine(), doc, raw)
    }

    /// Target URI of an external link, or `None`.
    pub fn link_uri(&self, document: DocumentHandle, link: LinkHandle) -> Result<Option<String>> {
        let registry = self.lock();
        let (raw, doc) = link_of(&*registry, document, link)?;
        uri(self.engine(), doc, raw)
    }

    /// Write the link's annotation rectangle into `out`. Returns `false`
    /// (leaving `out` untouched) when the link has none.
    pub fn link_rect(&self, link: LinkHandle, out: &mut RectF) -> Result<bool> {
        let registry = self.lock();
        let entry = registry.link(link)?;
        match annot_rect(self.engine(), entry.raw)? {
            Some(rect) => {
                *out = rect;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Every link on the page that has a hit area and leads somewhere.
    pub fn links(&self, document: DocumentHandle, page: PageHandle) -> Result<Vec<PdfLink>> {
        {
            let registry = self.lock();
            if registry.page(page)?.document != document {
                return Err(PdfError::InvalidHandle { kind: "page" });
            }
        }
        let handles = self.page_links(page)?;

        let registry = self.lock();
        let engine = self.engine();
        let mut links = Vec::with_capacity(handles.len());
        for handle in handles {
            let (raw, doc) = link_of(&*registry, document, handle)?;
            let Some(bounds) = annot_rect(engine, raw)? else {
                continue;
            };
            let dest_page_index = dest_page_index(engine, doc, raw)?;
            let uri = uri(engine, doc, raw)?;
            if dest_page_index.is_none() && uri.is_none() {
                continue;
            }
            links.push(PdfLink {
                handle,
                bounds,
                dest_page_index,
                uri,
            });
        }
        Ok(links)
    }
}

/// Resolve a link that must belong to a page of `document`.
fn link_of<'r, E: Engine>(
    registry: &'r Registry<E>,
    document: DocumentHandle,
    link: LinkHandle,
) -> Result<(E::Link, &'r DocumentEntry<E>)> {
    let entry = registry.link(link)?;
    if registry.page(entry.page)?.document != document {
        return Err(PdfError::InvalidHandle { kind: "link" });
    }
    Ok((entry.raw, registry.document(document)?))
}

fn dest_page_index<E: Engine>(
    engine: &E,
    document: &DocumentEntry<E>,
    link: E::Link,
) -> Result<Option<i32>> {
    let dest = engine.link_dest(&document.raw, link);
    check(engine)?;
    let Some(dest) = dest else {
        return Ok(None);
    };
    let index = engine.dest_page_index(&document.raw, dest);
    check(engine)?;
    Ok((index >= 0).then_some(index))
}

fn uri<E: Engine>(engine: &E, document: &DocumentEntry<E>, link: E::Link) -> Result<Option<String>> {
    let action = engine.link_action(link);
    check(engine)?;
    let Some(action) = action else {
        return Ok(None);
    };
    let bytes = fetch_buffer(engine, |buffer| {
        engine.action_uri_path(&document.raw, action, buffer)
    })?;
    let uri = decode_ascii(&bytes);
    Ok((!uri.is_empty()).then_some(uri))
}

fn annot_rect<E: Engine>(engine: &E, link: E::Link) -> Result<Option<RectF>> {
    let rect = engine.link_annot_rect(link);
    check(engine)?;
    Ok(rect)
}

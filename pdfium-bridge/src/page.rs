//! Loading pages and mapping page coordinates to device space.

use crate::bridge::Bridge;
use crate::document::page_size;
use crate::engine::Engine;
use crate::error::{check, translate, PdfError, Result};
use crate::geometry::{Point, RectF, Size, Viewport};
use crate::handle::{DocumentHandle, PageHandle};
use crate::registry::PageEntry;

impl<E: Engine> Bridge<E> {
    /// Load page `index` and write its size (in points) into `out`.
    pub fn open_page(
        &self,
        document: DocumentHandle,
        index: i32,
        out: &mut Size,
    ) -> Result<PageHandle> {
        let mut registry = self.lock();
        let engine = self.engine();

        let (raw, size) = {
            let doc = registry.document(document)?;
            let raw = engine.load_page(&doc.raw, index);
            if let Some(err) = translate(engine) {
                if let Some(raw) = raw {
                    engine.close_page(raw);
                }
                return Err(err);
            }
            let raw = raw.ok_or_else(|| PdfError::Page {
                reason: "cannot load page".to_string(),
            })?;
            match page_size(engine, &doc.raw, index) {
                Ok(size) => (raw, size),
                Err(err) => {
                    engine.close_page(raw);
                    return Err(err);
                }
            }
        };

        let handle = registry.pages.insert(PageEntry {
            raw,
            document,
            index,
            size,
            links: Vec::new(),
        });
        *out = size;
        Ok(handle)
    }

    /// Release a page and the link handles it issued. Text pages and
    /// searches still open on it are closed in the engine first.
    ///
    /// If the owning document was closed first, the engine page is already
    /// gone: the handle is retired and `InvalidHandle` is returned.
    pub fn close_page(&self, page: PageHandle) -> Result<()> {
        let mut registry = self.lock();
        if registry.orphans.pages.remove(&page) {
            tracing::warn!(?page, "Page closed after its document");
            return Err(PdfError::InvalidHandle { kind: "document" });
        }
        let entry = registry
            .pages
            .remove(page)
            .ok_or(PdfError::InvalidHandle { kind: "page" })?;
        registry.forget_links(&entry.links);

        let engine = self.engine();
        registry.detach_page(page).close(engine);
        engine.close_page(entry.raw);
        check(engine)
    }

    /// Index of the page within its document.
    pub fn page_index(&self, page: PageHandle) -> Result<i32> {
        Ok(self.lock().page(page)?.index)
    }

    /// Size recorded when the page was opened.
    pub fn page_size(&self, page: PageHandle) -> Result<Size> {
        Ok(self.lock().page(page)?.size)
    }

    /// Map a page-space point into `viewport`, writing the device pixel into `out`.
    pub fn page_coords_to_device(
        &self,
        page: PageHandle,
        viewport: Viewport,
        rotate: i32,
        page_x: f64,
        page_y: f64,
        out: &mut Point,
    ) -> Result<()> {
        let registry = self.lock();
        let entry = registry.page(page)?;
        let (x, y) = to_device(self.engine(), &entry.raw, viewport, rotate, page_x, page_y)?;
        *out = Point { x, y };
        Ok(())
    }

    /// Map a page-space rectangle into `viewport` by mapping two corners.
    pub fn map_rect_to_device(
        &self,
        page: PageHandle,
        viewport: Viewport,
        rotate: i32,
        rect: RectF,
    ) -> Result<RectF> {
        let registry = self.lock();
        let entry = registry.page(page)?;
        let engine = self.engine();
        let (left, top) = to_device(
            engine,
            &entry.raw,
            viewport,
            rotate,
            f64::from(rect.left),
            f64::from(rect.top),
        )?;
        let (right, bottom) = to_device(
            engine,
            &entry.raw,
            viewport,
            rotate,
            f64::from(rect.right),
            f64::from(rect.bottom),
        )?;
        Ok(RectF::new(
            left as f32,
            top as f32,
            right as f32,
            bottom as f32,
        ))
    }
}

fn to_device<E: Engine>(
    engine: &E,
    page: &E::Page,
    viewport: Viewport,
    rotate: i32,
    page_x: f64,
    page_y: f64,
) -> Result<(i32, i32)> {
    let point = engine.page_to_device(page, viewport, rotate, page_x, page_y);
    check(engine)?;
    point.ok_or_else(|| PdfError::Page {
        reason: "cannot map page coordinates".to_string(),
    })
}

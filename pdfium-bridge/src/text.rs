//! Text layer of a page: characters, ranges and their bounding rectangles.

use crate::bridge::Bridge;
use crate::engine::Engine;
use crate::error::{check, translate, PdfError, Result};
use crate::geometry::RectF;
use crate::handle::{PageHandle, TextPageHandle};
use crate::registry::TextPageEntry;
use crate::strings::decode_utf16;

impl<E: Engine> Bridge<E> {
    /// Load the text layer of a page.
    pub fn load_text_page(&self, page: PageHandle) -> Result<TextPageHandle> {
        let mut registry = self.lock();
        let engine = self.engine();

        let raw = {
            let entry = registry.page(page)?;
            let raw = engine.text_load_page(&entry.raw);
            if let Some(err) = translate(engine) {
                if let Some(raw) = raw {
                    engine.text_close_page(raw);
                }
                return Err(err);
            }
            raw.ok_or_else(|| PdfError::Page {
                reason: "cannot load text page".to_string(),
            })?
        };

        Ok(registry.texts.insert(TextPageEntry {
            raw,
            page,
            rect_count: None,
        }))
    }

    /// Release a text page. Search sessions still open on it are closed
    /// in the engine first and their handles become invalid.
    pub fn close_text_page(&self, text: TextPageHandle) -> Result<()> {
        let mut registry = self.lock();
        if registry.orphans.texts.remove(&text) {
            tracing::warn!(?text, "Text page closed after its page");
            return Err(PdfError::InvalidHandle { kind: "page" });
        }
        let entry = registry
            .texts
            .remove(text)
            .ok_or(PdfError::InvalidHandle { kind: "text page" })?;

        let engine = self.engine();
        registry.detach_text(text).close(engine);
        engine.text_close_page(entry.raw);
        check(engine)
    }

    pub fn text_count_chars(&self, text: TextPageHandle) -> Result<i32> {
        let registry = self.lock();
        let entry = registry.text(text)?;
        count_chars(self.engine(), &entry.raw)
    }

    /// Characters `start..start + count` as a string.
    pub fn text_get_text(&self, text: TextPageHandle, start: i32, count: i32) -> Result<String> {
        let registry = self.lock();
        let entry = registry.text(text)?;
        get_text(self.engine(), &entry.raw, start, count)
    }

    /// All text on the page.
    pub fn text_all(&self, text: TextPageHandle) -> Result<String> {
        let registry = self.lock();
        let entry = registry.text(text)?;
        let engine = self.engine();
        let count = count_chars(engine, &entry.raw)?;
        get_text(engine, &entry.raw, 0, count)
    }

    /// Count the rectangles covering `start..start + count` (`count` of -1
    /// means to the end of the page). Bounds later [`Bridge::text_get_rect`]
    /// calls.
    pub fn text_count_rects(&self, text: TextPageHandle, start: i32, count: i32) -> Result<i32> {
        let mut registry = self.lock();
        let entry = registry.text_mut(text)?;
        let engine = self.engine();
        let rects = engine.text_count_rects(&entry.raw, start, count);
        check(engine)?;
        entry.rect_count = Some(rects);
        Ok(rects)
    }

    /// Write rectangle `index` of the last counted range into `out`.
    pub fn text_get_rect(&self, text: TextPageHandle, index: i32, out: &mut RectF) -> Result<()> {
        let registry = self.lock();
        let entry = registry.text(text)?;
        *out = get_rect(self.engine(), entry, index)?;
        Ok(())
    }

    /// Every rectangle covering `start..start + count`.
    pub fn text_rects(&self, text: TextPageHandle, start: i32, count: i32) -> Result<Vec<RectF>> {
        let mut registry = self.lock();
        let entry = registry.text_mut(text)?;
        let engine = self.engine();
        let rects = engine.text_count_rects(&entry.raw, start, count);
        check(engine)?;
        entry.rect_count = Some(rects);
        let entry = &*entry;
        (0..rects).map(|index| get_rect(engine, entry, index)).collect()
    }
}

fn count_chars<E: Engine>(engine: &E, text: &E::TextPage) -> Result<i32> {
    let count = engine.text_count_chars(text);
    check(engine)?;
    Ok(count)
}

fn get_text<E: Engine>(engine: &E, text: &E::TextPage, start: i32, count: i32) -> Result<String> {
    if count < 0 {
        return Err(PdfError::InvalidParameter(format!(
            "negative character count {count}"
        )));
    }
    // Never allocate past the end of the page.
    let available = count_chars(engine, text)? - start.max(0);
    let count = count.min(available);
    if count <= 0 {
        return Ok(String::new());
    }

    let mut buffer = vec![0u16; count as usize + 1];
    let written = engine.text_get_text(text, start, count, &mut buffer);
    check(engine)?;
    if written <= 0 {
        tracing::debug!(start, count, "Engine returned no text");
        return Ok(String::new());
    }
    buffer.truncate((written as usize).min(buffer.len()));
    decode_utf16(&buffer)
}

fn get_rect<E: Engine>(engine: &E, entry: &TextPageEntry<E>, index: i32) -> Result<RectF> {
    let count = entry.rect_count.unwrap_or(0);
    if index < 0 || index >= count {
        return Err(PdfError::RectIndexOutOfBounds { index, count });
    }
    let rect = engine.text_get_rect(&entry.raw, index);
    check(engine)?;
    rect.ok_or_else(|| PdfError::Page {
        reason: format!("cannot get text rect {index}"),
    })
}

//! Opening and closing documents, and document-level queries.

use crate::bridge::{fetch_buffer, Bridge};
use crate::engine::{Engine, ERR_UNKNOWN};
use crate::error::{check, translate, PdfError, Result};
use crate::geometry::Size;
use crate::handle::DocumentHandle;
use crate::registry::{DocumentEntry, Registry};
use crate::runtime::EngineRuntime;
use crate::source::{file_len, BlockSource, FileReader};
use crate::strings::{decode_utf16le, password_cstring, tag_cstring};
use std::fs::File;

/// Standard document information dictionary entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfMetaInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub creator: String,
    pub producer: String,
    pub creation_date: String,
    pub mod_date: String,
}

impl<E: Engine> Bridge<E> {
    /// Open a document whose bytes the engine pulls from `source` on demand.
    ///
    /// `len` is the total size in bytes. The source is owned by the document
    /// until it is closed.
    pub fn open_document<S: BlockSource + 'static>(
        &self,
        source: S,
        len: u64,
        password: Option<&str>,
    ) -> Result<DocumentHandle> {
        let password = password_cstring(password)?;
        let reader = FileReader::new(Box::new(source), len);
        self.open_with(|engine| engine.load_custom_document(reader, password.as_deref()))
    }

    /// Open a document from a file, reading it lazily.
    pub fn open_file(&self, file: File, password: Option<&str>) -> Result<DocumentHandle> {
        let len = file_len(&file)?;
        self.open_document(file, len, password)
    }

    /// Open a document from a raw descriptor. The descriptor is borrowed and
    /// must stay open until the document is closed.
    #[cfg(unix)]
    pub fn open_fd(
        &self,
        fd: std::os::unix::io::RawFd,
        password: Option<&str>,
    ) -> Result<DocumentHandle> {
        let source = crate::source::FdSource::new(fd);
        let len = source.size()?;
        if len == 0 {
            return Err(PdfError::Io {
                reason: "file is empty".to_string(),
            });
        }
        self.open_document(source, len, password)
    }

    /// Open a document from memory. The bytes are copied and kept alive for
    /// the lifetime of the document.
    pub fn open_document_from_bytes(
        &self,
        data: &[u8],
        password: Option<&str>,
    ) -> Result<DocumentHandle> {
        let password = password_cstring(password)?;
        let data: Box<[u8]> = data.into();
        self.open_with(|engine| engine.load_mem_document(data, password.as_deref()))
    }

    fn open_with(&self, load: impl FnOnce(&E) -> Option<E::Document>) -> Result<DocumentHandle> {
        let mut registry = self.lock();
        self.runtime().acquire()?;

        let engine = self.engine();
        let raw = load(engine);
        let raw = match (raw, translate(engine)) {
            (Some(raw), None) => raw,
            (raw, err) => {
                if let Some(raw) = raw {
                    engine.close_document(raw);
                }
                let err = err.unwrap_or(PdfError::Unknown { code: ERR_UNKNOWN });
                if let Err(release_err) = self.runtime().release() {
                    tracing::warn!("Releasing engine after failed open: {}", release_err);
                }
                tracing::debug!("Document open failed: {}", err);
                return Err(err);
            }
        };

        let handle = registry.documents.insert(DocumentEntry {
            raw,
            bookmarks: Vec::new(),
        });
        tracing::debug!(?handle, "Document opened");
        Ok(handle)
    }

    /// Close a document and drop its hold on the engine.
    ///
    /// Pages, text pages and searches still open on it are closed in the
    /// engine first. Their handles stay reserved and report `InvalidHandle`
    /// until they are closed too. Outline handles of the document become
    /// invalid.
    pub fn close_document(&self, document: DocumentHandle) -> Result<()> {
        let mut registry = self.lock();
        close_document_in(self.runtime(), &mut *registry, document)
    }

    pub fn page_count(&self, document: DocumentHandle) -> Result<i32> {
        let registry = self.lock();
        let entry = registry.document(document)?;
        let engine = self.engine();
        let count = engine.page_count(&entry.raw);
        check(engine)?;
        Ok(count)
    }

    /// Write the size of page `index` (in points) into `out`.
    pub fn page_size_by_index(
        &self,
        document: DocumentHandle,
        index: i32,
        out: &mut Size,
    ) -> Result<()> {
        let registry = self.lock();
        let entry = registry.document(document)?;
        *out = page_size(self.engine(), &entry.raw, index)?;
        Ok(())
    }

    /// Sizes of every page, in order.
    pub fn all_page_sizes(&self, document: DocumentHandle) -> Result<Vec<Size>> {
        let registry = self.lock();
        let entry = registry.document(document)?;
        let engine = self.engine();
        let count = engine.page_count(&entry.raw);
        check(engine)?;
        (0..count)
            .map(|index| page_size(engine, &entry.raw, index))
            .collect()
    }

    /// Whether the document asks viewers to scale it when printing.
    pub fn scale_for_printing(&self, document: DocumentHandle) -> Result<bool> {
        let registry = self.lock();
        let entry = registry.document(document)?;
        let engine = self.engine();
        let scaling = engine.print_scaling(&entry.raw);
        check(engine)?;
        Ok(scaling)
    }

    /// Value of an information dictionary entry, or an empty string.
    pub fn meta_text(&self, document: DocumentHandle, tag: &str) -> Result<String> {
        let tag = tag_cstring(tag)?;
        let registry = self.lock();
        let entry = registry.document(document)?;
        let engine = self.engine();
        let bytes = fetch_buffer(engine, |buffer| {
            engine.meta_text(&entry.raw, &tag, buffer)
        })?;
        // Two bytes is the bare terminator.
        if bytes.len() <= 2 {
            return Ok(String::new());
        }
        decode_utf16le(&bytes)
    }

    /// All standard information dictionary entries.
    pub fn document_meta(&self, document: DocumentHandle) -> Result<PdfMetaInfo> {
        Ok(PdfMetaInfo {
            title: self.meta_text(document, "Title")?,
            author: self.meta_text(document, "Author")?,
            subject: self.meta_text(document, "Subject")?,
            keywords: self.meta_text(document, "Keywords")?,
            creator: self.meta_text(document, "Creator")?,
            producer: self.meta_text(document, "Producer")?,
            creation_date: self.meta_text(document, "CreationDate")?,
            mod_date: self.meta_text(document, "ModDate")?,
        })
    }
}

/// Close `document` and everything opened on it, then release its hold on
/// the runtime.
pub(crate) fn close_document_in<E: Engine>(
    runtime: &EngineRuntime<E>,
    registry: &mut Registry<E>,
    document: DocumentHandle,
) -> Result<()> {
    let entry = registry
        .documents
        .remove(document)
        .ok_or(PdfError::InvalidHandle { kind: "document" })?;
    registry.forget_bookmarks(&entry.bookmarks);

    let engine = runtime.engine();
    let detached = registry.detach_document(document);
    if !detached.is_empty() {
        tracing::debug!(?document, "Closing resources still open on document");
        detached.close(engine);
    }
    engine.close_document(entry.raw);
    let closed = check(engine);
    let released = runtime.release();
    tracing::debug!(?document, "Document closed");
    closed.and(released)
}

pub(crate) fn page_size<E: Engine>(engine: &E, document: &E::Document, index: i32) -> Result<Size> {
    let size = engine.page_size_by_index(document, index);
    check(engine)?;
    let (width, height) = size.ok_or_else(|| PdfError::Page {
        reason: "cannot get page size".to_string(),
    })?;
    Ok(Size {
        width: width as i32,
        height: height as i32,
    })
}

//! Error types and engine status translation for pdfium-bridge

use crate::engine::{
    Library, ERR_FILE, ERR_FORMAT, ERR_PAGE, ERR_PASSWORD, ERR_SECURITY, ERR_SUCCESS,
};
use thiserror::Error;

/// Result type for pdfium-bridge operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Closed set of failure categories an engine status code maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// File missing, unreadable, or not a PDF.
    Io,
    /// Missing or incorrect password, or unsupported security scheme.
    Auth,
    /// Page not found or content error.
    Page,
    /// Unmapped engine code.
    Unknown,
}

impl FailureCategory {
    /// Map an engine status code. `None` means success.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            ERR_SUCCESS => None,
            ERR_FILE | ERR_FORMAT => Some(FailureCategory::Io),
            ERR_PASSWORD | ERR_SECURITY => Some(FailureCategory::Auth),
            ERR_PAGE => Some(FailureCategory::Page),
            _ => Some(FailureCategory::Unknown),
        }
    }
}

/// Error types for PDF operations
#[derive(Error, Debug)]
pub enum PdfError {
    /// File missing, unreadable, or corrupt
    #[error("IO error: {reason}")]
    Io { reason: String },

    /// Password required, incorrect, or unsupported security handler
    #[error("Security error: {reason}")]
    Auth { reason: String },

    /// Page not found or content error
    #[error("Page error: {reason}")]
    Page { reason: String },

    /// Engine reported a code we do not map
    #[error("Unknown PDFium error (code {code})")]
    Unknown { code: u32 },

    /// Handle is stale, was never issued, or its owner is already closed
    #[error("Invalid {kind} handle")]
    InvalidHandle { kind: &'static str },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Library released more times than it was acquired
    #[error("PDFium library is not initialized")]
    LibraryNotInitialized,

    /// Search result queried while no match is current
    #[error("Search session has no current match")]
    NoCurrentMatch,

    /// Engine refused to start a search
    #[error("Failed to start text search")]
    SearchFailed,

    /// Text rectangle index outside the last counted range
    #[error("Text rect index {index} out of bounds ({count} rects)")]
    RectIndexOutOfBounds { index: i32, count: i32 },

    /// Invalid data (e.g., malformed UTF-16)
    #[error("Invalid data: {reason}")]
    InvalidData { reason: String },

    /// OS-level error while probing a file
    #[error("File error: {0}")]
    File(#[from] std::io::Error),
}

impl PdfError {
    /// Build the structured failure for a non-success engine code.
    pub fn from_code(code: u32) -> Option<Self> {
        let category = FailureCategory::from_code(code)?;
        let reason = match code {
            ERR_FILE => "file not found or cannot be opened",
            ERR_FORMAT => "file not in PDF format or corrupted",
            ERR_PASSWORD => "password required or incorrect password",
            ERR_SECURITY => "unsupported security scheme",
            ERR_PAGE => "page not found or content error",
            _ => return Some(PdfError::Unknown { code }),
        }
        .to_string();
        Some(match category {
            FailureCategory::Io => PdfError::Io { reason },
            FailureCategory::Auth => PdfError::Auth { reason },
            FailureCategory::Page => PdfError::Page { reason },
            FailureCategory::Unknown => PdfError::Unknown { code },
        })
    }

    /// The engine failure category, for errors that came from the engine.
    pub fn category(&self) -> Option<FailureCategory> {
        match self {
            PdfError::Io { .. } => Some(FailureCategory::Io),
            PdfError::Auth { .. } => Some(FailureCategory::Auth),
            PdfError::Page { .. } => Some(FailureCategory::Page),
            PdfError::Unknown { .. } => Some(FailureCategory::Unknown),
            _ => None,
        }
    }

    pub(crate) fn invalid_handle(kind: &'static str) -> Self {
        PdfError::InvalidHandle { kind }
    }
}

/// Read the engine's last-error register and translate it.
///
/// The register holds only the most recent error, so this must run right
/// after the engine call that may have set it.
pub fn translate<L: Library + ?Sized>(library: &L) -> Option<PdfError> {
    PdfError::from_code(library.last_error())
}

/// `?`-friendly form of [`translate`].
pub fn check<L: Library + ?Sized>(library: &L) -> Result<()> {
    match translate(library) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

//! String marshaling between Rust strings and the engine's encodings.
//!
//! The engine takes search queries as UTF-16LE wide strings, passwords and
//! metadata tags as null-terminated byte strings, and fills caller buffers
//! with UTF-16LE (titles, metadata, page text) or ASCII (URIs).

use crate::error::{PdfError, Result};
use std::ffi::CString;

/// A UTF-16LE string terminated by one zero code unit (two zero bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideString {
    units: Vec<u16>,
}

impl WideString {
    /// Encode `s` as UTF-16 with little-endian code units and a terminator.
    pub fn new(s: &str) -> Self {
        let units = s
            .encode_utf16()
            .map(u16::to_le)
            .chain(std::iter::once(0))
            .collect();
        Self { units }
    }

    /// Pointer to the first code unit, valid while `self` is alive.
    pub fn as_ptr(&self) -> *const u16 {
        self.units.as_ptr()
    }

    /// Code units including the terminator, as stored in memory.
    pub fn as_units(&self) -> &[u16] {
        &self.units
    }

    /// Number of code units excluding the terminator.
    pub fn len(&self) -> usize {
        self.units.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The exact byte image handed to the engine.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.units
            .iter()
            .flat_map(|unit| u16::from_le(*unit).to_le_bytes())
            .collect()
    }

    /// Decode back to a Rust string (terminator excluded).
    pub fn to_string_lossy(&self) -> String {
        let units: Vec<u16> = self.units[..self.len()]
            .iter()
            .map(|unit| u16::from_le(*unit))
            .collect();
        String::from_utf16_lossy(&units)
    }
}

/// Marshal an optional password for a single open call.
pub fn password_cstring(password: Option<&str>) -> Result<Option<CString>> {
    password
        .map(|p| {
            CString::new(p).map_err(|_| {
                PdfError::InvalidParameter("password contains an interior NUL byte".to_string())
            })
        })
        .transpose()
}

/// Marshal an ASCII tag such as a metadata key.
pub fn tag_cstring(tag: &str) -> Result<CString> {
    CString::new(tag)
        .map_err(|_| PdfError::InvalidParameter(format!("tag {tag:?} contains a NUL byte")))
}

/// Decode a UTF-16LE byte buffer filled by the engine, dropping trailing
/// terminators.
pub fn decode_utf16le(bytes: &[u8]) -> Result<String> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    decode_utf16(&units)
}

/// Decode UTF-16 code units, dropping trailing terminators.
pub fn decode_utf16(units: &[u16]) -> Result<String> {
    let mut end = units.len();
    while end > 0 && units[end - 1] == 0 {
        end -= 1;
    }
    String::from_utf16(&units[..end]).map_err(|_| PdfError::InvalidData {
        reason: "Invalid UTF-16 from engine".to_string(),
    })
}

/// Decode a null-terminated ASCII buffer (URIs).
pub fn decode_ascii(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

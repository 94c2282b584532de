//! PE subtype label.

use std::fmt;

use crate::formats::pe::{peek_optional_magic, PE32PLUS_MAGIC, PE32_MAGIC};

/// Image width as read from the optional header magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Pe32,
    Pe32Plus,
    Unknown,
}

/// PE image kind plus the DLL bit of the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeType {
    pub kind: ImageKind,
    pub is_dll: bool,
}

impl PeType {
    /// Label used when the headers cannot be read.
    pub const FALLBACK: PeType = PeType {
        kind: ImageKind::Unknown,
        is_dll: false,
    };

    pub fn detect(data: &[u8]) -> Self {
        match peek_optional_magic(data) {
            Ok((coff, magic)) => PeType {
                kind: match magic {
                    PE32PLUS_MAGIC => ImageKind::Pe32Plus,
                    PE32_MAGIC => ImageKind::Pe32,
                    _ => ImageKind::Unknown,
                },
                is_dll: coff.is_dll(),
            },
            Err(_) => Self::FALLBACK,
        }
    }
}

impl fmt::Display for PeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = if self.is_dll { "DLL" } else { "Executable" };
        match self.kind {
            ImageKind::Pe32Plus => write!(f, "PE64 {} (PE32+)", module),
            ImageKind::Pe32 => write!(f, "PE32 {}", module),
            ImageKind::Unknown => write!(f, "PE {}", module),
        }
    }
}

/// Human-readable file type, e.g. `PE32 Executable` or `PE64 DLL (PE32+)`.
pub fn detect_pe_type(data: &[u8]) -> String {
    PeType::detect(data).to_string()
}

//! Core PE data types and structures

use std::fmt;
use std::ops::Range;

// PE constants
pub const DOS_SIGNATURE: u16 = 0x5A4D; // MZ
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";
pub const PE32_MAGIC: u16 = 0x10B;
pub const PE32PLUS_MAGIC: u16 = 0x20B;

pub const DOS_HEADER_SIZE: usize = 64;
pub const COFF_HEADER_SIZE: usize = 20;
pub const SECTION_HEADER_SIZE: usize = 40;
pub const IMPORT_DESCRIPTOR_SIZE: usize = 20;

// Data directory indices
pub const IMAGE_DIRECTORY_ENTRY_IMPORT: usize = 1;
pub const IMAGE_DIRECTORY_ENTRY_RESOURCE: usize = 2;
pub const IMAGE_DIRECTORY_ENTRY_SECURITY: usize = 4;
pub const IMAGE_DIRECTORY_ENTRY_BASERELOC: usize = 5;
pub const IMAGE_DIRECTORY_ENTRY_DEBUG: usize = 6;
pub const IMAGE_DIRECTORY_ENTRY_TLS: usize = 9;
pub const IMAGE_NUMBEROF_DIRECTORY_ENTRIES: usize = 16;

// File header characteristics
pub const IMAGE_FILE_EXECUTABLE_IMAGE: u16 = 0x0002;
pub const IMAGE_FILE_DLL: u16 = 0x2000;

/// PE parsing error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeError {
    InvalidDosSignature,
    InvalidPeSignature,
    InvalidMagic(u16),
    TruncatedHeader { expected: usize, actual: usize },
    InvalidRva { rva: u32 },
    InvalidOffset { offset: usize },
    MalformedImportTable,
    MalformedResourceDirectory,
    ResourceDepthExceeded,
    DataDirectoryNotFound { index: usize },
    LimitExceeded(&'static str),
}

impl fmt::Display for PeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDosSignature => write!(f, "Invalid DOS signature"),
            Self::InvalidPeSignature => write!(f, "Invalid PE signature"),
            Self::InvalidMagic(m) => write!(f, "Invalid optional header magic: 0x{:04x}", m),
            Self::TruncatedHeader { expected, actual } => {
                write!(
                    f,
                    "Truncated header: expected {} bytes, got {}",
                    expected, actual
                )
            }
            Self::InvalidRva { rva } => write!(f, "Invalid RVA: 0x{:08x}", rva),
            Self::InvalidOffset { offset } => write!(f, "Invalid file offset: 0x{:x}", offset),
            Self::MalformedImportTable => write!(f, "Malformed import table"),
            Self::MalformedResourceDirectory => write!(f, "Malformed resource directory"),
            Self::ResourceDepthExceeded => write!(f, "Resource directory depth exceeded"),
            Self::DataDirectoryNotFound { index } => {
                write!(f, "Data directory {} not found", index)
            }
            Self::LimitExceeded(what) => write!(f, "Limit exceeded: {}", what),
        }
    }
}

impl std::error::Error for PeError {}

pub type Result<T> = std::result::Result<T, PeError>;

/// Machine types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    Unknown,
    I386,   // 0x014c
    X86_64, // 0x8664
    Arm,    // 0x01c0
    Arm64,  // 0xaa64
    ArmNT,  // 0x01c4
    IA64,   // 0x0200
    Other(u16),
}

impl From<u16> for Machine {
    fn from(value: u16) -> Self {
        match value {
            0x014c => Self::I386,
            0x8664 => Self::X86_64,
            0x01c0 => Self::Arm,
            0xaa64 => Self::Arm64,
            0x01c4 => Self::ArmNT,
            0x0200 => Self::IA64,
            0 => Self::Unknown,
            other => Self::Other(other),
        }
    }
}

impl Machine {
    /// Raw COFF machine value.
    pub fn raw(self) -> u16 {
        match self {
            Self::Unknown => 0,
            Self::I386 => 0x014c,
            Self::X86_64 => 0x8664,
            Self::Arm => 0x01c0,
            Self::Arm64 => 0xaa64,
            Self::ArmNT => 0x01c4,
            Self::IA64 => 0x0200,
            Self::Other(v) => v,
        }
    }
}

/// DOS header fields the parser needs
#[derive(Debug, Clone, Copy)]
pub struct DosHeader {
    pub e_magic: u16,  // Magic number (MZ)
    pub e_lfanew: u32, // File address of PE header
}

/// COFF header (20 bytes)
#[derive(Debug, Clone, Copy)]
pub struct CoffHeader {
    pub machine: Machine,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    pub size_of_optional_header: u16,
    pub characteristics: u16,
}

impl CoffHeader {
    pub fn is_dll(&self) -> bool {
        (self.characteristics & IMAGE_FILE_DLL) != 0
    }
}

/// Data directory entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

impl DataDirectory {
    /// Whether the directory points anywhere at all.
    pub fn is_present(&self) -> bool {
        self.virtual_address != 0 && self.size > 0
    }
}

/// Optional header fields shared by PE32 and PE32+, widened where the
/// two layouts differ.
#[derive(Debug, Clone)]
pub struct OptionalHeader {
    pub magic: u16,
    pub size_of_code: u32,
    pub address_of_entry_point: u32,
    pub image_base: u64,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub checksum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub number_of_rva_and_sizes: u32,
}

impl OptionalHeader {
    pub fn is_64bit(&self) -> bool {
        self.magic == PE32PLUS_MAGIC
    }
}

/// NT headers (PE signature + COFF + Optional)
#[derive(Debug, Clone)]
pub struct NtHeaders {
    pub file_header: CoffHeader,
    pub optional_header: OptionalHeader,
}

/// Section header
#[derive(Debug, Clone)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub characteristics: u32,
}

impl SectionHeader {
    /// Section name with trailing NULs stripped; invalid bytes are dropped
    /// rather than failing the parse.
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.name[..end])
            .chars()
            .filter(|&c| c != char::REPLACEMENT_CHARACTER)
            .collect()
    }

    pub fn contains_rva(&self, rva: u32) -> bool {
        let size = self.virtual_size.max(self.size_of_raw_data);
        rva >= self.virtual_address && (rva - self.virtual_address) < size
    }
}

/// Section with data reference
#[derive(Debug, Clone)]
pub struct Section {
    pub header: SectionHeader,
    pub data: Range<usize>, // Range in file, clipped to the file length
}

/// Import descriptor: one imported module and its thunks, in table order
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDescriptor {
    pub dll_name: String,
    pub entries: Vec<ImportEntry>,
}

/// Import entry
#[derive(Debug, Clone, PartialEq)]
pub struct ImportEntry {
    /// Function name; `None` for ordinal imports or unreadable hint/name slots
    pub name: Option<String>,
    pub ordinal: Option<u16>,
    pub hint: Option<u16>,
}

/// Parse options
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub parse_imports: bool,
    pub parse_resources: bool,
    pub max_import_descriptors: usize,
    pub max_imports_per_descriptor: usize,
    pub max_resource_depth: usize,
    pub max_resource_entries: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            parse_imports: true,
            parse_resources: true,
            max_import_descriptors: 4096,
            max_imports_per_descriptor: 10000,
            max_resource_depth: 32,
            max_resource_entries: 65536,
        }
    }
}

impl ParseOptions {
    /// Header and section table only; no data directories are followed.
    pub fn fast() -> Self {
        Self {
            parse_imports: false,
            parse_resources: false,
            ..Default::default()
        }
    }
}

//! PE parser used by metadata and feature extraction
//!
//! The parser validates the DOS/NT headers and the section table eagerly;
//! the import table and resource tree are parsed on first use and cached.

use std::cell::OnceCell;

pub mod directories;
pub mod headers;
pub mod sections;
pub mod types;
pub mod utils;

use directories::*;
use headers::*;
pub use sections::SectionTable;
use sections::*;
pub use types::*;

pub use directories::{ImportTable, ResourceSummary};
pub use headers::peek_optional_magic;

/// Main PE parser
pub struct PeParser<'data> {
    data: &'data [u8],
    nt_headers: NtHeaders,
    data_directories: Vec<DataDirectory>,
    section_table: SectionTable,
    options: ParseOptions,

    // Lazy-loaded data
    imports: OnceCell<ImportTable>,
    resources: OnceCell<ResourceSummary>,
}

impl<'data> PeParser<'data> {
    /// Create parser with default options
    pub fn new(data: &'data [u8]) -> Result<Self> {
        Self::with_options(data, ParseOptions::default())
    }

    /// Create parser with custom options
    pub fn with_options(data: &'data [u8], options: ParseOptions) -> Result<Self> {
        let dos_header = parse_dos_header(data)?;
        let pe_offset = dos_header.e_lfanew as usize;

        let (nt_headers, data_directories) = parse_nt_headers(data, pe_offset)?;

        let section_offset = pe_offset
            + 4
            + COFF_HEADER_SIZE
            + nt_headers.file_header.size_of_optional_header as usize;
        let section_headers = parse_section_headers(
            data,
            section_offset,
            nt_headers.file_header.number_of_sections,
        )?;

        let section_table = SectionTable::new(create_sections(section_headers, data.len()));

        Ok(Self {
            data,
            nt_headers,
            data_directories,
            section_table,
            options,
            imports: OnceCell::new(),
            resources: OnceCell::new(),
        })
    }

    /// Raw file bytes
    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    pub fn nt_headers(&self) -> &NtHeaders {
        &self.nt_headers
    }

    pub fn coff_header(&self) -> &CoffHeader {
        &self.nt_headers.file_header
    }

    pub fn optional_header(&self) -> &OptionalHeader {
        &self.nt_headers.optional_header
    }

    /// Check if PE is 64-bit (PE32+)
    pub fn is_64bit(&self) -> bool {
        self.nt_headers.optional_header.is_64bit()
    }

    /// Check the DLL bit of the file header characteristics
    pub fn is_dll(&self) -> bool {
        self.nt_headers.file_header.is_dll()
    }

    pub fn machine(&self) -> Machine {
        self.nt_headers.file_header.machine
    }

    /// All sections in on-disk order
    pub fn sections(&self) -> &[Section] {
        self.section_table.sections()
    }

    pub fn section_table(&self) -> &SectionTable {
        &self.section_table
    }

    /// Get imports (lazy-loaded)
    pub fn imports(&self) -> Result<&ImportTable> {
        if let Some(imports) = self.imports.get() {
            return Ok(imports);
        }

        let import_dir = self.data_directory(IMAGE_DIRECTORY_ENTRY_IMPORT)?;
        let imports = parse_imports(
            self.data,
            &self.section_table,
            import_dir,
            self.is_64bit(),
            &self.options,
        )?;

        Ok(self.imports.get_or_init(|| imports))
    }

    /// Get resource tree summary (lazy-loaded)
    pub fn resources(&self) -> Result<&ResourceSummary> {
        if let Some(resources) = self.resources.get() {
            return Ok(resources);
        }

        let resource_dir = self.data_directory(IMAGE_DIRECTORY_ENTRY_RESOURCE)?;
        let resources =
            parse_resources(self.data, &self.section_table, resource_dir, &self.options)?;

        Ok(self.resources.get_or_init(|| resources))
    }

    /// Convert RVA to file offset
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        self.section_table.rva_to_offset(rva)
    }

    /// Get data directory by index
    pub fn data_directory(&self, index: usize) -> Result<&DataDirectory> {
        self.data_directories
            .get(index)
            .ok_or(PeError::DataDirectoryNotFound { index })
    }

    fn has_directory(&self, index: usize) -> bool {
        self.data_directory(index)
            .map(DataDirectory::is_present)
            .unwrap_or(false)
    }

    pub fn has_debug_info(&self) -> bool {
        self.has_directory(IMAGE_DIRECTORY_ENTRY_DEBUG)
    }

    pub fn has_relocations(&self) -> bool {
        self.has_directory(IMAGE_DIRECTORY_ENTRY_BASERELOC)
    }

    pub fn has_tls(&self) -> bool {
        self.has_directory(IMAGE_DIRECTORY_ENTRY_TLS)
    }

    /// Whether an Authenticode certificate table is present
    pub fn is_signed(&self) -> bool {
        self.has_directory(IMAGE_DIRECTORY_ENTRY_SECURITY)
    }
}

//! Minimal PE image writer for tests.
//!
//! Headers occupy the first 0x400 bytes. Sections follow in insertion order
//! at 0x200 file alignment and 0x1000 virtual alignment, each zero-padded to
//! the file alignment. When imports are added, an `.idata` section holding
//! the import directory is appended after the user sections.

const E_LFANEW: usize = 0x40;
const HEADERS_SIZE: usize = 0x400;
const FILE_ALIGN: usize = 0x200;
const SECTION_ALIGN: u32 = 0x1000;

pub const IMAGE_FILE_EXECUTABLE_IMAGE: u16 = 0x0002;
pub const IMAGE_FILE_DLL: u16 = 0x2000;

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

fn put_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_u64(buf: &mut [u8], at: usize, v: u64) {
    buf[at..at + 8].copy_from_slice(&v.to_le_bytes());
}

#[derive(Debug, Clone, Default)]
pub struct PeBuilder {
    is_64bit: bool,
    dll: bool,
    sections: Vec<(String, Vec<u8>)>,
    imports: Vec<(String, Vec<String>)>,
    overlay: Vec<u8>,
}

impl PeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pe64(mut self) -> Self {
        self.is_64bit = true;
        self
    }

    pub fn dll(mut self) -> Self {
        self.dll = true;
        self
    }

    pub fn section(mut self, name: &str, data: Vec<u8>) -> Self {
        self.sections.push((name.to_string(), data));
        self
    }

    pub fn import(mut self, dll: &str, functions: &[&str]) -> Self {
        self.imports.push((
            dll.to_string(),
            functions.iter().map(|f| f.to_string()).collect(),
        ));
        self
    }

    /// Bytes appended after the last section.
    pub fn overlay(mut self, bytes: &[u8]) -> Self {
        self.overlay.extend_from_slice(bytes);
        self
    }

    /// `.idata` content for a section mapped at `va`.
    fn import_section(&self, va: u32) -> Vec<u8> {
        let entry = if self.is_64bit { 8 } else { 4 };
        let descriptors = (self.imports.len() + 1) * 20;

        let mut thunk_at = Vec::new();
        let mut cursor = descriptors;
        for (_, funcs) in &self.imports {
            thunk_at.push(cursor);
            cursor += (funcs.len() + 1) * entry;
        }
        let mut hint_name_at = Vec::new();
        for (_, funcs) in &self.imports {
            let mut per = Vec::new();
            for f in funcs {
                per.push(cursor);
                cursor = align_up(cursor + 2 + f.len() + 1, 2);
            }
            hint_name_at.push(per);
        }
        let mut dll_name_at = Vec::new();
        for (dll, _) in &self.imports {
            dll_name_at.push(cursor);
            cursor += dll.len() + 1;
        }

        let mut out = vec![0u8; cursor];
        let rva = |off: usize| va + off as u32;
        for (i, (dll, funcs)) in self.imports.iter().enumerate() {
            let d = i * 20;
            put_u32(&mut out, d, rva(thunk_at[i]));
            put_u32(&mut out, d + 12, rva(dll_name_at[i]));
            put_u32(&mut out, d + 16, rva(thunk_at[i]));

            for (j, f) in funcs.iter().enumerate() {
                let slot = thunk_at[i] + j * entry;
                let target = rva(hint_name_at[i][j]);
                if self.is_64bit {
                    put_u64(&mut out, slot, target as u64);
                } else {
                    put_u32(&mut out, slot, target);
                }
                let hn = hint_name_at[i][j];
                put_u16(&mut out, hn, j as u16);
                out[hn + 2..hn + 2 + f.len()].copy_from_slice(f.as_bytes());
            }
            let n = dll_name_at[i];
            out[n..n + dll.len()].copy_from_slice(dll.as_bytes());
        }
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let opt_size: usize = if self.is_64bit { 240 } else { 224 };
        let coff = E_LFANEW + 4;
        let opt = coff + 20;
        let table = opt + opt_size;

        let mut sections = self.sections.clone();
        let import_va = SECTION_ALIGN * (sections.len() as u32 + 1);
        let import_dir = if self.imports.is_empty() {
            None
        } else {
            sections.push((".idata".to_string(), self.import_section(import_va)));
            Some((import_va, ((self.imports.len() + 1) * 20) as u32))
        };
        assert!(table + sections.len() * 40 <= HEADERS_SIZE, "too many sections");

        let mut out = vec![0u8; HEADERS_SIZE];
        out[0..2].copy_from_slice(b"MZ");
        put_u32(&mut out, 60, E_LFANEW as u32);
        out[E_LFANEW..E_LFANEW + 4].copy_from_slice(b"PE\0\0");

        put_u16(&mut out, coff, if self.is_64bit { 0x8664 } else { 0x014c });
        put_u16(&mut out, coff + 2, sections.len() as u16);
        put_u16(&mut out, coff + 16, opt_size as u16);
        let mut characteristics = IMAGE_FILE_EXECUTABLE_IMAGE;
        if self.dll {
            characteristics |= IMAGE_FILE_DLL;
        }
        put_u16(&mut out, coff + 18, characteristics);

        put_u16(&mut out, opt, if self.is_64bit { 0x20b } else { 0x10b });
        put_u32(&mut out, opt + 16, SECTION_ALIGN);
        put_u32(&mut out, opt + 32, SECTION_ALIGN);
        put_u32(&mut out, opt + 36, FILE_ALIGN as u32);
        put_u32(
            &mut out,
            opt + 56,
            SECTION_ALIGN * (sections.len() as u32 + 1),
        );
        put_u32(&mut out, opt + 60, HEADERS_SIZE as u32);
        put_u16(&mut out, opt + 68, 3);
        let (rva_count, dirs) = if self.is_64bit {
            (opt + 108, opt + 112)
        } else {
            (opt + 92, opt + 96)
        };
        put_u32(&mut out, rva_count, 16);
        if let Some((va, size)) = import_dir {
            put_u32(&mut out, dirs + 8, va);
            put_u32(&mut out, dirs + 12, size);
        }

        for (i, (name, data)) in sections.iter().enumerate() {
            let h = table + i * 40;
            let raw_size = align_up(data.len().max(1), FILE_ALIGN);
            let raw_ptr = out.len();

            let name = name.as_bytes();
            let n = name.len().min(8);
            out[h..h + n].copy_from_slice(&name[..n]);
            put_u32(&mut out, h + 8, data.len() as u32);
            put_u32(&mut out, h + 12, SECTION_ALIGN * (i as u32 + 1));
            put_u32(&mut out, h + 16, raw_size as u32);
            put_u32(&mut out, h + 20, raw_ptr as u32);
            put_u32(&mut out, h + 36, 0x6000_0020);

            out.extend_from_slice(data);
            out.resize(raw_ptr + raw_size, 0);
        }

        out.extend_from_slice(&self.overlay);
        out
    }
}

/// `len` bytes cycling through every byte value; entropy 8.0 when `len` is
/// a multiple of 256.
pub fn uniform_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

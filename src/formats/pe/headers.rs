//! PE header parsing

use crate::formats::pe::types::*;
use crate::formats::pe::utils::{u16_at, u32_at, u64_at};

/// Parse DOS header from data
pub fn parse_dos_header(data: &[u8]) -> Result<DosHeader> {
    if data.len() < DOS_HEADER_SIZE {
        return Err(PeError::TruncatedHeader {
            expected: DOS_HEADER_SIZE,
            actual: data.len(),
        });
    }

    let e_magic = u16_at(data, 0)?;
    if e_magic != DOS_SIGNATURE {
        return Err(PeError::InvalidDosSignature);
    }

    Ok(DosHeader {
        e_magic,
        e_lfanew: u32_at(data, 60)?,
    })
}

/// Parse COFF header from data at offset
pub fn parse_coff_header(data: &[u8], offset: usize) -> Result<CoffHeader> {
    let end = offset.saturating_add(COFF_HEADER_SIZE);
    if end > data.len() {
        return Err(PeError::TruncatedHeader {
            expected: end,
            actual: data.len(),
        });
    }

    Ok(CoffHeader {
        machine: Machine::from(u16_at(data, offset)?),
        number_of_sections: u16_at(data, offset + 2)?,
        time_date_stamp: u32_at(data, offset + 4)?,
        size_of_optional_header: u16_at(data, offset + 16)?,
        characteristics: u16_at(data, offset + 18)?,
    })
}

/// Read only the optional header magic.
///
/// The file-type label needs nothing more, so it does not pay for (or fail
/// on) the rest of the header.
pub fn peek_optional_magic(data: &[u8]) -> Result<(CoffHeader, u16)> {
    let dos = parse_dos_header(data)?;
    let pe_offset = dos.e_lfanew as usize;
    check_pe_signature(data, pe_offset)?;
    let coff = parse_coff_header(data, pe_offset + 4)?;
    let magic = u16_at(data, pe_offset + 4 + COFF_HEADER_SIZE)?;
    Ok((coff, magic))
}

/// Parse optional header from data at offset
pub fn parse_optional_header(data: &[u8], offset: usize, size: u16) -> Result<OptionalHeader> {
    let end = offset.saturating_add(size as usize);
    if size < 2 || end > data.len() {
        return Err(PeError::TruncatedHeader {
            expected: end.max(offset + 2),
            actual: data.len(),
        });
    }

    let magic = u16_at(data, offset)?;
    let (minimum, wide) = match magic {
        PE32_MAGIC => (96u16, false),
        PE32PLUS_MAGIC => (112u16, true),
        _ => return Err(PeError::InvalidMagic(magic)),
    };
    if size < minimum {
        return Err(PeError::TruncatedHeader {
            expected: offset + minimum as usize,
            actual: end,
        });
    }

    // PE32+ drops BaseOfData and widens ImageBase and the four stack/heap
    // sizes; everything between them sits at the same offsets.
    let image_base = if wide {
        u64_at(data, offset + 24)?
    } else {
        u32_at(data, offset + 28)? as u64
    };
    let rva_count_offset = if wide { offset + 108 } else { offset + 92 };

    Ok(OptionalHeader {
        magic,
        size_of_code: u32_at(data, offset + 4)?,
        address_of_entry_point: u32_at(data, offset + 16)?,
        image_base,
        section_alignment: u32_at(data, offset + 32)?,
        file_alignment: u32_at(data, offset + 36)?,
        size_of_image: u32_at(data, offset + 56)?,
        size_of_headers: u32_at(data, offset + 60)?,
        checksum: u32_at(data, offset + 64)?,
        subsystem: u16_at(data, offset + 68)?,
        dll_characteristics: u16_at(data, offset + 70)?,
        number_of_rva_and_sizes: u32_at(data, rva_count_offset)?,
    })
}

/// Parse data directories from data at offset
///
/// Entries past the end of the optional header or the file are left empty;
/// the result always has [`IMAGE_NUMBEROF_DIRECTORY_ENTRIES`] slots.
pub fn parse_data_directories(
    data: &[u8],
    offset: usize,
    count: u32,
    limit: usize,
) -> Vec<DataDirectory> {
    let mut directories = vec![DataDirectory::default(); IMAGE_NUMBEROF_DIRECTORY_ENTRIES];
    let count = (count as usize).min(IMAGE_NUMBEROF_DIRECTORY_ENTRIES);

    for (i, slot) in directories.iter_mut().enumerate().take(count) {
        let dir_offset = offset + i * 8;
        if dir_offset + 8 > limit {
            break;
        }
        if let (Ok(virtual_address), Ok(size)) =
            (u32_at(data, dir_offset), u32_at(data, dir_offset + 4))
        {
            *slot = DataDirectory {
                virtual_address,
                size,
            };
        }
    }

    directories
}

fn check_pe_signature(data: &[u8], offset: usize) -> Result<()> {
    let end = offset.saturating_add(PE_SIGNATURE.len());
    match data.get(offset..end) {
        Some(sig) if sig == PE_SIGNATURE => Ok(()),
        Some(_) => Err(PeError::InvalidPeSignature),
        None => Err(PeError::TruncatedHeader {
            expected: end,
            actual: data.len(),
        }),
    }
}

/// Parse NT headers (PE signature + COFF + Optional)
pub fn parse_nt_headers(data: &[u8], offset: usize) -> Result<(NtHeaders, Vec<DataDirectory>)> {
    check_pe_signature(data, offset)?;

    let coff_header = parse_coff_header(data, offset + 4)?;

    let opt_offset = offset + 4 + COFF_HEADER_SIZE;
    let optional_header =
        parse_optional_header(data, opt_offset, coff_header.size_of_optional_header)?;

    let dir_offset = opt_offset + if optional_header.is_64bit() { 112 } else { 96 };
    let opt_end = opt_offset + coff_header.size_of_optional_header as usize;
    let directories = parse_data_directories(
        data,
        dir_offset,
        optional_header.number_of_rva_and_sizes,
        opt_end,
    );

    let nt_headers = NtHeaders {
        file_header: coff_header,
        optional_header,
    };

    Ok((nt_headers, directories))
}

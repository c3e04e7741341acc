use std::fs;
use std::path::Path;

use goblin::elf::program_header::PT_LOAD;
use goblin::elf::section_header::{SHF_ALLOC, SHT_NOBITS};
use goblin::elf::{Elf, ProgramHeader};
use tracing::debug;

use crate::error::{BuildError, BuildResult};
use crate::toolchain::Extractor;

/// Images larger than this are almost certainly a link-address mistake
/// (e.g. `.data` placed gigabytes away from `.text`).
pub const DEFAULT_MAX_IMAGE_SIZE: u64 = 64 * 1024 * 1024;

/// In-process equivalent of `objcopy -O binary` for ELF containers.
///
/// Takes every allocated section that has file contents, orders them by load
/// address, and lays them out starting at the lowest one. Gaps the linker left
/// between sections are zero-filled; nothing is added before the first or
/// after the last section.
#[derive(Debug, Clone)]
pub struct ElfExtractor {
    pub max_image_size: u64,
}

impl Default for ElfExtractor {
    fn default() -> Self {
        Self { max_image_size: DEFAULT_MAX_IMAGE_SIZE }
    }
}

/// One allocated, file-backed section of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadableSection<'a> {
    pub name: String,
    pub load_address: u64,
    pub data: &'a [u8],
}

impl Extractor for ElfExtractor {
    fn name(&self) -> &str {
        "elf"
    }

    fn extract(&self, container: &Path) -> BuildResult<Vec<u8>> {
        let bytes = fs::read(container).map_err(|e| BuildError::io(container, e))?;
        let fail = |reason: String| BuildError::ExtractionFailed {
            path: container.to_path_buf(),
            reason,
        };

        let elf = Elf::parse(&bytes).map_err(|e| fail(format!("not a valid ELF file: {e}")))?;
        debug!(
            container = %container.display(),
            machine = elf.header.e_machine,
            sections = elf.section_headers.len(),
            "parsed ELF container"
        );

        let mut sections = Vec::new();
        for sh in &elf.section_headers {
            let allocated = sh.sh_flags & u64::from(SHF_ALLOC) != 0;
            if sh.sh_type == SHT_NOBITS || !allocated || sh.sh_size == 0 {
                continue;
            }
            let name = elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("<unnamed>").to_string();
            let data = usize::try_from(sh.sh_offset)
                .ok()
                .zip(usize::try_from(sh.sh_size).ok())
                .and_then(|(start, len)| bytes.get(start..start.checked_add(len)?))
                .ok_or_else(|| fail(format!("section {name} lies outside the file")))?;
            sections.push(LoadableSection {
                load_address: load_address(&elf.program_headers, sh.sh_addr),
                name,
                data,
            });
        }

        flatten_sections(sections, self.max_image_size).map_err(fail)
    }

    fn version(&self) -> Option<String> {
        Some(format!("built-in (flatbin-core {})", crate::version()))
    }
}

/// Map a section's virtual address to its load address via the PT_LOAD
/// segment containing it. Sections outside any segment load where they link.
fn load_address(segments: &[ProgramHeader], vaddr: u64) -> u64 {
    segments
        .iter()
        .filter(|ph| ph.p_type == PT_LOAD)
        .find(|ph| vaddr >= ph.p_vaddr && vaddr < ph.p_vaddr.saturating_add(ph.p_memsz))
        .map(|ph| ph.p_paddr.wrapping_add(vaddr - ph.p_vaddr))
        .unwrap_or(vaddr)
}

/// Lay sections out as one contiguous image starting at the lowest load
/// address. Overlapping sections are an error.
pub fn flatten_sections(
    mut sections: Vec<LoadableSection<'_>>,
    max_image_size: u64,
) -> Result<Vec<u8>, String> {
    sections.sort_by(|a, b| a.load_address.cmp(&b.load_address).then(a.name.cmp(&b.name)));
    let Some(first) = sections.first() else {
        return Ok(Vec::new());
    };
    let base = first.load_address;

    let mut end = base;
    for section in &sections {
        if section.load_address < end {
            return Err(format!(
                "section {} at 0x{:x} overlaps the previous section ending at 0x{:x}",
                section.name, section.load_address, end
            ));
        }
        end = section.load_address.checked_add(section.data.len() as u64).ok_or_else(|| {
            format!(
                "section {} at 0x{:x} runs past the address space",
                section.name, section.load_address
            )
        })?;
    }
    let span = end - base;
    if span > max_image_size {
        return Err(format!(
            "image would span {span} bytes (0x{base:x}..0x{end:x}), above the {max_image_size} byte limit"
        ));
    }

    let mut image = vec![0u8; span as usize];
    for section in &sections {
        let offset = (section.load_address - base) as usize;
        image[offset..offset + section.data.len()].copy_from_slice(section.data);
    }
    Ok(image)
}

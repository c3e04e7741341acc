#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flatbin_core::config::LinkConfig;
use flatbin_core::toolchain::{Compiler, ElfExtractor, Toolchain};
use flatbin_core::{BuildError, BuildResult};
use object::write::Object;
use object::{Architecture, BinaryFormat, Endianness, SectionKind};

/// `addi x31, x0, 6`
pub const ADDI_X31_6: u32 = 0x00600f93;
/// `j .` (jal x0, 0)
pub const JUMP_TO_SELF: u32 = 0x0000006f;

/// Stand-in for a cross compiler that understands just enough to be useful:
///
/// - assembly: `.word 0x...` lines become `.text` of a RISC-V ELF object;
///   labels, directives starting with `.globl`/`.section`, comments, and blank
///   lines are ignored; anything else is a syntax error.
/// - C: `emit(0x...);` lines lower to `.word 0x...`; `#error` is rejected.
#[derive(Debug, Clone, Default)]
pub struct FakeCompiler {
    pub links: Arc<AtomicUsize>,
    pub lowerings: Arc<AtomicUsize>,
}

impl FakeCompiler {
    pub fn link_count(&self) -> usize {
        self.links.load(Ordering::SeqCst)
    }

    pub fn lowering_count(&self) -> usize {
        self.lowerings.load(Ordering::SeqCst)
    }
}

impl Compiler for FakeCompiler {
    fn name(&self) -> &str {
        "fake-cc"
    }

    fn lower_to_assembly(&self, source: &Path, output: &Path) -> BuildResult<()> {
        self.lowerings.fetch_add(1, Ordering::SeqCst);
        let body = fs::read_to_string(source).expect("read C source");
        let mut asm = String::from("    .globl _start\n_start:\n");
        for line in body.lines().map(str::trim) {
            if line.starts_with("#error") {
                return Err(reject(source, line));
            }
            if let Some(word) = line.strip_prefix("emit(").and_then(|l| l.strip_suffix(");")) {
                asm.push_str(&format!("    .word {word}\n"));
            }
        }
        fs::write(output, asm).expect("write lowered assembly");
        Ok(())
    }

    fn assemble_and_link(
        &self,
        source: &Path,
        output: &Path,
        _link: &LinkConfig,
    ) -> BuildResult<()> {
        self.links.fetch_add(1, Ordering::SeqCst);
        let body = fs::read_to_string(source).expect("read assembly source");
        let mut code = Vec::new();
        for raw in body.lines() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty()
                || line.ends_with(':')
                || line.starts_with(".globl")
                || line.starts_with(".section")
            {
                continue;
            }
            let word = line
                .strip_prefix(".word")
                .map(str::trim)
                .and_then(|w| u32::from_str_radix(w.trim_start_matches("0x"), 16).ok())
                .ok_or_else(|| reject(source, line))?;
            code.extend_from_slice(&word.to_le_bytes());
        }
        fs::write(output, riscv_elf(&code)).expect("write container");
        Ok(())
    }
}

fn reject(path: &Path, line: &str) -> BuildError {
    BuildError::SourceRejected {
        path: path.to_path_buf(),
        tool: "fake-cc".into(),
        diagnostic: format!("Error: unrecognized opcode `{line}'"),
    }
}

/// Relocatable RISC-V ELF whose only allocated section is `.text` = `code`.
pub fn riscv_elf(code: &[u8]) -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::Riscv64, Endianness::Little);
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    obj.section_mut(text).set_data(code.to_vec(), 4);
    obj.write().expect("write ELF")
}

/// Toolchain made of the fake compiler and the built-in ELF extractor.
pub fn fake_toolchain() -> (Toolchain, FakeCompiler) {
    let compiler = FakeCompiler::default();
    let toolchain = Toolchain::new(Box::new(compiler.clone()), Box::new(ElfExtractor::default()));
    (toolchain, compiler)
}

/// Assembly fixture: one `addi`, then a branch to itself.
pub fn write_add_addi(dir: &Path) -> PathBuf {
    write(
        dir,
        "add-addi.s",
        &format!(
            "    .globl _start\n_start:\n    .word 0x{ADDI_X31_6:08x}  # addi x31, x0, 6\nloop:\n    .word 0x{JUMP_TO_SELF:08x}  # j loop\n"
        ),
    )
}

pub fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write fixture");
    path
}

/// The bytes an image of `words` must contain.
pub fn le_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

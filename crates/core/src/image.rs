//! Flat image artifacts and checks on their contents.

use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{BuildError, BuildResult};

const ELF_MAGIC: &[u8] = b"\x7fELF";

/// Container formats a flat image should not start with.
///
/// Only ELF is unambiguous: `0x7f` is a reserved RISC-V opcode, so no program
/// can begin with it. The other magics are also valid instruction encodings
/// (`MZ` is `c.li s4, -13`) and only hint at a container.
const CONTAINER_MAGICS: &[(&str, &[u8])] = &[
    ("ELF", ELF_MAGIC),
    ("Mach-O (32-bit)", &[0xfe, 0xed, 0xfa, 0xce]),
    ("Mach-O (64-bit)", &[0xfe, 0xed, 0xfa, 0xcf]),
    ("Mach-O (32-bit, LE)", &[0xce, 0xfa, 0xed, 0xfe]),
    ("Mach-O (64-bit, LE)", &[0xcf, 0xfa, 0xed, 0xfe]),
    ("PE/COFF", b"MZ"),
];

/// Name of the container format whose magic `bytes` starts with, if any.
pub fn container_magic(bytes: &[u8]) -> Option<&'static str> {
    CONTAINER_MAGICS.iter().find(|(_, magic)| bytes.starts_with(magic)).map(|(name, _)| *name)
}

/// True when `bytes` can only be an ELF file, never RISC-V code.
pub fn is_elf_container(bytes: &[u8]) -> bool {
    bytes.starts_with(ELF_MAGIC)
}

/// A flat image written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    pub path: PathBuf,
    pub len: u64,
    /// Hex SHA-256 of the image bytes.
    pub sha256: String,
}

impl ImageArtifact {
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        Self { path: path.into(), len: bytes.len() as u64, sha256: sha256_hex(bytes) }
    }

    /// Describe an image already on disk.
    pub fn from_file(path: &Path) -> BuildResult<Self> {
        let len = fs::metadata(path).map_err(|e| BuildError::io(path, e))?.len();
        Ok(Self { path: path.to_path_buf(), len, sha256: sha256_file(path)? })
    }
}

/// Compute the SHA-256 of a byte slice as a hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Compute the SHA-256 hash of a file and return it as a hex string.
pub fn sha256_file(path: &Path) -> BuildResult<String> {
    let file = fs::File::open(path).map_err(|e| BuildError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut buf).map_err(|e| BuildError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Split an image into little-endian 32-bit words (trailing bytes zero-padded).
pub fn le_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks(4)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(word)
        })
        .collect()
}

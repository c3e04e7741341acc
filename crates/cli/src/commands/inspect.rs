use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use flatbin_core::image::{container_magic, le_words, ImageArtifact};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ImageSummary {
    path: String,
    len: u64,
    sha256: String,
    container: Option<&'static str>,
    words: Vec<String>,
}

/// Summarize a flat image: size, hash, leftover container magic, leading words.
pub fn inspect_command(path: &str, words: usize, json: bool) -> Result<()> {
    let path = Path::new(path);
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let artifact = ImageArtifact::from_bytes(path, &bytes);
    let summary = ImageSummary {
        path: artifact.path.display().to_string(),
        len: artifact.len,
        sha256: artifact.sha256,
        container: container_magic(&bytes),
        words: le_words(&bytes).into_iter().take(words).map(|w| format!("0x{w:08x}")).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Image: {}", summary.path);
    println!("  Length: {} bytes", summary.len);
    println!("  SHA-256: {}", summary.sha256);
    match summary.container {
        Some(kind) => println!("  Container: {} header present (not a flat image)", kind),
        None => println!("  Container: none"),
    }
    if bytes.len() % 4 != 0 {
        println!("  Note: length is not a multiple of 4");
    }
    for (i, word) in summary.words.iter().enumerate() {
        println!("  +0x{:04x}: {}", i * 4, word);
    }
    Ok(())
}

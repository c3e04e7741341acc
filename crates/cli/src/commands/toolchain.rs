use anyhow::Result;
use flatbin_core::toolchain::gnu::{GnuCompiler, ObjcopyExtractor};
use flatbin_core::{BuildConfig, Compiler, Extractor, ExtractorKind};

use crate::commands::util::locate_tool;

/// Report which cross tools the current configuration resolves to.
pub fn toolchain_command(config: &BuildConfig) -> Result<()> {
    let gcc = config.toolchain.gcc_path();
    let objcopy = config.toolchain.objcopy_path();

    println!("Toolchain prefix: {}", config.toolchain.prefix);
    match locate_tool(&gcc) {
        Some(path) => {
            let version = GnuCompiler::from_config(&config.toolchain)
                .version()
                .unwrap_or_else(|| "unknown version".into());
            println!("  gcc: {} ({})", path.display(), version);
        }
        None => println!("  gcc: {} (not found)", gcc.display()),
    }
    match config.extractor {
        ExtractorKind::Objcopy => match locate_tool(&objcopy) {
            Some(path) => {
                let version = ObjcopyExtractor::new(&objcopy)
                    .version()
                    .unwrap_or_else(|| "unknown version".into());
                println!("  objcopy: {} ({})", path.display(), version);
            }
            None => println!("  objcopy: {} (not found)", objcopy.display()),
        },
        ExtractorKind::Elf => println!("  extractor: built-in ELF reader"),
    }
    println!("  base address: 0x{:x}", config.link.base_address);
    Ok(())
}

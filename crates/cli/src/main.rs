use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use flatbin::commands::{
    build_command, clean_command, discover_command, inspect_command, parse_address,
    resolve_config, test_command, toolchain_command, BuildOverrides,
};
use flatbin::init_tracing;

/// Builds flat RISC-V test images from assembly and C fixtures.
///
/// Each `.s`/`.c` file in the fixtures directory is compiled without any
/// runtime, linked at a fixed base address (0 by default) and stripped down to
/// the raw bytes a simulator loads at that address.
#[derive(Parser, Debug)]
#[command(name = "flatbin", version, about = "Flat RISC-V image builder", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (JSON or YAML). Defaults to `flatbin.json` if present.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the fixtures that would be built.
    Discover {
        #[command(flatten)]
        build: BuildArgs,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Build every fixture into a flat image.
    ///
    /// Exits nonzero if any fixture failed to produce an image.
    Build {
        #[command(flatten)]
        build: BuildArgs,

        /// Emit the build report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Remove generated images and lowered assembly.
    Clean {
        #[command(flatten)]
        build: BuildArgs,
    },

    /// Build every fixture, then run a test command once all images exist.
    ///
    /// The command sees the fixtures directory in `FLATBIN_FIXTURES_DIR`.
    Test {
        #[command(flatten)]
        build: BuildArgs,

        /// Test command and its arguments, e.g. `-- cargo test -p rvsim`.
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Summarize an existing image.
    Inspect {
        /// Path to the image.
        path: String,

        /// How many leading 32-bit words to show.
        #[arg(long, default_value_t = 8)]
        words: usize,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show which cross tools the configuration resolves to.
    Toolchain {
        #[command(flatten)]
        build: BuildArgs,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Fixtures directory. Overrides the config file; defaults to `tests`.
    #[arg(long)]
    fixtures: Option<String>,

    /// Cross-toolchain prefix, e.g. `riscv64-unknown-elf-`.
    #[arg(long)]
    prefix: Option<String>,

    /// Explicit compiler driver path.
    #[arg(long)]
    gcc: Option<String>,

    /// Explicit objcopy path.
    #[arg(long)]
    objcopy: Option<String>,

    /// Target ISA string passed as `-march`.
    #[arg(long)]
    march: Option<String>,

    /// Target ABI passed as `-mabi`.
    #[arg(long)]
    mabi: Option<String>,

    /// Link base address (hex or decimal).
    #[arg(long, value_parser = parse_address)]
    base_address: Option<u64>,

    /// Extraction backend: `objcopy` or `elf`.
    #[arg(long)]
    extractor: Option<String>,

    /// Ignore `.c` fixtures.
    #[arg(long, default_value_t = false)]
    no_c: bool,

    /// Parallel builds (0 = one per CPU).
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Stop starting new fixtures after the first failure.
    #[arg(long, default_value_t = false)]
    fail_fast: bool,

    /// Rebuild even if images are newer than their sources.
    #[arg(long, default_value_t = false)]
    force: bool,
}

impl From<BuildArgs> for BuildOverrides {
    fn from(args: BuildArgs) -> Self {
        Self {
            fixtures: args.fixtures,
            prefix: args.prefix,
            gcc: args.gcc,
            objcopy: args.objcopy,
            march: args.march,
            mabi: args.mabi,
            base_address: args.base_address,
            extractor: args.extractor,
            no_c: args.no_c,
            jobs: args.jobs,
            fail_fast: args.fail_fast,
            force: args.force,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Discover { build, json } => {
            discover_command(&resolve_config(config_path, &build.into())?, json)?
        }
        Command::Build { build, json } => {
            build_command(&resolve_config(config_path, &build.into())?, json)?;
        }
        Command::Clean { build } => clean_command(&resolve_config(config_path, &build.into())?)?,
        Command::Test { build, command } => {
            let code = test_command(&resolve_config(config_path, &build.into())?, &command)?;
            std::process::exit(code);
        }
        Command::Inspect { path, words, json } => inspect_command(&path, words, json)?,
        Command::Toolchain { build } => {
            toolchain_command(&resolve_config(config_path, &build.into())?)?
        }
    }

    Ok(())
}

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Bytes of `addi x31, x0, 6; j .` as the fake objcopy emits them.
pub const ADD_ADDI_IMAGE: [u8; 8] = [0x93, 0x0f, 0x60, 0x00, 0x6f, 0x00, 0x00, 0x00];

/// A fixtures directory with a scripted toolchain and a config file pointing
/// at it.
///
/// The fake `gcc` is run through `/bin/sh` (the script is passed as the first
/// cflag); it rejects any source containing "syntax error", answers `-S` with a
/// trivial assembly file, and otherwise copies its input to `-o`. The fake
/// `objcopy` ignores its input and writes [`ADD_ADDI_IMAGE`].
pub struct Sandbox {
    pub root: tempfile::TempDir,
    pub fixtures: PathBuf,
    pub config: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let fixtures = root.path().join("fixtures");
        fs::create_dir_all(&fixtures).expect("create fixtures");
        let tools = root.path().join("tools");
        fs::create_dir_all(&tools).expect("create tools");

        let gcc = tools.join("fake-gcc.sh");
        fs::write(
            &gcc,
            r#"out=""
prev=""
src=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
  src="$a"
done
if grep -q "syntax error" "$src"; then
  echo "$src:1: Error: syntax error" >&2
  exit 1
fi
case " $* " in
  *" -S "*) printf '    .word 0x00600f93\n' > "$out" ;;
  *) cp "$src" "$out" ;;
esac
"#,
        )
        .expect("write fake gcc");

        let objcopy = tools.join("fake-objcopy");
        fs::write(
            &objcopy,
            "#!/bin/sh\nprintf '\\223\\017\\140\\000\\157\\000\\000\\000' > \"$4\"\n",
        )
        .expect("write fake objcopy");
        fs::set_permissions(&objcopy, fs::Permissions::from_mode(0o755)).expect("chmod");

        let config = root.path().join("flatbin.json");
        let body = serde_json::json!({
            "fixtures_dir": fixtures,
            "toolchain": {
                "gcc": "/bin/sh",
                "objcopy": objcopy,
                "cflags": [gcc],
            },
            "extractor": "objcopy",
        });
        fs::write(&config, serde_json::to_string_pretty(&body).expect("json"))
            .expect("write config");

        Self { root, fixtures, config }
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.fixtures.join(name);
        fs::write(&path, body).expect("write fixture");
        path
    }

    pub fn config_str(&self) -> &str {
        self.config.to_str().expect("utf-8 path")
    }

    pub fn image(&self, stem: &str) -> PathBuf {
        self.fixtures.join(format!("{stem}.bin"))
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}

/// `flatbin` with a hermetic environment rooted at `dir`.
pub fn flatbin(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flatbin");
    cmd.current_dir(dir).env_remove("FLATBIN_TOOLCHAIN_PREFIX").env_remove("RUST_LOG");
    cmd
}

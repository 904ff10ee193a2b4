use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use quote::quote;

use serde::Deserialize;

/// Environment variable holding the path of the MessagePack description written by `cargo juliac`
const DESCRIPTION_PATH_VAR: &str = "JULIAC_LAUNCHER_DESCRIPTION_PATH";

const SUPPORTED_VERSION: u8 = 1;

#[derive(Deserialize)]
struct LauncherDescription {
    version: Option<u8>,
    image_file: String,
    #[serde(default)]
    libdirs: Vec<PathBuf>,
    #[serde(default)]
    link_libs: Vec<String>,
}

impl LauncherDescription {
    /// Used when the crate is built on its own (tests, docs) rather than through `cargo juliac`
    fn fallback(target_os: &str) -> Self {
        let extension = match target_os {
            "windows" => "dll",
            "macos" | "ios" => "dylib",
            _ => "so",
        };

        Self {
            version: Some(SUPPORTED_VERSION),
            image_file: format!("sys.{extension}"),
            libdirs: Vec::new(),
            link_libs: Vec::new(),
        }
    }
}

/// Emits directives that carry over to the binaries depending on this crate
fn emit_link_directives(description: &LauncherDescription) {
    for libdir in &description.libdirs {
        println!("cargo:rustc-link-search=native={}", libdir.display());
    }
    for lib in &description.link_libs {
        println!("cargo:rustc-link-lib={lib}");
    }
}

fn main() {
    let out_dir = std::env::var_os("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("image.rs");
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    println!("cargo:rerun-if-env-changed={DESCRIPTION_PATH_VAR}");

    let description: LauncherDescription =
        if let Some(path) = std::env::var_os(DESCRIPTION_PATH_VAR) {
            println!("cargo:rerun-if-changed={}", Path::new(&path).display());

            let file = File::open(&path).expect("Failed to open the launcher description file");
            rmp_serde::from_read(BufReader::new(file))
                .expect("Failed to parse the launcher description file")
        } else {
            LauncherDescription::fallback(&target_os)
        };

    if description.version.unwrap_or(SUPPORTED_VERSION) > SUPPORTED_VERSION {
        panic!(
            "Unsupported launcher description version {:?} (expected at most {SUPPORTED_VERSION})",
            description.version
        );
    }
    if description.image_file.is_empty() || description.image_file.contains('\0') {
        panic!(
            "Invalid image file name {:?} in the launcher description",
            description.image_file
        );
    }

    if std::env::var_os("CARGO_FEATURE_JULIA").is_some() {
        emit_link_directives(&description);
    }

    let image_file = &description.image_file;
    let tokens = quote! {
        /// Name of the precompiled image handed to the runtime at initialization
        pub const IMAGE_FILE: &str = #image_file;
    };

    std::fs::write(dest_path, tokens.to_string()).unwrap();

    println!("cargo:rerun-if-changed=build.rs");
}

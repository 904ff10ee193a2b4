use std::path::{Path, PathBuf};

use anyhow::Context;

use serde::{Deserialize, Serialize};

use target_lexicon::{Environment, OperatingSystem, Triple};

/// What the launcher build script needs to know: which image to boot and how to link against it.
///
/// Written as MessagePack and handed to the build through `JULIAC_LAUNCHER_DESCRIPTION_PATH`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct LauncherDescription {
    version: u8,

    /// Image file name passed to the runtime at initialization
    image_file: String,

    /// Native library search directories
    libdirs: Vec<PathBuf>,

    /// Values of `cargo:rustc-link-lib` (e.g., `dylib=app`)
    link_libs: Vec<String>,
}

/// `cargo:rustc-link-lib` value that links `image` into the launcher executable.
///
/// Link-lib directives of a library reach the binaries depending on it, unlike link args.
fn image_link_lib(image: &Path, triple: &Triple) -> anyhow::Result<String> {
    let file_name = image
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid image file name `{}`", image.display()))?;
    let stem = image
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid image file name `{}`", image.display()))?;

    if triple.environment == Environment::Msvc {
        // Linked through its import library
        return Ok(format!("dylib={stem}"));
    }

    let darwin = triple.operating_system.is_like_darwin();
    let dylib_extension = if triple.operating_system == OperatingSystem::Windows {
        "dll"
    } else if darwin {
        "dylib"
    } else {
        "so"
    };
    let extension = image.extension().and_then(|extension| extension.to_str());
    match stem.strip_prefix("lib") {
        Some(name) if !name.is_empty() && extension == Some(dylib_extension) => {
            Ok(format!("dylib={name}"))
        }
        _ if darwin => anyhow::bail!(
            "The image `{}` must be named `lib<name>.{dylib_extension}` to be linked on this target",
            image.display()
        ),
        _ => Ok(format!("dylib:+verbatim={file_name}")),
    }
}

impl LauncherDescription {
    pub const VERSION: u8 = 1;

    /// Environment variable read by the launcher build script
    pub const PATH_VAR: &'static str = "JULIAC_LAUNCHER_DESCRIPTION_PATH";

    /// Describes a launcher for `image` built for `triple`, linked against libjulia found in `libdirs`.
    ///
    /// `image` must be an absolute path. Its directory is searched first.
    pub fn new(
        image: &Path,
        image_file: String,
        libdirs: Vec<PathBuf>,
        triple: &Triple,
    ) -> anyhow::Result<Self> {
        let link_libs = vec![image_link_lib(image, triple)?];
        let libdirs = image
            .parent()
            .map(Path::to_path_buf)
            .into_iter()
            .chain(libdirs)
            .collect();

        Ok(Self {
            version: Self::VERSION,
            image_file,
            libdirs,
            link_libs,
        })
    }

    /// Writes the description into `path`
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        let encoded =
            rmp_serde::to_vec_named(self).context("Failed to encode the launcher description")?;

        std::fs::write(path, encoded)
            .with_context(|| format!("Failed to write to `{}`", path.display()))
    }
}

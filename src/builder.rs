use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Context;

use escargot::CargoBuild;

use crate::cargo::CommandMessagesExt;
use crate::description::LauncherDescription;

const LAUNCHER_MAIN: &str = "#![no_main]

#[cfg(not(windows))]
pub use juliac_launcher::main;
#[cfg(windows)]
pub use juliac_launcher::wmain;
";

/// Build script of the launcher package, embedding `rpaths` in its binary
fn build_script(rpaths: &[String]) -> String {
    let directives: String = rpaths
        .iter()
        .map(|rpath| {
            format!("    println!(\"cargo:rustc-link-arg-bins=-Wl,-rpath,{{}}\", {rpath:?});\n")
        })
        .collect();

    format!("fn main() {{\n{directives}}}\n")
}

pub struct LauncherBuilder {
    output_directory: PathBuf,
    manifest_path: PathBuf,
}

impl LauncherBuilder {
    /// Generates the sources of the crate to build the launcher, embedding `rpaths` in the executable
    pub fn generate_crate_sources(
        output_directory: PathBuf,
        launcher_version: &str,
        rpaths: &[String],
    ) -> anyhow::Result<Self> {
        let root_directory = output_directory.join("package-launcher");
        let src_directory = root_directory.join("src");
        let manifest_path = root_directory.join("Cargo.toml");
        let main_path = src_directory.join("main.rs");
        let build_script_path = root_directory.join("build.rs");
        let local_launcher_dependency =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("juliac-launcher");

        let manifest = Self::manifest(
            launcher_version,
            local_launcher_dependency
                .exists()
                .then_some(local_launcher_dependency.as_path()),
        );

        std::fs::create_dir_all(&src_directory).with_context(|| {
            format!("Failed to create directory `{}`", src_directory.display())
        })?;
        std::fs::write(&manifest_path, manifest)
            .with_context(|| format!("Failed to write to `{}`", manifest_path.display()))?;
        std::fs::write(&main_path, LAUNCHER_MAIN)
            .with_context(|| format!("Failed to write to `{}`", main_path.display()))?;
        std::fs::write(&build_script_path, build_script(rpaths)).with_context(|| {
            format!("Failed to write to `{}`", build_script_path.display())
        })?;

        Ok(Self {
            output_directory,
            manifest_path,
        })
    }

    fn manifest(launcher_version: &str, local_dependency: Option<&Path>) -> String {
        let dependency = if let Some(path) = local_dependency {
            let path = path.to_string_lossy().replace('\\', "/");
            format!(
                r#"juliac-launcher = {{ version = "{launcher_version}", path = "{path}", features = ["julia"] }}"#,
            )
        } else {
            format!(
                r#"juliac-launcher = {{ version = "{launcher_version}", features = ["julia"] }}"#
            )
        };

        format!(
            r#"
        [package]
        name = "package-juliac"
        version = "0.1.0"
        edition = "2024"

        [dependencies]
        {dependency}

        [profile.release]
        lto = true
        strip = "symbols"
        opt-level = "z"
        codegen-units = 1
        panic = "abort"

        [workspace]
        "#
        )
    }

    /// Builds a launcher for the image described in `description_path`, named `filename`
    pub fn build(
        &self,
        target: &str,
        profile: &str,
        cargo_args: &[String],
        description_path: &Path,
        filename: &OsStr,
    ) -> anyhow::Result<PathBuf> {
        let cargo = CargoBuild::new()
            .arg(format!("--profile={profile}"))
            .target(target)
            .target_dir(&self.output_directory)
            .manifest_path(&self.manifest_path)
            .args(cargo_args)
            .env(LauncherDescription::PATH_VAR, description_path);

        let cargo = cargo
            .exec()
            .context("Failed to execute cargo to build the launcher")?;

        let bin_path = cargo
            .find_executable()?
            .ok_or_else(|| anyhow::anyhow!("Failed to build the launcher"))?;

        let mut output_path = bin_path.clone();
        output_path.set_file_name(filename);

        std::fs::rename(&bin_path, &output_path).with_context(|| {
            format!(
                "Failed to rename `{}` to `{}`",
                bin_path.display(),
                output_path.display()
            )
        })?;

        Ok(output_path)
    }
}

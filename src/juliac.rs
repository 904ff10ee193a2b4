use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use clap::ColorChoice;

use target_lexicon::{OperatingSystem, Triple};

use indicatif::{ProgressBar, ProgressStyle};

use console::style;

use crate::builder::LauncherBuilder;
use crate::cli::Args;
use crate::description::LauncherDescription;

/// Builds a native launcher that boots a precompiled image and calls its `julia_main`
pub struct Juliac {
    image: PathBuf,
    image_file: String,
    filename: OsString,
    julia_libdirs: Vec<PathBuf>,
    target: String,
    triple: Triple,
    launcher: LauncherBuilder,
    target_dir: PathBuf,
    out_dir: Option<PathBuf>,
    progress: ProgressBar,
    profile: String,
    cargo_args: Vec<String>,
}

/// File name of the launcher: `name` if given, the stem of the image otherwise.
fn launcher_filename(image: &Path, name: Option<&str>, windows: bool) -> anyhow::Result<OsString> {
    let mut filename = match name {
        Some(name) => {
            if name.is_empty() || name.contains(['/', '\\']) {
                anyhow::bail!("Invalid launcher name `{name}`: expected a file name");
            }
            OsString::from(name)
        }
        None => image
            .file_stem()
            .map(ToOwned::to_owned)
            .ok_or_else(|| anyhow::anyhow!("Invalid image path `{}`", image.display()))?,
    };

    if windows && Path::new(&filename).extension().is_none() {
        filename.push(".exe");
    }

    Ok(filename)
}

/// Name the runtime receives for the image: `image_name` if given, the file name of the image otherwise.
fn image_file_name(image: &Path, image_name: Option<&str>) -> anyhow::Result<String> {
    let image_file = match image_name {
        Some(name) => name.to_owned(),
        None => image
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .ok_or_else(|| {
                anyhow::anyhow!("The image file name `{}` is not valid UTF-8", image.display())
            })?,
    };

    if image_file.is_empty() || image_file.contains('\0') {
        anyhow::bail!("Invalid image name `{image_file}`");
    }

    Ok(image_file)
}

impl Juliac {
    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        if args.color == ColorChoice::Never {
            console::set_colors_enabled(false);
        } else if args.color == ColorChoice::Always {
            console::set_colors_enabled(true);
        }

        let image = args.image.canonicalize().with_context(|| {
            format!("Failed to find the image `{}`", args.image.display())
        })?;
        if !image.is_file() {
            anyhow::bail!("The image `{}` is not a file", image.display());
        }
        let image_file = image_file_name(&image, args.image_name.as_deref())?;

        let target = args.target()?.into_owned();
        let triple = Triple::from_str(&target).context("Failed to parse the target")?;
        let windows = triple.operating_system == OperatingSystem::Windows;
        let filename = launcher_filename(&image, args.name.as_deref(), windows)?;

        let rpaths = if windows {
            for rpath in &args.rpath {
                eprintln!(
                    "{}: ignoring rpath `{rpath}`: not supported on Windows",
                    style("warning").bold().yellow()
                );
            }
            Vec::new()
        } else {
            args.rpath
        };

        let target_dir = match args.target_dir {
            Some(target_dir) => target_dir,
            None => std::env::current_dir()
                .context("Failed to get the current directory")?
                .join("target"),
        }
        .join(clap::crate_name!());

        let launcher = LauncherBuilder::generate_crate_sources(
            target_dir.clone(),
            &args.launcher_version,
            &rpaths,
        )
        .context("Failed to generate the source files of the launcher")?;

        let progress = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{prefix:>12.cyan.bold} {spinner} {wide_msg}")?,
        );

        Ok(Self {
            image,
            image_file,
            filename,
            julia_libdirs: args.julia_libdir,
            target,
            triple,
            launcher,
            target_dir,
            out_dir: args.out_dir,
            progress,
            profile: args.profile,
            cargo_args: args.args,
        })
    }

    fn description(&self) -> anyhow::Result<LauncherDescription> {
        LauncherDescription::new(
            &self.image,
            self.image_file.clone(),
            self.julia_libdirs.clone(),
            &self.triple,
        )
    }

    pub fn build(&self) -> anyhow::Result<()> {
        println!(
            "{:>12} launcher for {} ({})",
            style("Compiling").bold().green(),
            self.image_file,
            self.image.display()
        );

        let description = self.description()?;
        std::fs::create_dir_all(&self.target_dir).with_context(|| {
            format!("Failed to create directory `{}`", self.target_dir.display())
        })?;
        let description_path = self.target_dir.join("launcher.msgpack");
        description.write_to(&description_path)?;

        self.progress.set_prefix("Building");
        self.progress.set_message(self.filename.to_string_lossy().into_owned());
        self.progress.enable_steady_tick(Duration::from_millis(200));

        let bin_path = self.launcher.build(
            &self.target,
            &self.profile,
            &self.cargo_args,
            &description_path,
            &self.filename,
        );
        self.progress.finish_and_clear();
        let bin_path = bin_path?;

        if let Some(out_dir) = self.out_dir.as_deref() {
            std::fs::create_dir_all(out_dir).with_context(|| {
                format!("Failed to create output directory `{}`", out_dir.display())
            })?;
            let to = out_dir.join(&self.filename);
            std::fs::copy(&bin_path, &to).with_context(|| {
                format!(
                    "Failed to copy `{}` to `{}`",
                    bin_path.display(),
                    to.display()
                )
            })?;
        }

        println!(
            "{:>12} ({})",
            style("Finished").bold().green(),
            bin_path.display()
        );

        Ok(())
    }
}

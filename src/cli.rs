use std::borrow::Cow;
use std::path::PathBuf;

use clap::ColorChoice;

use crate::rustc::Rustc;

#[derive(clap::Parser)]
#[command(name = "cargo", bin_name = "cargo")]
pub enum Cargo {
    #[command(name = "juliac", version, author, about, long_about)]
    Juliac(Args),
}

#[derive(clap::Args)]
pub struct Args {
    /// Precompiled image (shared library) exporting `julia_main`
    #[clap(long, value_name = "PATH")]
    pub image: PathBuf,

    /// Image file name given to the runtime at startup [default: file name of --image]
    #[clap(long, value_name = "NAME")]
    pub image_name: Option<String>,

    /// Directory containing libjulia (can be repeated)
    #[clap(long, value_name = "DIR")]
    pub julia_libdir: Vec<PathBuf>,

    /// Runtime search path embedded in the launcher, e.g. `$ORIGIN/../lib` (can be repeated)
    #[clap(long, value_name = "PATH")]
    pub rpath: Vec<String>,

    /// File name of the launcher [default: file stem of --image]
    #[clap(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Build for the target triple
    #[clap(long, value_name = "TRIPLE")]
    pub target: Option<String>,

    /// Specify the version of the launcher library to use
    #[clap(long, value_name = "VERSION", default_value = "0.1")]
    pub launcher_version: String,

    /// Build artifacts with the specified profile
    #[clap(long, value_name = "PROFILE-NAME", default_value = "release")]
    pub profile: String,

    /// Color preferences for program output
    #[clap(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Target directory; generated artifacts go in its `cargo-juliac` subdirectory [default: target]
    #[clap(long, value_name = "DIRECTORY")]
    pub target_dir: Option<PathBuf>,

    /// Copy final artifacts to this directory
    #[clap(long, value_name = "PATH")]
    pub out_dir: Option<PathBuf>,

    /// Arguments given to cargo build
    #[clap(raw = true)]
    pub args: Vec<String>,
}

impl Args {
    /// Returns the target given on the command line or the default target that rustc uses to build if none is provided
    pub fn target(&self) -> anyhow::Result<Cow<'_, str>> {
        self.target.as_deref().map_or_else(
            || Rustc::default_target().map(Cow::Owned),
            |target| Ok(target.into()),
        )
    }
}

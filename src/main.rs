//! `cargo juliac`: builds a native launcher for a precompiled Julia image.

use clap::Parser;

mod builder;
mod cargo;
mod cli;
mod description;
mod juliac;
mod rustc;

use crate::cli::Cargo;
use crate::juliac::Juliac;

fn main() -> anyhow::Result<()> {
    let Cargo::Juliac(args) = Cargo::parse();

    let juliac = Juliac::from_args(args)?;
    juliac.build()?;

    Ok(())
}

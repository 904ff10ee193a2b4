//! Native launcher for programs compiled into a Julia system image.
//!
//! The launcher turns the OS process entry (`main`, or `wmain` on Windows) into the calls the
//! runtime expects:
//!
//! 1. the arguments are normalized to UTF-8,
//! 2. `JULIA_DEPOT_PATH` is set to the grandparent directory of the executable and
//!    `JULIA_LOAD_PATH` to the active project,
//! 3. the runtime boots from the image selected at build time,
//! 4. `Core.ARGS`, `Base.ARGS` and `Base.PROGRAM_FILE` are populated,
//! 5. `julia_main(ARGS)` runs and its return value becomes the exit status.
//!
//! With the `julia` feature the crate links against `libjulia` and exports the entry symbol, so a
//! binary only needs:
//!
//! ```ignore
//! #![no_main]
//! pub use juliac_launcher::main;
//! ```

mod args;
mod depot;
#[cfg(feature = "julia")]
mod entry;
mod error;
mod launcher;
mod process;
pub mod runtime;

pub use args::{Arguments, NarrowEntry, PlatformEntry, ProcessEntry, WideEntry};
pub use depot::depot_path;
pub use error::LaunchError;
pub use launcher::Launcher;
pub use process::{ACTIVE_PROJECT, DEPOT_PATH_VAR, HostProcess, LOAD_PATH_VAR, Process, check_var};
pub use runtime::{ImageFile, Runtime};

#[cfg(all(feature = "julia", not(windows)))]
pub use entry::main;
#[cfg(all(feature = "julia", windows))]
pub use entry::wmain;

use std::ffi::c_int;

use crate::args::{PlatformEntry, ProcessEntry};
use crate::error::LaunchError;
use crate::launcher::Launcher;
use crate::process::HostProcess;
use crate::runtime::ImageFile;
use crate::runtime::julia::JuliaRuntime;

fn run(entry: &impl ProcessEntry) -> Result<i32, LaunchError> {
    let runtime = JuliaRuntime::claim()?;
    let image = ImageFile::builtin()?;
    // SAFETY: called from the process entry point, before anything could spawn a thread.
    let process = unsafe { HostProcess::new() };

    Launcher::new(runtime, process, image).launch(entry, JuliaRuntime::call_main)
}

/// Returns the exit status of the entry function, or reports the error and exits with a failure.
fn exit_status(result: Result<i32, LaunchError>) -> c_int {
    match result {
        Ok(code) => code,
        Err(error) => proc_exit::exit(Err(error.into())),
    }
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        /// Function called at program startup.
        ///
        /// # Safety
        ///
        /// - `argc` must never be negative.
        /// - `argv` must be an array of at least `argc` valid pointers to null-terminated UTF-16 strings.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn wmain(
            argc: c_int,
            argv: *const *const u16,
            _envp: *const *const u16,
        ) -> c_int {
            // SAFETY: forwarded from the caller.
            let entry = unsafe { PlatformEntry::new(argc, argv) };

            exit_status(run(&entry))
        }
    } else {
        use std::ffi::c_char;

        /// Function called at program startup.
        ///
        /// # Safety
        ///
        /// - `argc` must never be negative.
        /// - `argv` must be an array of at least `argc` valid pointers to null-terminated strings.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn main(
            argc: c_int,
            argv: *const *const c_char,
            _envp: *const *const c_char,
        ) -> c_int {
            // SAFETY: forwarded from the caller.
            let entry = unsafe { PlatformEntry::new(argc, argv) };

            exit_status(run(&entry))
        }
    }
}

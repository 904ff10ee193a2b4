use std::ffi::{CStr, c_char, c_int};

use super::{Arguments, ProcessEntry, arg_count};
use crate::error::LaunchError;

/// Arguments received by a C `main(argc, argv)`: byte strings copied as is.
#[derive(Debug, Clone, Copy)]
pub struct NarrowEntry {
    argc: c_int,
    argv: *const *const c_char,
}

impl NarrowEntry {
    /// Wraps the arguments given to `main`.
    ///
    /// # Safety
    ///
    /// - `argv` must point to at least `argc` pointers (it may be null when `argc` is not positive).
    /// - Each of these pointers must be null or point to a null-terminated string that stays valid
    ///   for as long as this value is used.
    pub unsafe fn new(argc: c_int, argv: *const *const c_char) -> Self {
        Self { argc, argv }
    }
}

impl ProcessEntry for NarrowEntry {
    fn normalize(&self) -> Result<Arguments, LaunchError> {
        let count = if self.argv.is_null() {
            0
        } else {
            arg_count(self.argc)
        };

        (0..count)
            .map(|index| {
                // SAFETY: `index < argc` and `argv` holds `argc` entries (see `new`).
                let arg = unsafe { *self.argv.add(index) };
                if arg.is_null() {
                    return Err(LaunchError::MissingArgument { index });
                }

                // SAFETY: non-null entries are null-terminated strings (see `new`).
                Ok(unsafe { CStr::from_ptr(arg) }.to_owned())
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Arguments::from)
    }
}

use std::ffi::{CString, c_int};

use super::{Arguments, ProcessEntry, arg_count};
use crate::error::LaunchError;

/// Arguments received by `wmain(argc, argv)`: UTF-16 strings transcoded to UTF-8.
#[derive(Debug, Clone, Copy)]
pub struct WideEntry {
    argc: c_int,
    argv: *const *const u16,
}

impl WideEntry {
    /// Wraps the arguments given to `wmain`.
    ///
    /// # Safety
    ///
    /// - `argv` must point to at least `argc` pointers (it may be null when `argc` is not positive).
    /// - Each of these pointers must be null or point to a null-terminated UTF-16 string that stays
    ///   valid for as long as this value is used.
    pub unsafe fn new(argc: c_int, argv: *const *const u16) -> Self {
        Self { argc, argv }
    }
}

impl ProcessEntry for WideEntry {
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

                // SAFETY: non-null entries are null-terminated (see `new`).
                let units = unsafe { std::slice::from_raw_parts(arg, wide_len(arg)) };

                to_utf8(units).ok_or(LaunchError::ArgumentEncoding { index })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Arguments::from)
    }

    fn prepare_console(&self) {
        hide_console_window();
    }
}

/// Number of code units before the terminator.
///
/// # Safety
///
/// `s` must point to a null-terminated UTF-16 string.
unsafe fn wide_len(s: *const u16) -> usize {
    let mut len = 0;
    // SAFETY: the terminator is reached before leaving the string.
    while unsafe { *s.add(len) } != 0 {
        len += 1;
    }
    len
}

/// Transcodes UTF-16 code units (without terminator) to a NUL-terminated UTF-8 string.
///
/// Returns `None` on unpaired surrogates and on embedded NULs.
pub fn to_utf8(units: &[u16]) -> Option<CString> {
    let utf8 = String::from_utf16(units).ok()?;

    CString::new(utf8).ok()
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn hide_console_window() {
            use windows_sys::Win32::System::Console::GetConsoleWindow;
            use windows_sys::Win32::UI::WindowsAndMessaging::{SW_HIDE, SW_MINIMIZE, ShowWindow};

            // SAFETY: both calls accept any window handle, including a missing console.
            unsafe {
                let window = GetConsoleWindow();
                if window.is_null() {
                    return;
                }
                ShowWindow(window, SW_MINIMIZE);
                ShowWindow(window, SW_HIDE);
            }
        }
    } else {
        fn hide_console_window() {}
    }
}
